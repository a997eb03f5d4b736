//! Authentication provider for the SQL gateway.
//!
//! Derives the `Authorization` header from externally-supplied credentials.
//! Credential sourcing (keychains, config files, prompts) is the caller's
//! concern; this module only knows how to attach headers.

use base64::{engine::general_purpose, Engine as _};

/// Credentials used when talking to the gateway.
///
/// # Examples
///
/// ```rust
/// use gateway_link::AuthProvider;
///
/// // HTTP Basic Auth (RFC 7617)
/// let auth = AuthProvider::basic("alice".to_string(), "secret".to_string());
///
/// // Bearer token
/// let auth = AuthProvider::bearer("eyJhbGc...".to_string());
///
/// // Unauthenticated gateway
/// let auth = AuthProvider::none();
/// ```
#[derive(Debug, Clone)]
pub enum AuthProvider {
    /// HTTP Basic Auth (username, password)
    Basic(String, String),

    /// Bearer token authentication
    Bearer(String),

    /// No authentication
    None,
}

impl AuthProvider {
    /// Create HTTP Basic Auth credentials.
    pub fn basic(username: String, password: String) -> Self {
        Self::Basic(username, password)
    }

    /// Create bearer token credentials.
    pub fn bearer(token: String) -> Self {
        Self::Bearer(token)
    }

    /// No authentication.
    pub fn none() -> Self {
        Self::None
    }

    /// Attach the appropriate `Authorization` header to a request builder.
    ///
    /// - `Basic`: `Authorization: Basic <base64(username:password)>`
    /// - `Bearer`: `Authorization: Bearer <token>`
    /// - `None`: no header
    pub fn apply_to_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::Basic(username, password) => {
                // Encode username:password as base64 (RFC 7617)
                let credentials = format!("{}:{}", username, password);
                let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
                request.header("Authorization", format!("Basic {}", encoded))
            },
            Self::Bearer(token) => request.bearer_auth(token),
            Self::None => request,
        }
    }

    /// Check if any credentials are configured.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::None)
    }
}
