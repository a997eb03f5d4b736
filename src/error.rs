//! Error types for the gateway-link client library.
//!
//! One crate-level error enum covers transport failures, gateway-reported
//! errors, session problems, and the pre-submission preprocessing step.
//! Cancellation is a distinct terminal outcome of a statement, not an
//! error, so it has no variant here.

use thiserror::Error;

/// Result type for gateway-link operations
pub type Result<T> = std::result::Result<T, GatewayLinkError>;

/// Errors that can occur while talking to the SQL gateway.
#[derive(Error, Debug)]
pub enum GatewayLinkError {
    /// Network-level failure reaching the gateway (DNS, connect, I/O)
    #[error("Network error: {0}")]
    Network(String),

    /// Request or poll exceeded its configured timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Authentication failed or credentials were rejected
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Client-side configuration problem (bad base URL, missing settings)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failed to encode a request or decode a gateway response
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Non-2xx response from the gateway, with the most specific cause
    /// message that could be extracted from the error body
    #[error("Gateway error ({status_code}): {message}")]
    Server { status_code: u16, message: String },

    /// The session could not be created or recreated
    #[error("Session error: {0}")]
    Session(String),

    /// Statement preprocessing failed before submission
    #[error("Preprocess error: {0}")]
    Preprocess(String),

    /// Internal invariant violation (lock poisoning, task plumbing)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for GatewayLinkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayLinkError::Timeout(err.to_string())
        } else if err.is_decode() {
            GatewayLinkError::Serialization(err.to_string())
        } else {
            GatewayLinkError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayLinkError {
    fn from(err: serde_json::Error) -> Self {
        GatewayLinkError::Serialization(err.to_string())
    }
}

/// Extract the most specific cause from a gateway error body.
///
/// Gateway error bodies carry a JSON `{"errors": [...]}` array where each
/// entry may be a full stack trace with a nested `Caused by:` chain. The
/// innermost cause line is the message a user actually needs, so it is
/// preferred over the generic status text.
///
/// Returns `None` when the body has no recognizable error payload.
pub fn extract_root_cause(body: &str) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        errors: Vec<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let raw = parsed.errors.last()?.trim();
    if raw.is_empty() {
        return None;
    }

    // Walk the cause chain: the last "Caused by:" entry is the root cause.
    let innermost = raw
        .rfind("Caused by:")
        .map(|idx| &raw[idx + "Caused by:".len()..])
        .unwrap_or(raw);

    // Keep only the message line, dropping any stack frames below it.
    let message = innermost.lines().next().unwrap_or(innermost).trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}
