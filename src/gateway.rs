//! Gateway client: the stateless request/response wrapper around the
//! gateway's REST protocol.
//!
//! [`GatewayApi`] is the contract the orchestration layer consumes — session
//! lifecycle, statement submission, and token-based page fetching.
//! [`GatewayClient`] is the production HTTP implementation; tests inject
//! scripted implementations of the same trait.

use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashMap;
use std::time::Instant;

use crate::{
    auth::AuthProvider,
    error::{extract_root_cause, GatewayLinkError, Result},
    models::{
        CreateSessionRequest, CreateSessionResponse, ResultPage, SubmitStatementRequest,
        SubmitStatementResponse,
    },
    timeouts::GatewayTimeouts,
};

/// Contract of the remote SQL gateway, as consumed by the orchestration
/// layer.
///
/// The polling algorithm in the executor depends on the exact shape of
/// [`ResultPage`]; everything else is opaque handles in and out. No retry
/// policy is implied — retrying, if any, belongs to the implementation.
#[async_trait]
pub trait GatewayApi: Send + Sync {
    /// Create a session with the given name and properties; returns its
    /// handle.
    async fn create_session(
        &self,
        session_name: Option<&str>,
        properties: &HashMap<String, String>,
    ) -> Result<String>;

    /// Ping a session to check it is still alive on the gateway.
    async fn validate_session(&self, handle: &str) -> Result<()>;

    /// Close a session. Callers treat failures as best-effort.
    async fn close_session(&self, handle: &str) -> Result<()>;

    /// Submit a statement for asynchronous execution; returns the operation
    /// handle to poll.
    async fn submit_statement(&self, handle: &str, sql: &str) -> Result<String>;

    /// Fetch one result page by pagination token.
    async fn fetch_result_page(
        &self,
        handle: &str,
        operation: &str,
        token: u64,
    ) -> Result<ResultPage>;

    /// Close a finished or abandoned operation. Best-effort.
    async fn close_operation(&self, handle: &str, operation: &str) -> Result<()>;
}

/// HTTP implementation of [`GatewayApi`].
///
/// Use [`GatewayClient::builder`] to construct instances.
///
/// # Examples
///
/// ```rust,no_run
/// use gateway_link::GatewayClient;
///
/// # fn example() -> gateway_link::Result<()> {
/// let client = GatewayClient::builder()
///     .base_url("http://localhost:8083")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GatewayClient {
    base_url: String,
    http_client: reqwest::Client,
    auth: AuthProvider,
}

impl GatewayClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> GatewayClientBuilder {
        GatewayClientBuilder::new()
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Turn a non-2xx response into a [`GatewayLinkError::Server`] with the
    /// most specific cause message the body offers.
    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_root_cause(&body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown gateway error")
                    .to_string()
            } else {
                body.trim().to_string()
            }
        });

        warn!("[GATEWAY] HTTP {}: {}", status.as_u16(), message);
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(GatewayLinkError::Authentication(message));
        }
        Err(GatewayLinkError::Server {
            status_code: status.as_u16(),
            message,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.auth.apply_to_request(self.http_client.get(url))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.auth.apply_to_request(self.http_client.post(url))
    }

    fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.auth.apply_to_request(self.http_client.delete(url))
    }
}

#[async_trait]
impl GatewayApi for GatewayClient {
    async fn create_session(
        &self,
        session_name: Option<&str>,
        properties: &HashMap<String, String>,
    ) -> Result<String> {
        let request = CreateSessionRequest {
            session_name: session_name.map(str::to_string),
            properties: properties.clone(),
        };

        let start = Instant::now();
        debug!("[GATEWAY] POST /v1/sessions ({} properties)", properties.len());
        let response = self.post("/v1/sessions").json(&request).send().await?;
        let response = self.check(response).await?;
        let body: CreateSessionResponse = response.json().await?;
        debug!(
            "[GATEWAY] Session created: handle={} duration_ms={}",
            body.session_handle,
            start.elapsed().as_millis()
        );
        Ok(body.session_handle)
    }

    async fn validate_session(&self, handle: &str) -> Result<()> {
        let path = format!("/v1/sessions/{}", handle);
        debug!("[GATEWAY] GET {}", path);
        let response = self.get(&path).send().await?;
        self.check(response).await?;
        Ok(())
    }

    async fn close_session(&self, handle: &str) -> Result<()> {
        let path = format!("/v1/sessions/{}", handle);
        debug!("[GATEWAY] DELETE {}", path);
        let response = self.delete(&path).send().await?;
        self.check(response).await?;
        Ok(())
    }

    async fn submit_statement(&self, handle: &str, sql: &str) -> Result<String> {
        let request = SubmitStatementRequest {
            statement: sql.to_string(),
        };

        let start = Instant::now();
        debug!(
            "[GATEWAY] Submitting statement: \"{}\" (len={})",
            sql_preview(sql).replace('\n', " "),
            sql.len()
        );

        let path = format!("/v1/sessions/{}/statements", handle);
        let response = self.post(&path).json(&request).send().await?;
        let response = self.check(response).await?;
        let body: SubmitStatementResponse = response.json().await?;
        debug!(
            "[GATEWAY] Statement submitted: operation={} duration_ms={}",
            body.operation_handle,
            start.elapsed().as_millis()
        );
        Ok(body.operation_handle)
    }

    async fn fetch_result_page(
        &self,
        handle: &str,
        operation: &str,
        token: u64,
    ) -> Result<ResultPage> {
        let path = format!(
            "/v1/sessions/{}/operations/{}/result/{}",
            handle, operation, token
        );
        let response = self.get(&path).send().await?;
        let response = self.check(response).await?;
        let page: ResultPage = response.json().await?;
        debug!(
            "[GATEWAY] Page token={} type={} kind={} rows={}",
            token,
            page.result_type,
            page.result_kind,
            page.changes().len()
        );
        Ok(page)
    }

    async fn close_operation(&self, handle: &str, operation: &str) -> Result<()> {
        let path = format!("/v1/sessions/{}/operations/{}/close", handle, operation);
        debug!("[GATEWAY] DELETE {}", path);
        let response = self.delete(&path).send().await?;
        self.check(response).await?;
        Ok(())
    }
}

/// First 80 characters of a statement for log lines. Truncates on a char
/// boundary so multi-byte SQL never slices mid-character.
fn sql_preview(sql: &str) -> String {
    match sql.char_indices().nth(80) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Builder for configuring [`GatewayClient`] instances.
pub struct GatewayClientBuilder {
    base_url: Option<String>,
    auth: AuthProvider,
    timeouts: GatewayTimeouts,
}

impl GatewayClientBuilder {
    fn new() -> Self {
        Self {
            base_url: None,
            auth: AuthProvider::none(),
            timeouts: GatewayTimeouts::default(),
        }
    }

    /// Set the base URL of the gateway (required).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        let mut url = url.into();
        while url.ends_with('/') {
            url.pop();
        }
        self.base_url = Some(url);
        self
    }

    /// Set the authentication provider.
    pub fn auth(mut self, auth: AuthProvider) -> Self {
        self.auth = auth;
        self
    }

    /// Set timeout configuration for HTTP requests.
    pub fn timeouts(mut self, timeouts: GatewayTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<GatewayClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| GatewayLinkError::Configuration("base_url is required".into()))?;

        // Keep-alive pooling: polling fetches the same host repeatedly, so
        // reusing connections matters more here than in one-shot clients.
        let http_client = reqwest::Client::builder()
            .timeout(self.timeouts.request_timeout)
            .connect_timeout(self.timeouts.connect_timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .map_err(|e| GatewayLinkError::Configuration(e.to_string()))?;

        Ok(GatewayClient {
            base_url,
            http_client,
            auth: self.auth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        let result = GatewayClient::builder()
            .base_url("http://localhost:8083/")
            .auth(AuthProvider::bearer("token".into()))
            .build();

        let client = result.expect("builder should succeed");
        assert_eq!(client.base_url(), "http://localhost:8083");
    }

    #[test]
    fn test_builder_missing_url() {
        let result = GatewayClient::builder().build();
        assert!(matches!(
            result,
            Err(GatewayLinkError::Configuration(_))
        ));
    }

    #[test]
    fn test_sql_preview_truncates_on_char_boundary() {
        // The 80th character boundary falls inside a multi-byte sequence
        // when counted in bytes; truncation must count characters.
        let sql = format!("{}€€€", "a".repeat(79));
        let preview = sql_preview(&sql);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 83);

        let short = "SELECT 1";
        assert_eq!(sql_preview(short), short);

        let exact: String = "€".repeat(80);
        assert_eq!(sql_preview(&exact), exact);
    }
}
