//! Shared test fixtures: a scripted in-memory gateway.
//!
//! [`MockGateway`] implements [`GatewayApi`] without any network. Each SQL
//! text is bound to a scripted page sequence before submission; fetches pop
//! pages from that script in order while a call log records every
//! interaction for assertions. An optional semaphore gate lets tests hold
//! fetches in flight to exercise cancellation timing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use gateway_link::error::{GatewayLinkError, Result};
use gateway_link::{GatewayApi, ResultPage};

/// One recorded gateway interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateSession(Option<String>),
    ValidateSession(String),
    CloseSession(String),
    Submit { session: String, sql: String },
    Fetch { operation: String, token: u64 },
    CloseOperation { operation: String },
}

#[derive(Default)]
struct Scripts {
    /// Page sequences waiting for submission, keyed by SQL text.
    pending: HashMap<String, Vec<ResultPage>>,
    /// Page sequences of submitted operations, keyed by operation handle.
    submitted: HashMap<String, Vec<ResultPage>>,
}

pub struct MockGateway {
    scripts: Mutex<Scripts>,
    calls: Mutex<Vec<Call>>,
    next_session: AtomicU64,
    next_operation: AtomicU64,

    /// When `> 0`, every fetch after that many successes fails with a
    /// server error. `0` fails the first fetch.
    fail_fetch_after: Mutex<Option<usize>>,
    fetches_served: AtomicU64,

    /// Session validation failure switch (simulates gateway-side rotation).
    pub fail_validate: AtomicBool,

    /// When gating is on, every fetch must acquire a permit first, letting
    /// tests hold a fetch in flight.
    gated: AtomicBool,
    gate: Semaphore,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(Scripts::default()),
            calls: Mutex::new(Vec::new()),
            next_session: AtomicU64::new(1),
            next_operation: AtomicU64::new(1),
            fail_fetch_after: Mutex::new(None),
            fetches_served: AtomicU64::new(0),
            fail_validate: AtomicBool::new(false),
            gated: AtomicBool::new(false),
            gate: Semaphore::new(0),
        })
    }

    /// Bind a page sequence to a SQL text; the next submission of that text
    /// consumes it.
    pub fn script(&self, sql: &str, pages: Vec<ResultPage>) {
        self.scripts
            .lock()
            .unwrap()
            .pending
            .insert(sql.to_string(), pages);
    }

    /// Fail every fetch after `successes` pages have been served.
    pub fn fail_fetch_after(&self, successes: usize) {
        *self.fail_fetch_after.lock().unwrap() = Some(successes);
    }

    /// Hold each fetch until a permit is released via [`release_fetches`].
    pub fn gate_fetches(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    /// Allow `n` gated fetches to proceed.
    pub fn release_fetches(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Tokens fetched so far, in request order, across all operations.
    pub fn fetched_tokens(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Fetch { token, .. } => Some(token),
                _ => None,
            })
            .collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched_tokens().len()
    }

    pub fn create_session_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::CreateSession(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl GatewayApi for MockGateway {
    async fn create_session(
        &self,
        session_name: Option<&str>,
        _properties: &HashMap<String, String>,
    ) -> Result<String> {
        self.record(Call::CreateSession(session_name.map(str::to_string)));
        let n = self.next_session.fetch_add(1, Ordering::SeqCst);
        Ok(format!("session-{}", n))
    }

    async fn validate_session(&self, handle: &str) -> Result<()> {
        self.record(Call::ValidateSession(handle.to_string()));
        if self.fail_validate.load(Ordering::SeqCst) {
            return Err(GatewayLinkError::Server {
                status_code: 404,
                message: format!("session {} does not exist", handle),
            });
        }
        Ok(())
    }

    async fn close_session(&self, handle: &str) -> Result<()> {
        self.record(Call::CloseSession(handle.to_string()));
        Ok(())
    }

    async fn submit_statement(&self, handle: &str, sql: &str) -> Result<String> {
        self.record(Call::Submit {
            session: handle.to_string(),
            sql: sql.to_string(),
        });

        let mut scripts = self.scripts.lock().unwrap();
        let pages = scripts.pending.remove(sql).ok_or_else(|| {
            GatewayLinkError::Internal(format!("no script bound to statement: {}", sql))
        })?;

        let n = self.next_operation.fetch_add(1, Ordering::SeqCst);
        let operation = format!("op-{}", n);
        scripts.submitted.insert(operation.clone(), pages);
        Ok(operation)
    }

    async fn fetch_result_page(
        &self,
        _handle: &str,
        operation: &str,
        token: u64,
    ) -> Result<ResultPage> {
        self.record(Call::Fetch {
            operation: operation.to_string(),
            token,
        });

        if self.gated.load(Ordering::SeqCst) {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|_| GatewayLinkError::Internal("gate closed".into()))?;
            permit.forget();
        }

        if let Some(limit) = *self.fail_fetch_after.lock().unwrap() {
            if self.fetches_served.load(Ordering::SeqCst) as usize >= limit {
                return Err(GatewayLinkError::Server {
                    status_code: 500,
                    message: "operation failed on the gateway".to_string(),
                });
            }
        }
        self.fetches_served.fetch_add(1, Ordering::SeqCst);

        let mut scripts = self.scripts.lock().unwrap();
        let pages = scripts
            .submitted
            .get_mut(operation)
            .ok_or_else(|| GatewayLinkError::Internal(format!("unknown operation {}", operation)))?;
        if pages.is_empty() {
            return Err(GatewayLinkError::Internal(format!(
                "script for {} exhausted at token {}",
                operation, token
            )));
        }
        Ok(pages.remove(0))
    }

    async fn close_operation(&self, _handle: &str, operation: &str) -> Result<()> {
        self.record(Call::CloseOperation {
            operation: operation.to_string(),
        });
        Ok(())
    }
}

/// Initialize test logging once per process.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
