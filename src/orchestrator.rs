//! Process-wide statement orchestration.
//!
//! [`StatementOrchestrator`] is the top-level façade: it creates one
//! [`StatementExecutor`] per submitted statement, tracks every active
//! statement in a registry keyed by statement id, and fans statement
//! lifecycle events out to globally registered observers. Concurrent
//! statements share one gateway session through the [`SessionManager`].

use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::join_all;

use crate::{
    error::Result,
    executor::{ObserverId, StatementExecutor},
    gateway::GatewayApi,
    models::{Phase, StatementEvent, StatementOutcome, StatementUpdate},
    preprocess::{NoopPreprocessor, StatementPreprocessor},
    session::SessionManager,
    timeouts::GatewayTimeouts,
};

/// Callback receiving every [`StatementEvent`] emitted by the orchestrator.
pub type GlobalObserver = Arc<dyn Fn(StatementEvent) + Send + Sync>;

static STATEMENT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a process-unique statement id.
fn generate_statement_id() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    // Counter breaks ties when two statements start within the same
    // clock tick.
    let seq = STATEMENT_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("stmt_{}_{}", nanos, seq)
}

/// Coordinates concurrent statement executions over one shared session.
///
/// # Examples
///
/// ```rust,no_run
/// use std::collections::HashMap;
/// use std::sync::Arc;
/// use gateway_link::{GatewayClient, SessionManager, StatementOrchestrator};
///
/// # async fn example() -> gateway_link::Result<()> {
/// let gateway = Arc::new(
///     GatewayClient::builder()
///         .base_url("http://localhost:8083")
///         .build()?,
/// );
/// let sessions = Arc::new(SessionManager::new(gateway.clone(), HashMap::new()));
/// let orchestrator = StatementOrchestrator::new(gateway, sessions);
///
/// let outcome = orchestrator.execute_sql("SELECT 1", None).await?;
/// println!("finished: {}", outcome);
/// # Ok(())
/// # }
/// ```
pub struct StatementOrchestrator {
    gateway: Arc<dyn GatewayApi>,
    sessions: Arc<SessionManager>,
    preprocessor: Arc<dyn StatementPreprocessor>,
    timeouts: GatewayTimeouts,

    /// Registry of running statements. Entries are removed the moment a
    /// statement stops, whatever the outcome.
    active: Arc<Mutex<HashMap<String, Arc<StatementExecutor>>>>,

    observers: Arc<Mutex<Vec<(ObserverId, GlobalObserver)>>>,
    next_observer_id: AtomicU64,
}

impl StatementOrchestrator {
    /// Create an orchestrator with a pass-through preprocessor and default
    /// timeouts.
    pub fn new(gateway: Arc<dyn GatewayApi>, sessions: Arc<SessionManager>) -> Self {
        Self {
            gateway,
            sessions,
            preprocessor: Arc::new(NoopPreprocessor),
            timeouts: GatewayTimeouts::default(),
            active: Arc::new(Mutex::new(HashMap::new())),
            observers: Arc::new(Mutex::new(Vec::new())),
            next_observer_id: AtomicU64::new(1),
        }
    }

    /// Replace the statement preprocessor.
    pub fn with_preprocessor(mut self, preprocessor: Arc<dyn StatementPreprocessor>) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    /// Replace the timeout configuration applied to new statements.
    pub fn with_timeouts(mut self, timeouts: GatewayTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// The shared session manager.
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Ids of currently active statements, in no particular order.
    pub fn active_statement_ids(&self) -> Vec<String> {
        self.active
            .lock()
            .expect("registry lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Number of currently active statements.
    pub fn active_count(&self) -> usize {
        self.active.lock().expect("registry lock poisoned").len()
    }

    /// Look up an active statement by id.
    pub fn get_statement(&self, statement_id: &str) -> Option<Arc<StatementExecutor>> {
        self.active
            .lock()
            .expect("registry lock poisoned")
            .get(statement_id)
            .cloned()
    }

    // ── Execution ───────────────────────────────────────────────────────

    /// Execute one statement to a terminal outcome.
    ///
    /// `statement_id` overrides the generated id when provided; callers are
    /// responsible for its uniqueness. The statement is registered before
    /// `Started` is emitted and deregistered as soon as it stops, so
    /// observers never see events for a statement that cannot be looked up
    /// while running.
    pub async fn execute_sql(
        &self,
        sql: &str,
        statement_id: Option<String>,
    ) -> Result<StatementOutcome> {
        let statement_id = statement_id.unwrap_or_else(generate_statement_id);

        let executor = Arc::new(StatementExecutor::new(
            statement_id.clone(),
            self.gateway.clone(),
            self.sessions.clone(),
            self.preprocessor.clone(),
            self.timeouts.clone(),
        ));

        // Internal observer: re-broadcast every snapshot process-wide and
        // drop the registry entry the instant the statement stops.
        let active = self.active.clone();
        let observers = self.observers.clone();
        let observed_id = statement_id.clone();
        executor.add_observer(Arc::new(move |update: StatementUpdate| {
            let stopped = update.state.phase == Phase::Stopped;
            fan_out(&observers, StatementEvent::Update(update));
            if stopped {
                active
                    .lock()
                    .expect("registry lock poisoned")
                    .remove(&observed_id);
            }
        }));

        self.active
            .lock()
            .expect("registry lock poisoned")
            .insert(statement_id.clone(), executor.clone());
        info!("[ORCH] Statement {} registered", statement_id);
        self.emit(StatementEvent::Started {
            statement_id: statement_id.clone(),
        });

        let result = executor.execute(sql).await;

        // The internal observer already deregistered on the phase change;
        // this covers the path where that notification was suppressed.
        self.active
            .lock()
            .expect("registry lock poisoned")
            .remove(&statement_id);

        match &result {
            Ok(outcome) => self.emit(StatementEvent::Completed {
                statement_id,
                outcome: *outcome,
            }),
            Err(e) => self.emit(StatementEvent::Error {
                statement_id,
                message: e.to_string(),
            }),
        }

        result
    }

    // ── Cancellation ────────────────────────────────────────────────────

    /// Cancel one active statement.
    ///
    /// Returns `false` when no statement with that id is active; `true`
    /// once the statement has fully stopped.
    pub async fn cancel_statement(&self, statement_id: &str) -> bool {
        let executor = self
            .active
            .lock()
            .expect("registry lock poisoned")
            .remove(statement_id);

        match executor {
            None => {
                debug!("[ORCH] Cancel requested for unknown statement {}", statement_id);
                false
            },
            Some(executor) => {
                executor.cancel().await;
                self.emit(StatementEvent::Cancelled {
                    statement_id: statement_id.to_string(),
                });
                true
            },
        }
    }

    /// Cancel every active statement concurrently.
    ///
    /// Individual teardown failures are swallowed inside each executor, so
    /// one misbehaving statement never aborts the batch. Returns the ids of
    /// the statements that were cancelled.
    pub async fn cancel_all_statements(&self) -> Vec<String> {
        let executors: Vec<Arc<StatementExecutor>> = {
            let mut active = self.active.lock().expect("registry lock poisoned");
            active.drain().map(|(_, executor)| executor).collect()
        };

        if executors.is_empty() {
            self.emit(StatementEvent::AllCancelled { count: 0 });
            return Vec::new();
        }

        info!("[ORCH] Cancelling {} active statements", executors.len());
        join_all(executors.iter().map(|executor| executor.cancel())).await;

        let ids: Vec<String> = executors
            .iter()
            .map(|executor| executor.id().to_string())
            .collect();
        self.emit(StatementEvent::AllCancelled { count: ids.len() });
        ids
    }

    /// Cancel all statements, then close the shared session.
    ///
    /// Cancellation runs first so nothing keeps polling a session handle
    /// the gateway no longer knows about. Session close failures are
    /// logged and swallowed by the session manager.
    pub async fn close_session(&self) {
        self.cancel_all_statements().await;
        self.sessions.close_session().await;
    }

    // ── Observers ───────────────────────────────────────────────────────

    /// Register a process-wide observer for all statement events.
    pub fn add_observer(&self, observer: GlobalObserver) -> ObserverId {
        let id = ObserverId::new(self.next_observer_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .lock()
            .expect("observer set lock poisoned")
            .push((id, observer));
        id
    }

    /// Remove a process-wide observer. Idempotent.
    pub fn remove_observer(&self, id: ObserverId) {
        self.observers
            .lock()
            .expect("observer set lock poisoned")
            .retain(|(observer_id, _)| *observer_id != id);
    }

    fn emit(&self, event: StatementEvent) {
        fan_out(&self.observers, event);
    }
}

/// Deliver one event to every registered observer.
///
/// Malformed events (empty ids, missing messages) are dropped with a
/// warning rather than delivered. The observer set is snapshotted before
/// iterating so callbacks may register or remove observers.
fn fan_out(observers: &Mutex<Vec<(ObserverId, GlobalObserver)>>, event: StatementEvent) {
    if !event.is_well_formed() {
        warn!("[ORCH] Dropping malformed event: {:?}", event);
        return;
    }

    let snapshot: Vec<GlobalObserver> = observers
        .lock()
        .expect("observer set lock poisoned")
        .iter()
        .map(|(_, observer)| observer.clone())
        .collect();
    for observer in snapshot {
        observer(event.clone());
    }
}
