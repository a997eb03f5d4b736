//! Statement execution engine.
//!
//! One [`StatementExecutor`] per submitted statement. It owns the
//! submit → poll → materialize → terminate state machine and an observer set
//! scoped to that statement. The poll loop drives the gateway's long-poll
//! protocol: fetch a page by token, fold its changelog into the materialized
//! row set, follow the continuation cursor until end-of-stream, cancellation,
//! or an unrecoverable fetch error.
//!
//! Cancellation is cooperative: [`cancel`](StatementExecutor::cancel) sets a
//! flag that the loop checks at every suspension point. A fetch already in
//! flight is allowed to complete but its page is discarded — bounded,
//! accepted latency, never mid-fetch interruption.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;

use crate::{
    error::Result,
    gateway::GatewayApi,
    materialize,
    models::{ExecutionState, Phase, ResultPage, Session, StatementOutcome, StatementUpdate},
    preprocess::StatementPreprocessor,
    session::SessionManager,
    timeouts::GatewayTimeouts,
};

/// Callback receiving a [`StatementUpdate`] snapshot on every observable
/// state change of one statement.
pub type StatementObserver = Arc<dyn Fn(StatementUpdate) + Send + Sync>;

/// Identifier returned by observer registration, used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }
}

/// Executes one SQL statement against the shared gateway session.
pub struct StatementExecutor {
    id: String,
    gateway: Arc<dyn GatewayApi>,
    sessions: Arc<SessionManager>,
    preprocessor: Arc<dyn StatementPreprocessor>,
    timeouts: GatewayTimeouts,

    /// Materialized state, owned exclusively by this executor.
    state: Mutex<ExecutionState>,
    /// Gateway operation handle; assigned exactly once per execution,
    /// immediately after successful submission.
    operation_handle: Mutex<Option<String>>,
    /// Handle of the session this execution was submitted against. The
    /// executor never rebinds after session rotation: it keeps polling its
    /// original handle and fails fast on the next fetch.
    bound_session: Mutex<Option<String>>,

    /// Cooperative cancellation flag, checked at every suspension point.
    cancelled: AtomicBool,
    /// Phase broadcast so `cancel()` can await the loop's cooperative exit.
    phase_tx: watch::Sender<Phase>,

    observers: Mutex<Vec<(ObserverId, StatementObserver)>>,
    next_observer_id: AtomicU64,
    /// Last `(operation_handle, state)` delivered to observers; used to
    /// suppress no-op notifications.
    last_notified: Mutex<Option<(Option<String>, ExecutionState)>>,
}

impl StatementExecutor {
    /// Create an executor for one statement. `id` must be globally unique.
    pub fn new(
        id: impl Into<String>,
        gateway: Arc<dyn GatewayApi>,
        sessions: Arc<SessionManager>,
        preprocessor: Arc<dyn StatementPreprocessor>,
        timeouts: GatewayTimeouts,
    ) -> Self {
        let (phase_tx, _) = watch::channel(Phase::Stopped);
        Self {
            id: id.into(),
            gateway,
            sessions,
            preprocessor,
            timeouts,
            state: Mutex::new(ExecutionState::default()),
            operation_handle: Mutex::new(None),
            bound_session: Mutex::new(None),
            cancelled: AtomicBool::new(false),
            phase_tx,
            observers: Mutex::new(Vec::new()),
            next_observer_id: AtomicU64::new(1),
            last_notified: Mutex::new(None),
        }
    }

    /// The statement's locally generated id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        *self.phase_tx.borrow()
    }

    /// Deep copy of the current execution state.
    pub fn state(&self) -> ExecutionState {
        self.state.lock().expect("state lock poisoned").clone()
    }

    /// The gateway operation handle, absent until submission succeeds.
    pub fn operation_handle(&self) -> Option<String> {
        self.operation_handle
            .lock()
            .expect("operation handle lock poisoned")
            .clone()
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Execute `sql` to a terminal outcome.
    ///
    /// Returns `Ok(Completed)` or `Ok(Cancelled)`; errors propagate as
    /// `Err` and correspond to the `Error` outcome. The phase is `Stopped`
    /// on every exit path.
    pub async fn execute(&self, sql: &str) -> Result<StatementOutcome> {
        self.reset();
        self.set_phase(Phase::Running);
        self.notify_observers();

        let result = self.run(sql).await;

        self.set_phase(Phase::Stopped);
        self.notify_observers();

        match &result {
            Ok(outcome) => info!("[EXEC] Statement {} finished: {}", self.id, outcome),
            Err(e) => warn!("[EXEC] Statement {} failed: {}", self.id, e),
        }
        result
    }

    /// Request cancellation and await the poll loop's cooperative exit.
    ///
    /// Safe to call repeatedly and on an already-stopped statement (no-op).
    /// Cancellation takes effect at the loop's next checkpoint; one
    /// in-flight fetch may complete first, its page is discarded.
    pub async fn cancel(&self) {
        let mut phase_rx = self.phase_tx.subscribe();
        if *phase_rx.borrow_and_update() == Phase::Stopped {
            return;
        }

        info!("[EXEC] Cancelling statement {}", self.id);
        self.cancelled.store(true, Ordering::SeqCst);

        // Best-effort: ask the gateway to tear the operation down so the
        // server stops producing pages for it.
        let session = self
            .bound_session
            .lock()
            .expect("bound session lock poisoned")
            .clone();
        let operation = self.operation_handle();
        if let (Some(session), Some(operation)) = (session, operation) {
            if let Err(e) = self.gateway.close_operation(&session, &operation).await {
                debug!("[EXEC] close_operation failed (ignored): {}", e);
            }
        }

        loop {
            if *phase_rx.borrow_and_update() == Phase::Stopped {
                return;
            }
            if phase_rx.changed().await.is_err() {
                return;
            }
        }
    }

    // ── Observers ───────────────────────────────────────────────────────

    /// Register an observer for this statement's state changes.
    ///
    /// An observer added while the statement is running, or after rows have
    /// accumulated, is immediately sent the current snapshot so it never
    /// misses the present state.
    pub fn add_observer(&self, observer: StatementObserver) -> ObserverId {
        let id = ObserverId(self.next_observer_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .lock()
            .expect("observer set lock poisoned")
            .push((id, observer.clone()));

        let state = self.state();
        if state.phase == Phase::Running || !state.rows.is_empty() {
            observer(StatementUpdate::snapshot(
                self.id.clone(),
                self.operation_handle(),
                state,
            ));
        }
        id
    }

    /// Remove an observer. Idempotent: unknown ids are ignored.
    pub fn remove_observer(&self, id: ObserverId) {
        self.observers
            .lock()
            .expect("observer set lock poisoned")
            .retain(|(observer_id, _)| *observer_id != id);
    }

    fn notify_observers(&self) {
        let update = {
            let state = self.state();
            let handle = self.operation_handle();
            let mut last = self
                .last_notified
                .lock()
                .expect("last notified lock poisoned");
            let key = (handle.clone(), state.clone());
            if last.as_ref() == Some(&key) {
                return; // nothing observable changed
            }
            *last = Some(key);
            StatementUpdate::snapshot(self.id.clone(), handle, state)
        };

        // Snapshot the observer set before iterating; callbacks may
        // register or remove observers.
        let observers: Vec<StatementObserver> = self
            .observers
            .lock()
            .expect("observer set lock poisoned")
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(update.clone());
        }
    }

    // ── Execution ───────────────────────────────────────────────────────

    fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
        *self
            .operation_handle
            .lock()
            .expect("operation handle lock poisoned") = None;
        *self
            .bound_session
            .lock()
            .expect("bound session lock poisoned") = None;
        *self
            .last_notified
            .lock()
            .expect("last notified lock poisoned") = None;
        *self.state.lock().expect("state lock poisoned") = ExecutionState::default();
    }

    fn set_phase(&self, phase: Phase) {
        self.state.lock().expect("state lock poisoned").phase = phase;
        self.phase_tx.send_replace(phase);
    }

    async fn run(&self, sql: &str) -> Result<StatementOutcome> {
        // Preprocessing failures abort before any network call, with no
        // operation handle ever assigned.
        let sql = self.preprocessor.prepare(sql)?;

        let session = self.resolve_session().await?;
        *self
            .bound_session
            .lock()
            .expect("bound session lock poisoned") = Some(session.handle.clone());

        if self.is_cancelled() {
            return Ok(StatementOutcome::Cancelled);
        }

        let operation = self.gateway.submit_statement(&session.handle, &sql).await?;
        debug!(
            "[EXEC] Statement {} submitted: operation={} session={}",
            self.id, operation, session.handle
        );
        *self
            .operation_handle
            .lock()
            .expect("operation handle lock poisoned") = Some(operation.clone());
        self.notify_observers();

        self.poll(&session.handle, &operation).await
    }

    /// Resolve the shared session, recreating it when validation fails.
    async fn resolve_session(&self) -> Result<Session> {
        let session = self.sessions.get_session().await?;
        if self.sessions.validate_session().await {
            Ok(session)
        } else {
            debug!("[EXEC] Session invalid, recreating before submit");
            self.sessions
                .create_session(HashMap::new())
                .await
                .map_err(|e| {
                    crate::error::GatewayLinkError::Session(format!(
                        "session recreation failed: {}",
                        e
                    ))
                })
        }
    }

    /// The long-poll loop: fetch pages by token until end-of-stream,
    /// cancellation, or a fetch error.
    async fn poll(&self, session: &str, operation: &str) -> Result<StatementOutcome> {
        let mut token: u64 = 0;
        loop {
            if self.is_cancelled() {
                return Ok(StatementOutcome::Cancelled);
            }

            // Errors are not retried here; retry policy, if any, belongs to
            // the gateway client.
            let page = self.gateway.fetch_result_page(session, operation, token).await?;

            // Cancellation during the fetch: discard the in-flight page.
            if self.is_cancelled() {
                return Ok(StatementOutcome::Cancelled);
            }

            let not_ready = page.is_not_ready();
            self.apply_page(&page);

            if page.is_eos() {
                debug!("[EXEC] Statement {} reached end-of-stream at token {}", self.id, token);
                return Ok(StatementOutcome::Completed);
            }

            match page.next_token() {
                // The cursor must strictly increase to guarantee progress.
                Some(next) if next > token => token = next,
                other => {
                    debug!(
                        "[EXEC] Statement {} has no forward cursor (next={:?}, token={}), treating page as terminal",
                        self.id, other, token
                    );
                    return Ok(StatementOutcome::Completed);
                },
            }

            if not_ready && !self.interruptible_delay().await {
                return Ok(StatementOutcome::Cancelled);
            }
        }
    }

    /// Fold one page into the materialized state.
    fn apply_page(&self, page: &ResultPage) {
        {
            let mut state = self.state.lock().expect("state lock poisoned");
            state.result_type = page.result_type.clone();
            state.result_kind = page.result_kind.clone();

            // Column metadata is set at most once, from the first non-empty
            // list; later pages never redefine it.
            if state.columns.is_empty() && !page.columns().is_empty() {
                state.columns = page.columns().to_vec();
            }

            if page.result_kind().has_content() && !page.changes().is_empty() {
                materialize::apply_changes(&mut state.rows, page.changes());
                state.last_update_time = Some(now_ms());
            }
        }
        self.notify_observers();
    }

    /// Wait out the inter-poll delay in small slices so cancellation takes
    /// effect within one slice. Returns `false` when cancelled mid-wait.
    async fn interruptible_delay(&self) -> bool {
        let total = self.timeouts.poll_interval;
        let slice = self
            .timeouts
            .cancel_check_interval
            .max(Duration::from_millis(1));

        let start = tokio::time::Instant::now();
        loop {
            if self.is_cancelled() {
                return false;
            }
            let remaining = total.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                return true;
            }
            tokio::time::sleep(remaining.min(slice)).await;
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
