//! Session lifecycle management.
//!
//! One [`SessionManager`] owns the single active gateway session for the
//! whole process. It is created once, explicitly, and shared via `Arc` —
//! every executor and the orchestrator receive the same instance by
//! constructor injection; there is no ambient global.
//!
//! Listeners are notified with the current session (or `None`) on every
//! transition: creation, invalidation, and close. The listener set is
//! snapshotted before iteration so a callback can register or remove
//! listeners without corrupting the delivery loop.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

use crate::{
    error::Result,
    gateway::GatewayApi,
    models::Session,
};

/// Callback receiving the current session (or `None`) on every transition.
pub type SessionListener = Arc<dyn Fn(Option<Session>) + Send + Sync>;

/// Identifier returned by [`SessionManager::add_listener`], used to
/// deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Owns the single active gateway session, its configuration properties,
/// and the listener set notified on every session transition.
pub struct SessionManager {
    gateway: Arc<dyn GatewayApi>,
    session_name: String,
    defaults: HashMap<String, String>,
    /// The active session. Replaced wholesale or cleared, never partially
    /// mutated. Async mutex: held across the gateway call during creation
    /// so concurrent acquisitions observe one consistent transition.
    session: AsyncMutex<Option<Session>>,
    listeners: Mutex<Vec<(ListenerId, SessionListener)>>,
    next_listener_id: AtomicU64,
}

impl SessionManager {
    /// Create a session manager with default properties applied to every
    /// session it creates.
    pub fn new(gateway: Arc<dyn GatewayApi>, defaults: HashMap<String, String>) -> Self {
        Self::with_name(gateway, defaults, "gateway-link-session")
    }

    /// Create a session manager with a custom session name.
    pub fn with_name(
        gateway: Arc<dyn GatewayApi>,
        defaults: HashMap<String, String>,
        session_name: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            session_name: session_name.into(),
            defaults,
            session: AsyncMutex::new(None),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// Create a new session, replacing any existing one.
    ///
    /// `custom` properties are merged over the configured defaults. On
    /// gateway failure any existing session is cleared, listeners are
    /// notified with `None`, and the error propagates to the caller.
    pub async fn create_session(
        &self,
        custom: HashMap<String, String>,
    ) -> Result<Session> {
        let mut guard = self.session.lock().await;
        self.create_session_locked(&mut guard, custom).await
    }

    async fn create_session_locked(
        &self,
        guard: &mut Option<Session>,
        custom: HashMap<String, String>,
    ) -> Result<Session> {
        let mut properties = self.defaults.clone();
        properties.extend(custom);

        debug!(
            "[SESSION] Creating session '{}' ({} properties)",
            self.session_name,
            properties.len()
        );

        match self
            .gateway
            .create_session(Some(&self.session_name), &properties)
            .await
        {
            Ok(handle) => {
                let session = Session::new(handle, self.session_name.clone(), properties);
                *guard = Some(session.clone());
                info!("[SESSION] Session created: handle={}", session.handle);
                self.notify(Some(session.clone()));
                Ok(session)
            },
            Err(e) => {
                warn!("[SESSION] Session creation failed: {}", e);
                *guard = None;
                self.notify(None);
                Err(e)
            },
        }
    }

    /// Return the active session, creating one if none exists.
    ///
    /// This is the only path by which executors obtain a handle to submit
    /// against; it never yields an absent session without erroring.
    pub async fn get_session(&self) -> Result<Session> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }
        self.create_session_locked(&mut guard, HashMap::new()).await
    }

    /// Ping the gateway with the current session handle.
    ///
    /// On failure the session is cleared and listeners are notified of
    /// absence before `false` is returned. Never errors; no session at all
    /// also reports `false`.
    pub async fn validate_session(&self) -> bool {
        let mut guard = self.session.lock().await;
        let Some(handle) = guard.as_ref().map(|s| s.handle.clone()) else {
            return false;
        };

        match self.gateway.validate_session(&handle).await {
            Ok(()) => true,
            Err(e) => {
                warn!("[SESSION] Validation failed for handle={}: {}", handle, e);
                *guard = None;
                drop(guard);
                self.notify(None);
                false
            },
        }
    }

    /// Close the active session on the gateway, best-effort, then
    /// unconditionally clear local state and notify listeners.
    pub async fn close_session(&self) {
        let existing = { self.session.lock().await.take() };

        if let Some(session) = existing {
            debug!("[SESSION] Closing session handle={}", session.handle);
            if let Err(e) = self.gateway.close_session(&session.handle).await {
                // Close is best-effort; the gateway reaps orphans.
                warn!("[SESSION] Close failed (ignored): {}", e);
            }
        }

        self.notify(None);
    }

    /// Current session without creating one. Mostly for diagnostics.
    pub async fn current_session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    /// Register a listener for session transitions.
    pub fn add_listener(&self, listener: SessionListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .expect("listener set lock poisoned")
            .push((id, listener));
        id
    }

    /// Remove a listener. Idempotent: unknown ids are ignored.
    pub fn remove_listener(&self, id: ListenerId) {
        self.listeners
            .lock()
            .expect("listener set lock poisoned")
            .retain(|(listener_id, _)| *listener_id != id);
    }

    fn notify(&self, session: Option<Session>) {
        // Snapshot the listener set so callbacks can mutate it freely.
        let listeners: Vec<SessionListener> = self
            .listeners
            .lock()
            .expect("listener set lock poisoned")
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(session.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayLinkError;
    use crate::models::ResultPage;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;

    /// Scripted gateway: session calls succeed unless a failure flag is set.
    #[derive(Default)]
    struct StubGateway {
        fail_create: AtomicBool,
        fail_validate: AtomicBool,
        fail_close: AtomicBool,
        create_count: AtomicU64,
        created_names: Mutex<Vec<Option<String>>>,
        closed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GatewayApi for StubGateway {
        async fn create_session(
            &self,
            session_name: Option<&str>,
            _properties: &HashMap<String, String>,
        ) -> Result<String> {
            if self.fail_create.load(Ordering::Relaxed) {
                return Err(GatewayLinkError::Network("connection refused".into()));
            }
            self.created_names
                .lock()
                .unwrap()
                .push(session_name.map(str::to_string));
            let n = self.create_count.fetch_add(1, Ordering::Relaxed) + 1;
            Ok(format!("session-{}", n))
        }

        async fn validate_session(&self, _handle: &str) -> Result<()> {
            if self.fail_validate.load(Ordering::Relaxed) {
                return Err(GatewayLinkError::Server {
                    status_code: 404,
                    message: "session not found".into(),
                });
            }
            Ok(())
        }

        async fn close_session(&self, handle: &str) -> Result<()> {
            self.closed.lock().unwrap().push(handle.to_string());
            if self.fail_close.load(Ordering::Relaxed) {
                return Err(GatewayLinkError::Network("broken pipe".into()));
            }
            Ok(())
        }

        async fn submit_statement(&self, _handle: &str, _sql: &str) -> Result<String> {
            unreachable!("session tests never submit")
        }

        async fn fetch_result_page(
            &self,
            _handle: &str,
            _operation: &str,
            _token: u64,
        ) -> Result<ResultPage> {
            unreachable!("session tests never fetch")
        }

        async fn close_operation(&self, _handle: &str, _operation: &str) -> Result<()> {
            Ok(())
        }
    }

    fn manager(gateway: Arc<StubGateway>) -> SessionManager {
        let mut defaults = HashMap::new();
        defaults.insert("execution.runtime-mode".to_string(), "streaming".to_string());
        SessionManager::new(gateway, defaults)
    }

    #[tokio::test]
    async fn test_create_merges_custom_over_defaults() {
        let gateway = Arc::new(StubGateway::default());
        let sessions = manager(gateway);

        let mut custom = HashMap::new();
        custom.insert("execution.runtime-mode".to_string(), "batch".to_string());
        custom.insert("pipeline.name".to_string(), "test".to_string());

        let session = sessions.create_session(custom).await.unwrap();
        assert_eq!(
            session.properties.get("execution.runtime-mode"),
            Some(&"batch".to_string())
        );
        assert_eq!(session.properties.get("pipeline.name"), Some(&"test".to_string()));
    }

    #[tokio::test]
    async fn test_session_name_reaches_the_gateway() {
        let gateway = Arc::new(StubGateway::default());
        let sessions = SessionManager::with_name(gateway.clone(), HashMap::new(), "analytics");
        sessions.create_session(HashMap::new()).await.unwrap();

        let defaulted = Arc::new(StubGateway::default());
        let unnamed = SessionManager::new(defaulted.clone(), HashMap::new());
        unnamed.get_session().await.unwrap();

        assert_eq!(
            gateway.created_names.lock().unwrap().as_slice(),
            &[Some("analytics".to_string())]
        );
        assert_eq!(
            defaulted.created_names.lock().unwrap().as_slice(),
            &[Some("gateway-link-session".to_string())]
        );
    }

    #[tokio::test]
    async fn test_get_session_creates_when_absent() {
        let gateway = Arc::new(StubGateway::default());
        let sessions = manager(gateway.clone());

        assert!(sessions.current_session().await.is_none());
        let first = sessions.get_session().await.unwrap();
        let second = sessions.get_session().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(gateway.create_count.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_create_failure_clears_and_notifies_absence() {
        let gateway = Arc::new(StubGateway::default());
        let sessions = manager(gateway.clone());
        sessions.get_session().await.unwrap();

        let seen: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        sessions.add_listener(Arc::new(move |session| {
            seen_clone.lock().unwrap().push(session.is_some());
        }));

        gateway.fail_create.store(true, Ordering::Relaxed);
        let err = sessions.create_session(HashMap::new()).await;
        assert!(err.is_err());
        assert!(sessions.current_session().await.is_none());
        assert_eq!(seen.lock().unwrap().as_slice(), &[false]);
    }

    #[tokio::test]
    async fn test_validate_failure_clears_and_reports_false() {
        let gateway = Arc::new(StubGateway::default());
        let sessions = manager(gateway.clone());
        sessions.get_session().await.unwrap();

        assert!(sessions.validate_session().await);

        gateway.fail_validate.store(true, Ordering::Relaxed);
        assert!(!sessions.validate_session().await);
        assert!(sessions.current_session().await.is_none());

        // No session at all also reports false, without erroring.
        assert!(!sessions.validate_session().await);
    }

    #[tokio::test]
    async fn test_close_is_best_effort() {
        let gateway = Arc::new(StubGateway::default());
        let sessions = manager(gateway.clone());
        let session = sessions.get_session().await.unwrap();

        gateway.fail_close.store(true, Ordering::Relaxed);
        sessions.close_session().await; // must not panic or error

        assert!(sessions.current_session().await.is_none());
        assert_eq!(gateway.closed.lock().unwrap().as_slice(), &[session.handle]);
    }

    #[tokio::test]
    async fn test_listeners_observe_every_transition() {
        let gateway = Arc::new(StubGateway::default());
        let sessions = manager(gateway.clone());

        let seen: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let id = sessions.add_listener(Arc::new(move |session| {
            seen_clone.lock().unwrap().push(session.is_some());
        }));

        sessions.get_session().await.unwrap();
        gateway.fail_validate.store(true, Ordering::Relaxed);
        sessions.validate_session().await;
        gateway.fail_validate.store(false, Ordering::Relaxed);
        sessions.create_session(HashMap::new()).await.unwrap();
        sessions.close_session().await;

        assert_eq!(seen.lock().unwrap().as_slice(), &[true, false, true, false]);

        // Removal is idempotent.
        sessions.remove_listener(id);
        sessions.remove_listener(id);
        sessions.close_session().await;
        assert_eq!(seen.lock().unwrap().len(), 4);
    }
}
