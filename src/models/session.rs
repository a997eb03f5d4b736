use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// A server-side execution context identified by an opaque handle.
///
/// Exactly one session is active at a time per
/// [`SessionManager`](crate::session::SessionManager). A session is never
/// partially mutated: transitions replace the whole object or clear it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque handle assigned by the gateway
    pub handle: String,

    /// Client-chosen session name (sent at creation, useful in gateway logs)
    pub name: String,

    /// Millis since Unix epoch when this session was created locally
    pub created: u64,

    /// Effective session properties (defaults merged with custom overrides)
    pub properties: HashMap<String, String>,
}

impl Session {
    /// Create a session record for a freshly created gateway session.
    pub fn new(handle: String, name: String, properties: HashMap<String, String>) -> Self {
        let created = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            handle,
            name,
            created,
            properties,
        }
    }
}
