use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::execution_state::ExecutionState;

/// Snapshot delivered to observers on every observable state change.
///
/// Carries a deep copy of the execution state, so observers can hold on to
/// it without racing the executor's ongoing mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementUpdate {
    /// Locally generated, globally unique statement id
    pub statement_id: String,

    /// Gateway operation handle, absent until submission succeeds
    pub operation_handle: Option<String>,

    /// Deep copy of the execution state at snapshot time
    pub state: ExecutionState,

    /// Millis since Unix epoch when the snapshot was taken
    pub timestamp_ms: u64,
}

impl StatementUpdate {
    /// Snapshot the given state under the statement's identifiers.
    pub fn snapshot(
        statement_id: impl Into<String>,
        operation_handle: Option<String>,
        state: ExecutionState,
    ) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            statement_id: statement_id.into(),
            operation_handle,
            state,
            timestamp_ms,
        }
    }
}
