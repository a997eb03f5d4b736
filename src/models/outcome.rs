use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal outcome of one statement execution.
///
/// Cancellation is a first-class outcome, never reported as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementOutcome {
    /// The result stream was consumed to end-of-stream (or a terminal page)
    Completed,
    /// Cancellation was requested and the loop exited cooperatively
    Cancelled,
    /// Execution aborted on a transport, session, or preprocessing failure
    Error,
}

impl fmt::Display for StatementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementOutcome::Completed => write!(f, "completed"),
            StatementOutcome::Cancelled => write!(f, "cancelled"),
            StatementOutcome::Error => write!(f, "error"),
        }
    }
}
