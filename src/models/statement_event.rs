use serde::{Deserialize, Serialize};

use super::outcome::StatementOutcome;
use super::statement_update::StatementUpdate;

/// Process-wide statement lifecycle and update events.
///
/// Delivered to global observers registered on the
/// [`StatementOrchestrator`](crate::orchestrator::StatementOrchestrator).
/// Events failing [`is_well_formed`](Self::is_well_formed) are dropped with
/// a warning instead of being delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementEvent {
    /// A statement was registered and is about to execute
    Started { statement_id: String },

    /// A statement reached a non-error terminal outcome
    Completed {
        statement_id: String,
        outcome: StatementOutcome,
    },

    /// A statement aborted with an error
    Error {
        statement_id: String,
        message: String,
    },

    /// A statement was cancelled through the orchestrator
    Cancelled { statement_id: String },

    /// Every active statement was cancelled in one batch
    AllCancelled { count: usize },

    /// A per-statement state snapshot, re-broadcast process-wide
    Update(StatementUpdate),
}

impl StatementEvent {
    /// The statement id this event refers to, if it targets one statement.
    pub fn statement_id(&self) -> Option<&str> {
        match self {
            Self::Started { statement_id }
            | Self::Completed { statement_id, .. }
            | Self::Error { statement_id, .. }
            | Self::Cancelled { statement_id } => Some(statement_id.as_str()),
            Self::Update(update) => Some(update.statement_id.as_str()),
            Self::AllCancelled { .. } => None,
        }
    }

    /// Check that every field required by the event's type is present.
    ///
    /// Single-statement events need a non-empty statement id; error events
    /// additionally need a message.
    pub fn is_well_formed(&self) -> bool {
        match self {
            Self::AllCancelled { .. } => true,
            Self::Error {
                statement_id,
                message,
            } => !statement_id.is_empty() && !message.is_empty(),
            other => other
                .statement_id()
                .map(|id| !id.is_empty())
                .unwrap_or(false),
        }
    }
}
