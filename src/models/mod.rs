//! Data models for the gateway-link client library.
//!
//! Wire-level request/response structures for the gateway REST protocol and
//! the domain types the orchestration layer is built on.

pub mod change_row;
pub mod column_info;
pub mod execution_state;
pub mod outcome;
pub mod protocol;
pub mod result_page;
pub mod session;
pub mod statement_event;
pub mod statement_update;

pub use change_row::{ChangeKind, ChangeRow};
pub use column_info::ColumnInfo;
pub use execution_state::{ExecutionState, Phase, Row};
pub use outcome::StatementOutcome;
pub use protocol::{
    CreateSessionRequest, CreateSessionResponse, SubmitStatementRequest, SubmitStatementResponse,
};
pub use result_page::{PageResults, ResultKind, ResultPage, ResultType};
pub use session::Session;
pub use statement_event::StatementEvent;
pub use statement_update::StatementUpdate;
