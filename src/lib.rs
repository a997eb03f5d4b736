//! # gateway-link: SQL Gateway Client Library
//!
//! A client library for executing SQL statements against a remote SQL
//! gateway over its asynchronous REST protocol. The gateway runs statements
//! inside server-side sessions; this crate owns the full client-side
//! lifecycle: session creation and reuse, statement submission, long-poll
//! result fetching, changelog materialization, and cooperative cancellation.
//!
//! ## Features
//!
//! - **Session Orchestration**: One shared session, created lazily and
//!   revalidated before each submission
//! - **Asynchronous Statements**: Submit-and-poll execution with token-based
//!   pagination
//! - **Changelog Materialization**: Incremental `INSERT` / `UPDATE_BEFORE` /
//!   `UPDATE_AFTER` / `DELETE` streams folded into a current row set
//! - **Observers**: Per-statement snapshots and process-wide lifecycle
//!   events
//! - **Cooperative Cancellation**: Single statements, batch cancel, and
//!   whole-session teardown
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use gateway_link::{GatewayClient, SessionManager, StatementOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> gateway_link::Result<()> {
//!     let gateway = Arc::new(
//!         GatewayClient::builder()
//!             .base_url("http://localhost:8083")
//!             .build()?,
//!     );
//!     let sessions = Arc::new(SessionManager::new(gateway.clone(), HashMap::new()));
//!     let orchestrator = StatementOrchestrator::new(gateway, sessions);
//!
//!     // Watch every statement in the process.
//!     orchestrator.add_observer(Arc::new(|event| {
//!         println!("event: {:?}", event);
//!     }));
//!
//!     let outcome = orchestrator.execute_sql("SELECT 1", None).await?;
//!     println!("finished: {}", outcome);
//!
//!     orchestrator.close_session().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Authentication
//!
//! ```rust,no_run
//! use gateway_link::{AuthProvider, GatewayClient};
//!
//! # fn example() -> gateway_link::Result<()> {
//! let client = GatewayClient::builder()
//!     .base_url("http://localhost:8083")
//!     .auth(AuthProvider::basic("admin".into(), "secret".into()))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod materialize;
pub mod models;
pub mod orchestrator;
pub mod preprocess;
pub mod session;
pub mod timeouts;

// Re-export main types for convenience
pub use auth::AuthProvider;
pub use error::{GatewayLinkError, Result};
pub use executor::{ObserverId, StatementExecutor, StatementObserver};
pub use gateway::{GatewayApi, GatewayClient, GatewayClientBuilder};
pub use models::{
    ChangeKind, ChangeRow, ColumnInfo, ExecutionState, Phase, ResultKind, ResultPage, ResultType,
    Row, Session, StatementEvent, StatementOutcome, StatementUpdate,
};
pub use orchestrator::{GlobalObserver, StatementOrchestrator};
pub use preprocess::{NoopPreprocessor, StatementPreprocessor};
pub use session::{ListenerId, SessionListener, SessionManager};
pub use timeouts::{GatewayTimeouts, GatewayTimeoutsBuilder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
