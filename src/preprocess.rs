//! Statement preprocessing seam.
//!
//! The executor runs every statement through a [`StatementPreprocessor`]
//! before submission. The production substitution step (environment-derived
//! secrets spliced into SQL text) lives outside this crate; here we only
//! define the seam and a pass-through default. A preprocessing failure
//! aborts the execution before any network call is made.

use crate::error::Result;

/// Transforms SQL text immediately before submission.
pub trait StatementPreprocessor: Send + Sync {
    /// Produce the final SQL text to submit, or fail the execution.
    fn prepare(&self, sql: &str) -> Result<String>;
}

/// Default preprocessor: submits the statement text unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPreprocessor;

impl StatementPreprocessor for NoopPreprocessor {
    fn prepare(&self, sql: &str) -> Result<String> {
        Ok(sql.to_string())
    }
}
