//! Changelog materialization: folding an incremental event stream into a
//! current row set.
//!
//! The gateway delivers row-level changes without a primary key, so
//! retractions (`UPDATE_BEFORE` / `DELETE`) are matched against existing
//! rows by full field-wise equality. That rule is deliberately isolated in
//! [`rows_match`] so it can be swapped for a keyed strategy later without
//! touching the fold itself.

use log::{debug, warn};
use serde_json::Value as JsonValue;

use crate::models::{ChangeKind, ChangeRow, Row};

/// Field-wise row equality.
///
/// Rows match when they have the same arity and every field is equal:
/// value equality for primitives, deep structural equality for composite
/// values. `null` equals itself and nothing else; a shorter row is never
/// equal to a longer one, so absence is distinct from `null`.
pub fn rows_match(a: &[JsonValue], b: &[JsonValue]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
}

/// Apply one changelog event to the materialized row set.
///
/// | kind            | effect                                              |
/// |-----------------|-----------------------------------------------------|
/// | `INSERT`        | append                                              |
/// | `UPDATE_AFTER`  | append (no implicit removal)                        |
/// | `UPDATE_BEFORE` | remove first field-wise-equal row, warn if missing  |
/// | `DELETE`        | remove first field-wise-equal row                   |
/// | anything else   | append (forward-compatibility default)              |
pub fn apply_change(rows: &mut Vec<Row>, change: &ChangeRow) {
    let kind = change.change_kind();
    if kind.is_retraction() {
        match rows.iter().position(|row| rows_match(row, &change.fields)) {
            Some(idx) => {
                rows.remove(idx);
            },
            None => {
                // No matching row is a data-quality signal from the stream,
                // not a client error.
                warn!(
                    "[MATERIALIZE] {:?} found no matching row for fields {:?}",
                    kind, change.fields
                );
            },
        }
    } else {
        if let ChangeKind::Other(raw) = &kind {
            debug!("[MATERIALIZE] Unknown change kind '{}', treating as INSERT", raw);
        }
        rows.push(change.fields.clone());
    }
}

/// Apply a page's changelog events in server-determined order.
pub fn apply_changes(rows: &mut Vec<Row>, changes: &[ChangeRow]) {
    for change in changes {
        apply_change(rows, change);
    }
}
