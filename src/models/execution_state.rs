use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use super::column_info::ColumnInfo;

/// One materialized result row: raw values positionally aligned with the
/// statement's [`ColumnInfo`] order.
pub type Row = Vec<JsonValue>;

/// Externally visible phase of a statement execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// The execution loop is active (submitting or polling)
    Running,
    /// The execution has reached a terminal outcome
    Stopped,
}

/// Materialized execution state of one statement.
///
/// `rows` is the accumulated effect of every changelog event applied so
/// far, not a raw event log. Owned exclusively by one statement executor
/// and mutated only by it; observers receive deep copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    /// Current phase
    pub phase: Phase,

    /// Gateway-reported result type of the most recent page
    pub result_type: String,

    /// Gateway-reported result kind of the most recent page
    pub result_kind: String,

    /// Materialized view of the result set
    pub rows: Vec<Row>,

    /// Column metadata, set once from the first non-empty column list
    pub columns: Vec<ColumnInfo>,

    /// Millis since Unix epoch of the last materialized update
    pub last_update_time: Option<u64>,
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self {
            phase: Phase::Stopped,
            result_type: String::new(),
            result_kind: String::new(),
            rows: Vec::new(),
            columns: Vec::new(),
            last_update_time: None,
        }
    }
}

impl ExecutionState {
    /// Column names, synthesizing `col{i}` placeholders when the gateway
    /// never reported column metadata.
    pub fn column_names(&self) -> Vec<String> {
        if self.columns.is_empty() {
            let width = self.rows.iter().map(|r| r.len()).max().unwrap_or(0);
            return (0..width).map(|i| format!("col{}", i)).collect();
        }
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// A row as a name→value map (convenience for presentation layers).
    pub fn row_as_map(&self, row_idx: usize) -> Option<HashMap<String, JsonValue>> {
        let row = self.rows.get(row_idx)?;
        let names = self.column_names();
        let mut map = HashMap::with_capacity(names.len());
        for (i, name) in names.into_iter().enumerate() {
            if let Some(value) = row.get(i) {
                map.insert(name, value.clone());
            }
        }
        Some(map)
    }

    /// All rows as name→value maps.
    pub fn rows_as_maps(&self) -> Vec<HashMap<String, JsonValue>> {
        (0..self.rows.len())
            .filter_map(|i| self.row_as_map(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_as_map_uses_column_names() {
        let state = ExecutionState {
            columns: vec![
                ColumnInfo::new("id", "INT", false),
                ColumnInfo::new("name", "VARCHAR", true),
            ],
            rows: vec![vec![json!(1), json!("alice")]],
            ..Default::default()
        };

        let map = state.row_as_map(0).expect("row exists");
        assert_eq!(map.get("id"), Some(&json!(1)));
        assert_eq!(map.get("name"), Some(&json!("alice")));
    }

    #[test]
    fn test_row_as_map_synthesizes_names_without_columns() {
        let state = ExecutionState {
            rows: vec![vec![json!(1)]],
            ..Default::default()
        };

        let map = state.row_as_map(0).expect("row exists");
        assert_eq!(map.get("col0"), Some(&json!(1)));
    }

    #[test]
    fn test_default_state_is_stopped_and_empty() {
        let state = ExecutionState::default();
        assert_eq!(state.phase, Phase::Stopped);
        assert!(state.rows.is_empty());
        assert!(state.columns.is_empty());
        assert!(state.last_update_time.is_none());
    }
}
