use serde::{Deserialize, Serialize};

/// Column metadata reported by the gateway with a statement's results.
///
/// Immutable once a statement's first non-empty column list has been
/// observed; later pages never redefine it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,

    /// Gateway-reported logical type (e.g. "INT", "VARCHAR(10)")
    #[serde(rename = "type", default)]
    pub data_type: String,

    /// Whether the column admits NULL values
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnInfo {
    /// Convenience constructor, mostly for tests and fixtures.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
        }
    }
}
