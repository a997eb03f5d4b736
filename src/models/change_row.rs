use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Kind of a row-level change in an incremental result stream.
///
/// The gateway encodes the kind as a string; anything outside the four
/// known values is carried through as [`ChangeKind::Other`] and materialized
/// like an insert (forward-compatibility default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// A new row enters the result set
    Insert,
    /// Retraction of a previous row version, paired with an `UpdateAfter`
    UpdateBefore,
    /// The new row version following an `UpdateBefore`
    UpdateAfter,
    /// A row leaves the result set
    Delete,
    /// Unrecognized kind, preserved verbatim for diagnostics
    Other(String),
}

impl ChangeKind {
    /// Parse a gateway-reported kind string.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "INSERT" => Self::Insert,
            "UPDATE_BEFORE" => Self::UpdateBefore,
            "UPDATE_AFTER" => Self::UpdateAfter,
            "DELETE" => Self::Delete,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether this kind retracts a row (removes a matching row from the
    /// materialized set) rather than adding one.
    pub fn is_retraction(&self) -> bool {
        matches!(self, Self::UpdateBefore | Self::Delete)
    }
}

/// One changelog event: a change kind plus the raw field values of the
/// affected row, ordered by column position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRow {
    /// Gateway-reported kind string ("INSERT", "UPDATE_BEFORE", ...)
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Raw field values, positionally aligned with the column metadata
    #[serde(default)]
    pub fields: Vec<JsonValue>,
}

fn default_kind() -> String {
    "INSERT".to_string()
}

impl ChangeRow {
    /// Build a change row from a kind string and field values.
    pub fn new(kind: impl Into<String>, fields: Vec<JsonValue>) -> Self {
        Self {
            kind: kind.into(),
            fields,
        }
    }

    /// The parsed change kind.
    pub fn change_kind(&self) -> ChangeKind {
        ChangeKind::parse(&self.kind)
    }
}
