use serde::{Deserialize, Serialize};

use super::change_row::ChangeRow;
use super::column_info::ColumnInfo;

/// Gateway-reported result type: where this page sits in the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultType {
    /// The page carries result data
    Payload,
    /// End of stream: no further pages will be produced
    Eos,
    /// Results are not ready yet; poll again after a delay
    NotReady,
    /// Unrecognized type, preserved verbatim
    Other(String),
}

impl ResultType {
    /// Parse a gateway-reported result type string.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PAYLOAD" => Self::Payload,
            "EOS" => Self::Eos,
            "NOT_READY" => Self::NotReady,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Gateway-reported result kind: whether the operation produced content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultKind {
    /// The page carries rows (queries, row-returning statements)
    SuccessWithContent,
    /// The operation succeeded without row content (DDL and friends)
    Success,
    /// Unrecognized kind, preserved verbatim
    Other(String),
}

impl ResultKind {
    /// Parse a gateway-reported result kind string.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "SUCCESS_WITH_CONTENT" => Self::SuccessWithContent,
            "SUCCESS" => Self::Success,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether pages of this kind carry row content.
    pub fn has_content(&self) -> bool {
        matches!(self, Self::SuccessWithContent)
    }
}

/// Column metadata and changelog rows carried by a result page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResults {
    /// Column metadata (may be empty on pages after the first)
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,

    /// Changelog rows, in server-determined order
    #[serde(default)]
    pub data: Vec<ChangeRow>,
}

/// One page of an operation's incremental results.
///
/// Pages are strictly ordered by pagination token; the continuation cursor
/// is carried as an opaque URI whose trailing path segment is the numeric
/// token of the next page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage {
    /// Raw result type string ("PAYLOAD", "EOS", "NOT_READY")
    #[serde(default)]
    pub result_type: String,

    /// Raw result kind string ("SUCCESS_WITH_CONTENT", "SUCCESS")
    #[serde(default)]
    pub result_kind: String,

    /// Column metadata and changelog rows, absent on contentless pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<PageResults>,

    /// Opaque pagination cursor for the next page, absent when terminal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_result_uri: Option<String>,
}

impl ResultPage {
    /// The parsed result type.
    pub fn result_type(&self) -> ResultType {
        ResultType::parse(&self.result_type)
    }

    /// The parsed result kind.
    pub fn result_kind(&self) -> ResultKind {
        ResultKind::parse(&self.result_kind)
    }

    /// Whether this page signals end-of-stream.
    pub fn is_eos(&self) -> bool {
        self.result_type() == ResultType::Eos
    }

    /// Whether the gateway reported results as not ready yet.
    pub fn is_not_ready(&self) -> bool {
        self.result_type() == ResultType::NotReady
    }

    /// Column metadata carried by this page (empty when absent).
    pub fn columns(&self) -> &[ColumnInfo] {
        self.results.as_ref().map(|r| r.columns.as_slice()).unwrap_or(&[])
    }

    /// Changelog rows carried by this page (empty when absent).
    pub fn changes(&self) -> &[ChangeRow] {
        self.results.as_ref().map(|r| r.data.as_slice()).unwrap_or(&[])
    }

    /// Parse the numeric pagination token out of the next-page cursor.
    ///
    /// The cursor is a URI whose trailing path segment is the token, e.g.
    /// `/v1/sessions/s/operations/op/result/7` yields `7`. Returns `None`
    /// when the cursor is absent or does not end in a number — callers must
    /// treat that as terminal.
    pub fn next_token(&self) -> Option<u64> {
        let uri = self.next_result_uri.as_deref()?;
        let path = uri.split(['?', '#']).next().unwrap_or(uri);
        let segment = path.trim_end_matches('/').rsplit('/').next()?;
        segment.parse::<u64>().ok()
    }

    // ── Fixture constructors (used heavily in tests) ────────────────────

    /// A content-bearing page.
    pub fn payload(
        columns: Vec<ColumnInfo>,
        data: Vec<ChangeRow>,
        next_result_uri: Option<String>,
    ) -> Self {
        Self {
            result_type: "PAYLOAD".to_string(),
            result_kind: "SUCCESS_WITH_CONTENT".to_string(),
            results: Some(PageResults { columns, data }),
            next_result_uri,
        }
    }

    /// A terminal end-of-stream page.
    pub fn eos() -> Self {
        Self {
            result_type: "EOS".to_string(),
            result_kind: "SUCCESS_WITH_CONTENT".to_string(),
            results: None,
            next_result_uri: None,
        }
    }

    /// A not-ready page pointing at the next poll cursor.
    pub fn not_ready(next_result_uri: Option<String>) -> Self {
        Self {
            result_type: "NOT_READY".to_string(),
            result_kind: "SUCCESS".to_string(),
            results: None,
            next_result_uri,
        }
    }
}
