//! Analysis payload models as returned by the document-analysis service.
//!
//! Field names follow the service's camelCase wire format. Everything the
//! reconstruction does not look at (pages, styles, sections, figures) is
//! kept as opaque JSON so a payload round-trips without loss.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PayloadError;

/// Role of a cell within a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CellKind {
    /// Ordinary body cell (the service omits `kind` for these).
    #[default]
    Content,
    /// Column header cell.
    ColumnHeader,
    /// Row header cell inside the body.
    RowHeader,
    /// Top-left corner cell above the row headers.
    StubHead,
    /// Caption or footnote cell.
    Description,
    /// Any kind this crate does not know about.
    #[serde(other)]
    Unknown,
}

impl CellKind {
    /// Whether the cell belongs to the column header block.
    pub fn is_header(&self) -> bool {
        matches!(self, CellKind::ColumnHeader | CellKind::StubHead)
    }
}

/// A single cell of an analysed table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    /// Cell role.
    #[serde(default)]
    pub kind: CellKind,

    /// Row of the top-left corner. Signed so malformed input can be reported.
    pub row_index: i64,

    /// Column of the top-left corner.
    pub column_index: i64,

    /// Number of rows covered; absent means 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_span: Option<i64>,

    /// Number of columns covered; absent means 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_span: Option<i64>,

    /// Text content.
    #[serde(default)]
    pub content: String,
}

impl TableCell {
    /// Create a body cell with unit spans.
    pub fn content(row: i64, column: i64, content: impl Into<String>) -> Self {
        Self {
            kind: CellKind::Content,
            row_index: row,
            column_index: column,
            row_span: None,
            column_span: None,
            content: content.into(),
        }
    }

    /// Create a column header cell with unit spans.
    pub fn header(row: i64, column: i64, content: impl Into<String>) -> Self {
        Self {
            kind: CellKind::ColumnHeader,
            ..Self::content(row, column, content)
        }
    }

    /// Set the row span.
    pub fn with_row_span(mut self, span: i64) -> Self {
        self.row_span = Some(span);
        self
    }

    /// Set the column span.
    pub fn with_column_span(mut self, span: i64) -> Self {
        self.column_span = Some(span);
        self
    }

    /// Row span with the service's defaulting applied (missing or 0 means 1).
    pub fn effective_row_span(&self) -> i64 {
        normalize_span(self.row_span)
    }

    /// Column span with the service's defaulting applied.
    pub fn effective_column_span(&self) -> i64 {
        normalize_span(self.column_span)
    }
}

fn normalize_span(span: Option<i64>) -> i64 {
    match span {
        None | Some(0) => 1,
        Some(n) => n,
    }
}

/// A table as emitted by the analysis service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Declared number of rows.
    pub row_count: usize,

    /// Declared number of columns.
    pub column_count: usize,

    /// Cells in no particular order.
    #[serde(default)]
    pub cells: Vec<TableCell>,
}

impl Table {
    /// Create a table from its dimensions and cells.
    pub fn new(row_count: usize, column_count: usize, cells: Vec<TableCell>) -> Self {
        Self {
            row_count,
            column_count,
            cells,
        }
    }
}

/// Location of an element on a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingRegion {
    pub page_number: u32,
    #[serde(default)]
    pub polygon: Vec<f64>,
}

/// Character range into the result's `content`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub offset: usize,
    pub length: usize,
}

/// A block of running text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    pub content: String,

    #[serde(default)]
    pub bounding_regions: Vec<BoundingRegion>,

    #[serde(default)]
    pub spans: Vec<Span>,

    /// Semantic role such as `title` or `pageHeader`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// A document recognised by a prebuilt model (e.g. an invoice) with its
/// extracted fields. Fields are passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub doc_type: String,

    #[serde(default)]
    pub bounding_regions: Vec<BoundingRegion>,

    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub confidence: f64,

    #[serde(default)]
    pub spans: Vec<Span>,
}

/// Body of a completed analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzeResult {
    pub api_version: String,
    pub model_id: String,
    pub string_index_type: String,
    pub content: String,
    pub content_format: String,
    pub pages: Vec<serde_json::Value>,
    pub tables: Vec<Table>,
    pub paragraphs: Vec<Paragraph>,
    pub documents: Vec<Document>,
    pub styles: Vec<serde_json::Value>,
    pub sections: Vec<serde_json::Value>,
    pub figures: Vec<serde_json::Value>,
}

/// Lifecycle state of an analysis job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Canceled,
    #[serde(untagged)]
    Other(String),
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::NotStarted => write!(f, "notStarted"),
            OperationStatus::Running => write!(f, "running"),
            OperationStatus::Succeeded => write!(f, "succeeded"),
            OperationStatus::Failed => write!(f, "failed"),
            OperationStatus::Canceled => write!(f, "canceled"),
            OperationStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Envelope returned when polling an analysis operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOperation {
    pub status: OperationStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_date_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze_result: Option<AnalyzeResult>,

    /// Service error details for failed operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl AnalyzeOperation {
    /// Unwrap the result of a succeeded operation.
    pub fn into_result(self) -> Result<AnalyzeResult, PayloadError> {
        if self.status != OperationStatus::Succeeded {
            return Err(PayloadError::NotSucceeded {
                status: self.status.to_string(),
            });
        }
        self.analyze_result.ok_or(PayloadError::MissingResult)
    }
}

/// Either a polling envelope or a bare result body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisPayload {
    Operation(AnalyzeOperation),
    Result(AnalyzeResult),
}

impl AnalysisPayload {
    /// Parse a payload from JSON text.
    ///
    /// A top-level `status` key selects the envelope form, so a broken
    /// `analyzeResult` inside an envelope is an error rather than an empty
    /// bare result.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if value.get("status").is_some() {
            Ok(AnalysisPayload::Operation(serde_json::from_value(value)?))
        } else {
            Ok(AnalysisPayload::Result(serde_json::from_value(value)?))
        }
    }

    /// Resolve to the analysis result, rejecting unfinished operations.
    pub fn into_result(self) -> Result<AnalyzeResult, PayloadError> {
        match self {
            AnalysisPayload::Operation(op) => op.into_result(),
            AnalysisPayload::Result(result) => Ok(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cell_defaults() {
        let cell: TableCell =
            serde_json::from_str(r#"{"rowIndex": 2, "columnIndex": 1, "content": "10"}"#).unwrap();
        assert_eq!(cell.kind, CellKind::Content);
        assert_eq!(cell.effective_row_span(), 1);
        assert_eq!(cell.effective_column_span(), 1);
    }

    #[test]
    fn test_cell_kinds() {
        let cell: TableCell = serde_json::from_str(
            r#"{"kind": "columnHeader", "rowIndex": 0, "columnIndex": 0, "columnSpan": 2, "content": "Item"}"#,
        )
        .unwrap();
        assert!(cell.kind.is_header());
        assert_eq!(cell.effective_column_span(), 2);

        let stub: TableCell =
            serde_json::from_str(r#"{"kind": "stubHead", "rowIndex": 0, "columnIndex": 0, "content": ""}"#)
                .unwrap();
        assert!(stub.kind.is_header());

        let odd: TableCell =
            serde_json::from_str(r#"{"kind": "sideNote", "rowIndex": 0, "columnIndex": 0, "content": ""}"#)
                .unwrap();
        assert_eq!(odd.kind, CellKind::Unknown);
        assert!(!odd.kind.is_header());
    }

    #[test]
    fn test_zero_span_means_one() {
        let cell = TableCell::content(0, 0, "x").with_row_span(0);
        assert_eq!(cell.effective_row_span(), 1);
    }

    #[test]
    fn test_envelope_status() {
        let running = r#"{"status": "running", "createdDateTime": "2024-11-28T10:00:00Z"}"#;
        let payload = AnalysisPayload::from_json(running).unwrap();
        assert_eq!(
            payload.into_result(),
            Err(PayloadError::NotSucceeded {
                status: "running".to_string()
            })
        );

        let empty = r#"{"status": "succeeded"}"#;
        let payload = AnalysisPayload::from_json(empty).unwrap();
        assert_eq!(payload.into_result(), Err(PayloadError::MissingResult));
    }

    #[test]
    fn test_broken_envelope_is_an_error() {
        let json = r#"{"status": "succeeded", "analyzeResult": {"tables": [{"rowCount": "two"}]}}"#;
        assert!(AnalysisPayload::from_json(json).is_err());
    }

    #[test]
    fn test_bare_result_accepted() {
        let json = r#"{"modelId": "prebuilt-layout", "tables": [{"rowCount": 1, "columnCount": 1, "cells": []}]}"#;
        let result = AnalysisPayload::from_json(json).unwrap().into_result().unwrap();
        assert_eq!(result.model_id, "prebuilt-layout");
        assert_eq!(result.tables.len(), 1);
    }
}
