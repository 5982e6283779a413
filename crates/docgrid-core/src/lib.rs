//! Core library for reconstructing tables from document-analysis output.
//!
//! This crate provides:
//! - Models for the analysis payload (operation envelope and result body)
//! - Grid indexing of span-annotated table cells
//! - Header hierarchy reconstruction from multi-row, spanning headers
//! - Row normalization with coarse value typing and total-row detection
//! - Document assembly with per-table diagnostics and a flat layout

pub mod error;
pub mod models;
pub mod table;

pub use error::{DocgridError, PayloadError, Result, TableError};
pub use models::analysis::{AnalysisPayload, AnalyzeOperation, AnalyzeResult, Table, TableCell};
pub use models::config::{DocgridConfig, ReconstructionConfig, TableLayout};
pub use models::invoice::{
    HeaderColumn, InvoiceRow, InvoiceValue, ParsedDocument, ProcessedInvoice, TableDiagnostic,
    ValueType,
};
pub use table::{
    FlatDocument, FlatTable, GridIndex, LexicalClassifier, TableAnomaly, TableAssembler,
    ValueClassifier, classify, process_analysis, process_table,
};

/// Parse an analysis payload (envelope or bare result) and resolve it to
/// its result body.
pub fn parse_analysis(json: &str) -> Result<AnalyzeResult> {
    Ok(AnalysisPayload::from_json(json)?.into_result()?)
}
