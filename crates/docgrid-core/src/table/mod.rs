//! Table reconstruction.
//!
//! Turns the flat, span-annotated cell list of an analysis table into a
//! header hierarchy plus keyed, typed data rows.

pub mod anomaly;
pub mod assembler;
pub mod classify;
pub mod flat;
pub mod grid;
pub mod header;
pub mod rows;

pub use anomaly::{CellAnomaly, ConflictReason, HeaderConflict, MalformedReason, TableAnomaly};
pub use assembler::{TableAssembler, TableOutcome};
pub use classify::{LexicalClassifier, ValueClassifier, classify};
pub use flat::{FlatDocument, FlatMeta, FlatTable};
pub use grid::{GridCell, GridIndex};
pub use header::{HeaderForest, build_header_forest};
pub use rows::{NormalizedRows, RowNormalizer};

use crate::models::analysis::{AnalyzeResult, Table};
use crate::models::config::ReconstructionConfig;
use crate::models::invoice::{ParsedDocument, ProcessedInvoice};

/// Reconstruct one table with the default lenient settings.
pub fn process_table(table: &Table) -> ProcessedInvoice {
    let index = GridIndex::build(table);
    let forest = build_header_forest(&index);
    let config = ReconstructionConfig::default();
    let normalized = RowNormalizer::new(&LexicalClassifier, &config).normalize(&index);

    ProcessedInvoice {
        headers: forest.roots,
        rows: normalized.rows,
        column_types: normalized.column_types,
    }
}

/// Reconstruct every table of a result with the default settings.
pub fn process_analysis(result: &AnalyzeResult) -> ParsedDocument {
    TableAssembler::default().assemble(result)
}
