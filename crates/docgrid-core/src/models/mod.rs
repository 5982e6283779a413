//! Data models: analysis payload input, processed output, configuration.

pub mod analysis;
pub mod config;
pub mod invoice;

pub use analysis::{AnalysisPayload, AnalyzeOperation, AnalyzeResult, CellKind, Table, TableCell};
pub use config::{DocgridConfig, OutputConfig, ReconstructionConfig, TableLayout};
pub use invoice::{
    DiagnosticKind, HeaderColumn, InvoiceRow, InvoiceValue, ParsedDocument, ProcessedInvoice,
    TableDiagnostic, ValueType,
};
