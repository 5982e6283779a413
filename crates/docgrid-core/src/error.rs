//! Error types for the docgrid-core library.

use thiserror::Error;

use crate::table::{CellAnomaly, HeaderConflict};

/// Main error type for the docgrid library.
#[derive(Error, Debug)]
pub enum DocgridError {
    /// The analysis payload cannot be reconstructed.
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),

    /// A single table failed reconstruction.
    #[error("table error: {0}")]
    Table(#[from] TableError),

    /// Malformed JSON input.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to the analysis envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// The analysis job has not reached the `succeeded` state.
    #[error("analysis operation is not complete (status: {status})")]
    NotSucceeded { status: String },

    /// The envelope reports success but carries no result body.
    #[error("analysis operation succeeded without an analyzeResult")]
    MissingResult,
}

/// Errors raised while reconstructing one table.
///
/// These only surface in strict mode; the lenient path turns the same
/// conditions into diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// A cell lies outside the declared grid.
    #[error("malformed cell: {0}")]
    MalformedCell(CellAnomaly),

    /// Two header cells claim the same grid position, or a header cell is
    /// unreachable from the top header row.
    #[error("ambiguous header: {0}")]
    AmbiguousHeader(HeaderConflict),
}

/// Result type for the docgrid library.
pub type Result<T> = std::result::Result<T, DocgridError>;
