//! Input problems tolerated during reconstruction.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a cell does not fit the declared grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MalformedReason {
    /// Row or column index below zero.
    NegativeIndex,
    /// Row or column span below zero.
    NegativeSpan,
    /// Row index at or past `rowCount`.
    RowOutOfRange,
    /// Column index at or past `columnCount`.
    ColumnOutOfRange,
    /// Row span reaches past the last row.
    RowSpanOverflow,
    /// Column span reaches past the last column.
    ColumnSpanOverflow,
}

impl MalformedReason {
    fn describe(&self) -> &'static str {
        match self {
            MalformedReason::NegativeIndex => "negative index",
            MalformedReason::NegativeSpan => "negative span",
            MalformedReason::RowOutOfRange => "row index out of range",
            MalformedReason::ColumnOutOfRange => "column index out of range",
            MalformedReason::RowSpanOverflow => "row span extends beyond the grid",
            MalformedReason::ColumnSpanOverflow => "column span extends beyond the grid",
        }
    }
}

/// A cell skipped because it does not fit the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellAnomaly {
    /// Position of the cell in the table's cell list.
    pub cell: usize,
    pub row_index: i64,
    pub column_index: i64,
    pub reason: MalformedReason,
}

impl fmt::Display for CellAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cell #{} at ({}, {}): {}",
            self.cell,
            self.row_index,
            self.column_index,
            self.reason.describe()
        )
    }
}

/// Why a header cell is missing from the header forest, or placed only in part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictReason {
    /// Its anchor position was already claimed by an earlier header.
    Overlap,
    /// No top-level header leads to it (e.g. it sits below an unnamed gap).
    Orphan,
    /// Placed, but part of its footprint was already claimed.
    Clipped,
}

/// A header cell left out of the header forest or clipped inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderConflict {
    /// Position of the cell in the table's cell list.
    pub cell: usize,
    pub row: usize,
    pub column: usize,
    pub title: String,
    pub reason: ConflictReason,
}

impl fmt::Display for HeaderConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.reason {
            ConflictReason::Overlap => "position already claimed by another header",
            ConflictReason::Orphan => "not reachable from a top-level header",
            ConflictReason::Clipped => "span runs into positions claimed by an earlier header",
        };
        write!(
            f,
            "header {:?} at ({}, {}): {}",
            self.title, self.row, self.column, reason
        )
    }
}

/// Any anomaly recorded while reconstructing a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TableAnomaly {
    MalformedCell(CellAnomaly),
    HeaderConflict(HeaderConflict),
}

impl fmt::Display for TableAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableAnomaly::MalformedCell(a) => write!(f, "skipped malformed {}", a),
            TableAnomaly::HeaderConflict(c) if c.reason == ConflictReason::Clipped => {
                write!(f, "clipped {}", c)
            }
            TableAnomaly::HeaderConflict(c) => write!(f, "dropped {}", c),
        }
    }
}

impl From<CellAnomaly> for TableAnomaly {
    fn from(anomaly: CellAnomaly) -> Self {
        TableAnomaly::MalformedCell(anomaly)
    }
}

impl From<HeaderConflict> for TableAnomaly {
    fn from(conflict: HeaderConflict) -> Self {
        TableAnomaly::HeaderConflict(conflict)
    }
}
