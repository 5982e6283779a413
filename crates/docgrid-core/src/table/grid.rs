//! Grid indexing: validates cells and buckets them by row.

use std::collections::BTreeMap;

use tracing::debug;

use super::anomaly::{CellAnomaly, MalformedReason};
use crate::models::analysis::{Table, TableCell};

/// A validated cell borrowed from its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell<'a> {
    /// Position of the cell in the table's cell list.
    pub ordinal: usize,
    /// Row index (0-based).
    pub row: usize,
    /// Column index (0-based).
    pub column: usize,
    /// Number of rows covered (at least 1).
    pub row_span: usize,
    /// Number of columns covered (at least 1).
    pub column_span: usize,
    /// Cell text.
    pub content: &'a str,
}

impl GridCell<'_> {
    /// One past the last row covered.
    pub fn row_end(&self) -> usize {
        self.row + self.row_span
    }

    /// One past the last column covered.
    pub fn column_end(&self) -> usize {
        self.column + self.column_span
    }

    /// Check if the cell covers a grid position.
    pub fn covers(&self, row: usize, column: usize) -> bool {
        row >= self.row && row < self.row_end() && column >= self.column && column < self.column_end()
    }
}

/// Cells bucketed by row index; each bucket is sorted by column.
pub type RowBuckets<'a> = BTreeMap<usize, Vec<GridCell<'a>>>;

/// Indexed view of one table.
#[derive(Debug, Clone)]
pub struct GridIndex<'a> {
    /// Declared number of rows.
    pub row_count: usize,
    /// Declared number of columns.
    pub column_count: usize,
    /// Header cells by row.
    pub header_rows: RowBuckets<'a>,
    /// Data cells by row.
    pub data_rows: RowBuckets<'a>,
    /// One past the deepest header row (0 without header cells).
    pub header_row_count: usize,
    /// Cells left out of the buckets.
    pub anomalies: Vec<CellAnomaly>,
}

impl<'a> GridIndex<'a> {
    /// Index a table. Malformed cells are recorded, never fatal.
    pub fn build(table: &'a Table) -> Self {
        let mut header_rows = RowBuckets::new();
        let mut data_rows = RowBuckets::new();
        let mut anomalies = Vec::new();

        for (ordinal, cell) in table.cells.iter().enumerate() {
            let grid_cell = match locate(ordinal, cell, table.row_count, table.column_count) {
                Ok(grid_cell) => grid_cell,
                Err(reason) => {
                    debug!(
                        "Skipping cell #{} at ({}, {}): {:?}",
                        ordinal, cell.row_index, cell.column_index, reason
                    );
                    anomalies.push(CellAnomaly {
                        cell: ordinal,
                        row_index: cell.row_index,
                        column_index: cell.column_index,
                        reason,
                    });
                    continue;
                }
            };

            let buckets = if cell.kind.is_header() {
                &mut header_rows
            } else {
                &mut data_rows
            };
            buckets
                .entry(grid_cell.row)
                .or_insert_with(Vec::new)
                .push(grid_cell);
        }

        // Stable sort: equal columns keep input order, which decides conflicts.
        for bucket in header_rows.values_mut().chain(data_rows.values_mut()) {
            bucket.sort_by_key(|c| c.column);
        }

        let header_row_count = header_rows.keys().next_back().map_or(0, |row| row + 1);

        debug!(
            "Indexed {}x{} table: {} header rows, {} data rows, {} anomalies",
            table.row_count,
            table.column_count,
            header_row_count,
            data_rows.len(),
            anomalies.len()
        );

        Self {
            row_count: table.row_count,
            column_count: table.column_count,
            header_rows,
            data_rows,
            header_row_count,
            anomalies,
        }
    }

    /// Header cells of a row, in column order.
    pub fn header_row(&self, row: usize) -> &[GridCell<'a>] {
        self.header_rows.get(&row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Data cells of a row, in column order.
    pub fn data_row(&self, row: usize) -> &[GridCell<'a>] {
        self.data_rows.get(&row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First header cell anchored exactly at a position.
    pub fn header_at(&self, row: usize, column: usize) -> Option<&GridCell<'a>> {
        let cells = self.header_row(row);
        let start = cells.partition_point(|c| c.column < column);
        cells.get(start).filter(|c| c.column == column)
    }

    /// All header cells in (row, column) order.
    pub fn header_cells(&self) -> impl Iterator<Item = &GridCell<'a>> {
        self.header_rows.values().flatten()
    }

    /// Non-empty data rows after the header block, in row order. Only rows
    /// holding cells are visited, whatever the declared row count.
    pub fn body_rows(&self) -> impl Iterator<Item = (usize, &[GridCell<'a>])> {
        self.data_rows
            .range(self.header_row_count..)
            .map(|(row, cells)| (*row, cells.as_slice()))
    }

    /// Whether any header cell exists.
    pub fn has_headers(&self) -> bool {
        self.header_row_count > 0
    }
}

fn locate<'a>(
    ordinal: usize,
    cell: &'a TableCell,
    row_count: usize,
    column_count: usize,
) -> Result<GridCell<'a>, MalformedReason> {
    let row = to_usize(
        cell.row_index,
        MalformedReason::NegativeIndex,
        MalformedReason::RowOutOfRange,
    )?;
    let column = to_usize(
        cell.column_index,
        MalformedReason::NegativeIndex,
        MalformedReason::ColumnOutOfRange,
    )?;
    let row_span = to_usize(
        cell.effective_row_span(),
        MalformedReason::NegativeSpan,
        MalformedReason::RowSpanOverflow,
    )?;
    let column_span = to_usize(
        cell.effective_column_span(),
        MalformedReason::NegativeSpan,
        MalformedReason::ColumnSpanOverflow,
    )?;

    if row >= row_count {
        return Err(MalformedReason::RowOutOfRange);
    }
    if column >= column_count {
        return Err(MalformedReason::ColumnOutOfRange);
    }
    span_end(row, row_span, row_count).ok_or(MalformedReason::RowSpanOverflow)?;
    span_end(column, column_span, column_count).ok_or(MalformedReason::ColumnSpanOverflow)?;

    Ok(GridCell {
        ordinal,
        row,
        column,
        row_span,
        column_span,
        content: &cell.content,
    })
}

/// Values past `usize::MAX` only occur on 32-bit targets and are out of range.
fn to_usize(
    value: i64,
    negative: MalformedReason,
    too_large: MalformedReason,
) -> Result<usize, MalformedReason> {
    usize::try_from(value).map_err(|_| if value < 0 { negative } else { too_large })
}

/// End of a span that must stay within `count`. `usize` is 32 bits on wasm,
/// where a span near `u32::MAX` would wrap.
fn span_end(start: usize, span: usize, count: usize) -> Option<usize> {
    start.checked_add(span).filter(|end| *end <= count)
}
