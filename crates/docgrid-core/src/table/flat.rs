//! Flat projection: one header list, rows keyed by header title.
//!
//! This is the single-header-row layout. Multi-row headers collapse to the
//! deepest title anchored at each column; spans are ignored.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde::{Deserialize, Serialize};

use super::grid::GridIndex;
use crate::models::analysis::{Document, Paragraph};
use crate::models::invoice::TableDiagnostic;

/// Grid dimensions of a flattened table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatMeta {
    pub row_count: usize,
    pub column_count: usize,
}

/// A table in the flat layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatTable {
    /// Titles of all header cells in (row, column) order.
    pub headers: Vec<String>,
    /// One map per non-empty body row: header title to cell text.
    pub rows: Vec<BTreeMap<String, String>>,
    pub meta: FlatMeta,
}

/// Document-level result in the flat layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatDocument {
    pub tables: Vec<FlatTable>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<Document>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paragraphs: Vec<Paragraph>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<TableDiagnostic>,
}

impl FlatDocument {
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }

    pub fn without_diagnostics(mut self) -> Self {
        self.diagnostics.clear();
        self
    }
}

/// Key used for a data column with no header anchored on it.
pub fn fallback_title(column: usize) -> String {
    format!("column_{}", column)
}

/// Flatten an indexed table.
pub fn flatten_table(index: &GridIndex<'_>) -> FlatTable {
    let headers = index.header_cells().map(|c| c.content.to_string()).collect();

    // Deepest row wins; within a row the first cell of a column wins.
    let mut titles: BTreeMap<usize, (usize, &str)> = BTreeMap::new();
    for cell in index.header_cells() {
        match titles.entry(cell.column) {
            Entry::Vacant(slot) => {
                slot.insert((cell.row, cell.content));
            }
            Entry::Occupied(mut slot) if slot.get().0 < cell.row => {
                slot.insert((cell.row, cell.content));
            }
            Entry::Occupied(_) => {}
        }
    }

    let mut rows = Vec::new();
    for (_, cells) in index.body_rows() {
        let row: BTreeMap<String, String> = cells
            .iter()
            .map(|cell| {
                let title = titles
                    .get(&cell.column)
                    .map(|(_, title)| title.to_string())
                    .unwrap_or_else(|| fallback_title(cell.column));
                (title, cell.content.to_string())
            })
            .collect();
        rows.push(row);
    }

    FlatTable {
        headers,
        rows,
        meta: FlatMeta {
            row_count: index.row_count,
            column_count: index.column_count,
        },
    }
}
