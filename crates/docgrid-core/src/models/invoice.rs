//! Processed table models handed to response serialization.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::analysis::{Document, Paragraph};
use crate::table::TableAnomaly;

/// A node of the header hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderColumn {
    /// Header text.
    pub title: String,

    /// First grid column covered by this header.
    pub column: usize,

    /// Number of grid columns covered.
    pub span: usize,

    /// Header row the cell is anchored in (0 for top-level headers).
    pub level: usize,

    /// Sub-headers in column order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HeaderColumn>,
}

impl HeaderColumn {
    /// Create a leaf header.
    pub fn new(title: impl Into<String>, column: usize, span: usize, level: usize) -> Self {
        Self {
            title: title.into(),
            column,
            span,
            level,
            children: Vec::new(),
        }
    }

    /// Attach sub-headers.
    pub fn with_children(mut self, children: Vec<HeaderColumn>) -> Self {
        self.children = children;
        self
    }

    /// Whether the header has no sub-headers.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Depth of the subtree rooted here (1 for a leaf).
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(HeaderColumn::depth).max().unwrap_or(0)
    }
}

/// Coarse semantic type of a cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Amount,
    Percentage,
    Text,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Amount => "amount",
            ValueType::Percentage => "percentage",
            ValueType::Text => "text",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified cell value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceValue {
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

/// One normalized data row, keyed by column identifier (`col_<n>`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRow {
    pub values: BTreeMap<String, InvoiceValue>,
    pub is_total: bool,
}

impl InvoiceRow {
    /// Look up a value by grid column.
    pub fn get(&self, column: usize) -> Option<&InvoiceValue> {
        self.values.get(&column_id(column))
    }
}

/// Stable identifier of a grid column inside a row record.
pub fn column_id(column: usize) -> String {
    format!("col_{}", column)
}

/// A reconstructed table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedInvoice {
    /// Header forest in column order.
    pub headers: Vec<HeaderColumn>,

    /// Data rows in row order.
    pub rows: Vec<InvoiceRow>,

    /// Type of the last value seen in each column.
    pub column_types: BTreeMap<usize, ValueType>,
}

impl ProcessedInvoice {
    /// Label for each column in [`columns`](Self::columns) that sits under a
    /// leaf header, built from the titles on the path from the top-level
    /// header down (`"Item Details / Amount"`).
    pub fn column_labels(&self) -> BTreeMap<usize, String> {
        let leaves = self.leaf_spans();
        self.columns()
            .into_iter()
            .filter_map(|column| {
                leaves
                    .range(..=column)
                    .next_back()
                    .filter(|(_, (end, _))| column < *end)
                    .map(|(_, (_, label))| (column, label.clone()))
            })
            .collect()
    }

    /// Columns anchoring a leaf header or holding at least one value.
    pub fn columns(&self) -> BTreeSet<usize> {
        let mut columns: BTreeSet<usize> = self.column_types.keys().copied().collect();
        columns.extend(self.leaf_spans().into_keys());
        columns
    }

    /// Leaf headers by first column: one past their last column and label.
    fn leaf_spans(&self) -> BTreeMap<usize, (usize, String)> {
        fn walk(node: &HeaderColumn, prefix: &str, out: &mut BTreeMap<usize, (usize, String)>) {
            let label = if prefix.is_empty() {
                node.title.clone()
            } else {
                format!("{} / {}", prefix, node.title)
            };
            if node.is_leaf() {
                out.insert(node.column, (node.column + node.span, label));
            } else {
                for child in &node.children {
                    walk(child, &label, out);
                }
            }
        }

        let mut leaves = BTreeMap::new();
        for header in &self.headers {
            walk(header, "", &mut leaves);
        }
        leaves
    }

    /// Number of rows flagged as totals.
    pub fn total_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.is_total).count()
    }
}

/// What happened to a table that did not come through cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// The table had no header forest and was filtered out.
    DroppedHeaderless,
    /// Reconstruction failed in strict mode; the table was omitted.
    Failed,
    /// The table was kept but some input was skipped or overridden.
    Anomaly,
}

/// A note about one table of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDiagnostic {
    /// Position of the table in the analysis result.
    pub table_index: usize,

    pub kind: DiagnosticKind,

    pub message: String,

    /// Structured detail for anomalies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<TableAnomaly>,
}

/// Document-level result: reconstructed tables plus pass-through content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDocument {
    pub tables: Vec<ProcessedInvoice>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<Document>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paragraphs: Vec<Paragraph>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<TableDiagnostic>,
}

impl ParsedDocument {
    /// Total number of data rows across all tables.
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }

    /// Number of tables dropped or failed.
    pub fn omitted_tables(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.kind != DiagnosticKind::Anomaly)
            .count()
    }

    /// Drop diagnostics from the output.
    pub fn without_diagnostics(mut self) -> Self {
        self.diagnostics.clear();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hierarchical() -> ProcessedInvoice {
        ProcessedInvoice {
            headers: vec![
                HeaderColumn::new("Item Details", 0, 2, 0).with_children(vec![
                    HeaderColumn::new("Description", 0, 1, 1),
                    HeaderColumn::new("Amount", 1, 1, 1),
                ]),
                HeaderColumn::new("Tax", 2, 1, 0),
            ],
            rows: Vec::new(),
            column_types: BTreeMap::new(),
        }
    }

    #[test]
    fn test_column_labels() {
        let labels = hierarchical().column_labels();
        assert_eq!(labels.get(&0).unwrap(), "Item Details / Description");
        assert_eq!(labels.get(&1).unwrap(), "Item Details / Amount");
        assert_eq!(labels.get(&2).unwrap(), "Tax");
    }

    #[test]
    fn test_header_depth() {
        let invoice = hierarchical();
        assert_eq!(invoice.headers[0].depth(), 2);
        assert_eq!(invoice.headers[1].depth(), 1);
        assert_eq!(invoice.columns(), BTreeSet::from([0, 1, 2]));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_wide_leaf_labels_only_used_columns() {
        let mut invoice = ProcessedInvoice {
            headers: vec![HeaderColumn::new("Notes", 0, 1_000_000_000_000, 0)],
            rows: Vec::new(),
            column_types: BTreeMap::new(),
        };
        invoice.column_types.insert(7, ValueType::Text);

        assert_eq!(invoice.columns(), BTreeSet::from([0, 7]));
        assert_eq!(
            invoice.column_labels(),
            BTreeMap::from([(0, "Notes".to_string()), (7, "Notes".to_string())])
        );
    }

    #[test]
    fn test_wire_shape() {
        let mut row = InvoiceRow::default();
        row.values.insert(
            column_id(1),
            InvoiceValue {
                value: "10".to_string(),
                value_type: ValueType::Amount,
            },
        );
        row.is_total = true;

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "values": {"col_1": {"value": "10", "type": "amount"}},
                "isTotal": true
            })
        );

        let leaf = serde_json::to_value(HeaderColumn::new("Tax", 2, 1, 0)).unwrap();
        assert!(leaf.get("children").is_none());
    }
}
