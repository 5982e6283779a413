//! Data-row normalization into keyed value records.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use tracing::trace;

use super::classify::ValueClassifier;
use super::grid::GridIndex;
use crate::models::config::ReconstructionConfig;
use crate::models::invoice::{InvoiceRow, InvoiceValue, ValueType, column_id};

/// Rows of one table plus the column type map they produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRows {
    pub rows: Vec<InvoiceRow>,
    pub column_types: BTreeMap<usize, ValueType>,
}

/// Turns the data cells below the header block into row records.
pub struct RowNormalizer<'c, C: ValueClassifier> {
    classifier: &'c C,
    config: &'c ReconstructionConfig,
}

impl<'c, C: ValueClassifier> RowNormalizer<'c, C> {
    pub fn new(classifier: &'c C, config: &'c ReconstructionConfig) -> Self {
        Self { classifier, config }
    }

    /// Normalize every non-empty body row of the index, in row order.
    pub fn normalize(&self, index: &GridIndex<'_>) -> NormalizedRows {
        let mut normalized = NormalizedRows::default();

        for (_, cells) in index.body_rows() {
            let mut row = InvoiceRow::default();
            for cell in cells {
                if self.config.is_total_label(cell.content) {
                    row.is_total = true;
                }

                // Buckets are column-sorted, so the first cell of a column wins.
                let Entry::Vacant(slot) = row.values.entry(column_id(cell.column)) else {
                    trace!(
                        "Ignoring duplicate cell #{} at ({}, {})",
                        cell.ordinal, cell.row, cell.column
                    );
                    continue;
                };

                let value_type = self.classifier.classify(cell.content);
                slot.insert(InvoiceValue {
                    value: cell.content.to_string(),
                    value_type,
                });
                normalized.column_types.insert(cell.column, value_type);
            }

            normalized.rows.push(row);
        }

        normalized
    }
}
