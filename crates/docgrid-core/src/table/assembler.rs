//! Per-table and per-document orchestration.

use tracing::{debug, info, warn};

use super::anomaly::TableAnomaly;
use super::classify::{LexicalClassifier, ValueClassifier};
use super::flat::{FlatDocument, FlatTable, flatten_table};
use super::grid::GridIndex;
use super::header::{HeaderForest, build_header_forest};
use super::rows::RowNormalizer;
use crate::error::TableError;
use crate::models::analysis::{AnalyzeResult, Table};
use crate::models::config::ReconstructionConfig;
use crate::models::invoice::{DiagnosticKind, ParsedDocument, ProcessedInvoice, TableDiagnostic};

/// A reconstructed table plus everything that was tolerated on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOutcome {
    pub invoice: ProcessedInvoice,
    pub anomalies: Vec<TableAnomaly>,
}

/// What became of one table of a document.
enum TableStep<T> {
    Kept(T, Vec<TableAnomaly>),
    Dropped,
    Failed(TableError),
}

/// Reconstructs tables and whole documents.
#[derive(Debug, Clone)]
pub struct TableAssembler<C: ValueClassifier = LexicalClassifier> {
    config: ReconstructionConfig,
    classifier: C,
}

impl TableAssembler {
    /// Create an assembler with the lexical classifier.
    pub fn new(config: ReconstructionConfig) -> Self {
        Self {
            config,
            classifier: LexicalClassifier::new(),
        }
    }

    /// Create an assembler after checking the configuration.
    pub fn try_new(config: ReconstructionConfig) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }
}

impl Default for TableAssembler {
    fn default() -> Self {
        Self::new(ReconstructionConfig::default())
    }
}

impl<C: ValueClassifier> TableAssembler<C> {
    /// Swap the value classifier.
    pub fn with_classifier<D: ValueClassifier>(self, classifier: D) -> TableAssembler<D> {
        TableAssembler {
            config: self.config,
            classifier,
        }
    }

    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    /// Reconstruct one table.
    ///
    /// In strict mode the first malformed cell or header conflict is
    /// returned as an error; otherwise both are listed in the outcome.
    pub fn process_table(&self, table: &Table) -> Result<TableOutcome, TableError> {
        let (index, forest) = self.prepare(table)?;
        let normalized = RowNormalizer::new(&self.classifier, &self.config).normalize(&index);
        let anomalies = collect_anomalies(&index, &forest);

        Ok(TableOutcome {
            invoice: ProcessedInvoice {
                headers: forest.roots,
                rows: normalized.rows,
                column_types: normalized.column_types,
            },
            anomalies,
        })
    }

    /// Reconstruct every table of an analysis result, in order, and carry
    /// its documents and paragraphs through unchanged.
    pub fn assemble(&self, result: &AnalyzeResult) -> ParsedDocument {
        let steps = result.tables.iter().map(|table| self.hierarchical_step(table));
        let (tables, diagnostics) = fold_steps(steps);

        info!(
            "Assembled {} of {} tables",
            tables.len(),
            result.tables.len()
        );

        ParsedDocument {
            tables,
            documents: result.documents.clone(),
            paragraphs: result.paragraphs.clone(),
            diagnostics,
        }
    }

    /// Same as [`assemble`](Self::assemble) but in the flat layout.
    pub fn assemble_flat(&self, result: &AnalyzeResult) -> FlatDocument {
        let steps = result.tables.iter().map(|table| self.flat_step(table));
        let (tables, diagnostics) = fold_steps(steps);

        info!(
            "Assembled {} of {} tables (flat)",
            tables.len(),
            result.tables.len()
        );

        FlatDocument {
            tables,
            documents: result.documents.clone(),
            paragraphs: result.paragraphs.clone(),
            diagnostics,
        }
    }

    /// Index a table and build its header forest, enforcing strict mode.
    fn prepare<'t>(&self, table: &'t Table) -> Result<(GridIndex<'t>, HeaderForest), TableError> {
        let index = GridIndex::build(table);
        if self.config.strict {
            if let Some(anomaly) = index.anomalies.first() {
                return Err(TableError::MalformedCell(anomaly.clone()));
            }
        }

        let forest = build_header_forest(&index);
        if self.config.strict {
            if let Some(conflict) = forest.conflicts.first() {
                return Err(TableError::AmbiguousHeader(conflict.clone()));
            }
        }

        Ok((index, forest))
    }

    fn hierarchical_step(&self, table: &Table) -> TableStep<ProcessedInvoice> {
        match self.process_table(table) {
            Ok(outcome) if outcome.invoice.headers.is_empty() && self.config.drop_headerless_tables => {
                debug!(
                    "Dropping headerless table with {} rows",
                    outcome.invoice.rows.len()
                );
                TableStep::Dropped
            }
            Ok(outcome) => TableStep::Kept(outcome.invoice, outcome.anomalies),
            Err(e) => TableStep::Failed(e),
        }
    }

    fn flat_step(&self, table: &Table) -> TableStep<FlatTable> {
        match self.prepare(table) {
            Ok((_, forest)) if forest.is_empty() && self.config.drop_headerless_tables => {
                TableStep::Dropped
            }
            Ok((index, forest)) => {
                let anomalies = collect_anomalies(&index, &forest);
                TableStep::Kept(flatten_table(&index), anomalies)
            }
            Err(e) => TableStep::Failed(e),
        }
    }
}

#[cfg(feature = "parallel")]
impl<C: ValueClassifier + Sync> TableAssembler<C> {
    /// [`assemble`](Self::assemble) with tables reconstructed on the rayon
    /// pool. The output is identical to the sequential path.
    pub fn assemble_parallel(&self, result: &AnalyzeResult) -> ParsedDocument {
        use rayon::prelude::*;

        let steps: Vec<_> = result
            .tables
            .par_iter()
            .map(|table| self.hierarchical_step(table))
            .collect();
        let (tables, diagnostics) = fold_steps(steps);

        info!(
            "Assembled {} of {} tables in parallel",
            tables.len(),
            result.tables.len()
        );

        ParsedDocument {
            tables,
            documents: result.documents.clone(),
            paragraphs: result.paragraphs.clone(),
            diagnostics,
        }
    }
}

fn collect_anomalies(index: &GridIndex<'_>, forest: &HeaderForest) -> Vec<TableAnomaly> {
    index
        .anomalies
        .iter()
        .cloned()
        .map(TableAnomaly::from)
        .chain(forest.conflicts.iter().cloned().map(TableAnomaly::from))
        .collect()
}

/// Split table steps into kept tables and diagnostics, preserving order.
fn fold_steps<T>(steps: impl IntoIterator<Item = TableStep<T>>) -> (Vec<T>, Vec<TableDiagnostic>) {
    let mut tables = Vec::new();
    let mut diagnostics = Vec::new();

    for (table_index, step) in steps.into_iter().enumerate() {
        match step {
            TableStep::Kept(table, anomalies) => {
                tables.push(table);
                diagnostics.extend(anomalies.into_iter().map(|anomaly| TableDiagnostic {
                    table_index,
                    kind: DiagnosticKind::Anomaly,
                    message: anomaly.to_string(),
                    anomaly: Some(anomaly),
                }));
            }
            TableStep::Dropped => diagnostics.push(TableDiagnostic {
                table_index,
                kind: DiagnosticKind::DroppedHeaderless,
                message: "table has no column headers".to_string(),
                anomaly: None,
            }),
            TableStep::Failed(e) => {
                warn!("Table {} failed: {}", table_index, e);
                diagnostics.push(TableDiagnostic {
                    table_index,
                    kind: DiagnosticKind::Failed,
                    message: e.to_string(),
                    anomaly: None,
                });
            }
        }
    }

    (tables, diagnostics)
}
