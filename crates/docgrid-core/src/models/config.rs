//! Configuration structures for table reconstruction and output.

use serde::{Deserialize, Serialize};

use crate::error::DocgridError;

/// Main configuration for docgrid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocgridConfig {
    /// Table reconstruction configuration.
    pub reconstruction: ReconstructionConfig,

    /// Output configuration.
    pub output: OutputConfig,
}

/// Table reconstruction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    /// Omit tables whose header forest is empty, even when they carry rows.
    pub drop_headerless_tables: bool,

    /// Fail a table on the first malformed cell or header conflict instead of
    /// skipping the offending cell.
    pub strict: bool,

    /// Cell contents that mark a row as a total row (exact, case-sensitive).
    pub total_labels: Vec<String>,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            drop_headerless_tables: true,
            strict: false,
            total_labels: vec!["Total".to_string(), "Grand Total".to_string()],
        }
    }
}

impl ReconstructionConfig {
    /// Whether a cell's content marks its row as a total.
    pub fn is_total_label(&self, content: &str) -> bool {
        self.total_labels.iter().any(|label| label == content)
    }

    /// Reject settings that would misclassify rows.
    pub fn validate(&self) -> crate::Result<()> {
        // An empty label would flag every row that has an empty cell.
        if self.total_labels.iter().any(|label| label.is_empty()) {
            return Err(DocgridError::Config(
                "reconstruction.total_labels must not contain empty labels".to_string(),
            ));
        }
        Ok(())
    }
}

/// Shape of the emitted tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableLayout {
    /// Header forest with typed row records.
    #[default]
    Hierarchical,
    /// Single header list with rows keyed by header title.
    Flat,
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Table layout.
    pub layout: TableLayout,

    /// Pretty-print JSON output.
    pub pretty: bool,

    /// Include per-table diagnostics in the output document.
    pub include_diagnostics: bool,

    /// Include paragraphs and extracted document fields.
    pub include_passthrough: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            layout: TableLayout::Hierarchical,
            pretty: false,
            include_diagnostics: true,
            include_passthrough: true,
        }
    }
}

impl DocgridConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
