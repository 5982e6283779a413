//! Process command - reconstruct the tables of a single analysis payload.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use docgrid_core::models::invoice::{DiagnosticKind, column_id};
use docgrid_core::{
    DocgridConfig, FlatDocument, FlatTable, HeaderColumn, ParsedDocument, ProcessedInvoice,
    TableAssembler, TableDiagnostic, TableLayout, parse_analysis,
};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input analysis payload (JSON, envelope or bare result)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    #[command(flatten)]
    options: ReconstructionArgs,
}

/// Reconstruction flags shared by `process` and `batch`.
#[derive(Args, Clone, Debug, Default)]
pub struct ReconstructionArgs {
    /// Table layout (default: from config)
    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Keep tables without column headers
    #[arg(long)]
    keep_headerless: bool,

    /// Fail a table on the first malformed cell or header conflict
    #[arg(long)]
    strict: bool,
}

impl ReconstructionArgs {
    /// Overlay the flags on a loaded configuration.
    pub fn apply(&self, mut config: DocgridConfig) -> DocgridConfig {
        if let Some(layout) = self.layout {
            config.output.layout = layout.into();
        }
        if self.pretty {
            config.output.pretty = true;
        }
        if self.keep_headerless {
            config.reconstruction.drop_headerless_tables = false;
        }
        if self.strict {
            config.reconstruction.strict = true;
        }
        config
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one header record per table
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum LayoutArg {
    /// Header tree with rows keyed by column
    Hierarchical,
    /// Single header list with rows keyed by title
    Flat,
}

impl From<LayoutArg> for TableLayout {
    fn from(layout: LayoutArg) -> Self {
        match layout {
            LayoutArg::Hierarchical => TableLayout::Hierarchical,
            LayoutArg::Flat => TableLayout::Flat,
        }
    }
}

/// A processed payload in the configured layout.
pub enum Output {
    Hierarchical(ParsedDocument),
    Flat(FlatDocument),
}

/// Counts reported per processed file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub tables: usize,
    pub rows: usize,
    pub omitted: usize,
    pub anomalies: usize,
}

impl Stats {
    fn collect(tables: usize, rows: usize, diagnostics: &[TableDiagnostic]) -> Self {
        let anomalies = diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Anomaly)
            .count();
        Self {
            tables,
            rows,
            omitted: diagnostics.len() - anomalies,
            anomalies,
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = args.options.apply(super::load_config(config_path)?);

    // Check input file exists
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let (output, stats) = process_file(&args.input, &config)?;
    let rendered = render(&output, args.format, config.output.pretty)?;

    // Write output
    if let Some(output_path) = &args.output {
        fs::write(output_path, &rendered)?;
        println!(
            "{} Output written to {} ({} tables, {} rows)",
            style("✓").green(),
            output_path.display(),
            stats.tables,
            stats.rows
        );
    } else {
        println!("{}", rendered);
    }

    if stats.omitted > 0 {
        eprintln!(
            "{} {} table(s) omitted",
            style("ℹ").blue(),
            stats.omitted
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Read, parse and reconstruct one payload file.
pub fn process_file(path: &Path, config: &DocgridConfig) -> anyhow::Result<(Output, Stats)> {
    let json = fs::read_to_string(path)?;
    let result = parse_analysis(&json)?;
    let assembler = TableAssembler::try_new(config.reconstruction.clone())?;

    let (output, stats) = match config.output.layout {
        TableLayout::Hierarchical => {
            let mut document = assembler.assemble_parallel(&result);
            let stats = Stats::collect(document.tables.len(), document.row_count(), &document.diagnostics);
            if !config.output.include_passthrough {
                document.documents.clear();
                document.paragraphs.clear();
            }
            if !config.output.include_diagnostics {
                document = document.without_diagnostics();
            }
            (Output::Hierarchical(document), stats)
        }
        TableLayout::Flat => {
            let mut document = assembler.assemble_flat(&result);
            let stats = Stats::collect(document.tables.len(), document.row_count(), &document.diagnostics);
            if !config.output.include_passthrough {
                document.documents.clear();
                document.paragraphs.clear();
            }
            if !config.output.include_diagnostics {
                document = document.without_diagnostics();
            }
            (Output::Flat(document), stats)
        }
    };

    debug!(
        "{}: {} tables, {} rows, {} omitted, {} anomalies",
        path.display(),
        stats.tables,
        stats.rows,
        stats.omitted,
        stats.anomalies
    );

    Ok((output, stats))
}

/// Render a processed payload in the requested format.
pub fn render(output: &Output, format: OutputFormat, pretty: bool) -> anyhow::Result<String> {
    match (format, output) {
        (OutputFormat::Json, Output::Hierarchical(document)) => to_json(document, pretty),
        (OutputFormat::Json, Output::Flat(document)) => to_json(document, pretty),
        (OutputFormat::Csv, Output::Hierarchical(document)) => format_csv(&document.tables),
        (OutputFormat::Csv, Output::Flat(document)) => format_flat_csv(&document.tables),
        (OutputFormat::Text, Output::Hierarchical(document)) => Ok(format_text(document)),
        (OutputFormat::Text, Output::Flat(document)) => Ok(format_flat_text(document)),
    }
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

fn format_csv(tables: &[ProcessedInvoice]) -> anyhow::Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(vec![]);

    for (index, table) in tables.iter().enumerate() {
        let labels = table.column_labels();
        let columns = table.columns();

        // Header record: table, one label per used column, is_total
        let mut record = vec!["table".to_string()];
        record.extend(columns.iter().map(|c| labels.get(c).cloned().unwrap_or_else(|| column_id(*c))));
        record.push("is_total".to_string());
        wtr.write_record(&record)?;

        for row in &table.rows {
            let mut record = vec![index.to_string()];
            record.extend(columns.iter().map(|c| row.get(*c).map(|v| v.value.clone()).unwrap_or_default()));
            record.push(row.is_total.to_string());
            wtr.write_record(&record)?;
        }
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_flat_csv(tables: &[FlatTable]) -> anyhow::Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(vec![]);

    for (index, table) in tables.iter().enumerate() {
        // Header titles first, then fallback keys that only rows carry
        let mut columns: Vec<&str> = Vec::new();
        let keys = table.headers.iter().chain(table.rows.iter().flat_map(|r| r.keys()));
        for key in keys {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }

        let mut record = vec!["table"];
        record.extend(columns.iter().copied());
        wtr.write_record(&record)?;

        for row in &table.rows {
            let mut record = vec![index.to_string()];
            record.extend(columns.iter().map(|c| row.get(*c).cloned().unwrap_or_default()));
            wtr.write_record(&record)?;
        }
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(document: &ParsedDocument) -> String {
    let mut output = String::new();

    for (index, table) in document.tables.iter().enumerate() {
        output.push_str(&format!(
            "Table {}: {} rows, {} totals\n",
            index + 1,
            table.rows.len(),
            table.total_rows()
        ));

        output.push_str("Headers:\n");
        for header in &table.headers {
            push_header(&mut output, header);
        }

        let labels = table.column_labels();
        output.push_str("Rows:\n");
        for row in &table.rows {
            let cells: Vec<String> = row
                .values
                .iter()
                .map(|(key, value)| format!("{}={} ({})", key, value.value, value.value_type))
                .collect();
            let marker = if row.is_total { " [total]" } else { "" };
            output.push_str(&format!("  {}{}\n", cells.join(", "), marker));
        }

        if !table.column_types.is_empty() {
            output.push_str("Column types:\n");
            for (column, value_type) in &table.column_types {
                let label = labels.get(column).cloned().unwrap_or_else(|| column_id(*column));
                output.push_str(&format!("  {}: {}\n", label, value_type));
            }
        }
        output.push('\n');
    }

    push_diagnostics(&mut output, &document.diagnostics);
    output
}

fn push_header(output: &mut String, header: &HeaderColumn) {
    let indent = "  ".repeat(header.level + 1);
    let columns = if header.span > 1 {
        format!("cols {}-{}", header.column, header.column + header.span - 1)
    } else {
        format!("col {}", header.column)
    };
    output.push_str(&format!("{}{} [{}]\n", indent, header.title, columns));
    for child in &header.children {
        push_header(output, child);
    }
}

fn format_flat_text(document: &FlatDocument) -> String {
    let mut output = String::new();

    for (index, table) in document.tables.iter().enumerate() {
        output.push_str(&format!(
            "Table {}: {}x{}\n",
            index + 1,
            table.meta.row_count,
            table.meta.column_count
        ));
        output.push_str(&format!("  {}\n", table.headers.join(" | ")));
        for row in &table.rows {
            let cells: Vec<String> = row.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            output.push_str(&format!("  {}\n", cells.join(", ")));
        }
        output.push('\n');
    }

    push_diagnostics(&mut output, &document.diagnostics);
    output
}

fn push_diagnostics(output: &mut String, diagnostics: &[TableDiagnostic]) {
    if diagnostics.is_empty() {
        return;
    }

    // Group by table for readability
    let mut by_table: BTreeMap<usize, Vec<&TableDiagnostic>> = BTreeMap::new();
    for diagnostic in diagnostics {
        by_table.entry(diagnostic.table_index).or_default().push(diagnostic);
    }

    output.push_str("Diagnostics:\n");
    for (table_index, entries) in by_table {
        for diagnostic in entries {
            output.push_str(&format!("  table {}: {}\n", table_index + 1, diagnostic.message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgrid_core::{AnalyzeResult, Table, TableCell};
    use pretty_assertions::assert_eq;

    fn hierarchical_table() -> Table {
        Table::new(
            3,
            3,
            vec![
                TableCell::header(0, 0, "Item Details").with_column_span(2),
                TableCell::header(0, 2, "VAT").with_row_span(2),
                TableCell::header(1, 0, "Description"),
                TableCell::header(1, 1, "Amount"),
                TableCell::content(2, 0, "Pen"),
                TableCell::content(2, 1, "10"),
                TableCell::content(2, 2, "23%"),
            ],
        )
    }

    fn document() -> ParsedDocument {
        TableAssembler::default().assemble(&AnalyzeResult {
            tables: vec![hierarchical_table()],
            ..Default::default()
        })
    }

    #[test]
    fn test_csv_uses_header_paths() {
        let csv = format_csv(&document().tables).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "table,Item Details / Description,Item Details / Amount,VAT,is_total",
                "0,Pen,10,23%,false",
            ]
        );
    }

    #[test]
    fn test_text_shows_header_tree() {
        let text = format_text(&document());
        assert!(text.contains("  Item Details [cols 0-1]\n    Description [col 0]\n"));
        assert!(text.contains("col_2=23% (percentage)"));
    }

    #[test]
    fn test_flat_csv_appends_fallback_columns() {
        let table = Table::new(
            2,
            2,
            vec![
                TableCell::header(0, 0, "Item"),
                TableCell::content(1, 0, "Pen"),
                TableCell::content(1, 1, "3"),
            ],
        );
        let document = TableAssembler::default().assemble_flat(&AnalyzeResult {
            tables: vec![table],
            ..Default::default()
        });
        let csv = format_flat_csv(&document.tables).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec!["table,Item,column_1", "0,Pen,3"]);
    }

    #[test]
    fn test_flags_override_config() {
        let args = ReconstructionArgs {
            layout: Some(LayoutArg::Flat),
            pretty: false,
            keep_headerless: true,
            strict: true,
        };
        let config = args.apply(DocgridConfig::default());
        assert_eq!(config.output.layout, TableLayout::Flat);
        assert!(!config.reconstruction.drop_headerless_tables);
        assert!(config.reconstruction.strict);
        assert!(!config.output.pretty);
    }

    #[test]
    fn test_stats_split_diagnostics() {
        let diagnostics = vec![
            TableDiagnostic {
                table_index: 0,
                kind: DiagnosticKind::DroppedHeaderless,
                message: String::new(),
                anomaly: None,
            },
            TableDiagnostic {
                table_index: 1,
                kind: DiagnosticKind::Anomaly,
                message: String::new(),
                anomaly: None,
            },
        ];
        assert_eq!(
            Stats::collect(1, 4, &diagnostics),
            Stats {
                tables: 1,
                rows: 4,
                omitted: 1,
                anomalies: 1,
            }
        );
    }
}
