use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use docgrid_core::models::invoice::{DiagnosticKind, column_id};
use docgrid_core::table::GridIndex;
use docgrid_core::{
    AnalyzeResult, DocgridError, HeaderColumn, PayloadError, ReconstructionConfig,
    Table, TableAssembler, TableCell, ValueType, parse_analysis, process_analysis, process_table,
};
use pretty_assertions::assert_eq;

const FIXTURE: &str = include_str!("fixtures/analyze_operation.json");

fn fixture() -> AnalyzeResult {
    parse_analysis(FIXTURE).unwrap()
}

#[test]
fn test_scenario_a_end_to_end() {
    let result = fixture();
    let invoice = process_table(&result.tables[0]);

    assert_eq!(
        invoice.headers,
        vec![HeaderColumn::new("Item", 0, 1, 0), HeaderColumn::new("Amount", 1, 1, 0)]
    );
    assert_eq!(invoice.rows.len(), 2);

    let first = &invoice.rows[0];
    assert_eq!(first.get(0).unwrap().value, "Pen");
    assert_eq!(first.get(0).unwrap().value_type, ValueType::Text);
    assert_eq!(first.get(1).unwrap().value, "10");
    assert_eq!(first.get(1).unwrap().value_type, ValueType::Amount);
    assert!(!first.is_total);

    let second = &invoice.rows[1];
    assert_eq!(second.get(0).unwrap().value, "Total");
    assert!(second.is_total);
}

#[test]
fn test_scenario_b_hierarchy() {
    let result = fixture();
    let invoice = process_table(&result.tables[2]);

    assert_eq!(
        invoice.headers,
        vec![
            HeaderColumn::new("Item Details", 0, 2, 0).with_children(vec![
                HeaderColumn::new("Description", 0, 1, 1),
                HeaderColumn::new("Amount", 1, 1, 1),
            ]),
            HeaderColumn::new("VAT", 2, 1, 0),
        ]
    );

    let labels = invoice.column_labels();
    assert_eq!(labels[&1], "Item Details / Amount");
    assert_eq!(labels[&2], "VAT");

    // Row 3 is empty and skipped; the grand total row is flagged.
    assert_eq!(invoice.rows.len(), 2);
    assert!(invoice.rows[1].is_total);
    assert_eq!(invoice.rows[0].get(2).unwrap().value_type, ValueType::Percentage);
    // Last write wins: "n/a" follows "23%".
    assert_eq!(invoice.column_types[&2], ValueType::Text);
}

#[test]
fn test_document_drops_headerless_table() {
    let document = process_analysis(&fixture());

    assert_eq!(document.tables.len(), 2);
    assert_eq!(document.tables[0].headers[0].title, "Item");
    assert_eq!(document.tables[1].headers[0].title, "Item Details");
    assert_eq!(document.diagnostics.len(), 1);
    assert_eq!(document.diagnostics[0].table_index, 1);
    assert_eq!(document.diagnostics[0].kind, DiagnosticKind::DroppedHeaderless);

    assert_eq!(document.paragraphs.len(), 1);
    assert_eq!(document.documents[0].doc_type, "invoice");
    assert!(document.documents[0].fields.contains_key("InvoiceId"));
}

#[test]
fn test_document_keeps_headerless_table_on_request() {
    let assembler = TableAssembler::new(ReconstructionConfig {
        drop_headerless_tables: false,
        ..Default::default()
    });
    let document = assembler.assemble(&fixture());

    assert_eq!(document.tables.len(), 3);
    assert!(document.tables[1].headers.is_empty());
    assert_eq!(document.tables[1].rows[0].get(0).unwrap().value, "Bank");
    assert_eq!(document.omitted_tables(), 0);
}

#[test]
fn test_assembly_is_idempotent() {
    let result = fixture();
    let assembler = TableAssembler::default();
    assert_eq!(assembler.assemble(&result), assembler.assemble(&result));
}

#[test]
fn test_row_count_invariant() {
    let result = fixture();
    for table in &result.tables {
        let index = GridIndex::build(table);
        let empty_rows = (index.header_row_count..table.row_count)
            .filter(|row| index.data_row(*row).is_empty())
            .count();
        let expected = table.row_count - index.header_row_count - empty_rows;
        assert_eq!(process_table(table).rows.len(), expected);
    }
}

#[test]
fn test_top_level_spans_cover_columns() {
    let result = fixture();
    for table in [&result.tables[0], &result.tables[2]] {
        let covered: usize = process_table(table).headers.iter().map(|h| h.span).sum();
        assert_eq!(covered, table.column_count);
    }
}

#[test]
fn test_strict_mode_isolates_failures() {
    let mut result = fixture();
    result.tables[0]
        .cells
        .push(TableCell::content(1, 9, "off the grid"));

    let strict = TableAssembler::new(ReconstructionConfig {
        strict: true,
        ..Default::default()
    });
    let document = strict.assemble(&result);

    assert_eq!(document.tables.len(), 1);
    assert_eq!(document.tables[0].headers[0].title, "Item Details");
    let kinds: Vec<_> = document.diagnostics.iter().map(|d| (d.table_index, d.kind.clone())).collect();
    assert_eq!(
        kinds,
        vec![(0, DiagnosticKind::Failed), (1, DiagnosticKind::DroppedHeaderless)]
    );

    // Lenient mode keeps the table and skips the cell.
    let lenient = TableAssembler::default().assemble(&result);
    assert_eq!(lenient.tables.len(), 2);
    assert_eq!(lenient.tables[0].rows[0].values.len(), 2);
    assert_eq!(lenient.diagnostics[0].kind, DiagnosticKind::Anomaly);
}

#[test]
fn test_unfinished_operation_is_rejected() {
    let running = r#"{"status": "running", "createdDateTime": "2024-03-18T09:12:44Z"}"#;
    match parse_analysis(running) {
        Err(DocgridError::Payload(PayloadError::NotSucceeded { status })) => {
            assert_eq!(status, "running")
        }
        other => panic!("expected NotSucceeded, got {:?}", other),
    }

    let empty = r#"{"status": "succeeded"}"#;
    assert!(matches!(
        parse_analysis(empty),
        Err(DocgridError::Payload(PayloadError::MissingResult))
    ));
}

#[test]
fn test_bare_result_matches_envelope() {
    let envelope: serde_json::Value = serde_json::from_str(FIXTURE).unwrap();
    let bare = envelope["analyzeResult"].to_string();
    assert_eq!(parse_analysis(&bare).unwrap(), fixture());
}

#[test]
#[cfg(target_pointer_width = "64")]
fn test_declared_size_does_not_drive_work() {
    const HUGE: usize = 1_000_000_000_000;
    let sparse = |rows: usize, columns: usize| {
        Table::new(
            rows,
            columns,
            vec![TableCell::header(0, 0, "Item"), TableCell::content(1, 0, "Pen")],
        )
    };
    let mut result = fixture();
    result.tables = vec![sparse(HUGE, 2), sparse(2, HUGE), result.tables[0].clone()];

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let hierarchical = TableAssembler::default().assemble(&result);
        let flat = TableAssembler::default().assemble_flat(&result);
        let _ = tx.send((hierarchical, flat));
    });
    let (document, flat) = rx
        .recv_timeout(Duration::from_secs(20))
        .expect("reconstruction should not depend on the declared grid size");

    assert_eq!(document.tables.len(), 3);
    for invoice in &document.tables[..2] {
        assert_eq!(invoice.headers, vec![HeaderColumn::new("Item", 0, 1, 0)]);
        assert_eq!(invoice.rows.len(), 1);
        assert_eq!(invoice.rows[0].get(0).unwrap().value, "Pen");
    }
    assert_eq!(flat.tables[0].rows[0]["Item"], "Pen");
    assert_eq!(flat.tables[1].meta.column_count, HUGE);
}

#[test]
fn test_serialized_document_shape() {
    let document = process_analysis(&fixture());
    let json = serde_json::to_value(&document).unwrap();

    let first_row = &json["tables"][0]["rows"][0];
    assert_eq!(first_row["values"][column_id(1)]["type"], "amount");
    assert_eq!(first_row["isTotal"], false);
    assert_eq!(json["tables"][0]["columnTypes"]["0"], "text");
    assert_eq!(json["diagnostics"][0]["kind"], "droppedHeaderless");
}

#[test]
fn test_flat_layout() {
    let document = TableAssembler::default().assemble_flat(&fixture());

    assert_eq!(document.tables.len(), 2);
    let hierarchy = &document.tables[1];
    assert_eq!(hierarchy.headers, vec!["Item Details", "VAT", "Description", "Amount"]);
    assert_eq!(hierarchy.rows[0]["Description"], "Paper");
    assert_eq!(hierarchy.rows[0]["VAT"], "23%");
    assert_eq!(hierarchy.meta.row_count, 5);
}

#[tokio::test]
async fn test_tables_processed_concurrently() {
    let result = Arc::new(fixture());
    let sequential = process_analysis(&result);

    let mut handles = Vec::new();
    for i in 0..result.tables.len() {
        let result = Arc::clone(&result);
        handles.push(tokio::task::spawn_blocking(move || process_table(&result.tables[i])));
    }

    let mut concurrent = Vec::new();
    for handle in handles {
        let invoice = handle.await.unwrap();
        if !invoice.headers.is_empty() {
            concurrent.push(invoice);
        }
    }

    assert_eq!(concurrent, sequential.tables);
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_matches_sequential() {
    let mut result = fixture();
    let extra: Vec<docgrid_core::Table> = result.tables.iter().cycle().take(30).cloned().collect();
    result.tables.extend(extra);

    let assembler = TableAssembler::default();
    assert_eq!(assembler.assemble_parallel(&result), assembler.assemble(&result));
}
