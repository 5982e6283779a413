//! WASM bindings for document-analysis table reconstruction.
//!
//! This crate provides WebAssembly bindings for use in browsers and Node.js.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use docgrid_core::{
    FlatDocument, ParsedDocument, ProcessedInvoice, ReconstructionConfig, Table, TableAssembler,
    parse_analysis, process_table,
};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Reconstruct every table of an analysis payload (envelope or bare result).
#[wasm_bindgen(js_name = processAnalysis)]
pub fn process_analysis(json: &str, keep_headerless: bool, strict: bool) -> Result<JsValue, JsValue> {
    let config = ReconstructionConfig {
        drop_headerless_tables: !keep_headerless,
        strict,
        ..Default::default()
    };
    let document = assemble_json(json, &config).map_err(|e| JsValue::from_str(&e))?;
    to_js(&document)
}

/// Reconstruct a single table given as `{rowCount, columnCount, cells}`.
#[wasm_bindgen(js_name = processTable)]
pub fn process_table_json(json: &str) -> Result<JsValue, JsValue> {
    let invoice = table_from_json(json).map_err(|e| JsValue::from_str(&e))?;
    to_js(&invoice)
}

/// Classify cell text as `amount`, `percentage` or `text`.
#[wasm_bindgen(js_name = classifyValue)]
pub fn classify_value(content: &str) -> String {
    docgrid_core::classify(content).as_str().to_string()
}

/// Table reconstructor class for browser use.
#[wasm_bindgen]
pub struct TableReconstructor {
    config: ReconstructionConfig,
}

#[wasm_bindgen]
impl TableReconstructor {
    /// Create a reconstructor with the default settings.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            config: ReconstructionConfig::default(),
        }
    }

    /// Keep tables without column headers.
    #[wasm_bindgen(js_name = setKeepHeaderless)]
    pub fn set_keep_headerless(&mut self, keep: bool) {
        self.config.drop_headerless_tables = !keep;
    }

    /// Fail a table on the first malformed cell or header conflict.
    #[wasm_bindgen(js_name = setStrict)]
    pub fn set_strict(&mut self, strict: bool) {
        self.config.strict = strict;
    }

    /// Replace the labels that mark a total row. Empty labels are rejected.
    #[wasm_bindgen(js_name = setTotalLabels)]
    pub fn set_total_labels(&mut self, labels: js_sys::Array) -> Result<(), JsValue> {
        let labels = labels.iter().filter_map(|v| v.as_string()).collect();
        self.config = with_total_labels(&self.config, labels).map_err(|e| JsValue::from_str(&e))?;
        Ok(())
    }

    /// Reconstruct a payload in the hierarchical layout.
    #[wasm_bindgen]
    pub fn process(&self, json: &str) -> Result<JsValue, JsValue> {
        let document = assemble_json(json, &self.config).map_err(|e| JsValue::from_str(&e))?;
        to_js(&document)
    }

    /// Reconstruct a payload in the flat layout.
    #[wasm_bindgen(js_name = processFlat)]
    pub fn process_flat(&self, json: &str) -> Result<JsValue, JsValue> {
        let document = assemble_flat_json(json, &self.config).map_err(|e| JsValue::from_str(&e))?;
        to_js(&document)
    }
}

impl Default for TableReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps keyed by column index become plain objects, as in the JSON output.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn with_total_labels(
    config: &ReconstructionConfig,
    total_labels: Vec<String>,
) -> Result<ReconstructionConfig, String> {
    let config = ReconstructionConfig {
        total_labels,
        ..config.clone()
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn checked_assembler(config: &ReconstructionConfig) -> Result<TableAssembler, String> {
    TableAssembler::try_new(config.clone()).map_err(|e| e.to_string())
}

fn assemble_json(json: &str, config: &ReconstructionConfig) -> Result<ParsedDocument, String> {
    let assembler = checked_assembler(config)?;
    let result = parse_analysis(json).map_err(|e| e.to_string())?;
    Ok(assembler.assemble(&result))
}

fn assemble_flat_json(json: &str, config: &ReconstructionConfig) -> Result<FlatDocument, String> {
    let assembler = checked_assembler(config)?;
    let result = parse_analysis(json).map_err(|e| e.to_string())?;
    Ok(assembler.assemble_flat(&result))
}

fn table_from_json(json: &str) -> Result<ProcessedInvoice, String> {
    let table: Table = serde_json::from_str(json).map_err(|e| e.to_string())?;
    Ok(process_table(&table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAYLOAD: &str = r#"{
        "status": "succeeded",
        "analyzeResult": {
            "tables": [
                {"rowCount": 2, "columnCount": 1, "cells": [
                    {"kind": "columnHeader", "rowIndex": 0, "columnIndex": 0, "content": "Amount"},
                    {"rowIndex": 1, "columnIndex": 0, "content": "12%"}
                ]},
                {"rowCount": 1, "columnCount": 1, "cells": [
                    {"rowIndex": 0, "columnIndex": 0, "content": "loose"}
                ]}
            ]
        }
    }"#;

    #[test]
    fn test_classify_value() {
        assert_eq!(classify_value("25%"), "percentage");
        assert_eq!(classify_value("1,200.50"), "amount");
        assert_eq!(classify_value(""), "text");
    }

    #[test]
    fn test_assemble_json_honours_config() {
        let dropped = assemble_json(PAYLOAD, &ReconstructionConfig::default()).unwrap();
        assert_eq!(dropped.tables.len(), 1);

        let kept = assemble_json(
            PAYLOAD,
            &ReconstructionConfig {
                drop_headerless_tables: false,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(kept.tables.len(), 2);
    }

    #[test]
    fn test_invalid_payload_is_an_error() {
        assert!(assemble_json("{\"status\": \"failed\"}", &ReconstructionConfig::default()).is_err());
        assert!(table_from_json("not json").is_err());
    }

    #[test]
    fn test_empty_total_label_is_rejected() {
        let base = ReconstructionConfig::default();
        assert!(with_total_labels(&base, vec![String::new()]).is_err());

        let config = with_total_labels(&base, vec!["Razem".to_string()]).unwrap();
        assert_eq!(config.total_labels, vec!["Razem".to_string()]);

        let invalid = ReconstructionConfig {
            total_labels: vec![String::new()],
            ..Default::default()
        };
        assert!(assemble_json(PAYLOAD, &invalid).is_err());
        assert!(assemble_flat_json(PAYLOAD, &invalid).is_err());
    }

    #[test]
    fn test_table_from_json() {
        let invoice = table_from_json(
            r#"{"rowCount": 2, "columnCount": 1, "cells": [
                {"kind": "columnHeader", "rowIndex": 0, "columnIndex": 0, "content": "Rate"},
                {"rowIndex": 1, "columnIndex": 0, "content": "5%"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(invoice.headers[0].title, "Rate");
        assert_eq!(invoice.rows.len(), 1);
    }

    #[test]
    fn test_flat_json() {
        let document = assemble_flat_json(PAYLOAD, &ReconstructionConfig::default()).unwrap();
        assert_eq!(document.tables[0].rows[0]["Amount"], "12%");
    }
}
