//! Lexical value-type classification of cell text.

use crate::models::invoice::ValueType;

/// Trait for cell value classifiers.
pub trait ValueClassifier {
    /// Classify the text of one cell.
    fn classify(&self, content: &str) -> ValueType;
}

/// Cheap first/last-character heuristic.
///
/// This is not a numeric parser: anything that starts with a digit, `-` or
/// `,` counts as an amount, so product codes such as `12-AB` are amounts too.
/// Text is not trimmed; a leading space makes a value text.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalClassifier;

impl LexicalClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl ValueClassifier for LexicalClassifier {
    fn classify(&self, content: &str) -> ValueType {
        classify(content)
    }
}

/// Classify cell text: `%` suffix is a percentage, a leading digit, `-` or
/// `,` is an amount, everything else (including the empty string) is text.
pub fn classify(content: &str) -> ValueType {
    let Some(first) = content.chars().next() else {
        return ValueType::Text;
    };

    if content.ends_with('%') {
        ValueType::Percentage
    } else if first.is_ascii_digit() || first == '-' || first == ',' {
        ValueType::Amount
    } else {
        ValueType::Text
    }
}
