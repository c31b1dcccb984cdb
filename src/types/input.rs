//! Input data structures: raw manual fields, parsed spreadsheet tables and the
//! schema-aligned values that flow between validator, assembler and classifier.

use crate::schema::{self, CLAIM_AMOUNT_FIELD, CLAIM_ID_FIELD, FEATURE_COUNT, FEATURE_NAMES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A loosely-typed scalar as produced by spreadsheet ingestion.
///
/// Deserializes from JSON `number | string | null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl CellValue {
    /// True for null cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Number(_) => false,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Empty => true,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

/// Which input path a request used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Manual,
    Spreadsheet,
}

impl InputKind {
    /// Claim id shown when the input carries none.
    pub fn claim_id_sentinel(&self) -> &'static str {
        match self {
            InputKind::Manual => "Manual Entry",
            InputKind::Spreadsheet => "From Excel",
        }
    }
}

/// Manual form submission: field name to raw string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManualFields(BTreeMap<String, String>);

impl ManualFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Raw value as submitted, blank or not.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Trimmed value, or `None` when absent or blank.
    pub fn filled(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Whether at least one schema feature carries a non-blank value.
    pub fn has_any_feature(&self) -> bool {
        schema::schema().iter().any(|name| self.filled(name).is_some())
    }

    pub fn claim_id(&self) -> Option<&str> {
        self.filled(CLAIM_ID_FIELD)
    }

    pub fn amount(&self) -> Option<&str> {
        self.filled(CLAIM_AMOUNT_FIELD)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ManualFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// First sheet of an uploaded workbook: header row plus data rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpreadsheetTable {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<CellValue>>,
}

impl SpreadsheetTable {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Builder-style row append.
    pub fn with_row<C: Into<CellValue>>(mut self, row: impl IntoIterator<Item = C>) -> Self {
        self.rows.push(row.into_iter().map(Into::into).collect());
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// One of the two mutually exclusive input paths.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    Manual(ManualFields),
    Spreadsheet(SpreadsheetTable),
}

impl InputSource {
    pub fn kind(&self) -> InputKind {
        match self {
            InputSource::Manual(_) => InputKind::Manual,
            InputSource::Spreadsheet(_) => InputKind::Spreadsheet,
        }
    }
}

/// Validated, schema-ordered raw values.
///
/// Position `i` holds the value for `FEATURE_NAMES[i]`; `None` means the source
/// did not supply the field at all.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInput {
    kind: InputKind,
    values: Vec<Option<CellValue>>,
}

impl RawInput {
    pub(crate) fn new(kind: InputKind, values: Vec<Option<CellValue>>) -> Self {
        debug_assert_eq!(values.len(), FEATURE_COUNT);
        Self { kind, values }
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }

    /// Schema name paired with the supplied value, in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<&CellValue>)> + '_ {
        FEATURE_NAMES
            .iter()
            .copied()
            .zip(self.values.iter().map(Option::as_ref))
    }
}

/// Numeric, schema-ordered classifier input.
///
/// The fixed-size array makes the length contract part of the type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of a feature by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        schema::position(name).map(|i| self.values[i])
    }

    /// Name/value pairs in schema order.
    pub fn to_row(&self) -> Vec<(&'static str, f64)> {
        FEATURE_NAMES
            .iter()
            .copied()
            .zip(self.values.iter().copied())
            .collect()
    }

    /// Single-precision copy for model input tensors.
    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|&v| v as f32).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}
