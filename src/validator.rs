//! Input source validation.
//!
//! Decides which input path a request uses and, for spreadsheets, checks the
//! header and row shape before anything is converted to numbers.

use crate::error::{PipelineError, Result};
use crate::schema::{self, CLAIM_AMOUNT_FIELD, CLAIM_ID_FIELD};
use crate::types::input::{
    CellValue, InputKind, InputSource, ManualFields, RawInput, SpreadsheetTable,
};
use std::collections::HashMap;
use tracing::debug;

/// Schema-ordered raw values plus the passthrough metadata of the request.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInput {
    pub raw: RawInput,
    pub claim_id: Option<String>,
    pub amount: Option<CellValue>,
}

impl ValidatedInput {
    pub fn kind(&self) -> InputKind {
        self.raw.kind()
    }
}

/// Normalize a spreadsheet header: trim, then collapse whitespace runs to `_`.
pub fn normalize_column(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Pick the single input path of a request.
///
/// A table together with at least one filled manual feature is a conflict,
/// whether or not the two sources agree.
pub fn select_source(
    manual: &ManualFields,
    table: Option<&SpreadsheetTable>,
) -> Result<InputSource> {
    match table {
        Some(_) if manual.has_any_feature() => Err(PipelineError::ConflictingInputSources),
        Some(table) => Ok(InputSource::Spreadsheet(table.clone())),
        None if manual.has_any_feature() => Ok(InputSource::Manual(manual.clone())),
        None => Err(PipelineError::NoInput),
    }
}

/// Validate a chosen input source and align it to the schema.
pub fn validate(source: &InputSource) -> Result<ValidatedInput> {
    match source {
        InputSource::Manual(fields) => Ok(validate_manual(fields)),
        InputSource::Spreadsheet(table) => validate_spreadsheet(table),
    }
}

fn validate_manual(fields: &ManualFields) -> ValidatedInput {
    let values = schema::schema()
        .iter()
        .map(|name| fields.filled(name).map(CellValue::from))
        .collect();

    ValidatedInput {
        raw: RawInput::new(InputKind::Manual, values),
        claim_id: fields.claim_id().map(str::to_string),
        amount: fields.amount().map(CellValue::from),
    }
}

fn validate_spreadsheet(table: &SpreadsheetTable) -> Result<ValidatedInput> {
    let normalized: Vec<String> = table.columns.iter().map(|c| normalize_column(c)).collect();

    // Only schema and passthrough columns are indexed; other columns are ignored.
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, name) in normalized.iter().enumerate() {
        let relevant =
            schema::contains(name) || name == CLAIM_ID_FIELD || name == CLAIM_AMOUNT_FIELD;
        if relevant && index.insert(name.as_str(), i).is_some() {
            return Err(PipelineError::DuplicateColumn(name.clone()));
        }
    }

    let missing: Vec<String> = schema::schema()
        .iter()
        .filter(|name| !index.contains_key(*name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        debug!(missing = ?missing, "Spreadsheet is missing schema columns");
        return Err(PipelineError::MissingColumns(missing));
    }

    if table.rows.len() != 1 {
        return Err(PipelineError::RowCountViolation(table.rows.len()));
    }
    let row = &table.rows[0];
    if row.len() != table.columns.len() {
        return Err(PipelineError::RaggedRow {
            expected: table.columns.len(),
            actual: row.len(),
        });
    }

    // Every schema name is in `index` at this point.
    let values = schema::schema()
        .iter()
        .map(|name| index.get(name).map(|&i| row[i].clone()))
        .collect();

    let claim_id = index
        .get(CLAIM_ID_FIELD)
        .map(|&i| &row[i])
        .filter(|cell| !cell.is_blank())
        .map(|cell| cell.to_string().trim().to_string());
    let amount = index.get(CLAIM_AMOUNT_FIELD).map(|&i| row[i].clone());

    debug!(
        columns = table.columns.len(),
        "Spreadsheet validated and aligned to schema"
    );

    Ok(ValidatedInput {
        raw: RawInput::new(InputKind::Spreadsheet, values),
        claim_id,
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FEATURE_NAMES;

    fn full_table() -> SpreadsheetTable {
        let values: Vec<f64> = (0..FEATURE_NAMES.len()).map(|i| i as f64 + 0.5).collect();
        SpreadsheetTable::new(FEATURE_NAMES).with_row(values)
    }

    #[test]
    fn test_normalize_column() {
        assert_eq!(normalize_column("  State  freq "), "State_freq");
        assert_eq!(normalize_column("Race_freq"), "Race_freq");
        assert_eq!(normalize_column("Length\tOf Stay"), "Length_Of_Stay");
        assert_eq!(normalize_column("   "), "");
    }

    #[test]
    fn test_conflicting_sources() {
        let manual = ManualFields::new().with("State_freq", "0.2");
        let err = select_source(&manual, Some(&full_table())).unwrap_err();
        assert_eq!(err, PipelineError::ConflictingInputSources);
    }

    #[test]
    fn test_conflict_regardless_of_agreement() {
        // Manual value identical to the spreadsheet cell is still a conflict
        let manual = ManualFields::new().with(FEATURE_NAMES[0], "0.5");
        let err = select_source(&manual, Some(&full_table())).unwrap_err();
        assert_eq!(err, PipelineError::ConflictingInputSources);
    }

    #[test]
    fn test_blank_manual_fields_do_not_conflict() {
        let manual = ManualFields::new()
            .with("State_freq", "")
            .with(CLAIM_ID_FIELD, "CLM-1");
        let source = select_source(&manual, Some(&full_table())).unwrap();
        assert_eq!(source.kind(), InputKind::Spreadsheet);
    }

    #[test]
    fn test_no_input() {
        let err = select_source(&ManualFields::new(), None).unwrap_err();
        assert_eq!(err, PipelineError::NoInput);
    }

    #[test]
    fn test_missing_single_column() {
        let columns: Vec<&str> = FEATURE_NAMES
            .iter()
            .copied()
            .filter(|&c| c != "County_freq")
            .collect();
        let table = SpreadsheetTable::new(columns).with_row(vec![1.0; FEATURE_NAMES.len() - 1]);

        let err = validate(&InputSource::Spreadsheet(table)).unwrap_err();
        assert_eq!(err, PipelineError::MissingColumns(vec!["County_freq".to_string()]));
    }

    #[test]
    fn test_row_count_violations() {
        let empty = SpreadsheetTable::new(FEATURE_NAMES);
        assert_eq!(
            validate(&InputSource::Spreadsheet(empty)).unwrap_err(),
            PipelineError::RowCountViolation(0)
        );

        let two = full_table().with_row(vec![1.0; FEATURE_NAMES.len()]);
        assert_eq!(
            validate(&InputSource::Spreadsheet(two)).unwrap_err(),
            PipelineError::RowCountViolation(2)
        );
    }

    #[test]
    fn test_missing_columns_reported_before_row_count() {
        let table = SpreadsheetTable::new(["State_freq"]);
        let err = validate(&InputSource::Spreadsheet(table)).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumns(ref m) if m.len() == 19));
    }

    #[test]
    fn test_duplicate_after_normalization() {
        let mut columns: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        columns.push("State freq".to_string());
        let table = SpreadsheetTable::new(columns).with_row(vec![0.0; FEATURE_NAMES.len() + 1]);

        let err = validate(&InputSource::Spreadsheet(table)).unwrap_err();
        assert_eq!(err, PipelineError::DuplicateColumn("State_freq".to_string()));
    }

    #[test]
    fn test_ragged_row() {
        let table = SpreadsheetTable::new(FEATURE_NAMES).with_row(vec![1.0; 3]);
        let err = validate(&InputSource::Spreadsheet(table)).unwrap_err();
        assert_eq!(err, PipelineError::RaggedRow { expected: 20, actual: 3 });
    }

    #[test]
    fn test_reorders_to_schema_and_ignores_extra_columns() {
        let mut columns: Vec<String> = FEATURE_NAMES
            .iter()
            .rev()
            .map(|s| format!(" {} ", s))
            .collect();
        columns.insert(0, "Notes".to_string());
        let mut row: Vec<CellValue> = (0..FEATURE_NAMES.len())
            .rev()
            .map(|i| CellValue::Number(i as f64))
            .collect();
        row.insert(0, CellValue::from("ignored"));

        let table = SpreadsheetTable {
            columns,
            rows: vec![row],
        };
        let validated = validate(&InputSource::Spreadsheet(table)).unwrap();

        for (i, (name, value)) in validated.raw.iter().enumerate() {
            assert_eq!(name, FEATURE_NAMES[i]);
            assert_eq!(value, Some(&CellValue::Number(i as f64)));
        }
        assert_eq!(validated.kind(), InputKind::Spreadsheet);
    }

    #[test]
    fn test_spreadsheet_passthrough_columns() {
        let mut columns: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        columns.push("ClaimID".to_string());
        columns.push("ClaimAmount sum".to_string());
        let mut row: Vec<CellValue> = vec![CellValue::Number(1.0); FEATURE_NAMES.len()];
        row.push(CellValue::from("CLM-77"));
        row.push(CellValue::Number(2500.0));

        let table = SpreadsheetTable {
            columns,
            rows: vec![row],
        };
        let validated = validate(&InputSource::Spreadsheet(table)).unwrap();
        assert_eq!(validated.claim_id.as_deref(), Some("CLM-77"));
        assert_eq!(validated.amount, Some(CellValue::Number(2500.0)));
    }

    #[test]
    fn test_manual_alignment() {
        let manual = ManualFields::new()
            .with("LengthOfStay", "3")
            .with("Race_freq", "  ")
            .with(CLAIM_AMOUNT_FIELD, "900");
        let validated = validate(&InputSource::Manual(manual)).unwrap();

        let raw: Vec<_> = validated.raw.iter().collect();
        assert_eq!(raw[6], ("LengthOfStay", Some(&CellValue::from("3"))));
        assert_eq!(raw[10], ("Race_freq", None));
        assert_eq!(validated.claim_id, None);
        assert_eq!(validated.amount, Some(CellValue::from("900")));
    }
}
