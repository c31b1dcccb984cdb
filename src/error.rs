//! Pipeline error taxonomy.
//!
//! Every variant except the fatal ones maps to a message the caller can show the
//! user as-is. Fatal variants indicate model or schema drift and are reported
//! generically.

use thiserror::Error;

/// Errors produced by the screening pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The request payload could not be decoded.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Manual fields and a spreadsheet were both supplied.
    #[error("conflicting input sources: manual fields and spreadsheet both supplied")]
    ConflictingInputSources,

    /// Neither a spreadsheet nor any manual feature was supplied.
    #[error("no input supplied")]
    NoInput,

    /// Spreadsheet lacks required schema columns (reported in schema order).
    #[error("missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Two spreadsheet headers normalize to the same schema column.
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    /// Spreadsheet data row count is not exactly one.
    #[error("expected exactly one data row, found {0}")]
    RowCountViolation(usize),

    /// A data row has a different number of cells than the header.
    #[error("row has {actual} cells but header has {expected} columns")]
    RaggedRow { expected: usize, actual: usize },

    /// A feature value could not be parsed as a finite number.
    #[error("invalid value for {name}: {raw:?}")]
    InvalidFeatureValue { name: String, raw: String },

    /// A manual feature was left blank under the `reject` policy.
    #[error("missing value for {0}")]
    MissingFeatureValue(String),

    /// The classifier produced something outside its binary contract.
    #[error("unexpected model output: {0}")]
    UnexpectedModelOutput(String),

    /// The classifier failed to run.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The feature schema failed its self-check.
    #[error("schema error: {0}")]
    Schema(String),
}

/// A convenience type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Whether the error stems from user input (as opposed to model/schema drift).
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            PipelineError::UnexpectedModelOutput(_)
                | PipelineError::Inference(_)
                | PipelineError::Schema(_)
        )
    }

    /// Stable slug used in responses and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MalformedRequest(_) => "malformed_request",
            PipelineError::ConflictingInputSources => "conflicting_input_sources",
            PipelineError::NoInput => "no_input",
            PipelineError::MissingColumns(_) => "missing_columns",
            PipelineError::DuplicateColumn(_) => "duplicate_column",
            PipelineError::RowCountViolation(_) => "row_count_violation",
            PipelineError::RaggedRow { .. } => "ragged_row",
            PipelineError::InvalidFeatureValue { .. } => "invalid_feature_value",
            PipelineError::MissingFeatureValue(_) => "missing_feature_value",
            PipelineError::UnexpectedModelOutput(_) => "unexpected_model_output",
            PipelineError::Inference(_) => "inference",
            PipelineError::Schema(_) => "schema",
        }
    }

    /// Human-readable message for the end user.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::MalformedRequest(detail) => {
                format!("The request could not be read: {}", detail)
            }
            PipelineError::ConflictingInputSources => {
                "Please use either Manual Entry OR Excel Upload, not both.".to_string()
            }
            PipelineError::NoInput => {
                "Please fill in the form or upload an Excel file.".to_string()
            }
            PipelineError::MissingColumns(names) => format!(
                "Excel file is missing required columns: {}",
                names.join(", ")
            ),
            PipelineError::DuplicateColumn(name) => {
                format!("Excel file contains column {} more than once", name)
            }
            PipelineError::RowCountViolation(actual) => format!(
                "Excel must contain exactly one row of input (found {})",
                actual
            ),
            PipelineError::RaggedRow { expected, actual } => format!(
                "Excel row has {} cells but the header has {} columns",
                actual, expected
            ),
            PipelineError::InvalidFeatureValue { name, raw } => {
                format!("Invalid value for {}: '{}' is not a number", name, raw)
            }
            PipelineError::MissingFeatureValue(name) => {
                format!("Please enter a value for {}", name)
            }
            PipelineError::UnexpectedModelOutput(_)
            | PipelineError::Inference(_)
            | PipelineError::Schema(_) => {
                "An internal error occurred while scoring the claim. Please try again later."
                    .to_string()
            }
        }
    }
}
