//! Type definitions for the claim screening pipeline

pub mod input;
pub mod request;
pub mod result;

pub use input::{
    CellValue, FeatureVector, InputKind, InputSource, ManualFields, RawInput, SpreadsheetTable,
};
pub use request::{Outcome, PredictionRequest, PredictionResponse};
pub use result::{Label, PredictionResult};
