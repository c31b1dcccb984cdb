//! Claim Fraud Screening Library
//!
//! Turns a manual form submission or a single-row spreadsheet upload into a
//! schema-ordered feature vector, scores it with a pre-trained binary
//! classifier and packages the result for display.

pub mod assembler;
pub mod config;
pub mod consumer;
pub mod error;
pub mod formatter;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod producer;
pub mod schema;
pub mod types;
pub mod validator;

pub use assembler::{MissingFieldPolicy, VectorAssembler};
pub use config::AppConfig;
pub use consumer::RequestConsumer;
pub use error::PipelineError;
pub use models::inference::{Classifier, InferenceAdapter, OnnxClassifier};
pub use pipeline::Pipeline;
pub use producer::ResponseProducer;
pub use types::{
    input::{CellValue, FeatureVector, InputSource, ManualFields, SpreadsheetTable},
    request::{PredictionRequest, PredictionResponse},
    result::{Label, PredictionResult},
};
