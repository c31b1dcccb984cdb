//! Classifier loading and inference

pub mod inference;
pub mod loader;

pub use inference::{Classifier, InferenceAdapter, OnnxClassifier, RawPrediction};
pub use loader::ModelLoader;
