//! ONNX model loader

use crate::config::ModelConfig;
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::{info, warn};

/// Loaded ONNX classifier with resolved input/output names
pub struct LoadedModel {
    /// Model name (file stem)
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the feature tensor
    pub input_name: String,
    /// Output name for predicted class ids
    pub label_output: String,
    /// Output name for class probabilities
    pub probability_output: String,
}

/// Loader for ONNX classifiers
pub struct ModelLoader {
    /// Number of intra-op threads per session
    threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Result<Self> {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of threads
    pub fn with_threads(threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(threads = threads, "ONNX Runtime initialized");
        Ok(Self { threads })
    }

    /// Load the classifier described by the model configuration
    pub fn load(&self, config: &ModelConfig) -> Result<LoadedModel> {
        self.load_model(
            &config.path,
            &config.label_output,
            &config.probability_output,
        )
    }

    /// Load a classifier from file.
    ///
    /// Output names that the session does not expose are resolved by name
    /// heuristics (`label`, `prob`), as written by skl2onnx-style exporters.
    pub fn load_model<P: AsRef<Path>>(
        &self,
        path: P,
        label_output: &str,
        probability_output: &str,
    ) -> Result<LoadedModel> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "classifier".to_string());

        if !path.exists() {
            anyhow::bail!("Model file not found: {}", path.display());
        }

        info!(model = %name, path = %path.display(), threads = self.threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let label_output = resolve_output(&output_names, label_output, "label")
            .context("Model exposes no label output")?;
        let probability_output = resolve_output(&output_names, probability_output, "prob")
            .context("Model exposes no probability output")?;

        info!(
            model = %name,
            input = %input_name,
            label_output = %label_output,
            probability_output = %probability_output,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name,
            session,
            input_name,
            label_output,
            probability_output,
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self { threads: 1 }
    }
}

/// Pick the configured output if present, else the first one containing `hint`.
fn resolve_output(outputs: &[String], configured: &str, hint: &str) -> Option<String> {
    if outputs.iter().any(|o| o == configured) {
        return Some(configured.to_string());
    }

    let found = outputs.iter().find(|o| o.to_lowercase().contains(hint)).cloned();
    if let Some(ref name) = found {
        warn!(
            configured = %configured,
            using = %name,
            "Configured output not found, using closest match"
        );
    }
    found
}
