//! Inference adapter and the ONNX-backed classifier.
//!
//! The adapter owns the binary contract: class ids outside {0, 1} or a
//! non-finite probability are reported as model drift, never passed on.

use crate::config::ModelConfig;
use crate::error::PipelineError;
use crate::models::loader::{LoadedModel, ModelLoader};
use crate::types::input::FeatureVector;
use crate::types::result::Label;
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

/// Raw classifier output for a single-row batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPrediction {
    /// Predicted class id
    pub label: i64,
    /// Positive-class probability (0.0 - 1.0)
    pub positive_proba: f64,
}

/// A loaded binary classifier.
///
/// Implementations must be safe to call from many requests at once and must
/// not change state between calls.
pub trait Classifier: Send + Sync {
    /// Model name for logs
    fn name(&self) -> &str;

    /// Predicted class id for one feature vector
    fn predict_label(&self, features: &FeatureVector) -> Result<i64>;

    /// Positive-class probability for one feature vector
    fn predict_positive_proba(&self, features: &FeatureVector) -> Result<f64>;

    /// Both outputs at once; override when one model run yields both.
    fn predict(&self, features: &FeatureVector) -> Result<RawPrediction> {
        Ok(RawPrediction {
            label: self.predict_label(features)?,
            positive_proba: self.predict_positive_proba(features)?,
        })
    }
}

/// Wraps a shared classifier and normalizes its output.
#[derive(Clone)]
pub struct InferenceAdapter {
    classifier: Arc<dyn Classifier>,
}

impl InferenceAdapter {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    pub fn model_name(&self) -> &str {
        self.classifier.name()
    }

    /// Classify one vector, returning the label and a 0-100 percentage.
    pub fn predict(&self, features: &FeatureVector) -> Result<(Label, f64), PipelineError> {
        let raw = self.classifier.predict(features).map_err(|e| {
            let detail = format!("{:#}", e);
            error!(model = %self.classifier.name(), error = %detail, "Inference failed");
            PipelineError::Inference(detail)
        })?;

        let label = Label::from_class(raw.label).ok_or_else(|| {
            PipelineError::UnexpectedModelOutput(format!("class id {} outside {{0, 1}}", raw.label))
        })?;

        if !raw.positive_proba.is_finite() {
            return Err(PipelineError::UnexpectedModelOutput(format!(
                "non-finite probability {}",
                raw.positive_proba
            )));
        }

        let probability = to_percentage(raw.positive_proba);

        debug!(
            model = %self.classifier.name(),
            label = %label,
            probability = probability,
            "Inference complete"
        );

        Ok((label, probability))
    }
}

/// Scale a probability to a percentage clamped to [0, 100], rounded to 2 decimals.
pub fn to_percentage(probability: f64) -> f64 {
    let pct = (probability * 100.0).clamp(0.0, 100.0);
    (pct * 100.0).round() / 100.0
}

/// Binary classifier backed by an ONNX Runtime session
pub struct OnnxClassifier {
    name: String,
    /// `Session::run` needs exclusive access; concurrent requests take turns.
    model: Mutex<LoadedModel>,
}

impl OnnxClassifier {
    /// Load the classifier described by the model configuration
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let loader = ModelLoader::with_threads(config.threads)?;
        Ok(Self::new(loader.load(config)?))
    }

    pub fn new(model: LoadedModel) -> Self {
        Self {
            name: model.name.clone(),
            model: Mutex::new(model),
        }
    }

    fn run(&self, features: &FeatureVector) -> Result<RawPrediction> {
        let mut guard = self
            .model
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        run_session(&mut guard, features)
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_label(&self, features: &FeatureVector) -> Result<i64> {
        Ok(self.run(features)?.label)
    }

    fn predict_positive_proba(&self, features: &FeatureVector) -> Result<f64> {
        Ok(self.run(features)?.positive_proba)
    }

    fn predict(&self, features: &FeatureVector) -> Result<RawPrediction> {
        self.run(features)
    }
}

/// Run the session on a `[1, n_features]` batch and read both outputs
fn run_session(model: &mut LoadedModel, features: &FeatureVector) -> Result<RawPrediction> {
    use ort::value::Tensor;

    let input = features.to_f32();
    let shape = vec![1_i64, input.len() as i64];
    let input_tensor =
        Tensor::from_array((shape, input)).context("Failed to create input tensor")?;

    let outputs = model
        .session
        .run(ort::inputs![&model.input_name => input_tensor])?;

    let label_value = outputs
        .get(model.label_output.as_str())
        .ok_or_else(|| anyhow::anyhow!("Output {} missing", model.label_output))?;
    let (_, labels) = label_value
        .try_extract_tensor::<i64>()
        .context("Label output is not an int64 tensor")?;
    let label = *labels
        .first()
        .ok_or_else(|| anyhow::anyhow!("Label output is empty"))?;

    let proba_value = outputs
        .get(model.probability_output.as_str())
        .ok_or_else(|| anyhow::anyhow!("Output {} missing", model.probability_output))?;
    let positive_proba = extract_positive_probability(proba_value, &model.name)?;

    Ok(RawPrediction {
        label,
        positive_proba,
    })
}

/// Extract the positive-class probability.
///
/// Handles both plain tensors and the `seq(map(int64, float))` layout that
/// zipmap-enabled exports produce.
fn extract_positive_probability(output: &ort::value::DynValue, model_name: &str) -> Result<f64> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        let prob = positive_from_tensor(&dims, data)?;
        debug!(model = %model_name, prob = prob, "Extracted from tensor");
        return Ok(prob);
    }

    if DynSequenceValueType::can_downcast(&output.dtype()) {
        return extract_from_sequence_map(output, model_name);
    }

    Err(anyhow::anyhow!(
        "Unsupported probability output type: {:?}",
        output.dtype()
    ))
}

/// Probability of class 1 from a `[batch, classes]` or `[classes]` tensor
fn positive_from_tensor(dims: &[i64], data: &[f32]) -> Result<f64> {
    let classes = dims.last().copied().unwrap_or(0);
    match classes {
        c if c >= 2 && data.len() >= 2 => Ok(data[1] as f64),
        1 if !data.is_empty() => Ok(data[0] as f64),
        _ => Err(anyhow::anyhow!(
            "Unexpected probability tensor shape {:?}",
            dims
        )),
    }
}

/// Probability of class 1 from a `seq(map(int64, float))` output
fn extract_from_sequence_map(output: &ort::value::DynValue, model_name: &str) -> Result<f64> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let first = maps
        .first()
        .ok_or_else(|| anyhow::anyhow!("Empty probability sequence"))?;

    let kv_pairs = first.try_extract_key_values::<i64, f32>()?;
    positive_from_pairs(&kv_pairs).map(|prob| {
        debug!(model = %model_name, prob = prob, "Extracted from seq(map)");
        prob
    })
}

fn positive_from_pairs(pairs: &[(i64, f32)]) -> Result<f64> {
    if let Some((_, prob)) = pairs.iter().find(|(class, _)| *class == 1) {
        return Ok(*prob as f64);
    }
    if let Some((_, prob)) = pairs.iter().find(|(class, _)| *class == 0) {
        return Ok(1.0 - *prob as f64);
    }
    Err(anyhow::anyhow!("No class probability found in map"))
}
