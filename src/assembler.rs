//! Vector assembly: schema-ordered raw values to the numeric classifier input.
//!
//! Every value is resolved strictly. Text must parse as a finite number;
//! only absence is defaulted, and for manual input only when the configured
//! [`MissingFieldPolicy`] allows it.

use crate::error::{PipelineError, Result};
use crate::schema::FEATURE_COUNT;
use crate::types::input::{CellValue, FeatureVector, InputKind, RawInput};
use serde::Deserialize;

/// What a blank or absent manual field means.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingFieldPolicy {
    /// Treat the field as 0.0
    #[default]
    Zero,
    /// Reject the request, naming the field
    Reject,
}

/// Converts validated raw input into a [`FeatureVector`].
#[derive(Debug, Clone, Default)]
pub struct VectorAssembler {
    missing_policy: MissingFieldPolicy,
}

impl VectorAssembler {
    pub fn new(missing_policy: MissingFieldPolicy) -> Self {
        Self { missing_policy }
    }

    pub fn missing_policy(&self) -> MissingFieldPolicy {
        self.missing_policy
    }

    /// Assemble a vector in schema order.
    pub fn assemble(&self, raw: &RawInput) -> Result<FeatureVector> {
        let mut values = [0.0; FEATURE_COUNT];

        for (slot, (name, cell)) in values.iter_mut().zip(raw.iter()) {
            *slot = match cell {
                Some(cell) if !cell.is_blank() => resolve(name, cell)?,
                _ => self.default_for(raw.kind(), name)?,
            };
        }

        Ok(FeatureVector::new(values))
    }

    fn default_for(&self, kind: InputKind, name: &str) -> Result<f64> {
        match (kind, self.missing_policy) {
            (InputKind::Manual, MissingFieldPolicy::Reject) => {
                Err(PipelineError::MissingFeatureValue(name.to_string()))
            }
            _ => Ok(0.0),
        }
    }
}

/// Resolve a non-blank cell to a finite number.
fn resolve(name: &str, cell: &CellValue) -> Result<f64> {
    let value = match cell {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(s) => s.trim().parse::<f64>().ok(),
        CellValue::Empty => Some(0.0),
    };

    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| PipelineError::InvalidFeatureValue {
            name: name.to_string(),
            raw: cell.to_string(),
        })
}

/// Parse a passthrough amount, falling back to 0 when absent or non-numeric.
pub fn amount_or_zero(amount: Option<&CellValue>) -> f64 {
    match amount {
        Some(cell) if !cell.is_blank() => resolve("amount", cell).unwrap_or(0.0),
        _ => 0.0,
    }
}
