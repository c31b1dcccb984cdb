//! Prediction result data structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Fraudulent,
    NotFraudulent,
}

impl Label {
    /// Map a raw binary class id (1 = fraud) to a label.
    pub fn from_class(class: i64) -> Option<Self> {
        match class {
            1 => Some(Label::Fraudulent),
            0 => Some(Label::NotFraudulent),
            _ => None,
        }
    }

    /// Display text as shown to users.
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Fraudulent => "Fraudulent",
            Label::NotFraudulent => "Not Fraudulent",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one successful pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Classification label
    pub label: Label,

    /// Positive-class probability as a percentage (0.00 - 100.00)
    pub probability: f64,

    /// Claim identifier, or the input path's sentinel
    pub claim_id: String,

    /// Claim amount, 0 when absent or non-numeric
    pub amount: f64,
}
