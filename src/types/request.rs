//! Wire format for prediction requests and responses

use crate::types::input::{ManualFields, SpreadsheetTable};
use crate::types::result::PredictionResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A prediction request as received from the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Caller-assigned request identifier
    #[serde(default = "new_request_id")]
    pub request_id: String,

    /// Opaque login token of the caller; any non-empty value is accepted
    #[serde(default)]
    pub user: Option<String>,

    /// Manual form fields (may be empty)
    #[serde(default)]
    pub manual: ManualFields,

    /// Parsed spreadsheet upload, if any
    #[serde(default)]
    pub table: Option<SpreadsheetTable>,
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl PredictionRequest {
    pub fn manual(manual: ManualFields) -> Self {
        Self {
            request_id: new_request_id(),
            manual,
            ..Default::default()
        }
    }

    pub fn spreadsheet(table: SpreadsheetTable) -> Self {
        Self {
            request_id: new_request_id(),
            table: Some(table),
            ..Default::default()
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// The caller's user name, if it is non-empty.
    pub fn username(&self) -> Option<&str> {
        self.user
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

/// Accepted result or rejection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Accepted { result: PredictionResult },
    Rejected { kind: String, message: String },
}

/// Response returned to the caller for every request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub request_id: String,
    pub username: String,
    pub outcome: Outcome,
    pub timestamp: DateTime<Utc>,
}

impl PredictionResponse {
    pub fn new(request: &PredictionRequest, outcome: Outcome) -> Self {
        Self {
            request_id: request.request_id.clone(),
            username: request.username().unwrap_or("Guest").to_string(),
            outcome,
            timestamp: Utc::now(),
        }
    }

    /// Response for a payload that never decoded into a request.
    ///
    /// The request id is freshly generated and the caller is reported as "Guest".
    pub fn undecoded(outcome: Outcome) -> Self {
        Self {
            request_id: new_request_id(),
            username: "Guest".to_string(),
            outcome,
            timestamp: Utc::now(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, Outcome::Accepted { .. })
    }
}
