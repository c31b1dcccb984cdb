//! Claim screening pipeline.
//!
//! Validator, assembler, inference adapter and formatter run in sequence on the
//! calling thread. [`Pipeline::respond`] is the error boundary: it always
//! produces a response, turning failures into rejections.

use crate::assembler::{MissingFieldPolicy, VectorAssembler};
use crate::error::{PipelineError, Result};
use crate::formatter;
use crate::models::inference::{Classifier, InferenceAdapter};
use crate::schema;
use crate::types::input::InputSource;
use crate::types::request::{Outcome, PredictionRequest, PredictionResponse};
use crate::types::result::PredictionResult;
use crate::validator;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// The assembled screening pipeline; cheap to share behind an `Arc`.
pub struct Pipeline {
    assembler: VectorAssembler,
    adapter: InferenceAdapter,
}

impl Pipeline {
    /// Build a pipeline around a loaded classifier.
    ///
    /// Fails if the feature schema does not pass its self-check.
    pub fn new(
        classifier: Arc<dyn Classifier>,
        missing_policy: MissingFieldPolicy,
    ) -> Result<Self> {
        schema::verify()?;
        Ok(Self {
            assembler: VectorAssembler::new(missing_policy),
            adapter: InferenceAdapter::new(classifier),
        })
    }

    pub fn model_name(&self) -> &str {
        self.adapter.model_name()
    }

    pub fn missing_policy(&self) -> MissingFieldPolicy {
        self.assembler.missing_policy()
    }

    /// Run one input source through validation, assembly, inference and formatting.
    pub fn run_prediction(&self, source: &InputSource) -> Result<PredictionResult> {
        let validated = validator::validate(source)?;
        let vector = self.assembler.assemble(&validated.raw)?;
        let (label, probability) = self.adapter.predict(&vector)?;

        Ok(formatter::format(
            validated.kind(),
            label,
            probability,
            validated.claim_id.as_deref(),
            validated.amount.as_ref(),
        ))
    }

    /// Choose the request's single input source, then run it.
    pub fn run_request(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let source = validator::select_source(&request.manual, request.table.as_ref())?;
        debug!(
            request_id = %request.request_id,
            source = ?source.kind(),
            "Input source selected"
        );
        self.run_prediction(&source)
    }

    /// Run a request and convert the outcome into a response.
    ///
    /// Requests without a user are rejected before any input is read.
    pub fn respond(&self, request: &PredictionRequest) -> PredictionResponse {
        if request.username().is_none() {
            warn!(request_id = %request.request_id, "Rejected unauthenticated request");
            return PredictionResponse::new(
                request,
                Outcome::Rejected {
                    kind: "unauthenticated".to_string(),
                    message: "Please log in before submitting a claim.".to_string(),
                },
            );
        }

        let outcome = match self.run_request(request) {
            Ok(result) => {
                info!(
                    request_id = %request.request_id,
                    claim_id = %result.claim_id,
                    label = %result.label,
                    probability = result.probability,
                    "Claim scored"
                );
                Outcome::Accepted { result }
            }
            Err(e) => {
                if e.is_recoverable() {
                    info!(
                        request_id = %request.request_id,
                        kind = e.kind(),
                        error = %e,
                        "Request rejected"
                    );
                } else {
                    error!(
                        request_id = %request.request_id,
                        kind = e.kind(),
                        error = %e,
                        "Request failed"
                    );
                }
                rejection(&e)
            }
        };

        PredictionResponse::new(request, outcome)
    }

    /// Decode a raw request payload and respond to it.
    ///
    /// A payload that does not decode still gets a rejection.
    pub fn respond_bytes(&self, payload: &[u8]) -> PredictionResponse {
        match serde_json::from_slice::<PredictionRequest>(payload) {
            Ok(request) => self.respond(&request),
            Err(e) => {
                let err = PipelineError::MalformedRequest(e.to_string());
                warn!(kind = err.kind(), error = %err, "Failed to decode prediction request");
                PredictionResponse::undecoded(rejection(&err))
            }
        }
    }
}

fn rejection(e: &PipelineError) -> Outcome {
    Outcome::Rejected {
        kind: e.kind().to_string(),
        message: e.user_message(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CLAIM_AMOUNT_FIELD, CLAIM_ID_FIELD, FEATURE_COUNT, FEATURE_NAMES};
    use crate::types::input::{FeatureVector, ManualFields, SpreadsheetTable};
    use crate::types::result::Label;
    use std::sync::Mutex;

    /// Returns fixed outputs and records the vectors it was given.
    struct StubClassifier {
        label: i64,
        proba: f64,
        seen: Mutex<Vec<FeatureVector>>,
    }

    impl StubClassifier {
        fn new(label: i64, proba: f64) -> Arc<Self> {
            Arc::new(Self {
                label,
                proba,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last_seen(&self) -> Option<FeatureVector> {
            self.seen.lock().unwrap().last().copied()
        }
    }

    impl Classifier for StubClassifier {
        fn name(&self) -> &str {
            "stub"
        }

        fn predict_label(&self, features: &FeatureVector) -> anyhow::Result<i64> {
            self.seen.lock().unwrap().push(*features);
            Ok(self.label)
        }

        fn predict_positive_proba(&self, _features: &FeatureVector) -> anyhow::Result<f64> {
            Ok(self.proba)
        }
    }

    fn pipeline(stub: Arc<StubClassifier>) -> Pipeline {
        Pipeline::new(stub, MissingFieldPolicy::Zero).unwrap()
    }

    fn full_manual() -> ManualFields {
        FEATURE_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| (*name, format!("{}", i * 2)))
            .collect()
    }

    fn full_table() -> SpreadsheetTable {
        let values: Vec<f64> = (0..FEATURE_COUNT).map(|i| (i * 2) as f64).collect();
        SpreadsheetTable::new(FEATURE_NAMES).with_row(values)
    }

    #[test]
    fn test_manual_prediction() {
        let stub = StubClassifier::new(1, 0.8734);
        let pipeline = pipeline(stub.clone());

        let result = pipeline
            .run_prediction(&InputSource::Manual(full_manual()))
            .unwrap();

        assert_eq!(result.label, Label::Fraudulent);
        assert_eq!(result.probability, 87.34);
        assert_eq!(result.claim_id, "Manual Entry");
        assert_eq!(result.amount, 0.0);

        let seen = stub.last_seen().unwrap();
        for (i, value) in seen.values().iter().enumerate() {
            assert_eq!(*value, (i * 2) as f64);
        }
    }

    #[test]
    fn test_spreadsheet_and_manual_produce_same_vector() {
        let stub = StubClassifier::new(0, 0.1);
        let pipeline = pipeline(stub.clone());

        pipeline.run_prediction(&InputSource::Manual(full_manual())).unwrap();
        let from_manual = stub.last_seen().unwrap();

        let result = pipeline
            .run_prediction(&InputSource::Spreadsheet(full_table()))
            .unwrap();
        let from_sheet = stub.last_seen().unwrap();

        assert_eq!(from_manual, from_sheet);
        assert_eq!(result.label, Label::NotFraudulent);
        assert_eq!(result.claim_id, "From Excel");
    }

    #[test]
    fn test_request_with_both_sources_conflicts() {
        let stub = StubClassifier::new(1, 0.9);
        let pipeline = pipeline(stub.clone());

        let mut request = PredictionRequest::spreadsheet(full_table()).with_user("analyst");
        request.manual = full_manual();

        let err = pipeline.run_request(&request).unwrap_err();
        assert_eq!(err, PipelineError::ConflictingInputSources);
        assert!(stub.last_seen().is_none());
    }

    #[test]
    fn test_manual_passthrough_metadata() {
        let pipeline = pipeline(StubClassifier::new(0, 0.25));
        let manual = full_manual()
            .with(CLAIM_ID_FIELD, "CLM-2024-001")
            .with(CLAIM_AMOUNT_FIELD, "1830.75");

        let result = pipeline
            .run_request(&PredictionRequest::manual(manual).with_user("analyst"))
            .unwrap();
        assert_eq!(result.claim_id, "CLM-2024-001");
        assert_eq!(result.amount, 1830.75);
        assert_eq!(result.probability, 25.0);
    }

    #[test]
    fn test_respond_accepts() {
        let pipeline = pipeline(StubClassifier::new(1, 0.8734));
        let request = PredictionRequest::manual(full_manual()).with_user("analyst");

        let response = pipeline.respond(&request);
        assert_eq!(response.request_id, request.request_id);
        assert_eq!(response.username, "analyst");
        match response.outcome {
            Outcome::Accepted { result } => {
                assert_eq!(result.label, Label::Fraudulent);
                assert_eq!(result.probability, 87.34);
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[test]
    fn test_respond_rejects_invalid_value() {
        let pipeline = pipeline(StubClassifier::new(1, 0.5));
        let manual = full_manual().with("LengthOfStay", "abc");
        let response = pipeline.respond(&PredictionRequest::manual(manual).with_user("analyst"));

        assert_eq!(
            response.outcome,
            Outcome::Rejected {
                kind: "invalid_feature_value".to_string(),
                message: "Invalid value for LengthOfStay: 'abc' is not a number".to_string(),
            }
        );
    }

    #[test]
    fn test_respond_rejects_row_count() {
        let pipeline = pipeline(StubClassifier::new(1, 0.5));
        let table = full_table().with_row(vec![0.0; FEATURE_COUNT]);
        let response = pipeline.respond(&PredictionRequest::spreadsheet(table).with_user("analyst"));

        match response.outcome {
            Outcome::Rejected { kind, message } => {
                assert_eq!(kind, "row_count_violation");
                assert!(message.contains("found 2"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_respond_hides_model_drift() {
        let pipeline = pipeline(StubClassifier::new(3, 0.5));
        let response = pipeline.respond(&PredictionRequest::manual(full_manual()).with_user("analyst"));

        match response.outcome {
            Outcome::Rejected { kind, message } => {
                assert_eq!(kind, "unexpected_model_output");
                assert!(!message.contains('3'));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_respond_requires_user() {
        let stub = StubClassifier::new(1, 0.5);
        let pipeline = pipeline(stub.clone());
        let response = pipeline.respond(&PredictionRequest::manual(full_manual()));

        assert!(matches!(
            response.outcome,
            Outcome::Rejected { ref kind, .. } if kind == "unauthenticated"
        ));
        assert_eq!(response.username, "Guest");
        assert!(stub.last_seen().is_none());
    }

    fn assert_malformed(response: &PredictionResponse) {
        match &response.outcome {
            Outcome::Rejected { kind, message } => {
                assert_eq!(kind, "malformed_request");
                assert!(message.starts_with("The request could not be read"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(response.username, "Guest");
        assert!(!response.request_id.is_empty());
    }

    #[test]
    fn test_respond_bytes_numeric_manual_value() {
        let stub = StubClassifier::new(1, 0.5);
        let pipeline = pipeline(stub.clone());
        let payload = br#"{"user":"analyst","manual":{"State_freq":0.5}}"#;

        assert_malformed(&pipeline.respond_bytes(payload));
        assert!(stub.last_seen().is_none());
    }

    #[test]
    fn test_respond_bytes_boolean_cell() {
        let pipeline = pipeline(StubClassifier::new(1, 0.5));
        let payload = br#"{"user":"analyst","table":{"columns":["State_freq"],"rows":[[true]]}}"#;

        assert_malformed(&pipeline.respond_bytes(payload));
    }

    #[test]
    fn test_respond_bytes_not_json() {
        let pipeline = pipeline(StubClassifier::new(1, 0.5));
        assert_malformed(&pipeline.respond_bytes(b"claim please"));
    }

    #[test]
    fn test_respond_bytes_decodes_valid_request() {
        let pipeline = pipeline(StubClassifier::new(0, 0.1));
        let request = PredictionRequest::manual(full_manual()).with_user("analyst");
        let payload = serde_json::to_vec(&request).unwrap();

        let response = pipeline.respond_bytes(&payload);
        assert!(response.is_accepted());
        assert_eq!(response.request_id, request.request_id);
    }

    #[test]
    fn test_reject_policy_reaches_pipeline() {
        let stub = StubClassifier::new(1, 0.5);
        let pipeline = Pipeline::new(stub, MissingFieldPolicy::Reject).unwrap();
        let manual = ManualFields::new().with("LengthOfStay", "2");

        let err = pipeline
            .run_prediction(&InputSource::Manual(manual))
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingFeatureValue(_)));
        assert_eq!(pipeline.missing_policy(), MissingFieldPolicy::Reject);
    }
}
