//! Feature schema for the claim fraud classifier.
//!
//! [`FEATURE_NAMES`] is the only place the feature order is written down.
//! The validator, the assembler and the inference adapter all index through it,
//! so vectors can never drift out of alignment with the order the model was
//! trained on.

use crate::error::PipelineError;
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of features the classifier expects.
pub const FEATURE_COUNT: usize = 20;

/// Feature names in the exact order the classifier was trained on.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    // Provider-level aggregates
    "DiagnosisDiversity_perProvider",
    "ProcedureDiversity_perProvider",
    "NumBeneficiaries_perProvider",
    "AvgClaimAmount_perProvider",
    // Frequency-encoded categoricals
    "State_freq",
    "County_freq",
    "LengthOfStay",
    "ClmDiagnosisCode_10_freq",
    "ClmDiagnosisCode_8_freq",
    "TotalClaimAmount_perBene",
    "Race_freq",
    "ClmDiagnosisCode_7_freq",
    "AvgChronicCond_perBene",
    "ClmProcedureCode_3_freq",
    "ClmProcedureCode_1_freq",
    "ClmDiagnosisCode_9_freq",
    "ClmDiagnosisCode_2_freq",
    "TotalChronicCond_perBene",
    "AvgClaimAmount_perBene",
    "ClmDiagnosisCode_6_freq",
];

/// Claim identifier passthrough field. Display only, never part of the vector.
pub const CLAIM_ID_FIELD: &str = "ClaimID";

/// Claim amount passthrough field. Display only, never part of the vector.
pub const CLAIM_AMOUNT_FIELD: &str = "ClaimAmount_sum";

/// The ordered feature names.
pub fn schema() -> &'static [&'static str] {
    &FEATURE_NAMES
}

/// Position of a feature in the vector, if it is part of the schema.
pub fn position(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|&f| f == name)
}

/// Whether `name` is a schema feature.
pub fn contains(name: &str) -> bool {
    position(name).is_some()
}

/// Startup self-check: names must be non-empty, unique and exactly [`FEATURE_COUNT`].
pub fn verify() -> Result<(), PipelineError> {
    verify_names(schema())
}

fn verify_names(names: &[&str]) -> Result<(), PipelineError> {
    if names.len() != FEATURE_COUNT {
        return Err(PipelineError::Schema(format!(
            "expected {} features, found {}",
            FEATURE_COUNT,
            names.len()
        )));
    }

    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if name.trim().is_empty() {
            return Err(PipelineError::Schema("empty feature name".to_string()));
        }
        if !seen.insert(*name) {
            return Err(PipelineError::Schema(format!(
                "duplicate feature name: {}",
                name
            )));
        }
    }

    Ok(())
}

/// CRC32 over the ordered feature names.
///
/// Any rename, insertion or reordering changes the value, which lets a deployment
/// pin the layout its model was exported with.
pub fn fingerprint() -> u32 {
    fingerprint_of(schema())
}

fn fingerprint_of(names: &[&str]) -> u32 {
    let mut hasher = Hasher::new();
    for name in names {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // separator
    }
    hasher.finalize()
}

/// Schema summary for logging and diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub feature_count: usize,
    pub fingerprint: u32,
    pub feature_names: Vec<String>,
}

impl SchemaInfo {
    pub fn current() -> Self {
        Self {
            feature_count: FEATURE_COUNT,
            fingerprint: fingerprint(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_passes_self_check() {
        assert!(verify().is_ok());
        assert_eq!(schema().len(), FEATURE_COUNT);
    }

    #[test]
    fn test_position_lookup() {
        assert_eq!(position("DiagnosisDiversity_perProvider"), Some(0));
        assert_eq!(position("ClmDiagnosisCode_6_freq"), Some(19));
        assert_eq!(position("ClaimID"), None);
        // Matching is case-sensitive
        assert_eq!(position("state_freq"), None);
    }

    #[test]
    fn test_passthrough_fields_are_not_features() {
        assert!(!contains(CLAIM_ID_FIELD));
        assert!(!contains(CLAIM_AMOUNT_FIELD));
    }

    #[test]
    fn test_verify_rejects_duplicates() {
        let mut names = FEATURE_NAMES;
        names[3] = names[0];
        let err = verify_names(&names).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_verify_rejects_wrong_length() {
        assert!(verify_names(&FEATURE_NAMES[..19]).is_err());
    }

    #[test]
    fn test_fingerprint_tracks_order() {
        assert_eq!(fingerprint(), fingerprint());

        let mut swapped = FEATURE_NAMES;
        swapped.swap(0, 1);
        assert_ne!(fingerprint_of(&swapped), fingerprint());
    }

    #[test]
    fn test_schema_info() {
        let info = SchemaInfo::current();
        assert_eq!(info.feature_count, 20);
        assert_eq!(info.feature_names[4], "State_freq");
        assert_eq!(info.fingerprint, fingerprint());
    }
}
