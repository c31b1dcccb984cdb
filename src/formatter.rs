//! Result packaging

use crate::assembler::amount_or_zero;
use crate::types::input::{CellValue, InputKind};
use crate::types::result::{Label, PredictionResult};

/// Package a classification and its passthrough metadata.
///
/// A blank or absent claim id becomes the input path's sentinel; a blank,
/// absent or non-numeric amount becomes 0.
pub fn format(
    kind: InputKind,
    label: Label,
    probability: f64,
    claim_id: Option<&str>,
    amount: Option<&CellValue>,
) -> PredictionResult {
    let claim_id = claim_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| kind.claim_id_sentinel())
        .to_string();

    PredictionResult {
        label,
        probability,
        claim_id,
        amount: amount_or_zero(amount),
    }
}
