//! Test Request Generator
//!
//! Generates prediction requests (manual and spreadsheet, valid and invalid),
//! sends them to the screening service over NATS and logs the responses.

use claim_fraud_screening::schema::{CLAIM_AMOUNT_FIELD, CLAIM_ID_FIELD, FEATURE_NAMES};
use claim_fraud_screening::types::request::Outcome;
use claim_fraud_screening::validator::normalize_column;
use claim_fraud_screening::{
    CellValue, ManualFields, PredictionRequest, PredictionResponse, SpreadsheetTable,
};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Claim request generator for testing
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
    claim_counter: u64,
}

impl RequestGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            claim_counter: 0,
        }
    }

    /// Feature values for a claim; suspicious claims skew provider aggregates upwards
    fn features(&mut self, suspicious: bool) -> Vec<f64> {
        let scale = if suspicious { 4.0 } else { 1.0 };
        FEATURE_NAMES
            .iter()
            .map(|name| {
                let value: f64 = if name.ends_with("_freq") {
                    self.rng.gen_range(0.0..1.0)
                } else if name.contains("Amount") {
                    self.rng.gen_range(100.0..5000.0) * scale
                } else if *name == "LengthOfStay" {
                    self.rng.gen_range(0.0..10.0) * scale
                } else {
                    self.rng.gen_range(1.0..50.0) * scale
                };
                (value * 1000.0).round() / 1000.0
            })
            .collect()
    }

    fn next_claim_id(&mut self) -> String {
        self.claim_counter += 1;
        format!("CLM-{:08}", self.claim_counter)
    }

    /// Manual form submission
    fn manual(&mut self, suspicious: bool) -> PredictionRequest {
        let mut fields: ManualFields = FEATURE_NAMES
            .iter()
            .zip(self.features(suspicious))
            .map(|(name, value)| (*name, value.to_string()))
            .collect();
        fields.insert(CLAIM_ID_FIELD, self.next_claim_id());
        fields.insert(
            CLAIM_AMOUNT_FIELD,
            format!("{:.2}", self.rng.gen_range(50.0..20000.0)),
        );
        PredictionRequest::manual(fields).with_user("test-requester")
    }

    /// Spreadsheet upload with shuffled, loosely formatted headers
    fn spreadsheet(&mut self, suspicious: bool) -> PredictionRequest {
        let mut pairs: Vec<(String, CellValue)> = FEATURE_NAMES
            .iter()
            .zip(self.features(suspicious))
            .map(|(name, value)| (format!(" {} ", name), CellValue::Number(value)))
            .collect();
        pairs.push((
            CLAIM_ID_FIELD.to_string(),
            CellValue::Text(self.next_claim_id()),
        ));
        let shift = self.rng.gen_range(0..pairs.len());
        pairs.rotate_left(shift);

        let (columns, row): (Vec<String>, Vec<CellValue>) = pairs.into_iter().unzip();
        let table = SpreadsheetTable {
            columns,
            rows: vec![row],
        };
        PredictionRequest::spreadsheet(table).with_user("test-requester")
    }

    /// A request the service must reject
    fn invalid(&mut self) -> PredictionRequest {
        let variant = self.rng.gen_range(0..3);
        self.invalid_variant(variant)
    }

    fn invalid_variant(&mut self, variant: u8) -> PredictionRequest {
        match variant {
            0 => {
                // Both sources at once
                let mut request = self.spreadsheet(false);
                request.manual = ManualFields::new().with(FEATURE_NAMES[0], "1.0");
                request
            }
            1 => {
                // Spreadsheet missing a column
                let mut request = self.spreadsheet(false);
                if let Some(table) = request.table.as_mut() {
                    let dropped = table
                        .columns
                        .iter()
                        .position(|c| normalize_column(c) == FEATURE_NAMES[0]);
                    if let Some(i) = dropped {
                        table.columns.remove(i);
                        table.rows[0].remove(i);
                    }
                }
                request
            }
            _ => {
                // Non-numeric manual value
                let mut request = self.manual(false);
                request.manual.insert("LengthOfStay", "three days");
                request
            }
        }
    }

    fn generate(&mut self, fraud_rate: f64, invalid_rate: f64) -> PredictionRequest {
        if self.rng.gen_bool(invalid_rate) {
            return self.invalid();
        }
        let suspicious = self.rng.gen_bool(fraud_rate);
        if self.rng.gen_bool(0.5) {
            self.manual(suspicious)
        } else {
            self.spreadsheet(suspicious)
        }
    }
}

fn log_response(response: &PredictionResponse) {
    match &response.outcome {
        Outcome::Accepted { result } => info!(
            request_id = %response.request_id,
            claim_id = %result.claim_id,
            label = %result.label,
            probability = result.probability,
            "Accepted"
        ),
        Outcome::Rejected { kind, message } => info!(
            request_id = %response.request_id,
            kind = %kind,
            message = %message,
            "Rejected"
        ),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_requester=info".parse()?),
        )
        .init();

    info!("Starting Test Request Generator");

    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("claims.predict");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(20);
    let fraud_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.2);
    let invalid_rate: f64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(6).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        fraud_rate = fraud_rate,
        invalid_rate = invalid_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let mut generator = RequestGenerator::new();

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            for i in 0..count {
                let request = generator.generate(fraud_rate, invalid_rate);
                if i == 0 || (i + 1) % 10 == 0 {
                    info!("Sample request {}:\n{}", i + 1, serde_json::to_string_pretty(&request)?);
                }
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            return Ok(());
        }
    };

    let (mut accepted, mut rejected) = (0u64, 0u64);

    for _ in 0..count {
        let request = generator.generate(fraud_rate, invalid_rate);
        let payload = serde_json::to_vec(&request)?;

        match client.request(subject.to_string(), payload.into()).await {
            Ok(message) => match serde_json::from_slice::<PredictionResponse>(&message.payload) {
                Ok(response) => {
                    if response.is_accepted() {
                        accepted += 1;
                    } else {
                        rejected += 1;
                    }
                    log_response(&response);
                }
                Err(e) => warn!(error = %e, "Unreadable response"),
            },
            Err(e) => warn!(request_id = %request.request_id, error = %e, "Request failed"),
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} requests ({} accepted, {} rejected)",
        count, accepted, rejected
    );

    Ok(())
}
