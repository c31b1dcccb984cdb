//! Request statistics for the claim screening service.

use crate::types::request::{Outcome, PredictionResponse};
use crate::types::result::Label;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for pipeline requests
pub struct PipelineMetrics {
    /// Total requests processed
    pub requests_processed: AtomicU64,
    /// Requests that produced a prediction
    pub accepted: AtomicU64,
    /// Requests that were rejected
    pub rejected: AtomicU64,
    /// Rejections by error kind
    rejections_by_kind: RwLock<HashMap<String, u64>>,
    /// Accepted predictions by label
    predictions_by_label: RwLock<HashMap<Label, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Fraud probability distribution buckets (10% wide)
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests_processed: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            rejections_by_kind: RwLock::new(HashMap::new()),
            predictions_by_label: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a finished request
    pub fn record_response(&self, response: &PredictionResponse, processing_time: Duration) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        match &response.outcome {
            Outcome::Accepted { result } => {
                self.accepted.fetch_add(1, Ordering::Relaxed);

                if let Ok(mut by_label) = self.predictions_by_label.write() {
                    *by_label.entry(result.label).or_insert(0) += 1;
                }

                let bucket = ((result.probability / 10.0) as usize).min(9);
                if let Ok(mut buckets) = self.probability_buckets.write() {
                    buckets[bucket] += 1;
                }
            }
            Outcome::Rejected { kind, .. } => {
                self.rejected.fetch_add(1, Ordering::Relaxed);

                if let Ok(mut by_kind) = self.rejections_by_kind.write() {
                    *by_kind.entry(kind.clone()).or_insert(0) += 1;
                }
            }
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = match self.processing_times.read() {
            Ok(times) => times,
            Err(_) => return ProcessingStats::default(),
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get probability distribution
    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|b| *b)
            .unwrap_or([0; 10])
    }

    /// Get rejections by error kind
    pub fn get_rejections_by_kind(&self) -> HashMap<String, u64> {
        self.rejections_by_kind
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Get accepted predictions by label
    pub fn get_predictions_by_label(&self) -> HashMap<Label, u64> {
        self.predictions_by_label
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let total = self.requests_processed.load(Ordering::Relaxed);
        let accepted = self.accepted.load(Ordering::Relaxed);
        let rejected = self.rejected.load(Ordering::Relaxed);
        let rejection_rate = if total > 0 {
            (rejected as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let by_label = self.get_predictions_by_label();
        let by_kind = self.get_rejections_by_kind();
        let dist = self.get_probability_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            CLAIM SCREENING SERVICE - METRICS SUMMARY         ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Requests Processed: {:>8}  │  Throughput: {:>6.1} req/s   ║",
            total, throughput
        );
        info!(
            "║ Accepted: {:>8}  Rejected: {:>8}  ({:>5.1}% rejected)     ║",
            accepted, rejected, rejection_rate
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Predictions by Label:                                        ║");
        for label in [Label::Fraudulent, Label::NotFraudulent] {
            let count = by_label.get(&label).copied().unwrap_or(0);
            info!("║   {:15}: {:>6}                                    ║", label.as_str(), count);
        }
        if !by_kind.is_empty() {
            info!("╠══════════════════════════════════════════════════════════════╣");
            info!("║ Rejections by Kind:                                          ║");
            for (kind, count) in &by_kind {
                info!("║   {:25}: {:>6}                          ║", kind, count);
            }
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Fraud Probability Distribution:                              ║");
        let scored: u64 = dist.iter().sum();
        for (i, &count) in dist.iter().enumerate() {
            let pct = if scored > 0 {
                (count as f64 / scored as f64) * 100.0
            } else {
                0.0
            };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:>3}-{:>3}%: {:>6} ({:>5.1}%) {}",
                i * 10,
                (i + 1) * 10,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::input::ManualFields;
    use crate::types::request::PredictionRequest;
    use crate::types::result::PredictionResult;

    fn accepted(label: Label, probability: f64) -> PredictionResponse {
        PredictionResponse::new(
            &PredictionRequest::manual(ManualFields::new()),
            Outcome::Accepted {
                result: PredictionResult {
                    label,
                    probability,
                    claim_id: "Manual Entry".to_string(),
                    amount: 0.0,
                },
            },
        )
    }

    fn rejected(kind: &str) -> PredictionResponse {
        PredictionResponse::new(
            &PredictionRequest::manual(ManualFields::new()),
            Outcome::Rejected {
                kind: kind.to_string(),
                message: String::new(),
            },
        )
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_response(&accepted(Label::Fraudulent, 87.34), Duration::from_micros(100));
        metrics.record_response(&accepted(Label::NotFraudulent, 4.0), Duration::from_micros(200));
        metrics.record_response(&rejected("missing_columns"), Duration::from_micros(50));

        assert_eq!(metrics.requests_processed.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.accepted.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.rejected.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.get_rejections_by_kind().get("missing_columns"), Some(&1));
        assert_eq!(metrics.get_predictions_by_label().get(&Label::Fraudulent), Some(&1));
        assert_eq!(metrics.get_processing_stats().count, 3);
    }

    #[test]
    fn test_probability_buckets() {
        let metrics = PipelineMetrics::new();

        metrics.record_response(&accepted(Label::Fraudulent, 100.0), Duration::from_micros(1));
        metrics.record_response(&accepted(Label::NotFraudulent, 0.0), Duration::from_micros(1));
        metrics.record_response(&accepted(Label::Fraudulent, 55.5), Duration::from_micros(1));

        let dist = metrics.get_probability_distribution();
        assert_eq!(dist[9], 1);
        assert_eq!(dist[0], 1);
        assert_eq!(dist[5], 1);
    }
}
