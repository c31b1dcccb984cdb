//! Claim Fraud Screening Service - Main Entry Point
//!
//! Consumes prediction requests from NATS, runs the screening pipeline and
//! publishes a response for every request.

use anyhow::{Context, Result};
use claim_fraud_screening::{
    config::{AppConfig, LoggingConfig},
    consumer::RequestConsumer,
    metrics::{MetricsReporter, PipelineMetrics},
    models::inference::OnnxClassifier,
    pipeline::Pipeline,
    producer::ResponseProducer,
    schema::{self, SchemaInfo},
};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info};

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        format!("claim_fraud_screening={}", logging.level).parse()?,
    );

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Claim Fraud Screening Service");

    // Feature schema self-check
    schema::verify().context("Feature schema failed its self-check")?;
    let schema_info = SchemaInfo::current();
    info!(
        features = schema_info.feature_count,
        fingerprint = schema_info.fingerprint,
        "Feature schema verified"
    );
    if let Some(expected) = config.model.schema_fingerprint {
        if expected != schema_info.fingerprint {
            anyhow::bail!(
                "Model expects schema fingerprint {}, this build has {}",
                expected,
                schema_info.fingerprint
            );
        }
    }

    // Load the classifier once; every request shares it
    let classifier = Arc::new(OnnxClassifier::from_config(&config.model)?);
    let pipeline = Arc::new(Pipeline::new(
        classifier,
        config.pipeline.missing_field_policy,
    )?);
    info!(
        model = %pipeline.model_name(),
        missing_field_policy = ?pipeline.missing_policy(),
        "Pipeline initialized"
    );

    let metrics = Arc::new(PipelineMetrics::new());

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(client.clone(), &config.nats);
    let producer = Arc::new(ResponseProducer::new(
        client.clone(),
        &config.nats.response_subject,
    ));

    let num_workers = config.pipeline.workers.max(1);
    info!(
        workers = num_workers,
        requests = %consumer.subject(),
        queue_group = ?consumer.queue_group(),
        responses = %producer.subject(),
        "Starting request processing loop"
    );

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    // Periodic metrics summary
    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, 60);
        reporter.start().await;
    });

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore.clone().acquire_owned().await?;

        let pipeline = pipeline.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let response = pipeline.respond_bytes(&message.payload);
            metrics.record_response(&response, start_time.elapsed());

            if let Err(e) = producer.publish(&response, message.reply.clone()).await {
                error!(
                    request_id = %response.request_id,
                    error = %e,
                    "Failed to publish prediction response"
                );
            }

            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 100 == 0 {
                let stats = metrics.get_processing_stats();
                let throughput = format!("{:.1} req/s", metrics.get_throughput());
                info!(
                    processed = count,
                    throughput = %throughput,
                    avg_latency_us = stats.mean_us,
                    "Processing milestone"
                );
            }

            drop(permit);
        });
    }

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}
