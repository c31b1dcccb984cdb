//! Configuration management for the claim screening service

use crate::assembler::MissingFieldPolicy;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "CLAIM_SCREENING_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming prediction requests
    pub request_subject: String,
    /// Subject for responses to requests that carry no reply subject
    pub response_subject: String,
    /// Queue group shared by service instances; plain subscription when unset
    #[serde(default)]
    pub queue_group: Option<String>,
}

/// Classifier configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX classifier
    pub path: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Output holding predicted class ids
    #[serde(default = "default_label_output")]
    pub label_output: String,
    /// Output holding class probabilities
    #[serde(default = "default_probability_output")]
    pub probability_output: String,
    /// Expected feature layout fingerprint; startup fails on mismatch
    #[serde(default)]
    pub schema_fingerprint: Option<u32>,
}

fn default_threads() -> usize {
    1
}

fn default_label_output() -> String {
    "label".to_string()
}

fn default_probability_output() -> String {
    "probabilities".to_string()
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum requests processed concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Meaning of a blank manual feature
    #[serde(default)]
    pub missing_field_policy: MissingFieldPolicy,
}

fn default_workers() -> usize {
    4
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            missing_field_policy: MissingFieldPolicy::Zero,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `CLAIM_SCREENING_CONFIG` or `config/config.toml`
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config/config.toml".to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path.
    ///
    /// `CLAIM_SCREENING__SECTION__KEY` environment variables override file values.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("CLAIM_SCREENING").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                request_subject: "claims.predict".to_string(),
                response_subject: "claims.predictions".to_string(),
                queue_group: None,
            },
            model: ModelConfig {
                path: "model/final_model.onnx".to_string(),
                threads: default_threads(),
                label_output: default_label_output(),
                probability_output: default_probability_output(),
                schema_fingerprint: None,
            },
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
