//! Configuration management for the scoring engine and service

use crate::error::{Result as ScoringResult, ScoringError};
use crate::feature_extractor::FeatureConfig;
use crate::models::aggregator::AggregationWeights;
use crate::models::pattern::ModelConfig;
use crate::network::NetworkConfig;
use crate::policy::DecisionConfig;
use crate::rules::behavioral::BehavioralRuleConfig;
use crate::rules::signatures::AmountSignatureTable;
use crate::rules::transaction::TransactionRuleConfig;
use crate::types::result::RiskLevelThresholds;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "SCORING_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub engine: EngineConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// Scoring engine configuration: every threshold, weight and rule table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub model: ModelConfig,
    pub features: FeatureConfig,
    pub network: NetworkConfig,
    pub behavioral_rules: BehavioralRuleConfig,
    pub transaction_rules: TransactionRuleConfig,
    /// Signature table used when a tenant has no override
    pub signatures: AmountSignatureTable,
    /// Per-tenant signature tables
    pub tenant_signatures: HashMap<String, AmountSignatureTable>,
    pub weights: AggregationWeights,
    pub risk_levels: RiskLevelThresholds,
    pub decision: DecisionConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> ScoringResult<()> {
        self.weights.validate()?;

        let levels = &self.risk_levels;
        if !(0.0..=levels.high).contains(&levels.medium)
            || !(levels.medium..=levels.critical).contains(&levels.high)
            || !(levels.high..=1.0).contains(&levels.critical)
        {
            return Err(ScoringError::Config(format!(
                "risk level thresholds must be ordered within [0, 1], got medium={} high={} critical={}",
                levels.medium, levels.high, levels.critical
            )));
        }

        if self.network.lookup_timeout_ms == 0 {
            return Err(ScoringError::Config(
                "network.lookup_timeout_ms must be positive".to_string(),
            ));
        }
        self.network.reputation.validate()?;

        if !(self.model.saturation_logit.is_finite() && self.model.saturation_logit > 0.0) {
            return Err(ScoringError::Config(format!(
                "model.saturation_logit must be positive, got {}",
                self.model.saturation_logit
            )));
        }

        Ok(())
    }
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming scoring requests
    pub request_subject: String,
    /// Subject for outgoing scoring results
    pub result_subject: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            request_subject: "transactions.scoring".to_string(),
            result_subject: "transactions.scored".to_string(),
        }
    }
}

/// Service loop configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum requests scored concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    pub metrics_interval_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            metrics_interval_secs: 30,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
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
    /// Load configuration from `$SCORING_CONFIG` or `config/config.toml`.
    ///
    /// A missing file yields the built-in defaults; `SCORING__SECTION__KEY`
    /// environment variables override file values.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("SCORING").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app.engine
            .validate()
            .context("Invalid engine configuration")?;

        Ok(app)
    }
}
