//! Weighted combination of the component risk scores

use crate::error::{Result, ScoringError};
use crate::types::network::NetworkAssessment;
use crate::types::result::{RiskLevel, RiskLevelThresholds};
use serde::{Deserialize, Serialize};

/// Linear weights of the four component scores
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationWeights {
    pub model: f64,
    pub network: f64,
    pub behavioral: f64,
    pub transaction: f64,
}

impl Default for AggregationWeights {
    fn default() -> Self {
        Self {
            model: 0.40,
            network: 0.25,
            behavioral: 0.20,
            transaction: 0.15,
        }
    }
}

impl AggregationWeights {
    pub fn total(&self) -> f64 {
        self.model + self.network + self.behavioral + self.transaction
    }

    /// Weights must be non-negative and sum to one.
    pub fn validate(&self) -> Result<()> {
        let weights = [self.model, self.network, self.behavioral, self.transaction];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ScoringError::Config(
                "aggregation weights must be non-negative".to_string(),
            ));
        }
        if (self.total() - 1.0).abs() > 1e-6 {
            return Err(ScoringError::Config(format!(
                "aggregation weights must sum to 1, got {:.4}",
                self.total()
            )));
        }
        Ok(())
    }
}

/// Combines model, network, behavioral and transaction scores into one risk score.
#[derive(Debug, Clone, Default)]
pub struct RiskAggregator {
    weights: AggregationWeights,
    thresholds: RiskLevelThresholds,
}

impl RiskAggregator {
    pub fn new(weights: AggregationWeights, thresholds: RiskLevelThresholds) -> Result<Self> {
        weights.validate()?;
        Ok(Self {
            weights,
            thresholds,
        })
    }

    /// Combined score in [0, 1].
    pub fn aggregate(
        &self,
        model_score: f64,
        network: &NetworkAssessment,
        behavioral_score: f64,
        transaction_score: f64,
    ) -> f64 {
        let combined = model_score * self.weights.model
            + network.normalized_risk() * self.weights.network
            + behavioral_score * self.weights.behavioral
            + transaction_score * self.weights.transaction;

        combined.clamp(0.0, 1.0)
    }

    pub fn risk_level(&self, combined: f64) -> RiskLevel {
        RiskLevel::from_score(combined, &self.thresholds)
    }

    /// Public 0-100 score with two decimals.
    pub fn display_score(combined: f64) -> f64 {
        round2(combined * 100.0)
    }

    pub fn weights(&self) -> &AggregationWeights {
        &self.weights
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
