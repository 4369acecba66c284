//! Session and velocity heuristics

use crate::types::request::BehavioralData;
use serde::{Deserialize, Serialize};

/// Thresholds and increments for the behavioral rule score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehavioralRuleConfig {
    /// Sessions shorter than this many seconds look scripted
    pub short_session_secs: f64,
    pub short_session_weight: f64,
    pub long_session_secs: f64,
    pub long_session_weight: f64,
    /// Prior transactions per session hour above which velocity is suspicious
    pub max_transactions_per_hour: f64,
    pub velocity_weight: f64,
    /// Hours before this are unusual
    pub active_hours_start: u8,
    /// Hours after this are unusual
    pub active_hours_end: u8,
    pub unusual_hours_weight: f64,
}

impl Default for BehavioralRuleConfig {
    fn default() -> Self {
        Self {
            short_session_secs: 30.0,
            short_session_weight: 0.3,
            long_session_secs: 3600.0,
            long_session_weight: 0.2,
            max_transactions_per_hour: 10.0,
            velocity_weight: 0.4,
            active_hours_start: 6,
            active_hours_end: 23,
            unusual_hours_weight: 0.2,
        }
    }
}

/// Rule-based scorer for session and velocity anomalies
#[derive(Debug, Clone, Default)]
pub struct BehavioralRules {
    config: BehavioralRuleConfig,
}

impl BehavioralRules {
    pub fn new(config: BehavioralRuleConfig) -> Self {
        Self { config }
    }

    /// Behavioral risk in [0, 1].
    pub fn score(&self, behavioral: &BehavioralData) -> f64 {
        let mut score = 0.0;

        if self.is_session_too_short(behavioral) {
            score += self.config.short_session_weight;
        }
        if behavioral.session_seconds() > self.config.long_session_secs {
            score += self.config.long_session_weight;
        }
        if self.is_high_velocity(behavioral) {
            score += self.config.velocity_weight;
        }
        if self.is_unusual_hour(behavioral) {
            score += self.config.unusual_hours_weight;
        }

        f64::min(score, 1.0)
    }

    pub fn is_session_too_short(&self, behavioral: &BehavioralData) -> bool {
        behavioral.session_seconds() < self.config.short_session_secs
    }

    pub fn is_high_velocity(&self, behavioral: &BehavioralData) -> bool {
        behavioral.transactions_per_hour() > self.config.max_transactions_per_hour
    }

    pub fn is_unusual_hour(&self, behavioral: &BehavioralData) -> bool {
        let hour = behavioral.hour();
        hour < self.config.active_hours_start || hour > self.config.active_hours_end
    }
}
