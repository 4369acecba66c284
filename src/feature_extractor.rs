//! Feature extraction for the pattern scoring model.
//!
//! Turns a scoring request into the fixed-length vector the model's first
//! layer expects. Extraction never fails: missing telemetry degrades to
//! neutral values.

use crate::rules::signatures::{is_multiple_of, SignatureRegistry};
use crate::types::request::{BehavioralData, PointerSample, ScoringRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Number of features produced per request
pub const FEATURE_COUNT: usize = 15;

/// Feature positions. The order is part of the model's contract.
pub mod index {
    pub const AMOUNT_LOG: usize = 0;
    pub const HOURS_FROM_NOON: usize = 1;
    pub const DAYS_FROM_MIDWEEK: usize = 2;
    pub const SESSION_HOURS: usize = 3;
    pub const TRANSACTION_COUNT: usize = 4;
    pub const AVERAGE_AMOUNT_LOG: usize = 5;
    pub const VELOCITY: usize = 6;
    pub const AMOUNT_ANOMALY: usize = 7;
    pub const BUSINESS_HOURS: usize = 8;
    pub const WEEKEND: usize = 9;
    pub const TYPING_ANOMALY: usize = 10;
    pub const POINTER_ANOMALY: usize = 11;
    pub const HIGH_VALUE: usize = 12;
    pub const ROUND_AMOUNT: usize = 13;
    pub const AMOUNT_DISTRIBUTION: usize = 14;
}

/// Value used for features whose inputs are absent
pub const NEUTRAL: f64 = 0.5;

/// Ordered feature vector for one request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, position: usize) -> Option<f64> {
        self.0.get(position).copied()
    }

    /// Amount-distribution suspicion from the signature table
    pub fn amount_distribution(&self) -> f64 {
        self.0[index::AMOUNT_DISTRIBUTION]
    }

    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Scales and thresholds used during extraction.
///
/// Every feature lands in [0, 1] so that no single input dominates the
/// model's first layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Amount whose logarithm maps to 1.0
    pub amount_log_ceiling: f64,
    /// Session length (hours) that maps to 1.0
    pub session_hours_cap: f64,
    /// Velocity saturates at this many transactions per hour
    pub velocity_cap_per_hour: f64,
    /// Log-ratio that maps to a full amount anomaly
    pub amount_anomaly_scale: f64,
    pub business_hours_start: u8,
    pub business_hours_end: u8,
    /// Typing variance (ms^2) that maps to a full anomaly
    pub typing_variance_scale: f64,
    /// Mean pointer step (px) that maps to a full anomaly
    pub pointer_distance_scale: f64,
    pub large_transaction_threshold: f64,
    pub round_amount_step: f64,
    pub round_amount_min: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            amount_log_ceiling: 100_000_000.0,
            session_hours_cap: 4.0,
            velocity_cap_per_hour: 10.0,
            amount_anomaly_scale: 5.0,
            business_hours_start: 8,
            business_hours_end: 17,
            typing_variance_scale: 1000.0,
            pointer_distance_scale: 100.0,
            large_transaction_threshold: 1_000_000.0,
            round_amount_step: 1_000.0,
            round_amount_min: 10_000.0,
        }
    }
}

/// Feature extractor that transforms requests into model input features.
pub struct FeatureExtractor {
    config: FeatureConfig,
    signatures: Arc<SignatureRegistry>,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig, signatures: Arc<SignatureRegistry>) -> Self {
        Self { config, signatures }
    }

    /// Extract features from a request.
    ///
    /// The amount-distribution feature uses the signature table of the
    /// request's tenant.
    pub fn extract(&self, request: &ScoringRequest) -> FeatureVector {
        let behavioral = &request.behavioral;
        let amount = sanitize(request.transaction.amount);
        let average = behavioral.average_amount();
        let hour = behavioral.hour();
        let day = behavioral.day();

        let mut features = [0.0; FEATURE_COUNT];

        // Transaction; night and weekend sit far from noon and midweek
        features[index::AMOUNT_LOG] = self.amount_log(amount);
        features[index::HOURS_FROM_NOON] = f64::from(hour.abs_diff(12)) / 12.0;
        features[index::DAYS_FROM_MIDWEEK] = f64::from(day.abs_diff(3)) / 3.0;

        // History
        features[index::SESSION_HOURS] =
            (behavioral.session_seconds() / 3600.0 / self.config.session_hours_cap).min(1.0);
        features[index::TRANSACTION_COUNT] =
            (f64::from(behavioral.previous_transaction_count) / 100.0).min(1.0);
        features[index::AVERAGE_AMOUNT_LOG] = self.amount_log(average);

        // Velocity
        features[index::VELOCITY] = self.velocity(behavioral);
        features[index::AMOUNT_ANOMALY] = self.amount_anomaly(amount, average);

        // Calendar
        features[index::BUSINESS_HOURS] = flag(
            (self.config.business_hours_start..=self.config.business_hours_end).contains(&hour),
        );
        features[index::WEEKEND] = flag(day == 0 || day == 6);

        // Interaction telemetry
        features[index::TYPING_ANOMALY] = self.typing_anomaly(&behavioral.typing_pattern);
        features[index::POINTER_ANOMALY] = self.pointer_anomaly(&behavioral.pointer_movements);

        // Amount shape
        features[index::HIGH_VALUE] = flag(amount > self.config.large_transaction_threshold);
        features[index::ROUND_AMOUNT] = flag(
            amount >= self.config.round_amount_min
                && is_multiple_of(amount, self.config.round_amount_step),
        );
        features[index::AMOUNT_DISTRIBUTION] = self
            .signatures
            .table_for(request.tenant_id.as_deref())
            .score(amount);

        for value in features.iter_mut() {
            if !value.is_finite() {
                *value = NEUTRAL;
            }
        }

        FeatureVector::new(features)
    }

    fn amount_log(&self, amount: f64) -> f64 {
        (amount.ln_1p() / self.config.amount_log_ceiling.ln_1p()).min(1.0)
    }

    fn velocity(&self, behavioral: &BehavioralData) -> f64 {
        let cap = self.config.velocity_cap_per_hour;
        if cap <= 0.0 {
            return NEUTRAL;
        }
        behavioral.transactions_per_hour().min(cap) / cap
    }

    fn amount_anomaly(&self, amount: f64, average: f64) -> f64 {
        if average == 0.0 {
            return NEUTRAL;
        }
        let ratio = amount / average;
        (ratio.ln().abs() / self.config.amount_anomaly_scale).min(1.0)
    }

    fn typing_anomaly(&self, pattern: &[f64]) -> f64 {
        let samples: Vec<f64> = pattern.iter().copied().filter(|v| v.is_finite()).collect();
        if samples.is_empty() {
            return NEUTRAL;
        }

        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let variance = samples.iter().map(|&v| (v - mean).powi(2)).sum::<f64>()
            / samples.len() as f64;

        (variance / self.config.typing_variance_scale).min(1.0)
    }

    /// Mean step length between pointer samples; jerky movement suggests automation.
    fn pointer_anomaly(&self, movements: &[PointerSample]) -> f64 {
        if movements.is_empty() {
            return NEUTRAL;
        }

        let travelled: f64 = movements
            .windows(2)
            .map(|pair| (pair[1].x - pair[0].x).hypot(pair[1].y - pair[0].y))
            .sum();
        let mean_step = travelled / movements.len() as f64;

        (mean_step / self.config.pointer_distance_scale).min(1.0)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names in vector order.
    pub fn feature_names(&self) -> [&'static str; FEATURE_COUNT] {
        [
            "amount_log",
            "hours_from_noon",
            "days_from_midweek",
            "session_hours",
            "transaction_count",
            "average_amount_log",
            "velocity",
            "amount_anomaly",
            "business_hours",
            "weekend",
            "typing_anomaly",
            "pointer_anomaly",
            "high_value",
            "round_amount",
            "amount_distribution",
        ]
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(FeatureConfig::default(), Arc::new(SignatureRegistry::default()))
    }
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::signatures::{AmountSignatureTable, SignatureRule};

    fn request(amount: f64) -> ScoringRequest {
        let mut request = ScoringRequest::new(amount, "0123456789");
        request.behavioral.session_duration = 1800.0;
        request.behavioral.previous_transaction_count = 2;
        request.behavioral.avg_transaction_amount = 20_000.0;
        request.behavioral.hour_of_day = 14;
        request.behavioral.day_of_week = 2;
        request
    }

    #[test]
    fn test_feature_extraction() {
        let extractor = FeatureExtractor::default();
        let features = extractor.extract(&request(20_000.0));

        assert_eq!(features.len(), extractor.feature_count());
        let amount_log = 20_001f64.ln() / 100_000_001f64.ln();
        assert!((features.as_slice()[index::AMOUNT_LOG] - amount_log).abs() < 1e-9);
        assert!((features.as_slice()[index::HOURS_FROM_NOON] - 2.0 / 12.0).abs() < 1e-9);
        assert!((features.as_slice()[index::DAYS_FROM_MIDWEEK] - 1.0 / 3.0).abs() < 1e-9);
        // Half an hour against a four-hour cap
        assert_eq!(features.as_slice()[index::SESSION_HOURS], 0.125);
        assert_eq!(features.as_slice()[index::TRANSACTION_COUNT], 0.02);
        // 4 tx/hour against a cap of 10
        assert!((features.as_slice()[index::VELOCITY] - 0.4).abs() < 1e-9);
        assert_eq!(features.as_slice()[index::AMOUNT_ANOMALY], 0.0);
        assert_eq!(features.as_slice()[index::BUSINESS_HOURS], 1.0);
        assert_eq!(features.as_slice()[index::WEEKEND], 0.0);
        assert_eq!(features.as_slice()[index::HIGH_VALUE], 0.0);
        assert_eq!(features.as_slice()[index::ROUND_AMOUNT], 1.0);
    }

    #[test]
    fn test_feature_count() {
        let extractor = FeatureExtractor::default();
        assert_eq!(extractor.feature_count(), 15);
        assert_eq!(extractor.feature_names().len(), 15);
    }

    #[test]
    fn test_missing_telemetry_is_neutral() {
        let extractor = FeatureExtractor::default();
        let mut req = request(5_000.0);
        req.behavioral.avg_transaction_amount = 0.0;

        let features = extractor.extract(&req);

        assert_eq!(features.as_slice()[index::TYPING_ANOMALY], NEUTRAL);
        assert_eq!(features.as_slice()[index::POINTER_ANOMALY], NEUTRAL);
        assert_eq!(features.as_slice()[index::AMOUNT_ANOMALY], NEUTRAL);
    }

    #[test]
    fn test_amount_anomaly_saturates() {
        let extractor = FeatureExtractor::default();
        let mut req = request(1.0e9);
        req.behavioral.avg_transaction_amount = 10.0;

        let features = extractor.extract(&req);
        assert_eq!(features.as_slice()[index::AMOUNT_ANOMALY], 1.0);
    }

    #[test]
    fn test_typing_and_pointer_samples() {
        let extractor = FeatureExtractor::default();
        let mut req = request(5_000.0);
        req.behavioral.typing_pattern = vec![100.0, 120.0, 80.0, 100.0];
        req.behavioral.pointer_movements = vec![
            PointerSample { x: 0.0, y: 0.0, timestamp: 0.0 },
            PointerSample { x: 30.0, y: 40.0, timestamp: 16.0 },
        ];

        let features = extractor.extract(&req);

        // variance 200 / 1000
        assert!((features.as_slice()[index::TYPING_ANOMALY] - 0.2).abs() < 1e-9);
        // 50px travelled over 2 samples / 100
        assert!((features.as_slice()[index::POINTER_ANOMALY] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_weekend_and_out_of_range_calendar() {
        let extractor = FeatureExtractor::default();
        let mut req = request(5_000.0);
        req.behavioral.day_of_week = 9;
        req.behavioral.hour_of_day = -4;

        let features = extractor.extract(&req);

        assert_eq!(features.as_slice()[index::DAYS_FROM_MIDWEEK], 1.0);
        assert_eq!(features.as_slice()[index::WEEKEND], 1.0);
        assert_eq!(features.as_slice()[index::HOURS_FROM_NOON], 1.0);
        assert_eq!(features.as_slice()[index::BUSINESS_HOURS], 0.0);
    }

    #[test]
    fn test_features_stay_in_unit_range() {
        let extractor = FeatureExtractor::default();
        let mut req = request(1.0e12);
        req.behavioral.avg_transaction_amount = 5.0e11;
        req.behavioral.session_duration = 86_400.0;
        req.behavioral.previous_transaction_count = 5_000;

        let features = extractor.extract(&req);

        assert!(features.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(features.as_slice()[index::AMOUNT_LOG], 1.0);
        assert_eq!(features.as_slice()[index::AVERAGE_AMOUNT_LOG], 1.0);
        assert_eq!(features.as_slice()[index::SESSION_HOURS], 1.0);
        assert_eq!(features.as_slice()[index::TRANSACTION_COUNT], 1.0);
    }

    #[test]
    fn test_signature_table_follows_tenant() {
        let registry = Arc::new(SignatureRegistry::default());
        registry.set_tenant_table(
            "gh-bank",
            AmountSignatureTable::new(
                vec![SignatureRule::Exact {
                    amounts: vec![5_000.0],
                    score: 0.92,
                }],
                0.2,
            ),
        );
        let extractor = FeatureExtractor::new(FeatureConfig::default(), registry);

        let default_features = extractor.extract(&request(419.0));
        let tenant_features = extractor.extract(&request(5_000.0).with_tenant("gh-bank"));

        assert_eq!(default_features.amount_distribution(), 0.95);
        assert_eq!(tenant_features.amount_distribution(), 0.92);
    }

    #[test]
    fn test_all_features_finite() {
        let extractor = FeatureExtractor::default();
        let mut req = request(f64::NAN);
        req.behavioral.session_duration = f64::INFINITY;
        req.behavioral.typing_pattern = vec![f64::NAN];

        let features = extractor.extract(&req);
        assert!(features.as_slice().iter().all(|v| v.is_finite()));
    }
}
