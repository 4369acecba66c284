//! Decision policy: verdict, flags, recommendations and confidence
//!
//! Everything here is a lookup over fixed tables so the verdict stays
//! auditable and testable apart from the scoring arithmetic.

use crate::models::aggregator::round2;
use crate::types::network::NetworkAssessment;
use crate::types::result::{Decision, Flag, RiskLevel};
use serde::{Deserialize, Serialize};

/// Score cut-offs used by the decision table and the flag rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Critical-level scores at or above this are blocked
    pub block_min: f64,
    /// Medium-level scores at or above this go to review
    pub medium_review_min: f64,
    /// Model scores above this raise `ml_high_risk`
    pub model_high_risk: f64,
    /// Model scores above this raise `ml_critical_risk`
    pub model_critical_risk: f64,
    /// Model scores above this count towards confidence
    pub model_confidence_min: f64,
    /// Network risk scores above this count towards confidence
    pub network_confidence_min: u32,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            block_min: 0.9,
            medium_review_min: 0.5,
            model_high_risk: 0.7,
            model_critical_risk: 0.9,
            model_confidence_min: 0.5,
            network_confidence_min: 50,
        }
    }
}

/// Observations the policy turns into flags
#[derive(Debug, Clone)]
pub struct RiskSignals<'a> {
    pub model_score: f64,
    pub network: &'a NetworkAssessment,
    pub session_too_short: bool,
    pub high_velocity: bool,
    pub high_value: bool,
    pub round_amount: bool,
    pub unusual_hours: bool,
    pub signature_amount: bool,
}

/// Guidance for individual flags, in output order
const FLAG_GUIDANCE: &[(Flag, &str)] = &[
    (
        Flag::VpnDetected,
        "Consider additional identity verification due to VPN usage",
    ),
    (
        Flag::ProxyDetected,
        "Consider additional identity verification due to proxy usage",
    ),
    (
        Flag::TorDetected,
        "Consider additional identity verification due to Tor usage",
    ),
    (
        Flag::HighVelocity,
        "Review recent transaction patterns for velocity abuse",
    ),
    (
        Flag::HighValue,
        "Verify transaction with additional authentication steps",
    ),
    (
        Flag::SignatureAmount,
        "Confirm the payee with the customer; amount matches a known fraud signature",
    ),
    (
        Flag::ThreatIp,
        "Block transaction - IP associated with known threats",
    ),
];

/// Guidance added for high and critical risk levels
const ESCALATION_GUIDANCE: &[&str] = &[
    "Route to manual review by a fraud specialist",
    "Consider contacting customer via verified phone number",
];

const STANDARD_GUIDANCE: &str =
    "Transaction appears legitimate - proceed with standard processing";

/// Maps scores and signals to the final verdict.
#[derive(Debug, Clone, Default)]
pub struct DecisionPolicy {
    config: DecisionConfig,
}

impl DecisionPolicy {
    pub fn new(config: DecisionConfig) -> Self {
        Self { config }
    }

    pub fn decide(&self, level: RiskLevel, combined: f64) -> Decision {
        match level {
            RiskLevel::Critical if combined >= self.config.block_min => Decision::Block,
            RiskLevel::Critical | RiskLevel::High => Decision::Review,
            RiskLevel::Medium if combined >= self.config.medium_review_min => Decision::Review,
            RiskLevel::Medium | RiskLevel::Low => Decision::Approve,
        }
    }

    /// Flags in detection order, without duplicates.
    pub fn flags(&self, signals: &RiskSignals<'_>) -> Vec<Flag> {
        let network = signals.network;
        let detected = [
            (signals.model_score > self.config.model_high_risk, Flag::MlHighRisk),
            (signals.model_score > self.config.model_critical_risk, Flag::MlCriticalRisk),
            (network.is_vpn, Flag::VpnDetected),
            (network.is_proxy, Flag::ProxyDetected),
            (network.is_tor, Flag::TorDetected),
            (network.is_known_threat(), Flag::ThreatIp),
            (signals.session_too_short, Flag::SessionTooShort),
            (signals.high_velocity, Flag::HighVelocity),
            (signals.high_value, Flag::HighValue),
            (signals.round_amount, Flag::RoundAmount),
            (signals.unusual_hours, Flag::UnusualHours),
            (signals.signature_amount, Flag::SignatureAmount),
        ];

        let mut flags = Vec::new();
        for (raised, flag) in detected {
            if raised && !flags.contains(&flag) {
                flags.push(flag);
            }
        }
        flags
    }

    pub fn recommendations(&self, flags: &[Flag], level: RiskLevel) -> Vec<String> {
        let mut recommendations: Vec<String> = FLAG_GUIDANCE
            .iter()
            .filter(|(flag, _)| flags.contains(flag))
            .map(|(_, text)| text.to_string())
            .collect();

        if matches!(level, RiskLevel::High | RiskLevel::Critical) {
            recommendations.extend(ESCALATION_GUIDANCE.iter().map(|text| text.to_string()));
        }

        if recommendations.is_empty() {
            recommendations.push(STANDARD_GUIDANCE.to_string());
        }
        recommendations
    }

    /// Share of agreeing risk indicators, two decimals.
    pub fn confidence(&self, model_score: f64, network: &NetworkAssessment) -> f64 {
        let indicators = [
            model_score > self.config.model_confidence_min,
            network.risk_score > self.config.network_confidence_min,
            network.is_known_threat(),
        ];
        let agreeing = indicators.iter().filter(|&&raised| raised).count();

        round2(agreeing as f64 / indicators.len() as f64)
    }
}
