//! Scoring result data structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Determine risk level from a 0-1 combined score.
    ///
    /// Each tier includes its lower bound.
    pub fn from_score(score: f64, thresholds: &RiskLevelThresholds) -> Self {
        if score >= thresholds.critical {
            RiskLevel::Critical
        } else if score >= thresholds.high {
            RiskLevel::High
        } else if score >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds of the medium, high and critical tiers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLevelThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            medium: 0.3,
            high: 0.6,
            critical: 0.8,
        }
    }
}

/// Advisory action for the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Review,
    Block,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Review => "review",
            Decision::Block => "block",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk indicators raised during analysis, in detection order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    MlHighRisk,
    MlCriticalRisk,
    VpnDetected,
    ProxyDetected,
    TorDetected,
    ThreatIp,
    SessionTooShort,
    HighVelocity,
    HighValue,
    RoundAmount,
    UnusualHours,
    SignatureAmount,
    AnalysisError,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::MlHighRisk => "ml_high_risk",
            Flag::MlCriticalRisk => "ml_critical_risk",
            Flag::VpnDetected => "vpn_detected",
            Flag::ProxyDetected => "proxy_detected",
            Flag::TorDetected => "tor_detected",
            Flag::ThreatIp => "threat_ip",
            Flag::SessionTooShort => "session_too_short",
            Flag::HighVelocity => "high_velocity",
            Flag::HighValue => "high_value",
            Flag::RoundAmount => "round_amount",
            Flag::UnusualHours => "unusual_hours",
            Flag::SignatureAmount => "signature_amount",
            Flag::AnalysisError => "analysis_error",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Component scores behind a verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    /// Pattern scoring model output (0-1)
    pub model: f64,
    /// Network risk (0-1)
    pub network: f64,
    pub behavioral: f64,
    pub transaction: f64,
    /// Amount-distribution suspicion from the signature table
    pub signature_suspicion: f64,
    pub network_fallback: bool,
    pub country: String,
}

/// Final verdict returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResult {
    /// Combined score on the 0-100 scale, two decimals
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub decision: Decision,
    /// 0-1
    pub confidence: f64,
    pub flags: Vec<Flag>,
    pub recommendations: Vec<String>,
    #[serde(rename = "processingTime")]
    pub processing_time_ms: u64,
    pub session_id: String,
    /// Absent on fail-safe results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
}

/// Display score reported when analysis fails internally
pub const FAIL_SAFE_RISK_SCORE: f64 = 75.0;

/// Confidence reported when analysis fails internally
pub const FAIL_SAFE_CONFIDENCE: f64 = 0.3;

impl ScoringResult {
    /// Cautious verdict for an analysis that could not complete.
    pub fn fail_safe(session_id: String, processing_time_ms: u64) -> Self {
        Self {
            risk_score: FAIL_SAFE_RISK_SCORE,
            risk_level: RiskLevel::High,
            decision: Decision::Review,
            confidence: FAIL_SAFE_CONFIDENCE,
            flags: vec![Flag::AnalysisError],
            recommendations: vec!["Manual review required due to system error".to_string()],
            processing_time_ms,
            session_id,
            breakdown: None,
        }
    }

    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }
}
