//! Network origin data structures

use serde::{Deserialize, Serialize};

/// Country and ASN label used when the origin cannot be located
pub const UNKNOWN_ORIGIN: &str = "Unknown";

/// Risk score reported when the reputation lookup is unavailable
pub const SAFE_DEFAULT_RISK: u32 = 50;

/// Raw answer from a reputation provider for one IP address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationRecord {
    pub is_vpn: bool,
    pub is_proxy: bool,
    pub is_tor: bool,
    /// Coarse country, `None` when the provider could not geolocate
    pub country: Option<String>,
    pub asn: Option<String>,
    pub threat_match: bool,
    pub threat_categories: Vec<String>,
}

/// Threat-intelligence part of a network assessment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatIntel {
    pub is_known_threat: bool,
    pub threat_types: Vec<String>,
}

/// Per-request classification of the network origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkAssessment {
    pub is_vpn: bool,
    pub is_proxy: bool,
    pub is_tor: bool,
    pub country: String,
    pub asn: String,
    pub threat_intelligence: ThreatIntel,
    /// 0-100
    pub risk_score: u32,
    /// True when the lookup failed and the safe default was substituted
    pub fallback: bool,
}

impl NetworkAssessment {
    /// Cautious assessment used when the reputation lookup fails.
    pub fn safe_default() -> Self {
        Self {
            is_vpn: false,
            is_proxy: false,
            is_tor: false,
            country: UNKNOWN_ORIGIN.to_string(),
            asn: UNKNOWN_ORIGIN.to_string(),
            threat_intelligence: ThreatIntel::default(),
            risk_score: SAFE_DEFAULT_RISK,
            fallback: true,
        }
    }

    /// Network risk on the 0-1 scale used by the aggregator
    pub fn normalized_risk(&self) -> f64 {
        f64::from(self.risk_score.min(100)) / 100.0
    }

    pub fn is_known_threat(&self) -> bool {
        self.threat_intelligence.is_known_threat
    }
}
