//! Network reputation analysis
//!
//! Classifies the request's origin (anonymizers, coarse location, threat
//! intelligence) into a 0-100 risk score. Lookup failures and timeouts
//! produce the safe-default assessment instead of an error.

pub mod lookup;

pub use lookup::{ReputationLookup, StaticReputationConfig, StaticReputationLookup, ThreatPrefix};

use crate::error::LookupError;
use crate::types::network::{NetworkAssessment, ReputationRecord, ThreatIntel, UNKNOWN_ORIGIN};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Risk contributions of each network finding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkRiskWeights {
    pub vpn: u32,
    pub proxy: u32,
    pub tor: u32,
    pub known_threat: u32,
    pub unknown_country: u32,
}

impl Default for NetworkRiskWeights {
    fn default() -> Self {
        Self {
            vpn: 30,
            proxy: 25,
            tor: 40,
            known_threat: 50,
            unknown_country: 20,
        }
    }
}

/// Network analyzer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Upper bound on a single reputation lookup
    pub lookup_timeout_ms: u64,
    /// Case-insensitive user-agent tokens that indicate an anonymizer
    pub anonymizer_user_agent_tokens: Vec<String>,
    pub weights: NetworkRiskWeights,
    /// Prefix lists for the built-in lookup
    pub reputation: StaticReputationConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: 150,
            anonymizer_user_agent_tokens: vec![
                "vpn".to_string(),
                "proxy".to_string(),
                "tunnel".to_string(),
            ],
            weights: NetworkRiskWeights::default(),
            reputation: StaticReputationConfig::default(),
        }
    }
}

/// Turns reputation lookups into per-request network assessments.
pub struct NetworkAnalyzer {
    lookup: Arc<dyn ReputationLookup>,
    config: NetworkConfig,
}

impl NetworkAnalyzer {
    pub fn new(lookup: Arc<dyn ReputationLookup>, config: NetworkConfig) -> Self {
        Self { lookup, config }
    }

    /// Assess the origin of a request. Never fails.
    ///
    /// Dropping the returned future cancels the in-flight lookup.
    pub async fn analyze(&self, ip_address: &str, user_agent: &str) -> NetworkAssessment {
        match self.fetch(ip_address).await {
            Ok(record) => {
                let assessment = self.assess(&record, user_agent);
                debug!(
                    provider = self.lookup.name(),
                    country = %assessment.country,
                    risk_score = assessment.risk_score,
                    "Network analysis complete"
                );
                assessment
            }
            Err(e) => {
                warn!(
                    provider = self.lookup.name(),
                    error = %e,
                    "Reputation lookup failed, using safe default"
                );
                NetworkAssessment::safe_default()
            }
        }
    }

    async fn fetch(&self, ip_address: &str) -> Result<ReputationRecord, LookupError> {
        let limit = Duration::from_millis(self.config.lookup_timeout_ms);
        let lookup = AssertUnwindSafe(self.lookup.lookup(ip_address)).catch_unwind();

        match tokio::time::timeout(limit, lookup).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(panic)) => Err(LookupError::Panicked(panic_message(panic.as_ref()))),
            Err(_) => Err(LookupError::Timeout(self.config.lookup_timeout_ms)),
        }
    }

    /// Combine a provider record with user-agent heuristics.
    pub fn assess(&self, record: &ReputationRecord, user_agent: &str) -> NetworkAssessment {
        let mut assessment = NetworkAssessment {
            is_vpn: record.is_vpn || self.user_agent_indicates_anonymizer(user_agent),
            is_proxy: record.is_proxy,
            is_tor: record.is_tor,
            country: known_or_unknown(record.country.as_deref()),
            asn: known_or_unknown(record.asn.as_deref()),
            threat_intelligence: ThreatIntel {
                is_known_threat: record.threat_match || !record.threat_categories.is_empty(),
                threat_types: record.threat_categories.clone(),
            },
            risk_score: 0,
            fallback: false,
        };
        assessment.risk_score = self.risk_score(&assessment);
        assessment
    }

    /// Sum of weighted findings, capped at 100.
    pub fn risk_score(&self, assessment: &NetworkAssessment) -> u32 {
        let weights = &self.config.weights;
        let findings = [
            (assessment.is_vpn, weights.vpn),
            (assessment.is_proxy, weights.proxy),
            (assessment.is_tor, weights.tor),
            (assessment.is_known_threat(), weights.known_threat),
            (assessment.country == UNKNOWN_ORIGIN, weights.unknown_country),
        ];

        findings
            .iter()
            .filter(|(found, _)| *found)
            .map(|(_, weight)| *weight)
            .sum::<u32>()
            .min(100)
    }

    fn user_agent_indicates_anonymizer(&self, user_agent: &str) -> bool {
        let user_agent = user_agent.to_lowercase();
        self.config
            .anonymizer_user_agent_tokens
            .iter()
            .any(|token| !token.is_empty() && user_agent.contains(&token.to_lowercase()))
    }
}

fn known_or_unknown(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNKNOWN_ORIGIN.to_string(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
