//! Reputation lookup collaborators

use crate::error::{LookupError, ScoringError};
use crate::types::network::ReputationRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Source of VPN/proxy/Tor classification, geolocation and threat
/// intelligence for an IP address.
///
/// Implementations may call out to external providers. Failures are
/// absorbed by the analyzer and never abort scoring.
#[async_trait]
pub trait ReputationLookup: Send + Sync {
    fn name(&self) -> &'static str;

    async fn lookup(&self, ip: &str) -> Result<ReputationRecord, LookupError>;
}

/// True when `ip` starts with `prefix` and the prefix ends on an octet (or
/// IPv6 group) boundary, so "10.1" covers 10.1.x.x but not 10.100.x.x.
pub fn prefix_matches(ip: &str, prefix: &str) -> bool {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return false;
    }

    match ip.strip_prefix(prefix) {
        Some(rest) => {
            prefix.ends_with(['.', ':']) || rest.is_empty() || rest.starts_with(['.', ':'])
        }
        None => false,
    }
}

/// Address prefix known to belong to a threat category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatPrefix {
    pub prefix: String,
    pub category: String,
}

/// Prefix lists for [`StaticReputationLookup`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticReputationConfig {
    pub vpn_prefixes: Vec<String>,
    pub proxy_prefixes: Vec<String>,
    pub tor_prefixes: Vec<String>,
    pub threat_prefixes: Vec<ThreatPrefix>,
    /// Country reported for public addresses; `None` leaves them unlocated
    pub default_country: Option<String>,
    pub default_asn: Option<String>,
}

impl Default for StaticReputationConfig {
    fn default() -> Self {
        Self {
            vpn_prefixes: vec!["185.220.".to_string(), "45.142.".to_string()],
            proxy_prefixes: vec!["8.8.8.".to_string(), "1.1.1.".to_string()],
            tor_prefixes: vec!["198.98.".to_string(), "199.87.".to_string()],
            threat_prefixes: Vec::new(),
            default_country: Some("NG".to_string()),
            default_asn: Some("AS36924 MTN Nigeria".to_string()),
        }
    }
}

impl StaticReputationConfig {
    /// Reject prefixes that are empty or are not address text.
    pub fn validate(&self) -> Result<(), ScoringError> {
        let prefixes = self
            .vpn_prefixes
            .iter()
            .chain(&self.proxy_prefixes)
            .chain(&self.tor_prefixes)
            .chain(self.threat_prefixes.iter().map(|threat| &threat.prefix));

        for prefix in prefixes {
            let prefix = prefix.trim();
            if prefix.is_empty()
                || !prefix
                    .chars()
                    .all(|c| c.is_ascii_hexdigit() || c == '.' || c == ':')
            {
                return Err(ScoringError::Config(format!(
                    "reputation prefix {prefix:?} is not an address prefix"
                )));
            }
        }

        Ok(())
    }
}

/// Country label for private and loopback addresses
pub const LOCAL_COUNTRY: &str = "Local";

/// In-process lookup over configured address prefixes.
#[derive(Debug, Clone, Default)]
pub struct StaticReputationLookup {
    config: StaticReputationConfig,
}

impl StaticReputationLookup {
    pub fn new(config: StaticReputationConfig) -> Self {
        Self { config }
    }

    fn matches_any(ip: &str, prefixes: &[String]) -> bool {
        prefixes.iter().any(|prefix| prefix_matches(ip, prefix))
    }

    fn is_local(addr: &IpAddr) -> bool {
        match addr {
            IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
            IpAddr::V6(v6) => v6.is_loopback(),
        }
    }
}

#[async_trait]
impl ReputationLookup for StaticReputationLookup {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn lookup(&self, ip: &str) -> Result<ReputationRecord, LookupError> {
        let ip = ip.trim();
        let addr: IpAddr = ip
            .parse()
            .map_err(|_| LookupError::InvalidAddress(ip.to_string()))?;

        let threat_categories: Vec<String> = self
            .config
            .threat_prefixes
            .iter()
            .filter(|threat| prefix_matches(ip, &threat.prefix))
            .map(|threat| threat.category.clone())
            .collect();

        let country = if Self::is_local(&addr) {
            Some(LOCAL_COUNTRY.to_string())
        } else {
            self.config.default_country.clone()
        };

        Ok(ReputationRecord {
            is_vpn: Self::matches_any(ip, &self.config.vpn_prefixes),
            is_proxy: Self::matches_any(ip, &self.config.proxy_prefixes),
            is_tor: Self::matches_any(ip, &self.config.tor_prefixes),
            country,
            asn: self.config.default_asn.clone(),
            threat_match: !threat_categories.is_empty(),
            threat_categories,
        })
    }
}
