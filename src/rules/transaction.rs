//! Amount and narration heuristics

use crate::rules::signatures::is_multiple_of;
use crate::types::request::TransactionData;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Named list of suspicious narration phrases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordTier {
    pub name: String,
    pub weight: f64,
    pub keywords: Vec<String>,
}

impl KeywordTier {
    pub fn new(name: &str, weight: f64, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            weight,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

/// Default keyword tiers, in priority order
pub fn default_keyword_tiers() -> Vec<KeywordTier> {
    vec![
        // Advance-fee and lottery
        KeywordTier::new(
            "critical",
            0.5,
            &[
                "urgent",
                "emergency",
                "winner",
                "prize",
                "inheritance",
                "lottery",
                "compensation",
                "beneficiary",
                "atm card",
                "diplomat",
                "consignment",
            ],
        ),
        // Business email compromise
        KeywordTier::new(
            "high",
            0.35,
            &[
                "invoice",
                "payment due",
                "wire transfer",
                "bank details changed",
                "urgent payment",
            ],
        ),
        KeywordTier::new(
            "medium",
            0.25,
            &[
                "blessing",
                "god bless",
                "rush",
                "fast",
                "quick money",
                "opportunity",
                "investment",
            ],
        ),
        // Romance and crypto
        KeywordTier::new(
            "romance",
            0.3,
            &[
                "love",
                "darling",
                "honey",
                "sweetheart",
                "bitcoin",
                "crypto",
                "trading",
            ],
        ),
    ]
}

/// Thresholds, increments and keyword tiers for the transaction rule score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionRuleConfig {
    pub high_value_threshold: f64,
    pub high_value_weight: f64,
    /// Amounts above this add `very_high_value_weight` on top of `high_value_weight`
    pub very_high_value_threshold: f64,
    pub very_high_value_weight: f64,
    pub round_amount_step: f64,
    pub round_amount_weight: f64,
    /// Checked in order; the first tier with a match contributes its weight
    pub keyword_tiers: Vec<KeywordTier>,
    /// Distinct keyword count above which `multi_keyword_bonus` applies
    pub multi_keyword_count: usize,
    pub multi_keyword_bonus: f64,
    /// Amount-distribution suspicion at or above which the amount is a signature hit
    pub signature_match_min: f64,
    pub signature_weight: f64,
}

impl Default for TransactionRuleConfig {
    fn default() -> Self {
        Self {
            high_value_threshold: 1_000_000.0,
            high_value_weight: 0.3,
            very_high_value_threshold: 5_000_000.0,
            very_high_value_weight: 0.4,
            round_amount_step: 100_000.0,
            round_amount_weight: 0.2,
            keyword_tiers: default_keyword_tiers(),
            multi_keyword_count: 2,
            multi_keyword_bonus: 0.2,
            signature_match_min: 0.9,
            signature_weight: 0.3,
        }
    }
}

/// Keyword analysis of a narration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NarrationMatch {
    /// Highest-priority tier with a match
    pub tier: Option<String>,
    pub tier_weight: f64,
    /// Distinct keywords found across all tiers
    pub keywords: Vec<String>,
}

/// Rule-based scorer for amounts and narrations
#[derive(Debug, Clone, Default)]
pub struct TransactionRules {
    config: TransactionRuleConfig,
}

impl TransactionRules {
    pub fn new(config: TransactionRuleConfig) -> Self {
        Self { config }
    }

    /// Transaction risk in [0, 1].
    ///
    /// `signature_suspicion` is the amount-distribution score from the
    /// feature vector.
    pub fn score(&self, transaction: &TransactionData, signature_suspicion: f64) -> f64 {
        let amount = transaction.amount;
        let mut score = self.amount_score(amount);

        if self.is_round_amount(amount) {
            score += self.config.round_amount_weight;
        }
        if self.is_signature_amount(signature_suspicion) {
            score += self.config.signature_weight;
        }

        if let Some(narration) = transaction.narration.as_deref() {
            let found = self.match_narration(narration);
            score += found.tier_weight;
            if found.keywords.len() > self.config.multi_keyword_count {
                score += self.config.multi_keyword_bonus;
            }
        }

        f64::min(score, 1.0)
    }

    /// High-value increments alone; non-decreasing in `amount`.
    pub fn amount_score(&self, amount: f64) -> f64 {
        let mut score = 0.0;
        if self.is_high_value(amount) {
            score += self.config.high_value_weight;
        }
        if amount > self.config.very_high_value_threshold {
            score += self.config.very_high_value_weight;
        }
        score
    }

    pub fn is_high_value(&self, amount: f64) -> bool {
        amount > self.config.high_value_threshold
    }

    pub fn is_round_amount(&self, amount: f64) -> bool {
        is_multiple_of(amount, self.config.round_amount_step)
    }

    pub fn is_signature_amount(&self, signature_suspicion: f64) -> bool {
        signature_suspicion >= self.config.signature_match_min
    }

    /// Find suspicious keywords in a narration (case-insensitive).
    pub fn match_narration(&self, narration: &str) -> NarrationMatch {
        let text = narration.to_lowercase();
        let mut result = NarrationMatch::default();
        let mut seen = HashSet::new();

        for tier in &self.config.keyword_tiers {
            let mut tier_hit = false;
            for keyword in &tier.keywords {
                if !keyword.is_empty() && text.contains(keyword.as_str()) {
                    tier_hit = true;
                    if seen.insert(keyword.as_str()) {
                        result.keywords.push(keyword.clone());
                    }
                }
            }
            if tier_hit && result.tier.is_none() {
                result.tier = Some(tier.name.clone());
                result.tier_weight = tier.weight;
            }
        }

        result
    }
}
