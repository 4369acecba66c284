//! Regional fraud-amount signatures
//!
//! A signature table is an ordered list of amount rules. The first rule that
//! matches decides the amount-distribution suspicion; amounts no rule matches
//! get the table's default score. Tables are plain configuration and can be
//! swapped per tenant at runtime through [`SignatureRegistry`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

/// One amount-matching rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignatureRule {
    /// Amount equals one of the listed values
    Exact { amounts: Vec<f64>, score: f64 },
    /// Amount within `[min, max]`, optionally on a multiple of `multiple_of`
    Range {
        min: f64,
        max: f64,
        #[serde(default)]
        multiple_of: Option<f64>,
        score: f64,
    },
    /// Amount strictly closer than `tolerance` to one of the listed values
    Near {
        amounts: Vec<f64>,
        tolerance: f64,
        score: f64,
    },
}

impl SignatureRule {
    /// Suspicion score if this rule matches the amount.
    pub fn matches(&self, amount: f64) -> Option<f64> {
        let hit = match self {
            SignatureRule::Exact { amounts, .. } => {
                amounts.iter().any(|&a| (amount - a).abs() < 1e-9)
            }
            SignatureRule::Range {
                min,
                max,
                multiple_of,
                ..
            } => {
                (*min..=*max).contains(&amount)
                    && multiple_of.map_or(true, |m| is_multiple_of(amount, m))
            }
            SignatureRule::Near {
                amounts, tolerance, ..
            } => amounts.iter().any(|&a| (amount - a).abs() < *tolerance),
        };

        hit.then(|| self.score())
    }

    pub fn score(&self) -> f64 {
        match self {
            SignatureRule::Exact { score, .. }
            | SignatureRule::Range { score, .. }
            | SignatureRule::Near { score, .. } => score.clamp(0.0, 1.0),
        }
    }
}

/// True when `amount` is an exact multiple of a positive `step`.
pub fn is_multiple_of(amount: f64, step: f64) -> bool {
    step > 0.0 && amount % step == 0.0
}

fn default_signature_score() -> f64 {
    0.3
}

/// Ordered signature rules for one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountSignatureTable {
    pub rules: Vec<SignatureRule>,
    /// Score for amounts no rule matches
    #[serde(default = "default_signature_score")]
    pub default_score: f64,
}

impl AmountSignatureTable {
    pub fn new(rules: Vec<SignatureRule>, default_score: f64) -> Self {
        Self {
            rules,
            default_score,
        }
    }

    /// Amount-distribution suspicion in [0, 1].
    pub fn score(&self, amount: f64) -> f64 {
        self.rules
            .iter()
            .find_map(|rule| rule.matches(amount))
            .unwrap_or_else(|| self.default_score.clamp(0.0, 1.0))
    }

    /// Signatures observed in Nigerian retail banking fraud.
    pub fn nigerian() -> Self {
        Self::new(
            vec![
                // 419 advance-fee variations
                SignatureRule::Exact {
                    amounts: vec![419.0, 4_190.0, 41_900.0, 419_000.0],
                    score: 0.95,
                },
                // Romance scams
                SignatureRule::Range {
                    min: 50_000.0,
                    max: 150_000.0,
                    multiple_of: Some(50_000.0),
                    score: 0.8,
                },
                // Business email compromise
                SignatureRule::Range {
                    min: 250_000.0,
                    max: 750_000.0,
                    multiple_of: Some(50_000.0),
                    score: 0.75,
                },
                // Fake inheritance and lottery payouts
                SignatureRule::Range {
                    min: 1_500_000.0,
                    max: 2_500_000.0,
                    multiple_of: Some(50_000.0),
                    score: 0.7,
                },
                // Crypto conversion amounts
                SignatureRule::Near {
                    amounts: vec![120_000.0, 240_000.0, 500_000.0, 1_000_000.0],
                    tolerance: 10_000.0,
                    score: 0.65,
                },
                SignatureRule::Range {
                    min: 75_000.0,
                    max: 300_000.0,
                    multiple_of: Some(25_000.0),
                    score: 0.6,
                },
            ],
            default_signature_score(),
        )
    }
}

impl Default for AmountSignatureTable {
    fn default() -> Self {
        Self::nigerian()
    }
}

/// Default signature table plus per-tenant overrides, replaceable at runtime
#[derive(Debug)]
pub struct SignatureRegistry {
    default_table: RwLock<Arc<AmountSignatureTable>>,
    tenant_tables: RwLock<HashMap<String, Arc<AmountSignatureTable>>>,
}

impl SignatureRegistry {
    pub fn new(default_table: AmountSignatureTable) -> Self {
        Self {
            default_table: RwLock::new(Arc::new(default_table)),
            tenant_tables: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_tenants(
        default_table: AmountSignatureTable,
        tenants: HashMap<String, AmountSignatureTable>,
    ) -> Self {
        let registry = Self::new(default_table);
        for (tenant, table) in tenants {
            registry.set_tenant_table(&tenant, table);
        }
        registry
    }

    /// Table for a tenant, falling back to the default table.
    pub fn table_for(&self, tenant_id: Option<&str>) -> Arc<AmountSignatureTable> {
        if let Some(tenant) = tenant_id {
            let tenants = self
                .tenant_tables
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(table) = tenants.get(&tenant_key(tenant)) {
                return table.clone();
            }
        }

        self.default_table
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn replace_default(&self, table: AmountSignatureTable) {
        let mut current = self
            .default_table
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = Arc::new(table);
        info!(rules = current.rules.len(), "Default signature table replaced");
    }

    pub fn set_tenant_table(&self, tenant_id: &str, table: AmountSignatureTable) {
        let rules = table.rules.len();
        self.tenant_tables
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(tenant_key(tenant_id), Arc::new(table));
        info!(tenant_id = %tenant_id, rules, "Tenant signature table installed");
    }

    pub fn remove_tenant_table(&self, tenant_id: &str) -> bool {
        self.tenant_tables
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&tenant_key(tenant_id))
            .is_some()
    }

    pub fn tenant_count(&self) -> usize {
        self.tenant_tables
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Tenant ids are case-insensitive; config keys arrive lowercased.
fn tenant_key(tenant_id: &str) -> String {
    tenant_id.trim().to_lowercase()
}

impl Default for SignatureRegistry {
    fn default() -> Self {
        Self::new(AmountSignatureTable::default())
    }
}
