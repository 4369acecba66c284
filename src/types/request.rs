//! Scoring request data structures

use crate::error::{Result, ScoringError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A proposed money movement plus the context needed to score it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRequest {
    /// Requesting user, used for logging only
    #[serde(default)]
    pub user_id: Option<String>,

    /// Tenant, selects the regional amount-signature table
    #[serde(default)]
    pub tenant_id: Option<String>,

    #[serde(alias = "transactionData")]
    pub transaction: TransactionData,

    pub user_context: UserContext,

    #[serde(alias = "behavioralData")]
    pub behavioral: BehavioralData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    /// Amount in the tenant's currency (must be positive)
    pub amount: f64,

    pub recipient_account_number: String,

    pub recipient_bank_code: String,

    /// Free-text narration entered by the customer
    #[serde(default, alias = "description")]
    pub narration: Option<String>,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub ip_address: String,

    pub user_agent: String,

    #[serde(default)]
    pub device_fingerprint: Option<String>,

    #[serde(default)]
    pub location: Option<GeoLocation>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Session and history telemetry collected by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralData {
    /// Session duration in seconds
    pub session_duration: f64,

    pub previous_transaction_count: u32,

    pub avg_transaction_amount: f64,

    /// Hour of day (0-23); out-of-range values are clamped
    #[serde(alias = "timeOfDay")]
    pub hour_of_day: i32,

    /// Day of week (0 = Sunday .. 6 = Saturday); out-of-range values are clamped
    pub day_of_week: i32,

    /// Inter-key timings in milliseconds
    #[serde(default)]
    pub typing_pattern: Vec<f64>,

    #[serde(default, alias = "mouseMovements")]
    pub pointer_movements: Vec<PointerSample>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PointerSample {
    pub x: f64,
    pub y: f64,
    pub timestamp: f64,
}

impl ScoringRequest {
    /// Create a request with neutral context for the given amount and recipient.
    pub fn new(amount: f64, recipient_account_number: &str) -> Self {
        Self {
            user_id: None,
            tenant_id: None,
            transaction: TransactionData {
                amount,
                recipient_account_number: recipient_account_number.to_string(),
                recipient_bank_code: String::new(),
                narration: None,
                timestamp: Utc::now(),
            },
            user_context: UserContext {
                ip_address: "127.0.0.1".to_string(),
                user_agent: String::new(),
                device_fingerprint: None,
                location: None,
            },
            behavioral: BehavioralData {
                session_duration: 600.0,
                previous_transaction_count: 0,
                avg_transaction_amount: 0.0,
                hour_of_day: 12,
                day_of_week: 3,
                typing_pattern: Vec::new(),
                pointer_movements: Vec::new(),
            },
        }
    }

    pub fn with_narration(mut self, narration: &str) -> Self {
        self.transaction.narration = Some(narration.to_string());
        self
    }

    pub fn with_network(mut self, ip_address: &str, user_agent: &str) -> Self {
        self.user_context.ip_address = ip_address.to_string();
        self.user_context.user_agent = user_agent.to_string();
        self
    }

    pub fn with_tenant(mut self, tenant_id: &str) -> Self {
        self.tenant_id = Some(tenant_id.to_string());
        self
    }

    pub fn with_behavior(mut self, behavioral: BehavioralData) -> Self {
        self.behavioral = behavioral;
        self
    }

    /// Check the mandatory fields. Optional telemetry is never an error.
    pub fn validate(&self) -> Result<()> {
        let amount = self.transaction.amount;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ScoringError::Validation(format!(
                "transaction amount must be a positive number, got {amount}"
            )));
        }
        if self.transaction.recipient_account_number.trim().is_empty() {
            return Err(ScoringError::Validation(
                "recipient account number is required".to_string(),
            ));
        }
        Ok(())
    }
}

impl BehavioralData {
    pub fn hour(&self) -> u8 {
        self.hour_of_day.clamp(0, 23) as u8
    }

    pub fn day(&self) -> u8 {
        self.day_of_week.clamp(0, 6) as u8
    }

    /// Session duration in seconds, with negative or non-finite values read as zero.
    pub fn session_seconds(&self) -> f64 {
        non_negative(self.session_duration)
    }

    pub fn average_amount(&self) -> f64 {
        non_negative(self.avg_transaction_amount)
    }

    /// Prior transactions per hour of session.
    ///
    /// An empty session with prior activity is infinitely fast; an empty
    /// session without activity has no velocity.
    pub fn transactions_per_hour(&self) -> f64 {
        let count = f64::from(self.previous_transaction_count);
        let hours = self.session_seconds() / 3600.0;
        if hours > 0.0 {
            count / hours
        } else if count > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
