//! Type definitions for the scoring engine

pub mod network;
pub mod request;
pub mod result;

pub use network::{NetworkAssessment, ReputationRecord, ThreatIntel};
pub use request::{BehavioralData, GeoLocation, PointerSample, ScoringRequest, TransactionData, UserContext};
pub use result::{Decision, Flag, RiskLevel, RiskLevelThresholds, ScoreBreakdown, ScoringResult};
