//! Real-time Transaction Risk Scoring Engine
//!
//! Scores payment requests by combining a deterministic pattern model,
//! network reputation, behavioral telemetry and transaction rules into a
//! single verdict, and serves it over NATS.

pub mod clock;
pub mod config;
pub mod consumer;
pub mod engine;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod network;
pub mod policy;
pub mod producer;
pub mod rules;
pub mod types;

pub use config::{AppConfig, EngineConfig};
pub use consumer::RequestConsumer;
pub use engine::ScoringEngine;
pub use error::{LookupError, ScoringError};
pub use feature_extractor::{FeatureExtractor, FeatureVector};
pub use models::pattern::PatternScoringModel;
pub use network::lookup::{ReputationLookup, StaticReputationLookup};
pub use producer::ResultProducer;
pub use types::{Decision, Flag, RiskLevel, ScoringRequest, ScoringResult};
