//! Pattern scoring model and score aggregation

pub mod aggregator;
pub mod pattern;

pub use aggregator::{AggregationWeights, RiskAggregator};
pub use pattern::{DenseLayer, ModelConfig, PatternScoringModel};
