//! Fixed-weight pattern scoring model
//!
//! A small feed-forward projection (15 -> 64 -> 32 -> 16 -> 1) with ReLU on
//! the hidden layers and a sigmoid output. Weight magnitudes come from a
//! Xavier-style bounded distribution drawn from a seeded generator, so the
//! same seed reproduces the same scores across restarts. The model is
//! read-only after construction and is shared between concurrent requests
//! without locking.
//!
//! First-layer weights carry the sign of their feature's [`FEATURE_POLARITY`]
//! and deeper weights are non-negative, so the projection never lowers the
//! score when a risk feature grows. The output layer is then rescaled so that
//! the all-neutral feature vector scores exactly 0.5 and the riskiest corner
//! of the feature space reaches [`ModelConfig::saturation_logit`].

use crate::error::{Result, ScoringError};
use crate::feature_extractor::{index, FeatureVector, FEATURE_COUNT, NEUTRAL};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{info, warn};

/// Units per layer, input first
pub const LAYER_SIZES: [usize; 5] = [FEATURE_COUNT, 64, 32, 16, 1];

/// Input rows for amount and time features
const AMOUNT_TIME_ROWS: Range<usize> = 0..3;

/// Input rows for behavioral anomaly features
const BEHAVIORAL_ROWS: Range<usize> = 10..13;

/// Whether a feature raises (+1) or lowers (-1) risk as it grows.
///
/// Established history and business-hours activity are protective.
pub const FEATURE_POLARITY: [f64; FEATURE_COUNT] = {
    let mut polarity = [1.0; FEATURE_COUNT];
    polarity[index::TRANSACTION_COUNT] = -1.0;
    polarity[index::AVERAGE_AMOUNT_LOG] = -1.0;
    polarity[index::BUSINESS_HOURS] = -1.0;
    polarity
};

/// Weight initialization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Seed for the weight generator
    pub seed: u64,
    /// Scale applied to first-layer weights of amount and time features
    pub amount_time_multiplier: f64,
    /// Scale applied to first-layer weights of behavioral anomaly features
    pub behavioral_multiplier: f64,
    /// Biases are drawn from `[-bias_range, bias_range)`
    pub bias_range: f64,
    /// Output logit of the riskiest feature vector; the neutral vector maps to 0
    pub saturation_logit: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_F00D,
            amount_time_multiplier: 1.2,
            behavioral_multiplier: 1.1,
            bias_range: 0.1,
            saturation_logit: 16.0,
        }
    }
}

/// Fully connected layer; `weights[input][output]`
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
}

impl DenseLayer {
    pub fn new(weights: Vec<Vec<f64>>, biases: Vec<f64>) -> Self {
        Self { weights, biases }
    }

    pub fn inputs(&self) -> usize {
        self.weights.len()
    }

    pub fn outputs(&self) -> usize {
        self.biases.len()
    }

    fn is_rectangular(&self) -> bool {
        self.weights.iter().all(|row| row.len() == self.outputs())
    }

    fn forward(&self, inputs: &[f64], is_output: bool) -> Vec<f64> {
        (0..self.outputs())
            .map(|j| {
                let sum = self.weighted_sum(inputs, j, self.biases[j]);
                if is_output {
                    sigmoid(sum)
                } else {
                    sum.max(0.0)
                }
            })
            .collect()
    }

    fn weighted_sum(&self, inputs: &[f64], output: usize, bias: f64) -> f64 {
        inputs
            .iter()
            .zip(&self.weights)
            .fold(bias, |acc, (x, row)| acc + x * row[output])
    }
}

/// Deterministic multi-layer scoring function
#[derive(Debug, Clone)]
pub struct PatternScoringModel {
    layers: Vec<DenseLayer>,
    seed: Option<u64>,
}

impl PatternScoringModel {
    /// Build the model from a seeded weight generator.
    pub fn seeded(config: &ModelConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let bias_range = config.bias_range.abs();

        let mut layers = LAYER_SIZES
            .windows(2)
            .enumerate()
            .map(|(layer, sizes)| {
                let (inputs, outputs) = (sizes[0], sizes[1]);
                let limit = (6.0 / (inputs + outputs) as f64).sqrt();

                let weights = (0..inputs)
                    .map(|i| {
                        let multiplier = match layer {
                            0 if AMOUNT_TIME_ROWS.contains(&i) => config.amount_time_multiplier,
                            0 if BEHAVIORAL_ROWS.contains(&i) => config.behavioral_multiplier,
                            _ => 1.0,
                        };
                        let polarity = if layer == 0 { FEATURE_POLARITY[i] } else { 1.0 };
                        (0..outputs)
                            .map(|_| rng.gen_range(0.0..1.0) * limit * multiplier * polarity)
                            .collect()
                    })
                    .collect();

                let biases = (0..outputs)
                    .map(|_| {
                        if bias_range > 0.0 {
                            rng.gen_range(-bias_range..bias_range)
                        } else {
                            0.0
                        }
                    })
                    .collect();

                DenseLayer::new(weights, biases)
            })
            .collect::<Vec<_>>();

        calibrate_output(&mut layers, config.saturation_logit);

        info!(
            seed = config.seed,
            layers = ?LAYER_SIZES,
            saturation_logit = config.saturation_logit,
            "Pattern scoring model initialized"
        );

        Self {
            layers,
            seed: Some(config.seed),
        }
    }

    /// Build the model from explicit layers, checking that shapes chain
    /// from the feature vector to a single output.
    pub fn from_layers(layers: Vec<DenseLayer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(ScoringError::Config("model needs at least one layer".to_string()));
        }

        let mut expected_inputs = FEATURE_COUNT;
        for (position, layer) in layers.iter().enumerate() {
            let is_last = position + 1 == layers.len();
            let expected_outputs = if is_last { 1 } else { layer.outputs() };

            if layer.inputs() != expected_inputs
                || layer.outputs() != expected_outputs
                || layer.outputs() == 0
                || !layer.is_rectangular()
            {
                return Err(ScoringError::ModelShape {
                    layer: position,
                    expected: (expected_inputs, expected_outputs),
                    actual: (layer.inputs(), layer.outputs()),
                });
            }
            expected_inputs = layer.outputs();
        }

        Ok(Self { layers, seed: None })
    }

    /// Probability-like pattern score in [0, 1].
    pub fn score(&self, features: &FeatureVector) -> f64 {
        let last = self.layers.len() - 1;
        let mut activations = features.as_slice().to_vec();

        for (position, layer) in self.layers.iter().enumerate() {
            activations = layer.forward(&activations, position == last);
        }

        // NaN passes through so the caller can refuse to score on it
        activations
            .first()
            .copied()
            .map_or(f64::NAN, |score| score.clamp(0.0, 1.0))
    }

    /// Seed the weights were drawn from, if generated
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }
}

impl Default for PatternScoringModel {
    fn default() -> Self {
        Self::seeded(&ModelConfig::default())
    }
}

/// Rescale the output layer so the neutral vector sits at logit 0 and the
/// riskiest vector at `saturation_logit`.
fn calibrate_output(layers: &mut [DenseLayer], saturation_logit: f64) {
    let Some((output, hidden)) = layers.split_last_mut() else {
        return;
    };

    let neutral = [NEUTRAL; FEATURE_COUNT];
    let riskiest = FEATURE_POLARITY.map(|polarity| if polarity > 0.0 { 1.0 } else { 0.0 });
    let project = |features: &[f64]| {
        hidden
            .iter()
            .fold(features.to_vec(), |activations, layer| layer.forward(&activations, false))
    };
    let (neutral, riskiest) = (project(&neutral), project(&riskiest));

    for j in 0..output.outputs() {
        let base = output.weighted_sum(&neutral, j, 0.0);
        let spread = output.weighted_sum(&riskiest, j, 0.0) - base;
        if !(spread.is_finite() && spread > f64::EPSILON) {
            warn!(output = j, spread, "Pattern model output left uncalibrated");
            continue;
        }

        let gain = saturation_logit / spread;
        for row in output.weights.iter_mut() {
            row[j] *= gain;
        }
        output.biases[j] = -gain * base;
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(value: f64) -> FeatureVector {
        FeatureVector::new([value; FEATURE_COUNT])
    }

    #[test]
    fn test_layer_shapes() {
        let model = PatternScoringModel::default();
        let shapes: Vec<(usize, usize)> = model
            .layers()
            .iter()
            .map(|l| (l.inputs(), l.outputs()))
            .collect();

        assert_eq!(shapes, vec![(15, 64), (64, 32), (32, 16), (16, 1)]);
        assert_eq!(model.seed(), Some(0x5EED_F00D));
    }

    #[test]
    fn test_same_seed_same_weights() {
        let config = ModelConfig::default();
        let first = PatternScoringModel::seeded(&config);
        let second = PatternScoringModel::seeded(&config);

        assert_eq!(first.layers(), second.layers());
        assert_eq!(
            first.score(&features(0.7)).to_bits(),
            second.score(&features(0.7)).to_bits()
        );
    }

    #[test]
    fn test_different_seed_different_weights() {
        let first = PatternScoringModel::seeded(&ModelConfig::default());
        let second = PatternScoringModel::seeded(&ModelConfig {
            seed: 7,
            ..ModelConfig::default()
        });

        assert_ne!(first.layers(), second.layers());
    }

    #[test]
    fn test_weights_within_xavier_bounds() {
        let config = ModelConfig::default();
        let model = PatternScoringModel::seeded(&config);
        let first = &model.layers()[0];
        let limit = (6.0f64 / (15.0 + 64.0)).sqrt();

        for (i, row) in first.weights.iter().enumerate() {
            let bound = if AMOUNT_TIME_ROWS.contains(&i) {
                limit * config.amount_time_multiplier
            } else if BEHAVIORAL_ROWS.contains(&i) {
                limit * config.behavioral_multiplier
            } else {
                limit
            };
            assert!(row.iter().all(|w| w.abs() <= bound));
            assert!(row.iter().all(|w| w * FEATURE_POLARITY[i] >= 0.0));
        }
        assert!(first.biases.iter().all(|b| b.abs() <= config.bias_range));
        assert!(model.layers()[1..]
            .iter()
            .all(|layer| layer.weights.iter().flatten().all(|w| *w >= 0.0)));
    }

    #[test]
    fn test_score_is_probability() {
        let model = PatternScoringModel::default();
        for value in [0.0, 0.5, 1.0, 20.0, 1.0e6] {
            let score = model.score(&features(value));
            assert!((0.0..=1.0).contains(&score), "value {value} -> {score}");
        }
    }

    #[test]
    fn test_neutral_vector_scores_half() {
        let model = PatternScoringModel::default();
        let score = model.score(&features(NEUTRAL));
        assert!((score - 0.5).abs() < 1e-9, "{score}");
    }

    #[test]
    fn test_riskiest_vector_saturates() {
        let model = PatternScoringModel::default();
        let riskiest = FEATURE_POLARITY.map(|polarity| if polarity > 0.0 { 1.0 } else { 0.0 });
        let safest = riskiest.map(|value| 1.0 - value);

        assert!(model.score(&FeatureVector::new(riskiest)) > 0.99);
        assert!(model.score(&FeatureVector::new(safest)) < 0.5);
    }

    #[test]
    fn test_score_follows_feature_polarity() {
        let model = PatternScoringModel::default();

        for (position, polarity) in FEATURE_POLARITY.iter().enumerate() {
            let mut low = [NEUTRAL; FEATURE_COUNT];
            let mut high = [NEUTRAL; FEATURE_COUNT];
            low[position] = 0.2;
            high[position] = 0.8;

            let delta =
                model.score(&FeatureVector::new(high)) - model.score(&FeatureVector::new(low));
            assert!(delta * polarity >= -1e-12, "feature {position} moved against its polarity");
        }
    }

    #[test]
    fn test_non_finite_output_is_not_masked() {
        let layers = vec![DenseLayer::new(vec![vec![0.0]; FEATURE_COUNT], vec![f64::NAN])];
        let model = PatternScoringModel::from_layers(layers).unwrap();

        assert!(model.score(&features(0.5)).is_nan());
    }

    #[test]
    fn test_from_layers_constant_output() {
        // Zero weights leave only the output bias: sigmoid(0) = 0.5
        let layers = vec![
            DenseLayer::new(vec![vec![0.0; 4]; FEATURE_COUNT], vec![0.0; 4]),
            DenseLayer::new(vec![vec![0.0; 1]; 4], vec![0.0]),
        ];
        let model = PatternScoringModel::from_layers(layers).unwrap();

        assert_eq!(model.score(&features(3.0)), 0.5);
        assert_eq!(model.seed(), None);
    }

    #[test]
    fn test_from_layers_rejects_bad_shapes() {
        let wrong_input = vec![DenseLayer::new(vec![vec![0.0; 1]; 3], vec![0.0])];
        assert!(matches!(
            PatternScoringModel::from_layers(wrong_input),
            Err(ScoringError::ModelShape { layer: 0, .. })
        ));

        let broken_chain = vec![
            DenseLayer::new(vec![vec![0.0; 4]; FEATURE_COUNT], vec![0.0; 4]),
            DenseLayer::new(vec![vec![0.0; 1]; 5], vec![0.0]),
        ];
        assert!(matches!(
            PatternScoringModel::from_layers(broken_chain),
            Err(ScoringError::ModelShape { layer: 1, .. })
        ));

        assert!(PatternScoringModel::from_layers(Vec::new()).is_err());
    }
}
