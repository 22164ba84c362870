//! Temporal scorer: a window of feature vectors in, one presence probability out.

use std::path::Path;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{PresenceError, PresenceResult};
use crate::temporal::encoder::FeatureVector;

pub const DEFAULT_HIDDEN_SIZE: usize = 128;
pub const DEFAULT_NUM_LAYERS: usize = 2;
pub const DEFAULT_SCORER_SEED: u64 = 42;

/// Sequence model mapping an ordered window of features to a probability.
///
/// `score` must be a pure function of its input: no state survives between
/// calls, so a scorer can be shared read-only across sessions.
pub trait SequenceScorer: Send + Sync {
    /// Window length the scorer accepts.
    fn sequence_length(&self) -> usize;

    /// Dimension of each feature vector.
    fn feature_dim(&self) -> usize;

    /// Presence probability in [0, 1] for the window, oldest frame first.
    fn score(&self, sequence: &[FeatureVector]) -> PresenceResult<f32>;
}

/// Weights of one LSTM layer, PyTorch layout (gate order i, f, g, o).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LstmLayerWeights {
    /// `4 * hidden` rows of `input` columns.
    pub weight_ih: Vec<Vec<f32>>,
    /// `4 * hidden` rows of `hidden` columns.
    pub weight_hh: Vec<Vec<f32>>,
    pub bias_ih: Vec<f32>,
    pub bias_hh: Vec<f32>,
}

/// Stacked LSTM plus a linear head producing one logit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LstmWeights {
    pub input_size: usize,
    pub hidden_size: usize,
    pub layers: Vec<LstmLayerWeights>,
    pub head_weight: Vec<f32>,
    pub head_bias: f32,
}

impl LstmWeights {
    /// Weights drawn once from a seeded RNG, uniform in ±1/√hidden.
    pub fn seeded(input_size: usize, hidden_size: usize, num_layers: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let k = 1.0 / (hidden_size.max(1) as f32).sqrt();
        let mut uniform = |rows: usize, cols: usize| -> Vec<Vec<f32>> {
            (0..rows)
                .map(|_| (0..cols).map(|_| rng.gen_range(-k..=k)).collect())
                .collect()
        };

        let mut layers = Vec::with_capacity(num_layers);
        for layer in 0..num_layers {
            let layer_input = if layer == 0 { input_size } else { hidden_size };
            let weight_ih = uniform(4 * hidden_size, layer_input);
            let weight_hh = uniform(4 * hidden_size, hidden_size);
            let mut biases = uniform(2, 4 * hidden_size);
            let bias_hh = biases.pop().unwrap_or_default();
            let bias_ih = biases.pop().unwrap_or_default();
            layers.push(LstmLayerWeights {
                weight_ih,
                weight_hh,
                bias_ih,
                bias_hh,
            });
        }

        let mut head = uniform(1, hidden_size + 1).pop().unwrap_or_default();
        let head_bias = head.pop().unwrap_or_default();

        Self {
            input_size,
            hidden_size,
            layers,
            head_weight: head,
            head_bias,
        }
    }

    /// Read a JSON checkpoint.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scorer weights {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid scorer weights {}", path.display()))
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Check every tensor against `input_size`/`hidden_size`.
    pub fn validate(&self) -> PresenceResult<()> {
        let hidden = self.hidden_size;
        if hidden == 0 || self.input_size == 0 || self.layers.is_empty() {
            return Err(PresenceError::configuration(format!(
                "LSTM needs non-zero sizes (input={}, hidden={}, layers={})",
                self.input_size,
                hidden,
                self.layers.len()
            )));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            let layer_input = if i == 0 { self.input_size } else { hidden };
            check_matrix(&layer.weight_ih, 4 * hidden, layer_input, i, "weight_ih")?;
            check_matrix(&layer.weight_hh, 4 * hidden, hidden, i, "weight_hh")?;
            check_len(layer.bias_ih.len(), 4 * hidden, i, "bias_ih")?;
            check_len(layer.bias_hh.len(), 4 * hidden, i, "bias_hh")?;
        }
        if self.head_weight.len() != hidden {
            return Err(PresenceError::configuration(format!(
                "head_weight has {} values, expected {}",
                self.head_weight.len(),
                hidden
            )));
        }
        Ok(())
    }
}

fn check_matrix(
    m: &[Vec<f32>],
    rows: usize,
    cols: usize,
    layer: usize,
    name: &str,
) -> PresenceResult<()> {
    check_len(m.len(), rows, layer, name)?;
    if let Some(row) = m.iter().find(|row| row.len() != cols) {
        return Err(PresenceError::configuration(format!(
            "layer {} {} row has {} columns, expected {}",
            layer,
            name,
            row.len(),
            cols
        )));
    }
    Ok(())
}

fn check_len(actual: usize, expected: usize, layer: usize, name: &str) -> PresenceResult<()> {
    if actual != expected {
        return Err(PresenceError::configuration(format!(
            "layer {} {} has {} rows, expected {}",
            layer, name, actual, expected
        )));
    }
    Ok(())
}

/// Frozen LSTM scorer.
///
/// Each call runs a fresh forward pass from zero hidden and cell state over
/// the whole window; the final step's top-layer output goes through the
/// linear head and a sigmoid.
#[derive(Clone, Debug)]
pub struct LstmScorer {
    weights: LstmWeights,
    sequence_length: usize,
}

impl LstmScorer {
    pub fn new(weights: LstmWeights, sequence_length: usize) -> PresenceResult<Self> {
        weights.validate()?;
        if sequence_length == 0 {
            return Err(PresenceError::configuration(
                "sequence length must be at least 1",
            ));
        }
        Ok(Self {
            weights,
            sequence_length,
        })
    }

    pub fn weights(&self) -> &LstmWeights {
        &self.weights
    }

    fn run_layer(layer: &LstmLayerWeights, hidden: usize, inputs: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let mut h = vec![0.0f32; hidden];
        let mut c = vec![0.0f32; hidden];
        let mut outputs = Vec::with_capacity(inputs.len());
        let mut gates = vec![0.0f32; 4 * hidden];

        for x in inputs {
            for (row, gate) in gates.iter_mut().enumerate() {
                *gate = layer.bias_ih[row]
                    + layer.bias_hh[row]
                    + dot(&layer.weight_ih[row], x)
                    + dot(&layer.weight_hh[row], &h);
            }
            for k in 0..hidden {
                let i = sigmoid(gates[k]);
                let f = sigmoid(gates[hidden + k]);
                let g = gates[2 * hidden + k].tanh();
                let o = sigmoid(gates[3 * hidden + k]);
                c[k] = f * c[k] + i * g;
                h[k] = o * c[k].tanh();
            }
            outputs.push(h.clone());
        }
        outputs
    }
}

impl SequenceScorer for LstmScorer {
    fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    fn feature_dim(&self) -> usize {
        self.weights.input_size
    }

    fn score(&self, sequence: &[FeatureVector]) -> PresenceResult<f32> {
        if sequence.len() != self.sequence_length {
            return Err(PresenceError::Shape {
                what: "sequence length",
                expected: self.sequence_length,
                actual: sequence.len(),
            });
        }
        if let Some(bad) = sequence.iter().find(|f| f.dim() != self.weights.input_size) {
            return Err(PresenceError::Shape {
                what: "feature dimension",
                expected: self.weights.input_size,
                actual: bad.dim(),
            });
        }

        let mut activations: Vec<Vec<f32>> =
            sequence.iter().map(|f| f.as_slice().to_vec()).collect();
        for layer in &self.weights.layers {
            activations = Self::run_layer(layer, self.weights.hidden_size, &activations);
        }

        let last = activations.last().ok_or(PresenceError::Shape {
            what: "sequence length",
            expected: self.sequence_length,
            actual: 0,
        })?;
        let logit = dot(&self.weights.head_weight, last) + self.weights.head_bias;
        Ok(sigmoid(logit))
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_weights(input: usize, hidden: usize, head_bias: f32) -> LstmWeights {
        LstmWeights {
            input_size: input,
            hidden_size: hidden,
            layers: vec![LstmLayerWeights {
                weight_ih: vec![vec![0.0; input]; 4 * hidden],
                weight_hh: vec![vec![0.0; hidden]; 4 * hidden],
                bias_ih: vec![0.0; 4 * hidden],
                bias_hh: vec![0.0; 4 * hidden],
            }],
            head_weight: vec![0.0; hidden],
            head_bias,
        }
    }

    fn window(n: usize, dim: usize, value: f32) -> Vec<FeatureVector> {
        (0..n)
            .map(|_| FeatureVector::from_vec(vec![value; dim]))
            .collect()
    }

    #[test]
    fn head_bias_alone_sets_probability() -> PresenceResult<()> {
        let scorer = LstmScorer::new(zero_weights(4, 3, 0.0), 2)?;
        assert!((scorer.score(&window(2, 4, 1.0))? - 0.5).abs() < 1e-6);

        let scorer = LstmScorer::new(zero_weights(4, 3, 3.0f32.ln()), 2)?;
        assert!((scorer.score(&window(2, 4, 1.0))? - 0.75).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn seeded_scorer_is_deterministic_and_bounded() -> PresenceResult<()> {
        let a = LstmScorer::new(LstmWeights::seeded(16, 8, 2, 7), 5)?;
        let b = LstmScorer::new(LstmWeights::seeded(16, 8, 2, 7), 5)?;
        let seq = window(5, 16, 0.5);

        let pa = a.score(&seq)?;
        assert_eq!(pa, b.score(&seq)?);
        assert_eq!(pa, a.score(&seq)?);
        assert!((0.0..=1.0).contains(&pa));
        Ok(())
    }

    #[test]
    fn wrong_window_is_a_shape_error() -> PresenceResult<()> {
        let scorer = LstmScorer::new(LstmWeights::seeded(16, 8, 1, 1), 5)?;
        let err = scorer.score(&window(4, 16, 0.0)).unwrap_err();
        assert!(matches!(
            err,
            PresenceError::Shape {
                what: "sequence length",
                expected: 5,
                actual: 4
            }
        ));

        let err = scorer.score(&window(5, 12, 0.0)).unwrap_err();
        assert!(matches!(
            err,
            PresenceError::Shape {
                what: "feature dimension",
                expected: 16,
                actual: 12
            }
        ));
        Ok(())
    }

    #[test]
    fn malformed_weights_are_configuration_errors() {
        let mut weights = LstmWeights::seeded(16, 8, 2, 3);
        weights.layers[1].weight_ih.pop();
        assert!(matches!(
            LstmScorer::new(weights, 5),
            Err(PresenceError::Configuration(_))
        ));

        let mut weights = LstmWeights::seeded(16, 8, 1, 3);
        weights.head_weight.push(0.0);
        assert!(matches!(
            LstmScorer::new(weights, 5),
            Err(PresenceError::Configuration(_))
        ));
    }

    #[test]
    fn checkpoint_round_trips_through_json() -> Result<()> {
        let weights = LstmWeights::seeded(24, 4, 2, 11);
        let file = tempfile::NamedTempFile::new()?;
        std::fs::write(file.path(), serde_json::to_string(&weights)?)?;

        let loaded = LstmWeights::from_json_file(file.path())?;
        let seq = window(3, 24, 0.25);
        let original = LstmScorer::new(weights, 3)?.score(&seq)?;
        let restored = LstmScorer::new(loaded, 3)?.score(&seq)?;
        assert!((original - restored).abs() < 1e-6);
        Ok(())
    }
}
