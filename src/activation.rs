//! Activation and aggregation functions for NEAT nodes.
//!
//! Both are plain tags dispatched through `match`, so a node stays `Copy`-cheap
//! and serializes as a bare enum name. Per-function activation thresholds live
//! in [`ActivationConfig`]; they only feed the boolean "activated" view of a
//! node and never change its continuous output.

use serde::{Deserialize, Serialize};

/// Activation function applied after aggregation, response scaling and bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Activation {
    /// Sigmoid: f(x) = 1 / (1 + e^(-x))
    #[default]
    Sigmoid,
    /// Hyperbolic tangent: f(x) = tanh(x)
    Tanh,
    /// Step function: f(x) = 1 if x >= 0 else 0
    Step,
    /// Leaky ReLU: `f(x) = x` if `x >= 0` else `leak * x`
    LeakyReLU,
    /// Identity: f(x) = x
    Linear,
}

impl Activation {
    /// All available activation functions.
    pub const ALL: [Self; 5] = [
        Self::Sigmoid,
        Self::Tanh,
        Self::Step,
        Self::LeakyReLU,
        Self::Linear,
    ];

    /// Apply this activation function to an input value.
    ///
    /// NaN propagates unchanged. Infinite inputs map to the function's limit
    /// where one exists.
    #[inline]
    #[must_use]
    pub fn apply(self, x: f64, relu_leak: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }

        match self {
            Self::Sigmoid => {
                if x == f64::INFINITY {
                    return 1.0;
                }
                if x == f64::NEG_INFINITY {
                    return 0.0;
                }
                // exp overflows past ~709
                let clamped = x.clamp(-700.0, 700.0);
                1.0 / (1.0 + (-clamped).exp())
            }
            Self::Tanh => x.tanh(),
            Self::Step => {
                if x >= 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::LeakyReLU => {
                if x >= 0.0 {
                    x
                } else {
                    x * relu_leak
                }
            }
            Self::Linear => x,
        }
    }
}

/// Aggregation applied to the weighted values of a node's enabled inbound connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Aggregation {
    #[default]
    Sum,
    Product,
    Min,
    Max,
    Mean,
    Median,
    /// Largest absolute value.
    MaxAbs,
}

impl Aggregation {
    /// All available aggregation functions.
    pub const ALL: [Self; 7] = [
        Self::Sum,
        Self::Product,
        Self::Min,
        Self::Max,
        Self::Mean,
        Self::Median,
        Self::MaxAbs,
    ];

    /// Reduce `values` to a single number. An empty slice always yields `0.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn aggregate(self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }

        match self {
            Self::Sum => values.iter().sum(),
            Self::Product => values.iter().product(),
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Self::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            Self::MaxAbs => values.iter().fold(0.0, |acc: f64, v| acc.max(v.abs())),
        }
    }
}

/// Per-function thresholds used to derive the boolean "activated" view of a node,
/// plus the leak slope of [`Activation::LeakyReLU`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    pub sigmoid_threshold: f64,
    pub tanh_threshold: f64,
    pub step_threshold: f64,
    pub relu_threshold: f64,
    pub linear_threshold: f64,
    /// Slope applied to negative inputs of the leaky ReLU.
    pub relu_leak: f64,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            sigmoid_threshold: 0.5,
            tanh_threshold: 0.0,
            step_threshold: 0.0,
            relu_threshold: 0.0,
            linear_threshold: 0.0,
            relu_leak: 0.01,
        }
    }
}

impl ActivationConfig {
    /// Threshold configured for `activation`.
    #[must_use]
    pub const fn threshold(&self, activation: Activation) -> f64 {
        match activation {
            Activation::Sigmoid => self.sigmoid_threshold,
            Activation::Tanh => self.tanh_threshold,
            Activation::Step => self.step_threshold,
            Activation::LeakyReLU => self.relu_threshold,
            Activation::Linear => self.linear_threshold,
        }
    }

    /// Whether `value`, produced by `activation`, counts as activated.
    #[inline]
    #[must_use]
    pub fn is_activated(&self, activation: Activation, value: f64) -> bool {
        value > self.threshold(activation)
    }
}
