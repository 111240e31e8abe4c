//! Configuration for genome construction, mutation, speciation and selection.
//!
//! [`NeatConfig`] is a plain record: every field is public, missing fields
//! fall back to [`Default`] when deserializing, and [`NeatConfig::validate`]
//! rejects unusable values instead of clamping them.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::activation::{Activation, ActivationConfig, Aggregation};
use crate::error::ConfigError;

/// Distribution used when a parameter is drawn from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Distribution {
    /// `mean + stdev * N(0, 1)`
    #[default]
    Normal,
    /// Uniform with the same mean and standard deviation: width `stdev * sqrt(12)`.
    Uniform,
}

/// How connections are laid out when a genome is first created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InitialConnectivity {
    /// No connections at all.
    Unconnected,
    /// One random input wired to every output.
    FeatureSelectionNoHidden,
    /// One random input wired to every hidden node and every output, every
    /// hidden node wired to every output.
    FeatureSelectionHidden,
    /// Every node of each layer wired to every node of the next layer.
    LayerByLayer,
    /// Inputs to hidden nodes, hidden nodes to outputs; inputs go straight to
    /// outputs only when there are no hidden nodes.
    FullNoDirect,
    /// As [`FullNoDirect`](Self::FullNoDirect) plus every input wired to every output.
    #[default]
    FullDirect,
    /// [`FullNoDirect`](Self::FullNoDirect) with each edge kept with `connect_probability`.
    PartialNoDirect,
    /// [`FullDirect`](Self::FullDirect) with each edge kept with `connect_probability`.
    PartialDirect,
}

/// Parent selection inside a species' survival pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SelectionType {
    /// Fitness-proportionate draw.
    RouletteWheel,
    /// Best of `tournament_size` uniform draws.
    #[default]
    Tournament,
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FitnessCriterion {
    /// Higher fitness is better.
    #[default]
    Max,
    /// Lower fitness is better.
    Min,
}

impl FitnessCriterion {
    /// Whether `a` is strictly better than `b`.
    #[inline]
    #[must_use]
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            Self::Max => a > b,
            Self::Min => a < b,
        }
    }

    /// Ordering that puts the better fitness first. NaN sorts last in both
    /// directions.
    #[must_use]
    pub fn best_first(self, a: f64, b: f64) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match self {
                Self::Max => b.total_cmp(&a),
                Self::Min => a.total_cmp(&b),
            },
        }
    }

    /// Map a raw fitness onto a "bigger is better" scale.
    ///
    /// Identity when maximizing, `1 / (1 + raw)` when minimizing.
    #[inline]
    #[must_use]
    pub fn oriented(self, raw: f64) -> f64 {
        match self {
            Self::Max => raw,
            Self::Min => 1.0 / (1.0 + raw),
        }
    }

    /// Whether `aggregate` has reached `threshold` in this direction.
    #[must_use]
    pub fn reached(self, aggregate: f64, threshold: f64) -> bool {
        match self {
            Self::Max => aggregate >= threshold,
            Self::Min => aggregate <= threshold,
        }
    }
}

/// How a species' member fitnesses are summarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SpeciesFitness {
    Min,
    Max,
    #[default]
    Mean,
    Median,
}

impl SpeciesFitness {
    #[must_use]
    pub fn aggregate(self, values: &[f64]) -> f64 {
        let aggregation = match self {
            Self::Min => Aggregation::Min,
            Self::Max => Aggregation::Max,
            Self::Mean => Aggregation::Mean,
            Self::Median => Aggregation::Median,
        };
        aggregation.aggregate(values)
    }
}

/// Initialization, mutation and clamping settings for one numeric gene
/// attribute (weight, bias or response).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterRange {
    pub init_mean: f64,
    pub init_stdev: f64,
    pub init_distribution: Distribution,
    pub min: f64,
    pub max: f64,
    /// Standard deviation of the Gaussian perturbation applied on "adjust".
    pub mutation_power: f64,
    /// Probability of perturbing the value during parametric mutation.
    pub adjust_rate: f64,
    /// Probability of redrawing the value from scratch, checked after `adjust_rate`.
    pub randomize_rate: f64,
}

impl Default for ParameterRange {
    fn default() -> Self {
        Self {
            init_mean: 0.0,
            init_stdev: 1.0,
            init_distribution: Distribution::Normal,
            min: -50.0,
            max: 50.0,
            mutation_power: 0.5,
            adjust_rate: 0.8,
            randomize_rate: 0.1,
        }
    }
}

impl ParameterRange {
    /// Constant `value`, never mutated.
    #[must_use]
    pub fn fixed(value: f64) -> Self {
        Self {
            init_mean: value,
            init_stdev: 0.0,
            mutation_power: 0.0,
            adjust_rate: 0.0,
            randomize_rate: 0.0,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    /// Draw a fresh value from the initial distribution.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        let value = match self.init_distribution {
            Distribution::Normal => {
                let z: f64 = rng.sample(StandardNormal);
                self.init_mean + self.init_stdev * z
            }
            Distribution::Uniform => {
                let range = self.init_stdev * 12f64.sqrt();
                self.init_mean - range / 2.0 + rng.random::<f64>() * range
            }
        };
        self.clamp(value)
    }

    /// Add Gaussian noise scaled by `mutation_power`.
    pub fn perturb<R: Rng>(&self, value: f64, rng: &mut R) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        self.clamp(value + z * self.mutation_power)
    }

    /// One parametric-mutation roll: perturb, redraw, or keep `value`.
    pub fn mutate<R: Rng>(&self, value: f64, rng: &mut R) -> f64 {
        let roll = rng.random::<f64>();
        if roll < self.adjust_rate {
            self.perturb(value, rng)
        } else if roll < self.adjust_rate + self.randomize_rate {
            self.sample(rng)
        } else {
            value
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if !(self.min <= self.max) {
            return Err(ConfigError::InvertedRange {
                field,
                min: self.min,
                max: self.max,
            });
        }
        non_negative(field, self.init_stdev)?;
        non_negative(field, self.mutation_power)?;
        probability(field, self.adjust_rate)?;
        probability(field, self.randomize_rate)?;
        if self.adjust_rate + self.randomize_rate > 1.0 {
            return Err(ConfigError::RateSum {
                field,
                adjust: self.adjust_rate,
                randomize: self.randomize_rate,
            });
        }
        Ok(())
    }
}

/// Complete configuration of a NEAT run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeatConfig {
    pub population_size: usize,
    pub num_inputs: usize,
    pub num_outputs: usize,

    /// Hidden-node counts of the layers created at construction, in layer order.
    pub starting_hidden_layers: Vec<usize>,
    /// Add-node fails once a genome has this many hidden nodes.
    pub max_hidden_nodes: usize,
    pub initial_connectivity: InitialConnectivity,
    /// Per-edge inclusion probability of the partial connectivity policies.
    pub connect_probability: f64,

    /// When set, no recurrent connection is ever created or kept enabled.
    pub feed_forward: bool,
    /// Chance that add-connection proposes a recurrent pair (non feed-forward only).
    pub recurrent_connection_prob: f64,
    /// Enabled flag of connections created by add-connection and construction.
    pub enabled_default: bool,
    /// Add-connection may re-enable an existing disabled edge, and add-node
    /// falls back to add-connection when nothing is splittable.
    pub structural_mutation_advisor: bool,
    /// Stop after the first structural operator that succeeds.
    pub single_structural_mutation: bool,

    pub add_connection_prob: f64,
    pub add_node_prob: f64,
    pub delete_connection_prob: f64,
    pub delete_node_prob: f64,

    pub weight: ParameterRange,
    pub bias: ParameterRange,
    pub response: ParameterRange,

    /// Base chance of flipping a connection's enabled flag.
    pub enable_toggle_rate: f64,
    /// Added to `enable_toggle_rate` for currently enabled connections.
    pub enable_toggle_bonus_when_enabled: f64,
    /// Added to `enable_toggle_rate` for currently disabled connections.
    pub enable_toggle_bonus_when_disabled: f64,

    pub activation_mutation_rate: f64,
    pub aggregation_mutation_rate: f64,
    pub allowed_activations: Vec<Activation>,
    pub allowed_aggregations: Vec<Aggregation>,
    pub hidden_activation: Activation,
    pub output_activation: Activation,
    pub starting_aggregation: Aggregation,
    pub activation: ActivationConfig,

    pub compatibility_excess_coeff: f64,
    pub compatibility_disjoint_coeff: f64,
    pub compatibility_weight_coeff: f64,
    pub compatibility_threshold: f64,
    /// Scale the threshold each generation toward `target_species`.
    pub dynamic_compatibility_threshold: bool,
    pub compatibility_adjustment_factor: f64,
    pub target_species: usize,

    pub selection: SelectionType,
    pub tournament_size: usize,
    /// Unchanged copies of each species' best members carried over.
    pub elitism: usize,
    /// Number of top-ranked species exempt from stagnation removal.
    pub species_elitism: usize,
    /// Generations without improvement after which a species is removed.
    pub stagnation_limit: usize,
    /// Fraction of each species (best first) eligible as parents.
    pub survival_threshold: f64,
    pub species_fitness: SpeciesFitness,
    pub fitness_criterion: FitnessCriterion,

    /// Stop once the population's best fitness reaches this value.
    pub fitness_threshold: Option<f64>,
    /// Stop once this generation is reached.
    pub generation_limit: Option<usize>,
}

impl Default for NeatConfig {
    fn default() -> Self {
        Self {
            population_size: 150,
            num_inputs: 2,
            num_outputs: 1,
            starting_hidden_layers: Vec::new(),
            max_hidden_nodes: usize::MAX,
            initial_connectivity: InitialConnectivity::FullDirect,
            connect_probability: 0.5,
            feed_forward: true,
            recurrent_connection_prob: 0.1,
            enabled_default: true,
            structural_mutation_advisor: true,
            single_structural_mutation: false,
            add_connection_prob: 0.05,
            add_node_prob: 0.03,
            delete_connection_prob: 0.0,
            delete_node_prob: 0.0,
            weight: ParameterRange::default(),
            bias: ParameterRange {
                adjust_rate: 0.7,
                ..ParameterRange::default()
            },
            response: ParameterRange::fixed(1.0),
            enable_toggle_rate: 0.01,
            enable_toggle_bonus_when_enabled: 0.0,
            enable_toggle_bonus_when_disabled: 0.0,
            activation_mutation_rate: 0.0,
            aggregation_mutation_rate: 0.0,
            allowed_activations: Activation::ALL.to_vec(),
            allowed_aggregations: Aggregation::ALL.to_vec(),
            hidden_activation: Activation::Sigmoid,
            output_activation: Activation::Sigmoid,
            starting_aggregation: Aggregation::Sum,
            activation: ActivationConfig::default(),
            compatibility_excess_coeff: 1.0,
            compatibility_disjoint_coeff: 1.0,
            compatibility_weight_coeff: 0.5,
            compatibility_threshold: 3.0,
            dynamic_compatibility_threshold: false,
            compatibility_adjustment_factor: 0.1,
            target_species: 10,
            selection: SelectionType::Tournament,
            tournament_size: 3,
            elitism: 1,
            species_elitism: 1,
            stagnation_limit: 15,
            survival_threshold: 0.2,
            species_fitness: SpeciesFitness::Mean,
            fitness_criterion: FitnessCriterion::Max,
            fitness_threshold: None,
            generation_limit: None,
        }
    }
}

impl NeatConfig {
    /// Default settings for a network of the given shape.
    #[must_use]
    pub fn new(population_size: usize, num_inputs: usize, num_outputs: usize) -> Self {
        Self {
            population_size,
            num_inputs,
            num_outputs,
            ..Self::default()
        }
    }

    /// The classic XOR setup: 150 genomes, 2 inputs, 1 output, at most one
    /// hidden node, tournament selection, stopping at fitness 3.9.
    #[must_use]
    pub fn xor() -> Self {
        let weight = ParameterRange {
            init_stdev: 20.0,
            min: -20.0,
            max: 20.0,
            mutation_power: 0.5,
            adjust_rate: 0.8,
            randomize_rate: 0.1,
            ..ParameterRange::default()
        };
        Self {
            max_hidden_nodes: 1,
            structural_mutation_advisor: false,
            single_structural_mutation: false,
            initial_connectivity: InitialConnectivity::FullDirect,
            add_connection_prob: 0.1,
            add_node_prob: 0.06,
            weight,
            bias: ParameterRange {
                adjust_rate: 0.7,
                ..weight
            },
            enable_toggle_rate: 0.01,
            enable_toggle_bonus_when_enabled: -0.01,
            compatibility_excess_coeff: 1.0,
            compatibility_disjoint_coeff: 1.0,
            compatibility_weight_coeff: 0.4,
            compatibility_threshold: 5.0,
            dynamic_compatibility_threshold: true,
            compatibility_adjustment_factor: 0.2,
            target_species: 20,
            selection: SelectionType::Tournament,
            tournament_size: 4,
            elitism: 1,
            species_elitism: 1,
            stagnation_limit: 10,
            survival_threshold: 0.2,
            species_fitness: SpeciesFitness::Max,
            fitness_criterion: FitnessCriterion::Max,
            fitness_threshold: Some(3.9),
            ..Self::new(150, 2, 1)
        }
    }

    /// Reject values that cannot drive a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        nonzero("population_size", self.population_size)?;
        nonzero("num_inputs", self.num_inputs)?;
        nonzero("num_outputs", self.num_outputs)?;
        if let Some(index) = self.starting_hidden_layers.iter().position(|&n| n == 0) {
            return Err(ConfigError::EmptyHiddenLayer { index });
        }

        for (field, value) in [
            ("connect_probability", self.connect_probability),
            ("recurrent_connection_prob", self.recurrent_connection_prob),
            ("add_connection_prob", self.add_connection_prob),
            ("add_node_prob", self.add_node_prob),
            ("delete_connection_prob", self.delete_connection_prob),
            ("delete_node_prob", self.delete_node_prob),
            ("enable_toggle_rate", self.enable_toggle_rate),
            ("activation_mutation_rate", self.activation_mutation_rate),
            ("aggregation_mutation_rate", self.aggregation_mutation_rate),
            ("survival_threshold", self.survival_threshold),
        ] {
            probability(field, value)?;
        }
        for (field, value) in [
            (
                "enable_toggle_bonus_when_enabled",
                self.enable_toggle_bonus_when_enabled,
            ),
            (
                "enable_toggle_bonus_when_disabled",
                self.enable_toggle_bonus_when_disabled,
            ),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Negative { field, value });
            }
        }

        self.weight.validate("weight")?;
        self.bias.validate("bias")?;
        self.response.validate("response")?;

        if self.allowed_activations.is_empty() {
            return Err(ConfigError::EmptySet {
                field: "allowed_activations",
            });
        }
        if self.allowed_aggregations.is_empty() {
            return Err(ConfigError::EmptySet {
                field: "allowed_aggregations",
            });
        }
        if self.activation.relu_leak.is_nan() {
            return Err(ConfigError::Negative {
                field: "activation.relu_leak",
                value: self.activation.relu_leak,
            });
        }

        non_negative("compatibility_excess_coeff", self.compatibility_excess_coeff)?;
        non_negative(
            "compatibility_disjoint_coeff",
            self.compatibility_disjoint_coeff,
        )?;
        non_negative("compatibility_weight_coeff", self.compatibility_weight_coeff)?;
        non_negative("compatibility_threshold", self.compatibility_threshold)?;
        let factor = self.compatibility_adjustment_factor;
        if !(0.0..1.0).contains(&factor) {
            return Err(ConfigError::AdjustmentFactor {
                field: "compatibility_adjustment_factor",
                value: factor,
            });
        }

        if self.selection == SelectionType::Tournament {
            nonzero("tournament_size", self.tournament_size)?;
        }
        Ok(())
    }

    /// Toggle probability for a connection in the given state, clamped to `[0, 1]`.
    #[must_use]
    pub fn toggle_probability(&self, enabled: bool) -> f64 {
        let bonus = if enabled {
            self.enable_toggle_bonus_when_enabled
        } else {
            self.enable_toggle_bonus_when_disabled
        };
        (self.enable_toggle_rate + bonus).clamp(0.0, 1.0)
    }
}

fn nonzero(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Zero { field });
    }
    Ok(())
}

fn probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Probability { field, value });
    }
    Ok(())
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_best_first_puts_nan_last() {
        for criterion in [FitnessCriterion::Max, FitnessCriterion::Min] {
            let mut values = vec![f64::NAN, 2.0, f64::INFINITY, -1.0];
            values.sort_by(|&a, &b| criterion.best_first(a, b));
            assert!(values[3].is_nan(), "{criterion:?}: {values:?}");
        }
    }

    #[test]
    fn test_default_and_presets_validate() {
        assert_eq!(NeatConfig::default().validate(), Ok(()));
        assert_eq!(NeatConfig::xor().validate(), Ok(()));
        assert_eq!(NeatConfig::new(10, 3, 2).validate(), Ok(()));
    }

    #[test]
    fn test_rejects_zero_sizes() {
        let config = NeatConfig::new(0, 2, 1);
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero {
                field: "population_size"
            })
        );

        let config = NeatConfig::new(10, 2, 0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Zero {
                field: "num_outputs"
            })
        ));
    }

    #[test]
    fn test_rejects_bad_probabilities() {
        let config = NeatConfig {
            add_node_prob: 1.2,
            ..NeatConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Probability {
                field: "add_node_prob",
                ..
            })
        ));

        let config = NeatConfig {
            survival_threshold: -0.1,
            ..NeatConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_rate_sum_and_inverted_range() {
        let config = NeatConfig {
            weight: ParameterRange {
                adjust_rate: 0.8,
                randomize_rate: 0.3,
                ..ParameterRange::default()
            },
            ..NeatConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RateSum { field: "weight", .. })
        ));

        let config = NeatConfig {
            bias: ParameterRange {
                min: 1.0,
                max: -1.0,
                ..ParameterRange::default()
            },
            ..NeatConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedRange { field: "bias", .. })
        ));
    }

    #[test]
    fn test_rejects_empty_sets_and_layers() {
        let config = NeatConfig {
            allowed_activations: Vec::new(),
            ..NeatConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptySet { .. })));

        let config = NeatConfig {
            starting_hidden_layers: vec![2, 0],
            ..NeatConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyHiddenLayer { index: 1 })
        );
    }

    #[test]
    fn test_rejects_tournament_of_zero_and_bad_factor() {
        let config = NeatConfig {
            tournament_size: 0,
            ..NeatConfig::default()
        };
        assert!(config.validate().is_err());

        let config = NeatConfig {
            tournament_size: 0,
            selection: SelectionType::RouletteWheel,
            ..NeatConfig::default()
        };
        assert!(config.validate().is_ok());

        let config = NeatConfig {
            compatibility_adjustment_factor: 1.0,
            ..NeatConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AdjustmentFactor { .. })
        ));
    }

    #[test]
    fn test_parameter_sampling_respects_bounds() {
        let mut rng = test_rng();
        let range = ParameterRange {
            init_stdev: 100.0,
            min: -1.0,
            max: 1.0,
            ..ParameterRange::default()
        };
        for _ in 0..200 {
            let value = range.sample(&mut rng);
            assert!((-1.0..=1.0).contains(&value));
            let perturbed = range.perturb(value, &mut rng);
            assert!((-1.0..=1.0).contains(&perturbed));
        }

        let uniform = ParameterRange {
            init_mean: 5.0,
            init_stdev: 1.0,
            init_distribution: Distribution::Uniform,
            ..ParameterRange::default()
        };
        let half_width = 12f64.sqrt() / 2.0;
        for _ in 0..200 {
            let value = uniform.sample(&mut rng);
            assert!(value >= 5.0 - half_width && value < 5.0 + half_width);
        }
    }

    #[test]
    fn test_fixed_range_never_moves() {
        let mut rng = test_rng();
        let range = ParameterRange::fixed(1.0);
        for _ in 0..50 {
            assert_eq!(range.mutate(1.0, &mut rng), 1.0);
            assert_eq!(range.sample(&mut rng), 1.0);
        }
    }

    #[test]
    fn test_toggle_probability_is_clamped() {
        let config = NeatConfig::xor();
        assert_eq!(config.toggle_probability(true), 0.0);
        assert!((config.toggle_probability(false) - 0.01).abs() < 1e-12);

        let config = NeatConfig {
            enable_toggle_rate: 0.9,
            enable_toggle_bonus_when_disabled: 0.5,
            ..NeatConfig::default()
        };
        assert_eq!(config.toggle_probability(false), 1.0);
    }

    #[test]
    fn test_fitness_criterion() {
        assert!(FitnessCriterion::Max.is_better(2.0, 1.0));
        assert!(FitnessCriterion::Min.is_better(1.0, 2.0));
        assert!(!FitnessCriterion::Max.is_better(1.0, 1.0));
        assert!((FitnessCriterion::Min.oriented(1.0) - 0.5).abs() < 1e-12);
        assert!(FitnessCriterion::Max.reached(3.9, 3.9));
        assert!(FitnessCriterion::Min.reached(0.1, 0.2));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "population_size": 50, "weight": { "max": 10.0 } }"#;
        let config: NeatConfig = serde_json::from_str(json).expect("deserialize");
        assert_eq!(config.population_size, 50);
        assert_eq!(config.num_inputs, 2);
        assert_eq!(config.weight.max, 10.0);
        assert_eq!(config.weight.min, -50.0);
        assert!(config.validate().is_ok());
    }
}
