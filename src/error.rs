//! Error types for configuration, genome surgery and the evolution loop.

use thiserror::Error;

/// Result type for fallible NEAT operations.
pub type NeatResult<T> = Result<T, NeatError>;

/// A configuration value that cannot be used to build a population.
///
/// Values are rejected as-is; nothing is silently clamped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },

    #[error("{field} must lie in [0, 1], got {value}")]
    Probability { field: &'static str, value: f64 },

    #[error("{field}: adjust rate {adjust} plus randomize rate {randomize} exceeds 1")]
    RateSum {
        field: &'static str,
        adjust: f64,
        randomize: f64,
    },

    #[error("{field}: min {min} is greater than max {max}")]
    InvertedRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("{field} must be finite and non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must lie in [0, 1), got {value}")]
    AdjustmentFactor { field: &'static str, value: f64 },

    #[error("{field} must not be empty")]
    EmptySet { field: &'static str },

    #[error("starting hidden layer {index} has no nodes")]
    EmptyHiddenLayer { index: usize },
}

/// A genome invariant violation or a malformed evaluation request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenomeError {
    /// A connection refers to a node that is absent from the genome being assembled.
    #[error("connection {innovation} refers to node {split_innovation}, which is not in the genome")]
    MissingEndpoint { innovation: u64, split_innovation: i64 },

    /// A parent's connection refers to a node that parent does not own.
    #[error("connection {0} refers to a node outside its own genome")]
    DanglingConnection(u64),

    #[error("expected {expected} inputs, got {actual}")]
    InputLength { expected: usize, actual: usize },

    #[error("no connection with innovation {0}")]
    UnknownConnection(u64),

    /// The connection is recurrent or has already been split.
    #[error("connection {0} cannot be split")]
    NotSplittable(u64),
}

/// Crate-level error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NeatError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("genome error: {0}")]
    Genome(#[from] GenomeError),
}
