//! # NEAT Evolve
//!
//! A NeuroEvolution of Augmenting Topologies (NEAT) engine: genomes that grow
//! their own structure, aligned across a run by historical markings, grouped
//! into species and bred by a generational population controller.
//!
//! ## Features
//!
//! - **Historical markings**: an explicit [`InnovationTracker`] hands the same
//!   innovation number to the same structural change, whichever genome makes it
//! - **Arena-Graph Model**: `SlotMap` storage for nodes and connections, so
//!   cloning a genome is a bulk copy
//! - **Layered evaluation**: feed-forward or recurrent networks, evaluated
//!   layer by layer with one step of recurrent memory
//! - **Speciation**: fitness sharing, stagnation culling, elitism and
//!   roulette or tournament selection
//!
//! ## Quick Start
//!
//! ```rust
//! use neat_evolve::{NeatConfig, Population};
//!
//! const XOR: [([f64; 2], f64); 4] = [
//!     ([0.0, 0.0], 0.0),
//!     ([0.0, 1.0], 1.0),
//!     ([1.0, 0.0], 1.0),
//!     ([1.0, 1.0], 0.0),
//! ];
//!
//! let config = NeatConfig {
//!     generation_limit: Some(5),
//!     ..NeatConfig::xor()
//! };
//! let mut population = Population::with_seed(config, 42).expect("valid config");
//!
//! while !population.is_terminated() {
//!     for candidate in population.population_mut() {
//!         let mut error = 0.0;
//!         for (inputs, expected) in XOR {
//!             let output = candidate.evaluate(&inputs).expect("two inputs")[0];
//!             error += (expected - output).powi(2);
//!         }
//!         candidate.set_fitness(4.0 - error);
//!     }
//!     population.evolve(false).expect("evolve");
//! }
//!
//! let best = population.best().expect("at least one generation evaluated");
//! println!("best fitness: {}", best.fitness());
//! ```
//!
//! ## Architecture
//!
//! ### Identity
//!
//! - **Connections** carry an innovation number keyed by the split
//!   innovations of their endpoints.
//! - **Nodes** carry a split innovation: `-1, -2, ..` for nodes made at
//!   construction, or the innovation of the connection they were split from.
//!
//! Two genomes that independently split "the same" connection therefore end
//! up with corresponding nodes and connections.
//!
//! ### Layers
//!
//! Inputs sit on layer 0 and outputs on a sentinel last layer. Every hidden
//! node sits one past the longest chain of non-recurrent connections leading
//! to it, recomputed after each structural change. Cycles that would break
//! this ordering are cut by marking a back edge recurrent.
//!
//! ### Logging
//!
//! The crate emits `tracing` events under the `neat` target and never
//! installs a subscriber.

pub mod activation;
pub mod config;
pub mod error;
pub mod gene;
pub mod genome;
pub mod innovation;
pub mod layout;
pub mod network;
pub mod population;
pub mod species;
pub mod topology;

// Re-exports for convenience
pub use activation::{Activation, ActivationConfig, Aggregation};
pub use config::{
    Distribution, FitnessCriterion, InitialConnectivity, NeatConfig, ParameterRange,
    SelectionType, SpeciesFitness,
};
pub use error::{ConfigError, GenomeError, NeatError, NeatResult};
pub use gene::{ConnectionGene, ConnectionId, NodeGene, NodeId, NodeType, OUTPUT_LAYER};
pub use genome::NeatGenome;
pub use innovation::InnovationTracker;
pub use layout::Layout;
pub use population::{Candidate, EvolutionState, Population};
pub use species::Species;
pub use topology::GraphTopology;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_independent_trackers_do_not_interfere() {
        let config = NeatConfig::xor();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut first = InnovationTracker::new();
        let mut second = InnovationTracker::starting_at(1000);

        let a = NeatGenome::new(&config, &mut first, &mut rng);
        let b = NeatGenome::new(&config, &mut second, &mut rng);

        assert_eq!(a.max_innovation(), Some(1));
        assert_eq!(b.max_innovation(), Some(1001));
        assert_eq!(first.next_innovation(), 2);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = NeatConfig::xor();
        let json = serde_json::to_string(&config).expect("Serialization failed");
        let restored: NeatConfig = serde_json::from_str(&json).expect("Deserialization failed");
        assert_eq!(restored.population_size, 150);
        assert_eq!(restored.initial_connectivity, InitialConnectivity::FullDirect);
        assert_eq!(restored.fitness_threshold, Some(3.9));
        assert!(restored.validate().is_ok());
    }

    #[test]
    fn test_mutated_genome_survives_serialization() {
        let config = NeatConfig {
            add_node_prob: 0.5,
            add_connection_prob: 0.5,
            ..NeatConfig::new(10, 3, 2)
        };
        let mut rng = ChaCha8Rng::seed_from_u64(123);
        let mut tracker = InnovationTracker::new();
        let mut genome = NeatGenome::new(&config, &mut tracker, &mut rng);
        for _ in 0..10 {
            genome.mutate(&config, &mut tracker, &mut rng);
        }

        let json = serde_json::to_string(&genome).expect("Serialization failed");
        let mut restored: NeatGenome =
            serde_json::from_str(&json).expect("Deserialization failed");

        assert_eq!(genome.nodes().len(), restored.nodes().len());
        assert_eq!(genome.connections().len(), restored.connections().len());
        assert_eq!(genome.layers(), restored.layers());

        let inputs = [0.3, -0.2, 0.9];
        let expected = genome.feed(&inputs).expect("three inputs");
        let actual = restored.feed(&inputs).expect("three inputs");
        assert_eq!(expected, actual);
    }
}
