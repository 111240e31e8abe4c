//! XOR example using the NEAT population controller.
//!
//! Evolves a network that solves XOR, the classic neuroevolution benchmark.
//!
//! Run with: `cargo run --example xor`

use neat_evolve::{Candidate, EvolutionState, NeatConfig, Population};

const XOR_CASES: [([f64; 2], f64); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

/// Maximum fitness is 4.0 (perfect solution).
fn xor_fitness(candidate: &mut Candidate) -> f64 {
    let mut total_error = 0.0;
    for (inputs, expected) in XOR_CASES {
        let output = candidate.evaluate(&inputs).map_or(0.0, |o| o[0]);
        total_error += (output - expected).powi(2);
    }
    4.0 - total_error
}

fn main() {
    println!("NEAT XOR Example");
    println!("================\n");

    let config = NeatConfig {
        generation_limit: Some(500),
        ..NeatConfig::xor()
    };
    let seed = 42;

    println!("Population: {}", config.population_size);
    println!("Generation limit: {:?}", config.generation_limit);
    println!("Fitness threshold: {:?}", config.fitness_threshold);
    println!();

    let mut population = match Population::with_seed(config, seed) {
        Ok(population) => population,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return;
        }
    };

    while !population.is_terminated() {
        for candidate in population.population_mut() {
            let fitness = xor_fitness(candidate);
            candidate.set_fitness(fitness);
        }

        let generation = population.generation();
        if let Err(e) = population.evolve(false) {
            eprintln!("evolution failed: {e}");
            return;
        }

        if generation % 10 == 0 || population.is_terminated() {
            let best = population.best().map_or(f64::NAN, Candidate::fitness);
            println!(
                "Gen {:3}: best={:.4}, mean={:.4}, species={}, threshold={:.2}",
                generation,
                best,
                population.mean_fitness(),
                population.species_count(),
                population.current_compatibility_threshold()
            );
        }
    }

    println!();
    println!("Evolution Complete!");
    println!("==================");
    match population.state() {
        EvolutionState::FitnessThreshold => {
            println!("Solved at generation {}", population.generation());
        }
        state => println!("Stopped: {state:?}"),
    }

    let Some(champion) = population.best() else {
        return;
    };
    let mut champion = champion.clone();
    println!("Best fitness: {:.4}", champion.fitness());
    println!("Nodes: {}", champion.genome().nodes().len());
    println!(
        "Connections: {}",
        champion.genome().num_enabled_connections()
    );
    println!("Hidden nodes: {}", champion.genome().hidden_ids().len());

    println!("\nChampion XOR outputs:");
    for (inputs, expected) in XOR_CASES {
        let output = champion.evaluate(&inputs).map_or(f64::NAN, |o| o[0]);
        let rounded = if output > 0.5 { 1.0 } else { 0.0 };
        let status = if (rounded - expected).abs() < 0.1 {
            "✓"
        } else {
            "✗"
        };
        println!(
            "  {} XOR {} = {:.4} (expected {}) {}",
            inputs[0] as i32, inputs[1] as i32, output, expected as i32, status
        );
    }
}
