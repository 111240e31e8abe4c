//! The generational loop.
//!
//! A [`Population`] owns the candidates, their species, the innovation
//! tracker and the random number generator of one run. The caller evaluates
//! every candidate through [`Population::population_mut`], then calls
//! [`Population::evolve`] to produce the next generation.
//!
//! One call to `evolve`:
//!
//! 1. Optionally nudges the compatibility threshold toward the target species
//!    count.
//! 2. Shares fitness within species and ranks members and species.
//! 3. Records the all-time best candidate and checks the termination
//!    criteria.
//! 4. Culls stagnant species (the top `species_elitism` are exempt).
//! 5. Allocates offspring in proportion to adjusted fitness, trimming the
//!    total back to the population size when rounding overshoots.
//! 6. Assembles elites, reproduced children and mutated filler clones, then
//!    re-speciates.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::config::NeatConfig;
use crate::error::{GenomeError, NeatError};
use crate::genome::NeatGenome;
use crate::innovation::InnovationTracker;
use crate::species::Species;

/// A genome together with the fitness the caller assigned to it.
#[derive(Debug, Clone)]
pub struct Candidate {
    genome: NeatGenome,
    fitness: f64,
    pub(crate) adjusted_fitness: f64,
    species: Option<usize>,
}

impl Candidate {
    #[must_use]
    pub fn new(genome: NeatGenome) -> Self {
        Self {
            genome,
            fitness: 0.0,
            adjusted_fitness: 0.0,
            species: None,
        }
    }

    /// Run the network, returning one value per output.
    ///
    /// # Errors
    ///
    /// [`GenomeError::InputLength`] if `inputs` has the wrong length.
    pub fn evaluate(&mut self, inputs: &[f64]) -> Result<Vec<f64>, GenomeError> {
        self.genome.feed(inputs)
    }

    /// Run the network and test each output against its activation threshold.
    ///
    /// # Errors
    ///
    /// [`GenomeError::InputLength`] if `inputs` has the wrong length.
    pub fn evaluate_thresholded(&mut self, inputs: &[f64]) -> Result<Vec<bool>, GenomeError> {
        self.genome.feed_thresholded(inputs)
    }

    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    #[must_use]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Fitness shared within the species; derived by [`Population::evolve`].
    #[must_use]
    pub fn adjusted_fitness(&self) -> f64 {
        self.adjusted_fitness
    }

    /// Id of the species this candidate was assigned to.
    #[must_use]
    pub fn species(&self) -> Option<usize> {
        self.species
    }

    #[must_use]
    pub fn genome(&self) -> &NeatGenome {
        &self.genome
    }

    pub fn genome_mut(&mut self) -> &mut NeatGenome {
        &mut self.genome
    }
}

/// Why a run is (or is not yet) over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvolutionState {
    Running,
    /// The configured generation limit was reached.
    GenerationLimit,
    /// The configured fitness threshold was reached.
    FitnessThreshold,
}

/// Controller for one evolutionary run.
#[derive(Debug, Clone)]
pub struct Population {
    config: NeatConfig,
    candidates: Vec<Candidate>,
    species: Vec<Species>,
    tracker: InnovationTracker,
    rng: ChaCha8Rng,
    best: Option<Candidate>,
    compatibility_threshold: f64,
    generation: usize,
    mean_fitness: f64,
    state: EvolutionState,
    next_species_id: usize,
}

impl Population {
    /// Validate `config` and create the initial population, seeded from the OS.
    ///
    /// # Errors
    ///
    /// [`NeatError::Config`] if the configuration is rejected.
    pub fn new(config: NeatConfig) -> Result<Self, NeatError> {
        Self::with_rng(config, ChaCha8Rng::from_os_rng())
    }

    /// Same as [`Population::new`] with a deterministic seed.
    ///
    /// # Errors
    ///
    /// [`NeatError::Config`] if the configuration is rejected.
    pub fn with_seed(config: NeatConfig, seed: u64) -> Result<Self, NeatError> {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(config: NeatConfig, mut rng: ChaCha8Rng) -> Result<Self, NeatError> {
        config.validate()?;

        let mut tracker = InnovationTracker::new();
        let candidates = (0..config.population_size)
            .map(|_| Candidate::new(NeatGenome::new(&config, &mut tracker, &mut rng)))
            .collect();

        let mut population = Self {
            compatibility_threshold: config.compatibility_threshold,
            config,
            candidates,
            species: Vec::new(),
            tracker,
            rng,
            best: None,
            generation: 1,
            mean_fitness: 0.0,
            state: EvolutionState::Running,
            next_species_id: 1,
        };
        population.speciate();
        Ok(population)
    }

    /// The current generation's candidates.
    #[must_use]
    pub fn population(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Mutable access for assigning fitness.
    pub fn population_mut(&mut self) -> &mut [Candidate] {
        &mut self.candidates
    }

    /// Best candidate seen so far (a snapshot taken when it was recorded).
    #[must_use]
    pub fn best(&self) -> Option<&Candidate> {
        self.best.as_ref()
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state != EvolutionState::Running
    }

    #[must_use]
    pub fn state(&self) -> EvolutionState {
        self.state
    }

    /// Generation counter, starting at 1.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    #[must_use]
    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    #[must_use]
    pub fn species(&self) -> &[Species] {
        &self.species
    }

    #[must_use]
    pub fn current_compatibility_threshold(&self) -> f64 {
        self.compatibility_threshold
    }

    /// Mean raw fitness of the last evaluated generation.
    #[must_use]
    pub fn mean_fitness(&self) -> f64 {
        self.mean_fitness
    }

    #[must_use]
    pub fn config(&self) -> &NeatConfig {
        &self.config
    }

    #[must_use]
    pub fn tracker(&self) -> &InnovationTracker {
        &self.tracker
    }

    /// Advance one generation using the fitness values currently assigned to
    /// the population.
    ///
    /// Does nothing once the run has terminated. When a termination criterion
    /// is met the current generation is kept as is.
    ///
    /// # Errors
    ///
    /// [`NeatError::Genome`] if reproduction meets a corrupted genome.
    pub fn evolve(&mut self, verbose: bool) -> Result<EvolutionState, NeatError> {
        if self.is_terminated() {
            return Ok(self.state);
        }

        if self.config.dynamic_compatibility_threshold {
            self.adjust_compatibility_threshold();
        }

        let species_before = self.species.len();
        self.rank();
        self.mean_fitness = self.candidates.iter().map(Candidate::fitness).sum::<f64>()
            / self.candidates.len().max(1) as f64;
        self.record_best();

        if verbose {
            info!(
                target: "neat",
                generation = self.generation,
                mean_fitness = self.mean_fitness,
                best_fitness = ?self.best.as_ref().map(Candidate::fitness),
                species = species_before,
                "generation evaluated"
            );
        }

        self.state = self.termination_check();
        match self.state {
            EvolutionState::Running => {}
            EvolutionState::GenerationLimit => {
                info!(target: "neat", generation = self.generation, limit = ?self.config.generation_limit, "terminated: generation limit reached");
                return Ok(self.state);
            }
            EvolutionState::FitnessThreshold => {
                info!(target: "neat", generation = self.generation, threshold = ?self.config.fitness_threshold, "terminated: fitness threshold reached");
                return Ok(self.state);
            }
        }

        self.cull_stagnant();
        self.allocate_offspring();
        let next = self.assemble_next_generation()?;

        self.candidates = next
            .into_iter()
            .map(|mut genome| {
                genome.reset_state();
                Candidate::new(genome)
            })
            .collect();
        self.speciate();
        self.generation += 1;
        Ok(self.state)
    }

    fn adjust_compatibility_threshold(&mut self) {
        let count = self.species.len();
        let factor = self.config.compatibility_adjustment_factor;
        if count > self.config.target_species {
            self.compatibility_threshold *= 1.0 + factor;
        } else if count < self.config.target_species {
            self.compatibility_threshold *= 1.0 - factor;
        }
    }

    /// Share fitness, then order members and species best first.
    fn rank(&mut self) {
        let config = &self.config;
        for species in &mut self.species {
            species.calculate_fitness(&mut self.candidates, config);
            species.sort_members(&self.candidates, config);
        }

        let criterion = config.fitness_criterion;
        let candidates = &self.candidates;
        self.species.sort_by(|a, b| {
            let fa = a.top_fitness(candidates).unwrap_or(f64::NAN);
            let fb = b.top_fitness(candidates).unwrap_or(f64::NAN);
            criterion.best_first(fa, fb)
        });
    }

    fn record_best(&mut self) {
        let criterion = self.config.fitness_criterion;
        let Some(current) = self
            .candidates
            .iter()
            .filter(|c| !c.fitness().is_nan())
            .min_by(|a, b| criterion.best_first(a.fitness(), b.fitness()))
        else {
            return;
        };
        let improved = match &self.best {
            Some(best) => criterion.is_better(current.fitness(), best.fitness()),
            None => true,
        };
        if improved {
            self.best = Some(current.clone());
        }
    }

    fn termination_check(&self) -> EvolutionState {
        if let Some(limit) = self.config.generation_limit {
            if self.generation >= limit {
                return EvolutionState::GenerationLimit;
            }
        }
        if let Some(threshold) = self.config.fitness_threshold {
            let criterion = self.config.fitness_criterion;
            let top = self
                .candidates
                .iter()
                .map(Candidate::fitness)
                .filter(|f| !f.is_nan())
                .min_by(|&a, &b| criterion.best_first(a, b));
            if top.is_some_and(|top| criterion.reached(top, threshold)) {
                return EvolutionState::FitnessThreshold;
            }
        }
        EvolutionState::Running
    }

    /// Drop species whose best fitness has not improved for
    /// `stagnation_limit` generations. Species are ranked best first here, so
    /// the first `species_elitism` are protected.
    fn cull_stagnant(&mut self) {
        for species in &mut self.species {
            species.update_stagnation(&self.candidates, &self.config);
        }

        let protected = self.config.species_elitism;
        let limit = self.config.stagnation_limit;
        let mut survivors: Vec<Species> = Vec::with_capacity(self.species.len());
        let mut culled: Vec<Species> = Vec::new();
        for (rank, species) in std::mem::take(&mut self.species).into_iter().enumerate() {
            if rank >= protected && species.stagnation() >= limit {
                debug!(target: "neat", species = species.id(), stagnation = species.stagnation(), "culling stagnant species");
                culled.push(species);
            } else {
                survivors.push(species);
            }
        }

        if survivors.is_empty() && !culled.is_empty() {
            warn!(target: "neat", "every species is stagnant; keeping the best one");
            survivors.push(culled.swap_remove(0));
        }
        self.species = survivors;
    }

    /// Set each species' elite and offspring counts so that the total never
    /// exceeds the population size.
    ///
    /// Negative and NaN adjusted fitness count as zero, so every share lies in
    /// `[0, 1]` and rounding overshoots by at most half a unit per species.
    fn allocate_offspring(&mut self) {
        let population_size = self.config.population_size;
        let weight = |species: &Species| species.adjusted_fitness().max(0.0);
        let total_adjusted: f64 = self.species.iter().map(weight).sum();
        let total_members: usize = self.species.iter().map(Species::len).sum();
        let by_size = !(total_adjusted > 0.0 && total_adjusted.is_finite());
        if by_size {
            warn!(target: "neat", total_adjusted, "no usable adjusted fitness; allocating offspring by species size");
        }

        let elitism = self.config.elitism;
        for species in &mut self.species {
            let share = if by_size {
                species.len() as f64 / total_members.max(1) as f64
            } else {
                weight(&*species) / total_adjusted
            };
            let count = (share * population_size as f64).round() as usize;
            let elites = count.min(species.len()).min(elitism);
            species.elites = elites;
            species.offspring = count - elites;
        }
        self.species
            .retain(|species| species.elites + species.offspring > 0);

        let allocated: usize = self
            .species
            .iter()
            .map(|s| s.elites + s.offspring)
            .sum();
        if allocated > population_size {
            self.rebalance(allocated - population_size);
        }
    }

    /// Take back `excess` offspring one at a time, cycling from the weakest
    /// species up. A species with no offspring left to give is dropped, which
    /// also returns its elites.
    ///
    /// Whole rounds in which every species gives one are taken in bulk.
    fn rebalance(&mut self, mut excess: usize) {
        debug!(target: "neat", excess, "trimming offspring allocation");
        while excess > 0 && !self.species.is_empty() {
            let len = self.species.len();
            let fewest = self.species.iter().map(|s| s.offspring).min().unwrap_or(0);
            let rounds = (excess / len).min(fewest);
            if rounds > 0 {
                for species in &mut self.species {
                    species.offspring -= rounds;
                }
                excess -= rounds * len;
                continue;
            }

            let mut cursor = len;
            while excess > 0 && cursor > 0 {
                cursor -= 1;
                let species = &mut self.species[cursor];
                if species.offspring > 0 {
                    species.offspring -= 1;
                    excess -= 1;
                } else {
                    debug!(target: "neat", species = species.id(), elites = species.elites, "dropping species during rebalancing");
                    excess = excess.saturating_sub(species.elites);
                    self.species.remove(cursor);
                }
            }
        }
    }

    fn assemble_next_generation(&mut self) -> Result<Vec<NeatGenome>, NeatError> {
        let population_size = self.config.population_size;
        let mut next: Vec<NeatGenome> = Vec::with_capacity(population_size);

        for species in &self.species {
            next.extend(species.elite_genomes(&self.candidates));
        }
        for species in &self.species {
            let children =
                species.reproduce(&self.candidates, &self.config, &mut self.tracker, &mut self.rng)?;
            next.extend(children);
        }

        let mut turn = 0usize;
        while next.len() < population_size {
            let source = if self.species.is_empty() {
                let len = self.candidates.len();
                (len > 0).then(|| self.rng.random_range(0..len))
            } else {
                self.species[turn % self.species.len()].random_member(&mut self.rng)
            };
            let Some(source) = source else {
                break;
            };
            let mut genome = self.candidates[source].genome().clone();
            genome.mutate(&self.config, &mut self.tracker, &mut self.rng);
            next.push(genome);
            turn += 1;
        }
        next.truncate(population_size);
        Ok(next)
    }

    /// Assign every candidate to the closest species within the compatibility
    /// threshold, founding new species as needed. Representatives are kept.
    fn speciate(&mut self) {
        for species in &mut self.species {
            species.clear();
        }

        for (index, candidate) in self.candidates.iter_mut().enumerate() {
            let closest = self
                .species
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    let distance = candidate
                        .genome
                        .compatibility_distance(s.representative(), &self.config);
                    (i, distance)
                })
                .min_by(|a, b| a.1.total_cmp(&b.1));

            match closest {
                Some((i, distance)) if distance < self.compatibility_threshold => {
                    self.species[i].add(index);
                    candidate.species = Some(self.species[i].id());
                }
                _ => {
                    let id = self.next_species_id;
                    self.next_species_id += 1;
                    debug!(target: "neat", species = id, generation = self.generation, "new species");
                    self.species.push(Species::new(id, &candidate.genome, index));
                    candidate.species = Some(id);
                }
            }
        }

        self.species.retain(|species| !species.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FitnessCriterion, SelectionType};
    use crate::error::ConfigError;

    fn small_config() -> NeatConfig {
        NeatConfig {
            population_size: 30,
            fitness_threshold: None,
            ..NeatConfig::xor()
        }
    }

    fn assign_fitness(population: &mut Population, f: impl Fn(usize) -> f64) {
        for (i, candidate) in population.population_mut().iter_mut().enumerate() {
            candidate.set_fitness(f(i));
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = NeatConfig {
            population_size: 0,
            ..NeatConfig::xor()
        };
        assert!(matches!(
            Population::with_seed(config, 42),
            Err(NeatError::Config(ConfigError::Zero { .. }))
        ));
    }

    #[test]
    fn test_initial_population() {
        let population = Population::with_seed(small_config(), 42).expect("valid config");
        assert_eq!(population.population().len(), 30);
        assert_eq!(population.generation(), 1);
        assert!(population.species_count() >= 1);
        assert!(!population.is_terminated());

        let members: usize = population.species().iter().map(Species::len).sum();
        assert_eq!(members, 30, "Every candidate belongs to exactly one species");
        for candidate in population.population() {
            assert!(candidate.species().is_some());
        }
    }

    #[test]
    fn test_evolve_keeps_population_size() {
        let mut population = Population::with_seed(small_config(), 42).expect("valid config");
        for generation in 0..15 {
            assign_fitness(&mut population, |i| ((i * 7 + generation) % 11) as f64);
            let state = population.evolve(false).expect("evolve");
            assert_eq!(state, EvolutionState::Running);
            assert_eq!(population.population().len(), 30);
        }
        assert_eq!(population.generation(), 16);
    }

    #[test]
    fn test_zero_fitness_allocates_by_size() {
        let mut population = Population::with_seed(small_config(), 42).expect("valid config");
        for _ in 0..5 {
            assign_fitness(&mut population, |_| 0.0);
            population.evolve(false).expect("evolve");
            assert_eq!(population.population().len(), 30);
        }
    }

    #[test]
    fn test_best_is_kept_and_only_improves() {
        let mut population = Population::with_seed(small_config(), 42).expect("valid config");
        assign_fitness(&mut population, |i| i as f64);
        population.evolve(false).expect("evolve");
        assert_eq!(population.best().map(Candidate::fitness), Some(29.0));

        assign_fitness(&mut population, |_| 1.0);
        population.evolve(false).expect("evolve");
        assert_eq!(population.best().map(Candidate::fitness), Some(29.0));
        assert!((population.mean_fitness() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_minimizing_best() {
        let config = NeatConfig {
            fitness_criterion: FitnessCriterion::Min,
            selection: SelectionType::RouletteWheel,
            ..small_config()
        };
        let mut population = Population::with_seed(config, 7).expect("valid config");
        assign_fitness(&mut population, |i| 10.0 + i as f64);
        population.evolve(false).expect("evolve");
        assert_eq!(population.best().map(Candidate::fitness), Some(10.0));
        assert_eq!(population.population().len(), 30);
    }

    #[test]
    fn test_generation_limit() {
        let config = NeatConfig {
            generation_limit: Some(3),
            ..small_config()
        };
        let mut population = Population::with_seed(config, 42).expect("valid config");
        let mut last = EvolutionState::Running;
        for _ in 0..10 {
            assign_fitness(&mut population, |i| i as f64);
            last = population.evolve(false).expect("evolve");
        }
        assert_eq!(last, EvolutionState::GenerationLimit);
        assert!(population.is_terminated());
        assert_eq!(population.generation(), 3);
    }

    #[test]
    fn test_fitness_threshold() {
        let config = NeatConfig {
            fitness_threshold: Some(5.0),
            ..small_config()
        };
        let mut population = Population::with_seed(config, 42).expect("valid config");
        assign_fitness(&mut population, |i| if i == 3 { 5.0 } else { 1.0 });
        assert_eq!(
            population.evolve(false).expect("evolve"),
            EvolutionState::FitnessThreshold
        );
        // The terminal generation is left untouched.
        assert!((population.population()[3].fitness() - 5.0).abs() < 1e-12);
        assert_eq!(population.generation(), 1);
    }

    #[test]
    fn test_dynamic_threshold_moves_toward_target() {
        let config = NeatConfig {
            target_species: 1000,
            ..small_config()
        };
        let mut population = Population::with_seed(config, 42).expect("valid config");
        let before = population.current_compatibility_threshold();
        assign_fitness(&mut population, |i| i as f64);
        population.evolve(false).expect("evolve");
        assert!(population.current_compatibility_threshold() < before);
    }

    #[test]
    fn test_rebalance_drops_species_with_only_elites() {
        let mut population = Population::with_seed(small_config(), 42).expect("valid config");
        let genome = population.candidates[0].genome().clone();
        population.species = (0..3)
            .map(|id| {
                let mut species = Species::new(id, &genome, id);
                species.elites = 1;
                species.offspring = if id == 0 { 5 } else { 0 };
                species
            })
            .collect();

        // Weakest species (last) has nothing but its elite to give back.
        population.rebalance(2);
        let ids: Vec<usize> = population.species().iter().map(Species::id).collect();
        assert_eq!(ids, vec![0]);
        assert_eq!(population.species()[0].offspring(), 5);
    }

    #[test]
    fn test_rebalance_round_robin() {
        let mut population = Population::with_seed(small_config(), 42).expect("valid config");
        let genome = population.candidates[0].genome().clone();
        population.species = (0..3)
            .map(|id| {
                let mut species = Species::new(id, &genome, id);
                species.elites = 1;
                species.offspring = 4;
                species
            })
            .collect();

        population.rebalance(4);
        let offspring: Vec<usize> = population.species().iter().map(Species::offspring).collect();
        assert_eq!(offspring, vec![3, 3, 2]);
    }

    #[test]
    fn test_rebalance_takes_whole_rounds_in_bulk() {
        let mut population = Population::with_seed(small_config(), 42).expect("valid config");
        let genome = population.candidates[0].genome().clone();
        population.species = [1000, 1000, 1]
            .into_iter()
            .enumerate()
            .map(|(id, offspring)| {
                let mut species = Species::new(id, &genome, id);
                species.elites = 1;
                species.offspring = offspring;
                species
            })
            .collect();

        population.rebalance(1500);
        let ids: Vec<usize> = population.species().iter().map(Species::id).collect();
        assert_eq!(ids, vec![0, 1]);
        let offspring: Vec<usize> = population.species().iter().map(Species::offspring).collect();
        assert_eq!(offspring, vec![251, 251]);
    }

    #[test]
    fn test_mixed_sign_fitness_allocates_within_population() {
        let config = NeatConfig {
            population_size: 4,
            compatibility_threshold: 1e-12,
            dynamic_compatibility_threshold: false,
            ..small_config()
        };
        let mut population = Population::with_seed(config, 42).expect("valid config");
        assert_eq!(population.species_count(), 4);

        let fitness = [1e15, -1e15 + 64.0, 0.0, 0.0];
        assign_fitness(&mut population, |i| fitness[i]);
        assert_eq!(population.evolve(false).expect("evolve"), EvolutionState::Running);
        assert_eq!(population.population().len(), 4);
    }

    #[test]
    fn test_nan_fitness_does_not_mask_threshold() {
        let config = NeatConfig {
            fitness_threshold: Some(3.9),
            ..small_config()
        };
        let mut population = Population::with_seed(config, 42).expect("valid config");
        assign_fitness(&mut population, |i| match i {
            0 => f64::NAN,
            1 => 4.0,
            _ => 1.0,
        });
        assert_eq!(
            population.evolve(false).expect("evolve"),
            EvolutionState::FitnessThreshold
        );
        assert_eq!(population.best().map(Candidate::fitness), Some(4.0));
    }

    #[test]
    fn test_nan_generation_is_never_best() {
        let mut population = Population::with_seed(small_config(), 42).expect("valid config");
        assign_fitness(&mut population, |_| f64::NAN);
        population.evolve(false).expect("evolve");
        assert!(population.best().is_none());
        assert_eq!(population.population().len(), 30);

        assign_fitness(&mut population, |_| 3.0);
        population.evolve(false).expect("evolve");
        assert_eq!(population.best().map(Candidate::fitness), Some(3.0));
    }

    fn two_species(population: &mut Population) {
        let genome = population.candidates[0].genome().clone();
        population.candidates[0].set_fitness(5.0);
        population.candidates[1].set_fitness(1.0);
        population.species = vec![Species::new(10, &genome, 0), Species::new(11, &genome, 1)];
    }

    #[test]
    fn test_stagnant_species_culled_except_protected() {
        let config = NeatConfig {
            stagnation_limit: 2,
            species_elitism: 1,
            ..small_config()
        };
        let mut population = Population::with_seed(config, 42).expect("valid config");
        two_species(&mut population);

        population.cull_stagnant();
        population.cull_stagnant();
        assert_eq!(population.species_count(), 2, "Stagnation 1 is below the limit");

        population.cull_stagnant();
        let ids: Vec<usize> = population.species().iter().map(Species::id).collect();
        assert_eq!(ids, vec![10]);
        assert_eq!(population.species()[0].stagnation(), 2);
    }

    #[test]
    fn test_all_stagnant_keeps_best_species() {
        let config = NeatConfig {
            stagnation_limit: 1,
            species_elitism: 0,
            ..small_config()
        };
        let mut population = Population::with_seed(config, 42).expect("valid config");
        two_species(&mut population);

        population.cull_stagnant();
        population.cull_stagnant();
        let ids: Vec<usize> = population.species().iter().map(Species::id).collect();
        assert_eq!(ids, vec![10]);
    }
}
