//! Species: clusters of compatible genomes.
//!
//! A species refers to its members by index into the population's candidate
//! list and keeps an owned copy of the genome it was founded with. Members
//! share fitness: each one's adjusted fitness is its oriented fitness divided
//! by the species size, and the species' total drives how many offspring it
//! is granted.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use crate::config::{NeatConfig, SelectionType};
use crate::error::GenomeError;
use crate::genome::NeatGenome;
use crate::innovation::InnovationTracker;
use crate::population::Candidate;

/// A cluster of genomes within the compatibility threshold of its
/// representative.
#[derive(Debug, Clone)]
pub struct Species {
    id: usize,
    /// Fixed at creation; later members are compared against this genome.
    representative: NeatGenome,
    /// Candidate indices, best first after [`Species::sort_members`].
    members: Vec<usize>,
    fitness: f64,
    adjusted_fitness: f64,
    /// Best top-member fitness seen so far.
    best_fitness: Option<f64>,
    stagnation: usize,
    pub(crate) elites: usize,
    pub(crate) offspring: usize,
}

impl Species {
    /// Found a species with `founder` (index `member`) as its representative.
    #[must_use]
    pub fn new(id: usize, founder: &NeatGenome, member: usize) -> Self {
        Self {
            id,
            representative: founder.clone(),
            members: vec![member],
            fitness: 0.0,
            adjusted_fitness: 0.0,
            best_fitness: None,
            stagnation: 0,
            elites: 0,
            offspring: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    #[must_use]
    pub fn representative(&self) -> &NeatGenome {
        &self.representative
    }

    #[must_use]
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Aggregate member fitness (see [`crate::config::SpeciesFitness`]).
    #[must_use]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Sum of the members' adjusted fitness.
    #[must_use]
    pub fn adjusted_fitness(&self) -> f64 {
        self.adjusted_fitness
    }

    /// Consecutive generations without a new best top-member fitness.
    #[must_use]
    pub fn stagnation(&self) -> usize {
        self.stagnation
    }

    #[must_use]
    pub fn elites(&self) -> usize {
        self.elites
    }

    #[must_use]
    pub fn offspring(&self) -> usize {
        self.offspring
    }

    pub(crate) fn add(&mut self, member: usize) {
        self.members.push(member);
    }

    pub(crate) fn clear(&mut self) {
        self.members.clear();
    }

    /// Compute the species aggregate and write each member's adjusted fitness.
    pub(crate) fn calculate_fitness(&mut self, candidates: &mut [Candidate], config: &NeatConfig) {
        let raw: Vec<f64> = self.members.iter().map(|&i| candidates[i].fitness()).collect();
        self.fitness = config.species_fitness.aggregate(&raw);

        let size = self.members.len().max(1) as f64;
        let mut sum = 0.0;
        for &i in &self.members {
            let adjusted = config.fitness_criterion.oriented(candidates[i].fitness()) / size;
            candidates[i].adjusted_fitness = adjusted;
            sum += adjusted;
        }
        self.adjusted_fitness = sum;
    }

    pub(crate) fn sort_members(&mut self, candidates: &[Candidate], config: &NeatConfig) {
        let criterion = config.fitness_criterion;
        self.members.sort_by(|&a, &b| {
            criterion.best_first(candidates[a].fitness(), candidates[b].fitness())
        });
    }

    /// Fitness of the best member; valid after [`Species::sort_members`].
    #[must_use]
    pub fn top_fitness(&self, candidates: &[Candidate]) -> Option<f64> {
        self.members.first().map(|&i| candidates[i].fitness())
    }

    /// Advance or reset the stagnation counter from the current top member.
    pub(crate) fn update_stagnation(&mut self, candidates: &[Candidate], config: &NeatConfig) {
        let Some(top) = self.top_fitness(candidates) else {
            return;
        };
        let improved = !top.is_nan()
            && match self.best_fitness {
                Some(best) => config.fitness_criterion.is_better(top, best),
                None => true,
            };
        if improved {
            self.stagnation = 0;
            self.best_fitness = Some(top);
        } else {
            self.stagnation += 1;
        }
    }

    /// Unchanged copies of the top `elites` members.
    pub(crate) fn elite_genomes<'a>(
        &'a self,
        candidates: &'a [Candidate],
    ) -> impl Iterator<Item = NeatGenome> + 'a {
        self.members
            .iter()
            .take(self.elites)
            .map(|&i| candidates[i].genome().clone())
    }

    /// The top `survival_threshold` fraction of members (at least one),
    /// shuffled.
    fn selection_pool<R: Rng>(&self, survival_threshold: f64, rng: &mut R) -> Vec<usize> {
        let size = ((survival_threshold * self.members.len() as f64) as usize).max(1);
        let mut pool: Vec<usize> = self.members.iter().copied().take(size).collect();
        pool.shuffle(rng);
        pool
    }

    fn select<R: Rng>(
        pool: &[usize],
        candidates: &[Candidate],
        config: &NeatConfig,
        rng: &mut R,
    ) -> Option<usize> {
        match config.selection {
            SelectionType::RouletteWheel => roulette(pool, candidates, config, rng),
            SelectionType::Tournament => {
                let criterion = config.fitness_criterion;
                let mut winner = *pool.choose(rng)?;
                for _ in 1..config.tournament_size {
                    let Some(&challenger) = pool.choose(rng) else {
                        break;
                    };
                    if criterion
                        .best_first(candidates[challenger].fitness(), candidates[winner].fitness())
                        .is_lt()
                    {
                        winner = challenger;
                    }
                }
                Some(winner)
            }
        }
    }

    /// Breed `offspring` children from the selection pool.
    ///
    /// Two parents are drawn per child. The same parent twice gives a clone;
    /// otherwise the fitter one leads the crossover, and equally fit parents
    /// share their unmatched genes. Every child is mutated.
    pub(crate) fn reproduce<R: Rng>(
        &self,
        candidates: &[Candidate],
        config: &NeatConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> Result<Vec<NeatGenome>, GenomeError> {
        let pool = self.selection_pool(config.survival_threshold, rng);
        let criterion = config.fitness_criterion;
        let mut children = Vec::with_capacity(self.offspring);

        for _ in 0..self.offspring {
            let (Some(a), Some(b)) = (
                Self::select(&pool, candidates, config, rng),
                Self::select(&pool, candidates, config, rng),
            ) else {
                break;
            };
            let (first, second) = (&candidates[a], &candidates[b]);

            let mut child = if a == b {
                first.genome().clone()
            } else if criterion.is_better(first.fitness(), second.fitness()) {
                NeatGenome::crossover(first.genome(), second.genome(), false, config, rng)?
            } else if criterion.is_better(second.fitness(), first.fitness()) {
                NeatGenome::crossover(second.genome(), first.genome(), false, config, rng)?
            } else {
                NeatGenome::crossover(second.genome(), first.genome(), true, config, rng)?
            };
            child.mutate(config, tracker, rng);
            children.push(child);
        }

        Ok(children)
    }

    pub(crate) fn random_member<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        self.members.choose(rng).copied()
    }
}

/// Draw proportionally to oriented fitness; negative weights count as zero.
/// Falls back to a uniform draw when the weights sum to zero or overflow.
fn roulette<R: Rng>(
    pool: &[usize],
    candidates: &[Candidate],
    config: &NeatConfig,
    rng: &mut R,
) -> Option<usize> {
    let weight = |i: usize| {
        let w = config.fitness_criterion.oriented(candidates[i].fitness());
        if w > 0.0 {
            w
        } else {
            0.0
        }
    };
    let sum: f64 = pool.iter().map(|&i| weight(i)).sum();
    if !(sum > 0.0 && sum.is_finite()) {
        return pool.choose(rng).copied();
    }

    let stop = rng.random::<f64>() * sum;
    let mut running = 0.0;
    for &i in pool {
        running += weight(i);
        if running > stop {
            return Some(i);
        }
    }
    pool.last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FitnessCriterion;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn candidates_with(fitness: &[f64], config: &NeatConfig) -> Vec<Candidate> {
        let mut tracker = InnovationTracker::new();
        let mut rng = test_rng();
        fitness
            .iter()
            .map(|&f| {
                let mut c = Candidate::new(NeatGenome::new(config, &mut tracker, &mut rng));
                c.set_fitness(f);
                c
            })
            .collect()
    }

    fn species_of(candidates: &[Candidate]) -> Species {
        let mut species = Species::new(1, candidates[0].genome(), 0);
        for i in 1..candidates.len() {
            species.add(i);
        }
        species
    }

    #[test]
    fn test_fitness_sharing() {
        let config = NeatConfig::xor();
        let mut candidates = candidates_with(&[1.0, 3.0, 2.0, 2.0], &config);
        let mut species = species_of(&candidates);

        species.calculate_fitness(&mut candidates, &config);
        assert!((species.fitness() - 3.0).abs() < 1e-12, "xor preset aggregates with max");
        assert!((species.adjusted_fitness() - 2.0).abs() < 1e-12);
        assert!((candidates[1].adjusted_fitness() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_fitness_sharing_minimizing() {
        let config = NeatConfig {
            fitness_criterion: FitnessCriterion::Min,
            ..NeatConfig::xor()
        };
        let mut candidates = candidates_with(&[0.0, 1.0], &config);
        let mut species = species_of(&candidates);

        species.calculate_fitness(&mut candidates, &config);
        // (1/1)/2 + (1/2)/2
        assert!((species.adjusted_fitness() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_sort_members() {
        let config = NeatConfig::xor();
        let candidates = candidates_with(&[1.0, 3.0, 2.0], &config);
        let mut species = species_of(&candidates);

        species.sort_members(&candidates, &config);
        assert_eq!(species.members(), &[1, 2, 0]);
        assert_eq!(species.top_fitness(&candidates), Some(3.0));

        let config = NeatConfig {
            fitness_criterion: FitnessCriterion::Min,
            ..config
        };
        species.sort_members(&candidates, &config);
        assert_eq!(species.members(), &[0, 2, 1]);
    }

    #[test]
    fn test_stagnation() {
        let config = NeatConfig::xor();
        let mut candidates = candidates_with(&[1.0, 2.0], &config);
        let mut species = species_of(&candidates);

        species.sort_members(&candidates, &config);
        species.update_stagnation(&candidates, &config);
        assert_eq!(species.stagnation(), 0);

        species.update_stagnation(&candidates, &config);
        species.update_stagnation(&candidates, &config);
        assert_eq!(species.stagnation(), 2);

        candidates[0].set_fitness(5.0);
        species.sort_members(&candidates, &config);
        species.update_stagnation(&candidates, &config);
        assert_eq!(species.stagnation(), 0, "A new best resets the counter");
    }

    #[test]
    fn test_selection_pool_size() {
        let config = NeatConfig::xor();
        let candidates = candidates_with(&[5.0, 4.0, 3.0, 2.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0], &config);
        let mut species = species_of(&candidates);
        species.sort_members(&candidates, &config);
        let mut rng = test_rng();

        let mut pool = species.selection_pool(0.2, &mut rng);
        pool.sort_unstable();
        assert_eq!(pool, vec![0, 1]);
        assert_eq!(species.selection_pool(0.01, &mut rng).len(), 1);
    }

    #[test]
    fn test_tournament_prefers_fitter() {
        let config = NeatConfig {
            tournament_size: 50,
            ..NeatConfig::xor()
        };
        let candidates = candidates_with(&[1.0, 9.0, 2.0], &config);
        let pool = [0, 1, 2];
        let mut rng = test_rng();
        assert_eq!(Species::select(&pool, &candidates, &config, &mut rng), Some(1));
    }

    #[test]
    fn test_roulette_zero_weights_fall_back_to_uniform() {
        let config = NeatConfig {
            selection: SelectionType::RouletteWheel,
            ..NeatConfig::xor()
        };
        let candidates = candidates_with(&[0.0, -1.0, 0.0], &config);
        let pool = [0, 1, 2];
        let mut rng = test_rng();
        for _ in 0..20 {
            let picked = roulette(&pool, &candidates, &config, &mut rng).expect("non-empty pool");
            assert!(pool.contains(&picked));
        }
    }

    #[test]
    fn test_roulette_skips_zero_weight() {
        let config = NeatConfig {
            selection: SelectionType::RouletteWheel,
            ..NeatConfig::xor()
        };
        let candidates = candidates_with(&[0.0, 4.0, 0.0], &config);
        let pool = [0, 1, 2];
        let mut rng = test_rng();
        for _ in 0..20 {
            assert_eq!(roulette(&pool, &candidates, &config, &mut rng), Some(1));
        }
    }

    #[test]
    fn test_reproduce_and_elites() {
        let config = NeatConfig::xor();
        let candidates = candidates_with(&[1.0, 3.0, 2.0, 2.0, 0.5], &config);
        let mut species = species_of(&candidates);
        species.sort_members(&candidates, &config);
        species.elites = 2;
        species.offspring = 6;

        let elites: Vec<NeatGenome> = species.elite_genomes(&candidates).collect();
        assert_eq!(elites.len(), 2);

        let mut tracker = InnovationTracker::starting_at(2);
        let mut rng = test_rng();
        let children = species
            .reproduce(&candidates, &config, &mut tracker, &mut rng)
            .expect("reproduction");
        assert_eq!(children.len(), 6);
        for child in &children {
            assert_eq!(child.input_ids().len(), 2);
            assert_eq!(child.output_ids().len(), 1);
        }
    }

    #[test]
    fn test_roulette_favours_lower_fitness_when_minimizing() {
        let config = NeatConfig {
            selection: SelectionType::RouletteWheel,
            fitness_criterion: FitnessCriterion::Min,
            ..NeatConfig::xor()
        };
        // Weights 1/2 and 1/10: the first is drawn five times as often.
        let candidates = candidates_with(&[1.0, 9.0], &config);
        let pool = [0, 1];
        let mut rng = test_rng();

        let draws = 2000;
        let low = (0..draws)
            .filter(|_| roulette(&pool, &candidates, &config, &mut rng) == Some(0))
            .count();
        assert!(low > 1500, "lower fitness drawn {low} of {draws} times");
    }

    #[test]
    fn test_tournament_never_picks_nan_over_finite() {
        let config = NeatConfig {
            tournament_size: 50,
            ..NeatConfig::xor()
        };
        let candidates = candidates_with(&[f64::NAN, 1.0, 2.0], &config);
        let pool = [0, 1, 2];
        let mut rng = test_rng();
        assert_eq!(Species::select(&pool, &candidates, &config, &mut rng), Some(2));
    }
}
