//! Historical-marking registry for NEAT.
//!
//! Every structural mutation that creates a connection asks the run's
//! [`InnovationTracker`] for an innovation number. The tracker is keyed by the
//! split innovations of the two endpoints, so a connection between
//! corresponding nodes receives the same number no matter which genome creates
//! it or when. That shared numbering is what lets [`crate::NeatGenome`]
//! align genes of unrelated genomes during crossover and speciation.
//!
//! The tracker is an explicit value owned by [`crate::Population`] and passed
//! by `&mut` into genome operations, so independent runs never share state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Registry of every `(from, to)` endpoint pair seen in a run, plus the next
/// innovation number to hand out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TrackerRecord", into = "TrackerRecord")]
pub struct InnovationTracker {
    registry: HashMap<(i64, i64), u64>,
    next: u64,
}

impl InnovationTracker {
    /// An empty tracker whose first innovation is 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty tracker whose first innovation is `next`.
    #[must_use]
    pub fn starting_at(next: u64) -> Self {
        Self {
            registry: HashMap::new(),
            next,
        }
    }

    /// Innovation number for a connection between the nodes whose split
    /// innovations are `from` and `to`.
    ///
    /// Returns the number registered earlier in this run for the same pair,
    /// or mints and records a fresh one.
    pub fn innovation(&mut self, from: i64, to: i64) -> u64 {
        let next = &mut self.next;
        *self.registry.entry((from, to)).or_insert_with(|| {
            let innovation = *next;
            *next += 1;
            innovation
        })
    }

    /// Look up an already registered pair without minting.
    #[must_use]
    pub fn get(&self, from: i64, to: i64) -> Option<u64> {
        self.registry.get(&(from, to)).copied()
    }

    /// The number the next unseen pair will receive.
    #[must_use]
    pub fn next_innovation(&self) -> u64 {
        self.next
    }

    /// Number of distinct pairs registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

/// Serialized shape: tuple keys are not valid map keys in most formats.
#[derive(Serialize, Deserialize)]
struct TrackerRecord {
    next: u64,
    entries: Vec<(i64, i64, u64)>,
}

impl From<TrackerRecord> for InnovationTracker {
    fn from(record: TrackerRecord) -> Self {
        Self {
            registry: record
                .entries
                .into_iter()
                .map(|(from, to, innovation)| ((from, to), innovation))
                .collect(),
            next: record.next,
        }
    }
}

impl From<InnovationTracker> for TrackerRecord {
    fn from(tracker: InnovationTracker) -> Self {
        let mut entries: Vec<(i64, i64, u64)> = tracker
            .registry
            .into_iter()
            .map(|((from, to), innovation)| (from, to, innovation))
            .collect();
        entries.sort_unstable_by_key(|&(_, _, innovation)| innovation);
        Self {
            next: tracker.next,
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_pair_reuses_innovation() {
        let mut tracker = InnovationTracker::new();
        let first = tracker.innovation(-1, -3);
        let again = tracker.innovation(-1, -3);
        assert_eq!(first, again, "Same endpoints should reuse the innovation");
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_direction_matters() {
        let mut tracker = InnovationTracker::new();
        let forward = tracker.innovation(-1, -2);
        let backward = tracker.innovation(-2, -1);
        assert_ne!(forward, backward);
    }

    #[test]
    fn test_innovations_are_sequential() {
        let mut tracker = InnovationTracker::new();
        let numbers: Vec<u64> = (0..5).map(|i| tracker.innovation(-1, i)).collect();
        assert_eq!(numbers, vec![0, 1, 2, 3, 4]);
        assert_eq!(tracker.next_innovation(), 5);
    }

    #[test]
    fn test_starting_at() {
        let mut tracker = InnovationTracker::starting_at(100);
        assert_eq!(tracker.innovation(-1, -2), 100);
        assert_eq!(tracker.get(-1, -2), Some(100));
        assert_eq!(tracker.get(-2, -1), None);
    }

    #[test]
    fn test_serde_keeps_registry() {
        let mut tracker = InnovationTracker::new();
        tracker.innovation(-1, -3);
        tracker.innovation(0, -3);

        let json = serde_json::to_string(&tracker).expect("serialize");
        let restored: InnovationTracker = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, tracker);
    }
}
