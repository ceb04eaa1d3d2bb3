//! Hall of fame: the best distinct solutions seen across a run.

use std::cmp::Ordering;

use super::genome::genome_distance;
use super::search::Individual;

/// Bounded archive of the best distinct individuals.
///
/// Entries are kept sorted best first by lexicographic fitness. Identical
/// gene vectors are stored once. With a positive `diversity_threshold`, a
/// newcomer closer than the threshold to an archived entry only displaces
/// that entry when it is strictly better.
#[derive(Debug, Clone, Default)]
pub struct SolutionArchive {
    entries: Vec<Individual>,
    max_size: usize,
    diversity_threshold: f64,
}

impl SolutionArchive {
    /// Create a new archive.
    pub fn new(max_size: usize, diversity_threshold: f64) -> Self {
        Self {
            entries: Vec::with_capacity(max_size),
            max_size,
            diversity_threshold,
        }
    }

    /// Offer an evaluated, feasible individual. Returns whether it was stored.
    pub fn offer(&mut self, candidate: &Individual) -> bool {
        if self.max_size == 0 {
            return false;
        }
        let Some(fitness) = candidate.fitness.as_ref() else {
            return false;
        };
        if fitness.is_degenerate() {
            return false;
        }

        let mut displaced = None;
        for (i, archived) in self.entries.iter().enumerate() {
            let distance = genome_distance(&candidate.genes, &archived.genes);
            if distance == 0.0 {
                return false;
            }
            if distance < self.diversity_threshold {
                let Some(existing) = archived.fitness.as_ref() else {
                    continue;
                };
                if fitness.cmp_lexicographic(existing) != Ordering::Greater {
                    return false;
                }
                displaced.get_or_insert(i);
            }
        }

        if let Some(i) = displaced {
            self.entries.remove(i);
        } else if self.entries.len() >= self.max_size
            && let Some(worst) = self.entries.last().and_then(|w| w.fitness.as_ref())
            && fitness.cmp_lexicographic(worst) != Ordering::Greater
        {
            return false;
        }

        let position = self
            .entries
            .iter()
            .position(|e| {
                e.fitness
                    .as_ref()
                    .is_none_or(|f| fitness.cmp_lexicographic(f) == Ordering::Greater)
            })
            .unwrap_or(self.entries.len());
        self.entries.insert(position, candidate.clone());
        self.entries.truncate(self.max_size);
        true
    }

    /// Offer every individual; returns how many were stored.
    pub fn update<'a, I>(&mut self, individuals: I) -> usize
    where
        I: IntoIterator<Item = &'a Individual>,
    {
        individuals
            .into_iter()
            .filter(|ind| self.offer(ind))
            .count()
    }

    /// Archived individuals, best first.
    pub fn entries(&self) -> &[Individual] {
        &self.entries
    }

    pub fn best(&self) -> Option<&Individual> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::fitness::Fitness;
    use crate::compute::evolution::genome::Genes;

    fn individual(id: u64, bits: &[bool], coverage: f64) -> Individual {
        Individual {
            id,
            genes: Genes::from_vec(bits.to_vec()),
            fitness: Some(Fitness {
                coverage,
                installations: bits.iter().filter(|&&b| b).count(),
                cost: 0.0,
                objectives: vec![coverage],
            }),
            generation: 0,
            parents: Vec::new(),
        }
    }

    #[test]
    fn test_keeps_best_sorted_and_bounded() {
        let mut archive = SolutionArchive::new(2, 0.0);
        assert!(archive.offer(&individual(1, &[true, false, false], 1.0)));
        assert!(archive.offer(&individual(2, &[false, true, false], 3.0)));
        assert!(archive.offer(&individual(3, &[false, false, true], 2.0)));
        // Worse than everything in a full archive.
        assert!(!archive.offer(&individual(4, &[true, true, false], 0.5)));

        let ids: Vec<u64> = archive.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(archive.best().map(|b| b.id), Some(2));
    }

    #[test]
    fn test_identical_genes_stored_once() {
        let mut archive = SolutionArchive::new(5, 0.0);
        assert!(archive.offer(&individual(1, &[true, false], 1.0)));
        assert!(!archive.offer(&individual(2, &[true, false], 1.0)));
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_rejects_degenerate_and_unevaluated() {
        let mut archive = SolutionArchive::new(5, 0.0);
        assert!(!archive.offer(&individual(1, &[false, false], 0.0)));

        let mut unevaluated = individual(2, &[true, false], 1.0);
        unevaluated.fitness = None;
        assert!(!archive.offer(&unevaluated));
        assert!(archive.is_empty());
    }

    #[test]
    fn test_diversity_threshold_displaces_close_worse_entry() {
        let mut archive = SolutionArchive::new(5, 0.5);
        assert!(archive.offer(&individual(1, &[true, true, false, false], 1.0)));
        // Distance 0.25 to entry 1 and worse: rejected.
        assert!(!archive.offer(&individual(2, &[true, true, true, false], 0.5)));
        // Distance 0.25 and better: displaces entry 1.
        assert!(archive.offer(&individual(3, &[true, false, false, false], 2.0)));
        // Far from everything: stored alongside.
        assert!(archive.offer(&individual(4, &[false, true, true, true], 0.7)));

        let ids: Vec<u64> = archive.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 4]);
    }
}
