//! Gene vectors and the random operators that act on them.
//!
//! Provides random generation, two-point crossover, and bit-flip mutation.

use std::sync::Arc;

use rand::prelude::*;
use rand::seq::index;
use rand_distr::Binomial;

use crate::schema::Initialization;

/// Fixed-length selection over the candidate set, one bit per candidate.
///
/// Clones share storage; the first write through [`Genes::make_mut`] copies
/// it, so a child never aliases its parent. The length cannot change after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Genes {
    bits: Arc<Vec<bool>>,
}

impl Genes {
    /// All-zero gene vector (nothing installed).
    pub fn zeros(len: usize) -> Self {
        Self::from_vec(vec![false; len])
    }

    pub fn from_vec(bits: Vec<bool>) -> Self {
        Self {
            bits: Arc::new(bits),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<bool> {
        self.bits.get(index).copied()
    }

    /// Mutable view of the bits, copying shared storage first.
    pub fn make_mut(&mut self) -> &mut [bool] {
        Arc::make_mut(&mut self.bits).as_mut_slice()
    }

    pub fn set(&mut self, index: usize, value: bool) {
        if self.bits[index] != value {
            self.make_mut()[index] = value;
        }
    }

    /// Number of installed sites.
    pub fn installed_count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Indices of installed sites, ascending.
    pub fn installed_indices(&self) -> Vec<usize> {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| b.then_some(i))
            .collect()
    }

    /// Whether two gene vectors share the same storage.
    pub fn shares_storage(&self, other: &Genes) -> bool {
        Arc::ptr_eq(&self.bits, &other.bits)
    }
}

/// Random number generator wrapper for gene operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Underlying generator, for operators that take any `Rng`.
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Generate a fresh gene vector of length `len`.
    ///
    /// `max_installations` bounds the exact-budget variant; it is ignored by
    /// the Bernoulli variant.
    pub fn random_genes(
        &mut self,
        len: usize,
        init: &Initialization,
        max_installations: usize,
    ) -> Genes {
        match init {
            Initialization::Bernoulli { probability } => self.bernoulli_genes(len, *probability),
            Initialization::ExactBudget => self.sample_exact(len, max_installations.min(len)),
        }
    }

    /// Each gene set independently with probability `p`.
    pub fn bernoulli_genes(&mut self, len: usize, p: f64) -> Genes {
        let p = p.clamp(0.0, 1.0);
        Genes::from_vec((0..len).map(|_| self.rng.gen_bool(p)).collect())
    }

    /// Exactly `count` genes set, positions chosen uniformly.
    pub fn sample_exact(&mut self, len: usize, count: usize) -> Genes {
        let mut bits = vec![false; len];
        for i in index::sample(&mut self.rng, len, count.min(len)) {
            bits[i] = true;
        }
        Genes::from_vec(bits)
    }

    /// Two-point crossover: the segment between two distinct cut points is
    /// swapped between the parents. Parents are left untouched.
    pub fn two_point_crossover(&mut self, parent1: &Genes, parent2: &Genes) -> (Genes, Genes) {
        let mut child1 = parent1.clone();
        let mut child2 = parent2.clone();

        let size = parent1.len().min(parent2.len());
        if size < 2 {
            return (child1, child2);
        }

        let mut start = self.rng.gen_range(1..=size);
        let mut end = self.rng.gen_range(1..size);
        if end >= start {
            end += 1;
        } else {
            std::mem::swap(&mut start, &mut end);
        }

        let segment1 = &parent1.as_slice()[start..end];
        let segment2 = &parent2.as_slice()[start..end];
        if segment1 != segment2 {
            child1.make_mut()[start..end].copy_from_slice(segment2);
            child2.make_mut()[start..end].copy_from_slice(segment1);
        }

        (child1, child2)
    }

    /// Flip each gene independently with probability `indpb`.
    ///
    /// The number of flips is drawn from `Binomial(len, indpb)` and the
    /// flipped positions uniformly, which has the same distribution as
    /// per-gene coin tosses. Returns the number of flipped genes.
    pub fn flip_mutate(&mut self, genes: &mut Genes, indpb: f64) -> usize {
        let len = genes.len();
        let flips = match Binomial::new(len as u64, indpb.clamp(0.0, 1.0)) {
            Ok(dist) => (dist.sample(&mut self.rng) as usize).min(len),
            Err(_) => 0,
        };
        if flips == 0 {
            return 0;
        }

        let positions = index::sample(&mut self.rng, len, flips);
        let bits = genes.make_mut();
        for i in positions {
            bits[i] = !bits[i];
        }
        flips
    }

    /// Bernoulli trial with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }
}

/// Normalized Hamming distance between two gene vectors.
pub fn genome_distance(g1: &Genes, g2: &Genes) -> f64 {
    let len = g1.len().max(g2.len());
    if len == 0 {
        return 0.0;
    }
    let differing = g1
        .as_slice()
        .iter()
        .zip(g2.as_slice())
        .filter(|(a, b)| a != b)
        .count()
        + g1.len().abs_diff(g2.len());
    differing as f64 / len as f64
}

/// Mean normalized Hamming distance over all pairs of a population.
///
/// Computed from allele frequencies: a gene with `k` ones among `n` vectors
/// differs in `k * (n - k)` pairs. This is `O(n * len)` instead of pairwise.
pub fn population_diversity<'a, I>(genes: I) -> f64
where
    I: IntoIterator<Item = &'a Genes>,
{
    let mut ones: Vec<usize> = Vec::new();
    let mut n = 0usize;
    for g in genes {
        if ones.is_empty() {
            ones = vec![0; g.len()];
        }
        for (count, &bit) in ones.iter_mut().zip(g.as_slice()) {
            *count += bit as usize;
        }
        n += 1;
    }

    if n < 2 || ones.is_empty() {
        return 0.0;
    }

    let pairs = (n * (n - 1) / 2) as f64;
    let differing: f64 = ones.iter().map(|&k| (k * (n - k)) as f64).sum();
    differing / pairs / ones.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bernoulli_genes_deterministic() {
        let a = GenomeRng::new(42).bernoulli_genes(64, 0.5);
        let b = GenomeRng::new(42).bernoulli_genes(64, 0.5);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_sample_exact() {
        let mut rng = GenomeRng::new(42);
        let genes = rng.sample_exact(100, 17);
        assert_eq!(genes.len(), 100);
        assert_eq!(genes.installed_count(), 17);

        // More than available caps at length.
        assert_eq!(rng.sample_exact(5, 10).installed_count(), 5);
    }

    #[test]
    fn test_random_genes_exact_budget() {
        let mut rng = GenomeRng::new(1);
        let genes = rng.random_genes(50, &Initialization::ExactBudget, 7);
        assert_eq!(genes.installed_count(), 7);
    }

    #[test]
    fn test_crossover_preserves_length_and_alleles() {
        let mut rng = GenomeRng::new(42);
        let p1 = Genes::zeros(30);
        let p2 = Genes::from_vec(vec![true; 30]);

        for _ in 0..50 {
            let (c1, c2) = rng.two_point_crossover(&p1, &p2);
            assert_eq!(c1.len(), 30);
            assert_eq!(c2.len(), 30);
            // Each position holds one allele from each parent.
            for i in 0..30 {
                assert_ne!(c1.get(i), c2.get(i));
            }
            // The swapped segment is non-empty.
            assert!(c1.installed_count() > 0);
        }

        // Parents untouched.
        assert_eq!(p1.installed_count(), 0);
        assert_eq!(p2.installed_count(), 30);
    }

    #[test]
    fn test_children_do_not_alias_parents() {
        let mut rng = GenomeRng::new(3);
        let p1 = Genes::zeros(10);
        let p2 = Genes::from_vec(vec![true; 10]);
        let (mut c1, _) = rng.two_point_crossover(&p1, &p2);
        assert!(!c1.shares_storage(&p1));

        let mut clone = p1.clone();
        assert!(clone.shares_storage(&p1));
        clone.set(0, true);
        assert!(!clone.shares_storage(&p1));
        assert_eq!(p1.get(0), Some(false));

        c1.set(0, false);
        assert_eq!(c1.len(), 10);
    }

    #[test]
    fn test_flip_mutate() {
        let mut rng = GenomeRng::new(42);
        let mut genes = Genes::zeros(1000);
        let original = genes.clone();

        let flips = rng.flip_mutate(&mut genes, 0.05);
        assert_eq!(genes.len(), 1000);
        assert_eq!(genes.installed_count(), flips);
        assert!(flips > 10 && flips < 100, "unexpected flip count {}", flips);
        assert_eq!(original.installed_count(), 0);

        let mut untouched = Genes::zeros(10);
        assert_eq!(rng.flip_mutate(&mut untouched, 0.0), 0);
        assert_eq!(rng.flip_mutate(&mut untouched, 1.0), 10);
        assert_eq!(untouched.installed_count(), 10);
    }

    #[test]
    fn test_genome_distance() {
        let a = Genes::from_vec(vec![true, false, true, false]);
        let b = Genes::from_vec(vec![true, true, false, false]);
        assert!((genome_distance(&a, &a)).abs() < 1e-12);
        assert!((genome_distance(&a, &b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_population_diversity_matches_pairwise_mean() {
        let mut rng = GenomeRng::new(9);
        let population: Vec<Genes> = (0..12).map(|_| rng.bernoulli_genes(40, 0.3)).collect();

        let mut total = 0.0;
        let mut count = 0;
        for i in 0..population.len() {
            for j in (i + 1)..population.len() {
                total += genome_distance(&population[i], &population[j]);
                count += 1;
            }
        }
        let expected = total / count as f64;

        assert!((population_diversity(&population) - expected).abs() < 1e-12);
        assert_eq!(population_diversity(&population[..1]), 0.0);
    }
}
