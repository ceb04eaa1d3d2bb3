//! Selection operators.
//!
//! Tournament selection on lexicographic fitness for scalar runs, and
//! non-dominated sorting with crowding distance for multi-objective runs.

use std::cmp::Ordering;

use rand::Rng;

use super::fitness::Fitness;

/// k-way tournament: the lexicographically best of `size` uniform draws
/// (with replacement). Returns an index into `fits`.
pub fn tournament<R: Rng + ?Sized>(fits: &[&Fitness], size: usize, rng: &mut R) -> usize {
    let mut best = rng.gen_range(0..fits.len());
    for _ in 1..size.max(1) {
        let idx = rng.gen_range(0..fits.len());
        if fits[idx].cmp_lexicographic(fits[best]) == Ordering::Greater {
            best = idx;
        }
    }
    best
}

/// Partition into non-dominated fronts; front 0 is the Pareto front.
pub fn non_dominated_sort(fits: &[&Fitness]) -> Vec<Vec<usize>> {
    let n = fits.len();
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0usize; n];

    for i in 0..n {
        for j in (i + 1)..n {
            if fits[i].dominates(fits[j]) {
                dominated_by[i].push(j);
                domination_count[j] += 1;
            } else if fits[j].dominates(fits[i]) {
                dominated_by[j].push(i);
                domination_count[i] += 1;
            }
        }
    }

    let mut fronts = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| domination_count[i] == 0).collect();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &i in &current {
            for &j in &dominated_by[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    next.push(j);
                }
            }
        }
        next.sort_unstable();
        fronts.push(current);
        current = next;
    }
    fronts
}

/// Crowding distance of each member of `front`, aligned with `front`.
///
/// Boundary members of every objective get infinity.
pub fn crowding_distance(fits: &[&Fitness], front: &[usize]) -> Vec<f64> {
    let len = front.len();
    let mut distance = vec![0.0f64; len];
    if len <= 2 {
        distance.fill(f64::INFINITY);
        return distance;
    }

    let objectives = front
        .iter()
        .map(|&i| fits[i].objectives.len())
        .min()
        .unwrap_or(0);

    let mut order: Vec<usize> = (0..len).collect();
    for m in 0..objectives {
        let value = |k: usize| fits[front[k]].objectives[m];
        order.sort_by(|&a, &b| value(a).total_cmp(&value(b)));

        let lo = value(order[0]);
        let hi = value(order[len - 1]);
        distance[order[0]] = f64::INFINITY;
        distance[order[len - 1]] = f64::INFINITY;
        if hi - lo <= 0.0 {
            continue;
        }
        for w in 1..len - 1 {
            distance[order[w]] += (value(order[w + 1]) - value(order[w - 1])) / (hi - lo);
        }
    }
    distance
}

/// Front rank and crowding distance of every individual.
#[derive(Debug, Clone)]
pub struct ParetoRanking {
    pub rank: Vec<usize>,
    pub crowding: Vec<f64>,
    pub fronts: Vec<Vec<usize>>,
}

impl ParetoRanking {
    pub fn new(fits: &[&Fitness]) -> Self {
        let fronts = non_dominated_sort(fits);
        let mut rank = vec![0usize; fits.len()];
        let mut crowding = vec![0.0f64; fits.len()];
        for (r, front) in fronts.iter().enumerate() {
            let distances = crowding_distance(fits, front);
            for (&i, d) in front.iter().zip(distances) {
                rank[i] = r;
                crowding[i] = d;
            }
        }
        Self {
            rank,
            crowding,
            fronts,
        }
    }

    /// Crowded comparison: lower rank wins, then larger crowding distance.
    pub fn compare(&self, a: usize, b: usize) -> Ordering {
        self.rank[b]
            .cmp(&self.rank[a])
            .then_with(|| self.crowding[a].total_cmp(&self.crowding[b]))
    }

    /// All indices, best first by crowded comparison. Stable for ties.
    pub fn order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.rank.len()).collect();
        order.sort_by(|&a, &b| self.compare(b, a));
        order
    }

    /// Binary tournament under crowded comparison.
    pub fn tournament<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let n = self.rank.len();
        let a = rng.gen_range(0..n);
        let b = rng.gen_range(0..n);
        if self.compare(b, a) == Ordering::Greater {
            b
        } else {
            a
        }
    }
}

/// NSGA-II truncation: the best `k` by front, the last partial front cut by
/// descending crowding distance.
pub fn select_nsga2(fits: &[&Fitness], k: usize) -> Vec<usize> {
    let mut order = ParetoRanking::new(fits).order();
    order.truncate(k);
    order
}
