//! Ranking and result extraction over a population.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::compute::ConstraintEngine;
use crate::schema::FitnessKind;

use super::fitness::Fitness;
use super::genome::Genes;
use super::search::Individual;
use super::selection::{non_dominated_sort, select_nsga2};

/// Indices of evaluated individuals, best first.
///
/// Scalar fitness sorts lexicographically. Multi-objective fitness sorts by
/// front, then by descending crowding distance. Ties keep population order.
pub fn rank_population(population: &[Individual], kind: &FitnessKind) -> Vec<usize> {
    let evaluated: Vec<(usize, &Fitness)> = population
        .iter()
        .enumerate()
        .filter_map(|(i, ind)| ind.fitness.as_ref().map(|f| (i, f)))
        .collect();

    match kind {
        FitnessKind::Scalar => {
            let mut order = evaluated;
            order.sort_by(|a, b| b.1.cmp_lexicographic(a.1));
            order.into_iter().map(|(i, _)| i).collect()
        }
        FitnessKind::MultiObjective { .. } => {
            let fits: Vec<&Fitness> = evaluated.iter().map(|(_, f)| *f).collect();
            select_nsga2(&fits, fits.len())
                .into_iter()
                .map(|k| evaluated[k].0)
                .collect()
        }
    }
}

/// Evaluated, feasible, with positive coverage.
fn is_reportable(individual: &Individual, constraints: &ConstraintEngine) -> bool {
    individual
        .fitness
        .as_ref()
        .is_some_and(|f| !f.is_degenerate())
        && constraints.is_feasible(individual.genes.as_slice())
}

/// The best `k` distinct feasible individuals in rank order.
pub fn top_feasible<'a>(
    population: &'a [Individual],
    kind: &FitnessKind,
    constraints: &ConstraintEngine,
    k: usize,
) -> Vec<&'a Individual> {
    let mut seen: HashSet<&Genes> = HashSet::new();
    rank_population(population, kind)
        .into_iter()
        .map(|i| &population[i])
        .filter(|ind| is_reportable(ind, constraints))
        .filter(|&ind| seen.insert(&ind.genes))
        .take(k)
        .collect()
}

/// Distinct feasible individuals on the first non-dominated front, by
/// descending coverage.
pub fn pareto_front<'a>(
    population: &'a [Individual],
    constraints: &ConstraintEngine,
) -> Vec<&'a Individual> {
    let mut seen: HashSet<&Genes> = HashSet::new();
    let pool: Vec<&Individual> = population
        .iter()
        .filter(|ind| is_reportable(ind, constraints))
        .filter(|&ind| seen.insert(&ind.genes))
        .collect();

    let fits: Vec<&Fitness> = pool.iter().filter_map(|ind| ind.fitness.as_ref()).collect();
    let Some(first) = non_dominated_sort(&fits).into_iter().next() else {
        return Vec::new();
    };

    let mut front: Vec<&Individual> = first.into_iter().map(|i| pool[i]).collect();
    front.sort_by(|a, b| {
        b.coverage()
            .total_cmp(&a.coverage())
            .then_with(|| a.id.cmp(&b.id))
    });
    front
}

/// Whether `a` should replace `b` as best-so-far: higher coverage, then the
/// lexicographically better objective tuple.
pub fn is_better(a: &Fitness, b: &Fitness) -> bool {
    match a.coverage.total_cmp(&b.coverage) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => a.cmp_lexicographic(b) == Ordering::Greater,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CandidateSet, ConstraintConfig};

    fn individual(id: u64, bits: &[bool], objectives: &[f64]) -> Individual {
        Individual {
            id,
            genes: Genes::from_vec(bits.to_vec()),
            fitness: Some(Fitness {
                coverage: objectives[0],
                installations: bits.iter().filter(|&&b| b).count(),
                cost: 0.0,
                objectives: objectives.to_vec(),
            }),
            generation: 0,
            parents: Vec::new(),
        }
    }

    fn constraints(n: usize, budget: f64) -> ConstraintEngine {
        let set = CandidateSet::from_coordinates((0..n).map(|i| (35.0 + i as f64, 128.0)));
        ConstraintEngine::new(
            &ConstraintConfig {
                budget,
                installation_cost_per_point: 1.0,
                ..Default::default()
            },
            set,
        )
        .unwrap()
    }

    #[test]
    fn test_rank_scalar() {
        let population = vec![
            individual(0, &[true, false, false], &[1.0]),
            individual(1, &[false, true, false], &[3.0]),
            individual(2, &[false, false, true], &[2.0]),
        ];
        assert_eq!(rank_population(&population, &FitnessKind::Scalar), vec![1, 2, 0]);
    }

    #[test]
    fn test_rank_skips_unevaluated() {
        let mut population = vec![
            individual(0, &[true, false], &[1.0]),
            individual(1, &[false, true], &[3.0]),
        ];
        population[1].fitness = None;
        assert_eq!(rank_population(&population, &FitnessKind::Scalar), vec![0]);
    }

    #[test]
    fn test_top_feasible_filters_and_dedupes() {
        let engine = constraints(3, 1.0);
        let population = vec![
            individual(0, &[true, true, false], &[9.0]), // over budget
            individual(1, &[false, true, false], &[3.0]),
            individual(2, &[false, true, false], &[3.0]), // duplicate genes
            individual(3, &[false, false, false], &[0.0]), // degenerate
            individual(4, &[true, false, false], &[2.0]),
        ];
        let top = top_feasible(&population, &FitnessKind::Scalar, &engine, 5);
        let ids: Vec<u64> = top.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_pareto_front() {
        let engine = constraints(3, 3.0);
        let population = vec![
            individual(0, &[true, false, false], &[5.0, -1.0]),
            individual(1, &[true, true, false], &[8.0, -2.0]),
            individual(2, &[false, true, false], &[4.0, -1.0]), // dominated by 0
            individual(3, &[true, true, true], &[8.0, -3.0]),   // dominated by 1
        ];
        let front = pareto_front(&population, &engine);
        let ids: Vec<u64> = front.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 0]);
    }

    #[test]
    fn test_is_better() {
        let a = individual(0, &[true], &[5.0, -1.0]);
        let b = individual(1, &[true], &[5.0, -2.0]);
        let c = individual(2, &[true], &[6.0, -9.0]);
        let (fa, fb, fc) = (
            a.fitness.as_ref().unwrap(),
            b.fitness.as_ref().unwrap(),
            c.fitness.as_ref().unwrap(),
        );
        assert!(is_better(fa, fb));
        assert!(is_better(fc, fa));
        assert!(!is_better(fa, fa));
    }
}
