//! Fitness evaluation for site selections.
//!
//! Turns a gene vector into a coverage score and, for multi-objective runs,
//! a tuple of weighted objectives.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::compute::CoverageEvaluator;
use crate::schema::{CandidateSet, Direction, FitnessKind, ObjectiveMetric};

use super::genome::Genes;

/// Fitness of one evaluated individual.
///
/// `objectives` holds `weight * raw`, negated for minimized objectives, so
/// larger is always better. A scalar fitness has a single objective equal to
/// the coverage.
#[derive(Debug, Clone, PartialEq)]
pub struct Fitness {
    /// Coverage score from the configured evaluator.
    pub coverage: f64,
    /// Number of installed sites.
    pub installations: usize,
    /// Installed sites times cost per site.
    pub cost: f64,
    /// Direction-adjusted objective values.
    pub objectives: Vec<f64>,
}

impl Fitness {
    /// Compare objective tuples in order; the first differing objective decides.
    pub fn cmp_lexicographic(&self, other: &Fitness) -> Ordering {
        for (a, b) in self.objectives.iter().zip(&other.objectives) {
            match a.total_cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.objectives.len().cmp(&other.objectives.len())
    }

    /// Pareto dominance: no objective worse and at least one strictly better.
    pub fn dominates(&self, other: &Fitness) -> bool {
        let mut strictly_better = false;
        for (a, b) in self.objectives.iter().zip(&other.objectives) {
            if a < b {
                return false;
            }
            if a > b {
                strictly_better = true;
            }
        }
        strictly_better
    }

    /// Zero (or non-finite) coverage.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.coverage > 0.0)
    }
}

/// Evaluates gene vectors against a candidate set.
///
/// Stateless between calls, so a single evaluator is shared by every worker.
pub struct FitnessEvaluator {
    candidates: CandidateSet,
    coverage: Arc<dyn CoverageEvaluator>,
    kind: FitnessKind,
    cost_per_point: f64,
}

impl FitnessEvaluator {
    pub fn new(
        candidates: CandidateSet,
        coverage: Arc<dyn CoverageEvaluator>,
        kind: FitnessKind,
        cost_per_point: f64,
    ) -> Self {
        Self {
            candidates,
            coverage,
            kind,
            cost_per_point,
        }
    }

    pub fn kind(&self) -> &FitnessKind {
        &self.kind
    }

    /// Name of the coverage strategy in use.
    pub fn coverage_name(&self) -> &'static str {
        self.coverage.name()
    }

    /// Swap the coverage strategy.
    pub fn set_coverage(&mut self, coverage: Arc<dyn CoverageEvaluator>) {
        self.coverage = coverage;
    }

    /// Score a gene vector.
    pub fn evaluate(&self, genes: &Genes) -> Fitness {
        let installed = self.candidates.installed_locations(genes.as_slice());
        let coverage = self.coverage.evaluate(&installed);
        let installations = installed.len();
        let cost = installations as f64 * self.cost_per_point;

        let objectives = match &self.kind {
            FitnessKind::Scalar => vec![coverage],
            FitnessKind::MultiObjective { objectives } => objectives
                .iter()
                .map(|o| {
                    let raw = match o.metric {
                        ObjectiveMetric::Coverage => coverage,
                        ObjectiveMetric::InstallationCount => installations as f64,
                        ObjectiveMetric::InstallationCost => cost,
                    };
                    let sign = match o.direction {
                        Direction::Maximize => 1.0,
                        Direction::Minimize => -1.0,
                    };
                    sign * o.weight * raw
                })
                .collect(),
        };

        Fitness {
            coverage,
            installations,
            cost,
            objectives,
        }
    }
}
