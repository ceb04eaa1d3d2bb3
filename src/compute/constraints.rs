//! Budget and spacing constraints, and the repair that restores them.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::schema::{CandidateSet, ConfigError, ConstraintConfig};

use super::geometry::haversine_km;

/// Feasibility checks for a gene vector over a fixed candidate set.
///
/// Removing an installed site never increases the violation of either
/// constraint, which is what makes [`ConstraintEngine::repair`] terminate.
#[derive(Debug, Clone)]
pub struct ConstraintEngine {
    candidates: CandidateSet,
    budget: f64,
    cost_per_point: f64,
    max_installations: usize,
    min_distance_km: Option<f64>,
    max_iterations: usize,
}

/// Outcome of a successful repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepairReport {
    /// Genes switched off.
    pub removed: usize,
}

/// Repair failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepairError {
    #[error("Repair stalled after {iterations} iterations with {installed} sites still installed")]
    Stalled { iterations: usize, installed: usize },
    #[error("Gene vector length {actual} does not match candidate count {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl ConstraintEngine {
    /// Create an engine, rejecting configurations that can never produce a
    /// non-empty feasible individual.
    pub fn new(config: &ConstraintConfig, candidates: CandidateSet) -> Result<Self, ConfigError> {
        config.validate()?;
        let max_iterations = config
            .max_repair_iterations
            .unwrap_or_else(|| candidates.size().max(1));
        Ok(Self {
            candidates,
            budget: config.budget,
            cost_per_point: config.installation_cost_per_point,
            max_installations: config.max_installations(),
            min_distance_km: config.min_distance_km,
            max_iterations,
        })
    }

    pub fn candidates(&self) -> &CandidateSet {
        &self.candidates
    }

    pub fn cost_per_point(&self) -> f64 {
        self.cost_per_point
    }

    /// Total cost of installing `count` sites.
    #[inline]
    pub fn cost_of(&self, count: usize) -> f64 {
        count as f64 * self.cost_per_point
    }

    /// `installed * cost <= budget`.
    pub fn is_within_budget(&self, genes: &[bool]) -> bool {
        let count = genes.iter().filter(|&&g| g).count();
        self.cost_of(count) <= self.budget
    }

    /// Every pair of installed sites is at least `min_distance_km` apart.
    /// Always true when the distance constraint is disabled.
    pub fn is_within_min_distance(&self, genes: &[bool]) -> bool {
        let Some(min_km) = self.min_distance_km else {
            return true;
        };
        let sites = self.candidates.installed_locations(genes);
        sites.iter().enumerate().all(|(i, a)| {
            sites[i + 1..]
                .iter()
                .all(|b| haversine_km(a.coordinates(), b.coordinates()) >= min_km)
        })
    }

    pub fn is_feasible(&self, genes: &[bool]) -> bool {
        self.is_within_budget(genes) && self.is_within_min_distance(genes)
    }

    /// Switch off uniformly chosen installed genes until every constraint
    /// holds.
    ///
    /// Each iteration removes one site, so the loop ends within the number of
    /// installed sites; the configured ceiling turns anything longer into a
    /// reported stall.
    pub fn repair<R: Rng + ?Sized>(
        &self,
        genes: &mut [bool],
        rng: &mut R,
    ) -> Result<RepairReport, RepairError> {
        if genes.len() != self.candidates.size() {
            return Err(RepairError::LengthMismatch {
                expected: self.candidates.size(),
                actual: genes.len(),
            });
        }

        let mut installed: Vec<usize> = genes
            .iter()
            .enumerate()
            .filter_map(|(i, &g)| g.then_some(i))
            .collect();
        let mut report = RepairReport::default();

        // Budget violations resolve by count alone, so drop a random excess
        // in one pass instead of rechecking after every removal.
        if installed.len() > self.max_installations {
            let excess = installed.len() - self.max_installations;
            installed.shuffle(rng);
            for idx in installed.drain(..excess) {
                genes[idx] = false;
                report.removed += 1;
            }
        }
        while !self.is_within_budget(genes)
            && let Some(idx) = installed.pop()
        {
            genes[idx] = false;
            report.removed += 1;
        }

        while !self.is_within_min_distance(genes) {
            if installed.is_empty() || report.removed >= self.max_iterations {
                log::warn!(
                    "Repair stalled after {} removals ({} sites installed)",
                    report.removed,
                    installed.len()
                );
                return Err(RepairError::Stalled {
                    iterations: report.removed,
                    installed: installed.len(),
                });
            }
            let pick = rng.gen_range(0..installed.len());
            let idx = installed.swap_remove(pick);
            genes[idx] = false;
            report.removed += 1;
        }

        Ok(report)
    }
}
