//! Generational genetic algorithm over site selections.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::compute::{ConstraintEngine, CoverageEvaluator, build_evaluator};
use crate::schema::{
    CandidateSet, EvolutionConfig, EvolutionConfigError, EvolutionHistory, EvolutionPhase,
    EvolutionProgress, EvolutionResult, EvolutionStats, SelectionMethod, SolutionSnapshot,
    StopReason,
};

use super::archive::SolutionArchive;
use super::fitness::{Fitness, FitnessEvaluator};
use super::genome::{Genes, GenomeRng, population_diversity};
use super::ranking::{is_better, pareto_front, rank_population, top_feasible};
use super::selection::{ParetoRanking, tournament};

/// An individual in the population.
#[derive(Debug, Clone)]
pub struct Individual {
    /// Unique identifier.
    pub id: u64,
    /// One bit per candidate.
    pub genes: Genes,
    /// Fitness for the current genes; `None` until evaluated.
    pub fitness: Option<Fitness>,
    /// Generation created.
    pub generation: usize,
    /// Parent IDs.
    pub parents: Vec<u64>,
}

impl Individual {
    pub fn new(id: u64, genes: Genes, generation: usize, parents: Vec<u64>) -> Self {
        Self {
            id,
            genes,
            fitness: None,
            generation,
            parents,
        }
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// Coverage of the last evaluation, zero if unevaluated.
    pub fn coverage(&self) -> f64 {
        self.fitness.as_ref().map_or(0.0, |f| f.coverage)
    }

    /// Replace the genes, invalidating the fitness if they differ.
    pub fn set_genes(&mut self, genes: Genes) {
        if self.genes != genes {
            self.genes = genes;
            self.fitness = None;
        }
    }

    /// Convert to snapshot for serialization.
    pub fn to_snapshot(&self, candidates: &CandidateSet, cost_per_point: f64) -> SolutionSnapshot {
        let installed_indices = self.genes.installed_indices();
        let (coverage, objectives) = match &self.fitness {
            Some(f) => (f.coverage, f.objectives.clone()),
            None => (0.0, Vec::new()),
        };
        SolutionSnapshot {
            id: self.id,
            coverage,
            objectives,
            installations: installed_indices.len(),
            cost: installed_indices.len() as f64 * cost_per_point,
            installed: candidates.installed_locations(self.genes.as_slice()),
            installed_indices,
            generation: self.generation,
            parents: self.parents.clone(),
        }
    }
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    rng: GenomeRng,
    candidates: CandidateSet,
    constraints: ConstraintEngine,
    evaluator: FitnessEvaluator,
    pool: Option<rayon::ThreadPool>,
    population: Vec<Individual>,
    archive: SolutionArchive,
    best: Option<Individual>,
    history: EvolutionHistory,
    stalled_generations: Vec<usize>,
    generation: usize,
    best_coverage: f64,
    stagnation_count: usize,
    evaluations: u64,
    phase: EvolutionPhase,
    started: Option<Instant>,
    next_id: Arc<AtomicU64>,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Create a new evolution engine.
    ///
    /// Every configuration error surfaces here, before any generation runs.
    pub fn new(
        config: EvolutionConfig,
        candidates: CandidateSet,
    ) -> Result<Self, EvolutionConfigError> {
        config.validate()?;
        if candidates.is_empty() {
            return Err(EvolutionConfigError::NoCandidates);
        }

        let coverage = build_evaluator(&config.coverage, &candidates)?;
        let constraints = ConstraintEngine::new(&config.constraints, candidates.clone())?;
        let evaluator = FitnessEvaluator::new(
            candidates.clone(),
            coverage,
            config.fitness.clone(),
            config.constraints.installation_cost_per_point,
        );

        let pool = match config.evaluation.parallel_workers {
            0 => None,
            workers => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|e| EvolutionConfigError::WorkerPool(e.to_string()))?,
            ),
        };

        let seed = config.random_seed.unwrap_or_else(rand::random);
        log::info!(
            "Evolution engine: {} candidates, {} objective, population {}, seed {}",
            candidates.size(),
            evaluator.coverage_name(),
            config.population.size,
            seed
        );

        let archive = SolutionArchive::new(
            config.archive.max_size,
            config.archive.diversity_threshold,
        );

        Ok(Self {
            config,
            rng: GenomeRng::new(seed),
            candidates,
            constraints,
            evaluator,
            pool,
            population: Vec::new(),
            archive,
            best: None,
            history: EvolutionHistory::default(),
            stalled_generations: Vec::new(),
            generation: 0,
            best_coverage: f64::NEG_INFINITY,
            stagnation_count: 0,
            evaluations: 0,
            phase: EvolutionPhase::Initialized,
            started: None,
            next_id: Arc::new(AtomicU64::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replace the coverage strategy built from the config.
    pub fn with_evaluator(mut self, coverage: Arc<dyn CoverageEvaluator>) -> Self {
        self.evaluator.set_coverage(coverage);
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    pub fn constraints(&self) -> &ConstraintEngine {
        &self.constraints
    }

    pub fn phase(&self) -> EvolutionPhase {
        self.phase
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Initialize the population.
    pub fn initialize(&mut self) {
        self.population.clear();
        self.archive.clear();
        self.best = None;
        self.history = EvolutionHistory::default();
        self.stalled_generations.clear();
        self.generation = 0;
        self.best_coverage = f64::NEG_INFINITY;
        self.stagnation_count = 0;
        self.evaluations = 0;

        let repair = self.config.algorithm.repair_initial;
        for _ in 0..self.config.population.size {
            let individual = self.fresh_individual(0, repair);
            self.population.push(individual);
        }
        self.phase = EvolutionPhase::Initialized;
    }

    /// Random individual, optionally repaired. Fitness is left invalid.
    fn fresh_individual(&mut self, generation: usize, repair: bool) -> Individual {
        let mut genes = self.rng.random_genes(
            self.candidates.size(),
            &self.config.algorithm.initialization,
            self.config.constraints.max_installations(),
        );
        if repair {
            self.repair_genes(&mut genes);
        }
        Individual::new(self.next_id(), genes, generation, Vec::new())
    }

    /// Repair in place and return the number of genes switched off. A stalled
    /// repair falls back to the empty selection, which is always feasible.
    fn repair_genes(&mut self, genes: &mut Genes) -> usize {
        if self.constraints.is_feasible(genes.as_slice()) {
            return 0;
        }
        let before = genes.installed_count();
        match self.constraints.repair(genes.make_mut(), self.rng.rng_mut()) {
            Ok(report) => report.removed,
            Err(err) => {
                log::warn!("{}; falling back to an empty selection", err);
                *genes = Genes::zeros(genes.len());
                before
            }
        }
    }

    /// Evaluate every individual whose fitness is invalid. Returns the number
    /// of evaluations performed.
    fn evaluate_pending(
        evaluator: &FitnessEvaluator,
        pool: Option<&rayon::ThreadPool>,
        individuals: &mut [Individual],
    ) -> u64 {
        let work = |individuals: &mut [Individual]| {
            individuals
                .par_iter_mut()
                .filter(|ind| ind.fitness.is_none())
                .map(|ind| {
                    ind.fitness = Some(evaluator.evaluate(&ind.genes));
                    1u64
                })
                .sum::<u64>()
        };
        match pool {
            Some(pool) => pool.install(|| work(individuals)),
            None => work(individuals),
        }
    }

    /// Evaluate all candidates in the population.
    fn evaluate_population(&mut self) {
        self.evaluations +=
            Self::evaluate_pending(&self.evaluator, self.pool.as_ref(), &mut self.population);
        self.phase = EvolutionPhase::Evaluated;
    }

    /// Draw `count` parent indices with the configured selection method.
    fn select_parents(&mut self, count: usize) -> Vec<usize> {
        let (indices, fits): (Vec<usize>, Vec<&Fitness>) = self
            .population
            .iter()
            .enumerate()
            .filter_map(|(i, ind)| ind.fitness.as_ref().map(|f| (i, f)))
            .unzip();
        if fits.is_empty() {
            return (0..count).map(|i| i % self.population.len().max(1)).collect();
        }

        let rng = self.rng.rng_mut();
        match &self.config.algorithm.selection {
            SelectionMethod::Tournament { size } => (0..count)
                .map(|_| indices[tournament(&fits, *size, rng)])
                .collect(),
            SelectionMethod::Nsga2 => {
                let ranking = ParetoRanking::new(&fits);
                (0..count)
                    .map(|_| indices[ranking.tournament(rng)])
                    .collect()
            }
        }
    }

    /// Fresh repaired individual for a degenerate offspring, retried up to
    /// the configured number of attempts.
    fn replacement_individual(&mut self, generation: usize) -> Individual {
        let attempts = self.config.algorithm.max_replacement_attempts.max(1);
        let mut fresh = self.fresh_individual(generation, true);
        fresh.fitness = Some(self.evaluator.evaluate(&fresh.genes));
        self.evaluations += 1;

        for _ in 1..attempts {
            if fresh.fitness.as_ref().is_some_and(|f| !f.is_degenerate()) {
                break;
            }
            fresh = self.fresh_individual(generation, true);
            fresh.fitness = Some(self.evaluator.evaluate(&fresh.genes));
            self.evaluations += 1;
        }
        fresh
    }

    /// Run a single generation step: elitism, selection, crossover,
    /// mutation, repair, evaluation, and degenerate replacement.
    pub fn step(&mut self) {
        if self.population.is_empty() {
            self.initialize();
        }
        if self.population.iter().any(|ind| !ind.is_evaluated()) {
            self.evaluate_population();
        }

        let next_generation = self.generation + 1;
        let size = self.config.population.size;
        let ga = self.config.algorithm.clone();

        // Elitism: keep best feasible individuals. Elites skip repair, so an
        // unrepaired initial population must not seed them.
        let order = rank_population(&self.population, self.evaluator.kind());
        let mut next: Vec<Individual> = order
            .iter()
            .filter(|&&i| self.constraints.is_feasible(self.population[i].genes.as_slice()))
            .take(ga.elitism)
            .map(|&i| self.population[i].clone())
            .collect();

        let selected = self.select_parents(size - next.len());
        let mut offspring: Vec<Individual> = selected
            .iter()
            .map(|&i| {
                let parent = &self.population[i];
                Individual {
                    id: self.next_id(),
                    genes: parent.genes.clone(),
                    fitness: parent.fitness.clone(),
                    generation: next_generation,
                    parents: vec![parent.id],
                }
            })
            .collect();
        self.phase = EvolutionPhase::Selected;

        for pair in offspring.chunks_exact_mut(2) {
            if !self.rng.chance(ga.crossover_rate) {
                continue;
            }
            let (child1, child2) = self
                .rng
                .two_point_crossover(&pair[0].genes, &pair[1].genes);
            let (p1, p2) = (pair[0].parents[0], pair[1].parents[0]);
            pair[0].set_genes(child1);
            pair[1].set_genes(child2);
            pair[0].parents = vec![p1, p2];
            pair[1].parents = vec![p2, p1];
        }

        for child in offspring.iter_mut() {
            if self.rng.chance(ga.mutation_rate)
                && self.rng.flip_mutate(&mut child.genes, ga.gene_flip_rate) > 0
            {
                child.fitness = None;
            }
        }
        self.phase = EvolutionPhase::Varied;

        for child in offspring.iter_mut() {
            if self.repair_genes(&mut child.genes) > 0 {
                child.fitness = None;
            }
        }
        self.phase = EvolutionPhase::Repaired;

        self.evaluations +=
            Self::evaluate_pending(&self.evaluator, self.pool.as_ref(), &mut offspring);

        let mut replacements = 0;
        for child in offspring.iter_mut() {
            if child.fitness.as_ref().is_some_and(|f| !f.is_degenerate()) {
                continue;
            }
            *child = self.replacement_individual(next_generation);
            replacements += 1;
        }
        if replacements > 0 {
            log::debug!(
                "Generation {}: replaced {} degenerate offspring",
                next_generation,
                replacements
            );
        }

        next.extend(offspring);
        self.population = next;
        self.generation = next_generation;
        self.phase = EvolutionPhase::Evaluated;

        self.record_generation(replacements);
    }

    /// Update history, best-so-far, archive, and stall tracking for the
    /// current (evaluated) population.
    fn record_generation(&mut self, replacements: usize) {
        let n = self.population.len().max(1) as f64;
        let coverages: Vec<f64> = self.population.iter().map(Individual::coverage).collect();
        let avg = coverages.iter().sum::<f64>() / n;
        let variance = coverages.iter().map(|c| (c - avg).powi(2)).sum::<f64>() / n;
        let avg_installations = self
            .population
            .iter()
            .map(|ind| ind.genes.installed_count() as f64)
            .sum::<f64>()
            / n;
        let diversity = population_diversity(self.population.iter().map(|ind| &ind.genes));

        // Best feasible individual this generation.
        let mut generation_best: Option<&Individual> = None;
        for ind in &self.population {
            let Some(fitness) = ind.fitness.as_ref() else {
                continue;
            };
            if fitness.is_degenerate() || !self.constraints.is_feasible(ind.genes.as_slice()) {
                continue;
            }
            let replace = match generation_best.and_then(|b| b.fitness.as_ref()) {
                Some(current) => is_better(fitness, current),
                None => true,
            };
            if replace {
                generation_best = Some(ind);
            }
        }
        let gen_best = generation_best.map_or(0.0, Individual::coverage);

        if let Some(candidate) = generation_best {
            let improves = match self.best.as_ref().and_then(|b| b.fitness.as_ref()) {
                Some(best) => candidate.fitness.as_ref().is_some_and(|f| is_better(f, best)),
                None => true,
            };
            if improves {
                self.best = Some(candidate.clone());
            }
        }

        if gen_best > self.best_coverage {
            self.best_coverage = gen_best;
            self.stagnation_count = 0;
        } else {
            self.stagnation_count += 1;
        }

        self.history.best_coverage.push(gen_best);
        self.history.avg_coverage.push(avg);
        self.history.coverage_std.push(variance.sqrt());
        self.history.diversity.push(diversity);
        self.history.avg_installations.push(avg_installations);
        self.history.replacements.push(replacements);

        let constraints = &self.constraints;
        self.archive.update(
            self.population
                .iter()
                .filter(|ind| constraints.is_feasible(ind.genes.as_slice())),
        );

        if coverages.iter().all(|&c| !(c > 0.0)) {
            log::warn!(
                "Generation {}: every individual has zero coverage, search is stalled",
                self.generation
            );
            self.stalled_generations.push(self.generation);
        }

        log::info!(
            "Generation {}: best {:.3}, avg {:.3}, generation best {:.3}, diversity {:.3}, stagnation {}",
            self.generation,
            self.best_coverage.max(0.0),
            avg,
            gen_best,
            diversity,
            self.stagnation_count
        );
    }

    /// Get current progress.
    pub fn progress(&self) -> EvolutionProgress {
        let cost = self.constraints.cost_per_point();
        let top_solutions = rank_population(&self.population, self.evaluator.kind())
            .into_iter()
            .take(self.config.results.top_k)
            .map(|i| self.population[i].to_snapshot(&self.candidates, cost))
            .collect();

        EvolutionProgress {
            generation: self.generation,
            total_generations: self.config.population.max_generations,
            best_coverage: self.best_coverage.max(0.0),
            avg_coverage: self.history.avg_coverage.last().copied().unwrap_or(0.0),
            generation_best: self.history.best_coverage.last().copied().unwrap_or(0.0),
            stagnation_count: self.stagnation_count,
            stalled: self.stalled_generations.last() == Some(&self.generation),
            best_solution: self
                .best
                .as_ref()
                .map(|b| b.to_snapshot(&self.candidates, cost)),
            top_solutions,
            history: self.history.clone(),
            phase: self.phase,
        }
    }

    /// Check if evolution should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if self.generation >= self.config.population.max_generations {
            return Some(StopReason::MaxGenerations);
        }

        if let Some(target) = self.config.population.target_coverage
            && self.best_coverage >= target
        {
            return Some(StopReason::TargetReached);
        }

        if let Some(limit) = self.config.population.stagnation_limit
            && self.stagnation_count >= limit
        {
            return Some(StopReason::Stagnation);
        }

        if let Some(limit) = self.config.population.time_limit_secs
            && let Some(started) = self.started
            && started.elapsed().as_secs_f64() >= limit
        {
            return Some(StopReason::TimeLimit);
        }

        None
    }

    /// Run evolution with progress callback.
    pub fn run_with_callback<F>(&mut self, callback: F) -> EvolutionResult
    where
        F: Fn(&EvolutionProgress),
    {
        let start_time = Instant::now();
        self.started = Some(start_time);

        self.initialize();
        self.evaluate_population();
        self.record_generation(0);
        callback(&self.progress());

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }
            self.step();
            callback(&self.progress());
        };

        self.phase = EvolutionPhase::Terminated;
        log::info!(
            "Search finished after {} generations ({:?}), best coverage {:.3}",
            self.generation,
            stop_reason,
            self.best_coverage.max(0.0)
        );

        self.build_result(stop_reason, start_time.elapsed())
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> EvolutionResult {
        self.run_with_callback(|_| {})
    }

    fn build_result(&self, stop_reason: StopReason, elapsed: Duration) -> EvolutionResult {
        let cost = self.constraints.cost_per_point();
        let kind = self.evaluator.kind();
        let snapshot = |ind: &Individual| ind.to_snapshot(&self.candidates, cost);

        let ranked: Vec<SolutionSnapshot> =
            top_feasible(&self.population, kind, &self.constraints, self.config.results.top_k)
                .into_iter()
                .map(snapshot)
                .collect();

        let best = match &self.best {
            Some(best) => snapshot(best),
            None => rank_population(&self.population, kind)
                .first()
                .map(|&i| snapshot(&self.population[i]))
                .unwrap_or_else(|| {
                    snapshot(&Individual::new(
                        0,
                        Genes::zeros(self.candidates.size()),
                        self.generation,
                        Vec::new(),
                    ))
                }),
        };

        let pareto_front = pareto_front(&self.population, &self.constraints)
            .into_iter()
            .map(snapshot)
            .collect();
        let archive = self.archive.entries().iter().map(snapshot).collect();

        let elapsed = elapsed.as_secs_f64();
        EvolutionResult {
            best,
            ranked,
            pareto_front,
            archive,
            stats: EvolutionStats {
                generations: self.generation,
                total_evaluations: self.evaluations,
                best_coverage: self.best_coverage.max(0.0),
                final_avg_coverage: self.history.avg_coverage.last().copied().unwrap_or(0.0),
                elapsed_seconds: elapsed,
                evaluations_per_second: if elapsed > 0.0 {
                    self.evaluations as f64 / elapsed
                } else {
                    0.0
                },
                stop_reason,
            },
            stalled_generations: self.stalled_generations.clone(),
            history: self.history.clone(),
        }
    }
}
