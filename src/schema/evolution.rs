//! Evolution configuration types for site-selection search.
//!
//! This module provides types for configuring the genetic algorithm that
//! searches for high-coverage, budget-feasible site sets, plus the progress
//! and result types reported by the engine.

use serde::{Deserialize, Serialize};

use super::{Candidate, ConstraintConfig, CoverageConfig};

/// Top-level configuration for an optimization run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionConfig {
    /// Coverage radius and scoring strategy.
    #[serde(default)]
    pub coverage: CoverageConfig,
    /// Budget and spacing constraints.
    #[serde(default)]
    pub constraints: ConstraintConfig,
    /// Shape of the fitness (scalar or weighted objectives).
    #[serde(default)]
    pub fitness: FitnessKind,
    /// Genetic algorithm operators.
    #[serde(default)]
    pub algorithm: GeneticAlgorithmConfig,
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Evaluation settings.
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    /// Hall-of-fame archive settings.
    #[serde(default)]
    pub archive: ArchiveConfig,
    /// Result extraction settings.
    #[serde(default)]
    pub results: ResultsConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl EvolutionConfig {
    /// Load from a JSON file.
    pub fn from_json_file<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, EvolutionConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

// ============================================================================
// Fitness shape
// ============================================================================

/// Fitness shape descriptor, supplied to the engine at construction.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum FitnessKind {
    /// Single objective: the coverage score.
    #[default]
    Scalar,
    /// Tuple of weighted objectives.
    MultiObjective { objectives: Vec<WeightedObjective> },
}

impl FitnessKind {
    /// Coverage maximized, installation count minimized.
    pub fn coverage_vs_installations() -> Self {
        Self::MultiObjective {
            objectives: vec![
                WeightedObjective {
                    metric: ObjectiveMetric::Coverage,
                    direction: Direction::Maximize,
                    weight: 1.0,
                },
                WeightedObjective {
                    metric: ObjectiveMetric::InstallationCount,
                    direction: Direction::Minimize,
                    weight: 1.0,
                },
            ],
        }
    }

    /// Number of objectives in a fitness tuple.
    pub fn objective_count(&self) -> usize {
        match self {
            FitnessKind::Scalar => 1,
            FitnessKind::MultiObjective { objectives } => objectives.len(),
        }
    }
}

/// An objective with its direction and weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedObjective {
    pub metric: ObjectiveMetric,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default = "default_objective_weight")]
    pub weight: f64,
}

fn default_objective_weight() -> f64 {
    1.0
}

/// Raw quantity an objective is computed from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ObjectiveMetric {
    /// Coverage score from the configured evaluator.
    Coverage,
    /// Number of installed sites.
    InstallationCount,
    /// Installed sites times cost per site.
    InstallationCost,
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Maximize,
    Minimize,
}

// ============================================================================
// Operators
// ============================================================================

/// Genetic algorithm configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticAlgorithmConfig {
    /// Selection method.
    #[serde(default)]
    pub selection: SelectionMethod,
    /// Probability that a pair of offspring is recombined.
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Probability that an individual is mutated.
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// Per-gene flip probability inside a mutation.
    #[serde(default = "default_gene_flip_rate")]
    pub gene_flip_rate: f64,
    /// Elitism: number of best individuals carried over unchanged.
    #[serde(default = "default_elitism")]
    pub elitism: usize,
    /// How fresh individuals are generated.
    #[serde(default)]
    pub initialization: Initialization,
    /// Repair fresh individuals before accepting them.
    #[serde(default = "default_repair_initial")]
    pub repair_initial: bool,
    /// Fresh individuals tried when replacing a degenerate offspring.
    #[serde(default = "default_replacement_attempts")]
    pub max_replacement_attempts: usize,
}

impl Default for GeneticAlgorithmConfig {
    fn default() -> Self {
        Self {
            selection: SelectionMethod::default(),
            crossover_rate: default_crossover_rate(),
            mutation_rate: default_mutation_rate(),
            gene_flip_rate: default_gene_flip_rate(),
            elitism: default_elitism(),
            initialization: Initialization::default(),
            repair_initial: default_repair_initial(),
            max_replacement_attempts: default_replacement_attempts(),
        }
    }
}

fn default_crossover_rate() -> f64 {
    0.8
}
fn default_mutation_rate() -> f64 {
    0.2
}
fn default_gene_flip_rate() -> f64 {
    0.05
}
fn default_elitism() -> usize {
    5
}
fn default_repair_initial() -> bool {
    true
}
fn default_replacement_attempts() -> usize {
    10
}

/// Selection method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum SelectionMethod {
    /// k-way tournament on lexicographic fitness.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
    /// Non-dominated sorting with crowding-distance truncation.
    Nsga2,
}

impl Default for SelectionMethod {
    fn default() -> Self {
        Self::Tournament {
            size: default_tournament_size(),
        }
    }
}

fn default_tournament_size() -> usize {
    3
}

/// Fresh individual generation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum Initialization {
    /// Each gene set independently with the given probability.
    Bernoulli {
        #[serde(default = "default_install_probability")]
        probability: f64,
    },
    /// Exactly `min(budget / cost, N)` genes set, chosen uniformly.
    #[default]
    ExactBudget,
}

fn default_install_probability() -> f64 {
    0.5
}

// ============================================================================
// Run settings
// ============================================================================

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals in population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Maximum number of generations.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Stop once best coverage reaches this value.
    #[serde(default)]
    pub target_coverage: Option<f64>,
    /// Stop if no improvement for N generations.
    #[serde(default)]
    pub stagnation_limit: Option<usize>,
    /// Wall-clock budget in seconds.
    #[serde(default)]
    pub time_limit_secs: Option<f64>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: default_max_generations(),
            target_coverage: None,
            stagnation_limit: None,
            time_limit_secs: None,
        }
    }
}

fn default_population_size() -> usize {
    500
}
fn default_max_generations() -> usize {
    20
}

/// Evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvaluationConfig {
    /// Number of evaluation worker threads (0 = one per core).
    #[serde(default)]
    pub parallel_workers: usize,
}

/// Hall-of-fame archive settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Maximum solutions kept.
    #[serde(default = "default_archive_size")]
    pub max_size: usize,
    /// Minimum normalized Hamming distance to every archived solution.
    #[serde(default)]
    pub diversity_threshold: f64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_size: default_archive_size(),
            diversity_threshold: 0.0,
        }
    }
}

fn default_archive_size() -> usize {
    10
}

/// Result extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsConfig {
    /// Number of ranked solutions returned.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

// ============================================================================
// Progress and Result Types
// ============================================================================

/// Driver state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EvolutionPhase {
    /// Population built and repaired, fitness invalid.
    #[default]
    Initialized,
    /// Every fitness reflects current genes.
    Evaluated,
    /// Offspring pool drawn.
    Selected,
    /// Crossover and mutation applied.
    Varied,
    /// Offspring repaired to feasibility.
    Repaired,
    /// Search finished.
    Terminated,
}

/// Snapshot of a solution for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionSnapshot {
    /// Unique identifier.
    pub id: u64,
    /// Coverage score.
    pub coverage: f64,
    /// Internal objective values (all maximized).
    pub objectives: Vec<f64>,
    /// Number of installed sites.
    pub installations: usize,
    /// Installed sites times cost per site.
    pub cost: f64,
    /// Indices of installed candidates, ascending.
    pub installed_indices: Vec<usize>,
    /// Installed candidates in candidate-set order.
    pub installed: Vec<Candidate>,
    /// Generation this solution was created.
    pub generation: usize,
    /// Parent IDs.
    pub parents: Vec<u64>,
}

/// Progress update after each generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    pub generation: usize,
    pub total_generations: usize,
    /// Best coverage seen so far.
    pub best_coverage: f64,
    /// Average coverage of current population.
    pub avg_coverage: f64,
    /// Best coverage this generation.
    pub generation_best: f64,
    /// Generations since last improvement.
    pub stagnation_count: usize,
    /// Every individual scored zero coverage this generation.
    pub stalled: bool,
    pub best_solution: Option<SolutionSnapshot>,
    pub top_solutions: Vec<SolutionSnapshot>,
    pub history: EvolutionHistory,
    pub phase: EvolutionPhase,
}

/// Per-generation statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best coverage per generation.
    pub best_coverage: Vec<f64>,
    /// Average coverage per generation.
    pub avg_coverage: Vec<f64>,
    /// Coverage standard deviation per generation.
    pub coverage_std: Vec<f64>,
    /// Mean normalized pairwise Hamming distance per generation.
    pub diversity: Vec<f64>,
    /// Mean installed sites per generation.
    pub avg_installations: Vec<f64>,
    /// Degenerate offspring replaced per generation.
    pub replacements: Vec<usize>,
}

/// Final result of an optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Best solution tracked across all generations.
    pub best: SolutionSnapshot,
    /// Top-K feasible solutions of the final population.
    pub ranked: Vec<SolutionSnapshot>,
    /// First non-dominated front of the final population.
    pub pareto_front: Vec<SolutionSnapshot>,
    /// Hall-of-fame archive.
    pub archive: Vec<SolutionSnapshot>,
    /// Run statistics.
    pub stats: EvolutionStats,
    /// Generations in which the whole population scored zero.
    pub stalled_generations: Vec<usize>,
    pub history: EvolutionHistory,
}

/// Statistics from an optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    pub generations: usize,
    pub total_evaluations: u64,
    pub best_coverage: f64,
    pub final_avg_coverage: f64,
    pub elapsed_seconds: f64,
    pub evaluations_per_second: f64,
    pub stop_reason: StopReason,
}

/// Reason the search stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached maximum generations.
    MaxGenerations,
    /// Reached target coverage.
    TargetReached,
    /// Stagnation limit hit.
    Stagnation,
    /// Wall-clock budget exhausted.
    TimeLimit,
    /// User cancelled.
    Cancelled,
}

// ============================================================================
// Validation
// ============================================================================

/// Evolution configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Elitism ({elitism}) must be smaller than population size ({size})")]
    TooManyElites { elitism: usize, size: usize },
    #[error("Tournament size must be at least 1")]
    InvalidTournamentSize,
    #[error("Probability {name} must be within [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("No objectives specified")]
    NoObjectives,
    #[error("Invalid objective weight: {0}")]
    InvalidWeight(f64),
    #[error("Multi-objective fitness needs a Coverage objective")]
    MissingCoverageObjective,
    #[error("Candidate set is empty")]
    NoCandidates,
    #[error("Failed to build evaluation worker pool: {0}")]
    WorkerPool(String),
    #[error("Coverage or constraint config invalid: {0}")]
    Config(#[from] super::ConfigError),
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl EvolutionConfig {
    /// Validate evolution configuration.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.coverage.validate()?;
        self.constraints.validate()?;

        if self.population.size < 2 {
            return Err(EvolutionConfigError::PopulationTooSmall);
        }
        if self.algorithm.elitism >= self.population.size {
            return Err(EvolutionConfigError::TooManyElites {
                elitism: self.algorithm.elitism,
                size: self.population.size,
            });
        }

        if let SelectionMethod::Tournament { size } = self.algorithm.selection
            && size == 0
        {
            return Err(EvolutionConfigError::InvalidTournamentSize);
        }

        let check_probability = |value: f64, name: &'static str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(EvolutionConfigError::InvalidProbability { name, value })
            }
        };

        check_probability(self.algorithm.crossover_rate, "crossover_rate")?;
        check_probability(self.algorithm.mutation_rate, "mutation_rate")?;
        check_probability(self.algorithm.gene_flip_rate, "gene_flip_rate")?;
        if let Initialization::Bernoulli { probability } = self.algorithm.initialization {
            check_probability(probability, "initialization.probability")?;
        }

        if let FitnessKind::MultiObjective { objectives } = &self.fitness {
            if objectives.is_empty() {
                return Err(EvolutionConfigError::NoObjectives);
            }
            for o in objectives {
                if !(o.weight > 0.0) {
                    return Err(EvolutionConfigError::InvalidWeight(o.weight));
                }
            }
            if !objectives
                .iter()
                .any(|o| o.metric == ObjectiveMetric::Coverage)
            {
                return Err(EvolutionConfigError::MissingCoverageObjective);
            }
        }

        Ok(())
    }
}
