//! Evolutionary search for high-coverage, budget-feasible site selections.
//!
//! # Overview
//!
//! The search system consists of:
//!
//! - **Genes** (`genome`): Copy-on-write bit vectors, random generation,
//!   two-point crossover, and bit-flip mutation
//! - **Fitness** (`fitness`): Coverage score plus optional weighted objectives
//! - **Selection** (`selection`): Tournament and non-dominated sorting
//! - **Search** (`search`): The generational driver
//! - **Archive** (`archive`): Hall of fame of the best distinct solutions
//! - **Ranking** (`ranking`): Top-K and Pareto-front extraction
//!
//! # Example
//!
//! ```rust,no_run
//! use site_coverage::compute::evolution::EvolutionEngine;
//! use site_coverage::schema::{CandidateSet, EvolutionConfig};
//!
//! let candidates = CandidateSet::from_coordinates([(35.1, 129.0), (35.2, 129.1)]);
//! let mut engine = EvolutionEngine::new(EvolutionConfig::default(), candidates)?;
//! let result = engine.run_with_callback(|progress| {
//!     println!("Generation {}: best coverage = {:.1}",
//!         progress.generation, progress.best_coverage);
//! });
//!
//! println!("Best: {} sites, {:.1} km²", result.best.installations, result.best.coverage);
//! # Ok::<(), site_coverage::schema::EvolutionConfigError>(())
//! ```
//!
//! # Generation step
//!
//! 1. The top `elitism` individuals are copied unchanged.
//! 2. `N - elitism` parents are drawn by tournament (scalar) or crowded
//!    binary tournament over Pareto fronts (NSGA-II).
//! 3. Consecutive pairs are recombined with `crossover_rate`; each child is
//!    mutated with `mutation_rate`, flipping genes with `gene_flip_rate`.
//! 4. Offspring are repaired to feasibility and re-evaluated in parallel.
//! 5. Offspring with zero coverage are replaced by fresh repaired
//!    individuals.

mod archive;
mod fitness;
mod genome;
mod ranking;
mod search;
mod selection;

pub use archive::SolutionArchive;
pub use fitness::{Fitness, FitnessEvaluator};
pub use genome::{Genes, GenomeRng, genome_distance, population_diversity};
pub use ranking::{is_better, pareto_front, rank_population, top_feasible};
pub use search::{EvolutionEngine, Individual};
pub use selection::{
    ParetoRanking, crowding_distance, non_dominated_sort, select_nsga2, tournament,
};
