//! Site coverage - Budget-constrained facility placement by genetic search.
//!
//! This crate selects a subset of candidate locations that maximizes the
//! area covered by fixed-radius disks around them, subject to a total
//! installation budget and an optional minimum spacing between sites.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Candidate sets, configuration, and result types
//! - `compute`: Coverage scoring, constraint repair, and evolutionary search
//!
//! # Example
//!
//! ```rust,no_run
//! use site_coverage::{
//!     compute::evolution::EvolutionEngine,
//!     schema::{CandidateSet, EvolutionConfig},
//! };
//!
//! let candidates = CandidateSet::from_json_file("candidates.json")?;
//!
//! let mut config = EvolutionConfig::default();
//! config.constraints.budget = 400.0;
//! config.constraints.min_distance_km = Some(5.0);
//!
//! let mut engine = EvolutionEngine::new(config, candidates)?;
//! let result = engine.run();
//!
//! for site in &result.best.installed {
//!     println!("{:.5}, {:.5}", site.latitude, site.longitude);
//! }
//! println!("Covered area: {:.1} km²", result.best.coverage);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::EvolutionEngine;
pub use compute::{ConstraintEngine, CoverageEvaluator};
pub use schema::{Candidate, CandidateSet, EvolutionConfig, EvolutionResult};
