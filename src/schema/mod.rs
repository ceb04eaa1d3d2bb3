//! Schema module - Candidate, configuration and result types.

mod candidates;
mod config;
mod evolution;

pub use candidates::*;
pub use config::*;
pub use evolution::*;
