//! Compute module - Coverage scoring, constraints, and search.

mod constraints;
mod coverage;
mod geometry;

pub mod evolution;

pub use constraints::*;
pub use coverage::*;
pub use geometry::*;
