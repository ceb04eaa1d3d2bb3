//! Configuration types for coverage scoring and site constraints.

use serde::{Deserialize, Serialize};

/// Kilometers per degree used by every degree/km conversion in the crate.
///
/// This is a flat approximation, not geodesic buffering. Scores are only
/// comparable across runs if the same constant is used everywhere.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Coverage scoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Coverage radius around each installed site, in kilometers.
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
    /// Scoring strategy.
    #[serde(default)]
    pub objective: ObjectiveMode,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            radius_km: default_radius_km(),
            objective: ObjectiveMode::default(),
        }
    }
}

fn default_radius_km() -> f64 {
    10.0
}

impl CoverageConfig {
    /// Radius converted to coordinate degrees (`radius_km / 111`).
    #[inline]
    pub fn radius_degrees(&self) -> f64 {
        self.radius_km / KM_PER_DEGREE
    }
}

/// Coverage scoring strategy.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum ObjectiveMode {
    /// Exact planar union area of the coverage disks, in km².
    #[default]
    ExactUnion,
    /// Grid-sampled, linearly decaying safety score.
    SafetyGrid(SafetyGridConfig),
}

/// Safety grid settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyGridConfig {
    /// Cells per side (the grid is `resolution x resolution`).
    #[serde(default = "default_grid_resolution")]
    pub resolution: usize,
    /// Safety value at a site's own position.
    #[serde(default = "default_max_safety_value")]
    pub max_safety_value: f64,
    /// Region covered by the grid.
    #[serde(default)]
    pub extent: GridExtent,
}

impl Default for SafetyGridConfig {
    fn default() -> Self {
        Self {
            resolution: default_grid_resolution(),
            max_safety_value: default_max_safety_value(),
            extent: GridExtent::default(),
        }
    }
}

fn default_grid_resolution() -> usize {
    1000
}
fn default_max_safety_value() -> f64 {
    10.0
}

/// Region discretized by the safety grid.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum GridExtent {
    /// Candidate-set bounding box padded by the coverage radius.
    /// Resolved once when the evaluator is built.
    #[default]
    FitCandidates,
    /// Explicit latitude/longitude ranges in degrees.
    Fixed {
        lat_range: (f64, f64),
        lon_range: (f64, f64),
    },
}

/// Budget and spacing constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintConfig {
    /// Total budget in currency units.
    #[serde(default = "default_budget")]
    pub budget: f64,
    /// Cost of installing one site.
    #[serde(default = "default_installation_cost")]
    pub installation_cost_per_point: f64,
    /// Minimum great-circle distance between installed sites (None disables).
    #[serde(default)]
    pub min_distance_km: Option<f64>,
    /// Ceiling on repair iterations per individual (None = gene length).
    #[serde(default)]
    pub max_repair_iterations: Option<usize>,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            budget: default_budget(),
            installation_cost_per_point: default_installation_cost(),
            min_distance_km: None,
            max_repair_iterations: None,
        }
    }
}

fn default_budget() -> f64 {
    1600.0
}
fn default_installation_cost() -> f64 {
    21.0
}

impl ConstraintConfig {
    /// Largest `k` with `k * cost <= budget`, evaluated the same way the
    /// budget check multiplies, so fractional prices agree with it.
    pub fn max_installations(&self) -> usize {
        let cost = self.installation_cost_per_point;
        if !(cost > 0.0) {
            return usize::MAX;
        }
        let mut count = (self.budget / cost).floor().max(0.0) as usize;
        while count > 0 && count as f64 * cost > self.budget {
            count -= 1;
        }
        while let Some(next) = count.checked_add(1)
            && next as f64 * cost <= self.budget
        {
            count = next;
        }
        count
    }
}

impl CoverageConfig {
    /// Validate coverage parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.radius_km > 0.0) || !self.radius_km.is_finite() {
            return Err(ConfigError::InvalidRadius(self.radius_km));
        }
        if let ObjectiveMode::SafetyGrid(grid) = &self.objective {
            if grid.resolution == 0 {
                return Err(ConfigError::InvalidGridResolution);
            }
            if !(grid.max_safety_value > 0.0) {
                return Err(ConfigError::InvalidSafetyValue(grid.max_safety_value));
            }
            if let GridExtent::Fixed {
                lat_range,
                lon_range,
            } = &grid.extent
                && (lat_range.0 >= lat_range.1 || lon_range.0 >= lon_range.1)
            {
                return Err(ConfigError::InvalidGridExtent {
                    lat_range: *lat_range,
                    lon_range: *lon_range,
                });
            }
        }
        Ok(())
    }
}

impl ConstraintConfig {
    /// Validate constraint parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.installation_cost_per_point > 0.0) {
            return Err(ConfigError::InvalidCost(self.installation_cost_per_point));
        }
        if self.budget < self.installation_cost_per_point {
            return Err(ConfigError::BudgetTooSmall {
                budget: self.budget,
                cost: self.installation_cost_per_point,
            });
        }
        if let Some(d) = self.min_distance_km
            && !(d >= 0.0)
        {
            return Err(ConfigError::InvalidMinDistance(d));
        }
        if self.max_repair_iterations == Some(0) {
            return Err(ConfigError::InvalidRepairCeiling);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Coverage radius must be positive, got {0} km")]
    InvalidRadius(f64),
    #[error("Installation cost must be positive, got {0}")]
    InvalidCost(f64),
    #[error("Budget {budget} cannot pay for a single installation costing {cost}")]
    BudgetTooSmall { budget: f64, cost: f64 },
    #[error("Minimum distance must be non-negative, got {0} km")]
    InvalidMinDistance(f64),
    #[error("Repair iteration ceiling must be non-zero")]
    InvalidRepairCeiling,
    #[error("Safety grid resolution must be non-zero")]
    InvalidGridResolution,
    #[error("Maximum safety value must be positive, got {0}")]
    InvalidSafetyValue(f64),
    #[error("Safety grid extent cannot be fitted to an empty candidate set")]
    EmptyGridExtent,
    #[error("Invalid safety grid extent: lat {lat_range:?}, lon {lon_range:?}")]
    InvalidGridExtent {
        lat_range: (f64, f64),
        lon_range: (f64, f64),
    },
}
