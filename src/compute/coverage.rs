//! Coverage scoring strategies.
//!
//! Both strategies are pure functions of the installed-location list: no
//! state survives between calls, so one evaluator can be shared by every
//! evaluation worker.

use std::sync::Arc;

use crate::schema::{
    Candidate, CandidateSet, ConfigError, CoverageConfig, GridExtent, KM_PER_DEGREE,
    ObjectiveMode, SafetyGridConfig,
};

use super::geometry::{Disk, union_area};

/// Scores a set of installed locations. Scores are non-negative and the
/// empty set scores zero.
pub trait CoverageEvaluator: Send + Sync {
    fn evaluate(&self, installed: &[Candidate]) -> f64;

    /// Short strategy name for logs.
    fn name(&self) -> &'static str;
}

/// Build the evaluator selected by `config`.
///
/// The candidate set is only consulted to resolve a grid extent that is
/// fitted to the candidates.
pub fn build_evaluator(
    config: &CoverageConfig,
    candidates: &CandidateSet,
) -> Result<Arc<dyn CoverageEvaluator>, ConfigError> {
    config.validate()?;
    Ok(match &config.objective {
        ObjectiveMode::ExactUnion => Arc::new(ExactUnionEvaluator::new(config.radius_km)?),
        ObjectiveMode::SafetyGrid(grid) => Arc::new(SafetyGridEvaluator::new(
            config.radius_km,
            grid,
            candidates,
        )?),
    })
}

// ============================================================================
// Exact union
// ============================================================================

/// Planar union area of the coverage disks, in km².
///
/// The radius is converted with `radius_km / 111` and the degree² area is
/// scaled back by `111²`. This is deliberately not an area-preserving
/// projection, so scores stay comparable with earlier runs.
#[derive(Debug, Clone)]
pub struct ExactUnionEvaluator {
    radius_degrees: f64,
}

impl ExactUnionEvaluator {
    pub fn new(radius_km: f64) -> Result<Self, ConfigError> {
        if !(radius_km > 0.0) || !radius_km.is_finite() {
            return Err(ConfigError::InvalidRadius(radius_km));
        }
        Ok(Self {
            radius_degrees: radius_km / KM_PER_DEGREE,
        })
    }

    pub fn radius_degrees(&self) -> f64 {
        self.radius_degrees
    }
}

impl CoverageEvaluator for ExactUnionEvaluator {
    fn evaluate(&self, installed: &[Candidate]) -> f64 {
        let disks: Vec<Disk> = installed
            .iter()
            .map(|c| Disk::new(c.latitude, c.longitude, self.radius_degrees))
            .collect();
        union_area(&disks) * KM_PER_DEGREE * KM_PER_DEGREE
    }

    fn name(&self) -> &'static str {
        "exact-union"
    }
}

// ============================================================================
// Safety grid
// ============================================================================

/// Grid-sampled safety score.
///
/// Every cell within the radius of an installed site gets
/// `max_value * (1 - dist / radius)`. A cell keeps the maximum over all
/// sites and the score is the sum over cells. Distances and the radius are
/// both in degrees. Cell `(i, j)` sits at
/// `(lat_min + i * lat_step, lon_min + j * lon_step)`.
#[derive(Debug, Clone)]
pub struct SafetyGridEvaluator {
    resolution: usize,
    max_value: f64,
    radius_degrees: f64,
    lat_range: (f64, f64),
    lon_range: (f64, f64),
}

impl SafetyGridEvaluator {
    pub fn new(
        radius_km: f64,
        config: &SafetyGridConfig,
        candidates: &CandidateSet,
    ) -> Result<Self, ConfigError> {
        if !(radius_km > 0.0) || !radius_km.is_finite() {
            return Err(ConfigError::InvalidRadius(radius_km));
        }
        if config.resolution == 0 {
            return Err(ConfigError::InvalidGridResolution);
        }
        let radius_degrees = radius_km / KM_PER_DEGREE;

        let (lat_range, lon_range) = match &config.extent {
            GridExtent::Fixed {
                lat_range,
                lon_range,
            } => (*lat_range, *lon_range),
            GridExtent::FitCandidates => {
                let ((lat0, lat1), (lon0, lon1)) =
                    candidates.extent().ok_or(ConfigError::EmptyGridExtent)?;
                (
                    (lat0 - radius_degrees, lat1 + radius_degrees),
                    (lon0 - radius_degrees, lon1 + radius_degrees),
                )
            }
        };
        if lat_range.0 >= lat_range.1 || lon_range.0 >= lon_range.1 {
            return Err(ConfigError::InvalidGridExtent {
                lat_range,
                lon_range,
            });
        }

        Ok(Self {
            resolution: config.resolution,
            max_value: config.max_safety_value,
            radius_degrees,
            lat_range,
            lon_range,
        })
    }

    #[inline]
    fn lat_step(&self) -> f64 {
        (self.lat_range.1 - self.lat_range.0) / self.resolution as f64
    }

    #[inline]
    fn lon_step(&self) -> f64 {
        (self.lon_range.1 - self.lon_range.0) / self.resolution as f64
    }

    /// Cell value contributed by a site at Euclidean distance `dist`.
    #[inline]
    fn safety_value(&self, dist: f64) -> Option<f64> {
        (dist <= self.radius_degrees)
            .then(|| (self.max_value * (1.0 - dist / self.radius_degrees)).max(0.0))
    }

    /// Index range of cells whose coordinate lies within `[center - r, center + r]`.
    fn window(&self, center: f64, origin: f64, step: f64) -> Option<(usize, usize)> {
        let lo = ((center - self.radius_degrees - origin) / step).ceil();
        let hi = ((center + self.radius_degrees - origin) / step).floor();
        let max = (self.resolution - 1) as f64;
        if hi < 0.0 || lo > max {
            return None;
        }
        Some((lo.max(0.0) as usize, hi.min(max) as usize))
    }

    /// Score visiting every cell for every site.
    ///
    /// Produces the same score as [`CoverageEvaluator::evaluate`] at
    /// `O(installed * resolution²)` cost; kept as a reference.
    pub fn evaluate_full_scan(&self, installed: &[Candidate]) -> f64 {
        let n = self.resolution;
        let (lat_step, lon_step) = (self.lat_step(), self.lon_step());
        let mut grid = vec![0.0f64; n * n];

        for site in installed {
            for i in 0..n {
                let lat = self.lat_range.0 + i as f64 * lat_step;
                for j in 0..n {
                    let lon = self.lon_range.0 + j as f64 * lon_step;
                    let dist = (site.latitude - lat).hypot(site.longitude - lon);
                    if let Some(value) = self.safety_value(dist) {
                        let cell = &mut grid[i * n + j];
                        *cell = cell.max(value);
                    }
                }
            }
        }

        grid.iter().sum()
    }
}

impl CoverageEvaluator for SafetyGridEvaluator {
    fn evaluate(&self, installed: &[Candidate]) -> f64 {
        if installed.is_empty() {
            return 0.0;
        }

        let n = self.resolution;
        let (lat_step, lon_step) = (self.lat_step(), self.lon_step());
        let mut grid = vec![0.0f64; n * n];

        for site in installed {
            let Some((i0, i1)) = self.window(site.latitude, self.lat_range.0, lat_step) else {
                continue;
            };
            let Some((j0, j1)) = self.window(site.longitude, self.lon_range.0, lon_step) else {
                continue;
            };

            for i in i0..=i1 {
                let lat = self.lat_range.0 + i as f64 * lat_step;
                let row = &mut grid[i * n..(i + 1) * n];
                for (j, cell) in row.iter_mut().enumerate().take(j1 + 1).skip(j0) {
                    let lon = self.lon_range.0 + j as f64 * lon_step;
                    let dist = (site.latitude - lat).hypot(site.longitude - lon);
                    if let Some(value) = self.safety_value(dist) {
                        *cell = cell.max(value);
                    }
                }
            }
        }

        grid.iter().sum()
    }

    fn name(&self) -> &'static str {
        "safety-grid"
    }
}
