//! Candidate sites and the ordered, read-only candidate set.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A geographic point eligible for installation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Candidate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Coordinates as a `(lat, lon)` tuple.
    #[inline]
    pub fn coordinates(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// A raw row handed over by a loader. Either coordinate may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Ordered sequence of candidates, shared read-only for the whole run.
///
/// A candidate's index is its identity: gene `i` of every individual refers
/// to `candidates[i]`. Cloning is cheap (the storage is reference counted).
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSet {
    candidates: Arc<[Candidate]>,
}

impl CandidateSet {
    /// Create from an ordered list of candidates.
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates: candidates.into(),
        }
    }

    /// Build from `(lat, lon)` pairs.
    pub fn from_coordinates<I>(coords: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        Self::new(
            coords
                .into_iter()
                .map(|(lat, lon)| Candidate::new(lat, lon))
                .collect(),
        )
    }

    /// Build from loader records, skipping rows with a missing coordinate.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = CandidateRecord>,
    {
        let mut skipped = 0usize;
        let candidates: Vec<Candidate> = records
            .into_iter()
            .filter_map(|r| match (r.latitude, r.longitude) {
                (Some(lat), Some(lon)) => Some(Candidate::new(lat, lon)),
                _ => {
                    skipped += 1;
                    None
                }
            })
            .collect();

        if skipped > 0 {
            log::debug!("Skipped {} candidate rows with missing coordinates", skipped);
        }

        Self::new(candidates)
    }

    /// Load a JSON array of [`CandidateRecord`]s.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let text = fs::read_to_string(path.as_ref())?;
        let records: Vec<CandidateRecord> = serde_json::from_str(&text)?;
        let set = Self::from_records(records);
        if set.is_empty() {
            return Err(LoadError::NoCandidates);
        }
        Ok(set)
    }

    /// Number of candidates (N).
    #[inline]
    pub fn size(&self) -> usize {
        self.candidates.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Coordinates of the candidate at `index`.
    pub fn coordinates_of(&self, index: usize) -> Option<(f64, f64)> {
        self.candidates.get(index).map(Candidate::coordinates)
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    pub fn as_slice(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    /// Materialize the candidates whose gene is set, in candidate-set order.
    ///
    /// Genes beyond the set's length are ignored.
    pub fn installed_locations(&self, genes: &[bool]) -> Vec<Candidate> {
        genes
            .iter()
            .zip(self.candidates.iter())
            .filter(|(g, _)| **g)
            .map(|(_, c)| *c)
            .collect()
    }

    /// Bounding box of all candidates as `((min_lat, max_lat), (min_lon, max_lon))`.
    pub fn extent(&self) -> Option<((f64, f64), (f64, f64))> {
        let first = self.candidates.first()?;
        let init = (
            (first.latitude, first.latitude),
            (first.longitude, first.longitude),
        );
        Some(self.candidates.iter().fold(init, |((a, b), (c, d)), p| {
            (
                (a.min(p.latitude), b.max(p.latitude)),
                (c.min(p.longitude), d.max(p.longitude)),
            )
        }))
    }
}

/// Candidate loading errors.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read candidate file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse candidate file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Candidate file contains no rows with both latitude and longitude")]
    NoCandidates,
}
