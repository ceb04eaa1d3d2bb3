//! Planar geometry for coverage scoring.
//!
//! Disks live in coordinate-degree space with `x = latitude` and
//! `y = longitude`. The union area is computed exactly: every disk boundary
//! is split into arcs, arcs covered by another disk are dropped, and the
//! remaining arcs are integrated with Green's theorem
//! (`A = 1/2 ∮ x dy - y dx`). Arcs bounding holes in the union are traversed
//! clockwise relative to the hole, so holes are subtracted automatically.

use std::collections::HashMap;
use std::f64::consts::TAU;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Tolerance for coincident centers and tangent disks.
const EPS: f64 = 1e-12;

/// A disk in the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Disk {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

impl Disk {
    pub fn new(x: f64, y: f64, r: f64) -> Self {
        Self { x, y, r }
    }

    #[inline]
    pub fn area(&self) -> f64 {
        std::f64::consts::PI * self.r * self.r
    }

    #[inline]
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox {
            min_x: self.x - self.r,
            min_y: self.y - self.r,
            max_x: self.x + self.r,
            max_y: self.y + self.r,
        }
    }

    #[inline]
    fn center_distance(&self, other: &Disk) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Same center and radius, up to tolerance.
    #[inline]
    fn coincides(&self, other: &Disk) -> bool {
        self.center_distance(other) <= EPS && (self.r - other.r).abs() <= EPS
    }

    /// Whether `other` contains this disk entirely.
    #[inline]
    fn inside(&self, other: &Disk) -> bool {
        self.center_distance(other) + self.r <= other.r + EPS
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    #[inline]
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

/// Uniform-grid index over disk bounding boxes.
///
/// Cells are sized to the largest diameter so each disk lands in at most
/// four cells. Queries return every disk whose bounding box intersects the
/// query box; the index only prunes pairs, it never decides overlap.
pub struct DiskIndex {
    cell_size: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
    bounds: Vec<BoundingBox>,
}

impl DiskIndex {
    /// Build the index over `disks`.
    pub fn new(disks: &[Disk]) -> Self {
        let max_r = disks.iter().map(|d| d.r).fold(0.0f64, f64::max);
        let cell_size = if max_r > 0.0 { 2.0 * max_r } else { 1.0 };

        let mut index = Self {
            cell_size,
            cells: HashMap::new(),
            bounds: Vec::with_capacity(disks.len()),
        };

        for (i, disk) in disks.iter().enumerate() {
            let bounds = disk.bounds();
            for key in index.cell_keys(&bounds) {
                index.cells.entry(key).or_default().push(i);
            }
            index.bounds.push(bounds);
        }

        index
    }

    fn cell_keys(&self, bounds: &BoundingBox) -> impl Iterator<Item = (i64, i64)> + use<> {
        let x0 = (bounds.min_x / self.cell_size).floor() as i64;
        let x1 = (bounds.max_x / self.cell_size).floor() as i64;
        let y0 = (bounds.min_y / self.cell_size).floor() as i64;
        let y1 = (bounds.max_y / self.cell_size).floor() as i64;
        (x0..=x1).flat_map(move |cx| (y0..=y1).map(move |cy| (cx, cy)))
    }

    /// Indices of disks whose bounding boxes intersect `bounds`, ascending.
    pub fn query(&self, bounds: &BoundingBox) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .cell_keys(bounds)
            .filter_map(|key| self.cells.get(&key))
            .flatten()
            .copied()
            .filter(|&i| self.bounds[i].intersects(bounds))
            .collect();
        hits.sort_unstable();
        hits.dedup();
        hits
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
}

/// Exact area of the union of `disks`.
pub fn union_area(disks: &[Disk]) -> f64 {
    match disks.len() {
        0 => return 0.0,
        1 => return disks[0].area(),
        _ => {}
    }

    let index = DiskIndex::new(disks);
    let mut area = 0.0;
    let mut pruned = 0usize;

    for (i, disk) in disks.iter().enumerate() {
        let neighbors = index.query(&disk.bounds());
        pruned += disks.len() - neighbors.len();

        let hidden = neighbors.iter().any(|&j| {
            j != i && {
                let other = &disks[j];
                if disk.coincides(other) {
                    // Keep the first of a group of identical disks.
                    j < i
                } else {
                    disk.inside(other)
                }
            }
        });
        if hidden || disk.r <= 0.0 {
            continue;
        }

        let mut covered = Vec::new();
        for &j in &neighbors {
            if j == i {
                continue;
            }
            let other = &disks[j];
            if disk.coincides(other) || other.inside(disk) {
                continue;
            }
            let d = disk.center_distance(other);
            if d >= disk.r + other.r {
                continue;
            }
            let cos_half = (disk.r * disk.r + d * d - other.r * other.r) / (2.0 * disk.r * d);
            let half = cos_half.clamp(-1.0, 1.0).acos();
            let theta = (other.y - disk.y).atan2(other.x - disk.x);
            push_interval(&mut covered, theta - half, 2.0 * half);
        }

        for (a, b) in uncovered_arcs(covered) {
            area += arc_integral(disk, a, b);
        }
    }

    log::trace!("union_area: {} disks, {} pairs pruned", disks.len(), pruned);
    area
}

/// Push `[start, start + width]` normalized into `[0, TAU]`, splitting on wrap.
fn push_interval(intervals: &mut Vec<(f64, f64)>, start: f64, width: f64) {
    if width >= TAU {
        intervals.push((0.0, TAU));
        return;
    }
    let s = start.rem_euclid(TAU);
    let e = s + width;
    if e > TAU {
        intervals.push((s, TAU));
        intervals.push((0.0, e - TAU));
    } else {
        intervals.push((s, e));
    }
}

/// Complement of the union of `covered` within `[0, TAU]`.
fn uncovered_arcs(mut covered: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    if covered.is_empty() {
        return vec![(0.0, TAU)];
    }
    covered.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut arcs = Vec::new();
    let mut cursor = 0.0;
    for (s, e) in covered {
        if s > cursor {
            arcs.push((cursor, s));
        }
        cursor = f64::max(cursor, e);
    }
    if cursor < TAU {
        arcs.push((cursor, TAU));
    }
    arcs
}

/// `1/2 ∫ x dy - y dx` along the disk boundary from angle `a` to `b`.
fn arc_integral(disk: &Disk, a: f64, b: f64) -> f64 {
    let r = disk.r;
    0.5 * (r * r * (b - a) + disk.x * r * (b.sin() - a.sin())
        - disk.y * r * (b.cos() - a.cos()))
}

/// Great-circle distance in kilometers between two `(lat, lon)` points in degrees.
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{} != {} (tol {})", a, b, tol);
    }

    /// Area of the lens shared by two disks of radius r at distance d.
    fn lens_area(r: f64, d: f64) -> f64 {
        2.0 * r * r * (d / (2.0 * r)).acos() - 0.5 * d * (4.0 * r * r - d * d).sqrt()
    }

    #[test]
    fn test_single_disk() {
        assert_close(union_area(&[Disk::new(3.0, -2.0, 1.5)]), PI * 2.25, 1e-12);
    }

    #[test]
    fn test_empty_union() {
        assert_eq!(union_area(&[]), 0.0);
    }

    #[test]
    fn test_disjoint_disks_are_additive() {
        let disks = [Disk::new(0.0, 0.0, 1.0), Disk::new(5.0, 0.0, 1.0)];
        assert_close(union_area(&disks), 2.0 * PI, 1e-10);
    }

    #[test]
    fn test_identical_disks() {
        let disks = [
            Disk::new(1.0, 1.0, 1.0),
            Disk::new(1.0, 1.0, 1.0),
            Disk::new(1.0, 1.0, 1.0),
        ];
        assert_close(union_area(&disks), PI, 1e-10);
    }

    #[test]
    fn test_contained_disk() {
        let disks = [Disk::new(0.0, 0.0, 2.0), Disk::new(0.5, 0.0, 1.0)];
        assert_close(union_area(&disks), 4.0 * PI, 1e-10);
    }

    #[test]
    fn test_two_overlapping_disks() {
        let d = 1.2;
        let disks = [Disk::new(0.0, 0.0, 1.0), Disk::new(d, 0.0, 1.0)];
        let expected = 2.0 * PI - lens_area(1.0, d);
        assert_close(union_area(&disks), expected, 1e-10);
    }

    #[test]
    fn test_union_with_hole() {
        // Ring of six disks around an uncovered center.
        let n = 6;
        let disks: Vec<Disk> = (0..n)
            .map(|k| {
                let t = TAU * k as f64 / n as f64;
                Disk::new(3.0 * t.cos(), 3.0 * t.sin(), 1.6)
            })
            .collect();
        // Neighbors are 3.0 apart, so each adjacent pair overlaps in a lens.
        let expected = n as f64 * (PI * 1.6 * 1.6 - lens_area(1.6, 3.0));
        assert_close(union_area(&disks), expected, 1e-9);
    }

    #[test]
    fn test_index_query() {
        let disks = [
            Disk::new(0.0, 0.0, 1.0),
            Disk::new(1.5, 0.0, 1.0),
            Disk::new(10.0, 10.0, 1.0),
        ];
        let index = DiskIndex::new(&disks);
        assert_eq!(index.len(), 3);
        assert_eq!(index.query(&disks[0].bounds()), vec![0, 1]);
        assert_eq!(index.query(&disks[2].bounds()), vec![2]);
    }

    #[test]
    fn test_haversine() {
        assert_close(haversine_km((35.0, 128.0), (35.0, 128.0)), 0.0, 1e-12);
        // One degree of latitude is about 111.19 km on a 6371 km sphere.
        assert_close(haversine_km((0.0, 0.0), (1.0, 0.0)), 111.19, 0.01);
    }
}
