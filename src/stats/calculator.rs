//! Statistics Calculator Module
//! Handles spatial aggregation: map view centre, hexagon density bins and
//! per-category injury summaries.

use crate::data::{Dataset, InjuryType, Point};
use statrs::statistics::Statistics;
use std::collections::HashMap;

/// Initial zoom of the density map
pub const DEFAULT_ZOOM: f64 = 11.0;
/// Initial camera pitch of the density map, in degrees
pub const DEFAULT_PITCH: f64 = 50.0;
/// Hexagon radius in metres
pub const DEFAULT_HEX_RADIUS_M: f64 = 100.0;
/// Output elevation range of the tallest hexagon
pub const ELEVATION_RANGE: (f64, f64) = (0.0, 1000.0);
pub const ELEVATION_SCALE: f64 = 4.0;

const METERS_PER_DEG_LAT: f64 = 110_540.0;
const METERS_PER_DEG_LON: f64 = 111_320.0;

/// Camera placement for a map of the dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
    pub pitch: f64,
}

/// Equirectangular projection to metres around a fixed origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    origin: Point,
    lon_scale: f64,
}

impl LocalProjection {
    pub fn new(origin: Point) -> Self {
        Self {
            origin,
            lon_scale: METERS_PER_DEG_LON * origin.0.to_radians().cos(),
        }
    }

    /// `(lat, lon)` to `(x, y)` metres east/north of the origin.
    pub fn project(&self, point: Point) -> (f64, f64) {
        let x = (point.1 - self.origin.1) * self.lon_scale;
        let y = (point.0 - self.origin.0) * METERS_PER_DEG_LAT;
        (x, y)
    }

    pub fn unproject(&self, x: f64, y: f64) -> Point {
        (
            self.origin.0 + y / METERS_PER_DEG_LAT,
            self.origin.1 + x / self.lon_scale,
        )
    }
}

/// One populated cell of a hexagonal grid (axial coordinates).
#[derive(Debug, Clone, PartialEq)]
pub struct HexBin {
    pub q: i64,
    pub r: i64,
    pub center: Point,
    pub count: usize,
}

/// Hexagon density aggregation of a point set.
#[derive(Debug, Clone, PartialEq)]
pub struct HexLayer {
    pub projection: LocalProjection,
    pub radius_m: f64,
    /// Sorted by count descending, then by grid coordinates
    pub bins: Vec<HexBin>,
}

impl HexLayer {
    pub fn max_count(&self) -> usize {
        self.bins.first().map(|b| b.count).unwrap_or(0)
    }

    pub fn total_count(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }

    /// Extruded height of a bin, scaled linearly from zero to the densest bin.
    pub fn elevation(&self, bin: &HexBin) -> f64 {
        let max = self.max_count();
        if max == 0 {
            return ELEVATION_RANGE.0;
        }
        let (low, high) = ELEVATION_RANGE;
        (low + (high - low) * bin.count as f64 / max as f64) * ELEVATION_SCALE
    }

    /// Corner positions of a bin's hexagon (pointy-top), in degrees.
    pub fn corners(&self, bin: &HexBin) -> [Point; 6] {
        let (cx, cy) = hex_center(bin.q, bin.r, self.radius_m);
        std::array::from_fn(|i| {
            let angle = (60.0 * i as f64 - 30.0).to_radians();
            self.projection.unproject(
                cx + self.radius_m * angle.cos(),
                cy + self.radius_m * angle.sin(),
            )
        })
    }
}

/// Injured counts for one category across a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct InjurySummary {
    pub injury_type: InjuryType,
    /// Records with a value for this category
    pub reported: usize,
    /// Records with at least one injured person
    pub with_injuries: usize,
    pub total_injured: u64,
    pub max_injured: u32,
}

/// Handles spatial and injury statistics.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Mean position of a point set, `None` when empty.
    pub fn centroid(points: &[Point]) -> Option<Point> {
        if points.is_empty() {
            return None;
        }
        let lat = Statistics::mean(points.iter().map(|p| p.0));
        let lon = Statistics::mean(points.iter().map(|p| p.1));
        Some((lat, lon))
    }

    /// Camera centred on the mean crash position.
    pub fn view_state(dataset: &Dataset) -> Option<ViewState> {
        let points: Vec<Point> = dataset.iter().map(|r| r.position()).collect();
        let (latitude, longitude) = Self::centroid(&points)?;
        Some(ViewState {
            latitude,
            longitude,
            zoom: DEFAULT_ZOOM,
            pitch: DEFAULT_PITCH,
        })
    }

    /// Bin points into hexagons of `radius_m` metres.
    ///
    /// Empty input or a non-positive radius gives an empty layer.
    pub fn hexagon_layer(points: &[Point], radius_m: f64) -> HexLayer {
        let origin = Self::centroid(points).unwrap_or((0.0, 0.0));
        let projection = LocalProjection::new(origin);
        let mut layer = HexLayer {
            projection,
            radius_m,
            bins: Vec::new(),
        };
        if radius_m.is_nan() || radius_m <= 0.0 {
            return layer;
        }

        let mut counts: HashMap<(i64, i64), usize> = HashMap::new();
        for &point in points {
            let (x, y) = projection.project(point);
            *counts.entry(hex_cell(x, y, radius_m)).or_default() += 1;
        }

        let mut bins: Vec<HexBin> = counts
            .into_iter()
            .map(|((q, r), count)| {
                let (x, y) = hex_center(q, r, radius_m);
                HexBin {
                    q,
                    r,
                    center: projection.unproject(x, y),
                    count,
                }
            })
            .collect();
        bins.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(a.q.cmp(&b.q))
                .then(a.r.cmp(&b.r))
        });

        layer.bins = bins;
        layer
    }

    /// Injury summary for every category, in [`InjuryType::ALL`] order.
    pub fn injury_summaries(dataset: &Dataset) -> Vec<InjurySummary> {
        InjuryType::ALL
            .iter()
            .map(|&injury_type| {
                let counts: Vec<u32> = dataset
                    .iter()
                    .filter_map(|r| r.injured(injury_type))
                    .collect();
                InjurySummary {
                    injury_type,
                    reported: counts.len(),
                    with_injuries: counts.iter().filter(|&&n| n >= 1).count(),
                    total_injured: counts.iter().map(|&n| u64::from(n)).sum(),
                    max_injured: counts.iter().copied().max().unwrap_or(0),
                }
            })
            .collect()
    }
}

/// Axial cell containing the point `(x, y)` metres.
fn hex_cell(x: f64, y: f64, size: f64) -> (i64, i64) {
    let q = (3f64.sqrt() / 3.0 * x - y / 3.0) / size;
    let r = (2.0 / 3.0 * y) / size;
    cube_round(q, r)
}

fn cube_round(q: f64, r: f64) -> (i64, i64) {
    let s = -q - r;
    let (mut rq, mut rr, rs) = (q.round(), r.round(), s.round());
    let dq = (rq - q).abs();
    let dr = (rr - r).abs();
    let ds = (rs - s).abs();
    if dq > dr && dq > ds {
        rq = -rr - rs;
    } else if dr > ds {
        rr = -rq - rs;
    }
    (rq as i64, rr as i64)
}

fn hex_center(q: i64, r: i64, size: f64) -> (f64, f64) {
    let (q, r) = (q as f64, r as f64);
    let x = size * 3f64.sqrt() * (q + r / 2.0);
    let y = size * 1.5 * r;
    (x, y)
}
