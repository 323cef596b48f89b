//! Proximity search over validated stations
//!
//! Both algorithms implement [`ProximitySearch`], so callers (notably the
//! comparator) can drive either one without knowing which it is. Each
//! implementation owns an immutable spatial index built once over the
//! station slice it borrows.

mod buffer;
mod kdtree;

pub use buffer::BufferSearch;
pub use kdtree::KdTreeSearch;

use crate::utils::{LocalFrame, METERS_PER_DEGREE, closest_point_on_segment, haversine_distance};
use crate::{FuelStation, Result, Route, SearchConfig};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Relative slack added on top of the projection stretch when turning a
/// ground radius into a planar one
const PLANAR_RADIUS_SLACK: f64 = 1e-3;

/// Identifies a proximity search implementation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Algorithm {
    /// Batched radius queries against a k-d tree of stations
    KdTree,
    /// Point-in-polygon tests against a buffer around the route line
    Buffer,
}

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::KdTree, Algorithm::Buffer];

    /// Static name used for measurements and table output
    pub fn label(self) -> &'static str {
        match self {
            Algorithm::KdTree => "KDTree",
            Algorithm::Buffer => "Buffer",
        }
    }

    /// Build the search index for this algorithm
    pub fn build<'a>(
        self,
        stations: &'a [FuelStation],
        frame: LocalFrame,
        config: &SearchConfig,
    ) -> Box<dyn ProximitySearch + 'a> {
        match self {
            Algorithm::KdTree => Box::new(KdTreeSearch::new(stations, frame, config)),
            Algorithm::Buffer => Box::new(BufferSearch::new(stations, frame)),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Find the stations lying within a distance of a route
pub trait ProximitySearch: Send + Sync {
    /// Which implementation this is
    fn algorithm(&self) -> Algorithm;

    /// Return every station whose great-circle distance to `route` is at most
    /// `radius_m` meters, each exactly once with its smallest distance
    fn search(&self, route: &Route, radius_m: f64) -> Result<SearchResult>;
}

/// A matched station with its distance to the route in meters
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StationMatch {
    pub station: FuelStation,
    pub distance_m: f64,
}

/// Stations matched by one search run, keyed by station id
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchResult {
    algorithm: Algorithm,
    radius_m: f64,
    matches: BTreeMap<String, StationMatch>,
}

impl SearchResult {
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Radius the search was run with, in meters
    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Look up a match by station id
    pub fn get(&self, id: &str) -> Option<&StationMatch> {
        self.matches.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.matches.contains_key(id)
    }

    /// Matched station ids in ascending order
    pub fn ids(&self) -> BTreeSet<&str> {
        self.matches.keys().map(String::as_str).collect()
    }

    /// Matches ordered by station id
    pub fn iter(&self) -> impl Iterator<Item = &StationMatch> {
        self.matches.values()
    }

    /// Matches ordered by distance to the route, closest first
    pub fn sorted_by_distance(&self) -> Vec<&StationMatch> {
        let mut sorted: Vec<&StationMatch> = self.matches.values().collect();
        sorted.sort_by(|a, b| {
            a.distance_m
                .total_cmp(&b.distance_m)
                .then_with(|| a.station.id.cmp(&b.station.id))
        });
        sorted
    }
}

/// Per-run accumulator keeping the smallest distance seen for each station
#[derive(Debug, Default)]
pub(crate) struct MatchAccumulator {
    best: HashMap<u32, f64>,
}

impl MatchAccumulator {
    /// Record a candidate distance for the station at `index`
    #[inline]
    pub(crate) fn offer(&mut self, index: u32, distance_m: f64) {
        self.best
            .entry(index)
            .and_modify(|d| {
                if distance_m < *d {
                    *d = distance_m;
                }
            })
            .or_insert(distance_m);
    }

    /// Fold another accumulator into this one
    pub(crate) fn merge(mut self, other: MatchAccumulator) -> MatchAccumulator {
        if self.best.len() < other.best.len() {
            return other.merge(self);
        }
        for (index, distance) in other.best {
            self.offer(index, distance);
        }
        self
    }

    pub(crate) fn len(&self) -> usize {
        self.best.len()
    }

    /// Resolve station indices into a result keyed by station id
    pub(crate) fn into_result(
        self,
        algorithm: Algorithm,
        radius_m: f64,
        stations: &[FuelStation],
    ) -> SearchResult {
        let mut matches: BTreeMap<String, StationMatch> = BTreeMap::new();
        for (index, distance_m) in self.best {
            let station = &stations[index as usize];
            match matches.get_mut(&station.id) {
                Some(existing) if existing.distance_m <= distance_m => {}
                Some(existing) => {
                    *existing = StationMatch {
                        station: station.clone(),
                        distance_m,
                    }
                }
                None => {
                    matches.insert(
                        station.id.clone(),
                        StationMatch {
                            station: station.clone(),
                            distance_m,
                        },
                    );
                }
            }
        }

        SearchResult {
            algorithm,
            radius_m,
            matches,
        }
    }
}

/// Planar radius guaranteed to contain every point within `radius_m` of the
/// route, given the projection stretch over the route's latitude band
pub(crate) fn planar_search_radius(frame: &LocalFrame, route: &Route, radius_m: f64) -> f64 {
    let (min_lat, max_lat) = route.lat_range();
    let margin_deg = radius_m / METERS_PER_DEGREE;
    let stretch = frame.max_stretch(min_lat - margin_deg, max_lat + margin_deg);
    radius_m * stretch * (1.0 + PLANAR_RADIUS_SLACK) + 1e-6
}

/// Project every route vertex into `frame`
pub(crate) fn project_route(frame: &LocalFrame, route: &Route) -> Vec<[f64; 2]> {
    route
        .points()
        .iter()
        .map(|p| frame.project(p.lat, p.lon))
        .collect()
}

/// Great-circle distance from a station to the route segment between
/// vertices `start` and `end`
///
/// `start == end` measures to a lone vertex. Both searches measure through
/// this function, so a station reached by the same segments gets the same
/// distance from either of them.
pub(crate) fn segment_distance(
    frame: &LocalFrame,
    route: &Route,
    vertices: &[[f64; 2]],
    (start, end): (usize, usize),
    station: &FuelStation,
    station_xy: [f64; 2],
) -> f64 {
    let points = route.points();
    let (a, b) = (&points[start], &points[end]);

    let mut best = haversine_distance(a.lat, a.lon, station.lat, station.lon)
        .min(haversine_distance(b.lat, b.lon, station.lat, station.lon));

    if start != end {
        let closest = closest_point_on_segment(station_xy, vertices[start], vertices[end]);
        let (lat, lon) = frame.unproject(closest);
        best = best.min(haversine_distance(lat, lon, station.lat, station.lon));
    }
    best
}

/// Validate the radius argument shared by both implementations
pub(crate) fn check_radius(radius_m: f64) -> Result<()> {
    if !radius_m.is_finite() || radius_m < 0.0 {
        return Err(crate::SearchError::InvalidConfig(format!(
            "radius must be a non-negative distance, got {radius_m}"
        )));
    }
    Ok(())
}
