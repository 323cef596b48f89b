//! Route storage module
//!
//! This module provides the immutable `Route` struct holding ordered route
//! points together with precomputed spacing statistics.

use crate::utils::{self, LocalFrame};
use crate::{Result, SearchError};

/// A single position along a route, in WGS84 degrees
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoutePoint {
    pub lat: f64,
    pub lon: f64,
}

impl RoutePoint {
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to another point in meters
    #[inline]
    pub fn distance_to(&self, other: &RoutePoint) -> f64 {
        utils::haversine_distance(self.lat, self.lon, other.lat, other.lon)
    }
}

impl From<(f64, f64)> for RoutePoint {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self::new(lat, lon)
    }
}

/// Spacing statistics of a route, all distances in meters
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteStats {
    /// Number of route points
    pub point_count: usize,
    /// Shortest gap between consecutive points
    pub min_spacing_m: f64,
    /// Longest gap between consecutive points
    pub max_spacing_m: f64,
    /// Mean gap between consecutive points
    pub avg_spacing_m: f64,
    /// Population standard deviation of the gaps
    pub stddev_spacing_m: f64,
    /// Sum of all gaps
    pub total_length_m: f64,
}

impl RouteStats {
    /// Compute statistics in a single pass over the points
    pub fn from_points(points: &[RoutePoint]) -> Self {
        let mut stats = RouteStats {
            point_count: points.len(),
            ..Default::default()
        };
        if points.len() < 2 {
            return stats;
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut total = 0.0;
        // Welford running mean and squared deviation
        let mut mean = 0.0;
        let mut m2 = 0.0;

        for (i, pair) in points.windows(2).enumerate() {
            let gap = pair[0].distance_to(&pair[1]);
            min = min.min(gap);
            max = max.max(gap);
            total += gap;

            let n = (i + 1) as f64;
            let delta = gap - mean;
            mean += delta / n;
            m2 += delta * (gap - mean);
        }

        let gaps = (points.len() - 1) as f64;
        stats.min_spacing_m = min;
        stats.max_spacing_m = max;
        stats.avg_spacing_m = mean;
        stats.stddev_spacing_m = (m2 / gaps).max(0.0).sqrt();
        stats.total_length_m = total;
        stats
    }

    /// Total length in kilometers
    #[inline]
    pub fn total_length_km(&self) -> f64 {
        self.total_length_m / 1000.0
    }

    /// Total length in statute miles
    #[inline]
    pub fn total_length_miles(&self) -> f64 {
        utils::meters_to_miles(self.total_length_m)
    }
}

/// An ordered, immutable travel route with precomputed metadata
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    points: Vec<RoutePoint>,
    /// Cached statistics (computed once during construction)
    stats: RouteStats,
    /// Cached latitude extent `(min, max)`
    lat_range: (f64, f64),
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Route {
    /// Create a new route from ordered points
    ///
    /// # Errors
    /// `EmptyRoute` when `points` is empty, `InvalidRoute` with the offending
    /// index when a coordinate is non-finite or outside geographic bounds.
    pub fn new(points: Vec<RoutePoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(SearchError::EmptyRoute);
        }

        let mut min_lat = f64::INFINITY;
        let mut max_lat = f64::NEG_INFINITY;
        for (index, point) in points.iter().enumerate() {
            if !point.lat.is_finite() || !point.lon.is_finite() {
                return Err(SearchError::InvalidRoute {
                    index,
                    reason: format!("non-finite coordinate ({}, {})", point.lat, point.lon),
                });
            }
            if !utils::is_valid_wgs84(point.lat, point.lon) {
                return Err(SearchError::InvalidRoute {
                    index,
                    reason: format!("coordinate out of range ({}, {})", point.lat, point.lon),
                });
            }
            min_lat = min_lat.min(point.lat);
            max_lat = max_lat.max(point.lat);
        }

        let stats = RouteStats::from_points(&points);
        Ok(Route {
            points,
            stats,
            lat_range: (min_lat, max_lat),
        })
    }

    /// Build a route from points already known to be valid (a subset or
    /// refinement of an existing route). `points` must not be empty.
    pub(crate) fn from_trusted(points: Vec<RoutePoint>) -> Self {
        debug_assert!(!points.is_empty());
        let (min_lat, max_lat) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.lat), hi.max(p.lat))
            });
        let stats = RouteStats::from_points(&points);
        Route {
            points,
            stats,
            lat_range: (min_lat, max_lat),
        }
    }

    /// Create a route from `(lat, lon)` pairs
    pub fn from_lat_lon(pairs: &[(f64, f64)]) -> Result<Self> {
        Self::new(pairs.iter().copied().map(RoutePoint::from).collect())
    }

    /// All points in travel order
    #[inline]
    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    /// Number of points (never zero)
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false, a route holds at least one point
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn first(&self) -> RoutePoint {
        self.points[0]
    }

    #[inline]
    pub fn last(&self) -> RoutePoint {
        self.points[self.points.len() - 1]
    }

    /// Precomputed spacing statistics
    ///
    /// This is O(1) as the value is cached during construction.
    #[inline]
    pub fn stats(&self) -> &RouteStats {
        &self.stats
    }

    /// Total length in meters
    #[inline]
    pub fn total_length(&self) -> f64 {
        self.stats.total_length_m
    }

    /// Minimum and maximum latitude of the route
    #[inline]
    pub fn lat_range(&self) -> (f64, f64) {
        self.lat_range
    }

    /// Local planar frame centred on the mean route position
    pub fn frame(&self) -> LocalFrame {
        LocalFrame::from_positions(self.points.iter().map(|p| (p.lat, p.lon)))
            .unwrap_or_else(|| LocalFrame::new(self.points[0].lat, self.points[0].lon))
    }
}
