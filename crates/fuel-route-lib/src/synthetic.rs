//! Deterministic synthetic routes and station fields
//!
//! Used by the integration tests, the benchmarks and the binary's
//! `--synthetic` mode. The same seed always yields the same data.
//!
//! # Example
//!
//! ```rust
//! use fuel_route_lib::RoutePoint;
//! use fuel_route_lib::synthetic::{RoutePattern, SyntheticRoute, SyntheticStations};
//!
//! let route = SyntheticRoute {
//!     origin: RoutePoint::new(39.0, -104.0),
//!     point_count: 1_000,
//!     spacing_m: 50.0,
//!     pattern: RoutePattern::Winding,
//!     jitter_m: 2.0,
//!     seed: 7,
//! }
//! .generate();
//! let stations = SyntheticStations::default().generate(&route);
//! assert_eq!(route.len(), 1_000);
//! assert_eq!(stations.len(), SyntheticStations::default().count);
//! ```

use crate::utils::METERS_PER_DEGREE;
use crate::{RawStation, RoutePoint};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::{PI, TAU};

/// Shape of a generated route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePattern {
    /// Constant heading due east
    Straight,
    /// Slowly turning road with small random heading changes
    Winding,
}

/// Route generator
#[derive(Debug, Clone)]
pub struct SyntheticRoute {
    pub origin: RoutePoint,
    pub point_count: usize,
    /// Distance travelled between consecutive points, before jitter
    pub spacing_m: f64,
    pub pattern: RoutePattern,
    /// Maximum sideways displacement applied to each point
    pub jitter_m: f64,
    pub seed: u64,
}

impl Default for SyntheticRoute {
    fn default() -> Self {
        Self {
            origin: RoutePoint::new(39.74, -104.99),
            point_count: 20_000,
            spacing_m: 25.0,
            pattern: RoutePattern::Winding,
            jitter_m: 3.0,
            seed: 42,
        }
    }
}

/// Move `meters_east` and `meters_north` from `(lat, lon)`
fn offset(lat: f64, lon: f64, meters_east: f64, meters_north: f64) -> (f64, f64) {
    let new_lat = lat + meters_north / METERS_PER_DEGREE;
    let meters_per_deg_lon = METERS_PER_DEGREE * lat.to_radians().cos();
    if meters_per_deg_lon.abs() < 1e-9 {
        return (new_lat, lon);
    }
    (new_lat, lon + meters_east / meters_per_deg_lon)
}

impl SyntheticRoute {
    pub fn generate(&self) -> Vec<RoutePoint> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut points = Vec::with_capacity(self.point_count);
        if self.point_count == 0 {
            return points;
        }

        // Heading is measured counter-clockwise from east
        let mut heading: f64 = 0.0;
        let (mut lat, mut lon) = (self.origin.lat, self.origin.lon);

        for i in 0..self.point_count {
            let (east, north) = if self.jitter_m > 0.0 {
                let side = rng.random_range(-self.jitter_m..=self.jitter_m);
                (-side * heading.sin(), side * heading.cos())
            } else {
                (0.0, 0.0)
            };
            let (jlat, jlon) = offset(lat, lon, east, north);
            points.push(RoutePoint::new(jlat.clamp(-90.0, 90.0), wrap_lon(jlon)));

            if self.pattern == RoutePattern::Winding {
                let base_turn = (i as f64 * 0.002).sin() * 0.01;
                heading = (heading + base_turn + rng.random_range(-0.02..0.02)).rem_euclid(TAU);
            }
            (lat, lon) = offset(
                lat,
                lon,
                self.spacing_m * heading.cos(),
                self.spacing_m * heading.sin(),
            );
        }

        points
    }
}

fn wrap_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Station field generator scattering stations around a route
#[derive(Debug, Clone)]
pub struct SyntheticStations {
    pub count: usize,
    /// Stations are placed up to this far from a random route point
    pub spread_m: f64,
    /// Share of records made invalid on purpose, in `[0, 1]`
    pub invalid_fraction: f64,
    pub seed: u64,
}

impl Default for SyntheticStations {
    fn default() -> Self {
        Self {
            count: 5_000,
            spread_m: 5_000.0,
            invalid_fraction: 0.01,
            seed: 43,
        }
    }
}

impl SyntheticStations {
    /// Generate `count` raw records around `route`
    pub fn generate(&self, route: &[RoutePoint]) -> Vec<RawStation> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut records = Vec::with_capacity(self.count);
        if route.is_empty() {
            return records;
        }

        for i in 0..self.count {
            let id = format!("S{i:06}");
            let address = format!("{} Synthetic Rd", i + 1);
            let price = rng
                .random_bool(0.9)
                .then(|| (rng.random_range(2.50..4.50_f64) * 100.0).round() / 100.0);

            if rng.random::<f64>() < self.invalid_fraction {
                let (lat, lon) = match rng.random_range(0..4) {
                    0 => (None, Some(0.0)),
                    1 => (Some(f64::NAN), Some(0.0)),
                    2 => (Some(95.0), Some(0.0)),
                    _ => (Some(0.0), Some(200.0)),
                };
                records.push(RawStation::new(id, address, lat, lon, price));
                continue;
            }

            let anchor = route[rng.random_range(0..route.len())];
            let bearing = rng.random_range(0.0..PI * 2.0);
            let distance = rng.random_range(0.0..=self.spread_m);
            let (lat, lon) = offset(
                anchor.lat,
                anchor.lon,
                distance * bearing.cos(),
                distance * bearing.sin(),
            );
            records.push(RawStation::new(
                id,
                address,
                Some(lat.clamp(-90.0, 90.0)),
                Some(wrap_lon(lon)),
                price,
            ));
        }

        records
    }
}
