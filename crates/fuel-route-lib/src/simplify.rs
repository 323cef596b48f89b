//! Shape-preserving route simplification (Douglas–Peucker)
//!
//! Deviation is measured in meters inside the route's [`LocalFrame`], from
//! each interior point to the chord joining the two enclosing kept points.
//! The recursion is driven by an explicit work stack so routes with millions
//! of points never hit the call-stack limit.

use crate::Route;
use crate::route::RouteStats;
use crate::utils::point_segment_distance;

/// Statistics describing one simplification run
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimplificationStats {
    /// Tolerance that was applied, in meters
    pub tolerance_m: f64,
    /// Point count before simplification
    pub original_points: usize,
    /// Point count after simplification
    pub simplified_points: usize,
    /// Fraction of points removed, in `[0, 1)`
    pub reduction_ratio: f64,
    /// Length of the input route in meters
    pub original_length_m: f64,
    /// Spacing statistics of the simplified route
    pub route_stats: RouteStats,
}

/// A simplified route together with its statistics
#[derive(Clone, Debug)]
pub struct SimplifiedRoute {
    pub route: Route,
    pub stats: SimplificationStats,
}

/// Simplify a route so no discarded point deviates more than `tolerance_m`
/// meters from the simplified line
///
/// The first and last points are always kept verbatim. A tolerance that is
/// not strictly positive, or a route of two points or fewer, yields the input
/// unchanged.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn simplify_route(route: &Route, tolerance_m: f64) -> SimplifiedRoute {
    let points = route.points();
    let n = points.len();

    let simplified = if n <= 2 || tolerance_m <= 0.0 || !tolerance_m.is_finite() {
        route.clone()
    } else {
        let keep = douglas_peucker_mask(route, tolerance_m);
        let kept: Vec<_> = points
            .iter()
            .zip(&keep)
            .filter_map(|(point, &k)| k.then_some(*point))
            .collect();
        Route::from_trusted(kept)
    };

    let stats = SimplificationStats {
        tolerance_m,
        original_points: n,
        simplified_points: simplified.len(),
        reduction_ratio: 1.0 - simplified.len() as f64 / n as f64,
        original_length_m: route.total_length(),
        route_stats: simplified.stats().clone(),
    };

    tracing::debug!(
        original = stats.original_points,
        simplified = stats.simplified_points,
        tolerance_m,
        "Route simplified ({:.1}% reduction)",
        stats.reduction_ratio * 100.0
    );

    SimplifiedRoute {
        route: simplified,
        stats,
    }
}

/// Compute which points survive simplification
fn douglas_peucker_mask(route: &Route, tolerance_m: f64) -> Vec<bool> {
    let frame = route.frame();
    let projected: Vec<[f64; 2]> = route
        .points()
        .iter()
        .map(|p| frame.project(p.lat, p.lon))
        .collect();

    let n = projected.len();
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack: Vec<(usize, usize)> = vec![(0, n - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let (a, b) = (projected[start], projected[end]);
        let mut max_deviation = 0.0;
        let mut max_index = start;
        for (offset, &p) in projected[start + 1..end].iter().enumerate() {
            let deviation = point_segment_distance(p, a, b);
            if deviation > max_deviation {
                max_deviation = deviation;
                max_index = start + 1 + offset;
            }
        }

        if max_deviation > tolerance_m {
            keep[max_index] = true;
            stack.push((max_index, end));
            stack.push((start, max_index));
        }
    }

    keep
}
