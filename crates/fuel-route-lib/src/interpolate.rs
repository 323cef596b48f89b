//! Route densification
//!
//! Inserts evenly spaced great-circle points into every gap longer than the
//! configured maximum. Shorter segments keep the tree search's widened
//! per-vertex queries small.

use crate::utils::great_circle_intermediate;
use crate::{Result, Route, RoutePoint, SearchError};

/// Densify `route` so that no two consecutive points are more than
/// `max_gap_m` meters apart
///
/// Original points are kept verbatim and in order; a gap of length `d` is
/// split into `ceil(d / max_gap_m)` equal great-circle steps.
///
/// # Errors
/// `InvalidConfig` when `max_gap_m` is not a positive finite number.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn densify_route(route: &Route, max_gap_m: f64) -> Result<Route> {
    if !max_gap_m.is_finite() || max_gap_m <= 0.0 {
        return Err(SearchError::InvalidConfig(format!(
            "maximum gap must be a positive distance, got {max_gap_m}"
        )));
    }

    let points = route.points();
    let mut inserted = 0usize;
    let estimate = (route.total_length() / max_gap_m).ceil() as usize + points.len();
    let mut dense: Vec<RoutePoint> = Vec::with_capacity(estimate);

    for pair in points.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        dense.push(from);

        let gap = from.distance_to(&to);
        if gap <= max_gap_m {
            continue;
        }

        let steps = (gap / max_gap_m).ceil() as usize;
        for step in 1..steps {
            let fraction = step as f64 / steps as f64;
            let (lat, lon) = great_circle_intermediate(from.lat, from.lon, to.lat, to.lon, fraction);
            dense.push(RoutePoint::new(lat, lon));
        }
        inserted += steps - 1;
    }
    dense.push(route.last());

    tracing::debug!(
        original = points.len(),
        inserted,
        max_gap_m,
        "Route densified"
    );

    Ok(Route::from_trusted(dense))
}
