//! Utility functions for distances, unit conversions and the local planar frame

/// Mean Earth radius in meters used by every great-circle computation
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters in one statute mile
pub const METERS_PER_MILE: f64 = 1609.34;

/// Meters spanned by one degree of latitude on the reference sphere
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

/// Smallest cosine of latitude accepted by the planar frame (about 89.99994°)
const MIN_COS_LAT: f64 = 1e-6;

/// Convert miles to meters
#[inline]
pub fn miles_to_meters(miles: f64) -> f64 {
    miles * METERS_PER_MILE
}

/// Convert meters to miles
#[inline]
pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

/// Convert an angular tolerance in degrees to meters along a meridian
///
/// `0.0002°` is roughly 22 m.
#[inline]
pub fn degrees_to_meters(degrees: f64) -> f64 {
    degrees * METERS_PER_DEGREE
}

/// Great-circle distance between two WGS84 positions in meters (Haversine)
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());

    EARTH_RADIUS_M * c
}

/// Point at `fraction` of the way along the great circle from the first to the second position
///
/// Returns `(lat, lon)` in degrees. `fraction` is expected in `[0, 1]`.
pub fn great_circle_intermediate(
    lat1: f64,
    lon1: f64,
    lat2: f64,
    lon2: f64,
    fraction: f64,
) -> (f64, f64) {
    let angular = haversine_distance(lat1, lon1, lat2, lon2) / EARTH_RADIUS_M;
    if angular < 1e-12 {
        return (lat1, lon1);
    }

    let (phi1, lambda1) = (lat1.to_radians(), lon1.to_radians());
    let (phi2, lambda2) = (lat2.to_radians(), lon2.to_radians());

    let sin_angular = angular.sin();
    let a = ((1.0 - fraction) * angular).sin() / sin_angular;
    let b = (fraction * angular).sin() / sin_angular;

    let x = a * phi1.cos() * lambda1.cos() + b * phi2.cos() * lambda2.cos();
    let y = a * phi1.cos() * lambda1.sin() + b * phi2.cos() * lambda2.sin();
    let z = a * phi1.sin() + b * phi2.sin();

    let lat = z.atan2((x * x + y * y).sqrt());
    let lon = y.atan2(x);
    (lat.to_degrees(), lon.to_degrees())
}

/// Wrap a longitude difference into `[-180, 180)`
#[inline]
pub fn wrap_longitude_delta(delta: f64) -> f64 {
    (delta + 180.0).rem_euclid(360.0) - 180.0
}

/// Check that a latitude/longitude pair is finite and inside geographic bounds
#[inline]
pub fn is_valid_wgs84(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

/// Equirectangular projection centred on a reference position
///
/// Coordinates are meters east (`x`) and north (`y`) of the origin. East-west
/// distances are scaled by the cosine of the origin latitude, so Euclidean
/// distances approximate ground distance near that latitude only.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalFrame {
    origin_lat: f64,
    origin_lon: f64,
    cos_lat: f64,
}

impl LocalFrame {
    /// Create a frame centred on the given position
    pub fn new(origin_lat: f64, origin_lon: f64) -> Self {
        Self {
            origin_lat,
            origin_lon,
            cos_lat: origin_lat.to_radians().cos().max(MIN_COS_LAT),
        }
    }

    /// Create a frame centred on the mean position of `(lat, lon)` pairs
    ///
    /// Longitudes are averaged relative to the first position so routes that
    /// cross the antimeridian get a sensible centre.
    pub fn from_positions<I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = positions.into_iter();
        let (first_lat, first_lon) = iter.next()?;

        let mut count = 1.0;
        let mut sum_lat = first_lat;
        let mut sum_dlon = 0.0;
        for (lat, lon) in iter {
            sum_lat += lat;
            sum_dlon += wrap_longitude_delta(lon - first_lon);
            count += 1.0;
        }

        let mean_lon = wrap_longitude_delta(first_lon + sum_dlon / count);
        Some(Self::new(sum_lat / count, mean_lon))
    }

    /// Latitude the frame is scaled for
    #[inline]
    pub fn origin_lat(&self) -> f64 {
        self.origin_lat
    }

    /// Longitude of the frame origin
    #[inline]
    pub fn origin_lon(&self) -> f64 {
        self.origin_lon
    }

    /// Project a WGS84 position to planar meters
    #[inline]
    pub fn project(&self, lat: f64, lon: f64) -> [f64; 2] {
        let dlon = wrap_longitude_delta(lon - self.origin_lon);
        [
            dlon.to_radians() * EARTH_RADIUS_M * self.cos_lat,
            (lat - self.origin_lat).to_radians() * EARTH_RADIUS_M,
        ]
    }

    /// Map planar meters back to a WGS84 `(lat, lon)` position
    #[inline]
    pub fn unproject(&self, xy: [f64; 2]) -> (f64, f64) {
        let lat = self.origin_lat + (xy[1] / EARTH_RADIUS_M).to_degrees();
        let lon = wrap_longitude_delta(
            self.origin_lon + (xy[0] / (EARTH_RADIUS_M * self.cos_lat)).to_degrees(),
        );
        (lat, lon)
    }

    /// Upper bound of planar distance over ground distance for points whose
    /// latitude lies in `[min_lat, max_lat]`
    ///
    /// The east-west axis is stretched by `cos(origin) / cos(lat)`, which is
    /// largest at the latitude furthest from the equator. Never below `1.0`.
    pub fn max_stretch(&self, min_lat: f64, max_lat: f64) -> f64 {
        let extreme = min_lat.abs().max(max_lat.abs()).min(90.0);
        let cos_extreme = extreme.to_radians().cos().max(MIN_COS_LAT);
        (self.cos_lat / cos_extreme).max(1.0)
    }
}

/// Distance from `p` to the segment `a`-`b` in planar coordinates
#[inline]
pub fn point_segment_distance(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let closest = closest_point_on_segment(p, a, b);
    let dx = p[0] - closest[0];
    let dy = p[1] - closest[1];
    (dx * dx + dy * dy).sqrt()
}

/// Closest point to `p` on the segment `a`-`b` in planar coordinates
#[inline]
pub fn closest_point_on_segment(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    let abx = b[0] - a[0];
    let aby = b[1] - a[1];
    let len_sq = abx * abx + aby * aby;
    if len_sq == 0.0 {
        return a;
    }

    let t = (((p[0] - a[0]) * abx + (p[1] - a[1]) * aby) / len_sq).clamp(0.0, 1.0);
    [a[0] + t * abx, a[1] + t * aby]
}
