//! Buffer-based proximity search
//!
//! The route line is widened into a buffer made of one capsule polygon per
//! segment. Stations are prefiltered against the buffer's bounding box with
//! an R-tree, then tested for containment against the capsules whose
//! envelopes cover them. This is the reference implementation the tree
//! search is cross-checked against.

use super::{Algorithm, MatchAccumulator, ProximitySearch, SearchResult};
use crate::utils::LocalFrame;
use crate::{FuelStation, Result, Route};
use geo::{ConvexHull, Intersects, MultiPoint, Point, Polygon};
use rstar::{AABB, Envelope, RTree, RTreeObject};

/// Number of vertices used to approximate each circular cap
const CIRCLE_SEGMENTS: usize = 32;

/// A station projected into the planar frame
#[derive(Clone, Copy, Debug)]
struct StationPoint {
    index: u32,
    xy: [f64; 2],
}

impl RTreeObject for StationPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.xy)
    }
}

/// Buffer piece around one route segment
#[derive(Clone, Debug)]
struct Capsule {
    /// Index of the segment's first vertex
    start: usize,
    /// Index of the segment's last vertex (equal to `start` for a lone point)
    end: usize,
    polygon: Polygon<f64>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for Capsule {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Buffer search over an R-tree of station points
pub struct BufferSearch<'a> {
    stations: &'a [FuelStation],
    frame: LocalFrame,
    index: RTree<StationPoint>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<'a> BufferSearch<'a> {
    /// Build the station index in `frame`
    pub fn new(stations: &'a [FuelStation], frame: LocalFrame) -> Self {
        let points: Vec<StationPoint> = stations
            .iter()
            .enumerate()
            .map(|(i, s)| StationPoint {
                index: i as u32,
                xy: frame.project(s.lat, s.lon),
            })
            .collect();

        Self {
            stations,
            frame,
            index: RTree::bulk_load(points),
        }
    }

    /// Build one capsule per segment, each covering every planar point within
    /// `width` of that segment
    fn build_capsules(vertices: &[[f64; 2]], width: f64) -> Vec<Capsule> {
        // Circumscribe the caps so the polygon never cuts inside the true arc
        let outer = width / (std::f64::consts::PI / CIRCLE_SEGMENTS as f64).cos();

        let segments: Vec<(usize, usize)> = if vertices.len() == 1 {
            vec![(0, 0)]
        } else {
            (0..vertices.len() - 1).map(|i| (i, i + 1)).collect()
        };

        segments
            .into_iter()
            .map(|(start, end)| {
                let (a, b) = (vertices[start], vertices[end]);
                let mut ring: Vec<Point<f64>> = Vec::with_capacity(CIRCLE_SEGMENTS * 2);
                for center in [a, b] {
                    for k in 0..CIRCLE_SEGMENTS {
                        let angle = std::f64::consts::TAU * k as f64 / CIRCLE_SEGMENTS as f64;
                        ring.push(Point::new(
                            center[0] + outer * angle.cos(),
                            center[1] + outer * angle.sin(),
                        ));
                    }
                }
                let polygon = MultiPoint::new(ring).convex_hull();
                let envelope = AABB::from_corners(
                    [a[0].min(b[0]) - outer, a[1].min(b[1]) - outer],
                    [a[0].max(b[0]) + outer, a[1].max(b[1]) + outer],
                );
                Capsule {
                    start,
                    end,
                    polygon,
                    envelope,
                }
            })
            .collect()
    }
}

impl ProximitySearch for BufferSearch<'_> {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Buffer
    }

    fn search(&self, route: &Route, radius_m: f64) -> Result<SearchResult> {
        #[cfg(feature = "profiling")]
        profiling::scope!("buffer::search");

        super::check_radius(radius_m)?;
        let mut acc = MatchAccumulator::default();
        if self.stations.is_empty() {
            return Ok(acc.into_result(Algorithm::Buffer, radius_m, self.stations));
        }

        let vertices = super::project_route(&self.frame, route);
        let width = super::planar_search_radius(&self.frame, route, radius_m);
        let capsules = Self::build_capsules(&vertices, width);

        let Some(buffer_bounds) = capsules
            .iter()
            .map(|c| c.envelope)
            .reduce(|acc, e| acc.merged(&e))
        else {
            return Ok(acc.into_result(Algorithm::Buffer, radius_m, self.stations));
        };
        let capsule_index = RTree::bulk_load(capsules);

        let mut prefiltered = 0usize;
        for candidate in self.index.locate_in_envelope(&buffer_bounds) {
            prefiltered += 1;
            let station = &self.stations[candidate.index as usize];
            let point = Point::new(candidate.xy[0], candidate.xy[1]);

            let mut nearest = f64::INFINITY;
            for capsule in capsule_index.locate_in_envelope_intersecting(&AABB::from_point(candidate.xy))
            {
                if capsule.polygon.intersects(&point) {
                    let d = super::segment_distance(
                        &self.frame,
                        route,
                        &vertices,
                        (capsule.start, capsule.end),
                        station,
                        candidate.xy,
                    );
                    nearest = nearest.min(d);
                }
            }

            if nearest <= radius_m {
                acc.offer(candidate.index, nearest);
            }
        }

        tracing::debug!(
            segments = capsule_index.size(),
            prefiltered,
            matched = acc.len(),
            "Buffer search finished"
        );

        Ok(acc.into_result(Algorithm::Buffer, radius_m, self.stations))
    }
}
