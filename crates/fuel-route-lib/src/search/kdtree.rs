//! Tree-based proximity search
//!
//! Stations are projected once into the route's local frame and loaded into
//! a k-d tree. Route vertices are then processed in fixed-size batches: each
//! vertex issues a planar radius query widened by half the longest route
//! segment, and every candidate is measured with great-circle distance to the
//! segments meeting at that vertex. Any point of a segment lies within half
//! its length of one of its ends, so no station near the line between two
//! vertices is missed.

use super::{Algorithm, MatchAccumulator, ProximitySearch, SearchResult};
use crate::utils::LocalFrame;
use crate::{FuelStation, Result, Route, SearchConfig};
use kiddo::{KdTree, NearestNeighbour, SquaredEuclidean};
use rayon::prelude::*;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::ops::Range;

/// Rough number of candidates a single query point yields, used for batch
/// memory estimates
const CANDIDATES_PER_POINT_ESTIMATE: usize = 16;

/// Station indices sharing one projected position
type Bucket = SmallVec<[u32; 1]>;

/// Per-search state shared by every batch
struct Query<'r> {
    route: &'r Route,
    vertices: Vec<[f64; 2]>,
    planar_radius_sq: f64,
    radius_m: f64,
}

/// K-d tree over station positions, built once and queried per route
pub struct KdTreeSearch<'a> {
    stations: &'a [FuelStation],
    frame: LocalFrame,
    tree: KdTree<f64, 2>,
    /// Tree items index into this list; identical positions are coalesced
    buckets: Vec<Bucket>,
    /// Projected position of each bucket
    positions: Vec<[f64; 2]>,
    batch_size: usize,
    parallel_batches: bool,
    batch_memory_budget_bytes: Option<usize>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<'a> KdTreeSearch<'a> {
    /// Build the index over `stations` projected into `frame`
    pub fn new(stations: &'a [FuelStation], frame: LocalFrame, config: &SearchConfig) -> Self {
        let mut by_position: HashMap<[u64; 2], usize> = HashMap::with_capacity(stations.len());
        let mut buckets: Vec<Bucket> = Vec::with_capacity(stations.len());
        let mut positions: Vec<[f64; 2]> = Vec::with_capacity(stations.len());
        let mut tree: KdTree<f64, 2> = KdTree::with_capacity(stations.len().max(1));

        for (index, station) in stations.iter().enumerate() {
            let xy = frame.project(station.lat, station.lon);
            let key = [xy[0].to_bits(), xy[1].to_bits()];
            match by_position.get(&key) {
                Some(&bucket) => buckets[bucket].push(index as u32),
                None => {
                    let bucket = buckets.len();
                    by_position.insert(key, bucket);
                    buckets.push(SmallVec::from_elem(index as u32, 1));
                    positions.push(xy);
                    tree.add(&xy, bucket as u64);
                }
            }
        }

        tracing::debug!(
            stations = stations.len(),
            tree_entries = buckets.len(),
            "Built station k-d tree"
        );

        Self {
            stations,
            frame,
            tree,
            buckets,
            positions,
            batch_size: config.batch_size.max(1),
            parallel_batches: config.parallel_batches,
            batch_memory_budget_bytes: config.batch_memory_budget_bytes,
        }
    }

    /// Override the batch size, mostly useful to compare batch layouts
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Batch size actually used, after applying the memory budget
    pub fn effective_batch_size(&self) -> usize {
        let Some(budget) = self.batch_memory_budget_bytes else {
            return self.batch_size;
        };

        let per_point = std::mem::size_of::<[f64; 2]>()
            + CANDIDATES_PER_POINT_ESTIMATE.min(self.stations.len().max(1))
                * std::mem::size_of::<NearestNeighbour<f64, u64>>();
        let requested = self.batch_size.saturating_mul(per_point);
        if requested <= budget {
            return self.batch_size;
        }

        let shrunk = (budget / per_point).max(1);
        tracing::warn!(
            requested_batch = self.batch_size,
            shrunk_batch = shrunk,
            budget_bytes = budget,
            "Batch exceeds memory budget; using more, smaller batches"
        );
        shrunk
    }

    /// Query the route vertices in `batch`, recording exact distances
    fn process_batch(&self, query: &Query<'_>, batch: Range<usize>, acc: &mut MatchAccumulator) {
        let last = query.vertices.len() - 1;
        let lone = last == 0;

        for vertex in batch {
            let segments = [
                (vertex > 0).then(|| (vertex - 1, vertex)),
                (vertex < last).then(|| (vertex, vertex + 1)),
            ];

            let candidates: Vec<NearestNeighbour<f64, u64>> = self
                .tree
                .within_unsorted::<SquaredEuclidean>(&query.vertices[vertex], query.planar_radius_sq);

            for candidate in candidates {
                let bucket = candidate.item as usize;
                let station_xy = self.positions[bucket];
                for &station_index in &self.buckets[bucket] {
                    let station = &self.stations[station_index as usize];
                    let measure = |segment| {
                        super::segment_distance(
                            &self.frame,
                            query.route,
                            &query.vertices,
                            segment,
                            station,
                            station_xy,
                        )
                    };
                    let distance = if lone {
                        measure((vertex, vertex))
                    } else {
                        segments
                            .iter()
                            .flatten()
                            .map(|&segment| measure(segment))
                            .fold(f64::INFINITY, f64::min)
                    };
                    if distance <= query.radius_m {
                        acc.offer(station_index, distance);
                    }
                }
            }
        }
    }
}

/// Planar length of the longest segment between consecutive vertices
fn longest_segment(vertices: &[[f64; 2]]) -> f64 {
    vertices
        .windows(2)
        .map(|w| (w[1][0] - w[0][0]).hypot(w[1][1] - w[0][1]))
        .fold(0.0, f64::max)
}

impl ProximitySearch for KdTreeSearch<'_> {
    fn algorithm(&self) -> Algorithm {
        Algorithm::KdTree
    }

    fn search(&self, route: &Route, radius_m: f64) -> Result<SearchResult> {
        #[cfg(feature = "profiling")]
        profiling::scope!("kdtree::search");

        super::check_radius(radius_m)?;
        if self.buckets.is_empty() {
            return Ok(MatchAccumulator::default().into_result(
                Algorithm::KdTree,
                radius_m,
                self.stations,
            ));
        }

        let vertices = super::project_route(&self.frame, route);
        let half_segment = longest_segment(&vertices) / 2.0;
        let planar_radius =
            super::planar_search_radius(&self.frame, route, radius_m) + half_segment;
        let query = Query {
            route,
            vertices,
            planar_radius_sq: planar_radius * planar_radius,
            radius_m,
        };

        let batch_size = self.effective_batch_size();
        let len = route.len();
        let batches = len.div_ceil(batch_size);
        let batch_range = |b: usize| b * batch_size..((b + 1) * batch_size).min(len);

        let acc = if self.parallel_batches {
            // Each batch fills its own accumulator; they are reduced once all
            // batches are done
            (0..batches)
                .into_par_iter()
                .map(|b| {
                    let mut local = MatchAccumulator::default();
                    self.process_batch(&query, batch_range(b), &mut local);
                    local
                })
                .reduce(MatchAccumulator::default, MatchAccumulator::merge)
        } else {
            let mut acc = MatchAccumulator::default();
            for b in 0..batches {
                self.process_batch(&query, batch_range(b), &mut acc);
            }
            acc
        };

        tracing::debug!(
            query_points = len,
            batches,
            batch_size,
            planar_radius,
            half_segment,
            matched = acc.len(),
            "K-d tree search finished"
        );

        Ok(acc.into_result(Algorithm::KdTree, radius_m, self.stations))
    }
}
