//! Cross-checks between the tree and buffer searches

use fuel_route_lib::synthetic::{RoutePattern, SyntheticRoute, SyntheticStations};
use fuel_route_lib::utils::{METERS_PER_DEGREE, haversine_distance};
use fuel_route_lib::{
    Algorithm, Comparator, FuelStation, KdTreeSearch, Pipeline, ProximitySearch, RawStation,
    Route, RoutePoint, SearchConfig, StationSet, densify_route, simplify_route,
};

struct Fixture {
    config: SearchConfig,
    route: Route,
    stations: Vec<FuelStation>,
}

/// Winding route densified the way the pipeline does it, with stations
/// scattered up to three radii away
fn fixture(seed: u64) -> Fixture {
    let config = SearchConfig::default();
    let raw = Route::new(
        SyntheticRoute {
            point_count: 4_000,
            spacing_m: 30.0,
            pattern: RoutePattern::Winding,
            seed,
            ..SyntheticRoute::default()
        }
        .generate(),
    )
    .unwrap();
    let records = SyntheticStations {
        count: 3_000,
        spread_m: config.radius_m * 3.0,
        invalid_fraction: 0.0,
        seed: seed + 1,
    }
    .generate(raw.points());
    let stations = StationSet::validate(records).valid().to_vec();

    let simplified = simplify_route(&raw, config.simplify_tolerance_m);
    let route = densify_route(&simplified.route, config.effective_max_gap()).unwrap();

    Fixture {
        config,
        route,
        stations,
    }
}

#[test]
fn test_algorithms_agree() {
    for seed in [1, 2, 3] {
        let Fixture {
            config,
            route,
            stations,
        } = fixture(seed);
        let comparison = Comparator::new(&config).compare(&route, &stations).unwrap();
        let report = &comparison.report;

        assert!(report.matched.len() > 100, "seed {seed}: too few matches");
        assert!(report.only_in_tree.is_empty(), "seed {seed}: {:?}", report.only_in_tree);

        assert!(
            report.only_in_buffer.is_empty(),
            "seed {seed}: {:?}",
            report.only_in_buffer
        );
        assert!(report.divergence.is_empty());
        assert!(report.is_consistent());

        for id in &report.matched {
            let tree = comparison.tree.get(id).unwrap().distance_m;
            let buffer = comparison.buffer.get(id).unwrap().distance_m;
            assert_eq!(buffer, tree, "{id}");
        }
    }
}

#[test]
fn test_results_never_exceed_radius() {
    let Fixture {
        config,
        route,
        stations,
    } = fixture(5);
    for algorithm in Algorithm::ALL {
        let result = algorithm
            .build(&stations, route.frame(), &config)
            .search(&route, config.radius_m)
            .unwrap();
        assert!(!result.is_empty());
        for m in result.iter() {
            assert!(m.distance_m <= config.radius_m);
            let nearest_vertex = route
                .points()
                .iter()
                .map(|p| haversine_distance(p.lat, p.lon, m.station.lat, m.station.lon))
                .fold(f64::INFINITY, f64::min);
            assert!(m.distance_m <= nearest_vertex + 1e-6);
        }
    }
}

#[test]
fn test_batch_size_invariance() {
    let Fixture {
        config,
        route,
        stations,
    } = fixture(8);
    let all = route.len();
    let reference = KdTreeSearch::new(&stations, route.frame(), &config)
        .with_batch_size(all)
        .search(&route, config.radius_m)
        .unwrap();
    assert!(!reference.is_empty());

    for batch_size in [1, 10, 1000] {
        let sequential = KdTreeSearch::new(&stations, route.frame(), &config)
            .with_batch_size(batch_size)
            .search(&route, config.radius_m)
            .unwrap();
        assert_eq!(sequential, reference, "batch size {batch_size}");

        let parallel = SearchConfig {
            parallel_batches: true,
            batch_size,
            ..config.clone()
        };
        let parallel = KdTreeSearch::new(&stations, route.frame(), &parallel)
            .search(&route, config.radius_m)
            .unwrap();
        assert_eq!(parallel, reference, "parallel batch size {batch_size}");
    }
}

#[test]
fn test_boundary_station_found_by_both() {
    let route = Route::from_lat_lon(&[(10.0, 20.0), (10.0, 20.01)]).unwrap();
    let vertex = route.first();
    let station = FuelStation {
        id: "edge".to_string(),
        address: "Edge Rd".to_string(),
        lat: vertex.lat - 900.0 / METERS_PER_DEGREE,
        lon: vertex.lon,
        price: None,
    };
    let radius = haversine_distance(vertex.lat, vertex.lon, station.lat, station.lon);
    let stations = vec![station];
    let config = SearchConfig {
        radius_m: radius,
        ..SearchConfig::default()
    };

    let comparison = Comparator::new(&config).compare(&route, &stations).unwrap();
    assert!(comparison.tree.contains("edge"));
    assert!(comparison.buffer.contains("edge"));
    assert!(comparison.report.is_consistent());
}

#[test]
fn test_stations_across_antimeridian() {
    let route = Route::from_lat_lon(&[(-17.0, 179.99), (-17.0, -179.99)]).unwrap();
    let stations = vec![
        FuelStation {
            id: "west".to_string(),
            address: String::new(),
            lat: -17.001,
            lon: 179.995,
            price: None,
        },
        FuelStation {
            id: "east".to_string(),
            address: String::new(),
            lat: -16.999,
            lon: -179.995,
            price: None,
        },
    ];
    let config = SearchConfig {
        radius_m: 500.0,
        ..SearchConfig::default()
    };
    let route = densify_route(&route, config.effective_max_gap()).unwrap();
    let comparison = Comparator::new(&config).compare(&route, &stations).unwrap();
    assert_eq!(comparison.buffer.len(), 2);
    assert_eq!(comparison.tree.len(), 2);
}

#[test]
fn test_station_just_inside_radius_between_query_points() {
    let config = SearchConfig::default();
    let route = vec![RoutePoint::new(0.0, 0.0), RoutePoint::new(0.0, 0.05)];
    // ~5.6 km densified into 7 segments; the station sits off the middle of
    // the first one, further than the radius from both of its ends
    let lat = 0.98 * config.radius_m / METERS_PER_DEGREE;
    let lon = 0.05 / 14.0;
    let stations = vec![RawStation::new("s", "Edge Rd", Some(lat), Some(lon), None)];

    let output = Pipeline::new(config.clone()).run(route, stations).unwrap();
    assert_eq!(output.densified_points, 8);
    let first = haversine_distance(0.0, 0.0, lat, lon);
    assert!(first > config.radius_m);

    assert!(output.report.is_consistent(), "{:?}", output.report.divergence);
    let m = output.tree.get("s").expect("tree search should find the station");
    assert!((m.distance_m - 0.98 * config.radius_m).abs() < 1.0);
    assert_eq!(output.primary().len(), 1);
}
