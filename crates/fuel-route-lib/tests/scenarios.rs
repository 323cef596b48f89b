//! End-to-end scenarios through the full pipeline

use fuel_route_lib::synthetic::{RoutePattern, SyntheticRoute};
use fuel_route_lib::utils::METERS_PER_DEGREE;
use fuel_route_lib::{
    InvalidReason, Pipeline, RawStation, Route, RoutePoint, SearchConfig, SearchError, Stage,
    simplify_route,
};

fn km_to_deg(km: f64) -> f64 {
    km * 1000.0 / METERS_PER_DEGREE
}

/// Straight 4 km route along the equator sampled every kilometer
fn equator_route() -> Vec<RoutePoint> {
    (0..5).map(|i| RoutePoint::new(0.0, km_to_deg(i as f64))).collect()
}

fn midpoint_station() -> Vec<RawStation> {
    vec![RawStation::new(
        "mid",
        "Halfway Fuel",
        Some(km_to_deg(0.5)),
        Some(km_to_deg(2.0)),
        Some(3.29),
    )]
}

#[test]
fn test_scenario_a_station_within_radius() {
    let config = SearchConfig {
        radius_m: 1000.0,
        ..SearchConfig::default()
    };
    let output = Pipeline::new(config)
        .run(equator_route(), midpoint_station())
        .unwrap();

    for result in [&output.tree, &output.buffer] {
        assert_eq!(
            result.ids().into_iter().collect::<Vec<_>>(),
            vec!["mid"],
            "{} result",
            result.algorithm()
        );
    }
    let buffer_distance = output.buffer.get("mid").unwrap().distance_m;
    assert!((buffer_distance - 500.0).abs() < 0.01, "got {buffer_distance}");
    assert!(output.report.is_consistent());
}

#[test]
fn test_scenario_a_station_outside_radius() {
    let config = SearchConfig {
        radius_m: 400.0,
        ..SearchConfig::default()
    };
    let output = Pipeline::new(config)
        .run(equator_route(), midpoint_station())
        .unwrap();

    assert!(output.tree.is_empty());
    assert!(output.buffer.is_empty());
    assert!(output.report.is_consistent());
}

#[test]
fn test_scenario_b_near_collinear_route_collapses() {
    let points = SyntheticRoute {
        origin: RoutePoint::new(0.0, 10.0),
        point_count: 200_000,
        spacing_m: 1.0,
        pattern: RoutePattern::Straight,
        jitter_m: 0.05,
        seed: 11,
    }
    .generate();
    let route = Route::new(points).unwrap();

    let simplified = simplify_route(&route, SearchConfig::default().simplify_tolerance_m);

    assert!(
        simplified.stats.simplified_points * 100 < route.len(),
        "kept {} of {} points",
        simplified.stats.simplified_points,
        route.len()
    );
    let change = (simplified.route.total_length() - route.total_length()).abs() / route.total_length();
    assert!(change < 0.01, "length changed by {:.4}%", change * 100.0);
    assert_eq!(simplified.route.first(), route.first());
    assert_eq!(simplified.route.last(), route.last());
}

#[test]
fn test_invalid_stations_are_reported_not_searched() {
    let stations = vec![
        RawStation::new("ok", "1 Good St", Some(km_to_deg(0.2)), Some(km_to_deg(1.0)), None),
        RawStation::new("no-lat", "2 Bad St", None, Some(km_to_deg(1.0)), None),
        RawStation::new("nan", "3 Bad St", Some(f64::NAN), Some(km_to_deg(1.0)), None),
        RawStation::new("north", "4 Bad St", Some(91.0), Some(0.0), None),
        RawStation::new("east", "5 Bad St", Some(0.0), Some(181.0), None),
        RawStation::new("ok", "6 Copy St", Some(km_to_deg(0.1)), Some(km_to_deg(1.0)), None),
    ];
    let output = Pipeline::new(SearchConfig::default())
        .run(equator_route(), stations)
        .unwrap();

    assert_eq!(output.stations.total(), 6);
    assert_eq!(output.stations.valid().len(), 1);
    let reasons: Vec<(&str, InvalidReason)> = output
        .stations
        .invalid()
        .iter()
        .map(|s| (s.record.id.as_str(), s.reason))
        .collect();
    assert_eq!(
        reasons,
        vec![
            ("no-lat", InvalidReason::MissingCoordinate),
            ("nan", InvalidReason::NonFiniteCoordinate),
            ("north", InvalidReason::LatitudeOutOfRange),
            ("east", InvalidReason::LongitudeOutOfRange),
            ("ok", InvalidReason::DuplicateId),
        ]
    );

    // The first "ok" record wins and is the only one searched
    let found = output.primary().get("ok").unwrap();
    assert_eq!(found.station.address, "1 Good St");
    assert_eq!(output.buffer.len(), 1);
}

#[test]
fn test_failure_names_the_stage() {
    let err = Pipeline::new(SearchConfig::default())
        .run(vec![RoutePoint::new(0.0, 0.0), RoutePoint::new(f64::NAN, 0.0)], Vec::new())
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Loaded));
    match err {
        SearchError::Stage { source, .. } => {
            assert!(matches!(*source, SearchError::InvalidRoute { index: 1, .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }

    let config = SearchConfig {
        radius_m: 0.0,
        max_gap_m: Some(-1.0),
        ..SearchConfig::default()
    };
    let err = Pipeline::new(config)
        .run(equator_route(), midpoint_station())
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Loaded));
}
