//! Route and station loading

use crate::error::{CliError, Result};
use crate::settings::Settings;
use fuel_route_lib::synthetic::{RoutePattern, SyntheticRoute, SyntheticStations};
use fuel_route_lib::{RawStation, RoutePoint};
use serde::Deserialize;
use std::io::{BufReader, Read};
use std::path::Path;

/// Station record as found in JSON exports
///
/// Accepts both short (`lat`/`lon`) and long (`latitude`/`longitude`) field
/// names. Numeric ids are accepted too. Coordinates and prices may be numbers
/// or numeric strings; anything else (`"N/A"`, `null`, ...) reads as absent
/// and is left for station validation to report.
#[derive(Debug, Deserialize)]
struct StationRecord {
    #[serde(deserialize_with = "id_from_string_or_number")]
    id: String,
    #[serde(default, alias = "name")]
    address: String,
    #[serde(default, alias = "lat", deserialize_with = "lenient_number")]
    latitude: Option<f64>,
    #[serde(default, alias = "lon", alias = "lng", deserialize_with = "lenient_number")]
    longitude: Option<f64>,
    #[serde(default, alias = "retail_price", deserialize_with = "lenient_number")]
    price: Option<f64>,
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "station id must be a string or a number, got {other}"
        ))),
    }
}

fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

impl From<StationRecord> for RawStation {
    fn from(record: StationRecord) -> Self {
        RawStation::new(
            record.id,
            record.address,
            record.latitude,
            record.longitude,
            record.price,
        )
    }
}

/// Route points from the GPX file, or a synthetic route
pub fn load_route(settings: &Settings) -> Result<Vec<RoutePoint>> {
    profiling::scope!("load_route");

    let Some(path) = &settings.route else {
        let points = SyntheticRoute {
            point_count: settings.synthetic_points,
            pattern: RoutePattern::Winding,
            seed: settings.seed,
            ..SyntheticRoute::default()
        }
        .generate();
        tracing::info!(points = points.len(), "Generated synthetic route");
        return Ok(points);
    };

    let file = open(path)?;
    let points = read_gpx_points(BufReader::new(file), path)?;
    tracing::info!(points = points.len(), path = %path.display(), "Loaded route");
    Ok(points)
}

/// Raw station records from the JSON file, or synthetic ones around `route`
pub fn load_stations(settings: &Settings, route: &[RoutePoint]) -> Result<Vec<RawStation>> {
    profiling::scope!("load_stations");

    let Some(path) = &settings.stations else {
        let records = SyntheticStations {
            count: settings.synthetic_stations,
            seed: settings.seed.wrapping_add(1),
            ..SyntheticStations::default()
        }
        .generate(route);
        tracing::info!(records = records.len(), "Generated synthetic stations");
        return Ok(records);
    };

    let file = open(path)?;
    let records = read_station_records(BufReader::new(file), path)?;
    tracing::info!(records = records.len(), path = %path.display(), "Loaded stations");
    Ok(records)
}

fn open(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Track points in file order, falling back to route points
fn read_gpx_points(reader: impl Read, path: &Path) -> Result<Vec<RoutePoint>> {
    let gpx = gpx::read(reader).map_err(|source| CliError::Gpx {
        path: path.to_path_buf(),
        source,
    })?;

    let mut points: Vec<RoutePoint> = gpx
        .tracks
        .iter()
        .flat_map(|track| &track.segments)
        .flat_map(|segment| &segment.points)
        .map(|waypoint| {
            let p = waypoint.point();
            RoutePoint::new(p.y(), p.x())
        })
        .collect();

    if points.is_empty() {
        points = gpx
            .routes
            .iter()
            .flat_map(|route| &route.points)
            .map(|waypoint| {
                let p = waypoint.point();
                RoutePoint::new(p.y(), p.x())
            })
            .collect();
    }

    if points.is_empty() {
        return Err(CliError::EmptyGpx(path.to_path_buf()));
    }
    Ok(points)
}

/// Parse a JSON array of station records
///
/// Only a document that is not an array fails. A record that cannot be read
/// at all (no id, not an object) is kept as a station without coordinates so
/// it still shows up among the invalid stations.
fn read_station_records(reader: impl Read, path: &Path) -> Result<Vec<RawStation>> {
    let values: Vec<serde_json::Value> =
        serde_json::from_reader(reader).map_err(|source| CliError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let records = values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match StationRecord::deserialize(&value) {
            Ok(record) => RawStation::from(record),
            Err(e) => {
                tracing::warn!(index, error = %e, "Unreadable station record");
                RawStation::new(format!("#{index}"), String::new(), None, None, None)
            }
        })
        .collect();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuel_route_lib::{InvalidReason, StationSet};

    const TRACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <trkseg>
      <trkpt lat="39.7392" lon="-104.9903"></trkpt>
      <trkpt lat="39.7400" lon="-104.9800"></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="39.7410" lon="-104.9700"></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    const ROUTE_ONLY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <rte>
    <rtept lat="10.0" lon="20.0"></rtept>
    <rtept lat="10.5" lon="20.5"></rtept>
  </rte>
</gpx>"#;

    #[test]
    fn test_gpx_track_points_in_order() {
        let points = read_gpx_points(TRACK.as_bytes(), Path::new("track.gpx")).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], RoutePoint::new(39.7392, -104.9903));
        assert_eq!(points[2], RoutePoint::new(39.7410, -104.9700));
    }

    #[test]
    fn test_gpx_route_points_fallback() {
        let points = read_gpx_points(ROUTE_ONLY.as_bytes(), Path::new("route.gpx")).unwrap();
        assert_eq!(points, vec![RoutePoint::new(10.0, 20.0), RoutePoint::new(10.5, 20.5)]);
    }

    #[test]
    fn test_empty_gpx_rejected() {
        let empty = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1"></gpx>"#;
        assert!(matches!(
            read_gpx_points(empty.as_bytes(), Path::new("empty.gpx")),
            Err(CliError::EmptyGpx(_))
        ));
    }

    #[test]
    fn test_station_records_with_aliases() {
        let json = r#"[
            {"id": "A1", "address": "1 Main St", "latitude": 40.0, "longitude": -74.0, "price": 3.45},
            {"id": 7, "name": "Truck Stop", "lat": 41.0, "lng": -75.0},
            {"id": "B2", "address": "Nowhere"}
        ]"#;
        let records = read_station_records(json.as_bytes(), Path::new("s.json")).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].price, Some(3.45));
        assert_eq!(records[1].id, "7");
        assert_eq!(records[1].address, "Truck Stop");
        assert_eq!(records[1].longitude, Some(-75.0));
        assert_eq!(records[2].latitude, None);
    }

    #[test]
    fn test_bad_fields_do_not_drop_other_records() {
        let json = r#"[
            {"id": "ok", "address": "1 Main St", "lat": 40.0, "lon": -74.0, "price": "N/A"},
            {"id": "text", "address": "2 Main St", "lat": "N/A", "lon": -74.1},
            {"id": "quoted", "lat": "40.1", "lon": " -74.2 ", "price": "3.19"},
            {"address": "no id", "lat": 40.3, "lon": -74.3},
            17
        ]"#;
        let records = read_station_records(json.as_bytes(), Path::new("s.json")).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].latitude, Some(40.0));
        assert_eq!(records[0].price, None);
        assert_eq!(records[1].latitude, None);
        assert_eq!(records[1].longitude, Some(-74.1));
        assert_eq!(records[2].latitude, Some(40.1));
        assert_eq!(records[2].longitude, Some(-74.2));
        assert_eq!(records[2].price, Some(3.19));
        assert_eq!(records[3].id, "#3");
        assert_eq!(records[4].id, "#4");

        let stations = StationSet::validate(records);
        assert_eq!(stations.valid().len(), 2);
        let invalid: Vec<(&str, InvalidReason)> = stations
            .invalid()
            .iter()
            .map(|i| (i.record.id.as_str(), i.reason))
            .collect();
        assert_eq!(
            invalid,
            vec![
                ("text", InvalidReason::MissingCoordinate),
                ("#3", InvalidReason::MissingCoordinate),
                ("#4", InvalidReason::MissingCoordinate),
            ]
        );
    }

    #[test]
    fn test_malformed_json_reports_path() {
        let err = read_station_records("{".as_bytes(), Path::new("bad.json")).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }
}
