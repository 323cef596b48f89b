//! Plain-text tables for the command-line output

use fuel_route_lib::utils::meters_to_miles;
use fuel_route_lib::{
    ComparisonReport, InvalidStation, PipelineOutput, RouteStats, SimplificationStats,
    StationMatch,
};
use serde::Serialize;
use std::fmt::Write;

const MIB: f64 = 1024.0 * 1024.0;

fn route_rows(out: &mut String, label: &str, stats: &RouteStats) -> std::fmt::Result {
    writeln!(out, "  {label}")?;
    writeln!(out, "    {:<24}{:>14}", "Points", stats.point_count)?;
    writeln!(
        out,
        "    {:<24}{:>11.2} km  ({:.2} mi)",
        "Total length",
        stats.total_length_km(),
        stats.total_length_miles()
    )?;
    writeln!(
        out,
        "    {:<24}{:>12.1} m",
        "Average spacing", stats.avg_spacing_m
    )?;
    writeln!(
        out,
        "    {:<24}{:>12} m",
        "Min / max spacing",
        format!("{:.1} / {:.1}", stats.min_spacing_m, stats.max_spacing_m)
    )?;
    writeln!(
        out,
        "    {:<24}{:>12.1} m",
        "Spacing std. deviation", stats.stddev_spacing_m
    )
}

/// Render the route analysis, comparison and match tables
pub fn render(output: &PipelineOutput, show: usize) -> Result<String, std::fmt::Error> {
    let mut out = String::new();

    writeln!(out, "Route analysis")?;
    route_rows(&mut out, "Original", &output.raw_stats)?;
    route_rows(&mut out, "Simplified", &output.simplified.route_stats)?;
    writeln!(
        out,
        "  Reduction {:.2}% at {:.1} m tolerance, {} query points after densification",
        output.simplified.reduction_ratio * 100.0,
        output.simplified.tolerance_m,
        output.densified_points
    )?;
    writeln!(out)?;

    writeln!(
        out,
        "Stations: {} valid, {} invalid",
        output.stations.valid().len(),
        output.stations.invalid().len()
    )?;
    writeln!(out)?;

    writeln!(out, "Comparison")?;
    writeln!(
        out,
        "  {:<10}{:>12}{:>14}{:>12}",
        "Algorithm", "Time (ms)", "Peak (MiB)", "Stations"
    )?;
    for run in &output.report.runs {
        let memory = run
            .peak_memory_bytes
            .map(|b| format!("{:.2}", b as f64 / MIB))
            .unwrap_or_else(|| "n/a".to_string());
        writeln!(
            out,
            "  {:<10}{:>12.2}{:>14}{:>12}",
            run.algorithm.label(),
            run.elapsed.as_secs_f64() * 1000.0,
            memory,
            run.station_count
        )?;
    }
    if let Some(speedup) = output.report.speedup() {
        writeln!(out, "  KDTree speedup: {speedup:.2}x")?;
    }
    writeln!(
        out,
        "  Found by both: {}  only KDTree: {}  only Buffer: {}",
        output.report.matched.len(),
        output.report.only_in_tree.len(),
        output.report.only_in_buffer.len()
    )?;
    for d in &output.report.divergence {
        writeln!(
            out,
            "  ! {} only found by {} at {:.3} mi",
            d.station_id,
            d.found_by,
            meters_to_miles(d.distance_m)
        )?;
    }
    writeln!(out)?;

    let primary = output.primary();
    let matches = primary.sorted_by_distance();
    writeln!(
        out,
        "Closest stations ({} of {} within {:.2} mi, {})",
        show.min(matches.len()),
        matches.len(),
        meters_to_miles(primary.radius_m()),
        primary.algorithm()
    )?;
    for m in matches.into_iter().take(show) {
        let price = m
            .station
            .price
            .map(|p| format!("{p:.3}"))
            .unwrap_or_else(|| "N/A".to_string());
        writeln!(
            out,
            "  {:<12}{:>9.3} mi  {:>8}  {}",
            m.station.id,
            meters_to_miles(m.distance_m),
            price,
            m.station.address
        )?;
    }

    Ok(out)
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    route: &'a RouteStats,
    simplified: &'a SimplificationStats,
    densified_points: usize,
    invalid_stations: &'a [InvalidStation],
    comparison: &'a ComparisonReport,
    closest: Vec<&'a StationMatch>,
}

/// Render the same information as [`render`] as one JSON document
pub fn render_json(output: &PipelineOutput, show: usize) -> serde_json::Result<String> {
    let mut closest = output.primary().sorted_by_distance();
    closest.truncate(show);
    serde_json::to_string_pretty(&JsonSummary {
        route: &output.raw_stats,
        simplified: &output.simplified,
        densified_points: output.densified_points,
        invalid_stations: output.stations.invalid(),
        comparison: &output.report,
        closest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuel_route_lib::{Pipeline, RawStation, RoutePoint, SearchConfig};

    #[test]
    fn test_render_lists_closest_first() {
        let route: Vec<RoutePoint> = (0..=10).map(|i| RoutePoint::new(0.0, i as f64 * 0.002)).collect();
        let stations = vec![
            RawStation::new("far", "2 Side Rd", Some(0.01), Some(0.01), None),
            RawStation::new("near", "1 Main St", Some(0.001), Some(0.01), Some(3.109)),
        ];
        let output = Pipeline::new(SearchConfig::default()).run(route, stations).unwrap();
        let text = render(&output, 5).unwrap();

        assert!(text.contains("Route analysis"));
        assert!(text.contains("Closest stations (2 of 2 within 1.00 mi, KDTree)"));
        assert!(text.contains("KDTree"));
        assert!(text.contains("Buffer"));
        let near = text.find("near").unwrap();
        let far = text.find("far ").unwrap();
        assert!(near < far);
        assert!(text.contains("3.109"));
        assert!(text.contains("N/A"));

        let json: serde_json::Value = serde_json::from_str(&render_json(&output, 1).unwrap()).unwrap();
        assert_eq!(json["closest"].as_array().unwrap().len(), 1);
        assert_eq!(json["closest"][0]["station"]["id"], "near");
        assert_eq!(json["comparison"]["runs"].as_array().unwrap().len(), 2);
    }
}
