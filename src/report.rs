//! Text Report Module
//! Renders query results as plain-text sections for the terminal.

use crate::data::{Dataset, InjuryType, Point, MINUTES_PER_HOUR};
use crate::stats::{HexLayer, InjurySummary, ViewState};
use std::io::Write;

/// Widest histogram bar, in characters
const BAR_WIDTH: usize = 40;
/// Densest hexagons listed in the density section
const TOP_HEXAGONS: usize = 5;

fn header(title: &str) -> Vec<String> {
    vec![title.to_string(), "=".repeat(title.chars().count())]
}

pub fn dataset_summary(dataset: &Dataset, source: &str, row_limit: usize) -> String {
    let mut lines = header("Vehicle Collision Analysis");
    lines.push(format!("Source:  {}", source));
    lines.push(format!(
        "Loaded:  {} crashes with coordinates (first {} source rows)",
        dataset.len(),
        row_limit
    ));
    lines.push(format!("Columns: {}", dataset.columns().join(", ")));
    lines.join("\n")
}

/// Count and bounding box of a filtered point set.
pub fn points_section(title: &str, points: &[Point]) -> String {
    let mut lines = header(title);
    lines.push(format!("{} crashes", points.len()));
    if let Some(((lat_min, lat_max), (lon_min, lon_max))) = bounding_box(points) {
        lines.push(format!(
            "Latitude {:.4} .. {:.4}, longitude {:.4} .. {:.4}",
            lat_min, lat_max, lon_min, lon_max
        ));
    }
    lines.join("\n")
}

fn bounding_box(points: &[Point]) -> Option<((f64, f64), (f64, f64))> {
    let (first, rest) = points.split_first()?;
    let init = ((first.0, first.0), (first.1, first.1));
    Some(rest.iter().fold(init, |((a, b), (c, d)), &(lat, lon)| {
        ((a.min(lat), b.max(lat)), (c.min(lon), d.max(lon)))
    }))
}

pub fn hexagon_section(hour: u32, view: Option<ViewState>, layer: &HexLayer) -> String {
    let mut lines = header(&format!(
        "Vehicle collisions between {}:00 and {}:00",
        hour,
        hour + 1
    ));
    if let Some(view) = view {
        lines.push(format!(
            "Map centre {:.4}, {:.4} (zoom {}, pitch {})",
            view.latitude, view.longitude, view.zoom, view.pitch
        ));
    }
    lines.push(format!(
        "{} hexagons of {} m radius covering {} crashes",
        layer.bins.len(),
        layer.radius_m,
        layer.total_count()
    ));
    for bin in layer.bins.iter().take(TOP_HEXAGONS) {
        lines.push(format!(
            "  {:>5} crashes at {:.4}, {:.4} (elevation {:.0})",
            bin.count,
            bin.center.0,
            bin.center.1,
            layer.elevation(bin)
        ));
    }
    lines.join("\n")
}

/// Minute-by-minute bar chart; empty minutes are skipped.
pub fn minute_histogram_section(histogram: &[u32; MINUTES_PER_HOUR], hour: u32) -> String {
    let mut lines = header(&format!(
        "Breakdown by minute between {}:00 and {}:00",
        hour,
        hour + 1
    ));
    let total: u32 = histogram.iter().sum();
    let max = histogram.iter().copied().max().unwrap_or(0);
    if total == 0 {
        lines.push("No crashes in this hour".to_string());
        return lines.join("\n");
    }
    for (minute, &count) in histogram.iter().enumerate().filter(|&(_, &c)| c > 0) {
        let width = (count as usize * BAR_WIDTH).div_ceil(max as usize);
        lines.push(format!(
            "  {:>2}:{:02} {:>5} {}",
            hour,
            minute,
            count,
            "#".repeat(width)
        ));
    }
    lines.push(format!("Total: {}", total));
    lines.join("\n")
}

pub fn top_streets_section(injury_type: InjuryType, rows: &[(String, u32)]) -> String {
    let mut lines = header(&format!(
        "Top {} dangerous streets for {}",
        rows.len(),
        injury_type.label().to_lowercase()
    ));
    if rows.is_empty() {
        lines.push("No injured records with a street name".to_string());
        return lines.join("\n");
    }
    let width = rows
        .iter()
        .map(|(street, _)| street.chars().count())
        .max()
        .unwrap_or(0)
        .max("on_street_name".len());
    lines.push(format!("  {:<width$}  {}", "on_street_name", injury_type.column()));
    for (street, count) in rows {
        lines.push(format!("  {:<width$}  {}", street, count));
    }
    lines.join("\n")
}

pub fn injury_summary_section(summaries: &[InjurySummary]) -> String {
    let mut lines = header("Injuries by affected type");
    lines.push(format!(
        "  {:<12} {:>9} {:>14} {:>8} {:>5}",
        "type", "reported", "with injuries", "total", "max"
    ));
    for s in summaries {
        lines.push(format!(
            "  {:<12} {:>9} {:>14} {:>8} {:>5}",
            s.injury_type.label(),
            s.reported,
            s.with_injuries,
            s.total_injured,
            s.max_injured
        ));
    }
    lines.join("\n")
}

/// Raw records as JSON lines.
pub fn write_raw<W: Write>(dataset: &Dataset, mut out: W) -> Result<(), serde_json::Error> {
    for record in dataset {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n").map_err(serde_json::Error::io)?;
    }
    out.flush().map_err(serde_json::Error::io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CollisionRecord;
    use crate::stats::StatsCalculator;

    fn record(street: &str) -> CollisionRecord {
        CollisionRecord {
            timestamp: None,
            latitude: 40.7,
            longitude: -73.9,
            injured_persons: Some(1),
            injured_pedestrians: Some(1),
            injured_cyclists: None,
            injured_motorists: None,
            on_street_name: Some(street.to_string()),
        }
    }

    #[test]
    fn histogram_section_lists_only_busy_minutes() {
        let mut hist = [0u32; MINUTES_PER_HOUR];
        hist[30] = 4;
        hist[45] = 2;
        let text = minute_histogram_section(&hist, 5);
        assert!(text.contains(" 5:30     4 ########################################"));
        assert!(text.contains(" 5:45     2 ####################\n"));
        assert!(text.ends_with("Total: 6"));
        assert!(!text.contains(" 5:01"));
    }

    #[test]
    fn empty_histogram_says_so() {
        let text = minute_histogram_section(&[0; MINUTES_PER_HOUR], 3);
        assert!(text.contains("between 3:00 and 4:00"));
        assert!(text.contains("No crashes in this hour"));
    }

    #[test]
    fn top_streets_table_aligns_columns() {
        let rows = vec![("Main St".to_string(), 2), ("Elm St".to_string(), 1)];
        let text = top_streets_section(InjuryType::Pedestrians, &rows);
        assert!(text.starts_with("Top 2 dangerous streets for pedestrians"));
        assert!(text.contains("  on_street_name  injured_pedestrians"));
        assert!(text.contains("  Main St         2"));
        assert!(text.contains("  Elm St          1"));
    }

    #[test]
    fn points_section_reports_bounds() {
        let text = points_section("Injured", &[(40.6, -74.0), (40.8, -73.8)]);
        assert!(text.contains("2 crashes"));
        assert!(text.contains("Latitude 40.6000 .. 40.8000"));
        assert!(!points_section("Injured", &[]).contains("Latitude"));
    }

    #[test]
    fn raw_dump_is_one_json_object_per_record() {
        let ds = Dataset::new(["latitude"], vec![record("Main St"), record("Elm St")]);
        let mut buf = Vec::new();
        write_raw(&ds, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(value["on_street_name"], "Elm St");
        assert_eq!(value["timestamp"], serde_json::Value::Null);
    }

    #[test]
    fn injury_summary_has_a_row_per_type() {
        let ds = Dataset::new(["latitude"], vec![record("Main St")]);
        let text = injury_summary_section(&StatsCalculator::injury_summaries(&ds));
        assert!(text.contains("Pedestrians"));
        assert!(text.contains("Cyclists"));
        assert!(text.contains("Motorists"));
    }
}
