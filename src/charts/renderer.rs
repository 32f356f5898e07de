//! Static Chart Renderer
//! Draws the dashboard views to PNG files with plotters.
//!
//! Views:
//! 1. Point map: crash positions as dots on a lon/lat plane
//! 2. Hexagon density: hexagonal bins shaded yellow to red by crash count
//! 3. Minute histogram: crashes per minute of the selected hour

use crate::data::{Point, MINUTES_PER_HOUR};
use crate::stats::HexLayer;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Failed to draw chart: {0}")]
    Draw(String),
    #[error("Failed to prepare output directory: {0}")]
    Io(#[from] std::io::Error),
}

fn draw_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Draw(e.to_string())
}

// Colors
const BAR_COLOR: RGBColor = RGBColor(52, 152, 219);
const POINT_COLOR: RGBColor = RGBColor(231, 76, 60);
const DENSITY_LOW: RGBColor = RGBColor(255, 255, 178);
const DENSITY_HIGH: RGBColor = RGBColor(189, 0, 38);

const CAPTION_FONT: (&str, u32) = ("sans-serif", 22);

// Fallback extent for an empty map
const EMPTY_EXTENT: (Range<f64>, Range<f64>) = (-1.0..1.0, -1.0..1.0);
const MIN_PAD_DEG: f64 = 0.005;

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Create the output directory (and parents) if needed.
    pub fn prepare_output_dir(dir: &Path) -> Result<(), ChartError> {
        std::fs::create_dir_all(dir)?;
        Ok(())
    }

    /// Scatter map of crash positions.
    pub fn render_point_map(
        points: &[Point],
        title: &str,
        path: &Path,
        size: (u32, u32),
    ) -> Result<(), ChartError> {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let (lat_range, lon_range) = Self::extent(points.iter().copied());
        let mut chart = ChartBuilder::on(&root)
            .caption(title, CAPTION_FONT)
            .margin(15)
            .x_label_area_size(35)
            .y_label_area_size(55)
            .build_cartesian_2d(lon_range, lat_range)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .x_desc("Longitude")
            .y_desc("Latitude")
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(
                points
                    .iter()
                    .map(|&(lat, lon)| Circle::new((lon, lat), 2, POINT_COLOR.mix(0.6).filled())),
            )
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
        Ok(())
    }

    /// Hexagon density map, denser cells drawn darker.
    pub fn render_hexagon_density(
        layer: &HexLayer,
        title: &str,
        path: &Path,
        size: (u32, u32),
    ) -> Result<(), ChartError> {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let corners: Vec<[Point; 6]> = layer.bins.iter().map(|b| layer.corners(b)).collect();
        let (lat_range, lon_range) = Self::extent(corners.iter().flatten().copied());
        let mut chart = ChartBuilder::on(&root)
            .caption(title, CAPTION_FONT)
            .margin(15)
            .x_label_area_size(35)
            .y_label_area_size(55)
            .build_cartesian_2d(lon_range, lat_range)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("Longitude")
            .y_desc("Latitude")
            .draw()
            .map_err(draw_err)?;

        let max = layer.max_count();
        chart
            .draw_series(layer.bins.iter().zip(corners.iter()).rev().map(|(bin, hex)| {
                let outline: Vec<(f64, f64)> = hex.iter().map(|&(lat, lon)| (lon, lat)).collect();
                Polygon::new(outline, Self::density_color(bin.count, max).filled())
            }))
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
        Ok(())
    }

    /// Bar chart of crashes per minute within `hour`.
    pub fn render_minute_histogram(
        histogram: &[u32; MINUTES_PER_HOUR],
        hour: u32,
        path: &Path,
        size: (u32, u32),
    ) -> Result<(), ChartError> {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let caption = format!(
            "Breakdown by minute between {}:00 and {}:00",
            hour,
            hour + 1
        );
        let mut chart = ChartBuilder::on(&root)
            .caption(caption, CAPTION_FONT)
            .margin(15)
            .x_label_area_size(35)
            .y_label_area_size(45)
            .build_cartesian_2d(
                (0u32..MINUTES_PER_HOUR as u32).into_segmented(),
                0u32..Self::histogram_y_max(histogram),
            )
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc("Minute")
            .y_desc("Crashes")
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(BAR_COLOR.filled())
                    .margin(1)
                    .data(
                        histogram
                            .iter()
                            .enumerate()
                            .map(|(minute, &count)| (minute as u32, count)),
                    ),
            )
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
        Ok(())
    }

    /// Upper bound of the histogram's y axis; never zero.
    fn histogram_y_max(histogram: &[u32]) -> u32 {
        histogram.iter().copied().max().unwrap_or(0) + 1
    }

    /// Padded latitude and longitude ranges covering every point.
    fn extent<I: Iterator<Item = Point>>(points: I) -> (Range<f64>, Range<f64>) {
        let mut lat = (f64::INFINITY, f64::NEG_INFINITY);
        let mut lon = (f64::INFINITY, f64::NEG_INFINITY);
        for (la, lo) in points {
            lat = (lat.0.min(la), lat.1.max(la));
            lon = (lon.0.min(lo), lon.1.max(lo));
        }
        if lat.0.is_infinite() || lon.0.is_infinite() {
            return EMPTY_EXTENT;
        }

        let pad = |(min, max): (f64, f64)| {
            let pad = ((max - min) * 0.05).max(MIN_PAD_DEG);
            (min - pad)..(max + pad)
        };
        (pad(lat), pad(lon))
    }

    /// Linear blend from light yellow (sparse) to dark red (densest).
    fn density_color(count: usize, max: usize) -> RGBColor {
        let t = if max == 0 {
            0.0
        } else {
            (count as f64 / max as f64).clamp(0.0, 1.0)
        };
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        RGBColor(
            lerp(DENSITY_LOW.0, DENSITY_HIGH.0),
            lerp(DENSITY_LOW.1, DENSITY_HIGH.1),
            lerp(DENSITY_LOW.2, DENSITY_HIGH.2),
        )
    }
}
