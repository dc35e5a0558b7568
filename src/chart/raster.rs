//! Off-screen chart rendering with plotters.
//!
//! Charts are drawn into an in-memory RGB buffer. The same raster is embedded
//! in the PDF report and written out by "Save chart PNG".

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;

use super::{Bin, BoxSummary, ChartData, Series, Slice};
use crate::color::ColorMap;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const CAPTION_FONT: (&str, u32) = ("sans-serif", 20);
const LABEL_FONT: (&str, u32) = ("sans-serif", 14);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid chart size {0}x{1}")]
    EmptyCanvas(u32, u32),
    #[error("chart drawing failed: {0}")]
    Draw(String),
    #[error("could not write chart image: {0}")]
    Image(#[from] image::ImageError),
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

/// A rendered chart: tightly packed 8-bit RGB rows, top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterChart {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RasterChart {
    /// Plain white canvas.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![255; width as usize * height as usize * 3],
        }
    }

    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        image::save_buffer_with_format(
            path,
            &self.pixels,
            self.width,
            self.height,
            image::ExtendedColorType::Rgb8,
            image::ImageFormat::Png,
        )?;
        log::info!("Chart saved to {}", path.display());
        Ok(())
    }
}

/// Draw `chart` into a `width` x `height` raster.
pub fn render(chart: &ChartData, width: u32, height: u32) -> Result<RasterChart, RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::EmptyCanvas(width, height));
    }
    let mut raster = RasterChart::blank(width, height);
    {
        let root = BitMapBackend::with_buffer(&mut raster.pixels, (width, height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let caption = chart.kind().label();
        match chart {
            ChartData::Bar {
                x_label,
                y_label,
                bars,
            } => draw_bars(&root, caption, x_label, y_label, bars)?,
            ChartData::Line { series } => draw_lines(&root, caption, series)?,
            ChartData::Pie { column, slices } => draw_pie(&root, column, slices)?,
            ChartData::Histogram { column, bins } => draw_histogram(&root, caption, column, bins)?,
            ChartData::Scatter {
                x_label,
                y_label,
                points,
            } => draw_scatter(&root, caption, x_label, y_label, points)?,
            ChartData::Boxplot { column, summary } => draw_boxplot(&root, caption, column, summary)?,
        }
        root.present().map_err(draw_err)?;
    }
    Ok(raster)
}

// ---------------------------------------------------------------------------
// Per-kind drawing
// ---------------------------------------------------------------------------

fn rgb(c: [u8; 3]) -> RGBColor {
    RGBColor(c[0], c[1], c[2])
}

/// Padded `(lo, hi)` over the given values; never an empty range.
fn span(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    if lo == hi {
        return (lo - 0.5, hi + 0.5);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

fn draw_bars(
    root: &Area,
    caption: &str,
    x_label: &str,
    y_label: &str,
    bars: &[(String, f64)],
) -> Result<(), RenderError> {
    let n = bars.len().max(1) as i32;
    let (lo, hi) = span(bars.iter().map(|b| b.1).chain([0.0]));
    let mut chart = ChartBuilder::on(root)
        .caption(caption, CAPTION_FONT)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n).into_segmented(), lo..hi)
        .map_err(draw_err)?;

    let label_of = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) => bars
            .get(*i as usize)
            .map(|b| b.0.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len().max(1))
        .x_label_formatter(&label_of)
        .x_desc(x_label)
        .y_desc(y_label)
        .draw()
        .map_err(draw_err)?;

    let colors = ColorMap::new(bars.iter().map(|b| b.0.clone()));
    chart
        .draw_series(bars.iter().enumerate().map(|(i, (label, value))| {
            let i = i as i32;
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *value)],
                rgb(colors.rgb_for(label)).filled(),
            );
            bar.set_margin(0, 0, 6, 6);
            bar
        }))
        .map_err(draw_err)?;
    Ok(())
}

fn draw_lines(root: &Area, caption: &str, series: &[Series]) -> Result<(), RenderError> {
    let all = || series.iter().flat_map(|s| s.points.iter());
    let (x_lo, x_hi) = span(all().map(|p| p[0]));
    let (y_lo, y_hi) = span(all().map(|p| p[1]));
    let mut chart = ChartBuilder::on(root)
        .caption(caption, CAPTION_FONT)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
        .map_err(draw_err)?;
    chart
        .configure_mesh()
        .x_desc("row")
        .draw()
        .map_err(draw_err)?;

    let colors = ColorMap::new(series.iter().map(|s| s.name.clone()));
    for s in series {
        let color = rgb(colors.rgb_for(&s.name));
        chart
            .draw_series(LineSeries::new(s.points.iter().map(|p| (p[0], p[1])), color.stroke_width(2)))
            .map_err(draw_err)?
            .label(s.name.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(draw_err)?;
    Ok(())
}

fn draw_pie(root: &Area, column: &str, slices: &[Slice]) -> Result<(), RenderError> {
    let area = root.titled(column, CAPTION_FONT).map_err(draw_err)?;
    let (w, h) = area.dim_in_pixel();
    let center = (w as f64 / 2.0, h as f64 / 2.0);
    let radius = (w.min(h) as f64) * 0.38;
    let colors = ColorMap::new(slices.iter().map(|s| s.label.clone()));

    let mut start = 0.0_f64;
    for slice in slices {
        let sweep = slice.fraction * std::f64::consts::TAU;
        let steps = ((sweep / std::f64::consts::TAU) * 120.0).ceil().max(2.0) as usize;
        let at = |angle: f64, r: f64| {
            (
                (center.0 + r * angle.cos()).round() as i32,
                (center.1 - r * angle.sin()).round() as i32,
            )
        };
        let mut points = vec![at(0.0, 0.0)];
        points.extend((0..=steps).map(|k| at(start + sweep * k as f64 / steps as f64, radius)));
        area.draw(&Polygon::new(points, rgb(colors.rgb_for(&slice.label)).filled()))
            .map_err(draw_err)?;

        let mid = start + sweep / 2.0;
        area.draw(&Text::new(
            format!("{} ({})", slice.label, slice.percent_label()),
            at(mid, radius * 1.12),
            LABEL_FONT.into_font(),
        ))
        .map_err(draw_err)?;
        start += sweep;
    }
    Ok(())
}

fn draw_histogram(root: &Area, caption: &str, column: &str, bins: &[Bin]) -> Result<(), RenderError> {
    let x_lo = bins.first().map(|b| b.start).unwrap_or(0.0);
    let x_hi = bins.last().map(|b| b.end).unwrap_or(1.0);
    let y_hi = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1) as f64 * 1.1;
    let mut chart = ChartBuilder::on(root)
        .caption(caption, CAPTION_FONT)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x_lo..x_hi, 0.0..y_hi)
        .map_err(draw_err)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(column)
        .y_desc("frequency")
        .draw()
        .map_err(draw_err)?;

    let fill = rgb(crate::color::generate_rgb(1)[0]);
    chart
        .draw_series(bins.iter().map(|b| {
            Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], fill.filled())
        }))
        .map_err(draw_err)?;
    chart
        .draw_series(bins.iter().map(|b| {
            Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], BLACK.stroke_width(1))
        }))
        .map_err(draw_err)?;
    Ok(())
}

fn draw_scatter(
    root: &Area,
    caption: &str,
    x_label: &str,
    y_label: &str,
    points: &[[f64; 2]],
) -> Result<(), RenderError> {
    let (x_lo, x_hi) = span(points.iter().map(|p| p[0]));
    let (y_lo, y_hi) = span(points.iter().map(|p| p[1]));
    let mut chart = ChartBuilder::on(root)
        .caption(caption, CAPTION_FONT)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
        .map_err(draw_err)?;
    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .draw()
        .map_err(draw_err)?;

    let color = rgb(crate::color::generate_rgb(1)[0]);
    chart
        .draw_series(points.iter().map(|p| Circle::new((p[0], p[1]), 3, color.filled())))
        .map_err(draw_err)?;
    Ok(())
}

fn draw_boxplot(
    root: &Area,
    caption: &str,
    column: &str,
    b: &BoxSummary,
) -> Result<(), RenderError> {
    let (y_lo, y_hi) = span(
        [b.whisker_low, b.whisker_high, b.q1, b.q3]
            .into_iter()
            .chain(b.fliers.iter().copied()),
    );
    let mut chart = ChartBuilder::on(root)
        .caption(caption, CAPTION_FONT)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(-1.0..1.0, y_lo..y_hi)
        .map_err(draw_err)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(3)
        .x_label_formatter(&|x: &f64| {
            if x.abs() < 1e-9 {
                column.to_string()
            } else {
                String::new()
            }
        })
        .draw()
        .map_err(draw_err)?;

    let body = rgb(crate::color::generate_rgb(1)[0]);
    chart
        .draw_series([Rectangle::new([(-0.3, b.q1), (0.3, b.q3)], body.mix(0.4).filled())])
        .map_err(draw_err)?;
    let line = BLACK.stroke_width(2);
    let segments = [
        [(-0.3, b.q1), (0.3, b.q1)],
        [(-0.3, b.q3), (0.3, b.q3)],
        [(-0.3, b.q1), (-0.3, b.q3)],
        [(0.3, b.q1), (0.3, b.q3)],
        [(-0.3, b.median), (0.3, b.median)],
        [(0.0, b.q3), (0.0, b.whisker_high)],
        [(0.0, b.q1), (0.0, b.whisker_low)],
        [(-0.15, b.whisker_high), (0.15, b.whisker_high)],
        [(-0.15, b.whisker_low), (0.15, b.whisker_low)],
    ];
    chart
        .draw_series(segments.into_iter().map(|s| PathElement::new(s.to_vec(), line)))
        .map_err(draw_err)?;
    chart
        .draw_series(b.fliers.iter().map(|&v| Circle::new((0.0, v), 4, BLACK.stroke_width(1))))
        .map_err(draw_err)?;
    Ok(())
}
