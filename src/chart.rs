use crate::align::{Alignment, AxisBounds};
use crate::error::{CovidError, Result};
use crate::Metric;
use log::info;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use std::path::Path;

const MARKER_SIZE: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Svg,
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerShape {
    Circle,
    Square,
    Triangle,
    Cross,
}

/// marker and color of one country's line
#[derive(Clone, Copy)]
pub struct SeriesStyle {
    pub shape: MarkerShape,
    pub filled: bool,
    pub color: RGBColor,
}

pub const MARKERS: [(MarkerShape, bool); 7] = [
    (MarkerShape::Circle, true),
    (MarkerShape::Square, true),
    (MarkerShape::Triangle, true),
    (MarkerShape::Circle, false),
    (MarkerShape::Square, false),
    (MarkerShape::Triangle, false),
    (MarkerShape::Cross, false),
];

pub const COLORS: [RGBColor; 8] = [
    RGBColor(0, 0, 0),
    RGBColor(220, 30, 30),
    RGBColor(40, 170, 40),
    RGBColor(30, 60, 220),
    RGBColor(200, 0, 200),
    RGBColor(0, 180, 190),
    RGBColor(60, 110, 60),
    RGBColor(100, 60, 170),
];

/// Style of the series at position index, cycling through markers and colors.
/// The same input order always gives the same picture.
pub fn style_for(index: usize) -> SeriesStyle {
    let (shape, filled) = MARKERS[index % MARKERS.len()];
    SeriesStyle {
        shape,
        filled,
        color: COLORS[index % COLORS.len()],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub title: String,
    pub y_desc: String,
    /// upper cap of the y axis, otherwise 1.2 times the largest value
    pub max_case: Option<f64>,
    pub size: (u32, u32),
}

impl ChartOptions {
    pub fn new(title: &str, metric: Metric) -> ChartOptions {
        ChartOptions {
            title: title.to_string(),
            y_desc: metric.label().to_string(),
            max_case: None,
            size: (1200, 900),
        }
    }
}

/// y range from the bounds: 20% headroom over the maximum, capped by max_case
pub fn y_range(bounds: &AxisBounds, max_case: Option<f64>) -> (f64, f64) {
    let ymin = bounds.min_value;
    let headroom = bounds.max_value * 1.2;
    let ymax = match max_case {
        Some(cap) if cap < headroom => cap,
        _ => headroom,
    };
    if ymax > ymin {
        (ymin, ymax)
    } else {
        (ymin, ymin + 1.)
    }
}

/// Draws the aligned series, in their order, to an svg or png file.
/// An empty alignment is an error, there is nothing to draw.
pub fn render<P: AsRef<Path>>(
    alignment: &Alignment,
    opts: &ChartOptions,
    fout: P,
    format: ImageFormat,
) -> Result<()> {
    if alignment.is_empty() {
        return Err(CovidError::NothingToPlot(opts.title.clone()));
    }
    let path = fout.as_ref();
    match format {
        ImageFormat::Svg => draw(SVGBackend::new(path, opts.size).into_drawing_area(), alignment, opts)?,
        ImageFormat::Png => draw(BitMapBackend::new(path, opts.size).into_drawing_area(), alignment, opts)?,
    }
    info!(
        "plotted {} countries for {} to {}",
        alignment.series.len(),
        opts.title,
        path.display()
    );
    Ok(())
}

fn render_err<E: std::error::Error + Send + Sync>(e: DrawingAreaErrorKind<E>) -> CovidError {
    CovidError::Render(e.to_string())
}

fn draw<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    alignment: &Alignment,
    opts: &ChartOptions,
) -> Result<()> {
    root.fill(&WHITE).map_err(render_err)?;
    let (ymin, ymax) = y_range(&alignment.bounds, opts.max_case);
    let xmax = alignment.bounds.max_day as f64 + 1.;
    let mut chart = ChartBuilder::on(&root)
        .caption(&opts.title, ("sans-serif", 32))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(100)
        .build_cartesian_2d(0f64..xmax, ymin..ymax)
        .map_err(render_err)?;
    chart
        .configure_mesh()
        .light_line_style(&TRANSPARENT)
        .bold_line_style(RGBColor(200, 200, 200).stroke_width(1))
        .set_all_tick_mark_size(2)
        .label_style(("sans-serif", 20))
        .x_desc("days")
        .y_desc(opts.y_desc.clone())
        .x_label_formatter(&|x: &f64| format!("{:.0}", x))
        .y_label_formatter(&|y: &f64| format!("{:.0}", y))
        .draw()
        .map_err(render_err)?;

    for (i, s) in alignment.series.iter().enumerate() {
        let style = style_for(i);
        let color = style.color;
        let points: Vec<(f64, f64)> = s.points.iter().map(|p| (p.day as f64, p.value)).collect();
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))
            .map_err(render_err)?
            .label(s.country.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        draw_markers(&mut chart, &points, style)?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(("sans-serif", 18))
        .draw()
        .map_err(render_err)?;
    root.present().map_err(render_err)?;
    Ok(())
}

fn draw_markers<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    points: &[(f64, f64)],
    style: SeriesStyle,
) -> Result<()> {
    let shape_style = if style.filled {
        style.color.filled()
    } else {
        style.color.stroke_width(2)
    };
    let size = MARKER_SIZE;
    let drawn = match style.shape {
        MarkerShape::Circle => chart.draw_series(points.iter().map(|&c| Circle::new(c, size, shape_style))),
        MarkerShape::Triangle => {
            chart.draw_series(points.iter().map(|&c| TriangleMarker::new(c, size, shape_style)))
        }
        MarkerShape::Cross => chart.draw_series(points.iter().map(|&c| Cross::new(c, size, shape_style))),
        MarkerShape::Square => chart.draw_series(
            points
                .iter()
                .map(|&c| EmptyElement::at(c) + Rectangle::new([(-size, -size), (size, size)], shape_style)),
        ),
    };
    drawn.map_err(render_err)?;
    Ok(())
}
