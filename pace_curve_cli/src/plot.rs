use std::panic;
use std::path::Path;

use anyhow::Result;
use pace_curve::{pace_to_string, BestEffortCurve};
use plotters::prelude::IntoLogRange;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};

#[derive(Clone, Copy, Debug)]
pub enum ChartKind {
    Png,
    Svg,
}

/// Renders the best-effort curve, turning backend panics into errors.
pub fn render_chart_guard(curve: &BestEffortCurve, path: &Path, kind: ChartKind) -> Result<(), String> {
    let render = || -> Result<(), String> {
        render_chart(curve, path, kind).map_err(|e| format!("plotting error: {}", e))
    };

    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| "plotting backend panicked".to_string())?
}

fn render_chart(curve: &BestEffortCurve, path: &Path, kind: ChartKind) -> Result<()> {
    let unit = curve.unit;
    let points: Vec<(f64, f64)> = curve
        .leaderboard()
        .map(|(distance_m, best)| (unit.from_meters(distance_m), best.pace))
        .collect();
    if points.is_empty() {
        return Ok(());
    }

    match kind {
        ChartKind::Png => {
            let root = BitMapBackend::new(path, (1280, 760)).into_drawing_area();
            draw_chart(root, &points, unit.label())
        }
        ChartKind::Svg => {
            let root = SVGBackend::new(path, (1280, 760)).into_drawing_area();
            draw_chart(root, &points, unit.label())
        }
    }
}

fn draw_chart<DB>(
    area: DrawingArea<DB, plotters::coord::Shift>,
    points: &[(f64, f64)],
    unit_label: &str,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let x_min = points.iter().map(|p| p.0).fold(f64::MAX, f64::min);
    let x_max = points.iter().map(|p| p.0).fold(f64::MIN, f64::max);
    let y_min = points.iter().map(|p| p.1).fold(f64::MAX, f64::min);
    let y_max = points.iter().map(|p| p.1).fold(f64::MIN, f64::max);
    // Pad so a single point or a flat curve still gets a usable range.
    let x_range = (x_min * 0.9)..(x_max * 1.1).max(x_min + 0.1);
    let y_pad = ((y_max - y_min) * 0.1).max(0.25);
    let y_range = (y_min - y_pad).max(0.0)..(y_max + y_pad);

    area.fill(&WHITE)?;
    let axis_font = FontDesc::new(FontFamily::SansSerif, 20.0, FontStyle::Normal);
    let mut chart = ChartBuilder::on(&area)
        .margin(25)
        .caption("Best effort pace", axis_font.clone())
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(x_range.log_scale(), y_range)?;

    chart
        .configure_mesh()
        .light_line_style(&TRANSPARENT)
        .x_desc(format!("Distance ({unit_label})"))
        .y_desc(format!("Pace (min/{unit_label})"))
        .x_label_formatter(&|v| format!("{:.1}", v))
        .y_label_formatter(&|v| pace_to_string(*v))
        .label_style(axis_font.color(&BLACK.mix(0.85)))
        .draw()?;

    let line = RGBColor(200, 0, 100);
    chart.draw_series(LineSeries::new(
        points.iter().copied(),
        ShapeStyle {
            color: line.to_rgba(),
            filled: false,
            stroke_width: 2,
        },
    ))?;
    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, line.filled())),
    )?;

    area.present()?;
    Ok(())
}
