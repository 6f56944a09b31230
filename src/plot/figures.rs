//! Figure drawing with the plotters bitmap backend.

use std::error::Error;
use std::ops::Range;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use super::PlotError;
use crate::analysis::{CurrentTimeSeries, HarmonicFit, TidalEllipse, TimeSeries};

type Panel<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const OBSERVED: RGBColor = RGBColor(0, 102, 204);
const MODEL: RGBColor = RGBColor(204, 51, 0);
const RESIDUAL: RGBColor = RGBColor(34, 139, 34);
const FILTERED: RGBColor = RGBColor(160, 32, 240);

/// One labelled curve in a time panel.
struct Curve<'a> {
    label: &'a str,
    points: Vec<(f64, f64)>,
    color: RGBColor,
}

/// Figure 1: absolute salinity, M2 fit and residuals.
pub fn plot_ctd_fit(path: &Path, observed: &TimeSeries, fit: &HarmonicFit) -> Result<(), PlotError> {
    if observed.is_empty() {
        return Err(PlotError::EmptySeries("absolute salinity"));
    }
    draw_ctd_fit(path, observed, fit).map_err(drawing_error)
}

/// Figure 2: U and V velocity, M2 fits and residuals.
pub fn plot_velocity_fit(
    path: &Path,
    u: &TimeSeries,
    u_fit: &HarmonicFit,
    v: &TimeSeries,
    v_fit: &HarmonicFit,
) -> Result<(), PlotError> {
    if u.is_empty() || v.is_empty() {
        return Err(PlotError::EmptySeries("velocity"));
    }
    draw_velocity_fit(path, u, u_fit, v, v_fit).map_err(drawing_error)
}

/// Figure 3: tidal current hodograph with the fitted ellipse.
///
/// Observations are drawn relative to `mean_flow` so that they share the
/// ellipse's origin.
pub fn plot_tidal_ellipse(
    path: &Path,
    currents: &CurrentTimeSeries,
    ellipse: &TidalEllipse,
    mean_flow: (f64, f64),
) -> Result<(), PlotError> {
    if currents.is_empty() {
        return Err(PlotError::EmptySeries("currents"));
    }
    draw_tidal_ellipse(path, currents, ellipse, mean_flow).map_err(drawing_error)
}

/// Figure 4: absolute salinity before and after boxcar filtering.
pub fn plot_filtering(
    path: &Path,
    raw: &TimeSeries,
    filtered: &TimeSeries,
    window_hours: f64,
) -> Result<(), PlotError> {
    if raw.is_empty() || filtered.is_empty() {
        return Err(PlotError::EmptySeries("absolute salinity"));
    }
    draw_filtering(path, raw, filtered, window_hours).map_err(drawing_error)
}

fn drawing_error(e: Box<dyn Error>) -> PlotError {
    PlotError::Drawing(e.to_string())
}

fn draw_ctd_fit(path: &Path, observed: &TimeSeries, fit: &HarmonicFit) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1200, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let (top, bottom) = root.split_vertically(480);

    let p = &fit.parameters;
    let caption = format!(
        "Absolute salinity, M2 fit: A = {:.4} g/kg, phase = {:.1} deg, C = {:.3} g/kg",
        p.amplitude,
        p.phase_degrees(),
        p.offset
    );
    time_panel(
        &top,
        &caption,
        "SA (g/kg)",
        &[
            Curve {
                label: "observed",
                points: points(observed),
                color: OBSERVED,
            },
            Curve {
                label: "M2 fit",
                points: points(&fit.fitted()),
                color: MODEL,
            },
        ],
    )?;
    time_panel(
        &bottom,
        &format!("Residuals (R² = {:.3})", fit.r_squared),
        "SA residual (g/kg)",
        &[Curve {
            label: "observed - fit",
            points: points(&fit.residuals),
            color: RESIDUAL,
        }],
    )?;

    root.present()?;
    Ok(())
}

fn draw_velocity_fit(
    path: &Path,
    u: &TimeSeries,
    u_fit: &HarmonicFit,
    v: &TimeSeries,
    v_fit: &HarmonicFit,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1600, 900)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 2));

    for (column, (name, series, fit)) in [("U", u, u_fit), ("V", v, v_fit)].into_iter().enumerate() {
        let p = &fit.parameters;
        time_panel(
            &panels[column],
            &format!(
                "{} velocity, M2 fit: A = {:.3} m/s, phase = {:.1} deg",
                name,
                p.amplitude,
                p.phase_degrees()
            ),
            &format!("{} (m/s)", name),
            &[
                Curve {
                    label: "observed",
                    points: points(series),
                    color: OBSERVED,
                },
                Curve {
                    label: "M2 fit",
                    points: points(&fit.fitted()),
                    color: MODEL,
                },
            ],
        )?;
        time_panel(
            &panels[column + 2],
            &format!("{} residuals (R² = {:.3})", name, fit.r_squared),
            &format!("{} residual (m/s)", name),
            &[Curve {
                label: "observed - fit",
                points: points(&fit.residuals),
                color: RESIDUAL,
            }],
        )?;
    }

    root.present()?;
    Ok(())
}

fn draw_tidal_ellipse(
    path: &Path,
    currents: &CurrentTimeSeries,
    ellipse: &TidalEllipse,
    mean_flow: (f64, f64),
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (900, 900)).into_drawing_area();
    root.fill(&WHITE)?;

    let (mean_u, mean_v) = mean_flow;
    let observed: Vec<(f64, f64)> = currents
        .data
        .iter()
        .map(|p| (p.u - mean_u, p.v - mean_v))
        .collect();

    // Square axes so the ellipse is not distorted
    let extent = observed
        .iter()
        .map(|&(u, v)| u.abs().max(v.abs()))
        .fold(ellipse.semi_major, f64::max);
    let extent = if extent > 0.0 { extent * 1.1 } else { 1.0 };

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!(
                "M2 tidal ellipse: major = {:.3} m/s, minor = {:.3} m/s, inclination = {:.1} deg",
                ellipse.semi_major,
                ellipse.semi_minor,
                ellipse.inclination_degrees()
            ),
            ("sans-serif", 20),
        )
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(65)
        .build_cartesian_2d(-extent..extent, -extent..extent)?;

    chart
        .configure_mesh()
        .x_desc("U - mean (m/s)")
        .y_desc("V - mean (m/s)")
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()?;

    chart
        .draw_series(
            observed
                .iter()
                .map(|&(u, v)| Circle::new((u, v), 1, OBSERVED.mix(0.4).filled())),
        )?
        .label("observed")
        .legend(|(x, y)| Circle::new((x + 10, y), 4, OBSERVED.filled()));

    let mut outline = ellipse.outline(360);
    if let Some(&first) = outline.first() {
        outline.push(first);
    }
    chart
        .draw_series(LineSeries::new(outline, MODEL.stroke_width(2)))?
        .label("M2 ellipse")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], MODEL.stroke_width(2)));

    let (s, c) = ellipse.inclination.sin_cos();
    let a = ellipse.semi_major;
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(-a * c, -a * s), (a * c, a * s)],
            BLACK.stroke_width(2),
        )))?
        .label("major axis")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2)));

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .label_font(("sans-serif", 16))
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_filtering(
    path: &Path,
    raw: &TimeSeries,
    filtered: &TimeSeries,
    window_hours: f64,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1200, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let filtered_label = format!("{:.0} h boxcar", window_hours);
    time_panel(
        &root,
        "Absolute salinity, raw and boxcar filtered",
        "SA (g/kg)",
        &[
            Curve {
                label: "raw",
                points: points(raw),
                color: OBSERVED,
            },
            Curve {
                label: &filtered_label,
                points: points(filtered),
                color: FILTERED,
            },
        ],
    )?;

    root.present()?;
    Ok(())
}

/// Line plot of one or more curves against time in days.
fn time_panel(
    area: &Panel<'_>,
    caption: &str,
    y_desc: &str,
    curves: &[Curve<'_>],
) -> Result<(), Box<dyn Error>> {
    let x_range = padded_range(curves.iter().flat_map(|c| c.points.iter().map(|p| p.0)), 0.0);
    let y_range = padded_range(curves.iter().flat_map(|c| c.points.iter().map(|p| p.1)), 0.05);

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Time (days)")
        .y_desc(y_desc)
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .light_line_style(WHITE)
        .draw()?;

    for curve in curves {
        let color = curve.color;
        chart
            .draw_series(LineSeries::new(curve.points.iter().copied(), color.stroke_width(1)))?
            .label(curve.label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .label_font(("sans-serif", 16))
        .draw()?;

    Ok(())
}

fn points(series: &TimeSeries) -> Vec<(f64, f64)> {
    series.data.iter().map(|p| (p.time, p.value)).collect()
}

/// Data range widened by `pad` of its span, never empty.
fn padded_range(values: impl Iterator<Item = f64>, pad: f64) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    let span = hi - lo;
    if span <= 0.0 {
        let half = if lo.abs() > 0.0 { lo.abs() * 0.01 } else { 0.5 };
        return (lo - half)..(hi + half);
    }
    (lo - pad * span)..(hi + pad * span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{BoxcarFilter, HarmonicFitter, HarmonicParameters};
    use tempfile::TempDir;

    fn salinity() -> TimeSeries {
        let truth = HarmonicParameters::m2(0.3, 1.0, 34.5);
        let times: Vec<f64> = (0..24 * 6).map(|i| i as f64 / 24.0).collect();
        let values: Vec<f64> = times
            .iter()
            .enumerate()
            .map(|(i, &t)| truth.evaluate(t) + 0.01 * ((i % 7) as f64 - 3.0))
            .collect();
        TimeSeries::new(&times, &values)
    }

    #[test]
    fn test_padded_range() {
        let r = padded_range([1.0, 3.0].into_iter(), 0.5);
        assert_eq!(r, 0.0..4.0);

        let r = padded_range([2.0, 2.0].into_iter(), 0.5);
        assert!(r.start < 2.0 && r.end > 2.0);

        let r = padded_range(std::iter::empty(), 0.5);
        assert_eq!(r, 0.0..1.0);
    }

    #[test]
    fn test_ctd_and_filter_figures_written() {
        let dir = TempDir::new().unwrap();
        let sa = salinity();
        let fit = HarmonicFitter::m2().fit(&sa).unwrap();
        let filtered = BoxcarFilter::new(25).unwrap().apply(&sa).unwrap();

        let fig1 = dir.path().join("fig1.png");
        plot_ctd_fit(&fig1, &sa, &fit).unwrap();
        let fig4 = dir.path().join("fig4.png");
        plot_filtering(&fig4, &sa, &filtered, 25.0).unwrap();

        assert!(std::fs::metadata(&fig1).unwrap().len() > 1000);
        assert!(std::fs::metadata(&fig4).unwrap().len() > 1000);
    }

    #[test]
    fn test_empty_series_rejected() {
        let dir = TempDir::new().unwrap();
        let sa = salinity();
        let fit = HarmonicFitter::m2().fit(&sa).unwrap();
        let empty = TimeSeries::new(&[], &[]);

        let err = plot_ctd_fit(&dir.path().join("x.png"), &empty, &fit).unwrap_err();
        assert!(matches!(err, PlotError::EmptySeries(_)));
    }
}
