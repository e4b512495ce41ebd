use plotters::prelude::*;
use std::fs::create_dir_all;
use std::path::Path;

use crate::error::{GpwError, Result};
use crate::mos_model::physics::surface_potential::UsVgPoint;
use crate::simulation::SimulationResult;

const SIZE: (u32, u32) = (800, 600);

fn plot_err<E: std::fmt::Display>(e: E) -> GpwError {
    GpwError::Plot(e.to_string())
}

/// (min, max) of finite values, padded by 5% of the span.
pub fn value_range<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return None;
    }
    let pad = if hi > lo { 0.05 * (hi - lo) } else { 0.5 * lo.abs().max(1.0) };
    Some((lo - pad, hi + pad))
}

pub fn plot_gpw<P: AsRef<Path>>(path: P, result: &SimulationResult) -> Result<()> {
    let gp_qw = result.gp_qw();
    let (y_min, y_max) = value_range(gp_qw.iter().copied())
        .ok_or_else(|| GpwError::Plot("no data to plot".to_owned()))?;
    let f_min = result.frequencies[0];
    let f_max = result.frequencies[result.frequencies.len() - 1].max(f_min * 10.0);

    let root = BitMapBackend::new(path.as_ref(), SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d((f_min..f_max).log_scale(), y_min.min(0.0)..y_max)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_desc("f [Hz]")
        .y_desc("Gp/qw [cm^-2 eV^-1]")
        .axis_desc_style(("sans-serif", 15))
        .draw()
        .map_err(plot_err)?;

    for (i, level) in result.levels.iter().enumerate() {
        let style = Palette99::pick(i).stroke_width(2);
        chart
            .draw_series(LineSeries::new(
                result
                    .frequencies
                    .iter()
                    .zip(gp_qw.row(i).iter())
                    .map(|(&f, &g)| (f, g)),
                style,
            ))
            .map_err(plot_err)?
            .label(format!("Et = {:.2} eV", level.et))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;
    root.present().map_err(plot_err)?;

    Ok(())
}

pub fn plot_usvg<P: AsRef<Path>>(path: P, points: &[UsVgPoint]) -> Result<()> {
    let (x_min, x_max) = value_range(points.iter().map(|p| p.vg))
        .ok_or_else(|| GpwError::Plot("no data to plot".to_owned()))?;
    let (y_min, y_max) = value_range(points.iter().map(|p| p.us))
        .ok_or_else(|| GpwError::Plot("no data to plot".to_owned()))?;

    let root = BitMapBackend::new(path.as_ref(), SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_desc("Vg [V]")
        .y_desc("us")
        .axis_desc_style(("sans-serif", 15))
        .draw()
        .map_err(plot_err)?;
    chart
        .draw_series(LineSeries::new(points.iter().map(|p| (p.vg, p.us)), &BLUE))
        .map_err(plot_err)?;
    chart
        .draw_series(
            points
                .iter()
                .map(|p| Circle::new((p.vg, p.us), 2, RED.filled())),
        )
        .map_err(plot_err)?;
    root.present().map_err(plot_err)?;

    Ok(())
}

/// Writes `gpw.png` and `usvg.png` into `dir`.
pub fn plot_all<P: AsRef<Path>>(dir: P, result: &SimulationResult) -> Result<()> {
    let dir = dir.as_ref();
    create_dir_all(dir)?;
    plot_gpw(dir.join("gpw.png"), result)?;
    plot_usvg(dir.join("usvg.png"), &result.usvg)?;
    Ok(())
}

#[test]
fn test_value_range() {
    assert_eq!(value_range(vec![]), None);
    assert_eq!(value_range(vec![f64::NAN]), None);
    let (lo, hi) = value_range(vec![1.0, 3.0, f64::INFINITY, 2.0]).unwrap();
    assert!((lo - 0.9).abs() < 1e-12);
    assert!((hi - 3.1).abs() < 1e-12);
    let (lo, hi) = value_range(vec![2.0]).unwrap();
    assert!(lo < 2.0 && hi > 2.0);
}
