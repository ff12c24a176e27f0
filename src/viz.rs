//! Per-turbine power curve plots.
//!
//! Renders one scatter plot per turbine — normal operating points in blue,
//! abnormal in orange — into a caller-supplied directory. A pure side effect
//! keyed by turbine identifier: the filename is derived deterministically
//! from the identifier and nothing is returned beyond the written paths.
//! Not part of the core filtering/prediction contract.

use crate::config::ColumnMap;
use crate::frame::{ScadaFrame, SchemaError};
use plotters::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

const NORMAL_COLOR: RGBColor = RGBColor(31, 119, 180);
const ABNORMAL_COLOR: RGBColor = RGBColor(255, 140, 0);

#[derive(Debug, Error)]
pub enum VizError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render plot for turbine '{turbine}': {message}")]
    Render { turbine: String, message: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// (wind speed, power) points per turbine, in first-appearance order.
fn points_by_turbine(
    frame: &ScadaFrame,
    columns: &ColumnMap,
    order: &mut Vec<String>,
    out: &mut HashMap<String, Vec<(f64, f64)>>,
) -> Result<(), SchemaError> {
    let speeds = frame.numeric(&columns.wind_speed)?;
    let powers = frame.numeric(&columns.power)?;
    let turbines = frame.categorical(&columns.turbine)?;
    for (row, turbine) in turbines.iter().enumerate() {
        if !out.contains_key(turbine) {
            order.push(turbine.clone());
        }
        out.entry(turbine.clone())
            .or_default()
            .push((speeds[row], powers[row]));
    }
    Ok(())
}

/// Deterministic, filesystem-safe file stem for a turbine identifier.
fn file_stem(turbine: &str) -> String {
    turbine
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Export one power curve scatter plot per turbine under `out_dir`.
///
/// Returns the written file paths in turbine order.
pub fn export_power_curve_plots(
    normal: &ScadaFrame,
    abnormal: &ScadaFrame,
    columns: &ColumnMap,
    out_dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, VizError> {
    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir).map_err(|source| VizError::CreateDir {
        path: out_dir.display().to_string(),
        source,
    })?;

    let mut order = Vec::new();
    let mut normal_points = HashMap::new();
    let mut abnormal_points = HashMap::new();
    points_by_turbine(normal, columns, &mut order, &mut normal_points)?;
    let mut abnormal_order = Vec::new();
    points_by_turbine(abnormal, columns, &mut abnormal_order, &mut abnormal_points)?;
    for turbine in abnormal_order {
        if !normal_points.contains_key(&turbine) {
            order.push(turbine);
        }
    }

    let mut written = Vec::with_capacity(order.len());
    for turbine in &order {
        let empty = Vec::new();
        let good = normal_points.get(turbine).unwrap_or(&empty);
        let bad = abnormal_points.get(turbine).unwrap_or(&empty);
        let path = out_dir.join(format!("{}_power_curve.svg", file_stem(turbine)));
        render_turbine(turbine, good, bad, &path).map_err(|message| VizError::Render {
            turbine: turbine.clone(),
            message,
        })?;
        written.push(path);
    }

    info!(
        directory = %out_dir.display(),
        turbines = written.len(),
        "exported power curve plots"
    );
    Ok(written)
}

fn render_turbine(
    turbine: &str,
    normal: &[(f64, f64)],
    abnormal: &[(f64, f64)],
    path: &Path,
) -> Result<(), String> {
    let all = normal.iter().chain(abnormal.iter());
    let finite: Vec<(f64, f64)> = all
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .copied()
        .collect();
    if finite.is_empty() {
        return Ok(());
    }

    let (mut x_max, mut y_min, mut y_max) = (f64::MIN, f64::MAX, f64::MIN);
    for &(x, y) in &finite {
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    let x_span = 0.0..(x_max * 1.05).max(1.0);
    let y_pad = ((y_max - y_min) * 0.05).max(1.0);
    let y_span = (y_min - y_pad)..(y_max + y_pad);

    let root = SVGBackend::new(path, (960, 540)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| e.to_string())?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Operational power curve for turbine {turbine}"),
            ("sans-serif", 22),
        )
        .margin(12)
        .x_label_area_size(42)
        .y_label_area_size(64)
        .build_cartesian_2d(x_span, y_span)
        .map_err(|e| e.to_string())?;

    chart
        .configure_mesh()
        .x_desc("Wind Speed (m/s)")
        .y_desc("Power")
        .draw()
        .map_err(|e| e.to_string())?;

    chart
        .draw_series(
            normal
                .iter()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|&(x, y)| Circle::new((x, y), 2, NORMAL_COLOR.filled())),
        )
        .map_err(|e| e.to_string())?
        .label("normal")
        .legend(|(x, y)| Circle::new((x, y), 3, NORMAL_COLOR.filled()));

    chart
        .draw_series(
            abnormal
                .iter()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|&(x, y)| Circle::new((x, y), 2, ABNORMAL_COLOR.filled())),
        )
        .map_err(|e| e.to_string())?
        .label("abnormal")
        .legend(|(x, y)| Circle::new((x, y), 3, ABNORMAL_COLOR.filled()));

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .draw()
        .map_err(|e| e.to_string())?;

    root.present().map_err(|e| e.to_string())?;
    Ok(())
}
