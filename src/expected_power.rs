//! Expected power estimation from filtered SCADA telemetry.
//!
//! `ExpectedPower` is the unfit configuration holder; [`ExpectedPower::fit`]
//! runs the power curve filter over the training data, re-bins each turbine's
//! normal subset, and produces an immutable [`PowerModel`] holding one
//! interpolant and one power cap per turbine. Refitting builds a fresh model;
//! nothing is incremental.
//!
//! Predictions are clipped to `[0, cap]` per turbine: expected power is never
//! negative and never exceeds the turbine's observed training ceiling, which
//! bounds interpolation and extrapolation overshoot.

use crate::binning::bin_power_curve;
use crate::config::{ColumnMap, ConfigError, EstimationMethod, ModelConfig};
use crate::filter::PowerCurveFilter;
use crate::frame::{ScadaFrame, SchemaError};
use crate::interpolate::{InterpolateError, Interpolator};
use rayon::prelude::*;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

/// Name of the numeric column `predict` appends to its input.
pub const EXPECTED_POWER_COLUMN: &str = "expected_power";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Interpolate(#[from] InterpolateError),

    #[error("turbine '{0}' was not seen during fit")]
    UnknownTurbine(String),
}

/// Unfit expected power estimator: configuration plus column names.
#[derive(Debug, Clone)]
pub struct ExpectedPower {
    columns: ColumnMap,
    config: ModelConfig,
}

/// A fitted per-turbine expected power curve.
#[derive(Debug, Clone)]
struct TurbineCurve {
    interpolator: Interpolator,
    /// Rounded maximum of the training bin-mean powers.
    cap: f64,
}

/// Fitted model: per-turbine interpolants and caps, written once by `fit`
/// and only read by `predict`.
#[derive(Debug, Clone)]
pub struct PowerModel {
    columns: ColumnMap,
    curves: HashMap<String, TurbineCurve>,
}

impl ExpectedPower {
    pub fn new(columns: ColumnMap, config: ModelConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            columns,
            config: config.validated()?,
        })
    }

    /// Fit per-turbine expected power curves on `training`.
    ///
    /// Runs the power curve filter, keeps the normal subset, re-bins it per
    /// turbine, and fits an interpolant over (bin median wind speed, bin mean
    /// power). A non-binning estimation method falls back to binning with a
    /// logged notice; callers always get a model.
    pub fn fit(&self, training: &ScadaFrame) -> Result<PowerModel, ModelError> {
        if self.config.method != EstimationMethod::Binning {
            warn!(
                method = %self.config.method,
                "estimation method is not implemented, falling back to binning"
            );
        }

        let filter = PowerCurveFilter::new(self.columns.clone(), self.config.filter.clone())?;
        let (normal, _) = filter.process(training)?;

        let speeds = normal.numeric(&self.columns.wind_speed)?;
        let powers = normal.numeric(&self.columns.power)?;
        let turbines = normal.categorical(&self.columns.turbine)?;

        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
        for (row, turbine) in turbines.iter().enumerate() {
            groups
                .entry(turbine.as_str())
                .or_insert_with(|| {
                    order.push(turbine.as_str());
                    Vec::new()
                })
                .push(row);
        }

        let interval = self.config.filter.bin_interval;
        let kind = self.config.kind;
        let fitted: Vec<Option<(String, TurbineCurve)>> = order
            .par_iter()
            .map(|turbine| {
                let rows = &groups[turbine];
                let turbine_speeds: Vec<f64> = rows.iter().map(|&r| speeds[r]).collect();
                let turbine_powers: Vec<f64> = rows.iter().map(|&r| powers[r]).collect();

                let stats = bin_power_curve(&turbine_speeds, &turbine_powers, interval);
                if stats.is_empty() {
                    warn!(
                        turbine,
                        rows = rows.len(),
                        "no populated wind speed bins, turbine left out of the model"
                    );
                    return Ok(None);
                }

                let xs: Vec<f64> = stats.iter().map(|s| s.median_wind_speed).collect();
                let ys: Vec<f64> = stats.iter().map(|s| s.mean_power).collect();
                let cap = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max).round();

                let interpolator = Interpolator::new(&xs, &ys, kind)?;
                Ok(Some(((*turbine).to_string(), TurbineCurve { interpolator, cap })))
            })
            .collect::<Result<_, ModelError>>()?;

        Ok(PowerModel {
            columns: self.columns.clone(),
            curves: fitted.into_iter().flatten().collect(),
        })
    }
}

impl PowerModel {
    /// Turbine identifiers seen during fit, sorted.
    pub fn turbines(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.curves.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Training power cap for a turbine.
    pub fn cap(&self, turbine: &str) -> Option<f64> {
        self.curves.get(turbine).map(|c| c.cap)
    }

    /// Predict expected power for every row of `data`.
    ///
    /// Returns the input frame with one appended numeric column
    /// ([`EXPECTED_POWER_COLUMN`]); existing columns, row order, and row
    /// labels are untouched. Predicting for a turbine identifier absent from
    /// the fitted model is an error.
    pub fn predict(&self, data: &ScadaFrame) -> Result<ScadaFrame, ModelError> {
        let speeds = data.numeric(&self.columns.wind_speed)?;
        let turbines = data.categorical(&self.columns.turbine)?;

        let expected: Vec<f64> = turbines
            .iter()
            .zip(speeds.iter())
            .map(|(turbine, &speed)| {
                let curve = self
                    .curves
                    .get(turbine)
                    .ok_or_else(|| ModelError::UnknownTurbine(turbine.clone()))?;
                let raw = curve.interpolator.eval(speed);
                Ok(raw.max(0.0).min(curve.cap.max(0.0)))
            })
            .collect::<Result<_, ModelError>>()?;

        Ok(data.append_numeric(EXPECTED_POWER_COLUMN, expected)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilterConfig, InterpolationKind};
    use crate::frame::Column;

    fn make_frame(rows: &[(&str, f64, f64)]) -> ScadaFrame {
        ScadaFrame::from_columns(vec![
            ("unit".to_string(), Column::text(rows.iter().map(|r| r.0))),
            ("ws".to_string(), Column::numeric(rows.iter().map(|r| r.1))),
            ("kw".to_string(), Column::numeric(rows.iter().map(|r| r.2))),
        ])
        .expect("valid test frame")
    }

    fn columns() -> ColumnMap {
        ColumnMap::new("unit", "ws", "kw")
    }

    /// Dense, low-noise samples along a simple ramp curve.
    fn training_rows(turbine: &str) -> Vec<(String, f64, f64)> {
        let mut rows = Vec::new();
        for tenth in 31..=124 {
            let ws = f64::from(tenth) / 10.0;
            let power = (200.0 * (ws - 3.0)).min(1500.0);
            rows.push((turbine.to_string(), ws, power + 4.0));
            rows.push((turbine.to_string(), ws, power - 4.0));
        }
        rows
    }

    fn fit_model(method: EstimationMethod) -> PowerModel {
        let rows = training_rows("T7");
        let refs: Vec<(&str, f64, f64)> = rows.iter().map(|r| (r.0.as_str(), r.1, r.2)).collect();
        let frame = make_frame(&refs);
        let config = ModelConfig {
            filter: FilterConfig {
                z_coeff: 2.5,
                ..FilterConfig::default()
            },
            method,
            kind: InterpolationKind::Linear,
        };
        ExpectedPower::new(columns(), config)
            .expect("valid config")
            .fit(&frame)
            .expect("fit")
    }

    #[test]
    fn predictions_are_clipped_to_cap() {
        let model = fit_model(EstimationMethod::Binning);
        let cap = model.cap("T7").expect("fitted turbine");
        assert!(cap > 0.0);

        // Extrapolation far past the training range must stay within bounds.
        let probe = make_frame(&[("T7", 0.1, 0.0), ("T7", 30.0, 0.0)]);
        let predicted = model.predict(&probe).expect("predict");
        for &value in predicted.numeric(EXPECTED_POWER_COLUMN).expect("column") {
            assert!(value >= 0.0);
            assert!(value <= cap);
        }
    }

    #[test]
    fn predict_preserves_rows_and_columns() {
        let model = fit_model(EstimationMethod::Binning);
        let probe = make_frame(&[("T7", 5.0, 123.0), ("T7", 6.0, 456.0)]);
        let predicted = model.predict(&probe).expect("predict");

        assert_eq!(predicted.len(), probe.len());
        assert_eq!(predicted.labels(), probe.labels());
        assert_eq!(predicted.numeric("kw").expect("kw"), probe.numeric("kw").expect("kw"));
        assert_eq!(
            predicted.column_names().count(),
            probe.column_names().count() + 1
        );
    }

    #[test]
    fn unknown_turbine_is_an_error() {
        let model = fit_model(EstimationMethod::Binning);
        let probe = make_frame(&[("T99", 5.0, 0.0)]);
        assert!(matches!(
            model.predict(&probe),
            Err(ModelError::UnknownTurbine(name)) if name == "T99"
        ));
    }

    #[test]
    fn automl_falls_back_to_binning() {
        let binning = fit_model(EstimationMethod::Binning);
        let automl = fit_model(EstimationMethod::AutoMl);

        let probe = make_frame(&[("T7", 4.2, 0.0), ("T7", 7.7, 0.0), ("T7", 11.3, 0.0)]);
        let a = binning.predict(&probe).expect("predict");
        let b = automl.predict(&probe).expect("predict");
        assert_eq!(
            a.numeric(EXPECTED_POWER_COLUMN).expect("column"),
            b.numeric(EXPECTED_POWER_COLUMN).expect("column")
        );
        assert_eq!(binning.cap("T7"), automl.cap("T7"));
    }
}
