//! Filter and model configuration.
//!
//! All knobs are constructor-time configuration: callers build a
//! [`FilterConfig`]/[`ModelConfig`] (or load one from a TOML file) and hand it
//! to [`crate::filter::PowerCurveFilter`] / [`crate::expected_power::ExpectedPower`].
//! Defaults match the established filtering parameters for 10-minute SCADA
//! telemetry.
//!
//! Validation separates two classes of problems:
//! - nonsensical values (non-positive bin width, negative speeds/coefficients)
//!   are fatal [`ConfigError`]s,
//! - a `filter_cycle` of 0 is corrected to 1 with a logged warning, since the
//!   iterative filter needs at least one pass to mean anything.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("bin_interval must be positive, got {0}")]
    NonPositiveBinInterval(f64),

    #[error("cut_in_speed must be non-negative, got {0}")]
    NegativeCutInSpeed(f64),

    #[error("z_coeff must be non-negative, got {0}")]
    NegativeZCoeff(f64),

    #[error("unsupported interpolation kind: '{0}' (expected linear, quadratic or cubic)")]
    UnknownInterpolationKind(String),

    #[error("unsupported estimation method: '{0}' (expected binning or autoML)")]
    UnknownEstimationMethod(String),

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Names of the three required telemetry columns. The names are caller
/// configuration, not fixed strings: SCADA exports disagree wildly
/// ("Wind_turbine_name"/"Ws_avg"/"P_avg", "unit"/"ws"/"kw", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    /// Unique turbine identifier column.
    pub turbine: String,
    /// Wind speed column (m/s).
    pub wind_speed: String,
    /// Active power column.
    pub power: String,
}

impl ColumnMap {
    pub fn new(
        turbine: impl Into<String>,
        wind_speed: impl Into<String>,
        power: impl Into<String>,
    ) -> Self {
        Self {
            turbine: turbine.into(),
            wind_speed: wind_speed.into(),
            power: power.into(),
        }
    }
}

/// Parameters of the iterative power curve filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Cut-in speed of the turbines (m/s). Below it, near-zero power is
    /// expected and exempt from band rejection.
    pub cut_in_speed: f64,
    /// Wind speed bin width (m/s).
    pub bin_interval: f64,
    /// Z-score multiplier defining the acceptance band around each bin's
    /// mean power.
    pub z_coeff: f64,
    /// Number of filter passes. Fixed iteration count, no convergence check.
    pub filter_cycle: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            cut_in_speed: 3.0,
            bin_interval: 0.5,
            z_coeff: 2.0,
            filter_cycle: 5,
        }
    }
}

impl FilterConfig {
    /// Range-check the configuration. A `filter_cycle` of 0 is corrected to 1
    /// with a warning rather than rejected.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if !(self.bin_interval > 0.0) {
            return Err(ConfigError::NonPositiveBinInterval(self.bin_interval));
        }
        if !(self.cut_in_speed >= 0.0) {
            return Err(ConfigError::NegativeCutInSpeed(self.cut_in_speed));
        }
        if !(self.z_coeff >= 0.0) {
            return Err(ConfigError::NegativeZCoeff(self.z_coeff));
        }
        if self.filter_cycle == 0 {
            warn!("filter_cycle cannot be less than 1, corrected to 1");
            self.filter_cycle = 1;
        }
        Ok(self)
    }
}

/// Expected power estimation method.
///
/// Only binning is implemented. `AutoMl` is an accepted configuration that
/// falls back to binning with a logged notice, so callers always get a result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimationMethod {
    #[default]
    Binning,
    #[serde(rename = "autoML", alias = "automl")]
    AutoMl,
}

impl fmt::Display for EstimationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binning => write!(f, "binning"),
            Self::AutoMl => write!(f, "autoML"),
        }
    }
}

impl FromStr for EstimationMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binning" => Ok(Self::Binning),
            "automl" => Ok(Self::AutoMl),
            _ => Err(ConfigError::UnknownEstimationMethod(s.to_string())),
        }
    }
}

/// Interpolation order for the per-turbine expected power function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationKind {
    /// Piecewise linear.
    #[default]
    Linear,
    /// Second-order spline.
    Quadratic,
    /// Third-order (natural cubic) spline.
    Cubic,
}

impl fmt::Display for InterpolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Quadratic => write!(f, "quadratic"),
            Self::Cubic => write!(f, "cubic"),
        }
    }
}

impl FromStr for InterpolationKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "quadratic" => Ok(Self::Quadratic),
            "cubic" => Ok(Self::Cubic),
            _ => Err(ConfigError::UnknownInterpolationKind(s.to_string())),
        }
    }
}

/// Full configuration of the expected power model: the filter parameters plus
/// the estimation method and interpolation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    #[serde(flatten)]
    pub filter: FilterConfig,
    pub method: EstimationMethod,
    pub kind: InterpolationKind,
}

impl ModelConfig {
    pub fn validated(self) -> Result<Self, ConfigError> {
        Ok(Self {
            filter: self.filter.validated()?,
            ..self
        })
    }

    /// Load a model configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validated()
    }
}
