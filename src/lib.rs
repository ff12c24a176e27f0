//! Windcurve: wind farm SCADA operational intelligence.
//!
//! Classifies wind turbine telemetry (wind speed, active power, turbine
//! identifier) into normal and abnormal operating points, and builds
//! per-turbine expected power curves from the normal subset.
//!
//! ## Architecture
//!
//! - **Binner**: fixed-ladder wind speed binning with per-bin median speed,
//!   mean power, and power standard deviation
//! - **PowerCurveFilter**: downtime/fault removal plus an iterative z-band
//!   filter, producing a total disjoint normal/abnormal partition
//! - **ExpectedPower**: per-turbine interpolants over the filtered, binned
//!   normal data with capped, clipped predictions
//! - **CSV adapter / plots**: outer surface for wind farm exports and
//!   per-turbine power curve visualization

pub mod binning;
pub mod config;
pub mod expected_power;
pub mod filter;
pub mod frame;
pub mod interpolate;
pub mod io;
pub mod viz;

// Re-export the tabular boundary
pub use frame::{Column, ScadaFrame, SchemaError};

// Re-export configuration
pub use config::{
    ColumnMap, ConfigError, EstimationMethod, FilterConfig, InterpolationKind, ModelConfig,
};

// Re-export the core pipeline
pub use binning::{bin_power_curve, BinStatistic, WindSpeedBin};
pub use expected_power::{ExpectedPower, ModelError, PowerModel, EXPECTED_POWER_COLUMN};
pub use filter::PowerCurveFilter;
pub use interpolate::{InterpolateError, Interpolator};
