//! Synthetic SCADA telemetry generator.
//!
//! Produces realistic multi-turbine wind farm telemetry for exercising the
//! power curve filter without a real export: Weibull-distributed wind speeds,
//! a logistic power curve with Gaussian sensor noise, and injected downtime
//! and fault events.
//!
//! # Usage
//! ```bash
//! simulation --turbines 4 --days 30 --seed 42 --output scada.csv
//! windcurve filter scada.csv --turbine-col turbine --windspeed-col wind_speed \
//!     --power-col power --delimiter ','
//! ```

use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeDelta};
use clap::Parser;
use rand::prelude::*;
use rand_distr::{Normal, Weibull};
use std::io::Write;
use std::path::PathBuf;

/// Weibull shape parameter typical of onshore wind regimes.
const WIND_SHAPE: f64 = 2.0;
/// Weibull scale parameter (m/s).
const WIND_SCALE: f64 = 8.0;
/// Logistic curve steepness.
const CURVE_STEEPNESS: f64 = 0.9;
/// Logistic curve midpoint (m/s).
const CURVE_MIDPOINT: f64 = 7.5;

#[derive(Parser, Debug)]
#[command(name = "scada-simulation")]
#[command(about = "Synthetic wind farm SCADA telemetry for windcurve testing")]
#[command(version)]
struct Args {
    /// Number of turbines in the farm
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u32).range(1..=64))]
    turbines: u32,

    /// Days of telemetry to generate
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u32).range(1..=366))]
    days: u32,

    /// Sampling period in minutes
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=60))]
    period_mins: u32,

    /// Rated turbine power
    #[arg(long, default_value = "2050.0")]
    rated_power: f64,

    /// Cut-in speed (m/s)
    #[arg(long, default_value = "3.0")]
    cut_in_speed: f64,

    /// Sensor noise standard deviation
    #[arg(long, default_value = "40.0")]
    noise: f64,

    /// Fraction of samples spent in downtime (stopped despite wind)
    #[arg(long, default_value = "0.03")]
    downtime_rate: f64,

    /// Fraction of samples with a derated/faulty power reading
    #[arg(long, default_value = "0.015")]
    fault_rate: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output CSV path (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Idealized power response: near zero below cut-in, logistic ramp to rated.
fn power_curve(wind_speed: f64, cut_in_speed: f64, rated_power: f64) -> f64 {
    if wind_speed < cut_in_speed {
        return 0.0;
    }
    rated_power / (1.0 + (-CURVE_STEEPNESS * (wind_speed - CURVE_MIDPOINT)).exp())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let seed = args.seed.unwrap_or_else(|| rand::rngs::OsRng.next_u64());
    let mut rng = StdRng::seed_from_u64(seed);
    let wind = Weibull::new(WIND_SCALE, WIND_SHAPE).context("wind distribution")?;
    let sensor_noise = Normal::new(0.0, args.noise).context("noise distribution")?;

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["timestamp", "turbine", "wind_speed", "power"])?;

    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .context("start date")?
        .and_hms_opt(0, 0, 0)
        .context("start time")?;
    let samples_per_turbine = u64::from(args.days) * 24 * 60 / u64::from(args.period_mins);

    for turbine_index in 0..args.turbines {
        let turbine = format!("T{:02}", turbine_index + 1);
        // Small per-turbine efficiency spread so curves differ across the farm.
        let efficiency = 0.95 + 0.1 * rng.gen::<f64>();

        for step in 0..samples_per_turbine {
            let timestamp = start + TimeDelta::minutes((step * u64::from(args.period_mins)) as i64);
            let wind_speed: f64 = wind.sample(&mut rng);

            let mut power = efficiency
                * power_curve(wind_speed, args.cut_in_speed, args.rated_power)
                + sensor_noise.sample(&mut rng);

            if rng.gen::<f64>() < args.downtime_rate {
                // Turbine stopped or curtailed: near-zero power regardless of wind.
                power = rng.gen::<f64>();
            } else if rng.gen::<f64>() < args.fault_rate {
                // Sensor fault / deep curtailment: implausibly low output.
                power *= 0.2 + 0.3 * rng.gen::<f64>();
            }

            csv.write_record([
                timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                turbine.clone(),
                format!("{wind_speed:.2}"),
                format!("{power:.2}"),
            ])?;
        }
    }

    csv.flush()?;
    eprintln!(
        "generated {} samples for {} turbines (seed {seed})",
        samples_per_turbine * u64::from(args.turbines),
        args.turbines
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_curve_respects_cut_in_and_rated() {
        assert_eq!(power_curve(1.0, 3.0, 2000.0), 0.0);
        let mid = power_curve(CURVE_MIDPOINT, 3.0, 2000.0);
        assert!((mid - 1000.0).abs() < 1e-9);
        let high = power_curve(25.0, 3.0, 2000.0);
        assert!(high > 1990.0 && high <= 2000.0);
    }
}
