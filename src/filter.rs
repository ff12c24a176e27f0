//! Iterative power curve filter.
//!
//! Partitions raw SCADA telemetry into normal and abnormal operating points,
//! per turbine:
//! 1. **Downtime removal** (whole dataset): near-zero power despite wind at or
//!    above cut-in means the turbine was stopped or curtailed.
//! 2. **Fault removal** (per turbine): implausibly low power at high wind
//!    speed, judged against a snapshot of the turbine's maximum power taken
//!    before any iterative refinement.
//! 3. **Iterative band filter** (per turbine): `filter_cycle` rounds of
//!    re-binning the current survivors and rejecting samples outside the
//!    `mean ± z_coeff * std` band of their bin. Sub-cut-in samples are exempt
//!    from the band test and always retained through this step. Exactly
//!    `filter_cycle` rounds run; there is no convergence check.
//!
//! Survivor row labels across all turbines form the normal subset; every
//! other original row is abnormal. The partition is exhaustive and disjoint.
//!
//! The filter is re-entrant: per-turbine work is a pure function of that
//! turbine's samples plus the read-only configuration, so turbines are
//! processed in parallel and merged back in first-appearance order.

use crate::binning::{bin_index, bin_power_curve};
use crate::config::{ColumnMap, ConfigError, FilterConfig};
use crate::frame::{ScadaFrame, SchemaError};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Downtime threshold: active power at or below this is "not producing".
const DOWNTIME_POWER_MAX: f64 = 1.0;
/// Fault removal: power below this fraction of the turbine's max power...
const FAULT_POWER_FRACTION: f64 = 0.9;
/// ...at wind speeds above this multiple of cut-in speed is a fault event.
const FAULT_SPEED_FACTOR: f64 = 4.5;

/// Power curve filter over a SCADA dataset with caller-named columns.
#[derive(Debug, Clone)]
pub struct PowerCurveFilter {
    columns: ColumnMap,
    config: FilterConfig,
}

impl PowerCurveFilter {
    /// Build a filter. The configuration is range-checked up front; a
    /// `filter_cycle` of 0 is corrected to 1 with a warning.
    pub fn new(columns: ColumnMap, config: FilterConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            columns,
            config: config.validated()?,
        })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Partition `data` into (normal, abnormal) subsets.
    ///
    /// Row labels of the two subsets exactly tile the input: every row lands
    /// in one subset and only one. The normal subset is ordered by turbine in
    /// first-appearance order with each turbine's rows in original order; the
    /// abnormal subset is in original row order.
    pub fn process(&self, data: &ScadaFrame) -> Result<(ScadaFrame, ScadaFrame), SchemaError> {
        let speeds = data.numeric(&self.columns.wind_speed)?;
        let powers = data.numeric(&self.columns.power)?;
        let turbines = data.categorical(&self.columns.turbine)?;

        // Step 1: downtime removal, turbine-agnostic.
        let cut_in = self.config.cut_in_speed;
        let no_downtime: Vec<usize> = (0..data.len())
            .filter(|&row| !(powers[row] <= DOWNTIME_POWER_MAX && speeds[row] >= cut_in))
            .collect();

        // Group the remaining rows per turbine, keeping first-appearance order.
        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
        for &row in &no_downtime {
            let turbine = turbines[row].as_str();
            groups
                .entry(turbine)
                .or_insert_with(|| {
                    order.push(turbine);
                    Vec::new()
                })
                .push(row);
        }

        // Steps 2-3 are independent per turbine.
        let survivors_per_turbine: Vec<Vec<usize>> = order
            .par_iter()
            .map(|turbine| {
                let rows = &groups[turbine];
                let kept = self.filter_turbine(rows, speeds, powers);
                debug!(
                    turbine,
                    input = rows.len(),
                    kept = kept.len(),
                    "turbine filtered"
                );
                kept
            })
            .collect();

        // Step 4: partition by original row position.
        let normal_rows: Vec<usize> = survivors_per_turbine.into_iter().flatten().collect();
        let normal_set: HashSet<usize> = normal_rows.iter().copied().collect();
        let abnormal_rows: Vec<usize> = (0..data.len())
            .filter(|row| !normal_set.contains(row))
            .collect();

        assert_eq!(
            normal_set.len(),
            normal_rows.len(),
            "turbine partitions overlap"
        );
        assert_eq!(
            normal_rows.len() + abnormal_rows.len(),
            data.len(),
            "normal/abnormal partition must tile the dataset"
        );

        Ok((data.select_rows(&normal_rows), data.select_rows(&abnormal_rows)))
    }

    /// Fault removal plus the iterative band filter for one turbine's
    /// downtime-free rows. Returns surviving row positions in input order.
    fn filter_turbine(&self, rows: &[usize], speeds: &[f64], powers: &[f64]) -> Vec<usize> {
        let cut_in = self.config.cut_in_speed;
        let interval = self.config.bin_interval;
        let z = self.config.z_coeff;

        // Step 2: fault removal against a snapshot max, taken once before
        // any iterative refinement.
        let max_power = rows
            .iter()
            .map(|&row| powers[row])
            .fold(f64::NEG_INFINITY, f64::max);
        let mut current: Vec<usize> = rows
            .iter()
            .copied()
            .filter(|&row| {
                !(powers[row] < FAULT_POWER_FRACTION * max_power
                    && speeds[row] > FAULT_SPEED_FACTOR * cut_in)
            })
            .collect();

        // Step 3: fixed number of band-filter rounds over a shrinking set.
        for _ in 0..self.config.filter_cycle {
            if current.is_empty() {
                break;
            }

            let round_speeds: Vec<f64> = current.iter().map(|&row| speeds[row]).collect();
            let round_powers: Vec<f64> = current.iter().map(|&row| powers[row]).collect();
            let stats = bin_power_curve(&round_speeds, &round_powers, interval);

            // Bin edges are multiples of the interval, so the ladder index of
            // a statistic's lower bound keys the lookup.
            let ladder_len = stats
                .iter()
                .map(|s| (s.bin.lower / interval).round() as usize + 1)
                .max()
                .unwrap_or(0);
            let mut band: Vec<Option<(f64, f64)>> = vec![None; ladder_len];
            for stat in &stats {
                let index = (stat.bin.lower / interval).round() as usize;
                let low = (stat.mean_power - z * stat.std_power).max(0.0);
                let high = (stat.mean_power + z * stat.std_power).max(0.0);
                band[index] = Some((low, high));
            }

            current.retain(|&row| {
                if speeds[row] < cut_in {
                    return true;
                }
                match bin_index(speeds[row], interval, ladder_len).and_then(|i| band[i]) {
                    Some((low, high)) => powers[row] > low && powers[row] < high,
                    // Outside every populated bin: no statistic to test
                    // against, rejected.
                    None => false,
                }
            });
        }

        current
    }
}
