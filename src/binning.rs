//! Wind speed binning.
//!
//! Groups (wind speed, power) samples into fixed-width wind speed intervals
//! and computes per-bin statistics: median wind speed, mean power, and sample
//! standard deviation of power. These statistics drive both the iterative
//! filter's acceptance band and the expected power interpolants.
//!
//! The bin ladder is deliberately oversized: `2 * floor(max_speed) + 1` bins
//! of width `interval` tiled from 0, independent of where the samples
//! actually sit. The spare high-speed bins stay empty and are dropped from
//! the output, but the fixed edges keep bin membership consistent across the
//! filter's iterative rounds. Do not tighten the ladder to the observed data.

use serde::Serialize;
use statrs::statistics::{Data, OrderStatistics, Statistics};

/// Half-open wind speed interval `[lower, upper)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindSpeedBin {
    pub lower: f64,
    pub upper: f64,
}

impl WindSpeedBin {
    /// Value containment: half-open on the upper edge.
    pub fn contains(&self, speed: f64) -> bool {
        speed >= self.lower && speed < self.upper
    }
}

/// Statistics of one non-empty wind speed bin.
#[derive(Debug, Clone, Serialize)]
pub struct BinStatistic {
    pub bin: WindSpeedBin,
    /// Median of the raw wind speeds that fell in the bin.
    pub median_wind_speed: f64,
    /// Mean of the members' active power.
    pub mean_power: f64,
    /// Sample standard deviation (ddof = 1) of the members' active power.
    /// 0 for single-member bins. This convention feeds the z-band and must
    /// stay in lockstep with regression expectations.
    pub std_power: f64,
}

/// Generate the fixed bin ladder for a turbine whose maximum observed wind
/// speed is `max_speed`: bins `[interval*k, interval*(k+1))` for
/// `k = 0 ..= 2*floor(max_speed)`. A max speed that truncates to 0 or below
/// yields the single degenerate bin `[0, interval)`.
pub fn bin_ladder(max_speed: f64, interval: f64) -> Vec<WindSpeedBin> {
    let top = if max_speed.is_finite() {
        max_speed.floor().max(0.0) as usize
    } else {
        0
    };
    (0..=2 * top)
        .map(|k| WindSpeedBin {
            lower: interval * k as f64,
            upper: interval * (k + 1) as f64,
        })
        .collect()
}

/// Ladder index of the bin containing `speed`, or `None` when the speed falls
/// outside every bin (negative noise, or beyond the ladder top).
pub fn bin_index(speed: f64, interval: f64, ladder_len: usize) -> Option<usize> {
    if !speed.is_finite() || speed < 0.0 {
        return None;
    }
    let index = (speed / interval).floor() as usize;
    (index < ladder_len).then_some(index)
}

/// Bin a turbine's samples and compute per-bin statistics.
///
/// Returns one row per non-empty bin, ordered by bin lower bound. Samples
/// outside the ladder contribute to no bin. `speeds` and `powers` are
/// parallel slices.
pub fn bin_power_curve(speeds: &[f64], powers: &[f64], interval: f64) -> Vec<BinStatistic> {
    debug_assert_eq!(speeds.len(), powers.len());
    if speeds.is_empty() {
        return Vec::new();
    }

    let max_speed = speeds.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let ladder = bin_ladder(max_speed, interval);

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); ladder.len()];
    for (row, &speed) in speeds.iter().enumerate() {
        if let Some(index) = bin_index(speed, interval, ladder.len()) {
            members[index].push(row);
        }
    }

    ladder
        .iter()
        .zip(members)
        .filter(|(_, rows)| !rows.is_empty())
        .map(|(bin, rows)| {
            let bin_speeds: Vec<f64> = rows.iter().map(|&r| speeds[r]).collect();
            let bin_powers: Vec<f64> = rows.iter().map(|&r| powers[r]).collect();

            let median_wind_speed = Data::new(bin_speeds).median();
            let mean_power = Statistics::mean(&bin_powers);
            let std_power = if bin_powers.len() < 2 {
                0.0
            } else {
                let sd = Statistics::std_dev(&bin_powers);
                if sd.is_nan() {
                    0.0
                } else {
                    sd
                }
            };

            BinStatistic {
                bin: *bin,
                median_wind_speed,
                mean_power,
                std_power,
            }
        })
        .collect()
}
