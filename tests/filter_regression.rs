//! Power Curve Filter Regression Tests
//!
//! Exercises the full filter pipeline on synthetic wind farm telemetry and
//! asserts the partition-level properties: completeness and disjointness,
//! cut-in exemption, downtime/fault classification, and acceptance-band
//! monotonicity in the z coefficient.

use rand::prelude::*;
use rand_distr::{Normal, Weibull};
use windcurve::{Column, ColumnMap, FilterConfig, PowerCurveFilter, ScadaFrame};

const RATED_POWER: f64 = 2000.0;

fn columns() -> ColumnMap {
    ColumnMap::new("turbine", "wind_speed", "power")
}

fn reference_config() -> FilterConfig {
    FilterConfig {
        cut_in_speed: 3.0,
        bin_interval: 0.5,
        z_coeff: 2.5,
        filter_cycle: 5,
    }
}

fn make_filter(config: FilterConfig) -> PowerCurveFilter {
    PowerCurveFilter::new(columns(), config).expect("valid config")
}

fn frame_from_rows(rows: &[(String, f64, f64)]) -> ScadaFrame {
    ScadaFrame::from_columns(vec![
        (
            "turbine".to_string(),
            Column::text(rows.iter().map(|r| r.0.clone())),
        ),
        (
            "wind_speed".to_string(),
            Column::numeric(rows.iter().map(|r| r.1)),
        ),
        (
            "power".to_string(),
            Column::numeric(rows.iter().map(|r| r.2)),
        ),
    ])
    .expect("valid frame")
}

/// Deterministic dense power curve cloud for one turbine, ramping to the
/// rated plateau, with small alternating jitter. Max power is ~RATED_POWER.
fn curve_rows(turbine: &str) -> Vec<(String, f64, f64)> {
    let mut rows = Vec::new();
    for tenth in 30..=140 {
        let ws = f64::from(tenth) / 10.0;
        let base = (250.0 * (ws - 3.0)).min(RATED_POWER);
        let jitter = match tenth % 3 {
            0 => 0.0,
            1 => 8.0,
            _ => -8.0,
        };
        rows.push((turbine.to_string(), ws, base + jitter));
    }
    rows
}

/// Noisy farm telemetry: Weibull winds, logistic curve, Gaussian noise,
/// sprinkled downtime and derated readings.
fn noisy_farm(seed: u64, turbines: usize, samples: usize) -> Vec<(String, f64, f64)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let wind = Weibull::new(8.0, 2.0).expect("weibull");
    let noise = Normal::new(0.0, 40.0).expect("normal");

    let mut rows = Vec::new();
    for t in 0..turbines {
        let turbine = format!("T{:02}", t + 1);
        for _ in 0..samples {
            let ws: f64 = wind.sample(&mut rng);
            let mut power =
                RATED_POWER / (1.0 + (-0.9 * (ws - 7.5)).exp()) + noise.sample(&mut rng);
            let roll: f64 = rng.gen();
            if roll < 0.04 {
                power = rng.gen::<f64>(); // stopped despite wind
            } else if roll < 0.06 {
                power *= 0.3; // derated reading
            }
            rows.push((turbine.clone(), ws, power));
        }
    }
    rows
}

#[test]
fn partition_is_complete_and_disjoint() {
    let frame = frame_from_rows(&noisy_farm(7, 3, 800));
    let (normal, abnormal) = make_filter(reference_config())
        .process(&frame)
        .expect("process");

    assert_eq!(normal.len() + abnormal.len(), frame.len());

    let mut labels: Vec<usize> = normal
        .labels()
        .iter()
        .chain(abnormal.labels().iter())
        .copied()
        .collect();
    labels.sort_unstable();
    labels.dedup();
    assert_eq!(labels.len(), frame.len(), "label sets overlap");
    assert_eq!(labels, (0..frame.len()).collect::<Vec<_>>());
}

#[test]
fn reference_scenario_two_turbines() {
    // Two turbines with healthy curves plus hand-placed probes on turbine A:
    // a sub-cut-in near-zero-power row (legitimate calm conditions) and a
    // zero-power row at high wind with a ~2000 training max (stopped or
    // faulty, certainly not normal).
    let mut rows = curve_rows("A");
    rows.extend(curve_rows("B"));

    rows.push(("A".to_string(), 1.0, 0.5));
    let calm_row = rows.len() - 1;
    rows.push(("A".to_string(), 15.0, 0.0));
    let dead_row = rows.len() - 1;
    // Deep derating at high wind: below 0.9 * max at ws > 4.5 * cut-in.
    rows.push(("A".to_string(), 15.0, 600.0));
    let derated_row = rows.len() - 1;

    let frame = frame_from_rows(&rows);
    let (normal, abnormal) = make_filter(reference_config())
        .process(&frame)
        .expect("process");

    assert!(
        normal.labels().contains(&calm_row),
        "sub-cut-in row must be normal"
    );
    assert!(
        abnormal.labels().contains(&dead_row),
        "zero power at high wind must be abnormal"
    );
    assert!(
        abnormal.labels().contains(&derated_row),
        "deep derating at high wind must be abnormal"
    );
}

#[test]
fn cut_in_exemption_holds_for_any_power() {
    let mut rows = curve_rows("A");
    // Sub-cut-in rows with wildly different power values. None are downtime
    // (wind below cut-in) and none can be fault events (wind too low), so
    // every one must come out normal.
    let probes = [(0.2, 0.0), (1.4, 0.7), (2.5, 900.0), (2.9, -3.0)];
    let first_probe = rows.len();
    for (ws, power) in probes {
        rows.push(("A".to_string(), ws, power));
    }

    let frame = frame_from_rows(&rows);
    let (normal, _) = make_filter(reference_config())
        .process(&frame)
        .expect("process");

    for (offset, probe) in probes.iter().enumerate() {
        assert!(
            normal.labels().contains(&(first_probe + offset)),
            "sub-cut-in probe {probe:?} must be normal"
        );
    }
}

#[test]
fn wider_z_band_admits_at_least_as_many() {
    let frame = frame_from_rows(&noisy_farm(21, 2, 600));
    let mut previous = 0;
    for z in [0.5, 1.0, 2.0, 2.5, 3.5, 5.0] {
        let config = FilterConfig {
            z_coeff: z,
            ..reference_config()
        };
        let (normal, _) = make_filter(config).process(&frame).expect("process");
        assert!(
            normal.len() >= previous,
            "normal count decreased from {previous} to {} at z={z}",
            normal.len()
        );
        previous = normal.len();
    }
}

#[test]
fn zero_filter_cycle_behaves_as_one() {
    let frame = frame_from_rows(&noisy_farm(3, 2, 400));

    let zero = make_filter(FilterConfig {
        filter_cycle: 0,
        ..reference_config()
    });
    assert_eq!(zero.config().filter_cycle, 1);

    let one = make_filter(FilterConfig {
        filter_cycle: 1,
        ..reference_config()
    });

    let (normal_zero, _) = zero.process(&frame).expect("process");
    let (normal_one, _) = one.process(&frame).expect("process");
    assert_eq!(normal_zero.labels(), normal_one.labels());
}

#[test]
fn turbines_are_filtered_independently() {
    // Same telemetry for T1 in both runs; adding a second turbine must not
    // change T1's classification.
    let solo = frame_from_rows(&noisy_farm(11, 1, 500));
    let mut combined_rows = noisy_farm(11, 1, 500);
    combined_rows.extend(noisy_farm(99, 1, 500).into_iter().map(|(_, ws, p)| {
        ("T02".to_string(), ws, p)
    }));
    let combined = frame_from_rows(&combined_rows);

    let filter = make_filter(reference_config());
    let (solo_normal, _) = filter.process(&solo).expect("process");
    let (combined_normal, _) = filter.process(&combined).expect("process");

    let t1_combined: Vec<usize> = combined_normal
        .labels()
        .iter()
        .copied()
        .filter(|&label| label < 500)
        .collect();
    assert_eq!(solo_normal.labels(), t1_combined.as_slice());
}
