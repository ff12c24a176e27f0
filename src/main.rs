//! Windcurve CLI.
//!
//! Front end over the library: load a wind farm SCADA export, partition it
//! into normal/abnormal operating points, or fit and apply an expected power
//! model.
//!
//! # Usage
//!
//! ```bash
//! # Partition an export; write normal.csv / abnormal.csv plus plots
//! windcurve filter scada.csv --out-dir out --plots out/images
//!
//! # Fit on one export, predict another
//! windcurve predict train.csv target.csv --output predictions.csv --kind cubic
//! ```
//!
//! Column names and the CSV delimiter are configuration (`--turbine-col`,
//! `--windspeed-col`, `--power-col`, `--delimiter`), since SCADA exports
//! rarely agree on either. `RUST_LOG` controls log verbosity.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use windcurve::io::{read_scada_csv, write_scada_csv};
use windcurve::viz::export_power_curve_plots;
use windcurve::{
    ColumnMap, ExpectedPower, FilterConfig, ModelConfig, PowerCurveFilter,
};

#[derive(Parser, Debug)]
#[command(name = "windcurve")]
#[command(about = "Wind farm SCADA power curve filtering and expected power estimation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ColumnArgs {
    /// Turbine identifier column
    #[arg(long, default_value = "Wind_turbine_name")]
    turbine_col: String,

    /// Wind speed column (m/s)
    #[arg(long, default_value = "Ws_avg")]
    windspeed_col: String,

    /// Active power column
    #[arg(long, default_value = "P_avg")]
    power_col: String,

    /// CSV field delimiter
    #[arg(long, default_value = ";")]
    delimiter: char,
}

impl ColumnArgs {
    fn column_map(&self) -> ColumnMap {
        ColumnMap::new(&self.turbine_col, &self.windspeed_col, &self.power_col)
    }

    fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            bail!("delimiter must be a single ASCII character")
        }
    }
}

#[derive(Args, Debug)]
struct ParamArgs {
    /// Optional TOML configuration file; explicit flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cut-in speed (m/s)
    #[arg(long)]
    cut_in_speed: Option<f64>,

    /// Wind speed bin width (m/s)
    #[arg(long)]
    bin_interval: Option<f64>,

    /// Z-score band multiplier
    #[arg(long)]
    z_coeff: Option<f64>,

    /// Number of filter passes
    #[arg(long)]
    filter_cycle: Option<u32>,
}

impl ParamArgs {
    /// Layer a base config (file or defaults) under the explicit flags.
    fn model_config(&self, method: Option<&str>, kind: Option<&str>) -> Result<ModelConfig> {
        let mut config = match &self.config {
            Some(path) => ModelConfig::from_toml_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => ModelConfig::default(),
        };
        let filter = &mut config.filter;
        if let Some(v) = self.cut_in_speed {
            filter.cut_in_speed = v;
        }
        if let Some(v) = self.bin_interval {
            filter.bin_interval = v;
        }
        if let Some(v) = self.z_coeff {
            filter.z_coeff = v;
        }
        if let Some(v) = self.filter_cycle {
            filter.filter_cycle = v;
        }
        if let Some(method) = method {
            config.method = method.parse()?;
        }
        if let Some(kind) = kind {
            config.kind = kind.parse()?;
        }
        Ok(config.validated()?)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Partition a SCADA export into normal and abnormal operating points
    Filter {
        /// Input SCADA CSV
        input: PathBuf,

        /// Directory for normal.csv and abnormal.csv
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,

        /// Also export one power curve plot per turbine into this directory
        #[arg(long)]
        plots: Option<PathBuf>,

        #[command(flatten)]
        columns: ColumnArgs,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Fit an expected power model and predict a target export
    Predict {
        /// Training SCADA CSV
        train: PathBuf,

        /// Target SCADA CSV to augment with expected power
        input: PathBuf,

        /// Output CSV with the expected_power column appended
        #[arg(long, default_value = "predictions.csv")]
        output: PathBuf,

        /// Estimation method: binning or autoML
        #[arg(long)]
        method: Option<String>,

        /// Interpolation kind: linear, quadratic or cubic
        #[arg(long)]
        kind: Option<String>,

        #[command(flatten)]
        columns: ColumnArgs,

        #[command(flatten)]
        params: ParamArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match Cli::parse().command {
        Command::Filter {
            input,
            out_dir,
            plots,
            columns,
            params,
        } => run_filter(&input, &out_dir, plots.as_deref(), &columns, &params),
        Command::Predict {
            train,
            input,
            output,
            method,
            kind,
            columns,
            params,
        } => run_predict(
            &train,
            &input,
            &output,
            method.as_deref(),
            kind.as_deref(),
            &columns,
            &params,
        ),
    }
}

fn run_filter(
    input: &Path,
    out_dir: &Path,
    plots: Option<&Path>,
    columns: &ColumnArgs,
    params: &ParamArgs,
) -> Result<()> {
    let delimiter = columns.delimiter_byte()?;
    let config: FilterConfig = params.model_config(None, None)?.filter;
    let data = read_scada_csv(input, delimiter)
        .with_context(|| format!("loading {}", input.display()))?;

    let filter = PowerCurveFilter::new(columns.column_map(), config)?;
    let (normal, abnormal) = filter.process(&data)?;
    info!(
        total = data.len(),
        normal = normal.len(),
        abnormal = abnormal.len(),
        "partitioned SCADA data"
    );

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    write_scada_csv(&normal, out_dir.join("normal.csv"), delimiter)?;
    write_scada_csv(&abnormal, out_dir.join("abnormal.csv"), delimiter)?;

    let summary = FilterSummary::build(&data, &normal, &abnormal, &columns.turbine_col)?;
    let summary_path = out_dir.join("summary.json");
    std::fs::write(&summary_path, serde_json::to_vec_pretty(&summary)?)
        .with_context(|| format!("writing {}", summary_path.display()))?;

    if let Some(plot_dir) = plots {
        let written = export_power_curve_plots(&normal, &abnormal, &columns.column_map(), plot_dir)?;
        info!(plots = written.len(), "wrote power curve plots");
    }
    Ok(())
}

/// Per-run partition report written next to the output subsets.
#[derive(Serialize)]
struct FilterSummary {
    total_rows: usize,
    normal_rows: usize,
    abnormal_rows: usize,
    turbines: Vec<TurbineSummary>,
}

#[derive(Serialize)]
struct TurbineSummary {
    turbine: String,
    normal_rows: usize,
    abnormal_rows: usize,
}

impl FilterSummary {
    fn build(
        data: &windcurve::ScadaFrame,
        normal: &windcurve::ScadaFrame,
        abnormal: &windcurve::ScadaFrame,
        turbine_col: &str,
    ) -> Result<Self> {
        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        for turbine in data.categorical(turbine_col)? {
            if !counts.contains_key(&turbine) {
                order.push(turbine.clone());
                counts.insert(turbine, (0, 0));
            }
        }
        for turbine in normal.categorical(turbine_col)? {
            if let Some(entry) = counts.get_mut(&turbine) {
                entry.0 += 1;
            }
        }
        for turbine in abnormal.categorical(turbine_col)? {
            if let Some(entry) = counts.get_mut(&turbine) {
                entry.1 += 1;
            }
        }
        Ok(Self {
            total_rows: data.len(),
            normal_rows: normal.len(),
            abnormal_rows: abnormal.len(),
            turbines: order
                .into_iter()
                .map(|turbine| {
                    let (normal_rows, abnormal_rows) = counts[&turbine];
                    TurbineSummary {
                        turbine,
                        normal_rows,
                        abnormal_rows,
                    }
                })
                .collect(),
        })
    }
}

fn run_predict(
    train: &Path,
    input: &Path,
    output: &Path,
    method: Option<&str>,
    kind: Option<&str>,
    columns: &ColumnArgs,
    params: &ParamArgs,
) -> Result<()> {
    let delimiter = columns.delimiter_byte()?;
    let config = params.model_config(method, kind)?;

    let training = read_scada_csv(train, delimiter)
        .with_context(|| format!("loading {}", train.display()))?;
    let target = read_scada_csv(input, delimiter)
        .with_context(|| format!("loading {}", input.display()))?;

    let model = ExpectedPower::new(columns.column_map(), config)?.fit(&training)?;
    info!(turbines = model.turbines().len(), "fitted expected power model");

    let predicted = model.predict(&target)?;
    write_scada_csv(&predicted, output, delimiter)?;
    info!(rows = predicted.len(), output = %output.display(), "wrote predictions");
    Ok(())
}
