//! CSV ingestion and export for SCADA telemetry tables.
//!
//! Loads a delimited SCADA export into a [`ScadaFrame`], inferring per-column
//! types: a column where every non-empty field parses as `f64` becomes
//! numeric (empty fields become NaN), anything else stays text. Wind farm
//! exports disagree on delimiters, so the delimiter is a parameter rather
//! than a guess.

use crate::frame::{Column, ScadaFrame, SchemaError};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no header row")]
    MissingHeader { path: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Load a delimited file into a frame. Row labels are file row positions.
pub fn read_scada_csv(path: impl AsRef<Path>, delimiter: u8) -> Result<ScadaFrame, CsvError> {
    let path = path.as_ref();
    let path_str = path.display().to_string();
    let wrap = |source: csv::Error| CsvError::Read {
        path: path_str.clone(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(false)
        .from_path(path)
        .map_err(wrap)?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(wrap)?
        .iter()
        .map(ToString::to_string)
        .collect();
    if headers.is_empty() {
        return Err(CsvError::MissingHeader {
            path: path_str.clone(),
        });
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(wrap)?;
        for (column, field) in cells.iter_mut().zip(record.iter()) {
            column.push(field.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| (name, infer_column(values)))
        .collect();
    let frame = ScadaFrame::from_columns(columns)?;

    info!(
        path = %path_str,
        rows = frame.len(),
        columns = frame.columns().len(),
        "loaded SCADA CSV"
    );
    Ok(frame)
}

/// Write a frame back out as a delimited file.
pub fn write_scada_csv(
    frame: &ScadaFrame,
    path: impl AsRef<Path>,
    delimiter: u8,
) -> Result<(), CsvError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let wrap = |source: csv::Error| CsvError::Write {
        path: display.clone(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(wrap)?;

    writer
        .write_record(frame.column_names())
        .map_err(wrap)?;
    for row in 0..frame.len() {
        let record: Vec<String> = frame
            .columns()
            .iter()
            .map(|(_, column)| column.cell_to_string(row))
            .collect();
        writer.write_record(&record).map_err(wrap)?;
    }
    writer.flush().map_err(|source| CsvError::Write {
        path: display,
        source: source.into(),
    })?;
    Ok(())
}

/// Numeric if every non-empty field parses as f64, text otherwise.
fn infer_column(values: Vec<String>) -> Column {
    let numeric = values
        .iter()
        .all(|v| v.trim().is_empty() || v.trim().parse::<f64>().is_ok());
    if numeric && values.iter().any(|v| !v.trim().is_empty()) {
        Column::Numeric(
            values
                .iter()
                .map(|v| v.trim().parse::<f64>().unwrap_or(f64::NAN))
                .collect(),
        )
    } else {
        Column::Text(values)
    }
}
