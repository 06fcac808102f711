use std::{
    fs::{self, File, OpenOptions},
    io::{Read, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{
    time::{DateTime, Duration},
    timeseries::{DataFrame, DataPoint},
    unit::{DegreeCelsius, SwitchState, WattPerSquareMeter},
};
use crate::features::{FeaturesTable, RawSignals, align};
use crate::model::{ParameterVector, PredictionRow};
use crate::optimizer::Method;

const DATE_COLUMN: &str = "date";

//flat files appended by the ingestion side
#[derive(Debug, Clone, Deserialize)]
pub struct DataSources {
    pub interior: PathBuf,
    pub exterior: PathBuf,
    pub switch: PathBuf,
    pub weather: PathBuf,
}

pub fn load_signals(sources: &DataSources) -> anyhow::Result<RawSignals> {
    Ok(RawSignals {
        interior: read_file(&sources.interior, "temperature", parse_temperature)?,
        exterior: read_file(&sources.exterior, "temperature", parse_temperature)?,
        switch: read_file(&sources.switch, "state", |v| v.parse::<SwitchState>().ok())?,
        radiation: read_file(&sources.weather, "direct_radiation", |v| {
            parse_finite(v).map(WattPerSquareMeter)
        })?,
    })
}

pub fn load_features(sources: &DataSources, interval: Duration) -> anyhow::Result<FeaturesTable> {
    let features = align(&load_signals(sources)?, interval)?;
    tracing::info!("Loaded {} feature rows on a {} grid", features.len(), interval);
    Ok(features)
}

fn parse_finite(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_temperature(value: &str) -> Option<DegreeCelsius> {
    parse_finite(value).map(DegreeCelsius)
}

fn read_file<T>(path: &Path, column: &str, parse: impl Fn(&str) -> Option<T>) -> anyhow::Result<DataFrame<T>> {
    let file = File::open(path).with_context(|| format!("Error opening {}", path.display()))?;
    read_series(file, column, parse).with_context(|| format!("Error reading {}", path.display()))
}

//rows with an unparseable date or value are skipped
pub fn read_series<T>(
    reader: impl Read,
    column: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> anyhow::Result<DataFrame<T>> {
    let mut reader = ::csv::ReaderBuilder::new()
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers().context("Error reading CSV header")?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("Missing column {name}"))
    };
    let (date_index, value_index) = (position(DATE_COLUMN)?, position(column)?);

    let mut points = vec![];
    let mut skipped = 0;

    for record in reader.records() {
        let record = record.context("Error reading CSV record")?;

        let point = record
            .get(date_index)
            .and_then(|date| DateTime::parse(date).ok())
            .zip(record.get(value_index).and_then(&parse))
            .map(|(timestamp, value)| DataPoint::new(value, timestamp));

        match point {
            Some(point) => points.push(point),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} rows without a usable {} value", skipped, column);
    }

    DataFrame::new(points).with_context(|| format!("No usable {column} values"))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRecord {
    pub timestamp: DateTime,
    pub exterior_temperature: f64,
    pub interior_temperature: f64,
    pub switch_on: bool,
    pub direct_radiation: f64,
    pub is_heating: bool,
    pub t_limit: f64,
    pub t_predicted: f64,
}

impl From<&PredictionRow> for PredictionRecord {
    fn from(row: &PredictionRow) -> Self {
        Self {
            timestamp: row.features.timestamp,
            exterior_temperature: row.features.exterior_temperature.0,
            interior_temperature: row.features.interior_temperature.0,
            switch_on: row.features.switch_state.is_on(),
            direct_radiation: row.features.direct_radiation.0,
            is_heating: row.is_heating,
            t_limit: row.t_limit.0,
            t_predicted: row.t_predicted.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunLogEntry {
    pub date: DateTime,
    pub module_name: String,
    pub method: Method,
    #[serde(rename = "R")]
    pub r: f64,
    #[serde(rename = "C")]
    pub c: f64,
    pub alpha: f64,
    #[serde(rename = "Pvoisin")]
    pub p_neighbor: f64,
    pub time_shift: i32,
    pub loss: f64,
}

impl RunLogEntry {
    pub fn new(date: DateTime, module_name: &str, method: Method, params: &ParameterVector, loss: f64) -> Self {
        Self {
            date,
            module_name: module_name.to_string(),
            method,
            r: params.r,
            c: params.c,
            alpha: params.alpha,
            p_neighbor: params.p_neighbor,
            time_shift: params.time_shift,
            loss,
        }
    }
}

pub fn write_csv<S: Serialize>(path: &Path, rows: impl IntoIterator<Item = S>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Error creating directory {}", parent.display()))?;
    }

    let file = File::create(path).with_context(|| format!("Error creating {}", path.display()))?;
    write_rows(file, true, rows).with_context(|| format!("Error writing {}", path.display()))
}

//header only when the log is started
pub fn append_run_log(path: &Path, entries: &[RunLogEntry]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Error creating directory {}", parent.display()))?;
    }

    let is_new = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Error opening run log {}", path.display()))?;

    write_rows(file, is_new, entries).with_context(|| format!("Error appending to run log {}", path.display()))
}

fn write_rows<S: Serialize>(writer: impl Write, has_headers: bool, rows: impl IntoIterator<Item = S>) -> anyhow::Result<()> {
    let mut writer = ::csv::WriterBuilder::new()
        .has_headers(has_headers)
        .from_writer(writer);

    for row in rows {
        writer.serialize(row).context("Error serializing row to CSV")?;
    }

    writer.flush().context("Error flushing CSV")?;
    Ok(())
}
