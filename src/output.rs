use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::Writer;
use serde::Serialize;

use crate::sweep::{ConfigurationSummary, ConfigurationTable};
use crate::SweepError;

pub const OUTPUT_SCHEMA_VERSION: &str = "1.0.0";
pub const LAUNCHES_DIR: &str = "Launches";

/// Destination for finished per-configuration tables.
pub trait ResultWriter {
    /// Persists one configuration's filtered table. Only called for
    /// configurations where at least one flare triggered.
    fn write(&mut self, table: &ConfigurationTable) -> Result<(), SweepError>;
}

/// Writes each table to `<run>/Launches/<label>_results.csv`.
#[derive(Debug, Clone)]
pub struct CsvResultWriter {
    launches_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl CsvResultWriter {
    pub fn new(run_dir: &Path) -> Result<Self, SweepError> {
        let launches_dir = run_dir.join(LAUNCHES_DIR);
        fs::create_dir_all(&launches_dir)?;
        Ok(Self {
            launches_dir,
            written: Vec::new(),
        })
    }

    pub fn table_path(&self, table: &ConfigurationTable) -> PathBuf {
        self.launches_dir
            .join(format!("{}_results.csv", table.combination.label()))
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ResultWriter for CsvResultWriter {
    fn write(&mut self, table: &ConfigurationTable) -> Result<(), SweepError> {
        let path = self.table_path(table);
        write_launches_csv(&path, table)?;
        self.written.push(path);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub schema_version: String,
    pub success_flux_key: String,
    pub success_flux_value: f64,
    pub parameter_names: Vec<String>,
    pub parameter_units: Vec<String>,
    pub configurations: usize,
    pub written: usize,
    pub skipped: usize,
}

pub fn create_timestamped_output_dir(output_root: &Path) -> Result<PathBuf, SweepError> {
    fs::create_dir_all(output_root)?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let mut output_dir = output_root.join(&timestamp);
    let mut counter = 1_u32;

    while output_dir.exists() {
        output_dir = output_root.join(format!("{timestamp}-{counter:02}"));
        counter += 1;
    }

    fs::create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn fmt_f64(value: f64) -> String {
    format!("{value}")
}

fn fmt_opt_bool(value: Option<bool>) -> String {
    match value {
        Some(flag) => flag.to_string(),
        None => "NA".to_string(),
    }
}

pub fn launches_header(table: &ConfigurationTable) -> Vec<String> {
    let success_flux_key = &table.success_flux_key;
    let mut header: Vec<String> = [
        "Flare_Number",
        "Flare_ID",
        "Trigger_Time",
        "Cancelled?",
        "Peak_Observed?",
        "Max_HiC",
        "Mean_HiC",
    ]
    .iter()
    .map(|column| column.to_string())
    .collect();

    header.push(format!("Flare_{success_flux_key}"));
    header.push(format!("Flare_{success_flux_key}_LongDuration"));
    header.extend(
        [
            "LongDuration",
            "Flare_Class",
            "Flare_Max_Flux",
            "Peak_Time",
            "Start_to_Peak_Time",
            "Trigger_to_Peak_Time",
            "Duration",
            "Background_Flux",
            "HiC_Max_LongDuration",
            "HiC_Mean_LongDuration",
        ]
        .iter()
        .map(|column| column.to_string()),
    );

    for name in &table.combination.names {
        header.push(name.clone());
        header.push(format!("{name}_units"));
    }

    header
}

pub fn write_launches_csv(path: &Path, table: &ConfigurationTable) -> Result<(), SweepError> {
    let combination = &table.combination;
    for (context, got) in [
        ("parameter values", combination.values.len()),
        ("parameter units", combination.units.len()),
    ] {
        if got != combination.names.len() {
            return Err(SweepError::LengthMismatch {
                context,
                expected: combination.names.len(),
                got,
            });
        }
    }

    let mut writer = Writer::from_path(path)?;
    writer.write_record(launches_header(table))?;

    for row in &table.rows {
        let mut record = vec![
            row.flare_number.to_string(),
            row.flare_id.clone(),
            fmt_f64(row.trigger_time),
            fmt_opt_bool(row.cancelled),
            row.peak_observed.to_string(),
            fmt_f64(row.max_hic),
            fmt_f64(row.mean_hic),
            row.flux_success.to_string(),
            row.success_long_duration.to_string(),
            row.long_duration.to_string(),
            row.flare_class.clone(),
            fmt_f64(row.flare_max_flux),
            fmt_f64(row.peak_time),
            fmt_f64(row.start_to_peak_time),
            fmt_f64(row.trigger_to_peak_minutes),
            row.duration.to_string(),
            fmt_f64(row.background_flux),
            row.hic_max_long_duration.to_string(),
            row.hic_mean_long_duration.to_string(),
        ];

        for (value, units) in combination.values.iter().zip(combination.units.iter()) {
            record.push(fmt_f64(*value));
            record.push(units.clone());
        }

        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_summary_csv(path: &Path, rows: &[ConfigurationSummary]) -> Result<(), SweepError> {
    let mut writer = Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_manifest_json(output_dir: &Path, manifest: &Manifest) -> Result<PathBuf, SweepError> {
    let path = output_dir.join("manifest.json");
    let payload = serde_json::to_string_pretty(manifest)?;
    fs::write(&path, payload)?;
    Ok(path)
}
