//! Replays the archive for every parameter combination.
//!
//! Each combination owns its result table for exactly one iteration. The
//! table is handed to the writer and then dropped, so no rows leak between
//! combinations, and rows keep archive order.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::archive::{FlareArchive, FlareRecord};
use crate::cancellation::would_cancel;
use crate::classify::{ClassifiedLaunch, LaunchResult, SuccessClassifier};
use crate::config::{ParameterCombination, SweepConfig};
use crate::observation::observe;
use crate::output::{
    write_manifest_json, write_summary_csv, CsvResultWriter, Manifest, ResultWriter,
    OUTPUT_SCHEMA_VERSION,
};
use crate::trigger::{detect, ThresholdSpec};
use crate::SweepError;

/// Filtered launches of one parameter combination.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationTable {
    pub combination: ParameterCombination,
    pub success_flux_key: String,
    pub rows: Vec<ClassifiedLaunch>,
    /// Flares that triggered, before filtering.
    pub triggered: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigurationSummary {
    pub configuration: usize,
    pub parameters: String,
    pub triggered: usize,
    pub retained: usize,
    pub dropped: usize,
    pub cancelled: usize,
    pub peak_observed: usize,
    pub flux_success: usize,
    pub success_long_duration: usize,
    pub hic_max_long_duration: usize,
    pub hic_mean_long_duration: usize,
}

impl ConfigurationSummary {
    pub fn from_table(table: &ConfigurationTable) -> Self {
        let count = |pred: fn(&ClassifiedLaunch) -> bool| {
            table.rows.iter().filter(|row| pred(row)).count()
        };

        Self {
            configuration: table.combination.index,
            parameters: table.combination.label(),
            triggered: table.triggered,
            retained: table.rows.len(),
            dropped: table.dropped,
            cancelled: count(|r| r.cancelled == Some(true)),
            peak_observed: count(|r| r.peak_observed),
            flux_success: count(|r| r.flux_success),
            success_long_duration: count(|r| r.success_long_duration),
            hic_max_long_duration: count(|r| r.hic_max_long_duration),
            hic_mean_long_duration: count(|r| r.hic_mean_long_duration),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    pub summaries: Vec<ConfigurationSummary>,
    /// Combinations where no flare triggered.
    pub skipped: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct SweepResult {
    pub output_dir: PathBuf,
    pub tables: Vec<PathBuf>,
    pub summaries: Vec<ConfigurationSummary>,
    pub skipped: Vec<usize>,
}

/// Replays one flare. `None` when the threshold is never met, or when it is
/// met on a sample with no timestamp.
pub fn simulate_flare(
    flare_number: usize,
    flare: &FlareRecord,
    spec: &ThresholdSpec,
) -> Option<LaunchResult> {
    let window = detect(flare, spec).window()?;
    let trigger_time = *flare.time.get(window.trigger_index)?;
    let observation = observe(flare, &window);

    Some(LaunchResult {
        flare_number,
        flare_id: flare.id.clone(),
        cancelled: would_cancel(flare, window.trigger_index),
        trigger_time,
        peak_observed: observation.map(|obs| obs.peak_observed),
        max_hic: observation.map(|obs| obs.max_flux),
        mean_hic: observation.map(|obs| obs.mean_flux),
    })
}

/// One row per triggered flare, in archive order.
pub fn simulate_launches(archive: &FlareArchive, spec: &ThresholdSpec) -> Vec<LaunchResult> {
    archive
        .flares()
        .iter()
        .enumerate()
        .filter_map(|(flare_number, flare)| simulate_flare(flare_number, flare, spec))
        .collect()
}

/// Simulates and classifies one combination. `None` when nothing triggered.
pub fn run_configuration(
    archive: &FlareArchive,
    combination: &ParameterCombination,
    classifier: &SuccessClassifier,
) -> Result<Option<ConfigurationTable>, SweepError> {
    let launches = simulate_launches(archive, &combination.spec);
    if launches.is_empty() {
        return Ok(None);
    }

    let classification = classifier.classify(archive, &launches)?;
    debug!(
        before = launches.len(),
        after = classification.rows.len(),
        "dropped launches with unknown observation or duration"
    );

    Ok(Some(ConfigurationTable {
        combination: combination.clone(),
        success_flux_key: classifier.success_flux_key.clone(),
        rows: classification.rows,
        triggered: launches.len(),
        dropped: classification.dropped,
    }))
}

pub fn run_sweep<W: ResultWriter>(
    archive: &FlareArchive,
    grid: &[ParameterCombination],
    classifier: &SuccessClassifier,
    writer: &mut W,
) -> Result<SweepOutcome, SweepError> {
    let mut outcome = SweepOutcome::default();

    for combination in grid {
        info!(
            parameters = %combination.label(),
            success = %classifier.success_flux_key,
            "starting parameter search"
        );

        match run_configuration(archive, combination, classifier)? {
            Some(table) => {
                writer.write(&table)?;
                info!(
                    parameters = %combination.label(),
                    rows = table.rows.len(),
                    "launch table saved"
                );
                outcome.summaries.push(ConfigurationSummary::from_table(&table));
            }
            None => {
                info!(parameters = %combination.label(), "no flare triggered, skipping");
                outcome.skipped.push(combination.index);
            }
        }
    }

    Ok(outcome)
}

/// Runs the whole grid from `config` and writes every table, the summary and
/// the manifest under `output_dir`.
pub fn run_sweep_into_dir(
    config: &SweepConfig,
    archive: &FlareArchive,
    output_dir: &Path,
) -> Result<SweepResult, SweepError> {
    config.validate()?;

    let grid = config.parameter_grid();
    let classifier =
        SuccessClassifier::new(config.success_flux_key.clone(), config.success_flux_value);
    let mut writer = CsvResultWriter::new(output_dir)?;

    let outcome = run_sweep(archive, &grid, &classifier, &mut writer)?;

    write_summary_csv(&output_dir.join("summary.csv"), &outcome.summaries)?;
    write_manifest_json(
        output_dir,
        &Manifest {
            schema_version: OUTPUT_SCHEMA_VERSION.to_string(),
            success_flux_key: config.success_flux_key.clone(),
            success_flux_value: config.success_flux_value,
            parameter_names: config.parameters.iter().map(|p| p.name.clone()).collect(),
            parameter_units: config.parameters.iter().map(|p| p.units.clone()).collect(),
            configurations: grid.len(),
            written: writer.written().len(),
            skipped: outcome.skipped.len(),
        },
    )?;

    Ok(SweepResult {
        output_dir: output_dir.to_path_buf(),
        tables: writer.written().to_vec(),
        summaries: outcome.summaries,
        skipped: outcome.skipped,
    })
}
