//! Sounding-rocket launch trigger sweeps over historical GOES XRS flares.
//!
//! Every flare in the archive is replayed against each candidate trigger
//! threshold combination. The replay decides whether a launch would have
//! fired, whether it would have been cancelled, what the instrument would
//! have seen during its observation window, and whether that counts as
//! catching a long-duration, high-flux event.

pub mod archive;
pub mod cancellation;
pub mod classify;
pub mod config;
pub mod observation;
pub mod output;
pub mod sweep;
pub mod trigger;

use thiserror::Error;

pub use archive::{Channel, FlareArchive, FlareRecord};
pub use classify::{ClassifiedLaunch, LaunchResult, SuccessClassifier};
pub use config::{ParameterCombination, ParameterSpec, SweepConfig};
pub use output::{create_timestamped_output_dir, CsvResultWriter, ResultWriter};
pub use sweep::{run_sweep, run_sweep_into_dir, ConfigurationTable, SweepResult};
pub use trigger::{detect, ThresholdSpec, TriggerOutcome, TriggerWindow};

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unknown channel: {0}")]
    UnknownChannel(String),
    #[error("{context} length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("launch references flare {flare_id}, which is not in the archive")]
    MissingFlare { flare_id: String },
}

/// Loads the configured archive and runs the full grid into a fresh
/// timestamped directory under `config.output_root`.
pub fn run_parameter_search(config: &SweepConfig) -> Result<SweepResult, SweepError> {
    config.validate()?;
    let archive = FlareArchive::from_json_file(&config.archive_path)?;
    let output_dir = create_timestamped_output_dir(&config.output_root)?;
    run_sweep_into_dir(config, &archive, &output_dir)
}
