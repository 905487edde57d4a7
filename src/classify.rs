//! Per-configuration success classification of simulated launches.

use serde::{Deserialize, Serialize};

use crate::archive::{Channel, FlareArchive, FlareRecord};
use crate::SweepError;

/// Samples past the peak a long-duration flare must still be bright at.
/// Assumes one-minute cadence.
pub const LONG_DURATION_SAMPLES: usize = 20;
/// Fraction of the peak flux that counts as still significant.
pub const SUSTAINED_FLUX_FRACTION: f64 = 0.2;
/// Channel the long-duration test is evaluated on.
pub const LONG_DURATION_CHANNEL: Channel = Channel::Xrsb;
/// Padding samples the catalogue adds around each flare.
pub const ARCHIVE_PADDING_SAMPLES: i64 = 30;

/// Outcome of replaying one triggered flare. `None` marks values that could
/// not be evaluated because the needed samples are past the record end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchResult {
    pub flare_number: usize,
    pub flare_id: String,
    pub cancelled: Option<bool>,
    pub trigger_time: f64,
    pub peak_observed: Option<bool>,
    pub max_hic: Option<f64>,
    pub mean_hic: Option<f64>,
}

/// A launch that survived filtering, joined with its flare's catalogue data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedLaunch {
    pub flare_number: usize,
    pub flare_id: String,
    pub trigger_time: f64,
    pub cancelled: Option<bool>,
    pub peak_observed: bool,
    pub max_hic: f64,
    pub mean_hic: f64,
    pub flux_success: bool,
    pub success_long_duration: bool,
    pub long_duration: bool,
    pub flare_class: String,
    pub flare_max_flux: f64,
    pub peak_time: f64,
    pub start_to_peak_time: f64,
    pub trigger_to_peak_minutes: f64,
    pub duration: i64,
    pub background_flux: f64,
    pub hic_max_long_duration: bool,
    pub hic_mean_long_duration: bool,
}

/// Rows kept after classification and how many were discarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub rows: Vec<ClassifiedLaunch>,
    pub dropped: usize,
}

/// Whether the flare stays above [`SUSTAINED_FLUX_FRACTION`] of its peak
/// [`LONG_DURATION_SAMPLES`] after the peak sample.
///
/// A lookahead past the end counts as zero flux. `None` when the peak time
/// matches no sample.
pub fn long_duration(flare: &FlareRecord) -> Option<bool> {
    let peak_index = flare.time.iter().position(|&t| t == flare.peak_time)?;
    let final_flux = flare
        .series(LONG_DURATION_CHANNEL)
        .get(peak_index + LONG_DURATION_SAMPLES)
        .copied()
        .unwrap_or(0.0);
    Some(final_flux > flare.peak_flux * SUSTAINED_FLUX_FRACTION)
}

#[derive(Debug, Clone)]
pub struct SuccessClassifier {
    pub success_flux_key: String,
    pub success_flux_value: f64,
}

impl SuccessClassifier {
    pub fn new(success_flux_key: impl Into<String>, success_flux_value: f64) -> Self {
        Self {
            success_flux_key: success_flux_key.into(),
            success_flux_value,
        }
    }

    /// Joins every launch to the first archive record with the same flare
    /// identifier and derives the success flags. Launches whose observation or
    /// long-duration test is unknown are dropped. A launch whose identifier is
    /// missing from the archive fails the whole configuration.
    pub fn classify(
        &self,
        archive: &FlareArchive,
        launches: &[LaunchResult],
    ) -> Result<Classification, SweepError> {
        let mut classification = Classification::default();

        for launch in launches {
            let flare = archive.find_first(&launch.flare_id).ok_or_else(|| {
                SweepError::MissingFlare {
                    flare_id: launch.flare_id.clone(),
                }
            })?;

            match self.classify_one(flare, launch) {
                Some(row) => classification.rows.push(row),
                None => classification.dropped += 1,
            }
        }

        Ok(classification)
    }

    fn classify_one(
        &self,
        flare: &FlareRecord,
        launch: &LaunchResult,
    ) -> Option<ClassifiedLaunch> {
        let long_duration = long_duration(flare)?;
        let max_hic = launch.max_hic?;
        let mean_hic = launch.mean_hic?;
        let peak_observed = launch.peak_observed?;

        let sustained_bar = flare.peak_flux * SUSTAINED_FLUX_FRACTION;
        let flux_success = flare.peak_flux > self.success_flux_value;

        Some(ClassifiedLaunch {
            flare_number: launch.flare_number,
            flare_id: launch.flare_id.clone(),
            trigger_time: launch.trigger_time,
            cancelled: launch.cancelled,
            peak_observed,
            max_hic,
            mean_hic,
            flux_success,
            success_long_duration: flux_success && long_duration,
            long_duration,
            flare_class: flare.flare_class.clone(),
            flare_max_flux: flare.peak_flux,
            peak_time: flare.peak_time,
            start_to_peak_time: flare.start_to_peak_time,
            trigger_to_peak_minutes: (flare.peak_time - launch.trigger_time) / 60.0,
            duration: flare.len() as i64 - ARCHIVE_PADDING_SAMPLES,
            background_flux: flare.background_flux,
            hic_max_long_duration: max_hic > sustained_bar,
            hic_mean_long_duration: mean_hic > sustained_bar,
        })
    }
}
