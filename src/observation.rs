//! Flux the instrument would have recorded during its observation window.

use crate::archive::{Channel, FlareRecord};
use crate::trigger::TriggerWindow;

/// Channel the instrument's observation is read from.
pub const OBSERVED_CHANNEL: Channel = Channel::Xrsb;
/// Sample standing in for the pre-launch background. An observation only
/// counts toward seeing the peak if it starts after this sample.
pub const PEAK_REFERENCE_INDEX: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HicObservation {
    pub max_flux: f64,
    pub mean_flux: f64,
    pub peak_observed: bool,
}

/// Statistics over `[observation_start, observation_end)`, clipped to the
/// record. Returns `None` when nothing of the window is inside the record,
/// which happens when a trigger fires on the tail of an adjacent flare, or when
/// any sample inside the window is missing (NaN).
pub fn observe(flare: &FlareRecord, window: &TriggerWindow) -> Option<HicObservation> {
    let series = flare.series(OBSERVED_CHANNEL);
    let end = window.observation_end.min(series.len());
    let slice = series.get(window.observation_start..end)?;
    if slice.is_empty() || slice.iter().any(|value| value.is_nan()) {
        return None;
    }

    let max_flux = slice.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean_flux = slice.iter().sum::<f64>() / slice.len() as f64;

    Some(HicObservation {
        max_flux,
        mean_flux,
        peak_observed: peak_observed(flare, window.observation_start),
    })
}

fn peak_observed(flare: &FlareRecord, observation_start: usize) -> bool {
    match (
        flare.time.get(PEAK_REFERENCE_INDEX),
        flare.time.get(observation_start),
    ) {
        (Some(&reference), Some(&start)) => reference < start && start < flare.peak_time,
        _ => false,
    }
}
