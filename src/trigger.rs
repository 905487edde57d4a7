//! Launch trigger detection and the fixed launch timeline.

use serde::{Deserialize, Serialize};

use crate::archive::{Channel, FlareRecord};

/// Sensor and ground-link latency before a trigger is acted on.
pub const SENSOR_LATENCY_SAMPLES: usize = 3;
/// Launch preparation after the trigger is received.
pub const LAUNCH_PREP_SAMPLES: usize = 4;
/// Ascent until the instrument can start observing.
pub const LAUNCH_TRANSIT_SAMPLES: usize = 2;
/// Samples between trigger and the first observed sample.
pub const PRE_LAUNCH_SAMPLES: usize =
    SENSOR_LATENCY_SAMPLES + LAUNCH_PREP_SAMPLES + LAUNCH_TRANSIT_SAMPLES;
/// Length of the instrument's observation window.
pub const OBSERVATION_SAMPLES: usize = 6;

/// Threshold condition for one parameter combination.
///
/// The shape is fixed when the combination is built: a lone parameter is a
/// strict crossing, several parameters must all be met at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ThresholdSpec {
    /// Fires where `series > threshold`.
    SingleChannel { channel: Channel, threshold: f64 },
    /// Fires where every `series >= threshold` on the same sample.
    MultiChannel(Vec<(Channel, f64)>),
}

impl ThresholdSpec {
    pub fn from_pairs(pairs: Vec<(Channel, f64)>) -> Self {
        match pairs.as_slice() {
            [(channel, threshold)] => ThresholdSpec::SingleChannel {
                channel: *channel,
                threshold: *threshold,
            },
            _ => ThresholdSpec::MultiChannel(pairs),
        }
    }

    pub fn is_met(&self, flare: &FlareRecord, index: usize) -> bool {
        match self {
            ThresholdSpec::SingleChannel { channel, threshold } => flare
                .series(*channel)
                .get(index)
                .map_or(false, |&value| value > *threshold),
            ThresholdSpec::MultiChannel(pairs) => {
                !pairs.is_empty()
                    && pairs.iter().all(|(channel, threshold)| {
                        flare
                            .series(*channel)
                            .get(index)
                            .map_or(false, |&value| value >= *threshold)
                    })
            }
        }
    }
}

/// Sample indices of a triggered launch. `observation_end` is exclusive and
/// may lie past the end of the flare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerWindow {
    pub trigger_index: usize,
    pub observation_start: usize,
    pub observation_end: usize,
}

impl TriggerWindow {
    pub fn from_trigger(trigger_index: usize) -> Self {
        let observation_start = trigger_index + PRE_LAUNCH_SAMPLES;
        Self {
            trigger_index,
            observation_start,
            observation_end: observation_start + OBSERVATION_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    NotTriggered,
    Triggered(TriggerWindow),
}

impl TriggerOutcome {
    pub fn window(&self) -> Option<TriggerWindow> {
        match self {
            TriggerOutcome::NotTriggered => None,
            TriggerOutcome::Triggered(window) => Some(*window),
        }
    }
}

/// Earliest sample satisfying `spec`, and the launch timeline that follows.
pub fn detect(flare: &FlareRecord, spec: &ThresholdSpec) -> TriggerOutcome {
    let len = match spec {
        ThresholdSpec::SingleChannel { channel, .. } => flare.series(*channel).len(),
        ThresholdSpec::MultiChannel(pairs) => pairs
            .iter()
            .map(|(channel, _)| flare.series(*channel).len())
            .min()
            .unwrap_or(0),
    };

    (0..len)
        .find(|&index| spec.is_met(flare, index))
        .map_or(TriggerOutcome::NotTriggered, |index| {
            TriggerOutcome::Triggered(TriggerWindow::from_trigger(index))
        })
}
