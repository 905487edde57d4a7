use crate::archive::FlareRecord;

/// Samples after the trigger at which the ground team decides whether to abort.
pub const CANCELLATION_LOOKAHEAD_SAMPLES: usize = 3;

/// Abort decision for a launch triggered at `trigger_index`.
///
/// The launch is cancelled when the short-wavelength flux has already started
/// to fall by the decision sample. `None` when that sample is past the end of
/// the record.
pub fn would_cancel(flare: &FlareRecord, trigger_index: usize) -> Option<bool> {
    let at_trigger = *flare.xrsa.get(trigger_index)?;
    let at_decision = *flare
        .xrsa
        .get(trigger_index + CANCELLATION_LOOKAHEAD_SAMPLES)?;
    Some(at_decision - at_trigger < 0.0)
}
