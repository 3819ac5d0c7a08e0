// Per-step conditioning signals and the conditioning expander.
//
// A caller expresses a single conditioning intent — a desired note density,
// a desired pitch-class histogram, or both — and the expander broadcasts it
// into one identical control value per generation step. When both values
// are given they travel as a single paired value, so the downstream encoder
// sees a structurally consistent shape at every step.
//
// "No conditioning" is an explicit absence (`None`), distinct from an empty
// control sequence: it tells the encoder that no control channel exists at
// all, rather than that the control channel is empty.
//
// Whether a given configuration's encoder can actually consume a requested
// signal is checked in model.rs, not here — this module is a pure value
// transformation.

use serde::{Deserialize, Serialize};

/// One per-step conditioning value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlSignal {
    /// Desired note density in onsets per second.
    NoteDensity(f64),
    /// Desired pitch-class histogram (12 entries, relative weights).
    PitchHistogram(Vec<f64>),
    /// Both at once, as one structurally paired value.
    DensityAndHistogram(f64, Vec<f64>),
}

/// Broadcast a conditioning intent across `num_steps` generation steps.
///
/// Both values given: `num_steps` identical pairs. Exactly one: `num_steps`
/// repetitions of it. Neither: `None`, the no-conditioning marker.
pub fn build_control_sequence(
    num_steps: usize,
    note_density: Option<f64>,
    pitch_histogram: Option<&[f64]>,
) -> Option<Vec<ControlSignal>> {
    let signal = match (note_density, pitch_histogram) {
        (Some(density), Some(histogram)) => {
            ControlSignal::DensityAndHistogram(density, histogram.to_vec())
        }
        (Some(density), None) => ControlSignal::NoteDensity(density),
        (None, Some(histogram)) => ControlSignal::PitchHistogram(histogram.to_vec()),
        (None, None) => return None,
    };
    Some(vec![signal; num_steps])
}
