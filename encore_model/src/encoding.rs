// Encoder-decoder topology descriptors.
//
// Each registry entry declares how the external encoding library should be
// wired for it: a plain one-hot event encoder, or a conditional pairing of
// a control encoder with the event encoder, where the control encoder may
// itself concatenate several encoders. This module describes and sizes
// those compositions; the event-to-tensor conversion they imply is owned by
// the encoding library, not by this crate.
//
// The descriptors are a closed set — the registry only ever composes these
// shapes — and they double as the capability declaration the model layer
// validates conditioning requests against.

use encore_performance::events::{MAX_MIDI_PITCH, MAX_SHIFT_STEPS, MIN_MIDI_PITCH};
use encore_performance::signals::PITCH_CLASSES;
use serde::{Deserialize, Serialize};

/// How performance events themselves are encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventEncoding {
    /// One-hot over the event vocabulary: note-ons, note-offs, time shifts,
    /// and (when `num_velocity_bins > 0`) velocity bins.
    PerformanceOneHot { num_velocity_bins: u32 },
}

impl EventEncoding {
    /// Size of the one-hot event vocabulary.
    pub fn num_classes(&self) -> usize {
        match *self {
            EventEncoding::PerformanceOneHot { num_velocity_bins } => {
                let pitches = (MAX_MIDI_PITCH - MIN_MIDI_PITCH + 1) as usize;
                pitches // note-on
                    + pitches // note-off
                    + MAX_SHIFT_STEPS as usize // time shifts 1..=MAX
                    + num_velocity_bins as usize
            }
        }
    }
}

/// How a control signal is encoded alongside the events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlEncoding {
    /// Note density quantized into one-hot bins over the given edges.
    NoteDensityOneHot { bin_ranges: Vec<f64> },
    /// A 12-dimensional pitch-class histogram passed through as-is.
    PitchHistogram,
    /// Concatenation of several control encoders' outputs.
    Multiple(Vec<ControlEncoding>),
}

impl ControlEncoding {
    /// Width of this control encoder's output.
    pub fn input_size(&self) -> usize {
        match self {
            ControlEncoding::NoteDensityOneHot { bin_ranges } => bin_ranges.len() + 1,
            ControlEncoding::PitchHistogram => PITCH_CLASSES,
            ControlEncoding::Multiple(parts) => parts.iter().map(|p| p.input_size()).sum(),
        }
    }

    /// Whether this encoder (or any nested part) consumes a note-density
    /// control channel.
    pub fn consumes_density(&self) -> bool {
        match self {
            ControlEncoding::NoteDensityOneHot { .. } => true,
            ControlEncoding::PitchHistogram => false,
            ControlEncoding::Multiple(parts) => parts.iter().any(|p| p.consumes_density()),
        }
    }

    /// Whether this encoder (or any nested part) consumes a pitch-histogram
    /// control channel.
    pub fn consumes_pitch_histogram(&self) -> bool {
        match self {
            ControlEncoding::NoteDensityOneHot { .. } => false,
            ControlEncoding::PitchHistogram => true,
            ControlEncoding::Multiple(parts) => parts.iter().any(|p| p.consumes_pitch_histogram()),
        }
    }
}

/// The complete encoder-decoder wiring for one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EncoderDecoderSpec {
    /// Events alone, one-hot.
    OneHot(EventEncoding),
    /// A control encoder paired with the event encoder; the control value
    /// for each step is encoded and concatenated onto the event input.
    Conditional {
        control: ControlEncoding,
        events: EventEncoding,
    },
}

impl EncoderDecoderSpec {
    /// Width of the model input at each step.
    pub fn input_size(&self) -> usize {
        match self {
            EncoderDecoderSpec::OneHot(events) => events.num_classes(),
            EncoderDecoderSpec::Conditional { control, events } => {
                control.input_size() + events.num_classes()
            }
        }
    }

    /// Number of output classes (the event vocabulary).
    pub fn num_classes(&self) -> usize {
        match self {
            EncoderDecoderSpec::OneHot(events) => events.num_classes(),
            EncoderDecoderSpec::Conditional { events, .. } => events.num_classes(),
        }
    }

    pub fn supports_density(&self) -> bool {
        match self {
            EncoderDecoderSpec::OneHot(_) => false,
            EncoderDecoderSpec::Conditional { control, .. } => control.consumes_density(),
        }
    }

    pub fn supports_pitch_histogram(&self) -> bool {
        match self {
            EncoderDecoderSpec::OneHot(_) => false,
            EncoderDecoderSpec::Conditional { control, .. } => control.consumes_pitch_histogram(),
        }
    }
}
