// Performance event streams: the model's event vocabulary.
//
// A performance is an ordered sequence of events on a fixed clock:
// - NoteOn / NoteOff: a pitch starts or stops sounding
// - TimeShift: the clock advances by 1..=MAX_SHIFT_STEPS steps
// - Velocity: subsequent note-ons use this quantized velocity bin
//
// The clock runs at `steps_per_second` steps per second (100 by default, so
// one step is 10 ms). Gaps longer than MAX_SHIFT_STEPS are expressed as
// consecutive shifts. Velocity events only appear when the stream was built
// with `num_velocity_bins > 0`; with 0 bins the dynamics channel is off
// entirely and note-ons render at a fixed default velocity.
//
// Conversion to and from the note-level view (`PerformedNote`) is
// deterministic: given the same notes, `from_notes` always produces the
// same event stream.

use serde::{Deserialize, Serialize};

pub const MIN_MIDI_PITCH: u8 = 0;
pub const MAX_MIDI_PITCH: u8 = 127;
pub const MIN_MIDI_VELOCITY: u8 = 1;
pub const MAX_MIDI_VELOCITY: u8 = 127;

/// Clock resolution: steps per second. One step = 10 ms.
pub const DEFAULT_STEPS_PER_SECOND: u32 = 100;

/// Largest clock advance a single TimeShift event can express (one second
/// at the default resolution). Longer gaps split into multiple shifts.
pub const MAX_SHIFT_STEPS: u32 = 100;

/// Velocity used for note-ons when the stream carries no velocity events.
pub const DEFAULT_VELOCITY: u8 = 100;

/// One event in a performance stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceEvent {
    /// A pitch starts sounding.
    NoteOn { pitch: u8 },
    /// A pitch stops sounding.
    NoteOff { pitch: u8 },
    /// The clock advances by `steps` (1..=MAX_SHIFT_STEPS).
    TimeShift { steps: u32 },
    /// Subsequent note-ons use velocity bin `bin` (1..=num_velocity_bins).
    Velocity { bin: u32 },
}

/// A note reconstructed from (or destined for) an event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformedNote {
    pub pitch: u8,
    pub velocity: u8,
    /// Clock step at which the note starts.
    pub start_step: u32,
    /// Clock step at which the note ends (exclusive). Must exceed start_step.
    pub end_step: u32,
}

/// An ordered performance event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub events: Vec<PerformanceEvent>,
    /// Clock resolution the stream was quantized at.
    pub steps_per_second: u32,
    /// Number of velocity bins the stream was built with. 0 = dynamics off.
    pub num_velocity_bins: u32,
}

impl Performance {
    /// Create an empty performance at the given clock resolution.
    pub fn new(steps_per_second: u32, num_velocity_bins: u32) -> Self {
        Performance {
            events: Vec::new(),
            steps_per_second,
            num_velocity_bins,
        }
    }

    /// Number of events in the stream.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Append an event as-is. Shift splitting is the caller's concern; use
    /// `shift` to append clock advances of arbitrary size.
    pub fn push(&mut self, event: PerformanceEvent) {
        self.events.push(event);
    }

    /// Advance the clock by `steps`, splitting into MAX_SHIFT_STEPS-sized
    /// TimeShift events. A zero advance appends nothing.
    pub fn shift(&mut self, steps: u32) {
        let mut remaining = steps;
        while remaining > MAX_SHIFT_STEPS {
            self.events.push(PerformanceEvent::TimeShift {
                steps: MAX_SHIFT_STEPS,
            });
            remaining -= MAX_SHIFT_STEPS;
        }
        if remaining > 0 {
            self.events.push(PerformanceEvent::TimeShift { steps: remaining });
        }
    }

    /// Total clock steps covered by the stream (sum of all time shifts).
    /// Distinct from `len()`, which counts events.
    pub fn num_steps(&self) -> u32 {
        self.events
            .iter()
            .map(|e| match e {
                PerformanceEvent::TimeShift { steps } => *steps,
                _ => 0,
            })
            .sum()
    }

    /// Duration of the stream in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.num_steps() as f64 / self.steps_per_second as f64
    }

    /// Pad with time shifts or truncate so that `num_steps()` equals `steps`
    /// exactly. Truncation drops every event at or beyond the target step.
    pub fn set_length(&mut self, steps: u32) {
        let current = self.num_steps();
        if current < steps {
            self.shift(steps - current);
        } else if current > steps {
            let mut kept = Vec::with_capacity(self.events.len());
            let mut acc = 0u32;
            for &event in &self.events {
                if let PerformanceEvent::TimeShift { steps: s } = event {
                    if acc + s >= steps {
                        let remaining = steps - acc;
                        if remaining > 0 {
                            kept.push(PerformanceEvent::TimeShift { steps: remaining });
                        }
                        break;
                    }
                    acc += s;
                }
                kept.push(event);
            }
            self.events = kept;
        }
    }

    /// Build an event stream from a set of notes.
    ///
    /// Walks note boundaries in clock order, emitting time shifts for gaps.
    /// At the same step, offsets precede onsets so a re-struck pitch produces
    /// NoteOff before NoteOn. With `num_velocity_bins > 0`, a Velocity event
    /// precedes any onset whose quantized bin differs from the previous one.
    /// Notes with `end_step <= start_step` are skipped.
    pub fn from_notes(
        notes: &[PerformedNote],
        steps_per_second: u32,
        num_velocity_bins: u32,
    ) -> Self {
        // (step, is_onset, note index); false < true sorts offsets first.
        let mut boundaries: Vec<(u32, bool, usize)> = Vec::with_capacity(notes.len() * 2);
        for (i, note) in notes.iter().enumerate() {
            if note.end_step <= note.start_step {
                continue;
            }
            boundaries.push((note.start_step, true, i));
            boundaries.push((note.end_step, false, i));
        }
        boundaries.sort_unstable();

        let mut perf = Performance::new(steps_per_second, num_velocity_bins);
        let mut current_step = 0u32;
        let mut current_bin = 0u32; // no velocity event emitted yet
        for (step, is_onset, i) in boundaries {
            perf.shift(step - current_step);
            current_step = step;
            let note = &notes[i];
            if is_onset {
                if num_velocity_bins > 0 {
                    let bin = velocity_to_bin(note.velocity, num_velocity_bins);
                    if bin != current_bin {
                        perf.push(PerformanceEvent::Velocity { bin });
                        current_bin = bin;
                    }
                }
                perf.push(PerformanceEvent::NoteOn { pitch: note.pitch });
            } else {
                perf.push(PerformanceEvent::NoteOff { pitch: note.pitch });
            }
        }
        perf
    }

    /// Reconstruct the note-level view of the stream.
    ///
    /// NoteOffs close the earliest open onset of the same pitch. Notes still
    /// open at the end of the stream are closed at the final step. Stray
    /// NoteOffs and zero-length notes are dropped. The result is sorted by
    /// (start step, pitch).
    pub fn to_notes(&self) -> Vec<PerformedNote> {
        let mut notes = Vec::new();
        // pitch -> open onsets as (start_step, velocity), earliest first
        let mut active: [Vec<(u32, u8)>; 128] = std::array::from_fn(|_| Vec::new());
        let mut step = 0u32;
        let mut velocity = DEFAULT_VELOCITY;

        for event in &self.events {
            match *event {
                PerformanceEvent::TimeShift { steps } => step += steps,
                PerformanceEvent::Velocity { bin } => {
                    if self.num_velocity_bins > 0 {
                        velocity = velocity_from_bin(bin, self.num_velocity_bins);
                    }
                }
                PerformanceEvent::NoteOn { pitch } => {
                    active[pitch as usize].push((step, velocity));
                }
                PerformanceEvent::NoteOff { pitch } => {
                    let open = &mut active[pitch as usize];
                    if !open.is_empty() {
                        let (start, vel) = open.remove(0);
                        if step > start {
                            notes.push(PerformedNote {
                                pitch,
                                velocity: vel,
                                start_step: start,
                                end_step: step,
                            });
                        }
                    }
                }
            }
        }

        // Close notes left open at the end of the stream.
        for (pitch, open) in active.iter().enumerate() {
            for &(start, vel) in open {
                if step > start {
                    notes.push(PerformedNote {
                        pitch: pitch as u8,
                        velocity: vel,
                        start_step: start,
                        end_step: step,
                    });
                }
            }
        }

        notes.sort_unstable_by_key(|n| (n.start_step, n.pitch, n.end_step));
        notes
    }
}

/// Width of each velocity bin when the 1..=127 MIDI range is split into
/// `num_bins` bins. `num_bins` must be positive.
pub fn velocity_bin_size(num_bins: u32) -> u32 {
    let range = (MAX_MIDI_VELOCITY - MIN_MIDI_VELOCITY + 1) as u32;
    range.div_ceil(num_bins)
}

/// Quantize a MIDI velocity (clamped to 1..=127) to a bin in 1..=num_bins.
pub fn velocity_to_bin(velocity: u8, num_bins: u32) -> u32 {
    let v = velocity.clamp(MIN_MIDI_VELOCITY, MAX_MIDI_VELOCITY) as u32;
    (v - MIN_MIDI_VELOCITY as u32) / velocity_bin_size(num_bins) + 1
}

/// The MIDI velocity at the lower edge of a bin.
pub fn velocity_from_bin(bin: u32, num_bins: u32) -> u8 {
    let v = MIN_MIDI_VELOCITY as u32 + (bin.max(1) - 1) * velocity_bin_size(num_bins);
    v.min(MAX_MIDI_VELOCITY as u32) as u8
}
