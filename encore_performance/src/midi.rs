// MIDI input/output for performance event streams.
//
// Writing converts a Performance into a Standard MIDI File (SMF Format 1,
// tempo track + one note track) for playback and evaluation of generated
// output. Reading parses an SMF, merges the note content of every track,
// quantizes it to the performance clock, and rebuilds an event stream —
// this is how primer performances enter the system.
//
// The written tempo is chosen so that one clock step lands on a whole
// number of ticks (exact at the default 100 steps/second resolution).
// Reading honors the file's first tempo event; later tempo changes are
// ignored.
//
// Uses the `midly` crate for MIDI reading and writing.

use crate::events::{DEFAULT_VELOCITY, Performance, PerformanceEvent, PerformedNote, velocity_from_bin};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Ticks per performance clock step in MIDI output.
const TICKS_PER_STEP: u32 = 8;

/// Tempo (microseconds per quarter note) that makes one clock step equal
/// TICKS_PER_STEP ticks. 600_000 µs (100 BPM) at 100 steps/second.
fn tempo_micros(steps_per_second: u32) -> u32 {
    1_000_000 * TICKS_PER_QUARTER as u32 / (TICKS_PER_STEP * steps_per_second)
}

/// Convert a Performance to MIDI and write it to a file.
pub fn write_midi(performance: &Performance, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let smf = performance_to_smf(performance);
    let mut buf = Vec::new();
    smf.write(&mut buf)?;
    std::fs::write(path, &buf)?;
    Ok(())
}

/// Convert a Performance to an in-memory SMF.
pub fn performance_to_smf(performance: &Performance) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    // Track 0: tempo track
    let mut tempo_track: Track<'static> = Vec::new();
    tempo_track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_micros(
            performance.steps_per_second,
        )))),
    });
    tempo_track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(tempo_track);

    // Track 1: the performance on a single channel, acoustic grand.
    let channel = u4::new(0);
    let mut track: Track<'static> = Vec::new();
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel,
            message: MidiMessage::ProgramChange { program: u7::new(0) },
        },
    });

    let mut current_tick: u32 = 0;
    let mut last_event_tick: u32 = 0;
    let mut velocity = DEFAULT_VELOCITY;

    for event in &performance.events {
        match *event {
            PerformanceEvent::TimeShift { steps } => {
                current_tick += steps * TICKS_PER_STEP;
            }
            PerformanceEvent::Velocity { bin } => {
                if performance.num_velocity_bins > 0 {
                    velocity = velocity_from_bin(bin, performance.num_velocity_bins);
                }
            }
            PerformanceEvent::NoteOn { pitch } => {
                let delta = current_tick - last_event_tick;
                track.push(TrackEvent {
                    delta: u28::new(delta),
                    kind: TrackEventKind::Midi {
                        channel,
                        message: MidiMessage::NoteOn {
                            key: u7::new(pitch.min(127)),
                            vel: u7::new(velocity.min(127)),
                        },
                    },
                });
                last_event_tick = current_tick;
            }
            PerformanceEvent::NoteOff { pitch } => {
                let delta = current_tick - last_event_tick;
                track.push(TrackEvent {
                    delta: u28::new(delta),
                    kind: TrackEventKind::Midi {
                        channel,
                        message: MidiMessage::NoteOff {
                            key: u7::new(pitch.min(127)),
                            vel: u7::new(0),
                        },
                    },
                });
                last_event_tick = current_tick;
            }
        }
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);

    smf
}

/// Read a MIDI file into a Performance quantized at the given resolution.
pub fn read_midi(
    path: &Path,
    steps_per_second: u32,
    num_velocity_bins: u32,
) -> Result<Performance, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    let smf = Smf::parse(&bytes)?;
    performance_from_smf(&smf, steps_per_second, num_velocity_bins)
}

/// Convert a parsed SMF to a Performance.
///
/// Note content from every track is merged. A note-on with velocity 0 is
/// treated as a note-off. Notes still open at the end of their track are
/// closed there.
pub fn performance_from_smf(
    smf: &Smf,
    steps_per_second: u32,
    num_velocity_bins: u32,
) -> Result<Performance, Box<dyn std::error::Error>> {
    let ticks_per_quarter = match smf.header.timing {
        Timing::Metrical(tpq) => tpq.as_int() as u32,
        Timing::Timecode(..) => return Err("SMPTE timecode timing is not supported".into()),
    };

    // First tempo event wins; the MIDI default is 120 BPM.
    let mut tempo = 500_000u32;
    'tracks: for track in &smf.tracks {
        for event in track {
            if let TrackEventKind::Meta(MetaMessage::Tempo(t)) = event.kind {
                tempo = t.as_int();
                break 'tracks;
            }
        }
    }

    let seconds_per_tick = tempo as f64 / 1_000_000.0 / ticks_per_quarter as f64;
    let to_step =
        |tick: u64| (tick as f64 * seconds_per_tick * steps_per_second as f64).round() as u32;

    let mut notes: Vec<PerformedNote> = Vec::new();
    for track in &smf.tracks {
        let mut tick: u64 = 0;
        // pitch -> open onsets as (tick, velocity), earliest first
        let mut open: [Vec<(u64, u8)>; 128] = std::array::from_fn(|_| Vec::new());

        for event in track {
            tick += event.delta.as_int() as u64;
            let TrackEventKind::Midi { message, .. } = event.kind else {
                continue;
            };
            match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    open[key.as_int() as usize].push((tick, vel.as_int()));
                }
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    let stack = &mut open[key.as_int() as usize];
                    if !stack.is_empty() {
                        let (start_tick, vel) = stack.remove(0);
                        push_note(&mut notes, key.as_int(), vel, to_step(start_tick), to_step(tick));
                    }
                }
                _ => {}
            }
        }

        // Close notes left open at the end of the track.
        for (pitch, stack) in open.iter().enumerate() {
            for &(start_tick, vel) in stack {
                push_note(&mut notes, pitch as u8, vel, to_step(start_tick), to_step(tick));
            }
        }
    }

    Ok(Performance::from_notes(&notes, steps_per_second, num_velocity_bins))
}

fn push_note(notes: &mut Vec<PerformedNote>, pitch: u8, velocity: u8, start_step: u32, end_step: u32) {
    if end_step > start_step {
        notes.push(PerformedNote {
            pitch,
            velocity,
            start_step,
            end_step,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::DEFAULT_STEPS_PER_SECOND;

    fn two_note_performance() -> Performance {
        let notes = [
            PerformedNote {
                pitch: 60,
                velocity: 80,
                start_step: 0,
                end_step: 100,
            },
            PerformedNote {
                pitch: 64,
                velocity: 40,
                start_step: 100,
                end_step: 250,
            },
        ];
        Performance::from_notes(&notes, DEFAULT_STEPS_PER_SECOND, 32)
    }

    #[test]
    fn test_performance_to_smf_shape() {
        let smf = performance_to_smf(&two_note_performance());
        // Tempo track + note track.
        assert_eq!(smf.tracks.len(), 2);
        let note_ons = smf.tracks[1]
            .iter()
            .filter(|e| {
                matches!(
                    e.kind,
                    TrackEventKind::Midi {
                        message: MidiMessage::NoteOn { .. },
                        ..
                    }
                )
            })
            .count();
        assert_eq!(note_ons, 2);
    }

    #[test]
    fn test_smf_read_back_preserves_steps() {
        let perf = two_note_performance();
        let smf = performance_to_smf(&perf);
        let mut buf = Vec::new();
        smf.write(&mut buf).unwrap();

        let parsed = Smf::parse(&buf).unwrap();
        let recovered = performance_from_smf(&parsed, DEFAULT_STEPS_PER_SECOND, 32).unwrap();
        let notes = recovered.to_notes();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].start_step, 0);
        assert_eq!(notes[0].end_step, 100);
        assert_eq!(notes[1].start_step, 100);
        assert_eq!(notes[1].end_step, 250);
    }
}
