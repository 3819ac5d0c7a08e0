// Conditioning-signal extraction from performance streams.
//
// The model layer conditions generation on two signals derived from
// existing material: note density (onsets per second) and pitch-class
// histogram. Both are computed over a sliding look-ahead window: for each
// event in the stream, the window begins at the stream position after that
// event takes effect and extends `window_size_seconds` forward.
//
// Whole-sequence aggregates are also provided; the CLI uses them to suggest
// conditioning values for a generation run primed with the same material.
//
// Pure analysis over the event representation — no I/O, no allocation
// beyond the returned vectors.

use crate::events::{Performance, PerformanceEvent};

/// Number of pitch classes in a histogram.
pub const PITCH_CLASSES: usize = 12;

/// Note onsets as (step, pitch), ordered by step.
fn onsets(performance: &Performance) -> Vec<(u32, u8)> {
    // to_notes() sorts by (start_step, pitch), so this is already ordered.
    performance
        .to_notes()
        .iter()
        .map(|n| (n.start_step, n.pitch))
        .collect()
}

/// The half-open onset range [lo, lo + window_steps) as indices into
/// a step-ordered onset list.
fn window_range(onsets: &[(u32, u8)], lo: u32, window_steps: f64) -> (usize, usize) {
    let begin = onsets.partition_point(|&(s, _)| s < lo);
    let end = onsets.partition_point(|&(s, _)| (s as f64) < lo as f64 + window_steps);
    (begin, end)
}

/// Windowed note density: one value per event, in onsets per second.
///
/// `window_size_seconds` must be positive.
pub fn note_density(performance: &Performance, window_size_seconds: f64) -> Vec<f64> {
    assert!(window_size_seconds > 0.0, "window size must be positive");
    let onsets = onsets(performance);
    let window_steps = window_size_seconds * performance.steps_per_second as f64;

    let mut densities = Vec::with_capacity(performance.len());
    let mut step = 0u32;
    for event in &performance.events {
        if let PerformanceEvent::TimeShift { steps } = event {
            step += steps;
        }
        let (begin, end) = window_range(&onsets, step, window_steps);
        densities.push((end - begin) as f64 / window_size_seconds);
    }
    densities
}

/// Windowed pitch-class histogram: one histogram per event, normalized to
/// sum to 1.0. A window containing no onsets yields the uniform histogram.
///
/// `window_size_seconds` must be positive.
pub fn pitch_class_histogram(
    performance: &Performance,
    window_size_seconds: f64,
) -> Vec<[f64; PITCH_CLASSES]> {
    assert!(window_size_seconds > 0.0, "window size must be positive");
    let onsets = onsets(performance);
    let window_steps = window_size_seconds * performance.steps_per_second as f64;

    let mut histograms = Vec::with_capacity(performance.len());
    let mut step = 0u32;
    for event in &performance.events {
        if let PerformanceEvent::TimeShift { steps } = event {
            step += steps;
        }
        let (begin, end) = window_range(&onsets, step, window_steps);
        histograms.push(normalized_histogram(&onsets[begin..end]));
    }
    histograms
}

/// Whole-sequence note density in onsets per second. 0.0 for a stream that
/// covers no time.
pub fn overall_note_density(performance: &Performance) -> f64 {
    let duration = performance.duration_seconds();
    if duration <= 0.0 {
        return 0.0;
    }
    onsets(performance).len() as f64 / duration
}

/// Whole-sequence pitch-class histogram, normalized to sum to 1.0. Uniform
/// for a stream with no onsets.
pub fn overall_pitch_class_histogram(performance: &Performance) -> [f64; PITCH_CLASSES] {
    normalized_histogram(&onsets(performance))
}

fn normalized_histogram(onsets: &[(u32, u8)]) -> [f64; PITCH_CLASSES] {
    if onsets.is_empty() {
        return [1.0 / PITCH_CLASSES as f64; PITCH_CLASSES];
    }
    let mut histogram = [0.0; PITCH_CLASSES];
    for &(_, pitch) in onsets {
        histogram[pitch as usize % PITCH_CLASSES] += 1.0;
    }
    let total = onsets.len() as f64;
    for value in &mut histogram {
        *value /= total;
    }
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{DEFAULT_STEPS_PER_SECOND, PerformedNote};

    /// One onset at the start of every second for ten seconds.
    fn metronome() -> Performance {
        let notes: Vec<PerformedNote> = (0..10)
            .map(|i| PerformedNote {
                pitch: 60,
                velocity: 100,
                start_step: i * DEFAULT_STEPS_PER_SECOND,
                end_step: i * DEFAULT_STEPS_PER_SECOND + 50,
            })
            .collect();
        Performance::from_notes(&notes, DEFAULT_STEPS_PER_SECOND, 0)
    }

    #[test]
    fn test_metronome_density_is_one() {
        let perf = metronome();
        for window in [1.0, 2.0, 5.0] {
            let densities = note_density(&perf, window);
            assert_eq!(densities.len(), perf.len());
            // Away from the tail, exactly `window` onsets fall in a window
            // of `window` seconds.
            assert!((densities[0] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_density_tail_is_zero() {
        let perf = metronome();
        let densities = note_density(&perf, 1.0);
        // After the last onset's NoteOff and final shift, nothing remains.
        assert_eq!(*densities.last().unwrap(), 0.0);
    }

    #[test]
    fn test_histogram_counts_triad() {
        let notes = [
            PerformedNote { pitch: 60, velocity: 100, start_step: 0, end_step: 100 }, // C
            PerformedNote { pitch: 64, velocity: 100, start_step: 0, end_step: 100 }, // E
            PerformedNote { pitch: 67, velocity: 100, start_step: 0, end_step: 100 }, // G
            PerformedNote { pitch: 72, velocity: 100, start_step: 0, end_step: 100 }, // C
        ];
        let perf = Performance::from_notes(&notes, DEFAULT_STEPS_PER_SECOND, 0);
        let histogram = overall_pitch_class_histogram(&perf);
        assert!((histogram[0] - 0.5).abs() < 1e-9); // two Cs of four onsets
        assert!((histogram[4] - 0.25).abs() < 1e-9);
        assert!((histogram[7] - 0.25).abs() < 1e-9);
        assert_eq!(histogram[1], 0.0);
    }

    #[test]
    fn test_empty_window_is_uniform() {
        let perf = Performance::new(DEFAULT_STEPS_PER_SECOND, 0);
        let histogram = overall_pitch_class_histogram(&perf);
        for value in histogram {
            assert!((value - 1.0 / 12.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_overall_density() {
        let perf = metronome();
        // 10 onsets over 9.5 seconds (the last note ends at 9.5 s).
        let expected = 10.0 / perf.duration_seconds();
        assert!((overall_note_density(&perf) - expected).abs() < 1e-9);
    }
}
