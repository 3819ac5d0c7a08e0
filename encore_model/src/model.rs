// Generation and log-likelihood dispatch over an injected sequence engine.
//
// The engine — a beam-search decoder over a recurrent network — is an
// external collaborator behind the `SequenceEngine` trait. This module owns
// the two dispatch paths into it:
//
// - generate_performance: expand the caller's conditioning intent into a
//   per-step control sequence, then ask the engine to extend a primer to a
//   target length;
// - performance_log_likelihood: same expansion sized to the scored
//   sequence, submitted to the engine's batched evaluator as a
//   single-element batch.
//
// Conditioning requests are validated against the configuration's declared
// encoder capability before any engine call; everything the engine owns
// (beam semantics, sampling, numeric failures) passes through unchanged.

use std::error::Error;
use std::fmt;

use encore_performance::events::Performance;
use serde::{Deserialize, Serialize};

use crate::config::PerformanceRnnConfig;
use crate::control::{ControlSignal, build_control_sequence};

/// Errors this layer can produce. Engine failures pass through in the
/// `Engine` variant without modification.
#[derive(Debug)]
pub enum ModelError {
    /// The requested conditioning is not supported by the resolved
    /// configuration's encoder.
    InvalidConditioning { reason: String },
    /// Registry lookup by a name that has no entry.
    UnknownConfig(String),
    /// A failure raised by the external engine.
    Engine(Box<dyn Error>),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidConditioning { reason } => {
                write!(f, "invalid conditioning: {reason}")
            }
            ModelError::UnknownConfig(name) => {
                write!(f, "no configuration named '{name}'")
            }
            ModelError::Engine(inner) => write!(f, "engine failure: {inner}"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ModelError::Engine(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }
}

/// Parameters forwarded to the engine's beam search.
///
/// `temperature` must be positive (values above 1.0 increase sampling
/// entropy, below 1.0 decrease it); the beam parameters must be at least 1.
/// Their semantics are owned by the engine, which enforces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f64,
    pub beam_size: usize,
    pub branch_factor: usize,
    pub steps_per_iteration: usize,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        GenerationOptions {
            temperature: 1.0,
            beam_size: 1,
            branch_factor: 1,
            steps_per_iteration: 1,
        }
    }
}

/// The external sequence-generation collaborator.
///
/// Implementations run beam search over a trained network. The model layer
/// never inspects generated content; it only sizes control sequences and
/// forwards calls.
pub trait SequenceEngine {
    /// Extend `primer` to exactly `num_steps` events (primer prefix
    /// included). `control`, when present, carries one value per event of
    /// the final sequence.
    fn generate_events(
        &self,
        num_steps: usize,
        primer: &Performance,
        options: &GenerationOptions,
        control: Option<&[ControlSignal]>,
    ) -> Result<Performance, Box<dyn Error>>;

    /// Evaluate the log likelihood of each sequence in a batch, one result
    /// per input, under shared conditioning.
    fn evaluate_log_likelihood(
        &self,
        sequences: &[Performance],
        control: Option<&[ControlSignal]>,
    ) -> Result<Vec<f64>, Box<dyn Error>>;
}

/// A performance model: one configuration plus one engine.
#[derive(Debug)]
pub struct PerformanceModel<E: SequenceEngine> {
    config: PerformanceRnnConfig,
    engine: E,
}

impl<E: SequenceEngine> PerformanceModel<E> {
    pub fn new(config: PerformanceRnnConfig, engine: E) -> Self {
        PerformanceModel { config, engine }
    }

    /// Build a model from a registry entry by name.
    pub fn from_registry(name: &str, engine: E) -> Result<Self, ModelError> {
        Ok(PerformanceModel::new(crate::config::config_by_name(name)?, engine))
    }

    pub fn config(&self) -> &PerformanceRnnConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Generate a performance from a primer.
    ///
    /// `num_steps` is the length in events of the final sequence, including
    /// the primer prefix. Conditioning values the configuration's encoder
    /// cannot consume are rejected before the engine is called.
    pub fn generate_performance(
        &self,
        num_steps: usize,
        primer: &Performance,
        options: &GenerationOptions,
        note_density: Option<f64>,
        pitch_histogram: Option<&[f64]>,
    ) -> Result<Performance, ModelError> {
        self.check_conditioning(note_density, pitch_histogram)?;
        let control = build_control_sequence(num_steps, note_density, pitch_histogram);
        self.engine
            .generate_events(num_steps, primer, options, control.as_deref())
            .map_err(ModelError::Engine)
    }

    /// Evaluate the log likelihood of a fully observed performance. Larger
    /// (less negative) values mean the sequence is more probable.
    pub fn performance_log_likelihood(
        &self,
        sequence: &Performance,
        note_density: Option<f64>,
        pitch_histogram: Option<&[f64]>,
    ) -> Result<f64, ModelError> {
        self.check_conditioning(note_density, pitch_histogram)?;
        let control = build_control_sequence(sequence.len(), note_density, pitch_histogram);
        let likelihoods = self
            .engine
            .evaluate_log_likelihood(std::slice::from_ref(sequence), control.as_deref())
            .map_err(ModelError::Engine)?;
        match likelihoods.as_slice() {
            [likelihood] => Ok(*likelihood),
            other => Err(ModelError::Engine(
                format!(
                    "engine returned {} likelihoods for a single-sequence batch",
                    other.len()
                )
                .into(),
            )),
        }
    }

    fn check_conditioning(
        &self,
        note_density: Option<f64>,
        pitch_histogram: Option<&[f64]>,
    ) -> Result<(), ModelError> {
        if note_density.is_some() && !self.config.supports_density() {
            return Err(ModelError::InvalidConditioning {
                reason: format!(
                    "configuration '{}' does not condition on note density",
                    self.config.details.id
                ),
            });
        }
        if pitch_histogram.is_some() && !self.config.supports_pitch_histogram() {
            return Err(ModelError::InvalidConditioning {
                reason: format!(
                    "configuration '{}' does not condition on pitch-class histograms",
                    self.config.details.id
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every call it receives and returns canned results.
    #[derive(Debug)]
    struct RecordingEngine {
        generate_calls: RefCell<Vec<(usize, Option<Vec<ControlSignal>>)>>,
        likelihood_calls: RefCell<Vec<(usize, Option<Vec<ControlSignal>>)>>,
        likelihood_batch: Vec<f64>,
    }

    impl RecordingEngine {
        fn new() -> Self {
            RecordingEngine {
                generate_calls: RefCell::new(Vec::new()),
                likelihood_calls: RefCell::new(Vec::new()),
                likelihood_batch: vec![-42.5],
            }
        }

        fn with_likelihood_batch(batch: Vec<f64>) -> Self {
            RecordingEngine {
                likelihood_batch: batch,
                ..RecordingEngine::new()
            }
        }
    }

    impl SequenceEngine for RecordingEngine {
        fn generate_events(
            &self,
            num_steps: usize,
            primer: &Performance,
            _options: &GenerationOptions,
            control: Option<&[ControlSignal]>,
        ) -> Result<Performance, Box<dyn Error>> {
            self.generate_calls
                .borrow_mut()
                .push((num_steps, control.map(|c| c.to_vec())));
            Ok(primer.clone())
        }

        fn evaluate_log_likelihood(
            &self,
            sequences: &[Performance],
            control: Option<&[ControlSignal]>,
        ) -> Result<Vec<f64>, Box<dyn Error>> {
            self.likelihood_calls
                .borrow_mut()
                .push((sequences.len(), control.map(|c| c.to_vec())));
            Ok(self.likelihood_batch.clone())
        }
    }

    fn model(name: &str) -> PerformanceModel<RecordingEngine> {
        PerformanceModel::from_registry(name, RecordingEngine::new()).unwrap()
    }

    #[test]
    fn test_unconditioned_generate_passes_absence() {
        let model = model("performance");
        let primer = Performance::new(100, 0);
        model
            .generate_performance(64, &primer, &GenerationOptions::default(), None, None)
            .unwrap();

        let calls = model.engine().generate_calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (64, None));
    }

    #[test]
    fn test_density_conditioning_broadcasts() {
        let model = model("density_conditioned_performance_with_dynamics");
        let primer = Performance::new(100, 32);
        model
            .generate_performance(10, &primer, &GenerationOptions::default(), Some(4.0), None)
            .unwrap();

        let calls = model.engine().generate_calls.borrow();
        let (num_steps, control) = &calls[0];
        assert_eq!(*num_steps, 10);
        let control = control.as_ref().unwrap();
        assert_eq!(control.len(), 10);
        assert!(control.iter().all(|c| *c == ControlSignal::NoteDensity(4.0)));
    }

    #[test]
    fn test_unsupported_density_never_reaches_engine() {
        let model = model("performance");
        let primer = Performance::new(100, 0);
        let err = model
            .generate_performance(10, &primer, &GenerationOptions::default(), Some(4.0), None)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidConditioning { .. }));
        assert!(model.engine().generate_calls.borrow().is_empty());
    }

    #[test]
    fn test_unsupported_histogram_rejected_for_density_config() {
        let model = model("density_conditioned_performance_with_dynamics");
        let primer = Performance::new(100, 32);
        let histogram = [1.0 / 12.0; 12];
        let err = model
            .generate_performance(
                10,
                &primer,
                &GenerationOptions::default(),
                None,
                Some(&histogram),
            )
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidConditioning { .. }));
    }

    #[test]
    fn test_likelihood_submits_single_element_batch() {
        let model = model("performance");
        let mut sequence = Performance::new(100, 0);
        for _ in 0..5 {
            sequence.shift(20);
        }
        assert_eq!(sequence.len(), 5);

        let likelihood = model
            .performance_log_likelihood(&sequence, None, None)
            .unwrap();
        assert_eq!(likelihood, -42.5);

        let calls = model.engine().likelihood_calls.borrow();
        assert_eq!(calls.len(), 1);
        // One sequence, absence marker for controls.
        assert_eq!(calls[0], (1, None));
    }

    #[test]
    fn test_likelihood_control_sized_to_sequence() {
        let model = model("multiconditioned_performance_with_dynamics");
        let mut sequence = Performance::new(100, 32);
        for _ in 0..7 {
            sequence.shift(10);
        }
        let histogram = [1.0 / 12.0; 12];
        model
            .performance_log_likelihood(&sequence, Some(2.0), Some(&histogram))
            .unwrap();

        let calls = model.engine().likelihood_calls.borrow();
        let control = calls[0].1.as_ref().unwrap();
        assert_eq!(control.len(), 7);
        assert!(
            control
                .iter()
                .all(|c| *c == ControlSignal::DensityAndHistogram(2.0, histogram.to_vec()))
        );
    }

    #[test]
    fn test_wrong_batch_size_is_an_engine_error() {
        let engine = RecordingEngine::with_likelihood_batch(vec![-1.0, -2.0]);
        let model = PerformanceModel::from_registry("performance", engine).unwrap();
        let sequence = Performance::new(100, 0);
        let err = model
            .performance_log_likelihood(&sequence, None, None)
            .unwrap_err();
        assert!(matches!(err, ModelError::Engine(_)));
    }

    #[test]
    fn test_from_registry_unknown_name() {
        let err = PerformanceModel::from_registry("melody_rnn", RecordingEngine::new()).unwrap_err();
        assert!(matches!(err, ModelError::UnknownConfig(_)));
    }
}
