// The configuration registry: five named performance-model configurations.
//
// Each entry bundles generator metadata, the encoder-decoder topology, the
// training/inference hyperparameters, and the four performance-specific
// feature fields (velocity bins, density bin edges, density window, pitch
// window). Feature defaults mean "off": 0 velocity bins disables dynamics,
// absent bin edges disable density conditioning, an absent pitch window
// disables histogram conditioning.
//
// The registry is built eagerly in plain code — no lazy statics, no
// runtime mutation path. Lookup by an unknown name is an error, never a
// silent default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::encoding::{ControlEncoding, EncoderDecoderSpec, EventEncoding};
use crate::model::ModelError;

/// Identifies a configuration to client tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorDetails {
    pub id: String,
    pub description: String,
}

impl GeneratorDetails {
    pub fn new(id: &str, description: &str) -> Self {
        GeneratorDetails {
            id: id.to_string(),
            description: description.to_string(),
        }
    }
}

/// Training and inference knobs. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub batch_size: usize,
    pub rnn_layer_sizes: Vec<usize>,
    pub dropout_keep_prob: f64,
    pub clip_norm: f64,
    pub learning_rate: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Hyperparameters {
            batch_size: 64,
            rnn_layer_sizes: vec![512, 512, 512],
            dropout_keep_prob: 1.0,
            clip_norm: 3.0,
            learning_rate: 0.001,
        }
    }
}

/// One complete performance-model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRnnConfig {
    pub details: GeneratorDetails,
    pub encoder: EncoderDecoderSpec,
    pub hparams: Hyperparameters,
    /// Velocity bins for the event vocabulary. 0 = dynamics off.
    pub num_velocity_bins: u32,
    /// Density bin edges (onsets per second) for density conditioning.
    /// Absent = density conditioning off.
    pub density_bin_ranges: Option<Vec<f64>>,
    /// Window (seconds) over which note density is measured.
    pub density_window_size: f64,
    /// Window (seconds) over which pitch-class histograms are measured.
    /// Absent = histogram conditioning off.
    pub pitch_histogram_window_size: Option<f64>,
}

impl PerformanceRnnConfig {
    /// Whether this configuration's encoder consumes a note-density control.
    pub fn supports_density(&self) -> bool {
        self.encoder.supports_density()
    }

    /// Whether this configuration's encoder consumes a pitch-histogram
    /// control.
    pub fn supports_pitch_histogram(&self) -> bool {
        self.encoder.supports_pitch_histogram()
    }
}

/// Density bin edges shared by every density-conditioned configuration.
const DENSITY_BIN_RANGES: [f64; 7] = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0];

/// Density window (seconds) shared by every density-conditioned
/// configuration.
const DENSITY_WINDOW_SIZE: f64 = 3.0;

/// Pitch-histogram window (seconds) shared by every pitch-conditioned
/// configuration.
const PITCH_HISTOGRAM_WINDOW_SIZE: f64 = 5.0;

fn density_control() -> ControlEncoding {
    ControlEncoding::NoteDensityOneHot {
        bin_ranges: DENSITY_BIN_RANGES.to_vec(),
    }
}

/// Build the full registry. Called eagerly wherever the registry is needed;
/// the result is immutable by convention and cheap to construct.
pub fn default_configs() -> BTreeMap<&'static str, PerformanceRnnConfig> {
    let mut configs = BTreeMap::new();

    configs.insert(
        "performance",
        PerformanceRnnConfig {
            details: GeneratorDetails::new("performance", "Performance RNN"),
            encoder: EncoderDecoderSpec::OneHot(EventEncoding::PerformanceOneHot {
                num_velocity_bins: 0,
            }),
            hparams: Hyperparameters::default(),
            num_velocity_bins: 0,
            density_bin_ranges: None,
            density_window_size: DENSITY_WINDOW_SIZE,
            pitch_histogram_window_size: None,
        },
    );

    configs.insert(
        "performance_with_dynamics",
        PerformanceRnnConfig {
            details: GeneratorDetails::new(
                "performance_with_dynamics",
                "Performance RNN with dynamics",
            ),
            encoder: EncoderDecoderSpec::OneHot(EventEncoding::PerformanceOneHot {
                num_velocity_bins: 32,
            }),
            hparams: Hyperparameters::default(),
            num_velocity_bins: 32,
            density_bin_ranges: None,
            density_window_size: DENSITY_WINDOW_SIZE,
            pitch_histogram_window_size: None,
        },
    );

    configs.insert(
        "density_conditioned_performance_with_dynamics",
        PerformanceRnnConfig {
            details: GeneratorDetails::new(
                "density_conditioned_performance_with_dynamics",
                "Note-density-conditioned Performance RNN + dynamics",
            ),
            encoder: EncoderDecoderSpec::Conditional {
                control: density_control(),
                events: EventEncoding::PerformanceOneHot {
                    num_velocity_bins: 32,
                },
            },
            hparams: Hyperparameters::default(),
            num_velocity_bins: 32,
            density_bin_ranges: Some(DENSITY_BIN_RANGES.to_vec()),
            density_window_size: DENSITY_WINDOW_SIZE,
            pitch_histogram_window_size: None,
        },
    );

    configs.insert(
        "pitch_conditioned_performance_with_dynamics",
        PerformanceRnnConfig {
            details: GeneratorDetails::new(
                "pitch_conditioned_performance_with_dynamics",
                "Pitch-histogram-conditioned Performance RNN",
            ),
            encoder: EncoderDecoderSpec::Conditional {
                control: ControlEncoding::PitchHistogram,
                events: EventEncoding::PerformanceOneHot {
                    num_velocity_bins: 32,
                },
            },
            hparams: Hyperparameters::default(),
            num_velocity_bins: 32,
            density_bin_ranges: None,
            density_window_size: DENSITY_WINDOW_SIZE,
            pitch_histogram_window_size: Some(PITCH_HISTOGRAM_WINDOW_SIZE),
        },
    );

    configs.insert(
        "multiconditioned_performance_with_dynamics",
        PerformanceRnnConfig {
            details: GeneratorDetails::new(
                "multiconditioned_performance_with_dynamics",
                "Density- and pitch-conditioned Performance RNN",
            ),
            encoder: EncoderDecoderSpec::Conditional {
                control: ControlEncoding::Multiple(vec![
                    density_control(),
                    ControlEncoding::PitchHistogram,
                ]),
                events: EventEncoding::PerformanceOneHot {
                    num_velocity_bins: 32,
                },
            },
            hparams: Hyperparameters::default(),
            num_velocity_bins: 32,
            density_bin_ranges: Some(DENSITY_BIN_RANGES.to_vec()),
            density_window_size: DENSITY_WINDOW_SIZE,
            pitch_histogram_window_size: Some(PITCH_HISTOGRAM_WINDOW_SIZE),
        },
    );

    configs
}

/// Look up one configuration by name. Unknown names are an error, never a
/// default.
pub fn config_by_name(name: &str) -> Result<PerformanceRnnConfig, ModelError> {
    default_configs()
        .remove(name)
        .ok_or_else(|| ModelError::UnknownConfig(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_exactly_five_entries() {
        let configs = default_configs();
        let names: Vec<&str> = configs.keys().copied().collect();
        assert_eq!(
            names,
            vec![
                "density_conditioned_performance_with_dynamics",
                "multiconditioned_performance_with_dynamics",
                "performance",
                "performance_with_dynamics",
                "pitch_conditioned_performance_with_dynamics",
            ]
        );
    }

    #[test]
    fn test_feature_flags_are_consistent() {
        for (name, config) in default_configs() {
            // The declared feature fields and the encoder topology must
            // agree on which control channels exist.
            assert_eq!(
                config.density_bin_ranges.is_some(),
                config.supports_density(),
                "density mismatch in {name}"
            );
            assert_eq!(
                config.pitch_histogram_window_size.is_some(),
                config.supports_pitch_histogram(),
                "pitch mismatch in {name}"
            );
            assert_eq!(config.details.id, name);
        }
    }

    #[test]
    fn test_plain_performance_has_everything_off() {
        let config = config_by_name("performance").unwrap();
        assert_eq!(config.num_velocity_bins, 0);
        assert_eq!(config.density_bin_ranges, None);
        assert_eq!(config.pitch_histogram_window_size, None);
        assert_eq!(config.encoder.num_classes(), 356);
    }

    #[test]
    fn test_multiconditioned_has_everything_on() {
        let config = config_by_name("multiconditioned_performance_with_dynamics").unwrap();
        assert_eq!(config.num_velocity_bins, 32);
        assert_eq!(
            config.density_bin_ranges,
            Some(vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0])
        );
        assert_eq!(config.density_window_size, 3.0);
        assert_eq!(config.pitch_histogram_window_size, Some(5.0));
        // 8 density bins + 12 histogram entries + 388 event classes.
        assert_eq!(config.encoder.input_size(), 408);
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        let err = config_by_name("polyphony_rnn").unwrap_err();
        assert!(matches!(err, ModelError::UnknownConfig(ref name) if name == "polyphony_rnn"));
    }

    #[test]
    fn test_config_survives_json() {
        let config = config_by_name("multiconditioned_performance_with_dynamics").unwrap();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: PerformanceRnnConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
