// Encore Performance Model — configuration and dispatch layer.
//
// Configures and drives sequence generation for a recurrent network that
// models performance event streams. The network itself, its training loop,
// and the beam-search decoder are external collaborators behind the
// `SequenceEngine` trait; this crate owns everything around that seam:
//
// - control.rs: per-step conditioning signals and the expander that
//   broadcasts a single conditioning intent across every generation step
// - encoding.rs: declarative encoder-decoder topology descriptors (one-hot,
//   conditional, multiple) with input/class size arithmetic
// - config.rs: generator metadata, hyperparameters, and the static registry
//   of the five supported configurations
// - model.rs: the engine trait plus generation and log-likelihood dispatch
//   with conditioning validation
//
// The registry is built eagerly and never mutated; a model instance holds
// one configuration and one engine and is otherwise stateless.

pub mod config;
pub mod control;
pub mod encoding;
pub mod model;
