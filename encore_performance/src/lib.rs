// Encore Performance Representation
//
// The event-stream representation shared by the Encore performance model and
// its collaborators. A musical performance is an ordered stream of discrete
// events — note-ons, note-offs, clock advances, velocity changes — rather
// than a piano-roll grid, so expressive timing survives quantization.
//
// Architecture:
// - events.rs: PerformanceEvent / Performance (the event stream itself),
//   note-level conversion, velocity-bin quantization
// - midi.rs: Standard MIDI File input/output for primers and generated output
// - signals.rs: windowed note-density and pitch-class-histogram extraction,
//   the source of conditioning values for the model layer
//
// The event stream is the "source of truth" throughout. MIDI and the
// conditioning signals are derived from it, never the other way around.

pub mod events;
pub mod midi;
pub mod signals;
