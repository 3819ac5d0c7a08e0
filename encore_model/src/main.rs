// Encore configuration inspector — CLI entry point.
//
// Lists the model configuration registry, shows a single configuration
// (optionally as JSON), and extracts conditioning signals from a MIDI
// primer — the density and histogram values a caller would condition a
// generation run on to get "more of the same".
//
// Usage:
//   inspect [--list] [--config NAME] [--json] [--primer FILE.mid]
//     [--steps-per-second N]
//
// With no arguments, prints the registry listing.

use encore_model::config::{PerformanceRnnConfig, config_by_name, default_configs};
use encore_performance::events::{DEFAULT_STEPS_PER_SECOND, Performance};
use encore_performance::midi::read_midi;
use encore_performance::signals::{
    note_density, overall_note_density, overall_pitch_class_histogram,
};
use std::path::Path;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let list = args.iter().any(|a| a == "--list");
    let json = args.iter().any(|a| a == "--json");
    let config_name: Option<String> = parse_flag(&args, "--config");
    let primer_path: Option<String> = parse_flag(&args, "--primer");
    let steps_per_second: u32 =
        parse_flag(&args, "--steps-per-second").unwrap_or(DEFAULT_STEPS_PER_SECOND);

    if list || (config_name.is_none() && primer_path.is_none()) {
        print_registry();
        if config_name.is_none() && primer_path.is_none() {
            return;
        }
    }

    let config = config_name.map(|name| match config_by_name(&name) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("Use --list to see the available configurations.");
            std::process::exit(1);
        }
    });

    if let Some(config) = &config {
        if json {
            match serde_json::to_string_pretty(config) {
                Ok(text) => println!("{text}"),
                Err(e) => {
                    eprintln!("Failed to serialize configuration: {e}");
                    std::process::exit(1);
                }
            }
        } else {
            print_config(config);
        }
    }

    if let Some(path) = primer_path {
        let num_velocity_bins = config.as_ref().map(|c| c.num_velocity_bins).unwrap_or(0);
        let performance = match read_midi(Path::new(&path), steps_per_second, num_velocity_bins) {
            Ok(performance) => performance,
            Err(e) => {
                eprintln!("Failed to read {path}: {e}");
                std::process::exit(1);
            }
        };
        print_primer_report(&path, &performance, config.as_ref());
    }
}

fn print_registry() {
    let configs = default_configs();
    println!("=== Encore configuration registry ===");
    println!("{} configurations:", configs.len());
    println!();
    for (name, config) in &configs {
        println!("{name}");
        println!("  {}", config.details.description);
        println!(
            "  velocity bins: {}  density: {}  pitch histogram: {}",
            config.num_velocity_bins,
            if config.supports_density() { "yes" } else { "no" },
            if config.supports_pitch_histogram() { "yes" } else { "no" },
        );
        println!(
            "  encoder: {} inputs -> {} classes",
            config.encoder.input_size(),
            config.encoder.num_classes()
        );
        println!();
    }
}

fn print_config(config: &PerformanceRnnConfig) {
    println!("=== {} ===", config.details.id);
    println!("{}", config.details.description);
    println!();
    println!("Velocity bins: {}", config.num_velocity_bins);
    match &config.density_bin_ranges {
        Some(ranges) => println!(
            "Density conditioning: bins {:?}, window {:.1}s",
            ranges, config.density_window_size
        ),
        None => println!("Density conditioning: off"),
    }
    match config.pitch_histogram_window_size {
        Some(window) => println!("Pitch-histogram conditioning: window {window:.1}s"),
        None => println!("Pitch-histogram conditioning: off"),
    }
    println!(
        "Encoder: {} inputs -> {} classes",
        config.encoder.input_size(),
        config.encoder.num_classes()
    );
    println!(
        "Hyperparameters: batch {}, layers {:?}, dropout keep {:.2}, clip {:.1}, lr {}",
        config.hparams.batch_size,
        config.hparams.rnn_layer_sizes,
        config.hparams.dropout_keep_prob,
        config.hparams.clip_norm,
        config.hparams.learning_rate,
    );
}

fn print_primer_report(path: &str, performance: &Performance, config: Option<&PerformanceRnnConfig>) {
    println!();
    println!("=== Primer: {path} ===");
    println!(
        "{} events, {} clock steps ({:.1}s), {} notes",
        performance.len(),
        performance.num_steps(),
        performance.duration_seconds(),
        performance.to_notes().len(),
    );

    let density_window = config.map(|c| c.density_window_size).unwrap_or(3.0);
    let densities = note_density(performance, density_window);
    if let (Some(min), Some(max)) = (
        densities.iter().copied().reduce(f64::min),
        densities.iter().copied().reduce(f64::max),
    ) {
        let mean = densities.iter().sum::<f64>() / densities.len() as f64;
        println!(
            "Note density ({density_window:.1}s window): min {min:.2} / mean {mean:.2} / max {max:.2} onsets/s"
        );
    }
    println!(
        "Overall note density: {:.2} onsets/s",
        overall_note_density(performance)
    );

    let histogram = overall_pitch_class_histogram(performance);
    println!("Overall pitch-class histogram:");
    for (pc, weight) in histogram.iter().enumerate() {
        if *weight > 0.0 {
            println!("  {:<2} {:.3}", pitch_name(pc as u8), weight);
        }
    }

    println!();
    println!("Suggested conditioning for a generation run primed with this file:");
    println!("  note_density    = {:.2}", overall_note_density(performance));
    println!(
        "  pitch_histogram = [{}]",
        histogram
            .iter()
            .map(|w| format!("{w:.3}"))
            .collect::<Vec<_>>()
            .join(", ")
    );
}

fn pitch_name(pc: u8) -> &'static str {
    match pc % 12 {
        0 => "C", 1 => "C#", 2 => "D", 3 => "Eb",
        4 => "E", 5 => "F", 6 => "F#", 7 => "G",
        8 => "Ab", 9 => "A", 10 => "Bb", 11 => "B",
        _ => "?"
    }
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
