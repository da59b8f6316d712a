use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;

use emosentry_core::emotion::domain::category_mapper::ThreatCategoryMapper;
use emosentry_core::pipeline::analyze_video_use_case::ProgressFn;
use emosentry_core::pipeline::analyzer::{Analyzer, AnalyzerConfig};
use emosentry_core::pipeline::backend_initializer::AnalyzerState;
use emosentry_core::pipeline::stream_aggregator::Summary;
use emosentry_core::shared::constants::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_FRAME_INTERVAL, IMAGE_EXTENSIONS,
};

/// Facial emotion threat analysis for images and videos.
#[derive(Parser)]
#[command(name = "emosentry")]
struct Cli {
    /// Input image or video file.
    input: PathBuf,

    /// Analyze every Nth video frame (1 = every frame).
    #[arg(long, default_value_t = DEFAULT_FRAME_INTERVAL)]
    interval: usize,

    /// Drop detections whose emotion confidence is at or below this (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    threshold: f64,

    /// JSON file mapping categories to emotions, e.g. {"Safe": ["Happy", ...], ...}.
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// BlazeFace ONNX model enabling the fast detector.
    #[arg(long)]
    fast_model: Option<PathBuf>,

    /// Directory searched for model files before downloading them.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Face detector score threshold (0.0-1.0).
    #[arg(long)]
    detector_confidence: Option<f64>,

    /// Write the full result as JSON to this file.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Seconds to wait for backends to load.
    #[arg(long, default_value_t = 120)]
    wait_secs: u64,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let category_mapping = match &cli.mapping {
        Some(path) => ThreatCategoryMapper::from_json_file(path)?,
        None => ThreatCategoryMapper::default(),
    };
    let analyzer = Analyzer::new(AnalyzerConfig {
        confidence_threshold: cli.threshold,
        category_mapping,
        fast_model_path: cli.fast_model.clone(),
        bundled_models_dir: cli.models_dir.clone(),
        detector_confidence: cli.detector_confidence,
    })?;

    analyzer.start_initialization();
    eprintln!("Loading detection backends...");
    let state = analyzer.wait_until_ready(Duration::from_secs(cli.wait_secs));
    for failure in analyzer.unavailable_backends() {
        log::info!("{failure}");
    }
    match state {
        AnalyzerState::Failed => return Err("no detection backend could be loaded".into()),
        AnalyzerState::Initializing => log::warn!(
            "Backends still loading after {}s; continuing with {:?}",
            cli.wait_secs,
            analyzer.available_backends()
        ),
        _ => log::info!("{state}: {:?}", analyzer.available_backends()),
    }

    if is_image(&cli.input) {
        let result = analyzer.analyze_image(&cli.input)?;
        for d in &result.detections {
            let r = d.region();
            println!(
                "face at ({}, {}, {}x{}): {} {:.2} -> {}",
                r.x,
                r.y,
                r.width,
                r.height,
                d.label(),
                d.confidence(),
                d.category()
            );
        }
        print_summary(&result.summary);
        write_json(cli.json.as_deref(), &result)?;
    } else {
        let progress: ProgressFn = Box::new(|done, expected| {
            if expected > 0 {
                eprint!("\rAnalyzing sample {done}/{expected}");
            } else {
                eprint!("\rAnalyzing sample {done}");
            }
            true
        });
        let result = analyzer.analyze_video(&cli.input, cli.interval, Some(progress))?;
        eprintln!();
        println!(
            "{:.1}s at {:.2} fps: {} frame(s) analyzed, {} skipped",
            result.duration_secs,
            result.metadata.fps,
            result.analyzed_frames,
            result.skipped_frames
        );
        print_summary(&result.summary);
        write_json(cli.json.as_deref(), &result)?;
    }

    Ok(())
}

fn print_summary(summary: &Summary) {
    println!("Detections:   {}", summary.total_detections);
    println!(
        "Most common:  {}",
        summary
            .most_common_emotion
            .map_or("None", |e| e.as_str())
    );
    for tally in &summary.category_counts {
        println!("  {:<10} {}", tally.label.as_str(), tally.count);
    }
    println!("Threat level: {}", summary.threat_level);
}

fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(());
    };
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    log::info!("Results written to {}", path.display());
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if cli.interval == 0 {
        return Err("Interval must be at least 1".into());
    }
    if !(0.0..=1.0).contains(&cli.threshold) {
        return Err(format!("Threshold must be between 0.0 and 1.0, got {}", cli.threshold).into());
    }
    if let Some(c) = cli.detector_confidence {
        if !(0.0..=1.0).contains(&c) {
            return Err(format!("Detector confidence must be between 0.0 and 1.0, got {c}").into());
        }
    }
    if let Some(path) = &cli.fast_model {
        if !path.exists() {
            return Err(format!("Fast model not found: {}", path.display()).into());
        }
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
