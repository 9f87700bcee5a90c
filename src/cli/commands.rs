//! Command implementations

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::adapters::sink_libav::LibavFrameSink;
use crate::adapters::source_libav::LibavFrameSource;
use crate::adapters::toml_config::FileConfig;
use crate::cli::args::{AnalyzeArgs, DecimateArgs, InspectArgs};
use crate::config_initialization::{resolve_decimate, resolve_retention, RetentionSettings};
use crate::domain::model::StreamInfo;
use crate::engine::progress::{JsonProgressCallback, LogProgressCallback};
use crate::engine::{DecimationPipeline, FrameComparator, PipelineReport, ProgressTracker};
use crate::error::DecimateError;
use crate::ports::{DiscardSink, FrameSink, FrameSource};
use crate::utils::{format_duration, format_file_size};

/// Execute the decimate command
pub fn decimate(args: DecimateArgs, file: &FileConfig) -> Result<()> {
    info!("Starting decimate operation");
    info!("Input: {}", args.input.display());
    info!("Output: {}", args.output.display());

    let settings = resolve_decimate(&args, file)?;

    if args.output.exists() && !settings.overwrite {
        return Err(DecimateError::OutputExists {
            path: args.output.display().to_string(),
        }
        .into());
    }

    let mut source = LibavFrameSource::open(&args.input).context("Failed to open input file")?;
    let mut sink = LibavFrameSink::create(&args.output, source.info(), &settings.encoder)
        .context("Failed to create output file")?;

    let tracker = progress_tracker(args.no_progress, args.json);
    let pipeline = build_pipeline(&settings.retention).with_progress(tracker);

    let report = match pipeline.run(&mut source, &mut sink) {
        Ok(report) => report,
        Err(e) => {
            // Keep what was written readable.
            if let Err(finish_error) = sink.finish() {
                warn!("Could not finalize partial output: {}", finish_error);
            }
            return Err(e).context("Decimation failed");
        }
    };

    if args.json {
        let json = serde_json::to_string(&report).context("Failed to serialize report to JSON")?;
        println!("{}", json);
    } else {
        display_report(&report, source.info(), false);
        println!("Output size: {}", format_file_size(sink.bytes_written()));
    }

    info!("Decimate operation completed successfully");
    Ok(())
}

/// Execute the inspect command
pub fn inspect(args: InspectArgs) -> Result<()> {
    info!("Starting inspect operation");
    info!("Input: {}", args.input.display());

    let source = LibavFrameSource::open(&args.input).context("Failed to inspect input file")?;

    if args.json {
        let json = serde_json::to_string_pretty(source.info())
            .context("Failed to serialize stream info to JSON")?;
        println!("{}", json);
    } else {
        display_stream_info(source.info());
    }

    info!("Inspect operation completed successfully");
    Ok(())
}

/// Execute the analyze command: a full pass that discards every kept frame
pub fn analyze(args: AnalyzeArgs, file: &FileConfig) -> Result<()> {
    info!("Starting analyze operation");
    info!("Input: {}", args.input.display());

    let retention = resolve_retention(&args.retention, file)?;
    let mut source = LibavFrameSource::open(&args.input).context("Failed to open input file")?;
    let mut sink = DiscardSink::new();

    let report = build_pipeline(&retention)
        .run(&mut source, &mut sink)
        .context("Analysis failed")?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report to JSON")?;
        println!("{}", json);
    } else {
        display_report(&report, source.info(), true);
    }

    info!("Analyze operation completed successfully");
    Ok(())
}

fn build_pipeline(retention: &RetentionSettings) -> DecimationPipeline {
    DecimationPipeline::new(retention.limit).with_comparator(FrameComparator::new(retention.key_mode))
}

fn progress_tracker(disabled: bool, json: bool) -> ProgressTracker {
    let tracker = ProgressTracker::new();
    if !disabled {
        if json {
            tracker.add_callback(Arc::new(JsonProgressCallback));
        } else {
            tracker.add_callback(Arc::new(LogProgressCallback));
        }
    }
    tracker
}

/// Display stream information in human-readable format
fn display_stream_info(info: &StreamInfo) {
    println!("Stream Information:");
    println!("  Codec: {}", info.codec);
    println!("  Resolution: {}x{}", info.width, info.height);
    println!("  Frame Rate: {}", info.frame_rate);
    match info.frame_count {
        Some(count) => println!("  Frames: {}", count),
        None => println!("  Frames: unknown"),
    }
    if let Some(seconds) = info.duration_seconds {
        println!("  Duration: {}", format_duration(Duration::from_secs_f64(seconds)));
    }
}

/// Display a pipeline report in human-readable format
fn display_report(report: &PipelineReport, info: &StreamInfo, dry_run: bool) {
    let verb = if dry_run { "Would drop" } else { "Dropped" };

    println!("Decimation Summary:");
    println!("  Frames read: {}", report.frames_read);
    println!("  Frames kept: {}", report.frames_written);
    println!(
        "  {}: {} ({:.1}%)",
        verb,
        report.frames_dropped,
        report.drop_ratio()
    );
    println!("  Runs: {}", report.runs);
    println!("  Longest run: {}", report.longest_run);
    println!(
        "  Runs longer than {}: {}",
        report.retention_limit, report.truncated_runs
    );
    println!("  Compared by: {:?}", report.key_mode);
    println!(
        "  Output duration: {}",
        format_duration(Duration::from_secs_f64(
            report.frames_written as f64 * info.frame_rate.frame_duration()
        ))
    );
    println!(
        "  Processing time: {}",
        format_duration(Duration::from_millis(report.elapsed_ms))
    );
}
