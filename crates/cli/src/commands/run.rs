//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;
use crate::pipeline::{DrainPipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading blueprint");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Blueprint file not found: {}", args.config.display());
    }

    // Load, parse, and validate the blueprint
    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load blueprint from {}", args.config.display()))?;

    info!(
        stream = %blueprint.stream.name,
        destinations = blueprint.destinations.len(),
        workers = blueprint.drain.workers,
        payloads = blueprint.feed.payload_count,
        rate_hz = blueprint.feed.rate_hz,
        "Blueprint loaded"
    );

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        blueprint,
        duration: if args.duration == 0 {
            None
        } else {
            Some(Duration::from_secs(args.duration))
        },
        payloads: args.payloads,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    // Assemble and run; signal handling happens inside so stages always
    // stop cleanly and the summary still prints after a Ctrl-C.
    let pipeline = DrainPipeline::new(pipeline_config);

    info!("Starting drain stages...");
    let summary = pipeline.run().await.context("Pipeline execution failed")?;

    info!(
        destinations = summary.destinations.len(),
        payloads_written = summary.total_payloads_written(),
        records_written = summary.total_records_written(),
        write_failures = summary.total_write_failures(),
        duration_secs = summary.elapsed.as_secs_f64(),
        "Run complete"
    );

    summary.print_summary();

    info!("Outfall finished");
    Ok(())
}
