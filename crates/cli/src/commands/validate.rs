//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::DrainBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    destinations: Vec<DestinationRow>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    stream: String,
    workers: usize,
    payload_count: u64,
    destination_count: usize,
}

#[derive(Serialize)]
struct DestinationRow {
    name: String,
    kind: String,
    params: Vec<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating blueprint");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result, args.detailed);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Blueprint validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
            destinations: Vec::new(),
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let destinations = if args.detailed || args.json {
                blueprint
                    .destinations
                    .iter()
                    .map(|spec| DestinationRow {
                        name: spec.name.to_string(),
                        kind: spec.kind.to_string(),
                        params: spec
                            .config
                            .iter()
                            .map(|(key, value)| format!("{key}={value}"))
                            .collect(),
                    })
                    .collect()
            } else {
                Vec::new()
            };

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    stream: blueprint.stream.name.clone(),
                    workers: blueprint.drain.workers,
                    payload_count: blueprint.feed.payload_count,
                    destination_count: blueprint.destinations.len(),
                }),
                destinations,
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
            destinations: Vec::new(),
        },
    }
}

/// Collect blueprint warnings (non-fatal issues)
fn collect_warnings(blueprint: &DrainBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.destinations.is_empty() {
        warnings.push("No destinations configured - payloads have nowhere to go".to_string());
    }

    if blueprint.feed.payload_count == 0 {
        warnings.push(
            "feed.payload_count is 0 - the run only ends on a signal or --duration".to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult, detailed: bool) {
    if result.valid {
        println!("✓ Blueprint is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Stream: {}", summary.stream);
            println!("  Workers per destination: {}", summary.workers);
            println!("  Feed payloads: {}", summary.payload_count);
            println!("  Destinations: {}", summary.destination_count);
        }

        if detailed && !result.destinations.is_empty() {
            println!("\n  Destination table:");
            for row in &result.destinations {
                if row.params.is_empty() {
                    println!("    - {} ({})", row.name, row.kind);
                } else {
                    println!("    - {} ({}): {}", row.name, row.kind, row.params.join(", "));
                }
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Blueprint is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
