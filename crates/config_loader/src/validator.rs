//! Blueprint validation
//!
//! Validation rules:
//! - stream name non-empty
//! - destination names non-empty and unique
//! - drain.workers >= 1, drain.tick_interval_ms >= 1, drain.source_capacity >= 1
//! - feed.rate_hz > 0, feed.records_per_payload >= 1
//! - kind-specific destination params present and well-formed

use std::collections::HashSet;

use contracts::{ContractError, DestinationKind, DrainBlueprint};

/// Validate a DrainBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &DrainBlueprint) -> Result<(), ContractError> {
    validate_stream(blueprint)?;
    validate_drain_settings(blueprint)?;
    validate_feed(blueprint)?;
    validate_destination_names(blueprint)?;
    validate_destination_params(blueprint)?;
    Ok(())
}

/// Validate stream identity
fn validate_stream(blueprint: &DrainBlueprint) -> Result<(), ContractError> {
    if blueprint.stream.name.trim().is_empty() {
        return Err(ContractError::config_validation(
            "stream.name",
            "stream name cannot be empty",
        ));
    }
    Ok(())
}

/// Validate stage tuning
fn validate_drain_settings(blueprint: &DrainBlueprint) -> Result<(), ContractError> {
    let drain = &blueprint.drain;

    if drain.workers == 0 {
        return Err(ContractError::config_validation(
            "drain.workers",
            "workers must be >= 1",
        ));
    }

    if drain.tick_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "drain.tick_interval_ms",
            "tick_interval_ms must be >= 1",
        ));
    }

    if drain.source_capacity == 0 {
        return Err(ContractError::config_validation(
            "drain.source_capacity",
            "source_capacity must be >= 1",
        ));
    }

    Ok(())
}

/// Validate feed tuning
fn validate_feed(blueprint: &DrainBlueprint) -> Result<(), ContractError> {
    let feed = &blueprint.feed;

    if feed.rate_hz <= 0.0 || !feed.rate_hz.is_finite() {
        return Err(ContractError::config_validation(
            "feed.rate_hz",
            format!("rate_hz must be > 0, got {}", feed.rate_hz),
        ));
    }

    if feed.records_per_payload == 0 {
        return Err(ContractError::config_validation(
            "feed.records_per_payload",
            "records_per_payload must be >= 1",
        ));
    }

    Ok(())
}

/// Validate destination name uniqueness
fn validate_destination_names(blueprint: &DrainBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, spec) in blueprint.destinations.iter().enumerate() {
        if spec.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("destinations[{idx}].name"),
                "destination name cannot be empty",
            ));
        }
        if !seen.insert(spec.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("destinations[name={}]", spec.name),
                "duplicate destination name",
            ));
        }
    }
    Ok(())
}

/// Validate kind-specific destination params
fn validate_destination_params(blueprint: &DrainBlueprint) -> Result<(), ContractError> {
    for spec in &blueprint.destinations {
        match spec.kind {
            DestinationKind::File => {
                let path = spec.config.get("path").map(String::as_str).unwrap_or("");
                if path.trim().is_empty() {
                    return Err(ContractError::config_validation(
                        format!("destinations[name={}].config.path", spec.name),
                        "file destinations require a non-empty 'path' param",
                    ));
                }
            }
            DestinationKind::Log => {
                if let Some(level) = spec.config.get("level") {
                    if level != "info" && level != "debug" {
                        return Err(ContractError::config_validation(
                            format!("destinations[name={}].config.level", spec.name),
                            format!("level must be 'info' or 'debug', got '{level}'"),
                        ));
                    }
                }
            }
            DestinationKind::Memory => {
                if let Some(capacity) = spec.config.get("capacity") {
                    if capacity.parse::<usize>().is_err() {
                        return Err(ContractError::config_validation(
                            format!("destinations[name={}].config.capacity", spec.name),
                            format!("capacity must be an unsigned integer, got '{capacity}'"),
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}
