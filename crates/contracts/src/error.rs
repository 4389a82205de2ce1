//! Layered error definitions
//!
//! Categorized by source: config / destination / source / general

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Destination Errors =====
    /// Writer setup error
    #[error("destination '{destination}' setup error: {message}")]
    DestinationSetup {
        destination: String,
        message: String,
    },

    /// Writer write error
    #[error("destination '{destination}' write error: {message}")]
    DestinationWrite {
        destination: String,
        message: String,
    },

    /// Writer teardown error
    #[error("destination '{destination}' teardown error: {message}")]
    DestinationTeardown {
        destination: String,
        message: String,
    },

    // ===== Source Errors =====
    /// Source setup error
    #[error("source setup error: {message}")]
    SourceSetup { message: String },

    /// Source read error (terminal for the stage reading it)
    #[error("source read error: {message}")]
    SourceRead { message: String },

    /// Upstream hung up; no more payloads will ever arrive
    #[error("source closed")]
    SourceClosed,

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create writer setup error
    pub fn destination_setup(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DestinationSetup {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create writer write error
    pub fn destination_write(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DestinationWrite {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create writer teardown error
    pub fn destination_teardown(
        destination: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DestinationTeardown {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create source read error
    pub fn source_read(message: impl Into<String>) -> Self {
        Self::SourceRead {
            message: message.into(),
        }
    }

    /// True for errors produced while loading or validating a blueprint.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse { .. } | Self::ConfigValidation { .. }
        )
    }
}
