//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::ProviderNotConfigured(_) => format!(
            "{}\nSet the provider's API key in config/config.toml or the environment.",
            e
        ),
        ApiError::ConfigError(_) => format!("{}\nCheck --config or the workspace config/ directory.", e),
        _ => e.to_string(),
    }
}

/// Process exit code for an error.
pub fn exit_code(e: &ApiError) -> i32 {
    match e {
        ApiError::InvalidRequest(_) | ApiError::UnknownProvider(_) => 2,
        ApiError::ConfigError(_) | ApiError::ProviderNotConfigured(_) => 3,
        _ => 1,
    }
}
