//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Only scalar settings get defaults here; section structs fill the rest
/// through serde defaults.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("server.bind", "127.0.0.1")?
        .set_default("server.port", 5000)?
        .set_default("server.environment", "development")?
        .set_default("storage.store_path", ".carechat/store")
}
