//! Config loading entry points.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::{apply_env_overrides, CarechatConfig};
use crate::error::ApiError;
use config::{Environment, File};
use std::path::Path;
use tracing::debug;

/// Loads `CarechatConfig` from the layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace from every layer.
    pub fn load(workspace_root: &Path) -> Result<CarechatConfig, ApiError> {
        let global = global_file::global_config_path();
        Self::load_layers(
            workspace_root,
            global.as_deref(),
            &workspace_file::env_name(),
        )
    }

    /// Load with an explicit global file and environment name.
    pub fn load_layers(
        workspace_root: &Path,
        global_path: Option<&Path>,
        env_name: &str,
    ) -> Result<CarechatConfig, ApiError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder, global_path)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root, env_name)?;
        let builder = builder.add_source(
            Environment::with_prefix("CARECHAT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: CarechatConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), env = env_name, "configuration loaded");
        apply_env_overrides(config)
    }

    /// Load a single file on top of the defaults (the `--config` flag).
    pub fn load_from_file(path: &Path) -> Result<CarechatConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config: CarechatConfig = merge_policy::builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        apply_env_overrides(config)
    }
}
