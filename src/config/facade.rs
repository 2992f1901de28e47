//! Config loading facade: assembles sources in precedence order and deserializes.

use super::merge::merge_policy::builder_with_defaults;
use super::sources::{env_vars, global_file, workspace_file};
use super::BridgeConfig;
use config::{ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads [`BridgeConfig`] from defaults, files and environment
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, global file, `config/config.toml`,
    /// `config/{CLI_BRIDGE_ENV}.toml`, environment.
    pub fn load(workspace_root: &Path) -> Result<BridgeConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = env_vars::add_to_builder(builder);

        let config: BridgeConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load configuration from one explicit file (plus defaults and environment).
    pub fn load_from_file(path: &Path) -> Result<BridgeConfig, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let builder = builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true));
        let builder = env_vars::add_to_builder(builder);

        let config: BridgeConfig = builder.build()?.try_deserialize()?;
        debug!(file = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Path of the global user config file, if one can be determined
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
