//! Per-workspace bridge settings: `<workspace>/config/config.toml`, then a profile
//! file picked by `CLI_BRIDGE_ENV` (for example `config/lab.toml` for a lab stack).

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Variable selecting the profile file
pub const PROFILE_VAR: &str = "CLI_BRIDGE_ENV";

const DEFAULT_PROFILE: &str = "development";
const BASE_FILE: &str = "config.toml";

/// Active profile, `development` when unset or empty.
pub fn profile() -> String {
    std::env::var(PROFILE_VAR)
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
}

/// Workspace files for `profile` that exist on disk, lowest precedence first.
pub fn layer_files(workspace_root: &Path, profile: &str) -> Vec<PathBuf> {
    let dir = workspace_root.join("config");
    let mut candidates = vec![dir.join(BASE_FILE)];
    let profile_file = format!("{}.toml", profile);
    if profile_file != BASE_FILE {
        candidates.push(dir.join(profile_file));
    }
    candidates.into_iter().filter(|path| path.is_file()).collect()
}

/// Layer the workspace files over `builder`.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let profile = profile();
    let files = layer_files(workspace_root, &profile);
    if files.is_empty() {
        debug!(
            workspace = %workspace_root.display(),
            %profile,
            "No workspace configuration files"
        );
    }
    Ok(files.into_iter().fold(builder, |builder, path| {
        debug!(config_path = %path.display(), "Adding workspace configuration");
        builder.add_source(File::from(path).required(false))
    }))
}
