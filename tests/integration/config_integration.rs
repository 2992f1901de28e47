//! Integration tests for configuration layering

use super::test_utils::with_isolated_env;
use cli_bridge::config::{BridgeConfig, ConfigLoader, ValidationError};
use std::fs;
use std::time::Duration;

fn write_workspace_file(root: &std::path::Path, name: &str, contents: &str) {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join(name), contents).unwrap();
}

#[test]
fn test_defaults_without_any_sources() {
    with_isolated_env(|temp| {
        let config = ConfigLoader::load(temp.path()).unwrap();
        assert_eq!(config.console.prefix, "esp ");
        assert_eq!(config.console.prompt, "> ");
        assert_eq!(config.console.max_line_len, 256);
        assert_eq!(config.console.history_len, 100);
        assert_eq!(config.console.command_name, "stack");
        assert_eq!(config.worker.context, "Network");
        assert_eq!(config.worker.queue_capacity, 16);
        assert_eq!(config.worker.completion_timeout(), None);
        assert!(config.validate().is_ok());
    });
}

#[test]
fn test_global_file_is_overridden_by_workspace_file() {
    with_isolated_env(|temp| {
        let global_dir = temp.path().join("xdg").join("cli-bridge");
        fs::create_dir_all(&global_dir).unwrap();
        fs::write(
            global_dir.join("config.toml"),
            "[console]\nprefix = \"g \"\nhistory_len = 7\n",
        )
        .unwrap();
        assert_eq!(
            ConfigLoader::global_config_path(),
            Some(global_dir.join("config.toml"))
        );

        let workspace = temp.path().join("ws");
        write_workspace_file(&workspace, "config.toml", "[console]\nprefix = \"w \"\n");

        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config.console.prefix, "w ");
        assert_eq!(config.console.history_len, 7);
    });
}

#[test]
fn test_environment_file_and_variables() {
    with_isolated_env(|temp| {
        write_workspace_file(
            temp.path(),
            "config.toml",
            "[worker]\ncontext = \"Base\"\nqueue_capacity = 2\n",
        );
        write_workspace_file(temp.path(), "lab.toml", "[worker]\ncontext = \"Lab\"\n");
        std::env::set_var("CLI_BRIDGE_ENV", "lab");

        let config = ConfigLoader::load(temp.path()).unwrap();
        assert_eq!(config.worker.context, "Lab");
        assert_eq!(config.worker.queue_capacity, 2);

        std::env::set_var("CLI_BRIDGE__WORKER__QUEUE_CAPACITY", "9");
        std::env::set_var("CLI_BRIDGE__CONSOLE__HISTORY_LEN", "3");
        let config = ConfigLoader::load(temp.path()).unwrap();
        assert_eq!(config.worker.queue_capacity, 9);
        assert_eq!(config.console.history_len, 3);
        assert_eq!(config.worker.context, "Lab");
    });
}

#[test]
fn test_explicit_file_skips_workspace_files() {
    with_isolated_env(|temp| {
        write_workspace_file(temp.path(), "config.toml", "[console]\nprefix = \"w \"\n");
        let explicit = temp.path().join("explicit.toml");
        fs::write(
            &explicit,
            "[worker]\ncompletion_timeout_ms = 1500\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&explicit).unwrap();
        assert_eq!(config.console.prefix, "esp ");
        assert_eq!(
            config.worker.completion_timeout(),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(config.logging.level, "debug");
    });
}

#[test]
fn test_invalid_values_are_reported_together() {
    with_isolated_env(|temp| {
        write_workspace_file(
            temp.path(),
            "config.toml",
            "[console]\nmax_line_len = 2\n\n[logging]\nformat = \"yaml\"\n",
        );
        let config: BridgeConfig = ConfigLoader::load(temp.path()).unwrap();
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ValidationError::Console(_)));
        assert!(matches!(errors[1], ValidationError::Logging(_)));
    });
}
