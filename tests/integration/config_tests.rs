//! Layered configuration with the real process environment

use assert_fs::prelude::*;
use serial_test::serial;
use std::env;

use usbide::config::{Config, ENV_AUTO_INSTALL, ENV_DEV_TOOLS, ENV_NPM_PACKAGE};

use crate::common::TestEnvironment;

/// Helper to clear every override this crate reads
fn clear_overrides() {
    for key in [
        ENV_AUTO_INSTALL,
        ENV_DEV_TOOLS,
        ENV_NPM_PACKAGE,
        "USBIDE_CODEX_DEVICE_AUTH",
        "USBIDE_CODEX_ALLOW_API_KEY",
        "USBIDE_CODEX_ALLOW_CUSTOM_BASE",
    ] {
        env::remove_var(key);
    }
}

fn isolate_user_config(test_env: &TestEnvironment) {
    env::set_var("XDG_CONFIG_HOME", test_env.root.join("xdg"));
}

#[test]
#[serial]
fn defaults_without_files_or_overrides() {
    let test_env = TestEnvironment::new();
    isolate_user_config(&test_env);
    clear_overrides();

    let config = Config::load(&test_env.root).unwrap();
    assert_eq!(config, Config::default());
    assert!(config.codex.auto_install);
    assert_eq!(config.dev_tools, vec!["ruff", "black", "mypy", "pytest"]);
}

#[test]
#[serial]
fn workspace_file_then_environment() {
    let test_env = TestEnvironment::new();
    isolate_user_config(&test_env);
    clear_overrides();
    test_env
        .temp_dir
        .child(".usbide/config.toml")
        .write_str(
            r#"
dev_tools = ["ruff"]

[codex]
auto_install = false
npm_package = "@openai/codex@0.40.0"
"#,
        )
        .unwrap();

    let config = Config::load(&test_env.root).unwrap();
    assert!(!config.codex.auto_install);
    assert_eq!(config.codex.npm_package, "@openai/codex@0.40.0");
    assert_eq!(config.dev_tools, vec!["ruff"]);

    env::set_var(ENV_AUTO_INSTALL, "yes");
    env::set_var(ENV_DEV_TOOLS, "black, mypy black");
    let config = Config::load(&test_env.root).unwrap();
    clear_overrides();

    assert!(config.codex.auto_install);
    assert_eq!(config.dev_tools, vec!["black", "mypy"]);
    assert_eq!(config.codex.npm_package, "@openai/codex@0.40.0");
}

#[test]
#[serial]
fn malformed_workspace_file_is_an_error() {
    let test_env = TestEnvironment::new();
    isolate_user_config(&test_env);
    clear_overrides();
    test_env
        .temp_dir
        .child(".usbide/config.toml")
        .write_str("[codex\nauto_install = ")
        .unwrap();

    let err = Config::load(&test_env.root).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse config file"));
}
