use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::environment::CredentialPolicy;
use crate::utils::{is_falsy, is_truthy, parse_tool_list};

pub const ENV_AUTO_INSTALL: &str = "USBIDE_CODEX_AUTO_INSTALL";
pub const ENV_DEVICE_AUTH: &str = "USBIDE_CODEX_DEVICE_AUTH";
pub const ENV_NPM_PACKAGE: &str = "USBIDE_CODEX_NPM_PACKAGE";
pub const ENV_DEV_TOOLS: &str = "USBIDE_DEV_TOOLS";
pub const ENV_ALLOW_API_KEY: &str = "USBIDE_CODEX_ALLOW_API_KEY";
pub const ENV_ALLOW_CUSTOM_BASE: &str = "USBIDE_CODEX_ALLOW_CUSTOM_BASE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub codex: CodexConfig,
    /// Python tools installed by the dev-tools action
    #[serde(default = "default_dev_tools")]
    pub dev_tools: Vec<String>,
}

/// Assistant CLI settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodexConfig {
    /// Install the CLI on first use when it is missing (default: true)
    #[serde(default = "default_true")]
    pub auto_install: bool,

    /// Use `login --device-auth` instead of the browser flow
    #[serde(default)]
    pub device_auth: bool,

    /// npm package providing the CLI
    #[serde(default = "default_npm_package")]
    pub npm_package: String,

    /// Keep OPENAI_API_KEY / CODEX_API_KEY in the child environment
    #[serde(default)]
    pub allow_api_key: bool,

    /// Keep OPENAI_BASE_URL and friends in the child environment
    #[serde(default)]
    pub allow_custom_base: bool,
}

fn default_true() -> bool {
    true
}

fn default_npm_package() -> String {
    "@openai/codex".to_string()
}

fn default_dev_tools() -> Vec<String> {
    ["ruff", "black", "mypy", "pytest"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for CodexConfig {
    fn default() -> Self {
        Self {
            auto_install: true,
            device_auth: false,
            npm_package: default_npm_package(),
            allow_api_key: false,
            allow_custom_base: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            codex: CodexConfig::default(),
            dev_tools: default_dev_tools(),
        }
    }
}

impl CodexConfig {
    pub fn credential_policy(&self) -> CredentialPolicy {
        CredentialPolicy {
            allow_api_key: self.allow_api_key,
            allow_custom_base: self.allow_custom_base,
        }
    }
}

impl Config {
    /// Workspace file, else user file, else defaults; then environment overrides
    pub fn load(root: &Path) -> Result<Self> {
        let mut candidates = vec![Self::workspace_path(root)];
        if let Some(user) = Self::user_path() {
            candidates.push(user);
        }

        let mut config = match candidates.iter().find(|p| p.is_file()) {
            Some(path) => Self::load_file(path)?,
            None => Self::default(),
        };
        config.apply_env(&std::env::vars().collect());
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn workspace_path(root: &Path) -> PathBuf {
        root.join(crate::layout::APP_DIR).join("config.toml")
    }

    pub fn user_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("usbide").join("config.toml"))
    }

    /// Apply `USBIDE_*` overrides.
    ///
    /// Auto-install only turns off on an explicit falsy word; the opt-in
    /// flags only turn on for a truthy word. Blank values are ignored.
    pub fn apply_env(&mut self, vars: &HashMap<String, String>) {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        if let Some(value) = get(ENV_AUTO_INSTALL) {
            self.codex.auto_install = !is_falsy(value);
        }
        if let Some(value) = get(ENV_DEVICE_AUTH) {
            self.codex.device_auth = is_truthy(value);
        }
        if let Some(value) = get(ENV_NPM_PACKAGE) {
            self.codex.npm_package = value.to_string();
        }
        if let Some(value) = get(ENV_DEV_TOOLS) {
            let tools = parse_tool_list(value);
            if !tools.is_empty() {
                self.dev_tools = tools;
            }
        }
        if let Some(value) = get(ENV_ALLOW_API_KEY) {
            self.codex.allow_api_key = is_truthy(value);
        }
        if let Some(value) = get(ENV_ALLOW_CUSTOM_BASE) {
            self.codex.allow_custom_base = is_truthy(value);
        }
    }
}
