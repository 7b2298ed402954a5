//! Locating and invoking the Node-based assistant CLI
//!
//! Preferred launch is portable: the vendored `node` running the package's JS
//! entry point directly. Otherwise `codex` is resolved on the child PATH and,
//! on Windows, wrapped when it turns out to be a script shim.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{path_arg, shim::wrap_shim, ToolLocator};
use crate::environment::EnvMap;
use crate::error::{ToolError, ToolResult};

impl ToolLocator {
    /// Vendored node first, then `node` on the child PATH
    pub fn node_executable(&self, env: &EnvMap) -> Option<PathBuf> {
        let node_dir = self.layout().node_dir();
        let mut candidates = if self.platform().is_windows() {
            vec![node_dir.join("node.exe")]
        } else {
            vec![node_dir.join("bin").join("node"), node_dir.join("node")]
        };
        if let Some(found) = self.resolve_in_path("node", env) {
            candidates.push(found);
        }

        candidates
            .into_iter()
            .find(|candidate| candidate.is_file())
            .map(|found| std::fs::canonicalize(&found).unwrap_or(found))
    }

    /// JS entry point of the installed package, from its `package.json` `bin`
    pub fn codex_entrypoint(&self, package: &str) -> Option<PathBuf> {
        let package_json = self.layout().codex_package_json(package);
        let content = std::fs::read_to_string(&package_json).ok()?;
        let manifest: Value = serde_json::from_str(&content).ok()?;
        let rel = bin_entry(&manifest)?;

        let entry = package_json.parent()?.join(rel);
        entry
            .is_file()
            .then(|| std::fs::canonicalize(&entry).unwrap_or(entry))
    }

    /// Portable node + entry point, or `codex` on the child PATH
    pub fn codex_available(&self, package: &str, env: &EnvMap) -> bool {
        self.portable_codex(package, env).is_some() || self.resolve_in_path("codex", env).is_some()
    }

    /// Command prefix that starts the assistant CLI
    pub fn codex_base_argv(&self, package: &str, env: &EnvMap) -> Vec<String> {
        if let Some((node, entry)) = self.portable_codex(package, env) {
            return vec![path_arg(&node), path_arg(&entry)];
        }
        match self.resolve_in_path("codex", env) {
            Some(resolved) => wrap_shim(&resolved, self.platform(), env, self.layout().root()),
            None => vec!["codex".to_string()],
        }
    }

    fn portable_codex(&self, package: &str, env: &EnvMap) -> Option<(PathBuf, PathBuf)> {
        let node = self.node_executable(env)?;
        let entry = self.codex_entrypoint(package)?;
        Some((node, entry))
    }
}

/// `bin` may be a string, or a map where `codex` wins over the first string value
fn bin_entry(manifest: &Value) -> Option<&str> {
    match manifest.get("bin")? {
        Value::String(rel) => Some(rel.as_str()),
        Value::Object(map) => map
            .get("codex")
            .and_then(Value::as_str)
            .or_else(|| map.values().find_map(Value::as_str)),
        _ => None,
    }
}

/// `npm-cli.js` bundled with a Node distribution
pub fn npm_cli_js(node: &Path) -> Option<PathBuf> {
    let node_dir = node.parent()?;
    let npm_bin = |base: &Path| base.join("node_modules").join("npm").join("bin").join("npm-cli.js");

    let mut candidates = vec![npm_bin(node_dir)];
    if let Some(parent) = node_dir.parent() {
        candidates.push(npm_bin(&parent.join("lib")));
    }
    candidates
        .into_iter()
        .find(|candidate| candidate.is_file())
        .map(|found| std::fs::canonicalize(&found).unwrap_or(found))
}

pub fn codex_login_argv(base: &[String], device_auth: bool) -> Vec<String> {
    let mut argv = base.to_vec();
    argv.push("login".to_string());
    if device_auth {
        argv.push("--device-auth".to_string());
    }
    argv
}

pub fn codex_status_argv(base: &[String]) -> Vec<String> {
    let mut argv = base.to_vec();
    argv.extend(["login".to_string(), "status".to_string()]);
    argv
}

/// `exec [--json] [extra...] <prompt>`; blank extras are dropped
pub fn codex_exec_argv(
    base: &[String],
    prompt: &str,
    json_output: bool,
    extra_args: &[String],
) -> ToolResult<Vec<String>> {
    if prompt.trim().is_empty() {
        return Err(ToolError::invalid("prompt must not be empty"));
    }
    let mut argv = base.to_vec();
    argv.push("exec".to_string());
    if json_output {
        argv.push("--json".to_string());
    }
    argv.extend(extra_args.iter().filter(|a| !a.trim().is_empty()).cloned());
    argv.push(prompt.to_string());
    Ok(argv)
}

/// npm install of `package` into `prefix`, run through the given node
pub fn codex_install_argv(
    node: &Path,
    npm_cli: &Path,
    prefix: &Path,
    package: &str,
) -> ToolResult<Vec<String>> {
    let package = package.trim();
    if package.is_empty() {
        return Err(ToolError::invalid("npm package name must not be empty"));
    }
    Ok(vec![
        path_arg(node),
        path_arg(npm_cli),
        "install".to_string(),
        "--prefix".to_string(),
        path_arg(prefix),
        "--no-audit".to_string(),
        "--no-fund".to_string(),
        package.to_string(),
    ])
}
