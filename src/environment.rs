//! Child-process environments
//!
//! Every builder takes the base environment by reference and returns a new
//! map; the caller's map is never touched.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::layout::PortableLayout;
use crate::platform::Platform;

pub type EnvMap = HashMap<String, String>;

/// Credential variables removed unless API-key auth is allowed
pub const API_KEY_VARS: &[&str] = &["OPENAI_API_KEY", "CODEX_API_KEY"];

/// Endpoint overrides removed unless a custom base URL is allowed
pub const CUSTOM_BASE_VARS: &[&str] = &["OPENAI_BASE_URL", "OPENAI_API_BASE", "OPENAI_API_HOST"];

/// Which credential variables survive into the assistant environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CredentialPolicy {
    pub allow_api_key: bool,
    pub allow_custom_base: bool,
}

/// Snapshot of the current process environment
pub fn process_env() -> EnvMap {
    std::env::vars().collect()
}

/// Variables forced to workspace-relative locations for every child
pub fn portable_vars(layout: &PortableLayout) -> Vec<(&'static str, String)> {
    let path = |p: PathBuf| p.to_string_lossy().into_owned();
    let tmp = path(layout.tmp_dir());
    vec![
        ("PIP_CACHE_DIR", path(layout.cache_dir("pip"))),
        ("PYTHONPYCACHEPREFIX", path(layout.cache_dir("pycache"))),
        ("TEMP", tmp.clone()),
        ("TMP", tmp),
        ("PYTHONNOUSERSITE", "1".to_string()),
        ("CODEX_HOME", path(layout.codex_home())),
        ("NPM_CONFIG_CACHE", path(layout.cache_dir("npm"))),
        ("NPM_CONFIG_UPDATE_NOTIFIER", "false".to_string()),
    ]
}

/// Base environment plus the forced portable variables.
///
/// `PYTHONUTF8` and `PYTHONIOENCODING` are only filled in when absent.
pub fn build_env(layout: &PortableLayout, base: &EnvMap) -> EnvMap {
    let mut env = base.clone();
    for (key, value) in portable_vars(layout) {
        env.insert(key.to_string(), value);
    }
    env.entry("PYTHONUTF8".to_string())
        .or_insert_with(|| "1".to_string());
    env.entry("PYTHONIOENCODING".to_string())
        .or_insert_with(|| "utf-8".to_string());
    env
}

/// Environment for pip-installed tools: portable vars, tools bin dir on PATH
pub fn tools_env(layout: &PortableLayout, base: &EnvMap) -> EnvMap {
    let mut env = build_env(layout, base);
    prepend_path(&mut env, &[layout.tools_bin_dir()], layout.platform());
    env
}

/// Environment for the assistant CLI.
///
/// PATH starts with the assistant bin dir, then the vendored Node dir, then
/// whatever the base PATH held. Credentials are filtered through `policy`.
pub fn codex_env(layout: &PortableLayout, base: &EnvMap, policy: CredentialPolicy) -> EnvMap {
    let mut env = build_env(layout, base);
    sanitize_credentials(&mut env, policy, layout.platform());
    prepend_path(
        &mut env,
        &[layout.codex_bin_dir(), layout.node_dir()],
        layout.platform(),
    );
    env
}

/// Put `dirs` in front of PATH, in order, skipping entries already present
pub fn prepend_path(env: &mut EnvMap, dirs: &[PathBuf], platform: Platform) {
    let key = path_key(env, platform);
    let existing = env
        .get(&key)
        .map(|value| platform.split_path(value))
        .unwrap_or_default();

    let mut entries: Vec<String> = Vec::with_capacity(dirs.len() + existing.len());
    for dir in dirs {
        let dir = dir.to_string_lossy().into_owned();
        if !entries.contains(&dir) && !existing.contains(&dir) {
            entries.push(dir);
        }
    }
    entries.extend(existing);
    env.insert(key, platform.join_path(&entries));
}

/// Current PATH value, matched with the platform's key rules
pub fn path_value(env: &EnvMap, platform: Platform) -> Option<&str> {
    env.iter()
        .find(|(k, _)| platform.env_key_eq(k, "PATH"))
        .map(|(_, v)| v.as_str())
}

/// Key under which PATH is stored (`Path` is common on Windows)
fn path_key(env: &EnvMap, platform: Platform) -> String {
    env.keys()
        .find(|k| platform.env_key_eq(k, "PATH"))
        .cloned()
        .unwrap_or_else(|| "PATH".to_string())
}

/// Drop credential variables the policy does not allow
pub fn sanitize_credentials(env: &mut EnvMap, policy: CredentialPolicy, platform: Platform) {
    let mut blocked: Vec<&str> = Vec::new();
    if !policy.allow_api_key {
        blocked.extend(API_KEY_VARS);
    }
    if !policy.allow_custom_base {
        blocked.extend(CUSTOM_BASE_VARS);
    }
    env.retain(|key, _| !blocked.iter().any(|b| platform.env_key_eq(key, b)));
}
