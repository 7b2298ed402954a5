//! Script shims and shell invocation
//!
//! npm on Windows installs `codex.cmd` (and sometimes `codex.ps1`) rather
//! than an executable. Those cannot be spawned directly, so they are run
//! through `cmd.exe` or PowerShell.

use std::path::Path;

use super::{path_arg, resolve_in_path};
use crate::environment::EnvMap;
use crate::platform::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShimKind {
    /// `.cmd` / `.bat`, run by the command interpreter
    Batch,
    /// `.ps1`, run by PowerShell
    PowerShell,
}

impl ShimKind {
    /// Classify by extension, case-insensitively
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "cmd" | "bat" => Some(ShimKind::Batch),
            "ps1" => Some(ShimKind::PowerShell),
            _ => None,
        }
    }
}

/// Argv prefix that runs `resolved`, wrapping script shims on Windows
pub fn wrap_shim(resolved: &Path, platform: Platform, env: &EnvMap, cwd: &Path) -> Vec<String> {
    let target = path_arg(resolved);
    if !platform.is_windows() {
        return vec![target];
    }
    match ShimKind::detect(resolved) {
        Some(ShimKind::Batch) => vec![
            comspec(env),
            "/d".to_string(),
            "/s".to_string(),
            "/c".to_string(),
            target,
        ],
        Some(ShimKind::PowerShell) => {
            let powershell = resolve_in_path("powershell", env, platform, cwd)
                .map(|p| path_arg(&p))
                .unwrap_or_else(|| "powershell".to_string());
            vec![
                powershell,
                "-NoProfile".to_string(),
                "-ExecutionPolicy".to_string(),
                "Bypass".to_string(),
                "-File".to_string(),
                target,
            ]
        }
        None => vec![target],
    }
}

/// Command interpreter: child `COMSPEC`, then ours, then `cmd.exe`
pub fn comspec(env: &EnvMap) -> String {
    env.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("COMSPEC"))
        .map(|(_, v)| v.clone())
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var("COMSPEC").ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "cmd.exe".to_string())
}

/// Argv that hands a free-form command line to the platform shell
pub fn shell_argv(command: &str, platform: Platform, env: &EnvMap) -> Vec<String> {
    match platform {
        Platform::Windows => vec![
            comspec(env),
            "/d".to_string(),
            "/s".to_string(),
            "/c".to_string(),
            command.to_string(),
        ],
        Platform::Unix => vec!["sh".to_string(), "-lc".to_string(), command.to_string()],
    }
}
