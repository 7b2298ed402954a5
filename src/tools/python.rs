//! Python-side tools: interpreter lookup, pip installs, PyInstaller builds

use std::path::{Path, PathBuf};

use super::{path_arg, ToolLocator};
use crate::environment::EnvMap;
use crate::error::{ToolError, ToolResult};

impl ToolLocator {
    /// Vendored interpreter under `tools/python`, then `python3`/`python` on PATH
    pub fn python_executable(&self, env: &EnvMap) -> Option<PathBuf> {
        let python_dir = self.layout().python_dir();
        let portable = if self.platform().is_windows() {
            vec![python_dir.join("python.exe")]
        } else {
            vec![
                python_dir.join("bin").join("python3"),
                python_dir.join("bin").join("python"),
            ]
        };
        portable
            .into_iter()
            .find(|candidate| candidate.is_file())
            .or_else(|| {
                ["python3", "python"]
                    .iter()
                    .find_map(|name| self.resolve_in_path(name, env))
            })
    }

    /// Whether `name` resolves on the PATH of `env`
    pub fn tool_available(&self, name: &str, env: &EnvMap) -> ToolResult<bool> {
        if name.trim().is_empty() {
            return Err(ToolError::invalid("tool name must not be empty"));
        }
        Ok(self.resolve_in_path(name.trim(), env).is_some())
    }
}

/// `python -m pip install --upgrade --prefix P [--no-index --find-links W] pkgs...`
///
/// A wheelhouse switches pip fully offline.
pub fn pip_install_argv(
    python: &Path,
    prefix: &Path,
    packages: &[String],
    wheelhouse: Option<&Path>,
) -> ToolResult<Vec<String>> {
    let cleaned: Vec<String> = packages
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    if cleaned.is_empty() {
        return Err(ToolError::invalid("package list must not be empty"));
    }

    let mut argv = vec![
        path_arg(python),
        "-m".to_string(),
        "pip".to_string(),
        "install".to_string(),
        "--upgrade".to_string(),
        "--prefix".to_string(),
        path_arg(prefix),
    ];
    if let Some(wheelhouse) = wheelhouse {
        argv.push("--no-index".to_string());
        argv.extend(["--find-links".to_string(), path_arg(wheelhouse)]);
    }
    argv.extend(cleaned);
    Ok(argv)
}

/// PyInstaller output options
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Single-file executable instead of a directory bundle
    pub onefile: bool,
    pub work_dir: Option<PathBuf>,
    pub spec_dir: Option<PathBuf>,
}

/// `pyinstaller --noconfirm --onedir|--onefile --distpath D [...] script`
pub fn pyinstaller_build_argv(
    script: &Path,
    dist_dir: &Path,
    options: &BuildOptions,
) -> ToolResult<Vec<String>> {
    let has_name = script
        .file_name()
        .map(|name| !name.to_string_lossy().trim().is_empty())
        .unwrap_or(false);
    if !has_name {
        return Err(ToolError::invalid("script path must name a file"));
    }

    let mode = if options.onefile { "--onefile" } else { "--onedir" };
    let mut argv = vec![
        "pyinstaller".to_string(),
        "--noconfirm".to_string(),
        mode.to_string(),
        "--distpath".to_string(),
        path_arg(dist_dir),
    ];
    if let Some(work_dir) = &options.work_dir {
        argv.extend(["--workpath".to_string(), path_arg(work_dir)]);
    }
    if let Some(spec_dir) = &options.spec_dir {
        argv.extend(["--specpath".to_string(), path_arg(spec_dir)]);
    }
    argv.push(path_arg(script));
    Ok(argv)
}

/// Run a script with the resolved interpreter
pub fn python_run_argv(python: &Path, script: &Path) -> Vec<String> {
    vec![path_arg(python), path_arg(script)]
}
