//! Tool location and install commands
//!
//! The locator answers two questions for every external tool: is it
//! available right now, and which argv would install it. Lookups always use
//! the PATH of the environment the tool will actually run with.

pub mod assistant_cli;
pub mod python;
pub mod shim;

use std::path::{Path, PathBuf};

use crate::environment::{path_value, EnvMap};
use crate::error::{ToolError, ToolResult};
use crate::layout::PortableLayout;
use crate::platform::Platform;

pub use assistant_cli::{
    codex_exec_argv, codex_install_argv, codex_login_argv, codex_status_argv, npm_cli_js,
};
pub use python::{pip_install_argv, pyinstaller_build_argv, python_run_argv, BuildOptions};
pub use shim::{shell_argv, wrap_shim, ShimKind};

/// How a tool gets installed into the portable layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallMethod {
    /// `npm install --prefix .usbide/codex <package>` with the portable Node
    Npm { package: String },
    /// `python -m pip install --prefix .usbide/tools <packages...>`
    Pip { packages: Vec<String> },
}

/// A logical tool the workbench knows how to find and install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    /// Key used for the one-attempt-per-session bookkeeping
    pub name: String,
    /// Executables that must all resolve for the tool to count as available
    pub binaries: Vec<String>,
    pub install: InstallMethod,
}

impl ToolSpec {
    /// The assistant CLI from the given npm package
    pub fn assistant_cli(package: &str) -> Self {
        Self {
            name: "codex".to_string(),
            binaries: vec!["codex".to_string()],
            install: InstallMethod::Npm {
                package: package.trim().to_string(),
            },
        }
    }

    /// PyInstaller in the tools prefix
    pub fn pyinstaller() -> Self {
        Self {
            name: "pyinstaller".to_string(),
            binaries: vec!["pyinstaller".to_string()],
            install: InstallMethod::Pip {
                packages: vec!["pyinstaller".to_string()],
            },
        }
    }

    /// Python dev tools (linters, formatters, test runner)
    pub fn dev_tools(tools: &[String]) -> ToolResult<Self> {
        let cleaned: Vec<String> = tools
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if cleaned.is_empty() {
            return Err(ToolError::invalid("dev tool list must not be empty"));
        }
        Ok(Self {
            name: "dev-tools".to_string(),
            binaries: cleaned.clone(),
            install: InstallMethod::Pip { packages: cleaned },
        })
    }

    /// `true` for tools installed through npm into the assistant prefix
    pub fn is_assistant_cli(&self) -> bool {
        matches!(self.install, InstallMethod::Npm { .. })
    }
}

/// Resolves executables against the portable layout and a child environment
#[derive(Debug, Clone)]
pub struct ToolLocator {
    layout: PortableLayout,
}

impl ToolLocator {
    pub fn new(layout: PortableLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &PortableLayout {
        &self.layout
    }

    pub fn platform(&self) -> Platform {
        self.layout.platform()
    }

    /// Look `name` up on the PATH held by `env`
    pub fn resolve_in_path(&self, name: &str, env: &EnvMap) -> Option<PathBuf> {
        resolve_in_path(name, env, self.platform(), self.layout.root())
    }

    /// Whether every binary of `spec` can be started with `env`
    pub fn is_available(&self, spec: &ToolSpec, env: &EnvMap) -> ToolResult<bool> {
        match &spec.install {
            InstallMethod::Npm { package } => Ok(self.codex_available(package, env)),
            InstallMethod::Pip { .. } => {
                for binary in &spec.binaries {
                    if !self.tool_available(binary, env)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    /// Argv that installs `spec` into the portable layout
    pub fn install_argv(&self, spec: &ToolSpec, env: &EnvMap) -> ToolResult<Vec<String>> {
        match &spec.install {
            InstallMethod::Npm { package } => {
                if package.trim().is_empty() {
                    return Err(ToolError::invalid("npm package name must not be empty"));
                }
                let node = self
                    .node_executable(env)
                    .ok_or_else(|| ToolError::NodeMissing {
                        expected: self.layout.node_dir(),
                    })?;
                let npm_cli = npm_cli_js(&node).ok_or_else(|| ToolError::NpmMissing {
                    node: node.clone(),
                })?;
                codex_install_argv(&node, &npm_cli, &self.layout.codex_prefix(), package)
            }
            InstallMethod::Pip { packages } => {
                let python = self.python_executable(env).ok_or(ToolError::PythonMissing)?;
                pip_install_argv(
                    &python,
                    &self.install_prefix(spec),
                    packages,
                    self.layout.wheelhouse().as_deref(),
                )
            }
        }
    }

    /// Prefix directory an install of `spec` writes into
    pub fn install_prefix(&self, spec: &ToolSpec) -> PathBuf {
        match spec.install {
            InstallMethod::Npm { .. } => self.layout.codex_prefix(),
            InstallMethod::Pip { .. } => self.layout.tools_prefix(),
        }
    }
}

/// `which` restricted to the PATH of `env`; `None` when PATH is absent
pub fn resolve_in_path(name: &str, env: &EnvMap, platform: Platform, cwd: &Path) -> Option<PathBuf> {
    let path = path_value(env, platform)?;
    which::which_in(name, Some(path), cwd).ok()
}

/// Render an argv for the log, one space between arguments
pub fn display_argv(argv: &[String]) -> String {
    argv.join(" ")
}

/// Joins a path the way argv expects it
pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}


#[cfg(test)]
mod tests {
    use super::test_support::touch_executable;
    use super::*;

    #[test]
    fn dev_tools_spec_rejects_blank_list() {
        let err = ToolSpec::dev_tools(&[" ".to_string()]).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));

        let spec = ToolSpec::dev_tools(&["ruff".into(), " black ".into()]).unwrap();
        assert_eq!(spec.binaries, vec!["ruff", "black"]);
        assert!(!spec.is_assistant_cli());
        assert!(ToolSpec::assistant_cli("@openai/codex").is_assistant_cli());
    }

    #[test]
    fn resolve_uses_child_path_only() {
        let tmp = tempfile::tempdir().unwrap();
        let bin = tmp.path().join("bin");
        touch_executable(&bin.join("fancytool"));

        let platform = Platform::current();
        let mut env = EnvMap::new();
        assert!(resolve_in_path("fancytool", &env, platform, tmp.path()).is_none());

        env.insert("PATH".into(), bin.to_string_lossy().into_owned());
        let found = resolve_in_path("fancytool", &env, platform, tmp.path());
        #[cfg(unix)]
        assert_eq!(found, Some(bin.join("fancytool")));
        let _ = found;
    }

    #[cfg(unix)]
    #[test]
    fn pip_tools_available_only_when_every_binary_resolves() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = PortableLayout::new(tmp.path());
        let locator = ToolLocator::new(layout.clone());
        let spec = ToolSpec::dev_tools(&["ruff".into(), "black".into()]).unwrap();
        let env = crate::environment::tools_env(&layout, &EnvMap::new());

        touch_executable(&layout.tools_bin_dir().join("ruff"));
        assert!(!locator.is_available(&spec, &env).unwrap());

        touch_executable(&layout.tools_bin_dir().join("black"));
        assert!(locator.is_available(&spec, &env).unwrap());
    }

    #[test]
    fn npm_install_needs_node() {
        let tmp = tempfile::tempdir().unwrap();
        let locator = ToolLocator::new(PortableLayout::new(tmp.path()));
        let err = locator
            .install_argv(&ToolSpec::assistant_cli("@openai/codex"), &EnvMap::new())
            .unwrap_err();
        assert!(matches!(err, ToolError::NodeMissing { .. }));
    }
}
