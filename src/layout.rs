//! Portable directory layout rooted at the workspace
//!
//! Everything the workbench installs or caches lives under the workspace root
//! so the whole toolchain can travel on removable media.

use std::io;
use std::path::{Path, PathBuf};

use crate::platform::Platform;

/// Hidden application directory under the workspace root
pub const APP_DIR: &str = ".usbide";

/// Append-only incident file at the workspace root
pub const INCIDENT_FILE: &str = "bug.md";

/// Workspace-relative paths used by the tool locator, installer and environment builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortableLayout {
    root: PathBuf,
    platform: Platform,
}

impl PortableLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_platform(root, Platform::current())
    }

    pub fn with_platform(root: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            root: root.into(),
            platform,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn app_dir(&self) -> PathBuf {
        self.root.join(APP_DIR)
    }

    /// npm `--prefix` for the assistant CLI
    pub fn codex_prefix(&self) -> PathBuf {
        self.app_dir().join("codex")
    }

    /// `node_modules/.bin` of the assistant prefix
    pub fn codex_bin_dir(&self) -> PathBuf {
        self.codex_prefix().join("node_modules").join(".bin")
    }

    /// `package.json` of an npm package installed in the assistant prefix
    pub fn codex_package_json(&self, package: &str) -> PathBuf {
        let mut dir = self.codex_prefix().join("node_modules");
        for part in package_dir_name(package).split('/') {
            dir.push(part);
        }
        dir.join("package.json")
    }

    /// pip `--prefix` for Python-side tools
    pub fn tools_prefix(&self) -> PathBuf {
        self.app_dir().join("tools")
    }

    /// `bin` (or `Scripts`) of the Python tools prefix
    pub fn tools_bin_dir(&self) -> PathBuf {
        self.tools_prefix().join(self.platform.scripts_dir_name())
    }

    /// Optional vendored Node runtime
    pub fn node_dir(&self) -> PathBuf {
        self.root.join("tools").join("node")
    }

    /// Optional vendored Python interpreter
    pub fn python_dir(&self) -> PathBuf {
        self.root.join("tools").join("python")
    }

    /// Offline package cache, if the directory exists
    pub fn wheelhouse(&self) -> Option<PathBuf> {
        let dir = self.root.join("tools").join("wheels");
        dir.is_dir().then_some(dir)
    }

    pub fn cache_dir(&self, name: &str) -> PathBuf {
        self.root.join("cache").join(name)
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    pub fn codex_home(&self) -> PathBuf {
        self.root.join("codex_home")
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.root.join("dist")
    }

    pub fn incident_file(&self) -> PathBuf {
        self.root.join(INCIDENT_FILE)
    }

    pub fn log_file(&self) -> PathBuf {
        self.app_dir().join("usbide.log")
    }

    /// Directories created on startup
    pub fn startup_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.cache_dir("pip"),
            self.cache_dir("pycache"),
            self.cache_dir("npm"),
            self.tmp_dir(),
            self.codex_home(),
        ]
    }

    /// Create the startup directories if absent
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in self.startup_dirs() {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}

/// Directory name of an npm package spec, without any version suffix
///
/// `@openai/codex@0.5.0` -> `@openai/codex`, `left-pad@1` -> `left-pad`
pub fn package_dir_name(package: &str) -> &str {
    let package = package.trim();
    let search_from = usize::from(package.starts_with('@'));
    match package[search_from..].find('@') {
        Some(idx) => &package[..search_from + idx],
        None => package,
    }
}
