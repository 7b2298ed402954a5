//! On-demand installation into the portable layout
//!
//! Each tool gets one automatic install attempt per session. After a failed
//! attempt the tool stays unavailable until the user forces a retry.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::console::Console;
use crate::environment::EnvMap;
use crate::error::{ToolError, ToolResult};
use crate::process::{Launcher, ProcessEvent};
use crate::tools::{ToolLocator, ToolSpec};

pub struct Installer {
    locator: ToolLocator,
    launcher: Arc<dyn Launcher>,
    attempted: HashSet<String>,
    auto_install: bool,
}

impl Installer {
    pub fn new(locator: ToolLocator, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            locator,
            launcher,
            attempted: HashSet::new(),
            auto_install: true,
        }
    }

    /// When off, only forced installs run
    pub fn with_auto_install(mut self, enabled: bool) -> Self {
        self.auto_install = enabled;
        self
    }

    pub fn attempted(&self, spec: &ToolSpec) -> bool {
        self.attempted.contains(&spec.name)
    }

    /// Make `spec` available, installing it if needed and allowed.
    ///
    /// Returns whether the tool is available afterwards. Only argument
    /// errors escape as `Err`; everything else is reported on `console`.
    pub async fn ensure_installed(
        &mut self,
        spec: &ToolSpec,
        env: &EnvMap,
        force: bool,
        console: &mut Console,
    ) -> ToolResult<bool> {
        let context = format!("install_{}", spec.name);

        if !force {
            if self.locator.is_available(spec, env)? {
                return Ok(true);
            }
            if self.attempted(spec) {
                console.warn(
                    &context,
                    &format!(
                        "{} install already attempted this session; force a reinstall to retry.",
                        spec.name
                    ),
                );
                return Ok(false);
            }
            if !self.auto_install {
                console.warn(
                    &context,
                    &format!("{} is missing and automatic install is disabled.", spec.name),
                );
                return Ok(false);
            }
        }

        let argv = match self.locator.install_argv(spec, env) {
            Ok(argv) => argv,
            Err(err @ ToolError::InvalidArgument(_)) => return Err(err),
            Err(err) => {
                console.tool_error(&context, &err);
                return Ok(false);
            }
        };
        // only a launched install counts as the session's attempt
        self.attempted.insert(spec.name.clone());

        let prefix = self.locator.install_prefix(spec);
        if let Err(err) = std::fs::create_dir_all(&prefix) {
            console.tool_error(&context, &ToolError::Io(err));
            return Ok(false);
        }

        info!(tool = %spec.name, force, "installing");
        console.info(&format!("Installing {} into {}", spec.name, prefix.display()));
        console.command(&argv);

        let root = self.locator.layout().root().to_path_buf();
        let mut stream = match self.launcher.launch(&argv, &root, env) {
            Ok(stream) => stream,
            Err(err) => {
                console.tool_error(&context, &err);
                return Ok(false);
            }
        };
        while let Some(event) = stream.next_event().await {
            match event {
                ProcessEvent::Line(text) => console.output(&text),
                ProcessEvent::Exit { code, .. } => {
                    console.exit_status(&context, &format!("{} install", spec.name), code);
                }
            }
        }

        let available = self.locator.is_available(spec, env)?;
        if available {
            console.success(&format!("{} is ready.", spec.name));
        } else {
            console.warn(
                &context,
                &format!("{} is still unavailable after install.", spec.name),
            );
        }
        Ok(available)
    }
}
