//! Shell-pane actions: free-form commands, running scripts, dev tools, builds

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::console::Console;
use crate::environment::{build_env, tools_env, EnvMap};
use crate::error::{ToolError, ToolResult};
use crate::install::Installer;
use crate::layout::PortableLayout;
use crate::process::{Launcher, ProcessEvent};
use crate::tools::{
    pyinstaller_build_argv, python_run_argv, shell_argv, BuildOptions, ToolLocator, ToolSpec,
};

pub struct Workbench {
    locator: ToolLocator,
    installer: Installer,
    launcher: Arc<dyn Launcher>,
    base_env: EnvMap,
    dev_tools: Vec<String>,
}

impl Workbench {
    pub fn new(
        layout: PortableLayout,
        launcher: Arc<dyn Launcher>,
        base_env: EnvMap,
        dev_tools: Vec<String>,
    ) -> Self {
        let locator = ToolLocator::new(layout);
        let installer = Installer::new(locator.clone(), launcher.clone());
        Self {
            locator,
            installer,
            launcher,
            base_env,
            dev_tools,
        }
    }

    fn layout(&self) -> &PortableLayout {
        self.locator.layout()
    }

    /// Run a command line through the platform shell
    pub async fn run_shell(&mut self, command: &str, console: &mut Console) -> ToolResult<bool> {
        let command = command.trim();
        if command.is_empty() {
            return Err(ToolError::invalid("command must not be empty"));
        }
        let env = build_env(self.layout(), &self.base_env);
        let argv = shell_argv(command, self.layout().platform(), &env);
        Ok(self.stream(&argv, &env, "shell", "command", console).await)
    }

    /// Run a Python script with the resolved interpreter
    pub async fn run_python(&mut self, script: &Path, console: &mut Console) -> ToolResult<bool> {
        let env = build_env(self.layout(), &self.base_env);
        let Some(python) = self.locator.python_executable(&env) else {
            console.tool_error("run_python", &ToolError::PythonMissing);
            return Ok(false);
        };
        let argv = python_run_argv(&python, script);
        Ok(self.stream(&argv, &env, "run_python", "script", console).await)
    }

    /// pip-install the configured dev tools into the tools prefix
    pub async fn install_dev_tools(&mut self, console: &mut Console) -> ToolResult<bool> {
        let spec = match ToolSpec::dev_tools(&self.dev_tools) {
            Ok(spec) => spec,
            Err(_) => {
                console.warn("dev_tools", "Dev tool list is empty.");
                return Ok(false);
            }
        };
        let env = tools_env(self.layout(), &self.base_env);
        self.installer.ensure_installed(&spec, &env, true, console).await
    }

    /// PyInstaller build of `script` into `dist/`, installing PyInstaller once if needed
    pub async fn build_executable(&mut self, script: &Path, console: &mut Console) -> ToolResult<bool> {
        let env = tools_env(self.layout(), &self.base_env);
        let spec = ToolSpec::pyinstaller();
        if !self.installer.ensure_installed(&spec, &env, false, console).await? {
            console.error("build_exe", "PyInstaller is unavailable.");
            return Ok(false);
        }

        let dist = self.layout().dist_dir();
        if let Err(err) = std::fs::create_dir_all(&dist) {
            console.tool_error("build_exe", &ToolError::Io(err));
            return Ok(false);
        }
        let options = BuildOptions {
            work_dir: Some(self.layout().tmp_dir()),
            ..Default::default()
        };
        let argv = pyinstaller_build_argv(script, &dist, &options)?;
        let ok = self.stream(&argv, &env, "build_exe", "pyinstaller build", console).await;
        if ok {
            console.success(&format!("Build written to {}", dist.display()));
        }
        Ok(ok)
    }

    /// Reinstall PyInstaller, ignoring an earlier failed attempt
    pub async fn install_pyinstaller(&mut self, console: &mut Console) -> ToolResult<bool> {
        let env = tools_env(self.layout(), &self.base_env);
        self.installer
            .ensure_installed(&ToolSpec::pyinstaller(), &env, true, console)
            .await
    }

    async fn stream(
        &self,
        argv: &[String],
        env: &EnvMap,
        context: &str,
        label: &str,
        console: &mut Console,
    ) -> bool {
        info!(context, program = ?argv.first(), "launch");
        console.command(argv);
        let mut stream = match self.launcher.launch(argv, self.layout().root(), env) {
            Ok(stream) => stream,
            Err(err) => {
                console.tool_error(context, &err);
                return false;
            }
        };
        let mut ok = false;
        while let Some(event) = stream.next_event().await {
            match event {
                ProcessEvent::Line(text) => console.output(&text),
                ProcessEvent::Exit { code, .. } => ok = console.exit_status(context, label, code),
            }
        }
        ok
    }
}
