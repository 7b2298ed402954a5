//! Assistant session driver
//!
//! One prompt runs through: availability (with a single automatic install),
//! an auth probe, then `exec --json` whose event stream is rendered as
//! transcript turns.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use super::failure::AssistantFailure;
use super::turns::{DisplayMode, DisplayTurn, Rendered, TurnAssembler};
use crate::config::CodexConfig;
use crate::console::{Console, LogKind};
use crate::environment::{codex_env, EnvMap};
use crate::error::{ToolError, ToolResult};
use crate::incident::IncidentRecord;
use crate::install::Installer;
use crate::layout::PortableLayout;
use crate::process::{Launcher, ProcessEvent, ProcessStream};
use crate::tools::{
    codex_exec_argv, codex_login_argv, codex_status_argv, ToolLocator, ToolSpec,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    CheckingAvailability,
    CheckingAuth,
    Running,
    Finished,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::CheckingAvailability => "checking availability",
            SessionState::CheckingAuth => "checking auth",
            SessionState::Running => "running",
            SessionState::Finished => "finished",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

pub struct AssistantSession {
    locator: ToolLocator,
    installer: Installer,
    launcher: Arc<dyn Launcher>,
    config: CodexConfig,
    base_env: EnvMap,
    assembler: TurnAssembler,
    state: SessionState,
}

impl AssistantSession {
    pub fn new(
        layout: PortableLayout,
        config: CodexConfig,
        launcher: Arc<dyn Launcher>,
        base_env: EnvMap,
    ) -> Self {
        let locator = ToolLocator::new(layout);
        let installer = Installer::new(locator.clone(), launcher.clone())
            .with_auto_install(config.auto_install);
        Self {
            locator,
            installer,
            launcher,
            config,
            base_env,
            assembler: TurnAssembler::new(DisplayMode::Compact),
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.assembler.mode()
    }

    /// Flip Compact/Raw; repeat suppression starts over
    pub fn toggle_display_mode(&mut self) -> DisplayMode {
        let mode = self.assembler.mode().toggled();
        self.assembler.set_mode(mode);
        mode
    }

    /// Child environment for every assistant CLI invocation
    pub fn env(&self) -> EnvMap {
        codex_env(
            self.locator.layout(),
            &self.base_env,
            self.config.credential_policy(),
        )
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec::assistant_cli(&self.config.npm_package)
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = %self.state, to = %next, "assistant session");
        self.state = next;
    }

    /// Run one prompt to completion
    pub async fn submit(&mut self, prompt: &str, console: &mut Console) -> ToolResult<SessionState> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ToolError::invalid("prompt must not be empty"));
        }

        self.transition(SessionState::CheckingAvailability);
        if self.display_mode() == DisplayMode::Compact {
            let turn = DisplayTurn::User(prompt.to_string());
            if self.assembler.accept(&turn) {
                render_turn(&turn, console);
            }
        }

        let env = self.env();
        let spec = self.spec();
        if !self.installer.ensure_installed(&spec, &env, false, console).await? {
            let failure = AssistantFailure::ToolNotFound {
                detail: "not installed; run the forced install action".to_string(),
            };
            return Ok(self.fail(failure, console));
        }

        self.transition(SessionState::CheckingAuth);
        let base = self.locator.codex_base_argv(&self.config.npm_package, &env);
        match self.probe(&codex_status_argv(&base), &env, console).await {
            Ok(Some(0)) => {}
            Ok(code) => {
                return Ok(self.fail(AssistantFailure::NotAuthenticated { code }, console));
            }
            Err(failure) => return Ok(self.fail(failure, console)),
        }

        self.transition(SessionState::Running);
        let argv = codex_exec_argv(&base, prompt, true, &[])?;
        if self.display_mode() == DisplayMode::Raw {
            console.command(&argv);
        }
        let mut stream = match self.launch(&argv, &env) {
            Ok(stream) => stream,
            Err(failure) => return Ok(self.fail(failure, console)),
        };

        let mut failed = false;
        while let Some(event) = stream.next_event().await {
            match event {
                ProcessEvent::Line(text) => {
                    for rendered in self.assembler.feed(&text) {
                        failed |= !self.render(rendered, console);
                    }
                }
                ProcessEvent::Exit { text, code } => {
                    if self.display_mode() == DisplayMode::Raw {
                        console.muted(&text);
                    }
                    if code != Some(0) {
                        self.report(&AssistantFailure::ProcessNonZeroExit { code }, console);
                    }
                }
            }
        }
        if let Some(turn) = self.assembler.flush() {
            render_turn(&turn, console);
        }

        let end = if failed {
            SessionState::Failed
        } else {
            SessionState::Finished
        };
        self.transition(end);
        info!(state = %end, "assistant prompt done");
        Ok(end)
    }

    /// Start the CLI's login flow (browser, or device code when configured)
    pub async fn login(&mut self, console: &mut Console) -> ToolResult<bool> {
        let env = self.env();
        let spec = self.spec();
        if !self.installer.ensure_installed(&spec, &env, false, console).await? {
            console.error("codex_login", "Codex is unavailable; run the forced install action.");
            return Ok(false);
        }

        console.info("Codex login: browser or device code depending on configuration.");
        if !self.config.device_auth {
            console.muted("tip: set USBIDE_CODEX_DEVICE_AUTH=1 to log in with a device code.");
        }
        let base = self.locator.codex_base_argv(&self.config.npm_package, &env);
        let argv = codex_login_argv(&base, self.config.device_auth);
        console.command(&argv);
        let stream = match self.launch(&argv, &env) {
            Ok(stream) => stream,
            Err(failure) => {
                self.report(&failure, console);
                return Ok(false);
            }
        };
        Ok(stream_to_console(stream, console, "codex_login", "codex login").await)
    }

    /// Show where the CLI resolves from and whether it is authenticated
    pub async fn check_status(&mut self, console: &mut Console) -> bool {
        let env = self.env();
        let package = self.config.npm_package.clone();
        if !self.locator.codex_available(&package, &env) {
            console.warn("codex_status", "Codex is not installed.");
            return false;
        }

        let describe = |found: Option<std::path::PathBuf>| {
            found.map_or_else(|| "not found".to_string(), |p| p.display().to_string())
        };
        console.muted(&format!("node: {}", describe(self.locator.node_executable(&env))));
        console.muted(&format!("entrypoint: {}", describe(self.locator.codex_entrypoint(&package))));
        console.muted(&format!("codex on PATH: {}", describe(self.locator.resolve_in_path("codex", &env))));

        let base = self.locator.codex_base_argv(&package, &env);
        let argv = codex_status_argv(&base);
        console.command(&argv);
        let mut stream = match self.launch(&argv, &env) {
            Ok(stream) => stream,
            Err(failure) => {
                self.report(&failure, console);
                return false;
            }
        };
        let mut code = None;
        while let Some(event) = stream.next_event().await {
            match event {
                ProcessEvent::Line(text) => console.output(&text),
                ProcessEvent::Exit { text, code: rc } => {
                    console.muted(&text);
                    code = rc;
                }
            }
        }
        if code == Some(0) {
            console.success("Codex is authenticated.");
            true
        } else {
            self.report(&AssistantFailure::NotAuthenticated { code }, console);
            false
        }
    }

    /// Install the CLI; `force` bypasses the one-attempt guard
    pub async fn install(&mut self, force: bool, console: &mut Console) -> ToolResult<bool> {
        let env = self.env();
        let spec = self.spec();
        self.installer.ensure_installed(&spec, &env, force, console).await
    }

    /// Auth probe; lines only shown in raw mode
    async fn probe(
        &mut self,
        argv: &[String],
        env: &EnvMap,
        console: &mut Console,
    ) -> Result<Option<i32>, AssistantFailure> {
        let raw = self.display_mode() == DisplayMode::Raw;
        if raw {
            console.command(argv);
        }
        let stream = self.launch(argv, env)?;
        Ok(stream
            .run_to_end(|line| {
                if raw {
                    console.muted(line);
                }
            })
            .await)
    }

    fn launch(&self, argv: &[String], env: &EnvMap) -> Result<ProcessStream, AssistantFailure> {
        self.launcher
            .launch(argv, self.locator.layout().root(), env)
            .map_err(|err| {
                if err.is_not_found() {
                    AssistantFailure::ToolNotFound {
                        detail: err.to_string(),
                    }
                } else {
                    AssistantFailure::GenericExecutionError {
                        message: err.to_string(),
                    }
                }
            })
    }

    /// Returns `false` when the rendered item is a fatal failure
    fn render(&mut self, rendered: Rendered, console: &mut Console) -> bool {
        match rendered {
            Rendered::Turn(turn) => render_turn(&turn, console),
            Rendered::Raw(text) => console.output(&text),
            Rendered::Failure(failure) => {
                self.report(&failure, console);
                return !failure.is_fatal();
            }
        }
        true
    }

    fn report(&self, failure: &AssistantFailure, console: &mut Console) {
        let hints = failure.hints(self.config.device_auth);
        let record = IncidentRecord::new(failure.severity(), failure.context(), failure.to_string())
            .with_details(hints.join(" | "));
        console.report(record);
        for hint in hints {
            console.line(LogKind::Info, &format!("hint: {hint}"));
        }
    }

    fn fail(&mut self, failure: AssistantFailure, console: &mut Console) -> SessionState {
        if let Some(turn) = self.assembler.flush() {
            render_turn(&turn, console);
        }
        self.report(&failure, console);
        self.transition(SessionState::Failed);
        SessionState::Failed
    }
}

fn render_turn(turn: &DisplayTurn, console: &mut Console) {
    let kind = match turn {
        DisplayTurn::User(_) => LogKind::User,
        DisplayTurn::Assistant(_) => LogKind::Assistant,
        DisplayTurn::Action(_) => LogKind::Action,
    };
    console.line(LogKind::Muted, turn.label());
    console.line(kind, turn.text().trim());
    console.line(LogKind::Muted, "");
}

/// Forward every line, then report the exit status
async fn stream_to_console(
    mut stream: ProcessStream,
    console: &mut Console,
    context: &str,
    label: &str,
) -> bool {
    let mut ok = false;
    while let Some(event) = stream.next_event().await {
        match event {
            ProcessEvent::Line(text) => console.output(&text),
            ProcessEvent::Exit { code, .. } => ok = console.exit_status(context, label, code),
        }
    }
    ok
}
