use std::collections::VecDeque;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use super::editor::Editor;
use super::input::LineInput;
use super::tree::FileTree;
use crate::assistant::{AssistantSession, DisplayMode};
use crate::config::Config;
use crate::console::{Console, LogKind, LogLine};
use crate::document::{Loaded, OpenDocument, SaveOutcome};
use crate::environment::EnvMap;
use crate::incident::{ExceptionInfo, IncidentLog, IncidentRecord, Severity};
use crate::layout::PortableLayout;
use crate::process::Launcher;
use crate::workbench::Workbench;

pub const APP_TITLE: &str = "ValDev Pro v1";

/// Lines kept per log pane
pub const MAX_LOG_LINES: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Tree,
    Editor,
    ShellInput,
    AssistantInput,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Tree => Focus::Editor,
            Focus::Editor => Focus::ShellInput,
            Focus::ShellInput => Focus::AssistantInput,
            Focus::AssistantInput => Focus::Tree,
        }
    }
}

/// Bounded scrollback
#[derive(Debug, Default)]
pub struct LogPane {
    lines: VecDeque<LogLine>,
    /// Lines scrolled up from the bottom
    pub scroll: usize,
}

impl LogPane {
    pub fn push(&mut self, line: LogLine) {
        if self.lines.len() >= MAX_LOG_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.scroll = 0;
    }

    pub fn lines(&self) -> &VecDeque<LogLine> {
        &self.lines
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.scroll = (self.scroll + n).min(self.lines.len());
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.scroll = self.scroll.saturating_sub(n);
    }
}

/// Which pane a background job writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Shell,
    Assistant,
}

pub struct App {
    pub layout: PortableLayout,
    pub focus: Focus,
    pub tree: FileTree,
    pub editor: Editor,
    pub document: Option<OpenDocument>,
    pub shell_input: LineInput,
    pub assistant_input: LineInput,
    pub general_log: LogPane,
    pub assistant_log: LogPane,
    pub assistant_mode: DisplayMode,
    pub should_quit: bool,
    incidents: IncidentLog,
    general_tx: mpsc::UnboundedSender<LogLine>,
    general_rx: mpsc::UnboundedReceiver<LogLine>,
    assistant_tx: mpsc::UnboundedSender<LogLine>,
    assistant_rx: mpsc::UnboundedReceiver<LogLine>,
    workbench: Arc<Mutex<Workbench>>,
    session: Arc<Mutex<AssistantSession>>,
}

/// Hand the channel's state to a spawned job, or `false` when it is busy
fn try_spawn<T, F, Fut>(lock: &Arc<Mutex<T>>, console: Console, job: F) -> bool
where
    T: Send + 'static,
    F: FnOnce(OwnedMutexGuard<T>, Console) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    match lock.clone().try_lock_owned() {
        Ok(guard) => {
            tokio::spawn(job(guard, console));
            true
        }
        Err(_) => false,
    }
}

impl App {
    pub fn new(
        layout: PortableLayout,
        config: Config,
        launcher: Arc<dyn Launcher>,
        base_env: EnvMap,
    ) -> Self {
        let (general_tx, general_rx) = mpsc::unbounded_channel();
        let (assistant_tx, assistant_rx) = mpsc::unbounded_channel();
        let workbench = Workbench::new(
            layout.clone(),
            launcher.clone(),
            base_env.clone(),
            config.dev_tools.clone(),
        );
        let session = AssistantSession::new(layout.clone(), config.codex, launcher, base_env);

        let mut app = Self {
            tree: FileTree::new(layout.root()),
            incidents: IncidentLog::new(layout.incident_file()),
            layout,
            focus: Focus::ShellInput,
            editor: Editor::new(),
            document: None,
            shell_input: LineInput::new(),
            assistant_input: LineInput::new(),
            general_log: LogPane::default(),
            assistant_log: LogPane::default(),
            assistant_mode: DisplayMode::Compact,
            should_quit: false,
            general_tx,
            general_rx,
            assistant_tx,
            assistant_rx,
            workbench: Arc::new(Mutex::new(workbench)),
            session: Arc::new(Mutex::new(session)),
        };
        app.banner();
        app
    }

    fn banner(&mut self) {
        let root = self.layout.root().display().to_string();
        self.log(LogKind::Info, APP_TITLE);
        self.log(LogKind::Muted, &format!("Root: {root}"));
        self.log(
            LogKind::Muted,
            "Shell: command field - Codex: assistant field - Ctrl+K login - Ctrl+U install",
        );
    }

    pub fn title(&self) -> String {
        match &self.document {
            Some(doc) if doc.is_dirty() => format!("{APP_TITLE} *"),
            _ => APP_TITLE.to_string(),
        }
    }

    pub fn subtitle(&self) -> String {
        match &self.document {
            Some(doc) => format!("{}  ({})", doc.path.display(), doc.encoding),
            None => self.layout.root().display().to_string(),
        }
    }

    fn console(&self, channel: Channel) -> Console {
        let tx = match channel {
            Channel::Shell => self.general_tx.clone(),
            Channel::Assistant => self.assistant_tx.clone(),
        };
        Console::new(tx, self.incidents.clone())
    }

    /// Direct line to the general pane, no incident
    fn log(&mut self, kind: LogKind, text: &str) {
        self.general_log.push(LogLine::new(kind, text));
    }

    fn busy(&mut self, channel: Channel) {
        let (pane, text) = match channel {
            Channel::Shell => (&mut self.general_log, "Shell is busy; wait for the current command to finish."),
            Channel::Assistant => (&mut self.assistant_log, "Codex is busy; wait for the current request to finish."),
        };
        debug!(?channel, "submission rejected");
        pane.push(LogLine::new(LogKind::Warning, text));
    }

    /// Move lines written by background jobs into the panes
    pub fn drain(&mut self) -> bool {
        let mut changed = false;
        while let Ok(line) = self.general_rx.try_recv() {
            self.general_log.push(line);
            changed = true;
        }
        while let Ok(line) = self.assistant_rx.try_recv() {
            self.assistant_log.push(line);
            changed = true;
        }
        changed
    }

    fn on_shell<F, Fut>(&mut self, job: F)
    where
        F: FnOnce(OwnedMutexGuard<Workbench>, Console) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let console = self.console(Channel::Shell);
        if !try_spawn(&self.workbench, console, job) {
            self.busy(Channel::Shell);
        }
    }

    fn on_assistant<F, Fut>(&mut self, job: F)
    where
        F: FnOnce(OwnedMutexGuard<AssistantSession>, Console) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let console = self.console(Channel::Assistant);
        if !try_spawn(&self.session, console, job) {
            self.busy(Channel::Assistant);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') if ctrl => self.should_quit = true,
            KeyCode::Char('s') if ctrl => {
                self.save();
            }
            KeyCode::F(5) => self.run_current(),
            KeyCode::Char('l') if ctrl => self.clear_logs(),
            KeyCode::Char('r') if ctrl => {
                self.tree.reload();
                self.log(LogKind::Muted, "tree reloaded");
            }
            KeyCode::Char('k') if ctrl => self.assistant_login(),
            KeyCode::Char('t') if ctrl => self.assistant_status(),
            KeyCode::Char('u') if ctrl => self.assistant_install(),
            KeyCode::Char('e') if ctrl => self.build_exe(),
            KeyCode::Char('p') if ctrl => self.pyinstaller_install(),
            KeyCode::Char('d') if ctrl => self.dev_tools(),
            KeyCode::Char('v') if ctrl => self.toggle_display_mode(),
            KeyCode::Tab => self.focus = self.focus.next(),
            _ => match self.focus {
                Focus::Tree => self.tree_key(key),
                Focus::Editor => self.editor_key(key),
                Focus::ShellInput | Focus::AssistantInput => self.input_key(key),
            },
        }
    }

    fn tree_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.tree.up(),
            KeyCode::Down => self.tree.down(),
            KeyCode::Enter => {
                if let Some(path) = self.tree.activate() {
                    self.open(&path);
                }
            }
            _ => {}
        }
    }

    fn editor_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let edited = match key.code {
            KeyCode::Char(c) if !ctrl => self.editor.insert_char(c),
            KeyCode::Enter => self.editor.insert_newline(),
            KeyCode::Backspace => self.editor.backspace(),
            KeyCode::Delete => self.editor.delete(),
            KeyCode::Left => {
                self.editor.left();
                false
            }
            KeyCode::Right => {
                self.editor.right();
                false
            }
            KeyCode::Up => {
                self.editor.up(1);
                false
            }
            KeyCode::Down => {
                self.editor.down(1);
                false
            }
            KeyCode::PageUp => {
                self.editor.up(20);
                false
            }
            KeyCode::PageDown => {
                self.editor.down(20);
                false
            }
            KeyCode::Home => {
                self.editor.home();
                false
            }
            KeyCode::End => {
                self.editor.end();
                false
            }
            _ => false,
        };
        if edited {
            if let Some(doc) = &mut self.document {
                doc.mark_dirty();
            }
        }
    }

    fn input_key(&mut self, key: KeyEvent) {
        let shell = self.focus == Focus::ShellInput;
        let (input, pane) = if shell {
            (&mut self.shell_input, &mut self.general_log)
        } else {
            (&mut self.assistant_input, &mut self.assistant_log)
        };
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => input.push(c),
            KeyCode::Backspace => input.pop(),
            KeyCode::Delete => input.delete(),
            KeyCode::Left => input.left(),
            KeyCode::Right => input.right(),
            KeyCode::Home => input.home(),
            KeyCode::End => input.end(),
            KeyCode::Up => input.history_up(),
            KeyCode::Down => input.history_down(),
            KeyCode::PageUp => pane.scroll_up(10),
            KeyCode::PageDown => pane.scroll_down(10),
            KeyCode::Enter => {
                let text = input.submit();
                pane.scroll = 0;
                if text.is_empty() {
                    return;
                }
                if shell {
                    self.run_shell(text);
                } else {
                    self.ask(text);
                }
            }
            _ => {}
        }
    }

    /// Load `path` into the editor, refusing binary files
    pub fn open(&mut self, path: &Path) {
        match OpenDocument::load(path) {
            Ok(Loaded::Text { document, text }) => {
                self.editor.set_text(&text);
                self.document = Some(document);
                self.focus = Focus::Editor;
            }
            Ok(Loaded::Binary) => {
                self.log(
                    LogKind::Warning,
                    &format!("Binary or non-text file skipped: {}", path.display()),
                );
            }
            Err(err) => {
                warn!(path = %path.display(), "open failed: {err:#}");
                self.console(Channel::Shell).report(
                    IncidentRecord::new(Severity::Error, "open_file", format!("{err:#}"))
                        .with_exception(ExceptionInfo::from_anyhow(&err)),
                );
            }
        }
    }

    /// Save the open document; `false` when nothing was written
    pub fn save(&mut self) -> bool {
        let Some(doc) = self.document.as_mut() else {
            self.log(LogKind::Warning, "No file open.");
            return false;
        };
        let path = doc.path.display().to_string();
        let mut console = Console::new(self.general_tx.clone(), self.incidents.clone());
        let saved = match doc.save(&self.editor.text()) {
            Ok(SaveOutcome::Saved) => {
                console.success(&format!("Saved {path}"));
                true
            }
            Ok(SaveOutcome::FellBackToUtf8) => {
                console.warn("save", &format!("Saved as UTF-8 (fallback) {path}"));
                true
            }
            Err(err) => {
                console.report(
                    IncidentRecord::new(Severity::Error, "save", format!("{err:#}"))
                        .with_exception(ExceptionInfo::from_anyhow(&err)),
                );
                false
            }
        };
        self.drain();
        saved
    }

    /// Path of the open `.py` document, saved first when dirty
    fn python_target(&mut self) -> Option<PathBuf> {
        let is_py = self.document.as_ref().is_some_and(|d| d.is_python());
        if !is_py {
            self.log(LogKind::Warning, "Open a .py file first.");
            return None;
        }
        let doc = self.document.as_ref()?;
        let path = doc.path.clone();
        if doc.is_dirty() && !self.save() {
            return None;
        }
        Some(path)
    }

    fn clear_logs(&mut self) {
        self.general_log.clear();
        self.assistant_log.clear();
        self.log(LogKind::Muted, "logs cleared");
    }

    fn run_shell(&mut self, command: String) {
        self.on_shell(|mut wb, mut console| async move {
            if let Err(err) = wb.run_shell(&command, &mut console).await {
                console.tool_error("shell", &err);
            }
        });
    }

    fn run_current(&mut self) {
        let Some(script) = self.python_target() else {
            return;
        };
        self.on_shell(|mut wb, mut console| async move {
            if let Err(err) = wb.run_python(&script, &mut console).await {
                console.tool_error("run_python", &err);
            }
        });
    }

    fn build_exe(&mut self) {
        let Some(script) = self.python_target() else {
            return;
        };
        self.on_shell(|mut wb, mut console| async move {
            if let Err(err) = wb.build_executable(&script, &mut console).await {
                console.tool_error("build_exe", &err);
            }
        });
    }

    fn pyinstaller_install(&mut self) {
        self.on_shell(|mut wb, mut console| async move {
            if let Err(err) = wb.install_pyinstaller(&mut console).await {
                console.tool_error("install_pyinstaller", &err);
            }
        });
    }

    fn dev_tools(&mut self) {
        self.on_shell(|mut wb, mut console| async move {
            if let Err(err) = wb.install_dev_tools(&mut console).await {
                console.tool_error("dev_tools", &err);
            }
        });
    }

    fn ask(&mut self, prompt: String) {
        self.on_assistant(|mut session, mut console| async move {
            if let Err(err) = session.submit(&prompt, &mut console).await {
                console.tool_error("codex_exec", &err);
            }
        });
    }

    fn assistant_login(&mut self) {
        self.on_assistant(|mut session, mut console| async move {
            if let Err(err) = session.login(&mut console).await {
                console.tool_error("codex_login", &err);
            }
        });
    }

    fn assistant_status(&mut self) {
        self.on_assistant(|mut session, mut console| async move {
            session.check_status(&mut console).await;
        });
    }

    fn assistant_install(&mut self) {
        self.on_assistant(|mut session, mut console| async move {
            if let Err(err) = session.install(true, &mut console).await {
                console.tool_error("codex_install", &err);
            }
        });
    }

    fn toggle_display_mode(&mut self) {
        let toggled = self
            .session
            .try_lock()
            .ok()
            .map(|mut session| session.toggle_display_mode());
        let Some(mode) = toggled else {
            self.busy(Channel::Assistant);
            return;
        };
        self.assistant_mode = mode;
        self.assistant_log
            .push(LogLine::new(LogKind::Muted, format!("display mode: {}", mode.label())));
    }
}
