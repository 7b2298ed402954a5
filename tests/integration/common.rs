use assert_fs::prelude::*;
use assert_fs::TempDir;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use usbide::console::{Console, LogLine};
use usbide::error::{ToolError, ToolResult};
use usbide::incident::IncidentLog;
use usbide::layout::PortableLayout;
use usbide::process::{Launcher, ProcessEvent, ProcessStream};

/// Test utilities for integration tests
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestEnvironment {
    /// Create a new test environment with an empty workspace root
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        Self { temp_dir, root }
    }

    pub fn layout(&self) -> PortableLayout {
        PortableLayout::new(&self.root)
    }

    /// Vendored node plus an installed package with a JS entry point
    pub fn install_portable_codex(&self, package: &str) {
        let node = if cfg!(windows) {
            "tools/node/node.exe"
        } else {
            "tools/node/bin/node"
        };
        self.temp_dir.child(node).write_str("").unwrap();

        let package_dir = self
            .temp_dir
            .child(".usbide/codex/node_modules")
            .child(package);
        package_dir
            .child("package.json")
            .write_str(r#"{"name": "codex", "bin": {"codex": "bin/codex.js"}}"#)
            .unwrap();
        package_dir.child("bin/codex.js").write_str("").unwrap();
    }

    pub fn incident_file(&self) -> PathBuf {
        self.layout().incident_file()
    }

    pub fn incidents(&self) -> String {
        std::fs::read_to_string(self.incident_file()).unwrap_or_default()
    }

    /// Console that records into memory and appends to the workspace `bug.md`
    pub fn console(&self) -> (Console, Arc<Mutex<Vec<LogLine>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let console = Console::new(lines.clone(), IncidentLog::new(self.incident_file()));
        (console, lines)
    }
}

pub fn texts(lines: &Arc<Mutex<Vec<LogLine>>>) -> Vec<String> {
    lines.lock().unwrap().iter().map(|l| l.text.clone()).collect()
}

/// Canned launch outcome
pub enum Reply {
    Events(Vec<ProcessEvent>),
    NotFound,
}

impl Reply {
    /// Output lines followed by an exit code
    pub fn lines(lines: &[&str], code: i32) -> Self {
        let mut events: Vec<ProcessEvent> = lines.iter().map(|l| ProcessEvent::line(*l)).collect();
        events.push(ProcessEvent::exit(Some(code)));
        Reply::Events(events)
    }
}

/// Launcher that replays replies in order and records each argv
#[derive(Default)]
pub struct ReplayLauncher {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ReplayLauncher {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl Launcher for ReplayLauncher {
    fn launch(
        &self,
        argv: &[String],
        _cwd: &Path,
        _env: &HashMap<String, String>,
    ) -> ToolResult<ProcessStream> {
        self.calls.lock().unwrap().push(argv.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Events(events)) => Ok(ProcessStream::from_events(events)),
            Some(Reply::NotFound) | None => Err(ToolError::Spawn {
                program: argv.first().cloned().unwrap_or_default(),
                source: io::Error::from(io::ErrorKind::NotFound),
            }),
        }
    }
}
