//! Pane-bound log output paired with the incident file
//!
//! Background operations write through a `Console` instead of touching the
//! UI directly. Warnings and errors go to both the pane and `bug.md`.

use lazy_static::lazy_static;
use regex::Regex;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::error::ToolError;
use crate::incident::{ExceptionInfo, IncidentLog, IncidentRecord, Severity};
use crate::tools::display_argv;

lazy_static! {
    static ref ANSI_ESCAPE: Regex =
        Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]")
            .expect("valid ANSI regex");
}

/// Display style of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Info,
    Command,
    Output,
    Muted,
    Success,
    Warning,
    Error,
    User,
    Assistant,
    Action,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub kind: LogKind,
    pub text: String,
}

impl LogLine {
    pub fn new(kind: LogKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Destination for log lines
pub trait LogSink: Send {
    fn emit(&mut self, line: LogLine);
}

impl LogSink for mpsc::UnboundedSender<LogLine> {
    fn emit(&mut self, line: LogLine) {
        // receiver gone means the UI is shutting down
        let _ = self.send(line);
    }
}

impl LogSink for Arc<Mutex<Vec<LogLine>>> {
    fn emit(&mut self, line: LogLine) {
        if let Ok(mut lines) = self.lock() {
            lines.push(line);
        }
    }
}

/// Writes to one pane and to the incident log
pub struct Console {
    sink: Box<dyn LogSink>,
    incidents: IncidentLog,
}

impl Console {
    pub fn new(sink: impl LogSink + 'static, incidents: IncidentLog) -> Self {
        Self {
            sink: Box::new(sink),
            incidents,
        }
    }

    pub fn incidents(&self) -> &IncidentLog {
        &self.incidents
    }

    /// Emit one line per text line, control sequences stripped
    pub fn line(&mut self, kind: LogKind, text: &str) {
        for part in text.split('\n') {
            self.sink.emit(LogLine::new(kind, sanitize_output(part)));
        }
    }

    pub fn info(&mut self, text: &str) {
        self.line(LogKind::Info, text);
    }

    pub fn output(&mut self, text: &str) {
        self.line(LogKind::Output, text);
    }

    pub fn muted(&mut self, text: &str) {
        self.line(LogKind::Muted, text);
    }

    pub fn success(&mut self, text: &str) {
        self.line(LogKind::Success, text);
    }

    /// Echo an argv about to be launched
    pub fn command(&mut self, argv: &[String]) {
        self.line(LogKind::Command, &format!("$ {}", display_argv(argv)));
    }

    pub fn warn(&mut self, context: &str, message: &str) {
        self.line(LogKind::Warning, message);
        self.incidents.record(Severity::Warning, context, message);
    }

    pub fn error(&mut self, context: &str, message: &str) {
        self.line(LogKind::Error, message);
        self.incidents.record(Severity::Error, context, message);
    }

    /// Error line plus a full incident record
    pub fn report(&mut self, record: IncidentRecord) {
        let kind = match record.severity {
            Severity::Warning => LogKind::Warning,
            Severity::Error => LogKind::Error,
        };
        self.line(kind, &record.message);
        self.incidents.append(&record);
    }

    /// Surface a `ToolError` with its cause chain in the incident
    pub fn tool_error(&mut self, context: &str, err: &ToolError) {
        let record = IncidentRecord::new(Severity::Error, context, err.to_string())
            .with_exception(ExceptionInfo::from_error(err));
        self.report(record);
    }

    /// Render an exit event; non-zero or unknown codes become incidents
    pub fn exit_status(&mut self, context: &str, label: &str, code: Option<i32>) -> bool {
        let rc = code.map_or_else(|| "?".to_string(), |c| c.to_string());
        self.muted(&format!("exit {rc}"));
        if code == Some(0) {
            return true;
        }
        self.error(context, &format!("{label} finished with an error (rc={rc})."));
        false
    }
}

/// Drop ANSI escapes and control characters; tabs become four spaces
pub fn sanitize_output(text: &str) -> String {
    let stripped = ANSI_ESCAPE.replace_all(text, "");
    let mut out = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        if c == '\t' {
            out.push_str("    ");
        } else if !c.is_control() {
            out.push(c);
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::testing::{capture, texts};
    use super::*;

    #[test]
    fn sanitize_strips_escapes() {
        assert_eq!(sanitize_output("\x1b[31mred\x1b[0m"), "red");
        assert_eq!(sanitize_output("a\tb\r"), "a    b");
        assert_eq!(sanitize_output("\x1b]0;title\x07body"), "body");
        assert_eq!(sanitize_output("bell\x07!"), "bell!");
        assert_eq!(sanitize_output("héllo ✓"), "héllo ✓");
    }

    #[test]
    fn non_zero_exit_records_incident() {
        let tmp = tempfile::tempdir().unwrap();
        let bug = tmp.path().join("bug.md");
        let (mut console, lines) = capture(IncidentLog::new(&bug));

        assert!(console.exit_status("shell", "command", Some(0)));
        assert!(!bug.exists());

        assert!(!console.exit_status("shell", "command", Some(2)));
        let content = std::fs::read_to_string(&bug).unwrap();
        assert!(content.contains("rc=2"));
        assert!(content.contains("- contexte: shell"));
        assert!(texts(&lines).contains(&"command finished with an error (rc=2).".to_string()));

        assert!(!console.exit_status("shell", "command", None));
        assert!(std::fs::read_to_string(&bug).unwrap().contains("rc=?"));
    }

    #[test]
    fn command_echo_and_multiline_split() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut console, lines) = capture(IncidentLog::new(tmp.path().join("bug.md")));
        console.command(&["pip".into(), "install".into(), "ruff".into()]);
        console.output("one\ntwo");
        assert_eq!(texts(&lines), vec!["$ pip install ruff", "one", "two"]);
        assert_eq!(lines.lock().unwrap()[0].kind, LogKind::Command);
    }

    #[test]
    fn tool_error_carries_exception() {
        let tmp = tempfile::tempdir().unwrap();
        let bug = tmp.path().join("bug.md");
        let (mut console, _) = capture(IncidentLog::new(&bug));
        let err = ToolError::Spawn {
            program: "codex".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        console.tool_error("codex_exec", &err);
        let content = std::fs::read_to_string(&bug).unwrap();
        assert!(content.contains("- exception: ToolError: failed to start `codex`"));
        assert!(content.contains("```text\ncaused by:"));
    }
}
