//! Append-only incident file (`bug.md` at the workspace root)
//!
//! Every failure the UI shows is also written here so it can be attached to
//! a bug report after the session is gone. Writes are best effort: a failure
//! to record an incident must never become a second failure.

use chrono::{DateTime, Local};
use std::fmt::{self, Write as _};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Error attached to an incident: type name, message and cause chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    pub kind: String,
    pub message: String,
    pub trace: Option<String>,
}

impl ExceptionInfo {
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        let full = std::any::type_name::<E>();
        let kind = full.rsplit("::").next().unwrap_or(full).to_string();
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {cause}"));
            source = cause.source();
        }
        Self {
            kind,
            message: err.to_string(),
            trace: (!causes.is_empty()).then(|| causes.join("\n")),
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let trace: Vec<String> = err.chain().skip(1).map(|c| format!("caused by: {c}")).collect();
        Self {
            kind: "Error".to_string(),
            message: err.to_string(),
            trace: (!trace.is_empty()).then(|| trace.join("\n")),
        }
    }
}

/// One block of the incident file
#[derive(Debug, Clone)]
pub struct IncidentRecord {
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    pub context: String,
    pub message: String,
    pub details: Option<String>,
    pub exception: Option<ExceptionInfo>,
}

impl IncidentRecord {
    pub fn new(severity: Severity, context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            severity,
            context: context.into(),
            message: message.into(),
            details: None,
            exception: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        if !details.trim().is_empty() {
            self.details = Some(details);
        }
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    /// Markdown block, terminated by a blank line
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "## {}", self.timestamp.format("%Y-%m-%dT%H:%M:%S"));
        let _ = writeln!(out, "- niveau: {}", self.severity);
        let _ = writeln!(out, "- contexte: {}", single_line(&self.context));
        let _ = writeln!(out, "- message: {}", single_line(&self.message));
        if let Some(details) = &self.details {
            let _ = writeln!(out, "- details: {}", single_line(details));
        }
        if let Some(exception) = &self.exception {
            let _ = writeln!(
                out,
                "- exception: {}: {}",
                single_line(&exception.kind),
                single_line(&exception.message)
            );
            if let Some(trace) = &exception.trace {
                let _ = writeln!(out, "```text\n{}\n```", trace.trim_end());
            }
        }
        out.push('\n');
        out
    }
}

/// Escape line breaks so a field cannot start a new block
fn single_line(text: &str) -> String {
    text.replace("\r\n", "\\n")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Handle on the incident file; cheap to clone
#[derive(Debug, Clone)]
pub struct IncidentLog {
    path: PathBuf,
}

impl IncidentLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record`. Failures are logged and otherwise ignored.
    pub fn append(&self, record: &IncidentRecord) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(record.render().as_bytes()));
        if let Err(err) = result {
            tracing::debug!(path = %self.path.display(), error = %err, "incident not recorded");
        }
    }

    /// Shorthand for a record without details or exception
    pub fn record(&self, severity: Severity, context: &str, message: &str) {
        self.append(&IncidentRecord::new(severity, context, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, thiserror::Error)]
    #[error("outer failure")]
    struct Outer {
        #[source]
        source: std::io::Error,
    }

    fn fixed(record: IncidentRecord) -> IncidentRecord {
        IncidentRecord {
            timestamp: Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            ..record
        }
    }

    #[test]
    fn renders_fixed_block() {
        let record = fixed(
            IncidentRecord::new(Severity::Error, "codex_exec", "codex exec finished with an error (rc=2).")
                .with_details("hint: codex login"),
        );
        assert_eq!(
            record.render(),
            "## 2024-05-01T09:30:00\n\
             - niveau: error\n\
             - contexte: codex_exec\n\
             - message: codex exec finished with an error (rc=2).\n\
             - details: hint: codex login\n\n"
        );
    }

    #[test]
    fn exception_line_and_trace() {
        let err = Outer {
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk gone"),
        };
        let record = fixed(
            IncidentRecord::new(Severity::Warning, "save", "write failed")
                .with_details("   ")
                .with_exception(ExceptionInfo::from_error(&err)),
        );
        let text = record.render();
        assert!(!text.contains("- details:"));
        assert!(text.contains("- niveau: warning\n"));
        assert!(text.contains("- exception: Outer: outer failure\n"));
        assert!(text.contains("```text\ncaused by: disk gone\n```\n"));
    }

    #[test]
    fn multiline_fields_stay_in_one_block() {
        let record = fixed(
            IncidentRecord::new(
                Severity::Error,
                "codex",
                "boom\n## 2099-01-01T00:00:00\n- niveau: info",
            )
            .with_details("first\r\nsecond"),
        );
        let text = record.render();
        let starting = |prefix: &str| text.lines().filter(|l| l.starts_with(prefix)).count();
        assert_eq!(starting("## "), 1);
        assert_eq!(starting("- niveau:"), 1);
        assert!(text.contains("- message: boom\\n## 2099-01-01T00:00:00\\n- niveau: info\n"));
        assert!(text.contains("- details: first\\nsecond\n"));
    }

    #[test]
    fn appends_and_grows() {
        let tmp = tempfile::tempdir().unwrap();
        let log = IncidentLog::new(tmp.path().join("bug.md"));
        log.record(Severity::Warning, "a", "first");
        log.record(Severity::Error, "b", "second");
        let content = std::fs::read_to_string(log.path()).unwrap();
        let first = content.find("- message: first").unwrap();
        let second = content.find("- message: second").unwrap();
        assert!(first < second);
        assert_eq!(content.matches("## ").count(), 2);
    }

    #[test]
    fn unwritable_path_is_swallowed() {
        let tmp = tempfile::tempdir().unwrap();
        // a directory cannot be opened for append
        let log = IncidentLog::new(tmp.path());
        log.record(Severity::Error, "ctx", "lost");
        assert!(tmp.path().is_dir());
    }
}
