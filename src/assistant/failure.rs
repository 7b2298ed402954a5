//! Assistant failure taxonomy and HTTP status advice

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::incident::Severity;

lazy_static! {
    static ref STATUS_PHRASE: Regex =
        Regex::new(r"(?i)\bstatus(?:\s+code)?\s*[:=]?\s*(\d{3})\b").expect("valid status regex");
    static ref BARE_CODE: Regex = Regex::new(r"\b(\d{3})\b").expect("valid code regex");
}

/// Status-like code in an error message: "status ###" first, else any 3-digit token
pub fn extract_status_code(message: &str) -> Option<u16> {
    STATUS_PHRASE
        .captures(message)
        .or_else(|| BARE_CODE.captures(message))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Static advice for well-known codes
pub fn hint_for_status(code: u16) -> Option<&'static str> {
    match code {
        401 => Some("Authentication expired or missing: run the login action again."),
        403 => Some("Access refused: check which login mode is in use (account vs API key)."),
        407 => Some("Proxy authentication required: check the proxy settings (HTTPS_PROXY)."),
        429 => Some("Rate limited: wait a moment before retrying."),
        500..=599 => Some("Service error on the remote side: retry shortly."),
        _ => None,
    }
}

/// Everything that can go wrong while driving the assistant CLI
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssistantFailure {
    /// The CLI could not be started
    #[error("assistant CLI not found: {detail}")]
    ToolNotFound { detail: String },

    /// `login status` exited non-zero
    #[error("assistant CLI is not authenticated (login status rc={}); run the login action", rc_text(.code))]
    NotAuthenticated { code: Option<i32> },

    /// Structured `error` record
    #[error("assistant error{}: {message}", status_suffix(.status))]
    RemoteError { status: Option<u16>, message: String },

    /// Structured `turn.failed` record
    #[error("assistant turn failed{}: {message}", status_suffix(.status))]
    TurnFailed { status: Option<u16>, message: String },

    /// Non-zero exit of the exec process; output rendering continues
    #[error("assistant exec finished with an error (rc={}).", rc_text(.code))]
    ProcessNonZeroExit { code: Option<i32> },

    /// Anything else raised while streaming
    #[error("assistant execution error: {message}")]
    GenericExecutionError { message: String },
}

fn rc_text(code: &Option<i32>) -> String {
    code.map_or_else(|| "?".to_string(), |c| c.to_string())
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl AssistantFailure {
    pub fn remote(message: impl Into<String>) -> Self {
        let message = message.into();
        AssistantFailure::RemoteError {
            status: extract_status_code(&message),
            message: non_empty(message),
        }
    }

    pub fn turn_failed(message: impl Into<String>) -> Self {
        let message = message.into();
        AssistantFailure::TurnFailed {
            status: extract_status_code(&message),
            message: non_empty(message),
        }
    }

    /// Incident `contexte` label
    pub fn context(&self) -> &'static str {
        match self {
            AssistantFailure::ToolNotFound { .. } => "codex_spawn",
            AssistantFailure::NotAuthenticated { .. } => "codex_status",
            AssistantFailure::RemoteError { .. } => "codex_error",
            AssistantFailure::TurnFailed { .. } => "codex_turn_failed",
            AssistantFailure::ProcessNonZeroExit { .. } => "codex_exec",
            AssistantFailure::GenericExecutionError { .. } => "codex_exec_exception",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AssistantFailure::ProcessNonZeroExit { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Whether the session should end in `Failed`
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AssistantFailure::ProcessNonZeroExit { .. })
    }

    /// Follow-up advice shown under the failure
    pub fn hints(&self, device_auth: bool) -> Vec<String> {
        match self {
            AssistantFailure::ToolNotFound { .. } => vec![
                "Install the assistant CLI (forced install) or put `codex` on PATH.".to_string(),
                "A portable Node runtime is expected under tools/node.".to_string(),
            ],
            AssistantFailure::NotAuthenticated { .. } => {
                let mut hints = vec!["Run the login action, then check the status again.".to_string()];
                if !device_auth {
                    hints.push(
                        "On a headless machine set USBIDE_CODEX_DEVICE_AUTH=1 to log in with a device code."
                            .to_string(),
                    );
                }
                hints
            }
            AssistantFailure::RemoteError { status, .. } | AssistantFailure::TurnFailed { status, .. } => status
                .and_then(hint_for_status)
                .map(|hint| vec![hint.to_string()])
                .unwrap_or_default(),
            AssistantFailure::ProcessNonZeroExit { .. } => {
                vec!["See bug.md for the recorded incident.".to_string()]
            }
            AssistantFailure::GenericExecutionError { .. } => Vec::new(),
        }
    }
}

fn non_empty(message: String) -> String {
    if message.trim().is_empty() {
        "an error occurred".to_string()
    } else {
        message
    }
}
