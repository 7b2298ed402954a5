//! Turning the assistant event stream into transcript turns

use serde_json::Value;

use super::failure::AssistantFailure;
use super::record::{decode, AssistantRecord, Decoded};
use crate::utils::ellipsize;

/// Longest argument payload shown in an action line
const MAX_ARGS_CHARS: usize = 400;

/// How the assistant pane renders the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Conversational turns; deltas merged, repeats collapsed
    #[default]
    Compact,
    /// Every event verbatim, prefixed with its type
    Raw,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Compact => DisplayMode::Raw,
            DisplayMode::Raw => DisplayMode::Compact,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DisplayMode::Compact => "compact",
            DisplayMode::Raw => "raw",
        }
    }
}

/// One rendered unit of the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayTurn {
    User(String),
    Assistant(String),
    Action(String),
}

impl DisplayTurn {
    pub fn label(&self) -> &'static str {
        match self {
            DisplayTurn::User(_) => "You",
            DisplayTurn::Assistant(_) => "Codex",
            DisplayTurn::Action(_) => "Action",
        }
    }

    pub fn text(&self) -> &str {
        match self {
            DisplayTurn::User(text) | DisplayTurn::Assistant(text) | DisplayTurn::Action(text) => text,
        }
    }

    fn fingerprint(&self) -> String {
        format!("{}:{}", self.label(), self.text().trim())
    }
}

/// Output of feeding one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Turn(DisplayTurn),
    /// Raw-mode line, shown as-is
    Raw(String),
    Failure(AssistantFailure),
}

/// Accumulates deltas and de-duplicates consecutive identical turns
#[derive(Debug, Default)]
pub struct TurnAssembler {
    mode: DisplayMode,
    buffer: String,
    last_fingerprint: Option<String>,
}

impl TurnAssembler {
    pub fn new(mode: DisplayMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Switch modes; the next turn is never treated as a repeat
    pub fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
        self.last_fingerprint = None;
    }

    /// Process one line of CLI output
    pub fn feed(&mut self, line: &str) -> Vec<Rendered> {
        let line = line.trim();
        if line.is_empty() {
            return Vec::new();
        }

        let mut out = Vec::new();
        match decode(line) {
            Decoded::Text(text) => match self.mode {
                DisplayMode::Compact => self.push(DisplayTurn::Action(text), &mut out),
                DisplayMode::Raw => out.push(Rendered::Raw(text)),
            },
            Decoded::Structured { kind, line, record } => {
                if self.mode == DisplayMode::Raw {
                    out.push(Rendered::Raw(match kind {
                        Some(kind) => format!("[{kind}] {line}"),
                        None => line,
                    }));
                }
                self.apply(record, &mut out);
            }
        }
        out
    }

    fn apply(&mut self, record: AssistantRecord, out: &mut Vec<Rendered>) {
        match record {
            AssistantRecord::Error { message } => {
                out.push(Rendered::Failure(AssistantFailure::remote(message)));
                return;
            }
            AssistantRecord::TurnFailed { message } => {
                out.push(Rendered::Failure(AssistantFailure::turn_failed(message)));
                return;
            }
            _ if self.mode == DisplayMode::Raw => return,
            _ => {}
        }

        match record {
            AssistantRecord::TextDelta(delta) => self.buffer.push_str(&delta),
            AssistantRecord::TextDone(text) => {
                if self.buffer.is_empty() {
                    if let Some(text) = text {
                        self.buffer = text;
                    }
                }
                if let Some(turn) = self.take_buffer() {
                    self.push(turn, out);
                }
            }
            AssistantRecord::AssistantMessage(text) => {
                if let Some(turn) = self.take_buffer() {
                    self.push(turn, out);
                }
                self.push(DisplayTurn::Assistant(text), out);
            }
            AssistantRecord::UserMessage(text) => self.push(DisplayTurn::User(text), out),
            AssistantRecord::ToolCall { name, args } => {
                if let Some(text) = format_action(name.as_deref(), args.as_ref()) {
                    self.push(DisplayTurn::Action(text), out);
                }
            }
            AssistantRecord::Command { command, exit_code } => {
                let text = match exit_code {
                    Some(code) if code != 0 => format!("shell: {command} (exit {code})"),
                    _ => format!("shell: {command}"),
                };
                self.push(DisplayTurn::Action(text), out);
            }
            AssistantRecord::Error { .. } | AssistantRecord::TurnFailed { .. } | AssistantRecord::Other => {}
        }
    }

    /// Buffered assistant text as a final turn (end of stream)
    pub fn flush(&mut self) -> Option<DisplayTurn> {
        let turn = self.take_buffer()?;
        self.accept(&turn).then_some(turn)
    }

    /// Run a turn produced outside the stream (the user prompt) through de-duplication
    pub fn accept(&mut self, turn: &DisplayTurn) -> bool {
        if turn.text().trim().is_empty() {
            return false;
        }
        let fingerprint = turn.fingerprint();
        if self.last_fingerprint.as_deref() == Some(fingerprint.as_str()) {
            return false;
        }
        self.last_fingerprint = Some(fingerprint);
        true
    }

    fn push(&mut self, turn: DisplayTurn, out: &mut Vec<Rendered>) {
        if self.accept(&turn) {
            out.push(Rendered::Turn(turn));
        }
    }

    fn take_buffer(&mut self) -> Option<DisplayTurn> {
        let text = std::mem::take(&mut self.buffer);
        (!text.trim().is_empty()).then(|| DisplayTurn::Assistant(text))
    }
}

/// `"<name>: <json-args>"`, or whichever half is present
fn format_action(name: Option<&str>, args: Option<&Value>) -> Option<String> {
    let args = args.and_then(|args| {
        let text = match args {
            Value::String(s) => s.trim().to_string(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        (!text.is_empty()).then(|| ellipsize(&text, MAX_ARGS_CHARS))
    });
    let name = name.map(str::trim).filter(|n| !n.is_empty());
    match (name, args) {
        (Some(name), Some(args)) => Some(format!("{name}: {args}")),
        (Some(name), None) => Some(name.to_string()),
        (None, Some(args)) => Some(args),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turns(rendered: Vec<Rendered>) -> Vec<DisplayTurn> {
        rendered
            .into_iter()
            .filter_map(|r| match r {
                Rendered::Turn(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn deltas_merge_into_one_turn() {
        let mut asm = TurnAssembler::new(DisplayMode::Compact);
        assert!(asm.feed(r#"{"type":"response.output_text.delta","delta":"Hel"}"#).is_empty());
        assert!(asm.feed(r#"{"type":"response.output_text.delta","delta":"lo"}"#).is_empty());
        assert_eq!(
            turns(asm.feed(r#"{"type":"response.completed"}"#)),
            vec![DisplayTurn::Assistant("Hello".into())]
        );
        // buffer cleared
        assert!(asm.feed(r#"{"type":"response.completed"}"#).is_empty());
    }

    #[test]
    fn consecutive_duplicates_collapse() {
        let mut asm = TurnAssembler::new(DisplayMode::Compact);
        let line = r#"{"type":"item.completed","item":{"type":"agent_message","text":"Done."}}"#;
        assert_eq!(turns(asm.feed(line)).len(), 1);
        assert!(turns(asm.feed(line)).is_empty());
        assert_eq!(turns(asm.feed("plain")).len(), 1);
        assert_eq!(turns(asm.feed(line)).len(), 1);
    }

    #[test]
    fn mode_toggle_resets_dedupe() {
        let mut asm = TurnAssembler::new(DisplayMode::Compact);
        let line = r#"{"type":"item.completed","item":{"type":"agent_message","text":"Same"}}"#;
        assert_eq!(turns(asm.feed(line)).len(), 1);
        asm.set_mode(DisplayMode::Raw);
        asm.set_mode(DisplayMode::Compact);
        assert_eq!(turns(asm.feed(line)).len(), 1);
    }

    #[test]
    fn actions_are_formatted() {
        assert_eq!(
            format_action(Some("read_file"), Some(&serde_json::json!({"path": "a.py"}))),
            Some(r#"read_file: {"path":"a.py"}"#.into())
        );
        assert_eq!(format_action(Some("ping"), None), Some("ping".into()));
        assert_eq!(
            format_action(None, Some(&Value::String("{}".into()))),
            Some("{}".into())
        );
        assert_eq!(format_action(Some(" "), Some(&Value::Null)), None);

        let mut asm = TurnAssembler::new(DisplayMode::Compact);
        assert_eq!(
            turns(asm.feed(r#"{"type":"item.started","item":{"type":"command_execution","command":"pytest"}}"#)),
            vec![DisplayTurn::Action("shell: pytest".into())]
        );
    }

    #[test]
    fn raw_mode_echoes_events_and_still_reports_failures() {
        let mut asm = TurnAssembler::new(DisplayMode::Raw);
        let out = asm.feed(r#"{"type":"response.output_text.delta","delta":"x"}"#);
        assert_eq!(
            out,
            vec![Rendered::Raw(
                r#"[response.output_text.delta] {"type":"response.output_text.delta","delta":"x"}"#.into()
            )]
        );
        assert_eq!(asm.flush(), None);

        let out = asm.feed(r#"{"type":"error","message":"status 429"}"#);
        assert_eq!(out.len(), 2);
        assert!(matches!(
            &out[1],
            Rendered::Failure(AssistantFailure::RemoteError { status: Some(429), .. })
        ));
        assert_eq!(asm.feed("not json"), vec![Rendered::Raw("not json".into())]);
    }

    #[test]
    fn raw_mode_keeps_key_order_and_big_numbers() {
        let mut asm = TurnAssembler::new(DisplayMode::Raw);
        let line = r#"{"type":"x","zeta":1,"alpha":12345678901234567890123}"#;
        match asm.feed(line).as_slice() {
            [Rendered::Raw(text)] => {
                assert!(text.starts_with("[x] "));
                assert!(text.ends_with(line));
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn flush_emits_partial_text() {
        let mut asm = TurnAssembler::new(DisplayMode::Compact);
        asm.feed(r#"{"type":"response.output_text.delta","delta":"partial"}"#);
        assert_eq!(asm.flush(), Some(DisplayTurn::Assistant("partial".into())));
        assert_eq!(asm.flush(), None);
    }

    #[test]
    fn turn_failed_surfaces_in_compact_mode() {
        let mut asm = TurnAssembler::new(DisplayMode::Compact);
        let out = asm.feed(r#"{"type":"turn.failed","error":{"message":"status 503"}}"#);
        assert_eq!(
            out,
            vec![Rendered::Failure(AssistantFailure::TurnFailed {
                status: Some(503),
                message: "status 503".into()
            })]
        );
    }
}
