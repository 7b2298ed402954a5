//! Decoding one line of the assistant CLI's JSON event stream
//!
//! Lines are decoded speculatively: anything that is not a JSON object comes
//! back as `Decoded::Text` and is rendered verbatim.

use serde_json::{Map, Value};

const NAME_FIELDS: &[&str] = &["name", "tool", "tool_name", "function"];
const ARG_FIELDS: &[&str] = &["arguments", "args", "input", "parameters"];

/// What a structured event means for the transcript
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantRecord {
    /// Partial assistant text to accumulate
    TextDelta(String),
    /// End of a streamed message, optionally carrying the final text
    TextDone(Option<String>),
    /// A complete assistant message
    AssistantMessage(String),
    /// The user prompt echoed back
    UserMessage(String),
    /// Tool invocation
    ToolCall {
        name: Option<String>,
        args: Option<Value>,
    },
    /// Shell command run by the assistant
    Command {
        command: String,
        exit_code: Option<i64>,
    },
    /// Structured error
    Error { message: String },
    /// The turn as a whole failed
    TurnFailed { message: String },
    /// Anything else (session/turn lifecycle, reasoning, unknown types)
    Other,
}

/// Result of decoding one line
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// JSON object: its `type` (if any), the line as received, and its meaning
    Structured {
        kind: Option<String>,
        line: String,
        record: AssistantRecord,
    },
    /// Not JSON, or JSON that is not an object
    Text(String),
}

/// Decode a trimmed line
pub fn decode(line: &str) -> Decoded {
    match serde_json::from_str::<Value>(line) {
        Ok(value @ Value::Object(_)) => {
            let kind = value.get("type").and_then(Value::as_str).map(str::to_string);
            let record = classify(kind.as_deref(), &value);
            Decoded::Structured {
                kind,
                line: line.to_string(),
                record,
            }
        }
        _ => Decoded::Text(line.to_string()),
    }
}

fn classify(kind: Option<&str>, value: &Value) -> AssistantRecord {
    match kind.unwrap_or("") {
        "response.output_text.delta" | "response.output_text" | "agent_message_delta" => {
            AssistantRecord::TextDelta(
                str_field(value, &["delta", "text"])
                    .unwrap_or_default()
                    .to_string(),
            )
        }
        "response.output_text.done" | "response.output_item.done" | "response.completed" => {
            AssistantRecord::TextDone(str_field(value, &["text"]).map(str::to_string))
        }
        "item.started" | "item.updated" | "item.completed" => match value.get("item") {
            Some(item) => classify_item(item, kind == Some("item.completed")),
            None => AssistantRecord::Other,
        },
        "error" => AssistantRecord::Error {
            message: error_message(value),
        },
        "turn.failed" => AssistantRecord::TurnFailed {
            message: value
                .get("error")
                .map(error_message)
                .unwrap_or_default(),
        },
        "agent_message" | "assistant_message" => text_of(value)
            .map(AssistantRecord::AssistantMessage)
            .unwrap_or(AssistantRecord::Other),
        "user_message" => text_of(value)
            .map(AssistantRecord::UserMessage)
            .unwrap_or(AssistantRecord::Other),
        "message" => message_by_role(value),
        "function_call" | "tool_call" | "mcp_tool_call" | "custom_tool_call" => tool_call(value),
        _ => heuristic(value),
    }
}

/// Items of the `item.*` events
fn classify_item(item: &Value, completed: bool) -> AssistantRecord {
    match item.get("type").and_then(Value::as_str).unwrap_or("") {
        "agent_message" | "assistant_message" if completed => text_of(item)
            .map(AssistantRecord::AssistantMessage)
            .unwrap_or(AssistantRecord::Other),
        "user_message" if completed => text_of(item)
            .map(AssistantRecord::UserMessage)
            .unwrap_or(AssistantRecord::Other),
        "message" if completed => message_by_role(item),
        "command_execution" => match str_field(item, &["command"]) {
            Some(command) => AssistantRecord::Command {
                command: command.to_string(),
                exit_code: item.get("exit_code").and_then(Value::as_i64),
            },
            None => AssistantRecord::Other,
        },
        "mcp_tool_call" | "tool_call" | "function_call" => tool_call(item),
        "file_change" => AssistantRecord::ToolCall {
            name: Some("file_change".to_string()),
            args: item.get("changes").cloned(),
        },
        "web_search" => AssistantRecord::ToolCall {
            name: Some("web_search".to_string()),
            args: item.get("query").cloned(),
        },
        "error" => AssistantRecord::Error {
            message: error_message(item),
        },
        "agent_message" | "assistant_message" | "user_message" | "message" => AssistantRecord::Other,
        _ => heuristic(item),
    }
}

/// `name`-like plus `arguments`-like field means a tool call
fn heuristic(value: &Value) -> AssistantRecord {
    let Some(map) = value.as_object() else {
        return AssistantRecord::Other;
    };
    let has_name = first_present(map, NAME_FIELDS).is_some();
    let has_args = first_present(map, ARG_FIELDS).is_some();
    if has_name && has_args {
        tool_call(value)
    } else {
        AssistantRecord::Other
    }
}

fn tool_call(value: &Value) -> AssistantRecord {
    let map = value.as_object();
    let name = map
        .and_then(|m| first_present(m, NAME_FIELDS))
        .and_then(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Object(inner) => inner.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .or_else(|| {
            let server = str_field(value, &["server"])?;
            let tool = str_field(value, &["tool"])?;
            Some(format!("{server}.{tool}"))
        });
    let args = map
        .and_then(|m| first_present(m, ARG_FIELDS))
        .or_else(|| {
            // OpenAI-style `function: {name, arguments}`
            value.get("function").and_then(|f| f.get("arguments"))
        })
        .cloned();
    AssistantRecord::ToolCall { name, args }
}

fn message_by_role(value: &Value) -> AssistantRecord {
    let Some(text) = text_of(value) else {
        return AssistantRecord::Other;
    };
    match value.get("role").and_then(Value::as_str) {
        Some("user") => AssistantRecord::UserMessage(text),
        Some("assistant") | None => AssistantRecord::AssistantMessage(text),
        Some(_) => AssistantRecord::Other,
    }
}

/// `text`/`message` string, or the text parts of a `content` array
fn text_of(value: &Value) -> Option<String> {
    if let Some(text) = str_field(value, &["text", "message"]) {
        return Some(text.to_string());
    }
    let parts = value.get("content")?.as_array()?;
    let joined: Vec<&str> = parts
        .iter()
        .filter_map(|part| match part {
            Value::String(s) => Some(s.as_str()),
            other => other.get("text").and_then(Value::as_str),
        })
        .collect();
    (!joined.is_empty()).then(|| joined.join(""))
}

/// `message`, nested `error.message`, `text`, or the error value itself
fn error_message(value: &Value) -> String {
    if let Some(message) = str_field(value, &["message", "text"]) {
        return message.to_string();
    }
    match value.get("error") {
        Some(Value::String(s)) => s.clone(),
        Some(inner) => str_field(inner, &["message", "text"])
            .map(str::to_string)
            .unwrap_or_default(),
        None => value.as_str().map(str::to_string).unwrap_or_default(),
    }
}

fn str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| value.get(*k).and_then(Value::as_str))
}

fn first_present<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| map.get(*k))
        .filter(|v| !v.is_null())
}
