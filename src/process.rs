//! Subprocess streaming
//!
//! Launches a command with stdout and stderr merged into a single line stream,
//! yielding each line as soon as it is read and a single terminal exit event.

use futures::{Stream, StreamExt};
use std::collections::HashMap;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::error::{ToolError, ToolResult};

/// Lines buffered between the pipe readers and the consumer
const LINE_BUFFER: usize = 256;

/// One unit of subprocess output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// One line of merged stdout/stderr, newline stripped
    Line(String),
    /// Terminal event; `code` is `None` when the OS reports no exit code
    Exit { text: String, code: Option<i32> },
}

impl ProcessEvent {
    /// Build the terminal event for an exit code
    pub fn exit(code: Option<i32>) -> Self {
        let text = match code {
            Some(code) => format!("exit {code}"),
            None => "exit ?".to_string(),
        };
        ProcessEvent::Exit { text, code }
    }

    pub fn line(text: impl Into<String>) -> Self {
        ProcessEvent::Line(text.into())
    }
}

/// Ordered stream of `ProcessEvent`s: zero or more lines, then exactly one exit
pub struct ProcessStream {
    inner: Pin<Box<dyn Stream<Item = ProcessEvent> + Send>>,
}

impl ProcessStream {
    /// Wrap an arbitrary event stream
    pub fn new(stream: impl Stream<Item = ProcessEvent> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Replay a fixed list of events (scripted launches)
    pub fn from_events(events: Vec<ProcessEvent>) -> Self {
        Self::new(futures::stream::iter(events))
    }

    /// Await the next event
    pub async fn next_event(&mut self) -> Option<ProcessEvent> {
        self.inner.next().await
    }

    /// Drain the stream, forwarding lines to `on_line`, and return the exit code
    pub async fn run_to_end(mut self, mut on_line: impl FnMut(&str)) -> Option<i32> {
        let mut code = None;
        while let Some(event) = self.next_event().await {
            match event {
                ProcessEvent::Line(text) => on_line(&text),
                ProcessEvent::Exit { code: rc, .. } => code = rc,
            }
        }
        code
    }
}

impl Stream for ProcessStream {
    type Item = ProcessEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Spawn `argv` and stream its merged output.
///
/// Spawn failures (executable not found, permission denied) are returned as
/// `ToolError::Spawn` before any event is produced. When `env` is given it
/// replaces the child environment entirely.
pub fn stream_subprocess(
    argv: &[String],
    cwd: Option<&Path>,
    env: Option<&HashMap<String, String>>,
) -> ToolResult<ProcessStream> {
    let Some((program, args)) = argv.split_first() else {
        return Err(ToolError::invalid("argv must not be empty"));
    };

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    if let Some(env) = env {
        cmd.env_clear().envs(env);
    }

    let mut child = cmd.spawn().map_err(|source| {
        warn!(program = %program, error = %source, "spawn failed");
        ToolError::Spawn {
            program: program.clone(),
            source,
        }
    })?;
    debug!(program = %program, pid = ?child.id(), "spawned");

    let (tx, rx) = mpsc::channel::<String>(LINE_BUFFER);
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(pump_lines(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(pump_lines(stderr, tx.clone()));
    }
    drop(tx);

    let program = program.clone();
    let stream = async_stream::stream! {
        let mut lines = ReceiverStream::new(rx);
        while let Some(line) = lines.next().await {
            yield ProcessEvent::Line(line);
        }

        let code = match child.wait().await {
            Ok(status) => status.code(),
            Err(err) => {
                warn!(program = %program, error = %err, "wait failed");
                None
            }
        };
        debug!(program = %program, code = ?code, "exited");
        yield ProcessEvent::exit(code);
    };

    Ok(ProcessStream::new(stream))
}

/// Read `reader` line by line into `tx`, decoding lossily
async fn pump_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(decode_line(&buf)).await.is_err() {
                    break;
                }
            }
            Err(err) => {
                warn!(error = %err, "pipe read failed");
                break;
            }
        }
    }
}

/// UTF-8 decode with replacement, trailing newline removed
fn decode_line(raw: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(raw).into_owned();
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

/// Starts processes on behalf of the installer and the assistant session
pub trait Launcher: Send + Sync {
    fn launch(
        &self,
        argv: &[String],
        cwd: &Path,
        env: &HashMap<String, String>,
    ) -> ToolResult<ProcessStream>;
}

/// Launches real OS processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(
        &self,
        argv: &[String],
        cwd: &Path,
        env: &HashMap<String, String>,
    ) -> ToolResult<ProcessStream> {
        stream_subprocess(argv, Some(cwd), Some(env))
    }
}
