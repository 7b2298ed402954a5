//! Assistant session flows against replayed CLI output

use usbide::assistant::{AssistantSession, DisplayMode, SessionState};
use usbide::config::CodexConfig;
use usbide::console::LogKind;
use usbide::environment::EnvMap;
use usbide::error::ToolError;

use crate::common::{texts, ReplayLauncher, Reply, TestEnvironment};

const PACKAGE: &str = "@openai/codex";

fn session(test_env: &TestEnvironment, launcher: std::sync::Arc<ReplayLauncher>) -> AssistantSession {
    test_env.install_portable_codex(PACKAGE);
    AssistantSession::new(test_env.layout(), CodexConfig::default(), launcher, EnvMap::new())
}

fn authenticated() -> Reply {
    Reply::lines(&["Logged in using ChatGPT"], 0)
}

#[tokio::test]
async fn streamed_deltas_render_as_one_turn() {
    let test_env = TestEnvironment::new();
    let launcher = ReplayLauncher::new(vec![
        authenticated(),
        Reply::lines(
            &[
                r#"{"type":"response.output_text.delta","delta":"Hello "}"#,
                r#"{"type":"response.output_text.delta","delta":"there"}"#,
                r#"{"type":"response.completed"}"#,
            ],
            0,
        ),
    ]);
    let mut session = session(&test_env, launcher.clone());
    let (mut console, lines) = test_env.console();

    let state = session.submit("say hi", &mut console).await.unwrap();
    assert_eq!(state, SessionState::Finished);

    let shown = texts(&lines);
    assert_eq!(shown, vec!["You", "say hi", "", "Codex", "Hello there", ""]);

    let calls = launcher.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(&calls[0][calls[0].len() - 2..], ["login", "status"]);
    assert_eq!(&calls[1][calls[1].len() - 3..], ["exec", "--json", "say hi"]);
    assert!(!test_env.incident_file().exists());
}

#[tokio::test]
async fn not_authenticated_fails_before_exec() {
    let test_env = TestEnvironment::new();
    let launcher = ReplayLauncher::new(vec![Reply::lines(&["Not logged in"], 1)]);
    let mut session = session(&test_env, launcher.clone());
    let (mut console, lines) = test_env.console();

    let state = session.submit("hello", &mut console).await.unwrap();
    assert_eq!(state, SessionState::Failed);
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(launcher.calls().len(), 1);

    let shown = texts(&lines);
    assert!(shown.iter().any(|t| t.contains("not authenticated")));
    assert!(shown.iter().any(|t| t.starts_with("hint: Run the login action")));
    let incidents = test_env.incidents();
    assert!(incidents.contains("- contexte: codex_status"));
    assert!(incidents.contains("USBIDE_CODEX_DEVICE_AUTH"));
}

#[tokio::test]
async fn error_record_with_401_gets_login_hint() {
    let test_env = TestEnvironment::new();
    let launcher = ReplayLauncher::new(vec![
        authenticated(),
        Reply::lines(
            &[r#"{"type":"error","message":"unexpected status 401 Unauthorized: token expired"}"#],
            1,
        ),
    ]);
    let mut session = session(&test_env, launcher);
    let (mut console, lines) = test_env.console();

    let state = session.submit("fix the tests", &mut console).await.unwrap();
    assert_eq!(state, SessionState::Failed);

    let shown = texts(&lines);
    assert!(shown.iter().any(|t| t.contains("(HTTP 401)")));
    assert!(shown
        .iter()
        .any(|t| t.starts_with("hint: Authentication expired")));
    let incidents = test_env.incidents();
    assert!(incidents.contains("- contexte: codex_error"));
    assert!(incidents.contains("- contexte: codex_exec"));
}

#[tokio::test]
async fn non_zero_exit_still_flushes_buffered_text() {
    let test_env = TestEnvironment::new();
    let launcher = ReplayLauncher::new(vec![
        authenticated(),
        Reply::lines(&[r#"{"type":"response.output_text.delta","delta":"partial answer"}"#], 2),
    ]);
    let mut session = session(&test_env, launcher);
    let (mut console, lines) = test_env.console();

    let state = session.submit("explain", &mut console).await.unwrap();
    assert_eq!(state, SessionState::Finished);

    let shown = texts(&lines);
    assert!(shown.contains(&"partial answer".to_string()));
    let incidents = test_env.incidents();
    assert!(incidents.contains("- niveau: warning"));
    assert!(incidents.contains("rc=2"));
}

#[tokio::test]
async fn turn_failed_with_server_error() {
    let test_env = TestEnvironment::new();
    let launcher = ReplayLauncher::new(vec![
        authenticated(),
        Reply::lines(
            &[
                r#"{"type":"item.completed","item":{"type":"command_execution","command":"pytest -q","exit_code":1}}"#,
                r#"{"type":"turn.failed","error":{"message":"stream error: status 503"}}"#,
            ],
            0,
        ),
    ]);
    let mut session = session(&test_env, launcher);
    let (mut console, lines) = test_env.console();

    assert_eq!(
        session.submit("run tests", &mut console).await.unwrap(),
        SessionState::Failed
    );
    let shown = texts(&lines);
    assert!(shown.contains(&"shell: pytest -q (exit 1)".to_string()));
    assert!(shown.iter().any(|t| t.starts_with("hint: Service error")));
    assert!(test_env.incidents().contains("- contexte: codex_turn_failed"));
}

#[tokio::test]
async fn spawn_failure_is_tool_not_found() {
    let test_env = TestEnvironment::new();
    let launcher = ReplayLauncher::new(vec![Reply::NotFound]);
    let mut session = session(&test_env, launcher);
    let (mut console, _) = test_env.console();

    let state = session.submit("anything", &mut console).await.unwrap();
    assert_eq!(state, SessionState::Failed);
    assert!(test_env.incidents().contains("- contexte: codex_spawn"));
}

#[tokio::test]
async fn missing_cli_without_auto_install_fails() {
    let test_env = TestEnvironment::new();
    let launcher = ReplayLauncher::new(vec![]);
    let config = CodexConfig {
        auto_install: false,
        ..CodexConfig::default()
    };
    let mut session = AssistantSession::new(test_env.layout(), config, launcher.clone(), EnvMap::new());
    let (mut console, _) = test_env.console();

    let state = session.submit("hello", &mut console).await.unwrap();
    assert_eq!(state, SessionState::Failed);
    assert!(launcher.calls().is_empty());
    assert!(test_env.incidents().contains("- contexte: codex_spawn"));
}

#[tokio::test]
async fn empty_prompt_is_rejected() {
    let test_env = TestEnvironment::new();
    let launcher = ReplayLauncher::new(vec![]);
    let mut session = session(&test_env, launcher.clone());
    let (mut console, _) = test_env.console();

    let err = session.submit("   ", &mut console).await.unwrap_err();
    assert!(matches!(err, ToolError::InvalidArgument(_)));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(launcher.calls().is_empty());
}

#[tokio::test]
async fn raw_mode_shows_typed_events_and_exit() {
    let test_env = TestEnvironment::new();
    let launcher = ReplayLauncher::new(vec![
        authenticated(),
        Reply::lines(&[r#"{"type":"thread.started","thread_id":"t1"}"#, "plain text"], 0),
    ]);
    let mut session = session(&test_env, launcher);
    assert_eq!(session.toggle_display_mode(), DisplayMode::Raw);
    let (mut console, lines) = test_env.console();

    session.submit("go", &mut console).await.unwrap();

    let captured = lines.lock().unwrap().clone();
    let commands: Vec<_> = captured.iter().filter(|l| l.kind == LogKind::Command).collect();
    assert_eq!(commands.len(), 2);
    let shown: Vec<String> = captured.iter().map(|l| l.text.clone()).collect();
    assert!(shown.contains(&r#"[thread.started] {"type":"thread.started","thread_id":"t1"}"#.to_string()));
    assert!(shown.contains(&"plain text".to_string()));
    assert!(shown.contains(&"exit 0".to_string()));
    assert!(!shown.contains(&"You".to_string()));
}

#[tokio::test]
async fn repeated_prompt_is_shown_again_after_toggle() {
    let test_env = TestEnvironment::new();
    let launcher = ReplayLauncher::new(vec![
        authenticated(),
        Reply::lines(&[], 0),
        authenticated(),
        Reply::lines(&[], 0),
        authenticated(),
        Reply::lines(&[], 0),
    ]);
    let mut session = session(&test_env, launcher);
    let (mut console, lines) = test_env.console();

    session.submit("same", &mut console).await.unwrap();
    session.submit("same", &mut console).await.unwrap();
    let count = |lines: &Vec<String>| lines.iter().filter(|t| t.as_str() == "same").count();
    assert_eq!(count(&texts(&lines)), 1);

    session.toggle_display_mode();
    session.toggle_display_mode();
    session.submit("same", &mut console).await.unwrap();
    assert_eq!(count(&texts(&lines)), 2);
}
