//! Real subprocesses through `sh`

#![cfg(unix)]

use std::collections::HashMap;
use std::sync::Arc;

use usbide::environment::process_env;
use usbide::process::{Launcher, ProcessEvent, SystemLauncher};
use usbide::workbench::Workbench;

use crate::common::{texts, TestEnvironment};

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

fn base_env() -> HashMap<String, String> {
    let mut env = HashMap::new();
    if let Ok(path) = std::env::var("PATH") {
        env.insert("PATH".to_string(), path);
    }
    env
}

#[tokio::test]
async fn stdout_lines_keep_their_order() {
    let test_env = TestEnvironment::new();
    let stream = SystemLauncher
        .launch(&sh("for i in 1 2 3 4 5; do echo line$i; done"), &test_env.root, &base_env())
        .unwrap();

    let mut seen = Vec::new();
    let code = stream.run_to_end(|line| seen.push(line.to_string())).await;
    assert_eq!(seen, vec!["line1", "line2", "line3", "line4", "line5"]);
    assert_eq!(code, Some(0));
}

#[tokio::test]
async fn child_sees_only_the_given_environment() {
    let test_env = TestEnvironment::new();
    let mut env = base_env();
    env.insert("USBIDE_PROBE".to_string(), "visible".to_string());

    let mut stream = SystemLauncher
        .launch(&sh("echo \"$USBIDE_PROBE\"; echo \"${HOME:-unset}\"; pwd"), &test_env.root, &env)
        .unwrap();
    let mut lines = Vec::new();
    while let Some(event) = stream.next_event().await {
        if let ProcessEvent::Line(text) = event {
            lines.push(text);
        }
    }
    assert_eq!(lines[0], "visible");
    assert_eq!(lines[1], "unset");
    assert_eq!(
        std::fs::canonicalize(&lines[2]).unwrap(),
        std::fs::canonicalize(&test_env.root).unwrap()
    );
}

#[tokio::test]
async fn workbench_shell_failure_lands_in_bug_md() {
    let test_env = TestEnvironment::new();
    let mut workbench = Workbench::new(
        test_env.layout(),
        Arc::new(SystemLauncher),
        process_env(),
        vec![],
    );
    let (mut console, lines) = test_env.console();

    let ok = workbench
        .run_shell("echo before; exit 2", &mut console)
        .await
        .unwrap();
    assert!(!ok);

    let shown = texts(&lines);
    assert!(shown.contains(&"before".to_string()));
    assert!(shown.contains(&"exit 2".to_string()));
    let incidents = test_env.incidents();
    assert!(incidents.contains("- niveau: error"));
    assert!(incidents.contains("- contexte: shell"));
    assert!(incidents.contains("rc=2"));
}

#[tokio::test]
async fn workbench_shell_success_records_nothing() {
    let test_env = TestEnvironment::new();
    let mut workbench = Workbench::new(
        test_env.layout(),
        Arc::new(SystemLauncher),
        process_env(),
        vec![],
    );
    let (mut console, lines) = test_env.console();

    assert!(workbench.run_shell("echo ok", &mut console).await.unwrap());
    assert!(texts(&lines).contains(&"ok".to_string()));
    assert!(!test_env.incident_file().exists());
}
