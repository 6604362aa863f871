mod support;

use ai_workspace::controller::{CommandDisposition, SessionController};
use ai_workspace::filestore::WorkspaceFileStore;
use ai_workspace::prompt::FixedPrompt;
use ai_workspace::providers::mock::ScriptedTransport;
use approval_gate::{ApprovalPolicy, GateEvent, BLOCKED_BY_USER_MESSAGE};

use support::{cancel_signal, run_session, CountingPrompt, RecordingObserver, RecordingRunner};

fn risky_response_body() -> String {
    let message = concat!(
        "I will create a new file.\n",
        "```json_agent\n",
        "{\n",
        "    \"thought\": \"Malicious write\",\n",
        "    \"files\": {\n",
        "        \"evil.py\": \"print('hacked')\"\n",
        "    },\n",
        "    \"command\": \"run\"\n",
        "}\n",
        "```\n",
    );
    format!(
        "{{\"choices\":[{{\"message\":{{\"content\":{}}}}}]}}",
        serde_json::to_string(message).expect("message should encode")
    )
}

#[test]
fn denied_command_leaves_no_file_and_logs_the_block_once() {
    let workspace = tempfile::tempdir().expect("tempdir should create");
    let mut transport = ScriptedTransport::buffered(risky_response_body());
    let mut files = WorkspaceFileStore::new(workspace.path()).expect("store should build");
    let mut runner = RecordingRunner::default();
    let mut prompt = FixedPrompt::deny();
    let mut observer = RecordingObserver::default();

    let (outcome, _) = run_session(
        &SessionController::new(ApprovalPolicy::Strict),
        &mut transport,
        &mut files,
        &mut runner,
        &mut prompt,
        &mut observer,
        &cancel_signal(),
    );

    let outcome = outcome.expect("denial still completes the session");
    assert_eq!(outcome.command, CommandDisposition::Denied);
    // The text is still returned and displayed; only the command is blocked.
    assert!(outcome.text.contains("I will create a new file."));

    assert!(!workspace.path().join("evil.py").exists());
    assert!(runner.directives.is_empty());

    let blocked = observer.blocked_records();
    assert_eq!(blocked.len(), 1);
    let GateEvent::Blocked { message, command } = blocked[0] else {
        panic!("expected a blocked record");
    };
    assert_eq!(message, BLOCKED_BY_USER_MESSAGE);
    assert!(command.contains("file(s)"));
}

#[test]
fn approved_command_writes_files_and_dispatches_the_directive() {
    let workspace = tempfile::tempdir().expect("tempdir should create");
    let mut transport = ScriptedTransport::buffered(risky_response_body());
    let mut files = WorkspaceFileStore::new(workspace.path()).expect("store should build");
    let mut runner = RecordingRunner::default();
    let mut prompt = FixedPrompt::approve();
    let mut observer = RecordingObserver::default();

    let (outcome, _) = run_session(
        &SessionController::new(ApprovalPolicy::Strict),
        &mut transport,
        &mut files,
        &mut runner,
        &mut prompt,
        &mut observer,
        &cancel_signal(),
    );

    let outcome = outcome.expect("session should complete");
    let CommandDisposition::Applied(report) = outcome.command else {
        panic!("approved command should apply");
    };
    assert_eq!(report.written, vec!["evil.py".to_string()]);
    assert!(report.failed.is_empty());
    assert_eq!(
        std::fs::read_to_string(workspace.path().join("evil.py")).expect("file should exist"),
        "print('hacked')"
    );
    assert_eq!(runner.directives, vec!["run".to_string()]);
    assert!(observer.blocked_records().is_empty());
}

#[test]
fn strict_mode_always_consults_the_prompt() {
    let workspace = tempfile::tempdir().expect("tempdir should create");
    std::fs::write(workspace.path().join("evil.py"), "tracked already").expect("seed file");
    let mut transport = ScriptedTransport::buffered(risky_response_body());
    let mut files = WorkspaceFileStore::new(workspace.path()).expect("store should build");
    let mut runner = RecordingRunner::default();
    let mut prompt = CountingPrompt::approving();
    let mut observer = RecordingObserver::default();

    let (outcome, _) = run_session(
        &SessionController::new(ApprovalPolicy::Strict),
        &mut transport,
        &mut files,
        &mut runner,
        &mut prompt,
        &mut observer,
        &cancel_signal(),
    );

    outcome.expect("session should complete");
    // Even a write to an already-tracked path prompts under strict policy.
    assert_eq!(prompt.calls, 1);
}

#[test]
fn unparseable_block_returns_text_with_a_parse_diagnostic() {
    let message = "Try this.\n```json_agent\n{not valid json\n```\n";
    let mut transport = ScriptedTransport::buffered(format!(
        "{{\"choices\":[{{\"message\":{{\"content\":{}}}}}]}}",
        serde_json::to_string(message).expect("message should encode")
    ));
    let workspace = tempfile::tempdir().expect("tempdir should create");
    let mut files = WorkspaceFileStore::new(workspace.path()).expect("store should build");
    let mut runner = RecordingRunner::default();
    let mut prompt = CountingPrompt::approving();
    let mut observer = RecordingObserver::default();

    let (outcome, _) = run_session(
        &SessionController::new(ApprovalPolicy::Strict),
        &mut transport,
        &mut files,
        &mut runner,
        &mut prompt,
        &mut observer,
        &cancel_signal(),
    );

    let outcome = outcome.expect("session should still complete");
    assert!(matches!(
        outcome.command,
        CommandDisposition::ParseFailed { .. }
    ));
    assert!(outcome.text.contains("Try this."));
    assert_eq!(prompt.calls, 0);
    assert!(runner.directives.is_empty());
}

#[test]
fn extraction_over_streamed_command_block_matches_buffered_delivery() {
    // The same command block split across SSE frames must produce the same
    // disposition as the buffered form.
    let message = concat!(
        "Fixing it now.\n",
        "```json_agent\n",
        "{\"files\": {\"evil.py\": \"print('hacked')\"}}\n",
        "```\n",
    );
    let halves = message.split_at(message.len() / 2);
    let chunks = vec![
        format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":{}}}}}]}}\n\n",
            serde_json::to_string(halves.0).expect("fragment should encode")
        ),
        format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":{}}}}}]}}\n\n",
            serde_json::to_string(halves.1).expect("fragment should encode")
        ),
        "data: [DONE]\n\n".to_string(),
    ];

    let workspace = tempfile::tempdir().expect("tempdir should create");
    let mut transport = ScriptedTransport::chunked(chunks);
    let mut files = WorkspaceFileStore::new(workspace.path()).expect("store should build");
    let mut runner = RecordingRunner::default();
    let mut prompt = FixedPrompt::deny();
    let mut observer = RecordingObserver::default();

    let (outcome, _) = run_session(
        &SessionController::new(ApprovalPolicy::Strict),
        &mut transport,
        &mut files,
        &mut runner,
        &mut prompt,
        &mut observer,
        &cancel_signal(),
    );

    let outcome = outcome.expect("session should complete");
    assert_eq!(outcome.command, CommandDisposition::Denied);
    assert!(!workspace.path().join("evil.py").exists());
}
