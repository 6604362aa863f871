use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use ai_workspace::controller::{SessionController, SessionDeps, SessionError, SessionEvent, SessionOutcome};
use ai_workspace::transport::{CancelSignal, ResponseTransport};
use approval_gate::{ApprovalDecision, ApprovalPrompt, CommandRunner, FileStore, GateEvent, GateObserver};
use completions_api::{ChatMessage, ChatRequest};

pub fn request() -> ChatRequest {
    ChatRequest::new("LongCat-Flash-Lite", vec![ChatMessage::user("Test SSE Cleanup")])
}

pub fn cancel_signal() -> CancelSignal {
    Arc::new(AtomicBool::new(false))
}

/// Gate observer capturing every event for assertions.
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Vec<GateEvent>,
}

impl GateObserver for RecordingObserver {
    fn record(&mut self, event: GateEvent) {
        self.events.push(event);
    }
}

impl RecordingObserver {
    pub fn blocked_records(&self) -> Vec<&GateEvent> {
        self.events
            .iter()
            .filter(|event| matches!(event, GateEvent::Blocked { .. }))
            .collect()
    }
}

/// Runner that records directives without executing anything.
#[derive(Default)]
pub struct RecordingRunner {
    pub directives: Vec<String>,
}

impl CommandRunner for RecordingRunner {
    fn run(&mut self, directive: &str) -> Result<String, String> {
        self.directives.push(directive.to_string());
        Ok("exit_code=0".to_string())
    }
}

/// Prompt that records how often it was consulted before answering.
pub struct CountingPrompt {
    pub decision: ApprovalDecision,
    pub calls: usize,
}

impl CountingPrompt {
    pub fn approving() -> Self {
        Self {
            decision: ApprovalDecision::Approved,
            calls: 0,
        }
    }

    pub fn denying() -> Self {
        Self {
            decision: ApprovalDecision::Denied,
            calls: 0,
        }
    }
}

impl ApprovalPrompt for CountingPrompt {
    fn request_approval(&mut self, _command: &agent_command::AgentCommand) -> ApprovalDecision {
        self.calls += 1;
        self.decision
    }
}

/// Drive one session and collect its lifecycle events.
pub fn run_session(
    controller: &SessionController,
    transport: &mut dyn ResponseTransport,
    files: &mut dyn FileStore,
    runner: &mut dyn CommandRunner,
    prompt: &mut dyn ApprovalPrompt,
    observer: &mut dyn GateObserver,
    cancel: &CancelSignal,
) -> (Result<SessionOutcome, SessionError>, Vec<SessionEvent>) {
    let mut events = Vec::new();
    let mut deps = SessionDeps {
        transport,
        files,
        runner,
        prompt,
        observer,
    };

    let outcome = controller.run(&request(), &mut deps, cancel, &mut |event| {
        events.push(event)
    });
    (outcome, events)
}
