use std::sync::atomic::Ordering;
use std::time::Duration;

use agent_command::extract_agent_command;
use approval_gate::{
    ApplyReport, ApprovalGate, ApprovalPolicy, ApprovalPrompt, CommandRunner, FileStore, GateDeps,
    GateObserver, GateOutcome, Proposal,
};
use completions_api::{ChatRequest, CompletionsApiError};
use thiserror::Error;
use uuid::Uuid;

use crate::session::{SessionSummary, StreamSession};
use crate::transport::{CancelSignal, ResponseTransport, TransportReply};

/// Lifecycle event emitted while a session runs. `Delta` fires once per
/// assembled fragment, in sequence order, for live UI rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started { session_id: Uuid },
    Delta { session_id: Uuid, text: String },
    Completed { session_id: Uuid },
    Failed { session_id: Uuid, error: String },
    Aborted { session_id: Uuid },
}

/// Terminal failure of a session.
///
/// Recovered conditions (malformed frames, unparseable command blocks) never
/// reach this type; they ride along as diagnostics on a successful outcome.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Non-success status or transport failure; `message` carries the
    /// upstream error text verbatim.
    #[error("{message}")]
    Upstream { message: String },

    #[error("response stream contained no decodable content")]
    EmptyResponse,

    /// Stream stalled. Partial text is retained for diagnostic display but
    /// never reported as a successful completion.
    #[error("connection timed out after {limit:?}")]
    Timeout {
        limit: Duration,
        partial_text: String,
    },

    #[error("generation stopped by user")]
    Aborted,
}

/// What happened to the command block embedded in the final text, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandDisposition {
    /// Plain chat message; no command block present.
    None,
    /// Command approved (interactively or by policy) and applied.
    Applied(ApplyReport),
    /// Command denied; nothing was written or executed.
    Denied,
    /// A block was present but did not parse; the text is still returned.
    ParseFailed { error: String },
    /// The gate refused the proposal outright.
    Rejected { error: String },
}

/// Successful result of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub summary: SessionSummary,
    pub text: String,
    pub command: CommandDisposition,
    /// Malformed frames recovered during assembly, for diagnostics.
    pub skipped_frames: usize,
}

/// Collaborators a session borrows for one run. Global application state
/// (tracked files, dialogs, logs) enters only through these seams.
pub struct SessionDeps<'a> {
    pub transport: &'a mut dyn ResponseTransport,
    pub files: &'a mut dyn FileStore,
    pub runner: &'a mut dyn CommandRunner,
    pub prompt: &'a mut dyn ApprovalPrompt,
    pub observer: &'a mut dyn GateObserver,
}

/// Sequences decode, assembly, extraction, and approval for one outbound
/// request at a time. Sessions are independent and share no mutable state.
#[derive(Debug, Clone)]
pub struct SessionController {
    policy: ApprovalPolicy,
}

impl SessionController {
    #[must_use]
    pub fn new(policy: ApprovalPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ApprovalPolicy {
        self.policy
    }

    /// Run one session to its terminal state.
    ///
    /// The cancel signal is honored cooperatively between chunks; an abort
    /// discards accumulated text and reports [`SessionError::Aborted`]
    /// without panicking out of in-flight callbacks.
    pub fn run(
        &self,
        request: &ChatRequest,
        deps: &mut SessionDeps<'_>,
        cancel: &CancelSignal,
        emit: &mut dyn FnMut(SessionEvent),
    ) -> Result<SessionOutcome, SessionError> {
        let mut session = StreamSession::new();
        let session_id = session.id();
        emit(SessionEvent::Started { session_id });
        tracing::debug!(%session_id, "session started");

        if let Err(error) = self.assemble(request, &mut session, deps, cancel, emit) {
            return Err(fail_session(&mut session, error, emit));
        }

        let text = match session.final_text() {
            Ok(text) => text,
            Err(error) => {
                let error = map_transport_error(error, &session);
                return Err(fail_session(&mut session, error, emit));
            }
        };

        let command = self.process_command(&text, deps);
        session.mark_completed();
        emit(SessionEvent::Completed { session_id });
        tracing::info!(
            %session_id,
            chars = text.len(),
            skipped = session.skipped_frames(),
            "session completed"
        );

        Ok(SessionOutcome {
            summary: session.summary(),
            text,
            command,
            skipped_frames: session.skipped_frames(),
        })
    }

    fn assemble(
        &self,
        request: &ChatRequest,
        session: &mut StreamSession,
        deps: &mut SessionDeps<'_>,
        cancel: &CancelSignal,
        emit: &mut dyn FnMut(SessionEvent),
    ) -> Result<(), SessionError> {
        if cancel.load(Ordering::Acquire) {
            return Err(SessionError::Aborted);
        }

        let reply = deps
            .transport
            .fetch(request, cancel)
            .map_err(|error| map_transport_error(error, session))?;

        let session_id = session.id();
        let mut on_delta = |fragment: &str| {
            emit(SessionEvent::Delta {
                session_id,
                text: fragment.to_string(),
            });
        };

        match reply {
            TransportReply::Buffered(body) => {
                if let Err(error) = session.feed(body.as_bytes(), &mut on_delta) {
                    return Err(map_transport_error(error, session));
                }
                if let Err(error) = session.finish_input(&mut on_delta) {
                    return Err(map_transport_error(error, session));
                }
            }
            TransportReply::Chunks(chunks) => {
                for chunk in chunks {
                    if cancel.load(Ordering::Acquire) {
                        return Err(SessionError::Aborted);
                    }

                    let chunk = match chunk {
                        Ok(chunk) => chunk,
                        Err(error) => return Err(map_transport_error(error, session)),
                    };
                    if let Err(error) = session.feed(&chunk, &mut on_delta) {
                        return Err(map_transport_error(error, session));
                    }

                    if session.is_input_complete() {
                        break;
                    }
                }

                if cancel.load(Ordering::Acquire) {
                    return Err(SessionError::Aborted);
                }
                if let Err(error) = session.finish_input(&mut on_delta) {
                    return Err(map_transport_error(error, session));
                }
            }
        }

        Ok(())
    }

    fn process_command(&self, text: &str, deps: &mut SessionDeps<'_>) -> CommandDisposition {
        let command = match extract_agent_command(text) {
            Ok(None) => return CommandDisposition::None,
            Ok(Some(command)) => command,
            Err(error) => {
                tracing::warn!(%error, "agent command block did not parse; returning text only");
                return CommandDisposition::ParseFailed {
                    error: error.to_string(),
                };
            }
        };

        let mut gate = ApprovalGate::new(self.policy);
        let mut gate_deps = GateDeps {
            files: &mut *deps.files,
            runner: &mut *deps.runner,
            observer: &mut *deps.observer,
        };

        match gate.propose(&command, &mut gate_deps) {
            Err(error) => CommandDisposition::Rejected {
                error: error.to_string(),
            },
            Ok(Proposal::AutoApproved(report)) => CommandDisposition::Applied(report),
            Ok(Proposal::Pending(pending)) => {
                let decision = deps.prompt.request_approval(pending.command());
                match gate.resolve(pending, decision, &mut gate_deps) {
                    GateOutcome::Applied(report) => CommandDisposition::Applied(report),
                    GateOutcome::Denied => CommandDisposition::Denied,
                }
            }
        }
    }
}

fn fail_session(
    session: &mut StreamSession,
    error: SessionError,
    emit: &mut dyn FnMut(SessionEvent),
) -> SessionError {
    let session_id = session.id();
    match &error {
        SessionError::Aborted => {
            session.mark_aborted();
            emit(SessionEvent::Aborted { session_id });
            tracing::info!(%session_id, "session aborted");
        }
        other => {
            session.mark_failed();
            emit(SessionEvent::Failed {
                session_id,
                error: other.to_string(),
            });
            tracing::warn!(%session_id, error = %other, "session failed");
        }
    }
    error
}

fn map_transport_error(error: CompletionsApiError, session: &StreamSession) -> SessionError {
    match error {
        CompletionsApiError::Timeout(limit) => SessionError::Timeout {
            limit,
            partial_text: session.text().to_string(),
        },
        CompletionsApiError::Cancelled => SessionError::Aborted,
        CompletionsApiError::EmptyResponse => SessionError::EmptyResponse,
        CompletionsApiError::Upstream { status, message } => SessionError::Upstream {
            message: format!("Server error {status}: {message}"),
        },
        other => SessionError::Upstream {
            message: other.to_string(),
        },
    }
}
