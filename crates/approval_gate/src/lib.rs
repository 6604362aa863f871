//! Approval state machine mediating file mutations proposed by agent
//! commands.
//!
//! This crate defines only the gate and its host-mediated collaborator
//! contracts. It excludes transport concerns, command extraction, and any
//! concrete file store or dialog implementation.
//!
//! The gate holds two invariants callers depend on:
//! - a denied proposal performs zero writes and zero run-directive
//!   dispatches, and records the blocking event exactly once;
//! - at most one proposal is pending per session; a second proposal while
//!   one is outstanding is rejected, never queued or silently replaced.

use agent_command::AgentCommand;
use thiserror::Error;

/// Exact log message emitted when a user denies a proposal. Downstream
/// verification matches on this literal text.
pub const BLOCKED_BY_USER_MESSAGE: &str = "Operation blocked by user";

/// Mutation policy the gate enforces.
///
/// The calling surface decides which mode is active; the gate only enforces
/// whichever policy it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalPolicy {
    /// Every proposed command passes through interactive approval,
    /// regardless of which paths it touches.
    Strict,
    /// Writes confined to already-tracked paths apply without prompting;
    /// any unknown/new path makes the whole command prompt.
    Permissive,
}

/// Outcome of one interactive approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approved,
    Denied,
}

/// File mutation surface, used only after approval.
pub trait FileStore {
    fn exists(&self, path: &str) -> bool;
    fn write(&mut self, path: &str, content: &str) -> Result<(), String>;
}

/// Run-directive executor, invoked only after approval with a non-empty
/// directive.
pub trait CommandRunner {
    fn run(&mut self, directive: &str) -> Result<String, String>;
}

/// Interactive approval surface. Any implementation satisfies the contract:
/// native dialog, custom modal, or headless auto-decide in tests.
pub trait ApprovalPrompt {
    fn request_approval(&mut self, command: &AgentCommand) -> ApprovalDecision;
}

/// Structured gate event sink for diagnostics and verification harnesses.
pub trait GateObserver {
    fn record(&mut self, event: GateEvent);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    /// Denial record; `message` is always [`BLOCKED_BY_USER_MESSAGE`].
    Blocked { command: String, message: String },
    FileWritten { path: String },
    FileWriteFailed { path: String, error: String },
    CommandRan { directive: String },
    CommandFailed { directive: String, error: String },
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("a proposal is already awaiting approval")]
    ApprovalInProgress,
}

/// One command awaiting a user decision. Constructed only by
/// [`ApprovalGate::propose`] and consumed by [`ApprovalGate::resolve`].
#[derive(Debug)]
pub struct PendingApproval {
    command: AgentCommand,
}

impl PendingApproval {
    pub fn command(&self) -> &AgentCommand {
        &self.command
    }
}

/// Result of proposing a command to the gate.
#[derive(Debug)]
pub enum Proposal {
    /// Policy allowed the command without a prompt; mutations are applied.
    AutoApproved(ApplyReport),
    /// The command needs an interactive decision before anything mutates.
    Pending(PendingApproval),
}

/// Terminal outcome of a resolved proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Applied(ApplyReport),
    Denied,
}

/// What an approved command actually did.
///
/// Writes are applied sequentially in the command's file order; a failed
/// write is reported and does not roll back files already written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub written: Vec<String>,
    pub failed: Vec<WriteFailure>,
    pub run: Option<RunReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub directive: String,
    pub ok: bool,
    pub output: String,
}

/// Mutable collaborator set handed to the gate per call; the gate never owns
/// ambient state.
pub struct GateDeps<'a> {
    pub files: &'a mut dyn FileStore,
    pub runner: &'a mut dyn CommandRunner,
    pub observer: &'a mut dyn GateObserver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Idle,
    Pending,
}

/// Approval state machine: `Idle → Pending → {Approved, Denied} → Idle`.
#[derive(Debug)]
pub struct ApprovalGate {
    policy: ApprovalPolicy,
    state: GateState,
}

impl ApprovalGate {
    #[must_use]
    pub fn new(policy: ApprovalPolicy) -> Self {
        Self {
            policy,
            state: GateState::Idle,
        }
    }

    pub fn policy(&self) -> ApprovalPolicy {
        self.policy
    }

    pub fn is_pending(&self) -> bool {
        self.state == GateState::Pending
    }

    /// Propose a command for execution under the configured policy.
    ///
    /// Returns [`Proposal::Pending`] when an interactive decision is
    /// required; the caller obtains the decision and hands it back through
    /// [`ApprovalGate::resolve`]. A proposal made while another is pending
    /// fails with [`GateError::ApprovalInProgress`].
    pub fn propose(
        &mut self,
        command: &AgentCommand,
        deps: &mut GateDeps<'_>,
    ) -> Result<Proposal, GateError> {
        if self.state == GateState::Pending {
            return Err(GateError::ApprovalInProgress);
        }

        if self.needs_prompt(command, deps.files) {
            self.state = GateState::Pending;
            return Ok(Proposal::Pending(PendingApproval {
                command: command.clone(),
            }));
        }

        Ok(Proposal::AutoApproved(self.apply(command, deps)))
    }

    /// Resolve a pending proposal with the user's decision.
    pub fn resolve(
        &mut self,
        pending: PendingApproval,
        decision: ApprovalDecision,
        deps: &mut GateDeps<'_>,
    ) -> GateOutcome {
        self.state = GateState::Idle;

        match decision {
            ApprovalDecision::Approved => GateOutcome::Applied(self.apply(&pending.command, deps)),
            ApprovalDecision::Denied => {
                let command = pending.command.describe();
                tracing::warn!(command = %command, "{BLOCKED_BY_USER_MESSAGE}");
                deps.observer.record(GateEvent::Blocked {
                    command,
                    message: BLOCKED_BY_USER_MESSAGE.to_string(),
                });
                GateOutcome::Denied
            }
        }
    }

    fn needs_prompt(&self, command: &AgentCommand, files: &dyn FileStore) -> bool {
        match self.policy {
            ApprovalPolicy::Strict => true,
            ApprovalPolicy::Permissive => command.files.paths().any(|path| !files.exists(path)),
        }
    }

    fn apply(&self, command: &AgentCommand, deps: &mut GateDeps<'_>) -> ApplyReport {
        let mut report = ApplyReport::default();

        for (path, content) in command.files.iter() {
            match deps.files.write(path, content) {
                Ok(()) => {
                    tracing::info!(path, "agent command wrote file");
                    deps.observer.record(GateEvent::FileWritten {
                        path: path.to_string(),
                    });
                    report.written.push(path.to_string());
                }
                Err(error) => {
                    tracing::warn!(path, %error, "agent command write failed");
                    deps.observer.record(GateEvent::FileWriteFailed {
                        path: path.to_string(),
                        error: error.clone(),
                    });
                    report.failed.push(WriteFailure {
                        path: path.to_string(),
                        error,
                    });
                }
            }
        }

        if let Some(directive) = command.command.as_deref() {
            if !directive.trim().is_empty() {
                report.run = Some(self.dispatch(directive, deps));
            }
        }

        report
    }

    fn dispatch(&self, directive: &str, deps: &mut GateDeps<'_>) -> RunReport {
        match deps.runner.run(directive) {
            Ok(output) => {
                tracing::info!(directive, "agent command directive ran");
                deps.observer.record(GateEvent::CommandRan {
                    directive: directive.to_string(),
                });
                RunReport {
                    directive: directive.to_string(),
                    ok: true,
                    output,
                }
            }
            Err(error) => {
                tracing::warn!(directive, %error, "agent command directive failed");
                deps.observer.record(GateEvent::CommandFailed {
                    directive: directive.to_string(),
                    error: error.clone(),
                });
                RunReport {
                    directive: directive.to_string(),
                    ok: false,
                    output: error,
                }
            }
        }
    }
}
