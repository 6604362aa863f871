//! Interactive-approval collaborators.
//!
//! Any implementation satisfies the gate's contract; this module ships the
//! headless one used by harnesses and non-interactive surfaces.

use agent_command::AgentCommand;
use approval_gate::{ApprovalDecision, ApprovalPrompt};

/// Prompt that returns a fixed decision without user interaction.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompt {
    decision: ApprovalDecision,
}

impl FixedPrompt {
    #[must_use]
    pub fn approve() -> Self {
        Self {
            decision: ApprovalDecision::Approved,
        }
    }

    #[must_use]
    pub fn deny() -> Self {
        Self {
            decision: ApprovalDecision::Denied,
        }
    }
}

impl ApprovalPrompt for FixedPrompt {
    fn request_approval(&mut self, _command: &AgentCommand) -> ApprovalDecision {
        self.decision
    }
}
