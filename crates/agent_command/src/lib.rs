//! Typed extraction of fenced agent-command blocks from assistant text.
//!
//! An assistant message may embed at most one structured proposal inside a
//! ` ```json_agent ` fenced block: an optional free-text `thought`, an
//! ordered mapping of relative file paths to full replacement contents, and
//! an optional run directive. Everything outside the block is plain chat
//! text and is none of this crate's business.

mod command;
mod extract;

pub use command::{AgentCommand, FileSet};
pub use extract::{contains_agent_block, extract_agent_command, CommandParseError};
