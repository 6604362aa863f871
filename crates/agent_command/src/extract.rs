use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::command::AgentCommand;

#[derive(Debug, Error)]
pub enum CommandParseError {
    #[error("agent command block is not a valid command object: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

fn agent_block_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?s)```json_agent\s*(.*?)\s*```").expect("agent block regex must compile")
    })
}

/// True when the text carries at least one `json_agent` fenced block.
#[must_use]
pub fn contains_agent_block(text: &str) -> bool {
    agent_block_regex().is_match(text)
}

/// Extract the structured command from assembled assistant text.
///
/// Only the first fenced block is honored; multi-command messages are out of
/// scope by policy. Returns `Ok(None)` for plain chat text and
/// [`CommandParseError`] when a block is present but does not parse as a
/// command object, a non-fatal condition for callers, who still display the
/// surrounding text.
pub fn extract_agent_command(text: &str) -> Result<Option<AgentCommand>, CommandParseError> {
    let Some(captures) = agent_block_regex().captures(text) else {
        return Ok(None);
    };

    let body = captures
        .get(1)
        .map(|capture| capture.as_str())
        .unwrap_or_default();
    let command: AgentCommand = serde_json::from_str(body)?;
    Ok(Some(command))
}
