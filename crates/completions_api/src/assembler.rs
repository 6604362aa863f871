use serde::Deserialize;

use crate::error::CompletionsApiError;
use crate::sse::{DecodedFrame, Frame};

/// Consecutive unparseable frames tolerated before an assembly with no
/// extracted content fails early.
pub const DEFAULT_SKIP_CEILING: usize = 32;

/// Accepted wire shapes, per frame: incremental (`choices[0].delta.content`)
/// or complete (`choices[0].message.content`).
#[derive(Debug, Deserialize)]
struct ChatPayload {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    delta: Option<ChatContent>,
    message: Option<ChatContent>,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    content: Option<String>,
}

/// Result of pushing one decoded frame into the assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// A content fragment was appended to the assembled text.
    Appended(String),
    /// The frame did not match either accepted shape; counted and dropped.
    Skipped,
    /// The end-of-stream marker arrived; assembly is complete.
    Completed,
    /// Frame arrived after completion, or replayed an already-applied
    /// sequence index; dropped to preserve exactly-once application.
    Ignored,
}

/// Orders and concatenates content fragments from decoded frames.
///
/// The assembled text is append-only: fragments are applied strictly in
/// frame-sequence order and nothing ever rewrites or truncates earlier
/// content.
#[derive(Debug)]
pub struct DeltaAssembler {
    accumulated: String,
    extracted: usize,
    skipped: usize,
    skip_ceiling: usize,
    completed: bool,
    last_seq: Option<u64>,
}

impl Default for DeltaAssembler {
    fn default() -> Self {
        Self::with_skip_ceiling(DEFAULT_SKIP_CEILING)
    }
}

impl DeltaAssembler {
    #[must_use]
    pub fn with_skip_ceiling(skip_ceiling: usize) -> Self {
        Self {
            accumulated: String::new(),
            extracted: 0,
            skipped: 0,
            skip_ceiling: skip_ceiling.max(1),
            completed: false,
            last_seq: None,
        }
    }

    /// Apply one decoded frame.
    ///
    /// Malformed frames are recovered locally: counted, dropped, and never
    /// fatal on their own. The error path fires only when every frame so far
    /// was unparseable and the skip ceiling is reached; an all-noise stream
    /// must fail as [`CompletionsApiError::EmptyResponse`], not complete as
    /// an empty success.
    pub fn push(&mut self, frame: &DecodedFrame) -> Result<PushOutcome, CompletionsApiError> {
        if self.completed {
            return Ok(PushOutcome::Ignored);
        }

        let frame = match frame {
            DecodedFrame::EndOfStream => {
                self.completed = true;
                return Ok(PushOutcome::Completed);
            }
            DecodedFrame::Payload(frame) => frame,
        };

        if self.last_seq.is_some_and(|last| frame.seq <= last) {
            return Ok(PushOutcome::Ignored);
        }
        self.last_seq = Some(frame.seq);

        match extract_content(frame) {
            Some(fragment) => {
                self.extracted += 1;
                self.accumulated.push_str(&fragment);
                Ok(PushOutcome::Appended(fragment))
            }
            None => {
                self.skipped += 1;
                if self.extracted == 0 && self.skipped >= self.skip_ceiling {
                    return Err(CompletionsApiError::EmptyResponse);
                }
                Ok(PushOutcome::Skipped)
            }
        }
    }

    /// Finalize the assembly and take the accumulated text.
    ///
    /// Fails with [`CompletionsApiError::EmptyResponse`] when no frame ever
    /// yielded content.
    pub fn into_text(self) -> Result<String, CompletionsApiError> {
        if self.extracted == 0 {
            return Err(CompletionsApiError::EmptyResponse);
        }

        Ok(self.accumulated)
    }

    pub fn text(&self) -> &str {
        &self.accumulated
    }

    pub fn extracted(&self) -> usize {
        self.extracted
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

fn extract_content(frame: &Frame) -> Option<String> {
    let payload: ChatPayload = serde_json::from_str(&frame.payload).ok()?;
    let choice = payload.choices.into_iter().next()?;

    choice
        .delta
        .and_then(|delta| delta.content)
        .or_else(|| choice.message.and_then(|message| message.content))
}
