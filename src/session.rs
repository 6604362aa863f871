use completions_api::{CompletionsApiError, DeltaAssembler, PushOutcome, SseFrameDecoder};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle state of one response-normalization session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Streaming,
    Completed,
    Failed,
    Aborted,
}

/// Immutable identity snapshot reported with a session's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: Uuid,
    pub created_at: OffsetDateTime,
    pub state: SessionState,
}

impl SessionSummary {
    /// RFC3339 creation timestamp for display and logs.
    pub fn created_at_rfc3339(&self) -> Result<String, time::error::Format> {
        self.created_at.format(&Rfc3339)
    }
}

/// One in-flight normalization session.
///
/// Owns the frame decoder and delta assembler for exactly one outbound
/// request. The assembled text is append-only for the session's lifetime;
/// aborting discards the session rather than mutating its text.
#[derive(Debug)]
pub struct StreamSession {
    id: Uuid,
    created_at: OffsetDateTime,
    state: SessionState,
    decoder: SseFrameDecoder,
    assembler: DeltaAssembler,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: OffsetDateTime::now_utc(),
            state: SessionState::Streaming,
            decoder: SseFrameDecoder::default(),
            assembler: DeltaAssembler::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn text(&self) -> &str {
        self.assembler.text()
    }

    pub fn skipped_frames(&self) -> usize {
        self.assembler.skipped()
    }

    /// True once the end-of-stream marker has been assembled.
    pub fn is_input_complete(&self) -> bool {
        self.assembler.is_completed()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            created_at: self.created_at,
            state: self.state,
        }
    }

    /// Feed one transport chunk through decode and assembly, invoking
    /// `on_delta` once per appended fragment in sequence order.
    pub(crate) fn feed(
        &mut self,
        bytes: &[u8],
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<(), CompletionsApiError> {
        for frame in self.decoder.feed(bytes) {
            if let PushOutcome::Appended(fragment) = self.assembler.push(&frame)? {
                on_delta(&fragment);
            }
        }
        Ok(())
    }

    /// Flush decoder state at natural end-of-stream.
    pub(crate) fn finish_input(
        &mut self,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<(), CompletionsApiError> {
        for frame in self.decoder.finish() {
            if let PushOutcome::Appended(fragment) = self.assembler.push(&frame)? {
                on_delta(&fragment);
            }
        }
        Ok(())
    }

    /// Final assembled text, or `EmptyResponse` when nothing was extracted.
    pub(crate) fn final_text(&self) -> Result<String, CompletionsApiError> {
        if self.assembler.extracted() == 0 {
            return Err(CompletionsApiError::EmptyResponse);
        }
        Ok(self.assembler.text().to_string())
    }

    pub(crate) fn mark_completed(&mut self) {
        self.state = SessionState::Completed;
    }

    pub(crate) fn mark_failed(&mut self) {
        self.state = SessionState::Failed;
    }

    pub(crate) fn mark_aborted(&mut self) {
        self.state = SessionState::Aborted;
    }
}
