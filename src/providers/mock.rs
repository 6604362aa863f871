//! Deterministic scripted transport for local development and contract
//! tests. Contains no network logic.

use std::collections::VecDeque;

use completions_api::{ChatRequest, CompletionsApiError};

use crate::transport::{CancelSignal, ResponseTransport, TransportReply};

/// One scripted response delivery.
#[derive(Debug)]
pub enum ScriptedReply {
    /// Complete body handed over in one piece.
    Buffered(String),
    /// Body split into chunks delivered one at a time.
    Chunked(Vec<String>),
    /// Chunks delivered, then the stream fails with the given error.
    ChunkedThenError(Vec<String>, CompletionsApiError),
    /// The request itself fails before any body arrives.
    Error(CompletionsApiError),
}

/// Scripted `ResponseTransport` that replays queued replies in order and
/// records every request it saw.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: VecDeque<ScriptedReply>,
    requests: Vec<ChatRequest>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: replies.into(),
            requests: Vec::new(),
        }
    }

    #[must_use]
    pub fn buffered(body: impl Into<String>) -> Self {
        Self::new(vec![ScriptedReply::Buffered(body.into())])
    }

    #[must_use]
    pub fn chunked(chunks: Vec<String>) -> Self {
        Self::new(vec![ScriptedReply::Chunked(chunks)])
    }

    pub fn push(&mut self, reply: ScriptedReply) {
        self.replies.push_back(reply);
    }

    /// Requests observed so far, in arrival order.
    pub fn requests(&self) -> &[ChatRequest] {
        &self.requests
    }
}

impl ResponseTransport for ScriptedTransport {
    fn fetch(
        &mut self,
        request: &ChatRequest,
        _cancel: &CancelSignal,
    ) -> Result<TransportReply, CompletionsApiError> {
        self.requests.push(request.clone());

        match self.replies.pop_front() {
            Some(ScriptedReply::Buffered(body)) => Ok(TransportReply::Buffered(body)),
            Some(ScriptedReply::Chunked(chunks)) => Ok(TransportReply::Chunks(Box::new(
                chunks.into_iter().map(|chunk| Ok(chunk.into_bytes())),
            ))),
            Some(ScriptedReply::ChunkedThenError(chunks, error)) => {
                let items: Vec<Result<Vec<u8>, CompletionsApiError>> = chunks
                    .into_iter()
                    .map(|chunk| Ok(chunk.into_bytes()))
                    .chain(std::iter::once(Err(error)))
                    .collect();
                Ok(TransportReply::Chunks(Box::new(items.into_iter())))
            }
            Some(ScriptedReply::Error(error)) => Err(error),
            None => Err(CompletionsApiError::Unknown(
                "scripted transport has no reply queued".to_string(),
            )),
        }
    }
}
