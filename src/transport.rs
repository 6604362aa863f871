use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use completions_api::{ChatRequest, CompletionsApiError};

/// Shared abort flag for a session. Checked cooperatively between chunks.
pub type CancelSignal = Arc<AtomicBool>;

/// Raw response delivery, as the upstream chose to send it.
///
/// Providers are not guaranteed to honor a requested delivery mode, so the
/// normalizer treats both variants identically; a buffered body may still
/// carry SSE framing and a chunked body may still be one JSON document.
pub enum TransportReply {
    /// Complete body delivered at once (success status already verified).
    Buffered(String),
    /// Incrementally arriving chunks; an `Err` item ends the stream with a
    /// transport failure (timeout, reset) after any partial delivery.
    Chunks(Box<dyn Iterator<Item = Result<Vec<u8>, CompletionsApiError>>>),
}

impl std::fmt::Debug for TransportReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffered(body) => f.debug_tuple("Buffered").field(&body.len()).finish(),
            Self::Chunks(_) => f.debug_tuple("Chunks").finish(),
        }
    }
}

/// Transport collaborator supplying one raw response per outbound request.
///
/// Non-success upstream statuses surface as
/// [`CompletionsApiError::Upstream`] with the body's `error` field verbatim;
/// the normalizer never inspects status codes itself.
pub trait ResponseTransport {
    fn fetch(
        &mut self,
        request: &ChatRequest,
        cancel: &CancelSignal,
    ) -> Result<TransportReply, CompletionsApiError>;
}
