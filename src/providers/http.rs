//! Blocking HTTP adapter over the async `completions_api` client.

use completions_api::client::CompletionsClient;
use completions_api::{ChatRequest, CompletionsApiError, CompletionsConfig};

use crate::transport::{CancelSignal, ResponseTransport, TransportReply};

/// `ResponseTransport` backed by real chat-completions HTTP transport.
///
/// Each fetch drives the async client on a current-thread runtime, which
/// keeps the session loop cooperative and single-threaded.
#[derive(Debug)]
pub struct HttpTransport {
    client: CompletionsClient,
}

impl HttpTransport {
    pub fn new(config: CompletionsConfig) -> Result<Self, CompletionsApiError> {
        Ok(Self {
            client: CompletionsClient::new(config)?,
        })
    }

    pub fn client(&self) -> &CompletionsClient {
        &self.client
    }
}

impl ResponseTransport for HttpTransport {
    fn fetch(
        &mut self,
        request: &ChatRequest,
        cancel: &CancelSignal,
    ) -> Result<TransportReply, CompletionsApiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                CompletionsApiError::Unknown(format!("failed to initialize tokio runtime: {error}"))
            })?;

        if !request.stream {
            // The provider may still answer with SSE framing; the decoder
            // treats either shape identically.
            let body = runtime.block_on(self.client.fetch_buffered(request, Some(cancel)))?;
            return Ok(TransportReply::Buffered(body));
        }

        let mut chunks: Vec<Result<Vec<u8>, CompletionsApiError>> = Vec::new();
        let outcome = runtime.block_on(self.client.stream_with_handler(
            request,
            Some(cancel),
            |chunk| chunks.push(Ok(chunk.to_vec())),
        ));

        match outcome {
            Ok(()) => Ok(TransportReply::Chunks(Box::new(chunks.into_iter()))),
            // Failures before the first chunk (bad status, connect failure)
            // surface directly; mid-stream failures keep partial delivery so
            // the session can retain partial text for diagnostics.
            Err(error) if chunks.is_empty() => Err(error),
            Err(error) => {
                chunks.push(Err(error));
                Ok(TransportReply::Chunks(Box::new(chunks.into_iter())))
            }
        }
    }
}
