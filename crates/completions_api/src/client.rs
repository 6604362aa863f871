use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};

use crate::config::CompletionsConfig;
use crate::error::{parse_error_message, CompletionsApiError};
use crate::payload::ChatRequest;
use crate::retry::{is_retryable_http_error, retry_delay, MAX_RETRIES};
use crate::url::normalize_completions_url;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct CompletionsClient {
    http: Client,
    config: CompletionsConfig,
}

impl CompletionsClient {
    pub fn new(config: CompletionsConfig) -> Result<Self, CompletionsApiError> {
        if config.api_key.trim().is_empty() {
            return Err(CompletionsApiError::MissingApiKey);
        }

        let mut builder = Client::builder().connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(CompletionsApiError::from)?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &CompletionsConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_completions_url(&self.config.base_url)
    }

    pub fn build_headers(&self) -> Result<HeaderMap, CompletionsApiError> {
        let mut headers = HeaderMap::new();

        let bearer = format!("Bearer {}", self.config.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer).map_err(|_| CompletionsApiError::InvalidHeader {
                name: "Authorization".to_string(),
            })?,
        );

        if let Some(user_agent) = self.config.user_agent.as_deref() {
            headers.insert(
                USER_AGENT,
                HeaderValue::from_str(user_agent).map_err(|_| {
                    CompletionsApiError::InvalidHeader {
                        name: "User-Agent".to_string(),
                    }
                })?,
            );
        }

        for (key, value) in &self.config.extra_headers {
            headers.insert(
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
                    CompletionsApiError::InvalidHeader { name: key.clone() }
                })?,
                HeaderValue::from_str(value).map_err(|_| CompletionsApiError::InvalidHeader {
                    name: key.clone(),
                })?,
            );
        }

        Ok(headers)
    }

    pub fn build_request(
        &self,
        request: &ChatRequest,
    ) -> Result<reqwest::RequestBuilder, CompletionsApiError> {
        if request.messages.is_empty() {
            return Err(CompletionsApiError::InvalidRequest(
                "'messages' must contain at least one message".to_string(),
            ));
        }

        let headers = self.build_headers()?;
        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(headers)
            .json(request))
    }

    pub async fn send_with_retry(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Response, CompletionsApiError> {
        let mut last_status: Option<StatusCode> = None;
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if is_cancelled(cancellation) {
                return Err(CompletionsApiError::Cancelled);
            }

            let response = self.build_request(request)?.send();
            let response = await_or_cancel(response, cancellation)
                .await?
                .map_err(CompletionsApiError::from);

            match response {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response);
                    }

                    let status = response.status();
                    last_status = Some(status);
                    let body = await_or_cancel(response.text(), cancellation)
                        .await?
                        .unwrap_or_default();
                    let message = parse_error_message(status, &body);
                    last_error = Some(message.clone());

                    if attempt < MAX_RETRIES && is_retryable_http_error(status.as_u16(), &message) {
                        await_or_cancel(tokio::time::sleep(retry_delay(attempt)), cancellation)
                            .await?;
                        continue;
                    }

                    return Err(CompletionsApiError::Upstream {
                        status: status.as_u16(),
                        message,
                    });
                }
                Err(error) => {
                    last_error = Some(error.to_string());
                    if attempt < MAX_RETRIES {
                        await_or_cancel(tokio::time::sleep(retry_delay(attempt)), cancellation)
                            .await?;
                        continue;
                    }
                }
            }
        }

        Err(CompletionsApiError::RetryExhausted {
            status: last_status.map(|status| status.as_u16()),
            last_error,
        })
    }

    /// Stream the response body, invoking `on_chunk` per arriving chunk.
    ///
    /// A gap between chunks longer than the configured chunk timeout fails
    /// with [`CompletionsApiError::Timeout`]; partial bytes already handed to
    /// `on_chunk` stay with the caller for diagnostics.
    pub async fn stream_with_handler<F>(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
        mut on_chunk: F,
    ) -> Result<(), CompletionsApiError>
    where
        F: FnMut(&[u8]),
    {
        let response = self.send_with_retry(request, cancellation).await?;
        let mut bytes = response.bytes_stream();

        loop {
            let next = tokio::time::timeout(
                self.config.chunk_timeout,
                await_or_cancel(bytes.next(), cancellation),
            )
            .await;

            let Ok(next) = next else {
                return Err(CompletionsApiError::Timeout(self.config.chunk_timeout));
            };
            let Some(chunk) = next? else {
                break;
            };
            let chunk = chunk.map_err(CompletionsApiError::from)?;
            on_chunk(&chunk);
        }

        if is_cancelled(cancellation) {
            return Err(CompletionsApiError::Cancelled);
        }

        Ok(())
    }

    /// Fetch the complete response body as one buffered string.
    pub async fn fetch_buffered(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<String, CompletionsApiError> {
        let response = self.send_with_retry(request, cancellation).await?;
        let body = await_or_cancel(response.text(), cancellation).await??;
        Ok(body)
    }
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, CompletionsApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(CompletionsApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(CompletionsApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
