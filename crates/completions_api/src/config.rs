use std::collections::BTreeMap;
use std::time::Duration;

use crate::url::DEFAULT_COMPLETIONS_BASE_URL;

/// Per-chunk arrival bound: a stream that stalls past this interval fails
/// the session with a timeout rather than hanging.
pub const DEFAULT_CHUNK_TIMEOUT: Duration = Duration::from_secs(30);
/// Connection establishment bound, after which the attempt is retried.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Transport configuration for chat-completions requests.
#[derive(Debug, Clone)]
pub struct CompletionsConfig {
    /// Bearer token passed to `Authorization`.
    pub api_key: String,
    /// Base URL, normalized to a chat-completions endpoint per request.
    pub base_url: String,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional overall request timeout.
    pub timeout: Option<Duration>,
    /// Bound on the gap between consecutive stream chunks.
    pub chunk_timeout: Duration,
    /// Bound on connection establishment.
    pub connect_timeout: Duration,
}

impl Default for CompletionsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_COMPLETIONS_BASE_URL.to_string(),
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
            chunk_timeout: DEFAULT_CHUNK_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl CompletionsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_chunk_timeout(mut self, chunk_timeout: Duration) -> Self {
        self.chunk_timeout = chunk_timeout;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    #[must_use]
    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
}
