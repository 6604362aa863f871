//! Transport-only chat-completions client primitives.
//!
//! This crate owns request building, response normalization, and stream
//! parsing for OpenAI-compatible chat-completions endpoints. It intentionally
//! contains no approval/command logic and no UI coupling.
//!
//! Normalization is delivery-mode agnostic: a provider may honor a
//! non-streaming request, or ignore it and answer with an SSE body anyway.
//! [`SseFrameDecoder`] and [`DeltaAssembler`] produce the same assembled text
//! either way.

pub mod assembler;
pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod retry;
pub mod sse;
pub mod url;

pub use assembler::{DeltaAssembler, PushOutcome};
pub use client::CompletionsClient;
pub use config::CompletionsConfig;
pub use error::CompletionsApiError;
pub use payload::{ChatMessage, ChatRequest, ChatRole};
pub use sse::{DecodedFrame, Frame, SseFrameDecoder};
pub use url::normalize_completions_url;
