//! Incremental response stream normalizer for an AI coding workspace.
//!
//! One [`StreamSession`] per outbound request turns a chat-completion HTTP
//! response (a well-formed JSON document, or an SSE-style stream with
//! inconsistently whitespaced framing) into a single deterministic
//! assistant message, extracts an embedded `json_agent` command block from
//! it, and gates every file mutation the command requests behind the
//! approval policy.
//!
//! ## Contract notes
//!
//! - Assembly is append-only and ordered: fragments apply strictly in frame
//!   sequence, with malformed frames recovered and counted, never fatal on
//!   their own. An all-noise body fails with `EmptyResponse` rather than
//!   completing as an empty success.
//! - Delivery mode is irrelevant: providers that ignore a `stream: false`
//!   request and ones that honor it produce identical results.
//! - Only the first `json_agent` block in a message is honored, and at most
//!   one approval may be pending per session. Both are deliberate policies;
//!   downstream consumers depend on the single-command assumption.
//! - A denied command performs zero writes and zero run-directive
//!   dispatches and records `"Operation blocked by user"` exactly once.
//!
//! Collaborators (transport, file store, command runner, approval dialog,
//! event sink) enter through the trait seams in [`transport`] and the
//! `approval_gate` crate; concrete implementations live in [`providers`],
//! [`filestore`], [`runner`], and [`prompt`].

pub mod config;
pub mod controller;
pub mod filestore;
pub mod prompt;
pub mod providers;
pub mod runner;
pub mod session;
pub mod transport;

pub use config::{ApprovalMode, WorkspaceConfig};
pub use controller::{
    CommandDisposition, SessionController, SessionDeps, SessionError, SessionEvent, SessionOutcome,
};
pub use session::{SessionState, SessionSummary, StreamSession};
pub use transport::{CancelSignal, ResponseTransport, TransportReply};
