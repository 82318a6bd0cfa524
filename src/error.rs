use thiserror::Error;

use crate::session::SessionState;

/// Misuse of the session API by the caller. These indicate a caller bug
/// rather than a runtime condition, and are always returned as errors
/// instead of being folded into the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("the chat session has ended; reset or load a new document to continue")]
    SessionEnded,

    #[error("another exchange is still streaming for this session")]
    ConcurrentExchange,

    #[error("cannot {operation} while the session is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: SessionState,
    },

    /// A chunk was applied to an exchange that already received its
    /// terminal marker. The transport delivers in order, so this can only
    /// happen when the assembler API is driven incorrectly.
    #[error("exchange {request_id} already received a terminal chunk")]
    ChunkAfterTerminal { request_id: u64 },
}

/// Failures of the streaming transport itself.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open chat stream: {0}")]
    Connect(String),

    #[error("chat backend rejected the request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("chat stream failed mid-flight: {0}")]
    Read(String),

    #[error("chat stream closed before a terminal chunk arrived")]
    ClosedEarly,

    #[error("malformed chunk from chat backend: {0}")]
    Malformed(String),
}

/// Everything `SessionController::send_message` can fail with.
///
/// A transport failure appears here only when the stream could not be
/// opened at all; once an exchange is streaming, transport failures are
/// recovered into an error-marked turn and `send_message` returns `Ok`.
#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
