// Error taxonomy for the anchoring core.
//
// No variant here is fatal to the process: capture errors are
// user-correctable, thread errors are integration bugs surfaced to the
// caller, and protocol errors degrade a single frame or session.

use thiserror::Error;
use uuid::Uuid;

/// Selection-capture failures. Surfaced as a blocking message to the
/// user; no thread is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("selection is empty after trimming whitespace")]
    EmptySelection,
    #[error("selection spans {0} blocks; a comment anchors to exactly one")]
    CrossBlockSelection(usize),
    #[error("selection marker is inverted ({0}..{1})")]
    InvertedSelection(u32, u32),
}

/// Document-model failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("block `{0}` not found in document")]
    BlockNotFound(String),
    #[error("block id `{0}` already exists in document")]
    DuplicateBlockId(String),
}

/// Thread-store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThreadError {
    #[error("anchor references block `{0}` which does not exist")]
    InvalidAnchor(String),
    #[error("thread {0} not found")]
    ThreadNotFound(Uuid),
    #[error("comment {comment_id} not found in thread {thread_id}")]
    CommentNotFound { thread_id: Uuid, comment_id: Uuid },
}

/// Stream wire-protocol failures. Malformed frames are dropped and
/// logged by the reconciler; they never fail the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("frame is not valid JSON: {0}")]
    Malformed(String),
    #[error("frame is missing required field `{0}`")]
    MissingField(&'static str),
}
