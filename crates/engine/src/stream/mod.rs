// Streaming session state machine and frame reconciliation.
//
// One generation job pushes JSON frames to the editing view. At most
// one session is live per document: starting a new one tears the
// previous subscription down synchronously, so no stale frame is ever
// applied. The reconciler classifies frames; the owning context routes
// the resulting deltas through the document model's mutation seam.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use anchorage_common::protocol::events::{parse_frame, StreamEvent};

use crate::session::SessionId;

// ── Types ────────────────────────────────────────────────────────────

/// Streaming session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// What the owning context should do with one ingested frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Apply this delta to the target block, then re-resolve it.
    Apply { target_block: String, content: String },
    /// The producer finished; the session is `Completed`.
    Completed,
    /// The producer reported failure; the session is `Failed`.
    Failed { message: String },
    /// Ignored (unknown type, malformed body, or no live session).
    Ignored,
}

struct ActiveSession {
    session_id: SessionId,
    target_block: String,
    state: SessionState,
    frames: mpsc::UnboundedReceiver<String>,
}

// ── Reconciler ───────────────────────────────────────────────────────

/// Consumes one ordered frame sequence per session and turns it into
/// document mutations. Applies frames strictly in arrival order; the
/// transport is trusted to preserve producer order (no reordering
/// buffer — a reordering transport would need per-frame versions).
#[derive(Default)]
pub struct StreamReconciler {
    active: Option<ActiveSession>,
}

impl StreamReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the single logical subscription for a session, cancelling
    /// any previous one first. Returns the frame sender handed to the
    /// transport and the id of the session that was cancelled, if any.
    pub fn start(
        &mut self,
        session_id: SessionId,
        target_block: impl Into<String>,
    ) -> (mpsc::UnboundedSender<String>, Option<SessionId>) {
        let cancelled = self.cancel();
        let (sender, receiver) = mpsc::unbounded_channel();
        debug!(session = %session_id, "stream session connecting");
        self.active = Some(ActiveSession {
            session_id,
            target_block: target_block.into(),
            state: SessionState::Connecting,
            frames: receiver,
        });
        (sender, cancelled)
    }

    /// Tears down the active subscription, dropping any queued frames
    /// with the receiver. Local only: the far end is not notified.
    pub fn cancel(&mut self) -> Option<SessionId> {
        let mut session = self.active.take()?;
        if session.state.is_terminal() {
            return None;
        }
        session.state = SessionState::Cancelled;
        debug!(session = %session.session_id, "stream session cancelled");
        Some(session.session_id)
    }

    /// Transitions the active session to `Failed` and tears the
    /// subscription down. No retry is attempted here.
    pub fn fail(&mut self, reason: &str) -> Option<SessionId> {
        let session = self.active.take()?;
        warn!(session = %session.session_id, reason, "stream session failed");
        Some(session.session_id)
    }

    /// Transitions the active session to `Completed` and tears the
    /// subscription down, for transports that signal completion out of
    /// band rather than with a `done` frame.
    pub fn finish(&mut self) -> Option<SessionId> {
        let session = self.active.take()?;
        debug!(session = %session.session_id, "stream session completed");
        Some(session.session_id)
    }

    /// Awaits the next raw frame. `None` means the transport closed the
    /// channel (or no session is live).
    pub async fn next_frame(&mut self) -> Option<String> {
        self.active.as_mut()?.frames.recv().await
    }

    /// Classifies one raw frame against the active session.
    ///
    /// Malformed frames are dropped and logged; they do not fail the
    /// session. `Completed`/`Failed` outcomes leave no active session.
    pub fn ingest(&mut self, raw: &str) -> FrameOutcome {
        let Some(session) = self.active.as_mut() else {
            return FrameOutcome::Ignored;
        };

        match parse_frame(raw) {
            Ok(StreamEvent::ContentUpdate { content }) => {
                if session.state == SessionState::Connecting {
                    session.state = SessionState::Streaming;
                    debug!(session = %session.session_id, "stream session streaming");
                }
                FrameOutcome::Apply { target_block: session.target_block.clone(), content }
            }
            Ok(StreamEvent::Done) => {
                let session = self.active.take().expect("active session checked above");
                debug!(session = %session.session_id, "stream session completed");
                FrameOutcome::Completed
            }
            Ok(StreamEvent::Error { message }) => {
                let session = self.active.take().expect("active session checked above");
                warn!(session = %session.session_id, %message, "producer reported failure");
                FrameOutcome::Failed { message }
            }
            Ok(StreamEvent::Unknown) => FrameOutcome::Ignored,
            Err(error) => {
                warn!(session = %session.session_id, %error, "dropping malformed stream frame");
                FrameOutcome::Ignored
            }
        }
    }

    pub fn active_session(&self) -> Option<(&SessionId, SessionState)> {
        self.active.as_ref().map(|session| (&session.session_id, session.state))
    }

    pub fn is_streaming(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|session| !session.state.is_terminal())
    }
}
