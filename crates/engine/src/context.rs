// Per-view editor context.
//
// One `EditorContext` is constructed when a document editing view opens
// and discarded on teardown; nothing here is process-global. It owns
// the document model, resolver, thread store and stream reconciler, and
// guarantees the core ordering invariant: a text mutation and the
// re-resolution it triggers happen in one turn, with a notice broadcast
// only after both are done. Both user edits and streamed deltas route
// through the same mutation seam.

use anyhow::{bail, Context as _, Result};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use anchorage_common::error::{CaptureError, DocumentError, ThreadError};
use anchorage_common::types::{Anchor, Block, SelectionSnapshot, Thread, ThreadMarker};

use crate::anchor::AnchorResolver;
use crate::config::EngineConfig;
use crate::document::DocumentModel;
use crate::session::{SessionId, SessionManager};
use crate::stream::{FrameOutcome, SessionState, StreamReconciler};
use crate::threads::{CommentDeletion, ThreadStore};

const NOTICE_CAPACITY: usize = 64;

/// Engine-to-renderer notifications.
#[derive(Debug, Clone)]
pub enum EngineNotice {
    /// A re-resolution pass ran for `block_id`; `changed_threads` lists
    /// the threads whose rendered position or orphan state changed.
    ResolutionsChanged { block_id: String, changed_threads: Vec<Uuid> },
    /// The streaming session transitioned state.
    SessionChanged { session_id: SessionId, state: SessionState },
}

/// The live editing state for one open document view.
pub struct EditorContext {
    doc: DocumentModel,
    resolver: AnchorResolver,
    threads: ThreadStore,
    reconciler: StreamReconciler,
    sessions: SessionManager,
    notices: broadcast::Sender<EngineNotice>,
}

impl EditorContext {
    pub fn new(
        document_id: impl Into<String>,
        blocks: Vec<Block>,
        config: &EngineConfig,
    ) -> Result<Self, DocumentError> {
        let doc = DocumentModel::new(document_id, blocks)?;
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Ok(Self {
            doc,
            resolver: AnchorResolver::new(config.resolver_config()),
            threads: ThreadStore::new(),
            reconciler: StreamReconciler::new(),
            sessions: SessionManager::new(),
            notices,
        })
    }

    /// Subscribes to engine notices. Renderers re-render thread markers
    /// on `ResolutionsChanged` and show generation status on
    /// `SessionChanged`.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineNotice> {
        self.notices.subscribe()
    }

    pub fn document(&self) -> &DocumentModel {
        &self.doc
    }

    pub fn threads(&self) -> &ThreadStore {
        &self.threads
    }

    pub fn thread(&self, thread_id: Uuid) -> Option<&Thread> {
        self.threads.get(thread_id)
    }

    pub fn markers(&self) -> Vec<ThreadMarker> {
        self.threads.markers()
    }

    /// Persistence boundary: current thread records for the storage
    /// collaborator, markers refreshed to the last resolution.
    pub fn thread_snapshot(&self) -> Vec<Thread> {
        self.threads.snapshot()
    }

    // ── Commenting ───────────────────────────────────────────────────

    /// Captures a live selection as a persistent anchor.
    pub fn capture_selection(&self, selection: &SelectionSnapshot) -> Result<Anchor, CaptureError> {
        self.resolver.capture(selection)
    }

    /// Creates a thread with its first comment from a captured anchor.
    pub fn create_thread(
        &mut self,
        anchor: Anchor,
        author_id: impl Into<String>,
        body: Vec<Block>,
    ) -> Result<Uuid, ThreadError> {
        self.threads.create_thread(anchor, author_id, body, &self.doc)
    }

    /// Capture + create in one step, for the comment-creation gesture.
    pub fn comment_on_selection(
        &mut self,
        selection: &SelectionSnapshot,
        author_id: impl Into<String>,
        body: Vec<Block>,
    ) -> Result<Uuid> {
        let anchor = self
            .capture_selection(selection)
            .context("selection cannot be captured as an anchor")?;
        self.create_thread(anchor, author_id, body)
            .context("captured anchor was rejected by the thread store")
    }

    pub fn add_comment(
        &mut self,
        thread_id: Uuid,
        author_id: impl Into<String>,
        body: Vec<Block>,
    ) -> Result<Uuid, ThreadError> {
        self.threads.add_comment(thread_id, author_id, body)
    }

    pub fn resolve_thread(&mut self, thread_id: Uuid) -> Result<bool, ThreadError> {
        self.threads.resolve_thread(thread_id)
    }

    pub fn reopen_thread(&mut self, thread_id: Uuid) -> Result<bool, ThreadError> {
        self.threads.reopen_thread(thread_id)
    }

    pub fn delete_thread(&mut self, thread_id: Uuid) -> Result<Thread, ThreadError> {
        self.threads.delete_thread(thread_id)
    }

    pub fn delete_comment(
        &mut self,
        thread_id: Uuid,
        comment_id: Uuid,
    ) -> Result<CommentDeletion, ThreadError> {
        self.threads.delete_comment(thread_id, comment_id)
    }

    // ── User edits ───────────────────────────────────────────────────

    /// Replaces a block's text and re-resolves its anchors in the same
    /// turn.
    pub fn edit_block_text(
        &mut self,
        block_id: &str,
        new_text: impl Into<String>,
    ) -> Result<(), DocumentError> {
        let mutation = self.doc.replace_block_text(block_id, new_text)?;
        self.reresolve_block(&mutation.block_id);
        Ok(())
    }

    /// Appends to a block's text and re-resolves its anchors.
    pub fn append_block_text(&mut self, block_id: &str, delta: &str) -> Result<(), DocumentError> {
        let mutation = self.doc.append_text(block_id, delta)?;
        self.reresolve_block(&mutation.block_id);
        Ok(())
    }

    /// Inserts a block. Anchors previously orphaned on this id recover
    /// if the new block carries their captured text (e.g. after undo).
    pub fn insert_block(&mut self, parent: Option<&str>, block: Block) -> Result<(), DocumentError> {
        let block_id = block.id.clone();
        self.doc.insert_block(parent, block)?;
        self.reresolve_block(&block_id);
        Ok(())
    }

    /// Removes a block subtree; anchors on it orphan, never delete.
    pub fn remove_block(&mut self, block_id: &str) -> Result<Block, DocumentError> {
        let removed = self.doc.remove_block(block_id)?;
        self.reresolve_block(block_id);
        Ok(removed)
    }

    // ── Streaming ────────────────────────────────────────────────────

    /// Starts a generation session targeting `target_block`, cancelling
    /// any session already live. Returns the minted session id and the
    /// frame sender to hand to the transport.
    pub fn start_generation(
        &mut self,
        target_block: &str,
    ) -> Result<(SessionId, mpsc::UnboundedSender<String>), DocumentError> {
        if !self.doc.contains_block(target_block) {
            return Err(DocumentError::BlockNotFound(target_block.to_owned()));
        }

        let session_id = self.sessions.mint(self.doc.document_id());
        let (sender, cancelled) = self.reconciler.start(session_id.clone(), target_block);
        if let Some(previous) = cancelled {
            self.notify_session(previous, SessionState::Cancelled);
        }
        info!(session = %session_id, target_block, "generation session started");
        self.notify_session(session_id.clone(), SessionState::Connecting);
        Ok((session_id, sender))
    }

    /// Applies one inbound frame: classify, mutate the target block,
    /// re-resolve its anchors — all in this turn. Returns the terminal
    /// state when the frame ended the session.
    pub fn apply_frame(&mut self, raw: &str) -> Option<SessionState> {
        let before = self.reconciler.active_session().map(|(id, state)| (id.clone(), state));

        match self.reconciler.ingest(raw) {
            FrameOutcome::Apply { target_block, content } => {
                if let Some((session_id, SessionState::Connecting)) = before {
                    self.notify_session(session_id, SessionState::Streaming);
                }
                match self.doc.append_text(&target_block, &content) {
                    Ok(mutation) => {
                        self.reresolve_block(&mutation.block_id);
                        None
                    }
                    Err(error) => {
                        // Target block vanished mid-stream; the session
                        // cannot make progress.
                        warn!(%error, "stream delta targets a missing block");
                        let failed = self.reconciler.fail("target block missing");
                        if let Some(session_id) = failed {
                            self.notify_session(session_id, SessionState::Failed);
                        }
                        Some(SessionState::Failed)
                    }
                }
            }
            FrameOutcome::Completed => {
                if let Some((session_id, _)) = before {
                    self.notify_session(session_id, SessionState::Completed);
                }
                Some(SessionState::Completed)
            }
            FrameOutcome::Failed { message } => {
                if let Some((session_id, _)) = before {
                    debug!(%message, "generation reported failure");
                    self.notify_session(session_id, SessionState::Failed);
                }
                Some(SessionState::Failed)
            }
            FrameOutcome::Ignored => None,
        }
    }

    /// Drives the active session to a terminal state, applying frames
    /// in arrival order. A transport that closes the channel without a
    /// `done` frame fails the session; retry policy belongs to the
    /// caller.
    pub async fn pump(&mut self) -> Result<SessionState> {
        if self.reconciler.active_session().is_none() {
            bail!("no generation session is active");
        }

        loop {
            match self.reconciler.next_frame().await {
                Some(raw) => {
                    if let Some(terminal) = self.apply_frame(&raw) {
                        return Ok(terminal);
                    }
                }
                None => {
                    self.fail_generation("transport closed");
                    return Ok(SessionState::Failed);
                }
            }
        }
    }

    /// Marks the active session `Completed` without a `done` frame, for
    /// transports that signal completion out of band. Returns the
    /// session that finished, if one was live.
    pub fn finish_generation(&mut self) -> Option<SessionId> {
        let completed = self.reconciler.finish()?;
        self.notify_session(completed.clone(), SessionState::Completed);
        Some(completed)
    }

    /// Fails the active session, for callers that drive frames
    /// synchronously via `apply_frame` and hit a transport error
    /// themselves. Queued frames are dropped with the subscription.
    pub fn fail_generation(&mut self, reason: &str) -> Option<SessionId> {
        let failed = self.reconciler.fail(reason)?;
        self.notify_session(failed.clone(), SessionState::Failed);
        Some(failed)
    }

    /// Cancels the active generation session, if any. Local teardown
    /// only; no dangling frame is applied afterwards.
    pub fn cancel_generation(&mut self) -> Option<SessionId> {
        let cancelled = self.reconciler.cancel()?;
        self.notify_session(cancelled.clone(), SessionState::Cancelled);
        Some(cancelled)
    }

    /// Tears the view's live state down: the subscription is closed
    /// deterministically before the context is dropped.
    pub fn teardown(&mut self) {
        self.cancel_generation();
        debug!(document = self.doc.document_id(), "editor context torn down");
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Re-resolves every thread anchored to `block_id` against the
    /// current document and broadcasts one notice for the pass. Anchors
    /// on untouched blocks are deliberately not revisited.
    fn reresolve_block(&mut self, block_id: &str) {
        let thread_ids = self.threads.threads_on_block(block_id);
        if thread_ids.is_empty() {
            return;
        }

        let mut changed_threads = Vec::new();
        for thread_id in thread_ids {
            let Some(anchor) = self.threads.get(thread_id).map(Thread::anchor) else {
                continue;
            };
            let resolution = self.resolver.resolve(&anchor, &self.doc);
            match self.threads.apply_resolution(thread_id, resolution) {
                Ok(true) => changed_threads.push(thread_id),
                Ok(false) => {}
                Err(error) => warn!(%error, "resolution outcome for vanished thread"),
            }
        }

        // Subscribers may come and go; a send to zero receivers is fine.
        let _ = self.notices.send(EngineNotice::ResolutionsChanged {
            block_id: block_id.to_owned(),
            changed_threads,
        });
    }

    fn notify_session(&self, session_id: SessionId, state: SessionState) {
        let _ = self.notices.send(EngineNotice::SessionChanged { session_id, state });
    }
}
