// Thread store: comment threads keyed by their document anchor.
//
// The store owns thread/comment invariants (a thread always has at
// least one comment; resolve/reopen are idempotent) and consumes
// re-resolution outcomes: a success refreshes the cached marker, a
// failure sets the derived `orphaned` view flag. Orphaned threads stay
// listed but render no in-document marker.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use anchorage_common::error::ThreadError;
use anchorage_common::types::{Anchor, Block, Comment, Thread, ThreadMarker};

use crate::anchor::Resolution;
use crate::document::DocumentModel;

// ── Types ────────────────────────────────────────────────────────────

struct ThreadRecord {
    thread: Thread,
    /// Derived view state, never persisted.
    orphaned: bool,
}

/// Outcome of deleting a comment.
///
/// Deleting a thread's last comment cascades to deleting the thread, so
/// a thread with zero comments can never exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentDeletion {
    CommentRemoved,
    ThreadDeleted,
}

// ── Store ────────────────────────────────────────────────────────────

/// In-memory store of the threads attached to one document.
#[derive(Default)]
pub struct ThreadStore {
    records: HashMap<Uuid, ThreadRecord>,
    /// Creation order, for stable listing.
    order: Vec<Uuid>,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a thread atomically with its first comment.
    ///
    /// Fails `InvalidAnchor` when the anchor's block does not currently
    /// exist in the document.
    pub fn create_thread(
        &mut self,
        anchor: Anchor,
        author_id: impl Into<String>,
        body: Vec<Block>,
        doc: &DocumentModel,
    ) -> Result<Uuid, ThreadError> {
        if !doc.contains_block(&anchor.block_id) {
            return Err(ThreadError::InvalidAnchor(anchor.block_id));
        }

        let now = Utc::now();
        let thread_id = Uuid::new_v4();
        let first_comment = Comment {
            id: Uuid::new_v4(),
            thread_id,
            author_id: author_id.into(),
            body,
            reactions: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let thread = Thread {
            id: thread_id,
            comments: vec![first_comment],
            resolved: false,
            block_id: anchor.block_id,
            marker: anchor.marker,
            captured_text: anchor.captured_text,
            created_at: now,
            updated_at: now,
        };

        self.records.insert(thread_id, ThreadRecord { thread, orphaned: false });
        self.order.push(thread_id);
        Ok(thread_id)
    }

    /// Appends a comment to an existing thread.
    pub fn add_comment(
        &mut self,
        thread_id: Uuid,
        author_id: impl Into<String>,
        body: Vec<Block>,
    ) -> Result<Uuid, ThreadError> {
        let record = self.record_mut(thread_id)?;
        let now = Utc::now();
        let comment_id = Uuid::new_v4();
        record.thread.comments.push(Comment {
            id: comment_id,
            thread_id,
            author_id: author_id.into(),
            body,
            reactions: Vec::new(),
            created_at: now,
            updated_at: now,
        });
        record.thread.updated_at = now;
        Ok(comment_id)
    }

    /// Marks the thread resolved. Resolving an already-resolved thread
    /// is a no-op; returns whether anything changed.
    pub fn resolve_thread(&mut self, thread_id: Uuid) -> Result<bool, ThreadError> {
        self.set_resolved(thread_id, true)
    }

    /// Reopens a resolved thread. Idempotent, like `resolve_thread`.
    pub fn reopen_thread(&mut self, thread_id: Uuid) -> Result<bool, ThreadError> {
        self.set_resolved(thread_id, false)
    }

    /// Deletes a thread and all its comments.
    pub fn delete_thread(&mut self, thread_id: Uuid) -> Result<Thread, ThreadError> {
        let record =
            self.records.remove(&thread_id).ok_or(ThreadError::ThreadNotFound(thread_id))?;
        self.order.retain(|id| *id != thread_id);
        Ok(record.thread)
    }

    /// Deletes one comment; deleting the last comment cascades to
    /// deleting the whole thread.
    pub fn delete_comment(
        &mut self,
        thread_id: Uuid,
        comment_id: Uuid,
    ) -> Result<CommentDeletion, ThreadError> {
        let record = self.record_mut(thread_id)?;
        let Some(index) = record.thread.comments.iter().position(|c| c.id == comment_id) else {
            return Err(ThreadError::CommentNotFound { thread_id, comment_id });
        };

        if record.thread.comments.len() == 1 {
            self.delete_thread(thread_id)?;
            return Ok(CommentDeletion::ThreadDeleted);
        }

        record.thread.comments.remove(index);
        record.thread.updated_at = Utc::now();
        Ok(CommentDeletion::CommentRemoved)
    }

    /// Toggles a user's emoji reaction on a comment.
    pub fn toggle_reaction(
        &mut self,
        thread_id: Uuid,
        comment_id: Uuid,
        emoji: &str,
        user_id: &str,
    ) -> Result<(), ThreadError> {
        let record = self.record_mut(thread_id)?;
        let comment = record
            .thread
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or(ThreadError::CommentNotFound { thread_id, comment_id })?;

        let now = Utc::now();
        match comment.reactions.iter_mut().find(|r| r.emoji == emoji) {
            Some(reaction) => {
                if let Some(index) = reaction.user_ids.iter().position(|u| u == user_id) {
                    reaction.user_ids.remove(index);
                } else {
                    reaction.user_ids.push(user_id.to_owned());
                }
                comment.reactions.retain(|r| !r.user_ids.is_empty());
            }
            None => comment.reactions.push(anchorage_common::types::Reaction {
                emoji: emoji.to_owned(),
                user_ids: vec![user_id.to_owned()],
            }),
        }
        comment.updated_at = now;
        record.thread.updated_at = now;
        Ok(())
    }

    /// Applies one re-resolution outcome: success refreshes the cached
    /// marker, failure flags the thread orphaned. Returns whether the
    /// thread's rendered state changed.
    ///
    /// `updated_at` tracks authored changes only and is deliberately
    /// left alone here: a marker refresh is derived view maintenance,
    /// and during streaming it can fire on every frame.
    pub fn apply_resolution(
        &mut self,
        thread_id: Uuid,
        resolution: Resolution,
    ) -> Result<bool, ThreadError> {
        let record = self.record_mut(thread_id)?;
        match resolution {
            Resolution::Ok(position) => {
                let changed = record.orphaned || record.thread.marker != position;
                record.thread.marker = position;
                record.orphaned = false;
                Ok(changed)
            }
            Resolution::Orphaned => {
                let changed = !record.orphaned;
                record.orphaned = true;
                Ok(changed)
            }
        }
    }

    /// Threads anchored to the given block, in creation order.
    pub fn threads_on_block(&self, block_id: &str) -> Vec<Uuid> {
        self.order
            .iter()
            .filter(|id| {
                self.records.get(id).is_some_and(|record| record.thread.block_id == block_id)
            })
            .copied()
            .collect()
    }

    pub fn get(&self, thread_id: Uuid) -> Option<&Thread> {
        self.records.get(&thread_id).map(|record| &record.thread)
    }

    pub fn is_orphaned(&self, thread_id: Uuid) -> Option<bool> {
        self.records.get(&thread_id).map(|record| record.orphaned)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rendering boundary: one marker per thread, `None` position while
    /// orphaned.
    pub fn markers(&self) -> Vec<ThreadMarker> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .map(|record| ThreadMarker {
                thread_id: record.thread.id,
                block_id: record.thread.block_id.clone(),
                marker: (!record.orphaned).then_some(record.thread.marker),
                resolved: record.thread.resolved,
            })
            .collect()
    }

    /// Persistence boundary: plain thread records, marker refreshed to
    /// the last successful resolution. The orphaned flag is derived
    /// state and deliberately absent.
    pub fn snapshot(&self) -> Vec<Thread> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .map(|record| record.thread.clone())
            .collect()
    }

    fn set_resolved(&mut self, thread_id: Uuid, resolved: bool) -> Result<bool, ThreadError> {
        let record = self.record_mut(thread_id)?;
        if record.thread.resolved == resolved {
            return Ok(false);
        }
        record.thread.resolved = resolved;
        record.thread.updated_at = Utc::now();
        Ok(true)
    }

    fn record_mut(&mut self, thread_id: Uuid) -> Result<&mut ThreadRecord, ThreadError> {
        self.records.get_mut(&thread_id).ok_or(ThreadError::ThreadNotFound(thread_id))
    }
}
