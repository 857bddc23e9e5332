// Core domain types shared across all Anchorage crates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A styled run of text within a block.
///
/// Concatenation order within a block is significant: it defines the
/// UTF-16 offset space that anchors index into.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextContent {
    /// Always `"text"` on the wire; kept for editor interop.
    #[serde(rename = "type", default = "text_content_type")]
    pub content_type: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub styles: BTreeMap<String, serde_json::Value>,
}

fn text_content_type() -> String {
    "text".to_owned()
}

impl TextContent {
    /// An unstyled run.
    pub fn plain(text: impl Into<String>) -> Self {
        Self { content_type: text_content_type(), text: text.into(), styles: BTreeMap::new() }
    }
}

/// A node in the document's content tree.
///
/// `id` is unique within a document at any instant. A block's text is the
/// concatenation of its `content` runs; children form the recursive tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub id: String,
    /// Block tag, e.g. `"paragraph"` or `"heading"`.
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub props: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub content: Vec<TextContent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

impl Block {
    /// A paragraph block with a single unstyled run.
    pub fn paragraph(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            block_type: "paragraph".to_owned(),
            props: BTreeMap::new(),
            content: vec![TextContent::plain(text)],
            children: Vec::new(),
        }
    }

    /// The block's text: its content runs concatenated in order.
    pub fn text(&self) -> String {
        self.content.iter().map(|run| run.text.as_str()).collect()
    }
}

/// A span within a specific block's text, in UTF-16 code units.
///
/// Captured at selection time; after later edits it is a hint for
/// re-resolution, not ground truth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarkerPosition {
    pub from: u32,
    pub to: u32,
}

impl MarkerPosition {
    pub fn new(from: u32, to: u32) -> Self {
        Self { from, to }
    }

    /// Span length in UTF-16 code units.
    pub fn len(&self) -> u32 {
        self.to.saturating_sub(self.from)
    }
}

/// The persisted reference a thread uses to locate its span: block id,
/// offset hint, and the exact captured text as the fallback key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Anchor {
    pub block_id: String,
    pub marker: MarkerPosition,
    /// The trimmed selected substring at capture time.
    pub captured_text: String,
}

/// An emoji reaction on a comment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reaction {
    pub emoji: String,
    pub user_ids: Vec<String>,
}

/// A single message within a thread. The body is its own small block
/// tree (rich comment text), independent from the document's blocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub author_id: String,
    pub body: Vec<Block>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<Reaction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A discussion thread attached to a document span.
///
/// `block_id`/`marker` reflect the anchor's last successful resolution,
/// not necessarily the original capture. A thread always carries at least
/// one comment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Thread {
    pub id: Uuid,
    pub comments: Vec<Comment>,
    pub resolved: bool,
    pub block_id: String,
    pub marker: MarkerPosition,
    /// The exact text captured at anchor time — the fallback key used to
    /// re-find the span when offsets drift.
    pub captured_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    /// The thread's anchor as last successfully resolved.
    pub fn anchor(&self) -> Anchor {
        Anchor {
            block_id: self.block_id.clone(),
            marker: self.marker,
            captured_text: self.captured_text.clone(),
        }
    }
}

/// What the UI needs to render one thread: its current position (absent
/// while the anchor is orphaned) and resolved state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThreadMarker {
    pub thread_id: Uuid,
    pub block_id: String,
    /// `None` while the anchor is orphaned — no in-document marker.
    pub marker: Option<MarkerPosition>,
    pub resolved: bool,
}

/// A live text selection as supplied by the editing surface.
///
/// `block_ids` lists every block the raw selection touches; the capture
/// path rejects anything other than exactly one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectionSnapshot {
    pub selected_text: String,
    pub block_ids: Vec<String>,
    pub marker: MarkerPosition,
}

impl SelectionSnapshot {
    /// A selection contained in a single block.
    pub fn single(
        selected_text: impl Into<String>,
        block_id: impl Into<String>,
        from: u32,
        to: u32,
    ) -> Self {
        Self {
            selected_text: selected_text.into(),
            block_ids: vec![block_id.into()],
            marker: MarkerPosition::new(from, to),
        }
    }
}
