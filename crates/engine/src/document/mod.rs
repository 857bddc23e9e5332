// Live block tree for one open document.
//
// Text changes go through exactly two operations, `replace_block_text`
// and `append_text`. Both are block-local: they never change another
// block's id or content, which is the property anchor re-resolution
// depends on. Every mutation returns a `BlockMutation` record so the
// caller can trigger scoped re-resolution in the same turn.

use std::collections::HashSet;

use anchorage_common::error::DocumentError;
use anchorage_common::types::{Block, TextContent};

// ── Types ────────────────────────────────────────────────────────────

/// How a block's text changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Replaced,
    Appended,
}

/// Record of one text mutation, consumed by the re-resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMutation {
    pub block_id: String,
    pub kind: MutationKind,
}

// ── Model ────────────────────────────────────────────────────────────

/// The block tree for one document, exclusively owned by the active
/// editing view.
#[derive(Debug, Clone)]
pub struct DocumentModel {
    document_id: String,
    blocks: Vec<Block>,
}

impl DocumentModel {
    /// Builds a model, rejecting duplicate block ids anywhere in the tree.
    pub fn new(document_id: impl Into<String>, blocks: Vec<Block>) -> Result<Self, DocumentError> {
        let mut seen = HashSet::new();
        for block in &blocks {
            check_unique_ids(block, &mut seen)?;
        }
        Ok(Self { document_id: document_id.into(), blocks })
    }

    /// An empty document.
    pub fn empty(document_id: impl Into<String>) -> Self {
        Self { document_id: document_id.into(), blocks: Vec::new() }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn roots(&self) -> &[Block] {
        &self.blocks
    }

    /// Finds a block anywhere in the tree.
    pub fn find_block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find_map(|block| find_in(block, id))
    }

    pub fn contains_block(&self, id: &str) -> bool {
        self.find_block(id).is_some()
    }

    /// The block's concatenated text.
    pub fn block_text(&self, id: &str) -> Result<String, DocumentError> {
        self.find_block(id)
            .map(Block::text)
            .ok_or_else(|| DocumentError::BlockNotFound(id.to_owned()))
    }

    /// Replaces the block's entire text with a single unstyled run.
    ///
    /// Styles are a rendering concern; the anchor offset space depends
    /// only on the concatenated text, which this preserves by definition.
    pub fn replace_block_text(
        &mut self,
        id: &str,
        new_text: impl Into<String>,
    ) -> Result<BlockMutation, DocumentError> {
        let block = self.find_block_mut(id)?;
        block.content = vec![TextContent::plain(new_text.into())];
        Ok(BlockMutation { block_id: id.to_owned(), kind: MutationKind::Replaced })
    }

    /// Appends a textual delta to the block's last run.
    pub fn append_text(
        &mut self,
        id: &str,
        delta: &str,
    ) -> Result<BlockMutation, DocumentError> {
        let block = self.find_block_mut(id)?;
        match block.content.last_mut() {
            Some(run) => run.text.push_str(delta),
            None => block.content.push(TextContent::plain(delta)),
        }
        Ok(BlockMutation { block_id: id.to_owned(), kind: MutationKind::Appended })
    }

    /// Inserts a block (and its subtree) as the last child of `parent`,
    /// or as a root when `parent` is `None`.
    pub fn insert_block(
        &mut self,
        parent: Option<&str>,
        block: Block,
    ) -> Result<(), DocumentError> {
        let mut seen: HashSet<String> = HashSet::new();
        for existing in &self.blocks {
            collect_ids(existing, &mut seen);
        }
        let mut incoming = HashSet::new();
        check_unique_ids(&block, &mut incoming)?;
        if let Some(duplicate) = incoming.iter().find(|id| seen.contains(id.as_str())) {
            return Err(DocumentError::DuplicateBlockId(duplicate.clone()));
        }

        match parent {
            None => {
                self.blocks.push(block);
                Ok(())
            }
            Some(parent_id) => {
                let parent_block = self.find_block_mut(parent_id)?;
                parent_block.children.push(block);
                Ok(())
            }
        }
    }

    /// Removes a block and its subtree, returning it.
    pub fn remove_block(&mut self, id: &str) -> Result<Block, DocumentError> {
        if let Some(index) = self.blocks.iter().position(|block| block.id == id) {
            return Ok(self.blocks.remove(index));
        }
        for root in &mut self.blocks {
            if let Some(removed) = remove_in(root, id) {
                return Ok(removed);
            }
        }
        Err(DocumentError::BlockNotFound(id.to_owned()))
    }

    fn find_block_mut(&mut self, id: &str) -> Result<&mut Block, DocumentError> {
        self.blocks
            .iter_mut()
            .find_map(|block| find_in_mut(block, id))
            .ok_or_else(|| DocumentError::BlockNotFound(id.to_owned()))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn find_in<'a>(block: &'a Block, id: &str) -> Option<&'a Block> {
    if block.id == id {
        return Some(block);
    }
    block.children.iter().find_map(|child| find_in(child, id))
}

fn find_in_mut<'a>(block: &'a mut Block, id: &str) -> Option<&'a mut Block> {
    if block.id == id {
        return Some(block);
    }
    block.children.iter_mut().find_map(|child| find_in_mut(child, id))
}

fn remove_in(block: &mut Block, id: &str) -> Option<Block> {
    if let Some(index) = block.children.iter().position(|child| child.id == id) {
        return Some(block.children.remove(index));
    }
    block.children.iter_mut().find_map(|child| remove_in(child, id))
}

fn collect_ids(block: &Block, into: &mut HashSet<String>) {
    into.insert(block.id.clone());
    for child in &block.children {
        collect_ids(child, into);
    }
}

fn check_unique_ids(block: &Block, seen: &mut HashSet<String>) -> Result<(), DocumentError> {
    if !seen.insert(block.id.clone()) {
        return Err(DocumentError::DuplicateBlockId(block.id.clone()));
    }
    for child in &block.children {
        check_unique_ids(child, seen)?;
    }
    Ok(())
}
