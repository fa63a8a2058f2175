//! The native block tree of an open note.
//!
//! The markdown form keeps list items as flat siblings; the tree groups
//! consecutive items of the same kind into one list container, each node
//! and item carrying a stable [`NodeId`] for the lifetime of the tree.
//! Rebuilding the tree is what loses view state, so in-place patches
//! (checkbox flags, item content) leave every id untouched.

use std::fmt;

use serde::Serialize;

use crate::block::{self, Block, EncodeOptions, ListKind};
use crate::inline::InlineRun;

/// Stable identity of a node or list item within one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u64);

impl NodeId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// One item of a list container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub id: NodeId,
    pub content: InlineRun,
    /// Only meaningful in task lists.
    pub checked: bool,
    /// Only meaningful in ordered lists.
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Any non-list block.
    Block(Block),
    List { kind: ListKind, items: Vec<ListItem> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocNode {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl DocNode {
    /// Number of flat blocks this node expands to.
    fn block_count(&self) -> usize {
        match &self.kind {
            NodeKind::Block(_) => 1,
            NodeKind::List { items, .. } => items.len(),
        }
    }
}

/// Top-level sequence of block nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocTree {
    nodes: Vec<DocNode>,
    #[serde(skip)]
    next_id: u64,
}

impl DocTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree, grouping consecutive same-kind list items.
    pub fn from_blocks(blocks: &[Block]) -> Self {
        let mut tree = Self::new();
        for block in blocks {
            tree.push_block(block.clone());
        }
        tree
    }

    pub fn from_markdown(markdown: &str) -> Self {
        Self::from_blocks(&block::decode(markdown))
    }

    fn alloc(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn push_block(&mut self, block: Block) {
        let Some(kind) = block.list_kind() else {
            let id = self.alloc();
            self.nodes.push(DocNode {
                id,
                kind: NodeKind::Block(block),
            });
            return;
        };

        let (content, checked, index) = match block {
            Block::BulletListItem(content) => (content, false, 0),
            Block::OrderedListItem { index, content } => (content, false, index),
            Block::TaskListItem { checked, content } => (content, checked, 0),
            _ => return,
        };
        let item = ListItem {
            id: self.alloc(),
            content,
            checked,
            index,
        };

        if let Some(DocNode {
            kind: NodeKind::List { kind: last, items },
            ..
        }) = self.nodes.last_mut()
            && *last == kind
        {
            items.push(item);
            return;
        }

        let id = self.alloc();
        self.nodes.push(DocNode {
            id,
            kind: NodeKind::List {
                kind,
                items: vec![item],
            },
        });
    }

    /// Flatten back to the block sequence (extractBlocks).
    pub fn to_blocks(&self) -> Vec<Block> {
        let mut blocks = Vec::with_capacity(self.block_count());
        for node in &self.nodes {
            match &node.kind {
                NodeKind::Block(block) => blocks.push(block.clone()),
                NodeKind::List { kind, items } => {
                    blocks.extend(items.iter().map(|item| item_block(*kind, item)));
                }
            }
        }
        blocks
    }

    pub fn to_markdown(&self, options: &EncodeOptions) -> String {
        block::encode_with(&self.to_blocks(), options)
    }

    pub fn nodes(&self) -> &[DocNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total number of flat blocks.
    pub fn block_count(&self) -> usize {
        self.nodes.iter().map(DocNode::block_count).sum()
    }

    pub fn find_item(&self, id: NodeId) -> Option<(ListKind, &ListItem)> {
        self.nodes.iter().find_map(|node| match &node.kind {
            NodeKind::List { kind, items } => {
                items.iter().find(|item| item.id == id).map(|item| (*kind, item))
            }
            NodeKind::Block(_) => None,
        })
    }

    fn find_item_mut(&mut self, id: NodeId) -> Option<(ListKind, &mut ListItem)> {
        self.nodes.iter_mut().find_map(|node| match &mut node.kind {
            NodeKind::List { kind, items } => {
                let kind = *kind;
                items.iter_mut().find(|item| item.id == id).map(|item| (kind, item))
            }
            NodeKind::Block(_) => None,
        })
    }

    /// Ids of every task item, in document order.
    pub fn task_items(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter_map(|node| match &node.kind {
                NodeKind::List {
                    kind: ListKind::Task,
                    items,
                } => Some(items.iter().map(|item| item.id)),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Flip a task item's checkbox, returning the new state.
    pub fn toggle_task(&mut self, id: NodeId) -> Option<bool> {
        let (kind, item) = self.find_item_mut(id)?;
        if kind != ListKind::Task {
            return None;
        }
        item.checked = !item.checked;
        Some(item.checked)
    }

    /// Set a task item's checkbox. Returns false if `id` is not a task item.
    pub fn set_task_checked(&mut self, id: NodeId, checked: bool) -> bool {
        match self.find_item_mut(id) {
            Some((ListKind::Task, item)) => {
                item.checked = checked;
                true
            }
            _ => false,
        }
    }

    /// Replace the inline content of a list item or a content-bearing block.
    pub fn replace_content(&mut self, id: NodeId, content: InlineRun) -> bool {
        if let Some((_, item)) = self.find_item_mut(id) {
            item.content = content;
            return true;
        }
        let Some(node) = self.nodes.iter_mut().find(|node| node.id == id) else {
            return false;
        };
        let NodeKind::Block(block) = &mut node.kind else {
            return false;
        };
        match block {
            Block::Paragraph(c)
            | Block::Heading { content: c, .. }
            | Block::BulletListItem(c)
            | Block::OrderedListItem { content: c, .. }
            | Block::TaskListItem { content: c, .. }
            | Block::Blockquote(c) => {
                *c = content;
                true
            }
            Block::CodeBlock { .. } | Block::Image { .. } | Block::Blank => false,
        }
    }

    /// Position of a list item in the flat block sequence.
    pub fn item_block_index(&self, id: NodeId) -> Option<usize> {
        let mut offset = 0;
        for node in &self.nodes {
            if let NodeKind::List { items, .. } = &node.kind
                && let Some(pos) = items.iter().position(|item| item.id == id)
            {
                return Some(offset + pos);
            }
            offset += node.block_count();
        }
        None
    }

    /// The list item at a flat block index, if that block is a list item.
    pub fn item_at_block(&self, block_index: usize) -> Option<NodeId> {
        let mut offset = 0;
        for node in &self.nodes {
            let count = node.block_count();
            if block_index < offset + count {
                return match &node.kind {
                    NodeKind::List { items, .. } => items.get(block_index - offset).map(|i| i.id),
                    NodeKind::Block(_) => None,
                };
            }
            offset += count;
        }
        None
    }

    /// Copy checkbox states from `blocks` for the given flat indices.
    ///
    /// Used for cosmetic updates, where `blocks` differs from this tree only
    /// in task `checked` flags.
    pub fn apply_checked_from(&mut self, blocks: &[Block], indices: &[usize]) -> usize {
        let mut applied = 0;
        for &index in indices {
            let Some(Block::TaskListItem { checked, .. }) = blocks.get(index) else {
                continue;
            };
            if let Some(id) = self.item_at_block(index)
                && self.set_task_checked(id, *checked)
            {
                applied += 1;
            }
        }
        applied
    }
}

fn item_block(kind: ListKind, item: &ListItem) -> Block {
    let content = item.content.clone();
    match kind {
        ListKind::Bullet => Block::BulletListItem(content),
        ListKind::Ordered => Block::OrderedListItem {
            index: item.index,
            content,
        },
        ListKind::Task => Block::TaskListItem {
            checked: item.checked,
            content,
        },
    }
}
