//! Shared Types for the mind map pipeline
//!
//! This crate is the SINGLE SOURCE OF TRUTH for every shape that crosses a
//! component boundary.
//!
//! ## Boundaries
//!
//! ```text
//! ┌──────────────┐  FlatRecord[]  ┌──────────────┐  MindMapNode  ┌──────────────┐
//! │  Generator   │ ─────────────► │ Tree Builder │ ────────────► │    Layout    │
//! └──────────────┘                └──────────────┘               └──────┬───────┘
//!                                                                       │ PositionedNode
//!                                              ViewBox  ┌──────────────┐ │
//!                                            ◄───────── │   Viewport   │◄┘
//!                                                       └──────────────┘
//! ```
//!
//! ## Rules
//!
//! 1. Wire records use camelCase field names (`parentId`)
//! 2. Trees are owned values; the layout produces a new `PositionedNode` tree
//! 3. `children` is always present after deserialization

pub mod geometry;

use serde::{Deserialize, Serialize};

pub use geometry::{Bounds, Point, ViewBox};

// ============================================================================
// WIRE SHAPE
// ============================================================================

/// Flat, parent-referencing node record as produced by the generator
///
/// An empty `parent_id` means "no parent".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FlatRecord {
    pub id: String,
    #[serde(default)]
    pub parent_id: String,
    pub topic: String,
    pub content: String,
}

impl FlatRecord {
    pub fn new(
        id: impl Into<String>,
        parent_id: impl Into<String>,
        topic: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            topic: topic.into(),
            content: content.into(),
        }
    }

    /// True when the record names no parent
    pub fn is_parentless(&self) -> bool {
        self.parent_id.is_empty()
    }
}

// ============================================================================
// TREE SHAPES
// ============================================================================

/// Read-only view over a mind map tree, positioned or not
pub trait MapNode: Sized {
    fn id(&self) -> &str;
    fn topic(&self) -> &str;
    fn content(&self) -> &str;
    fn children(&self) -> &[Self];

    /// Pre-order (node before children) traversal
    fn preorder(&self) -> Preorder<'_, Self> {
        Preorder { stack: vec![self] }
    }

    /// Total number of nodes in this subtree
    fn node_count(&self) -> usize {
        self.preorder().count()
    }

    /// Number of levels in this subtree; a lone node has depth 1
    fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.children().iter().map(|child| (child, depth + 1)));
        }
        deepest
    }
}

/// Pre-order iterator over any `MapNode` tree
pub struct Preorder<'a, N> {
    stack: Vec<&'a N>,
}

impl<'a, N: MapNode> Iterator for Preorder<'a, N> {
    type Item = &'a N;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

/// A node in the reconstructed mind map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MindMapNode {
    pub id: String,
    pub topic: String,
    pub content: String,
    /// Upstream generators may omit empty collections
    #[serde(default)]
    pub children: Vec<MindMapNode>,
}

impl MindMapNode {
    pub fn new(
        id: impl Into<String>,
        topic: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            content: content.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<MindMapNode>) -> Self {
        self.children = children;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl MapNode for MindMapNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}

// Drop iteratively; a tree may be arbitrarily deep
impl Drop for MindMapNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// A mind map node annotated with the top-left corner of its drawn box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PositionedNode {
    pub id: String,
    pub topic: String,
    pub content: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub children: Vec<PositionedNode>,
}

impl PositionedNode {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Bounding box of every node box in this subtree
    pub fn bounds(&self, node_width: f64, node_height: f64) -> Bounds {
        Bounds::enclosing(
            self.preorder()
                .map(|n| Bounds::from_origin(n.position(), node_width, node_height)),
        )
        .unwrap_or_else(|| Bounds::from_origin(self.position(), node_width, node_height))
    }

    /// Find a node by id (pre-order)
    pub fn find(&self, id: &str) -> Option<&PositionedNode> {
        self.preorder().find(|n| n.id == id)
    }
}

impl MapNode for PositionedNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}

impl Drop for PositionedNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

impl From<&PositionedNode> for MindMapNode {
    fn from(root: &PositionedNode) -> Self {
        // Reverse pre-order finishes each subtree before its parent; a
        // node's children are then the top `n` finished entries, first
        // child on top.
        let order: Vec<&PositionedNode> = root.preorder().collect();
        let mut finished: Vec<MindMapNode> = Vec::with_capacity(order.len());
        for node in order.into_iter().rev() {
            let split = finished.len().saturating_sub(node.children.len());
            let mut children = finished.split_off(split);
            children.reverse();
            finished.push(MindMapNode {
                id: node.id.clone(),
                topic: node.topic.clone(),
                content: node.content.clone(),
                children,
            });
        }
        finished.pop().unwrap_or_default()
    }
}
