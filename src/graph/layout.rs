//! Tidy tree layout engine
//!
//! Computes x, y positions for every node of a mind map. Pure and
//! deterministic: the same tree always gets the same coordinates, and the
//! input tree is never modified.
//!
//! ```text
//!                 [ root ]                 y = 0
//!          ┌─────────┴─────────┐
//!      [ child ]           [ child ]       y = H + Gv
//!      ┌───┴───┐
//!   [leaf]  [leaf]                         y = 2 (H + Gv)
//! ```
//!
//! Widths are computed children-first (a leaf occupies `W + Gh`, a parent the
//! sum of its children), then nodes are placed parents-first with each parent
//! centered over the span of its children. Both passes run over a flattened
//! copy of the tree, so depth is bounded only by memory.

use mindmap_types::{MindMapNode, PositionedNode};
use serde::{Deserialize, Serialize};

/// Layout configuration constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Node box width (W)
    pub node_width: f64,
    /// Node box height (H)
    pub node_height: f64,
    /// Horizontal gap between sibling boxes (Gh)
    pub horizontal_gap: f64,
    /// Vertical gap between levels (Gv)
    pub vertical_gap: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 180.0,
            node_height: 60.0,
            horizontal_gap: 40.0,
            vertical_gap: 80.0,
        }
    }
}

impl LayoutConfig {
    /// Vertical distance between a parent row and its children row
    pub fn level_step(&self) -> f64 {
        self.node_height + self.vertical_gap
    }

    /// Footprint of a leaf
    pub fn leaf_width(&self) -> f64 {
        self.node_width + self.horizontal_gap
    }
}

/// One node of the flattened tree; parents always precede their children
struct Slot<'a> {
    node: &'a MindMapNode,
    children: Vec<usize>,
}

fn flatten(root: &MindMapNode) -> Vec<Slot<'_>> {
    let mut slots = vec![Slot {
        node: root,
        children: Vec::new(),
    }];
    let mut pending = vec![0];
    while let Some(idx) = pending.pop() {
        let node = slots[idx].node;
        for child in &node.children {
            let child_idx = slots.len();
            slots.push(Slot {
                node: child,
                children: Vec::new(),
            });
            slots[idx].children.push(child_idx);
            pending.push(child_idx);
        }
    }
    slots
}

/// Layout engine producing positioned trees
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Position every node; the root box is anchored at (0, 0)
    pub fn layout(&self, root: &MindMapNode) -> PositionedNode {
        let slots = flatten(root);
        let widths = self.measure(&slots);

        let step = self.config.level_step();
        let mut origins = vec![(0.0, 0.0); slots.len()];
        for (idx, slot) in slots.iter().enumerate() {
            let (x, y) = origins[idx];
            let mut cursor = x - widths[idx] / 2.0;
            for &child in &slot.children {
                origins[child] = (cursor + widths[child] / 2.0, y + step);
                cursor += widths[child];
            }
        }

        let mut built: Vec<Option<PositionedNode>> = (0..slots.len()).map(|_| None).collect();
        for (idx, slot) in slots.iter().enumerate().rev() {
            let children: Vec<PositionedNode> = slot
                .children
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();
            let (x, y) = origins[idx];
            built[idx] = Some(PositionedNode {
                id: slot.node.id.clone(),
                topic: slot.node.topic.clone(),
                content: slot.node.content.clone(),
                x,
                y,
                children,
            });
        }
        built[0].take().unwrap_or_default()
    }

    /// Horizontal footprint of a subtree
    pub fn subtree_width(&self, node: &MindMapNode) -> f64 {
        self.measure(&flatten(node))[0]
    }

    /// Width per slot, children summed before their parent
    fn measure(&self, slots: &[Slot<'_>]) -> Vec<f64> {
        let mut widths = vec![0.0; slots.len()];
        for (idx, slot) in slots.iter().enumerate().rev() {
            widths[idx] = if slot.children.is_empty() {
                self.config.leaf_width()
            } else {
                slot.children.iter().map(|&child| widths[child]).sum()
            };
        }
        widths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindmap_types::MapNode;
    use proptest::prelude::*;

    fn node(id: &str, children: Vec<MindMapNode>) -> MindMapNode {
        MindMapNode::new(id, id.to_uppercase(), "").with_children(children)
    }

    #[test]
    fn test_root_and_single_child_scenario() {
        let engine = LayoutEngine::default();
        let tree = node("a", vec![node("b", vec![])]);
        let positioned = engine.layout(&tree);

        assert_eq!((positioned.x, positioned.y), (0.0, 0.0));
        let child = &positioned.children[0];
        assert_eq!((child.x, child.y), (0.0, 60.0 + 80.0));
    }

    #[test]
    fn test_leaf_width_is_never_zero() {
        let engine = LayoutEngine::default();
        assert_eq!(engine.subtree_width(&node("a", vec![])), 220.0);
    }

    #[test]
    fn test_parent_width_is_sum_of_children() {
        let engine = LayoutEngine::default();
        let tree = node(
            "a",
            vec![node("b", vec![node("d", vec![]), node("e", vec![])]), node("c", vec![])],
        );
        assert_eq!(engine.subtree_width(&tree), 3.0 * 220.0);
        assert_eq!(engine.subtree_width(&tree.children[0]), 2.0 * 220.0);
    }

    #[test]
    fn test_children_centered_under_parent_in_order() {
        let engine = LayoutEngine::default();
        let tree = node("a", vec![node("b", vec![]), node("c", vec![]), node("d", vec![])]);
        let positioned = engine.layout(&tree);

        let xs: Vec<f64> = positioned.children.iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![-220.0, 0.0, 220.0]);
        let ids: Vec<&str> = positioned.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_uneven_subtrees() {
        let engine = LayoutEngine::default();
        let tree = node(
            "a",
            vec![node("b", vec![node("d", vec![]), node("e", vec![])]), node("c", vec![])],
        );
        let positioned = engine.layout(&tree);
        // Total 660: b spans [-330, 110) centered at -110, c spans [110, 330) centered at 220
        assert_eq!(positioned.children[0].x, -110.0);
        assert_eq!(positioned.children[1].x, 220.0);
        let grandkids: Vec<f64> = positioned.children[0].children.iter().map(|c| c.x).collect();
        assert_eq!(grandkids, vec![-220.0, 0.0]);
        assert_eq!(positioned.children[0].children[0].y, 280.0);
    }

    #[test]
    fn test_input_tree_untouched_and_ids_preserved() {
        let engine = LayoutEngine::default();
        let tree = node("a", vec![node("b", vec![node("c", vec![])])]);
        let before = tree.clone();
        let positioned = engine.layout(&tree);
        assert_eq!(tree, before);
        assert_eq!(MindMapNode::from(&positioned), tree);
    }

    #[test]
    fn test_deep_chain_lays_out() {
        const DEPTH: usize = 100_000;
        let mut tree = node("leaf", vec![]);
        for i in 0..DEPTH - 1 {
            tree = MindMapNode::new(format!("n{i}"), "T", "").with_children(vec![tree]);
        }

        let engine = LayoutEngine::default();
        assert_eq!(engine.subtree_width(&tree), 220.0);
        let positioned = engine.layout(&tree);
        assert_eq!(positioned.depth(), DEPTH);

        let mut deepest = &positioned;
        while let Some(child) = deepest.children.first() {
            assert_eq!(child.x, 0.0);
            deepest = child;
        }
        assert_eq!(deepest.id, "leaf");
        assert_eq!(deepest.y, (DEPTH - 1) as f64 * 140.0);
    }

    #[test]
    fn test_custom_config() {
        let engine = LayoutEngine::new(LayoutConfig {
            node_width: 100.0,
            node_height: 20.0,
            horizontal_gap: 10.0,
            vertical_gap: 30.0,
        });
        let positioned = engine.layout(&node("a", vec![node("b", vec![]), node("c", vec![])]));
        assert_eq!(positioned.children[0].x, -55.0);
        assert_eq!(positioned.children[1].x, 55.0);
        assert_eq!(positioned.children[1].y, 50.0);
    }

    fn arb_tree() -> impl Strategy<Value = MindMapNode> {
        let leaf = "[a-z]{1,4}".prop_map(|id| MindMapNode::new(id, "t", ""));
        leaf.prop_recursive(4, 48, 5, |inner| {
            ("[a-z]{1,4}", prop::collection::vec(inner, 0..5))
                .prop_map(|(id, children)| MindMapNode::new(id, "t", "").with_children(children))
        })
    }

    proptest! {
        #[test]
        fn layout_is_deterministic(tree in arb_tree()) {
            let engine = LayoutEngine::default();
            let copy = tree.clone();
            prop_assert_eq!(engine.layout(&tree), engine.layout(&copy));
        }

        #[test]
        fn sibling_spans_never_overlap(tree in arb_tree()) {
            let engine = LayoutEngine::default();
            let positioned = engine.layout(&tree);

            // Walk plain and positioned trees together
            let mut stack = vec![(&tree, &positioned)];
            while let Some((plain, placed)) = stack.pop() {
                let mut previous_end = f64::NEG_INFINITY;
                for (child, placed_child) in plain.children.iter().zip(&placed.children) {
                    let half = engine.subtree_width(child) / 2.0;
                    let start = placed_child.x - half;
                    prop_assert!(start >= previous_end - 1e-9);
                    previous_end = placed_child.x + half;
                    prop_assert_eq!(placed_child.y, placed.y + engine.config().level_step());
                    stack.push((child, placed_child));
                }
            }
            prop_assert_eq!(positioned.node_count(), tree.node_count());
        }
    }
}
