//! Outline export
//!
//! Flattens a finished tree into indented text lines for a document
//! paginator. Works on trees with or without positions.

use mindmap_types::MapNode;

const INDENT: &str = "  ";

/// Depth-first `Topic:`/`Content:` line pairs, two spaces per depth level
pub fn export_lines<N: MapNode>(root: &N) -> Vec<String> {
    let mut lines = Vec::with_capacity(root.node_count() * 2);
    let mut stack: Vec<(&N, usize)> = vec![(root, 0)];

    while let Some((node, depth)) = stack.pop() {
        let indent = INDENT.repeat(depth);
        lines.push(format!("{indent}Topic: {}", node.topic()));
        lines.push(format!("{indent}Content: {}", node.content()));
        stack.extend(node.children().iter().rev().map(|child| (child, depth + 1)));
    }

    lines
}

pub fn export_text<N: MapNode>(root: &N) -> String {
    export_lines(root).join("\n")
}
