//! Search and highlight mapping
//!
//! Case-insensitive substring match on topic or content, in pre-order so
//! results read root-to-leaf, left-to-right.

use std::collections::HashSet;

use mindmap_types::MapNode;

/// Matching nodes in pre-order; a blank query matches nothing
pub fn search<'a, N: MapNode>(query: &str, root: &'a N) -> Vec<&'a N> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    root.preorder()
        .filter(|node| {
            node.topic().to_lowercase().contains(&needle)
                || node.content().to_lowercase().contains(&needle)
        })
        .collect()
}

/// Ids of matching nodes, for renderers that highlight by id
pub fn highlight_ids<N: MapNode>(query: &str, root: &N) -> HashSet<String> {
    search(query, root)
        .into_iter()
        .map(|node| node.id().to_string())
        .collect()
}
