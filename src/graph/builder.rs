//! Tree builder
//!
//! Rebuilds a single rooted tree from the flat, parent-referencing records
//! the generator emits. The input is untrusted: ids may repeat, parents may
//! be missing, chains may loop. None of that is an error; only records that
//! lack required fields are rejected.

use std::collections::HashMap;

use mindmap_types::{FlatRecord, MindMapNode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ValidationError;

/// Identifier of the fabricated root inserted for zero or several roots
pub const SYNTHETIC_ROOT_ID: &str = "__root__";

/// Topic of the fabricated root
pub const SYNTHETIC_ROOT_TOPIC: &str = "Mind Map";

/// Builds a `MindMapNode` tree from flat records
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    root_topic: String,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self {
            root_topic: SYNTHETIC_ROOT_TOPIC.to_string(),
        }
    }
}

/// Build with the default synthetic root label
pub fn build_tree(records: &[FlatRecord]) -> Result<MindMapNode, ValidationError> {
    TreeBuilder::default().build(records)
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label used when a synthetic root is needed
    pub fn with_root_topic(root_topic: impl Into<String>) -> Self {
        Self {
            root_topic: root_topic.into(),
        }
    }

    pub fn build(&self, records: &[FlatRecord]) -> Result<MindMapNode, ValidationError> {
        if let Some(index) = records.iter().position(|r| r.id.trim().is_empty()) {
            return Err(ValidationError::EmptyId { index });
        }

        // Last occurrence of an id wins, and keeps that occurrence's position
        let mut winner: HashMap<&str, usize> = HashMap::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            winner.insert(record.id.as_str(), idx);
        }
        let survivors: Vec<usize> = (0..records.len())
            .filter(|idx| winner.get(records[*idx].id.as_str()) == Some(idx))
            .collect();
        if survivors.len() < records.len() {
            warn!(
                "Dropped {} duplicate record(s) by id",
                records.len() - survivors.len()
            );
        }

        let declared_parent = |idx: usize| -> Option<usize> {
            let record = &records[idx];
            if record.parent_id.is_empty() || record.parent_id == record.id {
                return None;
            }
            winner.get(record.parent_id.as_str()).copied()
        };

        // Records whose parent chain loops back to themselves. Each record is
        // walked at most once.
        let mut visit = vec![Visit::Unseen; records.len()];
        let mut on_cycle = vec![false; records.len()];
        for &start in &survivors {
            let mut path: Vec<usize> = Vec::new();
            let mut current = Some(start);
            while let Some(idx) = current {
                match visit[idx] {
                    Visit::Done => break,
                    Visit::Walking => {
                        if let Some(pos) = path.iter().position(|&p| p == idx) {
                            path[pos..].iter().for_each(|&p| on_cycle[p] = true);
                        }
                        break;
                    }
                    Visit::Unseen => {
                        visit[idx] = Visit::Walking;
                        path.push(idx);
                        current = declared_parent(idx);
                    }
                }
            }
            path.into_iter().for_each(|idx| visit[idx] = Visit::Done);
        }

        let mut children_of: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut roots: Vec<usize> = Vec::new();
        for &idx in &survivors {
            let record = &records[idx];
            if record.parent_id == record.id {
                warn!(id = %record.id, "Record names itself as parent; treating as root");
                roots.push(idx);
                continue;
            }
            match declared_parent(idx) {
                Some(_) if on_cycle[idx] => {
                    warn!(
                        id = %record.id,
                        parent = %record.parent_id,
                        "Parent chain is cyclic; treating as root"
                    );
                    roots.push(idx);
                }
                Some(parent) => children_of.entry(parent).or_default().push(idx),
                None => {
                    if !record.parent_id.is_empty() {
                        debug!(
                            id = %record.id,
                            parent = %record.parent_id,
                            "Unknown parent; treating as root"
                        );
                    }
                    roots.push(idx);
                }
            }
        }

        let assemble = |idx: usize| assemble_node(records, &children_of, idx);

        let tree = if roots.len() == 1 {
            assemble(roots[0])
        } else {
            debug!("{} root candidate(s); inserting synthetic root", roots.len());
            MindMapNode {
                id: synthetic_root_id(&winner),
                topic: self.root_topic.clone(),
                content: String::new(),
                children: roots.into_iter().map(assemble).collect(),
            }
        };

        debug!("Built tree with {} node(s)", survivors.len());
        Ok(tree)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unseen,
    Walking,
    Done,
}

/// Assemble the subtree under `root` without recursing per level
fn assemble_node(
    records: &[FlatRecord],
    children_of: &HashMap<usize, Vec<usize>>,
    root: usize,
) -> MindMapNode {
    // Parents precede their children in `order`
    let mut order = vec![root];
    let mut next = 0;
    while next < order.len() {
        if let Some(kids) = children_of.get(&order[next]) {
            order.extend(kids);
        }
        next += 1;
    }

    // Walking it backwards finishes every child before its parent
    let mut built: HashMap<usize, MindMapNode> = HashMap::with_capacity(order.len());
    for &idx in order.iter().rev() {
        let children: Vec<MindMapNode> = children_of
            .get(&idx)
            .map(|kids| kids.iter().filter_map(|kid| built.remove(kid)).collect())
            .unwrap_or_default();
        let record = &records[idx];
        built.insert(
            idx,
            MindMapNode {
                id: record.id.clone(),
                topic: record.topic.clone(),
                content: record.content.clone(),
                children,
            },
        );
    }
    built.remove(&root).unwrap_or_default()
}

/// `__root__`, suffixed if a record already uses it
fn synthetic_root_id(taken: &HashMap<&str, usize>) -> String {
    if !taken.contains_key(SYNTHETIC_ROOT_ID) {
        return SYNTHETIC_ROOT_ID.to_string();
    }
    (1..)
        .map(|n| format!("{SYNTHETIC_ROOT_ID}{n}"))
        .find(|candidate| !taken.contains_key(candidate.as_str()))
        .unwrap_or_else(|| SYNTHETIC_ROOT_ID.to_string())
}

// =============================================================================
// RAW JSON INPUT
// =============================================================================

/// Read flat records out of untyped JSON
///
/// Accepts a bare array or an object wrapping it under `nodes`. `id`,
/// `topic` and `content` are required; `parentId` may be absent or null.
/// Numeric ids are accepted and stringified.
pub fn records_from_value(value: &Value) -> Result<Vec<FlatRecord>, ValidationError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("nodes") {
            Some(Value::Array(items)) => items,
            _ => return Err(ValidationError::NotAnArray),
        },
        _ => return Err(ValidationError::NotAnArray),
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let obj = item
                .as_object()
                .ok_or(ValidationError::NotAnObject { index })?;
            let field = |name: &'static str| -> Result<String, ValidationError> {
                scalar_string(obj.get(name))
                    .ok_or(ValidationError::MissingField { index, field: name })
            };
            let record = FlatRecord {
                id: field("id")?,
                parent_id: match obj.get("parentId") {
                    None | Some(Value::Null) => String::new(),
                    other => scalar_string(other).ok_or(ValidationError::MissingField {
                        index,
                        field: "parentId",
                    })?,
                },
                topic: field("topic")?,
                content: field("content")?,
            };
            if record.id.trim().is_empty() {
                return Err(ValidationError::EmptyId { index });
            }
            Ok(record)
        })
        .collect()
}

fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Ensure every node object in a nested JSON tree carries a `children` array
///
/// Idempotent: normalizing twice equals normalizing once.
pub fn normalize_value(value: &mut Value) {
    let mut pending = vec![value];
    while let Some(node) = pending.pop() {
        let Value::Object(map) = node else {
            continue;
        };
        if !matches!(map.get("children"), Some(Value::Array(_))) {
            map.insert("children".to_string(), Value::Array(Vec::new()));
        }
        if let Some(Value::Array(children)) = map.get_mut("children") {
            pending.extend(children.iter_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindmap_types::MapNode;
    use proptest::prelude::*;
    use serde_json::json;

    fn rec(id: &str, parent: &str, topic: &str) -> FlatRecord {
        FlatRecord::new(id, parent, topic, "")
    }

    fn child_ids(node: &MindMapNode) -> Vec<&str> {
        node.children.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_single_root_scenario() {
        let tree = build_tree(&[rec("a", "", "Root"), rec("b", "a", "Child")]).unwrap();
        assert_eq!(tree.id, "a");
        assert_eq!(tree.topic, "Root");
        assert_eq!(child_ids(&tree), vec!["b"]);
        assert!(tree.children[0].children.is_empty());
    }

    #[test]
    fn test_unordered_input() {
        let tree = build_tree(&[
            rec("d", "b", "D"),
            rec("b", "a", "B"),
            rec("c", "a", "C"),
            rec("a", "", "A"),
        ])
        .unwrap();
        assert_eq!(tree.id, "a");
        assert_eq!(child_ids(&tree), vec!["b", "c"]);
        assert_eq!(child_ids(&tree.children[0]), vec!["d"]);
    }

    #[test]
    fn test_empty_input_gives_childless_synthetic_root() {
        let tree = build_tree(&[]).unwrap();
        assert_eq!(tree.id, SYNTHETIC_ROOT_ID);
        assert_eq!(tree.topic, SYNTHETIC_ROOT_TOPIC);
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_multiple_roots_get_synthetic_parent_in_input_order() {
        let tree = build_tree(&[
            rec("x", "", "X"),
            rec("y", "missing", "Y"),
            rec("z", "", "Z"),
            rec("x1", "x", "X1"),
        ])
        .unwrap();
        assert_eq!(tree.id, SYNTHETIC_ROOT_ID);
        assert_eq!(child_ids(&tree), vec!["x", "y", "z"]);
        assert_eq!(child_ids(&tree.children[0]), vec!["x1"]);
    }

    #[test]
    fn test_custom_root_topic() {
        let tree = TreeBuilder::with_root_topic("Notes").build(&[]).unwrap();
        assert_eq!(tree.topic, "Notes");
    }

    #[test]
    fn test_duplicate_ids_last_write_wins() {
        let tree = build_tree(&[
            rec("a", "", "Root"),
            rec("b", "a", "First"),
            rec("c", "a", "C"),
            rec("b", "a", "Second"),
        ])
        .unwrap();
        assert_eq!(child_ids(&tree), vec!["c", "b"]);
        assert_eq!(tree.children[1].topic, "Second");
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn test_self_parent_is_root_candidate() {
        let tree = build_tree(&[rec("a", "", "A"), rec("s", "s", "Self")]).unwrap();
        assert_eq!(tree.id, SYNTHETIC_ROOT_ID);
        assert_eq!(child_ids(&tree), vec!["a", "s"]);
    }

    #[test]
    fn test_cycle_terminates_and_keeps_tail() {
        // p <-> q cycle, t hangs off q, r is a true root
        let tree = build_tree(&[
            rec("r", "", "R"),
            rec("p", "q", "P"),
            rec("q", "p", "Q"),
            rec("t", "q", "T"),
        ])
        .unwrap();
        assert_eq!(tree.id, SYNTHETIC_ROOT_ID);
        assert_eq!(child_ids(&tree), vec!["r", "p", "q"]);
        assert_eq!(child_ids(&tree.children[2]), vec!["t"]);
        assert_eq!(tree.node_count(), 5);
    }

    #[test]
    fn test_pure_cycle_without_roots() {
        let tree =
            build_tree(&[rec("a", "c", "A"), rec("b", "a", "B"), rec("c", "b", "C")]).unwrap();
        assert_eq!(tree.id, SYNTHETIC_ROOT_ID);
        assert_eq!(child_ids(&tree), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_id_is_validation_error() {
        let err = build_tree(&[rec("a", "", "A"), rec(" ", "a", "Blank")]).unwrap_err();
        assert_eq!(err, ValidationError::EmptyId { index: 1 });
    }

    #[test]
    fn test_deep_chain_builds_without_overflow() {
        const DEPTH: usize = 100_000;
        let records: Vec<FlatRecord> = (0..DEPTH)
            .map(|i| {
                let parent = if i == 0 { String::new() } else { format!("n{}", i - 1) };
                FlatRecord::new(format!("n{i}"), parent, "T", "")
            })
            .rev()
            .collect();

        let tree = build_tree(&records).unwrap();
        assert_eq!(tree.id, "n0");
        assert_eq!(tree.node_count(), DEPTH);

        let mut deepest = &tree;
        let mut levels = 1;
        while let Some(child) = deepest.children.first() {
            deepest = child;
            levels += 1;
        }
        assert_eq!(levels, DEPTH);
        assert_eq!(deepest.id, format!("n{}", DEPTH - 1));
    }

    #[test]
    fn test_long_cycle_is_detected() {
        const LEN: usize = 50_000;
        let records: Vec<FlatRecord> = (0..LEN)
            .map(|i| FlatRecord::new(format!("n{i}"), format!("n{}", (i + 1) % LEN), "T", ""))
            .collect();
        let tree = build_tree(&records).unwrap();
        assert_eq!(tree.id, SYNTHETIC_ROOT_ID);
        assert_eq!(tree.children.len(), LEN);
    }

    #[test]
    fn test_synthetic_id_avoids_collision() {
        let tree = build_tree(&[rec(SYNTHETIC_ROOT_ID, "", "A"), rec("b", "", "B")]).unwrap();
        assert_eq!(tree.id, "__root__1");
    }

    #[test]
    fn test_records_from_value() {
        let value = json!([
            {"id": "a", "parentId": "", "topic": "Root", "content": "c"},
            {"id": 2, "parentId": null, "topic": "Two", "content": ""},
            {"id": "b", "topic": "B", "content": ""}
        ]);
        let records = records_from_value(&value).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].id, "2");
        assert!(records[1].is_parentless());
        assert!(records[2].is_parentless());

        let wrapped = json!({"nodes": [{"id": "a", "topic": "A", "content": ""}]});
        assert_eq!(records_from_value(&wrapped).unwrap().len(), 1);
    }

    #[test]
    fn test_records_from_value_names_offending_record() {
        let value = json!([
            {"id": "a", "parentId": "", "topic": "Root", "content": ""},
            {"id": "b", "parentId": "a", "content": ""}
        ]);
        assert_eq!(
            records_from_value(&value).unwrap_err(),
            ValidationError::MissingField {
                index: 1,
                field: "topic"
            }
        );
        assert_eq!(
            records_from_value(&json!([1])).unwrap_err(),
            ValidationError::NotAnObject { index: 0 }
        );
        assert_eq!(
            records_from_value(&json!({"id": "a"})).unwrap_err(),
            ValidationError::NotAnArray
        );
        assert_eq!(
            records_from_value(&json!([{"id": "", "topic": "t", "content": ""}])).unwrap_err(),
            ValidationError::EmptyId { index: 0 }
        );
    }

    #[test]
    fn test_normalize_value_fills_children() {
        let mut value = json!({
            "id": "a", "topic": "A", "content": "",
            "children": [{"id": "b", "topic": "B", "content": ""}]
        });
        normalize_value(&mut value);
        assert_eq!(value["children"][0]["children"], json!([]));

        let once = value.clone();
        normalize_value(&mut value);
        assert_eq!(value, once);

        let tree: MindMapNode = serde_json::from_value(value).unwrap();
        assert_eq!(tree.children.len(), 1);
    }

    #[test]
    fn test_normalize_value_replaces_null_children() {
        let mut value = json!({"id": "a", "topic": "A", "content": "", "children": null});
        normalize_value(&mut value);
        assert_eq!(value["children"], json!([]));
    }

    /// Records for a random tree: record `i` (i > 0) hangs off an earlier record
    fn arb_tree_records() -> impl Strategy<Value = Vec<FlatRecord>> {
        prop::collection::vec(any::<prop::sample::Index>(), 0..40).prop_map(|parents| {
            let mut records = vec![FlatRecord::new("n0", "", "Root", "")];
            for (i, parent) in parents.iter().enumerate() {
                let id = i + 1;
                let parent_idx = parent.index(id);
                records.push(FlatRecord::new(
                    format!("n{id}"),
                    format!("n{parent_idx}"),
                    format!("Topic {id}"),
                    "",
                ));
            }
            records
        })
    }

    fn shuffled(records: &[FlatRecord], seed: u64) -> Vec<FlatRecord> {
        let mut out = records.to_vec();
        let mut state = seed | 1;
        for i in (1..out.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            out.swap(i, (state % (i as u64 + 1)) as usize);
        }
        out
    }

    proptest! {
        #[test]
        fn single_root_reproduces_hierarchy(
            records in arb_tree_records(),
            seed in any::<u64>(),
        ) {
            let input = shuffled(&records, seed);
            let tree = build_tree(&input).unwrap();
            prop_assert_eq!(tree.id.as_str(), "n0");
            prop_assert_eq!(tree.node_count(), records.len());

            // Every edge in the tree matches the declared parent
            let parents: HashMap<&str, &str> = records
                .iter()
                .map(|r| (r.id.as_str(), r.parent_id.as_str()))
                .collect();
            for node in tree.preorder() {
                for child in &node.children {
                    prop_assert_eq!(parents[child.id.as_str()], node.id.as_str());
                }
            }
        }

        #[test]
        fn parentless_records_become_synthetic_children(count in 0usize..6, extra in 0usize..6) {
            prop_assume!(count != 1);
            let mut records: Vec<FlatRecord> =
                (0..count).map(|i| FlatRecord::new(format!("r{i}"), "", "Root", "")).collect();
            for j in 0..extra.min(count) {
                records.push(FlatRecord::new(format!("c{j}"), format!("r{j}"), "Child", ""));
            }
            let tree = build_tree(&records).unwrap();
            prop_assert_eq!(tree.id.as_str(), SYNTHETIC_ROOT_ID);
            let expected: Vec<String> = (0..count).map(|i| format!("r{i}")).collect();
            let actual: Vec<String> = tree.children.iter().map(|c| c.id.clone()).collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn arbitrary_parent_links_always_terminate(
            links in prop::collection::vec(0usize..12, 0..12),
        ) {
            let n = links.len();
            let records: Vec<FlatRecord> = links
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let parent = if *p >= n { String::new() } else { format!("n{p}") };
                    FlatRecord::new(format!("n{i}"), parent, "T", "")
                })
                .collect();
            let tree = build_tree(&records).unwrap();
            let total = tree.node_count();
            prop_assert!(total == n || total == n + 1);

            let mut ids: Vec<&str> = tree.preorder().map(|n| n.id()).collect();
            ids.sort_unstable();
            ids.dedup();
            prop_assert_eq!(ids.len(), total);
        }
    }
}
