//! Property-graph store abstraction.
//!
//! The [`GraphStore`] trait is the only way the pipeline touches the graph.
//! Every write is find-or-create keyed on `(label, name)`:
//! - [`Neo4jStore`]: Bolt-backed store built on `neo4rs`
//! - [`MemoryGraph`]: in-process store with the same semantics, used for dry
//!   runs and tests
//!
//! Statement text is produced by [`Statement`] from the closed vocabulary in
//! [`label`].

pub mod label;
mod memory;
mod neo4j;
pub mod statement;

use std::future::Future;

use herbgraph_shared::Result;
use serde::Serialize;

pub use label::{NodeAttr, NodeLabel, RelType};
pub use memory::{GraphSnapshot, MemoryGraph};
pub use neo4j::Neo4jStore;
pub use statement::{Statement, schema_statements};

// ---------------------------------------------------------------------------
// Node and edge specs
// ---------------------------------------------------------------------------

/// Logical identity of a node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeKey {
    pub label: NodeLabel,
    pub name: String,
}

impl NodeKey {
    pub fn new(label: NodeLabel, name: impl Into<String>) -> Self {
        Self {
            label,
            name: name.into(),
        }
    }
}

/// A node to find-or-create, with the attributes to set on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    pub key: NodeKey,
    pub attrs: Vec<(NodeAttr, String)>,
}

impl NodeSpec {
    pub fn new(label: NodeLabel, name: impl Into<String>) -> Self {
        Self {
            key: NodeKey::new(label, name),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, attr: NodeAttr, value: impl Into<String>) -> Self {
        self.attrs.push((attr, value.into()));
        self
    }
}

/// A relationship to find-or-create between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeSpec {
    pub rel: RelType,
    pub from: NodeKey,
    pub to: NodeKey,
}

impl EdgeSpec {
    pub fn new(rel: RelType, from: NodeKey, to: NodeKey) -> Self {
        Self { rel, from, to }
    }
}

/// Store-assigned node identity (`elementId` in Neo4j).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub String);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Nodes of one label sharing a dedup key, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub label: NodeLabel,
    pub key: String,
    /// `(id, stored name)` per member.
    pub members: Vec<(NodeId, String)>,
}

impl DuplicateGroup {
    /// The name the survivor must carry, when the label has one canonical form.
    pub fn canonical_name(&self) -> Option<&str> {
        self.label.has_normalized_names().then_some(self.key.as_str())
    }

    /// A member already named canonically wins; otherwise the oldest.
    fn survivor_index(&self) -> usize {
        self.canonical_name()
            .and_then(|canon| self.members.iter().position(|(_, name)| name == canon))
            .unwrap_or(0)
    }

    /// The node that survives the sweep.
    pub fn survivor(&self) -> Option<&NodeId> {
        self.members.get(self.survivor_index()).map(|(id, _)| id)
    }

    /// The survivor's name as currently stored.
    pub fn survivor_name(&self) -> Option<&str> {
        self.members
            .get(self.survivor_index())
            .map(|(_, name)| name.as_str())
    }

    /// The nodes to fold into the survivor and remove.
    pub fn redundant(&self) -> Vec<&NodeId> {
        let keep = self.survivor_index();
        self.members
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != keep)
            .map(|(_, (id, _))| id)
            .collect()
    }
}

/// Grouping key for duplicate detection; mirrors `toLower(trim(name))`.
pub fn dedup_key(name: &str) -> String {
    name.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// GraphStore
// ---------------------------------------------------------------------------

/// run(statement) → result, specialised to the operations the pipeline needs.
///
/// Each call is its own atomic unit. A [`herbgraph_shared::HerbGraphError::Graph`]
/// error concerns only that call; [`herbgraph_shared::HerbGraphError::Connection`]
/// means the store is gone.
pub trait GraphStore: Send + Sync {
    /// Find-or-create a node and set its attributes.
    fn merge_node(&self, node: &NodeSpec) -> impl Future<Output = Result<()>> + Send;

    /// Find-or-create a relationship. Fails if either endpoint is missing.
    fn merge_edge(&self, edge: &EdgeSpec) -> impl Future<Output = Result<()>> + Send;

    /// Groups of same-label nodes sharing a [`dedup_key`], oldest first.
    fn duplicate_groups(
        &self,
        label: NodeLabel,
    ) -> impl Future<Output = Result<Vec<DuplicateGroup>>> + Send;

    /// Move every relationship of `from` onto `to`. Returns how many moved.
    fn redirect_edges(&self, from: &NodeId, to: &NodeId)
    -> impl Future<Output = Result<u64>> + Send;

    /// Overwrite a node's `name`.
    fn rename_node(&self, id: &NodeId, name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Delete a node and all of its relationships.
    fn detach_delete(&self, id: &NodeId) -> impl Future<Output = Result<()>> + Send;

    fn count_nodes(&self, label: NodeLabel) -> impl Future<Output = Result<u64>> + Send;

    fn count_edges(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Delete everything. Returns the number of nodes removed.
    fn wipe(&self) -> impl Future<Output = Result<u64>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_folds_case_and_padding() {
        assert_eq!(dedup_key("  Nausea "), "nausea");
        assert_eq!(dedup_key("nausea"), dedup_key("NAUSEA"));
    }

    fn member(id: &str, name: &str) -> (NodeId, String) {
        (NodeId(id.into()), name.into())
    }

    #[test]
    fn duplicate_group_split() {
        let group = DuplicateGroup {
            label: NodeLabel::Disease,
            key: "nausea".into(),
            members: vec![member("0", "Nausea"), member("3", "nausea"), member("7", "NAUSEA ")],
        };
        assert_eq!(group.survivor(), Some(&NodeId("3".into())));
        assert_eq!(group.survivor_name(), Some("nausea"));
        assert_eq!(
            group.redundant(),
            vec![&NodeId("0".into()), &NodeId("7".into())]
        );

        let empty = DuplicateGroup {
            label: NodeLabel::Herb,
            key: "x".into(),
            members: vec![],
        };
        assert!(empty.survivor().is_none());
        assert!(empty.redundant().is_empty());
    }

    #[test]
    fn oldest_survives_without_canonical_member() {
        let diseases = DuplicateGroup {
            label: NodeLabel::Disease,
            key: "nausea".into(),
            members: vec![member("2", "Nausea"), member("5", "NAUSEA")],
        };
        assert_eq!(diseases.survivor(), Some(&NodeId("2".into())));
        assert_eq!(diseases.canonical_name(), Some("nausea"));

        let herbs = DuplicateGroup {
            label: NodeLabel::Herb,
            key: "aloe vera".into(),
            members: vec![member("1", "Aloe vera"), member("4", "aloe vera")],
        };
        assert_eq!(herbs.survivor(), Some(&NodeId("1".into())));
        assert!(herbs.canonical_name().is_none());
    }
}
