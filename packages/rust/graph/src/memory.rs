//! In-process graph with the same find-or-create semantics as the Bolt store.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};

use herbgraph_shared::{HerbGraphError, Result};

use crate::{
    DuplicateGroup, EdgeSpec, GraphStore, NodeAttr, NodeId, NodeKey, NodeLabel, NodeSpec, RelType,
    dedup_key,
};

#[derive(Debug, Clone)]
struct MemoryNode {
    key: NodeKey,
    attrs: BTreeMap<NodeAttr, String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    nodes: BTreeMap<u64, MemoryNode>,
    edges: BTreeSet<(u64, RelType, u64)>,
    failing_names: HashSet<String>,
    disconnected: bool,
}

impl MemoryState {
    fn check_connected(&self) -> Result<()> {
        if self.disconnected {
            return Err(HerbGraphError::Connection("memory graph disconnected".into()));
        }
        Ok(())
    }

    fn check_writable(&self, name: &str) -> Result<()> {
        self.check_connected()?;
        if self.failing_names.contains(name) {
            return Err(HerbGraphError::Graph(format!("write rejected for '{name}'")));
        }
        Ok(())
    }

    fn ids_for(&self, key: &NodeKey) -> Vec<u64> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.key == *key)
            .map(|(id, _)| *id)
            .collect()
    }

    fn insert(&mut self, key: NodeKey) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            MemoryNode {
                key,
                attrs: BTreeMap::new(),
            },
        );
        id
    }
}

/// Order-independent view of a graph's contents, for comparing states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSnapshot {
    /// Every node, duplicates included, with its attributes.
    pub nodes: Vec<(NodeKey, BTreeMap<NodeAttr, String>)>,
    /// Every relationship by endpoint identity.
    pub edges: BTreeSet<(RelType, NodeKey, NodeKey)>,
}

impl GraphSnapshot {
    pub fn has_node(&self, key: &NodeKey) -> bool {
        self.nodes.iter().any(|(k, _)| k == key)
    }

    pub fn count_nodes(&self, key: &NodeKey) -> usize {
        self.nodes.iter().filter(|(k, _)| k == key).count()
    }

    pub fn has_edge(&self, edge: &EdgeSpec) -> bool {
        self.edges
            .contains(&(edge.rel, edge.from.clone(), edge.to.clone()))
    }

    pub fn edges_of_type(&self, rel: RelType) -> usize {
        self.edges.iter().filter(|(r, _, _)| *r == rel).count()
    }
}

/// A [`GraphStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: Mutex<MemoryState>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| HerbGraphError::Graph("memory graph lock poisoned".into()))
    }

    /// Create a node without looking for an existing one, the way an
    /// unconditional `CREATE` or a racing writer would.
    pub fn insert_unmerged(&self, node: &NodeSpec) -> Result<NodeId> {
        let mut state = self.lock()?;
        let id = state.insert(node.key.clone());
        if let Some(stored) = state.nodes.get_mut(&id) {
            stored.attrs.extend(node.attrs.iter().cloned());
        }
        Ok(NodeId(id.to_string()))
    }

    /// Create a relationship between two specific nodes.
    pub fn insert_edge_between(&self, from: &NodeId, rel: RelType, to: &NodeId) -> Result<()> {
        let mut state = self.lock()?;
        let from = parse_id(from)?;
        let to = parse_id(to)?;
        if !state.nodes.contains_key(&from) || !state.nodes.contains_key(&to) {
            return Err(HerbGraphError::Graph("edge endpoint not found".into()));
        }
        state.edges.insert((from, rel, to));
        Ok(())
    }

    /// Make every write touching a node with this name fail.
    pub fn fail_writes_for(&self, name: impl Into<String>) -> Result<()> {
        self.lock()?.failing_names.insert(name.into());
        Ok(())
    }

    /// Make every call fail as if the connection had dropped.
    pub fn disconnect(&self) -> Result<()> {
        self.lock()?.disconnected = true;
        Ok(())
    }

    pub fn snapshot(&self) -> Result<GraphSnapshot> {
        let state = self.lock()?;
        let mut nodes: Vec<_> = state
            .nodes
            .values()
            .map(|n| (n.key.clone(), n.attrs.clone()))
            .collect();
        nodes.sort();

        let edges = state
            .edges
            .iter()
            .filter_map(|(from, rel, to)| {
                let from = state.nodes.get(from)?;
                let to = state.nodes.get(to)?;
                Some((*rel, from.key.clone(), to.key.clone()))
            })
            .collect();

        Ok(GraphSnapshot { nodes, edges })
    }
}

fn parse_id(id: &NodeId) -> Result<u64> {
    id.0
        .parse()
        .map_err(|_| HerbGraphError::Graph(format!("not a memory node id: {id}")))
}

impl GraphStore for MemoryGraph {
    async fn merge_node(&self, node: &NodeSpec) -> Result<()> {
        let mut state = self.lock()?;
        state.check_writable(&node.key.name)?;

        let id = match state.ids_for(&node.key).first() {
            Some(id) => *id,
            None => state.insert(node.key.clone()),
        };
        if let Some(stored) = state.nodes.get_mut(&id) {
            stored.attrs.extend(node.attrs.iter().cloned());
        }
        Ok(())
    }

    async fn merge_edge(&self, edge: &EdgeSpec) -> Result<()> {
        let mut state = self.lock()?;
        state.check_writable(&edge.from.name)?;
        state.check_writable(&edge.to.name)?;

        let froms = state.ids_for(&edge.from);
        let tos = state.ids_for(&edge.to);
        if froms.is_empty() || tos.is_empty() {
            return Err(HerbGraphError::Graph(format!(
                "{} edge endpoint not found: {}({}) -> {}({})",
                edge.rel, edge.from.label, edge.from.name, edge.to.label, edge.to.name
            )));
        }

        for from in &froms {
            for to in &tos {
                state.edges.insert((*from, edge.rel, *to));
            }
        }
        Ok(())
    }

    async fn duplicate_groups(&self, label: NodeLabel) -> Result<Vec<DuplicateGroup>> {
        let state = self.lock()?;
        state.check_connected()?;

        let mut groups: BTreeMap<String, Vec<(NodeId, String)>> = BTreeMap::new();
        for (id, node) in state.nodes.iter().filter(|(_, n)| n.key.label == label) {
            groups
                .entry(dedup_key(&node.key.name))
                .or_default()
                .push((NodeId(id.to_string()), node.key.name.clone()));
        }

        Ok(groups
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(key, members)| DuplicateGroup { label, key, members })
            .collect())
    }

    async fn redirect_edges(&self, from: &NodeId, to: &NodeId) -> Result<u64> {
        let mut state = self.lock()?;
        state.check_connected()?;
        let dup = parse_id(from)?;
        let keep = parse_id(to)?;

        let touching: Vec<_> = state
            .edges
            .iter()
            .filter(|(a, _, b)| (*a == dup && *b != keep) || (*b == dup && *a != keep))
            .copied()
            .collect();

        for edge in &touching {
            state.edges.remove(edge);
            let (a, rel, b) = *edge;
            let a = if a == dup { keep } else { a };
            let b = if b == dup { keep } else { b };
            state.edges.insert((a, rel, b));
        }
        Ok(touching.len() as u64)
    }

    async fn rename_node(&self, id: &NodeId, name: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.check_writable(name)?;
        let id = parse_id(id)?;

        match state.nodes.get_mut(&id) {
            Some(node) => {
                node.key.name = name.to_string();
                Ok(())
            }
            None => Err(HerbGraphError::Graph(format!("node {id} not found"))),
        }
    }

    async fn detach_delete(&self, id: &NodeId) -> Result<()> {
        let mut state = self.lock()?;
        state.check_connected()?;
        let id = parse_id(id)?;

        if state.nodes.remove(&id).is_none() {
            return Err(HerbGraphError::Graph(format!("node {id} not found")));
        }
        state.edges.retain(|(a, _, b)| *a != id && *b != id);
        Ok(())
    }

    async fn count_nodes(&self, label: NodeLabel) -> Result<u64> {
        let state = self.lock()?;
        state.check_connected()?;
        Ok(state.nodes.values().filter(|n| n.key.label == label).count() as u64)
    }

    async fn count_edges(&self) -> Result<u64> {
        let state = self.lock()?;
        state.check_connected()?;
        Ok(state.edges.len() as u64)
    }

    async fn wipe(&self) -> Result<u64> {
        let mut state = self.lock()?;
        state.check_connected()?;
        let removed = state.nodes.len() as u64;
        state.nodes.clear();
        state.edges.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disease(name: &str) -> NodeSpec {
        NodeSpec::new(NodeLabel::Disease, name)
    }

    fn herb(name: &str) -> NodeSpec {
        NodeSpec::new(NodeLabel::Herb, name)
    }

    #[tokio::test]
    async fn merge_node_is_find_or_create() {
        let graph = MemoryGraph::new();
        graph.merge_node(&disease("nausea")).await.unwrap();
        graph.merge_node(&disease("nausea")).await.unwrap();
        graph.merge_node(&disease("fever")).await.unwrap();

        assert_eq!(graph.count_nodes(NodeLabel::Disease).await.unwrap(), 2);
        assert_eq!(graph.count_nodes(NodeLabel::Herb).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn merge_node_updates_attributes() {
        let graph = MemoryGraph::new();
        graph.merge_node(&herb("Aloe vera")).await.unwrap();
        graph
            .merge_node(&herb("Aloe vera").with_attr(NodeAttr::CommonName, "Aloe"))
            .await
            .unwrap();

        let snap = graph.snapshot().unwrap();
        assert_eq!(snap.nodes.len(), 1);
        assert_eq!(snap.nodes[0].1.get(&NodeAttr::CommonName).map(String::as_str), Some("Aloe"));
    }

    #[tokio::test]
    async fn merge_edge_requires_endpoints() {
        let graph = MemoryGraph::new();
        graph.merge_node(&herb("Aloe vera")).await.unwrap();

        let edge = EdgeSpec::new(RelType::Cures, herb("Aloe vera").key, disease("burns").key);
        assert!(graph.merge_edge(&edge).await.is_err());

        graph.merge_node(&disease("burns")).await.unwrap();
        graph.merge_edge(&edge).await.unwrap();
        graph.merge_edge(&edge).await.unwrap();
        assert_eq!(graph.count_edges().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_groups_fold_case_and_keep_oldest_first() {
        let graph = MemoryGraph::new();
        let first = graph.insert_unmerged(&disease("Nausea ")).unwrap();
        graph.insert_unmerged(&disease("NAUSEA")).unwrap();
        graph.insert_unmerged(&disease("fever")).unwrap();

        let groups = graph.duplicate_groups(NodeLabel::Disease).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "nausea");
        assert_eq!(groups[0].members.len(), 2);
        assert_eq!(groups[0].survivor(), Some(&first));
        assert_eq!(groups[0].survivor_name(), Some("Nausea "));
        assert!(graph.duplicate_groups(NodeLabel::Herb).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn redirect_then_delete_keeps_relationships() {
        let graph = MemoryGraph::new();
        let aloe = graph.insert_unmerged(&herb("Aloe vera")).unwrap();
        let keep = graph.insert_unmerged(&disease("nausea")).unwrap();
        let dup = graph.insert_unmerged(&disease("NAUSEA")).unwrap();
        graph.insert_edge_between(&aloe, RelType::Cause, &dup).unwrap();

        assert_eq!(graph.redirect_edges(&dup, &keep).await.unwrap(), 1);
        graph.detach_delete(&dup).await.unwrap();

        let snap = graph.snapshot().unwrap();
        assert!(snap.has_edge(&EdgeSpec::new(
            RelType::Cause,
            herb("Aloe vera").key,
            disease("nausea").key,
        )));
        assert_eq!(graph.count_nodes(NodeLabel::Disease).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rename_changes_identity() {
        let graph = MemoryGraph::new();
        let id = graph.insert_unmerged(&disease("Nausea")).unwrap();
        graph.rename_node(&id, "nausea").await.unwrap();

        let snap = graph.snapshot().unwrap();
        assert!(snap.has_node(&disease("nausea").key));
        assert!(!snap.has_node(&disease("Nausea").key));

        graph.merge_node(&disease("nausea")).await.unwrap();
        assert_eq!(graph.count_nodes(NodeLabel::Disease).await.unwrap(), 1);
        assert!(graph.rename_node(&NodeId("99".into()), "x").await.is_err());
    }

    #[tokio::test]
    async fn injected_failures() {
        let graph = MemoryGraph::new();
        graph.fail_writes_for("poison").unwrap();
        let err = graph.merge_node(&disease("poison")).await.unwrap_err();
        assert!(!err.is_fatal());

        graph.disconnect().unwrap();
        let err = graph.merge_node(&disease("fever")).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn wipe_clears_everything() {
        let graph = MemoryGraph::new();
        graph.merge_node(&disease("a")).await.unwrap();
        graph.merge_node(&herb("b")).await.unwrap();
        assert_eq!(graph.wipe().await.unwrap(), 2);
        assert_eq!(graph.count_edges().await.unwrap(), 0);
        assert!(graph.snapshot().unwrap().nodes.is_empty());
    }
}
