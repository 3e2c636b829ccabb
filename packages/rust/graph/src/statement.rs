//! Parameterized Cypher statements.
//!
//! Labels, relationship types, and attribute keys come from the closed enums
//! in [`crate::label`]; every value is passed as a parameter.

use std::fmt::Write as _;

use crate::label::{NodeLabel, RelType};
use crate::{EdgeSpec, NodeSpec};

/// Parameter carrying a store-assigned node id.
pub const PARAM_ID: &str = "id";
/// Parameter carrying a duplicate's node id.
pub const PARAM_DUP: &str = "dup";
/// Parameter carrying a survivor's node id.
pub const PARAM_KEEP: &str = "keep";

/// Name of the scalar column returned by counting statements.
pub const COUNT_COLUMN: &str = "n";

/// A statement text and its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    text: String,
    params: Vec<(&'static str, String)>,
}

impl Statement {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.params.push((key, value.into()));
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// Find-or-create a node by `(label, name)` and set its attributes.
    /// New nodes are stamped with `created_at` so sweeps can find the oldest.
    pub fn merge_node(node: &NodeSpec) -> Self {
        let mut text = format!(
            "MERGE (n:{} {{name: $name}}) ON CREATE SET n.created_at = timestamp()",
            node.key.label
        );
        for (i, (attr, _)) in node.attrs.iter().enumerate() {
            let sep = if i == 0 { " SET " } else { ", " };
            let _ = write!(text, "{sep}n.{key} = ${key}", key = attr.as_str());
        }

        node.attrs.iter().fold(
            Self::new(text).param("name", node.key.name.clone()),
            |stmt, (attr, value)| stmt.param(attr.as_str(), value.clone()),
        )
    }

    /// Find-or-create a relationship between two existing nodes.
    ///
    /// Returns the number of relationships matched or created; zero means an
    /// endpoint is missing.
    pub fn merge_edge(edge: &EdgeSpec) -> Self {
        Self::new(format!(
            "MATCH (a:{from} {{name: $from}}) \
             MATCH (b:{to} {{name: $to}}) \
             MERGE (a)-[r:{rel}]->(b) \
             RETURN count(r) AS {COUNT_COLUMN}",
            from = edge.from.label,
            to = edge.to.label,
            rel = edge.rel,
        ))
        .param("from", edge.from.name.clone())
        .param("to", edge.to.name.clone())
    }

    /// Groups of nodes of one label sharing a dedup key, oldest node first.
    /// Nodes without `created_at` (written by something else) sort last.
    pub fn duplicate_groups(label: NodeLabel) -> Self {
        Self::new(format!(
            "MATCH (n:{label}) \
             WITH n ORDER BY n.created_at, elementId(n) \
             WITH toLower(trim(n.name)) AS key, collect(elementId(n)) AS ids, collect(n.name) AS names \
             WHERE size(ids) > 1 \
             RETURN key, ids, names ORDER BY key"
        ))
    }

    /// Overwrite one node's name.
    pub fn rename_node(id: &str, name: &str) -> Self {
        Self::new(format!(
            "MATCH (n) WHERE elementId(n) = ${PARAM_ID} SET n.name = $name RETURN count(n) AS {COUNT_COLUMN}"
        ))
        .param(PARAM_ID, id)
        .param("name", name)
    }

    /// Re-point a duplicate's outgoing relationships of one type at the survivor.
    pub fn redirect_outgoing(rel: RelType, dup: &str, keep: &str) -> Self {
        Self::new(format!(
            "MATCH (dup) WHERE elementId(dup) = ${PARAM_DUP} \
             MATCH (keep) WHERE elementId(keep) = ${PARAM_KEEP} \
             MATCH (dup)-[r:{rel}]->(other) WHERE other <> keep \
             MERGE (keep)-[:{rel}]->(other) \
             DELETE r \
             RETURN count(*) AS {COUNT_COLUMN}"
        ))
        .param(PARAM_DUP, dup)
        .param(PARAM_KEEP, keep)
    }

    /// Re-point a duplicate's incoming relationships of one type at the survivor.
    pub fn redirect_incoming(rel: RelType, dup: &str, keep: &str) -> Self {
        Self::new(format!(
            "MATCH (dup) WHERE elementId(dup) = ${PARAM_DUP} \
             MATCH (keep) WHERE elementId(keep) = ${PARAM_KEEP} \
             MATCH (other)-[r:{rel}]->(dup) WHERE other <> keep \
             MERGE (other)-[:{rel}]->(keep) \
             DELETE r \
             RETURN count(*) AS {COUNT_COLUMN}"
        ))
        .param(PARAM_DUP, dup)
        .param(PARAM_KEEP, keep)
    }

    /// Remove one node and every relationship touching it.
    pub fn detach_delete(id: &str) -> Self {
        Self::new(format!(
            "MATCH (n) WHERE elementId(n) = ${PARAM_ID} DETACH DELETE n RETURN count(*) AS {COUNT_COLUMN}"
        ))
        .param(PARAM_ID, id)
    }

    pub fn count_nodes(label: NodeLabel) -> Self {
        Self::new(format!("MATCH (n:{label}) RETURN count(n) AS {COUNT_COLUMN}"))
    }

    pub fn count_edges() -> Self {
        Self::new(format!("MATCH ()-[r]->() RETURN count(r) AS {COUNT_COLUMN}"))
    }

    /// Remove every node and relationship.
    pub fn wipe() -> Self {
        Self::new(format!("MATCH (n) DETACH DELETE n RETURN count(*) AS {COUNT_COLUMN}"))
    }

    /// Lookup index on `name` for one label. Not unique: duplicates are swept
    /// after loading, so a uniqueness constraint would reject existing data.
    pub fn name_index(label: NodeLabel) -> Self {
        Self::new(format!(
            "CREATE INDEX {index} IF NOT EXISTS FOR (n:{label}) ON (n.name)",
            index = format!("{}_name", label.as_str().to_lowercase()),
        ))
    }
}

/// Schema statements applied when a store is opened, one index per label.
pub fn schema_statements() -> Vec<Statement> {
    NodeLabel::ALL.into_iter().map(Statement::name_index).collect()
}
