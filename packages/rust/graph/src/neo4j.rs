//! Bolt-backed graph store.

use herbgraph_shared::{GraphConfig, HerbGraphError, Result};
use neo4rs::{ConfigBuilder, Graph, Query, query};
use tracing::{debug, info, instrument};

use crate::statement::{COUNT_COLUMN, Statement, schema_statements};
use crate::{DuplicateGroup, EdgeSpec, GraphStore, NodeId, NodeLabel, NodeSpec, RelType};

/// Primary graph handle wrapping a `neo4rs` connection pool.
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    /// Connect to the configured endpoint and ensure the name indexes exist.
    ///
    /// Every failure here is a [`HerbGraphError::Connection`].
    #[instrument(skip_all, fields(uri = %config.uri, user = %config.user))]
    pub async fn connect(config: &GraphConfig, password: &str) -> Result<Self> {
        let mut builder = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(password);
        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }

        let neo_config = builder
            .build()
            .map_err(|e| HerbGraphError::Connection(format!("invalid connection config: {e}")))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| HerbGraphError::Connection(format!("{}: {e}", config.uri)))?;

        let store = Self { graph };
        store.ensure_schema().await?;
        info!("connected to graph store");
        Ok(store)
    }

    /// Create the per-label name indexes if missing.
    async fn ensure_schema(&self) -> Result<()> {
        for stmt in schema_statements() {
            debug!(statement = stmt.text(), "ensuring index");
            self.graph
                .run(to_query(&stmt))
                .await
                .map_err(|e| HerbGraphError::Connection(format!("schema setup failed: {e}")))?;
        }
        Ok(())
    }

    /// Run a statement that returns a single count column.
    async fn scalar(&self, stmt: &Statement) -> Result<u64> {
        let mut stream = self
            .graph
            .execute(to_query(stmt))
            .await
            .map_err(graph_error)?;

        match stream.next().await.map_err(graph_error)? {
            Some(row) => {
                let n: i64 = row
                    .get(COUNT_COLUMN)
                    .map_err(|e| HerbGraphError::Graph(format!("bad count column: {e}")))?;
                Ok(n.max(0) as u64)
            }
            None => Ok(0),
        }
    }
}

fn to_query(stmt: &Statement) -> Query {
    stmt.params()
        .iter()
        .fold(query(stmt.text()), |q, (key, value)| q.param(key, value.clone()))
}

fn graph_error(e: neo4rs::Error) -> HerbGraphError {
    HerbGraphError::Graph(e.to_string())
}

impl GraphStore for Neo4jStore {
    async fn merge_node(&self, node: &NodeSpec) -> Result<()> {
        self.graph
            .run(to_query(&Statement::merge_node(node)))
            .await
            .map_err(graph_error)
    }

    async fn merge_edge(&self, edge: &EdgeSpec) -> Result<()> {
        let matched = self.scalar(&Statement::merge_edge(edge)).await?;
        if matched == 0 {
            return Err(HerbGraphError::Graph(format!(
                "{} edge endpoint not found: {}({}) -> {}({})",
                edge.rel, edge.from.label, edge.from.name, edge.to.label, edge.to.name
            )));
        }
        Ok(())
    }

    async fn duplicate_groups(&self, label: NodeLabel) -> Result<Vec<DuplicateGroup>> {
        let mut stream = self
            .graph
            .execute(to_query(&Statement::duplicate_groups(label)))
            .await
            .map_err(graph_error)?;

        let mut groups = Vec::new();
        while let Some(row) = stream.next().await.map_err(graph_error)? {
            let key: String = row
                .get("key")
                .map_err(|e| HerbGraphError::Graph(format!("bad key column: {e}")))?;
            let ids: Vec<String> = row
                .get("ids")
                .map_err(|e| HerbGraphError::Graph(format!("bad ids column: {e}")))?;
            let names: Vec<String> = row
                .get("names")
                .map_err(|e| HerbGraphError::Graph(format!("bad names column: {e}")))?;
            groups.push(DuplicateGroup {
                label,
                key,
                members: ids.into_iter().map(NodeId).zip(names).collect(),
            });
        }
        Ok(groups)
    }

    async fn redirect_edges(&self, from: &NodeId, to: &NodeId) -> Result<u64> {
        let mut moved = 0;
        for rel in RelType::ALL {
            moved += self
                .scalar(&Statement::redirect_outgoing(rel, &from.0, &to.0))
                .await?;
            moved += self
                .scalar(&Statement::redirect_incoming(rel, &from.0, &to.0))
                .await?;
        }
        Ok(moved)
    }

    async fn rename_node(&self, id: &NodeId, name: &str) -> Result<()> {
        let renamed = self.scalar(&Statement::rename_node(&id.0, name)).await?;
        if renamed == 0 {
            return Err(HerbGraphError::Graph(format!("node {id} not found")));
        }
        Ok(())
    }

    async fn detach_delete(&self, id: &NodeId) -> Result<()> {
        let removed = self.scalar(&Statement::detach_delete(&id.0)).await?;
        if removed == 0 {
            return Err(HerbGraphError::Graph(format!("node {id} not found")));
        }
        Ok(())
    }

    async fn count_nodes(&self, label: NodeLabel) -> Result<u64> {
        self.scalar(&Statement::count_nodes(label)).await
    }

    async fn count_edges(&self) -> Result<u64> {
        self.scalar(&Statement::count_edges()).await
    }

    async fn wipe(&self) -> Result<u64> {
        self.scalar(&Statement::wipe()).await
    }
}
