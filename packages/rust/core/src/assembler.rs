//! Graph assembler.
//!
//! Turns merged herb records into an ordered list of find-or-create writes
//! and applies them one at a time. A failed write is logged and skipped; only
//! a lost connection stops the run.

use herbgraph_graph::{EdgeSpec, GraphStore, NodeAttr, NodeKey, NodeLabel, NodeSpec, RelType};
use herbgraph_shared::{HerbMap, HerbRecord, Result, TaxonRank};
use tracing::{debug, info, instrument, warn};

/// One find-or-create write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphWrite {
    Node(NodeSpec),
    Edge(EdgeSpec),
}

impl GraphWrite {
    fn describe(&self) -> String {
        match self {
            GraphWrite::Node(n) => format!("node {}({})", n.key.label, n.key.name),
            GraphWrite::Edge(e) => format!(
                "edge {}({})-[{}]->{}({})",
                e.from.label, e.from.name, e.rel, e.to.label, e.to.name
            ),
        }
    }
}

/// Counters for one assembly pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct AssemblyStats {
    /// Herbs whose writes were issued.
    pub herbs_written: usize,
    /// Herbs left out because their taxonomy chain is empty.
    pub herbs_skipped: usize,
    pub writes_attempted: usize,
    pub writes_failed: usize,
}

/// Progress hook for the assembly loop.
pub trait AssemblyProgress: Send + Sync {
    fn herb_written(&self, latin: &str, current: usize, total: usize);
}

impl AssemblyProgress for () {
    fn herb_written(&self, _latin: &str, _current: usize, _total: usize) {}
}

fn herb_key(herb: &HerbRecord) -> NodeKey {
    NodeKey::new(NodeLabel::Herb, herb.latin.clone())
}

fn taxon_key(taxon: &TaxonRank) -> NodeKey {
    NodeKey::new(NodeLabel::Taxon(taxon.rank), taxon.value.clone())
}

fn node(key: &NodeKey) -> GraphWrite {
    GraphWrite::Node(NodeSpec {
        key: key.clone(),
        attrs: Vec::new(),
    })
}

fn edge(rel: RelType, from: &NodeKey, to: &NodeKey) -> GraphWrite {
    GraphWrite::Edge(EdgeSpec::new(rel, from.clone(), to.clone()))
}

/// The ordered writes for one herb. Empty when the herb has no taxonomy.
///
/// Order: herb node; each cure effect (disease, `cures`); each adverse
/// effect (disease, `cause`); the broadest rank alone; each adjacent pair
/// (both ranks, then narrower `included_in` broader); finally herb
/// `included_in` its narrowest known rank.
pub fn plan_herb(herb: &HerbRecord) -> Vec<GraphWrite> {
    let Some(narrowest) = herb.narrowest_rank() else {
        return Vec::new();
    };

    let herb_node = herb_key(herb);
    let mut writes = Vec::new();

    let mut spec = NodeSpec::new(NodeLabel::Herb, herb.latin.clone());
    if !herb.name.is_empty() {
        spec = spec.with_attr(NodeAttr::CommonName, herb.name.clone());
    }
    if let Some(link) = &herb.link {
        spec = spec.with_attr(NodeAttr::Link, link.clone());
    }
    writes.push(GraphWrite::Node(spec));

    for (labels, rel) in [(&herb.effects, RelType::Cures), (&herb.adverse_effects, RelType::Cause)] {
        for label in labels {
            let disease = NodeKey::new(NodeLabel::Disease, label.clone());
            writes.push(node(&disease));
            writes.push(edge(rel, &herb_node, &disease));
        }
    }

    writes.push(node(&taxon_key(&herb.taxonomy[0])));
    for pair in herb.taxonomy.windows(2) {
        let broader = taxon_key(&pair[0]);
        let narrower = taxon_key(&pair[1]);
        writes.push(node(&broader));
        writes.push(node(&narrower));
        writes.push(edge(RelType::IncludedIn, &narrower, &broader));
    }

    writes.push(edge(RelType::IncludedIn, &herb_node, &taxon_key(narrowest)));
    writes
}

/// Apply one herb's writes in order. Returns `(attempted, failed)`.
#[instrument(skip_all, fields(latin = %herb.latin))]
pub async fn assemble_herb<S: GraphStore>(store: &S, herb: &HerbRecord) -> Result<(usize, usize)> {
    let writes = plan_herb(herb);
    let mut failed = 0;

    for write in &writes {
        let result = match write {
            GraphWrite::Node(spec) => store.merge_node(spec).await,
            GraphWrite::Edge(spec) => store.merge_edge(spec).await,
        };

        if let Err(e) = result {
            if e.is_fatal() {
                return Err(e);
            }
            warn!(write = %write.describe(), error = %e, "graph write failed, continuing");
            failed += 1;
        }
    }

    debug!(writes = writes.len(), failed, "herb assembled");
    Ok((writes.len(), failed))
}

/// Write every eligible herb, in map order, one after another.
#[instrument(skip_all, fields(herbs = herbs.len()))]
pub async fn assemble<S: GraphStore>(
    store: &S,
    herbs: &HerbMap,
    progress: &dyn AssemblyProgress,
) -> Result<AssemblyStats> {
    let mut stats = AssemblyStats::default();
    let eligible = herbs.values().filter(|h| h.is_graph_eligible()).count();

    for herb in herbs.values() {
        if !herb.is_graph_eligible() {
            debug!(latin = %herb.latin, "no taxonomy chain, not graphed");
            stats.herbs_skipped += 1;
            continue;
        }

        let (attempted, failed) = assemble_herb(store, herb).await?;
        stats.herbs_written += 1;
        stats.writes_attempted += attempted;
        stats.writes_failed += failed;
        progress.herb_written(&herb.latin, stats.herbs_written, eligible);
    }

    info!(
        written = stats.herbs_written,
        skipped = stats.herbs_skipped,
        writes = stats.writes_attempted,
        failed = stats.writes_failed,
        "assembly complete"
    );
    Ok(stats)
}
