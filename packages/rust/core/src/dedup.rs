//! Post-load duplicate sweep.
//!
//! For every label in the closed vocabulary, nodes sharing a dedup key are
//! collapsed onto one survivor: the member already named with the key when
//! the label stores normalized names, otherwise the oldest. Relationships of
//! each duplicate are moved to the survivor before it is detach-deleted, and a
//! survivor whose name still differs from the key is renamed to it.

use herbgraph_graph::{DuplicateGroup, GraphStore, NodeLabel};
use herbgraph_shared::Result;
use tracing::{debug, info, instrument, warn};

/// Counters for one dedup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct DedupStats {
    pub groups: usize,
    pub removed: usize,
    pub edges_redirected: u64,
    /// Survivors renamed to their dedup key.
    pub renamed: usize,
    /// Duplicates left in place because a redirect or delete failed.
    pub failed: usize,
}

/// Collapse one group. A duplicate whose relationships could not be moved is
/// kept so nothing is lost.
async fn collapse<S: GraphStore>(store: &S, group: &DuplicateGroup, stats: &mut DedupStats) -> Result<()> {
    let Some(keep) = group.survivor() else {
        return Ok(());
    };

    for dup in group.redundant() {
        match store.redirect_edges(dup, keep).await {
            Ok(moved) => stats.edges_redirected += moved,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(label = %group.label, key = %group.key, node = %dup, error = %e, "redirect failed, keeping duplicate");
                stats.failed += 1;
                continue;
            }
        }

        match store.detach_delete(dup).await {
            Ok(()) => stats.removed += 1,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(label = %group.label, key = %group.key, node = %dup, error = %e, "delete failed");
                stats.failed += 1;
            }
        }
    }

    let Some(canon) = group.canonical_name() else {
        return Ok(());
    };
    if group.survivor_name() != Some(canon) {
        match store.rename_node(keep, canon).await {
            Ok(()) => stats.renamed += 1,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(label = %group.label, key = %group.key, node = %keep, error = %e, "rename failed");
                stats.failed += 1;
            }
        }
    }
    Ok(())
}

/// Run the sweep over every node label.
#[instrument(skip_all)]
pub async fn dedup<S: GraphStore>(store: &S) -> Result<DedupStats> {
    let mut stats = DedupStats::default();

    for label in NodeLabel::ALL {
        let groups = match store.duplicate_groups(label).await {
            Ok(groups) => groups,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(%label, error = %e, "duplicate lookup failed, label skipped");
                continue;
            }
        };

        for group in &groups {
            debug!(%label, key = %group.key, members = group.members.len(), "collapsing duplicates");
            collapse(store, group, &mut stats).await?;
        }
        stats.groups += groups.len();
    }

    info!(
        groups = stats.groups,
        removed = stats.removed,
        redirected = stats.edges_redirected,
        renamed = stats.renamed,
        failed = stats.failed,
        "dedup complete"
    );
    Ok(stats)
}
