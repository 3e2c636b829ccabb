//! End-to-end run: listings → merge → taxonomy → graph → dedup.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{Span, field, info, instrument, warn};
use url::Url;

use herbgraph_extract::{
    AdverseMap, AdverseOptions, StopList, extract_adverse_effects, extract_herbs,
    merge_adverse_effects, resolve_taxonomy,
};
use herbgraph_fetch::{DocumentFetcher, SourceLocator};
use herbgraph_graph::GraphStore;
use herbgraph_shared::{AppConfig, HerbMap, Result, RunId};

use crate::assembler::{self, AssemblyProgress, AssemblyStats};
use crate::dedup::{self, DedupStats};

/// Everything a run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub locator: SourceLocator,
    pub stop: StopList,
    pub adverse: AdverseOptions,
    /// Detach-delete every node before loading.
    pub wipe: bool,
    /// Run the duplicate sweep after loading.
    pub dedup: bool,
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            locator: SourceLocator::from_config(&config.sources)?,
            stop: StopList::new(&config.extraction.stop_words),
            adverse: AdverseOptions {
                max_words: config.extraction.max_adverse_words,
            },
            wipe: config.pipeline.wipe_before_load,
            dedup: config.pipeline.dedup,
        })
    }
}

/// Extraction-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub herbs_extracted: usize,
    pub malformed_rows: usize,
    pub adverse_matched: usize,
    pub adverse_unmatched: usize,
    pub herbs_with_taxonomy: usize,
}

/// Merged records plus how they were obtained.
#[derive(Debug, Default)]
pub struct Extraction {
    pub herbs: HerbMap,
    pub stats: ExtractionStats,
}

/// Summary of one full run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Nodes removed by the pre-load wipe, when one ran.
    pub wiped: Option<u64>,
    pub extraction: ExtractionStats,
    pub assembly: AssemblyStats,
    /// `None` when the sweep was disabled.
    pub dedup: Option<DedupStats>,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each herb's taxonomy lookup.
    fn taxonomy_resolved(&self, latin: &str, current: usize, total: usize);
    /// Called after each herb's graph writes.
    fn herb_written(&self, latin: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn taxonomy_resolved(&self, _latin: &str, _current: usize, _total: usize) {}
    fn herb_written(&self, _latin: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &RunReport) {}
}

/// Adapts a `ProgressReporter` to the assembler's progress hook.
struct PipelineAssemblyProgress<'a> {
    inner: &'a dyn ProgressReporter,
}

impl AssemblyProgress for PipelineAssemblyProgress<'_> {
    fn herb_written(&self, latin: &str, current: usize, total: usize) {
        self.inner.herb_written(latin, current, total);
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Fetch a listing body, or `None` after logging the failure.
async fn fetch_listing<F: DocumentFetcher>(fetcher: &F, url: &Url, what: &str) -> Option<String> {
    match fetcher.fetch(url).await {
        Ok(doc) => {
            info!(%url, bytes = doc.body.len(), hash = %doc.content_hash, "{what} fetched");
            Some(doc.body)
        }
        Err(e) => {
            warn!(%url, error = %e, "{what} unavailable, continuing without it");
            None
        }
    }
}

/// Build the merged herb records: both listings, the merge, then one
/// taxonomy lookup per herb, sequentially.
///
/// Fetch and parse failures degrade to empty data. Only a bad source
/// location is an error.
#[instrument(skip_all)]
pub async fn extract_records<F: DocumentFetcher>(
    opts: &PipelineOptions,
    fetcher: &F,
    progress: &dyn ProgressReporter,
) -> Result<Extraction> {
    let herbs_url = opts.locator.herbs_url()?;
    let adverse_url = opts.locator.adverse_effects_url()?;
    let mut stats = ExtractionStats::default();

    // --- Primary listing ---
    progress.phase("Extracting herb listing");
    let primary = match fetch_listing(fetcher, &herbs_url, "herb listing").await {
        Some(body) => extract_herbs(&body, opts.locator.base(), &opts.stop),
        None => Default::default(),
    };
    stats.herbs_extracted = primary.herbs.len();
    stats.malformed_rows = primary.malformed;

    // --- Secondary listing + merge ---
    progress.phase("Extracting adverse effects");
    let adverse = match fetch_listing(fetcher, &adverse_url, "adverse-effect listing").await {
        Some(body) => extract_adverse_effects(&body, &opts.stop, &opts.adverse),
        None => AdverseMap::new(),
    };
    let merged = merge_adverse_effects(primary.herbs, &adverse);
    stats.adverse_matched = merged.matched;
    stats.adverse_unmatched = merged.unmatched;
    let mut herbs = merged.herbs;

    // --- Taxonomy ---
    progress.phase("Resolving taxonomy");
    let total = herbs.len();
    for (i, herb) in herbs.values_mut().enumerate() {
        herb.taxonomy = match herb.link.as_deref().map(Url::parse) {
            Some(Ok(url)) => resolve_taxonomy(fetcher, &url).await,
            Some(Err(e)) => {
                warn!(latin = %herb.latin, error = %e, "bad detail link, herb will not be graphed");
                Vec::new()
            }
            None => {
                warn!(latin = %herb.latin, "no detail link, herb will not be graphed");
                Vec::new()
            }
        };
        if herb.is_graph_eligible() {
            stats.herbs_with_taxonomy += 1;
        }
        progress.taxonomy_resolved(&herb.latin, i + 1, total);
    }

    info!(
        herbs = stats.herbs_extracted,
        malformed = stats.malformed_rows,
        adverse_matched = stats.adverse_matched,
        adverse_unmatched = stats.adverse_unmatched,
        with_taxonomy = stats.herbs_with_taxonomy,
        "extraction complete"
    );
    Ok(Extraction { herbs, stats })
}

// ---------------------------------------------------------------------------
// Full run
// ---------------------------------------------------------------------------

/// Run the full pipeline against one store.
///
/// 1. Optional wipe
/// 2. Extraction (listings, merge, taxonomy)
/// 3. Assembly
/// 4. Dedup, after every write has completed
///
/// Only fatal errors (lost connection, bad configuration) are returned.
#[instrument(skip_all, fields(run_id = tracing::field::Empty))]
pub async fn run_pipeline<F: DocumentFetcher, S: GraphStore>(
    opts: &PipelineOptions,
    fetcher: &F,
    store: &S,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let start = Instant::now();
    let started_at = Utc::now();
    let run_id = RunId::new();
    Span::current().record("run_id", field::display(&run_id));

    info!(%run_id, wipe = opts.wipe, dedup = opts.dedup, "starting run");

    // --- Phase 1: Wipe ---
    let wiped = if opts.wipe {
        progress.phase("Wiping graph");
        let removed = store.wipe().await?;
        info!(removed, "graph wiped");
        Some(removed)
    } else {
        None
    };

    // --- Phase 2: Extraction ---
    let extraction = extract_records(opts, fetcher, progress).await?;

    // --- Phase 3: Assembly ---
    progress.phase("Writing graph");
    let adapter = PipelineAssemblyProgress { inner: progress };
    let assembly = assembler::assemble(store, &extraction.herbs, &adapter).await?;

    // --- Phase 4: Dedup ---
    let dedup = if opts.dedup {
        progress.phase("Removing duplicates");
        Some(dedup::dedup(store).await?)
    } else {
        None
    };

    let report = RunReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        wiped,
        extraction: extraction.stats,
        assembly,
        dedup,
    };

    progress.done(&report);

    info!(
        run_id = %report.run_id,
        herbs = report.extraction.herbs_extracted,
        written = report.assembly.herbs_written,
        failed_writes = report.assembly.writes_failed,
        duplicates_removed = report.dedup.map(|d| d.removed).unwrap_or(0),
        elapsed_ms = report.elapsed_ms,
        "run complete"
    );

    Ok(report)
}
