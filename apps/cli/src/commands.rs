//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use herbgraph_core::{
    PipelineOptions, ProgressReporter, RunReport, SilentProgress, dedup, extract_records,
    run_pipeline,
};
use herbgraph_fetch::HttpFetcher;
use herbgraph_graph::{GraphStore, MemoryGraph, Neo4jStore, NodeLabel};
use herbgraph_shared::{
    AppConfig, init_config, load_config, load_config_from, resolve_graph_password,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// herbgraph: herbs, their effects, and their taxonomy as a property graph.
#[derive(Parser)]
#[command(
    name = "herbgraph",
    version,
    about = "Extract herbal-medicine tables and load them into a Neo4j knowledge graph.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.herbgraph/herbgraph.toml.
    #[arg(long, global = true, env = "HERBGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract everything and load it into the graph.
    Run {
        /// Delete every node before loading.
        #[arg(long)]
        wipe: bool,

        /// Skip the duplicate sweep after loading.
        #[arg(long)]
        no_dedup: bool,

        /// Load into an in-memory graph instead of Neo4j.
        #[arg(long)]
        dry_run: bool,
    },

    /// Extract and merge herb records, print them as JSON, touch no graph.
    Extract {
        /// Print compact JSON on one line.
        #[arg(long)]
        compact: bool,
    },

    /// Collapse duplicate nodes in an existing graph.
    Dedup,

    /// Delete every node and relationship in the graph.
    Wipe {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so `extract`
/// output stays valid JSON.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "herbgraph=info",
        1 => "herbgraph=debug",
        _ => "herbgraph=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run {
            wipe,
            no_dedup,
            dry_run,
        } => cmd_run(config_path, wipe, no_dedup, dry_run).await,
        Command::Extract { compact } => cmd_extract(config_path, compact).await,
        Command::Dedup => cmd_dedup(config_path).await,
        Command::Wipe { yes } => cmd_wipe(config_path, yes).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

async fn connect(config: &AppConfig) -> Result<Neo4jStore> {
    let password = resolve_graph_password(&config.graph)?;
    Ok(Neo4jStore::connect(&config.graph, &password).await?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config_path: Option<&Path>, wipe: bool, no_dedup: bool, dry_run: bool) -> Result<()> {
    let config = resolve_config(config_path)?;

    let mut opts = PipelineOptions::from_config(&config)?;
    opts.wipe |= wipe;
    opts.dedup &= !no_dedup;

    let fetcher = HttpFetcher::from_config(&config.sources)?;
    let reporter = CliProgress::new();

    info!(
        base_url = %config.sources.base_url,
        wipe = opts.wipe,
        dedup = opts.dedup,
        dry_run,
        "starting herbgraph run"
    );

    if dry_run {
        let store = MemoryGraph::new();
        let report = run_pipeline(&opts, &fetcher, &store, &reporter).await?;
        print_report(&report);
        print_counts(&store).await?;
    } else {
        let store = connect(&config).await?;
        let report = run_pipeline(&opts, &fetcher, &store, &reporter).await?;
        print_report(&report);
        print_counts(&store).await?;
    }

    Ok(())
}

async fn cmd_extract(config_path: Option<&Path>, compact: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    let opts = PipelineOptions::from_config(&config)?;
    let fetcher = HttpFetcher::from_config(&config.sources)?;

    let extraction = extract_records(&opts, &fetcher, &SilentProgress).await?;

    let json = if compact {
        serde_json::to_string(&extraction.herbs)?
    } else {
        serde_json::to_string_pretty(&extraction.herbs)?
    };
    println!("{json}");
    Ok(())
}

async fn cmd_dedup(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let store = connect(&config).await?;

    let stats = dedup(&store).await?;

    println!();
    println!("  Duplicate groups: {}", stats.groups);
    println!("  Nodes removed:    {}", stats.removed);
    println!("  Edges moved:      {}", stats.edges_redirected);
    println!("  Renamed:          {}", stats.renamed);
    println!("  Failures:         {}", stats.failed);
    println!();
    Ok(())
}

async fn cmd_wipe(config_path: Option<&Path>, yes: bool) -> Result<()> {
    if !yes {
        return Err(eyre!("refusing to delete the whole graph without --yes"));
    }

    let config = resolve_config(config_path)?;
    let store = connect(&config).await?;
    let removed = store.wipe().await?;

    info!(removed, "graph wiped");
    println!("Removed {removed} nodes.");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_report(report: &RunReport) {
    let ex = &report.extraction;
    let asm = &report.assembly;

    println!();
    println!("  Run complete!");
    println!("  Run ID:          {}", report.run_id);
    if let Some(wiped) = report.wiped {
        println!("  Wiped nodes:     {wiped}");
    }
    println!("  Herbs extracted: {}", ex.herbs_extracted);
    println!("  Malformed rows:  {}", ex.malformed_rows);
    println!(
        "  Adverse entries: {} matched, {} discarded",
        ex.adverse_matched, ex.adverse_unmatched
    );
    println!("  With taxonomy:   {}", ex.herbs_with_taxonomy);
    println!(
        "  Herbs written:   {} ({} skipped)",
        asm.herbs_written, asm.herbs_skipped
    );
    println!(
        "  Graph writes:    {} ({} failed)",
        asm.writes_attempted, asm.writes_failed
    );
    match report.dedup {
        Some(d) => println!("  Duplicates:      {} removed", d.removed),
        None => println!("  Duplicates:      sweep disabled"),
    }
    println!("  Time:            {:.1}s", report.elapsed_ms as f64 / 1000.0);
}

async fn print_counts<S: GraphStore>(store: &S) -> Result<()> {
    for label in NodeLabel::ALL {
        let n = store.count_nodes(label).await?;
        println!("  {:<16} {n}", format!("{label}:"));
    }
    println!("  {:<16} {}", "Relationships:", store.count_edges().await?);
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn taxonomy_resolved(&self, latin: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Taxonomy [{current}/{total}] {latin}"));
    }

    fn herb_written(&self, latin: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Writing [{current}/{total}] {latin}"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from(["herbgraph", "-vv", "run", "--wipe", "--dry-run"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Command::Run {
                wipe: true,
                no_dedup: false,
                dry_run: true
            }
        ));
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["herbgraph", "dedup", "--config", "/tmp/h.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/h.toml")));
    }
}
