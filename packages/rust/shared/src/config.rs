//! Application configuration for herbgraph.
//!
//! User config lives at `~/.herbgraph/herbgraph.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HerbGraphError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "herbgraph.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".herbgraph";

/// Known noise fragments that show up as hyperlinks in the effect columns.
const DEFAULT_STOP_WORDS: &[&str] = &[
    "ancient Greece",
    "Rome",
    "Mexico",
    "Tabasco",
    "Skin irritation",
    "vitamin C",
    "South Pacific",
    "citation needed",
    "morphine",
    "oil",
    "Aqueous",
    "extracts",
    "Native Americans",
    "American Cancer Society",
    "Kalahari",
    "San",
    "Philippines",
    "Chumash people",
    "Greek",
    "ancient Roman",
    "Digoxin",
    "a",
    "Middle Ages",
];

// ---------------------------------------------------------------------------
// Config structs (matching herbgraph.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source document locations.
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Graph store connection.
    #[serde(default)]
    pub graph: GraphConfig,

    /// Text extraction tuning.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Pipeline switches.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// `[sources]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Origin every relative path and table hyperlink is resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the primary herbs-and-effects listing.
    #[serde(default = "default_herbs_path")]
    pub herbs_path: String,

    /// Path of the secondary adverse-effects listing.
    #[serde(default = "default_adverse_effects_path")]
    pub adverse_effects_path: String,

    /// HTTP timeout per document.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            herbs_path: default_herbs_path(),
            adverse_effects_path: default_adverse_effects_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://en.wikipedia.org".into()
}
fn default_herbs_path() -> String {
    "/wiki/List_of_plants_used_in_herbalism".into()
}
fn default_adverse_effects_path() -> String {
    "/wiki/List_of_herbs_with_known_adverse_effects".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[graph]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Bolt endpoint.
    #[serde(default = "default_graph_uri")]
    pub uri: String,

    /// Database user.
    #[serde(default = "default_graph_user")]
    pub user: String,

    /// Name of the env var holding the password (never store the password itself).
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// Target database; the server default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_graph_uri(),
            user: default_graph_user(),
            password_env: default_password_env(),
            database: None,
        }
    }
}

fn default_graph_uri() -> String {
    "bolt://localhost:7687".into()
}
fn default_graph_user() -> String {
    "neo4j".into()
}
fn default_password_env() -> String {
    "HERBGRAPH_NEO4J_PASSWORD".into()
}

/// `[extraction]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Fragments rejected by exact match before normalization.
    #[serde(default = "default_stop_words")]
    pub stop_words: Vec<String>,

    /// Adverse-effect phrases must have fewer words than this.
    #[serde(default = "default_max_adverse_words")]
    pub max_adverse_words: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            stop_words: default_stop_words(),
            max_adverse_words: default_max_adverse_words(),
        }
    }
}

/// The built-in stop-list.
pub fn default_stop_words() -> Vec<String> {
    DEFAULT_STOP_WORDS.iter().map(|s| (*s).to_string()).collect()
}
fn default_max_adverse_words() -> usize {
    3
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Run the duplicate sweep after loading.
    #[serde(default = "default_true")]
    pub dedup: bool,

    /// Detach-delete every node before loading.
    #[serde(default)]
    pub wipe_before_load: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dedup: true,
            wipe_before_load: false,
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.herbgraph/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| HerbGraphError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.herbgraph/herbgraph.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| HerbGraphError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        HerbGraphError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| HerbGraphError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| HerbGraphError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| HerbGraphError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the graph password from the env var named in the config.
pub fn resolve_graph_password(config: &GraphConfig) -> Result<String> {
    let var_name = &config.password_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(HerbGraphError::config(format!(
            "graph password not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("herbs_path"));
        assert!(toml_str.contains("HERBGRAPH_NEO4J_PASSWORD"));
        assert!(toml_str.contains("citation needed"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.sources.timeout_secs, 30);
        assert_eq!(parsed.graph.uri, "bolt://localhost:7687");
        assert_eq!(parsed.extraction.max_adverse_words, 3);
        assert!(parsed.pipeline.dedup);
        assert!(!parsed.pipeline.wipe_before_load);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[sources]
base_url = "http://localhost:8080"

[extraction]
stop_words = ["noise"]

[pipeline]
wipe_before_load = true
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.sources.base_url, "http://localhost:8080");
        assert_eq!(config.sources.herbs_path, "/wiki/List_of_plants_used_in_herbalism");
        assert_eq!(config.extraction.stop_words, vec!["noise".to_string()]);
        assert_eq!(config.extraction.max_adverse_words, 3);
        assert!(config.pipeline.wipe_before_load);
        assert!(config.pipeline.dedup);
        assert!(config.graph.database.is_none());
    }

    #[test]
    fn missing_password_is_config_error() {
        let config = GraphConfig {
            password_env: "HG_TEST_NONEXISTENT_PASSWORD_12345".into(),
            ..GraphConfig::default()
        };
        let result = resolve_graph_password(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("password not found"));
    }
}
