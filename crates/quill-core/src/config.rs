use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "quill.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuillConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub fusion: FusionSettings,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_lexical_index")]
    pub lexical_index: String,
    #[serde(default = "default_semantic_index")]
    pub semantic_index: String,
    #[serde(default = "default_backend_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            api_key: None,
            lexical_index: default_lexical_index(),
            semantic_index: default_semantic_index(),
            timeout_secs: default_backend_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionSettings {
    /// RRF smoothing constant `k`.
    #[serde(default = "default_rank_constant")]
    pub rank_constant: f64,
    /// Hits pulled from each source before fusing.
    #[serde(default = "default_candidate_depth")]
    pub candidate_depth: usize,
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self {
            rank_constant: default_rank_constant(),
            candidate_depth: default_candidate_depth(),
        }
    }
}

/// Knobs for the single-mode query builders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_exact_phrase_boost")]
    pub exact_phrase_boost: f64,
    #[serde(default = "default_sloppy_phrase_boost")]
    pub sloppy_phrase_boost: f64,
    #[serde(default = "default_sloppy_phrase_slop")]
    pub sloppy_phrase_slop: u32,
    #[serde(default = "default_partial_phrase_boost")]
    pub partial_phrase_boost: f64,
    #[serde(default = "default_partial_phrase_slop")]
    pub partial_phrase_slop: u32,
    #[serde(default = "default_terms_boost")]
    pub terms_boost: f64,
    /// Share of query terms a fallback match must contain, e.g. `"60%"`.
    #[serde(default = "default_minimum_should_match")]
    pub minimum_should_match: String,
    #[serde(default = "default_facet_size")]
    pub facet_size: usize,
    #[serde(default = "default_fragment_size")]
    pub fragment_size: usize,
    #[serde(default = "default_text_field")]
    pub text_field: String,
    #[serde(default = "default_sparse_field")]
    pub sparse_field: String,
    #[serde(default = "default_sparse_inference_id")]
    pub sparse_inference_id: String,
    #[serde(default = "default_dense_field")]
    pub dense_field: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            exact_phrase_boost: default_exact_phrase_boost(),
            sloppy_phrase_boost: default_sloppy_phrase_boost(),
            sloppy_phrase_slop: default_sloppy_phrase_slop(),
            partial_phrase_boost: default_partial_phrase_boost(),
            partial_phrase_slop: default_partial_phrase_slop(),
            terms_boost: default_terms_boost(),
            minimum_should_match: default_minimum_should_match(),
            facet_size: default_facet_size(),
            fragment_size: default_fragment_size(),
            text_field: default_text_field(),
            sparse_field: default_sparse_field(),
            sparse_inference_id: default_sparse_inference_id(),
            dense_field: default_dense_field(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Lines shown on each side of a looked-up document.
    #[serde(default = "default_context_window")]
    pub context_window: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            request_timeout_secs: default_request_timeout_secs(),
            context_window: default_context_window(),
        }
    }
}

/// Read a config file. A missing file yields defaults.
pub fn load_config_file(path: &Path) -> Result<QuillConfig> {
    if !path.exists() {
        return Ok(QuillConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<QuillConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Pick the config file to load.
///
/// Precedence: explicit path, `./quill.toml`, `<config_dir>/quill/config.toml`.
/// Returns `None` when nothing exists and no explicit path was given.
pub fn discover_config_path(explicit: Option<&Path>, cwd: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = cwd.join(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("quill/config.toml"))
        .filter(|path| path.exists())
}

/// Overlay environment variables on a loaded config.
///
/// `lookup` abstracts the process environment so callers and tests can
/// inject values.
pub fn apply_env_overrides(
    mut config: QuillConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> QuillConfig {
    let first = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| lookup(key).filter(|value| !value.trim().is_empty()))
    };

    if let Some(url) = first(&["QUILL_BACKEND_URL", "ELASTICSEARCH_URL"]) {
        config.backend.url = url;
    }
    if let Some(key) = first(&["QUILL_API_KEY", "ELASTIC_API_KEY"]) {
        config.backend.api_key = Some(key);
    }
    if let Some(bind) = first(&["QUILL_BIND"]) {
        config.server.bind = bind;
    }

    config
}

/// Load the effective configuration: file (if any) plus environment.
pub fn resolve_config(explicit: Option<&Path>, cwd: &Path) -> Result<QuillConfig> {
    let config = match discover_config_path(explicit, cwd) {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            if explicit.is_some() && !path.exists() {
                anyhow::bail!("config file {} does not exist", path.display());
            }
            load_config_file(&path)?
        }
        None => QuillConfig::default(),
    };

    Ok(apply_env_overrides(config, |key| std::env::var(key).ok()))
}

fn default_backend_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_lexical_index() -> String {
    "shakespeare".to_string()
}

fn default_semantic_index() -> String {
    "shakespeare-semantic".to_string()
}

const fn default_backend_timeout_secs() -> u64 {
    10
}

const fn default_rank_constant() -> f64 {
    60.0
}

const fn default_candidate_depth() -> usize {
    100
}

const fn default_exact_phrase_boost() -> f64 {
    10.0
}

const fn default_sloppy_phrase_boost() -> f64 {
    5.0
}

const fn default_sloppy_phrase_slop() -> u32 {
    3
}

const fn default_partial_phrase_boost() -> f64 {
    2.0
}

const fn default_partial_phrase_slop() -> u32 {
    2
}

const fn default_terms_boost() -> f64 {
    1.0
}

fn default_minimum_should_match() -> String {
    "60%".to_string()
}

const fn default_facet_size() -> usize {
    50
}

const fn default_fragment_size() -> usize {
    200
}

fn default_text_field() -> String {
    "text_entry".to_string()
}

fn default_sparse_field() -> String {
    "text_entry_embedding".to_string()
}

fn default_sparse_inference_id() -> String {
    ".elser-2-elasticsearch".to_string()
}

fn default_dense_field() -> String {
    "text_entry_dense".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_context_window() -> u64 {
    50
}
