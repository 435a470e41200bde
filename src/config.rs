use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl Config {
    /// Load configuration: defaults, then the global or explicit file, then
    /// `NOTESIFT_*` environment overrides.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("NOTESIFT_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        } else if let Some(global) = Self::load_global()? {
            config.merge_patch(global);
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document on top of the defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let patch: ConfigPatch = toml::from_str(raw)
            .map_err(|err| SearchError::Config(format!("parse config: {err}")))?;
        let mut config = Self::default();
        config.merge_patch(patch);
        config.validate()?;
        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("notesift/config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| SearchError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| SearchError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.index {
            self.index.merge(patch);
        }
        if let Some(patch) = patch.search {
            self.search.merge(patch);
        }
        if let Some(patch) = patch.ranking {
            self.ranking.merge(patch);
        }
        if let Some(patch) = patch.embedding {
            self.embedding.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let env = EnvLookup { lookup };

        if let Some(value) = env.string("NOTESIFT_DB_PATH") {
            self.index.db_path = Some(PathBuf::from(value));
        }

        if let Some(value) = env.parse::<usize>("NOTESIFT_SEARCH_LIMIT")? {
            self.search.default_limit = value;
        }
        if let Some(value) = env.parse::<usize>("NOTESIFT_SNIPPET_LENGTH")? {
            self.search.snippet_length = value;
        }
        if let Some(value) = env.parse::<f32>("NOTESIFT_RRF_K")? {
            self.search.rrf_k = value;
        }

        if let Some(value) = env.string("NOTESIFT_EMBEDDING_BACKEND") {
            self.embedding.backend = value;
        }
        if let Some(value) = env.parse::<usize>("NOTESIFT_EMBEDDING_DIMS")? {
            self.embedding.dims = value;
        }
        if let Some(value) = env.bool("NOTESIFT_AUTO_EMBED") {
            self.embedding.auto_embed = value;
        }
        if let Some(value) = env.string("NOTESIFT_EMBEDDING_API_URL") {
            self.embedding.api_url = Some(value);
        }
        if let Some(value) = env.string("NOTESIFT_EMBEDDING_MODEL") {
            self.embedding.api_model = Some(value);
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.search.default_limit == 0 {
            return Err(SearchError::Config(
                "search.default_limit must be greater than 0".to_string(),
            ));
        }
        if self.search.rrf_k < 0.0 {
            return Err(SearchError::Config("search.rrf_k must not be negative".to_string()));
        }
        if self.search.candidate_multiplier == 0 {
            return Err(SearchError::Config(
                "search.candidate_multiplier must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.ranking.decay_factor) {
            return Err(SearchError::Config(
                "ranking.decay_factor must be within 0.0..=1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.ranking.diversity_threshold) {
            return Err(SearchError::Config(
                "ranking.diversity_threshold must be within 0.0..=1.0".to_string(),
            ));
        }
        if self.embedding.dims == 0 {
            return Err(SearchError::Config(
                "embedding.dims must be greater than 0".to_string(),
            ));
        }
        if !matches!(self.embedding.backend.as_str(), "hash" | "api" | "none") {
            return Err(SearchError::Config(format!(
                "unknown embedding.backend '{}' (expected hash, api or none)",
                self.embedding.backend
            )));
        }
        Ok(())
    }

    /// Resolved database path: configured value or the platform data dir.
    pub fn db_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.index.db_path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join("notesift/index.db"))
            .ok_or_else(|| SearchError::MissingConfig("index.db_path".to_string()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl IndexConfig {
    fn merge(&mut self, patch: IndexPatch) {
        if let Some(value) = patch.db_path {
            self.db_path = Some(value);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub snippet_length: usize,
    pub rrf_k: f32,
    /// Hybrid mode fetches `(offset + limit) * candidate_multiplier`
    /// candidates from each path before fusion.
    pub candidate_multiplier: usize,
    pub title_weight: f32,
    pub full_text_weight: f32,
    pub semantic_weight: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            snippet_length: 200,
            rrf_k: 60.0,
            candidate_multiplier: 2,
            title_weight: 1.0,
            full_text_weight: 1.0,
            semantic_weight: 1.0,
        }
    }
}

impl SearchConfig {
    fn merge(&mut self, patch: SearchPatch) {
        if let Some(value) = patch.default_limit {
            self.default_limit = value;
        }
        if let Some(value) = patch.snippet_length {
            self.snippet_length = value;
        }
        if let Some(value) = patch.rrf_k {
            self.rrf_k = value;
        }
        if let Some(value) = patch.candidate_multiplier {
            self.candidate_multiplier = value;
        }
        if let Some(value) = patch.title_weight {
            self.title_weight = value;
        }
        if let Some(value) = patch.full_text_weight {
            self.full_text_weight = value;
        }
        if let Some(value) = patch.semantic_weight {
            self.semantic_weight = value;
        }
    }
}

/// Additive boost constants used by the reranker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub title_boost: f32,
    pub exact_boost: f32,
    pub recent_boost: f32,
    pub decay_factor: f32,
    pub tag_boost: f32,
    pub diversity_threshold: f32,
    pub diversity_max_results: usize,
    pub diversity_key_terms: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            title_boost: 2.0,
            exact_boost: 3.0,
            recent_boost: 1.5,
            decay_factor: 0.9,
            tag_boost: 1.8,
            diversity_threshold: 0.8,
            diversity_max_results: 20,
            diversity_key_terms: 10,
        }
    }
}

impl RankingConfig {
    fn merge(&mut self, patch: RankingPatch) {
        if let Some(value) = patch.title_boost {
            self.title_boost = value;
        }
        if let Some(value) = patch.exact_boost {
            self.exact_boost = value;
        }
        if let Some(value) = patch.recent_boost {
            self.recent_boost = value;
        }
        if let Some(value) = patch.decay_factor {
            self.decay_factor = value;
        }
        if let Some(value) = patch.tag_boost {
            self.tag_boost = value;
        }
        if let Some(value) = patch.diversity_threshold {
            self.diversity_threshold = value;
        }
        if let Some(value) = patch.diversity_max_results {
            self.diversity_max_results = value;
        }
        if let Some(value) = patch.diversity_key_terms {
            self.diversity_key_terms = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `hash`, `api` or `none`
    pub backend: String,
    pub dims: usize,
    /// Embed notes that arrive without a vector.
    pub auto_embed: bool,
    pub api_url: Option<String>,
    pub api_model: Option<String>,
    pub api_key_env: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "hash".to_string(),
            dims: 384,
            auto_embed: true,
            api_url: None,
            api_model: None,
            api_key_env: "NOTESIFT_API_KEY".to_string(),
        }
    }
}

impl EmbeddingConfig {
    fn merge(&mut self, patch: EmbeddingPatch) {
        if let Some(value) = patch.backend {
            self.backend = value;
        }
        if let Some(value) = patch.dims {
            self.dims = value;
        }
        if let Some(value) = patch.auto_embed {
            self.auto_embed = value;
        }
        if let Some(value) = patch.api_url {
            self.api_url = Some(value);
        }
        if let Some(value) = patch.api_model {
            self.api_model = Some(value);
        }
        if let Some(value) = patch.api_key_env {
            self.api_key_env = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub index: Option<IndexPatch>,
    pub search: Option<SearchPatch>,
    pub ranking: Option<RankingPatch>,
    pub embedding: Option<EmbeddingPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct IndexPatch {
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SearchPatch {
    pub default_limit: Option<usize>,
    pub snippet_length: Option<usize>,
    pub rrf_k: Option<f32>,
    pub candidate_multiplier: Option<usize>,
    pub title_weight: Option<f32>,
    pub full_text_weight: Option<f32>,
    pub semantic_weight: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RankingPatch {
    pub title_boost: Option<f32>,
    pub exact_boost: Option<f32>,
    pub recent_boost: Option<f32>,
    pub decay_factor: Option<f32>,
    pub tag_boost: Option<f32>,
    pub diversity_threshold: Option<f32>,
    pub diversity_max_results: Option<usize>,
    pub diversity_key_terms: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EmbeddingPatch {
    pub backend: Option<String>,
    pub dims: Option<usize>,
    pub auto_embed: Option<bool>,
    pub api_url: Option<String>,
    pub api_model: Option<String>,
    pub api_key_env: Option<String>,
}

struct EnvLookup<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvLookup<F> {
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    fn bool(&self, key: &str) -> Option<bool> {
        (self.lookup)(key).map(|value| {
            matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
        })
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match (self.lookup)(key) {
            Some(value) => value.trim().parse::<T>().map(Some).map_err(|err| {
                SearchError::Config(format!("invalid {key} value {value}: {err}"))
            }),
            None => Ok(None),
        }
    }
}
