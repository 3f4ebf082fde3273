use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::core::error::Result;
use crate::writer::index_writer::WritePolicy;

/// Minimum per-thread writer budget the index engine accepts
pub const MIN_WRITER_MEMORY_BYTES: usize = 15_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory; each model's index lives in `<index_base>/<model>`
    pub index_base: PathBuf,

    // Analysis
    pub default_analyzer: String,               // Used when neither model nor descriptor overrides
    pub model_analyzers: HashMap<String, String>,

    // Writer
    pub writer_memory_bytes: usize,             // Split across writer threads
    pub writer_threads: usize,
    pub write_policy: WritePolicy,

    /// Validate descriptors when they are registered instead of at first commit
    pub eager_validation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            index_base: PathBuf::from("./whoosh_index"),
            default_analyzer: "stemming".to_string(),
            model_analyzers: HashMap::new(),
            writer_memory_bytes: 50 * 1024 * 1024,   // 50MB per flush
            writer_threads: 1,
            write_policy: WritePolicy::Upsert,
            eager_validation: false,
        }
    }
}

impl Config {
    pub fn with_index_base(mut self, index_base: impl Into<PathBuf>) -> Self {
        self.index_base = index_base.into();
        self
    }

    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    pub fn with_default_analyzer(mut self, analyzer: &str) -> Self {
        self.default_analyzer = analyzer.to_string();
        self
    }

    pub fn with_model_analyzer(mut self, model: &str, analyzer: &str) -> Self {
        self.model_analyzers.insert(model.to_string(), analyzer.to_string());
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Config::from_json_str(&raw)
    }

    /// Analyzer for a model, ignoring any override on the descriptor itself
    pub fn analyzer_for_model(&self, model: &str) -> &str {
        self.model_analyzers
            .get(model)
            .map(String::as_str)
            .unwrap_or(&self.default_analyzer)
    }

    /// Writer budget clamped so every thread gets the engine's minimum
    pub fn effective_writer_memory(&self) -> usize {
        let threads = self.writer_threads.max(1);
        self.writer_memory_bytes.max(threads * MIN_WRITER_MEMORY_BYTES)
    }
}
