use std::path::PathBuf;
use std::time::Duration;
use serde::{Serialize, Deserialize};

/// What one model's writer transaction did during a flush
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelFlushStats {
    pub model: String,
    pub mutations: usize,       // Entries received for this model
    pub deletes_issued: usize,  // Delete-by-key operations sent to the engine
    pub documents_added: usize,
}

/// Outcome of handing one commit batch to the indexer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlushStats {
    pub models: Vec<ModelFlushStats>,
    pub skipped: usize,         // Mutations of models without a searchable set
    pub took: Duration,
}

impl FlushStats {
    pub fn for_model(&self, model: &str) -> Option<&ModelFlushStats> {
        self.models.iter().find(|m| m.model == model)
    }

    pub fn documents_added(&self) -> usize {
        self.models.iter().map(|m| m.documents_added).sum()
    }

    pub fn deletes_issued(&self) -> usize {
        self.models.iter().map(|m| m.deletes_issued).sum()
    }
}

/// Snapshot of one model's index for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub model: String,
    pub path: PathBuf,
    pub num_docs: u64,
    pub num_segments: usize,
    pub text_fields: Vec<String>,
}
