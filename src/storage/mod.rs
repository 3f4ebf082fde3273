pub mod memory;
pub mod transaction;

use crate::core::error::Result;
use crate::core::stats::FlushStats;
use crate::core::types::{Entity, Mutation};
use crate::query::filter::Filter;

/// Row source a search result is resolved against
pub trait RecordStore {
    type Row: Entity;

    /// Rows of `model` matching `filter`, in storage order
    fn scan<'a>(&'a self, model: &str, filter: &Filter) -> Result<Box<dyn Iterator<Item = Self::Row> + 'a>>;
}

/// Receives every successfully committed batch, synchronously and in commit order
pub trait CommitListener<E: Entity>: Send + Sync {
    fn after_commit(&self, batch: &[Mutation<E>]) -> Result<FlushStats>;
}
