use std::sync::Arc;
use tracing::debug;
use crate::core::error::Result;
use crate::index::handle::IndexHandle;
use crate::query::filter::Filter;
use crate::query::sql::{order_by_rank, SqlFragment};
use crate::search::executor::{SearchExecutor, SearchOptions};
use crate::search::results::{RankMap, RankedRows};
use crate::storage::RecordStore;

/// Storage query for one model, optionally narrowed and ordered by text searches.
///
/// Wraps a base filter and the rank map of the most recent search. Every
/// method consumes and returns the query, so calls chain.
#[derive(Clone)]
pub struct SearchQuery {
    model: String,
    handle: Arc<IndexHandle>,
    filter: Filter,
    ranks: Option<Arc<RankMap>>,
}

impl SearchQuery {
    /// Every row of the model, unranked
    pub fn new(handle: Arc<IndexHandle>) -> Self {
        SearchQuery {
            model: handle.model().to_string(),
            handle,
            filter: Filter::All,
            ranks: None,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn key_attribute(&self) -> &str {
        self.handle.key_name()
    }

    /// AND a storage-side predicate
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = self.filter.and(filter);
        self
    }

    /// Intersect with the hits of a text search; its ranks replace earlier ones
    pub fn search(mut self, text: &str, options: &SearchOptions) -> Result<Self> {
        let results = SearchExecutor::search(&self.handle, text, options)?;
        let keys = Filter::key_in(self.handle.key_name(), results.keys());
        debug!(model = %self.model, hits = results.len(), "search narrowed query");

        self.filter = self.filter.and(keys);
        self.ranks = Some(Arc::new(results.rank_map()));
        Ok(self)
    }

    pub fn filter_ref(&self) -> &Filter {
        &self.filter
    }

    /// `None` until a search was applied; `Some(empty)` after a search without hits
    pub fn ranks(&self) -> Option<&RankMap> {
        self.ranks.as_deref()
    }

    /// Known to match nothing without asking storage
    pub fn is_empty_result(&self) -> bool {
        self.filter.is_nothing()
    }

    /// Matching rows, best rank first when a search was applied
    pub fn fetch<'s, S: RecordStore>(&self, store: &'s S) -> Result<RankedRows<Box<dyn Iterator<Item = S::Row> + 's>>> {
        let source: Box<dyn Iterator<Item = S::Row> + 's> = if self.is_empty_result() {
            Box::new(std::iter::empty())
        } else {
            store.scan(&self.model, &self.filter)?
        };
        Ok(RankedRows::new(source, self.handle.key_name(), self.ranks.clone()))
    }

    pub fn all<S: RecordStore>(&self, store: &S) -> Result<Vec<S::Row>> {
        Ok(self.fetch(store)?.collect())
    }

    pub fn count<S: RecordStore>(&self, store: &S) -> Result<usize> {
        if self.is_empty_result() {
            return Ok(0);
        }
        Ok(store.scan(&self.model, &self.filter)?.count())
    }

    /// `WHERE` body and, when ranked, an `ORDER BY` body for an SQL backend
    pub fn to_sql(&self) -> (SqlFragment, Option<SqlFragment>) {
        let order = self
            .ranks
            .as_deref()
            .and_then(|ranks| order_by_rank(self.handle.key_name(), ranks));
        (self.filter.to_sql(), order)
    }
}

impl std::fmt::Debug for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchQuery")
            .field("model", &self.model)
            .field("filter", &self.filter)
            .field("ranked", &self.ranks.as_ref().map(|r| r.len()))
            .finish()
    }
}
