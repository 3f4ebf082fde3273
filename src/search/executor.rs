use std::time::Instant;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::TantivyDocument;
use tracing::{debug, instrument};
use crate::core::error::{Error, ErrorKind, Result};
use crate::index::handle::IndexHandle;
use crate::search::results::RankedResults;

/// Knobs of a single text search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    pub limit: Option<usize>,           // None = every hit; larger than the index = every hit
    /// Default fields for bare terms; None = every text field of the model.
    ///
    /// An explicit `field:term` in the query text still targets that field,
    /// including the key field.
    pub fields: Option<Vec<String>>,
    pub use_or: bool,                   // Terms are ANDed unless set
}

impl SearchOptions {
    pub fn new() -> Self {
        SearchOptions::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn or(mut self) -> Self {
        self.use_or = true;
        self
    }
}

/// Runs parsed text queries against a model's current index snapshot
pub struct SearchExecutor;

impl SearchExecutor {
    #[instrument(skip(handle, options), fields(model = %handle.model(), limit = ?options.limit, use_or = options.use_or))]
    pub fn search(handle: &IndexHandle, text: &str, options: &SearchOptions) -> Result<RankedResults> {
        let start = Instant::now();

        let fields = match &options.fields {
            Some(names) => names
                .iter()
                .map(|name| handle.text_field(name))
                .collect::<Result<Vec<_>>>()?,
            None => handle.text_fields()?,
        };
        if fields.is_empty() {
            return Err(Error::invalid_argument(format!(
                "Model '{}' has no text fields to search",
                handle.model()
            )));
        }

        let mut parser = QueryParser::for_index(handle.index(), fields);
        if !options.use_or {
            parser.set_conjunction_by_default();
        }
        // Stray syntax in free text is dropped rather than rejected
        let (query, errors) = parser.parse_query_lenient(text);
        if !errors.is_empty() {
            debug!(query = text, errors = ?errors, "ignored unparsable query parts");
        }

        let searcher = handle.searcher();
        let num_docs = searcher.num_docs() as usize;
        let limit = options.limit.map_or(num_docs, |limit| limit.min(num_docs));
        if limit == 0 {
            return Ok(RankedResults::default());
        }

        let top_docs = searcher.search(&*query, &TopDocs::with_limit(limit))?;

        let mut scored = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let document: TantivyDocument = searcher.doc(address)?;
            let key = document
                .get_first(handle.key_field())
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    Error::new(
                        ErrorKind::Internal,
                        format!("Document in '{}' has no stored key", handle.model()),
                    )
                })?;
            scored.push((score, key.to_string()));
        }

        let results = RankedResults::from_scored(scored, start.elapsed().as_millis() as u64);
        debug!(hits = results.len(), took_ms = results.took_ms, "search complete");
        Ok(results)
    }
}
