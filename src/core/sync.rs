use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use parking_lot::RwLock;
use tracing::{debug, info, instrument};
use crate::analysis::analyzer::AnalyzerRegistry;
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::stats::{FlushStats, IndexStats, ModelFlushStats};
use crate::core::types::{Entity, Mutation};
use crate::index::handle::IndexHandle;
use crate::index::registry::IndexRegistry;
use crate::query::search_query::SearchQuery;
use crate::schema::model::ModelDescriptor;
use crate::schema::schema::SearchSchema;
use crate::search::executor::SearchOptions;
use crate::storage::CommitListener;
use crate::writer::batch::MutationCollector;
use crate::writer::index_writer::IndexWriter;

/// Keeps one text index per searchable model in step with committed storage changes
pub struct SearchSync {
    config: Config,
    analyzers: AnalyzerRegistry,
    models: RwLock<HashMap<String, Arc<ModelDescriptor>>>,
    registry: IndexRegistry,
}

impl SearchSync {
    pub fn new(config: Config) -> Self {
        SearchSync::with_analyzers(config, AnalyzerRegistry::new())
    }

    pub fn with_analyzers(config: Config, analyzers: AnalyzerRegistry) -> Self {
        let registry = IndexRegistry::new(config.clone(), analyzers.clone());
        SearchSync {
            config,
            analyzers,
            models: RwLock::new(HashMap::new()),
            registry,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared with every index; analyzers registered here apply to indices opened later
    pub fn analyzers(&self) -> &AnalyzerRegistry {
        &self.analyzers
    }

    pub fn registry(&self) -> &IndexRegistry {
        &self.registry
    }

    /// Add a model to the catalog.
    ///
    /// Only the name is checked here unless `eager_validation` is set;
    /// otherwise descriptor mistakes surface at the first commit touching
    /// the model. Re-registering a name replaces the descriptor but not an
    /// index that is already open.
    pub fn register_model(&self, descriptor: ModelDescriptor) -> Result<Arc<ModelDescriptor>> {
        descriptor.check_name()?;
        if self.config.eager_validation {
            let analyzer = self.registry.analyzer_for(&descriptor);
            SearchSchema::derive(&descriptor, &self.analyzers, &analyzer)?;
        }

        let descriptor = Arc::new(descriptor);
        self.models.write().insert(descriptor.name.clone(), descriptor.clone());
        Ok(descriptor)
    }

    pub fn descriptor(&self, model: &str) -> Option<Arc<ModelDescriptor>> {
        self.models.read().get(model).cloned()
    }

    pub fn models(&self) -> Vec<String> {
        let mut names: Vec<_> = self.models.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn require(&self, model: &str) -> Result<Arc<ModelDescriptor>> {
        self.descriptor(model)
            .ok_or_else(|| Error::not_found(format!("Model '{}' is not registered", model)))
    }

    fn require_searchable(&self, model: &str) -> Result<Arc<ModelDescriptor>> {
        let descriptor = self.require(model)?;
        if !descriptor.is_searchable() {
            return Err(Error::invalid_argument(format!("Model '{}' is not searchable", model)));
        }
        Ok(descriptor)
    }

    /// Open index of a searchable model, created on first use
    pub fn index(&self, model: &str) -> Result<Arc<IndexHandle>> {
        let descriptor = self.require_searchable(model)?;
        self.registry.get_or_create(&descriptor)
    }

    /// Run `write` against the current handle, moving to the new one if a rebuild retired it
    fn write_current<T, F>(&self, descriptor: &ModelDescriptor, write: F) -> Result<T>
    where
        F: Fn(&IndexHandle) -> Result<T>,
    {
        loop {
            let handle = self.registry.get_or_create(descriptor)?;
            match write(&handle) {
                Err(err) if err.is(ErrorKind::InvalidState) && handle.is_retired() => {
                    debug!(model = %descriptor.name, "index rebuilt during write, retrying on the new one");
                }
                result => return result,
            }
        }
    }

    /// Unsearched query over every row of the model
    pub fn query(&self, model: &str) -> Result<SearchQuery> {
        Ok(SearchQuery::new(self.index(model)?))
    }

    pub fn search(&self, model: &str, text: &str, options: &SearchOptions) -> Result<SearchQuery> {
        self.query(model)?.search(text, options)
    }

    /// Index one committed batch.
    ///
    /// Each model gets its own writer transaction. The first failing model
    /// stops the flush; models before it stay committed.
    #[instrument(skip(self, batch), fields(mutations = batch.len()))]
    pub fn flush<E: Entity>(&self, batch: &[Mutation<E>]) -> Result<FlushStats> {
        let start = Instant::now();
        let collected = MutationCollector::collect(batch, |model| self.descriptor(model));

        let mut stats = FlushStats {
            skipped: collected.skipped,
            ..FlushStats::default()
        };
        for model_batch in &collected.models {
            let applied = self.write_current(&model_batch.descriptor, |handle| {
                IndexWriter::new(handle, self.config.write_policy).apply(model_batch)
            })?;
            stats.models.push(applied);
        }
        stats.took = start.elapsed();

        info!(
            models = stats.models.len(),
            skipped = stats.skipped,
            added = stats.documents_added(),
            took_ms = stats.took.as_millis() as u64,
            "flush indexed"
        );
        Ok(stats)
    }

    /// Replace the model's documents with `rows`, keeping the current index layout
    pub fn reindex<E: Entity>(&self, model: &str, rows: &[E]) -> Result<ModelFlushStats> {
        let descriptor = self.require_searchable(model)?;
        self.write_current(&descriptor, |handle| {
            IndexWriter::new(handle, self.config.write_policy).replace_all(&descriptor, rows)
        })
    }

    /// Throw away the on-disk index and build a fresh one from the current descriptor.
    ///
    /// Flushes racing with the rebuild wait for it and then land in the new
    /// index. Handles obtained before the call keep serving the old snapshot
    /// but refuse writes.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub fn rebuild<E: Entity>(&self, model: &str, rows: &[E]) -> Result<ModelFlushStats> {
        let descriptor = self.require_searchable(model)?;
        let policy = self.config.write_policy;
        let (_, stats) = self.registry.recreate(&descriptor, |handle| {
            IndexWriter::new(handle, policy).replace_all(&descriptor, rows)
        })?;
        Ok(stats)
    }

    pub fn stats(&self, model: &str) -> Result<IndexStats> {
        Ok(self.index(model)?.stats())
    }
}

impl<E: Entity> CommitListener<E> for SearchSync {
    fn after_commit(&self, batch: &[Mutation<E>]) -> Result<FlushStats> {
        self.flush(batch)
    }
}
