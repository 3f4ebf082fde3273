use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use parking_lot::Mutex;
use tantivy::directory::MmapDirectory;
use tantivy::Index;
use tracing::{info, instrument};
use crate::analysis::analyzer::AnalyzerRegistry;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::index::handle::IndexHandle;
use crate::schema::model::ModelDescriptor;
use crate::schema::schema::SearchSchema;

/// Model name -> open index, created lazily and kept for the registry's lifetime
pub struct IndexRegistry {
    base_dir: PathBuf,
    analyzers: AnalyzerRegistry,
    config: Config,
    handles: Mutex<HashMap<String, Arc<IndexHandle>>>,
}

impl IndexRegistry {
    pub fn new(config: Config, analyzers: AnalyzerRegistry) -> Self {
        IndexRegistry {
            base_dir: config.index_base.clone(),
            analyzers,
            config,
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn index_path(&self, model: &str) -> PathBuf {
        self.base_dir.join(model)
    }

    /// Analyzer for a model: descriptor override, then config, then default
    pub fn analyzer_for(&self, descriptor: &ModelDescriptor) -> String {
        descriptor
            .analyzer
            .clone()
            .unwrap_or_else(|| self.config.analyzer_for_model(&descriptor.name).to_string())
    }

    /// Cached handle, or open/create the model's index.
    ///
    /// The lock is held across the whole check-then-create sequence, so a
    /// second caller racing on the same model waits and receives the first
    /// caller's handle.
    pub fn get_or_create(&self, descriptor: &ModelDescriptor) -> Result<Arc<IndexHandle>> {
        let mut handles = self.handles.lock();
        if let Some(handle) = handles.get(&descriptor.name) {
            return Ok(handle.clone());
        }

        let handle = Arc::new(self.open_or_create(descriptor)?);
        handles.insert(descriptor.name.clone(), handle.clone());
        Ok(handle)
    }

    /// Replace the model's index with an empty one derived from `descriptor`,
    /// filled by `populate` before anyone else can reach it.
    ///
    /// The registry lock is held throughout and the previous handle is
    /// retired under its writer lock first, so no flush can land in the old
    /// directory or in the new index ahead of `populate`.
    #[instrument(skip(self, descriptor, populate), fields(model = %descriptor.name))]
    pub fn recreate<T, F>(&self, descriptor: &ModelDescriptor, populate: F) -> Result<(Arc<IndexHandle>, T)>
    where
        F: FnOnce(&IndexHandle) -> Result<T>,
    {
        let mut handles = self.handles.lock();
        let previous = handles.remove(&descriptor.name);
        let _retired = previous.as_ref().map(|handle| handle.retire());

        let path = self.index_path(&descriptor.name);
        if path.exists() {
            fs::remove_dir_all(&path)?;
            info!(path = %path.display(), "removed index for rebuild");
        }

        let handle = Arc::new(self.open_or_create(descriptor)?);
        let populated = populate(&handle)?;
        handles.insert(descriptor.name.clone(), handle.clone());
        Ok((handle, populated))
    }

    pub fn get(&self, model: &str) -> Option<Arc<IndexHandle>> {
        self.handles.lock().get(model).cloned()
    }

    /// Forget a cached handle; the next access reopens from disk
    pub fn evict(&self, model: &str) -> Option<Arc<IndexHandle>> {
        self.handles.lock().remove(model)
    }

    pub fn cached_models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.handles.lock().keys().cloned().collect();
        models.sort();
        models
    }

    #[instrument(skip(self, descriptor), fields(model = %descriptor.name))]
    fn open_or_create(&self, descriptor: &ModelDescriptor) -> Result<IndexHandle> {
        let path = self.index_path(&descriptor.name);
        let key = descriptor.primary_key_attribute()?;

        let (index, schema) = if Self::exists(&path)? {
            // Stored schema wins even if the descriptor changed since
            let index = Index::open_in_dir(&path)?;
            let schema = SearchSchema::from_existing(index.schema(), &key.name)?;
            info!(path = %path.display(), "opened existing index");
            (index, schema)
        } else {
            let analyzer = self.analyzer_for(descriptor);
            let schema = SearchSchema::derive(descriptor, &self.analyzers, &analyzer)?;
            fs::create_dir_all(&path)?;
            let index = Index::create_in_dir(&path, schema.schema.clone())?;
            info!(
                path = %path.display(),
                analyzer = %analyzer,
                fields = ?schema.text_field_names(),
                "created index"
            );
            (index, schema)
        };

        self.analyzers.install(index.tokenizers());

        IndexHandle::new(
            &descriptor.name,
            path,
            index,
            schema,
            self.config.effective_writer_memory(),
            self.config.writer_threads,
        )
    }

    fn exists(path: &Path) -> Result<bool> {
        if !path.is_dir() {
            return Ok(false);
        }
        let directory = MmapDirectory::open(path)?;
        Ok(Index::exists(&directory)?)
    }
}
