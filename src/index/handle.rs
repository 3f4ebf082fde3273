use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use parking_lot::{Mutex, MutexGuard};
use tantivy::collector::Count;
use tantivy::query::TermQuery;
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};
use tracing::{debug, warn};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::stats::IndexStats;
use crate::schema::schema::SearchSchema;

/// Open index for one model, shared by every caller touching that model
pub struct IndexHandle {
    model: String,
    path: PathBuf,
    index: Index,
    reader: IndexReader,
    schema: SearchSchema,
    key: Field,
    writer_lock: Mutex<()>,     // Single writer per model
    retired: AtomicBool,        // Set once the on-disk index was replaced
    writer_memory: usize,
    writer_threads: usize,
}

impl std::fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHandle")
            .field("model", &self.model)
            .field("path", &self.path)
            .field("retired", &self.retired)
            .finish_non_exhaustive()
    }
}

impl IndexHandle {
    pub fn new(
        model: &str,
        path: PathBuf,
        index: Index,
        schema: SearchSchema,
        writer_memory: usize,
        writer_threads: usize,
    ) -> Result<Self> {
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let key = schema.key()?;

        Ok(IndexHandle {
            model: model.to_string(),
            path,
            index,
            reader,
            schema,
            key,
            writer_lock: Mutex::new(()),
            retired: AtomicBool::new(false),
            writer_memory,
            writer_threads: writer_threads.max(1),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn schema(&self) -> &SearchSchema {
        &self.schema
    }

    pub fn key_field(&self) -> Field {
        self.key
    }

    pub fn key_name(&self) -> &str {
        &self.schema.key_field
    }

    pub fn text_field(&self, name: &str) -> Result<Field> {
        if !self.schema.has_text_field(name) {
            return Err(Error::invalid_argument(format!(
                "Model '{}' has no searchable field '{}'",
                self.model, name
            )));
        }
        Ok(self.schema.schema.get_field(name)?)
    }

    pub fn text_fields(&self) -> Result<Vec<Field>> {
        self.schema
            .text_fields
            .iter()
            .map(|f| Ok(self.schema.schema.get_field(&f.name)?))
            .collect()
    }

    /// Snapshot of the last committed state
    pub fn searcher(&self) -> Searcher {
        self.reader.searcher()
    }

    /// Blocks until no other writer transaction is running on this model.
    ///
    /// Fails with `InvalidState` once the handle is retired.
    pub fn writer(&self) -> Result<ScopedWriter<'_>> {
        let guard = self.writer_lock.lock();
        if self.is_retired() {
            return Err(Error::new(
                ErrorKind::InvalidState,
                format!("Index of '{}' was rebuilt; reopen it", self.model),
            ));
        }
        let inner: IndexWriter<TantivyDocument> = self
            .index
            .writer_with_num_threads(self.writer_threads, self.writer_memory)?;
        Ok(ScopedWriter {
            handle: self,
            inner: Some(inner),
            _guard: guard,
        })
    }

    /// True after a rebuild replaced this index; searches still see the old snapshot
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }

    /// Wait for the running writer, then refuse all later ones.
    ///
    /// The returned guard keeps writers out until it is dropped.
    pub(crate) fn retire(&self) -> MutexGuard<'_, ()> {
        let guard = self.writer_lock.lock();
        self.retired.store(true, Ordering::SeqCst);
        guard
    }

    pub fn num_docs(&self) -> u64 {
        self.searcher().num_docs()
    }

    /// Live documents carrying `key`
    pub fn count_key(&self, key: &str) -> Result<usize> {
        let term = Term::from_field_text(self.key, key);
        let query = TermQuery::new(term, IndexRecordOption::Basic);
        Ok(self.searcher().search(&query, &Count)?)
    }

    pub fn stats(&self) -> IndexStats {
        let searcher = self.searcher();
        IndexStats {
            model: self.model.clone(),
            path: self.path.clone(),
            num_docs: searcher.num_docs(),
            num_segments: searcher.segment_readers().len(),
            text_fields: self
                .schema
                .text_field_names()
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    fn reload(&self) -> Result<()> {
        Ok(self.reader.reload()?)
    }
}

/// Writer transaction scoped to one flush.
///
/// Nothing is visible until `commit`; dropping the writer any other way rolls
/// back whatever it buffered and releases the model's writer lock.
pub struct ScopedWriter<'a> {
    handle: &'a IndexHandle,
    inner: Option<IndexWriter<TantivyDocument>>,
    _guard: MutexGuard<'a, ()>,
}

impl<'a> ScopedWriter<'a> {
    fn inner(&mut self) -> Result<&mut IndexWriter<TantivyDocument>> {
        self.inner
            .as_mut()
            .ok_or_else(|| Error::new(ErrorKind::InvalidState, "Writer already finished".to_string()))
    }

    pub fn delete_key(&mut self, key: &str) -> Result<()> {
        let term = Term::from_field_text(self.handle.key, key);
        self.inner()?.delete_term(term);
        Ok(())
    }

    pub fn add(&mut self, document: TantivyDocument) -> Result<()> {
        self.inner()?.add_document(document)?;
        Ok(())
    }

    pub fn delete_all(&mut self) -> Result<()> {
        self.inner()?.delete_all_documents()?;
        Ok(())
    }

    /// Publish all buffered operations and refresh the model's reader
    pub fn commit(mut self) -> Result<u64> {
        let mut inner = self.inner.take().ok_or_else(|| {
            Error::new(ErrorKind::InvalidState, "Writer already finished".to_string())
        })?;
        let opstamp = inner.commit()?;
        drop(inner);
        self.handle.reload()?;
        debug!(model = %self.handle.model, opstamp, "index commit");
        Ok(opstamp)
    }
}

impl std::fmt::Debug for ScopedWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedWriter")
            .field("model", &self.handle.model)
            .field("finished", &self.inner.is_none())
            .finish()
    }
}

impl Drop for ScopedWriter<'_> {
    fn drop(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            warn!(model = %self.handle.model, "rolling back unfinished index writer");
            if let Err(e) = inner.rollback() {
                warn!(model = %self.handle.model, error = %e, "index rollback failed");
            }
        }
    }
}
