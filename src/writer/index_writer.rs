use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use tantivy::TantivyDocument;
use tracing::{debug, instrument};
use crate::core::error::{Error, Result};
use crate::core::stats::ModelFlushStats;
use crate::core::types::Entity;
use crate::index::handle::{IndexHandle, ScopedWriter};
use crate::schema::model::ModelDescriptor;
use crate::writer::batch::{BatchEntry, ModelBatch};

/// How upserts reach the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Coalesce per key: one delete and at most one fresh document per touched key
    #[default]
    Upsert,
    /// Replay every entry: delete by key, then add again for upserts
    DeleteThenWrite,
}

/// Document ready to hand to the engine
struct PreparedDocument {
    key: String,
    document: Option<TantivyDocument>,   // None for deletes
}

/// Applies one model's share of a commit batch under a single writer transaction
pub struct IndexWriter<'h> {
    handle: &'h IndexHandle,
    policy: WritePolicy,
}

impl<'h> IndexWriter<'h> {
    pub fn new(handle: &'h IndexHandle, policy: WritePolicy) -> Self {
        IndexWriter { handle, policy }
    }

    #[instrument(skip(self, batch), fields(model = %batch.model(), entries = batch.len(), policy = ?self.policy))]
    pub fn apply<E: Entity>(&self, batch: &ModelBatch<'_, E>) -> Result<ModelFlushStats> {
        let mut stats = ModelFlushStats {
            model: batch.model().to_string(),
            mutations: batch.len(),
            ..ModelFlushStats::default()
        };

        let mut writer = self.handle.writer()?;
        match self.policy {
            WritePolicy::Upsert => {
                for (key, last) in coalesce(&batch.descriptor, &batch.entries)? {
                    let prepared = self.prepare(&batch.descriptor, key, last)?;
                    self.write(&mut writer, prepared, &mut stats)?;
                }
            }
            WritePolicy::DeleteThenWrite => {
                for entry in &batch.entries {
                    let key = key_of(&batch.descriptor, entry.entity)?;
                    let prepared = self.prepare(&batch.descriptor, key, entry)?;
                    self.write(&mut writer, prepared, &mut stats)?;
                }
            }
        }
        writer.commit()?;

        debug!(
            deletes = stats.deletes_issued,
            added = stats.documents_added,
            "model batch indexed"
        );
        Ok(stats)
    }

    /// Drop every document and index `entities` from scratch, in one transaction
    pub fn replace_all<E: Entity>(&self, descriptor: &ModelDescriptor, entities: &[E]) -> Result<ModelFlushStats> {
        let mut stats = ModelFlushStats {
            model: descriptor.name.clone(),
            mutations: entities.len(),
            ..ModelFlushStats::default()
        };

        let mut writer = self.handle.writer()?;
        writer.delete_all()?;
        for entity in entities {
            let key = key_of(descriptor, entity)?;
            let entry = BatchEntry { upsert: true, entity };
            let document = self.build_document(descriptor, &key, &entry)?;
            writer.add(document)?;
            stats.documents_added += 1;
        }
        writer.commit()?;
        Ok(stats)
    }

    fn write(&self, writer: &mut ScopedWriter<'_>, prepared: PreparedDocument, stats: &mut ModelFlushStats) -> Result<()> {
        writer.delete_key(&prepared.key)?;
        stats.deletes_issued += 1;
        if let Some(document) = prepared.document {
            writer.add(document)?;
            stats.documents_added += 1;
        }
        Ok(())
    }

    fn prepare<E: Entity>(
        &self,
        descriptor: &ModelDescriptor,
        key: String,
        entry: &BatchEntry<'_, E>,
    ) -> Result<PreparedDocument> {
        let document = if entry.upsert {
            Some(self.build_document(descriptor, &key, entry)?)
        } else {
            None
        };
        Ok(PreparedDocument { key, document })
    }

    fn build_document<E: Entity>(
        &self,
        descriptor: &ModelDescriptor,
        key: &str,
        entry: &BatchEntry<'_, E>,
    ) -> Result<TantivyDocument> {
        let mut document = TantivyDocument::default();
        document.add_text(self.handle.key_field(), key);

        for name in descriptor.searchable_names() {
            let value = entry.entity.attribute(name).ok_or_else(|| {
                Error::data_shape(format!(
                    "Instance of '{}' has no searchable attribute '{}'",
                    descriptor.name, name
                ))
            })?;

            // Non-textual or key attributes have no text field
            if !self.handle.schema().has_text_field(name) || name == self.handle.key_name() {
                continue;
            }
            if let Some(text) = value.to_text() {
                document.add_text(self.handle.text_field(name)?, &text);
            }
        }
        Ok(document)
    }
}

fn key_of<E: Entity>(descriptor: &ModelDescriptor, entity: &E) -> Result<String> {
    let key = descriptor.primary_key_attribute()?;
    entity
        .attribute(&key.name)
        .and_then(|v| v.to_text())
        .ok_or_else(|| {
            Error::data_shape(format!(
                "Instance of '{}' has no value for primary key '{}'",
                descriptor.name, key.name
            ))
        })
}

/// Last entry per key, ordered by that last occurrence
fn coalesce<'b, 'a, E: Entity>(
    descriptor: &ModelDescriptor,
    entries: &'b [BatchEntry<'a, E>],
) -> Result<Vec<(String, &'b BatchEntry<'a, E>)>> {
    let mut last: HashMap<String, usize> = HashMap::new();
    let mut keys = Vec::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        let key = key_of(descriptor, entry.entity)?;
        last.insert(key.clone(), position);
        keys.push(key);
    }

    Ok(keys
        .into_iter()
        .enumerate()
        .filter(|(position, key)| last.get(key) == Some(position))
        .map(|(position, key)| (key, &entries[position]))
        .collect())
}
