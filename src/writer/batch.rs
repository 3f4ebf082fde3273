use std::collections::HashMap;
use std::sync::Arc;
use crate::core::types::{Entity, Mutation};
use crate::schema::model::ModelDescriptor;

/// One mutation as the index writer sees it
#[derive(Debug)]
pub struct BatchEntry<'a, E> {
    pub upsert: bool,
    pub entity: &'a E,
}

/// All mutations of one searchable model within a commit, in commit order
#[derive(Debug)]
pub struct ModelBatch<'a, E> {
    pub descriptor: Arc<ModelDescriptor>,
    pub entries: Vec<BatchEntry<'a, E>>,
}

impl<E> ModelBatch<'_, E> {
    pub fn model(&self) -> &str {
        &self.descriptor.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Grouped commit batch
#[derive(Debug)]
pub struct CollectedBatch<'a, E> {
    pub models: Vec<ModelBatch<'a, E>>,
    pub skipped: usize,
}

pub struct MutationCollector;

impl MutationCollector {
    /// Group a commit batch by model.
    ///
    /// Groups come out in the order their model first appears; entries keep
    /// commit order. Mutations of unknown models, or of models without a
    /// searchable set, are dropped and only counted.
    pub fn collect<'a, E, F>(batch: &'a [Mutation<E>], lookup: F) -> CollectedBatch<'a, E>
    where
        E: Entity,
        F: Fn(&str) -> Option<Arc<ModelDescriptor>>,
    {
        let mut models: Vec<ModelBatch<'a, E>> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut skipped = 0;

        for mutation in batch {
            let model = mutation.entity.model_name();
            let position = match positions.get(model) {
                Some(position) => *position,
                None => match lookup(model).filter(|d| d.is_searchable()) {
                    Some(descriptor) => {
                        models.push(ModelBatch {
                            descriptor,
                            entries: Vec::new(),
                        });
                        positions.insert(model.to_string(), models.len() - 1);
                        models.len() - 1
                    }
                    None => {
                        skipped += 1;
                        continue;
                    }
                },
            };

            models[position].entries.push(BatchEntry {
                upsert: mutation.kind.is_upsert(),
                entity: &mutation.entity,
            });
        }

        CollectedBatch { models, skipped }
    }
}
