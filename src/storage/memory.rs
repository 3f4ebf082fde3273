use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use parking_lot::RwLock;
use tracing::{debug, warn};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{FieldValue, Mutation, Record};
use crate::query::filter::Filter;
use crate::schema::model::{ModelDescriptor, StorageType};
use crate::storage::transaction::{Transaction, TransactionOp};
use crate::storage::{CommitListener, RecordStore};

/// Rows of one model in insertion order
#[derive(Debug, Clone)]
struct Table {
    descriptor: Arc<ModelDescriptor>,
    key: String,
    auto_key: bool,             // Integer keys are assigned when missing
    rows: BTreeMap<u64, Record>,
    by_key: HashMap<String, u64>,
    next_row: u64,
    next_id: i64,
}

impl Table {
    fn new(descriptor: Arc<ModelDescriptor>) -> Result<Self> {
        let key = descriptor.primary_key_attribute()?;
        Ok(Table {
            key: key.name.clone(),
            auto_key: key.storage_type == StorageType::Integer,
            descriptor,
            rows: BTreeMap::new(),
            by_key: HashMap::new(),
            next_row: 0,
            next_id: 1,
        })
    }

    fn check_attributes(&self, record: &Record) -> Result<()> {
        for name in record.fields.keys() {
            if self.descriptor.attribute(name).is_none() {
                return Err(Error::invalid_argument(format!(
                    "Model '{}' has no attribute '{}'",
                    self.descriptor.name, name
                )));
            }
        }
        Ok(())
    }

    fn key_text(&self, value: Option<&FieldValue>) -> Result<String> {
        value.and_then(FieldValue::to_text).ok_or_else(|| {
            Error::invalid_argument(format!(
                "Row of '{}' needs a value for key '{}'",
                self.descriptor.name, self.key
            ))
        })
    }

    fn insert(&mut self, record: Record) -> Result<Mutation<Record>> {
        self.check_attributes(&record)?;

        let mut row = Record::new(&self.descriptor.name);
        for attribute in &self.descriptor.attributes {
            let value = record.get(&attribute.name).cloned().unwrap_or(FieldValue::Null);
            row.set(&attribute.name, value);
        }

        match row.get(&self.key).cloned() {
            Some(FieldValue::Null) | None if self.auto_key => {
                row.set(&self.key, self.next_id);
                self.next_id += 1;
            }
            Some(FieldValue::Integer(id)) => self.next_id = self.next_id.max(id + 1),
            _ => {}
        }

        let key = self.key_text(row.get(&self.key))?;
        if self.by_key.contains_key(&key) {
            return Err(Error::new(
                ErrorKind::InvalidState,
                format!("Duplicate key '{}' in '{}'", key, self.descriptor.name),
            ));
        }

        self.by_key.insert(key, self.next_row);
        self.rows.insert(self.next_row, row.clone());
        self.next_row += 1;
        Ok(Mutation::insert(row))
    }

    fn update(&mut self, record: Record) -> Result<Mutation<Record>> {
        self.check_attributes(&record)?;
        let key = self.key_text(record.get(&self.key))?;
        let row = self
            .by_key
            .get(&key)
            .and_then(|position| self.rows.get_mut(position))
            .ok_or_else(|| Error::not_found(format!("No row '{}' in '{}'", key, self.descriptor.name)))?;

        for (name, value) in record.fields {
            row.fields.insert(name, value);
        }
        Ok(Mutation::update(row.clone()))
    }

    fn delete(&mut self, key: &FieldValue) -> Result<Mutation<Record>> {
        let key = self.key_text(Some(key))?;
        let row = self
            .by_key
            .remove(&key)
            .and_then(|position| self.rows.remove(&position))
            .ok_or_else(|| Error::not_found(format!("No row '{}' in '{}'", key, self.descriptor.name)))?;
        Ok(Mutation::delete(row))
    }
}

/// In-process record store that reports every commit to its listeners
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    listeners: RwLock<Vec<Arc<dyn CommitListener<Record>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn create_table(&self, descriptor: &ModelDescriptor) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.contains_key(&descriptor.name) {
            return Err(Error::new(
                ErrorKind::InvalidState,
                format!("Table '{}' already exists", descriptor.name),
            ));
        }
        let table = Table::new(Arc::new(descriptor.clone()))?;
        tables.insert(descriptor.name.clone(), table);
        Ok(())
    }

    /// Listeners run in attach order after every successful commit
    pub fn attach(&self, listener: Arc<dyn CommitListener<Record>>) {
        self.listeners.write().push(listener);
    }

    pub fn get(&self, model: &str, key: impl Into<FieldValue>) -> Option<Record> {
        let key = key.into().to_text()?;
        let tables = self.tables.read();
        let table = tables.get(model)?;
        table.by_key.get(&key).and_then(|position| table.rows.get(position)).cloned()
    }

    pub fn len(&self, model: &str) -> usize {
        self.tables.read().get(model).map(|t| t.rows.len()).unwrap_or(0)
    }

    /// Every row of `model` in insertion order, for rebuilding an index
    pub fn rows(&self, model: &str) -> Result<Vec<Record>> {
        self.scan(model, &Filter::All).map(Iterator::collect)
    }

    /// Apply a transaction atomically, then notify listeners.
    ///
    /// Nothing is applied if any operation fails. A listener error is
    /// returned after the rows are already committed.
    pub fn commit(&self, tx: &mut Transaction) -> Result<Vec<Mutation<Record>>> {
        let operations = tx.take_operations()?;

        let mutations = {
            let mut tables = self.tables.write();
            let mut staged: HashMap<String, Table> = HashMap::new();
            let mut mutations = Vec::with_capacity(operations.len());

            for operation in operations {
                let model = match &operation {
                    TransactionOp::Insert(record) | TransactionOp::Update(record) => record.model.clone(),
                    TransactionOp::Delete { model, .. } => model.clone(),
                };
                if !staged.contains_key(&model) {
                    let table = tables
                        .get(&model)
                        .ok_or_else(|| Error::not_found(format!("No table '{}'", model)))?;
                    staged.insert(model.clone(), table.clone());
                }
                let table = staged
                    .get_mut(&model)
                    .ok_or_else(|| Error::new(ErrorKind::Internal, format!("Table '{}' not staged", model)))?;

                let mutation = match operation {
                    TransactionOp::Insert(record) => table.insert(record)?,
                    TransactionOp::Update(record) => table.update(record)?,
                    TransactionOp::Delete { key, .. } => table.delete(&key)?,
                };
                mutations.push(mutation);
            }

            tables.extend(staged);
            mutations
        };
        debug!(tx = tx.id, mutations = mutations.len(), "transaction committed");

        let listeners: Vec<_> = self.listeners.read().clone();
        for listener in listeners {
            if let Err(err) = listener.after_commit(&mutations) {
                warn!(tx = tx.id, error = %err, "commit listener failed after rows were committed");
                return Err(err);
            }
        }
        Ok(mutations)
    }
}

impl RecordStore for MemoryStore {
    type Row = Record;

    fn scan<'a>(&'a self, model: &str, filter: &Filter) -> Result<Box<dyn Iterator<Item = Record> + 'a>> {
        if filter.is_nothing() {
            return Ok(Box::new(std::iter::empty()));
        }
        let tables = self.tables.read();
        let table = tables
            .get(model)
            .ok_or_else(|| Error::not_found(format!("No table '{}'", model)))?;
        let rows: Vec<Record> = table.rows.values().filter(|row| filter.matches(*row)).cloned().collect();
        Ok(Box::new(rows.into_iter()))
    }
}
