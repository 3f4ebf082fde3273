#![allow(dead_code)]

use std::sync::Arc;
use chrono::{DateTime, Utc};
use indexmirror::storage::memory::MemoryStore;
use indexmirror::storage::transaction::Transaction;
use indexmirror::{Config, FieldValue, ModelDescriptor, Record, SearchQuery, SearchSync, StorageType};
use tempfile::TempDir;
use tracing::Level;

pub fn setup_test_tracing() -> tracing::subscriber::DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_default(subscriber)
}

/// Blog-like model: integer key plus one attribute of every textual flavour
pub fn blob(name: &str, searchable: &[&str]) -> ModelDescriptor {
    ModelDescriptor::new(name)
        .add_primary_key("id", StorageType::Integer)
        .add_field("title", StorageType::Text)
        .add_field("content", StorageType::String)
        .add_field("blurb", StorageType::Unicode)
        .add_field("ignored", StorageType::Unicode)
        .add_field("created", StorageType::DateTime)
        .searchable(searchable.iter().copied())
}

pub fn object_a() -> ModelDescriptor {
    blob("ObjectA", &["title", "content", "blurb"])
}

/// Repeats a searchable name on purpose
pub fn object_b() -> ModelDescriptor {
    blob("ObjectB", &["title", "content", "content"])
}

/// Marks an attribute it does not have as searchable
pub fn object_c() -> ModelDescriptor {
    blob("ObjectC", &["title", "field_that_doesnt_exist"])
}

pub fn post(model: &str, title: &str, content: &str) -> Record {
    Record::new(model)
        .with("title", title)
        .with("content", content)
        .with("blurb", FieldValue::Null)
        .with("created", Utc::now())
}

pub fn post_created(model: &str, title: &str, created: DateTime<Utc>) -> Record {
    Record::new(model).with("title", title).with("created", created)
}

/// Record store with the sync layer attached, indices under a temp dir
pub struct Fixture {
    pub dir: TempDir,
    pub sync: Arc<SearchSync>,
    pub store: MemoryStore,
}

impl Fixture {
    pub fn new() -> Self {
        Fixture::with_config(|config| config)
    }

    pub fn with_config(configure: impl FnOnce(Config) -> Config) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = configure(Config::default().with_index_base(dir.path().join("search")));
        Fixture::open(dir, config)
    }

    /// A second process over the same index directory
    pub fn reopen(dir: TempDir) -> Self {
        let config = Config::default().with_index_base(dir.path().join("search"));
        Fixture::open(dir, config)
    }

    fn open(dir: TempDir, config: Config) -> Self {
        let sync = Arc::new(SearchSync::new(config));
        let store = MemoryStore::new();
        store.attach(sync.clone());
        Fixture { dir, sync, store }
    }

    pub fn register(&self, descriptor: ModelDescriptor) {
        self.store.create_table(&descriptor).unwrap();
        self.sync.register_model(descriptor).unwrap();
    }

    pub fn insert(&self, records: Vec<Record>) -> Vec<i64> {
        let mut tx = Transaction::begin();
        for record in records {
            tx.insert(record).unwrap();
        }
        self.store
            .commit(&mut tx)
            .unwrap()
            .iter()
            .map(|m| id_of(&m.entity))
            .collect()
    }

    pub fn delete(&self, model: &str, id: i64) {
        let mut tx = Transaction::begin();
        tx.delete(model, id).unwrap();
        self.store.commit(&mut tx).unwrap();
    }

    pub fn titles(&self, query: &SearchQuery) -> Vec<String> {
        query
            .all(&self.store)
            .unwrap()
            .iter()
            .map(|r| r.text("title").unwrap_or_default().to_string())
            .collect()
    }

    pub fn ids(&self, query: &SearchQuery) -> Vec<i64> {
        query.all(&self.store).unwrap().iter().map(id_of).collect()
    }

    pub fn count(&self, model: &str, text: &str) -> usize {
        self.sync
            .search(model, text, &Default::default())
            .unwrap()
            .count(&self.store)
            .unwrap()
    }
}

pub fn id_of(record: &Record) -> i64 {
    record.get("id").and_then(FieldValue::as_i64).unwrap()
}
