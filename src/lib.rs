pub mod core;
pub mod storage;
pub mod analysis;
pub mod schema;
pub mod index;
pub mod search;
pub mod query;
pub mod writer;

pub use crate::core::config::Config;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::sync::SearchSync;
pub use crate::core::types::{Entity, FieldValue, Mutation, MutationKind, Record};
pub use crate::query::filter::Filter;
pub use crate::query::search_query::SearchQuery;
pub use crate::schema::model::{Attribute, ModelDescriptor, StorageType};
pub use crate::search::executor::SearchOptions;

/*
┌──────────────────────────────────── INDEXMIRROR LAYOUT ────────────────────────────────────┐
│                                                                                             │
│   storage engine (RecordStore)                                                              │
│        │ commit(tx)                                                                         │
│        ▼                                                                                    │
│   CommitListener::after_commit(&[Mutation<E>])                                              │
│        │                                                                                    │
│        ▼                                                                                    │
│  ┌───────────────────────────── struct SearchSync ─────────────────────────────┐            │
│  │ config: Config                    // index_base, analyzers, write policy    │            │
│  │ analyzers: AnalyzerRegistry       // named tantivy TextAnalyzers            │            │
│  │ models: RwLock<HashMap<name, Arc<ModelDescriptor>>>                         │            │
│  │ registry: IndexRegistry           // Mutex<HashMap<name, Arc<IndexHandle>>> │            │
│  └─────────────────────────────────────────────────────────────────────────────┘            │
│        │ flush                                                                              │
│        ▼                                                                                    │
│   MutationCollector ──► ModelBatch per model ──► IndexWriter (Upsert | DeleteThenWrite)     │
│                                                        │ ScopedWriter: commit or rollback   │
│                                                        ▼                                    │
│                                   <index_base>/<Model>/  (tantivy index)                    │
│                                                        │                                    │
│   SearchQuery::search ──► SearchExecutor ──► RankedResults ──► Filter::KeyIn + RankMap      │
│        │                                                                                    │
│        ▼                                                                                    │
│   RecordStore::scan(filter) ──► RankedRows (heap re-order by rank)                          │
│                                                                                             │
└─────────────────────────────────────────────────────────────────────────────────────────────┘
*/
