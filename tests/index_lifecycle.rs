mod util;

use std::fs;
use std::sync::Arc;
use indexmirror::core::config::Config;
use indexmirror::storage::transaction::Transaction;
use indexmirror::writer::index_writer::WritePolicy;
use indexmirror::{ErrorKind, Mutation, Record, SearchOptions, SearchSync};
use util::{blob, object_a, post, setup_test_tracing, Fixture};

#[test]
fn registry_hands_out_one_handle_per_model() {
    let fx = Fixture::new();
    fx.register(object_a());

    let first = fx.sync.index("ObjectA").unwrap();
    let meta = first.path().join("meta.json");
    let modified = fs::metadata(&meta).unwrap().modified().unwrap();

    let second = fx.sync.index("ObjectA").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(fs::metadata(&meta).unwrap().modified().unwrap(), modified);
    assert_eq!(fx.sync.registry().cached_models(), vec!["ObjectA".to_string()]);
}

#[test]
fn concurrent_first_access_shares_the_handle() {
    let fx = Fixture::new();
    fx.register(object_a());

    let handles: Vec<_> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| fx.sync.index("ObjectA").unwrap()))
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
}

#[test]
fn reopened_index_keeps_documents() {
    let fx = Fixture::new();
    fx.register(object_a());
    fx.insert(vec![post("ObjectA", "my title", "hello world")]);

    let Fixture { dir, .. } = fx;
    let fx = Fixture::reopen(dir);
    fx.register(object_a());

    let handle = fx.sync.index("ObjectA").unwrap();
    assert_eq!(handle.num_docs(), 1);
    assert_eq!(handle.count_key("1").unwrap(), 1);
}

#[test]
fn update_and_delete_round_trip() {
    let _guard = setup_test_tracing();
    let fx = Fixture::new();
    fx.register(object_a());
    let ids = fx.insert(vec![post("ObjectA", "original title", "")]);
    let key = ids[0].to_string();

    let mut tx = Transaction::begin();
    tx.update(Record::new("ObjectA").with("id", ids[0]).with("title", "renamed heading")).unwrap();
    fx.store.commit(&mut tx).unwrap();

    let handle = fx.sync.index("ObjectA").unwrap();
    assert_eq!(handle.count_key(&key).unwrap(), 1);
    assert_eq!(fx.count("ObjectA", "heading"), 1);
    assert_eq!(fx.count("ObjectA", "original"), 0);

    fx.delete("ObjectA", ids[0]);
    assert_eq!(handle.count_key(&key).unwrap(), 0);
    assert_eq!(handle.num_docs(), 0);
}

fn policy_run(policy: WritePolicy) -> (Vec<i64>, u64) {
    let fx = Fixture::with_config(|config| config.with_write_policy(policy));
    fx.register(object_a());

    let batch = vec![
        Mutation::insert(post("ObjectA", "first draft", "").with("id", 1)),
        Mutation::insert(post("ObjectA", "keeper draft", "").with("id", 2)),
        Mutation::update(post("ObjectA", "second draft", "").with("id", 1)),
        Mutation::insert(post("ObjectA", "doomed draft", "").with("id", 3)),
        Mutation::delete(post("ObjectA", "doomed draft", "").with("id", 3)),
    ];
    fx.sync.flush(&batch).unwrap();

    let hits = fx.sync.index("ObjectA").unwrap();
    let mut keys: Vec<i64> = fx
        .sync
        .search("ObjectA", "draft", &SearchOptions::new())
        .unwrap()
        .ranks()
        .unwrap()
        .keys()
        .map(|k| k.parse().unwrap())
        .collect();
    keys.sort();
    (keys, hits.num_docs())
}

#[test]
fn write_policies_reach_the_same_state() {
    let upsert = policy_run(WritePolicy::Upsert);
    let replay = policy_run(WritePolicy::DeleteThenWrite);
    assert_eq!(upsert, (vec![1, 2], 2));
    assert_eq!(upsert, replay);
}

#[test]
fn upsert_policy_coalesces_per_key() {
    let fx = Fixture::new();
    fx.register(object_a());
    let batch = vec![
        Mutation::insert(post("ObjectA", "one", "").with("id", 1)),
        Mutation::update(post("ObjectA", "two", "").with("id", 1)),
        Mutation::update(post("ObjectA", "three", "").with("id", 1)),
    ];
    let stats = fx.sync.flush(&batch).unwrap();
    let model = stats.for_model("ObjectA").unwrap();
    assert_eq!(model.mutations, 3);
    assert_eq!(model.deletes_issued, 1);
    assert_eq!(model.documents_added, 1);
    assert_eq!(fx.count("ObjectA", "three"), 1);
    assert_eq!(fx.count("ObjectA", "one"), 0);
}

#[test]
fn missing_searchable_attribute_rolls_back_the_model_batch() {
    let _guard = setup_test_tracing();
    let fx = Fixture::new();
    fx.register(object_a());

    let batch = vec![
        Mutation::insert(Record::new("ObjectA").with("id", 1).with("title", "fine").with("content", "").with("blurb", "")),
        Mutation::insert(Record::new("ObjectA").with("id", 2).with("title", "no content")),
    ];
    let err = fx.sync.flush(&batch).unwrap_err();
    assert!(err.is(ErrorKind::DataShape), "{}", err);

    let handle = fx.sync.index("ObjectA").unwrap();
    assert_eq!(handle.num_docs(), 0);

    // The writer lock was released by the rollback
    let ok = vec![Mutation::insert(post("ObjectA", "fine", "").with("id", 1))];
    fx.sync.flush(&ok).unwrap();
    assert_eq!(handle.num_docs(), 1);
}

#[test]
fn reindex_replaces_documents_from_rows() {
    let fx = Fixture::new();
    fx.register(object_a());
    fx.insert(vec![post("ObjectA", "alpha", ""), post("ObjectA", "beta", "")]);

    // Stale document the store no longer knows about
    fx.sync
        .flush(&[Mutation::insert(post("ObjectA", "ghost", "").with("id", 99))])
        .unwrap();
    assert_eq!(fx.sync.stats("ObjectA").unwrap().num_docs, 3);

    let rows = fx.store.rows("ObjectA").unwrap();
    let stats = fx.sync.reindex("ObjectA", &rows).unwrap();
    assert_eq!(stats.documents_added, 2);
    assert_eq!(fx.sync.stats("ObjectA").unwrap().num_docs, 2);
    assert_eq!(fx.count("ObjectA", "ghost"), 0);
}

#[test]
fn rebuild_picks_up_a_changed_descriptor() {
    let fx = Fixture::new();
    fx.register(blob("Article", &["title"]));
    fx.insert(vec![post("Article", "my title", "hello world")]);
    assert_eq!(fx.count("Article", "hello"), 0);

    // Open index keeps its stored layout until rebuilt
    fx.sync.register_model(blob("Article", &["title", "content"])).unwrap();
    assert_eq!(fx.count("Article", "hello"), 0);

    let rows = fx.store.rows("Article").unwrap();
    fx.sync.rebuild("Article", &rows).unwrap();
    assert_eq!(fx.count("Article", "hello"), 1);

    let stats = fx.sync.stats("Article").unwrap();
    assert_eq!(stats.num_docs, 1);
    assert_eq!(stats.text_fields, vec!["title".to_string(), "content".to_string()]);
}

#[test]
fn rebuild_retires_handles_taken_before_it() {
    let _guard = setup_test_tracing();
    let fx = Fixture::new();
    fx.register(object_a());
    fx.insert(vec![post("ObjectA", "old title", "")]);
    let old = fx.sync.index("ObjectA").unwrap();

    let rows = fx.store.rows("ObjectA").unwrap();
    fx.sync.rebuild("ObjectA", &rows).unwrap();

    assert!(old.is_retired());
    assert!(old.writer().unwrap_err().is(ErrorKind::InvalidState));
    let current = fx.sync.index("ObjectA").unwrap();
    assert!(!Arc::ptr_eq(&old, &current));
    assert!(!current.is_retired());

    // Later commits land in the rebuilt index
    fx.insert(vec![post("ObjectA", "fresh title", "")]);
    assert_eq!(current.num_docs(), 2);
    assert_eq!(fx.count("ObjectA", "fresh"), 1);
}

#[test]
fn flushes_racing_a_rebuild_are_not_lost() {
    let fx = Fixture::new();
    fx.register(object_a());
    fx.insert(vec![post("ObjectA", "seed title", "").with("id", 1)]);
    let rows = fx.store.rows("ObjectA").unwrap();

    std::thread::scope(|scope| {
        let rebuilder = scope.spawn(|| {
            for _ in 0..4 {
                fx.sync.rebuild("ObjectA", &rows).unwrap();
            }
        });
        let flusher = scope.spawn(|| {
            for id in 2..10 {
                let batch = vec![Mutation::insert(post("ObjectA", "raced title", "").with("id", id))];
                fx.sync.flush(&batch).unwrap();
            }
        });
        rebuilder.join().unwrap();
        flusher.join().unwrap();
    });

    // Every document is either the seed or a flush that ran after the last rebuild
    let handle = fx.sync.index("ObjectA").unwrap();
    assert!(!handle.is_retired());
    assert_eq!(handle.count_key("1").unwrap(), 1);
    assert!(handle.num_docs() >= 1 && handle.num_docs() <= 9);
}

#[test]
fn config_file_drives_the_sync_layer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("search.json");
    let index_base = dir.path().join("idx");
    fs::write(
        &path,
        format!(
            r#"{{"index_base": {:?}, "default_analyzer": "standard", "write_policy": "delete_then_write"}}"#,
            index_base.display().to_string()
        ),
    )
    .unwrap();

    let config = Config::from_json_file(&path).unwrap();
    assert_eq!(config.write_policy, WritePolicy::DeleteThenWrite);

    let sync = SearchSync::new(config);
    sync.register_model(object_a()).unwrap();
    sync.flush(&[Mutation::insert(post("ObjectA", "running titles", "").with("id", 1))])
        .unwrap();

    // No stemming: only the exact token matches
    assert_eq!(
        sync.search("ObjectA", "running", &SearchOptions::new()).unwrap().ranks().unwrap().len(),
        1
    );
    assert_eq!(
        sync.search("ObjectA", "run", &SearchOptions::new()).unwrap().ranks().unwrap().len(),
        0
    );
    assert!(index_base.join("ObjectA").join("meta.json").exists());
}
