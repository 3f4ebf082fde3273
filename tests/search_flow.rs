mod util;

use chrono::{Duration, Utc};
use indexmirror::storage::transaction::Transaction;
use indexmirror::{ErrorKind, Filter, Record, SearchOptions};
use util::{object_a, object_b, object_c, post, post_created, setup_test_tracing, Fixture};

const TITLE1: &str = "a slightly long title";
const TITLE2: &str = "another title";

#[test]
fn added_entry_is_searchable() {
    let _guard = setup_test_tracing();
    let fx = Fixture::new();
    fx.register(object_a());

    fx.insert(vec![Record::new("ObjectA").with("title", "title").with("blurb", "this is a blurb")]);
    assert_eq!(fx.count("ObjectA", "blurb"), 1);
}

#[test]
fn simple_search_counts() {
    let fx = Fixture::new();
    fx.register(object_a());
    fx.insert(vec![post("ObjectA", TITLE1, "hello world")]);

    assert_eq!(fx.count("ObjectA", "what"), 0);
    assert_eq!(fx.count("ObjectA", "no match"), 0);
    assert_eq!(fx.count("ObjectA", "title"), 1);
    assert_eq!(fx.count("ObjectA", "hello"), 1);
}

#[test]
fn shorter_title_ranks_first_and_deletes_drop_out() {
    let _guard = setup_test_tracing();
    let fx = Fixture::new();
    fx.register(object_a());
    let ids = fx.insert(vec![
        post("ObjectA", TITLE1, "hello world"),
        post("ObjectA", TITLE2, "a different message"),
    ]);

    let query = fx.sync.search("ObjectA", "title", &SearchOptions::new()).unwrap();
    assert_eq!(fx.titles(&query), vec![TITLE2, TITLE1]);
    let again = fx.sync.search("ObjectA", "title", &SearchOptions::new()).unwrap();
    assert_eq!(again.ranks(), query.ranks());
    assert_eq!(fx.titles(&again), fx.titles(&query));

    let none = fx.sync.search("ObjectA", "what", &SearchOptions::new()).unwrap();
    assert!(fx.titles(&none).is_empty());

    fx.delete("ObjectA", ids[1]);
    let query = fx.sync.search("ObjectA", "title", &SearchOptions::new()).unwrap();
    assert_eq!(fx.titles(&query), vec![TITLE1]);
}

#[test]
fn term_frequency_orders_equal_length_titles() {
    let fx = Fixture::new();
    fx.register(object_a());
    fx.insert(vec![
        post("ObjectA", "zebra title yak", ""),
        post("ObjectA", "title title title", ""),
        post("ObjectA", "title title yak", ""),
    ]);

    let query = fx.sync.search("ObjectA", "title", &SearchOptions::new()).unwrap();
    assert_eq!(
        fx.titles(&query),
        vec!["title title title", "title title yak", "zebra title yak"]
    );
    let ranks = query.ranks().unwrap();
    assert_eq!(ranks.len(), 3);
}

#[test]
fn tables_dont_interfere() {
    let fx = Fixture::new();
    fx.register(object_a());
    fx.register(object_b());
    fx.insert(vec![
        post("ObjectA", TITLE1, "hello world"),
        post("ObjectB", "what title", "hello world"),
    ]);

    assert_eq!(fx.count("ObjectA", "what"), 0);
    assert_eq!(fx.count("ObjectA", "title"), 1);
    assert_eq!(fx.count("ObjectB", "what"), 1);
    assert_eq!(fx.count("ObjectB", "title"), 1);
}

#[test]
fn search_multiple_rows() {
    let fx = Fixture::new();
    fx.register(object_a());
    fx.insert(vec![
        post("ObjectA", TITLE1, "hello world"),
        post("ObjectA", TITLE2, "a different message"),
        post("ObjectA", "ceci n'est pas un titre", "yet another message"),
    ]);
    assert_eq!(fx.count("ObjectA", "title"), 2);
    assert_eq!(fx.count("ObjectA", "message"), 2);
}

#[test]
fn undeclared_searchable_attribute_fails_the_commit() {
    let _guard = setup_test_tracing();
    let fx = Fixture::new();
    fx.register(object_b());
    fx.register(object_c());

    fx.insert(vec![post("ObjectB", "my title", "hello world")]);

    let mut tx = Transaction::begin();
    tx.insert(post("ObjectC", "my title", "hello world")).unwrap();
    let err = fx.store.commit(&mut tx).unwrap_err();
    assert!(err.is(ErrorKind::Config), "{}", err);

    // Storage already committed; only indexing failed
    assert_eq!(fx.store.len("ObjectC"), 1);
    assert_eq!(fx.count("ObjectB", "title"), 1);
}

#[test]
fn chained_searches_intersect() {
    let fx = Fixture::new();
    fx.register(object_a());
    fx.insert(vec![
        post("ObjectA", "title test one", ""),
        post("ObjectA", "test title two", ""),
        post("ObjectA", "title three", ""),
        post("ObjectA", "test four", ""),
    ]);

    let query = fx
        .sync
        .search("ObjectA", "title", &SearchOptions::new())
        .unwrap()
        .search("test", &SearchOptions::new())
        .unwrap();
    assert_eq!(query.count(&fx.store).unwrap(), 2);

    let mut titles = fx.titles(&query);
    titles.sort();
    assert_eq!(titles, vec!["test title two", "title test one"]);
}

#[test]
fn empty_result_stays_empty_under_filters() {
    let fx = Fixture::new();
    fx.register(object_a());
    fx.insert(vec![post("ObjectA", TITLE1, "hello world")]);

    let query = fx.sync.search("ObjectA", "what", &SearchOptions::new()).unwrap();
    assert!(query.is_empty_result());
    assert!(query.ranks().is_some_and(|r| r.is_empty()));
    assert_eq!(query.count(&fx.store).unwrap(), 0);

    let narrowed = query.filter(Filter::gt("id", 0));
    assert_eq!(narrowed.count(&fx.store).unwrap(), 0);
    assert_eq!(narrowed.to_sql().0.sql, "1 = 0");

    let unsearched = fx.sync.query("ObjectA").unwrap();
    assert!(unsearched.ranks().is_none());
    assert_eq!(unsearched.count(&fx.store).unwrap(), 1);
}

#[test]
fn field_subset_and_term_logic() {
    let fx = Fixture::new();
    fx.register(object_a());
    fx.insert(vec![post("ObjectA", "my title", "hello world")]);

    let only_title = SearchOptions::new().fields(["title"]);
    let only_content = SearchOptions::new().fields(["content"]);
    let search = |text: &str, options: &SearchOptions| {
        fx.sync.search("ObjectA", text, options).unwrap().count(&fx.store).unwrap()
    };

    assert_eq!(search("hello", &only_title), 0);
    assert_eq!(search("hello", &only_content), 1);
    assert_eq!(search("hello dude", &SearchOptions::new()), 0);
    assert_eq!(search("hello dude", &SearchOptions::new().or()), 1);

    // An explicit field in the text wins over the default field subset
    assert_eq!(search("content:hello", &only_title), 1);
    assert_eq!(search("title:hello", &only_content), 0);

    let err = fx
        .sync
        .search("ObjectA", "hello", &SearchOptions::new().fields(["ignored"]))
        .unwrap_err();
    assert!(err.is(ErrorKind::InvalidArgument));
}

#[test]
fn limit_keeps_best_hits() {
    let fx = Fixture::new();
    fx.register(object_a());
    fx.insert(vec![
        post("ObjectA", "title yak zebra", ""),
        post("ObjectA", "title title title", ""),
        post("ObjectA", "title title zebra", ""),
    ]);

    let query = fx.sync.search("ObjectA", "title", &SearchOptions::new().limit(2)).unwrap();
    assert_eq!(fx.titles(&query), vec!["title title title", "title title zebra"]);

    let zero = fx.sync.search("ObjectA", "title", &SearchOptions::new().limit(0)).unwrap();
    assert_eq!(zero.count(&fx.store).unwrap(), 0);

    let huge = fx.sync.search("ObjectA", "title", &SearchOptions::new().limit(usize::MAX)).unwrap();
    assert_eq!(huge.ranks().unwrap().len(), 3);
    assert_eq!(fx.titles(&huge)[0], "title title title");
}

#[test]
fn stray_query_syntax_does_not_fail_the_search() {
    let _guard = setup_test_tracing();
    let fx = Fixture::new();
    fx.register(object_a());
    fx.insert(vec![post("ObjectA", TITLE1, "hello world")]);

    for text in ["title)", "(title", "\"title", "title:", "hello AND", "title -", "title^"] {
        let result = fx.sync.search("ObjectA", text, &SearchOptions::new());
        assert!(result.is_ok(), "{:?} -> {:?}", text, result.err());
        assert!(result.unwrap().count(&fx.store).unwrap() <= 1);
    }

    // The well-formed part still matches
    assert_eq!(fx.count("ObjectA", "title)"), 1);
}

#[test]
fn storage_filter_keeps_rank_order() {
    let fx = Fixture::new();
    fx.register(object_a());
    let now = Utc::now();
    fx.insert(vec![
        post_created("ObjectA", TITLE1, now),
        post_created("ObjectA", "title title", now),
        post_created("ObjectA", "a title that is significantly longer than the others", now - Duration::days(2)),
    ]);

    let recent = fx
        .sync
        .search("ObjectA", "title", &SearchOptions::new())
        .unwrap()
        .filter(Filter::ge("created", now - Duration::days(1)));
    assert_eq!(fx.titles(&recent), vec!["title title", TITLE1]);

    let all = fx
        .sync
        .search("ObjectA", "title", &SearchOptions::new())
        .unwrap()
        .filter(Filter::ge("created", now - Duration::days(3)));
    assert_eq!(fx.titles(&all).len(), 3);
    assert_eq!(fx.titles(&all)[0], "title title");

    let (filter, order) = recent.to_sql();
    assert!(filter.sql.contains("\"created\" >= ?"));
    assert!(order.is_some_and(|o| o.sql.starts_with("CASE \"id\"")));
}
