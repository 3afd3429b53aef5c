//! CRUD and query behavior, exercised identically on both backends.
//!
//! The backend adapter's contract is that a query means the same thing
//! whichever physical backend is active, so almost every test here runs
//! twice: once over the embedded file store, once over in-memory SQLite.

use flatdb_core::{
    CleanupRule, Config, CoreError, Database, Direction, GuardRule, Op, Record, RelationalConfig,
    SqliteBackend, Value,
};
use std::sync::Arc;
use tempfile::TempDir;

fn each_backend(test: impl Fn(&Database)) {
    let tmp = TempDir::new().unwrap();
    let embedded = Database::open(Config::new(tmp.path().join("db"))).unwrap();
    test(&embedded);

    let sqlite = Database::with_backend(Arc::new(SqliteBackend::open_in_memory().unwrap()));
    test(&sqlite);
}

fn seed_players(db: &Database) {
    let players = db.table("players");
    players
        .insert(Record::new().with("name", "A").with("score", 10))
        .unwrap();
    players
        .insert(Record::new().with("name", "B").with("score", 30))
        .unwrap();
    players
        .insert(Record::new().with("name", "C").with("score", 20))
        .unwrap();
}

fn names(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.get("name").unwrap().as_text().unwrap().to_string())
        .collect()
}

#[test]
fn serialized_inserts_yield_dense_ids() {
    each_backend(|db| {
        let ids: Vec<i64> = (0..5)
            .map(|n| {
                db.table("items")
                    .insert(Record::new().with("n", Value::Integer(n)))
                    .unwrap()
            })
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    });
}

#[test]
fn insert_then_select_by_id_round_trips() {
    each_backend(|db| {
        let inserted = Record::new().with("name", "A").with("score", 10);
        let id = db.table("players").insert(inserted.clone()).unwrap();

        let found = db
            .table("players")
            .filter("id", Op::Eq, id)
            .get()
            .unwrap()
            .expect("record should exist");

        let mut expected = inserted;
        expected.assign_id(id);
        assert_eq!(found, expected);
    });
}

#[test]
fn insert_rejects_caller_supplied_id() {
    each_backend(|db| {
        let err = db
            .table("players")
            .insert(Record::new().with("id", 1).with("name", "A"))
            .unwrap_err();
        assert!(matches!(err, CoreError::IdNotAssignable));
        assert!(db.table("players").all(None).unwrap().is_empty());
    });
}

#[test]
fn descending_order_scenario() {
    each_backend(|db| {
        seed_players(db);
        let all = db
            .table("players")
            .order("score", Direction::Desc)
            .all(None)
            .unwrap();
        assert_eq!(names(&all), ["B", "C", "A"]);
    });
}

#[test]
fn unordered_filter_keeps_insertion_order() {
    each_backend(|db| {
        seed_players(db);
        let over_15 = db
            .table("players")
            .filter("score", Op::Gt, 15)
            .all(None)
            .unwrap();
        assert_eq!(names(&over_15), ["B", "C"]);
    });
}

#[test]
fn get_on_empty_result_is_the_sentinel() {
    each_backend(|db| {
        seed_players(db);
        let missing = db.table("players").filter("id", Op::Eq, 999).get().unwrap();
        assert!(missing.is_none());
        // An unknown table is an empty collection, also not an error.
        assert!(db.table("ghost").get().unwrap().is_none());
    });
}

#[test]
fn limit_caps_after_filter_and_sort() {
    each_backend(|db| {
        seed_players(db);
        let top_two = db
            .table("players")
            .order("score", Direction::Desc)
            .all(Some(2))
            .unwrap();
        assert_eq!(names(&top_two), ["B", "C"]);
    });
}

#[test]
fn last_of_ordered_takes_the_requested_orders_tail() {
    each_backend(|db| {
        seed_players(db);
        // Ascending order, last element: the maximum by score.
        let best = db
            .table("players")
            .order("score", Direction::Asc)
            .last_of_ordered()
            .unwrap()
            .unwrap();
        assert_eq!(best.get("name"), Some(&Value::Text("B".into())));

        // No reversal is implied: descending order ends at the minimum.
        let worst = db
            .table("players")
            .order("score", Direction::Desc)
            .last_of_ordered()
            .unwrap()
            .unwrap();
        assert_eq!(worst.get("name"), Some(&Value::Text("A".into())));

        assert!(db
            .table("players")
            .filter("score", Op::Gt, 100)
            .last_of_ordered()
            .unwrap()
            .is_none());
    });
}

#[test]
fn update_without_filter_fails_and_changes_nothing() {
    each_backend(|db| {
        seed_players(db);
        let err = db
            .table("players")
            .update(&Record::new().with("score", 0))
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingFilter { .. }));

        let untouched = db.table("players").all(None).unwrap();
        assert_eq!(untouched.len(), 3);
        assert!(untouched
            .iter()
            .all(|r| r.get("score") != Some(&Value::Integer(0))));
    });
}

#[test]
fn delete_without_filter_fails() {
    each_backend(|db| {
        seed_players(db);
        let err = db.table("players").delete().unwrap_err();
        assert!(matches!(err, CoreError::MissingFilter { .. }));
        assert_eq!(db.table("players").all(None).unwrap().len(), 3);
    });
}

#[test]
fn update_merges_fields_and_ignores_id_in_patch() {
    each_backend(|db| {
        seed_players(db);
        let touched = db
            .table("players")
            .filter("score", Op::Ge, 20)
            .update(&Record::new().with("rank", "pro").with("id", 999))
            .unwrap();
        assert_eq!(touched, 2);

        let all = db.table("players").all(None).unwrap();
        assert_eq!(all[0].get("rank"), None);
        assert_eq!(all[1].get("rank"), Some(&Value::Text("pro".into())));
        assert_eq!(all[2].get("rank"), Some(&Value::Text("pro".into())));
        // Untouched fields survive the merge; ids never move.
        assert_eq!(all[1].get("name"), Some(&Value::Text("B".into())));
        assert_eq!(
            all.iter().map(|r| r.id().unwrap()).collect::<Vec<_>>(),
            [1, 2, 3]
        );
    });
}

#[test]
fn delete_removes_only_matching_records() {
    each_backend(|db| {
        seed_players(db);
        let removed = db
            .table("players")
            .filter("score", Op::Lt, 25)
            .delete()
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(names(&db.table("players").all(None).unwrap()), ["B"]);
    });
}

#[test]
fn guarded_delete_blocks_when_referenced() {
    each_backend(|db| {
        let author = db
            .table("authors")
            .insert(Record::new().with("name", "A"))
            .unwrap();
        db.table("posts")
            .insert(Record::new().with("author_id", author))
            .unwrap();
        db.table("posts")
            .insert(Record::new().with("author_id", author))
            .unwrap();

        let guards = [GuardRule::on("posts")
            .filter("author_id", Op::Eq, author)
            .label("posts by this author")];
        let cleanups = [CleanupRule::on("sessions").filter("author_id", Op::Eq, author)];

        let err = db
            .guard_delete("authors", author, &guards, &cleanups)
            .unwrap_err();
        match err {
            CoreError::GuardBlocked { blockers } => {
                assert_eq!(blockers.len(), 1);
                assert_eq!(blockers[0].label, "posts by this author");
                assert_eq!(blockers[0].count, 2);
            }
            other => panic!("expected GuardBlocked, got {other}"),
        }
        // Target still exists, nothing was cleaned up.
        assert_eq!(db.table("authors").all(None).unwrap().len(), 1);
    });
}

#[test]
fn guarded_delete_cleans_up_when_clear() {
    each_backend(|db| {
        let author = db
            .table("authors")
            .insert(Record::new().with("name", "A"))
            .unwrap();
        db.table("sessions")
            .insert(Record::new().with("author_id", author))
            .unwrap();
        db.table("sessions")
            .insert(Record::new().with("author_id", 999))
            .unwrap();

        let guards = [GuardRule::on("posts").filter("author_id", Op::Eq, author)];
        let cleanups = [CleanupRule::on("sessions").filter("author_id", Op::Eq, author)];

        let existed = db
            .guard_delete("authors", author, &guards, &cleanups)
            .unwrap();
        assert!(existed);
        assert!(db.table("authors").all(None).unwrap().is_empty());
        // Only the author's sessions were cleaned up.
        let sessions = db.table("sessions").all(None).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].get("author_id"), Some(&Value::Integer(999)));
    });
}

#[test]
fn guarded_delete_rejects_unfiltered_cleanup() {
    each_backend(|db| {
        let id = db
            .table("authors")
            .insert(Record::new().with("name", "A"))
            .unwrap();
        let err = db
            .guard_delete("authors", id, &[], &[CleanupRule::on("sessions")])
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingFilter { .. }));
        assert_eq!(db.table("authors").all(None).unwrap().len(), 1);
    });
}

#[test]
fn corrupt_table_document_surfaces_as_storage_error() {
    let tmp = TempDir::new().unwrap();
    let data_dir = tmp.path().join("db");
    let db = Database::open(Config::new(&data_dir)).unwrap();
    db.table("items").insert(Record::new().with("n", 1)).unwrap();

    std::fs::write(data_dir.join("items.json"), b"[{ truncated").unwrap();
    let err = db.table("items").all(None).unwrap_err();
    assert!(matches!(err, CoreError::Storage(_)));
}

#[test]
fn unreachable_relational_config_falls_back_to_embedded() {
    let tmp = TempDir::new().unwrap();
    let data_dir = tmp.path().join("data");
    let bad_sqlite = tmp.path().join("no_such_dir").join("db.sqlite");

    let db = Database::open(
        Config::new(&data_dir).relational(RelationalConfig::new(bad_sqlite)),
    )
    .unwrap();
    db.table("items").insert(Record::new().with("n", 1)).unwrap();

    // The embedded store served the write: the table document is on disk.
    assert!(data_dir.join("items.json").exists());
}

#[test]
fn reachable_relational_config_selects_sqlite() {
    let tmp = TempDir::new().unwrap();
    let data_dir = tmp.path().join("data");
    let sqlite_path = tmp.path().join("db.sqlite");

    let db = Database::open(
        Config::new(&data_dir).relational(RelationalConfig::new(&sqlite_path)),
    )
    .unwrap();
    db.table("items").insert(Record::new().with("n", 1)).unwrap();

    assert!(sqlite_path.exists());
    // The embedded data directory was never touched.
    assert!(!data_dir.exists());
}

#[test]
fn structured_values_round_trip_on_the_embedded_backend_only() {
    let tmp = TempDir::new().unwrap();
    let embedded = Database::open(Config::new(tmp.path().join("db"))).unwrap();
    let record = Record::new()
        .with("active", true)
        .with("tags", vec!["a", "b"]);

    let id = embedded.table("users").insert(record.clone()).unwrap();
    let back = embedded
        .table("users")
        .filter("id", Op::Eq, id)
        .get()
        .unwrap()
        .unwrap();
    assert_eq!(back.get("active"), Some(&Value::Bool(true)));
    assert_eq!(
        back.get("tags"),
        Some(&Value::Array(vec![
            Value::Text("a".into()),
            Value::Text("b".into())
        ]))
    );

    // SQLite keeps write-side coercion on reads: integer for the bool,
    // JSON text for the array. Current contract, asserted as such.
    let sqlite = Database::with_backend(Arc::new(SqliteBackend::open_in_memory().unwrap()));
    let id = sqlite.table("users").insert(record).unwrap();
    let back = sqlite
        .table("users")
        .filter("id", Op::Eq, id)
        .get()
        .unwrap()
        .unwrap();
    assert_eq!(back.get("active"), Some(&Value::Integer(1)));
    assert_eq!(back.get("tags"), Some(&Value::Text(r#"["a","b"]"#.into())));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn serialized_inserts_allocate_exactly_one_to_n(n in 1usize..16) {
            let tmp = TempDir::new().unwrap();
            let db = Database::open(Config::new(tmp.path().join("db"))).unwrap();

            let mut ids = Vec::new();
            for _ in 0..n {
                ids.push(db.table("t").insert(Record::new().with("x", 0)).unwrap());
            }
            let expected: Vec<i64> = (1..=n as i64).collect();
            prop_assert_eq!(ids, expected);
        }

        #[test]
        fn sort_is_stable_over_arbitrary_key_multisets(keys in prop::collection::vec(0i64..5, 1..24)) {
            let tmp = TempDir::new().unwrap();
            let db = Database::open(Config::new(tmp.path().join("db"))).unwrap();

            for (seq, key) in keys.iter().enumerate() {
                db.table("t")
                    .insert(Record::new().with("k", *key).with("seq", seq as i64))
                    .unwrap();
            }

            let sorted = db.table("t").order("k", Direction::Asc).all(None).unwrap();
            let pairs: Vec<(i64, i64)> = sorted
                .iter()
                .map(|r| {
                    (
                        r.get("k").unwrap().as_integer().unwrap(),
                        r.get("seq").unwrap().as_integer().unwrap(),
                    )
                })
                .collect();

            for window in pairs.windows(2) {
                prop_assert!(window[0].0 <= window[1].0);
                if window[0].0 == window[1].0 {
                    // Equal keys keep insertion order.
                    prop_assert!(window[0].1 < window[1].1);
                }
            }
        }
    }
}
