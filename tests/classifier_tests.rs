mod support;

use std::sync::Arc;
use std::thread;

use shapeguard::checker::CheckerChain;
use shapeguard::classifier::{Classifier, Mode};
use shapeguard::parser::Tokenizer;
use shapeguard::storage::MemoryStorage;
use shapeguard::store::Log;
use support::{memory_firewall, productive_firewall, query, WORLD_QUERY};

#[test]
fn learned_world_query_is_accepted_in_productive_mode() {
    let firewall = productive_firewall(&[WORLD_QUERY]);

    assert!(firewall.accept(WORLD_QUERY, "world", "tester").unwrap());
    assert!(firewall.read_log_entries().is_empty());
}

#[test]
fn appended_tautology_is_a_filter_violation() {
    let firewall = productive_firewall(&[WORLD_QUERY]);

    let attack = format!("{WORLD_QUERY} WHERE 1=1 OR 1=1");
    assert!(!firewall.accept(&attack, "world", "tester").unwrap());

    let entries = firewall.read_log_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].query(), attack);
    assert_eq!(entries[0].database(), "world");
    assert_eq!(entries[0].database_user(), "tester");
    assert!(
        entries[0].violation().starts_with("Filter violated"),
        "got {}",
        entries[0].violation()
    );
}

#[test]
fn learned_query_is_not_accepted_for_another_user() {
    let firewall = productive_firewall(&[WORLD_QUERY]);

    assert!(!firewall.accept(WORLD_QUERY, "world", "other").unwrap());
    assert!(!firewall.accept(WORLD_QUERY, "other_db", "tester").unwrap());

    let entries = firewall.read_log_entries();
    assert_eq!(entries.len(), 2);
    assert!(entries
        .iter()
        .all(|entry| entry.violation().starts_with("No learned query")));
    assert_eq!(entries[0].database(), "other_db", "most recent entry first");
}

#[test]
fn empty_store_rejects_everything() {
    let (firewall, _) = memory_firewall();
    firewall.set_mode(Mode::Productive);

    assert!(!firewall.accept("SELECT 1", "world", "tester").unwrap());
    assert_eq!(firewall.read_log_entries().len(), 1);
}

#[test]
fn different_literals_match_the_learned_shape() {
    let firewall = productive_firewall(&["SELECT id, name FROM city WHERE countrycode = 'NLD'"]);

    assert!(firewall
        .accept("SELECT name FROM city WHERE countrycode = 'DEU'", "world", "tester")
        .unwrap());
    assert!(!firewall
        .accept("SELECT password FROM city WHERE countrycode = 'DEU'", "world", "tester")
        .unwrap());
}

#[test]
fn learning_is_unconditional_and_idempotent() {
    let (firewall, _) = memory_firewall();

    for _ in 0..3 {
        assert!(firewall.accept(WORLD_QUERY, "world", "tester").unwrap());
    }
    assert!(firewall
        .accept("SELECT password FROM users WHERE 1 = 1", "world", "tester")
        .unwrap());
    assert_eq!(firewall.read_learned_queries().len(), 2);
    assert!(firewall.read_log_entries().is_empty());
}

#[test]
fn productive_mode_never_changes_the_store() {
    let firewall = productive_firewall(&[WORLD_QUERY]);
    firewall
        .accept("SELECT password FROM users", "world", "tester")
        .unwrap();
    firewall.accept(WORLD_QUERY, "world", "tester").unwrap();
    assert_eq!(firewall.read_learned_queries().len(), 1);
}

#[test]
fn union_appended_to_learned_query_is_a_statement_violation() {
    let firewall = productive_firewall(&["SELECT name FROM city WHERE id = 1"]);

    assert!(!firewall
        .accept(
            "SELECT name FROM city WHERE id = 1 UNION SELECT password FROM users",
            "world",
            "tester"
        )
        .unwrap());
    let entries = firewall.read_log_entries();
    assert!(entries[0].violation().starts_with("Statement violated"));
}

#[test]
fn last_candidate_supplies_the_violation() {
    let firewall = productive_firewall(&[
        "SELECT name FROM country",
        "SELECT name FROM city WHERE id = 1",
    ]);

    assert!(!firewall
        .accept("SELECT name FROM city WHERE id = 1 OR 1 = 1", "world", "tester")
        .unwrap());
    assert!(firewall.read_log_entries()[0]
        .violation()
        .starts_with("Filter violated"));
}

#[test]
fn switching_back_to_learning_keeps_state() {
    let firewall = productive_firewall(&[WORLD_QUERY]);
    firewall.accept("SELECT 1", "world", "tester").unwrap();

    firewall.set_mode(Mode::Learning);
    assert_eq!(firewall.mode(), Mode::Learning);
    assert!(firewall.accept("SELECT 1", "world", "tester").unwrap());
    assert_eq!(firewall.read_learned_queries().len(), 2);
    assert_eq!(firewall.read_log_entries().len(), 1);
}

#[test]
fn reset_clears_store_log_and_mode() {
    let firewall = productive_firewall(&[WORLD_QUERY]);
    firewall.accept("SELECT 1", "world", "tester").unwrap();

    firewall.reset().unwrap();
    assert_eq!(firewall.mode(), Mode::Learning);
    assert!(firewall.read_learned_queries().is_empty());
    assert!(firewall.read_log_entries().is_empty());
}

#[test]
fn storage_failure_surfaces_as_storage_unavailable() {
    let (firewall, storage) = memory_firewall();
    storage.set_available(false);

    let err = firewall
        .accept(WORLD_QUERY, "world", "tester")
        .expect_err("persisting should fail");
    assert!(matches!(err, shapeguard::Error::StorageUnavailable(_)));

    storage.set_available(true);
    firewall.set_mode(Mode::Productive);
    storage.set_available(false);
    let err = firewall
        .accept("SELECT 1", "world", "tester")
        .expect_err("log persisting should fail");
    assert!(matches!(err, shapeguard::Error::StorageUnavailable(_)));
}

#[test]
fn log_ignores_absent_entries() {
    let mut log = Log::open(Arc::new(MemoryStorage::new())).unwrap();
    log.write(None).unwrap();
    assert!(log.is_empty());
}

#[test]
fn concurrent_productive_decisions_are_all_logged() {
    let classifier = Arc::new(
        Classifier::new(
            CheckerChain::standard(),
            &Tokenizer::default(),
            Arc::new(MemoryStorage::new()),
        )
        .unwrap(),
    );
    classifier
        .accept(&query(WORLD_QUERY, "world", "tester"))
        .unwrap();
    classifier.set_mode(Mode::Productive);

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let classifier = Arc::clone(&classifier);
            thread::spawn(move || {
                for i in 0..25 {
                    let accepted = classifier
                        .accept(&query(WORLD_QUERY, "world", "tester"))
                        .unwrap();
                    assert!(accepted);
                    let attack = format!("SELECT password FROM users WHERE id = {worker}{i}");
                    assert!(!classifier
                        .accept(&query(&attack, "world", "tester"))
                        .unwrap());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker should not panic");
    }

    assert_eq!(classifier.log_entries().len(), 8 * 25);
    assert_eq!(classifier.learned_queries().len(), 1);
}
