#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use shapeguard::parser::Tokenizer;
use shapeguard::storage::{MemoryStorage, Storage};
use shapeguard::store::Query;
use shapeguard::token::Token;
use shapeguard::{Firewall, FirewallConfig, Mode};

pub(crate) const WORLD_QUERY: &str = "SELECT name FROM City LEFT OUTER JOIN Country ON City.CountryCode = Country.Code";

pub(crate) fn fixture_dir(fixture: &str) -> PathBuf {
    PathBuf::from("tests/fixtures").join(fixture)
}

pub(crate) fn tokenize(sql: &str) -> Token {
    Tokenizer::default()
        .tokenize(sql)
        .expect("test SQL should tokenize")
}

pub(crate) fn query(sql: &str, database: &str, user: &str) -> Query {
    Query::new(sql, tokenize(sql), database, user)
}

/// Children of the root `SELECT` of `sql`.
pub(crate) fn select_children(sql: &str) -> BTreeSet<Token> {
    match tokenize(sql) {
        Token::SelectStatement(children) => children,
        other => panic!("expected a SELECT statement, got {other:?}"),
    }
}

/// Relations of the `FROM` list of `sql`.
pub(crate) fn from_list(sql: &str) -> BTreeSet<Token> {
    select_children(sql)
        .into_iter()
        .find_map(|child| match child {
            Token::FromList(relations) => Some(relations),
            _ => None,
        })
        .expect("no FROM list found")
}

/// Items of the column list of `sql`.
pub(crate) fn column_list(sql: &str) -> BTreeSet<Token> {
    select_children(sql)
        .into_iter()
        .find_map(|child| match child {
            Token::ColumnList(columns) => Some(columns),
            _ => None,
        })
        .expect("no column list found")
}

pub(crate) fn memory_firewall() -> (Firewall, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let firewall = Firewall::new(&FirewallConfig::default(), storage.clone() as Arc<dyn Storage>)
        .expect("default config should build");
    (firewall, storage)
}

/// Firewall that learned `learned` for `(world, tester)` and is now productive.
pub(crate) fn productive_firewall(learned: &[&str]) -> Firewall {
    let (firewall, _) = memory_firewall();
    for sql in learned {
        assert!(firewall
            .accept(sql, "world", "tester")
            .expect("learning should succeed"));
    }
    firewall.set_mode(Mode::Productive);
    firewall
}
