use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::checker::{QueryChecker, Violation};
use crate::store::{LogEntry, Query};
use crate::token::{Token, TokenKind};

static EMPTY: BTreeSet<Token> = BTreeSet::new();

/// The parts of a `SELECT` root the checkers compare. Absent parts are empty.
struct SelectParts<'a> {
    columns: &'a BTreeSet<Token>,
    from: &'a BTreeSet<Token>,
    filter: Option<&'a Token>,
    clauses: BTreeSet<&'a Token>,
}

fn select_parts(root: &Token) -> Option<SelectParts<'_>> {
    let children = root.select_children()?;
    let mut parts = SelectParts {
        columns: &EMPTY,
        from: &EMPTY,
        filter: None,
        clauses: BTreeSet::new(),
    };
    for child in children {
        match child {
            Token::ColumnList(columns) => parts.columns = columns,
            Token::FromList(from) => parts.from = from,
            Token::WhereClause(filter) => parts.filter = Some(filter.as_ref()),
            other => {
                parts.clauses.insert(other);
            }
        }
    }
    Some(parts)
}

enum Pair<'a> {
    Selects(SelectParts<'a>, SelectParts<'a>),
    Identical,
    Incomparable,
}

fn pair<'a>(subject_root: &'a Token, learned_root: &'a Token) -> Pair<'a> {
    match (select_parts(subject_root), select_parts(learned_root)) {
        (Some(subject), Some(learned)) => Pair::Selects(subject, learned),
        _ if subject_root == learned_root => Pair::Identical,
        _ => Pair::Incomparable,
    }
}

fn incomparable(violation: Violation, subject: &Query) -> Option<LogEntry> {
    Some(violation.entry(subject, "statements are not comparable SELECTs"))
}

fn render<'a>(tokens: impl IntoIterator<Item = &'a Token>) -> String {
    let rendered = tokens
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if rendered.is_empty() {
        "none".to_string()
    } else {
        rendered
    }
}

/// Rejects a change of statement topology.
///
/// A plain `SELECT` never matches a set operation; set operations must be
/// identical, since the appended branch of a `UNION` is the typical payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementChecker;

impl QueryChecker for StatementChecker {
    fn name(&self) -> &'static str {
        "statement"
    }

    fn check(
        &self,
        subject_root: &Token,
        subject: &Query,
        learned_root: &Token,
        _learned: &Query,
    ) -> Option<LogEntry> {
        let (subject_kind, learned_kind) = (subject_root.kind(), learned_root.kind());
        if subject_kind != learned_kind {
            return Some(Violation::Statement.entry(
                subject,
                format!("expected {learned_kind}, found {subject_kind}"),
            ));
        }
        if subject_kind == TokenKind::SetOperation && subject_root != learned_root {
            return Some(Violation::Statement.entry(
                subject,
                format!("expected {learned_root}, found {subject_root}"),
            ));
        }
        None
    }
}

/// How projected items of a subject relate to the learned projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnPolicy {
    /// The subject may project any subset of the learned items. A learned
    /// `*` covers every plain column.
    #[default]
    Subset,
    /// The projections must be identical.
    Exact,
}

/// Rejects projected items that were not learned.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnListChecker {
    policy: ColumnPolicy,
}

impl ColumnListChecker {
    /// Checker applying `policy`.
    pub fn new(policy: ColumnPolicy) -> Self {
        Self { policy }
    }
}

impl QueryChecker for ColumnListChecker {
    fn name(&self) -> &'static str {
        "columns"
    }

    fn check(
        &self,
        subject_root: &Token,
        subject: &Query,
        learned_root: &Token,
        _learned: &Query,
    ) -> Option<LogEntry> {
        let (subject_parts, learned_parts) = match pair(subject_root, learned_root) {
            Pair::Selects(subject_parts, learned_parts) => (subject_parts, learned_parts),
            Pair::Identical => return None,
            Pair::Incomparable => return incomparable(Violation::ColumnList, subject),
        };
        let (found, expected) = (subject_parts.columns, learned_parts.columns);

        match self.policy {
            ColumnPolicy::Exact if found != expected => Some(Violation::ColumnList.entry(
                subject,
                format!("expected {}, found {}", render(expected), render(found)),
            )),
            ColumnPolicy::Exact => None,
            ColumnPolicy::Subset => {
                let learned_wildcard = expected.contains(&Token::Wildcard);
                let unexpected: Vec<&Token> = found
                    .iter()
                    .filter(|item| !expected.contains(*item))
                    .filter(|item| !(learned_wildcard && item.kind() == TokenKind::Column))
                    .collect();
                if unexpected.is_empty() {
                    None
                } else {
                    Some(Violation::ColumnList.entry(
                        subject,
                        format!("unexpected {}", render(unexpected)),
                    ))
                }
            }
        }
    }
}

/// Rejects any change of tables, join types, join order or join conditions.
#[derive(Debug, Clone, Copy, Default)]
pub struct FromListChecker;

impl QueryChecker for FromListChecker {
    fn name(&self) -> &'static str {
        "from"
    }

    fn check(
        &self,
        subject_root: &Token,
        subject: &Query,
        learned_root: &Token,
        _learned: &Query,
    ) -> Option<LogEntry> {
        let (subject_parts, learned_parts) = match pair(subject_root, learned_root) {
            Pair::Selects(subject_parts, learned_parts) => (subject_parts, learned_parts),
            Pair::Identical => return None,
            Pair::Incomparable => return incomparable(Violation::FromList, subject),
        };
        if subject_parts.from == learned_parts.from {
            return None;
        }
        Some(Violation::FromList.entry(
            subject,
            format!(
                "expected {}, found {}",
                render(learned_parts.from),
                render(subject_parts.from)
            ),
        ))
    }
}

/// Rejects any change of the `WHERE` predicate shape, including adding or
/// dropping it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterChecker;

impl QueryChecker for FilterChecker {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn check(
        &self,
        subject_root: &Token,
        subject: &Query,
        learned_root: &Token,
        _learned: &Query,
    ) -> Option<LogEntry> {
        let (subject_parts, learned_parts) = match pair(subject_root, learned_root) {
            Pair::Selects(subject_parts, learned_parts) => (subject_parts, learned_parts),
            Pair::Identical => return None,
            Pair::Incomparable => return incomparable(Violation::Filter, subject),
        };
        if subject_parts.filter == learned_parts.filter {
            return None;
        }
        Some(Violation::Filter.entry(
            subject,
            format!(
                "expected {}, found {}",
                render(learned_parts.filter),
                render(subject_parts.filter)
            ),
        ))
    }
}

/// Rejects changes of `DISTINCT`, `GROUP BY`, `HAVING`, `ORDER BY` and `LIMIT`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClauseChecker;

impl QueryChecker for ClauseChecker {
    fn name(&self) -> &'static str {
        "clauses"
    }

    fn check(
        &self,
        subject_root: &Token,
        subject: &Query,
        learned_root: &Token,
        _learned: &Query,
    ) -> Option<LogEntry> {
        let (subject_parts, learned_parts) = match pair(subject_root, learned_root) {
            Pair::Selects(subject_parts, learned_parts) => (subject_parts, learned_parts),
            Pair::Identical => return None,
            Pair::Incomparable => return incomparable(Violation::Clauses, subject),
        };
        if subject_parts.clauses == learned_parts.clauses {
            return None;
        }
        Some(Violation::Clauses.entry(
            subject,
            format!(
                "expected {}, found {}",
                render(learned_parts.clauses),
                render(subject_parts.clauses)
            ),
        ))
    }
}
