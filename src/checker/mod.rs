//! Structural comparison of a subject query against one learned query.
//!
//! Each [`QueryChecker`] owns a single violation category. A
//! [`CheckerChain`] evaluates its checkers in configured order and reports
//! the first violation, so new categories plug in without touching the
//! classifier or the token model.

use std::fmt;

use crate::store::{LogEntry, Query};
use crate::token::Token;

/// Concrete single-concern checkers.
pub mod structural;

pub use structural::{
    ClauseChecker, ColumnListChecker, ColumnPolicy, FilterChecker, FromListChecker,
    StatementChecker,
};

/// Violation categories reported in [`LogEntry::violation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Violation {
    /// Statement topology differs (plain `SELECT` vs set operation, ...).
    Statement,
    /// Projected columns differ.
    ColumnList,
    /// Tables or joins differ.
    FromList,
    /// `WHERE` predicate differs.
    Filter,
    /// `DISTINCT`, `GROUP BY`, `HAVING`, `ORDER BY` or `LIMIT` differ.
    Clauses,
    /// Nothing was learned for the subject's database and user.
    NoLearnedQuery,
    /// The SQL text could not be tokenized.
    Unparsable,
}

impl Violation {
    /// Stable label used as prefix of log entry violations.
    pub fn label(self) -> &'static str {
        match self {
            Violation::Statement => "Statement violated",
            Violation::ColumnList => "Columnlist violated",
            Violation::FromList => "Fromlist violated",
            Violation::Filter => "Filter violated",
            Violation::Clauses => "Clauses violated",
            Violation::NoLearnedQuery => "No learned query",
            Violation::Unparsable => "unparsable",
        }
    }

    /// Build the log entry for `subject` with a human-readable detail.
    pub fn entry(self, subject: &Query, detail: impl fmt::Display) -> LogEntry {
        LogEntry::new(
            subject.raw(),
            subject.database(),
            subject.database_user(),
            format!("{}: {detail}", self.label()),
        )
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single-concern structural comparator.
///
/// `subject_root` and `learned_root` are the statement-level tokens of the
/// two queries. A checker that cannot evaluate the pair must report a
/// violation rather than accept it.
pub trait QueryChecker: Send + Sync {
    /// Configuration name of the checker.
    fn name(&self) -> &'static str;

    /// `None` when `subject` is compatible with `learned` for this concern.
    fn check(
        &self,
        subject_root: &Token,
        subject: &Query,
        learned_root: &Token,
        learned: &Query,
    ) -> Option<LogEntry>;
}

/// Ordered, immutable list of checkers. The empty chain accepts everything.
#[derive(Default)]
pub struct CheckerChain {
    checkers: Vec<Box<dyn QueryChecker>>,
}

impl fmt::Debug for CheckerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl CheckerChain {
    /// Start an empty chain.
    pub fn builder() -> CheckerChainBuilder {
        CheckerChainBuilder::default()
    }

    /// `statement`, `columns`, `from`, `filter`, `clauses`.
    pub fn standard() -> Self {
        Self::builder()
            .append(StatementChecker)
            .append(ColumnListChecker::new(ColumnPolicy::Subset))
            .append(FromListChecker)
            .append(FilterChecker)
            .append(ClauseChecker)
            .build()
    }

    /// Checker names in evaluation order.
    pub fn names(&self) -> Vec<&'static str> {
        self.checkers.iter().map(|checker| checker.name()).collect()
    }

    /// `true` for the no-op chain.
    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }

    /// Compare `subject` with `learned`, returning the first violation.
    pub fn check_subject_against_learned(
        &self,
        subject: &Query,
        learned: &Query,
    ) -> Option<LogEntry> {
        let (Some(subject_root), Some(learned_root)) = (
            subject.tokens().statement_root(),
            learned.tokens().statement_root(),
        ) else {
            return Some(Violation::Statement.entry(subject, "no statement token to compare"));
        };

        self.checkers
            .iter()
            .find_map(|checker| checker.check(subject_root, subject, learned_root, learned))
    }
}

/// Builder appending checkers in evaluation order.
#[derive(Default)]
pub struct CheckerChainBuilder {
    checkers: Vec<Box<dyn QueryChecker>>,
}

impl CheckerChainBuilder {
    /// Append a checker after the ones already added.
    #[must_use]
    pub fn append(mut self, checker: impl QueryChecker + 'static) -> Self {
        self.checkers.push(Box::new(checker));
        self
    }

    /// Append an already boxed checker.
    #[must_use]
    pub fn append_boxed(mut self, checker: Box<dyn QueryChecker>) -> Self {
        self.checkers.push(checker);
        self
    }

    /// Freeze the chain.
    pub fn build(self) -> CheckerChain {
        CheckerChain {
            checkers: self.checkers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Tokenizer;

    struct Always(Option<&'static str>, &'static str);

    impl QueryChecker for Always {
        fn name(&self) -> &'static str {
            self.1
        }

        fn check(&self, _: &Token, subject: &Query, _: &Token, _: &Query) -> Option<LogEntry> {
            self.0.map(|detail| Violation::Statement.entry(subject, detail))
        }
    }

    fn query(sql: &str) -> Query {
        let tokens = Tokenizer::default().tokenize(sql).expect("test SQL should parse");
        Query::new(sql, tokens, "world", "tester")
    }

    #[test]
    fn empty_chain_accepts_everything() {
        let chain = CheckerChain::builder().build();
        assert!(chain.is_empty());
        assert!(chain
            .check_subject_against_learned(&query("SELECT a FROM t"), &query("SELECT b FROM u"))
            .is_none());
    }

    #[test]
    fn first_violation_in_configured_order_wins() {
        let chain = CheckerChain::builder()
            .append(Always(None, "pass"))
            .append(Always(Some("second"), "second"))
            .append(Always(Some("third"), "third"))
            .build();

        let entry = chain
            .check_subject_against_learned(&query("SELECT a FROM t"), &query("SELECT a FROM t"))
            .expect("chain should report a violation");
        assert!(entry.violation().ends_with("second"));
        assert_eq!(chain.names(), vec!["pass", "second", "third"]);
    }

    #[test]
    fn later_checker_rejection_is_not_skipped() {
        let subject = query("SELECT a FROM t WHERE 1 = 1");
        let learned = query("SELECT a FROM t");

        let columns_only = CheckerChain::builder()
            .append(ColumnListChecker::new(ColumnPolicy::Subset))
            .build();
        assert!(columns_only
            .check_subject_against_learned(&subject, &learned)
            .is_none());

        let with_filter = CheckerChain::builder()
            .append(ColumnListChecker::new(ColumnPolicy::Subset))
            .append(FilterChecker)
            .build();
        let entry = with_filter
            .check_subject_against_learned(&subject, &learned)
            .expect("filter checker should reject");
        assert!(entry.violation().starts_with(Violation::Filter.label()));
    }

    #[test]
    fn missing_statement_token_is_a_violation() {
        let broken = Query::new("garbage", Token::Literal, "world", "tester");
        let entry = CheckerChain::builder()
            .build()
            .check_subject_against_learned(&broken, &query("SELECT a FROM t"))
            .expect("missing statement should not be accepted");
        assert!(entry.violation().starts_with("Statement violated"));
    }

    #[test]
    fn standard_chain_order() {
        assert_eq!(
            CheckerChain::standard().names(),
            vec!["statement", "columns", "from", "filter", "clauses"]
        );
    }
}
