use tracing::debug;

use crate::checker::{CheckerChain, Violation};
use crate::store::{LogEntry, Query, QueryStore};

/// Decide whether `subject` matches a learned query.
///
/// Returns `None` to accept, or the log entry explaining the rejection.
/// Candidates are the learned queries of the subject's database and user,
/// compared in learning order; when none matches, the violation of the last
/// compared candidate is reported.
pub fn check_query(chain: &CheckerChain, store: &QueryStore, subject: &Query) -> Option<LogEntry> {
    // Textual identity (within the same scope) implies structural identity.
    if store.contains(subject) {
        debug!(query = subject.raw(), "identical learned query");
        return None;
    }

    let mut last_violation = None;
    let mut compared = 0usize;

    for learned in store.iter().filter(|learned| learned.same_scope(subject)) {
        compared += 1;
        match chain.check_subject_against_learned(subject, learned) {
            None => {
                debug!(
                    query = subject.raw(),
                    learned = learned.raw(),
                    "structurally compatible learned query"
                );
                return None;
            }
            Some(entry) => {
                debug!(
                    query = subject.raw(),
                    learned = learned.raw(),
                    violation = entry.violation(),
                    "learned query does not match"
                );
                last_violation = Some(entry);
            }
        }
    }

    if compared == 0 {
        return Some(Violation::NoLearnedQuery.entry(
            subject,
            format!(
                "nothing learned for database '{}' and user '{}'",
                subject.database(),
                subject.database_user()
            ),
        ));
    }

    last_violation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{FilterChecker, FromListChecker, QueryChecker};
    use crate::parser::Tokenizer;
    use crate::storage::MemoryStorage;
    use crate::token::Token;
    use std::sync::Arc;

    fn query(sql: &str, user: &str) -> Query {
        let tokens = Tokenizer::default().tokenize(sql).expect("test SQL should parse");
        Query::new(sql, tokens, "world", user)
    }

    fn store_with(queries: &[&str]) -> QueryStore {
        let mut store = QueryStore::new(Arc::new(MemoryStorage::new()));
        for sql in queries {
            store.write(query(sql, "tester")).unwrap();
        }
        store
    }

    struct RejectAll;

    impl QueryChecker for RejectAll {
        fn name(&self) -> &'static str {
            "reject-all"
        }

        fn check(&self, _: &Token, subject: &Query, _: &Token, _: &Query) -> Option<LogEntry> {
            Some(Violation::Statement.entry(subject, "rejects everything"))
        }
    }

    #[test]
    fn identical_text_bypasses_the_chain() {
        let store = store_with(&["SELECT a FROM t WHERE id = 1"]);
        let chain = CheckerChain::builder().append(RejectAll).build();

        let identical = query("SELECT a FROM t WHERE id = 1", "tester");
        assert!(check_query(&chain, &store, &identical).is_none());

        let same_shape = query("SELECT a FROM t WHERE id = 2", "tester");
        let entry = check_query(&chain, &store, &same_shape)
            .expect("only identical text skips the chain");
        assert!(entry.violation().ends_with("rejects everything"));
    }

    #[test]
    fn last_compared_candidate_supplies_the_violation() {
        let store = store_with(&["SELECT a FROM u", "SELECT a FROM t WHERE id = 1"]);
        let chain = CheckerChain::builder()
            .append(FromListChecker)
            .append(FilterChecker)
            .build();

        let entry = check_query(&chain, &store, &query("SELECT a FROM t WHERE 1 = 1", "tester"))
            .expect("no candidate matches");
        assert!(
            entry.violation().starts_with("Filter violated"),
            "expected the second candidate's violation, got {}",
            entry.violation()
        );
    }

    #[test]
    fn first_compatible_candidate_accepts() {
        let store = store_with(&["SELECT a FROM u", "SELECT a FROM t WHERE id = 1"]);
        let chain = CheckerChain::standard();
        assert!(check_query(&chain, &store, &query("SELECT a FROM t WHERE id = 9", "tester")).is_none());
    }

    #[test]
    fn other_scopes_are_never_candidates() {
        let store = store_with(&["SELECT a FROM t"]);
        let entry = check_query(
            &CheckerChain::standard(),
            &store,
            &query("SELECT a FROM t", "other"),
        )
        .expect("other user has nothing learned");
        assert!(entry.violation().starts_with("No learned query"));
    }
}
