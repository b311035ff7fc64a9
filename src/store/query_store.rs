use std::sync::Arc;

use indexmap::IndexSet;
use tracing::warn;

use crate::error::StorageError;
use crate::parser::Tokenizer;
use crate::storage::Storage;
use crate::store::query::Query;
use crate::token::Token;

/// Learned queries in insertion order, cached in memory and persisted on change.
pub struct QueryStore {
    queries: IndexSet<Query>,
    storage: Arc<dyn Storage>,
}

impl QueryStore {
    /// An empty store backed by `storage`. Nothing is loaded.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            queries: IndexSet::new(),
            storage,
        }
    }

    /// Load the persisted learned queries, tokenizing their text with
    /// `tokenizer`.
    pub fn open(storage: Arc<dyn Storage>, tokenizer: &Tokenizer) -> Result<Self, StorageError> {
        let queries = storage
            .load_learned_queries()?
            .into_iter()
            .map(|query| retokenize(query, tokenizer))
            .collect();
        Ok(Self { queries, storage })
    }

    /// Snapshot of every learned query, oldest first.
    pub fn read(&self) -> Vec<Query> {
        self.queries.iter().cloned().collect()
    }

    /// Iterate learned queries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Query> {
        self.queries.iter()
    }

    /// `true` when an equal query (same text, database and user) was learned.
    pub fn contains(&self, query: &Query) -> bool {
        self.queries.contains(query)
    }

    /// Learn a query. Returns `false` when an equal query was already known.
    pub fn write(&mut self, query: Query) -> Result<bool, StorageError> {
        if !self.queries.insert(query) {
            return Ok(false);
        }
        if let Err(err) = self.persist() {
            self.queries.pop();
            return Err(err);
        }
        Ok(true)
    }

    /// Number of learned queries.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// `true` when nothing was learned.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    fn persist(&self) -> Result<(), StorageError> {
        self.storage.persist_learned_queries(&self.read())
    }
}

// A learned query that no longer tokenizes (e.g. after a dialect change)
// keeps its verbatim text, so only the identical text still matches it.
fn retokenize(query: Query, tokenizer: &Tokenizer) -> Query {
    match tokenizer.tokenize(query.raw()) {
        Ok(tokens) => query.with_tokens(tokens),
        Err(err) => {
            warn!(
                query = query.raw(),
                dialect = %tokenizer.dialect(),
                error = %err,
                "learned query no longer tokenizes"
            );
            let verbatim = Token::Unrecognized(query.raw().to_string());
            query.with_tokens(verbatim)
        }
    }
}
