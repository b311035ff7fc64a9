use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::token::Token;

/// A tokenized statement bound to the database and user that issued it.
///
/// Identity is `(raw, database, database_user)`: the token tree is derived
/// from the raw text and adds nothing to it. The tree is not persisted; the
/// query store tokenizes `raw` again when loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    raw: String,
    #[serde(skip, default = "untokenized")]
    tokens: Token,
    database: String,
    database_user: String,
}

impl Query {
    /// Bind an already tokenized statement to its scope.
    pub fn new(
        raw: impl Into<String>,
        tokens: Token,
        database: impl Into<String>,
        database_user: impl Into<String>,
    ) -> Self {
        Self {
            raw: raw.into(),
            tokens,
            database: database.into(),
            database_user: database_user.into(),
        }
    }

    /// Original SQL text.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Root of the token tree.
    pub fn tokens(&self) -> &Token {
        &self.tokens
    }

    /// Database the statement targets.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Database user issuing the statement.
    pub fn database_user(&self) -> &str {
        &self.database_user
    }

    /// Replace the token tree, keeping text and scope.
    pub(crate) fn with_tokens(mut self, tokens: Token) -> Self {
        self.tokens = tokens;
        self
    }

    /// `true` when both queries belong to the same database and user.
    pub fn same_scope(&self, other: &Query) -> bool {
        self.database == other.database && self.database_user == other.database_user
    }
}

fn untokenized() -> Token {
    Token::Unrecognized(String::new())
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.same_scope(other)
    }
}

impl Eq for Query {}

impl Hash for Query {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
        self.database.hash(state);
        self.database_user.hash(state);
    }
}
