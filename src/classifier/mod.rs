//! Learning/productive state machine over the query store and the log.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::checker::CheckerChain;
use crate::error::{Result, StorageError};
use crate::parser::Tokenizer;
use crate::storage::Storage;
use crate::store::{Log, LogEntry, Query, QueryStore};

/// Scoped candidate scan deciding a single productive query.
pub mod matching;

/// Operating mode of a [`Classifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Submitted queries are trusted and stored.
    #[default]
    Learning,
    /// Submitted queries are validated against learned ones.
    Productive,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Learning => write!(f, "learning"),
            Mode::Productive => write!(f, "productive"),
        }
    }
}

struct State {
    mode: Mode,
    store: QueryStore,
    log: Mutex<Log>,
}

impl State {
    fn open(storage: &Arc<dyn Storage>, tokenizer: &Tokenizer) -> Result<Self, StorageError> {
        Ok(Self {
            mode: Mode::Learning,
            store: QueryStore::open(Arc::clone(storage), tokenizer)?,
            log: Mutex::new(Log::open(Arc::clone(storage))?),
        })
    }

    fn empty(storage: &Arc<dyn Storage>) -> Self {
        Self {
            mode: Mode::Learning,
            store: QueryStore::new(Arc::clone(storage)),
            log: Mutex::new(Log::new(Arc::clone(storage))),
        }
    }
}

/// Decides whether queries are accepted, learning them first.
///
/// Productive decisions share a read lock and run in parallel; learning,
/// mode switches and resets take the write lock.
pub struct Classifier {
    chain: CheckerChain,
    storage: Arc<dyn Storage>,
    state: RwLock<State>,
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("chain", &self.chain)
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

impl Classifier {
    /// Start in [`Mode::Learning`] with the content already held by `storage`.
    ///
    /// Learned queries are tokenized again with `tokenizer` while loading.
    pub fn new(
        chain: CheckerChain,
        tokenizer: &Tokenizer,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, StorageError> {
        let state = State::open(&storage, tokenizer)?;
        Ok(Self {
            chain,
            storage,
            state: RwLock::new(state),
        })
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.state.read().mode
    }

    /// Switch mode. Stored queries and log entries are kept.
    pub fn set_mode(&self, mode: Mode) {
        let mut state = self.state.write();
        if state.mode != mode {
            info!(from = %state.mode, to = %mode, "switching mode");
        }
        state.mode = mode;
    }

    /// `true` when `query` is learned (learning) or matches a learned query
    /// (productive). Rejections are written to the log.
    pub fn accept(&self, query: &Query) -> Result<bool> {
        {
            let state = self.state.read();
            if state.mode == Mode::Productive {
                return Self::classify(&self.chain, &state, query);
            }
        }

        let mut state = self.state.write();
        // Mode may have changed between the two locks.
        if state.mode == Mode::Productive {
            return Self::classify(&self.chain, &state, query);
        }
        if state.store.write(query.clone())? {
            debug!(
                query = query.raw(),
                database = query.database(),
                user = query.database_user(),
                "learned query"
            );
        }
        Ok(true)
    }

    fn classify(chain: &CheckerChain, state: &State, query: &Query) -> Result<bool> {
        match matching::check_query(chain, &state.store, query) {
            None => Ok(true),
            Some(entry) => {
                warn!(
                    query = entry.query(),
                    database = entry.database(),
                    user = entry.database_user(),
                    violation = entry.violation(),
                    "query rejected"
                );
                state.log.lock().write(Some(entry))?;
                Ok(false)
            }
        }
    }

    /// Log a rejection decided outside the checker chain.
    pub fn reject(&self, entry: LogEntry) -> Result<()> {
        warn!(
            query = entry.query(),
            database = entry.database(),
            user = entry.database_user(),
            violation = entry.violation(),
            "query rejected"
        );
        let state = self.state.read();
        state.log.lock().write(Some(entry))?;
        Ok(())
    }

    /// Forget every learned query and log entry and return to learning.
    ///
    /// Nothing changes when the learned queries cannot be cleared in storage.
    /// Once they are, the in-memory state is reset even if clearing the
    /// persisted log fails; that failure is still returned.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.state.write();
        self.storage.persist_learned_queries(&[])?;
        let log_cleared = self.storage.persist_log_entries(&[]);
        *state = State::empty(&self.storage);

        if let Err(err) = log_cleared {
            warn!(error = %err, "classifier reset, but the persisted log was kept");
            return Err(err.into());
        }
        info!("classifier reset");
        Ok(())
    }

    /// Learned queries, most recent first.
    pub fn learned_queries(&self) -> Vec<Query> {
        let mut queries = self.state.read().store.read();
        queries.reverse();
        queries
    }

    /// Log entries, most recent first.
    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.state.read().log.lock().read()
    }
}
