use std::sync::Arc;

use tracing::warn;

use crate::checker::Violation;
use crate::classifier::{Classifier, Mode};
use crate::config::FirewallConfig;
use crate::error::{Error, Result};
use crate::parser::Tokenizer;
use crate::storage::{MemoryStorage, Storage};
use crate::store::{LogEntry, Query};

/// Entry point: tokenizes SQL text and hands it to the classifier.
///
/// `Firewall` is `Send + Sync`; share it behind an `Arc` to serve
/// concurrent sessions.
#[derive(Debug)]
pub struct Firewall {
    tokenizer: Tokenizer,
    classifier: Classifier,
}

impl Firewall {
    /// Build from `config`, loading existing state from `storage`.
    pub fn new(config: &FirewallConfig, storage: Arc<dyn Storage>) -> Result<Self> {
        let chain = config.checker_chain()?;
        if chain.is_empty() {
            warn!("no checkers configured, every query of a learned scope is accepted");
        }
        let tokenizer = Tokenizer::new(config.dialect);
        Ok(Self {
            classifier: Classifier::new(chain, &tokenizer, storage)?,
            tokenizer,
        })
    }

    /// Firewall whose state lives only as long as the process.
    pub fn in_memory(config: &FirewallConfig) -> Result<Self> {
        Self::new(config, Arc::new(MemoryStorage::new()))
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.classifier.mode()
    }

    /// Switch between learning and productive mode.
    pub fn set_mode(&self, mode: Mode) {
        self.classifier.set_mode(mode);
    }

    /// Decide whether `sql`, sent by `database_user` to `database`, may run.
    ///
    /// SQL that cannot be tokenized is rejected and logged as `unparsable`
    /// in both modes. Blank `database` or `database_user` is an
    /// [`Error::InvalidArgument`].
    pub fn accept(&self, sql: &str, database: &str, database_user: &str) -> Result<bool> {
        if database.trim().is_empty() {
            return Err(Error::InvalidArgument("database must not be blank".into()));
        }
        if database_user.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "database user must not be blank".into(),
            ));
        }

        match self.tokenizer.tokenize(sql) {
            Ok(tokens) => self
                .classifier
                .accept(&Query::new(sql, tokens, database, database_user)),
            Err(err) => {
                self.classifier.reject(LogEntry::new(
                    sql,
                    database,
                    database_user,
                    format!("{}: {err}", Violation::Unparsable.label()),
                ))?;
                Ok(false)
            }
        }
    }

    /// Forget all learned queries and log entries; back to learning.
    pub fn reset(&self) -> Result<()> {
        self.classifier.reset()
    }

    /// Learned queries, most recent first.
    pub fn read_learned_queries(&self) -> Vec<Query> {
        self.classifier.learned_queries()
    }

    /// Rejections, most recent first.
    pub fn read_log_entries(&self) -> Vec<LogEntry> {
        self.classifier.log_entries()
    }
}
