use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::checker::{
    CheckerChain, ClauseChecker, ColumnListChecker, ColumnPolicy, FilterChecker, FromListChecker,
    QueryChecker, StatementChecker,
};
use crate::error::{Error, Result};

/// SQL grammar used to parse submitted statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    /// ANSI-ish grammar accepted by most engines.
    #[default]
    Generic,
    /// `PostgreSQL`.
    Postgres,
    /// `MySQL` / `MariaDB`.
    MySql,
    /// `SQLite`.
    Sqlite,
    /// Microsoft SQL Server.
    MsSql,
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SqlDialect::Generic => "generic",
            SqlDialect::Postgres => "postgres",
            SqlDialect::MySql => "mysql",
            SqlDialect::Sqlite => "sqlite",
            SqlDialect::MsSql => "mssql",
        })
    }
}

impl std::str::FromStr for SqlDialect {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "generic" | "ansi" => Ok(SqlDialect::Generic),
            "postgres" | "postgresql" => Ok(SqlDialect::Postgres),
            "mysql" => Ok(SqlDialect::MySql),
            "sqlite" => Ok(SqlDialect::Sqlite),
            "mssql" => Ok(SqlDialect::MsSql),
            _ => Err(format!("Invalid SQL dialect: {s}")),
        }
    }
}

/// Checker names understood by [`FirewallConfig::checker_chain`].
pub const CHECKER_NAMES: [&str; 5] = ["statement", "columns", "from", "filter", "clauses"];

/// Firewall settings, usually loaded from a JSON file.
///
/// Every field is optional in JSON; absent fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FirewallConfig {
    /// Grammar for the tokenizer.
    pub dialect: SqlDialect,
    /// Checker names in evaluation order.
    pub checkers: Vec<String>,
    /// How the `columns` checker compares projections.
    pub column_policy: ColumnPolicy,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::default(),
            checkers: CHECKER_NAMES.iter().map(|name| (*name).to_string()).collect(),
            column_policy: ColumnPolicy::default(),
        }
    }
}

impl FirewallConfig {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidArgument(format!("invalid firewall config: {e}")))
    }

    /// Read and parse a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidArgument(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Build the checker chain named by `checkers`.
    pub fn checker_chain(&self) -> Result<CheckerChain> {
        let mut builder = CheckerChain::builder();
        for name in &self.checkers {
            builder = builder.append_boxed(self.checker(name)?);
        }
        Ok(builder.build())
    }

    fn checker(&self, name: &str) -> Result<Box<dyn QueryChecker>> {
        let checker: Box<dyn QueryChecker> = match name {
            "statement" => Box::new(StatementChecker),
            "columns" => Box::new(ColumnListChecker::new(self.column_policy)),
            "from" => Box::new(FromListChecker),
            "filter" => Box::new(FilterChecker),
            "clauses" => Box::new(ClauseChecker),
            other => {
                return Err(Error::InvalidArgument(format!(
                    "unknown checker '{other}', expected one of: {}",
                    CHECKER_NAMES.join(", ")
                )))
            }
        };
        Ok(checker)
    }
}
