//! CLI entry point for `shapeguard`.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use shapeguard::output::formatter::{self, OutputError};
use shapeguard::storage::JsonFileStorage;
use shapeguard::{Firewall, FirewallConfig, Mode, SqlDialect};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(
    name = "shapeguard",
    about = "Learn the shape of trusted SQL queries, then reject queries of any other shape"
)]
struct Cli {
    /// Directory holding learned queries and the rejection log
    #[arg(long, global = true, default_value = "shapeguard-state")]
    state_dir: PathBuf,

    /// JSON firewall configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQL dialect, overriding the configuration
    #[arg(long, global = true)]
    dialect: Option<SqlDialect>,

    /// Log every comparison
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Learn every statement of the input files as trusted
    Learn(Submit),
    /// Check every statement of the input files against learned queries
    Check(Submit),
    /// List learned queries, most recent first
    Queries,
    /// List rejections, most recent first
    Log,
    /// Write a Markdown report of learned queries and rejections
    Report {
        /// Output directory
        #[arg(long, default_value = "shapeguard-output")]
        output_dir: PathBuf,

        /// Report name, written as `<name>_report.md`
        #[arg(long, default_value = "shapeguard")]
        name: String,
    },
    /// Forget all learned queries and rejections
    Reset,
}

#[derive(Args)]
struct Submit {
    /// Files with one SQL statement per line; `--` lines are skipped
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Database the statements are sent to
    #[arg(long)]
    database: String,

    /// Database user sending the statements
    #[arg(long)]
    user: String,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Firewall(#[from] shapeguard::Error),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("Error reading {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{e}");
            process::exit(2);
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("shapeguard=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("shapeguard=info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// `Ok(false)` when at least one statement was rejected.
fn run(cli: Cli) -> Result<bool, CliError> {
    let mut config = match &cli.config {
        Some(path) => FirewallConfig::load(path)?,
        None => FirewallConfig::default(),
    };
    if let Some(dialect) = cli.dialect {
        config.dialect = dialect;
    }

    let storage = Arc::new(JsonFileStorage::new(&cli.state_dir));
    tracing::debug!(
        state_dir = %storage.dir().display(),
        dialect = %config.dialect,
        "opening state"
    );
    let firewall = Firewall::new(&config, storage)?;

    match cli.command {
        Command::Learn(submit) => submit_all(&firewall, Mode::Learning, &submit),
        Command::Check(submit) => submit_all(&firewall, Mode::Productive, &submit),
        Command::Queries => {
            for query in firewall.read_learned_queries() {
                println!(
                    "{}\t{}\t{}",
                    query.database(),
                    query.database_user(),
                    query.raw()
                );
            }
            Ok(true)
        }
        Command::Log => {
            for entry in firewall.read_log_entries() {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    entry.timestamp().to_rfc3339(),
                    entry.database(),
                    entry.database_user(),
                    entry.violation(),
                    entry.query()
                );
            }
            Ok(true)
        }
        Command::Report { output_dir, name } => {
            let path = formatter::write_report(
                &output_dir,
                &name,
                &firewall.read_learned_queries(),
                &firewall.read_log_entries(),
            )?;
            println!("{}", path.display());
            Ok(true)
        }
        Command::Reset => {
            firewall.reset()?;
            Ok(true)
        }
    }
}

fn submit_all(firewall: &Firewall, mode: Mode, submit: &Submit) -> Result<bool, CliError> {
    firewall.set_mode(mode);

    let mut all_accepted = true;
    for path in &submit.input {
        for sql in read_statements(path)? {
            let accepted = firewall.accept(&sql, &submit.database, &submit.user)?;
            println!("{}\t{sql}", if accepted { "accepted" } else { "rejected" });
            all_accepted &= accepted;
        }
    }
    Ok(all_accepted)
}

fn read_statements(path: &Path) -> Result<Vec<String>, CliError> {
    let content = std::fs::read_to_string(path).map_err(|source| CliError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("--"))
        .map(str::to_string)
        .collect())
}
