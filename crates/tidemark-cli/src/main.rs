//! Tidemark command-line interface.
//!
//! `tidemark up` applies pending migrations, `tidemark down` rolls applied
//! ones back, `tidemark create` scaffolds a new migration file. Any error
//! exits with status 1.

mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tidemark_core::{Config, Limit};

/// Timestamped, reversible SQL migrations for PostgreSQL.
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(version, about = "Timestamped, reversible SQL migrations for PostgreSQL")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply pending migrations (all of them by default).
    Up(RunArgs),

    /// Roll back applied migrations (all of them by default).
    Down(RunArgs),

    /// Create a new timestamped migration file.
    Create {
        /// Name for the new migration, e.g. "add-users".
        name: String,

        /// Project root containing migrations/ and database.json.
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Template file to copy instead of the built-in one.
        #[arg(long)]
        template: Option<PathBuf>,
    },
}

/// Shared arguments for `up` and `down`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run every pending (or applied) migration.
    #[arg(short, long)]
    pub all: bool,

    /// Run only the next pending (or most recent applied) migration.
    #[arg(short, long)]
    pub one: bool,

    /// Project root containing migrations/ and database.json.
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Database host (overrides database.json and TIDEMARK_HOST).
    #[arg(long)]
    pub host: Option<String>,

    /// Database port.
    #[arg(long)]
    pub port: Option<u16>,

    /// User to connect as.
    #[arg(long)]
    pub user: Option<String>,

    /// Password for the user.
    #[arg(long)]
    pub password: Option<String>,

    /// Target database name.
    #[arg(long)]
    pub db: Option<String>,
}

impl RunArgs {
    /// Resolve `--all`/`--one` into a limit; neither flag means all.
    ///
    /// Checked here rather than through clap so that giving both flags
    /// exits with status 1, taking no action.
    pub fn limit(&self) -> Result<Limit, String> {
        match (self.all, self.one) {
            (true, true) => Err("--all and --one are mutually exclusive".to_string()),
            (false, true) => Ok(Limit::One),
            _ => Ok(Limit::All),
        }
    }

    /// Load configuration for the root and layer connection flags on top.
    ///
    /// Precedence, lowest to highest: defaults, `database.json`,
    /// `TIDEMARK_*` environment variables, command-line flags.
    pub fn load_config(&self) -> tidemark_core::Result<Config> {
        let mut config = Config::load(&self.root)?;
        if let Some(host) = &self.host {
            config = config.with_host(host.as_str());
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(user) = &self.user {
            config = config.with_user(user.as_str());
        }
        if let Some(password) = &self.password {
            config = config.with_password(password.as_str());
        }
        if let Some(db) = &self.db {
            config = config.with_db(db.as_str());
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tidemark=info".parse().unwrap())
                .add_directive("tidemark_core=info".parse().unwrap()),
        )
        .init();

    // Usage errors (unknown command, missing name) exit 1; --help and
    // --version still exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(e) = commands::run(cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
