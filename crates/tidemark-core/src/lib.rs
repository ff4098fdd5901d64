//! Core engine for Tidemark: timestamped, reversible SQL migrations for
//! PostgreSQL.
//!
//! Migrations are files named `<14-digit-timestamp>-<name>.sql` under a
//! project's `migrations/` directory, each holding a `-- +up` and a
//! `-- +down` script. Applied migrations are recorded in a `_migrations`
//! table; planning compares that ledger against the files on disk and
//! execution runs the minimal batch one migration at a time, halting on
//! the first failure.
//!
//! # Example
//!
//! ```ignore
//! use tidemark_core::{plan_forward, Config, Executor, Limit, PgBackend, Repository};
//!
//! let config = Config::load(root)?;
//! let repository = Repository::new(root);
//! let candidates = repository.list_candidates()?;
//!
//! let backend = PgBackend::connect(&config).await?;
//! let applied = backend.list_applied().await?;
//! let latest = applied.last().map(|e| e.timestamp.as_str());
//!
//! let plan = plan_forward(latest, &candidates, Limit::All);
//! let report = Executor::new(&repository, &backend, &backend)
//!     .run_up(&plan)
//!     .await?;
//! backend.close().await;
//! ```
//!
//! # Limitations
//!
//! Two concurrent invocations against one database race with undefined
//! outcome; serialize invocations externally. The ledger write after a
//! successful script is not atomic with the script itself, so a crash in
//! between leaves a migration applied but unrecorded.

pub mod config;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod planner;
pub mod postgres;
pub mod repository;

pub use config::Config;
pub use error::{Error, Result};
pub use executor::{Executor, RunReport, ScriptRunner, StepReport};
pub use ledger::{Ledger, LedgerEntry};
pub use planner::{plan_backward, plan_forward, Limit};
pub use postgres::PgBackend;
pub use repository::{MigrationIdentity, MigrationScript, Repository};
