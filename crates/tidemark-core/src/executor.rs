//! Migration executor.
//!
//! Runs a planned batch one migration at a time, never concurrently:
//! load, run the script, then persist (or erase) the ledger entry before
//! moving on. A script failure halts the whole batch immediately; later
//! migrations may depend on the failed one's effects, so they are never
//! attempted. The ledger write is deliberately not atomic with the script
//! itself: a crash between the two leaves a migration applied but
//! unrecorded, an accepted limitation of the two-step design.

use crate::error::{Error, Result};
use crate::ledger::{Ledger, LedgerEntry};
use crate::repository::{MigrationIdentity, Repository};
use async_trait::async_trait;
use tracing::{error, info};

/// Boxed error returned by script runners.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Executes one SQL script against the target database.
///
/// The production implementation lives in [`crate::postgres`]; tests drive
/// the executor with in-memory fakes.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run a script to completion. Any failure aborts the current batch.
    async fn run_script(&self, sql: &str) -> std::result::Result<(), BoxError>;
}

/// One committed migration within a completed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Migration name.
    pub name: String,
    /// Migration timestamp.
    pub timestamp: String,
}

/// Outcome of a fully-completed batch.
///
/// A halted batch surfaces as [`Error::MigrationRuntime`] instead; the
/// report only ever lists migrations whose ledger write went through.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Committed migrations, in execution order.
    pub steps: Vec<StepReport>,
}

impl RunReport {
    /// Number of migrations that committed.
    pub fn committed(&self) -> usize {
        self.steps.len()
    }

    /// True when the batch contained no migrations.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Drives a planned batch of migrations against a ledger and a database.
pub struct Executor<'a> {
    repository: &'a Repository,
    ledger: &'a dyn Ledger,
    runner: &'a dyn ScriptRunner,
}

impl<'a> Executor<'a> {
    /// Create an executor over the given collaborators.
    pub fn new(
        repository: &'a Repository,
        ledger: &'a dyn Ledger,
        runner: &'a dyn ScriptRunner,
    ) -> Self {
        Self {
            repository,
            ledger,
            runner,
        }
    }

    /// Apply a forward batch, ascending timestamp order.
    ///
    /// Each migration's ledger entry is recorded immediately after its up
    /// script succeeds. On script failure the run halts with
    /// [`Error::MigrationRuntime`]; nothing is recorded for the failed
    /// migration and no later migration is attempted. Load and persistence
    /// errors propagate and halt the run the same way.
    pub async fn run_up(&self, plan: &[MigrationIdentity]) -> Result<RunReport> {
        let mut report = RunReport::default();

        for identity in plan {
            let script = self.repository.load(identity)?;

            info!(migration = %identity, "applying migration");
            match self.runner.run_script(&script.up).await {
                Ok(()) => {
                    self.ledger.record(&identity.name, &identity.timestamp).await?;
                    report.steps.push(StepReport {
                        name: identity.name.clone(),
                        timestamp: identity.timestamp.clone(),
                    });
                    info!(migration = %identity, "migration applied");
                }
                Err(e) => {
                    error!(migration = %identity, error = %e, "migration failed, halting run");
                    return Err(Error::MigrationRuntime {
                        name: identity.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Roll back a batch of applied migrations, descending timestamp order.
    ///
    /// Each entry is erased from the ledger immediately after its down
    /// script succeeds. On script failure the run halts and the entry (and
    /// the forward-applied state) stays intact.
    pub async fn run_down(&self, plan: &[LedgerEntry]) -> Result<RunReport> {
        let mut report = RunReport::default();

        for entry in plan {
            let identity = MigrationIdentity::from_parts(&entry.timestamp, &entry.name);
            let script = self.repository.load(&identity)?;

            info!(migration = %identity, "reverting migration");
            match self.runner.run_script(&script.down).await {
                Ok(()) => {
                    self.ledger.erase(entry.id).await?;
                    report.steps.push(StepReport {
                        name: entry.name.clone(),
                        timestamp: entry.timestamp.clone(),
                    });
                    info!(migration = %identity, "migration reverted");
                }
                Err(e) => {
                    error!(migration = %identity, error = %e, "rollback failed, halting run");
                    return Err(Error::MigrationRuntime {
                        name: entry.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}
