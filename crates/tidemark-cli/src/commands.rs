//! Subcommand implementations.
//!
//! Each database-touching command connects once, shares the pool for the
//! whole run, and drains it on every exit path before the error (if any)
//! propagates to `main`.

use crate::{Command, RunArgs};
use std::path::Path;
use tidemark_core::{
    plan_backward, plan_forward, Config, Executor, Ledger, Limit, PgBackend, Repository,
    RunReport,
};
use tracing::info;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Dispatch a parsed subcommand.
pub async fn run(command: Command) -> Result<(), BoxError> {
    match command {
        Command::Up(args) => {
            let limit = args.limit()?;
            let config = args.load_config()?;
            migrate_up(&args.root, &config, limit).await
        }
        Command::Down(args) => {
            let limit = args.limit()?;
            let config = args.load_config()?;
            migrate_down(&args.root, &config, limit).await
        }
        Command::Create {
            name,
            root,
            template,
        } => create(&name, &root, template.as_deref()),
    }
}

async fn migrate_up(root: &Path, config: &Config, limit: Limit) -> Result<(), BoxError> {
    let repository = Repository::new(root);
    let candidates = repository.list_candidates()?;

    let backend = PgBackend::connect(config).await?;
    let outcome = async {
        let applied = backend.list_applied().await?;
        let latest = applied.last().map(|e| e.timestamp.as_str());
        let plan = plan_forward(latest, &candidates, limit);
        if plan.is_empty() {
            info!("no new migrations");
            return Ok::<Option<RunReport>, BoxError>(None);
        }

        let executor = Executor::new(&repository, &backend, &backend);
        let report = executor.run_up(&plan).await?;
        Ok(Some(report))
    }
    .await;

    backend.close().await;

    if let Some(report) = outcome? {
        info!(applied = report.committed(), "migrations complete");
    }
    Ok(())
}

async fn migrate_down(root: &Path, config: &Config, limit: Limit) -> Result<(), BoxError> {
    let repository = Repository::new(root);

    let backend = PgBackend::connect(config).await?;
    let outcome = async {
        let applied = backend.list_applied().await?;
        let plan = plan_backward(&applied, limit);
        if plan.is_empty() {
            info!("no applied migrations to roll back");
            return Ok::<Option<RunReport>, BoxError>(None);
        }

        let executor = Executor::new(&repository, &backend, &backend);
        let report = executor.run_down(&plan).await?;
        Ok(Some(report))
    }
    .await;

    backend.close().await;

    if let Some(report) = outcome? {
        info!(reverted = report.committed(), "rollback complete");
    }
    Ok(())
}

fn create(name: &str, root: &Path, template: Option<&Path>) -> Result<(), BoxError> {
    if name.trim().is_empty() {
        return Err("migration name must not be empty".into());
    }

    let repository = Repository::new(root);
    let path = repository.scaffold(name, template)?;
    info!(path = %path.display(), "created migration");
    println!("{}", path.display());
    Ok(())
}
