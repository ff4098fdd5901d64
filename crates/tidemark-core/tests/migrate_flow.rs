//! End-to-end migration flow over a temporary project directory.
//!
//! Exercises scaffold -> scan -> plan -> execute against in-memory ledger
//! and runner fakes; the PostgreSQL backend is covered by its own unit
//! tests and by running the CLI against a live database.

use async_trait::async_trait;
use std::fs;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use tempfile::tempdir;
use tidemark_core::{
    plan_backward, plan_forward, Error, Executor, Ledger, LedgerEntry, Limit, Repository,
    Result, ScriptRunner,
};

#[derive(Default)]
struct MemLedger {
    entries: Mutex<Vec<LedgerEntry>>,
    next_id: AtomicI64,
}

#[async_trait]
impl Ledger for MemLedger {
    async fn list_applied(&self) -> Result<Vec<LedgerEntry>> {
        let mut entries = self.entries.lock().unwrap().clone();
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(entries)
    }

    async fn record(&self, name: &str, timestamp: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if entries.iter().any(|e| e.timestamp == timestamp) {
            return Err(Error::Persistence {
                reason: format!("duplicate timestamp {timestamp}"),
            });
        }
        entries.push(LedgerEntry {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: name.to_string(),
            timestamp: timestamp.to_string(),
        });
        Ok(())
    }

    async fn erase(&self, id: i64) -> Result<()> {
        self.entries.lock().unwrap().retain(|e| e.id != id);
        Ok(())
    }
}

#[derive(Default)]
struct MemRunner {
    executed: Mutex<Vec<String>>,
}

#[async_trait]
impl ScriptRunner for MemRunner {
    async fn run_script(
        &self,
        sql: &str,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(())
    }
}

async fn latest(ledger: &MemLedger) -> Option<String> {
    ledger
        .list_applied()
        .await
        .unwrap()
        .last()
        .map(|e| e.timestamp.clone())
}

#[tokio::test]
async fn full_up_then_down_flow() {
    let dir = tempdir().unwrap();
    let repository = Repository::new(dir.path());
    let migrations = repository.migrations_dir();
    fs::create_dir_all(&migrations).unwrap();
    fs::write(
        migrations.join("20230101000000-init.sql"),
        "-- +up\nCREATE TABLE users (id BIGSERIAL PRIMARY KEY);\n-- +down\nDROP TABLE users;\n",
    )
    .unwrap();
    fs::write(
        migrations.join("20230102000000-addCol.sql"),
        "-- +up\nALTER TABLE users ADD name TEXT;\n-- +down\nALTER TABLE users DROP name;\n",
    )
    .unwrap();

    let ledger = MemLedger::default();
    let runner = MemRunner::default();
    let executor = Executor::new(&repository, &ledger, &runner);

    // up --all from an empty ledger applies both, in order.
    let candidates = repository.list_candidates().unwrap();
    let plan = plan_forward(None, &candidates, Limit::All);
    let report = executor.run_up(&plan).await.unwrap();
    assert_eq!(report.committed(), 2);

    let applied = ledger.list_applied().await.unwrap();
    let names: Vec<&str> = applied.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["init", "addCol"]);

    // A second up --all finds nothing pending and changes nothing.
    let latest_ts = latest(&ledger).await;
    let plan = plan_forward(latest_ts.as_deref(), &candidates, Limit::All);
    assert!(plan.is_empty());
    assert_eq!(ledger.list_applied().await.unwrap(), applied);

    // down --one reverts only the most recent migration.
    let back = plan_backward(&applied, Limit::One);
    let report = executor.run_down(&back).await.unwrap();
    assert_eq!(report.committed(), 1);

    let remaining = ledger.list_applied().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "init");

    // down --all drains the rest in descending order.
    let back = plan_backward(&remaining, Limit::All);
    executor.run_down(&back).await.unwrap();
    assert!(ledger.list_applied().await.unwrap().is_empty());

    // The on-disk file set is untouched throughout.
    assert_eq!(repository.list_candidates().unwrap().len(), 2);
}

#[tokio::test]
async fn scaffolded_file_joins_the_plan() {
    let dir = tempdir().unwrap();
    let repository = Repository::new(dir.path());

    let path = repository.scaffold("add-users", None).unwrap();
    let body = "-- +up\nCREATE TABLE users (id INT);\n-- +down\nDROP TABLE users;\n";
    fs::write(&path, body).unwrap();

    let candidates = repository.list_candidates().unwrap();
    let plan = plan_forward(None, &candidates, Limit::All);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].name, "add-users");

    let ledger = MemLedger::default();
    let runner = MemRunner::default();
    let executor = Executor::new(&repository, &ledger, &runner);
    let report = executor.run_up(&plan).await.unwrap();
    assert_eq!(report.committed(), 1);

    let executed = runner.executed.lock().unwrap().clone();
    assert_eq!(executed, ["CREATE TABLE users (id INT);"]);
}
