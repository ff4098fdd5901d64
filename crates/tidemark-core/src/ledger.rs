//! Applied-migration ledger.
//!
//! The ledger is the persistent record of which migrations have completed,
//! ordered by timestamp. The trait is the seam between the executor and the
//! backing store; the production implementation lives in [`crate::postgres`],
//! tests drive the executor with in-memory fakes.

use crate::error::Result;
use async_trait::async_trait;

/// One applied migration as recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Store-assigned identifier, opaque to callers.
    pub id: i64,
    /// Name of the applied migration.
    pub name: String,
    /// 14-digit timestamp of the applied migration.
    pub timestamp: String,
}

/// Persistent, ordered record of applied migrations.
///
/// Entries are assumed to form a monotonic history; the store does not
/// enforce contiguity, and manual edits are undefined behavior.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// All applied migrations, ascending by timestamp.
    async fn list_applied(&self) -> Result<Vec<LedgerEntry>>;

    /// Record a migration as applied. Called immediately after its forward
    /// script succeeds; a duplicate timestamp is a persistence error.
    async fn record(&self, name: &str, timestamp: &str) -> Result<()>;

    /// Delete an entry by identifier. Called immediately after the matching
    /// backward script succeeds.
    async fn erase(&self, id: i64) -> Result<()>;
}
