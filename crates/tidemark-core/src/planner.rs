//! Migration planning.
//!
//! Pure functions that turn the ledger's view of history plus the on-disk
//! candidates into the ordered batch to run next. Timestamps are 14-digit
//! strings, so plain string comparison is chronological comparison.

use crate::ledger::LedgerEntry;
use crate::repository::MigrationIdentity;

/// How much of the pending/applied set one invocation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Only the next pending (or most recent applied) migration.
    One,
    /// Everything pending (or everything applied, for rollback).
    All,
}

/// Compute the ordered batch of migrations to apply.
///
/// Keeps candidates with a timestamp strictly greater than the latest
/// applied one (all candidates when the ledger is empty), ascending. An
/// empty result means nothing is pending; it is not an error.
pub fn plan_forward(
    latest_applied: Option<&str>,
    candidates: &[MigrationIdentity],
    limit: Limit,
) -> Vec<MigrationIdentity> {
    let mut pending: Vec<MigrationIdentity> = candidates
        .iter()
        .filter(|candidate| match latest_applied {
            Some(latest) => candidate.timestamp.as_str() > latest,
            None => true,
        })
        .cloned()
        .collect();

    // Directory iteration order is not guaranteed; the plan's order is.
    pending.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    if limit == Limit::One {
        pending.truncate(1);
    }
    pending
}

/// Compute the ordered batch of ledger entries to roll back.
///
/// Descending by timestamp, so rollback undoes history most-recent-first.
/// `Limit::One` yields only the single most recent entry. An empty ledger
/// yields an empty batch; it is not an error.
pub fn plan_backward(applied: &[LedgerEntry], limit: Limit) -> Vec<LedgerEntry> {
    let mut batch: Vec<LedgerEntry> = applied.to_vec();
    batch.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    if limit == Limit::One {
        batch.truncate(1);
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(timestamp: &str, name: &str) -> MigrationIdentity {
        MigrationIdentity::from_parts(timestamp, name)
    }

    fn entry(id: i64, timestamp: &str, name: &str) -> LedgerEntry {
        LedgerEntry {
            id,
            name: name.to_string(),
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn test_forward_empty_ledger_takes_all_sorted() {
        // Candidates arrive in directory order, not sorted.
        let candidates = vec![
            identity("20230102000000", "addCol"),
            identity("20230101000000", "init"),
        ];

        let plan = plan_forward(None, &candidates, Limit::All);
        let names: Vec<&str> = plan.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["init", "addCol"]);
    }

    #[test]
    fn test_forward_filters_strictly_greater() {
        let candidates = vec![
            identity("20230101000000", "init"),
            identity("20230102000000", "addCol"),
            identity("20230103000000", "addIdx"),
        ];

        let plan = plan_forward(Some("20230102000000"), &candidates, Limit::All);
        let names: Vec<&str> = plan.iter().map(|p| p.name.as_str()).collect();
        // The latest applied timestamp itself is excluded.
        assert_eq!(names, ["addIdx"]);
    }

    #[test]
    fn test_forward_limit_one_takes_earliest_pending() {
        let candidates = vec![
            identity("20230103000000", "addIdx"),
            identity("20230102000000", "addCol"),
        ];

        let plan = plan_forward(Some("20230101000000"), &candidates, Limit::One);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].name, "addCol");
    }

    #[test]
    fn test_forward_nothing_pending_is_empty() {
        let candidates = vec![identity("20230101000000", "init")];
        assert!(plan_forward(Some("20230101000000"), &candidates, Limit::All).is_empty());
        assert!(plan_forward(Some("20230909000000"), &candidates, Limit::One).is_empty());
        assert!(plan_forward(None, &[], Limit::All).is_empty());
    }

    #[test]
    fn test_backward_all_is_descending() {
        let applied = vec![
            entry(1, "20230101000000", "init"),
            entry(2, "20230102000000", "addCol"),
            entry(3, "20230103000000", "addIdx"),
        ];

        let plan = plan_backward(&applied, Limit::All);
        let names: Vec<&str> = plan.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["addIdx", "addCol", "init"]);
    }

    #[test]
    fn test_backward_one_takes_most_recent() {
        let applied = vec![
            entry(1, "20230101000000", "init"),
            entry(2, "20230102000000", "addCol"),
        ];

        let plan = plan_backward(&applied, Limit::One);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].name, "addCol");
    }

    #[test]
    fn test_backward_empty_ledger_is_empty() {
        assert!(plan_backward(&[], Limit::All).is_empty());
        assert!(plan_backward(&[], Limit::One).is_empty());
    }
}
