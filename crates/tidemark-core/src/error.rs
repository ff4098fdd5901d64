//! Error types for migration runs.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by migration discovery, planning, and execution.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid connection configuration.
    #[error("invalid configuration: {reason}")]
    Config {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// The migrations directory or a scaffold target could not be accessed.
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        /// The path that could not be accessed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A migration file could not be read or parsed into its up/down scripts.
    #[error("cannot load migration {filename}: {reason}")]
    Load {
        /// The migration filename.
        filename: String,
        /// Why loading failed.
        reason: String,
    },

    /// The ledger could not be read or written, or bootstrap failed.
    #[error("ledger persistence failed: {reason}")]
    Persistence {
        /// The underlying database error.
        reason: String,
    },

    /// A migration's own up or down script failed while executing.
    #[error("migration {name} failed: {reason}")]
    MigrationRuntime {
        /// Name of the failing migration.
        name: String,
        /// Full error detail reported by the database.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_migration() {
        let err = Error::MigrationRuntime {
            name: "add-users".to_string(),
            reason: "relation \"users\" already exists".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("add-users"));
        assert!(text.contains("already exists"));
    }

    #[test]
    fn test_filesystem_error_includes_path() {
        let err = Error::Filesystem {
            path: PathBuf::from("/tmp/project/migrations"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("/tmp/project/migrations"));
    }
}
