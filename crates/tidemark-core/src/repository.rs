//! Migration file discovery, parsing, and scaffolding.
//!
//! Migrations live on disk as `<root>/migrations/<timestamp>-<name>.sql`,
//! where the timestamp is 14 digits (`YYYYMMDDHHmmss`) so lexicographic
//! order coincides with chronological order. Each file holds two scripts
//! introduced by marker comments:
//!
//! ```sql
//! -- +up
//! CREATE TABLE users (id BIGSERIAL PRIMARY KEY, name TEXT NOT NULL);
//!
//! -- +down
//! DROP TABLE users;
//! ```
//!
//! Listing the directory never executes anything; parsing happens at load
//! time and fails fast when a section is missing.

use crate::error::{Error, Result};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directory under the project root that holds migration files.
pub const MIGRATIONS_DIR: &str = "migrations";

/// Extension migration files must carry.
pub const MIGRATION_EXTENSION: &str = "sql";

/// Marker comment opening the forward script.
pub const UP_MARKER: &str = "-- +up";

/// Marker comment opening the backward script.
pub const DOWN_MARKER: &str = "-- +down";

/// Number of digits in a migration timestamp (`YYYYMMDDHHmmss`).
const TIMESTAMP_DIGITS: usize = 14;

/// Template written by [`Repository::scaffold`] when no custom template is given.
const DEFAULT_TEMPLATE: &str = "-- +up\n\n\n-- +down\n\n";

/// Identity of one migration, parsed from its filename.
///
/// Immutable once parsed; the timestamp is the ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationIdentity {
    /// 14-digit `YYYYMMDDHHmmss` stamp; sorts chronologically as a string.
    pub timestamp: String,
    /// Human-readable name, everything between the first `-` and the extension.
    pub name: String,
    /// The filename the identity was parsed from.
    pub filename: String,
}

impl MigrationIdentity {
    /// Parse an identity from a filename such as `20230101000000-init.sql`.
    ///
    /// Returns `None` for anything that does not match the naming pattern;
    /// callers skip those silently.
    pub fn parse(filename: &str) -> Option<Self> {
        let stem = filename.strip_suffix(&format!(".{MIGRATION_EXTENSION}"))?;
        let (timestamp, name) = stem.split_once('-')?;
        if timestamp.len() != TIMESTAMP_DIGITS
            || !timestamp.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        Some(Self {
            timestamp: timestamp.to_string(),
            name: name.to_string(),
            filename: filename.to_string(),
        })
    }

    /// Rebuild an identity from its parts, reconstructing the filename.
    ///
    /// Used on the rollback path, where only the ledger's `{name, timestamp}`
    /// pair is known.
    pub fn from_parts(timestamp: impl Into<String>, name: impl Into<String>) -> Self {
        let timestamp = timestamp.into();
        let name = name.into();
        let filename = format!("{timestamp}-{name}.{MIGRATION_EXTENSION}");
        Self {
            timestamp,
            name,
            filename,
        }
    }
}

impl std::fmt::Display for MigrationIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.timestamp, self.name)
    }
}

/// A loaded migration: its identity plus the two SQL scripts.
#[derive(Debug, Clone)]
pub struct MigrationScript {
    /// The identity the script was loaded for.
    pub identity: MigrationIdentity,
    /// Forward script (the `-- +up` section).
    pub up: String,
    /// Backward script (the `-- +down` section).
    pub down: String,
}

/// File-system view over a project's migrations directory.
#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
}

impl Repository {
    /// Create a repository rooted at the given project directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the migrations directory under the root.
    pub fn migrations_dir(&self) -> PathBuf {
        self.root.join(MIGRATIONS_DIR)
    }

    /// Scan the migrations directory for candidate migrations.
    ///
    /// Non-matching filenames are skipped silently. The result is sorted
    /// ascending by timestamp regardless of directory iteration order.
    pub fn list_candidates(&self) -> Result<Vec<MigrationIdentity>> {
        let dir = self.migrations_dir();
        let entries = fs::read_dir(&dir).map_err(|source| Error::Filesystem {
            path: dir.clone(),
            source,
        })?;

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| Error::Filesystem {
                path: dir.clone(),
                source,
            })?;
            if let Some(filename) = entry.file_name().to_str() {
                if let Some(identity) = MigrationIdentity::parse(filename) {
                    candidates.push(identity);
                }
            }
        }

        candidates.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(candidates)
    }

    /// Load the up/down scripts for an identity.
    ///
    /// A missing file or a missing/empty `-- +up` or `-- +down` section is a
    /// [`Error::Load`], surfaced before anything executes.
    pub fn load(&self, identity: &MigrationIdentity) -> Result<MigrationScript> {
        let path = self.migrations_dir().join(&identity.filename);
        let content = fs::read_to_string(&path).map_err(|e| Error::Load {
            filename: identity.filename.clone(),
            reason: e.to_string(),
        })?;

        let (up, down) = split_sections(&content).map_err(|reason| Error::Load {
            filename: identity.filename.clone(),
            reason,
        })?;

        Ok(MigrationScript {
            identity: identity.clone(),
            up,
            down,
        })
    }

    /// Create a new migration file named after the current UTC time.
    ///
    /// Copies `template` when given, otherwise writes the built-in template.
    /// The resulting filename round-trips through [`Self::list_candidates`].
    /// Scaffolding the same name twice within one second collides on the
    /// timestamp and is a [`Error::Filesystem`], never a silent overwrite.
    pub fn scaffold(&self, name: &str, template: Option<&Path>) -> Result<PathBuf> {
        let timestamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
        self.scaffold_at(name, template, &timestamp)
    }

    fn scaffold_at(&self, name: &str, template: Option<&Path>, timestamp: &str) -> Result<PathBuf> {
        let dir = self.migrations_dir();
        fs::create_dir_all(&dir).map_err(|source| Error::Filesystem {
            path: dir.clone(),
            source,
        })?;

        let content = match template {
            Some(template) => fs::read_to_string(template).map_err(|source| Error::Filesystem {
                path: template.to_path_buf(),
                source,
            })?,
            None => DEFAULT_TEMPLATE.to_string(),
        };

        let path = dir.join(format!("{timestamp}-{name}.{MIGRATION_EXTENSION}"));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| Error::Filesystem {
                path: path.clone(),
                source,
            })?;
        file.write_all(content.as_bytes())
            .map_err(|source| Error::Filesystem {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }
}

/// Split a migration file into its up and down scripts.
///
/// Lines before the first marker are ignored, so files may begin with
/// header comments. Markers are matched on the whole trimmed line.
fn split_sections(content: &str) -> std::result::Result<(String, String), String> {
    #[derive(PartialEq)]
    enum Section {
        Preamble,
        Up,
        Down,
    }

    let mut section = Section::Preamble;
    let mut up = Vec::new();
    let mut down = Vec::new();

    for line in content.lines() {
        match line.trim() {
            UP_MARKER => section = Section::Up,
            DOWN_MARKER => section = Section::Down,
            _ => match section {
                Section::Preamble => {}
                Section::Up => up.push(line),
                Section::Down => down.push(line),
            },
        }
    }

    let up = up.join("\n").trim().to_string();
    let down = down.join("\n").trim().to_string();

    if up.is_empty() {
        return Err(format!("missing or empty `{UP_MARKER}` section"));
    }
    if down.is_empty() {
        return Err(format!("missing or empty `{DOWN_MARKER}` section"));
    }

    Ok((up, down))
}
