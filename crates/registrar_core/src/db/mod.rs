//! SQLite storage bootstrap and schema entry points.
//!
//! # Responsibility
//! - Resolve where the store lives (`ConnectionTarget`).
//! - Open and configure SQLite connections for the registrar core.
//! - Apply the registered schema before handing a connection out.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write student data before the schema is applied.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

pub mod migrations;
mod open;

pub use migrations::SchemaRegistry;
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// The engine could not be opened or configured at the given target.
    Connection {
        target: String,
        source: rusqlite::Error,
    },
    /// Table or index creation failed.
    Schema(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    InvalidTarget(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection { target, source } => {
                write!(f, "cannot connect to `{target}`: {source}")
            }
            Self::Schema(err) => write!(f, "schema setup failed: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InvalidTarget(raw) => write!(f, "invalid connection target `{raw}`"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connection { source, .. } => Some(source),
            Self::Schema(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::InvalidTarget(_) => None,
        }
    }
}

/// Where the relational engine keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    /// Ephemeral database that lives as long as the connection.
    Memory,
    File(PathBuf),
}

impl ConnectionTarget {
    /// Short label used in log events.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File(_) => "file",
        }
    }
}

impl Display for ConnectionTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str(":memory:"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl FromStr for ConnectionTarget {
    type Err = DbError;

    /// Accepts `:memory:`, `sqlite::memory:`, `sqlite:///path`, `sqlite://path`
    /// or a plain filesystem path.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DbError::InvalidTarget(raw.to_string()));
        }

        if matches!(trimmed, ":memory:" | "sqlite::memory:" | "sqlite:///:memory:") {
            return Ok(Self::Memory);
        }

        // sqlite:///abs/path keeps its leading slash, sqlite://rel/path does not
        let path = trimmed
            .strip_prefix("sqlite:///")
            .map(|rest| format!("/{rest}"))
            .or_else(|| trimmed.strip_prefix("sqlite://").map(str::to_string))
            .unwrap_or_else(|| trimmed.to_string());

        if path.is_empty() || path == "/" {
            return Err(DbError::InvalidTarget(raw.to_string()));
        }

        Ok(Self::File(PathBuf::from(path)))
    }
}
