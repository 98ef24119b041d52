//! Schema registry and executor.
//!
//! # Responsibility
//! - Collect the schema steps of every entity in one explicit registry.
//! - Apply pending steps atomically.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied version is mirrored to `PRAGMA user_version`.
//! - A failed step leaves the database at its previous version.

use crate::db::{DbError, DbResult};
use log::debug;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub sql: &'static str,
}

const STUDENT_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_students.sql"),
}];

/// Ordered set of schema steps handed to [`crate::db::open_db`].
///
/// Built once at startup and passed explicitly, so there is no global table
/// metadata that entity definitions register into.
#[derive(Debug, Clone, Copy)]
pub struct SchemaRegistry {
    migrations: &'static [Migration],
}

impl SchemaRegistry {
    /// Registry containing the `students` table and its `name` index.
    pub fn students() -> Self {
        Self {
            migrations: STUDENT_MIGRATIONS,
        }
    }

    /// Registry over caller-provided steps, sorted by ascending `version`.
    pub fn from_migrations(migrations: &'static [Migration]) -> Self {
        Self { migrations }
    }

    /// Returns the latest version this registry knows about.
    pub fn latest_version(&self) -> u32 {
        self.migrations.last().map_or(0, |migration| migration.version)
    }

    /// Applies all pending steps on the provided connection.
    pub fn apply(&self, conn: &mut Connection) -> DbResult<()> {
        let current_version = current_user_version(conn)?;
        let latest = self.latest_version();

        if current_version > latest {
            return Err(DbError::UnsupportedSchemaVersion {
                db_version: current_version,
                latest_supported: latest,
            });
        }

        if current_version == latest {
            return Ok(());
        }

        let tx = conn.transaction().map_err(DbError::Schema)?;
        for migration in self.migrations {
            if migration.version <= current_version {
                continue;
            }

            debug!(
                "event=schema_step module=db status=start version={}",
                migration.version
            );
            tx.execute_batch(migration.sql).map_err(DbError::Schema)?;
            tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
                .map_err(DbError::Schema)?;
        }
        tx.commit().map_err(DbError::Schema)?;

        Ok(())
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::students()
    }
}

/// Returns the latest version of the default student registry.
pub fn latest_version() -> u32 {
    SchemaRegistry::students().latest_version()
}

/// Reads `PRAGMA user_version` from the connection.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))
        .map_err(DbError::Schema)
}
