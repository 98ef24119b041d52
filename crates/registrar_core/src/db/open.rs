//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections from a `ConnectionTarget`.
//! - Configure connection pragmas required by core behavior.
//! - Apply the schema registry before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have the registry's latest schema applied.
//! - Failures before schema work are `DbError::Connection`; failures during
//!   it are `DbError::Schema` or `DbError::UnsupportedSchemaVersion`.

use super::{ConnectionTarget, DbError, DbResult, SchemaRegistry};
use log::{error, info};
use rusqlite::Connection;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the store at `target` and applies `registry`.
///
/// Calling this repeatedly on the same file target is idempotent: existing
/// tables and indexes are left untouched.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(target: &ConnectionTarget, registry: &SchemaRegistry) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = target.mode();
    info!("event=db_open module=db status=start mode={mode}");

    let opened = match target {
        ConnectionTarget::Memory => Connection::open_in_memory(),
        ConnectionTarget::File(path) => Connection::open(path),
    };
    let mut conn = match opened {
        Ok(conn) => conn,
        Err(source) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                source
            );
            return Err(DbError::Connection {
                target: target.to_string(),
                source,
            });
        }
    };

    match bootstrap_connection(&mut conn, target, registry) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={} schema_version={}",
                started_at.elapsed().as_millis(),
                registry.latest_version()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Opens an ephemeral in-memory store with the default student schema.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_db(&ConnectionTarget::Memory, &SchemaRegistry::students())
}

fn bootstrap_connection(
    conn: &mut Connection,
    target: &ConnectionTarget,
    registry: &SchemaRegistry,
) -> DbResult<()> {
    let configure = conn
        .execute_batch("PRAGMA foreign_keys = ON;")
        .and_then(|()| conn.busy_timeout(BUSY_TIMEOUT))
        // forces a header read so a non-database file fails here
        .and_then(|()| conn.query_row("PRAGMA schema_version;", [], |row| row.get::<_, i64>(0)))
        .map(|_| ());
    if let Err(source) = configure {
        return Err(DbError::Connection {
            target: target.to_string(),
            source,
        });
    }

    registry.apply(conn)
}
