use registrar_core::db::migrations::{latest_version, Migration};
use registrar_core::{open_db, open_db_in_memory, ConnectionTarget, DbError, SchemaRegistry};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_creates_table_and_name_index() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert!(object_exists(&conn, "table", "students"));
    assert!(object_exists(&conn, "index", "index_name"));
}

#[test]
fn opening_same_file_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let target = ConnectionTarget::File(dir.path().join("school.db"));
    let registry = SchemaRegistry::students();

    let first = open_db(&target, &registry).unwrap();
    first
        .execute(
            "INSERT INTO students (name, email, grade, birthday) VALUES ('Ada', 'ada@x.io', 5, '1815-12-10 00:00:00');",
            [],
        )
        .unwrap();
    drop(first);

    let second = open_db(&target, &registry).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    let rows: i64 = second
        .query_row("SELECT COUNT(*) FROM students;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn unreachable_target_returns_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let target = ConnectionTarget::File(dir.path().join("missing").join("school.db"));

    let err = open_db(&target, &SchemaRegistry::students()).unwrap_err();
    assert!(matches!(err, DbError::Connection { .. }), "unexpected error: {err}");
}

#[test]
fn non_database_file_returns_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "this is not a sqlite database\n".repeat(200)).unwrap();

    let err = open_db(&ConnectionTarget::File(path), &SchemaRegistry::students()).unwrap_err();
    assert!(matches!(err, DbError::Connection { .. }), "unexpected error: {err}");
}

#[test]
fn newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&ConnectionTarget::File(path), &SchemaRegistry::students()).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn broken_schema_step_returns_schema_error_and_keeps_version() {
    static BROKEN: &[Migration] = &[Migration {
        version: 1,
        sql: "CREATE TABLE students (id INTEGER PRIMARY KEY); CREATE TABLE students (id INTEGER);",
    }];
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.db");

    let err = open_db(
        &ConnectionTarget::File(path.clone()),
        &SchemaRegistry::from_migrations(BROKEN),
    )
    .unwrap_err();
    assert!(matches!(err, DbError::Schema(_)), "unexpected error: {err}");

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 0);
    assert!(!object_exists(&conn, "table", "students"));
}

#[test]
fn email_length_is_enforced_by_the_engine() {
    let conn = open_db_in_memory().unwrap();

    let err = conn
        .execute(
            "INSERT INTO students (name, email, grade, birthday) VALUES ('Long', ?1, 1, '2000-01-01 00:00:00');",
            ["x".repeat(56)],
        )
        .unwrap_err();
    assert_eq!(
        err.sqlite_error_code(),
        Some(rusqlite::ErrorCode::ConstraintViolation)
    );
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn object_exists(conn: &Connection, kind: &str, name: &str) -> bool {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            );",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    exists == 1
}
