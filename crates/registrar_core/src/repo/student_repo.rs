//! Student repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create, query, filter, bulk update and delete over `students`.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Inserts call `Student::validate()` before SQL mutations; bulk updates
//!   call `Assignment::validate()` and rely on the schema for email length.
//! - Every write runs in its own transaction: all rows commit or none do.
//! - Bulk update and delete never load rows into memory.
//! - Engine errors are surfaced as-is, classified but never retried.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::student::{Column, ColumnKind, Student, StudentId, StudentValidationError};
use crate::repo::query::{
    format_datetime, update_statement, where_clause, Assignment, FieldValue, OrderedQuery,
    Predicate, ProjectedRow, SortDirection,
};
use chrono::NaiveDateTime;
use log::{debug, error};
use rusqlite::types::Value;
use rusqlite::{
    params_from_iter, Connection, ErrorCode, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

const STUDENT_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    grade,
    birthday,
    enrolled_date
FROM students";

const STUDENT_INSERT_SQL: &str = "INSERT INTO students (
    name,
    email,
    grade,
    birthday,
    enrolled_date
) VALUES (?1, ?2, ?3, ?4, COALESCE(?5, strftime('%Y-%m-%d %H:%M:%f', 'now', 'localtime')));";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for student persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Rejected by core validation before reaching the engine.
    Validation(StudentValidationError),
    /// Engine unreachable, locked or not a database.
    Connection(rusqlite::Error),
    /// Constraint or type violation reported by the engine.
    Persistence(rusqlite::Error),
    /// Bulk create only accepts students without an id.
    AlreadyPersisted(StudentId),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    InvalidData(String),
}

impl RepoError {
    /// True for failures caused by the data being written.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Persistence(_) | Self::AlreadyPersisted(_)
        )
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Connection(err) => write!(f, "connection error: {err}"),
            Self::Persistence(err) => write!(f, "persistence error: {err}"),
            Self::AlreadyPersisted(id) => write!(f, "student {id} is already persisted"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::InvalidData(message) => write!(f, "invalid persisted student data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Connection(err) | Self::Persistence(err) => Some(err),
            Self::AlreadyPersisted(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<StudentValidationError> for RepoError {
    fn from(value: StudentValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match value.sqlite_error_code() {
            Some(
                ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::SystemIoFailure
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::DatabaseCorrupt,
            ) => Self::Connection(value),
            _ => Self::Persistence(value),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Connection { source, .. } => Self::Connection(source),
            DbError::Schema(err) => Self::Persistence(err),
            DbError::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => Self::UninitializedConnection {
                expected_version: latest_supported,
                actual_version: db_version,
            },
            DbError::InvalidTarget(raw) => Self::InvalidData(format!("invalid target `{raw}`")),
        }
    }
}

/// Repository interface for the student record store.
pub trait StudentRepository {
    /// Inserts one student and returns the engine-assigned id.
    fn create(&self, student: &Student) -> RepoResult<StudentId>;
    /// Inserts a batch in one transaction without returning ids.
    fn create_many(&self, students: &[Student]) -> RepoResult<usize>;
    fn get(&self, id: StudentId) -> RepoResult<Option<Student>>;
    /// Looks students up by exact name through the `name` index.
    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Student>>;
    /// Returns every student ordered by id.
    fn list_all(&self) -> RepoResult<Vec<Student>>;
    fn query_ordered(&self, query: &OrderedQuery) -> RepoResult<Vec<ProjectedRow>>;
    fn query_first(
        &self,
        columns: &[Column],
        order_by: Column,
        direction: SortDirection,
    ) -> RepoResult<Option<ProjectedRow>>;
    /// Counts rows with an aggregate, without materializing them.
    fn count(&self) -> RepoResult<u64>;
    /// Returns students matching every predicate, ordered by id.
    fn filter(&self, predicates: &[Predicate]) -> RepoResult<Vec<Student>>;
    /// Applies `assignments` engine-side to matching rows; returns rows changed.
    fn bulk_update(
        &self,
        assignments: &[Assignment],
        predicates: &[Predicate],
    ) -> RepoResult<usize>;
    /// Removes matching rows; returns rows removed.
    fn delete(&self, predicates: &[Predicate]) -> RepoResult<usize>;
}

/// SQLite-backed student repository.
pub struct SqliteStudentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentRepository<'conn> {
    /// Constructs a repository from a connection opened by [`crate::db::open_db`].
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version does not match.
    /// - `MissingRequiredTable` when `students` does not exist.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_student_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn write_tx(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl StudentRepository for SqliteStudentRepository<'_> {
    fn create(&self, student: &Student) -> RepoResult<StudentId> {
        if let Some(id) = student.id {
            return Err(RepoError::AlreadyPersisted(id));
        }
        student.validate()?;

        let tx = self.write_tx()?;
        tx.execute(STUDENT_INSERT_SQL, insert_params(student))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!("event=student_create module=repo status=ok id={id}");
        Ok(id)
    }

    fn create_many(&self, students: &[Student]) -> RepoResult<usize> {
        for student in students {
            if let Some(id) = student.id {
                return Err(RepoError::AlreadyPersisted(id));
            }
            student.validate()?;
        }

        let tx = self.write_tx()?;
        {
            let mut stmt = tx.prepare_cached(STUDENT_INSERT_SQL)?;
            for student in students {
                if let Err(err) = stmt.execute(insert_params(student)) {
                    error!(
                        "event=student_create_many module=repo status=error rows={} error={}",
                        students.len(),
                        err
                    );
                    return Err(err.into());
                }
            }
        }
        tx.commit()?;

        debug!(
            "event=student_create_many module=repo status=ok rows={}",
            students.len()
        );
        Ok(students.len())
    }

    fn get(&self, id: StudentId) -> RepoResult<Option<Student>> {
        let row = self
            .conn
            .query_row(
                &format!("{STUDENT_SELECT_SQL} WHERE id = ?1;"),
                [id],
                read_student_row,
            )
            .optional()?;
        Ok(row)
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Student>> {
        self.filter(&[Predicate::eq(Column::Name, name)])
    }

    fn list_all(&self) -> RepoResult<Vec<Student>> {
        self.filter(&[])
    }

    fn query_ordered(&self, query: &OrderedQuery) -> RepoResult<Vec<ProjectedRow>> {
        let columns = query.projected_columns();
        let (sql, bind_values) = query.to_sql();

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut projected = Vec::new();
        while let Some(row) = rows.next()? {
            projected.push(read_projected_row(row, &columns)?);
        }

        Ok(projected)
    }

    fn query_first(
        &self,
        columns: &[Column],
        order_by: Column,
        direction: SortDirection,
    ) -> RepoResult<Option<ProjectedRow>> {
        let query = OrderedQuery::new(columns, order_by, direction).limit(1);
        Ok(self.query_ordered(&query)?.into_iter().next())
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(id) FROM students;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }

    fn filter(&self, predicates: &[Predicate]) -> RepoResult<Vec<Student>> {
        let (where_sql, bind_values) = where_clause(predicates);
        let sql = format!("{STUDENT_SELECT_SQL}{where_sql} ORDER BY id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let students = stmt
            .query_map(params_from_iter(bind_values), read_student_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(students)
    }

    fn bulk_update(
        &self,
        assignments: &[Assignment],
        predicates: &[Predicate],
    ) -> RepoResult<usize> {
        for assignment in assignments {
            assignment.validate()?;
        }
        let Some((sql, bind_values)) = update_statement(assignments, predicates) else {
            return Ok(0);
        };

        let tx = self.write_tx()?;
        let changed = tx.execute(&sql, params_from_iter(bind_values))?;
        tx.commit()?;

        debug!("event=student_bulk_update module=repo status=ok rows={changed}");
        Ok(changed)
    }

    fn delete(&self, predicates: &[Predicate]) -> RepoResult<usize> {
        let (where_sql, bind_values) = where_clause(predicates);

        let tx = self.write_tx()?;
        let removed = tx.execute(
            &format!("DELETE FROM students{where_sql};"),
            params_from_iter(bind_values),
        )?;
        tx.commit()?;

        debug!("event=student_delete module=repo status=ok rows={removed}");
        Ok(removed)
    }
}

fn insert_params(student: &Student) -> impl rusqlite::Params {
    params_from_iter([
        Value::Text(student.name.clone()),
        Value::Text(student.email.clone()),
        Value::Integer(student.grade),
        Value::Text(format_datetime(student.birthday)),
        student
            .enrolled_date
            .map_or(Value::Null, |date| Value::Text(format_datetime(date))),
    ])
}

fn read_student_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        email: row.get("email")?,
        grade: row.get("grade")?,
        birthday: row.get("birthday")?,
        enrolled_date: row.get("enrolled_date")?,
    })
}

fn read_projected_row(row: &Row<'_>, columns: &[Column]) -> RepoResult<ProjectedRow> {
    let mut values = Vec::with_capacity(columns.len());
    for (index, column) in columns.iter().enumerate() {
        let value = match column.kind() {
            ColumnKind::Integer => row
                .get::<_, Option<i64>>(index)?
                .map_or(FieldValue::Null, FieldValue::Integer),
            ColumnKind::Text => row
                .get::<_, Option<String>>(index)?
                .map_or(FieldValue::Null, FieldValue::Text),
            ColumnKind::DateTime => row
                .get::<_, Option<NaiveDateTime>>(index)?
                .map_or(FieldValue::Null, FieldValue::DateTime),
        };
        values.push((*column, value));
    }
    Ok(ProjectedRow { values })
}

fn ensure_student_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "students")? {
        return Err(RepoError::MissingRequiredTable("students"));
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
