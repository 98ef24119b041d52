//! Core data access for the registrar student store.
//! This crate owns the `students` schema and every query against it.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, ConnectionTarget, DbError, DbResult, SchemaRegistry};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::student::{Column, Student, StudentId, StudentValidationError, EMAIL_MAX_CHARS};
pub use repo::query::{
    Assignment, FieldValue, OrderedQuery, Predicate, ProjectedRow, SortDirection,
};
pub use repo::student_repo::{RepoError, RepoResult, SqliteStudentRepository, StudentRepository};
pub use service::student_service::StudentService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
