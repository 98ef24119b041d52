//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contract for the student record store.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Inserts enforce `Student::validate()` and bulk updates enforce
//!   `Assignment::validate()` before persistence.
//! - Engine errors are classified into connection vs persistence failures and
//!   returned to the caller without retries.

pub mod query;
pub mod student_repo;
