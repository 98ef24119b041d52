//! Domain model for the registrar store.
//!
//! # Responsibility
//! - Define the `Student` entity and its column metadata.
//!
//! # Invariants
//! - Identity is engine-assigned; in-memory values start without an id.

pub mod student;
