//! Use-case services built on repository contracts.
//!
//! # Responsibility
//! - Expose school-level operations (enroll, promote, roster).
//! - Keep callers independent of SQL and storage details.

pub mod student_service;
