//! Student use-case service.
//!
//! # Responsibility
//! - Provide school-level entry points: enroll, promote, roster, withdraw.
//! - Delegate persistence to repository implementations.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Service layer remains storage-agnostic.

use crate::model::student::{Column, Student, StudentId};
use crate::repo::query::{Assignment, OrderedQuery, Predicate, ProjectedRow, SortDirection};
use crate::repo::student_repo::{RepoResult, StudentRepository};
use log::info;

/// Use-case service wrapper for student record operations.
pub struct StudentService<R: StudentRepository> {
    repo: R,
}

impl<R: StudentRepository> StudentService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Enrolls a batch of new students in one write.
    pub fn enroll(&self, students: &[Student]) -> RepoResult<usize> {
        let enrolled = self.repo.create_many(students)?;
        info!("event=students_enrolled module=service status=ok rows={enrolled}");
        Ok(enrolled)
    }

    /// Enrolls one student and returns the assigned id.
    pub fn enroll_one(&self, student: &Student) -> RepoResult<StudentId> {
        self.repo.create(student)
    }

    /// Moves every student up one grade level with a single engine-side update.
    ///
    /// # Contract
    /// - Row count is unchanged.
    /// - Returns the number of students promoted.
    pub fn promote_all(&self) -> RepoResult<usize> {
        let promoted = self
            .repo
            .bulk_update(&[Assignment::IncrementGrade(1)], &[])?;
        info!("event=students_promoted module=service status=ok rows={promoted}");
        Ok(promoted)
    }

    /// Names and grades, highest grade first, optionally capped.
    pub fn roster_by_grade(&self, limit: Option<u32>) -> RepoResult<Vec<ProjectedRow>> {
        let mut query = OrderedQuery::new(
            &[Column::Name, Column::Grade],
            Column::Grade,
            SortDirection::Desc,
        );
        query.limit = limit;
        self.repo.query_ordered(&query)
    }

    /// Runs a caller-built projection.
    pub fn query(&self, query: &OrderedQuery) -> RepoResult<Vec<ProjectedRow>> {
        self.repo.query_ordered(query)
    }

    /// Name and birthday of the student in the highest grade.
    pub fn top_of_class(&self) -> RepoResult<Option<ProjectedRow>> {
        self.repo.query_first(
            &[Column::Name, Column::Birthday],
            Column::Grade,
            SortDirection::Desc,
        )
    }

    pub fn headcount(&self) -> RepoResult<u64> {
        self.repo.count()
    }

    pub fn search(&self, predicates: &[Predicate]) -> RepoResult<Vec<Student>> {
        self.repo.filter(predicates)
    }

    pub fn list_all(&self) -> RepoResult<Vec<Student>> {
        self.repo.list_all()
    }

    /// Removes matching students and returns how many were removed.
    pub fn withdraw(&self, predicates: &[Predicate]) -> RepoResult<usize> {
        let removed = self.repo.delete(predicates)?;
        info!("event=students_withdrawn module=service status=ok rows={removed}");
        Ok(removed)
    }
}
