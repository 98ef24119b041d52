//! Student domain model.
//!
//! # Responsibility
//! - Define the single persisted entity of the registrar store.
//! - Describe the `students` columns used by queries, filters and updates.
//!
//! # Invariants
//! - `id` is `None` until the engine assigns it, and never changes afterwards.
//! - `email` holds at most [`EMAIL_MAX_CHARS`] characters.
//! - `enrolled_date = None` on insert means "stamp with the row insert time".

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Engine-assigned primary key.
pub type StudentId = i64;

/// Upper bound for `students.email`, enforced in core and by the schema.
pub const EMAIL_MAX_CHARS: usize = 55;

/// Validation failures raised before a student reaches SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentValidationError {
    EmptyName,
    EmailTooLong { len: usize, max: usize },
}

impl Display for StudentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "student name cannot be empty"),
            Self::EmailTooLong { len, max } => {
                write!(f, "email has {len} characters, at most {max} allowed")
            }
        }
    }
}

impl Error for StudentValidationError {}

/// One row of the `students` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StudentWire")]
pub struct Student {
    pub id: Option<StudentId>,
    pub name: String,
    pub email: String,
    /// Current grade level. Mutated in bulk by promotions.
    pub grade: i64,
    pub birthday: NaiveDateTime,
    /// Filled by the engine at insert time when left as `None`.
    pub enrolled_date: Option<NaiveDateTime>,
}

impl Student {
    /// Builds an unpersisted student.
    ///
    /// # Errors
    /// - Returns [`StudentValidationError`] when the name is blank or the
    ///   email exceeds [`EMAIL_MAX_CHARS`].
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        grade: i64,
        birthday: NaiveDateTime,
    ) -> Result<Self, StudentValidationError> {
        let student = Self {
            id: None,
            name: name.into(),
            email: email.into(),
            grade,
            birthday,
            enrolled_date: None,
        };
        student.validate()?;
        Ok(student)
    }

    /// Sets an explicit enrollment timestamp instead of the insert-time default.
    pub fn enrolled_on(mut self, enrolled_date: NaiveDateTime) -> Self {
        self.enrolled_date = Some(enrolled_date);
        self
    }

    /// Checks field constraints shared by every write path.
    pub fn validate(&self) -> Result<(), StudentValidationError> {
        if self.name.trim().is_empty() {
            return Err(StudentValidationError::EmptyName);
        }

        let len = self.email.chars().count();
        if len > EMAIL_MAX_CHARS {
            return Err(StudentValidationError::EmailTooLong {
                len,
                max: EMAIL_MAX_CHARS,
            });
        }

        Ok(())
    }

    /// Returns whether the engine has assigned an id yet.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

impl Display for Student {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "Student {id}: {}, Grade {}", self.name, self.grade),
            None => write!(f, "Student ?: {}, Grade {}", self.name, self.grade),
        }
    }
}

#[derive(Deserialize)]
struct StudentWire {
    id: Option<StudentId>,
    name: String,
    email: String,
    grade: i64,
    birthday: NaiveDateTime,
    enrolled_date: Option<NaiveDateTime>,
}

impl TryFrom<StudentWire> for Student {
    type Error = StudentValidationError;

    fn try_from(value: StudentWire) -> Result<Self, Self::Error> {
        let student = Self {
            id: value.id,
            name: value.name,
            email: value.email,
            grade: value.grade,
            birthday: value.birthday,
            enrolled_date: value.enrolled_date,
        };
        student.validate()?;
        Ok(student)
    }
}

/// Columns of the `students` table addressable by queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    Name,
    Email,
    Grade,
    Birthday,
    EnrolledDate,
}

/// Storage class of a column, used to decode projected values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
    DateTime,
}

impl Column {
    /// Every column in table order.
    pub const ALL: [Column; 6] = [
        Column::Id,
        Column::Name,
        Column::Email,
        Column::Grade,
        Column::Birthday,
        Column::EnrolledDate,
    ];

    /// SQL identifier of this column.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Email => "email",
            Self::Grade => "grade",
            Self::Birthday => "birthday",
            Self::EnrolledDate => "enrolled_date",
        }
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            Self::Id | Self::Grade => ColumnKind::Integer,
            Self::Name | Self::Email => ColumnKind::Text,
            Self::Birthday | Self::EnrolledDate => ColumnKind::DateTime,
        }
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::{Column, ColumnKind, Student, StudentValidationError, EMAIL_MAX_CHARS};
    use chrono::NaiveDate;

    fn birthday() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(1912, 6, 23)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("valid date")
    }

    #[test]
    fn email_at_limit_is_accepted() {
        let email = "a".repeat(EMAIL_MAX_CHARS);
        assert!(Student::new("Alan Turing", email, 11, birthday()).is_ok());
    }

    #[test]
    fn email_length_counts_chars_not_bytes() {
        let email = "é".repeat(EMAIL_MAX_CHARS);
        assert!(Student::new("Émile", email, 3, birthday()).is_ok());
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Student::new("   ", "x@y.z", 1, birthday()).unwrap_err();
        assert_eq!(err, StudentValidationError::EmptyName);
    }

    #[test]
    fn column_kinds_match_schema() {
        assert_eq!(Column::Grade.kind(), ColumnKind::Integer);
        assert_eq!(Column::Email.kind(), ColumnKind::Text);
        assert_eq!(Column::EnrolledDate.kind(), ColumnKind::DateTime);
        assert_eq!(Column::EnrolledDate.as_sql(), "enrolled_date");
    }
}
