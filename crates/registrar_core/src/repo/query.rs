//! Query building blocks for the student repository.
//!
//! # Responsibility
//! - Describe ordering, projection, filtering and update requests as values.
//! - Render them into SQL fragments with positional bind values.
//!
//! # Invariants
//! - Column names only ever come from [`Column::as_sql`]; user data is bound.
//! - Predicates combine with `AND` only.

use crate::model::student::{Column, StudentId, StudentValidationError};
use chrono::NaiveDateTime;
use rusqlite::types::Value;

/// Text layout used for date-time values; sorts lexicographically.
///
/// Matches the engine's `strftime('%Y-%m-%d %H:%M:%f')` stamp, so bound values
/// compare equal to defaulted ones. Sub-millisecond precision is truncated.
pub const DATETIME_FORMAT: &str = "%F %T%.3f";

/// A typed cell value read from or bound to the `students` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
    DateTime(NaiveDateTime),
    Null,
}

impl FieldValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(value) => Some(*value),
            _ => None,
        }
    }

    pub(crate) fn to_sql_value(&self) -> Value {
        match self {
            Self::Integer(value) => Value::Integer(*value),
            Self::Text(value) => Value::Text(value.clone()),
            Self::DateTime(value) => Value::Text(format_datetime(*value)),
            Self::Null => Value::Null,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

pub(crate) fn format_datetime(value: NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Ordered, optionally capped, projected read.
///
/// No tie-breaker is appended to `ORDER BY`; rows with equal sort keys come
/// back in whatever order the engine produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedQuery {
    /// Projected columns, in output order. Empty means every column.
    pub columns: Vec<Column>,
    pub order_by: Column,
    pub direction: SortDirection,
    pub limit: Option<u32>,
}

impl OrderedQuery {
    pub fn new(columns: &[Column], order_by: Column, direction: SortDirection) -> Self {
        Self {
            columns: columns.to_vec(),
            order_by,
            direction,
            limit: None,
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn projected_columns(&self) -> Vec<Column> {
        if self.columns.is_empty() {
            Column::ALL.to_vec()
        } else {
            self.columns.clone()
        }
    }

    pub(crate) fn to_sql(&self) -> (String, Vec<Value>) {
        let projection = self
            .projected_columns()
            .iter()
            .map(|column| column.as_sql())
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!(
            "SELECT {projection} FROM students ORDER BY {} {}",
            self.order_by.as_sql(),
            self.direction.as_sql()
        );
        let mut bind_values = Vec::new();
        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }
        (sql, bind_values)
    }
}

/// One row of an ordered query, holding only the projected columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedRow {
    pub values: Vec<(Column, FieldValue)>,
}

impl ProjectedRow {
    /// Returns the value of `column`, or `None` when it was not projected.
    pub fn get(&self, column: Column) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(candidate, _)| *candidate == column)
            .map(|(_, value)| value)
    }

    pub fn id(&self) -> Option<StudentId> {
        self.get(Column::Id).and_then(FieldValue::as_integer)
    }

    pub fn name(&self) -> Option<&str> {
        self.get(Column::Name).and_then(FieldValue::as_text)
    }

    pub fn grade(&self) -> Option<i64> {
        self.get(Column::Grade).and_then(FieldValue::as_integer)
    }

    pub fn birthday(&self) -> Option<NaiveDateTime> {
        self.get(Column::Birthday).and_then(FieldValue::as_datetime)
    }
}

/// Single column comparison used by filter, update and delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// SQL `LIKE` with `\` as the escape character.
    Like { column: Column, pattern: String },
    /// Equality; `FieldValue::Null` renders as `IS NULL`.
    Eq { column: Column, value: FieldValue },
}

impl Predicate {
    pub fn like(column: Column, pattern: impl Into<String>) -> Self {
        Self::Like {
            column,
            pattern: pattern.into(),
        }
    }

    pub fn eq(column: Column, value: impl Into<FieldValue>) -> Self {
        Self::Eq {
            column,
            value: value.into(),
        }
    }

    /// Substring match with `%`, `_` and `\` in `needle` taken literally.
    pub fn contains(column: Column, needle: &str) -> Self {
        Self::Like {
            column,
            pattern: format!("%{}%", escape_like(needle)),
        }
    }
}

/// Renders `predicates` into a `WHERE` clause (empty when there are none).
pub(crate) fn where_clause(predicates: &[Predicate]) -> (String, Vec<Value>) {
    if predicates.is_empty() {
        return (String::new(), Vec::new());
    }

    let mut terms = Vec::with_capacity(predicates.len());
    let mut bind_values = Vec::new();
    for predicate in predicates {
        match predicate {
            Predicate::Like { column, pattern } => {
                terms.push(format!("{} LIKE ? ESCAPE '\\'", column.as_sql()));
                bind_values.push(Value::Text(pattern.clone()));
            }
            Predicate::Eq {
                column,
                value: FieldValue::Null,
            } => terms.push(format!("{} IS NULL", column.as_sql())),
            Predicate::Eq { column, value } => {
                terms.push(format!("{} = ?", column.as_sql()));
                bind_values.push(value.to_sql_value());
            }
        }
    }

    (format!(" WHERE {}", terms.join(" AND ")), bind_values)
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Column update evaluated by the engine for every matching row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    SetGrade(i64),
    /// `grade = grade + delta`
    IncrementGrade(i64),
    SetName(String),
    SetEmail(String),
}

impl Assignment {
    /// Applies the name rule of `Student::validate` to a bulk assignment.
    ///
    /// Email length is left to the schema `CHECK` constraint.
    pub fn validate(&self) -> Result<(), StudentValidationError> {
        match self {
            Self::SetName(name) if name.trim().is_empty() => {
                Err(StudentValidationError::EmptyName)
            }
            _ => Ok(()),
        }
    }

    fn to_sql(&self) -> (String, Value) {
        match self {
            Self::SetGrade(grade) => ("grade = ?".to_string(), Value::Integer(*grade)),
            Self::IncrementGrade(delta) => {
                ("grade = grade + ?".to_string(), Value::Integer(*delta))
            }
            Self::SetName(name) => ("name = ?".to_string(), Value::Text(name.clone())),
            Self::SetEmail(email) => ("email = ?".to_string(), Value::Text(email.clone())),
        }
    }
}

/// Renders a full `UPDATE` statement, or `None` when there is nothing to set.
pub(crate) fn update_statement(
    assignments: &[Assignment],
    predicates: &[Predicate],
) -> Option<(String, Vec<Value>)> {
    if assignments.is_empty() {
        return None;
    }

    let mut bind_values = Vec::new();
    let set_clause = assignments
        .iter()
        .map(|assignment| {
            let (fragment, value) = assignment.to_sql();
            bind_values.push(value);
            fragment
        })
        .collect::<Vec<_>>()
        .join(", ");
    let (where_sql, where_values) = where_clause(predicates);
    bind_values.extend(where_values);

    Some((
        format!("UPDATE students SET {set_clause}{where_sql};"),
        bind_values,
    ))
}

#[cfg(test)]
mod tests {
    use super::{
        update_statement, where_clause, Assignment, FieldValue, OrderedQuery, Predicate,
        SortDirection,
    };
    use crate::model::student::{Column, StudentValidationError};
    use chrono::NaiveDate;
    use rusqlite::types::Value;

    #[test]
    fn contains_escapes_like_wildcards() {
        let predicate = Predicate::contains(Column::Name, "50%_off\\");
        assert_eq!(
            predicate,
            Predicate::Like {
                column: Column::Name,
                pattern: "%50\\%\\_off\\\\%".to_string(),
            }
        );
    }

    #[test]
    fn where_clause_joins_with_and() {
        let (sql, values) = where_clause(&[
            Predicate::like(Column::Name, "%Alan%"),
            Predicate::eq(Column::Grade, 11),
            Predicate::eq(Column::Email, FieldValue::Null),
        ]);
        assert_eq!(
            sql,
            " WHERE name LIKE ? ESCAPE '\\' AND grade = ? AND email IS NULL"
        );
        assert_eq!(
            values,
            vec![Value::Text("%Alan%".to_string()), Value::Integer(11)]
        );
    }

    #[test]
    fn empty_predicates_render_no_where_clause() {
        let (sql, values) = where_clause(&[]);
        assert!(sql.is_empty());
        assert!(values.is_empty());
    }

    #[test]
    fn ordered_query_has_no_tie_breaker() {
        let (sql, values) = OrderedQuery::new(
            &[Column::Name, Column::Grade],
            Column::Grade,
            SortDirection::Desc,
        )
        .limit(1)
        .to_sql();
        assert_eq!(
            sql,
            "SELECT name, grade FROM students ORDER BY grade DESC LIMIT ?"
        );
        assert_eq!(values, vec![Value::Integer(1)]);
    }

    #[test]
    fn update_binds_set_values_before_where_values() {
        let (sql, values) = update_statement(
            &[Assignment::IncrementGrade(1)],
            &[Predicate::eq(Column::Name, "Alan Turing")],
        )
        .expect("one assignment renders a statement");
        assert_eq!(sql, "UPDATE students SET grade = grade + ? WHERE name = ?;");
        assert_eq!(
            values,
            vec![Value::Integer(1), Value::Text("Alan Turing".to_string())]
        );
        assert!(update_statement(&[], &[]).is_none());
    }

    #[test]
    fn datetime_binding_always_carries_milliseconds() {
        let on_the_second = NaiveDate::from_ymd_opt(2026, 10, 18)
            .and_then(|date| date.and_hms_milli_opt(9, 30, 0, 0))
            .unwrap();
        assert_eq!(
            FieldValue::from(on_the_second).to_sql_value(),
            Value::Text("2026-10-18 09:30:00.000".to_string())
        );

        let with_millis = NaiveDate::from_ymd_opt(2026, 10, 18)
            .and_then(|date| date.and_hms_milli_opt(9, 30, 0, 250))
            .unwrap();
        assert_eq!(
            FieldValue::from(with_millis).to_sql_value(),
            Value::Text("2026-10-18 09:30:00.250".to_string())
        );
    }

    #[test]
    fn blank_name_assignment_is_rejected() {
        assert_eq!(
            Assignment::SetName("   ".to_string()).validate(),
            Err(StudentValidationError::EmptyName)
        );
        assert!(Assignment::SetName("Ada".to_string()).validate().is_ok());
        assert!(Assignment::IncrementGrade(1).validate().is_ok());
    }
}
