use chrono::{NaiveDate, NaiveDateTime};
use registrar_core::{Student, StudentValidationError, EMAIL_MAX_CHARS};

fn date(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

#[test]
fn student_new_is_unpersisted() {
    let student = Student::new("Albert Einstein", "albert@zurich.edu", 6, date(1879, 3, 14)).unwrap();

    assert_eq!(student.id, None);
    assert!(!student.is_persisted());
    assert_eq!(student.enrolled_date, None);
    assert_eq!(student.grade, 6);
}

#[test]
fn student_new_rejects_overlong_email() {
    let email = format!("{}@x.io", "a".repeat(EMAIL_MAX_CHARS));
    let err = Student::new("Alan Turing", email.clone(), 11, date(1912, 6, 23)).unwrap_err();

    assert_eq!(
        err,
        StudentValidationError::EmailTooLong {
            len: email.chars().count(),
            max: EMAIL_MAX_CHARS,
        }
    );
}

#[test]
fn display_matches_roster_format() {
    let mut student = Student::new("Alan Turing", "alan@sherborne.edu", 11, date(1912, 6, 23)).unwrap();
    assert_eq!(student.to_string(), "Student ?: Alan Turing, Grade 11");

    student.id = Some(2);
    assert_eq!(student.to_string(), "Student 2: Alan Turing, Grade 11");
}

#[test]
fn student_serialization_uses_expected_wire_fields() {
    let student = Student::new("Alan Turing", "alan@sherborne.edu", 11, date(1912, 6, 23))
        .unwrap()
        .enrolled_on(date(1926, 9, 1));

    let json = serde_json::to_value(&student).unwrap();
    assert_eq!(json["id"], serde_json::Value::Null);
    assert_eq!(json["name"], "Alan Turing");
    assert_eq!(json["email"], "alan@sherborne.edu");
    assert_eq!(json["grade"], 11);
    assert_eq!(json["birthday"], "1912-06-23T00:00:00");
    assert_eq!(json["enrolled_date"], "1926-09-01T00:00:00");

    let decoded: Student = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, student);
}

#[test]
fn deserialize_rejects_overlong_email() {
    let value = serde_json::json!({
        "id": 7,
        "name": "Long Mail",
        "email": "x".repeat(EMAIL_MAX_CHARS + 1),
        "grade": 3,
        "birthday": "2010-01-01T00:00:00",
        "enrolled_date": null
    });

    let err = serde_json::from_value::<Student>(value).unwrap_err();
    assert!(
        err.to_string().contains("at most 55 allowed"),
        "unexpected error: {err}"
    );
}
