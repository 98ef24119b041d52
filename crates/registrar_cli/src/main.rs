//! Demo entry point replaying the student store workflow.
//!
//! # Responsibility
//! - Open a store (in-memory unless a target is given) and seed two students.
//! - Print ordering, limit, count, filter and bulk update results.

use chrono::{NaiveDate, NaiveDateTime};
use clap::Parser;
use log::{error, info};
use registrar_core::{
    default_log_level, init_logging, open_db, Column, ConnectionTarget, FieldValue, OrderedQuery,
    Predicate, ProjectedRow, SchemaRegistry, SortDirection, SqliteStudentRepository, Student,
    StudentService,
};
use std::error::Error;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "registrar")]
#[command(about = "Student record store demo", long_about = None)]
struct Cli {
    /// `:memory:`, `sqlite:///path` or a file path (default: in-memory)
    target: Option<ConnectionTarget>,

    /// Absolute directory for rolling log files; logging stays off when unset
    #[arg(long, env = "REGISTRAR_LOG_DIR")]
    log_dir: Option<String>,

    /// trace|debug|info|warn|error
    #[arg(long, env = "REGISTRAR_LOG_LEVEL")]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("registrar: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }

    let target = cli.target.unwrap_or(ConnectionTarget::Memory);
    info!("event=cli_run module=cli status=start target={target}");
    let conn = open_db(&target, &SchemaRegistry::students())?;
    let service = StudentService::new(SqliteStudentRepository::try_new(&conn)?);

    let albert_einstein = Student::new(
        "Albert Einstein",
        "albert.einstein@zurich.edu",
        6,
        midnight(1879, 3, 14)?,
    )?;
    let alan_turing = Student::new(
        "Alan Turing",
        "alan.turing@sherborne.edu",
        11,
        midnight(1912, 6, 23)?,
    )?;
    service.enroll(&[albert_einstein, alan_turing])?;

    println!("by grade: {}", render_rows(&service.roster_by_grade(None)?));
    let top_by_grade = OrderedQuery::new(
        &[Column::Name, Column::Birthday],
        Column::Grade,
        SortDirection::Desc,
    )
    .limit(1);
    println!(
        "top (limit 1): {}",
        render_rows(&service.query(&top_by_grade)?)
    );
    match service.top_of_class()? {
        Some(row) => println!("top of class: {}", render_row(&row)),
        None => println!("top of class: none"),
    }
    println!("count: {}", service.headcount()?);

    let alans = service.search(&[
        Predicate::contains(Column::Name, "Alan"),
        Predicate::eq(Column::Grade, 11),
    ])?;
    for student in &alans {
        println!("match: {}", student.name);
    }

    service.promote_all()?;
    for student in service.list_all()? {
        println!("after promotion: {student}");
    }

    info!("event=cli_run module=cli status=ok target={target}");
    Ok(())
}

fn midnight(year: i32, month: u32, day: u32) -> Result<NaiveDateTime, String> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("invalid date {year}-{month}-{day}"))
}

fn render_rows(rows: &[ProjectedRow]) -> String {
    let rendered = rows.iter().map(render_row).collect::<Vec<_>>();
    format!("[{}]", rendered.join(", "))
}

fn render_row(row: &ProjectedRow) -> String {
    let fields = row
        .values
        .iter()
        .map(|(_, value)| match value {
            FieldValue::Integer(value) => value.to_string(),
            FieldValue::Text(value) => format!("'{value}'"),
            FieldValue::DateTime(value) => value.to_string(),
            FieldValue::Null => "NULL".to_string(),
        })
        .collect::<Vec<_>>();
    format!("({})", fields.join(", "))
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;
    use registrar_core::ConnectionTarget;
    use std::path::PathBuf;

    #[test]
    fn target_is_optional_and_parsed_positionally() {
        let cli = Cli::try_parse_from(["registrar"]).unwrap();
        assert_eq!(cli.target, None);

        let cli = Cli::try_parse_from(["registrar", "sqlite:///tmp/school.db"]).unwrap();
        assert_eq!(
            cli.target,
            Some(ConnectionTarget::File(PathBuf::from("/tmp/school.db")))
        );

        let cli = Cli::try_parse_from(["registrar", ":memory:"]).unwrap();
        assert_eq!(cli.target, Some(ConnectionTarget::Memory));
    }

    #[test]
    fn logging_flags_are_accepted() {
        let cli = Cli::try_parse_from([
            "registrar",
            "--log-dir",
            "/var/log/registrar",
            "--log-level",
            "warn",
        ])
        .unwrap();
        assert_eq!(cli.log_dir.as_deref(), Some("/var/log/registrar"));
        assert_eq!(cli.log_level.as_deref(), Some("warn"));
    }

    #[test]
    fn unparseable_target_is_rejected() {
        assert!(Cli::try_parse_from(["registrar", "   "]).is_err());
    }
}
