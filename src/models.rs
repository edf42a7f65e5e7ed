use chrono::NaiveDateTime;
use serde::Serialize;

/// Author printed on the report when the caller does not supply one.
pub const DEFAULT_AUTHOR: &str = "Oscar Ivan Vargas Pineda";

/// Suggested download name for the finished document.
pub const REPORT_FILE_NAME: &str = "reporte_inscritos.pdf";

pub const REPORT_MIME_TYPE: &str = "application/pdf";

/// Registration time as it arrives from the intake side.
#[derive(Debug, Clone, PartialEq)]
pub enum StartTime {
    Parsed(NaiveDateTime),
    Text(String),
}

impl From<NaiveDateTime> for StartTime {
    fn from(value: NaiveDateTime) -> Self {
        StartTime::Parsed(value)
    }
}

impl From<&str> for StartTime {
    fn from(value: &str) -> Self {
        StartTime::Text(value.to_string())
    }
}

impl From<String> for StartTime {
    fn from(value: String) -> Self {
        StartTime::Text(value)
    }
}

#[derive(Debug, Clone)]
pub struct EnrollmentRecord {
    pub full_name: String,
    pub contact_email: String,
    pub course_name: String,
    pub start_time: StartTime,
}

/// One registration within a course, unique by name and email.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Attendee {
    pub full_name: String,
    pub contact_email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseSummary {
    pub course_name: String,
    pub enrollee_count: usize,
    pub attendees: Vec<Attendee>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentSummary {
    pub total_unique_enrollees: usize,
    pub first_registration: NaiveDateTime,
    pub last_registration: NaiveDateTime,
    pub courses: Vec<CourseSummary>,
}

impl EnrollmentSummary {
    pub fn total_courses(&self) -> usize {
        self.courses.len()
    }

    pub fn span_days(&self) -> i64 {
        (self.last_registration - self.first_registration).num_days()
    }
}

#[derive(Debug, Clone)]
pub struct ReportMetadata {
    pub total_unique_enrollees: usize,
    pub first_registration: NaiveDateTime,
    pub last_registration: NaiveDateTime,
    pub author: String,
    pub generated_at: NaiveDateTime,
}

impl ReportMetadata {
    pub fn new(summary: &EnrollmentSummary, author: &str, generated_at: NaiveDateTime) -> Self {
        Self {
            total_unique_enrollees: summary.total_unique_enrollees,
            first_registration: summary.first_registration,
            last_registration: summary.last_registration,
            author: author.to_string(),
            generated_at,
        }
    }
}
