use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDateTime;

use crate::error::ReportError;
use crate::models::{Attendee, CourseSummary, EnrollmentRecord, EnrollmentSummary};
use crate::timestamp;

/// Distinct full names across the whole dataset.
///
/// Two people sharing a name count once here even though course rosters
/// keep them apart by email.
pub fn total_unique_enrollees(records: &[EnrollmentRecord]) -> usize {
    records
        .iter()
        .map(|record| record.full_name.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Earliest and latest start time. Slash dates in the column share one
/// day order.
pub fn registration_range(
    records: &[EnrollmentRecord],
) -> Result<(NaiveDateTime, NaiveDateTime), ReportError> {
    let start_times: Vec<_> = records.iter().map(|record| &record.start_time).collect();
    let resolved = timestamp::resolve_column(&start_times)?;

    let first = resolved.iter().min().copied();
    let last = resolved.iter().max().copied();
    first
        .zip(last)
        .ok_or_else(|| ReportError::Validation("dataset has no records".to_string()))
}

/// Group records by course, deduplicate by (name, email) and order the
/// courses by descending enrollee count. Ties keep first appearance.
pub fn summarize_by_course(records: &[EnrollmentRecord]) -> Vec<CourseSummary> {
    let mut order: Vec<&str> = Vec::new();
    let mut map: HashMap<&str, BTreeSet<Attendee>> = HashMap::new();

    for record in records {
        let course = record.course_name.as_str();
        let entry = map.entry(course).or_insert_with(|| {
            order.push(course);
            BTreeSet::new()
        });
        entry.insert(Attendee {
            full_name: record.full_name.clone(),
            contact_email: record.contact_email.clone(),
        });
    }

    let mut summaries: Vec<CourseSummary> = order
        .into_iter()
        .filter_map(|course| {
            map.remove(course).map(|attendees| CourseSummary {
                course_name: course.to_string(),
                enrollee_count: attendees.len(),
                attendees: attendees.into_iter().collect(),
            })
        })
        .collect();

    summaries.sort_by(|a, b| b.enrollee_count.cmp(&a.enrollee_count));
    summaries
}

pub fn summarize(records: &[EnrollmentRecord]) -> Result<EnrollmentSummary, ReportError> {
    if records.is_empty() {
        return Err(ReportError::Validation(
            "dataset has no records; nothing to report".to_string(),
        ));
    }

    let (first_registration, last_registration) = registration_range(records)?;

    Ok(EnrollmentSummary {
        total_unique_enrollees: total_unique_enrollees(records),
        first_registration,
        last_registration,
        courses: summarize_by_course(records),
    })
}
