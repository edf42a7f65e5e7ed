use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

use crate::error::ReportError;
use crate::models::StartTime;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

pub const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M";

/// How `NN/NN/YYYY` text dates are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayOrder {
    #[default]
    DayFirst,
    MonthFirst,
}

impl DayOrder {
    fn datetime_formats(self) -> [&'static str; 2] {
        match self {
            DayOrder::DayFirst => ["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"],
            DayOrder::MonthFirst => ["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M"],
        }
    }

    fn date_format(self) -> &'static str {
        match self {
            DayOrder::DayFirst => "%d/%m/%Y",
            DayOrder::MonthFirst => "%m/%d/%Y",
        }
    }
}

/// Leading `(a, b)` of an `a/b/yyyy` value.
fn slash_parts(raw: &str) -> Option<(u32, u32)> {
    let date = raw.split_whitespace().next()?;
    let mut parts = date.split('/');
    let a = parts.next()?.parse().ok()?;
    let b = parts.next()?.parse().ok()?;
    let year = parts.next()?;
    if year.len() != 4 || parts.next().is_some() {
        return None;
    }
    Some((a, b))
}

/// Pick one reading for every slash date in a column.
///
/// A first field above 12 means day-first and a second field above 12
/// means month-first; the first such value decides. Without any, the
/// column is read day-first.
pub fn infer_day_order<'a>(values: impl IntoIterator<Item = &'a str>) -> DayOrder {
    for (a, b) in values.into_iter().filter_map(slash_parts) {
        if a > 12 && b <= 12 {
            return DayOrder::DayFirst;
        }
        if b > 12 && a <= 12 {
            return DayOrder::MonthFirst;
        }
    }
    DayOrder::default()
}

/// Parse a free-form registration time.
pub fn parse_timestamp(raw: &str, order: DayOrder) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    for format in DATETIME_FORMATS.iter().chain(order.datetime_formats().iter()) {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    for format in DATE_FORMATS.iter().chain([order.date_format()].iter()) {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Spreadsheet serial date: fractional days since 1899-12-30.
///
/// Only typed numeric cells go through here. Text is never read as a serial.
pub fn from_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::seconds(seconds))
}

/// Coerce a record's start time, reporting the 1-based row on failure.
pub fn resolve(
    start_time: &StartTime,
    row: usize,
    order: DayOrder,
) -> Result<NaiveDateTime, ReportError> {
    match start_time {
        StartTime::Parsed(dt) => Ok(*dt),
        StartTime::Text(raw) => parse_timestamp(raw, order).ok_or_else(|| {
            ReportError::Validation(format!(
                "row {row}: cannot parse start time {raw:?} as a date/time"
            ))
        }),
    }
}

/// Resolve a whole column with one day order inferred from its text values.
pub fn resolve_column(start_times: &[&StartTime]) -> Result<Vec<NaiveDateTime>, ReportError> {
    let order = infer_day_order(start_times.iter().filter_map(|start| match start {
        StartTime::Text(raw) => Some(raw.as_str()),
        StartTime::Parsed(_) => None,
    }));
    start_times
        .iter()
        .enumerate()
        .map(|(index, start)| resolve(start, index + 1, order))
        .collect()
}

pub fn format_display(dt: &NaiveDateTime) -> String {
    dt.format(DISPLAY_FORMAT).to_string()
}
