use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

use crate::error::IntakeError;
use crate::models::{EnrollmentRecord, StartTime};
use crate::timestamp;

/// Canonical header followed by accepted alternatives, per required field.
pub const REQUIRED_COLUMNS: [&[&str]; 4] = [
    &["Nombre y apellidos completos", "full_name"],
    &["Correo de contacto", "contact_email"],
    &["Curso de interés", "course_name"],
    &["Hora de inicio", "start_time"],
];

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

fn normalize_header(header: &str) -> &str {
    header.trim_start_matches('\u{feff}').trim()
}

/// Map each required field to its column index, or list what is missing.
pub fn locate_columns<'a>(
    headers: impl IntoIterator<Item = &'a str>,
) -> Result<[usize; 4], IntakeError> {
    let headers: Vec<&str> = headers.into_iter().map(normalize_header).collect();
    let mut found = [0usize; 4];
    let mut missing = Vec::new();

    for (slot, names) in REQUIRED_COLUMNS.iter().enumerate() {
        let position = headers
            .iter()
            .position(|header| names.iter().any(|name| name == header));
        match position {
            Some(index) => found[slot] = index,
            None => missing.push(names[0].to_string()),
        }
    }

    if missing.is_empty() {
        Ok(found)
    } else {
        Err(IntakeError::MissingColumns(missing))
    }
}

pub fn read_records<R: Read>(reader: R) -> Result<Vec<EnrollmentRecord>, IntakeError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();
    let [name, email, course, start] = locate_columns(headers.iter())?;

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        let cell = |index: usize| row.get(index).unwrap_or("").to_string();
        records.push(EnrollmentRecord {
            full_name: cell(name),
            contact_email: cell(email),
            course_name: cell(course),
            start_time: StartTime::Text(cell(start)),
        });
    }

    debug!("read {} enrollment rows", records.len());
    Ok(records)
}

pub fn read_csv(path: &Path) -> Result<Vec<EnrollmentRecord>, IntakeError> {
    let file = std::fs::File::open(path)?;
    read_records(file)
}

fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Typed date and number cells become parsed times; text is left for
/// the report builder to coerce.
fn cell_start_time(cell: Option<&Data>) -> StartTime {
    let parsed = match cell {
        Some(Data::DateTime(value)) => value.as_datetime(),
        Some(Data::Float(serial)) => timestamp::from_serial(*serial),
        Some(Data::Int(serial)) => timestamp::from_serial(*serial as f64),
        _ => None,
    };
    match parsed {
        Some(at) => StartTime::Parsed(at),
        None => StartTime::Text(cell_text(cell)),
    }
}

/// Read the first worksheet of a spreadsheet workbook.
pub fn read_spreadsheet(path: &Path) -> Result<Vec<EnrollmentRecord>, IntakeError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(IntakeError::NoWorksheet)??;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(|cell| cell_text(Some(cell))).collect())
        .unwrap_or_default();
    let [name, email, course, start] = locate_columns(headers.iter().map(String::as_str))?;

    let records: Vec<EnrollmentRecord> = rows
        .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|row| EnrollmentRecord {
            full_name: cell_text(row.get(name)),
            contact_email: cell_text(row.get(email)),
            course_name: cell_text(row.get(course)),
            start_time: cell_start_time(row.get(start)),
        })
        .collect();

    debug!("read {} enrollment rows from workbook", records.len());
    Ok(records)
}

/// Read `path` as a workbook or as CSV, by extension.
pub fn read_path(path: &Path) -> Result<Vec<EnrollmentRecord>, IntakeError> {
    let is_spreadsheet = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        });
    if is_spreadsheet {
        read_spreadsheet(path)
    } else {
        read_csv(path)
    }
}
