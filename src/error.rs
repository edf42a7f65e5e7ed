//! Error types for the report pipeline

use thiserror::Error;

/// Errors raised while turning a dataset into a document.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Empty dataset or a value the builder cannot interpret
    #[error("validation error: {0}")]
    Validation(String),

    /// Chart, image, document or scratch-file failure
    #[error("render error: {0}")]
    Render(String),
}

impl ReportError {
    pub fn render(context: &str, err: impl std::fmt::Display) -> Self {
        ReportError::Render(format!("{context}: {err}"))
    }
}

/// Errors raised while reading the enrollment export.
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("the file is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("the workbook has no worksheets")]
    NoWorksheet,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
