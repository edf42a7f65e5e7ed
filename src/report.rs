use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info};

use crate::aggregate;
use crate::chart::{BarChart, ChartStyle};
use crate::error::ReportError;
use crate::markup::{self, Block, PageSize, Role, Span, StyleSheet};
use crate::models::{EnrollmentRecord, EnrollmentSummary, ReportMetadata};
use crate::pdf::{self, DocumentInfo};
use crate::timestamp;

pub const REPORT_TITLE: &str = "COURSE ENROLLMENT REPORT";
const SECTION_SPACING: f32 = 18.0;
const CHART_KEY: &str = "chart";
// Chart box proportion on the page: 7 in wide by 4.5 in tall.
const CHART_ASPECT: f32 = 4.5 / 7.0;

/// Everything visual about a report, passed in per call.
#[derive(Debug, Clone, Default)]
pub struct ReportStyle {
    pub chart: ChartStyle,
    pub sheet: StyleSheet,
    pub page: PageSize,
}

fn value_line(label: &str, value: String) -> Block {
    Block::Paragraph {
        spans: vec![Span::plain(format!("{label}: ")), Span::bold(value)],
        role: Role::Normal,
    }
}

/// The report body in reading order.
pub fn document_blocks(
    summary: &EnrollmentSummary,
    metadata: &ReportMetadata,
    page: &PageSize,
) -> Vec<Block> {
    let frame = page.frame_width_mm();
    let mut blocks = vec![
        Block::paragraph(REPORT_TITLE, Role::Title),
        Block::paragraph(
            format!("Generated on: {}", metadata.generated_at.format("%d/%m/%Y")),
            Role::Muted,
        ),
        Block::paragraph(format!("Prepared by: {}", metadata.author), Role::Muted),
        Block::Spacer(SECTION_SPACING),
        Block::paragraph("General Information", Role::Subtitle),
        value_line(
            "Total unique enrollees",
            metadata.total_unique_enrollees.to_string(),
        ),
        value_line(
            "First registration",
            timestamp::format_display(&metadata.first_registration),
        ),
        value_line(
            "Last registration",
            timestamp::format_display(&metadata.last_registration),
        ),
        Block::Spacer(SECTION_SPACING),
        Block::paragraph("Enrollment Distribution by Course", Role::Subtitle),
        Block::Image {
            key: CHART_KEY.to_string(),
            width_mm: frame,
            height_mm: frame * CHART_ASPECT,
        },
        Block::Spacer(SECTION_SPACING),
        Block::paragraph("Enrollee Details by Course", Role::Subtitle),
    ];

    for course in &summary.courses {
        blocks.push(Block::paragraph(
            format!(
                "Course: {} ({} enrollees)",
                course.course_name, course.enrollee_count
            ),
            Role::Normal,
        ));
        blocks.push(Block::Table {
            header: vec!["Full Name".to_string(), "Contact Email".to_string()],
            rows: course
                .attendees
                .iter()
                .map(|a| vec![a.full_name.clone(), a.contact_email.clone()])
                .collect(),
        });
        blocks.push(Block::Spacer(SECTION_SPACING));
    }

    blocks
}

/// A report ready for layout: its markup and the chart it references.
#[derive(Debug)]
pub struct ComposedReport {
    pub metadata: ReportMetadata,
    pub blocks: Vec<Block>,
    pub html: String,
    pub chart_png: Vec<u8>,
}

/// Aggregate, chart and mark up a dataset without producing the PDF.
///
/// Chart artifacts are written under `scratch`, which the caller owns.
pub fn compose_report(
    records: &[EnrollmentRecord],
    author: &str,
    style: &ReportStyle,
    generated_at: NaiveDateTime,
    scratch: &Path,
) -> Result<ComposedReport, ReportError> {
    let summary = aggregate::summarize(records)?;
    let metadata = ReportMetadata::new(&summary, author, generated_at);
    info!(
        "{} records across {} courses, {} unique enrollees",
        records.len(),
        summary.total_courses(),
        summary.total_unique_enrollees
    );

    let chart_path = scratch.join("chart.png");
    BarChart::from_courses(&summary.courses).write_png(&style.chart, &chart_path)?;
    let chart_png = fs::read(&chart_path)
        .map_err(|e| ReportError::render("failed to read chart image", e))?;

    let blocks = document_blocks(&summary, &metadata, &style.page);
    let html = markup::to_html(REPORT_TITLE, &blocks, &style.sheet, &style.page);
    debug!("report markup is {} bytes", html.len());

    Ok(ComposedReport {
        metadata,
        blocks,
        html,
        chart_png,
    })
}

/// Build the finished PDF for `records`.
///
/// All intermediate files live in a per-call temporary directory that is
/// removed before this returns, whether it succeeds or fails.
pub fn build_report(
    records: &[EnrollmentRecord],
    author: &str,
    style: &ReportStyle,
) -> Result<Vec<u8>, ReportError> {
    if records.is_empty() {
        return Err(ReportError::Validation(
            "dataset has no records; nothing to report".to_string(),
        ));
    }

    let scratch = tempfile::Builder::new()
        .prefix("enrollment-report-")
        .tempdir()
        .map_err(|e| ReportError::render("failed to create scratch directory", e))?;

    let generated_at = Local::now().naive_local();
    let composed = compose_report(records, author, style, generated_at, scratch.path())?;

    let images = BTreeMap::from([(CHART_KEY.to_string(), composed.chart_png)]);
    let bytes = pdf::render(
        &composed.html,
        images,
        &style.page,
        &DocumentInfo {
            title: REPORT_TITLE.to_string(),
            author: composed.metadata.author.clone(),
        },
    )?;

    scratch
        .close()
        .map_err(|e| ReportError::render("failed to remove scratch directory", e))?;

    info!("report built: {} bytes", bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::{record, scenario};
    use crate::models::{StartTime, DEFAULT_AUTHOR};
    use chrono::NaiveDate;
    use std::sync::Mutex;

    // Tests that inspect the temp directory must not overlap.
    static SCRATCH_LOCK: Mutex<()> = Mutex::new(());

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, day)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    fn compose_lines(records: &[EnrollmentRecord], generated_at: NaiveDateTime) -> Vec<String> {
        let dir = tempfile::tempdir().unwrap();
        let composed = compose_report(
            records,
            DEFAULT_AUTHOR,
            &ReportStyle::default(),
            generated_at,
            dir.path(),
        )
        .unwrap();
        markup::text_lines(&composed.blocks)
    }

    fn fifty_courses() -> Vec<EnrollmentRecord> {
        let mut records = Vec::new();
        for course in 0..50 {
            for person in 0..(course % 5 + 1) {
                records.push(record(
                    &format!("Student {course:02}-{person}"),
                    &format!("s{course}.{person}@example.com"),
                    &format!("Workshop {course:02}"),
                    "2025-03-10 14:00",
                ));
            }
        }
        records
    }

    #[test]
    fn scenario_document_lists_both_courses() {
        let lines = compose_lines(&scenario(), at(1));
        assert_eq!(lines[0], REPORT_TITLE);
        assert_eq!(lines[1], "Generated on: 01/05/2025");
        assert_eq!(lines[2], format!("Prepared by: {DEFAULT_AUTHOR}"));
        assert!(lines.contains(&"Total unique enrollees: 2".to_string()));
        assert!(lines.contains(&"First registration: 01/04/2025 09:00".to_string()));
        assert!(lines.contains(&"Last registration: 03/04/2025 16:45".to_string()));

        let x = lines
            .iter()
            .position(|l| l == "Course: Course X (1 enrollees)")
            .unwrap();
        let y = lines
            .iter()
            .position(|l| l == "Course: Course Y (1 enrollees)")
            .unwrap();
        assert!(x < y);
        assert_eq!(lines[x + 1], "Full Name Contact Email");
        assert_eq!(lines[x + 2], "Avery Lee avery@example.com");
        assert_eq!(lines[y + 2], "Jules Moreno jules@example.com");
        assert_eq!(
            lines.iter().filter(|l| l.starts_with("Avery Lee")).count(),
            1
        );
    }

    #[test]
    fn courses_appear_in_non_increasing_order() {
        let lines = compose_lines(&fifty_courses(), at(1));
        let counts: Vec<usize> = lines
            .iter()
            .filter_map(|l| l.strip_prefix("Course: "))
            .filter_map(|l| l.rsplit_once(" (")?.1.strip_suffix(" enrollees)")?.parse().ok())
            .collect();
        assert_eq!(counts.len(), 50);
        assert!(counts.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn fifty_courses_render_every_section_and_row() {
        let records = fifty_courses();
        let lines = compose_lines(&records, at(1));
        for course in 0..50 {
            let heading = format!("Course: Workshop {course:02} ({} enrollees)", course % 5 + 1);
            assert!(lines.contains(&heading), "missing {heading}");
        }
        for r in &records {
            let row = format!("{} {}", r.full_name, r.contact_email);
            assert!(lines.contains(&row), "missing row {row}");
        }
    }

    #[test]
    fn composition_is_repeatable_apart_from_the_date() {
        let first = compose_lines(&fifty_courses(), at(1));
        let again = compose_lines(&fifty_courses(), at(1));
        let later = compose_lines(&fifty_courses(), at(20));
        assert_eq!(first, again);

        let differing: Vec<_> = first
            .iter()
            .zip(&later)
            .filter(|(a, b)| a != b)
            .map(|(a, _)| a.as_str())
            .collect();
        assert_eq!(differing, vec!["Generated on: 01/05/2025"]);
    }

    #[test]
    fn builds_pdf_and_cleans_up_scratch() {
        let _guard = SCRATCH_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = scratch_dirs();
        let bytes = build_report(&scenario(), "Test Author", &ReportStyle::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(page_count(&bytes) >= 1);
        assert_eq!(scratch_dirs(), before);
    }

    #[test]
    fn failures_leave_no_scratch_behind() {
        let _guard = SCRATCH_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = scratch_dirs();

        let mut records = scenario();
        records[2].start_time = StartTime::from("31/31/2025 25:99");
        let err = build_report(&records, DEFAULT_AUTHOR, &ReportStyle::default()).unwrap_err();
        assert!(matches!(err, ReportError::Validation(_)));

        let err = build_report(&[], DEFAULT_AUTHOR, &ReportStyle::default()).unwrap_err();
        assert!(matches!(err, ReportError::Validation(_)));

        assert_eq!(scratch_dirs(), before);
    }

    #[test]
    fn chart_failure_is_a_render_error_and_leaves_no_scratch() {
        let _guard = SCRATCH_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = scratch_dirs();

        let mut style = ReportStyle::default();
        style.chart.dpi = 0.0;
        match build_report(&scenario(), DEFAULT_AUTHOR, &style) {
            Err(ReportError::Render(msg)) => {
                assert_eq!(msg, "cannot allocate a 0x0 chart canvas");
            }
            other => panic!("expected a render error, got {other:?}"),
        }

        assert_eq!(scratch_dirs(), before);
    }

    #[test]
    fn oversized_roster_row_continues_on_later_pages() {
        let _guard = SCRATCH_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let style = ReportStyle::default();
        let baseline = build_report(&scenario(), DEFAULT_AUTHOR, &style).unwrap();

        let long_name = "word ".repeat(3000).trim_end().to_string();
        let mut records = scenario();
        records[0].full_name = long_name.clone();
        records[1].full_name = long_name.clone();

        let dir = tempfile::tempdir().unwrap();
        let composed =
            compose_report(&records, DEFAULT_AUTHOR, &style, at(1), dir.path()).unwrap();
        assert!(composed.html.contains(&format!(">{long_name}</td>")));

        let bytes = build_report(&records, DEFAULT_AUTHOR, &style).unwrap();
        assert!(page_count(&bytes) > page_count(&baseline));
    }

    #[test]
    fn report_markup_references_the_chart_and_styles_headers() {
        let dir = tempfile::tempdir().unwrap();
        let composed = compose_report(
            &scenario(),
            "R&D Office",
            &ReportStyle::default(),
            at(1),
            dir.path(),
        )
        .unwrap();
        assert!(composed.chart_png.starts_with(b"\x89PNG"));
        assert!(composed.html.contains(r#"<img src="chart""#));
        assert!(composed.html.contains("Prepared by: R&amp;D Office"));
        assert_eq!(composed.html.matches(">Full Name</th>").count(), 2);
    }

    fn page_count(bytes: &[u8]) -> usize {
        lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
    }

    fn scratch_dirs() -> Vec<std::path::PathBuf> {
        let mut dirs: Vec<_> = fs::read_dir(std::env::temp_dir())
            .unwrap()
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("enrollment-report-"))
            })
            .collect();
        dirs.sort();
        dirs
    }
}
