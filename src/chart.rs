//! Bar chart of enrollees per course.
//!
//! The chart is described as SVG in point units (72 per inch) and
//! rasterized with resvg at the style's DPI. The PNG is written to the
//! caller's scratch directory and embedded from there.

use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;

use resvg::tiny_skia;
use resvg::usvg::{self, fontdb};
use tracing::debug;

use crate::error::ReportError;
use crate::models::CourseSummary;

const POINTS_PER_INCH: f32 = 72.0;

/// Per-call chart configuration.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub width_in: f32,
    pub height_in: f32,
    pub dpi: f32,
    pub bar_color: String,
    pub font_family: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub title_font_size: f32,
    pub axis_font_size: f32,
    pub tick_font_size: f32,
    pub label_rotation: f32,
    pub max_label_chars: usize,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width_in: 12.0,
            height_in: 8.0,
            dpi: 150.0,
            bar_color: "#4682B4".to_string(),
            font_family: "Helvetica, Arial, 'DejaVu Sans', 'Liberation Sans', sans-serif"
                .to_string(),
            title: "Enrollments per course".to_string(),
            x_label: "Course".to_string(),
            y_label: "Enrollees".to_string(),
            title_font_size: 14.0,
            axis_font_size: 12.0,
            tick_font_size: 10.0,
            label_rotation: -45.0,
            max_label_chars: 40,
        }
    }
}

impl ChartStyle {
    fn canvas(&self) -> (f32, f32) {
        (
            self.width_in * POINTS_PER_INCH,
            self.height_in * POINTS_PER_INCH,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub bars: Vec<Bar>,
}

impl BarChart {
    pub fn from_courses(courses: &[CourseSummary]) -> Self {
        Self {
            bars: courses
                .iter()
                .map(|course| Bar {
                    label: course.course_name.clone(),
                    value: course.enrollee_count,
                })
                .collect(),
        }
    }

    fn max_value(&self) -> usize {
        self.bars.iter().map(|bar| bar.value).max().unwrap_or(0)
    }

    pub fn to_svg(&self, style: &ChartStyle) -> String {
        let (width, height) = style.canvas();
        let (step, y_max) = axis_scale(self.max_value());

        let longest = self
            .bars
            .iter()
            .map(|bar| bar.label.chars().count().min(style.max_label_chars))
            .max()
            .unwrap_or(0) as f32;
        let label_extent = longest * style.tick_font_size * 0.55 * 0.72;
        let bottom = (label_extent + style.tick_font_size + style.axis_font_size + 30.0)
            .clamp(60.0, height * 0.45);

        let left = 70.0;
        let right = 20.0;
        let top = style.title_font_size + 40.0;
        let plot_w = width - left - right;
        let plot_h = height - top - bottom;
        let base_y = top + plot_h;

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="{}">"#,
            escape_xml(&style.font_family)
        );
        let _ = writeln!(
            svg,
            r##"<rect x="0" y="0" width="{width}" height="{height}" fill="#ffffff"/>"##
        );

        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" font-size="{}" font-weight="bold" text-anchor="middle">{}</text>"#,
            width / 2.0,
            style.title_font_size + 14.0,
            style.title_font_size,
            escape_xml(&style.title)
        );

        let mut tick = 0;
        while tick <= y_max {
            let y = base_y - plot_h * tick as f32 / y_max as f32;
            let _ = writeln!(
                svg,
                r##"<line x1="{left}" y1="{y:.2}" x2="{}" y2="{y:.2}" stroke="#e0e0e0" stroke-width="0.5"/>"##,
                left + plot_w
            );
            let _ = writeln!(
                svg,
                r#"<text x="{}" y="{:.2}" font-size="{}" text-anchor="end">{tick}</text>"#,
                left - 6.0,
                y + style.tick_font_size * 0.35,
                style.tick_font_size
            );
            tick += step;
        }

        let slot = if self.bars.is_empty() {
            plot_w
        } else {
            plot_w / self.bars.len() as f32
        };
        let bar_w = slot * 0.8;
        let value_font = style.tick_font_size.min(slot * 0.9).max(4.0);

        for (index, bar) in self.bars.iter().enumerate() {
            let x = left + slot * index as f32 + (slot - bar_w) / 2.0;
            let center = left + slot * index as f32 + slot / 2.0;
            let bar_h = plot_h * bar.value as f32 / y_max as f32;
            let _ = writeln!(
                svg,
                r#"<rect class="bar" x="{x:.2}" y="{:.2}" width="{bar_w:.2}" height="{bar_h:.2}" fill="{}"/>"#,
                base_y - bar_h,
                escape_xml(&style.bar_color)
            );
            let _ = writeln!(
                svg,
                r#"<text class="value" x="{center:.2}" y="{:.2}" font-size="{value_font:.1}" font-weight="bold" text-anchor="middle">{}</text>"#,
                base_y - bar_h - 3.0,
                bar.value
            );
            let _ = writeln!(
                svg,
                r#"<text class="category" font-size="{}" text-anchor="end" transform="translate({center:.2} {:.2}) rotate({})">{}</text>"#,
                style.tick_font_size,
                base_y + style.tick_font_size,
                style.label_rotation,
                escape_xml(&shorten(&bar.label, style.max_label_chars))
            );
        }

        let _ = writeln!(
            svg,
            r##"<line x1="{left}" y1="{base_y}" x2="{}" y2="{base_y}" stroke="#000000" stroke-width="1"/>"##,
            left + plot_w
        );
        let _ = writeln!(
            svg,
            r##"<line x1="{left}" y1="{top}" x2="{left}" y2="{base_y}" stroke="#000000" stroke-width="1"/>"##
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" font-size="{}" text-anchor="middle">{}</text>"#,
            left + plot_w / 2.0,
            height - 10.0,
            style.axis_font_size,
            escape_xml(&style.x_label)
        );
        let _ = writeln!(
            svg,
            r#"<text font-size="{}" text-anchor="middle" transform="translate(20 {}) rotate(-90)">{}</text>"#,
            style.axis_font_size,
            top + plot_h / 2.0,
            escape_xml(&style.y_label)
        );
        svg.push_str("</svg>\n");
        svg
    }

    pub fn rasterize(&self, style: &ChartStyle) -> Result<tiny_skia::Pixmap, ReportError> {
        let svg = self.to_svg(style);

        let mut fonts = fontdb::Database::new();
        fonts.load_system_fonts();
        debug!("loaded {} font faces for chart text", fonts.len());

        let mut options = usvg::Options::default();
        options.fontdb = Arc::new(fonts);

        let tree = usvg::Tree::from_str(&svg, &options)
            .map_err(|e| ReportError::render("failed to parse chart SVG", e))?;

        let scale = style.dpi / POINTS_PER_INCH;
        let size = tree.size();
        let width = (size.width() * scale).round() as u32;
        let height = (size.height() * scale).round() as u32;
        let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
            ReportError::Render(format!("cannot allocate a {width}x{height} chart canvas"))
        })?;
        pixmap.fill(tiny_skia::Color::WHITE);
        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(scale, scale),
            &mut pixmap.as_mut(),
        );
        Ok(pixmap)
    }

    /// Rasterize and write the chart as PNG to `path`.
    pub fn write_png(&self, style: &ChartStyle, path: &Path) -> Result<(), ReportError> {
        let pixmap = self.rasterize(style)?;
        pixmap
            .save_png(path)
            .map_err(|e| ReportError::render("failed to write chart image", e))?;
        debug!(
            "chart with {} bars written ({}x{} px)",
            self.bars.len(),
            pixmap.width(),
            pixmap.height()
        );
        Ok(())
    }
}

/// Integer tick step and axis maximum leaving headroom for value labels.
fn axis_scale(max_value: usize) -> (usize, usize) {
    let target = ((max_value as f64) * 1.1).ceil().max(1.0) as usize;
    let mut magnitude = 1;
    loop {
        for factor in [1, 2, 5] {
            let step = factor * magnitude;
            if target.div_ceil(step) <= 8 {
                return (step, target.div_ceil(step) * step);
            }
        }
        magnitude *= 10;
    }
}

fn shorten(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_string();
    }
    let kept: String = label.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
