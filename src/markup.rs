//! Report body as HTML for printpdf's layout engine.
//!
//! Blocks are rendered with inline styles taken from a typed [`StyleSheet`].
//! printpdf does the line breaking, table layout and pagination.

use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const GRAY: Rgb = Rgb(128, 128, 128);
    pub const LIGHT_BLUE: Rgb = Rgb(173, 216, 230);

    pub fn css(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    fn css(self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParagraphStyle {
    pub font_size: f32,
    pub bold: bool,
    pub color: Rgb,
    pub align: Align,
    pub space_after: f32,
}

impl ParagraphStyle {
    pub fn new(font_size: f32, bold: bool) -> Self {
        Self {
            font_size,
            bold,
            color: Rgb::BLACK,
            align: Align::Left,
            space_after: 0.0,
        }
    }

    fn css(&self) -> String {
        format!(
            "font-size:{}pt;font-weight:{};color:{};text-align:{};margin:0 0 {}pt 0",
            self.font_size,
            if self.bold { "bold" } else { "normal" },
            self.color.css(),
            self.align.css(),
            self.space_after
        )
    }
}

#[derive(Debug, Clone)]
pub struct TableStyle {
    pub font_size: f32,
    pub header_background: Rgb,
    pub header_color: Rgb,
    pub header_align: Align,
    pub body_align: Align,
    pub padding: f32,
    pub grid_color: Rgb,
    pub grid_width: f32,
}

impl TableStyle {
    fn cell_css(&self, align: Align) -> String {
        format!(
            "font-size:{}pt;text-align:{};padding:{}pt;border:{}pt solid {}",
            self.font_size,
            align.css(),
            self.padding,
            self.grid_width,
            self.grid_color.css()
        )
    }

    fn header_css(&self) -> String {
        format!(
            "{};font-weight:bold;color:{};background-color:{}",
            self.cell_css(self.header_align),
            self.header_color.css(),
            self.header_background.css()
        )
    }
}

/// Which paragraph style of the sheet a block uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Title,
    Subtitle,
    Normal,
    Muted,
}

#[derive(Debug, Clone)]
pub struct StyleSheet {
    pub font_family: String,
    pub title: ParagraphStyle,
    pub subtitle: ParagraphStyle,
    pub normal: ParagraphStyle,
    pub muted: ParagraphStyle,
    pub table: TableStyle,
}

impl StyleSheet {
    fn paragraph(&self, role: Role) -> &ParagraphStyle {
        match role {
            Role::Title => &self.title,
            Role::Subtitle => &self.subtitle,
            Role::Normal => &self.normal,
            Role::Muted => &self.muted,
        }
    }
}

impl Default for StyleSheet {
    fn default() -> Self {
        let mut title = ParagraphStyle::new(18.0, true);
        title.align = Align::Center;
        title.space_after = 12.0;

        let mut subtitle = ParagraphStyle::new(14.0, true);
        subtitle.space_after = 8.0;

        let mut normal = ParagraphStyle::new(11.0, false);
        normal.space_after = 6.0;

        let mut muted = ParagraphStyle::new(10.0, false);
        muted.align = Align::Right;
        muted.color = Rgb::GRAY;

        Self {
            font_family: "sans-serif".to_string(),
            title,
            subtitle,
            normal,
            muted,
            table: TableStyle {
                font_size: 9.0,
                header_background: Rgb::LIGHT_BLUE,
                header_color: Rgb::BLACK,
                header_align: Align::Center,
                body_align: Align::Left,
                padding: 3.0,
                grid_color: Rgb::BLACK,
                grid_width: 1.0,
            },
        }
    }
}

/// Page size and margin in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_mm: f32,
}

impl PageSize {
    pub fn letter() -> Self {
        Self {
            width_mm: 215.9,
            height_mm: 279.4,
            margin_mm: 25.4,
        }
    }

    pub fn frame_width_mm(&self) -> f32 {
        self.width_mm - 2.0 * self.margin_mm
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::letter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Block {
    Paragraph { spans: Vec<Span>, role: Role },
    /// Vertical gap in points.
    Spacer(f32),
    /// Image supplied to the renderer under `key`.
    Image {
        key: String,
        width_mm: f32,
        height_mm: f32,
    },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

impl Block {
    pub fn paragraph(text: impl Into<String>, role: Role) -> Self {
        Block::Paragraph {
            spans: vec![Span::plain(text)],
            role,
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn write_table(out: &mut String, header: &[String], rows: &[Vec<String>], style: &TableStyle) {
    out.push_str(r#"<table style="width:100%;border-collapse:collapse"><tr>"#);
    let header_css = style.header_css();
    for cell in header {
        let _ = write!(out, r#"<th style="{header_css}">{}</th>"#, escape_html(cell));
    }
    out.push_str("</tr>");

    let body_css = style.cell_css(style.body_align);
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            let _ = write!(out, r#"<td style="{body_css}">{}</td>"#, escape_html(cell));
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>\n");
}

/// Render `blocks` as a standalone HTML document.
pub fn to_html(title: &str, blocks: &[Block], sheet: &StyleSheet, page: &PageSize) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html><head><title>{}</title></head>\n",
        escape_html(title)
    );
    let _ = writeln!(
        out,
        r#"<body style="font-family:{};padding:{}mm">"#,
        escape_html(&sheet.font_family),
        page.margin_mm
    );

    for block in blocks {
        match block {
            Block::Paragraph { spans, role } => {
                let _ = write!(out, r#"<p style="{}">"#, sheet.paragraph(*role).css());
                for span in spans {
                    if span.bold {
                        let _ = write!(out, "<b>{}</b>", escape_html(&span.text));
                    } else {
                        out.push_str(&escape_html(&span.text));
                    }
                }
                out.push_str("</p>\n");
            }
            Block::Spacer(height) => {
                let _ = writeln!(out, r#"<div style="height:{height}pt"></div>"#);
            }
            Block::Image {
                key,
                width_mm,
                height_mm,
            } => {
                let _ = writeln!(
                    out,
                    r#"<img src="{}" style="width:{width_mm}mm;height:{height_mm}mm">"#,
                    escape_html(key)
                );
            }
            Block::Table { header, rows } => write_table(&mut out, header, rows, &sheet.table),
        }
    }

    out.push_str("</body></html>\n");
    out
}

/// Plain text of each paragraph and table row, in reading order.
#[cfg(test)]
pub fn text_lines(blocks: &[Block]) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for block in blocks {
        match block {
            Block::Paragraph { spans, .. } => {
                lines.push(spans.iter().map(|s| s.text.as_str()).collect::<String>());
            }
            Block::Table { header, rows } => {
                lines.push(header.join(" "));
                lines.extend(rows.iter().map(|row| row.join(" ")));
            }
            Block::Spacer(_) | Block::Image { .. } => {}
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"R&D <intro> "x" 'y'"#),
            "R&amp;D &lt;intro&gt; &quot;x&quot; &#39;y&#39;"
        );
        assert_eq!(escape_html("José Núñez"), "José Núñez");
    }

    #[test]
    fn mixed_spans_keep_their_weight() {
        let blocks = vec![Block::Paragraph {
            spans: vec![Span::plain("Total: "), Span::bold("12")],
            role: Role::Normal,
        }];
        let html = to_html("T", &blocks, &StyleSheet::default(), &PageSize::letter());
        assert!(html.contains("Total: <b>12</b></p>"));
        assert_eq!(text_lines(&blocks), vec!["Total: 12"]);
    }

    #[test]
    fn table_header_is_styled_apart_from_body() {
        let blocks = vec![Block::Table {
            header: vec!["Full Name".to_string(), "Contact Email".to_string()],
            rows: vec![vec!["Ana <Ruiz>".to_string(), "ana@example.com".to_string()]],
        }];
        let sheet = StyleSheet::default();
        let html = to_html("T", &blocks, &sheet, &PageSize::letter());

        assert_eq!(html.matches("<th ").count(), 2);
        assert_eq!(html.matches("<td ").count(), 2);
        assert!(html.contains("background-color:#add8e6"));
        assert!(html.contains(">Ana &lt;Ruiz&gt;</td>"));
        let body_cell = html.split("<td ").nth(1).unwrap();
        assert!(!body_cell.contains("background-color"));
    }

    #[test]
    fn paragraph_roles_map_to_sheet_styles() {
        let sheet = StyleSheet::default();
        let blocks = vec![
            Block::paragraph("Heading", Role::Title),
            Block::paragraph("Note", Role::Muted),
        ];
        let html = to_html("T", &blocks, &sheet, &PageSize::letter());
        assert!(html.contains("font-size:18pt;font-weight:bold;color:#000000;text-align:center"));
        assert!(html.contains("font-size:10pt;font-weight:normal;color:#808080;text-align:right"));
    }

    #[test]
    fn document_carries_title_margin_and_image_reference() {
        let blocks = vec![Block::Image {
            key: "chart".to_string(),
            width_mm: 165.1,
            height_mm: 106.1,
        }];
        let html = to_html("A & B", &blocks, &StyleSheet::default(), &PageSize::letter());
        assert!(html.contains("<title>A &amp; B</title>"));
        assert!(html.contains("padding:25.4mm"));
        assert!(html.contains(r#"<img src="chart" style="width:165.1mm;height:106.1mm">"#));
        assert!(text_lines(&blocks).is_empty());
    }

    #[test]
    fn letter_frame_width() {
        let page = PageSize::letter();
        assert!((page.frame_width_mm() - 165.1).abs() < 1e-3);
        assert_eq!(Rgb::LIGHT_BLUE.css(), "#add8e6");
    }
}
