//! Paginated document export
//!
//! Writes a small PDF 1.4 file using only the standard Helvetica fonts, so
//! nothing needs to be embedded. Layout: title, generation timestamp, total
//! sample count, then a bordered two-column `Time` / `Emotion` table over the
//! tail window of the ledger. Rows that do not fit continue on a new page
//! under a repeated header.
//!
//! Output depends only on the inputs: no clock reads, no random IDs, so the
//! same snapshot and timestamp always give the same bytes.

use std::fmt::Write;

use chrono::NaiveDateTime;

use super::row_time;
use crate::state::Observation;

// A4 in points
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;

const TITLE_SIZE: f32 = 18.0;
const BODY_SIZE: f32 = 11.0;
const ROW_HEIGHT: f32 = 20.0;
const TIME_COL_WIDTH: f32 = 150.0;
const EMOTION_COL_WIDTH: f32 = 200.0;
const CELL_PAD_X: f32 = 6.0;
const CELL_PAD_Y: f32 = 6.0;

/// Everything that goes on the document
#[derive(Debug, Clone, Copy)]
pub struct DocumentLayout<'a> {
    pub title: &'a str,
    pub generated_at: NaiveDateTime,
    /// Total observations in the session (not just the tail)
    pub total: usize,
    /// Rows to tabulate, already cut to the tail window
    pub rows: &'a [Observation],
    pub time_format: &'a str,
}

/// Render the document to PDF bytes
pub fn render_document(layout: &DocumentLayout<'_>) -> Vec<u8> {
    let pages = paginate(layout);
    let mut doc = PdfBuilder::new();

    // Fixed object numbers: 1 catalog, 2 page tree, 3-4 fonts, 5 info,
    // then a (page, content) pair per page.
    let page_ids: Vec<usize> = (0..pages.len()).map(|i| 6 + 2 * i).collect();

    doc.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    let kids: Vec<String> = page_ids.iter().map(|id| format!("{} 0 R", id)).collect();
    doc.object(
        2,
        &format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        ),
    );
    doc.object(
        3,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    );
    doc.object(
        4,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>",
    );
    doc.object(
        5,
        &format!(
            "<< /Title ({}) /Producer (emotive) /CreationDate (D:{}) >>",
            pdf_text(layout.title),
            layout.generated_at.format("%Y%m%d%H%M%S")
        ),
    );

    for (page_id, content) in page_ids.iter().zip(&pages) {
        doc.object(
            *page_id,
            &format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                PAGE_WIDTH,
                PAGE_HEIGHT,
                page_id + 1
            ),
        );
        doc.stream(page_id + 1, content);
    }

    doc.finish(1, 5)
}

/// Build the content stream of every page
fn paginate(layout: &DocumentLayout<'_>) -> Vec<String> {
    let mut pages = Vec::new();
    let mut content = String::new();

    let mut y = PAGE_HEIGHT - MARGIN - TITLE_SIZE;
    text(&mut content, "F2", TITLE_SIZE, MARGIN, y, layout.title);
    y -= 28.0;
    let generated = format!(
        "Generated: {}",
        layout.generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    text(&mut content, "F1", BODY_SIZE, MARGIN, y, &generated);
    y -= 18.0;
    let total = format!("Total samples: {}", layout.total);
    text(&mut content, "F1", BODY_SIZE, MARGIN, y, &total);
    y -= 30.0;

    if layout.rows.is_empty() {
        text(&mut content, "F1", BODY_SIZE, MARGIN, y, "No observations recorded.");
        pages.push(content);
        return pages;
    }

    table_row(&mut content, y, "F2", "Time", "Emotion");
    y -= ROW_HEIGHT;
    for obs in layout.rows {
        if y < MARGIN {
            pages.push(std::mem::take(&mut content));
            y = PAGE_HEIGHT - MARGIN - ROW_HEIGHT;
            table_row(&mut content, y, "F2", "Time", "Emotion");
            y -= ROW_HEIGHT;
        }
        let time = row_time(&obs.timestamp, layout.time_format);
        table_row(&mut content, y, "F1", &time, obs.label.as_str());
        y -= ROW_HEIGHT;
    }
    pages.push(content);
    pages
}

/// One bordered row whose bottom edge sits at `y`
fn table_row(out: &mut String, y: f32, font: &str, left: &str, right: &str) {
    let _ = writeln!(out, "0.5 w");
    let _ = writeln!(out, "{} {} {} {} re S", MARGIN, y, TIME_COL_WIDTH, ROW_HEIGHT);
    let _ = writeln!(
        out,
        "{} {} {} {} re S",
        MARGIN + TIME_COL_WIDTH,
        y,
        EMOTION_COL_WIDTH,
        ROW_HEIGHT
    );
    text(out, font, BODY_SIZE, MARGIN + CELL_PAD_X, y + CELL_PAD_Y, left);
    text(
        out,
        font,
        BODY_SIZE,
        MARGIN + TIME_COL_WIDTH + CELL_PAD_X,
        y + CELL_PAD_Y,
        right,
    );
}

fn text(out: &mut String, font: &str, size: f32, x: f32, y: f32, s: &str) {
    let _ = writeln!(
        out,
        "BT /{} {} Tf {} {} Td ({}) Tj ET",
        font,
        size,
        x,
        y,
        pdf_text(s)
    );
}

/// Escape a string for a PDF literal; anything outside printable ASCII
/// becomes `?`
fn pdf_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Accumulates objects and writes the cross-reference table
struct PdfBuilder {
    buf: String,
    /// (object number, byte offset)
    offsets: Vec<(usize, usize)>,
}

impl PdfBuilder {
    fn new() -> Self {
        // The comment line with high bytes is omitted: the file is pure ASCII
        Self {
            buf: String::from("%PDF-1.4\n"),
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, id: usize, body: &str) {
        self.offsets.push((id, self.buf.len()));
        let _ = write!(self.buf, "{} 0 obj\n{}\nendobj\n", id, body);
    }

    fn stream(&mut self, id: usize, content: &str) {
        self.offsets.push((id, self.buf.len()));
        let _ = write!(
            self.buf,
            "{} 0 obj\n<< /Length {} >>\nstream\n{}endstream\nendobj\n",
            id,
            content.len(),
            content
        );
    }

    fn finish(mut self, root: usize, info: usize) -> Vec<u8> {
        self.offsets.sort_by_key(|(id, _)| *id);
        let size = self.offsets.len() + 1;
        let xref_at = self.buf.len();

        let _ = write!(self.buf, "xref\n0 {}\n0000000000 65535 f \n", size);
        for (_, offset) in &self.offsets {
            let _ = write!(self.buf, "{:010} 00000 n \n", offset);
        }
        let _ = write!(
            self.buf,
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, root, info, xref_at
        );
        self.buf.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(10, sec / 60, sec % 60))
            .unwrap()
    }

    fn layout<'a>(rows: &'a [Observation], total: usize) -> DocumentLayout<'a> {
        DocumentLayout {
            title: "Emotion Session Report",
            generated_at: at(0),
            total,
            rows,
            time_format: "%H:%M:%S",
        }
    }

    fn as_text(bytes: &[u8]) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_document_structure() {
        let rows = vec![Observation::new(at(1), "happy")];
        let pdf = as_text(&render_document(&layout(&rows, 1)));

        assert!(pdf.starts_with("%PDF-1.4\n"));
        assert!(pdf.ends_with("%%EOF\n"));
        assert!(pdf.contains("(Emotion Session Report) Tj"));
        assert!(pdf.contains("(Generated: 2024-05-01 10:00:00) Tj"));
        assert!(pdf.contains("(Total samples: 1) Tj"));
        assert!(pdf.contains("(Time) Tj"));
        assert!(pdf.contains("(10:00:01) Tj"));
        assert!(pdf.contains("/Count 1"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let rows = vec![Observation::new(at(1), "sad")];
        let bytes = render_document(&layout(&rows, 1));
        let pdf = as_text(&bytes);

        let xref_at: usize = pdf
            .rsplit("startxref\n")
            .next()
            .and_then(|tail| tail.lines().next())
            .and_then(|n| n.parse().ok())
            .unwrap();
        assert!(pdf[xref_at..].starts_with("xref\n"));

        let entries: Vec<&str> = pdf[xref_at..].lines().skip(3).take(7).collect();
        for (i, entry) in entries.iter().enumerate() {
            let offset: usize = entry[..10].parse().unwrap();
            assert!(pdf[offset..].starts_with(&format!("{} 0 obj", i + 1)));
        }
    }

    #[test]
    fn test_long_tables_paginate() {
        let rows: Vec<Observation> = (0..60).map(|i| Observation::new(at(i), "fear")).collect();
        let pdf = as_text(&render_document(&layout(&rows, 60)));
        assert!(pdf.contains("/Count 2"));
        assert_eq!(pdf.matches("(Time) Tj").count(), 2);
        assert_eq!(pdf.matches("(fear) Tj").count(), 60);
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(pdf_text("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(pdf_text("joie é"), "joie ?");
    }

    #[test]
    fn test_empty_document() {
        let pdf = as_text(&render_document(&layout(&[], 0)));
        assert!(pdf.contains("(Total samples: 0) Tj"));
        assert!(pdf.contains("No observations recorded."));
    }
}
