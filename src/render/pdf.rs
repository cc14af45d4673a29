//! A4 PDF output for a [`PlanDocument`].
//!
//! Positioning happens in [`layout`], which yields draw operations per page in
//! millimetres from the top edge; [`render`] replays them through printpdf,
//! whose origin is the bottom-left corner.

use std::io::BufWriter;

use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rect,
    Rgb,
};

use crate::document::{Block, PlanDocument, PlanTable};
use crate::error::FarmacoError;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 14.0;
const TOP: f32 = 15.0;
/// Lowest baseline for flowing content; the disclaimer sits below it.
const CONTENT_BOTTOM: f32 = 272.0;
const DISCLAIMER_Y: f32 = 280.0;

const COLUMN_RATIOS: [f32; 3] = [90.0, 50.0, 50.0];
const TABLE_FONT: f32 = 9.0;
const CELL_PADDING: f32 = 3.0;
const TABLE_BORDER: f32 = 0.1;
const HEADER_FILL: u8 = 240;
const BODY_FILL: u8 = 255;

const PT_TO_MM: f32 = 0.3528;
const LINE_HEIGHT_FACTOR: f32 = 1.15;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DrawOp {
    Text {
        text: String,
        size: f32,
        bold: bool,
        x: f32,
        y: f32,
        gray: u8,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
        width: f32,
        gray: u8,
    },
    Cell {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: u8,
    },
}

fn printable_width() -> f32 {
    PAGE_WIDTH - 2.0 * MARGIN
}

pub(crate) fn column_widths() -> [f32; 3] {
    let total: f32 = COLUMN_RATIOS.iter().sum();
    COLUMN_RATIOS.map(|r| r / total * printable_width())
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * PT_TO_MM * GLYPH_WIDTH
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * LINE_HEIGHT_FACTOR
}

/// Greedy word wrap by character count; words longer than a line are split.
pub(crate) fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let current_len = current.chars().count();
        if !current.is_empty() && current_len + word.len() + 1 > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

struct Layout {
    done: Vec<Vec<DrawOp>>,
    current: Vec<DrawOp>,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            done: Vec::new(),
            current: Vec::new(),
            y: TOP,
        }
    }

    fn new_page(&mut self) {
        self.done.push(std::mem::take(&mut self.current));
        self.y = TOP;
    }

    /// Starts a new page unless `height` more millimetres fit on this one.
    fn ensure(&mut self, height: f32) {
        if self.y + height > CONTENT_BOTTOM && !self.current.is_empty() {
            self.new_page();
        }
    }

    fn text(&mut self, text: &str, size: f32, bold: bool, x: f32, gray: u8) {
        self.current.push(DrawOp::Text {
            text: text.to_string(),
            size,
            bold,
            x,
            y: self.y,
            gray,
        });
    }

    fn centered(&mut self, text: &str, size: f32, bold: bool, gray: u8) {
        let x = (PAGE_WIDTH - text_width(text, size)) / 2.0;
        self.text(text, size, bold, x.max(0.0), gray);
    }

    fn rule(&mut self, x1: f32, x2: f32, y: f32, width: f32, gray: u8) {
        self.current.push(DrawOp::Rule {
            x1,
            x2,
            y,
            width,
            gray,
        });
    }

    fn finish(mut self) -> Vec<Vec<DrawOp>> {
        self.done.push(self.current);
        self.done
    }
}

struct PreparedRow {
    cells: [Vec<String>; 3],
    height: f32,
}

impl PreparedRow {
    fn from_lines(cells: [Vec<String>; 3]) -> Self {
        let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1) as f32;
        Self {
            cells,
            height: lines * line_height(TABLE_FONT) + 2.0 * CELL_PADDING,
        }
    }

    /// Moves the first `count` wrapped lines of every cell into a new row.
    fn take_lines(&mut self, count: usize) -> PreparedRow {
        let mut head: [Vec<String>; 3] = Default::default();
        for (cell, taken) in self.cells.iter_mut().zip(head.iter_mut()) {
            let rest = cell.split_off(count.min(cell.len()));
            *taken = std::mem::replace(cell, rest);
        }
        *self = PreparedRow::from_lines(std::mem::take(&mut self.cells));
        PreparedRow::from_lines(head)
    }
}

/// Wrapped table lines that fit in `space` millimetres of row height.
fn lines_fitting(space: f32) -> usize {
    ((space - 2.0 * CELL_PADDING) / line_height(TABLE_FONT))
        .floor()
        .max(0.0) as usize
}

fn prepare_row(cells: &[String; 3], widths: &[f32; 3]) -> PreparedRow {
    let glyph = TABLE_FONT * PT_TO_MM * GLYPH_WIDTH;
    let mut wrapped: [Vec<String>; 3] = Default::default();
    for (i, cell) in cells.iter().enumerate() {
        let max_chars = ((widths[i] - 2.0 * CELL_PADDING) / glyph).floor() as usize;
        wrapped[i] = wrap_text(cell, max_chars);
    }
    PreparedRow::from_lines(wrapped)
}

fn draw_row(layout: &mut Layout, row: &PreparedRow, widths: &[f32; 3], header: bool) {
    let fill = if header { HEADER_FILL } else { BODY_FILL };
    let top = layout.y;
    let mut x = MARGIN;
    for width in widths {
        layout.current.push(DrawOp::Cell {
            x,
            y: top,
            width: *width,
            height: row.height,
            fill,
        });
        x += width;
    }

    let lh = line_height(TABLE_FONT);
    let mut x = MARGIN;
    for (lines, width) in row.cells.iter().zip(widths) {
        for (i, line) in lines.iter().enumerate() {
            let text_x = if header {
                x + (width - text_width(line, TABLE_FONT)) / 2.0
            } else {
                x + CELL_PADDING
            };
            layout.current.push(DrawOp::Text {
                text: line.clone(),
                size: TABLE_FONT,
                bold: header,
                x: text_x,
                y: top + CELL_PADDING + lh * (i as f32 + 0.8),
                gray: 0,
            });
        }
        x += width;
    }
    layout.y = top + row.height;
}

/// Rows that fit on a fresh page move there whole; taller rows are split at
/// the page bottom and continue under a repeated header.
fn layout_table(layout: &mut Layout, table: &PlanTable) {
    let widths = column_widths();
    let header = prepare_row(&table.headers, &widths);
    let rows: Vec<PreparedRow> = table.rows.iter().map(|r| prepare_row(r, &widths)).collect();
    let page_room = CONTENT_BOTTOM - TOP - header.height;

    let first = rows.first().map(|r| r.height).unwrap_or_default();
    let one_line = line_height(TABLE_FONT) + 2.0 * CELL_PADDING;
    layout.ensure(header.height + if first <= page_room { first } else { one_line });
    draw_row(layout, &header, &widths, true);

    for mut row in rows {
        while layout.y + row.height > CONTENT_BOTTOM {
            let fits = lines_fitting(CONTENT_BOTTOM - layout.y);
            if row.height > page_room && fits > 0 {
                let head = row.take_lines(fits);
                draw_row(layout, &head, &widths, false);
            }
            layout.new_page();
            draw_row(layout, &header, &widths, true);
        }
        draw_row(layout, &row, &widths, false);
    }
}

pub(crate) fn layout(document: &PlanDocument) -> Vec<Vec<DrawOp>> {
    let mut layout = Layout::new();
    let mut disclaimer = None;

    for block in &document.blocks {
        match block {
            Block::Title { text } => {
                layout.ensure(10.0);
                layout.centered(text, 16.0, true, 0);
                layout.y += 10.0;
            }
            Block::Separator => {
                layout.ensure(8.0);
                let y = layout.y;
                layout.rule(MARGIN, PAGE_WIDTH - MARGIN, y, 0.5, 0);
                layout.y += 8.0;
            }
            Block::Section { heading, lines } => {
                layout.ensure(7.0 + lines.len() as f32 * 5.0);
                layout.text(heading, 12.0, true, MARGIN, 0);
                layout.y += 7.0;
                for line in lines {
                    layout.text(line, 10.0, false, MARGIN, 0);
                    layout.y += 5.0;
                }
                layout.y += 5.0;
            }
            Block::Field { label, value } => {
                layout.ensure(8.0);
                layout.text(label, 11.0, true, MARGIN, 0);
                layout.text(value, 11.0, false, 50.0, 0);
                layout.y += 8.0;
            }
            Block::Table(table) => {
                layout_table(&mut layout, table);
                layout.y += 12.0;
            }
            Block::Signature { label } => {
                layout.ensure(8.0);
                layout.text(label, 10.0, false, MARGIN, 0);
                let y = layout.y - 2.0;
                layout.rule(60.0, 120.0, y, 0.5, 0);
                layout.y += 8.0;
            }
            Block::Line { text } => {
                layout.ensure(12.0);
                layout.text(text, 10.0, false, MARGIN, 0);
                layout.y += 12.0;
            }
            Block::Footer { lines } => {
                layout.ensure(5.0 + lines.len() as f32 * 4.0);
                let y = layout.y;
                layout.rule(MARGIN, PAGE_WIDTH - MARGIN, y, 0.5, 200);
                layout.y += 5.0;
                for line in lines {
                    layout.text(line, 7.0, false, MARGIN, 80);
                    layout.y += 4.0;
                }
            }
            Block::Disclaimer { text } => disclaimer = Some(text.as_str()),
        }
    }

    if let Some(text) = disclaimer {
        layout.y = DISCLAIMER_Y;
        layout.centered(text, 8.0, false, 120);
    }
    layout.finish()
}

fn gray(level: u8) -> Color {
    let v = f32::from(level) / 255.0;
    Color::Rgb(Rgb::new(v, v, v, None))
}

fn mm_to_pt(mm: f32) -> f32 {
    mm / PT_TO_MM
}

fn from_top(y: f32) -> Mm {
    Mm(PAGE_HEIGHT - y)
}

fn draw(
    layer: &PdfLayerReference,
    op: &DrawOp,
    font: &IndirectFontRef,
    bold_font: &IndirectFontRef,
) {
    match op {
        DrawOp::Text {
            text,
            size,
            bold,
            x,
            y,
            gray: level,
        } => {
            layer.set_fill_color(gray(*level));
            let face = if *bold { bold_font } else { font };
            layer.use_text(text.as_str(), *size, Mm(*x), from_top(*y), face);
        }
        DrawOp::Rule {
            x1,
            x2,
            y,
            width,
            gray: level,
        } => {
            layer.set_outline_color(gray(*level));
            layer.set_outline_thickness(mm_to_pt(*width));
            layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(*x1), from_top(*y)), false),
                    (Point::new(Mm(*x2), from_top(*y)), false),
                ],
                is_closed: false,
            });
        }
        DrawOp::Cell {
            x,
            y,
            width,
            height,
            fill,
        } => {
            layer.set_fill_color(gray(*fill));
            layer.set_outline_color(gray(0));
            layer.set_outline_thickness(mm_to_pt(TABLE_BORDER));
            layer.add_rect(
                Rect::new(Mm(*x), from_top(*y + *height), Mm(*x + *width), from_top(*y))
                    .with_mode(PaintMode::FillStroke),
            );
        }
    }
}

pub fn render(document: &PlanDocument) -> Result<Vec<u8>, FarmacoError> {
    let pages = layout(document);
    let (doc, page1, layer1) = PdfDocument::new(
        &document.title,
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| FarmacoError::Pdf(format!("font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| FarmacoError::Pdf(format!("font error: {e}")))?;

    for (index, ops) in pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(page1).get_layer(layer1)
        } else {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            doc.get_page(page).get_layer(layer)
        };
        for op in ops {
            draw(&layer, op, &font, &bold);
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| FarmacoError::Pdf(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| FarmacoError::Pdf(format!("PDF buffer error: {e}")))
}
