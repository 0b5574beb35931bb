//! Writing new PDFs: A4 pages of Helvetica text or of full-width JPEG images.
//!
//! Coordinates are PDF points. Layout code works top-down (`y` grows towards
//! the bottom of the page, as on screen); [`PdfBuilder`] flips to PDF space
//! when emitting content.

use crate::error::ConvertError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

/// A4 width in points.
pub const A4_WIDTH: f32 = 595.28;
/// A4 height in points.
pub const A4_HEIGHT: f32 = 841.89;

// Helvetica advance widths for 0x20..=0x7E, in 1/1000 em (Adobe AFM).
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // {..~
];

/// Map a character to its WinAnsi byte, or `?` when it has none.
pub fn win_ansi(c: char) -> u8 {
    match c {
        ' '..='~' => c as u8,
        '\t' => b' ',
        '\u{A0}'..='\u{FF}' => c as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => b'?',
    }
}

fn glyph_width(byte: u8) -> u16 {
    match byte {
        0x20..=0x7E => HELVETICA_ASCII[(byte - 0x20) as usize],
        0xA0 => 278,
        0x96 => 556,
        0x97 => 1000,
        _ => 556,
    }
}

/// Width of `text` set in Helvetica at `font_size` points.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| glyph_width(win_ansi(c)) as u32).sum();
    units as f32 * font_size / 1000.0
}

/// Greedy word wrap to `max_width` points.
///
/// Hard line breaks are kept, blank lines included. Words wider than a whole
/// line are broken between characters.
pub fn wrap_text(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let paragraph = paragraph.strip_suffix('\r').unwrap_or(paragraph);
        wrap_paragraph(paragraph, max_width, font_size, &mut lines);
    }
    lines
}

fn wrap_paragraph(paragraph: &str, max_width: f32, font_size: f32, out: &mut Vec<String>) {
    let mut line = String::new();
    let mut pushed_any = false;

    for word in paragraph.split(' ') {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", line, word)
        };
        if text_width(&candidate, font_size) <= max_width {
            line = candidate;
            continue;
        }
        if !line.is_empty() {
            out.push(std::mem::take(&mut line));
            pushed_any = true;
        }
        if text_width(word, font_size) <= max_width {
            line = word.to_string();
        } else {
            for c in word.chars() {
                let mut next = line.clone();
                next.push(c);
                if !line.is_empty() && text_width(&next, font_size) > max_width {
                    out.push(std::mem::take(&mut line));
                    pushed_any = true;
                    line.push(c);
                } else {
                    line = next;
                }
            }
        }
    }

    if !line.is_empty() || !pushed_any {
        out.push(line);
    }
}

/// Incrementally assembled PDF with a flat page tree.
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    font_id: Option<ObjectId>,
    pages: Vec<ObjectId>,
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            font_id: None,
            pages: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn helvetica(&mut self) -> ObjectId {
        if let Some(id) = self.font_id {
            return id;
        }
        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        self.font_id = Some(id);
        id
    }

    fn push_page(&mut self, content: Content, resources: lopdf::Dictionary) -> Result<(), ConvertError> {
        let bytes = content
            .encode()
            .map_err(|e| ConvertError::pdf("Failed to encode page content", e))?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, bytes));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.pages.push(page_id);
        Ok(())
    }

    /// Add one page of text lines. `top` is the first baseline, measured from
    /// the top edge.
    pub fn add_text_page(
        &mut self,
        lines: &[String],
        left: f32,
        top: f32,
        font_size: f32,
        line_height: f32,
    ) -> Result<(), ConvertError> {
        let font = self.helvetica();
        let mut ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), Object::Real(font_size)]),
            Operation::new("TL", vec![Object::Real(line_height)]),
            Operation::new("Td", vec![Object::Real(left), Object::Real(A4_HEIGHT - top)]),
        ];
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                ops.push(Operation::new("T*", vec![]));
            }
            let encoded: Vec<u8> = line.chars().map(win_ansi).collect();
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(encoded, StringFormat::Literal)],
            ));
        }
        ops.push(Operation::new("ET", vec![]));

        let resources = dictionary! { "Font" => dictionary! { "F1" => font } };
        self.push_page(Content { operations: ops }, resources)
    }

    /// Add a page showing a JPEG at the top, `draw_width` × `draw_height`
    /// points.
    pub fn add_jpeg_page(
        &mut self,
        jpeg: Vec<u8>,
        pixel_width: u32,
        pixel_height: u32,
        draw_width: f32,
        draw_height: f32,
    ) -> Result<(), ConvertError> {
        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => pixel_width as i64,
                "Height" => pixel_height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
                "Filter" => "DCTDecode",
            },
            jpeg,
        )
        .with_compression(false);
        let image_id = self.doc.add_object(image);

        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(draw_width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(draw_height),
                    Object::Integer(0),
                    Object::Real(A4_HEIGHT - draw_height),
                ],
            ),
            Operation::new("Do", vec!["Im1".into()]),
            Operation::new("Q", vec![]),
        ];
        let resources = dictionary! { "XObject" => dictionary! { "Im1" => image_id } };
        self.push_page(Content { operations: ops }, resources)
    }

    /// Close the page tree and serialise.
    pub fn finish(mut self) -> Result<Vec<u8>, ConvertError> {
        let kids: Vec<Object> = self.pages.iter().map(|&id| Object::Reference(id)).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.pages.len() as i64,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(A4_WIDTH),
                    Object::Real(A4_HEIGHT),
                ],
            }),
        );
        let catalog = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog);
        self.doc.compress();

        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| ConvertError::pdf("Failed to write PDF", e))?;
        Ok(buf)
    }
}
