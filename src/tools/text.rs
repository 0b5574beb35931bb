//! TXT → PDF: plain text set in Helvetica on A4 pages.

use super::{base_name, blocking};
use crate::backend::authoring::{wrap_text, PdfBuilder, A4_HEIGHT, A4_WIDTH};
use crate::error::ConvertError;
use crate::output::{ConversionResult, OutputFile};
use crate::pipeline::intake::SourceFile;
use tracing::info;

/// Page geometry for plain-text documents, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextLayout {
    pub margin: f32,
    pub font_size: f32,
    pub line_height: f32,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            margin: 40.0,
            font_size: 11.0,
            line_height: 12.0,
        }
    }
}

impl TextLayout {
    pub fn max_line_width(&self) -> f32 {
        A4_WIDTH - 2.0 * self.margin
    }

    /// Break text into wrapped lines grouped by page.
    ///
    /// A new page starts whenever the next baseline would cross the bottom
    /// margin.
    pub fn paginate(&self, text: &str) -> Vec<Vec<String>> {
        let text = if text.is_empty() { " " } else { text };
        let lines = wrap_text(text, self.max_line_width(), self.font_size);

        let mut pages = vec![Vec::new()];
        let mut y = self.margin;
        for line in lines {
            if y + self.line_height > A4_HEIGHT - self.margin {
                pages.push(Vec::new());
                y = self.margin;
            }
            if let Some(page) = pages.last_mut() {
                page.push(line);
            }
            y += self.line_height;
        }
        pages
    }
}

/// Decode file contents as UTF-8, replacing invalid sequences and dropping a BOM.
pub fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{FEFF}').unwrap_or(&text).to_string()
}

/// Typeset a text file into `<base>.pdf`.
pub async fn run(file: &SourceFile, layout: TextLayout) -> Result<ConversionResult, ConvertError> {
    let text = decode_text(file.bytes());
    let bytes = blocking(move || {
        let pages = layout.paginate(&text);
        info!("Typesetting {} page(s)", pages.len());
        let mut pdf = PdfBuilder::new();
        for lines in &pages {
            pdf.add_text_page(
                lines,
                layout.margin,
                layout.margin,
                layout.font_size,
                layout.line_height,
            )?;
        }
        pdf.finish()
    })
    .await?;

    Ok(ConversionResult::single(OutputFile::pdf(
        format!("{}.pdf", base_name(file.name())),
        bytes,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixty_three_lines_per_page() {
        let text = (1..=64).map(|n| n.to_string()).collect::<Vec<_>>().join("\n");
        let pages = TextLayout::default().paginate(&text);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].len(), 63);
        assert_eq!(pages[1], vec!["64"]);
    }

    #[test]
    fn empty_text_gives_one_page() {
        let pages = TextLayout::default().paginate("");
        assert_eq!(pages, vec![vec![" ".to_string()]]);
    }

    #[test]
    fn bom_and_invalid_bytes() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFhi"), "hi");
        assert_eq!(decode_text(b"a\xFFb"), "a\u{FFFD}b");
    }
}
