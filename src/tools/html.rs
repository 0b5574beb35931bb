//! HTML → PDF: lay the document out in a browser, capture it as one tall
//! bitmap, and slice that bitmap into A4 pages.
//!
//! The capture is scaled so its width fills the page. Each page shows the
//! next band of the capture, drawn from the top edge; the last band is
//! usually shorter than a page.

use super::{base_name, blocking};
use crate::config::RasterFormat;
use crate::backend::authoring::{PdfBuilder, A4_HEIGHT, A4_WIDTH};
use crate::backend::{HtmlRasterizer, Viewport};
use crate::error::ConvertError;
use crate::output::{ConversionResult, OutputFile};
use crate::pipeline::encode::{encode_image, flatten_on_white};
use crate::pipeline::intake::SourceFile;
use crate::tools::text::decode_text;
use image::{DynamicImage, Rgb, RgbImage, RgbaImage};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

const BAND_JPEG_QUALITY: f32 = 0.92;

static FULL_DOCUMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*<!DOCTYPE|^\s*<html").expect("static regex"));

/// Wrap an HTML fragment in a minimal document; full documents pass through.
pub fn wrap_document(html: &str) -> String {
    if FULL_DOCUMENT.is_match(html) {
        html.to_string()
    } else {
        format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head>\
<body style=\"margin:0;padding:12px;font-family:system-ui,sans-serif;\">{}</body></html>",
            html
        )
    }
}

/// One page's slice of the capture, in capture pixels except `draw_height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub source_y: f64,
    pub source_height: f64,
    /// Height on the page, in points.
    pub draw_height: f64,
}

/// Slice a `width` × `height` capture into page bands.
pub fn slice_bands(width: u32, height: u32) -> Vec<Band> {
    let page_w = A4_WIDTH as f64;
    let page_h = A4_HEIGHT as f64;
    let img_h = height as f64;
    let scale = page_w / width as f64;
    let pages = ((img_h * scale / page_h).ceil() as usize).max(1);

    (0..pages)
        .map(|p| {
            let source_y = p as f64 * page_h / scale;
            let source_height = (page_h / scale).min(img_h - source_y);
            Band {
                source_y,
                source_height,
                draw_height: page_h.min(source_height * scale),
            }
        })
        .collect()
}

/// Copy one band out of the capture onto a white background.
fn cut_band(capture: &RgbImage, band: &Band) -> RgbImage {
    let width = capture.width();
    let rows = (band.source_height.ceil() as u32).max(1);
    let top = band.source_y.floor() as u32;
    let mut out = RgbImage::from_pixel(width, rows, Rgb([255, 255, 255]));
    for y in 0..rows {
        let src_y = top + y;
        if src_y >= capture.height() {
            break;
        }
        for x in 0..width {
            out.put_pixel(x, y, *capture.get_pixel(x, src_y));
        }
    }
    out
}

/// Build the paged PDF from a capture.
pub fn capture_to_pdf(capture: RgbaImage) -> Result<Vec<u8>, ConvertError> {
    if capture.width() == 0 || capture.height() == 0 {
        return Err(ConvertError::HtmlRender("empty capture".into()));
    }
    let rgb = flatten_on_white(&DynamicImage::ImageRgba8(capture));
    let bands = slice_bands(rgb.width(), rgb.height());
    info!(
        "Capture {}x{} → {} page(s)",
        rgb.width(),
        rgb.height(),
        bands.len()
    );

    let mut pdf = PdfBuilder::new();
    for band in &bands {
        let slice = cut_band(&rgb, band);
        let (w, h) = slice.dimensions();
        let jpeg = encode_image(
            &DynamicImage::ImageRgb8(slice),
            RasterFormat::Jpeg,
            BAND_JPEG_QUALITY,
        )?;
        debug!("Band at {:.1}: {}x{} px", band.source_y, w, h);
        pdf.add_jpeg_page(jpeg, w, h, A4_WIDTH, band.draw_height as f32)?;
    }
    pdf.finish()
}

/// Render an HTML file into `<base>.pdf`.
pub async fn run<H: HtmlRasterizer>(
    rasterizer: &H,
    file: &SourceFile,
) -> Result<ConversionResult, ConvertError> {
    let html = wrap_document(&decode_text(file.bytes()));
    let capture = rasterizer.rasterize(&html, Viewport::default()).await?;
    let bytes = blocking(move || capture_to_pdf(capture)).await?;

    Ok(ConversionResult::single(OutputFile::pdf(
        format!("{}.pdf", base_name(file.name())),
        bytes,
    )))
}
