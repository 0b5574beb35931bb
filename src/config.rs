//! Option types for every conversion tool.
//!
//! Each tool reads a small, typed options struct. Defaults match what a user
//! sees before touching any control: 150 DPI PNG page images, 90° clockwise
//! rotation, 80 % compression quality, and so on.
//!
//! [`PdfToImageOptions`] is the only struct with enough knobs and constraints
//! to warrant a validating builder; the rest are plain data.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Raster formats ───────────────────────────────────────────────────────

/// Output raster format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl RasterFormat {
    /// File extension written for this format.
    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpg",
            RasterFormat::Webp => "webp",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            RasterFormat::Png => "image/png",
            RasterFormat::Jpeg => "image/jpeg",
            RasterFormat::Webp => "image/webp",
        }
    }

    /// Parse a user-facing name (`png`, `jpg`, `jpeg`, `webp`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "png" => Some(RasterFormat::Png),
            "jpg" | "jpeg" => Some(RasterFormat::Jpeg),
            "webp" => Some(RasterFormat::Webp),
            _ => None,
        }
    }

    /// Map a MIME type to a format this crate can encode.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(RasterFormat::Png),
            "image/jpeg" | "image/jpg" => Some(RasterFormat::Jpeg),
            "image/webp" => Some(RasterFormat::Webp),
            _ => None,
        }
    }

    /// Initial page-image format selected by a `format` query parameter.
    ///
    /// Only `jpg` selects JPEG; anything else (including absence) means PNG.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("jpg") => RasterFormat::Jpeg,
            _ => RasterFormat::Png,
        }
    }
}

impl fmt::Display for RasterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// ── PDF → image ──────────────────────────────────────────────────────────

/// Options for rasterising PDF pages into images.
///
/// Built via [`PdfToImageOptions::builder()`] or taken from
/// [`PdfToImageOptions::default()`].
///
/// # Example
/// ```rust
/// use convertkit::{PdfToImageOptions, RasterFormat};
///
/// let opts = PdfToImageOptions::builder()
///     .dpi(300)
///     .format(RasterFormat::Jpeg)
///     .build()
///     .unwrap();
/// assert_eq!(opts.scale(), 300.0 / 72.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfToImageOptions {
    /// Rendering DPI. Range: 72–600. Default: 150.
    ///
    /// PDF user space is 72 points per inch, so the render scale is `dpi / 72`.
    pub dpi: u32,

    /// Output format. Default: PNG.
    pub format: RasterFormat,

    /// JPEG quality in `(0, 1]`. Ignored for PNG. Default: 0.92.
    pub jpeg_quality: f32,
}

impl Default for PdfToImageOptions {
    fn default() -> Self {
        Self {
            dpi: 150,
            format: RasterFormat::Png,
            jpeg_quality: 0.92,
        }
    }
}

impl PdfToImageOptions {
    pub fn builder() -> PdfToImageOptionsBuilder {
        PdfToImageOptionsBuilder {
            options: Self::default(),
        }
    }

    /// Render scale relative to PDF points.
    pub fn scale(&self) -> f32 {
        self.dpi as f32 / 72.0
    }
}

/// Builder for [`PdfToImageOptions`].
#[derive(Debug)]
pub struct PdfToImageOptionsBuilder {
    options: PdfToImageOptions,
}

impl PdfToImageOptionsBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.options.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn format(mut self, format: RasterFormat) -> Self {
        self.options.format = format;
        self
    }

    pub fn jpeg_quality(mut self, q: f32) -> Self {
        self.options.jpeg_quality = q;
        self
    }

    /// Build the options, validating constraints.
    pub fn build(self) -> Result<PdfToImageOptions, ConvertError> {
        let o = &self.options;
        if o.format == RasterFormat::Webp {
            return Err(ConvertError::InvalidConfig(
                "page images can be PNG or JPG".into(),
            ));
        }
        if !(o.jpeg_quality > 0.0 && o.jpeg_quality <= 1.0) {
            return Err(ConvertError::InvalidConfig(format!(
                "JPEG quality must be in (0, 1], got {}",
                o.jpeg_quality
            )));
        }
        Ok(self.options)
    }
}

// ── PDF rotation ─────────────────────────────────────────────────────────

/// Clockwise rotation added to every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotateOptions {
    /// Degrees, a multiple of 90. Default: 90.
    pub degrees: i64,
}

impl Default for RotateOptions {
    fn default() -> Self {
        Self { degrees: 90 }
    }
}

// ── Image resize ─────────────────────────────────────────────────────────

/// How the resize target is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ResizeMode {
    /// Explicit pixel dimensions.
    Dimensions { width: u32, height: u32 },
    /// Percentage of the natural size, 1–200.
    Percentage(u32),
}

impl Default for ResizeMode {
    fn default() -> Self {
        ResizeMode::Percentage(100)
    }
}

// ── Image compress ───────────────────────────────────────────────────────

/// Options for re-encoding an image at lower quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressOptions {
    /// Target format: JPEG or WEBP. `None` picks WEBP for WEBP sources and
    /// JPEG for everything else.
    pub format: Option<RasterFormat>,
    /// Quality, 0.1–1.0. Default: 0.8.
    pub quality: f32,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            format: None,
            quality: 0.8,
        }
    }
}

impl CompressOptions {
    /// Format used for a source with the given MIME type.
    pub fn resolve_format(&self, source_mime: &str) -> RasterFormat {
        match self.format {
            Some(f) => f,
            None if source_mime == "image/webp" => RasterFormat::Webp,
            None => RasterFormat::Jpeg,
        }
    }

    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.format == Some(RasterFormat::Png) {
            return Err(ConvertError::InvalidConfig(
                "compression targets JPG or WEBP".into(),
            ));
        }
        if !(0.1..=1.0).contains(&self.quality) {
            return Err(ConvertError::InvalidConfig(format!(
                "quality must be 0.1–1.0, got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

// ── Bulk conversion ──────────────────────────────────────────────────────

/// Options for converting many images into one archive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BulkOptions {
    /// Target format. Default: PNG.
    pub format: RasterFormat,
    /// Encoder quality for lossy formats. Default: 0.9.
    pub quality: f32,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            format: RasterFormat::Png,
            quality: 0.9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpi_is_clamped() {
        let o = PdfToImageOptions::builder().dpi(10).build().unwrap();
        assert_eq!(o.dpi, 72);
        let o = PdfToImageOptions::builder().dpi(5000).build().unwrap();
        assert_eq!(o.dpi, 600);
    }

    #[test]
    fn scale_is_dpi_over_points() {
        let o = PdfToImageOptions::default();
        assert!((o.scale() - 150.0 / 72.0).abs() < f32::EPSILON);
    }

    #[test]
    fn webp_pages_rejected() {
        let r = PdfToImageOptions::builder()
            .format(RasterFormat::Webp)
            .build();
        assert!(r.is_err());
    }

    #[test]
    fn query_format_only_recognises_jpg() {
        assert_eq!(RasterFormat::from_query(Some("jpg")), RasterFormat::Jpeg);
        assert_eq!(RasterFormat::from_query(Some("jpeg")), RasterFormat::Png);
        assert_eq!(RasterFormat::from_query(None), RasterFormat::Png);
    }

    #[test]
    fn compress_format_follows_source() {
        let o = CompressOptions::default();
        assert_eq!(o.resolve_format("image/webp"), RasterFormat::Webp);
        assert_eq!(o.resolve_format("image/png"), RasterFormat::Jpeg);
        let forced = CompressOptions {
            format: Some(RasterFormat::Webp),
            ..o
        };
        assert_eq!(forced.resolve_format("image/png"), RasterFormat::Webp);
    }

    #[test]
    fn compress_quality_bounds() {
        let mut o = CompressOptions::default();
        assert!(o.validate().is_ok());
        o.quality = 0.05;
        assert!(o.validate().is_err());
    }
}
