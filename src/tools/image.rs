//! Single-image tools: resize, crop, compress.

use super::blocking;
use crate::config::{CompressOptions, RasterFormat, ResizeMode};
use crate::error::ConvertError;
use crate::output::{ConversionResult, OutputFile};
use crate::pipeline::encode::{
    decode_image, encode_image, same_format_as, stem_before_first_dot, with_extension,
};
use crate::pipeline::intake::{probe_image, ImageInfo, SourceFile};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Quality used when an image is re-encoded in its own (lossy) format.
const SAME_FORMAT_QUALITY: f32 = 0.92;

/// Selections smaller than this in either direction are ignored.
pub const MIN_SELECTION: u32 = 5;

const PROCESSING_FAILED: &str = "Processing failed.";

// ── Resize ───────────────────────────────────────────────────────────────

/// Height that keeps the natural aspect ratio for width `w`.
pub fn height_for_width(natural: ImageInfo, w: u32) -> u32 {
    if natural.width == 0 {
        return 0;
    }
    (w as f64 * natural.height as f64 / natural.width as f64).round() as u32
}

/// Width that keeps the natural aspect ratio for height `h`.
pub fn width_for_height(natural: ImageInfo, h: u32) -> u32 {
    if natural.height == 0 {
        return 0;
    }
    (h as f64 * natural.width as f64 / natural.height as f64).round() as u32
}

/// Pixel size a resize produces.
pub fn target_size(natural: ImageInfo, mode: ResizeMode) -> Result<(u32, u32), ConvertError> {
    let (width, height) = match mode {
        ResizeMode::Percentage(p) => {
            if !(1..=200).contains(&p) {
                return Err(ConvertError::InvalidConfig(format!(
                    "percentage must be 1–200, got {}",
                    p
                )));
            }
            let scale = |n: u32| (n as f64 * p as f64 / 100.0).round() as u32;
            (scale(natural.width), scale(natural.height))
        }
        ResizeMode::Dimensions { width, height } => (width, height),
    };
    if width == 0 || height == 0 {
        return Err(ConvertError::InvalidDimensions { width, height });
    }
    Ok((width, height))
}

/// `resized_<name>`, with the extension rewritten when the format falls back.
pub fn resized_name(source: &str, fell_back: bool, format: RasterFormat) -> String {
    let name = format!("resized_{}", source);
    if fell_back {
        with_extension(&name, format.extension())
    } else {
        name
    }
}

/// Scale an image to an exact pixel size, keeping its format.
pub async fn resize(file: &SourceFile, mode: ResizeMode) -> Result<ConversionResult, ConvertError> {
    let natural = probe_image(file)?;
    let (width, height) = target_size(natural, mode)?;
    info!(
        "Resizing '{}' {}x{} → {}x{}",
        file.name(),
        natural.width,
        natural.height,
        width,
        height
    );

    let (format, fell_back) = same_format_as(file.mime());
    let owned = file.clone();
    let bytes = blocking(move || {
        let img = decode_image(&owned)?;
        let out = img.resize_exact(width, height, FilterType::Triangle);
        encode_image(&out, format, SAME_FORMAT_QUALITY).map_err(|e| e.or_failed("Resize failed."))
    })
    .await
    .map_err(|e| e.or_failed(PROCESSING_FAILED))?;

    Ok(ConversionResult::single(OutputFile::new(
        resized_name(file.name(), fell_back, format),
        format.mime(),
        bytes,
    )))
}

// ── Crop ─────────────────────────────────────────────────────────────────

/// Rectangle in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Size at which the image is shown while selecting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    /// The image shown at its natural size.
    pub fn natural(info: ImageInfo) -> Self {
        Self {
            width: info.width as f64,
            height: info.height as f64,
        }
    }
}

impl Selection {
    /// Normalised rectangle between a drag start and the current pointer,
    /// with the pointer clamped to the displayed image.
    pub fn from_drag(start: (f64, f64), current: (f64, f64), displayed: DisplaySize) -> Self {
        let cx = current.0.clamp(0.0, displayed.width);
        let cy = current.1.clamp(0.0, displayed.height);
        Self {
            x: cx.min(start.0),
            y: cy.min(start.1),
            w: (cx - start.0).abs(),
            h: (cy - start.1).abs(),
        }
    }

    /// Below the minimum on either side. NaN sizes count as too small.
    pub fn is_too_small(&self) -> bool {
        let min = MIN_SELECTION as f64;
        !(self.w >= min && self.h >= min)
    }

    /// Source-pixel rectangle `(x, y, w, h)` this selection covers.
    pub fn to_source(&self, natural: ImageInfo, displayed: DisplaySize) -> (u32, u32, u32, u32) {
        let sx = natural.width as f64 / displayed.width;
        let sy = natural.height as f64 / displayed.height;
        let x = ((self.x * sx).floor().max(0.0) as u32).min(natural.width.saturating_sub(1));
        let y = ((self.y * sy).floor().max(0.0) as u32).min(natural.height.saturating_sub(1));
        let w = ((self.w * sx) as u32).clamp(1, natural.width - x);
        let h = ((self.h * sy) as u32).clamp(1, natural.height - y);
        (x, y, w, h)
    }
}

/// Cut the selected region out of an image, keeping its format.
pub async fn crop(
    file: &SourceFile,
    selection: Selection,
    displayed: DisplaySize,
) -> Result<ConversionResult, ConvertError> {
    if selection.is_too_small() {
        return Err(ConvertError::SelectionTooSmall {
            w: selection.w,
            h: selection.h,
            min: MIN_SELECTION,
        });
    }
    if displayed.width <= 0.0 || displayed.height <= 0.0 {
        return Err(ConvertError::InvalidConfig(
            "displayed size must be positive".into(),
        ));
    }

    let natural = probe_image(file)?;
    if natural.width == 0 || natural.height == 0 {
        return Err(ConvertError::InvalidImage {
            name: file.name().to_string(),
        });
    }
    let (x, y, w, h) = selection.to_source(natural, displayed);
    debug!("Crop source rect {}x{}+{}+{}", w, h, x, y);

    let (format, fell_back) = same_format_as(file.mime());
    let owned = file.clone();
    let bytes = blocking(move || {
        let img = decode_image(&owned)?;
        let out = img.crop_imm(x, y, w, h);
        encode_image(&out, format, SAME_FORMAT_QUALITY).map_err(|e| e.or_failed("Crop failed."))
    })
    .await
    .map_err(|e| e.or_failed(PROCESSING_FAILED))?;

    let name = format!("cropped_{}", file.name());
    let name = if fell_back {
        with_extension(&name, format.extension())
    } else {
        name
    };
    Ok(ConversionResult::single(OutputFile::new(
        name,
        format.mime(),
        bytes,
    )))
}

// ── Compress ─────────────────────────────────────────────────────────────

/// `compressed_<name up to first dot>.<jpg|webp>`
pub fn compressed_name(source: &str, format: RasterFormat) -> String {
    format!(
        "compressed_{}.{}",
        stem_before_first_dot(source),
        format.extension()
    )
}

/// Re-encode an image as JPEG or WEBP at the chosen quality.
pub async fn compress(
    file: &SourceFile,
    opts: CompressOptions,
) -> Result<ConversionResult, ConvertError> {
    opts.validate()?;
    let format = opts.resolve_format(file.mime());
    info!(
        "Compressing '{}' as {} at quality {:.2}",
        file.name(),
        format,
        opts.quality
    );

    let owned = file.clone();
    let quality = opts.quality;
    let bytes = blocking(move || {
        let img = decode_image(&owned)?;
        encode_image(&img, format, quality).map_err(|e| e.or_failed("Compression failed."))
    })
    .await
    .map_err(|e| e.or_failed(PROCESSING_FAILED))?;

    debug!(
        "Compressed {} → {} bytes",
        file.bytes().len(),
        bytes.len()
    );
    Ok(ConversionResult::single(OutputFile::new(
        compressed_name(file.name(), format),
        format.mime(),
        bytes,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANDSCAPE: ImageInfo = ImageInfo {
        width: 1920,
        height: 1080,
    };

    #[test]
    fn aspect_lock_rounds() {
        assert_eq!(height_for_width(LANDSCAPE, 1000), 563);
        assert_eq!(width_for_height(LANDSCAPE, 563), 1001);
    }

    #[test]
    fn percentage_target() {
        assert_eq!(
            target_size(LANDSCAPE, ResizeMode::Percentage(50)).unwrap(),
            (960, 540)
        );
        assert!(target_size(LANDSCAPE, ResizeMode::Percentage(0)).is_err());
    }

    #[test]
    fn zero_dimension_is_invalid() {
        let err = target_size(
            LANDSCAPE,
            ResizeMode::Dimensions {
                width: 0,
                height: 10,
            },
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid dimensions");
    }

    #[test]
    fn tiny_percentage_rounds_to_zero() {
        let small = ImageInfo {
            width: 10,
            height: 1,
        };
        assert!(matches!(
            target_size(small, ResizeMode::Percentage(1)),
            Err(ConvertError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn drag_is_normalised_and_clamped() {
        let shown = DisplaySize {
            width: 400.0,
            height: 300.0,
        };
        let s = Selection::from_drag((100.0, 100.0), (20.0, 500.0), shown);
        assert_eq!(
            s,
            Selection {
                x: 20.0,
                y: 100.0,
                w: 80.0,
                h: 200.0
            }
        );
    }

    #[test]
    fn selection_maps_to_source_pixels() {
        let natural = ImageInfo {
            width: 800,
            height: 600,
        };
        let shown = DisplaySize {
            width: 400.0,
            height: 300.0,
        };
        let s = Selection {
            x: 10.0,
            y: 20.0,
            w: 100.0,
            h: 50.0,
        };
        assert_eq!(s.to_source(natural, shown), (20, 40, 200, 100));
    }

    #[test]
    fn names() {
        assert_eq!(
            compressed_name("holiday.photo.png", RasterFormat::Jpeg),
            "compressed_holiday.jpg"
        );
        assert_eq!(
            resized_name("a.gif", true, RasterFormat::Png),
            "resized_a.png"
        );
        assert_eq!(
            resized_name("a.jpg", false, RasterFormat::Jpeg),
            "resized_a.jpg"
        );
    }
}
