//! Raster encoding and decoding.
//!
//! Every tool that produces an image goes through [`encode_image`]; every tool
//! that reads one goes through [`decode_image`]. Quality is expressed the way
//! the option controls express it, as a fraction in `(0, 1]`.
//!
//! WEBP output is lossless: the `image` crate ships no lossy WEBP encoder, so
//! the quality argument has no effect for that format.

use crate::config::RasterFormat;
use crate::error::ConvertError;
use crate::pipeline::intake::SourceFile;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// Decode an accepted image file.
pub fn decode_image(file: &SourceFile) -> Result<DynamicImage, ConvertError> {
    image::ImageReader::new(Cursor::new(file.bytes()))
        .with_guessed_format()
        .map_err(|_| ConvertError::InvalidImage {
            name: file.name().to_string(),
        })?
        .decode()
        .map_err(|e| ConvertError::image(format!("Failed to decode '{}'", file.name()), e))
}

/// Encode `img` in `format`. `quality` applies to JPEG only.
pub fn encode_image(
    img: &DynamicImage,
    format: RasterFormat,
    quality: f32,
) -> Result<Vec<u8>, ConvertError> {
    let mut buf = Vec::new();
    match format {
        RasterFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map_err(|e| ConvertError::image("Failed to encode PNG", e))?;
        }
        RasterFormat::Jpeg => {
            let rgb = flatten_on_white(img);
            let encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality(quality));
            DynamicImage::ImageRgb8(rgb)
                .write_with_encoder(encoder)
                .map_err(|e| ConvertError::image("Failed to encode JPEG", e))?;
        }
        RasterFormat::Webp => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_with_encoder(WebPEncoder::new_lossless(&mut buf))
                .map_err(|e| ConvertError::image("Failed to encode WEBP", e))?;
        }
    }
    debug!(
        "Encoded {}x{} → {} bytes {}",
        img.width(),
        img.height(),
        buf.len(),
        format
    );
    Ok(buf)
}

/// Map a `(0, 1]` quality onto the JPEG encoder's 1–100 scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Composite transparent pixels over white; JPEG has no alpha channel.
pub fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let a = px[3] as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    out
}

/// Format used when re-encoding a source "in its own format".
///
/// Sources the encoder cannot write (GIF, BMP, ...) fall back to PNG, and the
/// returned flag says the file extension has to change with it.
pub fn same_format_as(source_mime: &str) -> (RasterFormat, bool) {
    match RasterFormat::from_mime(source_mime) {
        Some(f) => (f, false),
        None => (RasterFormat::Png, true),
    }
}

/// Replace the extension of `name` (or append one).
pub fn with_extension(name: &str, ext: &str) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}.{}", &name[..dot], ext),
        _ => format!("{}.{}", name, ext),
    }
}

/// Name up to the first `.`, as used for re-encoded outputs.
pub fn stem_before_first_dot(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn encode_small_image_in_every_format() {
        let img = red_square();
        let png = encode_image(&img, RasterFormat::Png, 1.0).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
        let jpg = encode_image(&img, RasterFormat::Jpeg, 0.92).unwrap();
        assert_eq!(image::guess_format(&jpg).unwrap(), ImageFormat::Jpeg);
        let webp = encode_image(&img, RasterFormat::Webp, 0.8).unwrap();
        assert_eq!(image::guess_format(&webp).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn lower_jpeg_quality_is_smaller() {
        let mut noisy = RgbaImage::new(64, 64);
        for (x, y, px) in noisy.enumerate_pixels_mut() {
            *px = Rgba([(x * 37 % 256) as u8, (y * 91 % 256) as u8, ((x ^ y) * 13 % 256) as u8, 255]);
        }
        let img = DynamicImage::ImageRgba8(noisy);
        let hi = encode_image(&img, RasterFormat::Jpeg, 1.0).unwrap();
        let lo = encode_image(&img, RasterFormat::Jpeg, 0.1).unwrap();
        assert!(lo.len() < hi.len());
    }

    #[test]
    fn transparent_pixels_become_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])));
        assert_eq!(flatten_on_white(&img).get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn quality_mapping() {
        assert_eq!(jpeg_quality(0.92), 92);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(2.0), 100);
    }

    #[test]
    fn unsupported_sources_fall_back_to_png() {
        assert_eq!(same_format_as("image/webp"), (RasterFormat::Webp, false));
        assert_eq!(same_format_as("image/gif"), (RasterFormat::Png, true));
    }

    #[test]
    fn name_helpers() {
        assert_eq!(with_extension("anim.gif", "png"), "anim.png");
        assert_eq!(with_extension("noext", "png"), "noext.png");
        assert_eq!(stem_before_first_dot("photo.final.png"), "photo");
    }
}
