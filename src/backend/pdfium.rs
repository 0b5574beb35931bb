//! Page rasterisation through pdfium.
//!
//! The library is bound at runtime. Lookup order:
//!
//! 1. `PDFIUM_LIB_PATH`, if it names an existing file
//! 2. `<cache_dir>/convertkit/` and the current directory
//! 3. the system library search path
//!
//! A fresh binding is made per call. pdfium keeps global state and the
//! `thread_safe` feature serialises access to it, so calls from the blocking
//! pool never overlap inside the library.

use super::PageRasterizer;
use crate::error::ConvertError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// [`PageRasterizer`] backed by libpdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    /// Explicit library path; skips the lookup when set.
    library: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library: Some(path.into()),
        }
    }

    /// Check that a library can be bound at all.
    pub fn probe(&self) -> Result<(), ConvertError> {
        self.bind().map(|_| ())
    }

    fn bind(&self) -> Result<Pdfium, ConvertError> {
        for dir in self.candidates() {
            let path = if dir.is_file() {
                dir
            } else {
                Pdfium::pdfium_platform_library_name_at_path(&dir)
            };
            if !path.exists() {
                continue;
            }
            match Pdfium::bind_to_library(&path) {
                Ok(bindings) => {
                    debug!("Bound pdfium from {}", path.display());
                    return Ok(Pdfium::new(bindings));
                }
                Err(e) => debug!("pdfium at {} unusable: {}", path.display(), e),
            }
        }
        Pdfium::bind_to_system_library()
            .map(Pdfium::new)
            .map_err(|e| ConvertError::PdfiumBindingFailed(e.to_string()))
    }

    fn candidates(&self) -> Vec<PathBuf> {
        if let Some(p) = &self.library {
            return vec![p.clone()];
        }
        let mut out = Vec::new();
        if let Ok(p) = std::env::var("PDFIUM_LIB_PATH") {
            out.push(PathBuf::from(p));
        }
        if let Some(cache) = dirs::cache_dir() {
            out.push(cache.join("convertkit"));
        }
        out.push(PathBuf::from("./"));
        out
    }
}

fn open_error(e: PdfiumError) -> ConvertError {
    ConvertError::pdf("Failed to open PDF", format!("{:?}", e))
}

impl PageRasterizer for PdfiumRasterizer {
    fn page_count(&self, pdf: &[u8]) -> Result<usize, ConvertError> {
        let pdfium = self.bind()?;
        let document = pdfium.load_pdf_from_byte_slice(pdf, None).map_err(open_error)?;
        Ok(document.pages().len() as usize)
    }

    fn render_page(
        &self,
        pdf: &[u8],
        index: usize,
        scale: f32,
    ) -> Result<DynamicImage, ConvertError> {
        let pdfium = self.bind()?;
        let document = pdfium.load_pdf_from_byte_slice(pdf, None).map_err(open_error)?;

        let raster_err = |e: PdfiumError| ConvertError::RasterisationFailed {
            page: index + 1,
            detail: format!("{:?}", e),
        };

        let page = document.pages().get(index as u16).map_err(raster_err)?;
        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = page.render_with_config(&config).map_err(raster_err)?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_library_is_the_only_candidate() {
        let r = PdfiumRasterizer::with_library("/opt/pdfium/libpdfium.so");
        assert_eq!(
            r.candidates(),
            vec![PathBuf::from("/opt/pdfium/libpdfium.so")]
        );
    }

    #[test]
    fn default_lookup_ends_in_working_directory() {
        let r = PdfiumRasterizer::new();
        assert_eq!(r.candidates().last(), Some(&PathBuf::from("./")));
    }
}
