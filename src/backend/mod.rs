//! Engines behind the tools, each reached through a narrow capability trait.
//!
//! | Trait | Default implementation | Engine |
//! |-------|------------------------|--------|
//! | [`PdfDocumentModel`] | [`LopdfModel`] | `lopdf` |
//! | [`PageRasterizer`]   | [`PdfiumRasterizer`] | `pdfium-render` |
//! | [`HtmlRasterizer`]   | `ChromeRasterizer` (feature `html`) | `chromiumoxide` |
//!
//! PDF authoring (text pages, image pages) has a single implementation in
//! [`authoring`] and is not abstracted.
//!
//! Tests substitute in-memory fakes for the two rasterisers so neither
//! libpdfium nor a Chrome binary is needed to exercise the tools.

pub mod authoring;
#[cfg(feature = "html")]
pub mod chrome;
pub mod lopdf_model;
pub mod pdfium;

use crate::error::ConvertError;
use image::{DynamicImage, RgbaImage};
use std::future::Future;

#[cfg(feature = "html")]
pub use chrome::ChromeRasterizer;
pub use lopdf_model::LopdfModel;
pub use pdfium::PdfiumRasterizer;

/// Structural PDF operations: load, count, select, merge, rotate, save.
///
/// Every method is blocking; callers run them on a blocking thread.
pub trait PdfDocumentModel: Send + Sync + Clone + 'static {
    /// An opened, mutable document.
    type Handle: Send + 'static;

    fn load(&self, bytes: &[u8]) -> Result<Self::Handle, ConvertError>;

    fn page_count(&self, doc: &Self::Handle) -> usize;

    /// New document holding the given zero-based pages in ascending order.
    fn select_pages(
        &self,
        doc: &Self::Handle,
        pages: &[usize],
    ) -> Result<Self::Handle, ConvertError>;

    /// Concatenate documents: file order first, then page order.
    fn merge(&self, docs: Vec<Self::Handle>) -> Result<Self::Handle, ConvertError>;

    /// Add `delta` degrees to every page's rotation, normalised to `[0, 360)`.
    fn rotate_all(&self, doc: &mut Self::Handle, delta: i64) -> Result<(), ConvertError>;

    /// Effective rotation of one page, in degrees.
    fn rotation(&self, doc: &Self::Handle, index: usize) -> Result<i64, ConvertError>;

    fn save(&self, doc: Self::Handle) -> Result<Vec<u8>, ConvertError>;
}

/// Renders PDF pages to bitmaps.
///
/// Blocking; one page at a time.
pub trait PageRasterizer: Send + Sync + 'static {
    fn page_count(&self, pdf: &[u8]) -> Result<usize, ConvertError>;

    /// Render page `index` (zero-based) at `scale` pixels per PDF point.
    fn render_page(&self, pdf: &[u8], index: usize, scale: f32)
        -> Result<DynamicImage, ConvertError>;
}

/// Logical viewport an HTML document is laid out in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    /// Device pixels per CSS pixel.
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            scale: 2.0,
        }
    }
}

/// Lays out an HTML document and captures its full height as one bitmap.
pub trait HtmlRasterizer: Send + Sync {
    fn rasterize(
        &self,
        html: &str,
        viewport: Viewport,
    ) -> impl Future<Output = Result<RgbaImage, ConvertError>> + Send;
}
