//! # convertkit
//!
//! Local file conversion: PDF pages to images, PDF merge / split / delete /
//! rotate, image resize / crop / compress, bulk image conversion into a zip,
//! and plain text or HTML to PDF.
//!
//! Everything runs in-process. Files are read once, transformed in memory by
//! an engine library (`lopdf`, `pdfium-render`, `image`, `zip`, headless
//! Chrome for HTML) and handed back as named byte buffers ready to be saved.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file / URL
//!  │
//!  ├─ 1. Intake   load bytes, sniff MIME, apply the tool's type filter
//!  ├─ 2. Options  page ranges, formats, dimensions, quality
//!  ├─ 3. Engine   CPU-bound work on the blocking pool (spawn_blocking)
//!  ├─ 4. Encode   PNG / JPEG / WEBP / PDF / ZIP bytes + output name
//!  └─ 5. Deliver  atomic write into the output directory
//! ```
//!
//! Each tool runs one invocation at a time ([`ToolSession`]) and every failure
//! is fatal for that invocation ([`ConvertError`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use convertkit::backend::LopdfModel;
//! use convertkit::pipeline::deliver::Delivery;
//! use convertkit::pipeline::intake::SourceFile;
//! use convertkit::tools::pdf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let file = SourceFile::from_bytes("report.pdf", std::fs::read("report.pdf")?);
//!     let result = pdf::split(&LopdfModel, &file, "1-3, 7").await?;
//!     Delivery::new("out").deliver_all(&result)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `convertkit` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `html`  | on      | `ChromeRasterizer` for HTML → PDF via a headless Chrome |
//!
//! Disable both when using only the library:
//! ```toml
//! convertkit = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime libraries
//!
//! PDF → image needs a pdfium shared library at run time. It is looked up in
//! `PDFIUM_LIB_PATH`, then `<cache_dir>/convertkit/`, then the working
//! directory, then the system library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod preferences;
pub mod progress;
pub mod status;
pub mod stream;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    BulkOptions, CompressOptions, PdfToImageOptions, PdfToImageOptionsBuilder, RasterFormat,
    ResizeMode, RotateOptions,
};
pub use error::{ConvertError, ErrorClass};
pub use output::{ConversionResult, OutputFile};
pub use preferences::{Preferences, Theme};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use status::{InFlight, Status, ToolSession};
pub use stream::{pdf_to_image_stream, PageStream};
