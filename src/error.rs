//! Error types for the convertkit library.
//!
//! Every failure is fatal for the invocation that raised it: there are no
//! retries and no partial-success results. Work that was already delivered
//! before the failure (earlier pages of a multi-page export, for instance)
//! stays where it is.
//!
//! Variants fall into three classes, exposed through [`ConvertError::class`]:
//!
//! * [`ErrorClass::InputRejected`] — the selected file has the wrong type or
//!   could not be read. Prior tool state is left untouched.
//! * [`ErrorClass::InvalidOptions`] — the options make the transformation
//!   impossible (empty page range, zero dimensions). Nothing was started.
//! * [`ErrorClass::TransformFailed`] — a collaborator library failed while
//!   processing.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`ConvertError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    InputRejected,
    InvalidOptions,
    TransformFailed,
}

/// All errors returned by the convertkit library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither a readable path nor an HTTP/HTTPS URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The selected file does not pass the tool's type filter.
    #[error("{message}")]
    Rejected { message: String },

    /// An image was accepted by type but its dimensions could not be read.
    #[error("Invalid image file.")]
    InvalidImage { name: String },

    // ── Option errors ─────────────────────────────────────────────────────
    /// No page expression was entered.
    #[error("Please enter page numbers to {action}.")]
    MissingPageRange { action: &'static str },

    /// The page expression resolved to no pages at all.
    #[error("Invalid page range. The document has {total} pages.")]
    InvalidRange { total: usize },

    /// The delete expression resolved to no pages at all.
    #[error("Invalid page range. Document has {total} pages.")]
    InvalidDeleteRange { total: usize },

    /// Every page of the document was selected for deletion.
    #[error("You cannot delete all pages.")]
    CannotDeleteAllPages,

    /// Merge needs at least two documents.
    #[error("Please select at least 2 PDF files to merge.")]
    NotEnoughFiles { got: usize },

    /// A multi-file tool was started with an empty list.
    #[error("Please select images.")]
    NoFiles,

    /// Resize target evaluated to zero in either direction.
    #[error("Invalid dimensions")]
    InvalidDimensions { width: u32, height: u32 },

    /// Crop selection is below the minimum display size.
    #[error("Selection too small ({w:.0}x{h:.0}); drag at least {min}x{min} pixels")]
    SelectionTooSmall { w: f64, h: f64, min: u32 },

    /// Rotation that is not a multiple of 90 degrees.
    #[error("Rotation must be a multiple of 90 degrees, got {degrees}")]
    InvalidRotation { degrees: i64 },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Transformation errors ─────────────────────────────────────────────
    /// PDF could not be parsed or written by the document model.
    #[error("{context}: {detail}")]
    Pdf { context: String, detail: String },

    /// Page rasterisation failed.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Image decoding or encoding failed.
    #[error("{context}: {source}")]
    Image {
        context: String,
        #[source]
        source: image::ImageError,
    },

    /// HTML could not be rendered.
    #[error("Could not render HTML: {0}")]
    HtmlRender(String),

    /// Archive packaging failed.
    #[error("Failed to build archive: {0}")]
    Archive(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    /// A tool-level failure carrying the message shown to the user, with the
    /// engine error that caused it.
    #[error("{message}")]
    Failed {
        message: &'static str,
        #[source]
        cause: Box<ConvertError>,
    },

    // ── Session errors ────────────────────────────────────────────────────
    /// A second transformation was requested while one is in flight.
    #[error("A conversion is already in progress")]
    AlreadyProcessing,

    /// No file has been selected yet.
    #[error("No file selected")]
    NothingSelected,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Which of the three error classes this error belongs to.
    pub fn class(&self) -> ErrorClass {
        use ConvertError::*;
        match self {
            FileNotFound { .. }
            | PermissionDenied { .. }
            | InvalidInput { .. }
            | DownloadFailed { .. }
            | DownloadTimeout { .. }
            | Rejected { .. }
            | InvalidImage { .. }
            | NothingSelected => ErrorClass::InputRejected,

            MissingPageRange { .. }
            | InvalidRange { .. }
            | InvalidDeleteRange { .. }
            | CannotDeleteAllPages
            | NotEnoughFiles { .. }
            | NoFiles
            | InvalidDimensions { .. }
            | SelectionTooSmall { .. }
            | InvalidRotation { .. }
            | InvalidConfig(_) => ErrorClass::InvalidOptions,

            Pdf { .. }
            | RasterisationFailed { .. }
            | Image { .. }
            | HtmlRender(_)
            | Archive(_)
            | PdfiumBindingFailed(_)
            | Failed { .. }
            | AlreadyProcessing
            | OutputWriteFailed { .. }
            | Internal(_) => ErrorClass::TransformFailed,
        }
    }

    pub(crate) fn pdf(context: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        ConvertError::Pdf {
            context: context.into(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn image(context: impl Into<String>, source: image::ImageError) -> Self {
        ConvertError::Image {
            context: context.into(),
            source,
        }
    }

    /// Replace a transformation failure's message with `message`.
    ///
    /// Input and option errors pass through unchanged; their text is
    /// already what the user should see.
    pub fn or_failed(self, message: &'static str) -> Self {
        match self.class() {
            ErrorClass::TransformFailed if !matches!(self, ConvertError::Failed { .. }) => {
                ConvertError::Failed {
                    message,
                    cause: Box::new(self),
                }
            }
            _ => self,
        }
    }

    pub(crate) fn rejected(message: impl Into<String>) -> Self {
        ConvertError::Rejected {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_range_names_page_count() {
        let e = ConvertError::InvalidRange { total: 7 };
        assert_eq!(e.to_string(), "Invalid page range. The document has 7 pages.");
        assert_eq!(e.class(), ErrorClass::InvalidOptions);
    }

    #[test]
    fn delete_all_is_its_own_message() {
        let all = ConvertError::CannotDeleteAllPages.to_string();
        let range = ConvertError::InvalidRange { total: 3 }.to_string();
        assert_ne!(all, range);
        assert!(all.contains("cannot delete all pages"), "got: {all}");
    }

    #[test]
    fn delete_range_wording_differs_from_split() {
        let e = ConvertError::InvalidDeleteRange { total: 3 };
        assert_eq!(e.to_string(), "Invalid page range. Document has 3 pages.");
        assert_eq!(e.class(), ErrorClass::InvalidOptions);
    }

    #[test]
    fn rejected_is_input_class() {
        let e = ConvertError::rejected("Please select a PDF file.");
        assert_eq!(e.to_string(), "Please select a PDF file.");
        assert_eq!(e.class(), ErrorClass::InputRejected);
    }

    #[test]
    fn pdf_errors_are_transform_failures() {
        let e = ConvertError::pdf("Failed to process PDF.", "bad xref");
        assert_eq!(e.class(), ErrorClass::TransformFailed);
        assert!(e.to_string().contains("bad xref"));
    }

    #[test]
    fn engine_failures_get_tool_message() {
        let e = ConvertError::pdf("Failed to load PDF", "bad xref")
            .or_failed("Failed to rotate PDF.");
        assert_eq!(e.to_string(), "Failed to rotate PDF.");
        assert!(std::error::Error::source(&e).unwrap().to_string().contains("bad xref"));

        let opt = ConvertError::CannotDeleteAllPages.or_failed("Failed to process PDF.");
        assert!(matches!(opt, ConvertError::CannotDeleteAllPages));
    }

    #[test]
    fn missing_range_mentions_action() {
        let e = ConvertError::MissingPageRange { action: "delete" };
        assert_eq!(e.to_string(), "Please enter page numbers to delete.");
    }
}
