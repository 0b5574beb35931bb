//! The conversion tools.
//!
//! Each tool takes already-accepted [`SourceFile`](crate::pipeline::intake::SourceFile)s
//! plus its options and returns a [`ConversionResult`](crate::output::ConversionResult)
//! of named output buffers. Tools never write to disk themselves, with the
//! one exception of [`pdf_to_image::run_and_deliver`], which hands each page
//! to a [`Delivery`](crate::pipeline::deliver::Delivery) as soon as it exists.
//!
//! | Tool | Module |
//! |------|--------|
//! | merge, split, delete pages, rotate | [`pdf`] |
//! | PDF → images | [`pdf_to_image`] |
//! | resize, crop, compress | [`image`] |
//! | many images → zip | [`bulk`] |
//! | TXT → PDF | [`text`] |
//! | HTML → PDF | [`html`] |

pub mod bulk;
pub mod html;
pub mod image;
pub mod pdf;
pub mod pdf_to_image;
pub mod text;

use crate::error::ConvertError;

/// Run CPU-bound engine work on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ConvertError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ConvertError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ConvertError::Internal(format!("Worker task panicked: {}", e)))?
}

/// File name without its last extension, or `document` when nothing is left.
pub(crate) fn base_name(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => &name[..dot],
        _ => name,
    };
    if stem.is_empty() {
        "document".to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_strips_last_extension() {
        assert_eq!(base_name("notes.txt"), "notes");
        assert_eq!(base_name("archive.tar.gz"), "archive.tar");
        assert_eq!(base_name("README"), "README");
        assert_eq!(base_name(".txt"), "document");
        assert_eq!(base_name("trailing."), "trailing.");
        assert_eq!(base_name(""), "document");
    }
}
