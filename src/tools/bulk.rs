//! Bulk image conversion: many images in, one zip archive out.
//!
//! Files are converted strictly one after another and collected into an
//! ordered list of archive entries. Two sources that map to the same entry
//! name (`photo.png` and `photo.jpg` → `photo.webp`) share one entry: the
//! later file replaces the earlier one in place. Any file that fails to
//! convert aborts the whole run and no archive is produced.

use super::blocking;
use crate::config::BulkOptions;
use crate::error::ConvertError;
use crate::output::{unix_millis, ConversionResult, OutputFile};
use crate::pipeline::encode::{decode_image, encode_image, stem_before_first_dot};
use crate::pipeline::intake::SourceFile;
use crate::progress::{percent, ProgressCallback};
use std::io::{Cursor, Write};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONVERT_FAILED: &str = "Failed to convert images.";

/// `converted_images_<millis>.zip`
pub fn archive_name(millis: u128) -> String {
    format!("converted_images_{}.zip", millis)
}

/// Archive entry name for one source file.
pub fn entry_name(source: &str, options: &BulkOptions) -> String {
    format!(
        "{}.{}",
        stem_before_first_dot(source),
        options.format.extension()
    )
}

/// Ordered archive entries with replace-on-duplicate semantics.
#[derive(Debug, Default)]
pub struct Entries(Vec<(String, Vec<u8>)>);

impl Entries {
    pub fn insert(&mut self, name: String, bytes: Vec<u8>) {
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = bytes,
            None => self.0.push((name, bytes)),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    /// Package the entries as a deflate-compressed zip.
    pub fn into_zip(self) -> Result<Vec<u8>, ConvertError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes) in self.0 {
            zip.start_file(name, options).map_err(archive_err)?;
            zip.write_all(&bytes).map_err(archive_err)?;
        }
        let cursor = zip.finish().map_err(archive_err)?;
        Ok(cursor.into_inner())
    }
}

fn archive_err(e: impl std::fmt::Display) -> ConvertError {
    ConvertError::Archive(e.to_string())
}

/// Convert every file to `options.format` and package the results.
pub async fn run(
    files: &[SourceFile],
    options: BulkOptions,
    progress: Option<ProgressCallback>,
) -> Result<ConversionResult, ConvertError> {
    if files.is_empty() {
        return Err(ConvertError::NoFiles);
    }
    let total = files.len();
    info!("Converting {} image(s) to {}", total, options.format);
    if let Some(cb) = &progress {
        cb.on_conversion_start(total);
    }

    let mut entries = Entries::default();
    for (i, file) in files.iter().enumerate() {
        if let Some(cb) = &progress {
            cb.on_item_start(i, total);
        }

        let owned = file.clone();
        let converted = blocking(move || {
            let img = decode_image(&owned)?;
            encode_image(&img, options.format, options.quality)
        })
        .await;

        let bytes = match converted {
            Ok(b) => b,
            Err(e) => {
                if let Some(cb) = &progress {
                    cb.on_item_error(i, total, &e.to_string());
                }
                return Err(ConvertError::Failed {
                    message: CONVERT_FAILED,
                    cause: Box::new(e),
                });
            }
        };

        let name = entry_name(file.name(), &options);
        debug!("{} → {} ({}%)", file.name(), name, percent(i + 1, total));
        entries.insert(name, bytes);

        if let Some(cb) = &progress {
            cb.on_item_complete(i, total, (i + 1) as f64 / total as f64);
        }
    }

    let count = entries.len();
    let archive = blocking(move || entries.into_zip())
        .await
        .map_err(|e| e.or_failed(CONVERT_FAILED))?;

    if let Some(cb) = &progress {
        cb.on_conversion_complete(total, total);
    }
    info!("Packed {} entr(ies), {} bytes", count, archive.len());

    Ok(ConversionResult::single(OutputFile::new(
        archive_name(unix_millis()),
        "application/zip",
        archive,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RasterFormat;

    #[test]
    fn entry_names_use_first_dot() {
        let webp = BulkOptions {
            format: RasterFormat::Webp,
            ..Default::default()
        };
        assert_eq!(entry_name("photo.final.png", &webp), "photo.webp");
        let jpg = BulkOptions {
            format: RasterFormat::Jpeg,
            ..Default::default()
        };
        assert_eq!(entry_name("scan.bmp", &jpg), "scan.jpg");
    }

    #[test]
    fn duplicate_entry_replaces_in_place() {
        let mut e = Entries::default();
        e.insert("a.png".into(), vec![1]);
        e.insert("b.png".into(), vec![2]);
        e.insert("a.png".into(), vec![3]);
        assert_eq!(e.names().collect::<Vec<_>>(), vec!["a.png", "b.png"]);
        assert_eq!(e.0[0].1, vec![3]);
    }

    #[tokio::test]
    async fn empty_list_is_rejected() {
        let err = run(&[], BulkOptions::default(), None).await.unwrap_err();
        assert_eq!(err.to_string(), "Please select images.");
    }

    #[test]
    fn archive_is_a_zip() {
        let mut e = Entries::default();
        e.insert("x.png".into(), b"data".to_vec());
        let bytes = e.into_zip().unwrap();
        assert!(bytes.starts_with(b"PK\x03\x04"));
        assert_eq!(archive_name(5), "converted_images_5.zip");
    }
}
