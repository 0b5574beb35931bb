//! Page-level PDF tools: merge, split, delete pages, rotate.
//!
//! All four load their inputs through a [`PdfDocumentModel`], edit the page
//! tree, and save a single new PDF. The work runs on the blocking pool.

use super::blocking;
use crate::backend::PdfDocumentModel;
use crate::config::RotateOptions;
use crate::error::ConvertError;
use crate::output::{unix_millis, ConversionResult, OutputFile};
use crate::pipeline::intake::SourceFile;
use crate::pipeline::ranges;
use tracing::info;

const MERGE_FAILED: &str = "Failed to merge PDFs. One of the files might be corrupted.";
const PROCESS_FAILED: &str = "Failed to process PDF.";
const ROTATE_FAILED: &str = "Failed to rotate PDF.";

/// `merged_<millis>.pdf`
pub fn merged_name(millis: u128) -> String {
    format!("merged_{}.pdf", millis)
}

/// `split_<name>.pdf`, with the first `.pdf` of the source name removed.
pub fn split_name(source: &str) -> String {
    format!("split_{}.pdf", source.replacen(".pdf", "", 1))
}

pub fn deleted_name(source: &str) -> String {
    format!("deleted_pages_{}", source)
}

pub fn rotated_name(source: &str) -> String {
    format!("rotated_{}", source)
}

/// Concatenate two or more PDFs in the given order.
pub async fn merge<M: PdfDocumentModel>(
    model: &M,
    files: &[SourceFile],
) -> Result<ConversionResult, ConvertError> {
    if files.len() < 2 {
        return Err(ConvertError::NotEnoughFiles { got: files.len() });
    }
    info!("Merging {} PDFs", files.len());

    let model = model.clone();
    let inputs: Vec<Vec<u8>> = files.iter().map(|f| f.bytes().to_vec()).collect();
    let bytes = blocking(move || {
        let docs = inputs
            .iter()
            .map(|b| model.load(b))
            .collect::<Result<Vec<_>, _>>()?;
        let merged = model.merge(docs)?;
        model.save(merged)
    })
    .await
    .map_err(|e| e.or_failed(MERGE_FAILED))?;

    Ok(ConversionResult::single(OutputFile::pdf(
        merged_name(unix_millis()),
        bytes,
    )))
}

/// Extract the pages named by `expr` into a new PDF.
pub async fn split<M: PdfDocumentModel>(
    model: &M,
    file: &SourceFile,
    expr: &str,
) -> Result<ConversionResult, ConvertError> {
    if expr.trim().is_empty() {
        return Err(ConvertError::MissingPageRange { action: "extract" });
    }
    let model = model.clone();
    let input = file.bytes().to_vec();
    let expr = expr.to_string();
    let bytes = blocking(move || {
        let doc = model.load(&input)?;
        let pages = ranges::select_pages(&expr, model.page_count(&doc))?;
        info!("Extracting {} page(s)", pages.len());
        let out = model.select_pages(&doc, &pages)?;
        model.save(out)
    })
    .await
    .map_err(|e| e.or_failed(PROCESS_FAILED))?;

    Ok(ConversionResult::single(OutputFile::pdf(
        split_name(file.name()),
        bytes,
    )))
}

/// Remove the pages named by `expr`; at least one page must remain.
pub async fn delete_pages<M: PdfDocumentModel>(
    model: &M,
    file: &SourceFile,
    expr: &str,
) -> Result<ConversionResult, ConvertError> {
    if expr.trim().is_empty() {
        return Err(ConvertError::MissingPageRange { action: "delete" });
    }
    let model = model.clone();
    let input = file.bytes().to_vec();
    let expr = expr.to_string();
    let bytes = blocking(move || {
        let doc = model.load(&input)?;
        let total = model.page_count(&doc);
        let keep = ranges::pages_to_keep(&expr, total)?;
        info!("Deleting {} of {} page(s)", total - keep.len(), total);
        let out = model.select_pages(&doc, &keep)?;
        model.save(out)
    })
    .await
    .map_err(|e| e.or_failed(PROCESS_FAILED))?;

    Ok(ConversionResult::single(OutputFile::pdf(
        deleted_name(file.name()),
        bytes,
    )))
}

/// Add `opts.degrees` clockwise to every page's existing rotation.
pub async fn rotate<M: PdfDocumentModel>(
    model: &M,
    file: &SourceFile,
    opts: RotateOptions,
) -> Result<ConversionResult, ConvertError> {
    if opts.degrees % 90 != 0 {
        return Err(ConvertError::InvalidRotation {
            degrees: opts.degrees,
        });
    }
    let model = model.clone();
    let input = file.bytes().to_vec();
    let bytes = blocking(move || {
        let mut doc = model.load(&input)?;
        model.rotate_all(&mut doc, opts.degrees)?;
        model.save(doc)
    })
    .await
    .map_err(|e| e.or_failed(ROTATE_FAILED))?;

    Ok(ConversionResult::single(OutputFile::pdf(
        rotated_name(file.name()),
        bytes,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names() {
        assert_eq!(merged_name(1700000000000), "merged_1700000000000.pdf");
        assert_eq!(split_name("report.pdf"), "split_report.pdf");
        assert_eq!(split_name("a.pdf.pdf"), "split_a.pdf.pdf");
        assert_eq!(split_name("Scan.PDF"), "split_Scan.PDF.pdf");
        assert_eq!(deleted_name("r.pdf"), "deleted_pages_r.pdf");
        assert_eq!(rotated_name("r.pdf"), "rotated_r.pdf");
    }
}
