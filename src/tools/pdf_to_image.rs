//! PDF → images: one PNG or JPEG per page.
//!
//! Pages are rendered at `dpi / 72` pixels per point, strictly one after
//! another. [`run_and_deliver`] saves each page as soon as it is encoded, so
//! when page 5 fails, pages 1–4 are already on disk.

use crate::backend::PageRasterizer;
use crate::config::{PdfToImageOptions, RasterFormat};
use crate::error::ConvertError;
use crate::output::ConversionResult;
use crate::pipeline::deliver::{Delivered, Delivery};
use crate::pipeline::intake::SourceFile;
use crate::progress::ProgressCallback;
use crate::stream::pdf_to_image_stream;
use futures::StreamExt;
use std::sync::Arc;
use tracing::info;

/// Source name with a trailing `.pdf` removed, case-insensitively.
pub fn pdf_base_name(name: &str) -> String {
    let len = name.len();
    if len >= 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".pdf") {
        name[..len - 4].to_string()
    } else {
        name.to_string()
    }
}

/// `{base}_page{n}.{ext}` for multi-page documents, `{base}.{ext}` otherwise.
pub fn page_file_name(base: &str, index: usize, total: usize, format: RasterFormat) -> String {
    if total > 1 {
        format!("{}_page{}.{}", base, index + 1, format.extension())
    } else {
        format!("{}.{}", base, format.extension())
    }
}

/// Render every page and return the encoded images.
pub async fn run(
    rasterizer: Arc<dyn PageRasterizer>,
    file: &SourceFile,
    opts: &PdfToImageOptions,
    progress: Option<ProgressCallback>,
) -> Result<ConversionResult, ConvertError> {
    let mut result = ConversionResult::default();
    drive(rasterizer, file, opts, progress, |page| {
        result.files.push(page);
        Ok(())
    })
    .await?;
    Ok(result)
}

/// Render every page, delivering each one before the next is rendered.
pub async fn run_and_deliver(
    rasterizer: Arc<dyn PageRasterizer>,
    file: &SourceFile,
    opts: &PdfToImageOptions,
    progress: Option<ProgressCallback>,
    delivery: &Delivery,
) -> Result<Vec<Delivered>, ConvertError> {
    let mut delivered = Vec::new();
    drive(rasterizer, file, opts, progress, |page| {
        delivered.push(delivery.deliver(&page)?);
        Ok(())
    })
    .await?;
    Ok(delivered)
}

async fn drive(
    rasterizer: Arc<dyn PageRasterizer>,
    file: &SourceFile,
    opts: &PdfToImageOptions,
    progress: Option<ProgressCallback>,
    mut sink: impl FnMut(crate::output::OutputFile) -> Result<(), ConvertError>,
) -> Result<(), ConvertError> {
    let (total, mut pages) = pdf_to_image_stream(rasterizer, file, opts).await?;
    if let Some(cb) = &progress {
        cb.on_conversion_start(total);
    }

    let mut index = 0;
    while let Some(page) = pages.next().await {
        if let Some(cb) = &progress {
            cb.on_item_start(index, total);
        }
        let outcome = page.and_then(&mut sink);
        match (&outcome, &progress) {
            (Ok(()), Some(cb)) => {
                cb.on_item_complete(index, total, (index + 1) as f64 / total as f64)
            }
            (Err(e), Some(cb)) => cb.on_item_error(index, total, &e.to_string()),
            _ => {}
        }
        outcome?;
        index += 1;
    }

    if let Some(cb) = &progress {
        cb.on_conversion_complete(total, index);
    }
    info!("Rasterised {} page(s)", index);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_strips_pdf_case_insensitively() {
        assert_eq!(pdf_base_name("Report.PDF"), "Report");
        assert_eq!(pdf_base_name("a.pdf.pdf"), "a.pdf");
        assert_eq!(pdf_base_name("notes.txt"), "notes.txt");
        assert_eq!(pdf_base_name("pdf"), "pdf");
    }

    #[test]
    fn page_names_depend_on_page_count() {
        assert_eq!(page_file_name("r", 0, 1, RasterFormat::Png), "r.png");
        assert_eq!(page_file_name("r", 2, 8, RasterFormat::Jpeg), "r_page3.jpg");
    }
}
