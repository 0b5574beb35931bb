//! Streaming PDF → image API: emit page images as they are encoded.
//!
//! Large documents at 600 DPI take a while. [`pdf_to_image_stream`] yields one
//! [`OutputFile`] per page, in page order, as soon as that page has been
//! rendered and encoded, so callers can save or display pages incrementally
//! instead of holding the whole document in memory.
//!
//! The stream ends after the first error; pages yielded before it are valid.

use crate::backend::PageRasterizer;
use crate::config::PdfToImageOptions;
use crate::error::ConvertError;
use crate::output::OutputFile;
use crate::pipeline::encode::encode_image;
use crate::pipeline::intake::SourceFile;
use crate::pipeline::render::RenderJob;
use crate::tools::blocking;
use crate::tools::pdf_to_image::{page_file_name, pdf_base_name};
use futures::stream;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of page images.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<OutputFile, ConvertError>> + Send>>;

/// Rasterise every page of `file`, yielding each encoded page in order.
///
/// # Returns
/// - `Ok((page_count, PageStream))` once the document has been opened
/// - `Err(ConvertError)` if the document cannot be opened at all
///
/// # Example
/// ```rust,no_run
/// use convertkit::backend::PdfiumRasterizer;
/// use convertkit::pipeline::intake::SourceFile;
/// use convertkit::{pdf_to_image_stream, PdfToImageOptions};
/// use futures::StreamExt;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let file = SourceFile::from_bytes("report.pdf", std::fs::read("report.pdf")?);
/// let opts = PdfToImageOptions::default();
/// let (pages, mut stream) =
///     pdf_to_image_stream(Arc::new(PdfiumRasterizer::new()), &file, &opts).await?;
/// println!("{pages} pages");
/// while let Some(page) = stream.next().await {
///     let page = page?;
///     std::fs::write(&page.name, &page.bytes)?;
/// }
/// # Ok(())
/// # }
/// ```
pub async fn pdf_to_image_stream(
    rasterizer: Arc<dyn PageRasterizer>,
    file: &SourceFile,
    opts: &PdfToImageOptions,
) -> Result<(usize, PageStream), ConvertError> {
    let job = RenderJob::new(rasterizer, file.bytes().to_vec());
    let total = job.page_count().await?;
    info!(
        "Rasterising {} page(s) of '{}' at {} DPI as {}",
        total,
        file.name(),
        opts.dpi,
        opts.format
    );

    let base = pdf_base_name(file.name());
    let opts = opts.clone();

    struct State {
        job: RenderJob,
        next: usize,
        failed: bool,
    }

    let state = State {
        job,
        next: 0,
        failed: false,
    };

    let pages = stream::unfold(state, move |mut st| {
        let base = base.clone();
        let opts = opts.clone();
        async move {
            if st.failed || st.next >= total {
                return None;
            }
            let index = st.next;
            st.next += 1;

            let result = render_one(&st.job, index, total, &base, &opts).await;
            st.failed = result.is_err();
            Some((result, st))
        }
    });

    Ok((total, Box::pin(pages)))
}

async fn render_one(
    job: &RenderJob,
    index: usize,
    total: usize,
    base: &str,
    opts: &PdfToImageOptions,
) -> Result<OutputFile, ConvertError> {
    let image = job.render_page(index, opts.scale()).await?;
    let (format, quality) = (opts.format, opts.jpeg_quality);
    let bytes = blocking(move || encode_image(&image, format, quality)).await?;
    Ok(OutputFile::new(
        page_file_name(base, index, total, format),
        format.mime(),
        bytes,
    ))
}
