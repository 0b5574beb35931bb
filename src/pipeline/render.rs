//! PDF rasterisation: render pages one at a time off the async runtime.
//!
//! The rasteriser is a blocking engine, so every call is moved onto the
//! blocking pool with `tokio::task::spawn_blocking`. Pages are rendered in
//! order and each one is awaited before the next starts; callers get a page
//! as soon as it exists instead of after the whole document.

use crate::backend::PageRasterizer;
use crate::error::ConvertError;
use image::DynamicImage;
use std::sync::Arc;
use tracing::debug;

/// A PDF held in memory together with the engine that rasterises it.
#[derive(Clone)]
pub struct RenderJob {
    rasterizer: Arc<dyn PageRasterizer>,
    pdf: Arc<[u8]>,
}

impl RenderJob {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, pdf: impl Into<Arc<[u8]>>) -> Self {
        Self {
            rasterizer,
            pdf: pdf.into(),
        }
    }

    pub async fn page_count(&self) -> Result<usize, ConvertError> {
        let job = self.clone();
        tokio::task::spawn_blocking(move || job.rasterizer.page_count(&job.pdf))
            .await
            .map_err(|e| ConvertError::Internal(format!("Render task panicked: {}", e)))?
    }

    /// Render one zero-based page at `scale` pixels per point.
    pub async fn render_page(&self, index: usize, scale: f32) -> Result<DynamicImage, ConvertError> {
        let job = self.clone();
        let image = tokio::task::spawn_blocking(move || {
            job.rasterizer.render_page(&job.pdf, index, scale)
        })
        .await
        .map_err(|e| ConvertError::Internal(format!("Render task panicked: {}", e)))??;
        debug!(
            "Page {} rendered at {:.2}x → {}x{}",
            index + 1,
            scale,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    struct Blank;

    impl PageRasterizer for Blank {
        fn page_count(&self, _pdf: &[u8]) -> Result<usize, ConvertError> {
            Ok(3)
        }

        fn render_page(
            &self,
            _pdf: &[u8],
            index: usize,
            scale: f32,
        ) -> Result<DynamicImage, ConvertError> {
            if index >= 3 {
                return Err(ConvertError::RasterisationFailed {
                    page: index + 1,
                    detail: "no such page".into(),
                });
            }
            let side = (72.0 * scale).round() as u32;
            Ok(DynamicImage::ImageRgb8(RgbImage::new(side, side)))
        }
    }

    #[tokio::test]
    async fn renders_at_requested_scale() {
        let job = RenderJob::new(Arc::new(Blank), b"%PDF".to_vec());
        assert_eq!(job.page_count().await.unwrap(), 3);
        let img = job.render_page(0, 2.0).await.unwrap();
        assert_eq!(img.width(), 144);
    }

    #[tokio::test]
    async fn engine_errors_propagate() {
        let job = RenderJob::new(Arc::new(Blank), b"%PDF".to_vec());
        assert!(matches!(
            job.render_page(7, 1.0).await,
            Err(ConvertError::RasterisationFailed { page: 8, .. })
        ));
    }
}
