//! HTML rasterisation through a headless Chrome (`chromiumoxide`).
//!
//! A browser is launched per document and closed again whether or not the
//! capture succeeded. The document is loaded with `set_content`; if the load
//! event has not fired within the fallback timeout, rendering proceeds with
//! whatever has been laid out so far.

use super::{HtmlRasterizer, Viewport};
use crate::error::ConvertError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, Viewport as ClipRect,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use image::{ImageFormat, RgbaImage};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

const CONTENT_HEIGHT_JS: &str = "Math.max(\
    document.documentElement ? document.documentElement.scrollHeight : 0, \
    document.body ? document.body.scrollHeight : 0)";

/// [`HtmlRasterizer`] driving a local Chrome/Chromium.
#[derive(Debug, Clone)]
pub struct ChromeRasterizer {
    /// Upper bound on waiting for the load event.
    pub load_timeout: Duration,
    /// Browser binary; auto-detected when `None`.
    pub executable: Option<PathBuf>,
    /// Pass `--no-sandbox` (needed when running as root in containers).
    pub no_sandbox: bool,
}

impl Default for ChromeRasterizer {
    fn default() -> Self {
        Self {
            load_timeout: Duration::from_secs(2),
            executable: None,
            no_sandbox: false,
        }
    }
}

fn render_err(e: impl std::fmt::Display) -> ConvertError {
    ConvertError::HtmlRender(e.to_string())
}

impl ChromeRasterizer {
    fn browser_config(&self, viewport: Viewport) -> Result<BrowserConfig, ConvertError> {
        let mut builder = BrowserConfig::builder()
            .window_size(viewport.width, viewport.height)
            .arg("--hide-scrollbars");
        if let Some(exe) = &self.executable {
            builder = builder.chrome_executable(exe);
        }
        if self.no_sandbox {
            builder = builder.no_sandbox();
        }
        builder.build().map_err(render_err)
    }

    async fn capture(
        &self,
        browser: &Browser,
        html: &str,
        viewport: Viewport,
    ) -> Result<RgbaImage, ConvertError> {
        let page = browser.new_page("about:blank").await.map_err(render_err)?;
        page.execute(SetDeviceMetricsOverrideParams::new(
            viewport.width as i64,
            viewport.height as i64,
            viewport.scale,
            false,
        ))
        .await
        .map_err(render_err)?;

        page.set_content(html).await.map_err(render_err)?;
        if tokio::time::timeout(self.load_timeout, page.wait_for_navigation())
            .await
            .is_err()
        {
            warn!(
                "HTML load event not seen after {:?}; capturing anyway",
                self.load_timeout
            );
        }

        let png = screenshot(&page, viewport).await;
        let _ = page.close().await;
        let png = png?;

        let img = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .map_err(|e| ConvertError::image("Failed to decode page capture", e))?
            .to_rgba8();
        debug!("Captured HTML → {}x{} px", img.width(), img.height());
        Ok(img)
    }
}

async fn screenshot(page: &Page, viewport: Viewport) -> Result<Vec<u8>, ConvertError> {
    let height: f64 = page
        .evaluate(CONTENT_HEIGHT_JS)
        .await
        .map_err(render_err)?
        .into_value()
        .map_err(render_err)?;
    let height = height.max(1.0);

    let params = ScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .clip(ClipRect {
            x: 0.0,
            y: 0.0,
            width: viewport.width as f64,
            height,
            scale: 1.0,
        })
        .capture_beyond_viewport(true)
        .build();
    page.screenshot(params).await.map_err(render_err)
}

impl HtmlRasterizer for ChromeRasterizer {
    async fn rasterize(&self, html: &str, viewport: Viewport) -> Result<RgbaImage, ConvertError> {
        info!("Launching headless browser");
        let (mut browser, mut handler) = Browser::launch(self.browser_config(viewport)?)
            .await
            .map_err(render_err)?;

        let events = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let result = self.capture(&browser, html, viewport).await;

        if let Err(e) = browser.close().await {
            debug!("Browser close: {}", e);
        }
        let _ = browser.wait().await;
        events.abort();

        result
    }
}
