//! Pipeline stages shared by every conversion tool.
//!
//! Each submodule implements exactly one step. Tools in [`crate::tools`]
//! compose them; none of the stages knows which tool is calling.
//!
//! ## Data Flow
//!
//! ```text
//! intake ──▶ (ranges) ──▶ transform ──▶ encode ──▶ deliver
//! (path/URL)  (split,      (backend /    (png/jpg/   (atomic
//!             delete)      image ops)    webp)       write)
//! ```
//!
//! 1. [`intake`] — load paths or URLs, filter by type, probe image size
//! 2. [`ranges`] — parse page-range expressions for split and delete
//! 3. [`render`] — rasterise PDF pages one at a time off the async runtime
//! 4. [`encode`] — raster encode/decode at a given quality
//! 5. [`deliver`] — write finished buffers under their output names

pub mod deliver;
pub mod encode;
pub mod intake;
pub mod ranges;
pub mod render;
