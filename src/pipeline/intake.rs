//! File intake: turn user-supplied paths or URLs into typed source files.
//!
//! A source is read fully into memory once and never mutated afterwards.
//! URL inputs are downloaded into a `TempDir` that lives as long as the
//! [`ResolvedInput`], so nothing is left behind on failure.
//!
//! Every tool declares a [`TypeFilter`]. Candidates that fail it are rejected
//! with the short message the user sees next to the action; the caller's
//! previous selection is not touched.

use crate::error::ConvertError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// A user-provided file: name, declared MIME type, and contents.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    mime: String,
    bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Build a source, deriving the MIME type from content, then extension.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime = detect_mime(&name, &bytes).to_string();
        Self { name, mime, bytes }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

// ── Type filtering ───────────────────────────────────────────────────────

/// Which files a tool accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFilter {
    /// `application/pdf` only.
    Pdf,
    /// Any `image/*`.
    AnyImage,
    /// No filtering; text and HTML intake is free-form.
    Any,
}

impl TypeFilter {
    pub fn accepts(self, file: &SourceFile) -> bool {
        match self {
            TypeFilter::Pdf => file.mime == "application/pdf",
            TypeFilter::AnyImage => file.mime.starts_with("image/"),
            TypeFilter::Any => true,
        }
    }

    /// Message shown when a single-file selection is rejected.
    pub fn reject_single(self) -> &'static str {
        match self {
            TypeFilter::Pdf => "Please select a PDF file.",
            TypeFilter::AnyImage => "Please select an image file.",
            TypeFilter::Any => "Please select a file.",
        }
    }

    /// Message shown when none of a multi-file selection qualifies.
    pub fn reject_many(self) -> &'static str {
        match self {
            TypeFilter::Pdf => "Please select PDF files.",
            TypeFilter::AnyImage => "Please select image files.",
            TypeFilter::Any => "Please select files.",
        }
    }
}

/// Accept the first candidate of a single-file selection.
pub fn accept_single(
    candidates: Vec<SourceFile>,
    filter: TypeFilter,
) -> Result<SourceFile, ConvertError> {
    let first = candidates.into_iter().next().ok_or(ConvertError::NothingSelected)?;
    if filter.accepts(&first) {
        debug!("Accepted {} ({})", first.name, first.mime);
        Ok(first)
    } else {
        Err(ConvertError::rejected(filter.reject_single()))
    }
}

/// Keep the qualifying files of a multi-file selection.
pub fn accept_many(
    candidates: Vec<SourceFile>,
    filter: TypeFilter,
) -> Result<Vec<SourceFile>, ConvertError> {
    let total = candidates.len();
    let kept: Vec<SourceFile> = candidates
        .into_iter()
        .filter(|f| filter.accepts(f))
        .collect();
    if kept.is_empty() {
        return Err(ConvertError::rejected(filter.reject_many()));
    }
    debug!("Accepted {}/{} files", kept.len(), total);
    Ok(kept)
}

/// Natural dimensions of an accepted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

/// Read image dimensions without decoding pixel data.
///
/// Image tools call this before accepting a file so that dependent options
/// (aspect-ratio lock, crop mapping) have the natural size available.
pub fn probe_image(file: &SourceFile) -> Result<ImageInfo, ConvertError> {
    let invalid = || ConvertError::InvalidImage {
        name: file.name.clone(),
    };
    let (width, height) = image::ImageReader::new(Cursor::new(&file.bytes))
        .with_guessed_format()
        .map_err(|_| invalid())?
        .into_dimensions()
        .map_err(|_| invalid())?;
    Ok(ImageInfo { width, height })
}

// ── MIME detection ───────────────────────────────────────────────────────

static HTML_SNIFF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(<!doctype\s+html|<html)").expect("static regex")
});

/// MIME type for a file, from magic bytes first and extension second.
pub fn detect_mime(name: &str, bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"%PDF") {
        return "application/pdf";
    }
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type();
    }
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("txt") => "text/plain",
        Some("html" | "htm") => "text/html",
        _ => {
            let head = &bytes[..bytes.len().min(512)];
            if HTML_SNIFF.is_match(&String::from_utf8_lossy(head)) {
                "text/html"
            } else {
                "application/octet-stream"
            }
        }
    }
}

// ── Path / URL resolution ────────────────────────────────────────────────

/// A loaded input, keeping any download directory alive.
pub struct ResolvedInput {
    pub file: SourceFile,
    /// Original URL, for URL inputs.
    pub url: Option<reqwest::Url>,
    _temp_dir: Option<TempDir>,
}

impl ResolvedInput {
    /// Value of the `format` query parameter of a URL input.
    pub fn query_format(&self) -> Option<String> {
        self.url.as_ref().and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "format")
                .map(|(_, v)| v.into_owned())
        })
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load a local path or download an HTTP(S) URL.
pub async fn load(input: &str, timeout_secs: u64) -> Result<ResolvedInput, ConvertError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        load_local(Path::new(input)).await
    }
}

/// Load several inputs in order.
pub async fn load_all(
    inputs: &[String],
    timeout_secs: u64,
) -> Result<Vec<ResolvedInput>, ConvertError> {
    let mut out = Vec::with_capacity(inputs.len());
    for input in inputs {
        out.push(load(input, timeout_secs).await?);
    }
    Ok(out)
}

async fn load_local(path: &Path) -> Result<ResolvedInput, ConvertError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => ConvertError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => ConvertError::InvalidInput {
            input: path.display().to_string(),
        },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Loaded local file: {} ({} bytes)", path.display(), bytes.len());
    Ok(ResolvedInput {
        file: SourceFile::from_bytes(name, bytes),
        url: None,
        _temp_dir: None,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ConvertError> {
    info!("Downloading: {}", url);

    let parsed = reqwest::Url::parse(url).map_err(|_| ConvertError::InvalidInput {
        input: url.to_string(),
    })?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(parsed.clone()).send().await.map_err(|e| {
        if e.is_timeout() {
            ConvertError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ConvertError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let filename = filename_from_url(&parsed);
    let temp_dir = TempDir::new().map_err(|e| ConvertError::Internal(e.to_string()))?;
    let file_path: PathBuf = temp_dir.path().join(&filename);
    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| ConvertError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded to: {}", file_path.display());

    Ok(ResolvedInput {
        file: SourceFile::from_bytes(filename, bytes.to_vec()),
        url: Some(parsed),
        _temp_dir: Some(temp_dir),
    })
}

/// Last non-empty path segment with an extension, else `download`.
fn filename_from_url(url: &reqwest::Url) -> String {
    if let Some(mut segments) = url.path_segments() {
        if let Some(last) = segments.next_back() {
            if !last.is_empty() && last.contains('.') {
                return last.to_string();
            }
        }
    }
    "download".to_string()
}
