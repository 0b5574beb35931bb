//! Delivery: hand finished buffers to the user as named files.
//!
//! A buffer is written into a temporary file next to its destination and then
//! persisted under the final name, so a half-written output never appears
//! under the real filename. The temporary handle is released once the rename
//! completes and removed automatically if anything fails before that.

use crate::error::ConvertError;
use crate::output::{ConversionResult, OutputFile};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Saves output files into one directory.
#[derive(Debug, Clone)]
pub struct Delivery {
    dir: PathBuf,
}

/// Where a delivered file ended up.
#[derive(Debug, Clone, Serialize)]
pub struct Delivered {
    pub name: String,
    pub path: PathBuf,
    pub bytes: usize,
}

impl Delivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save one file, replacing any existing file of the same name.
    pub fn deliver(&self, file: &OutputFile) -> Result<Delivered, ConvertError> {
        let target = self.dir.join(sanitize_name(&file.name));
        let write_err = |source| ConvertError::OutputWriteFailed {
            path: target.clone(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(write_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        tmp.write_all(&file.bytes).map_err(write_err)?;
        tmp.flush().map_err(write_err)?;
        tmp.persist(&target).map_err(|e| write_err(e.error))?;

        debug!("Delivered {} ({} bytes)", target.display(), file.bytes.len());
        Ok(Delivered {
            name: file.name.clone(),
            path: target,
            bytes: file.bytes.len(),
        })
    }

    /// Save every file of a result, in order.
    pub fn deliver_all(&self, result: &ConversionResult) -> Result<Vec<Delivered>, ConvertError> {
        let delivered = result
            .files
            .iter()
            .map(|f| self.deliver(f))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            "Delivered {} file(s) to {}",
            delivered.len(),
            self.dir.display()
        );
        Ok(delivered)
    }
}

/// Keep only the final path component; output names come from user files.
fn sanitize_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base {
        "" | "." | ".." => "output".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let d = Delivery::new(dir.path());
        let out = d
            .deliver(&OutputFile::pdf("split_a.pdf", b"%PDF-1.7".to_vec()))
            .unwrap();
        assert_eq!(out.path, dir.path().join("split_a.pdf"));
        assert_eq!(std::fs::read(&out.path).unwrap(), b"%PDF-1.7");
    }

    #[test]
    fn leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let d = Delivery::new(dir.path());
        let result = ConversionResult {
            files: vec![
                OutputFile::new("a.png", "image/png", vec![1]),
                OutputFile::new("b.png", "image/png", vec![2]),
            ],
        };
        d.deliver_all(&result).unwrap();
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.png", "b.png"]);
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let d = Delivery::new(dir.path().join("nested/out"));
        d.deliver(&OutputFile::pdf("x.pdf", vec![])).unwrap();
        assert!(dir.path().join("nested/out/x.pdf").exists());
    }

    #[test]
    fn names_cannot_escape_directory() {
        assert_eq!(sanitize_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_name(".."), "output");
        assert_eq!(sanitize_name("rotated_a.pdf"), "rotated_a.pdf");
    }
}
