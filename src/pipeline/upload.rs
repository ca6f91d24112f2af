//! Uploaded documents and their short-lived on-disk copies.

use crate::error::SyllabusError;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// One uploaded document, held in memory until it is staged to disk.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
    /// Lowercased text after the last `.` of `filename`; empty when there is none.
    pub extension: String,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let extension = extension_of(&filename);
        Self {
            bytes,
            filename,
            extension,
        }
    }
}

fn extension_of(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// A staged upload. The file is deleted by [`cleanup`](Self::cleanup), or on drop.
#[derive(Debug)]
pub struct TempUpload {
    file: NamedTempFile,
}

impl TempUpload {
    /// Write `doc` to a new temp file named `syllabus-*.<extension>`.
    ///
    /// `dir` of None uses the OS temp directory.
    pub fn persist(doc: &UploadedDocument, dir: Option<&Path>) -> Result<Self, SyllabusError> {
        let suffix = if doc.extension.is_empty() {
            String::new()
        } else {
            format!(".{}", doc.extension)
        };

        let mut builder = tempfile::Builder::new();
        builder.prefix("syllabus-").suffix(&suffix);
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|source| SyllabusError::TempStorage { source })?;

        file.write_all(&doc.bytes)
            .and_then(|_| file.flush())
            .map_err(|source| SyllabusError::TempStorage { source })?;

        debug!(
            "Staged {} ({} bytes) at {}",
            doc.filename,
            doc.bytes.len(),
            file.path().display()
        );
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the staged file. Failures are logged, never returned.
    pub fn cleanup(self) {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => debug!("Removed temp file {}", path.display()),
            Err(e) => warn!("Failed to remove temp file {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased_suffix_after_last_dot() {
        assert_eq!(UploadedDocument::new("Syllabus.PDF", vec![]).extension, "pdf");
        assert_eq!(UploadedDocument::new("a.tar.gz", vec![]).extension, "gz");
        assert_eq!(UploadedDocument::new("README", vec![]).extension, "");
        assert_eq!(UploadedDocument::new("trailing.", vec![]).extension, "");
    }

    #[test]
    fn persist_then_cleanup_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let doc = UploadedDocument::new("notes.txt", b"Course: CS101".to_vec());

        let staged = TempUpload::persist(&doc, Some(dir.path())).unwrap();
        let path = staged.path().to_path_buf();
        assert_eq!(path.extension().unwrap(), "txt");
        assert_eq!(std::fs::read(&path).unwrap(), b"Course: CS101");

        staged.cleanup();
        assert!(!path.exists());
    }

    #[test]
    fn drop_also_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let doc = UploadedDocument::new("scan.png", vec![1, 2, 3]);
        let path = {
            let staged = TempUpload::persist(&doc, Some(dir.path())).unwrap();
            staged.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn missing_dir_is_temp_storage_error() {
        let doc = UploadedDocument::new("a.txt", vec![]);
        let err = TempUpload::persist(&doc, Some(Path::new("/no/such/dir"))).unwrap_err();
        assert!(matches!(err, SyllabusError::TempStorage { .. }));
    }
}
