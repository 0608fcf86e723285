// Upload storage module
// Owns the folder holding the uploaded PDF files


use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info};

use crate::{ChatError, Result};

const PDF_EXTENSION: &str = "pdf";

/// A PDF file currently held in storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// A file handed to the store by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Read an upload from a path on disk, keeping only its file name
    #[inline]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ChatError::Storage(format!("Invalid file name: {}", path.display())))?
            .to_string();
        let bytes = fs::read(path).map_err(|e| {
            ChatError::Storage(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Ok(Self { name, bytes })
    }
}

/// Directory of uploaded PDFs, exclusively owned by the ingestion step
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    #[inline]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List stored PDFs sorted by file name. A missing folder is an empty store.
    #[inline]
    pub fn list(&self) -> Result<Vec<StoredFile>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if !is_pdf(&path) {
                continue;
            }

            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            files.push(StoredFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                size: metadata.len(),
                modified: metadata.modified().ok(),
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    #[inline]
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.file_path(name)?;
        fs::read(&path)
            .map_err(|e| ChatError::Storage(format!("Failed to read {}: {}", path.display(), e)))
    }

    #[inline]
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.file_path(name)?;
        fs::remove_file(&path).map_err(|e| {
            ChatError::Storage(format!("Failed to delete {}: {}", path.display(), e))
        })?;
        debug!("Deleted stored file {}", path.display());
        Ok(())
    }

    /// Replace the stored set with `uploads`: every existing PDF is deleted
    /// before any new file is written.
    #[inline]
    pub fn replace_all(&self, uploads: &[Upload]) -> Result<Vec<StoredFile>> {
        let names = uploads
            .iter()
            .map(|upload| sanitize_name(&upload.name))
            .collect::<Result<Vec<_>>>()?;

        fs::create_dir_all(&self.root).map_err(|e| {
            ChatError::Storage(format!(
                "Failed to create storage folder {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let previous = self.list()?;
        for file in &previous {
            self.delete(&file.name)?;
        }

        for (name, upload) in names.iter().zip(uploads) {
            let path = self.root.join(name);
            fs::write(&path, &upload.bytes).map_err(|e| {
                ChatError::Storage(format!("Failed to write {}: {}", path.display(), e))
            })?;
        }

        info!(
            "Replaced {} stored file(s) with {} upload(s) in {}",
            previous.len(),
            uploads.len(),
            self.root.display()
        );

        self.list()
    }

    fn file_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(sanitize_name(name)?))
    }
}

/// Reduce a user supplied name to its final path component and require a
/// `.pdf` extension
fn sanitize_name(name: &str) -> Result<String> {
    let file_name = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ChatError::Storage(format!("Invalid file name: '{}'", name)))?;

    if !is_pdf(Path::new(file_name)) {
        return Err(ChatError::Storage(format!(
            "Only PDF files can be uploaded: '{}'",
            file_name
        )));
    }

    Ok(file_name.to_string())
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PDF_EXTENSION))
}
