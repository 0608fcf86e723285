// Ingestion module
// Extracts text from stored PDFs and splits it into retrieval chunks

#[cfg(test)]
mod tests;

pub mod chunking;

use std::panic;

use tracing::{debug, info, warn};

use crate::storage::FileStore;
use crate::{ChatError, Result};

pub use chunking::{Chunk, ChunkingConfig, chunk_document, chunk_documents};

/// Text extracted from one uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File name the text came from
    pub source: String,
    /// Extracted plain text
    pub text: String,
}

/// A file that could not be turned into a document
#[derive(Debug)]
pub struct IngestionFailure {
    pub file: String,
    pub error: ChatError,
}

/// Outcome of ingesting every file in the store
#[derive(Debug, Default)]
pub struct IngestionReport {
    pub documents: Vec<Document>,
    pub failures: Vec<IngestionFailure>,
}

impl IngestionReport {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Extract the text of a single PDF
#[inline]
pub fn extract_text(name: &str, bytes: &[u8]) -> Result<Document> {
    let ingestion_error = |message: String| ChatError::Ingestion {
        file: name.to_string(),
        message,
    };

    // pdf-extract panics on some malformed inputs instead of returning an error
    let extracted = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| ingestion_error("PDF parser panicked on malformed input".to_string()))?
        .map_err(|e| ingestion_error(format!("PDF extraction error: {}", e)))?;

    let text = normalize_text(&extracted);
    if text.trim().is_empty() {
        return Err(ingestion_error(
            "PDF contains no extractable text (it may be image-based or encrypted)".to_string(),
        ));
    }

    debug!("Extracted {} characters from {}", text.chars().count(), name);

    Ok(Document {
        source: name.to_string(),
        text,
    })
}

/// Extract every stored PDF. A file that fails is recorded in the report and
/// the remaining files are still processed.
#[inline]
pub fn ingest_store(store: &FileStore) -> Result<IngestionReport> {
    let files = store.list()?;
    let mut report = IngestionReport::default();

    for file in files {
        let outcome = store
            .read(&file.name)
            .and_then(|bytes| extract_text(&file.name, &bytes));

        match outcome {
            Ok(document) => report.documents.push(document),
            Err(error) => {
                warn!("Skipping {}: {}", file.name, error);
                report.failures.push(IngestionFailure {
                    file: file.name,
                    error,
                });
            }
        }
    }

    info!(
        "Ingested {} document(s), {} failure(s) from {}",
        report.documents.len(),
        report.failures.len(),
        store.root().display()
    );

    Ok(report)
}

/// Normalise page breaks and line endings in extracted text
fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\u{c}', "\n\n")
}
