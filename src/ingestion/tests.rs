use super::*;
use crate::storage::Upload;
use tempfile::TempDir;

#[test]
fn corrupt_pdf_is_an_ingestion_error() {
    let result = extract_text("broken.pdf", b"this is not a pdf");

    match result {
        Err(ChatError::Ingestion { file, message }) => {
            assert_eq!(file, "broken.pdf");
            assert!(!message.is_empty());
        }
        other => panic!("expected ingestion error, got {:?}", other),
    }
}

#[test]
fn failures_are_isolated_per_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = FileStore::new(temp_dir.path());
    store
        .replace_all(&[
            Upload {
                name: "one.pdf".to_string(),
                bytes: b"garbage".to_vec(),
            },
            Upload {
                name: "two.pdf".to_string(),
                bytes: b"%PDF-1.4 truncated".to_vec(),
            },
        ])
        .expect("upload should succeed");

    let report = ingest_store(&store).expect("ingesting should not abort the batch");

    assert!(report.is_empty());
    let failed: Vec<&str> = report.failures.iter().map(|f| f.file.as_str()).collect();
    assert_eq!(failed, vec!["one.pdf", "two.pdf"]);
}

#[test]
fn empty_store_produces_empty_report() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = FileStore::new(temp_dir.path().join("missing"));

    let report = ingest_store(&store).expect("should succeed");
    assert!(report.documents.is_empty());
    assert!(report.failures.is_empty());
}

#[test]
fn page_breaks_become_paragraph_breaks() {
    assert_eq!(normalize_text("page one\u{c}page two"), "page one\n\npage two");
    assert_eq!(normalize_text("a\r\nb"), "a\nb");
}
