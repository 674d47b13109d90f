//! Upload batch: the ordered set of PDFs sent in one pipeline run.
//!
//! Files are appended (local paths, URLs, or raw bytes) until the batch is
//! submitted; there is no removal. Every document is held in memory, because
//! the pipeline endpoint takes the whole batch as a single multipart body.
//! Magic bytes (`%PDF`) are checked on the way in so a stray `.docx` fails
//! here with a clear message instead of as an opaque backend error.

use crate::error::InsightsError;
use std::path::Path;
use tracing::{debug, info};

/// Multipart field name the pipeline endpoint expects for every file.
pub const FILES_FIELD: &str = "files";

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// One document in an upload batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// File name sent in the multipart part.
    pub name: String,
    /// Raw PDF bytes.
    pub bytes: Vec<u8>,
}

/// Ordered, append-only collection of PDFs awaiting submission.
#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    files: Vec<UploadFile>,
}

impl UploadBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files in the order they were added.
    pub fn files(&self) -> &[UploadFile] {
        &self.files
    }

    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.bytes.len()).sum()
    }

    /// Append an in-memory document after checking its magic bytes.
    pub fn add_bytes(
        &mut self,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<(), InsightsError> {
        let name = name.into();
        check_magic(&name, &bytes)?;
        debug!("Queued '{}' ({} bytes)", name, bytes.len());
        self.files.push(UploadFile { name, bytes });
        Ok(())
    }

    /// Read a local file and append it.
    pub async fn add_path(&mut self, path: impl AsRef<Path>) -> Result<(), InsightsError> {
        let path = path.as_ref();
        let bytes = read_local(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        self.add_bytes(name, bytes)
    }

    /// Download a PDF over HTTP(S) and append it.
    pub async fn add_url(&mut self, url: &str, timeout_secs: u64) -> Result<(), InsightsError> {
        let (name, bytes) = download_url(url, timeout_secs).await?;
        self.add_bytes(name, bytes)
    }

    /// Append a local path or URL, whichever `input` looks like.
    pub async fn add_input(&mut self, input: &str, timeout_secs: u64) -> Result<(), InsightsError> {
        if is_url(input) {
            self.add_url(input, timeout_secs).await
        } else {
            self.add_path(input).await
        }
    }

    /// Package every file into one multipart form, one `files` part each.
    pub fn to_form(&self) -> Result<reqwest::multipart::Form, InsightsError> {
        let mut form = reqwest::multipart::Form::new();
        for file in &self.files {
            let part = reqwest::multipart::Part::bytes(file.bytes.clone())
                .file_name(file.name.clone())
                .mime_str("application/pdf")
                .map_err(|e| InsightsError::Internal(format!("multipart part: {e}")))?;
            form = form.part(FILES_FIELD, part);
        }
        Ok(form)
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Files shorter than four bytes are passed through; the backend decides.
fn check_magic(name: &str, bytes: &[u8]) -> Result<(), InsightsError> {
    if bytes.len() >= 4 && &bytes[..4] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(InsightsError::NotAPdf {
            name: name.to_string(),
            magic,
        });
    }
    Ok(())
}

async fn read_local(path: &Path) -> Result<Vec<u8>, InsightsError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!("Read local PDF: {}", path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(InsightsError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(InsightsError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}

/// Download a URL into memory, returning the derived file name and bytes.
async fn download_url(url: &str, timeout_secs: u64) -> Result<(String, Vec<u8>), InsightsError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| InsightsError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            InsightsError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            InsightsError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(InsightsError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| InsightsError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok((filename_from_url(url), bytes.to_vec()))
}

/// Last URL path segment if it looks like a file name, else `downloaded.pdf`.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PDF: &[u8] = b"%PDF-1.7\n%fake\n";

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_from_url_segments() {
        assert_eq!(filename_from_url("https://x.org/a/b/report.pdf"), "report.pdf");
        assert_eq!(filename_from_url("https://arxiv.org/pdf/1706"), "downloaded.pdf");
        assert_eq!(filename_from_url("https://x.org/"), "downloaded.pdf");
    }

    #[test]
    fn add_bytes_rejects_non_pdf() {
        let mut batch = UploadBatch::new();
        let err = batch.add_bytes("notes.docx", b"PK\x03\x04rest".to_vec()).unwrap_err();
        match err {
            InsightsError::NotAPdf { name, magic } => {
                assert_eq!(name, "notes.docx");
                assert_eq!(&magic, b"PK\x03\x04");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(batch.is_empty());
    }

    #[test]
    fn batch_preserves_insertion_order() {
        let mut batch = UploadBatch::new();
        batch.add_bytes("b.pdf", PDF.to_vec()).unwrap();
        batch.add_bytes("a.pdf", PDF.to_vec()).unwrap();
        let names: Vec<_> = batch.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b.pdf", "a.pdf"]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.total_bytes(), PDF.len() * 2);
    }

    #[tokio::test]
    async fn add_path_reads_file_and_uses_file_name() {
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        tmp.write_all(PDF).unwrap();

        let mut batch = UploadBatch::new();
        batch.add_path(tmp.path()).await.unwrap();
        let file = &batch.files()[0];
        assert!(file.name.ends_with(".pdf"));
        assert_eq!(file.bytes, PDF);
    }

    #[tokio::test]
    async fn add_input_missing_file() {
        let mut batch = UploadBatch::new();
        let err = batch
            .add_input("/definitely/not/a/real/file.pdf", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, InsightsError::FileNotFound { .. }));
    }

    #[test]
    fn empty_batch_builds_empty_form() {
        assert!(UploadBatch::new().to_form().is_ok());
    }
}
