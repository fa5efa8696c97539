//! Source documents and uploaded files.
//!
//! Text extraction is delegated: `.txt`/`.md` are read as UTF-8, PDFs go
//! through `pdf-extract` when the `pdf` feature is enabled.

use std::fs;
use std::path::Path;

use crate::core::errors::RagError;

const TEXT_EXTENSIONS: [&str; 3] = ["txt", "md", "markdown"];

/// A document to be chunked and indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Path relative to the ingestion root, used as `Chunk::document_id`.
    pub id: String,
    pub text: String,
}

/// A file placed in a session's upload slot, already reduced to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    pub name: String,
    pub text: String,
}

impl UploadedDocument {
    /// Extracts text from an upload. `content_type` or the name's extension
    /// selects PDF extraction; anything else is decoded as UTF-8.
    pub fn from_bytes(name: &str, content_type: Option<&str>, bytes: &[u8]) -> Result<Self, RagError> {
        let is_pdf = content_type
            .map(|ct| ct.eq_ignore_ascii_case("application/pdf"))
            .unwrap_or(false)
            || has_extension(Path::new(name), &["pdf"])
            || bytes.starts_with(b"%PDF-");

        let text = if is_pdf {
            extract_pdf_text(bytes)?
        } else {
            String::from_utf8_lossy(bytes).into_owned()
        };

        Ok(Self {
            name: name.to_string(),
            text,
        })
    }
}

/// Loads every supported document under `root`, sorted by relative path so
/// repeated ingestion sees the same order.
pub fn load_directory(root: &Path) -> Result<Vec<SourceDocument>, RagError> {
    if root.is_file() {
        let id = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        return Ok(load_file(root, id)?.into_iter().collect());
    }
    if !root.is_dir() {
        return Err(RagError::InvalidInput(format!(
            "Input path does not exist: {}",
            root.display()
        )));
    }

    let mut paths = Vec::new();
    collect_files(root, &mut paths)?;
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let id = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        match load_file(&path, id) {
            Ok(Some(document)) => documents.push(document),
            Ok(None) => {}
            Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    Ok(documents)
}

fn collect_files(dir: &Path, out: &mut Vec<std::path::PathBuf>) -> Result<(), RagError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// `Ok(None)` for unsupported file types.
fn load_file(path: &Path, id: String) -> Result<Option<SourceDocument>, RagError> {
    let text = if has_extension(path, &TEXT_EXTENSIONS) {
        fs::read_to_string(path)?
    } else if has_extension(path, &["pdf"]) {
        extract_pdf_text(&fs::read(path)?)?
    } else {
        tracing::debug!("Unsupported document type: {}", path.display());
        return Ok(None);
    };

    Ok(Some(SourceDocument { id, text }))
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            extensions.iter().any(|candidate| *candidate == ext)
        })
        .unwrap_or(false)
}

#[cfg(feature = "pdf")]
fn extract_pdf_text(bytes: &[u8]) -> Result<String, RagError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| RagError::InvalidInput(format!("Failed to extract text from PDF: {}", e)))
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf_text(_bytes: &[u8]) -> Result<String, RagError> {
    Err(RagError::InvalidInput(
        "PDF support not enabled. Compile with --features pdf".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_upload_is_decoded_as_utf8() {
        let doc = UploadedDocument::from_bytes("notes.txt", Some("text/plain"), "Hours: 8 AM".as_bytes())
            .unwrap();
        assert_eq!(doc.name, "notes.txt");
        assert_eq!(doc.text, "Hours: 8 AM");
    }

    #[test]
    fn load_directory_is_sorted_and_skips_unsupported_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("policies")).unwrap();
        fs::write(dir.path().join("b.txt"), "second").unwrap();
        fs::write(dir.path().join("a.md"), "first").unwrap();
        fs::write(dir.path().join("policies").join("c.txt"), "nested").unwrap();
        fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();

        let documents = load_directory(dir.path()).unwrap();
        let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.md", "b.txt", "policies/c.txt"]);
        assert_eq!(documents[0].text, "first");
    }

    #[test]
    fn load_directory_accepts_a_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("faq.txt");
        fs::write(&file, "Library opens at 8 AM").unwrap();

        let documents = load_directory(&file).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "faq.txt");
    }

    #[test]
    fn missing_input_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_directory(&dir.path().join("nope")).is_err());
    }
}
