// src/pdf/text.rs
use crate::storage::files_with_extension;
use crate::utils::error::{ExtractError, StorageError};
use crate::utils::BatchReport;
use lopdf::Document;
use std::fs;
use std::path::{Path, PathBuf};

/// Concatenates the text of every page, in page order.
pub fn extract_pdf_text(path: &Path) -> Result<String, ExtractError> {
    let doc = Document::load(path).map_err(|e| ExtractError::Pdf(e.to_string()))?;

    let mut pages = Vec::new();
    for (page_num, _page_id) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(text) => pages.push(text),
            Err(e) => tracing::warn!("{}: page {} unreadable: {}", path.display(), page_num, e),
        }
    }
    Ok(pages.join("\n"))
}

/// Extracts every `*.pdf` in `pdf_dir` into `<stem>.txt` files in `text_dir`.
///
/// The batch is keyed by PDF filename and carries the text length in characters.
pub fn extract_texts(pdf_dir: &Path, text_dir: &Path) -> Result<BatchReport<usize>, StorageError> {
    if !pdf_dir.is_dir() {
        tracing::error!("PDF directory does not exist: {}", pdf_dir.display());
        return Ok(BatchReport::new());
    }
    let files = files_with_extension(pdf_dir, "pdf")?;
    tracing::info!("Found {} PDF files in {}", files.len(), pdf_dir.display());
    extract_text_files(&files, text_dir)
}

pub fn extract_text_files(files: &[PathBuf], text_dir: &Path) -> Result<BatchReport<usize>, StorageError> {
    fs::create_dir_all(text_dir)?;
    let mut batch = BatchReport::new();

    for (i, pdf) in files.iter().enumerate() {
        let name = pdf
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = pdf
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let out = text_dir.join(format!("{}.txt", stem));
        tracing::info!("[{}/{}] {}", i + 1, files.len(), name);

        if out.exists() {
            match fs::read_to_string(&out) {
                Ok(existing) => batch.reused(name, existing.chars().count()),
                Err(e) => batch.failed(name, e),
            }
            continue;
        }

        let text = match extract_pdf_text(pdf) {
            Ok(text) => text,
            Err(e) => {
                batch.failed(name, e);
                continue;
            }
        };
        if text.trim().is_empty() {
            batch.failed(name, "no text extracted");
            continue;
        }

        let length = text.chars().count();
        match fs::write(&out, &text) {
            Ok(()) => {
                tracing::info!("Extracted {} characters to {}", length, out.display());
                batch.done(name, length);
            }
            Err(e) => batch.failed(name, e),
        }
    }

    tracing::info!("Text extraction complete: {}", batch);
    Ok(batch)
}
