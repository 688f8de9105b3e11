// src/extractors/runner.rs
use crate::extractors::{FieldExtractor, FieldRecord};
use crate::storage::{files_with_extension, RecordStore};
use crate::utils::error::StorageError;
use crate::utils::BatchReport;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// PDF filenames in `pdf_dir` keyed by stem, keeping their on-disk spelling.
fn pdf_names_by_stem(pdf_dir: &Path) -> HashMap<String, String> {
    if !pdf_dir.is_dir() {
        return HashMap::new();
    }
    match files_with_extension(pdf_dir, "pdf") {
        Ok(files) => files
            .iter()
            .filter_map(|p| {
                let stem = p.file_stem()?.to_string_lossy().into_owned();
                let name = p.file_name()?.to_string_lossy().into_owned();
                Some((stem, name))
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Cannot list {}: {}", pdf_dir.display(), e);
            HashMap::new()
        }
    }
}

/// Turns every `<stem>.txt` in `text_dir` into a `<stem>.json` record.
///
/// Existing records are left alone unless `force` is set. `source_pdf` is the
/// matching file in `pdf_dir`, or `<stem>.pdf` when that PDF is not on disk.
/// The batch is keyed by text filename and carries the record path.
pub async fn extract_records(
    text_dir: &Path,
    pdf_dir: &Path,
    store: &RecordStore,
    extractor: &FieldExtractor,
    force: bool,
) -> Result<BatchReport<PathBuf>, StorageError> {
    let mut batch = BatchReport::new();
    if !text_dir.is_dir() {
        tracing::error!("Text directory does not exist: {}", text_dir.display());
        return Ok(batch);
    }

    let files = files_with_extension(text_dir, "txt")?;
    tracing::info!("Found {} text files in {} ({})", files.len(), text_dir.display(), extractor);
    let pdf_names = pdf_names_by_stem(pdf_dir);

    for (i, text_file) in files.iter().enumerate() {
        let name = text_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = text_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::info!("[{}/{}] {}", i + 1, files.len(), name);

        if store.contains(&stem) && !force {
            tracing::info!("Record already exists for {}", stem);
            batch.reused(name, store.record_path(&stem));
            continue;
        }

        let text = match fs::read_to_string(text_file) {
            Ok(text) => text,
            Err(e) => {
                batch.failed(name, e);
                continue;
            }
        };

        let fields = match extractor.extract(&text).await {
            Ok(fields) => fields,
            Err(e) => {
                batch.failed(name, e);
                continue;
            }
        };

        let source_pdf = pdf_names
            .get(&stem)
            .cloned()
            .unwrap_or_else(|| format!("{}.pdf", stem));
        let record = FieldRecord::new(fields, source_pdf, text.chars().count());
        match store.save(&stem, &record) {
            Ok(path) => batch.done(name, path),
            Err(e) => batch.failed(name, e),
        }
    }

    tracing::info!("Field extraction complete: {}", batch);
    Ok(batch)
}
