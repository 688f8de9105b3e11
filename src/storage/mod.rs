// src/storage/mod.rs
use crate::extractors::FieldRecord;
use crate::utils::error::StorageError;
use crate::utils::BatchReport;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Files in `dir` with the given extension (case-insensitive), sorted by name.
pub fn files_with_extension(dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Directory of `<stem>.json` field records.
pub struct RecordStore {
    base_dir: PathBuf,
}

impl RecordStore {
    /// Creates a new RecordStore, creating the directory if it doesn't exist
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_dir: base_path })
    }

    pub fn record_path(&self, stem: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", stem))
    }

    pub fn contains(&self, stem: &str) -> bool {
        self.record_path(stem).exists()
    }

    /// Writes the record, replacing any previous one for the same stem.
    pub fn save(&self, stem: &str, record: &FieldRecord) -> Result<PathBuf, StorageError> {
        let path = self.record_path(stem);
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&path, json)?;
        tracing::debug!("Saved record to {}", path.display());
        Ok(path)
    }

    pub fn load(&self, path: &Path) -> Result<FieldRecord, StorageError> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| StorageError::SerializationError(e.to_string()))
    }

    /// Every record in filename order. Unreadable files are reported as failures.
    pub fn load_all(&self) -> Result<BatchReport<FieldRecord>, StorageError> {
        let mut batch = BatchReport::new();
        if !self.base_dir.is_dir() {
            tracing::warn!("Record directory does not exist: {}", self.base_dir.display());
            return Ok(batch);
        }

        for path in files_with_extension(&self.base_dir, "json")? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match self.load(&path) {
                Ok(record) => batch.done(name, record),
                Err(e) => batch.failed(name, e),
            }
        }
        tracing::info!("Loaded records from {}: {}", self.base_dir.display(), batch);
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::ExtractedFields;

    #[test]
    fn test_files_with_extension_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "c.txt", "d.pdf.part"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("folder.pdf")).unwrap();

        let files = files_with_extension(dir.path(), "pdf").unwrap();
        let names: Vec<_> = files.iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn test_save_then_load_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("extracted")).unwrap();
        let record = FieldRecord::new(
            ExtractedFields { title: "Piper PA-28".into(), ..Default::default() },
            "piper.pdf",
            42,
        );
        store.save("piper", &record).unwrap();
        assert!(store.contains("piper"));
        assert!(!store.contains("cessna"));

        let loaded = store.load_all().unwrap().into_values();
        assert_eq!(loaded, vec![record]);
    }

    #[test]
    fn test_malformed_record_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path()).unwrap();
        fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        store.save("good", &FieldRecord::default()).unwrap();

        let batch = store.load_all().unwrap();
        assert_eq!(batch.done_count(), 1);
        assert_eq!(batch.failures().map(|(k, _)| k).collect::<Vec<_>>(), vec!["bad.json"]);
    }
}
