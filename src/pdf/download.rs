// src/pdf/download.rs
use crate::govuk::GovUkClient;
use crate::utils::error::StorageError;
use crate::utils::BatchReport;
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "downloads.json";

/// Local filename for a PDF URL: its last path segment, made filesystem-safe.
pub fn pdf_filename(url: &str) -> String {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            .unwrap_or_default()
            .to_string(),
        Err(_) => url
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string(),
    };

    let sanitized: String = segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    let mut name = sanitized.trim_start_matches('.').to_string();
    if name.is_empty() {
        name = "report".to_string();
    }
    if !name.to_lowercase().ends_with(".pdf") {
        name.push_str(".pdf");
    }
    name
}

/// `<stem>-<8 hex chars of SHA-256(url)>.pdf`, used when two URLs want the same name.
fn qualified_filename(name: &str, url: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    format!("{}-{}.pdf", stem, &digest[..8])
}

/// Writes via a `.part` file so an interrupted download never looks complete.
fn write_file_atomically(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);
    fs::write(&partial, bytes)?;
    fs::rename(&partial, path)?;
    Ok(())
}

/// URL -> local filename for every PDF this directory has ever received.
///
/// Kept in `pdf_dir` so a name, once given to a URL, is never handed to another
/// URL on a later run.
struct Manifest {
    path: PathBuf,
    names: BTreeMap<String, String>,
}

impl Manifest {
    fn load(pdf_dir: &Path) -> Self {
        let path = pdf_dir.join(MANIFEST_FILE);
        let names = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, names }
    }

    fn name_for(&self, url: &str) -> Option<&str> {
        self.names.get(url).map(String::as_str)
    }

    fn owner_of(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(url, _)| url.as_str())
    }

    fn record(&mut self, url: &str, name: &str) {
        self.names.insert(url.to_string(), name.to_string());
    }

    fn save(&self) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(&self.names)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        write_file_atomically(&self.path, json.as_bytes())
    }
}

/// Picks the filename for `url`: the one it was given before, else its plain name
/// unless another URL owns that, else the hash-qualified name.
fn assign_name(manifest: &Manifest, claimed: &HashMap<String, String>, url: &str) -> String {
    if let Some(name) = manifest.name_for(url) {
        return name.to_string();
    }
    let base_name = pdf_filename(url);
    let owner = manifest
        .owner_of(&base_name)
        .or_else(|| claimed.get(&base_name).map(String::as_str));
    match owner {
        Some(owner) if owner != url => {
            let qualified = qualified_filename(&base_name, url);
            tracing::warn!("{} already belongs to {}, saving as {}", base_name, owner, qualified);
            qualified
        }
        _ => base_name,
    }
}

/// Downloads each URL into `pdf_dir`, reusing files that are already there.
pub async fn download_pdfs(
    client: &GovUkClient,
    urls: &[String],
    pdf_dir: &Path,
) -> Result<BatchReport<PathBuf>, StorageError> {
    fs::create_dir_all(pdf_dir)?;
    tracing::info!("Downloading {} PDFs to {}", urls.len(), pdf_dir.display());

    let mut manifest = Manifest::load(pdf_dir);
    let mut batch = BatchReport::new();
    // Names taken in this run, including by downloads that failed
    let mut claimed: HashMap<String, String> = HashMap::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for (i, url) in urls.iter().enumerate() {
        tracing::info!("[{}/{}] {}", i + 1, urls.len(), url);
        if !seen.insert(url.as_str()) {
            batch.skipped(url.as_str(), "duplicate URL in batch");
            continue;
        }

        let name = assign_name(&manifest, &claimed, url);
        claimed.insert(name.clone(), url.clone());

        let path = pdf_dir.join(&name);
        if path.exists() {
            tracing::info!("Already exists: {}", name);
            manifest.record(url, &name);
            batch.reused(url.as_str(), path);
            continue;
        }

        match client.fetch_bytes(url).await {
            Ok(bytes) => match write_file_atomically(&path, &bytes) {
                Ok(()) => {
                    tracing::info!("Saved {} ({} bytes)", path.display(), bytes.len());
                    manifest.record(url, &name);
                    batch.done(url.as_str(), path);
                }
                Err(e) => batch.failed(url.as_str(), e),
            },
            Err(e) => batch.failed(url.as_str(), e),
        }
    }

    manifest.save()?;
    tracing::info!("Download complete: {}", batch);
    Ok(batch)
}
