// src/config.rs
use crate::utils::AppError;
use std::path::PathBuf;
use std::time::Duration;

const PLACEHOLDER_API_KEY: &str = "sk-your-api-key-here";

/// Settings for one run, loaded once at start-up and then only read.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub num_reports: usize,
    pub govuk_base_url: String,
    pub pdfs_dir: PathBuf,
    pub texts_dir: PathBuf,
    pub extracted_dir: PathBuf,
    pub output_excel: PathBuf,
    pub output_csv: PathBuf,
    /// Upper bound on characters of report text sent to the model.
    pub llm_max_chars: usize,
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment, after an optional `.env` file.
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = PathBuf::from(get("DATA_DIR").unwrap_or_else(|| ".data".to_string()));
        let path_or = |key: &str, default: &str| {
            get(key).map(PathBuf::from).unwrap_or_else(|| data_dir.join(default))
        };

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY").filter(|k| k != PLACEHOLDER_API_KEY),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            num_reports: parse_number(&get, "NUM_REPORTS", 10)?,
            govuk_base_url: get("GOVUK_BASE_URL")
                .unwrap_or_else(|| "https://www.gov.uk".to_string()),
            pdfs_dir: path_or("PDFS_DIR", "pdfs"),
            texts_dir: path_or("TEXTS_DIR", "texts"),
            extracted_dir: path_or("EXTRACTED_DIR", "extracted"),
            output_excel: path_or("OUTPUT_EXCEL", "aaib_reports.xlsx"),
            output_csv: path_or("OUTPUT_CSV", "aaib_reports.csv"),
            llm_max_chars: parse_number(&get, "LLM_MAX_CHARS", 20_000)?,
            http_timeout: Duration::from_secs(parse_number(&get, "HTTP_TIMEOUT_SECS", 60)?),
        })
    }

    /// Returns a copy with command-line values layered over the loaded ones.
    pub fn with_overrides(&self, num_reports: Option<usize>, model: Option<&str>) -> Self {
        let mut config = self.clone();
        if let Some(n) = num_reports {
            config.num_reports = n;
        }
        if let Some(model) = model {
            config.openai_model = model.to_string();
        }
        config
    }

    pub fn has_openai_key(&self) -> bool {
        self.openai_api_key.is_some()
    }

    /// The API key, or a configuration error naming the missing setting.
    pub fn require_openai_key(&self) -> Result<&str, AppError> {
        self.openai_api_key.as_deref().ok_or_else(|| {
            AppError::Config("OPENAI_API_KEY must be set when --use-llm is requested".to_string())
        })
    }

    /// Logs the effective settings without revealing the key.
    pub fn log_summary(&self) {
        tracing::info!("Configuration:");
        tracing::info!("  OpenAI API key: {}", if self.has_openai_key() { "set" } else { "not set" });
        tracing::info!("  OpenAI model: {}", self.openai_model);
        tracing::info!("  Reports to fetch: {}", self.num_reports);
        tracing::info!("  PDFs directory: {}", self.pdfs_dir.display());
        tracing::info!("  Texts directory: {}", self.texts_dir.display());
        tracing::info!("  Extracted directory: {}", self.extracted_dir.display());
        tracing::info!("  Output Excel: {}", self.output_excel.display());
        tracing::info!("  Output CSV: {}", self.output_csv.display());
    }
}

fn parse_number<T, G>(get: &G, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            AppError::Config(format!("{} must be a non-negative integer, got '{}'", key, raw))
        }),
    }
}
