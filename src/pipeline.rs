// src/pipeline.rs
use crate::config::Config;
use crate::export::aggregate;
use crate::extractors::{extract_records, FieldExtractor, HeuristicExtractor, LlmExtractor};
use crate::govuk::GovUkClient;
use crate::pdf::{download_pdfs, extract_texts};
use crate::storage::RecordStore;
use crate::utils::AppError;

/// Which stages run, and how fields are extracted.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub use_llm: bool,
    pub skip_download: bool,
    pub skip_extraction: bool,
    /// Re-extract fields even when a record already exists.
    pub force: bool,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub reports_found: usize,
    pub pdfs_available: usize,
    pub texts_available: usize,
    pub records_available: usize,
    pub rows: usize,
    pub failures: usize,
}

/// Chooses the extractor. Asking for the LLM without a key is a configuration error.
pub fn build_extractor(config: &Config, options: &PipelineOptions) -> Result<FieldExtractor, AppError> {
    if !options.use_llm {
        return Ok(FieldExtractor::Heuristic(HeuristicExtractor::new()));
    }
    let api_key = config.require_openai_key()?;
    let llm = LlmExtractor::new(
        api_key,
        config.openai_model.as_str(),
        &config.openai_base_url,
        config.llm_max_chars,
        config.http_timeout,
    )?;
    Ok(FieldExtractor::Llm(llm))
}

/// Runs fetch, download, text extraction, field extraction and aggregation in order.
pub async fn run_pipeline(config: &Config, options: &PipelineOptions) -> Result<PipelineSummary, AppError> {
    // Fail on configuration before touching the network or disk
    let extractor = build_extractor(config, options)?;

    tracing::info!("AAIB report collector: pipeline start");
    config.log_summary();
    tracing::info!("  Options: {:?}", options);

    let mut summary = PipelineSummary::default();

    // 1 + 2. Find reports and download their PDFs
    if options.skip_download {
        tracing::info!("[STAGE 1-2/5] Skipping report search and PDF download (using existing files)");
    } else {
        tracing::info!("[STAGE 1/5] Fetching up to {} report links", config.num_reports);
        let client = GovUkClient::new(&config.govuk_base_url, config.http_timeout)?;
        let reports = client.fetch_reports(config.num_reports).await;
        summary.reports_found = reports.values().count();
        summary.failures += reports.failed_count();
        tracing::info!("Found {} reports with PDFs ({})", summary.reports_found, reports);

        let urls: Vec<String> = reports
            .values()
            .flat_map(|r| r.pdf_urls.iter().cloned())
            .collect();
        tracing::info!("[STAGE 2/5] Downloading {} PDFs", urls.len());
        if urls.is_empty() {
            tracing::warn!("No PDF URLs found");
        }
        let downloads = download_pdfs(&client, &urls, &config.pdfs_dir).await?;
        summary.pdfs_available = downloads.values().count();
        summary.failures += downloads.failed_count();
    }

    // 3. PDF -> text
    if options.skip_extraction {
        tracing::info!("[STAGE 3/5] Skipping text extraction (using existing files)");
    } else {
        tracing::info!("[STAGE 3/5] Extracting text from PDFs");
        let texts = extract_texts(&config.pdfs_dir, &config.texts_dir)?;
        summary.texts_available = texts.values().count();
        summary.failures += texts.failed_count();
    }

    // 4. Text -> records
    tracing::info!("[STAGE 4/5] Extracting structured fields ({})", extractor);
    let store = RecordStore::new(&config.extracted_dir)?;
    let records = extract_records(
        &config.texts_dir,
        &config.pdfs_dir,
        &store,
        &extractor,
        options.force,
    )
    .await?;
    summary.records_available = records.values().count();
    summary.failures += records.failed_count();

    // 5. Records -> spreadsheet + CSV
    tracing::info!("[STAGE 5/5] Aggregating records to Excel/CSV");
    let dataset = aggregate(&store, &config.output_excel, &config.output_csv)?;
    summary.rows = dataset.values().count();
    summary.failures += dataset.failed_count();

    tracing::info!("Pipeline complete: {} rows, {} item failures", summary.rows, summary.failures);
    tracing::info!("Output files:");
    tracing::info!("  - {}", config.output_excel.display());
    tracing::info!("  - {}", config.output_csv.display());
    for (key, reason) in records.failures() {
        tracing::warn!("  not extracted: {} ({})", key, reason);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::FieldRecord;
    use mockito::{Matcher, Server};
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;

    fn test_config(root: &Path, govuk: &str, openai: &str, api_key: Option<&str>) -> Config {
        let mut vars = HashMap::new();
        vars.insert("DATA_DIR", root.display().to_string());
        vars.insert("GOVUK_BASE_URL", govuk.to_string());
        vars.insert("OPENAI_BASE_URL", openai.to_string());
        vars.insert("HTTP_TIMEOUT_SECS", "5".to_string());
        if let Some(key) = api_key {
            vars.insert("OPENAI_API_KEY", key.to_string());
        }
        Config::from_lookup(|k| vars.get(k).cloned()).unwrap()
    }

    fn completion() -> String {
        let content = r#"{"title":"t","date":"2022-06-01","aircraft_type":"Piper PA-28","registration":"G-BNMC","location":"Goodwood","summary":"s","cause":"c"}"#;
        serde_json::json!({ "choices": [{ "message": { "content": content } }] }).to_string()
    }

    #[tokio::test]
    async fn test_skip_flags_with_llm_only_call_the_model() {
        let mut govuk = Server::new_async().await;
        let mut openai = Server::new_async().await;
        let any_govuk = govuk
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let llm = openai
            .mock("POST", "/chat/completions")
            .with_body(completion())
            .expect(2)
            .create_async()
            .await;

        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path(), &govuk.url(), &openai.url(), Some("sk-test"));
        fs::create_dir_all(&config.texts_dir).unwrap();
        for name in ["a", "b", "c"] {
            fs::write(config.texts_dir.join(format!("{}.txt", name)), "report text").unwrap();
        }
        let store = RecordStore::new(&config.extracted_dir).unwrap();
        store.save("b", &FieldRecord::default()).unwrap();

        let options = PipelineOptions {
            use_llm: true,
            skip_download: true,
            skip_extraction: true,
            force: false,
        };
        let summary = run_pipeline(&config, &options).await.unwrap();

        any_govuk.assert_async().await;
        llm.assert_async().await;
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.failures, 0);
        let a = store.load(&store.record_path("a")).unwrap();
        assert_eq!(a.fields.registration, "G-BNMC");
        assert_eq!(a.source_pdf, "a.pdf");
        assert!(config.output_excel.exists());
        assert!(config.output_csv.exists());
    }

    #[tokio::test]
    async fn test_missing_key_aborts_before_any_stage() {
        let mut govuk = Server::new_async().await;
        let any_govuk = govuk
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path(), &govuk.url(), "http://127.0.0.1:9", None);

        let options = PipelineOptions { use_llm: true, ..Default::default() };
        let err = run_pipeline(&config, &options).await.unwrap_err();

        assert!(matches!(err, AppError::Config(_)));
        assert!(!config.extracted_dir.exists());
        assert!(!config.output_csv.exists());
        any_govuk.assert_async().await;
    }

    #[tokio::test]
    async fn test_full_heuristic_run() {
        let mut govuk = Server::new_async().await;
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path(), &govuk.url(), "http://127.0.0.1:9", None);

        let sample = root.path().join("sample.pdf");
        crate::pdf::text::tests::write_sample_pdf(&sample, "Registration: G-ABCD");
        let pdf_url = format!("{}/media/1/AAIB_G-ABCD.pdf", govuk.url());

        govuk
            .mock("GET", "/api/search.json")
            .match_query(Matcher::Any)
            .with_body(
                serde_json::json!({ "results": [{ "title": "Cessna 172, G-ABCD", "link": "/aaib-reports/g-abcd" }] })
                    .to_string(),
            )
            .create_async()
            .await;
        govuk
            .mock("GET", "/api/content/aaib-reports/g-abcd")
            .with_body(
                serde_json::json!({ "details": { "attachments": [{ "url": pdf_url, "content_type": "application/pdf" }] } })
                    .to_string(),
            )
            .create_async()
            .await;
        let download = govuk
            .mock("GET", "/media/1/AAIB_G-ABCD.pdf")
            .with_body(fs::read(&sample).unwrap())
            .expect(1)
            .create_async()
            .await;

        let config = config.with_overrides(Some(1), None);
        let summary = run_pipeline(&config, &PipelineOptions::default()).await.unwrap();
        assert_eq!(summary.reports_found, 1);
        assert_eq!(summary.pdfs_available, 1);
        assert_eq!(summary.texts_available, 1);
        assert_eq!(summary.rows, 1);

        // Second run reuses every intermediate file
        let again = run_pipeline(&config, &PipelineOptions::default()).await.unwrap();
        assert_eq!(again.rows, 1);
        download.assert_async().await;

        let mut reader = csv::Reader::from_path(&config.output_csv).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][7], "AAIB_G-ABCD.pdf");
    }
}
