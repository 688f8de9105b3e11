// src/govuk/client.rs
use crate::govuk::models::{ContentItem, ReportMetadata, ResolvedReport, SearchResponse};
use crate::utils::error::GovUkError;
use crate::utils::BatchReport;
use once_cell::sync::Lazy;
use reqwest::{header, Url};
use scraper::{Html, Selector};
use serde::de::DeserializeOwned;
use std::time::Duration;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
// The search API rejects larger pages.
const MAX_PAGE_SIZE: usize = 1500;

static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a[href]").expect("Failed to compile LINK_SELECTOR")
});

/// Client for the public GOV.UK search and content APIs, plus plain asset downloads.
pub struct GovUkClient {
    http: reqwest::Client,
    base_url: String,
}

impl GovUkClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GovUkError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, GovUkError> {
        let raw = format!("{}{}", self.base_url, path);
        Url::parse(&raw).map_err(|e| GovUkError::Url(format!("{}: {}", raw, e)))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, GovUkError> {
        tracing::debug!("GET {} {:?}", url, query);
        let response = self
            .http
            .get(url.clone())
            .query(query)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GovUkError::Http(status, url.to_string()));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| GovUkError::Parse(format!("{}: {}", url, e)))
    }

    /// Fetches one page of AAIB reports, newest first.
    pub async fn search_page(&self, start: usize, count: usize) -> Result<SearchResponse, GovUkError> {
        let query = [
            ("filter_format", "aaib_report".to_string()),
            ("order", "-public_timestamp".to_string()),
            ("start", start.to_string()),
            ("count", count.to_string()),
            ("fields", "title".to_string()),
            ("fields", "link".to_string()),
            ("fields", "public_timestamp".to_string()),
        ];
        self.get_json(self.url("/api/search.json")?, &query).await
    }

    /// Finds the PDF URLs attached to a report.
    ///
    /// Asks the content API first; when it lists no PDF attachments the HTML detail
    /// page is scraped for links ending in `.pdf`.
    pub async fn resolve_pdf_urls(&self, link: &str) -> Result<Vec<String>, GovUkError> {
        let content: ContentItem = self.get_json(self.url(&format!("/api/content{}", link))?, &[]).await?;
        let from_api = dedupe(
            content
                .details
                .attachments
                .into_iter()
                .filter(|a| a.is_report_pdf())
                .map(|a| a.url),
        );
        if !from_api.is_empty() {
            return Ok(from_api);
        }

        tracing::debug!("No PDF attachments in content API for {}, scraping detail page", link);
        let page_url = self.url(link)?;
        let response = self
            .http
            .get(page_url.clone())
            .header(header::ACCEPT, "text/html")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GovUkError::Http(status, page_url.to_string()));
        }
        let html = response.text().await?;
        Ok(pdf_links_in_html(&html, &page_url))
    }

    /// Collects up to `wanted` reports that have at least one PDF, paginating the
    /// search API until enough are found or it runs dry.
    pub async fn fetch_reports(&self, wanted: usize) -> BatchReport<ResolvedReport> {
        let mut batch = BatchReport::new();
        if wanted == 0 {
            return batch;
        }

        let page_size = wanted.min(MAX_PAGE_SIZE);
        let mut start = 0;
        let mut collected = 0;

        'pages: loop {
            let page = match self.search_page(start, page_size).await {
                Ok(page) => page,
                Err(e) => {
                    batch.failed(format!("search page at offset {}", start), e);
                    break;
                }
            };

            let received = page.results.len();
            tracing::info!(
                "Search page at offset {}: {} results (total available: {})",
                start,
                received,
                page.total.map_or_else(|| "unknown".to_string(), |t| t.to_string())
            );
            if received == 0 {
                break;
            }

            for result in page.results {
                let metadata = ReportMetadata::from(result);
                match self.resolve_pdf_urls(&metadata.link).await {
                    Ok(pdf_urls) if pdf_urls.is_empty() => {
                        batch.skipped(metadata.link, "no PDF attachments");
                    }
                    Ok(pdf_urls) => {
                        tracing::info!("{}: {} PDF(s)", metadata.title, pdf_urls.len());
                        batch.done(metadata.link.clone(), ResolvedReport { metadata, pdf_urls });
                        collected += 1;
                        if collected >= wanted {
                            break 'pages;
                        }
                    }
                    Err(e) => batch.failed(metadata.link, e),
                }
            }

            start += received;
            if received < page_size {
                break; // upstream exhausted
            }
        }

        batch
    }

    /// Downloads a file body.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, GovUkError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GovUkError::Http(status, url.to_string()));
        }
        let body = response.bytes().await?;
        tracing::debug!("Downloaded {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}

/// Absolute URLs of `.pdf` links on a detail page, in document order.
fn pdf_links_in_html(html: &str, page_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let links = document
        .select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| {
            let lower = href.to_lowercase();
            let path = lower.split(['?', '#']).next().unwrap_or_default();
            path.ends_with(".pdf") && !lower.contains("abbreviations")
        })
        .filter_map(|href| page_url.join(href).ok())
        .map(String::from);
    dedupe(links)
}

fn dedupe(urls: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::batch::ItemOutcome;
    use mockito::{Matcher, Server};

    fn client_for(server: &Server) -> GovUkClient {
        GovUkClient::new(&server.url(), Duration::from_secs(5)).unwrap()
    }

    fn search_body(links: &[&str]) -> String {
        let results: Vec<_> = links
            .iter()
            .map(|l| serde_json::json!({ "title": format!("Report {}", l), "link": l, "public_timestamp": "2024-03-01T09:00:00Z" }))
            .collect();
        serde_json::json!({ "results": results, "total": 500 }).to_string()
    }

    fn content_body(urls: &[&str]) -> String {
        let attachments: Vec<_> = urls
            .iter()
            .map(|u| serde_json::json!({ "url": u, "content_type": "application/pdf" }))
            .collect();
        serde_json::json!({ "details": { "attachments": attachments } }).to_string()
    }

    #[test]
    fn test_pdf_links_in_html() {
        let html = r#"<html><body>
            <a href="/media/abc/AAIB_Report_G-ABCD.pdf">Report</a>
            <a href="https://assets.publishing.service.gov.uk/media/def/Bulletin.PDF?download=1">Bulletin</a>
            <a href="/media/abc/AAIB_Report_G-ABCD.pdf">Report again</a>
            <a href="/media/xyz/Glossary_of_abbreviations.pdf">Abbreviations</a>
            <a href="/aaib-reports/other">Other page</a>
        </body></html>"#;
        let page = Url::parse("https://www.gov.uk/aaib-reports/cessna-172-g-abcd").unwrap();

        let links = pdf_links_in_html(html, &page);
        assert_eq!(
            links,
            vec![
                "https://www.gov.uk/media/abc/AAIB_Report_G-ABCD.pdf".to_string(),
                "https://assets.publishing.service.gov.uk/media/def/Bulletin.PDF?download=1".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_zero_reports_makes_no_requests() {
        let mut server = Server::new_async().await;
        let search = server
            .mock("GET", "/api/search.json")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let batch = client_for(&server).fetch_reports(0).await;
        assert!(batch.is_empty());
        search.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_stops_at_wanted_count() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/search.json")
            .match_query(Matcher::UrlEncoded("start".into(), "0".into()))
            .with_body(search_body(&["/aaib-reports/a", "/aaib-reports/b"]))
            .create_async()
            .await;
        for path in ["/api/content/aaib-reports/a", "/api/content/aaib-reports/b"] {
            server
                .mock("GET", path)
                .with_body(content_body(&["https://assets.example/report.pdf"]))
                .create_async()
                .await;
        }

        let batch = client_for(&server).fetch_reports(2).await;
        let reports = batch.into_values();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].metadata.link, "/aaib-reports/a");
        assert_eq!(reports[0].metadata.date.as_deref(), Some("2024-03-01"));
        assert_eq!(reports[1].pdf_urls, vec!["https://assets.example/report.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_paginates_past_reports_without_pdfs() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/api/search.json")
            .match_query(Matcher::UrlEncoded("start".into(), "0".into()))
            .with_body(search_body(&["/aaib-reports/a", "/aaib-reports/b"]))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/api/search.json")
            .match_query(Matcher::UrlEncoded("start".into(), "2".into()))
            .with_body(search_body(&["/aaib-reports/c"]))
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/api/content/aaib-reports/a")
            .with_body(content_body(&["https://assets.example/a.pdf"]))
            .create_async()
            .await;
        // b has neither attachments nor PDF links on its page
        server
            .mock("GET", "/api/content/aaib-reports/b")
            .with_body(content_body(&[]))
            .create_async()
            .await;
        server
            .mock("GET", "/aaib-reports/b")
            .with_body("<html><body><p>Withdrawn</p></body></html>")
            .create_async()
            .await;
        server
            .mock("GET", "/api/content/aaib-reports/c")
            .with_body(content_body(&["https://assets.example/c.pdf"]))
            .create_async()
            .await;

        let batch = client_for(&server).fetch_reports(2).await;
        assert_eq!(batch.done_count(), 2);
        assert_eq!(batch.skipped_count(), 1);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_exhausted_source_returns_partial_list() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/search.json")
            .match_query(Matcher::UrlEncoded("start".into(), "0".into()))
            .with_body(search_body(&["/aaib-reports/a", "/aaib-reports/b"]))
            .create_async()
            .await;
        server
            .mock("GET", "/api/content/aaib-reports/a")
            .with_body(content_body(&["https://assets.example/a.pdf"]))
            .create_async()
            .await;
        server
            .mock("GET", "/api/content/aaib-reports/b")
            .with_status(500)
            .create_async()
            .await;

        let batch = client_for(&server).fetch_reports(5).await;
        assert!(batch.values().count() <= 5);
        assert_eq!(batch.done_count(), 1);
        assert_eq!(batch.failed_count(), 1);
        let (key, _) = batch.failures().next().unwrap();
        assert_eq!(key, "/aaib-reports/b");
    }

    #[tokio::test]
    async fn test_failed_search_page_is_reported_not_raised() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/search.json")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let batch = client_for(&server).fetch_reports(3).await;
        assert_eq!(batch.len(), 1);
        assert!(matches!(batch.entries()[0].outcome, ItemOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_detail_page() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/content/aaib-reports/d")
            .with_body(r#"{"details":{}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/aaib-reports/d")
            .with_body(r#"<a href="/media/1/AAIB_d.pdf">Download</a>"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let urls = client.resolve_pdf_urls("/aaib-reports/d").await.unwrap();
        assert_eq!(urls, vec![format!("{}/media/1/AAIB_d.pdf", server.url())]);
    }
}
