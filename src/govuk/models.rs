// src/govuk/models.rs
use serde::{Deserialize, Serialize};

/// One page of the GOV.UK search API
/// Example: https://www.gov.uk/api/search.json?filter_format=aaib_report&count=2
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: Option<String>,
    pub link: String,
    #[serde(default)]
    pub public_timestamp: Option<String>,
}

/// Content item for a single report
/// Example: https://www.gov.uk/api/content/aaib-reports/aaib-investigation-to-cessna-172-g-abcd
#[derive(Debug, Deserialize)]
pub struct ContentItem {
    #[serde(default)]
    pub details: ContentDetails,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContentDetails {
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl Attachment {
    /// PDF attachments, minus the glossary of abbreviations shipped with most reports.
    pub fn is_report_pdf(&self) -> bool {
        let is_pdf = self.content_type.as_deref() == Some("application/pdf")
            || self.url.to_lowercase().ends_with(".pdf");
        is_pdf && !self.url.to_lowercase().contains("abbreviations")
    }
}

/// Report metadata as returned by the search API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub title: String,
    pub link: String, // path relative to the GOV.UK base, e.g. /aaib-reports/...
    pub date: Option<String>,
}

impl From<SearchResult> for ReportMetadata {
    fn from(result: SearchResult) -> Self {
        let date = result.public_timestamp.map(|ts| {
            chrono::DateTime::parse_from_rfc3339(&ts)
                .map(|dt| dt.date_naive().to_string())
                .unwrap_or(ts)
        });
        Self {
            title: result.title.unwrap_or_default(),
            link: result.link,
            date,
        }
    }
}

/// A report together with the PDF URLs found on its detail page
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReport {
    pub metadata: ReportMetadata,
    pub pdf_urls: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_date_is_reduced_to_day() {
        let result: SearchResult = serde_json::from_str(
            r#"{"title":"AAIB investigation to Cessna 172, G-ABCD","link":"/aaib-reports/x","public_timestamp":"2024-01-15T10:00:00.000+00:00"}"#,
        )
        .unwrap();
        let meta = ReportMetadata::from(result);
        assert_eq!(meta.date.as_deref(), Some("2024-01-15"));
        assert_eq!(meta.link, "/aaib-reports/x");
    }

    #[test]
    fn test_metadata_keeps_unparsable_timestamp() {
        let result: SearchResult =
            serde_json::from_str(r#"{"link":"/aaib-reports/y","public_timestamp":"January 2024"}"#).unwrap();
        let meta = ReportMetadata::from(result);
        assert_eq!(meta.date.as_deref(), Some("January 2024"));
        assert_eq!(meta.title, "");
    }

    #[test]
    fn test_attachment_filter() {
        let pdf = Attachment { url: "https://assets/report.pdf".into(), content_type: None };
        let typed = Attachment { url: "https://assets/file".into(), content_type: Some("application/pdf".into()) };
        let glossary = Attachment {
            url: "https://assets/AAIB_Abbreviations.pdf".into(),
            content_type: Some("application/pdf".into()),
        };
        let html = Attachment { url: "https://assets/page".into(), content_type: Some("text/html".into()) };

        assert!(pdf.is_report_pdf());
        assert!(typed.is_report_pdf());
        assert!(!glossary.is_report_pdf());
        assert!(!html.is_report_pdf());
    }
}
