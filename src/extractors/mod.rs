// src/extractors/mod.rs
pub mod heuristic;
pub mod llm;
pub mod record;
pub mod runner;

use crate::utils::error::ExtractError;
use std::fmt;

// Re-export key extraction types for convenience
pub use heuristic::HeuristicExtractor;
pub use llm::LlmExtractor;
pub use record::{ExtractedFields, FieldRecord, COLUMNS};
pub use runner::extract_records;

/// How report text is turned into fields.
pub enum FieldExtractor {
    Heuristic(HeuristicExtractor),
    Llm(LlmExtractor),
}

impl FieldExtractor {
    pub async fn extract(&self, text: &str) -> Result<ExtractedFields, ExtractError> {
        match self {
            FieldExtractor::Heuristic(h) => Ok(h.extract(text)),
            FieldExtractor::Llm(llm) => llm.extract(text).await,
        }
    }
}

impl fmt::Display for FieldExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldExtractor::Heuristic(_) => write!(f, "heuristic extractor"),
            FieldExtractor::Llm(llm) => write!(f, "LLM extractor, model {}", llm.model()),
        }
    }
}
