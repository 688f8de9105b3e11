// src/pdf/mod.rs
pub mod download;
pub mod text;

pub use download::download_pdfs;
pub use text::extract_texts;
