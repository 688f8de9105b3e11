// src/govuk/mod.rs
pub mod client;
pub mod models;

pub use client::GovUkClient;
