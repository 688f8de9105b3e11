// src/utils/mod.rs
pub mod batch;
pub mod error;
pub mod logging;

pub use batch::BatchReport;
pub use error::AppError; // Re-export main error type for convenience
