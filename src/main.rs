// src/main.rs
mod config;
mod export;
mod extractors;
mod govuk;
mod pdf;
mod pipeline;
mod storage;
mod utils;

use clap::Parser;
use config::Config;
use pipeline::{run_pipeline, PipelineOptions};
use std::process::ExitCode;
use utils::AppError;

/// Collects UK AAIB accident reports and summarises them into Excel/CSV
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Settings are read from the environment or a .env file \
(OPENAI_API_KEY, OPENAI_MODEL, NUM_REPORTS, DATA_DIR, PDFS_DIR, TEXTS_DIR, \
EXTRACTED_DIR, OUTPUT_EXCEL, OUTPUT_CSV). Flags override them.")]
struct Args {
    /// Number of reports to fetch and process (default: NUM_REPORTS)
    #[arg(short, long)]
    num_reports: Option<usize>,

    /// Use the OpenAI API for field extraction (requires OPENAI_API_KEY)
    #[arg(long)]
    use_llm: bool,

    /// Model to use with --use-llm (default: OPENAI_MODEL)
    #[arg(long)]
    llm_model: Option<String>,

    /// Skip report search and PDF download, using PDFs already on disk
    #[arg(long)]
    skip_download: bool,

    /// Skip PDF text extraction, using text files already on disk
    #[arg(long)]
    skip_extraction: bool,

    /// Re-extract fields even for reports that already have a record
    #[arg(long)]
    force: bool,
}

async fn run(args: Args) -> Result<(), AppError> {
    let config = Config::from_env()?.with_overrides(args.num_reports, args.llm_model.as_deref());
    let options = PipelineOptions {
        use_llm: args.use_llm,
        skip_download: args.skip_download,
        skip_extraction: args.skip_extraction,
        force: args.force,
    };

    let summary = run_pipeline(&config, &options).await?;
    tracing::info!("Finished: {:?}", summary);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::debug!("Starting with args: {:?}", args);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
