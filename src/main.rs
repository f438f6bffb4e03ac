//! CLI entry point for the PMC retriever.

use anyhow::{Context, Result};
use clap::Parser;
use pmc_retriever::{Representation, RetrievalReport, Retriever, SkipStage};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.default_log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = args.retriever_config();
    debug!(?config, selection = %args.select, "CLI arguments parsed");

    let mut retriever = Retriever::new(config).context("failed to set up retrieval session")?;
    let query = args.search_query();
    info!(query = %query.term, max_results = query.max_results, "searching PubMed Central");

    let report = retriever
        .search_and_download(&query, &args.select)
        .await
        .context("invalid --select for the listed results")?;

    if !args.quiet {
        print_report(&report);
    }
    if report.antibot_blocked() > 0 {
        warn!(
            count = report.antibot_blocked(),
            "some PDFs were blocked by an anti-bot challenge; open the article pages manually"
        );
    }
    Ok(())
}

fn print_report(report: &RetrievalReport) {
    if let Some(failure) = &report.search_failure {
        println!("Search failed: {failure}");
        return;
    }
    if report.candidates.is_empty() {
        println!("No results found for '{}'.", report.query);
    } else {
        println!("Found {} articles:", report.candidates.len());
        for (position, descriptor) in report.candidates.iter().enumerate() {
            println!("{}. {}: {}", position + 1, descriptor.identifier, descriptor.title);
        }
    }

    if !report.retrieved.is_empty() {
        println!("\nRetrieved {} documents:", report.retrieved.len());
        for document in &report.retrieved {
            let note = if document.representation_kind == Representation::Pdf {
                String::new()
            } else {
                format!(" (fallback to {})", document.representation_kind)
            };
            println!("  {}{note}", document.local_path.display());
        }
    }

    if !report.skipped.is_empty() {
        println!("\nSkipped {} documents:", report.skipped.len());
        for skipped in &report.skipped {
            let stage = match skipped.stage {
                SkipStage::Metadata => "metadata",
                SkipStage::Download => "download",
            };
            println!("  {} [{stage}]: {}", skipped.identifier, skipped.reason);
        }
    }
}
