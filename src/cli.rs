//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use pmc_retriever::config::DEFAULT_OUTPUT_DIR;
use pmc_retriever::{PacingPolicy, RetrieverConfig, SearchQuery, Selection};

/// Search PubMed Central and download full-text articles.
///
/// Each selected article is fetched as PDF when possible, falling back to
/// XML and then plain text. The host may serve anti-bot challenges for PDFs;
/// passing --email usually helps, and XML is often the more reliable format.
#[derive(Parser, Debug)]
#[command(name = "pmc-retriever")]
#[command(author, version, about)]
pub struct Args {
    /// Search query (PMC query syntax allowed)
    pub query: String,

    /// Maximum number of search results to describe (1-500)
    #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..=500))]
    pub max: u32,

    /// Contact email sent to NCBI E-utilities
    #[arg(long)]
    pub email: Option<String>,

    /// NCBI API key
    #[arg(long)]
    pub api_key: Option<String>,

    /// Output directory for downloaded documents
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Which results to download: 'all' or comma-separated numbers (e.g. 1,3)
    #[arg(short, long, default_value = "all")]
    pub select: Selection,

    /// Delay between metadata requests in milliseconds (max 60000)
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub metadata_delay_ms: u64,

    /// Delay between document downloads in milliseconds (max 60000)
    #[arg(long, default_value_t = 3000, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub download_delay_ms: u64,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Log level used when `RUST_LOG` is unset.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    #[must_use]
    pub fn search_query(&self) -> SearchQuery {
        SearchQuery::new(self.query.clone(), usize::try_from(self.max).unwrap_or(usize::MAX))
    }

    #[must_use]
    pub fn retriever_config(&self) -> RetrieverConfig {
        RetrieverConfig::default()
            .with_output_dir(self.output.clone())
            .with_email(self.email.clone())
            .with_api_key(self.api_key.clone())
            .with_pacing(PacingPolicy {
                metadata_delay: Duration::from_millis(self.metadata_delay_ms),
                download_delay: Duration::from_millis(self.download_delay_ms),
            })
    }
}
