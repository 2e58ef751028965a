use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::COURSE_URL;
use crate::http::RetryPolicy;

#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Content platform API token used when uploading.
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Crawl, download, build the tree and publish it.
    Run(RunArgs),
    /// Scrape the course index into `<workdir>/index.json`.
    Crawl(CrawlArgs),
    /// Download and extract every archive listed in the index.
    Download(DownloadArgs),
    /// Build the content tree from extracted packages.
    Tree(TreeArgs),
}

#[derive(Debug, Clone, Args)]
pub struct NetworkArgs {
    /// Attempts per request before giving up on an item.
    #[arg(long, default_value_t = 5)]
    pub max_attempts: u32,

    /// Backoff step; attempt N waits N times this long.
    #[arg(long, default_value_t = 1000)]
    pub backoff_ms: u64,

    /// Per-request timeout.
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,
}

impl NetworkArgs {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            backoff_step: Duration::from_millis(self.backoff_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Args)]
pub struct CrawlArgs {
    /// Course index page.
    #[arg(long, default_value = COURSE_URL)]
    pub url: String,

    /// Working directory for downloads and outputs.
    #[arg(long, default_value = "chefdata")]
    pub workdir: String,

    /// YAML file overriding channel info and index anchors.
    #[arg(long)]
    pub channel: Option<String>,

    #[command(flatten)]
    pub network: NetworkArgs,
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Working directory holding `index.json`.
    #[arg(long, default_value = "chefdata")]
    pub workdir: String,

    #[command(flatten)]
    pub network: NetworkArgs,
}

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Working directory holding `index.json` and extracted archives.
    #[arg(long, default_value = "chefdata")]
    pub workdir: String,

    /// YAML file overriding channel info and index anchors.
    #[arg(long)]
    pub channel: Option<String>,

    /// Output path for the tree (default: `<workdir>/channel.json`).
    #[arg(long)]
    pub out: Option<String>,

    /// Overwrite an existing tree.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Course index page.
    #[arg(long, default_value = COURSE_URL)]
    pub url: String,

    /// Working directory for downloads and outputs.
    #[arg(long, default_value = "chefdata")]
    pub workdir: String,

    /// YAML file overriding channel info and index anchors.
    #[arg(long)]
    pub channel: Option<String>,

    /// Upload endpoint; without it the tree is only written to the workdir.
    #[arg(long)]
    pub upload_url: Option<String>,

    #[command(flatten)]
    pub network: NetworkArgs,
}
