use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::audit::FileFilter;
use crate::history::HistoryFilter;
use crate::util::parse_date;

#[derive(Parser, Debug)]
#[command(name = "bloatwatch", about = "Audit binary asset growth across version-control history")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Audit commits of a local repository (no checkout required)
    Local(LocalArgs),
    /// Audit commits of a branch through the hosting API
    History(RemoteHistoryArgs),
    /// Audit changed files of merge requests targeting a branch
    MergeRequests(MergeRequestArgs),
}

#[derive(Args, Debug)]
pub struct LocalArgs {
    /// Path to the git repository
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Branch to check out before auditing (refused over a dirty tree)
    #[arg(long)]
    pub branch: Option<String>,

    /// Walk every revision reachable from every ref, merge parents
    /// included, instead of the first-parent line of HEAD
    #[arg(long)]
    pub exhaustive: bool,

    /// Ref to walk (defaults to HEAD); ignored with --exhaustive
    #[arg(long = "ref")]
    pub reference: Option<String>,

    #[command(flatten)]
    pub filter: FilterArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct RemoteHistoryArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Branch whose commits to audit
    #[arg(long = "ref")]
    pub reference: String,

    #[command(flatten)]
    pub filter: FilterArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct MergeRequestArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Target branch of the merge requests
    #[arg(long)]
    pub target_branch: String,

    /// Merge request states to include (comma-separated: opened,merged,closed)
    #[arg(long, default_value = "opened")]
    pub mr_state: String,

    #[command(flatten)]
    pub filter: FilterArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct RemoteArgs {
    /// Base URL of the GitLab instance (e.g. https://gitlab.com)
    #[arg(long)]
    pub gitlab_url: String,

    /// Private access token
    #[arg(long)]
    pub token: String,

    /// Project id or url-encoded path (e.g. 1234 or group/app)
    #[arg(long)]
    pub project_id: String,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub no_verify_ssl: bool,

    /// Directory for the response cache (defaults to the user cache dir)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Bypass the response cache entirely (forces fresh fetches)
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Inclusive start date, YYYY-MM-DD
    #[arg(long)]
    pub start_date: Option<String>,

    /// Inclusive end date, YYYY-MM-DD
    #[arg(long)]
    pub end_date: Option<String>,

    /// Only revisions whose title contains this text (case-insensitive)
    #[arg(long)]
    pub title_contains: Option<String>,

    /// Audit at most this many revisions
    #[arg(long)]
    pub limit: Option<usize>,

    /// Only audit files whose path matches this regex (repeatable;
    /// any match qualifies)
    #[arg(long = "file-pattern")]
    pub file_patterns: Vec<String>,

    /// Only audit files of at least this size, in KB
    #[arg(long)]
    pub min_size_kb: Option<u64>,

    /// Only audit files up to this size, in KB
    #[arg(long)]
    pub max_size_kb: Option<u64>,
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Rows shown in the top-N tables
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Write the full audit as JSON to this path
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Suppress progress output
    #[arg(long)]
    pub quiet: bool,
}

impl FilterArgs {
    /// Validate dates and build the enumeration filter.
    /// Malformed dates fail here, before any enumeration begins.
    pub fn to_filter(&self, reference: Option<String>) -> Result<HistoryFilter> {
        Ok(HistoryFilter {
            reference,
            start_date: self.start_date.as_deref().map(parse_date).transpose()?,
            end_date: self.end_date.as_deref().map(parse_date).transpose()?,
            title_contains: self.title_contains.clone(),
            limit: self.limit,
        })
    }

    /// Validate the file patterns and build the per-file predicate
    pub fn to_file_filter(&self) -> Result<FileFilter> {
        FileFilter::new(&self.file_patterns, self.min_size_kb, self.max_size_kb)
    }
}

impl MergeRequestArgs {
    pub fn states(&self) -> Vec<String> {
        self.mr_state
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
