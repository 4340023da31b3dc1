mod aggregate;
mod audit;
mod cli;
mod diag;
mod history;
mod model;
mod policy;
mod report;
mod util;

use anyhow::{Context, Result};
use clap::Parser;

use audit::{Audit, AuditOutcome, CancelToken};
use cli::{Cli, Command, OutputArgs, RemoteArgs};
use diag::Diagnostics;
use history::{FetchCache, GitLabClient, LocalRepo};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\ninterrupt received, finishing current revision...");
        handler_token.cancel();
    })
    .context("Failed to install interrupt handler")?;

    let mut diag = Diagnostics::new();

    let (outcome, output) = match cli.command {
        Command::Local(args) => {
            let filter = args.filter.to_filter(args.reference.clone())?;
            let repo = LocalRepo::open(&args.repo)?;
            if let Some(branch) = &args.branch {
                repo.checkout(branch)?;
            }
            if !args.output.quiet {
                eprintln!("Auditing branch: {}", repo.current_branch()?);
            }
            let audit = Audit::new(cancel, args.output.quiet)
                .with_file_filter(args.filter.to_file_filter()?);
            let outcome = audit.run_local(&repo, &filter, args.exhaustive, &mut diag)?;
            (outcome, args.output)
        }
        Command::History(args) => {
            let filter = args.filter.to_filter(Some(args.reference.clone()))?;
            let client = remote_client(&args.remote)?;
            let audit = Audit::new(cancel, args.output.quiet)
                .with_file_filter(args.filter.to_file_filter()?);
            let outcome = audit.run_remote_history(&client, &filter, &mut diag)?;
            (outcome, args.output)
        }
        Command::MergeRequests(args) => {
            let filter = args.filter.to_filter(None)?;
            let states = args.states();
            let client = remote_client(&args.remote)?;
            let audit = Audit::new(cancel, args.output.quiet)
                .with_file_filter(args.filter.to_file_filter()?);
            let outcome = audit.run_remote_merge_requests(
                &client,
                &args.target_branch,
                &states,
                &filter,
                &mut diag,
            )?;
            (outcome, args.output)
        }
    };

    finish(outcome, &output, &diag)
}

fn remote_client(args: &RemoteArgs) -> Result<GitLabClient> {
    let cache = if args.no_cache {
        FetchCache::disabled()
    } else {
        let dir = match &args.cache_dir {
            Some(dir) => dir.clone(),
            None => FetchCache::default_dir()?,
        };
        FetchCache::new(dir)
    };
    GitLabClient::new(
        &args.gitlab_url,
        &args.token,
        &args.project_id,
        cache,
        !args.no_verify_ssl,
    )
}

fn finish(outcome: AuditOutcome, output: &OutputArgs, diag: &Diagnostics) -> Result<()> {
    report::print_summary(&outcome.tables, output.top);

    if let Some(path) = &output.output {
        report::write_json(path, &outcome.tables)?;
        if !output.quiet {
            eprintln!("Report written to {}", path.display());
        }
    }

    diag.report();
    Ok(())
}
