use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use regex::Regex;

use crate::aggregate::{Aggregator, AuditTables};
use crate::diag::Diagnostics;
use crate::history::{GitLabClient, HistoryFilter, LocalRepo};
use crate::model::{ChangeRecord, Revision};

/// Explicit cancellation signal, checked between revisions.
///
/// An interrupt flips the flag; the pipeline notices at the next
/// revision boundary and returns whatever aggregation has completed,
/// rather than discarding partial results.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-file predicate applied to change observations before folding.
///
/// Patterns are unanchored regexes over the repository path; with any
/// patterns set, a file qualifies when at least one matches. Size
/// bounds are inclusive and expressed in KB on the command line; an
/// unresolved size fails any size bound, since it cannot be placed in
/// the window.
#[derive(Default)]
pub struct FileFilter {
    patterns: Vec<Regex>,
    min_bytes: Option<u64>,
    max_bytes: Option<u64>,
}

impl FileFilter {
    pub fn new(
        patterns: &[String],
        min_size_kb: Option<u64>,
        max_size_kb: Option<u64>,
    ) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p).with_context(|| format!("invalid file pattern '{}'", p))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            patterns,
            min_bytes: min_size_kb.map(|kb| kb * 1024),
            max_bytes: max_size_kb.map(|kb| kb * 1024),
        })
    }

    /// Path-only check, usable before the size is resolved so filtered
    /// files never cost a size lookup
    pub fn matches_path(&self, path: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.is_match(path))
    }

    pub fn accepts(&self, path: &str, size: Option<u64>) -> bool {
        if !self.matches_path(path) {
            return false;
        }
        if self.min_bytes.is_none() && self.max_bytes.is_none() {
            return true;
        }
        let Some(size) = size else {
            return false;
        };
        if let Some(min) = self.min_bytes {
            if size < min {
                return false;
            }
        }
        if let Some(max) = self.max_bytes {
            if size > max {
                return false;
            }
        }
        true
    }
}

/// Result of one audit run: the finalized tables plus whether the run
/// was cut short by cancellation
pub struct AuditOutcome {
    pub tables: AuditTables,
    pub cancelled: bool,
}

/// Single-threaded audit pipeline: enumerate revisions, resolve sizes,
/// classify, aggregate. One instance per run; the aggregate tables are
/// owned here until handed to the report.
pub struct Audit {
    cancel: CancelToken,
    quiet: bool,
    files: FileFilter,
}

impl Audit {
    pub fn new(cancel: CancelToken, quiet: bool) -> Self {
        Self {
            cancel,
            quiet,
            files: FileFilter::default(),
        }
    }

    pub fn with_file_filter(mut self, files: FileFilter) -> Self {
        self.files = files;
        self
    }

    fn progress(&self, len: u64, label: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        if self.quiet {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        } else if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} {msg}: [{bar:50.cyan/blue}] {pos}/{len} ({per_sec})")
        {
            pb.set_style(style.progress_chars("=>-"));
            pb.set_message(label.to_string());
        }
        pb
    }

    /// Audit revisions of a local repository, without checkout
    pub fn run_local(
        &self,
        repo: &LocalRepo,
        filter: &HistoryFilter,
        exhaustive: bool,
        diag: &mut Diagnostics,
    ) -> Result<AuditOutcome> {
        let revisions = repo.enumerate(filter, exhaustive)?;
        if !self.quiet {
            eprintln!("Found {} revision(s) in range", revisions.len());
        }

        let pb = self.progress(revisions.len() as u64, "Auditing revisions");
        let mut aggregator = Aggregator::new();
        let mut cancelled = false;

        for revision in &revisions {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            pb.inc(1);

            let files = match repo.changed_files(&revision.id) {
                Ok(files) => files,
                Err(e) => {
                    diag.warn(format!(
                        "revision {}: could not list changed files: {:#}",
                        revision.short_id(),
                        e
                    ));
                    continue;
                }
            };
            for path in files {
                if !self.files.matches_path(&path) {
                    continue;
                }
                let size = repo.blob_size_at(&revision.id, &path);
                if !self.files.accepts(&path, size) {
                    continue;
                }
                aggregator.fold(ChangeRecord::new(revision, path, size));
            }
        }
        pb.finish_and_clear();

        self.finish(aggregator, cancelled, diag)
    }

    /// Audit a branch through the hosting API, one revision at a time
    pub fn run_remote_history(
        &self,
        client: &GitLabClient,
        filter: &HistoryFilter,
        diag: &mut Diagnostics,
    ) -> Result<AuditOutcome> {
        let revisions = client.list_commits(filter, diag)?;
        if !self.quiet {
            eprintln!("Found {} revision(s) in range", revisions.len());
        }

        let pb = self.progress(revisions.len() as u64, "Auditing revisions");
        let mut aggregator = Aggregator::new();
        let mut cancelled = false;

        for revision in &revisions {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            pb.inc(1);

            let changes = match client.commit_changes(&revision.id) {
                Ok(changes) => changes,
                Err(e) => {
                    diag.warn(format!(
                        "revision {}: could not fetch changes: {:#}",
                        revision.short_id(),
                        e
                    ));
                    continue;
                }
            };
            for entry in changes {
                if !self.files.matches_path(&entry.new_path) {
                    continue;
                }
                let size = client.resolve_size(&revision.id, &entry, diag);
                if !self.files.accepts(&entry.new_path, size) {
                    continue;
                }
                aggregator.fold(ChangeRecord::new(revision, entry.new_path.clone(), size));
            }
        }
        pb.finish_and_clear();

        self.finish(aggregator, cancelled, diag)
    }

    /// Audit the changed files of merge requests targeting a branch.
    /// Each MR is treated as one pseudo-revision keyed by its iid; the
    /// filter's date window applies to the MR's last-updated date.
    pub fn run_remote_merge_requests(
        &self,
        client: &GitLabClient,
        target_branch: &str,
        states: &[String],
        filter: &HistoryFilter,
        diag: &mut Diagnostics,
    ) -> Result<AuditOutcome> {
        let mrs = client.merge_requests(
            target_branch,
            states,
            filter.title_contains.as_deref(),
            diag,
        )?;
        if !self.quiet {
            eprintln!("Found {} merge request(s)", mrs.len());
        }

        let pb = self.progress(mrs.len() as u64, "Auditing merge requests");
        let mut aggregator = Aggregator::new();
        let mut cancelled = false;
        let mut audited = 0usize;

        for mr in &mrs {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if let Some(limit) = filter.limit {
                if audited >= limit {
                    break;
                }
            }
            pb.inc(1);

            let timestamp =
                crate::history::parse_timestamp(&mr.updated_at).unwrap_or_default();
            if !filter.date_in_range(timestamp) {
                continue;
            }
            let revision = Revision::new(
                format!("!{}", mr.iid),
                timestamp,
                format!("{} ({})", mr.title, mr.state),
            );

            let (head_sha, changes) = match client.merge_request_changes(mr.iid) {
                Ok(changes) => changes,
                Err(e) => {
                    diag.warn(format!("MR !{}: could not fetch changes: {:#}", mr.iid, e));
                    continue;
                }
            };
            // Blob lookups are pinned to the MR head revision; without
            // one the diff-length fallback covers size estimation
            let pin = head_sha.as_deref().unwrap_or(&revision.id);
            for entry in changes {
                if !self.files.matches_path(&entry.new_path) {
                    continue;
                }
                let size = client.resolve_size(pin, &entry, diag);
                if !self.files.accepts(&entry.new_path, size) {
                    continue;
                }
                aggregator.fold(ChangeRecord::new(&revision, entry.new_path.clone(), size));
            }
            audited += 1;
        }
        pb.finish_and_clear();

        self.finish(aggregator, cancelled, diag)
    }

    fn finish(
        &self,
        aggregator: Aggregator,
        cancelled: bool,
        diag: &mut Diagnostics,
    ) -> Result<AuditOutcome> {
        if cancelled {
            diag.warn("run interrupted; results cover only the revisions audited so far");
        }
        Ok(AuditOutcome {
            tables: aggregator.finish(),
            cancelled,
        })
    }
}
