use std::path::Path;

use anyhow::{Context, Result, bail};
use git2::{ObjectType, Oid, Repository, Sort, StatusOptions};

use super::HistoryFilter;
use crate::model::Revision;

/// Local version-control source: enumerates revisions and resolves blob
/// sizes straight from the object store, without touching the working
/// tree.
pub struct LocalRepo {
    repo: Repository,
}

impl LocalRepo {
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::open(path)
            .with_context(|| format!("Failed to open git repository at {}", path.display()))?;
        Ok(Self { repo })
    }

    /// Name of the currently checked-out reference
    pub fn current_branch(&self) -> Result<String> {
        let head = self.repo.head().context("Failed to read HEAD")?;
        Ok(head.shorthand().unwrap_or("HEAD").to_string())
    }

    /// Whether the working copy has uncommitted or untracked changes
    pub fn is_dirty(&self) -> Result<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).include_ignored(false);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(!statuses.is_empty())
    }

    /// Switch the working copy to another branch.
    ///
    /// Refuses over a dirty working copy: switching references across
    /// uncommitted changes risks silent data loss, so the caller must
    /// commit or stash first.
    pub fn checkout(&self, branch: &str) -> Result<()> {
        if self.is_dirty()? {
            bail!(
                "working copy has uncommitted changes; commit or stash before switching to '{}'",
                branch
            );
        }

        let (object, reference) = self
            .repo
            .revparse_ext(branch)
            .with_context(|| format!("Branch '{}' not found", branch))?;
        self.repo.checkout_tree(&object, None)?;
        match reference {
            Some(r) => {
                let name = r.name().context("Branch name is not valid utf-8")?;
                self.repo.set_head(name)?;
            }
            None => self.repo.set_head_detached(object.id())?,
        }
        Ok(())
    }

    /// Enumerate revisions matching the filter, newest first.
    ///
    /// Linear mode walks the first-parent line of the filtered ref (or
    /// HEAD). Exhaustive mode walks every revision reachable from every
    /// ref, full merge ancestry included; each commit is yielded once,
    /// but the same file change may still surface under several merge
    /// commits, and the aggregator folds those duplicates.
    pub fn enumerate(&self, filter: &HistoryFilter, exhaustive: bool) -> Result<Vec<Revision>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;

        if exhaustive {
            revwalk.push_glob("refs/*")?;
            revwalk.push_head()?;
        } else {
            revwalk.simplify_first_parent()?;
            match &filter.reference {
                Some(reference) => {
                    let object = self
                        .repo
                        .revparse_single(reference)
                        .with_context(|| format!("Reference '{}' not found", reference))?;
                    let commit = object
                        .peel_to_commit()
                        .with_context(|| format!("'{}' does not point at a commit", reference))?;
                    revwalk.push(commit.id())?;
                }
                None => revwalk.push_head()?,
            }
        }

        let mut revisions = Vec::new();
        for oid in revwalk {
            let oid = match oid {
                Ok(oid) => oid,
                Err(_) => continue,
            };
            let commit = match self.repo.find_commit(oid) {
                Ok(c) => c,
                Err(_) => continue,
            };

            let timestamp = commit.time().seconds();
            if !filter.date_in_range(timestamp) {
                continue;
            }
            let title = commit.summary().unwrap_or("").to_string();
            if !filter.title_matches(&title) {
                continue;
            }

            revisions.push(Revision::new(oid.to_string(), timestamp, title));
            if let Some(limit) = filter.limit {
                if revisions.len() >= limit {
                    break;
                }
            }
        }

        Ok(revisions)
    }

    /// Paths changed by a revision, diffed against its first parent
    /// (or the empty tree for a root commit). Deleted paths are
    /// included; their size will resolve as absent.
    pub fn changed_files(&self, revision_id: &str) -> Result<Vec<String>> {
        let oid = Oid::from_str(revision_id)
            .with_context(|| format!("Invalid revision id '{}'", revision_id))?;
        let commit = self.repo.find_commit(oid)?;
        let tree = commit.tree()?;
        let parent_tree = commit.parent(0).ok().and_then(|p| p.tree().ok());

        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

        let mut files = Vec::new();
        for delta in diff.deltas() {
            let path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .and_then(|p| p.to_str());
            if let Some(path) = path {
                files.push(path.to_string());
            }
        }
        Ok(files)
    }

    /// Declared byte size of the blob recorded for `path` at a revision.
    ///
    /// Reads only the object header, so no content is inflated and no
    /// working-copy checkout happens. Returns `None` when the path does
    /// not exist at that revision (deleted or renamed away).
    pub fn blob_size_at(&self, revision_id: &str, path: &str) -> Option<u64> {
        let oid = Oid::from_str(revision_id).ok()?;
        let commit = self.repo.find_commit(oid).ok()?;
        let tree = commit.tree().ok()?;
        let entry = tree.get_path(Path::new(path)).ok()?;
        if entry.kind() != Some(ObjectType::Blob) {
            return None;
        }
        let odb = self.repo.odb().ok()?;
        let (size, _kind) = odb.read_header(entry.id()).ok()?;
        Some(size as u64)
    }
}
