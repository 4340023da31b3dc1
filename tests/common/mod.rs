// Shared test fixtures for integration tests
// Functions here are used across different test files
#![allow(dead_code)]

use git2::{Index, IndexEntry, IndexTime, Oid, Repository, Signature, Time};
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary git repository with user config set
pub fn create_test_repo() -> (TempDir, PathBuf, Repository) {
    let dir = TempDir::new().unwrap();
    let repo_path = dir.path().to_path_buf();
    let repo = Repository::init(&repo_path).unwrap();

    // Configure git user for commits
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();

    (dir, repo_path, repo)
}

fn signature_at(timestamp: i64) -> Signature<'static> {
    Signature::new("Test User", "test@example.com", &Time::new(timestamp, 0)).unwrap()
}

fn index_entry(path: &str) -> IndexEntry {
    IndexEntry {
        ctime: IndexTime::new(0, 0),
        mtime: IndexTime::new(0, 0),
        dev: 0,
        ino: 0,
        mode: 0o100644,
        uid: 0,
        gid: 0,
        file_size: 0,
        id: Oid::zero(),
        flags: 0,
        flags_extended: 0,
        path: path.as_bytes().to_vec(),
    }
}

/// Create a commit from an in-memory tree (no working-copy writes).
///
/// `files` is the complete file set of the commit; `parents` are the
/// parent commit ids. Does not move any reference.
pub fn commit_files(
    repo: &Repository,
    files: &[(&str, &[u8])],
    parents: &[Oid],
    message: &str,
    timestamp: i64,
) -> Oid {
    let mut index = Index::new().unwrap();
    for &(path, content) in files {
        let mut entry = index_entry(path);
        entry.id = repo.blob(content).unwrap();
        entry.file_size = content.len() as u32;
        index.add(&entry).unwrap();
    }
    let tree_id = index.write_tree_to(repo).unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let parent_commits: Vec<_> = parents
        .iter()
        .map(|oid| repo.find_commit(*oid).unwrap())
        .collect();
    let parent_refs: Vec<_> = parent_commits.iter().collect();

    let sig = signature_at(timestamp);
    repo.commit(None, &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
}

/// Point a branch at a commit, creating it if needed
pub fn set_branch(repo: &Repository, name: &str, oid: Oid) {
    repo.reference(&format!("refs/heads/{}", name), oid, true, "test")
        .unwrap();
}

/// Point HEAD at a branch without touching the working copy
pub fn set_head(repo: &Repository, name: &str) {
    repo.set_head(&format!("refs/heads/{}", name)).unwrap();
}

/// Add files through the working copy and index, then commit to HEAD.
/// Used by checkout tests that need a materialized worktree.
pub fn add_commit(repo: &Repository, files: &[(&str, &[u8])], message: &str) -> Oid {
    let sig = Signature::now("Test User", "test@example.com").unwrap();

    let mut index = repo.index().unwrap();
    for (path, content) in files {
        let full_path = repo.workdir().unwrap().join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&full_path, content).unwrap();
        index.add_path(std::path::Path::new(path)).unwrap();
    }
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    match parent {
        Some(parent) => repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])
            .unwrap(),
        None => repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[])
            .unwrap(),
    }
}
