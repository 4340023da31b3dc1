// End-to-end audit pipeline tests over real (temporary) git repositories

mod common;

use bloatwatch::audit::{Audit, CancelToken, FileFilter};
use bloatwatch::diag::Diagnostics;
use bloatwatch::history::{HistoryFilter, LocalRepo};
use bloatwatch::model::Classification;

const JAN_09: i64 = 1704801600;
const JAN_10: i64 = 1704888000;
const JAN_11: i64 = 1704974400;

fn quiet_audit() -> Audit {
    Audit::new(CancelToken::new(), true)
}

#[test]
fn test_icon_growth_flags_file_over_budget() {
    let (_dir, repo_path, repo) = common::create_test_repo();

    // C1 adds a 40 KB icon (within the 50 KB PNG budget),
    // C2 replaces it with a 60 KB version (over budget)
    let v1 = vec![1u8; 40 * 1024];
    let v2 = vec![2u8; 60 * 1024];
    let c1 = common::commit_files(&repo, &[("icon.png", &v1)], &[], "Add icon", JAN_09);
    let c2 = common::commit_files(&repo, &[("icon.png", &v2)], &[c1], "Sharper icon", JAN_10);
    common::set_branch(&repo, "main", c2);
    common::set_head(&repo, "main");

    let local = LocalRepo::open(&repo_path).unwrap();
    let mut diag = Diagnostics::new();
    let outcome = quiet_audit()
        .run_local(&local, &HistoryFilter::default(), false, &mut diag)
        .unwrap();

    assert!(!outcome.cancelled);
    let tables = outcome.tables;
    assert_eq!(tables.files.len(), 1);
    let icon = &tables.files[0];
    assert_eq!(icon.path, "icon.png");
    assert_eq!(icon.max_size, 60 * 1024);
    assert_eq!(icon.change_count, 2);
    assert_eq!(icon.worst, Classification::OverBudget);
    assert_eq!(icon.last_title, "Sharper icon");

    // Both revisions are accounted for
    assert_eq!(tables.revisions.len(), 2);
    let heaviest = tables.top_revisions(1);
    assert_eq!(heaviest[0].revision, c2.to_string());
    assert_eq!(heaviest[0].total_size, 60 * 1024);
}

#[test]
fn test_shrunk_file_stays_flagged() {
    let (_dir, repo_path, repo) = common::create_test_repo();

    let big = vec![1u8; 60 * 1024];
    let small = vec![2u8; 10 * 1024];
    let c1 = common::commit_files(&repo, &[("icon.png", &big)], &[], "Too big", JAN_09);
    let c2 = common::commit_files(&repo, &[("icon.png", &small)], &[c1], "Compress", JAN_10);
    common::set_branch(&repo, "main", c2);
    common::set_head(&repo, "main");

    let local = LocalRepo::open(&repo_path).unwrap();
    let mut diag = Diagnostics::new();
    let outcome = quiet_audit()
        .run_local(&local, &HistoryFilter::default(), false, &mut diag)
        .unwrap();

    // The later fix must not hide the historical regression
    let icon = &outcome.tables.files[0];
    assert_eq!(icon.worst, Classification::OverBudget);
    assert_eq!(icon.max_size, 60 * 1024);
}

#[test]
fn test_merge_ancestry_folds_to_one_aggregate() {
    let (_dir, repo_path, repo) = common::create_test_repo();

    // Both merge parents modified the same file
    let base = common::commit_files(&repo, &[("icon.png", &[0u8; 100])], &[], "base", JAN_09);
    let ours = common::commit_files(&repo, &[("icon.png", &[1u8; 200])], &[base], "ours", JAN_10);
    let theirs =
        common::commit_files(&repo, &[("icon.png", &[2u8; 300])], &[base], "theirs", JAN_10);
    let merge = common::commit_files(
        &repo,
        &[("icon.png", &[1u8; 200])],
        &[ours, theirs],
        "merge",
        JAN_11,
    );
    common::set_branch(&repo, "main", merge);
    common::set_head(&repo, "main");

    let local = LocalRepo::open(&repo_path).unwrap();
    let mut diag = Diagnostics::new();
    let outcome = quiet_audit()
        .run_local(&local, &HistoryFilter::default(), true, &mut diag)
        .unwrap();

    let tables = outcome.tables;
    // Exactly one aggregate for the file, counting each distinct
    // touching revision once (base, ours, theirs; the merge resolved
    // to its first parent's blob, so it introduced no change)
    assert_eq!(tables.files.len(), 1);
    let icon = &tables.files[0];
    assert_eq!(icon.change_count, 3);
    assert_eq!(icon.max_size, 300);
}

#[test]
fn test_deleted_file_counts_without_size() {
    let (_dir, repo_path, repo) = common::create_test_repo();

    let c1 = common::commit_files(
        &repo,
        &[("keep.txt", b"x"), ("video.mp4", &[0u8; 5000])],
        &[],
        "add",
        JAN_09,
    );
    let c2 = common::commit_files(&repo, &[("keep.txt", b"x")], &[c1], "drop video", JAN_10);
    common::set_branch(&repo, "main", c2);
    common::set_head(&repo, "main");

    let local = LocalRepo::open(&repo_path).unwrap();
    let mut diag = Diagnostics::new();
    let outcome = quiet_audit()
        .run_local(&local, &HistoryFilter::default(), false, &mut diag)
        .unwrap();

    let tables = outcome.tables;
    let video = tables.files.iter().find(|f| f.path == "video.mp4").unwrap();
    // Touched twice (added, deleted); the deletion resolves no size and
    // must never classify the file over budget
    assert_eq!(video.change_count, 2);
    assert_eq!(video.max_size, 5000);
    assert_eq!(video.worst, Classification::WithinBudget);

    let drop_rev = tables
        .revisions
        .iter()
        .find(|r| r.revision == c2.to_string())
        .unwrap();
    assert_eq!(drop_rev.file_count, 1);
    assert_eq!(drop_rev.total_size, 0);
}

#[test]
fn test_file_patterns_restrict_the_audit() {
    let (_dir, repo_path, repo) = common::create_test_repo();

    let icon = vec![1u8; 60 * 1024];
    let c1 = common::commit_files(
        &repo,
        &[("res/icon.png", &icon), ("docs/notes.txt", b"text")],
        &[],
        "Add assets and docs",
        JAN_09,
    );
    common::set_branch(&repo, "main", c1);
    common::set_head(&repo, "main");

    let filter = FileFilter::new(&[r"\.png$".to_string()], None, None).unwrap();
    let audit = Audit::new(CancelToken::new(), true).with_file_filter(filter);

    let local = LocalRepo::open(&repo_path).unwrap();
    let mut diag = Diagnostics::new();
    let outcome = audit
        .run_local(&local, &HistoryFilter::default(), false, &mut diag)
        .unwrap();

    let tables = outcome.tables;
    assert_eq!(tables.files.len(), 1);
    assert_eq!(tables.files[0].path, "res/icon.png");
    // The revision rollup only counts the files that passed the filter
    assert_eq!(tables.revisions[0].file_count, 1);
}

#[test]
fn test_size_window_excludes_small_and_unresolved_files() {
    let (_dir, repo_path, repo) = common::create_test_repo();

    let big = vec![1u8; 30 * 1024];
    let c1 = common::commit_files(
        &repo,
        &[("big.png", &big), ("tiny.png", b"x"), ("gone.png", b"y")],
        &[],
        "add",
        JAN_09,
    );
    let c2 = common::commit_files(
        &repo,
        &[("big.png", &big), ("tiny.png", b"x")],
        &[c1],
        "drop one",
        JAN_10,
    );
    common::set_branch(&repo, "main", c2);
    common::set_head(&repo, "main");

    // 10 KB lower bound: the tiny file is under it, and the deletion in
    // C2 resolves no size so it cannot qualify either
    let filter = FileFilter::new(&[], Some(10), None).unwrap();
    let audit = Audit::new(CancelToken::new(), true).with_file_filter(filter);

    let local = LocalRepo::open(&repo_path).unwrap();
    let mut diag = Diagnostics::new();
    let outcome = audit
        .run_local(&local, &HistoryFilter::default(), false, &mut diag)
        .unwrap();

    let tables = outcome.tables;
    assert_eq!(tables.files.len(), 1);
    assert_eq!(tables.files[0].path, "big.png");
    assert_eq!(tables.files[0].max_size, 30 * 1024);
}

#[test]
fn test_cancelled_run_preserves_partial_state() {
    let (_dir, repo_path, repo) = common::create_test_repo();

    let c1 = common::commit_files(&repo, &[("a.txt", b"1")], &[], "first", JAN_09);
    common::set_branch(&repo, "main", c1);
    common::set_head(&repo, "main");

    let token = CancelToken::new();
    token.cancel();
    let audit = Audit::new(token, true);

    let local = LocalRepo::open(&repo_path).unwrap();
    let mut diag = Diagnostics::new();
    let outcome = audit
        .run_local(&local, &HistoryFilter::default(), false, &mut diag)
        .unwrap();

    // Cancelled before the first revision: empty but well-formed tables,
    // and the interruption is reported as a warning
    assert!(outcome.cancelled);
    assert!(outcome.tables.files.is_empty());
    assert_eq!(diag.len(), 1);
}

#[test]
fn test_checkout_refused_on_dirty_worktree() {
    let (_dir, repo_path, repo) = common::create_test_repo();

    common::add_commit(&repo, &[("tracked.txt", b"clean")], "init");
    let head = repo.head().unwrap().peel_to_commit().unwrap().id();
    common::set_branch(&repo, "other", head);

    let local = LocalRepo::open(&repo_path).unwrap();
    assert!(!local.is_dirty().unwrap());

    // Uncommitted modification makes the tree dirty
    std::fs::write(repo.workdir().unwrap().join("tracked.txt"), b"edited").unwrap();
    assert!(local.is_dirty().unwrap());

    let err = local.checkout("other").unwrap_err();
    assert!(err.to_string().contains("uncommitted changes"));
}

#[test]
fn test_checkout_switches_clean_worktree() {
    let (_dir, repo_path, repo) = common::create_test_repo();

    common::add_commit(&repo, &[("tracked.txt", b"clean")], "init");
    let head = repo.head().unwrap().peel_to_commit().unwrap().id();
    common::set_branch(&repo, "release", head);

    let local = LocalRepo::open(&repo_path).unwrap();
    local.checkout("release").unwrap();
    assert_eq!(local.current_branch().unwrap(), "release");
}
