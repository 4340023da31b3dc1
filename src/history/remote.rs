use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use super::{FetchCache, HistoryFilter};
use crate::diag::Diagnostics;
use crate::model::Revision;

const PAGE_SIZE: usize = 100;
/// Fixed pause between live API calls, to stay under hosting rate limits.
/// Cache hits skip it entirely.
const REQUEST_DELAY: Duration = Duration::from_millis(500);

/// Commit entry from the repository commit-listing endpoint
#[derive(Debug, Deserialize)]
struct ApiCommit {
    id: String,
    title: String,
    created_at: String,
}

/// One changed file from a commit or merge-request diff
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteDiffEntry {
    pub new_path: String,
    #[serde(default)]
    pub diff: String,
    #[serde(default)]
    pub deleted_file: bool,
}

#[derive(Debug, Deserialize)]
struct BlobInfo {
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DiffRefs {
    head_sha: String,
}

#[derive(Debug, Deserialize)]
struct MergeRequestChanges {
    changes: Vec<RemoteDiffEntry>,
    diff_refs: Option<DiffRefs>,
}

/// Change request targeting a branch, as listed by the hosting API
#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequest {
    pub iid: u64,
    pub title: String,
    pub state: String,
    pub updated_at: String,
}

/// Client for a GitLab-style hosting API. Every request is memoized
/// through the fetch cache; only live fetches pay the rate-limit delay.
pub struct GitLabClient {
    http: reqwest::blocking::Client,
    api_url: String,
    token: String,
    project: String,
    cache: FetchCache,
}

impl GitLabClient {
    pub fn new(
        base_url: &str,
        token: &str,
        project_id: &str,
        cache: FetchCache,
        verify_ssl: bool,
    ) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(!verify_ssl)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            api_url: format!("{}/api/v4", base_url.trim_end_matches('/')),
            token: token.to_string(),
            project: encode_component(project_id),
            cache,
        })
    }

    /// GET a project endpoint through the cache
    fn get(
        &self,
        endpoint: &str,
        resource: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<String> {
        let url = format!("{}/projects/{}/{}", self.api_url, self.project, resource);
        self.cache.get_or_fetch(endpoint, params, || {
            let response = self
                .http
                .get(&url)
                .header("PRIVATE-TOKEN", &self.token)
                .query(params)
                .send()
                .with_context(|| format!("Request to {} failed", url))?
                .error_for_status()
                .with_context(|| format!("Request to {} returned an error status", url))?;
            let body = response.text()?;
            thread::sleep(REQUEST_DELAY);
            Ok(body)
        })
    }

    /// Enumerate commits on a ref, newest first, honoring the filter.
    ///
    /// Pagination stops on an empty page or a short page. With a start
    /// date set, it also stops as soon as the oldest commit in a page
    /// predates it. The early stop assumes the API returns commits in
    /// descending chronological order; a diagnostic notes when it fires.
    pub fn list_commits(
        &self,
        filter: &HistoryFilter,
        diag: &mut Diagnostics,
    ) -> Result<Vec<Revision>> {
        let reference = filter
            .reference
            .as_deref()
            .context("Remote enumeration requires a ref name")?;

        let mut revisions = Vec::new();
        let mut page = 1usize;
        loop {
            let mut params = BTreeMap::new();
            params.insert("ref_name".to_string(), reference.to_string());
            params.insert("per_page".to_string(), PAGE_SIZE.to_string());
            params.insert("page".to_string(), page.to_string());
            if let Some(start) = filter.start_date {
                params.insert("after".to_string(), date_param(start)?);
            }
            if let Some(end) = filter.end_date {
                params.insert("before".to_string(), date_param(end)?);
            }

            let body = self.get("commits", "repository/commits", &params)?;
            let commits: Vec<ApiCommit> =
                serde_json::from_str(&body).context("Malformed commit listing payload")?;
            if commits.is_empty() {
                break;
            }

            for commit in &commits {
                let Some(timestamp) = parse_timestamp(&commit.created_at) else {
                    diag.warn(format!(
                        "commit {}: unparseable timestamp '{}'",
                        commit.id, commit.created_at
                    ));
                    continue;
                };
                // The API date params bound the query, but page contents
                // are re-checked so an off-boundary entry never slips in
                if !filter.date_in_range(timestamp) {
                    continue;
                }
                if !filter.title_matches(&commit.title) {
                    continue;
                }
                revisions.push(Revision::new(commit.id.clone(), timestamp, commit.title.clone()));
                if let Some(limit) = filter.limit {
                    if revisions.len() >= limit {
                        return Ok(revisions);
                    }
                }
            }

            let oldest = commits.last().and_then(|c| parse_timestamp(&c.created_at));
            match page_stop(commits.len(), PAGE_SIZE, oldest, filter) {
                PageStop::DateBoundary => {
                    diag.warn(format!(
                        "stopped paginating at page {}: oldest commit predates the start date \
                         (assumes the API lists commits newest-first)",
                        page
                    ));
                    break;
                }
                PageStop::LastPage => break,
                PageStop::Continue => page += 1,
            }
        }

        Ok(revisions)
    }

    /// Changed files for one commit
    pub fn commit_changes(&self, revision_id: &str) -> Result<Vec<RemoteDiffEntry>> {
        let mut params = BTreeMap::new();
        params.insert("commit_id".to_string(), revision_id.to_string());
        let resource = format!("repository/commits/{}/diff", revision_id);
        let body = self.get("commit_changes", &resource, &params)?;
        serde_json::from_str(&body).context("Malformed commit diff payload")
    }

    /// Declared blob size for a path pinned at a revision
    fn blob_size(&self, revision_id: &str, path: &str) -> Result<Option<u64>> {
        let mut params = BTreeMap::new();
        params.insert("ref".to_string(), revision_id.to_string());
        params.insert("path".to_string(), path.to_string());
        let resource = format!("repository/files/{}/blob", encode_component(path));
        let body = self.get("file_blob", &resource, &params)?;
        let info: BlobInfo = serde_json::from_str(&body).context("Malformed blob payload")?;
        Ok(info.size)
    }

    /// Resolve the size of one changed file at a revision.
    ///
    /// Prefers blob metadata; when that fails or omits the size, falls
    /// back to the byte length of the diff body, an approximation that
    /// measures diff markup rather than the true blob. Deleted files resolve
    /// as absent. Failures are recorded as warnings, never fatal.
    pub fn resolve_size(
        &self,
        revision_id: &str,
        entry: &RemoteDiffEntry,
        diag: &mut Diagnostics,
    ) -> Option<u64> {
        if entry.deleted_file {
            return None;
        }
        match self.blob_size(revision_id, &entry.new_path) {
            Ok(Some(size)) => Some(size),
            Ok(None) | Err(_) if !entry.diff.is_empty() => {
                diag.warn(format!(
                    "{} at {}: blob metadata unavailable, estimated from diff body",
                    entry.new_path, revision_id
                ));
                Some(entry.diff.len() as u64)
            }
            Ok(None) => None,
            Err(e) => {
                diag.warn(format!(
                    "{} at {}: size resolution failed: {:#}",
                    entry.new_path, revision_id, e
                ));
                None
            }
        }
    }

    /// List merge requests targeting a branch, across the given states.
    /// With a title filter, an MR qualifies when any of its commits
    /// matches.
    pub fn merge_requests(
        &self,
        target_branch: &str,
        states: &[String],
        title_contains: Option<&str>,
        diag: &mut Diagnostics,
    ) -> Result<Vec<MergeRequest>> {
        let mut all = Vec::new();
        for state in states {
            let mut page = 1usize;
            loop {
                let mut params = BTreeMap::new();
                params.insert("state".to_string(), state.clone());
                params.insert("target_branch".to_string(), target_branch.to_string());
                params.insert("per_page".to_string(), PAGE_SIZE.to_string());
                params.insert("page".to_string(), page.to_string());
                params.insert("order_by".to_string(), "updated_at".to_string());
                params.insert("sort".to_string(), "desc".to_string());

                let body = self.get("merge_requests", "merge_requests", &params)?;
                let mrs: Vec<MergeRequest> =
                    serde_json::from_str(&body).context("Malformed merge request payload")?;
                if mrs.is_empty() {
                    break;
                }
                let short_page = mrs.len() < PAGE_SIZE;

                for mr in mrs {
                    match title_contains {
                        Some(needle) => match self.merge_request_matches(&mr, needle) {
                            Ok(true) => all.push(mr),
                            Ok(false) => {}
                            Err(e) => {
                                diag.warn(format!(
                                    "MR !{}: could not check commit titles: {:#}",
                                    mr.iid, e
                                ));
                            }
                        },
                        None => all.push(mr),
                    }
                }

                if short_page {
                    break;
                }
                page += 1;
            }
        }
        Ok(all)
    }

    fn merge_request_matches(&self, mr: &MergeRequest, needle: &str) -> Result<bool> {
        let mut params = BTreeMap::new();
        params.insert("mr_iid".to_string(), mr.iid.to_string());
        let resource = format!("merge_requests/{}/commits", mr.iid);
        let body = self.get("mr_commits", &resource, &params)?;
        let commits: Vec<ApiCommit> =
            serde_json::from_str(&body).context("Malformed MR commit payload")?;
        let needle = needle.to_lowercase();
        Ok(commits
            .iter()
            .any(|c| c.title.to_lowercase().contains(&needle)))
    }

    /// Changed files for one merge request, plus the head revision its
    /// blobs are pinned to (when the API reports one)
    pub fn merge_request_changes(
        &self,
        iid: u64,
    ) -> Result<(Option<String>, Vec<RemoteDiffEntry>)> {
        let mut params = BTreeMap::new();
        params.insert("mr_iid".to_string(), iid.to_string());
        let resource = format!("merge_requests/{}/changes", iid);
        let body = self.get("mr_changes", &resource, &params)?;
        let changes: MergeRequestChanges =
            serde_json::from_str(&body).context("Malformed MR changes payload")?;
        let head_sha = changes.diff_refs.map(|refs| refs.head_sha);
        Ok((head_sha, changes.changes))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum PageStop {
    Continue,
    LastPage,
    DateBoundary,
}

/// Decide whether pagination should stop after a page.
/// The date boundary check assumes descending chronological order.
fn page_stop(
    page_len: usize,
    per_page: usize,
    oldest: Option<i64>,
    filter: &HistoryFilter,
) -> PageStop {
    if let Some(timestamp) = oldest {
        if filter.before_start(timestamp) {
            return PageStop::DateBoundary;
        }
    }
    if page_len < per_page {
        return PageStop::LastPage;
    }
    PageStop::Continue
}

/// Parse an RFC 3339 timestamp ("2024-01-10T08:30:00.000+07:00") into
/// unix seconds
pub fn parse_timestamp(value: &str) -> Option<i64> {
    OffsetDateTime::parse(value, &Rfc3339)
        .ok()
        .map(|dt| dt.unix_timestamp())
}

fn date_param(date: time::Date) -> Result<String> {
    let format = format_description!("[year]-[month]-[day]");
    date.format(&format).context("Failed to format date")
}

/// Percent-encode a path component so nested paths and project slugs
/// survive as a single URL segment (e.g. "group/app" -> "group%2Fapp")
fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
