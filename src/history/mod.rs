mod cache;
mod local;
mod remote;

pub use cache::FetchCache;
pub use local::LocalRepo;
pub use remote::{GitLabClient, MergeRequest, RemoteDiffEntry, parse_timestamp};

use time::Date;

use crate::util::timestamp_date;

/// Filters applied while enumerating revisions, local and remote alike.
/// Dates are inclusive calendar bounds; the title filter is a
/// case-insensitive substring match.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Branch or ref name; source-specific default when absent (HEAD locally)
    pub reference: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub title_contains: Option<String>,
    /// Maximum number of revisions to audit
    pub limit: Option<usize>,
}

impl HistoryFilter {
    /// Whether a commit timestamp falls inside the inclusive date window
    pub fn date_in_range(&self, timestamp: i64) -> bool {
        let Some(date) = timestamp_date(timestamp) else {
            return false;
        };
        if let Some(start) = self.start_date {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if date > end {
                return false;
            }
        }
        true
    }

    /// Whether a commit timestamp predates the start-date bound
    pub fn before_start(&self, timestamp: i64) -> bool {
        match (self.start_date, timestamp_date(timestamp)) {
            (Some(start), Some(date)) => date < start,
            _ => false,
        }
    }

    pub fn title_matches(&self, title: &str) -> bool {
        match &self.title_contains {
            Some(needle) => title.to_lowercase().contains(&needle.to_lowercase()),
            None => true,
        }
    }
}
