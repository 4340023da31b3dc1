use serde::Serialize;

use super::Classification;

/// Per-file rollup across all observed change records.
///
/// Updated monotonically while the audit runs; the worst classification
/// never reverts once a file has been seen over budget.
#[derive(Debug, Clone, Serialize)]
pub struct FileAggregate {
    pub path: String,
    /// Largest resolved size observed at any revision
    pub max_size: u64,
    /// Number of distinct revisions touching this path
    pub change_count: u64,
    /// Most recent touch as unix seconds
    pub last_seen: i64,
    /// Title of the most recent commit touching this path
    pub last_title: String,
    pub worst: Classification,
    pub non_standard: bool,
}

/// Per-revision rollup: total resolved bytes and files touched
#[derive(Debug, Clone, Serialize)]
pub struct RevisionAggregate {
    pub revision: String,
    pub short_id: String,
    pub title: String,
    pub date: i64,
    /// Sum of resolved sizes; unresolved files contribute nothing here
    pub total_size: u64,
    /// Count of files touched, unresolved ones included
    pub file_count: u64,
}
