use serde::Serialize;

use super::Revision;
use crate::policy;

/// Verdict of the size-budget policy for one file at one revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Classification {
    WithinBudget,
    OverBudget,
}

/// One observed (revision, file, size) fact.
///
/// Classification and the non-standard container tag are derived at
/// construction time; records are never patched afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRecord {
    pub revision: String,
    pub short_id: String,
    pub date: i64,
    pub title: String,
    pub path: String,
    /// Byte size of the blob, or `None` when resolution failed
    pub size: Option<u64>,
    pub classification: Classification,
    pub non_standard: bool,
}

impl ChangeRecord {
    pub fn new(revision: &Revision, path: String, size: Option<u64>) -> Self {
        let classification = policy::classify(&path, size);
        let non_standard = policy::is_non_standard(&path);
        Self {
            revision: revision.id.clone(),
            short_id: revision.short_id().to_string(),
            date: revision.timestamp,
            title: revision.title.clone(),
            path,
            size,
            classification,
            non_standard,
        }
    }
}
