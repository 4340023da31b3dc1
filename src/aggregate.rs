use rustc_hash::{FxHashMap, FxHashSet};

use crate::model::{ChangeRecord, Classification, FileAggregate, RevisionAggregate};

/// Folds a stream of change records into per-file and per-revision rollups.
///
/// Aggregates are created lazily on first sight and updated monotonically;
/// nothing is read out until `finish` ends the accumulation pass. Exact
/// (revision, path) duplicates (which exhaustive traversal can produce
/// when the same change is reachable through several merge paths) are
/// folded into a single observation.
#[derive(Default)]
pub struct Aggregator {
    files: Vec<FileAggregate>,
    file_index: FxHashMap<String, usize>,
    revisions: Vec<RevisionAggregate>,
    revision_index: FxHashMap<String, usize>,
    seen: FxHashSet<(String, String)>,
    records: Vec<ChangeRecord>,
}

/// Finalized audit tables, handed to the report collaborator
#[derive(Debug, Default)]
pub struct AuditTables {
    pub files: Vec<FileAggregate>,
    pub revisions: Vec<RevisionAggregate>,
    pub records: Vec<ChangeRecord>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fold(&mut self, record: ChangeRecord) {
        let key = (record.revision.clone(), record.path.clone());
        if !self.seen.insert(key) {
            return;
        }

        self.fold_file(&record);
        self.fold_revision(&record);
        self.records.push(record);
    }

    fn fold_file(&mut self, record: &ChangeRecord) {
        let idx = match self.file_index.get(&record.path) {
            Some(&idx) => idx,
            None => {
                let idx = self.files.len();
                self.file_index.insert(record.path.clone(), idx);
                self.files.push(FileAggregate {
                    path: record.path.clone(),
                    max_size: 0,
                    change_count: 0,
                    last_seen: i64::MIN,
                    last_title: String::new(),
                    worst: Classification::WithinBudget,
                    non_standard: record.non_standard,
                });
                idx
            }
        };

        let agg = &mut self.files[idx];
        if let Some(size) = record.size {
            agg.max_size = agg.max_size.max(size);
        }
        agg.change_count += 1;
        if record.date >= agg.last_seen {
            agg.last_seen = record.date;
            agg.last_title = record.title.clone();
        }
        // Logical OR over history: once over budget, always over budget
        if record.classification == Classification::OverBudget {
            agg.worst = Classification::OverBudget;
        }
    }

    fn fold_revision(&mut self, record: &ChangeRecord) {
        let idx = match self.revision_index.get(&record.revision) {
            Some(&idx) => idx,
            None => {
                let idx = self.revisions.len();
                self.revision_index.insert(record.revision.clone(), idx);
                self.revisions.push(RevisionAggregate {
                    revision: record.revision.clone(),
                    short_id: record.short_id.clone(),
                    title: record.title.clone(),
                    date: record.date,
                    total_size: 0,
                    file_count: 0,
                });
                idx
            }
        };

        let agg = &mut self.revisions[idx];
        agg.file_count += 1;
        if let Some(size) = record.size {
            agg.total_size += size;
        }
    }

    pub fn finish(self) -> AuditTables {
        AuditTables {
            files: self.files,
            revisions: self.revisions,
            records: self.records,
        }
    }
}

impl AuditTables {
    /// Largest files, descending by max observed size.
    /// Stable sort keeps first-seen order on ties, so rankings are
    /// reproducible across runs.
    pub fn top_files(&self, n: usize) -> Vec<&FileAggregate> {
        let mut sorted: Vec<&FileAggregate> = self.files.iter().collect();
        sorted.sort_by(|a, b| b.max_size.cmp(&a.max_size));
        sorted.truncate(n);
        sorted
    }

    /// Heaviest revisions, descending by total resolved size
    pub fn top_revisions(&self, n: usize) -> Vec<&RevisionAggregate> {
        let mut sorted: Vec<&RevisionAggregate> = self.revisions.iter().collect();
        sorted.sort_by(|a, b| b.total_size.cmp(&a.total_size));
        sorted.truncate(n);
        sorted
    }

    pub fn over_budget_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.worst == Classification::OverBudget)
            .count()
    }
}
