/// One immutable snapshot in version-control history.
///
/// Sourced from either the local object store or the hosting API;
/// never mutated after observation.
#[derive(Debug, Clone)]
pub struct Revision {
    /// Content hash or API-assigned identifier
    pub id: String,
    /// Commit time as unix seconds
    pub timestamp: i64,
    /// Short commit title (first line of the message)
    pub title: String,
}

impl Revision {
    pub fn new(id: impl Into<String>, timestamp: i64, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            title: title.into(),
        }
    }

    /// Abbreviated identifier for display, like `git log --oneline`.
    /// Falls back to the full id when the cut would split a character.
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}
