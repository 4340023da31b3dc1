/// Collector for non-fatal problems encountered during an audit.
///
/// Warnings accumulate while the run continues and are surfaced once at
/// the end, so "completed with N warnings" is distinguishable from a
/// clean run. Fatal conditions propagate as errors instead.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Print the accumulated warning summary to stderr
    pub fn report(&self) {
        if self.warnings.is_empty() {
            return;
        }
        eprintln!("\ncompleted with {} warning(s):", self.warnings.len());
        for (i, warning) in self.warnings.iter().enumerate() {
            eprintln!("  {}. {}", i + 1, warning);
        }
    }
}
