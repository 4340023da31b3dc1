use serde::Serialize;

use crate::model::Classification;

/// One (extension group, max size) policy entry.
///
/// The rule table is an ordered list, not a map: the first rule whose
/// extension matches a path decides the classification. Related formats
/// share a rule (all raster icons use one threshold), so callers must
/// never reorder the table when extending it.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetRule {
    pub category: &'static str,
    pub extensions: &'static [&'static str],
    pub max_bytes: u64,
    pub note: &'static str,
}

const KB: u64 = 1024;
const MB: u64 = 1024 * 1024;

/// Size budgets by asset category, first match wins
pub const BUDGET_RULES: &[BudgetRule] = &[
    BudgetRule {
        category: "Vector icon / resource XML",
        extensions: &[".xml"],
        max_bytes: 20 * KB,
        note: "simple icons and illustrations, < 20 KB",
    },
    BudgetRule {
        category: "Raster icon",
        extensions: &[".png", ".jpg", ".jpeg"],
        max_bytes: 50 * KB,
        note: "<= 50 KB",
    },
    BudgetRule {
        category: "Content image",
        extensions: &[".webp"],
        max_bytes: 200 * KB,
        note: "<= 200 KB (fullscreen 1080x1920 may reach 500 KB)",
    },
    BudgetRule {
        category: "Audio",
        extensions: &[".ogg", ".aac"],
        max_bytes: 300 * KB,
        note: "short music <= 300 KB, sound effects < 100 KB",
    },
    BudgetRule {
        category: "Short video",
        extensions: &[".mp4", ".mov", ".m4v"],
        max_bytes: MB,
        note: "< 1 MB at 480p",
    },
    BudgetRule {
        category: "Bundled data / Lottie",
        extensions: &[".json"],
        max_bytes: 100 * KB,
        note: "<= 100 KB",
    },
    BudgetRule {
        category: "Font",
        extensions: &[".ttf", ".otf"],
        max_bytes: 500 * KB,
        note: "<= 500 KB",
    },
    BudgetRule {
        category: "Native library",
        extensions: &[".so"],
        max_bytes: 5 * MB,
        note: "<= 5 MB per ABI",
    },
    BudgetRule {
        category: "Compiled code",
        extensions: &[".dex"],
        max_bytes: 10 * MB,
        note: "<= 10 MB per file",
    },
];

/// Container and package extensions that are expected to be large.
/// Tagging is independent of classification.
const NON_STANDARD_EXTENSIONS: &[&str] = &[".apk", ".aab", ".so", ".jar", ".dex", ".class", ".aar"];

/// Find the budget rule governing a path, if any
pub fn matching_rule(path: &str) -> Option<&'static BudgetRule> {
    let lower = path.to_ascii_lowercase();
    BUDGET_RULES
        .iter()
        .find(|rule| rule.extensions.iter().any(|ext| lower.ends_with(ext)))
}

/// Classify a file against its extension budget.
///
/// Unknown extensions are always within budget (only known risky
/// categories are flagged), and an unresolved size never produces a
/// false positive.
pub fn classify(path: &str, size: Option<u64>) -> Classification {
    let Some(size) = size else {
        return Classification::WithinBudget;
    };
    match matching_rule(path) {
        Some(rule) if size > rule.max_bytes => Classification::OverBudget,
        _ => Classification::WithinBudget,
    }
}

/// Whether a path is an archive/package artifact that is generally
/// expected to be large (exempt from optimization suggestions)
pub fn is_non_standard(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    NON_STANDARD_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(ext))
}

/// The full reference table, for inclusion in generated reports
pub fn budget_rules() -> &'static [BudgetRule] {
    BUDGET_RULES
}
