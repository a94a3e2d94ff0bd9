use lazy_static::lazy_static;
use regex::Regex;

use crate::ui;

lazy_static! {
    pub static ref PATTERN: Regex = Regex::new(r"[A-Z]+-[0-9]+").unwrap();
}

/// Extract every issue key from a string, left to right
/// (e.g., "feature/ABC-123-fix" -> ["ABC-123"])
pub fn extract(text: &str) -> Vec<String> {
    PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Pick the canonical issue key among those found in `branch`
///
/// The first key wins; the others are reported and dropped.
pub fn select(ids: &[String], branch: &str) -> Option<String> {
    match ids {
        [] => {
            ui::warn(format!("JIRA Issue not found in branch {}", branch));
            None
        }
        [only] => Some(only.clone()),
        [first, ..] => {
            ui::warn(format!(
                "Found {} JIRA Issue in branch {}, using {}",
                ids.len(),
                branch,
                first
            ));
            Some(first.clone())
        }
    }
}
