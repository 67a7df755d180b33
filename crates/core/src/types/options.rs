//! Comparison options and exclude-pattern matching

use crate::types::comparison::SyncDirection;
use serde::{Deserialize, Serialize};

/// Options controlling directory comparison.
///
/// A path present on both sides is `Identical` only when every enabled
/// criterion agrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareOptions {
    /// Compare modification timestamps
    pub compare_timestamp: bool,
    /// Compare file sizes
    pub compare_size: bool,
    /// Compare content checksums (slower, needs both sides to report one)
    pub compare_checksum: bool,
    /// Patterns excluded from scanning: plain substrings, or `*.ext`
    /// suffix patterns
    pub exclude_patterns: Vec<String>,
    /// Direction used to filter out statuses the sync would never act on
    pub direction: SyncDirection,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            compare_timestamp: true,
            compare_size: true,
            compare_checksum: false,
            exclude_patterns: vec![
                "node_modules".to_string(),
                ".git".to_string(),
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                "__pycache__".to_string(),
                "*.pyc".to_string(),
                ".env".to_string(),
                "target".to_string(),
            ],
            direction: SyncDirection::Bidirectional,
        }
    }
}

impl CompareOptions {
    /// Sets the sync direction
    pub fn with_direction(mut self, direction: SyncDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Enables or disables checksum comparison
    pub fn with_checksum(mut self, enabled: bool) -> Self {
        self.compare_checksum = enabled;
        self
    }

    /// Replaces the exclude pattern set
    pub fn with_excludes(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Returns true when the relative path matches any exclude pattern
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        matches_exclude(relative_path, &self.exclude_patterns)
    }
}

/// Case-insensitive exclude matching: `*.ext` patterns match as a suffix,
/// anything else matches as a substring of the relative path.
pub fn matches_exclude(relative_path: &str, patterns: &[String]) -> bool {
    let path_lower = relative_path.to_lowercase();

    for pattern in patterns {
        let pattern_lower = pattern.to_lowercase();

        if let Some(suffix) = pattern_lower.strip_prefix('*') {
            if path_lower.ends_with(suffix) {
                return true;
            }
        } else if path_lower.contains(&pattern_lower) {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_excludes() {
        let options = CompareOptions::default();
        assert!(options.is_excluded("node_modules/pkg/index.js"));
        assert!(options.is_excluded("src/__pycache__/mod.pyc"));
        assert!(options.is_excluded("app/cache.pyc"));
        assert!(!options.is_excluded("src/main.rs"));
    }

    #[test]
    fn test_suffix_pattern() {
        let patterns = vec!["*.log".to_string()];
        assert!(matches_exclude("logs/app.log", &patterns));
        assert!(!matches_exclude("logs/app.txt", &patterns));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let patterns = vec!["Backup".to_string(), "*.TMP".to_string()];
        assert!(matches_exclude("old/backup/file.txt", &patterns));
        assert!(matches_exclude("scratch/session.tmp", &patterns));
    }

    #[test]
    fn test_builder_methods() {
        let options = CompareOptions::default()
            .with_direction(SyncDirection::LocalToRemote)
            .with_checksum(true)
            .with_excludes(vec!["dist".to_string()]);

        assert_eq!(options.direction, SyncDirection::LocalToRemote);
        assert!(options.compare_checksum);
        assert_eq!(options.exclude_patterns, vec!["dist".to_string()]);
    }
}
