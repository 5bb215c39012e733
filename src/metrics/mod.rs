//! Before/after tree metrics.
//!
//! One snapshot before mutation and one after, compared into percentage
//! improvements for the report. The complexity proxy is the same bounded
//! control-flow density score the duplicate detector uses, summed over
//! source files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::Language;
use crate::debt::duplication::fragment_complexity;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub file_count: usize,
    pub total_lines: usize,
    pub total_bytes: u64,
    /// Summed control-flow density over source files
    pub complexity_proxy: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MetricsComparison {
    pub before: TreeSnapshot,
    pub after: TreeSnapshot,
    pub files_removed: usize,
    pub lines_removed: usize,
    pub bytes_removed: i64,
    pub line_reduction_percent: f64,
    pub byte_reduction_percent: f64,
    pub complexity_reduction_percent: f64,
}

#[derive(Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    /// Snapshot size and complexity across the given files. Unreadable
    /// files count toward file_count only.
    pub fn snapshot(&self, files: &[PathBuf]) -> TreeSnapshot {
        let mut snapshot = TreeSnapshot {
            file_count: files.len(),
            ..TreeSnapshot::default()
        };

        for path in files {
            if let Ok(metadata) = std::fs::metadata(path) {
                snapshot.total_bytes += metadata.len();
            }
            let Ok(content) = std::fs::read_to_string(path) else {
                continue;
            };
            snapshot.total_lines += content.lines().count();
            if is_source(path) {
                snapshot.complexity_proxy += fragment_complexity(&content);
            }
        }

        snapshot
    }

    pub fn compare(&self, before: TreeSnapshot, after: TreeSnapshot) -> MetricsComparison {
        let files_removed = before.file_count.saturating_sub(after.file_count);
        let lines_removed = before.total_lines.saturating_sub(after.total_lines);
        let bytes_removed = before.total_bytes as i64 - after.total_bytes as i64;

        MetricsComparison {
            line_reduction_percent: percent_reduction(
                before.total_lines as f64,
                after.total_lines as f64,
            ),
            byte_reduction_percent: percent_reduction(
                before.total_bytes as f64,
                after.total_bytes as f64,
            ),
            complexity_reduction_percent: percent_reduction(
                before.complexity_proxy,
                after.complexity_proxy,
            ),
            before,
            after,
            files_removed,
            lines_removed,
            bytes_removed,
        }
    }
}

fn is_source(path: &Path) -> bool {
    Language::from_path(path).is_some()
}

fn percent_reduction(before: f64, after: f64) -> f64 {
    if before <= 0.0 {
        return 0.0;
    }
    ((before - after) / before * 100.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn snapshot_counts_files_lines_and_bytes() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.php");
        let b = dir.path().join("b.css");
        fs::write(&a, "<?php\nif ($x) {\n  echo 1;\n}\n").unwrap();
        fs::write(&b, ".card { color: red; }\n").unwrap();

        let snapshot = MetricsCollector::new().snapshot(&[a, b]);
        assert_eq!(snapshot.file_count, 2);
        assert_eq!(snapshot.total_lines, 5);
        assert!(snapshot.total_bytes > 0);
        assert!(snapshot.complexity_proxy > 0.0);
    }

    #[test]
    fn comparison_reports_reductions() {
        let collector = MetricsCollector::new();
        let before = TreeSnapshot {
            file_count: 10,
            total_lines: 1000,
            total_bytes: 40_000,
            complexity_proxy: 5.0,
        };
        let after = TreeSnapshot {
            file_count: 8,
            total_lines: 800,
            total_bytes: 30_000,
            complexity_proxy: 4.0,
        };

        let comparison = collector.compare(before, after);
        assert_eq!(comparison.files_removed, 2);
        assert_eq!(comparison.lines_removed, 200);
        assert_eq!(comparison.bytes_removed, 10_000);
        assert!((comparison.line_reduction_percent - 20.0).abs() < f64::EPSILON);
        assert!((comparison.byte_reduction_percent - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_before_never_divides_by_zero() {
        let collector = MetricsCollector::new();
        let comparison = collector.compare(TreeSnapshot::default(), TreeSnapshot::default());
        assert_eq!(comparison.line_reduction_percent, 0.0);
    }
}
