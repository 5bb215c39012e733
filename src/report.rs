//! Final cleanup report assembly.
//!
//! The report is the one artifact handed to front ends: removal counts,
//! size reduction, risks and recommendations, flat and serializable with
//! no cyclic references.

use chrono::{DateTime, Utc};
use im::Vector;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::metrics::MetricsComparison;
use crate::oplog::LogStatistics;
use crate::risk::{
    ExecutionCounts, MaintenanceRecommendation, MaintenanceRecommendationEngine,
    RiskAssessment, RiskAssessmentEngine,
};
use crate::safety::{PostCleanupReport, SafetyReport};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CleanupReport {
    pub generated_at: DateTime<Utc>,
    pub root: PathBuf,
    pub dry_run: bool,
    pub counts: ExecutionCounts,
    pub planned_operations: usize,
    pub errors: Vec<String>,
    pub touched_files: Vec<PathBuf>,
    pub size_reduction: Option<MetricsComparison>,
    pub risk_assessments: Vector<RiskAssessment>,
    pub recommendations: Vector<MaintenanceRecommendation>,
    pub safety: Option<SafetyReport>,
    pub post_validation: Option<PostCleanupReport>,
    pub log_statistics: LogStatistics,
}

impl CleanupReport {
    pub fn total_items_processed(&self) -> usize {
        self.counts.total_removals() + self.counts.components_created
    }

    /// Successful operations over attempted ones; 1.0 for an empty run
    pub fn success_rate(&self) -> f64 {
        let attempted = self.total_items_processed() + self.counts.failed_operations;
        if attempted == 0 {
            return 1.0;
        }
        self.total_items_processed() as f64 / attempted as f64
    }
}

/// Composes execution results, metrics, risks and recommendations into one
/// report. The engines are owned so callers can tune thresholds once and
/// reuse the generator across sessions.
pub struct ReportGenerator {
    risk_engine: RiskAssessmentEngine,
    recommendation_engine: MaintenanceRecommendationEngine,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            risk_engine: RiskAssessmentEngine::default(),
            recommendation_engine: MaintenanceRecommendationEngine::new(),
        }
    }
}

pub struct ReportInput {
    pub root: PathBuf,
    pub dry_run: bool,
    pub counts: ExecutionCounts,
    pub planned_operations: usize,
    pub errors: Vec<String>,
    pub touched_files: Vec<PathBuf>,
    pub size_reduction: Option<MetricsComparison>,
    pub safety: Option<SafetyReport>,
    pub post_validation: Option<PostCleanupReport>,
    pub log_statistics: LogStatistics,
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&self, input: ReportInput) -> CleanupReport {
        let risk_assessments = self
            .risk_engine
            .assess(&input.counts, &input.touched_files);
        let recommendations = self.recommendation_engine.recommend(&input.counts);

        CleanupReport {
            generated_at: Utc::now(),
            root: input.root,
            dry_run: input.dry_run,
            counts: input.counts,
            planned_operations: input.planned_operations,
            errors: input.errors,
            touched_files: input.touched_files,
            size_reduction: input.size_reduction,
            risk_assessments,
            recommendations,
            safety: input.safety,
            post_validation: input.post_validation,
            log_statistics: input.log_statistics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_with_counts(counts: ExecutionCounts) -> ReportInput {
        ReportInput {
            root: PathBuf::from("/tmp/app"),
            dry_run: false,
            counts,
            planned_operations: counts.total_removals(),
            errors: Vec::new(),
            touched_files: Vec::new(),
            size_reduction: None,
            safety: None,
            post_validation: None,
            log_statistics: LogStatistics::default(),
        }
    }

    #[test]
    fn report_derives_totals_and_success_rate() {
        let counts = ExecutionCounts {
            imports_removed: 6,
            methods_removed: 3,
            failed_operations: 1,
            ..ExecutionCounts::default()
        };
        let report = ReportGenerator::new().generate(input_with_counts(counts));

        assert_eq!(report.total_items_processed(), 9);
        assert!((report.success_rate() - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_run_has_perfect_success_rate() {
        let report = ReportGenerator::new().generate(input_with_counts(ExecutionCounts::default()));
        assert_eq!(report.total_items_processed(), 0);
        assert_eq!(report.success_rate(), 1.0);
    }

    #[test]
    fn report_serializes_without_cycles() {
        let counts = ExecutionCounts {
            files_deleted: 25,
            ..ExecutionCounts::default()
        };
        let report = ReportGenerator::new().generate(input_with_counts(counts));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("file_deletion"));
        let roundtrip: CleanupReport = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip.counts.files_deleted, 25);
    }
}
