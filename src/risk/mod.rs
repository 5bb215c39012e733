//! Risk scoring for executed (or planned) cleanup operations.
//!
//! Raw execution counts convert into discrete assessments via fixed
//! thresholds; each assessment derives a numeric score and a coarse level
//! the report surfaces to the operator.

pub mod recommendations;

use im::Vector;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use recommendations::{
    MaintenanceRecommendation, MaintenanceRecommendationEngine, RecommendationType,
};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    fn weight(self) -> f64 {
        match self {
            RiskLevel::Low => 1.0,
            RiskLevel::Medium => 2.0,
            RiskLevel::High => 3.0,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RiskType {
    FileDeletion,
    MethodRemoval,
    ImportRemoval,
    DuplicateRefactoring,
    FailedOperations,
    LongRunningValidation,
}

impl std::fmt::Display for RiskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        static DISPLAY_STRINGS: &[(RiskType, &str)] = &[
            (RiskType::FileDeletion, "file_deletion"),
            (RiskType::MethodRemoval, "method_removal"),
            (RiskType::ImportRemoval, "import_removal"),
            (RiskType::DuplicateRefactoring, "duplicate_refactoring"),
            (RiskType::FailedOperations, "failed_operations"),
            (RiskType::LongRunningValidation, "long_running_validation"),
        ];

        let display_str = DISPLAY_STRINGS
            .iter()
            .find(|(t, _)| t == self)
            .map(|(_, s)| *s)
            .unwrap_or("unknown");

        write!(f, "{display_str}")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_type: RiskType,
    pub severity: RiskLevel,
    pub likelihood: RiskLevel,
    pub detection_difficulty: RiskLevel,
    pub description: String,
    pub mitigations: Vec<String>,
    pub affected_files: Vec<PathBuf>,
}

impl RiskAssessment {
    /// Severity x likelihood x detection difficulty, in [1, 27]
    pub fn score(&self) -> f64 {
        self.severity.weight() * self.likelihood.weight() * self.detection_difficulty.weight()
    }

    /// Discrete level derived from the composite score
    pub fn level(&self) -> RiskLevel {
        match self.score() {
            s if s >= 12.0 => RiskLevel::High,
            s if s >= 6.0 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

/// Raw counts from one cleanup execution, the engine's only input
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ExecutionCounts {
    pub files_deleted: usize,
    pub methods_removed: usize,
    pub imports_removed: usize,
    pub variables_removed: usize,
    pub duplicates_refactored: usize,
    pub components_created: usize,
    pub failed_operations: usize,
    pub elapsed_secs: u64,
}

impl ExecutionCounts {
    pub fn total_removals(&self) -> usize {
        self.files_deleted
            + self.methods_removed
            + self.imports_removed
            + self.variables_removed
            + self.duplicates_refactored
    }
}

/// Threshold table; counts at or above a threshold produce the paired
/// severity. Exposed as configuration-shaped data so the levels stay
/// auditable in one place.
pub struct RiskAssessmentEngine {
    pub file_deletion_high: usize,
    pub file_deletion_medium: usize,
    pub method_removal_high: usize,
    pub method_removal_medium: usize,
    pub import_removal_medium: usize,
    pub slow_validation_secs: u64,
}

impl Default for RiskAssessmentEngine {
    fn default() -> Self {
        Self {
            file_deletion_high: 20,
            file_deletion_medium: 10,
            method_removal_high: 50,
            method_removal_medium: 20,
            import_removal_medium: 40,
            slow_validation_secs: 300,
        }
    }
}

impl RiskAssessmentEngine {
    pub fn assess(
        &self,
        counts: &ExecutionCounts,
        affected_files: &[PathBuf],
    ) -> Vector<RiskAssessment> {
        let mut assessments = Vector::new();

        if counts.files_deleted >= self.file_deletion_medium {
            let severity = if counts.files_deleted >= self.file_deletion_high {
                RiskLevel::High
            } else {
                RiskLevel::Medium
            };
            assessments.push_back(RiskAssessment {
                risk_type: RiskType::FileDeletion,
                severity,
                likelihood: RiskLevel::Medium,
                detection_difficulty: RiskLevel::High,
                description: format!(
                    "{} files deleted in one session; a dynamically referenced asset may be among them",
                    counts.files_deleted
                ),
                mitigations: vec![
                    "Verify the application against the backup before pruning it".to_string(),
                    "Check server logs for 404s on removed asset paths".to_string(),
                ],
                affected_files: affected_files.to_vec(),
            });
        }

        if counts.methods_removed >= self.method_removal_medium {
            let severity = if counts.methods_removed >= self.method_removal_high {
                RiskLevel::High
            } else {
                RiskLevel::Medium
            };
            assessments.push_back(RiskAssessment {
                risk_type: RiskType::MethodRemoval,
                severity,
                likelihood: RiskLevel::Medium,
                detection_difficulty: RiskLevel::Medium,
                description: format!(
                    "{} methods removed; reflective or queued callers would only fail at runtime",
                    counts.methods_removed
                ),
                mitigations: vec![
                    "Run the full test suite including feature tests".to_string(),
                    "Grep queued job and event listener payloads for removed names".to_string(),
                ],
                affected_files: affected_files.to_vec(),
            });
        }

        if counts.imports_removed >= self.import_removal_medium {
            assessments.push_back(RiskAssessment {
                risk_type: RiskType::ImportRemoval,
                severity: RiskLevel::Low,
                likelihood: RiskLevel::Low,
                detection_difficulty: RiskLevel::Low,
                description: format!("{} imports removed across the tree", counts.imports_removed),
                mitigations: vec!["Spot-check files with heavy alias use".to_string()],
                affected_files: Vec::new(),
            });
        }

        if counts.duplicates_refactored > 0 {
            assessments.push_back(RiskAssessment {
                risk_type: RiskType::DuplicateRefactoring,
                severity: RiskLevel::Medium,
                likelihood: RiskLevel::Medium,
                detection_difficulty: RiskLevel::Low,
                description: format!(
                    "{} duplicate groups rewritten to shared artifacts; rendering output must stay identical",
                    counts.duplicates_refactored
                ),
                mitigations: vec![
                    "Diff rendered pages for templates touched by extraction".to_string(),
                ],
                affected_files: affected_files.to_vec(),
            });
        }

        if counts.failed_operations > 0 {
            assessments.push_back(RiskAssessment {
                risk_type: RiskType::FailedOperations,
                severity: RiskLevel::High,
                likelihood: RiskLevel::High,
                detection_difficulty: RiskLevel::Low,
                description: format!(
                    "{} operations failed mid-batch; the tree mixes cleaned and original files",
                    counts.failed_operations
                ),
                mitigations: vec![
                    "Review the per-file error list before re-running".to_string(),
                    "Roll back to the pre-cleanup backup if the mix is unclear".to_string(),
                ],
                affected_files: affected_files.to_vec(),
            });
        }

        if counts.elapsed_secs > self.slow_validation_secs {
            assessments.push_back(RiskAssessment {
                risk_type: RiskType::LongRunningValidation,
                severity: RiskLevel::Low,
                likelihood: RiskLevel::High,
                detection_difficulty: RiskLevel::Low,
                description: format!(
                    "Cleanup session ran {}s, past the {}s threshold; slow validation discourages running it",
                    counts.elapsed_secs, self.slow_validation_secs
                ),
                mitigations: vec![
                    "Split the tree into smaller batches".to_string(),
                    "Restrict the test command to critical suites".to_string(),
                ],
                affected_files: Vec::new(),
            });
        }

        assessments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts_with_files(files_deleted: usize) -> ExecutionCounts {
        ExecutionCounts {
            files_deleted,
            ..ExecutionCounts::default()
        }
    }

    #[test]
    fn fifteen_deleted_files_is_a_medium_file_deletion_risk() {
        let engine = RiskAssessmentEngine::default();
        let assessments = engine.assess(&counts_with_files(15), &[]);
        let file_risk = assessments
            .iter()
            .find(|a| a.risk_type == RiskType::FileDeletion)
            .expect("file deletion risk present");
        assert_eq!(file_risk.severity, RiskLevel::Medium);
    }

    #[test]
    fn twenty_five_deleted_files_is_high_severity() {
        let engine = RiskAssessmentEngine::default();
        let assessments = engine.assess(&counts_with_files(25), &[]);
        let file_risk = assessments
            .iter()
            .find(|a| a.risk_type == RiskType::FileDeletion)
            .unwrap();
        assert_eq!(file_risk.severity, RiskLevel::High);
        assert_eq!(file_risk.level(), RiskLevel::High);
    }

    #[test]
    fn small_sessions_raise_nothing() {
        let engine = RiskAssessmentEngine::default();
        let counts = ExecutionCounts {
            files_deleted: 2,
            imports_removed: 5,
            elapsed_secs: 30,
            ..ExecutionCounts::default()
        };
        assert!(engine.assess(&counts, &[]).is_empty());
    }

    #[test]
    fn failed_operations_always_score_high() {
        let engine = RiskAssessmentEngine::default();
        let counts = ExecutionCounts {
            failed_operations: 1,
            ..ExecutionCounts::default()
        };
        let assessments = engine.assess(&counts, &[]);
        assert_eq!(assessments[0].risk_type, RiskType::FailedOperations);
        assert_eq!(assessments[0].level(), RiskLevel::High);
    }

    #[test]
    fn slow_sessions_record_an_operational_risk() {
        let engine = RiskAssessmentEngine::default();
        let counts = ExecutionCounts {
            elapsed_secs: 400,
            ..ExecutionCounts::default()
        };
        let assessments = engine.assess(&counts, &[]);
        assert!(assessments
            .iter()
            .any(|a| a.risk_type == RiskType::LongRunningValidation));
    }

    #[test]
    fn score_is_bounded_and_monotone_in_levels() {
        let base = RiskAssessment {
            risk_type: RiskType::MethodRemoval,
            severity: RiskLevel::Low,
            likelihood: RiskLevel::Low,
            detection_difficulty: RiskLevel::Low,
            description: String::new(),
            mitigations: Vec::new(),
            affected_files: Vec::new(),
        };
        let mut high = base.clone();
        high.severity = RiskLevel::High;
        high.likelihood = RiskLevel::High;
        high.detection_difficulty = RiskLevel::High;

        assert_eq!(base.score(), 1.0);
        assert_eq!(high.score(), 27.0);
        assert_eq!(base.level(), RiskLevel::Low);
        assert_eq!(high.level(), RiskLevel::High);
    }
}
