// Export modules for library usage
pub mod analysis;
pub mod analyzers;
pub mod cli;
pub mod config;
pub mod core;
pub mod debt;
pub mod io;
pub mod metrics;
pub mod oplog;
pub mod pipeline;
pub mod refactoring;
pub mod report;
pub mod risk;
pub mod safety;
pub mod vcs;

// Re-export commonly used types
pub use crate::core::{
    ComponentExtractionSuggestion, DuplicateKind, DuplicateMatch, DuplicateOccurrence,
    DuplicateType, Error, FileAnalysis, Language, MethodExtractionSuggestion, Result,
    UnusedImport, UnusedMethod, UnusedVariable,
};

pub use crate::analyzers::{get_analyzer, parse_path, Analyzer};

pub use crate::analysis::ClassHierarchy;

pub use crate::config::CleanupConfig;

pub use crate::debt::{
    ConfigurationCleanupDetector, CrossFileDuplicateDetector, CrossFileDuplicateReport,
    OrphanedFileDetector,
};

pub use crate::refactoring::{
    CleanupPlan, ExtractionService, FileModificationPlan, FileModificationService,
};

pub use crate::vcs::GitBackupManager;

pub use crate::safety::{SafetyValidationService, TestValidator};

pub use crate::risk::{
    ExecutionCounts, MaintenanceRecommendationEngine, RiskAssessment, RiskAssessmentEngine,
};

pub use crate::io::{create_writer, OutputFormat, OutputWriter};

pub use crate::pipeline::{CleanupPipeline, PipelineOutcome, ScanOutcome};

pub use crate::report::{CleanupReport, ReportGenerator};
