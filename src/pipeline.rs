//! Batch orchestration: discovery → parallel parsing → cross-file
//! detection → plan → (dry-run gate) → serialized execution with
//! per-operation checkpoints → post-validation → report.
//!
//! Per-file parsing fans out across rayon workers; everything that reads
//! or writes the shared working tree and the git state runs sequentially.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::analysis::{hierarchy, ClassHierarchy};
use crate::analyzers::{javascript, laravel, parse_path, php};
use crate::config::CleanupConfig;
use crate::core::facts::RouteDecl;
use crate::core::{DuplicateKind, FileAnalysis};
use crate::debt::{
    ConfigCleanupReport, ConfigurationCleanupDetector, CrossFileDuplicateDetector,
    CrossFileDuplicateReport, OrphanReport, OrphanedFileDetector,
};
use crate::io::{read_contents, FileWalker};
use crate::metrics::MetricsCollector;
use crate::oplog::OperationLogger;
use crate::refactoring::plan::{CleanupPlan, PlanOptions};
use crate::refactoring::{ExtractionService, FileModificationService, RemovalOperation};
use crate::report::{CleanupReport, ReportGenerator, ReportInput};
use crate::risk::ExecutionCounts;
use crate::safety::{RemovedElement, SafetyValidationService};
use crate::vcs::GitBackupManager;

/// Everything the analysis phases produce before any mutation decision
pub struct ScanOutcome {
    pub analyses: Vec<FileAnalysis>,
    pub contents: Vec<(PathBuf, String)>,
    pub all_files: Vec<PathBuf>,
    pub duplicates: CrossFileDuplicateReport,
    pub orphans: OrphanReport,
    pub config_cleanup: ConfigCleanupReport,
    pub unused_routes: Vec<RouteDecl>,
    pub plan: CleanupPlan,
}

impl ScanOutcome {
    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            files_analyzed: self.analyses.len(),
            files_with_errors: self.analyses.iter().filter(|a| a.has_errors()).count(),
            planned_operations: self.plan.total_operations(),
            unused_imports: self.plan.imports_to_remove.len(),
            unused_methods: self.plan.methods_to_remove.len(),
            unused_variables: self.plan.variables_to_remove.len(),
            duplicate_groups: self.duplicates.summary.total_groups,
            component_suggestions: self.duplicates.component_suggestions.len(),
            orphaned_assets: self.orphans.orphaned.len(),
            possibly_dynamic_assets: self.orphans.possibly_dynamic.len(),
            unused_config_keys: self.config_cleanup.unused_config_keys.len(),
            unused_env_vars: self.config_cleanup.unused_env_vars.len(),
            unused_routes: self.unused_routes.len(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanSummary {
    pub files_analyzed: usize,
    pub files_with_errors: usize,
    pub planned_operations: usize,
    pub unused_imports: usize,
    pub unused_methods: usize,
    pub unused_variables: usize,
    pub duplicate_groups: usize,
    pub component_suggestions: usize,
    pub orphaned_assets: usize,
    pub possibly_dynamic_assets: usize,
    pub unused_config_keys: usize,
    pub unused_env_vars: usize,
    pub unused_routes: usize,
}

pub struct PipelineOutcome {
    pub plan: CleanupPlan,
    pub report: CleanupReport,
    pub log: OperationLogger,
}

pub struct CleanupPipeline {
    root: PathBuf,
    config: CleanupConfig,
}

impl CleanupPipeline {
    pub fn new(root: PathBuf, config: CleanupConfig) -> Self {
        Self { root, config }
    }

    /// Analysis phases only: no mutation, no git interaction. Safe to run
    /// anywhere, including outside a repository.
    pub fn scan(&self) -> anyhow::Result<ScanOutcome> {
        let walker = FileWalker::new(self.root.clone())
            .with_languages(self.config.included_languages.clone())
            .with_ignore_patterns(self.config.excluded_paths.clone());

        let source_files = walker.walk()?;
        let all_files = walker.walk_all()?;
        log::info!(
            "Discovered {} source files ({} total) under {}",
            source_files.len(),
            all_files.len(),
            self.root.display()
        );

        // Parse fan-out; each file is independent. Files that vanish
        // mid-scan are logged and skipped rather than aborting the batch.
        let analyses: Vec<FileAnalysis> = source_files
            .par_iter()
            .filter_map(|path| match parse_path(path) {
                Ok(analysis) => Some(analysis),
                Err(e) => {
                    log::warn!("Skipping {}: {e}", path.display());
                    None
                }
            })
            .collect();

        // Barrier: every cross-file phase below sees the complete batch.
        let contents = read_contents(&all_files);
        let hierarchy = ClassHierarchy::build(&analyses);

        let duplicates =
            CrossFileDuplicateDetector::new(self.config.duplicates.clone()).detect(&analyses, &contents);
        let orphans =
            OrphanedFileDetector::new(self.root.clone()).detect(&all_files, &contents);
        let config_cleanup =
            ConfigurationCleanupDetector::new(self.config.protected_config_keys.clone())
                .detect(&contents);
        let unused_routes = laravel::find_unused_routes(&analyses, &contents);

        let plan = self.build_plan(&analyses, &hierarchy, &duplicates, &orphans);

        Ok(ScanOutcome {
            analyses,
            contents,
            all_files,
            duplicates,
            orphans,
            config_cleanup,
            unused_routes,
            plan,
        })
    }

    /// Full session. Dry-run stops after planning and reporting; execute
    /// mode requires a git repository and serializes every mutation behind
    /// checkpoints.
    pub fn run(&self) -> anyhow::Result<PipelineOutcome> {
        let started = Instant::now();
        let mut logger = OperationLogger::new();

        let scan_id = logger.begin("scan", BTreeMap::new());
        let scan = match self.scan() {
            Ok(scan) => {
                logger.complete(scan_id, format!("{} planned operations", scan.plan.total_operations()));
                scan
            }
            Err(e) => {
                logger.fail(scan_id, e.to_string());
                return Err(e);
            }
        };

        let metrics = MetricsCollector::new();
        let generator = ReportGenerator::new();

        if self.config.dry_run {
            log::info!("Dry run: no mutation, backup, or commit will be performed");
            let report = generator.generate(ReportInput {
                root: self.root.clone(),
                dry_run: true,
                counts: ExecutionCounts {
                    elapsed_secs: started.elapsed().as_secs(),
                    ..ExecutionCounts::default()
                },
                planned_operations: scan.plan.total_operations(),
                errors: Vec::new(),
                touched_files: Vec::new(),
                size_reduction: None,
                safety: None,
                post_validation: None,
                log_statistics: logger.statistics(),
            });
            return Ok(PipelineOutcome {
                plan: scan.plan,
                report,
                log: logger,
            });
        }

        let mut backup = GitBackupManager::new(&self.root)?;
        let safety_service =
            SafetyValidationService::new(self.root.clone(), self.config.test.clone());

        let safety_id = logger.begin("pre_cleanup_validation", BTreeMap::new());
        let safety =
            safety_service.validate_before_cleanup(&scan.plan, &scan.contents, Some(&mut backup))?;
        if safety.safe_to_proceed {
            logger.complete(safety_id, format!("safety score {:.2}", safety.safety_score));
        } else {
            logger.fail(safety_id, "blocked by pre-cleanup validation");
            let report = generator.generate(ReportInput {
                root: self.root.clone(),
                dry_run: false,
                counts: ExecutionCounts {
                    elapsed_secs: started.elapsed().as_secs(),
                    ..ExecutionCounts::default()
                },
                planned_operations: scan.plan.total_operations(),
                errors: vec!["execution blocked by pre-cleanup safety validation".to_string()],
                touched_files: Vec::new(),
                size_reduction: None,
                safety: Some(safety),
                post_validation: None,
                log_statistics: logger.statistics(),
            });
            return Ok(PipelineOutcome {
                plan: scan.plan,
                report,
                log: logger,
            });
        }

        let before = metrics.snapshot(&scan.all_files);
        let mut counts = ExecutionCounts::default();
        let mut errors: Vec<String> = Vec::new();
        let mut touched: Vec<PathBuf> = Vec::new();

        // In-place modifications, one checkpoint per file
        let modifier = FileModificationService::new();
        for file_plan in scan.plan.modification_plans() {
            let context: BTreeMap<String, String> =
                [("file".to_string(), file_plan.file.display().to_string())].into();
            let op_id = logger.begin("modify_file", context.clone());

            if file_plan.create_backup {
                backup.create_checkpoint("modify_file", context)?;
            }
            let outcome = modifier.execute_modifications(&file_plan);
            for operation in &outcome.applied {
                match operation {
                    RemovalOperation::RemoveImport { .. } => counts.imports_removed += 1,
                    RemovalOperation::RemoveMethod { .. } => counts.methods_removed += 1,
                    RemovalOperation::RemoveVariable { .. } => counts.variables_removed += 1,
                    RemovalOperation::RenameReference { .. } => {}
                }
            }
            if outcome.succeeded() {
                if !outcome.applied.is_empty() {
                    touched.push(outcome.file.clone());
                }
                logger.complete(op_id, format!("{} operations applied", outcome.applied.len()));
            } else {
                counts.failed_operations += 1;
                let error = outcome
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown failure".to_string());
                errors.push(format!("{}: {error}", outcome.file.display()));
                logger.fail(op_id, error);
            }
        }

        // Orphaned-file deletion, vetoed paths skipped
        let orphan_detector = OrphanedFileDetector::new(self.root.clone());
        for file in &scan.plan.files_to_delete {
            let absolute = self.root.join(file);
            let context: BTreeMap<String, String> =
                [("file".to_string(), file.display().to_string())].into();
            let op_id = logger.begin("delete_file", context.clone());

            if let Err(e) = orphan_detector.validate_safe_deletion(&absolute) {
                errors.push(e.to_string());
                logger.fail(op_id, e.to_string());
                counts.failed_operations += 1;
                continue;
            }
            backup.create_checkpoint("delete_file", context)?;
            match modifier.delete_file(&absolute) {
                Ok(size) => {
                    counts.files_deleted += 1;
                    logger.complete(op_id, format!("{size} bytes freed"));
                }
                Err(e) => {
                    counts.failed_operations += 1;
                    errors.push(format!("{}: {e}", file.display()));
                    logger.fail(op_id, e.to_string());
                }
            }
        }

        // Component extraction
        let extractor = ExtractionService::new(self.root.clone());
        for suggestion in &scan.plan.components_to_create {
            let context: BTreeMap<String, String> =
                [("component".to_string(), suggestion.name.clone())].into();
            let op_id = logger.begin("extract_component", context.clone());

            backup.create_checkpoint("extract_component", context)?;
            match extractor.extract_component(suggestion) {
                Ok(outcome) => {
                    counts.components_created += 1;
                    counts.duplicates_refactored += 1;
                    touched.extend(outcome.rewritten_files.iter().map(|f| self.root.join(f)));
                    errors.extend(outcome.errors.clone());
                    logger.complete(
                        op_id,
                        format!("{} occurrences rewritten", outcome.rewritten_files.len()),
                    );
                }
                Err(e) => {
                    counts.failed_operations += 1;
                    errors.push(format!("component {}: {e}", suggestion.name));
                    logger.fail(op_id, e.to_string());
                }
            }
        }

        // Post-flight validation over the mutated tree
        let removed = removed_elements(&scan.plan);
        let after_files = FileWalker::new(self.root.clone())
            .with_ignore_patterns(self.config.excluded_paths.clone())
            .walk_all()?;
        let contents_after = read_contents(&after_files);

        let post_id = logger.begin("post_cleanup_validation", BTreeMap::new());
        let post = safety_service.validate_after_cleanup(&removed, &contents_after, &touched)?;
        if post.rollback_required {
            logger.fail(post_id, "regressions found; rollback recommended");
        } else {
            logger.complete(post_id, "no regressions");
        }

        backup.cleanup(self.config.backup_retention_days);

        counts.elapsed_secs = started.elapsed().as_secs();
        let after = metrics.snapshot(&after_files);
        let report = generator.generate(ReportInput {
            root: self.root.clone(),
            dry_run: false,
            counts,
            planned_operations: scan.plan.total_operations(),
            errors,
            touched_files: touched,
            size_reduction: Some(metrics.compare(before, after)),
            safety: Some(safety),
            post_validation: Some(post),
            log_statistics: logger.statistics(),
        });

        Ok(PipelineOutcome {
            plan: scan.plan,
            report,
            log: logger,
        })
    }

    fn build_plan(
        &self,
        analyses: &[FileAnalysis],
        class_hierarchy: &ClassHierarchy,
        duplicates: &CrossFileDuplicateReport,
        orphans: &OrphanReport,
    ) -> CleanupPlan {
        let mut plan = CleanupPlan::new(PlanOptions {
            dry_run: self.config.dry_run,
            included_languages: self.config.included_languages.clone(),
            excluded_paths: self.config.excluded_paths.clone(),
            batch_size: self.config.batch_size,
        });

        for analysis in analyses {
            plan.imports_to_remove.extend(php::find_unused_imports(analysis));
            plan.variables_to_remove.extend(php::find_unused_variables(analysis));
            plan.variables_to_remove
                .extend(javascript::find_unused_variables(analysis));
        }
        plan.methods_to_remove
            .extend(hierarchy::find_unused_methods(class_hierarchy, analyses));

        let detector = OrphanedFileDetector::new(self.root.clone());
        plan.files_to_delete.extend(
            orphans
                .orphaned
                .iter()
                .filter(|asset| detector.validate_safe_deletion(&asset.path).is_ok())
                .map(|asset| asset.path.clone()),
        );

        plan.duplicates_to_refactor.extend(
            duplicates
                .php_methods
                .iter()
                .chain(duplicates.blade_templates.iter())
                .chain(duplicates.css_rules.iter())
                .chain(duplicates.js_functions.iter())
                .filter(|group| group.kind == DuplicateKind::Exact)
                .cloned(),
        );
        plan.components_to_create
            .extend(duplicates.component_suggestions.iter().cloned());

        plan
    }
}

/// Flatten the plan's removals for post-flight call-site re-verification
fn removed_elements(plan: &CleanupPlan) -> Vec<RemovedElement> {
    let mut removed = Vec::new();
    for method in &plan.methods_to_remove {
        removed.push(RemovedElement {
            name: method.method.clone(),
            kind: "method".to_string(),
            file: method.file.clone(),
        });
    }
    for variable in &plan.variables_to_remove {
        removed.push(RemovedElement {
            name: variable.name.clone(),
            kind: "variable".to_string(),
            file: variable.file.clone(),
        });
    }
    removed
}

/// Convenience entry point used by the CLI: load config, honor the
/// dry-run override, run the full pipeline.
pub fn run_cleanup(root: &Path, dry_run: bool) -> anyhow::Result<PipelineOutcome> {
    let mut config = CleanupConfig::load(root)?;
    config.dry_run = dry_run;
    CleanupPipeline::new(root.to_path_buf(), config).run()
}
