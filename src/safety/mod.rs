//! Pre- and post-mutation safety gates.
//!
//! The gatekeeper before and after any tree mutation: dynamic-usage risk
//! scanning over every removal candidate, automated test execution, and
//! critical-path validation. Git-state and safety-gate failures surface to
//! the operator; they are never silently retried.

pub mod patterns;
pub mod test_runner;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analyzers::{get_analyzer, Analyzer};
use crate::config::{protected_files, TestConfig};
use crate::core::errors::Result;
use crate::core::Language;
use crate::refactoring::plan::CleanupPlan;
use crate::vcs::GitBackupManager;

pub use patterns::{
    default_patterns, highest_tier, scan_candidate, DynamicUsageFinding, RemovalCandidate,
    RiskPattern, RiskTier,
};
pub use test_runner::{parse_test_output, SuiteResult, TestRunSummary, TestValidator};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SafetyReport {
    pub backup_id: Option<String>,
    pub findings: Vec<DynamicUsageFinding>,
    pub test_results: Option<TestRunSummary>,
    pub critical_paths_ok: bool,
    /// Composite score in [0, 1]; 1.0 means nothing risky was found
    pub safety_score: f64,
    /// False whenever any high-tier usage is found, any critical test
    /// fails, or critical-path validation fails
    pub safe_to_proceed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PostCleanupReport {
    /// Call sites still referencing elements the cleanup removed
    pub remaining_references: Vec<RemainingReference>,
    pub test_results: Option<TestRunSummary>,
    /// Files that no longer parse after the cleanup
    pub new_parse_errors: Vec<PathBuf>,
    pub rollback_required: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemainingReference {
    pub element: String,
    pub file: PathBuf,
    pub line: usize,
}

/// An element a cleanup execution removed, for post-flight re-verification
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemovedElement {
    pub name: String,
    pub kind: String,
    pub file: PathBuf,
}

pub struct SafetyValidationService {
    root: PathBuf,
    validator: TestValidator,
}

impl SafetyValidationService {
    pub fn new(root: PathBuf, test_config: TestConfig) -> Self {
        Self {
            root,
            validator: TestValidator::new(test_config),
        }
    }

    /// Pre-flight gate: backup, dynamic-usage scan over every element the
    /// plan would remove, test run, critical-path check.
    pub fn validate_before_cleanup(
        &self,
        plan: &CleanupPlan,
        contents: &[(PathBuf, String)],
        backup: Option<&mut GitBackupManager>,
    ) -> Result<SafetyReport> {
        let backup_id = match backup {
            Some(manager) => Some(manager.create_backup("pre-cleanup safety backup")?),
            None => None,
        };

        let findings = self.scan_plan(plan, contents);
        let test_results = self.validator.run(&self.root)?;
        let critical_paths_ok = self.validate_critical_paths();

        let critical_test_failed = test_results
            .as_ref()
            .is_some_and(|summary| self.validator.has_critical_failure(summary));
        let has_high_risk = highest_tier(&findings) == Some(RiskTier::High);

        let safety_score = compute_safety_score(&findings, &test_results, critical_paths_ok);
        let safe_to_proceed = !has_high_risk && !critical_test_failed && critical_paths_ok;

        if !safe_to_proceed {
            log::warn!(
                "Pre-cleanup validation blocked execution (high risk: {has_high_risk}, critical test failure: {critical_test_failed}, critical paths ok: {critical_paths_ok})"
            );
        }

        Ok(SafetyReport {
            backup_id,
            findings,
            test_results,
            critical_paths_ok,
            safety_score,
            safe_to_proceed,
        })
    }

    /// Post-flight gate: re-verify call sites of removed elements, re-run
    /// the suite, and re-parse touched files. Any regression sets
    /// `rollback_required`; actually rolling back is an operator decision.
    pub fn validate_after_cleanup(
        &self,
        removed: &[RemovedElement],
        contents_after: &[(PathBuf, String)],
        touched_files: &[PathBuf],
    ) -> Result<PostCleanupReport> {
        let remaining_references = find_remaining_references(removed, contents_after);
        let test_results = self.validator.run(&self.root)?;
        let new_parse_errors = reparse_failures(touched_files);

        let tests_regressed = test_results.as_ref().is_some_and(|s| !s.success);
        let rollback_required =
            !remaining_references.is_empty() || tests_regressed || !new_parse_errors.is_empty();

        if rollback_required {
            log::warn!(
                "Post-cleanup validation found regressions ({} dangling references, {} parse errors); rollback recommended",
                remaining_references.len(),
                new_parse_errors.len()
            );
        }

        Ok(PostCleanupReport {
            remaining_references,
            test_results,
            new_parse_errors,
            rollback_required,
        })
    }

    /// Convenience gate used before plan execution: false whenever any
    /// scanned removal candidate resolves to a high risk tier.
    pub fn is_safe_to_cleanup(&self, plan: &CleanupPlan, contents: &[(PathBuf, String)]) -> bool {
        let findings = self.scan_plan(plan, contents);
        highest_tier(&findings) != Some(RiskTier::High)
    }

    fn scan_plan(
        &self,
        plan: &CleanupPlan,
        contents: &[(PathBuf, String)],
    ) -> Vec<DynamicUsageFinding> {
        let mut findings = Vec::new();
        for candidate in plan_candidates(plan) {
            findings.extend(scan_candidate(&candidate, contents, default_patterns()));
        }
        findings.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then(a.line.cmp(&b.line))
                .then(a.element.cmp(&b.element))
        });
        findings.dedup_by(|a, b| {
            a.element == b.element && a.file == b.file && a.line == b.line && a.pattern == b.pattern
        });
        findings
    }

    /// Entry points that must keep existing and parsing for the
    /// application to boot at all.
    fn validate_critical_paths(&self) -> bool {
        let analyzer = crate::analyzers::php::PhpAnalyzer::new();
        for name in protected_files() {
            let path = self.root.join(name);
            if !path.exists() {
                continue;
            }
            if Language::from_path(&path) != Some(Language::Php) {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(&path) else {
                log::warn!("Critical path {} exists but is unreadable", path.display());
                return false;
            };
            if analyzer.parse(&content, path.clone()).has_errors() {
                log::warn!("Critical path {} no longer parses", path.display());
                return false;
            }
        }
        true
    }
}

/// Every element a plan removes, flattened for the scanner
fn plan_candidates(plan: &CleanupPlan) -> Vec<RemovalCandidate> {
    let mut candidates = Vec::new();

    for import in &plan.imports_to_remove {
        candidates.push(RemovalCandidate {
            name: import.name.clone(),
            kind: "import".to_string(),
            file: import.file.clone(),
        });
    }
    for method in &plan.methods_to_remove {
        candidates.push(RemovalCandidate {
            name: method.method.clone(),
            kind: "method".to_string(),
            file: method.file.clone(),
        });
    }
    for variable in &plan.variables_to_remove {
        candidates.push(RemovalCandidate {
            name: variable.name.clone(),
            kind: "variable".to_string(),
            file: variable.file.clone(),
        });
    }
    for file in &plan.files_to_delete {
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        candidates.push(RemovalCandidate {
            name: stem,
            kind: "file".to_string(),
            file: file.clone(),
        });
    }

    candidates
}

fn find_remaining_references(
    removed: &[RemovedElement],
    contents: &[(PathBuf, String)],
) -> Vec<RemainingReference> {
    let mut references = Vec::new();

    for element in removed {
        if element.name.len() < 3 {
            continue;
        }
        for (path, content) in contents {
            for (idx, line) in content.lines().enumerate() {
                let is_call = line.contains(&format!("{}(", element.name))
                    || line.contains(&format!("'{}'", element.name))
                    || line.contains(&format!("\"{}\"", element.name));
                if is_call && !line.contains(&format!("function {}", element.name)) {
                    references.push(RemainingReference {
                        element: element.name.clone(),
                        file: path.clone(),
                        line: idx + 1,
                    });
                }
            }
        }
    }

    references
}

fn reparse_failures(touched_files: &[PathBuf]) -> Vec<PathBuf> {
    let mut failures = Vec::new();
    for path in touched_files {
        let Some(language) = Language::from_path(path) else {
            continue;
        };
        let Ok(content) = std::fs::read_to_string(path) else {
            failures.push(path.clone());
            continue;
        };
        if get_analyzer(language).parse(&content, path.clone()).has_errors() {
            failures.push(path.clone());
        }
    }
    failures
}

fn compute_safety_score(
    findings: &[DynamicUsageFinding],
    test_results: &Option<TestRunSummary>,
    critical_paths_ok: bool,
) -> f64 {
    let mut score: f64 = 1.0;
    for finding in findings {
        score -= match finding.tier {
            RiskTier::High => 0.30,
            RiskTier::Medium => 0.10,
            RiskTier::Low => 0.02,
        };
    }
    if let Some(summary) = test_results {
        if !summary.success {
            score -= 0.40;
        }
        if summary.slow {
            score -= 0.05;
        }
    }
    if !critical_paths_ok {
        score -= 0.50;
    }
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::facts::Span;
    use crate::core::UnusedMethod;

    fn plan_with_method(file: &str, method: &str) -> CleanupPlan {
        let mut plan = CleanupPlan::default();
        plan.methods_to_remove.push(UnusedMethod {
            file: PathBuf::from(file),
            class: "Service".into(),
            method: method.into(),
            span: Span::new(10, 14),
        });
        plan
    }

    fn service() -> SafetyValidationService {
        SafetyValidationService::new(PathBuf::from("."), TestConfig::default())
    }

    #[test]
    fn high_risk_usage_blocks_cleanup() {
        let plan = plan_with_method("app/Service.php", "buildExport");
        let contents = vec![(
            PathBuf::from("app/Service.php"),
            "<?php\nclass Service {\n  public function run($m) { return call_user_func([$this, $m]); }\n  private function buildExport() {}\n}\n"
                .to_string(),
        )];

        assert!(!service().is_safe_to_cleanup(&plan, &contents));
        let report = service()
            .validate_before_cleanup(&plan, &contents, None)
            .unwrap();
        assert!(!report.safe_to_proceed);
        assert!(report.safety_score < 1.0);
    }

    #[test]
    fn quiet_candidates_are_safe() {
        let plan = plan_with_method("app/Service.php", "formatLabel");
        let contents = vec![(
            PathBuf::from("app/Service.php"),
            "<?php\nclass Service {\n  private function formatLabel() { return 'x'; }\n}\n"
                .to_string(),
        )];

        let report = service()
            .validate_before_cleanup(&plan, &contents, None)
            .unwrap();
        assert!(report.safe_to_proceed);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn dangling_reference_after_cleanup_requires_rollback() {
        let removed = vec![RemovedElement {
            name: "formatLabel".into(),
            kind: "method".into(),
            file: PathBuf::from("app/Service.php"),
        }];
        let contents = vec![(
            PathBuf::from("app/Controller.php"),
            "<?php\n$svc->formatLabel($x);\n".to_string(),
        )];

        let report = service()
            .validate_after_cleanup(&removed, &contents, &[])
            .unwrap();
        assert!(report.rollback_required);
        assert_eq!(report.remaining_references.len(), 1);
    }

    #[test]
    fn clean_execution_needs_no_rollback() {
        let removed = vec![RemovedElement {
            name: "formatLabel".into(),
            kind: "method".into(),
            file: PathBuf::from("app/Service.php"),
        }];
        let contents = vec![(
            PathBuf::from("app/Controller.php"),
            "<?php\n$svc->otherThing();\n".to_string(),
        )];

        let report = service()
            .validate_after_cleanup(&removed, &contents, &[])
            .unwrap();
        assert!(!report.rollback_required);
    }
}
