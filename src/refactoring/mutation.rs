//! Validated, reversible file mutation.
//!
//! Each planned modification moves through an explicit state machine:
//! Planned → Validated → BackedUp → Applied → Committed, with RolledBack
//! terminal from BackedUp or Applied. Every step returns an outcome value
//! rather than raising, so partial-batch failure semantics stay explicit:
//! a failing file is restored from its own backup while files already
//! committed in the same batch are left intact.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::analyzers::get_analyzer;
use crate::core::errors::{Error, Result};
use crate::core::facts::Span;
use crate::core::Language;
use crate::refactoring::plan::{FileModificationPlan, RemovalOperation};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModificationState {
    Planned,
    Validated,
    BackedUp,
    Applied,
    Committed,
    RolledBack,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModificationOutcome {
    pub file: PathBuf,
    pub state: ModificationState,
    pub applied: Vec<RemovalOperation>,
    /// Operations skipped by validation, with reasons
    pub skipped: Vec<String>,
    pub bytes_before: usize,
    pub bytes_after: usize,
    pub error: Option<String>,
}

impl ModificationOutcome {
    fn planned(file: PathBuf) -> Self {
        Self {
            file,
            state: ModificationState::Planned,
            applied: Vec::new(),
            skipped: Vec::new(),
            bytes_before: 0,
            bytes_after: 0,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == ModificationState::Committed
    }

    pub fn byte_delta(&self) -> i64 {
        self.bytes_after as i64 - self.bytes_before as i64
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub outcomes: Vec<ModificationOutcome>,
    pub modified_files: Vec<PathBuf>,
    pub errors: Vec<String>,
    pub bytes_delta: i64,
}

impl ExecutionResult {
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded()).count()
    }
}

#[derive(Default)]
pub struct FileModificationService;

impl FileModificationService {
    pub fn new() -> Self {
        Self
    }

    /// Pre-flight checks for one plan: the target must exist, be of a
    /// dialect that supports the requested operations, and parse cleanly
    /// as it stands. Unsupported operations are returned as skip reasons
    /// rather than failing the file.
    pub fn validate_modifications(&self, plan: &FileModificationPlan) -> Result<Vec<String>> {
        if !plan.file.exists() {
            return Err(Error::validation(format!(
                "target file does not exist: {}",
                plan.file.display()
            )));
        }
        let Some(language) = Language::from_path(&plan.file) else {
            return Err(Error::validation(format!(
                "unsupported file type: {}",
                plan.file.display()
            )));
        };

        let mut skipped = Vec::new();
        for operation in &plan.operations {
            if !operation.supported_languages().contains(&language) {
                skipped.push(format!(
                    "{} not supported on {language} files",
                    operation.describe()
                ));
            }
        }

        let content = std::fs::read_to_string(&plan.file)?;
        let analysis = get_analyzer(language).parse(&content, plan.file.clone());
        if analysis.has_errors() {
            return Err(Error::validation(format!(
                "{} has pre-existing syntax errors: {}",
                plan.file.display(),
                analysis.errors.join("; ")
            )));
        }

        Ok(skipped)
    }

    /// Run one plan through the full state machine. Failures land in the
    /// outcome, never as Err; a failure after Applied restores the file
    /// from its in-memory backup.
    pub fn execute_modifications(&self, plan: &FileModificationPlan) -> ModificationOutcome {
        let mut outcome = ModificationOutcome::planned(plan.file.clone());

        let skipped = match self.validate_modifications(plan) {
            Ok(skipped) => skipped,
            Err(e) => {
                outcome.error = Some(e.to_string());
                return outcome;
            }
        };
        outcome.skipped = skipped;
        outcome.state = ModificationState::Validated;

        let Some(language) = Language::from_path(&plan.file) else {
            outcome.error = Some(format!("unsupported file type: {}", plan.file.display()));
            return outcome;
        };
        let original = match std::fs::read_to_string(&plan.file) {
            Ok(content) => content,
            Err(e) => {
                outcome.error = Some(e.to_string());
                return outcome;
            }
        };
        outcome.bytes_before = original.len();
        // The in-memory copy is this file's backup for the rest of the run
        outcome.state = ModificationState::BackedUp;

        let mut content = original.clone();
        for operation in ordered_operations(&plan.operations, language) {
            match apply_operation(&content, &operation) {
                Ok(next) => {
                    content = next;
                    outcome.applied.push(operation);
                }
                Err(e) => outcome.skipped.push(format!("{}: {e}", operation.describe())),
            }
        }

        if outcome.applied.is_empty() {
            outcome.bytes_after = outcome.bytes_before;
            outcome.state = ModificationState::Committed;
            return outcome;
        }

        if let Err(e) = std::fs::write(&plan.file, &content) {
            outcome.error = Some(e.to_string());
            outcome.state = ModificationState::RolledBack;
            return outcome;
        }
        outcome.state = ModificationState::Applied;

        // Re-validate the mutated file; a now-broken file is restored
        // from its backup.
        let reparse = get_analyzer(language).parse(&content, plan.file.clone());
        if reparse.has_errors() {
            let restore = std::fs::write(&plan.file, &original);
            outcome.state = ModificationState::RolledBack;
            outcome.error = Some(match restore {
                Ok(()) => format!(
                    "modification produced syntax errors ({}); file restored",
                    reparse.errors.join("; ")
                ),
                Err(e) => format!(
                    "modification produced syntax errors and restore failed: {e}"
                ),
            });
            outcome.bytes_after = outcome.bytes_before;
            return outcome;
        }

        outcome.bytes_after = content.len();
        outcome.state = ModificationState::Committed;
        log::info!(
            "Modified {} ({} operations, {:+} bytes)",
            plan.file.display(),
            outcome.applied.len(),
            outcome.byte_delta()
        );
        outcome
    }

    /// Execute a batch sequentially. A mid-batch failure affects only the
    /// failing file; earlier committed files stay committed, and the
    /// failure is surfaced in the result's error list.
    pub fn execute_batch(&self, plans: &[FileModificationPlan]) -> ExecutionResult {
        let mut result = ExecutionResult::default();

        for plan in plans {
            let outcome = self.execute_modifications(plan);
            if outcome.succeeded() {
                if !outcome.applied.is_empty() {
                    result.modified_files.push(outcome.file.clone());
                }
            } else if let Some(error) = &outcome.error {
                result.errors.push(format!("{}: {error}", outcome.file.display()));
            }
            result.bytes_delta += outcome.byte_delta();
            result.outcomes.push(outcome);
        }

        result
    }

    /// Remove a whole file, returning its size for the report.
    pub fn delete_file(&self, path: &Path) -> Result<u64> {
        let size = std::fs::metadata(path)?.len();
        std::fs::remove_file(path)?;
        log::info!("Deleted {} ({size} bytes)", path.display());
        Ok(size)
    }
}

/// Renames first (they do not move lines), then span removals bottom-up so
/// earlier spans stay valid. Operations unsupported on this dialect are
/// dropped here (validation already recorded them as skipped), as are
/// line operations nested inside a removed method span: the span removal
/// subsumes them, and applying both would shift lines under the second.
fn ordered_operations(
    operations: &[RemovalOperation],
    language: Language,
) -> Vec<RemovalOperation> {
    let method_spans: Vec<Span> = operations
        .iter()
        .filter_map(|op| match op {
            RemovalOperation::RemoveMethod { span, .. } => Some(*span),
            _ => None,
        })
        .collect();

    let mut supported: Vec<RemovalOperation> = operations
        .iter()
        .filter(|op| op.supported_languages().contains(&language))
        .filter(|op| {
            let line = match op {
                RemovalOperation::RemoveImport { line, .. }
                | RemovalOperation::RemoveVariable { line, .. } => Some(*line),
                _ => None,
            };
            line.map_or(true, |l| !method_spans.iter().any(|span| span.contains(l)))
        })
        .cloned()
        .collect();

    supported.sort_by_key(|op| {
        let line = match op {
            RemovalOperation::RenameReference { .. } => 0,
            RemovalOperation::RemoveImport { line, .. } => *line,
            RemovalOperation::RemoveVariable { line, .. } => *line,
            RemovalOperation::RemoveMethod { span, .. } => span.start,
        };
        std::cmp::Reverse((matches!(op, RemovalOperation::RenameReference { .. }) as usize, line))
    });
    // Reverse-sort puts renames (flag 1) first, then removals by
    // descending line.
    supported
}

static USE_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*use\s+[\w\\]+").unwrap());

fn apply_operation(content: &str, operation: &RemovalOperation) -> Result<String> {
    match operation {
        RemovalOperation::RemoveImport { name, line } => remove_import(content, name, *line),
        RemovalOperation::RemoveMethod { span, .. } => {
            Ok(remove_lines(content, span.start, span.end))
        }
        RemovalOperation::RemoveVariable { name, line } => remove_variable(content, name, *line),
        RemovalOperation::RenameReference { from, to } => rename_reference(content, from, to),
    }
}

fn remove_import(content: &str, name: &str, line: usize) -> Result<String> {
    let lines: Vec<&str> = content.lines().collect();
    let target = lines
        .get(line.saturating_sub(1))
        .filter(|l| USE_LINE_RE.is_match(l) && l.contains(name))
        .map(|_| line)
        .or_else(|| {
            lines
                .iter()
                .position(|l| USE_LINE_RE.is_match(l) && l.contains(name))
                .map(|idx| idx + 1)
        })
        .ok_or_else(|| Error::validation(format!("no use statement binding {name} found")))?;

    Ok(remove_lines(content, target, target))
}

fn remove_variable(content: &str, name: &str, line: usize) -> Result<String> {
    let lines: Vec<&str> = content.lines().collect();
    let assignment = format!("${name}");
    let is_standalone_assignment = lines.get(line.saturating_sub(1)).is_some_and(|l| {
        let trimmed = l.trim_start();
        trimmed.starts_with(&assignment)
            && trimmed[assignment.len()..].trim_start().starts_with('=')
            && l.trim_end().ends_with(';')
    });
    if !is_standalone_assignment {
        return Err(Error::validation(format!(
            "line {line} is not a standalone assignment to ${name}"
        )));
    }

    Ok(remove_lines(content, line, line))
}

fn rename_reference(content: &str, from: &str, to: &str) -> Result<String> {
    let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(from)))
        .map_err(|e| Error::validation(format!("bad rename pattern: {e}")))?;
    if !pattern.is_match(content) {
        return Err(Error::validation(format!("no occurrences of {from}")));
    }
    Ok(pattern.replace_all(content, to).into_owned())
}

/// Remove 1-indexed inclusive line range, keeping the trailing newline
/// convention of the input.
fn remove_lines(content: &str, start: usize, end: usize) -> String {
    let kept: Vec<&str> = content
        .lines()
        .enumerate()
        .filter(|(idx, _)| {
            let line_no = idx + 1;
            line_no < start || line_no > end
        })
        .map(|(_, line)| line)
        .collect();

    let mut result = kept.join("\n");
    if content.ends_with('\n') {
        result.push('\n');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::facts::Span;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const SERVICE: &str = indoc! {"
        <?php

        namespace App\\Services;

        use App\\Models\\Product;
        use App\\Support\\Unused;

        class PriceService
        {
            public function total(Product $product)
            {
                $tax = $product->price * 0.2;
                return $product->price + $tax;
            }

            private function legacyRound($value)
            {
                return round($value, 2);
            }
        }
    "};

    fn write_fixture(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("PriceService.php");
        fs::write(&path, SERVICE).unwrap();
        path
    }

    #[test]
    fn removes_import_and_method_and_commits() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);

        let plan = FileModificationPlan {
            file: path.clone(),
            operations: vec![
                RemovalOperation::RemoveImport {
                    name: "Unused".into(),
                    line: 6,
                },
                RemovalOperation::RemoveMethod {
                    class: "PriceService".into(),
                    method: "legacyRound".into(),
                    span: Span::new(16, 19),
                },
            ],
            create_backup: true,
        };

        let outcome = FileModificationService::new().execute_modifications(&plan);
        assert_eq!(outcome.state, ModificationState::Committed);
        assert_eq!(outcome.applied.len(), 2);
        assert!(outcome.byte_delta() < 0);

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("Unused"));
        assert!(!content.contains("legacyRound"));
        assert!(content.contains("public function total"));
    }

    #[test]
    fn missing_target_fails_validation() {
        let plan = FileModificationPlan {
            file: PathBuf::from("/nonexistent/File.php"),
            operations: vec![],
            create_backup: false,
        };
        let outcome = FileModificationService::new().execute_modifications(&plan);
        assert_eq!(outcome.state, ModificationState::Planned);
        assert!(outcome.error.is_some());
    }

    #[test]
    fn unsupported_operation_is_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("site.css");
        fs::write(&path, ".card { color: red; }\n").unwrap();

        let plan = FileModificationPlan {
            file: path.clone(),
            operations: vec![RemovalOperation::RemoveImport {
                name: "Foo".into(),
                line: 1,
            }],
            create_backup: false,
        };

        let outcome = FileModificationService::new().execute_modifications(&plan);
        assert_eq!(outcome.state, ModificationState::Committed);
        assert!(outcome.applied.is_empty());
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), ".card { color: red; }\n");
    }

    #[test]
    fn broken_result_rolls_back_from_backup() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);

        // Removing only the method's closing lines leaves unbalanced braces
        let plan = FileModificationPlan {
            file: path.clone(),
            operations: vec![RemovalOperation::RemoveMethod {
                class: "PriceService".into(),
                method: "legacyRound".into(),
                span: Span::new(18, 20),
            }],
            create_backup: true,
        };

        let outcome = FileModificationService::new().execute_modifications(&plan);
        assert_eq!(outcome.state, ModificationState::RolledBack);
        assert!(outcome.error.is_some());
        assert_eq!(fs::read_to_string(&path).unwrap(), SERVICE);
    }

    #[test]
    fn batch_failure_leaves_committed_files_intact() {
        let dir = TempDir::new().unwrap();
        let good = write_fixture(&dir);
        let missing = dir.path().join("Gone.php");

        let plans = vec![
            FileModificationPlan {
                file: good.clone(),
                operations: vec![RemovalOperation::RemoveImport {
                    name: "Unused".into(),
                    line: 6,
                }],
                create_backup: true,
            },
            FileModificationPlan {
                file: missing,
                operations: vec![],
                create_backup: true,
            },
        ];

        let result = FileModificationService::new().execute_batch(&plans);
        assert_eq!(result.failed_count(), 1);
        assert_eq!(result.modified_files.len(), 1);
        assert_eq!(result.errors.len(), 1);
        assert!(!fs::read_to_string(&good).unwrap().contains("Unused"));
    }

    #[test]
    fn rename_reference_is_word_bounded() {
        let content = "$cart = new Cart();\n$cartItems = $cart->items();\n";
        let renamed = rename_reference(content, "cart", "basket").unwrap();
        assert!(renamed.contains("$basket = new Cart();"));
        assert!(renamed.contains("$cartItems"));
    }
}
