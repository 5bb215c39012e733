//! Cleanup plans: the full, reviewable set of proposed removal and
//! extraction operations before anything touches the tree.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::core::facts::Span;
use crate::core::{
    ComponentExtractionSuggestion, DuplicateMatch, Language, UnusedImport, UnusedMethod,
    UnusedVariable,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanOptions {
    pub dry_run: bool,
    pub included_languages: Vec<Language>,
    pub excluded_paths: Vec<String>,
    pub batch_size: usize,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            included_languages: Language::all(),
            excluded_paths: Vec::new(),
            batch_size: 25,
        }
    }
}

/// One concrete textual change against one file
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum RemovalOperation {
    RemoveImport { name: String, line: usize },
    RemoveMethod { class: String, method: String, span: Span },
    RemoveVariable { name: String, line: usize },
    RenameReference { from: String, to: String },
}

impl RemovalOperation {
    /// Languages on which this operation is meaningful
    pub fn supported_languages(&self) -> &'static [Language] {
        match self {
            RemovalOperation::RemoveImport { .. } | RemovalOperation::RemoveMethod { .. } => {
                &[Language::Php]
            }
            RemovalOperation::RemoveVariable { .. } => &[Language::Php, Language::JavaScript],
            RemovalOperation::RenameReference { .. } => &[
                Language::Php,
                Language::JavaScript,
                Language::Css,
                Language::Blade,
            ],
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RemovalOperation::RemoveImport { name, line } => {
                format!("remove import {name} (line {line})")
            }
            RemovalOperation::RemoveMethod { class, method, .. } => {
                format!("remove method {class}::{method}")
            }
            RemovalOperation::RemoveVariable { name, line } => {
                format!("remove variable ${name} (line {line})")
            }
            RemovalOperation::RenameReference { from, to } => format!("rename {from} to {to}"),
        }
    }
}

/// One target file plus the removal operations that apply to it
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileModificationPlan {
    pub file: PathBuf,
    pub operations: Vec<RemovalOperation>,
    pub create_backup: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CleanupPlan {
    pub files_to_delete: Vec<PathBuf>,
    pub imports_to_remove: Vec<UnusedImport>,
    pub methods_to_remove: Vec<UnusedMethod>,
    pub variables_to_remove: Vec<UnusedVariable>,
    pub duplicates_to_refactor: Vec<DuplicateMatch>,
    pub components_to_create: Vec<ComponentExtractionSuggestion>,
    #[serde(default)]
    pub options: PlanOptions,
}

impl CleanupPlan {
    pub fn new(options: PlanOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn total_operations(&self) -> usize {
        self.files_to_delete.len()
            + self.imports_to_remove.len()
            + self.methods_to_remove.len()
            + self.variables_to_remove.len()
            + self.duplicates_to_refactor.len()
            + self.components_to_create.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_operations() == 0
    }

    /// Group the in-place removal operations by target file, in stable
    /// path order, respecting the configured batch size.
    pub fn modification_plans(&self) -> Vec<FileModificationPlan> {
        let mut by_file: BTreeMap<PathBuf, Vec<RemovalOperation>> = BTreeMap::new();

        for import in &self.imports_to_remove {
            by_file
                .entry(import.file.clone())
                .or_default()
                .push(RemovalOperation::RemoveImport {
                    name: import.name.clone(),
                    line: import.line,
                });
        }
        for method in &self.methods_to_remove {
            by_file
                .entry(method.file.clone())
                .or_default()
                .push(RemovalOperation::RemoveMethod {
                    class: method.class.clone(),
                    method: method.method.clone(),
                    span: method.span,
                });
        }
        for variable in &self.variables_to_remove {
            by_file
                .entry(variable.file.clone())
                .or_default()
                .push(RemovalOperation::RemoveVariable {
                    name: variable.name.clone(),
                    line: variable.line,
                });
        }

        by_file
            .into_iter()
            .take(self.options.batch_size)
            .map(|(file, operations)| FileModificationPlan {
                file,
                operations,
                create_backup: !self.options.dry_run,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_plan_has_zero_operations() {
        let plan = CleanupPlan::default();
        assert!(plan.is_empty());
        assert_eq!(plan.total_operations(), 0);
        assert!(plan.modification_plans().is_empty());
    }

    #[test]
    fn total_operations_is_sum_of_all_lists() {
        let mut plan = CleanupPlan::default();
        plan.files_to_delete.push(PathBuf::from("old.png"));
        plan.imports_to_remove.push(UnusedImport {
            file: PathBuf::from("a.php"),
            name: "Unused".into(),
            path: "App\\Unused".into(),
            line: 3,
        });
        plan.variables_to_remove.push(UnusedVariable {
            file: PathBuf::from("a.php"),
            scope: None,
            name: "tmp".into(),
            line: 10,
        });

        assert_eq!(plan.total_operations(), 3);
        let mods = plan.modification_plans();
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].operations.len(), 2);
    }
}
