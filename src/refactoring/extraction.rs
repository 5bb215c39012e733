//! Artifact extraction: turn a duplicate group into one shared artifact
//! and rewrite every occurrence to reference it.
//!
//! Blade fragments become components under `resources/views/components/`,
//! referenced via `@include`; PHP method bodies become static helpers
//! under `app/Support/`, with each original body forwarding to the
//! helper. Occurrences are rewritten bottom-up per file so spans stay
//! valid.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::errors::{Error, Result};
use crate::core::facts::Span;
use crate::core::{
    ComponentExtractionSuggestion, DuplicateOccurrence, MethodExtractionSuggestion,
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub artifact: PathBuf,
    pub rewritten_files: Vec<PathBuf>,
    pub errors: Vec<String>,
}

pub struct ExtractionService {
    root: PathBuf,
}

impl ExtractionService {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the component file and replace each duplicate occurrence
    /// with an `@include` of it.
    pub fn extract_component(
        &self,
        suggestion: &ComponentExtractionSuggestion,
    ) -> Result<ExtractionOutcome> {
        let artifact = self.root.join(&suggestion.artifact_path);
        self.write_artifact(&artifact, &format!("{}\n", suggestion.fragment.trim_end()))?;

        let include = format!("@include('components.{}')", suggestion.name);
        let mut outcome = ExtractionOutcome {
            artifact: suggestion.artifact_path.clone(),
            ..ExtractionOutcome::default()
        };
        self.rewrite_occurrences(&suggestion.locations, &include, &mut outcome);

        log::info!(
            "Extracted component {} into {} ({} occurrences rewritten)",
            suggestion.name,
            suggestion.artifact_path.display(),
            outcome.rewritten_files.len()
        );
        Ok(outcome)
    }

    /// Create a static helper class holding the duplicated method and
    /// rewrite each original body into a forwarding call.
    pub fn extract_method(
        &self,
        suggestion: &MethodExtractionSuggestion,
    ) -> Result<ExtractionOutcome> {
        let signature = parse_method_signature(&suggestion.fragment).ok_or_else(|| {
            Error::validation(format!(
                "cannot determine method signature for {}",
                suggestion.name
            ))
        })?;

        let class_name = suggestion
            .artifact_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| Error::validation("artifact path has no file name".to_string()))?;

        let artifact = self.root.join(&suggestion.artifact_path);
        self.write_artifact(
            &artifact,
            &render_helper_class(&class_name, &signature, &suggestion.fragment),
        )?;

        let forward = format!(
            "return \\App\\Support\\{}::{}({});",
            class_name,
            signature.name,
            signature.params.join(", ")
        );
        let replacement = format!(
            "{}\n{{\n    {}\n}}",
            suggestion
                .fragment
                .lines()
                .next()
                .unwrap_or_default()
                .trim_end_matches(['{', ' ']),
            forward
        );

        let mut outcome = ExtractionOutcome {
            artifact: suggestion.artifact_path.clone(),
            ..ExtractionOutcome::default()
        };
        self.rewrite_occurrences(&suggestion.locations, &replacement, &mut outcome);

        log::info!(
            "Extracted method {} into {} ({} occurrences forwarded)",
            signature.name,
            suggestion.artifact_path.display(),
            outcome.rewritten_files.len()
        );
        Ok(outcome)
    }

    fn write_artifact(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if path.exists() {
            return Err(Error::validation(format!(
                "artifact already exists: {}",
                path.display()
            )));
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Replace each occurrence span with the replacement text, indented
    /// to the original fragment's leading whitespace. Occurrences are
    /// grouped by file and applied bottom-up.
    fn rewrite_occurrences(
        &self,
        locations: &[DuplicateOccurrence],
        replacement: &str,
        outcome: &mut ExtractionOutcome,
    ) {
        let mut by_file: BTreeMap<PathBuf, Vec<Span>> = BTreeMap::new();
        for location in locations {
            by_file.entry(location.file.clone()).or_default().push(location.span);
        }

        for (file, mut spans) in by_file {
            let path = if file.is_absolute() {
                file.clone()
            } else {
                self.root.join(&file)
            };
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    outcome.errors.push(format!("{}: {e}", file.display()));
                    continue;
                }
            };

            spans.sort_by(|a, b| b.start.cmp(&a.start));
            let mut lines: Vec<String> = content.lines().map(String::from).collect();
            for span in spans {
                if span.start == 0 || span.end > lines.len() {
                    outcome.errors.push(format!(
                        "{}: span {}-{} out of range",
                        file.display(),
                        span.start,
                        span.end
                    ));
                    continue;
                }
                let indent: String = lines[span.start - 1]
                    .chars()
                    .take_while(|c| c.is_whitespace())
                    .collect();
                let replacement_lines: Vec<String> = replacement
                    .lines()
                    .map(|l| {
                        if l.is_empty() {
                            l.to_string()
                        } else {
                            format!("{indent}{l}")
                        }
                    })
                    .collect();
                lines.splice(span.start - 1..span.end, replacement_lines);
            }

            let mut rewritten = lines.join("\n");
            if content.ends_with('\n') {
                rewritten.push('\n');
            }
            match std::fs::write(&path, rewritten) {
                Ok(()) => outcome.rewritten_files.push(file),
                Err(e) => outcome.errors.push(format!("{}: {e}", file.display())),
            }
        }
    }
}

struct MethodSignature {
    name: String,
    params: Vec<String>,
}

static SIGNATURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"function\s+&?([A-Za-z_]\w*)\s*\(([^)]*)\)").unwrap());
static PARAM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$[A-Za-z_]\w*").unwrap());

fn parse_method_signature(fragment: &str) -> Option<MethodSignature> {
    let caps = SIGNATURE_RE.captures(fragment)?;
    let params = PARAM_RE
        .find_iter(&caps[2])
        .map(|m| m.as_str().to_string())
        .collect();
    Some(MethodSignature {
        name: caps[1].to_string(),
        params,
    })
}

fn render_helper_class(class_name: &str, signature: &MethodSignature, fragment: &str) -> String {
    let body = reindent_method(fragment);
    format!(
        "<?php\n\nnamespace App\\Support;\n\nclass {class_name}\n{{\n    public static function {}({})\n{body}}}\n",
        signature.name,
        signature.params.join(", ")
    )
}

/// Body lines of the fragment (everything past the signature line),
/// dedented to the fragment's own indent and re-indented for the helper
/// class.
fn reindent_method(fragment: &str) -> String {
    let lines: Vec<&str> = fragment.lines().skip(1).collect();
    let common_indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out = String::new();
    for line in lines {
        if line.trim().is_empty() {
            out.push('\n');
        } else {
            let dedented = &line[common_indent.min(line.len())..];
            out.push_str("    ");
            out.push_str(dedented);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::fs;
    use tempfile::TempDir;

    fn occurrence(file: &str, start: usize, end: usize, fragment: &str) -> DuplicateOccurrence {
        DuplicateOccurrence {
            file: PathBuf::from(file),
            span: Span::new(start, end),
            fragment: fragment.to_string(),
        }
    }

    #[test]
    fn component_extraction_writes_artifact_and_rewrites_views() {
        let dir = TempDir::new().unwrap();
        let view_dir = dir.path().join("resources/views");
        fs::create_dir_all(&view_dir).unwrap();

        let card = indoc! {r#"
            <div class="product-card">
                <h3>{{ $product->name }}</h3>
                <p>{{ $product->price }}</p>
            </div>
        "#};
        let page = format!("@extends('layouts.app')\n{card}");
        fs::write(view_dir.join("shop.blade.php"), &page).unwrap();
        fs::write(view_dir.join("home.blade.php"), &page).unwrap();

        let suggestion = ComponentExtractionSuggestion {
            name: "product-card".into(),
            artifact_path: PathBuf::from("resources/views/components/product-card.blade.php"),
            fragment: card.trim_end().to_string(),
            locations: vec![
                occurrence("resources/views/shop.blade.php", 2, 5, card),
                occurrence("resources/views/home.blade.php", 2, 5, card),
            ],
            estimated_saved_lines: 4,
        };

        let outcome = ExtractionService::new(dir.path().to_path_buf())
            .extract_component(&suggestion)
            .unwrap();

        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.rewritten_files.len(), 2);

        let artifact = dir
            .path()
            .join("resources/views/components/product-card.blade.php");
        assert!(fs::read_to_string(artifact)
            .unwrap()
            .contains("product-card"));

        let rewritten = fs::read_to_string(view_dir.join("shop.blade.php")).unwrap();
        assert!(rewritten.contains("@include('components.product-card')"));
        assert!(!rewritten.contains("<h3>"));
    }

    #[test]
    fn method_extraction_creates_helper_and_forwards() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("app")).unwrap();

        let method = indoc! {"
            public function sum($a, $b)
            {
                $result = $a + $b;
                return $result;
            }"};
        let class_file = format!(
            "<?php\n\nclass OrderTotals\n{{\n{}\n}}\n",
            method
                .lines()
                .map(|l| format!("    {l}"))
                .collect::<Vec<_>>()
                .join("\n")
        );
        let path = dir.path().join("app/OrderTotals.php");
        fs::write(&path, &class_file).unwrap();

        let suggestion = MethodExtractionSuggestion {
            name: "sum".into(),
            artifact_path: PathBuf::from("app/Support/Sum.php"),
            fragment: method.to_string(),
            locations: vec![occurrence("app/OrderTotals.php", 5, 9, method)],
            estimated_saved_lines: 4,
        };

        let outcome = ExtractionService::new(dir.path().to_path_buf())
            .extract_method(&suggestion)
            .unwrap();
        assert!(outcome.errors.is_empty());

        let helper = fs::read_to_string(dir.path().join("app/Support/Sum.php")).unwrap();
        assert!(helper.contains("namespace App\\Support;"));
        assert!(helper.contains("public static function sum($a, $b)"));
        assert!(helper.contains("return $result;"));

        let rewritten = fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("return \\App\\Support\\Sum::sum($a, $b);"));
        assert!(!rewritten.contains("$result = $a + $b;"));
    }

    #[test]
    fn existing_artifact_is_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let artifact_dir = dir.path().join("resources/views/components");
        fs::create_dir_all(&artifact_dir).unwrap();
        fs::write(artifact_dir.join("card.blade.php"), "existing").unwrap();

        let suggestion = ComponentExtractionSuggestion {
            name: "card".into(),
            artifact_path: PathBuf::from("resources/views/components/card.blade.php"),
            fragment: "<div></div>".into(),
            locations: vec![],
            estimated_saved_lines: 0,
        };

        let err = ExtractionService::new(dir.path().to_path_buf())
            .extract_component(&suggestion)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
