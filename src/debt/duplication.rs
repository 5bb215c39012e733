//! Cross-file duplicate detection.
//!
//! Shared primitives (signatures, similarity, complexity) plus the
//! detector that orchestrates every dialect's duplicate finder into one
//! report. Grouping is deterministic: running the detector twice on an
//! unchanged tree yields identical groupings.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::analyzers::{blade, css, javascript};
use crate::config::DuplicateThresholds;
use crate::core::facts::Span;
use crate::core::{
    ComponentExtractionSuggestion, DuplicateKind, DuplicateMatch, DuplicateOccurrence,
    DuplicateType, FileAnalysis, MethodExtractionSuggestion,
};

/// Stable fingerprint of a normalized fragment
pub fn signature_of(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Structural tokens of a normalized fragment, for overlap scoring
pub fn structure_tokens(normalized: &str) -> HashSet<String> {
    normalized
        .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .filter(|t| t.len() > 1)
        .map(|t| t.to_lowercase())
        .collect()
}

/// Jaccard overlap of two token sets: symmetric, bounded in [0, 1],
/// 1.0 for identical sets.
pub fn jaccard(left: &HashSet<String>, right: &HashSet<String>) -> f64 {
    if left.is_empty() && right.is_empty() {
        return 0.0;
    }
    let intersection = left.intersection(right).count();
    let union = left.len() + right.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

const CONTROL_TOKENS: &[&str] = &[
    "if", "else", "elseif", "foreach", "for", "while", "switch", "match", "@if", "@foreach",
    "@forelse", "@while", "@switch", "try", "catch",
];

/// Heuristic complexity in [0, 1]: grows monotonically with fragment size
/// and control-flow token density, saturating at 40 lines / 10 branches.
pub fn fragment_complexity(fragment: &str) -> f64 {
    let lines = fragment.lines().filter(|l| !l.trim().is_empty()).count();
    let controls = fragment
        .split_whitespace()
        .filter(|word| {
            let word = word.trim_start_matches('(').trim_end_matches(['(', '{', ')']);
            CONTROL_TOKENS.contains(&word)
        })
        .count();

    let size_factor = (lines as f64 / 40.0).min(1.0);
    let control_factor = (controls as f64 / 10.0).min(1.0);
    0.6 * size_factor + 0.4 * control_factor
}

/// Group PHP method and free-function bodies with identical normalized
/// content across the batch. Bodies are compared with variable names
/// replaced by a placeholder and the signature line stripped.
pub fn find_duplicate_methods(
    analyses: &[FileAnalysis],
    contents: &[(PathBuf, String)],
    thresholds: &DuplicateThresholds,
) -> Vec<DuplicateMatch> {
    let content_map: HashMap<&PathBuf, &String> =
        contents.iter().map(|(path, content)| (path, content)).collect();

    struct Candidate<'a> {
        analysis: &'a FileAnalysis,
        span: Span,
        raw: String,
        normalized: String,
    }

    let mut candidates: Vec<Candidate> = Vec::new();

    for analysis in analyses {
        let Some(facts) = analysis.php() else {
            continue;
        };
        let Some(content) = content_map.get(&analysis.path) else {
            continue;
        };
        let lines: Vec<&str> = content.lines().collect();

        let mut spans: Vec<Span> = Vec::new();
        for class in &facts.classes {
            for method in &class.methods {
                if !method.is_abstract {
                    spans.push(method.span);
                }
            }
        }
        for function in &facts.functions {
            spans.push(function.span);
        }

        for span in spans {
            if span.line_count() < thresholds.min_fragment_lines {
                continue;
            }
            let Some(raw_lines) = lines.get(span.start - 1..span.end) else {
                continue;
            };
            let raw = raw_lines.join("\n");
            let normalized = normalize_method_body(raw_lines);
            if normalized.is_empty() {
                continue;
            }
            candidates.push(Candidate {
                analysis,
                span,
                raw,
                normalized,
            });
        }
    }

    let mut by_body: HashMap<String, Vec<&Candidate>> = HashMap::new();
    for candidate in &candidates {
        by_body
            .entry(candidate.normalized.clone())
            .or_default()
            .push(candidate);
    }

    let mut matches: Vec<DuplicateMatch> = by_body
        .into_iter()
        .filter(|(_, group)| group.len() >= thresholds.min_occurrences)
        .map(|(body, group)| DuplicateMatch {
            duplicate_type: DuplicateType::PhpMethod,
            signature: signature_of(&body),
            kind: DuplicateKind::Exact,
            occurrences: group
                .iter()
                .map(|candidate| DuplicateOccurrence {
                    file: candidate.analysis.path.clone(),
                    span: candidate.span,
                    fragment: candidate.raw.clone(),
                })
                .collect(),
            similarity: 1.0,
            complexity_score: group
                .first()
                .map(|c| fragment_complexity(&c.raw))
                .unwrap_or(0.0),
        })
        .collect();

    matches.sort_by(|a, b| a.signature.cmp(&b.signature));
    matches
}

static VAR_PLACEHOLDER_RE: once_cell::sync::Lazy<regex::Regex> =
    once_cell::sync::Lazy::new(|| regex::Regex::new(r"\$[A-Za-z_]\w*").unwrap());

fn normalize_method_body(raw_lines: &[&str]) -> String {
    let body_lines: Vec<&str> = if raw_lines.len() <= 1 {
        raw_lines.to_vec()
    } else {
        raw_lines[1..].to_vec()
    };

    body_lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && *line != "{" && *line != "}")
        .map(|line| {
            let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
            VAR_PLACEHOLDER_RE.replace_all(&collapsed, "$$_").into_owned()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Suggest extracting exact method-duplicate groups into shared helpers
pub fn extract_method_candidates(
    analyses: &[FileAnalysis],
    contents: &[(PathBuf, String)],
    thresholds: &DuplicateThresholds,
) -> Vec<MethodExtractionSuggestion> {
    let duplicates = find_duplicate_methods(analyses, contents, thresholds);
    let mut suggestions = Vec::new();

    for group in duplicates {
        if group.occurrences.len() < thresholds.extraction_min_occurrences {
            continue;
        }
        let lines = group.occurrences[0].span.line_count();
        if lines < thresholds.extraction_min_lines {
            continue;
        }

        let name = method_name_of(&group).unwrap_or_else(|| "sharedHelper".to_string());
        let artifact_path = PathBuf::from(format!("app/Support/{}.php", studly(&name)));

        suggestions.push(MethodExtractionSuggestion {
            name,
            artifact_path,
            fragment: group.occurrences[0].fragment.clone(),
            estimated_saved_lines: group.potential_savings() * lines,
            locations: group.occurrences,
        });
    }

    suggestions.sort_by(|a, b| b.estimated_saved_lines.cmp(&a.estimated_saved_lines));
    suggestions
}

fn method_name_of(group: &DuplicateMatch) -> Option<String> {
    let first_line = group.occurrences.first()?.fragment.lines().next()?;
    let name_re = regex::Regex::new(r"function\s+&?([A-Za-z_]\w*)").ok()?;
    name_re
        .captures(first_line)
        .map(|caps| caps[1].to_string())
}

fn studly(name: &str) -> String {
    let mut out = String::new();
    let mut upper_next = true;
    for c in name.chars() {
        if c == '_' || c == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrossFileDuplicateReport {
    pub php_methods: Vec<DuplicateMatch>,
    pub blade_templates: Vec<DuplicateMatch>,
    pub css_rules: Vec<DuplicateMatch>,
    pub js_functions: Vec<DuplicateMatch>,
    pub component_suggestions: Vec<ComponentExtractionSuggestion>,
    pub method_suggestions: Vec<MethodExtractionSuggestion>,
    pub summary: DuplicateSummary,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DuplicateSummary {
    pub total_groups: usize,
    pub counts_by_type: HashMap<String, usize>,
    /// Occurrences that could be eliminated by refactoring every group
    pub estimated_savings: usize,
    /// Sorted descending by occurrence count x complexity
    pub priority_recommendations: Vec<PriorityRecommendation>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriorityRecommendation {
    pub duplicate_type: DuplicateType,
    pub signature: String,
    pub occurrence_count: usize,
    pub priority_score: f64,
}

/// Orchestrates every dialect's duplicate finder over one analysis batch
pub struct CrossFileDuplicateDetector {
    thresholds: DuplicateThresholds,
}

impl CrossFileDuplicateDetector {
    pub fn new(thresholds: DuplicateThresholds) -> Self {
        Self { thresholds }
    }

    pub fn detect(
        &self,
        analyses: &[FileAnalysis],
        contents: &[(PathBuf, String)],
    ) -> CrossFileDuplicateReport {
        let php_methods = find_duplicate_methods(analyses, contents, &self.thresholds);
        let blade_templates = blade::find_duplicate_templates(analyses, &self.thresholds);
        let css_rules = css::find_duplicate_rules(analyses, &self.thresholds);
        let js_functions = javascript::find_duplicate_functions(analyses, &self.thresholds);

        let component_suggestions = blade::extract_component_candidates(analyses, &self.thresholds);
        let method_suggestions =
            extract_method_candidates(analyses, contents, &self.thresholds);

        let summary = build_summary(&[
            &php_methods,
            &blade_templates,
            &css_rules,
            &js_functions,
        ]);

        CrossFileDuplicateReport {
            php_methods,
            blade_templates,
            css_rules,
            js_functions,
            component_suggestions,
            method_suggestions,
            summary,
        }
    }
}

fn build_summary(groups: &[&Vec<DuplicateMatch>]) -> DuplicateSummary {
    let all: Vec<&DuplicateMatch> = groups.iter().flat_map(|g| g.iter()).collect();

    let mut counts_by_type: HashMap<String, usize> = HashMap::new();
    for group in &all {
        *counts_by_type
            .entry(group.duplicate_type.to_string())
            .or_default() += 1;
    }

    let mut priority_recommendations: Vec<PriorityRecommendation> = all
        .iter()
        .map(|group| PriorityRecommendation {
            duplicate_type: group.duplicate_type,
            signature: group.signature.clone(),
            occurrence_count: group.occurrences.len(),
            priority_score: group.refactoring_priority(),
        })
        .collect();
    priority_recommendations.sort_by(|a, b| {
        b.priority_score
            .partial_cmp(&a.priority_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.signature.cmp(&b.signature))
    });

    DuplicateSummary {
        total_groups: all.len(),
        estimated_savings: all.iter().map(|g| g.potential_savings()).sum(),
        counts_by_type,
        priority_recommendations,
    }
}
