//! Structural analyzer for client-side JavaScript.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::analyzers::source::{balanced, find_block_end, scrub_c_like};
use crate::analyzers::Analyzer;
use crate::config::DuplicateThresholds;
use crate::core::facts::{
    AnalysisFacts, JsCall, JsFacts, JsFunction, JsIdentRef, JsVariable, Span,
};
use crate::core::{
    DuplicateKind, DuplicateMatch, DuplicateOccurrence, DuplicateType, FileAnalysis, Language,
    UnusedVariable,
};
use crate::debt::duplication::{fragment_complexity, signature_of};

static FUNCTION_DECL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:async\s+)?function\s+([A-Za-z_$][\w$]*)\s*\(([^)]*)\)").unwrap()
});
static FUNCTION_EXPR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?function\s*\(([^)]*)\)",
    )
    .unwrap()
});
static ARROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?\(([^)]*)\)\s*=>\s*\{",
    )
    .unwrap()
});
static VARIABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:var|let|const)\s+([A-Za-z_$][\w$]*)").unwrap());
static CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\w$.])([A-Za-z_$][\w$]*)\s*\(").unwrap());
static IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z_$][\w$]*").unwrap());

const CALL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "typeof", "new", "delete",
    "void", "in", "of", "do", "else", "try",
];

const DECLARATION_KEYWORDS: &[&str] =
    &["const", "let", "var", "import", "export", "default", "from"];

pub struct JsAnalyzer;

impl JsAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for JsAnalyzer {
    fn parse(&self, content: &str, path: PathBuf) -> FileAnalysis {
        let scrubbed = scrub_c_like(content);
        if !balanced(&scrubbed, '{', '}') || !balanced(&scrubbed, '(', ')') {
            return FileAnalysis::with_error(
                path,
                Language::JavaScript,
                "unbalanced braces or parentheses",
            );
        }

        let facts = extract_facts(&scrubbed);
        FileAnalysis::new(path, Language::JavaScript, AnalysisFacts::JavaScript(facts))
    }

    fn language(&self) -> Language {
        Language::JavaScript
    }
}

fn extract_facts(scrubbed: &str) -> JsFacts {
    let lines: Vec<&str> = scrubbed.lines().collect();
    let mut facts = JsFacts::default();

    for (idx, line) in lines.iter().enumerate() {
        let decl = FUNCTION_DECL_RE
            .captures(line)
            .or_else(|| FUNCTION_EXPR_RE.captures(line))
            .or_else(|| ARROW_RE.captures(line));
        if let Some(caps) = decl {
            let end = find_block_end(&lines, idx).unwrap_or(idx);
            let body: Vec<String> = lines[idx..=end]
                .iter()
                .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|l| !l.is_empty())
                .collect();
            facts.functions.push(JsFunction {
                name: caps[1].to_string(),
                params: parse_params(&caps[2]),
                normalized_body: body.join("\n"),
                span: Span::new(idx + 1, end + 1),
            });
        }
    }

    // Function-local lines are covered by the normalized bodies above;
    // variables, calls and identifier reads are only tracked at the top
    // level.
    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        if facts.functions.iter().any(|f| f.span.contains(line_no)) {
            continue;
        }

        if let Some(caps) = VARIABLE_RE.captures(line) {
            facts.variables.push(JsVariable {
                name: caps[1].to_string(),
                line: line_no,
            });
        }
        for caps in CALL_RE.captures_iter(line) {
            let name = &caps[1];
            if !CALL_KEYWORDS.contains(&name) {
                facts.calls.push(JsCall {
                    name: name.to_string(),
                    line: line_no,
                });
            }
        }
        for m in IDENT_RE.find_iter(line) {
            let name = m.as_str();
            if !CALL_KEYWORDS.contains(&name) && !DECLARATION_KEYWORDS.contains(&name) {
                facts.idents.push(JsIdentRef {
                    name: name.to_string(),
                    line: line_no,
                });
            }
        }
    }

    facts
}

fn parse_params(params: &str) -> Vec<String> {
    params
        .split(',')
        .map(|p| p.trim().trim_start_matches("...").to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Group functions with identical normalized bodies across the batch.
/// Bodies are compared with the declaration line stripped so `foo` and a
/// renamed copy still group together.
pub fn find_duplicate_functions(
    analyses: &[FileAnalysis],
    thresholds: &DuplicateThresholds,
) -> Vec<DuplicateMatch> {
    let mut by_body: HashMap<String, Vec<(&FileAnalysis, &JsFunction)>> = HashMap::new();

    for analysis in analyses {
        let Some(facts) = analysis.javascript() else {
            continue;
        };
        for function in &facts.functions {
            if function.span.line_count() < thresholds.min_fragment_lines {
                continue;
            }
            let body_only = strip_declaration_line(&function.normalized_body);
            by_body.entry(body_only).or_default().push((analysis, function));
        }
    }

    let mut matches: Vec<DuplicateMatch> = by_body
        .into_iter()
        .filter(|(_, occurrences)| occurrences.len() >= thresholds.min_occurrences)
        .map(|(body, occurrences)| DuplicateMatch {
            duplicate_type: DuplicateType::JsFunction,
            signature: signature_of(&body),
            kind: DuplicateKind::Exact,
            occurrences: occurrences
                .iter()
                .map(|(analysis, function)| DuplicateOccurrence {
                    file: analysis.path.clone(),
                    span: function.span,
                    fragment: function.normalized_body.clone(),
                })
                .collect(),
            similarity: 1.0,
            complexity_score: fragment_complexity(&body),
        })
        .collect();

    matches.sort_by(|a, b| a.signature.cmp(&b.signature));
    matches
}

fn strip_declaration_line(normalized_body: &str) -> String {
    normalized_body
        .lines()
        .skip(1)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Top-level bindings whose names never occur after their declaration line
pub fn find_unused_variables(analysis: &FileAnalysis) -> Vec<UnusedVariable> {
    let Some(facts) = analysis.javascript() else {
        return Vec::new();
    };

    facts
        .variables
        .iter()
        .filter(|variable| !variable_is_read(analysis, variable))
        .map(|variable| UnusedVariable {
            file: analysis.path.clone(),
            scope: None,
            name: variable.name.clone(),
            line: variable.line,
        })
        .collect()
}

fn variable_is_read(analysis: &FileAnalysis, variable: &JsVariable) -> bool {
    let Some(facts) = analysis.javascript() else {
        return true;
    };

    // Any occurrence on another top-level line counts: call target,
    // argument, right-hand side, export
    let top_level = facts
        .idents
        .iter()
        .any(|ident| ident.name == variable.name && ident.line != variable.line);
    let in_function_body = facts.functions.iter().any(|function| {
        function
            .normalized_body
            .lines()
            .any(|line| IDENT_RE.find_iter(line).any(|m| m.as_str() == variable.name))
            && !function.span.contains(variable.line)
    });

    top_level || in_function_body
}
