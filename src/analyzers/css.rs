//! Structural analyzer for stylesheets.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::analyzers::source::{balanced, scrub_css};
use crate::analyzers::Analyzer;
use crate::config::DuplicateThresholds;
use crate::core::facts::{AnalysisFacts, CssFacts, CssRule, MediaQuery, Span};
use crate::core::{
    DuplicateKind, DuplicateMatch, DuplicateOccurrence, DuplicateType, FileAnalysis, Language,
};
use crate::debt::duplication::signature_of;

pub struct CssAnalyzer;

impl CssAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CssAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for CssAnalyzer {
    fn parse(&self, content: &str, path: PathBuf) -> FileAnalysis {
        let scrubbed = scrub_css(content);
        if !balanced(&scrubbed, '{', '}') {
            return FileAnalysis::with_error(path, Language::Css, "unbalanced braces");
        }

        let facts = extract_facts(&scrubbed);
        FileAnalysis::new(path, Language::Css, AnalysisFacts::Css(facts))
    }

    fn language(&self) -> Language {
        Language::Css
    }
}

fn extract_facts(scrubbed: &str) -> CssFacts {
    let mut facts = CssFacts::default();
    let mut header = String::new();
    let mut header_start_line = 1;
    let mut block = String::new();
    let mut line_no = 1;
    // selector text and start line of the currently open rule block
    let mut pending: Option<(String, usize)> = None;
    let mut media_stack: Vec<(String, usize)> = Vec::new();

    for c in scrubbed.chars() {
        match c {
            '{' if pending.is_none() => {
                let selector_text = header.trim().to_string();
                if selector_text.starts_with("@media") {
                    media_stack.push((selector_text, header_start_line));
                } else {
                    pending = Some((selector_text, header_start_line));
                    block.clear();
                }
                header.clear();
                header_start_line = line_no;
            }
            '}' => {
                if let Some((selector, start)) = pending.take() {
                    push_rule(&mut facts, &selector, &block, start, line_no);
                } else if let Some((condition, start)) = media_stack.pop() {
                    facts.media_queries.push(MediaQuery {
                        condition: condition.trim_start_matches("@media").trim().to_string(),
                        span: Span::new(start, line_no),
                    });
                }
                header.clear();
                header_start_line = line_no;
            }
            '\n' => {
                line_no += 1;
                if pending.is_some() {
                    block.push('\n');
                } else {
                    header.push(' ');
                    if header.trim().is_empty() {
                        header_start_line = line_no;
                    }
                }
            }
            _ => {
                if pending.is_some() {
                    block.push(c);
                } else {
                    header.push(c);
                }
            }
        }
    }

    facts
}

fn push_rule(facts: &mut CssFacts, selector_text: &str, block: &str, start: usize, end: usize) {
    if selector_text.starts_with('@') {
        // @keyframes, @font-face and friends are not duplicate candidates
        return;
    }
    let selectors: Vec<String> = selector_text
        .split(',')
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .collect();
    if selectors.is_empty() {
        return;
    }

    facts.rules.push(CssRule {
        selectors,
        normalized_declarations: normalize_declarations(block),
        span: Span::new(start, end),
    });
}

/// Collapse whitespace and sort declarations so property order never
/// splits a duplicate group.
pub fn normalize_declarations(block: &str) -> String {
    let mut declarations: Vec<String> = block
        .split(';')
        .map(|d| {
            d.split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        })
        .filter(|d| !d.is_empty())
        .collect();
    declarations.sort();
    declarations.join("; ")
}

/// Group rules with identical normalized declaration blocks across the
/// batch.
pub fn find_duplicate_rules(
    analyses: &[FileAnalysis],
    thresholds: &DuplicateThresholds,
) -> Vec<DuplicateMatch> {
    let mut by_block: HashMap<String, Vec<(&FileAnalysis, &CssRule)>> = HashMap::new();

    for analysis in analyses {
        let Some(facts) = analysis.css() else {
            continue;
        };
        for rule in &facts.rules {
            // single-declaration rules duplicate by coincidence
            if rule.normalized_declarations.split(';').count() < 2 {
                continue;
            }
            by_block
                .entry(rule.normalized_declarations.clone())
                .or_default()
                .push((analysis, rule));
        }
    }

    let mut matches: Vec<DuplicateMatch> = by_block
        .into_iter()
        .filter(|(_, occurrences)| occurrences.len() >= thresholds.min_occurrences)
        .map(|(block, occurrences)| {
            let declaration_count = block.split(';').count();
            DuplicateMatch {
                duplicate_type: DuplicateType::CssRule,
                signature: signature_of(&block),
                kind: DuplicateKind::Exact,
                occurrences: occurrences
                    .iter()
                    .map(|(analysis, rule)| DuplicateOccurrence {
                        file: analysis.path.clone(),
                        span: rule.span,
                        fragment: format!("{} {{ {} }}", rule.selectors.join(", "), block),
                    })
                    .collect(),
                similarity: 1.0,
                complexity_score: (declaration_count as f64 / 12.0).min(1.0),
            }
        })
        .collect();

    matches.sort_by(|a, b| a.signature.cmp(&b.signature));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(content: &str, name: &str) -> FileAnalysis {
        CssAnalyzer::new().parse(content, PathBuf::from(name))
    }

    #[test]
    fn unbalanced_brace_flags_parse_error() {
        let analysis = parse(".a { color: red;", "broken.css");
        assert!(analysis.has_errors());
        assert!(analysis.css().unwrap().rules.is_empty());
    }

    #[test]
    fn extracts_rules_and_media_queries() {
        let src = indoc! {"
            .card, .panel {
                color: #333;
                padding: 4px;
            }

            @media (max-width: 600px) {
                .card {
                    padding: 2px;
                }
            }
        "};
        let analysis = parse(src, "site.css");
        assert!(!analysis.has_errors());
        let facts = analysis.css().unwrap();
        assert_eq!(facts.rules.len(), 2);
        assert_eq!(facts.rules[0].selectors, vec![".card", ".panel"]);
        assert_eq!(facts.media_queries.len(), 1);
        assert!(facts.media_queries[0].condition.contains("max-width"));
    }

    #[test]
    fn declaration_order_does_not_split_groups() {
        let a = parse(".a { color: red; margin: 0; }", "a.css");
        let b = parse(".b { margin: 0; color: red; }", "b.css");
        let matches = find_duplicate_rules(&[a, b], &DuplicateThresholds::default());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].occurrences.len(), 2);
        assert_eq!(matches[0].similarity, 1.0);
    }
}
