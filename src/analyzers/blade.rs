//! Structural analyzer for Blade templates: markup mixed with embedded
//! expressions and control directives.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::analyzers::source::scrub_blade;
use crate::analyzers::Analyzer;
use crate::config::DuplicateThresholds;
use crate::core::facts::{AnalysisFacts, BladeFacts, BladeRef, BladeSection, Span, TemplateFragment};
use crate::core::{
    ComponentExtractionSuggestion, DuplicateKind, DuplicateMatch, DuplicateOccurrence,
    DuplicateType, FileAnalysis, Language,
};
use crate::debt::duplication::{fragment_complexity, jaccard, signature_of, structure_tokens};

static EXTENDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"@extends\s*\(\s*['"]([\w.\-]+)['"]"#).unwrap());
static INCLUDE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"@include(?:If)?\s*\(\s*['"]([\w.\-]+)['"]"#).unwrap());
static YIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"@yield\s*\(\s*['"]([\w.\-]+)['"]"#).unwrap());
static SECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"@section\s*\(\s*['"]([\w.\-]+)['"]\s*(,)?"#).unwrap());
static COMPONENT_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<x-([\w.\-]+)").unwrap());
static COMPONENT_DIRECTIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"@component\s*\(\s*['"]([\w.\-]+)['"]"#).unwrap());
static VARIABLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{[^}]*?\$(\w+)").unwrap());
static BLOCK_OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*<(div|section|form|table|ul|ol|article|header|footer|nav|aside)\b").unwrap()
});
static CLASS_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"class\s*=\s*["']([^"']+)["']"#).unwrap());
static EXPRESSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{.*?\}\}|\{!!.*?!!\}").unwrap());
static ATTR_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\b(href|src|action|id|name|value|placeholder|alt|title)\s*=\s*["'][^"']*["']"#).unwrap());

/// Control directives that must pair with a closing directive
const DIRECTIVE_PAIRS: &[(&str, &[&str])] = &[
    ("@if", &["@endif"]),
    ("@foreach", &["@endforeach"]),
    ("@forelse", &["@endforelse"]),
    ("@while", &["@endwhile"]),
    ("@for", &["@endfor"]),
    ("@switch", &["@endswitch"]),
];

pub struct BladeAnalyzer;

impl BladeAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BladeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for BladeAnalyzer {
    fn parse(&self, content: &str, path: PathBuf) -> FileAnalysis {
        let scrubbed = scrub_blade(content);

        if let Some(message) = unbalanced_directive(&scrubbed) {
            return FileAnalysis::with_error(path, Language::Blade, message);
        }

        let facts = extract_facts(content, &scrubbed);
        FileAnalysis::new(path, Language::Blade, AnalysisFacts::Blade(facts))
    }

    fn language(&self) -> Language {
        Language::Blade
    }
}

fn unbalanced_directive(scrubbed: &str) -> Option<String> {
    for (open, closers) in DIRECTIVE_PAIRS {
        let open_re = Regex::new(&format!(r"{open}\b")).unwrap();
        let opens = open_re.find_iter(scrubbed).count();
        let closes: usize = closers
            .iter()
            .map(|closer| {
                Regex::new(&format!(r"{closer}\b"))
                    .unwrap()
                    .find_iter(scrubbed)
                    .count()
            })
            .sum();
        // @endif also terminates @elseif branches of the same block
        if opens != closes {
            return Some(format!(
                "unbalanced {open} directive: {opens} opened, {closes} closed"
            ));
        }
    }
    None
}

fn extract_facts(raw: &str, scrubbed: &str) -> BladeFacts {
    let mut facts = BladeFacts::default();
    let scrubbed_lines: Vec<&str> = scrubbed.lines().collect();

    for (idx, line) in scrubbed_lines.iter().enumerate() {
        let line_no = idx + 1;

        if facts.extends.is_none() {
            if let Some(caps) = EXTENDS_RE.captures(line) {
                facts.extends = Some(caps[1].to_string());
            }
        }
        for caps in INCLUDE_RE.captures_iter(line) {
            facts.includes.push(BladeRef {
                name: caps[1].to_string(),
                line: line_no,
            });
        }
        for caps in YIELD_RE.captures_iter(line) {
            facts.yields.push(BladeRef {
                name: caps[1].to_string(),
                line: line_no,
            });
        }
        for caps in COMPONENT_TAG_RE.captures_iter(line) {
            facts.components.push(BladeRef {
                name: caps[1].to_string(),
                line: line_no,
            });
        }
        for caps in COMPONENT_DIRECTIVE_RE.captures_iter(line) {
            facts.components.push(BladeRef {
                name: caps[1].to_string(),
                line: line_no,
            });
        }
        for caps in VARIABLE_RE.captures_iter(line) {
            let name = caps[1].to_string();
            if !facts.variables.contains(&name) {
                facts.variables.push(name);
            }
        }
        if let Some(caps) = SECTION_RE.captures(line) {
            let end = if caps.get(2).is_some() {
                idx // inline @section('title', 'Home')
            } else {
                find_section_end(&scrubbed_lines, idx)
            };
            facts.sections.push(BladeSection {
                name: caps[1].to_string(),
                span: Span::new(line_no, end + 1),
            });
        }
    }

    facts.fragments = extract_fragments(raw, &scrubbed_lines);
    facts
}

fn find_section_end(lines: &[&str], start: usize) -> usize {
    for (idx, line) in lines.iter().enumerate().skip(start + 1) {
        if line.contains("@endsection") || line.contains("@stop") || line.contains("@show") {
            return idx;
        }
    }
    lines.len().saturating_sub(1)
}

/// Extract block-element markup fragments anchored on a class attribute;
/// those are the component-shaped units duplicate detection groups.
fn extract_fragments(raw: &str, scrubbed_lines: &[&str]) -> Vec<TemplateFragment> {
    let raw_lines: Vec<&str> = raw.lines().collect();
    let mut fragments = Vec::new();

    for (idx, line) in scrubbed_lines.iter().enumerate() {
        let Some(caps) = BLOCK_OPEN_RE.captures(line) else {
            continue;
        };
        let tag = caps[1].to_string();
        let Some(end) = find_tag_end(scrubbed_lines, idx, &tag) else {
            continue;
        };
        if end - idx < 1 {
            continue;
        }

        let fragment_raw = raw_lines
            .get(idx..=end)
            .map(|slice| slice.join("\n"))
            .unwrap_or_default();
        if fragment_raw.is_empty() {
            continue;
        }

        let class_tokens = CLASS_ATTR_RE
            .captures_iter(&fragment_raw)
            .flat_map(|c| {
                c[1].split_whitespace()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
            })
            .collect();

        fragments.push(TemplateFragment {
            normalized: normalize_template(&fragment_raw),
            raw: fragment_raw,
            span: Span::new(idx + 1, end + 1),
            class_tokens,
        });
    }

    fragments
}

fn find_tag_end(lines: &[&str], start: usize, tag: &str) -> Option<usize> {
    let open_re = Regex::new(&format!(r"<{tag}\b")).unwrap();
    let close_re = Regex::new(&format!(r"</{tag}\s*>")).unwrap();
    let mut depth: i64 = 0;

    for (idx, line) in lines.iter().enumerate().skip(start) {
        depth += open_re.find_iter(line).count() as i64;
        depth -= close_re.find_iter(line).count() as i64;
        if depth <= 0 {
            return Some(idx);
        }
    }
    None
}

/// Collapse whitespace and replace embedded expressions and literal
/// attribute values with placeholders, keeping tag structure and classes.
pub fn normalize_template(fragment: &str) -> String {
    let without_expressions = EXPRESSION_RE.replace_all(fragment, "{{_}}");
    let without_values = ATTR_VALUE_RE.replace_all(&without_expressions, "$1=\"_\"");
    without_values.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Group template fragments across the batch. Identical normalized
/// structures form exact groups; non-identical structures whose
/// structural-overlap ratio lands strictly between the similar and exact
/// thresholds are reported as similar pairs.
pub fn find_duplicate_templates(
    analyses: &[FileAnalysis],
    thresholds: &DuplicateThresholds,
) -> Vec<DuplicateMatch> {
    let mut by_signature: HashMap<String, Vec<(&FileAnalysis, &TemplateFragment)>> = HashMap::new();

    for analysis in analyses {
        let Some(facts) = analysis.blade() else {
            continue;
        };
        for fragment in &facts.fragments {
            if fragment.span.line_count() < thresholds.min_fragment_lines {
                continue;
            }
            by_signature
                .entry(fragment.normalized.clone())
                .or_default()
                .push((analysis, fragment));
        }
    }

    let mut matches = Vec::new();

    // Exact groups
    for (normalized, occurrences) in &by_signature {
        if occurrences.len() < thresholds.min_occurrences {
            continue;
        }
        matches.push(DuplicateMatch {
            duplicate_type: DuplicateType::BladeTemplate,
            signature: signature_of(normalized),
            kind: DuplicateKind::Exact,
            occurrences: occurrences
                .iter()
                .map(|(analysis, fragment)| DuplicateOccurrence {
                    file: analysis.path.clone(),
                    span: fragment.span,
                    fragment: fragment.raw.clone(),
                })
                .collect(),
            similarity: 1.0,
            complexity_score: occurrences
                .first()
                .map(|(_, f)| fragment_complexity(&f.raw))
                .unwrap_or(0.0),
        });
    }

    // Similar pairs between distinct normalized structures. The pair is
    // put in canonical order before the signature and occurrence list are
    // built, since map iteration order varies between calls.
    let signatures: Vec<(&String, &Vec<(&FileAnalysis, &TemplateFragment)>)> =
        by_signature.iter().collect();
    for (i, (left_norm, left_occ)) in signatures.iter().enumerate() {
        for (right_norm, right_occ) in signatures.iter().skip(i + 1) {
            let score = jaccard(
                &structure_tokens(left_norm),
                &structure_tokens(right_norm),
            );
            if score > thresholds.similar && score < thresholds.exact {
                let (first_norm, first_occ, second_norm, second_occ) =
                    if left_norm <= right_norm {
                        (left_norm, left_occ, right_norm, right_occ)
                    } else {
                        (right_norm, right_occ, left_norm, left_occ)
                    };

                let mut occurrences: Vec<DuplicateOccurrence> = Vec::new();
                for (analysis, fragment) in first_occ.iter().chain(second_occ.iter()) {
                    occurrences.push(DuplicateOccurrence {
                        file: analysis.path.clone(),
                        span: fragment.span,
                        fragment: fragment.raw.clone(),
                    });
                }
                occurrences.sort_by(|a, b| {
                    a.file
                        .cmp(&b.file)
                        .then(a.span.start.cmp(&b.span.start))
                        .then(a.span.end.cmp(&b.span.end))
                });

                let complexity = occurrences
                    .first()
                    .map(|o| fragment_complexity(&o.fragment))
                    .unwrap_or(0.0);
                matches.push(DuplicateMatch {
                    duplicate_type: DuplicateType::BladeTemplate,
                    signature: signature_of(&format!("{first_norm}|{second_norm}")),
                    kind: DuplicateKind::Similar,
                    occurrences,
                    similarity: score,
                    complexity_score: complexity,
                });
            }
        }
    }

    // Stable output so repeat runs on an unchanged tree are identical
    matches.sort_by(|a, b| a.signature.cmp(&b.signature));
    matches
}

/// Filter duplicate groups to those worth extracting into a component and
/// derive a human-meaningful name from recurring class tokens.
pub fn extract_component_candidates(
    analyses: &[FileAnalysis],
    thresholds: &DuplicateThresholds,
) -> Vec<ComponentExtractionSuggestion> {
    let duplicates = find_duplicate_templates(analyses, thresholds);
    let mut suggestions = Vec::new();

    for group in duplicates {
        if group.kind != DuplicateKind::Exact {
            continue;
        }
        if group.occurrences.len() < thresholds.extraction_min_occurrences {
            continue;
        }
        let lines = group.occurrences[0].span.line_count();
        if lines < thresholds.extraction_min_lines {
            continue;
        }

        let name = suggest_component_name(&group, analyses);
        let artifact_path =
            PathBuf::from(format!("resources/views/components/{name}.blade.php"));
        let saved = group.potential_savings() * lines;

        suggestions.push(ComponentExtractionSuggestion {
            name,
            artifact_path,
            fragment: group.occurrences[0].fragment.clone(),
            locations: group.occurrences,
            estimated_saved_lines: saved,
        });
    }

    suggestions.sort_by(|a, b| b.estimated_saved_lines.cmp(&a.estimated_saved_lines));
    suggestions
}

/// The root element's leading class token recurs across every occurrence
/// of a duplicated block and names what the block is.
fn suggest_component_name(group: &DuplicateMatch, analyses: &[FileAnalysis]) -> String {
    let mut token_counts: HashMap<String, usize> = HashMap::new();

    for occurrence in &group.occurrences {
        let fragment = analyses
            .iter()
            .filter(|a| a.path == occurrence.file)
            .filter_map(|a| a.blade())
            .flat_map(|facts| facts.fragments.iter())
            .find(|f| f.span == occurrence.span);
        if let Some(token) = fragment.and_then(|f| f.class_tokens.first()) {
            *token_counts.entry(token.clone()).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = token_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    ranked
        .into_iter()
        .map(|(token, _)| token)
        .find(|token| token.len() > 2 && !token.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or_else(|| "shared-block".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(content: &str, name: &str) -> FileAnalysis {
        BladeAnalyzer::new().parse(content, PathBuf::from(name))
    }

    const CARD: &str = indoc! {r#"
        <div class="product-card shadow">
            <h3 class="product-title">{{ $product->name }}</h3>
            <p class="product-price">{{ $product->price }}</p>
            <a href="/products" class="btn">View</a>
        </div>
    "#};

    #[test]
    fn unbalanced_if_flags_parse_error() {
        let analysis = parse("@if($show)\n<div class=\"a\">x</div>\n", "broken.blade.php");
        assert!(analysis.has_errors());
        assert!(analysis.blade().unwrap().fragments.is_empty());
    }

    #[test]
    fn extracts_directives_and_variables() {
        let src = indoc! {r#"
            @extends('layouts.app')

            @section('content')
                @include('partials.nav')
                <div class="wrapper">
                    {{ $title }}
                </div>
            @endsection
        "#};
        let analysis = parse(src, "page.blade.php");
        assert!(!analysis.has_errors());
        let facts = analysis.blade().unwrap();
        assert_eq!(facts.extends.as_deref(), Some("layouts.app"));
        assert_eq!(facts.includes.len(), 1);
        assert_eq!(facts.sections.len(), 1);
        assert_eq!(facts.variables, vec!["title".to_string()]);
    }

    #[test]
    fn identical_fragments_group_as_exact_duplicates() {
        let a = parse(CARD, "a.blade.php");
        let b = parse(CARD, "b.blade.php");
        let thresholds = DuplicateThresholds::default();

        let matches = find_duplicate_templates(&[a, b], &thresholds);
        let exact: Vec<&DuplicateMatch> = matches
            .iter()
            .filter(|m| m.kind == DuplicateKind::Exact)
            .collect();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].occurrences.len(), 2);
        assert!(exact[0].similarity >= thresholds.exact);
        assert_eq!(exact[0].potential_savings(), 1);
    }

    #[test]
    fn near_identical_fragments_report_as_similar() {
        let variant = CARD.replace("<p class=\"product-price\">", "<p class=\"product-cost\">");
        let a = parse(CARD, "a.blade.php");
        let b = parse(&variant, "b.blade.php");
        let thresholds = DuplicateThresholds::default();

        let matches = find_duplicate_templates(&[a, b], &thresholds);
        let similar: Vec<&DuplicateMatch> = matches
            .iter()
            .filter(|m| m.kind == DuplicateKind::Similar)
            .collect();
        assert_eq!(similar.len(), 1);
        assert!(similar[0].similarity > thresholds.similar);
        assert!(similar[0].similarity < thresholds.exact);
    }

    #[test]
    fn similar_pair_output_is_stable_across_runs() {
        let variant = CARD.replace("<p class=\"product-price\">", "<p class=\"product-cost\">");
        let analyses = vec![parse(CARD, "a.blade.php"), parse(&variant, "b.blade.php")];
        let thresholds = DuplicateThresholds::default();

        let fingerprint = |matches: &[DuplicateMatch]| {
            matches
                .iter()
                .map(|m| {
                    (
                        m.signature.clone(),
                        m.occurrences
                            .iter()
                            .map(|o| (o.file.clone(), o.span))
                            .collect::<Vec<_>>(),
                    )
                })
                .collect::<Vec<_>>()
        };

        let first = fingerprint(&find_duplicate_templates(&analyses, &thresholds));
        for _ in 0..8 {
            let next = fingerprint(&find_duplicate_templates(&analyses, &thresholds));
            assert_eq!(first, next);
        }
    }

    #[test]
    fn component_name_derives_from_recurring_class_tokens() {
        let analyses: Vec<FileAnalysis> = ["a", "b", "c"]
            .iter()
            .map(|n| parse(CARD, &format!("{n}.blade.php")))
            .collect();
        let thresholds = DuplicateThresholds::default();

        let suggestions = extract_component_candidates(&analyses, &thresholds);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].name, "product-card");
        assert_eq!(suggestions[0].locations.len(), 3);
        assert!(suggestions[0]
            .artifact_path
            .to_string_lossy()
            .contains("components/product-card"));
    }
}
