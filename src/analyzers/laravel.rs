//! Framework-convention analyzer: routes, migrations and model
//! relationships extracted from PHP files in conventional locations.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::analyzers::source::{balanced, scrub_c_like};
use crate::analyzers::Analyzer;
use crate::core::facts::{
    AnalysisFacts, LaravelFacts, MigrationKind, MigrationOp, ModelRelationship, RouteDecl,
};
use crate::core::{FileAnalysis, Language};

static ROUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"Route::(get|post|put|patch|delete|options|any|resource|view)\s*\(\s*['"]([^'"]+)['"]\s*,\s*([^;]+?)\)\s*(?:->|;)"#,
    )
    .unwrap()
});
static ROUTE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"->name\s*\(\s*['"]([\w.\-]+)['"]"#).unwrap());
static ROUTE_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\broute\s*\(\s*['"]([\w.\-]+)['"]"#).unwrap());
static SCHEMA_CREATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"Schema::create\s*\(\s*['"](\w+)['"]"#).unwrap());
static SCHEMA_TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"Schema::table\s*\(\s*['"](\w+)['"]"#).unwrap());
static SCHEMA_DROP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"Schema::drop(?:IfExists)?\s*\(\s*['"](\w+)['"]"#).unwrap());
static CLASS_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"class\s+([A-Za-z_]\w*)").unwrap());
static RELATIONSHIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)function\s+(\w+)\s*\(\s*\)[^{]*\{\s*return\s+\$this->(hasMany|hasOne|belongsTo|belongsToMany|morphMany|morphOne|morphTo)\s*\(\s*([\w\\]+)::class",
    )
    .unwrap()
});

pub struct LaravelAnalyzer;

impl LaravelAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Conventional locations the framework analyzer applies to
    pub fn applies_to(path: &Path) -> bool {
        let path_str = path.to_string_lossy().replace('\\', "/");
        path_str.contains("routes/")
            || path_str.contains("database/migrations/")
            || path_str.contains("app/Models/")
    }
}

impl Default for LaravelAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for LaravelAnalyzer {
    fn parse(&self, content: &str, path: PathBuf) -> FileAnalysis {
        let scrubbed = scrub_with_literals(content);
        if !balanced(&scrubbed.structural, '{', '}') {
            let mut analysis = FileAnalysis::new(
                path,
                Language::Php,
                AnalysisFacts::Laravel(LaravelFacts::default()),
            );
            analysis.errors.push("unbalanced braces".to_string());
            return analysis;
        }

        let facts = extract_facts(&scrubbed.with_strings);
        FileAnalysis::new(path, Language::Php, AnalysisFacts::Laravel(facts))
    }

    fn language(&self) -> Language {
        Language::Php
    }
}

struct Scrubbed {
    /// Comments and strings blanked, for balance checking
    structural: String,
    /// Comments blanked but string literals kept, since route URIs and
    /// table names live inside them
    with_strings: String,
}

fn scrub_with_literals(content: &str) -> Scrubbed {
    Scrubbed {
        structural: scrub_c_like(content),
        with_strings: strip_comments_only(content),
    }
}

fn strip_comments_only(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_line_comment = false;
    let mut in_block_comment = false;
    let mut in_string: Option<char> = None;

    while let Some(c) = chars.next() {
        if c == '\n' {
            in_line_comment = false;
            out.push('\n');
            continue;
        }
        if in_line_comment {
            out.push(' ');
            continue;
        }
        if in_block_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                out.push_str("  ");
                in_block_comment = false;
            } else {
                out.push(' ');
            }
            continue;
        }
        if let Some(quote) = in_string {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '/' if chars.peek() == Some(&'/') => {
                chars.next();
                out.push_str("  ");
                in_line_comment = true;
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str("  ");
                in_block_comment = true;
            }
            '#' if chars.peek() != Some(&'[') => {
                out.push(' ');
                in_line_comment = true;
            }
            '\'' | '"' => {
                out.push(c);
                in_string = Some(c);
            }
            _ => out.push(c),
        }
    }

    out
}

fn extract_facts(content: &str) -> LaravelFacts {
    let mut facts = LaravelFacts::default();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;

        if let Some(caps) = ROUTE_RE.captures(line) {
            facts.routes.push(RouteDecl {
                verb: caps[1].to_string(),
                uri: caps[2].to_string(),
                handler: caps[3].trim().to_string(),
                name: ROUTE_NAME_RE.captures(line).map(|c| c[1].to_string()),
                line: line_no,
            });
        }
        for caps in ROUTE_REF_RE.captures_iter(line) {
            facts.route_refs.push(caps[1].to_string());
        }
        if let Some(caps) = SCHEMA_CREATE_RE.captures(line) {
            facts.migrations.push(MigrationOp {
                table: caps[1].to_string(),
                kind: MigrationKind::Create,
                line: line_no,
            });
        }
        if let Some(caps) = SCHEMA_TABLE_RE.captures(line) {
            facts.migrations.push(MigrationOp {
                table: caps[1].to_string(),
                kind: MigrationKind::Modify,
                line: line_no,
            });
        }
        if let Some(caps) = SCHEMA_DROP_RE.captures(line) {
            facts.migrations.push(MigrationOp {
                table: caps[1].to_string(),
                kind: MigrationKind::Drop,
                line: line_no,
            });
        }
    }

    let model = CLASS_NAME_RE
        .captures(content)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default();
    for caps in RELATIONSHIP_RE.captures_iter(content) {
        let offset = caps.get(0).map(|m| m.start()).unwrap_or(0);
        let line = content[..offset].matches('\n').count() + 1;
        facts.relationships.push(ModelRelationship {
            model: model.clone(),
            kind: caps[2].to_string(),
            target: caps[3].to_string(),
            line,
        });
    }

    facts
}

/// Named routes whose name is never passed to a `route('...')` helper
/// anywhere in the scanned tree. Unnamed routes are never reported since
/// URI usage is not statically resolvable.
pub fn find_unused_routes(
    analyses: &[FileAnalysis],
    contents: &[(PathBuf, String)],
) -> Vec<RouteDecl> {
    let mut referenced: HashSet<String> = HashSet::new();

    for analysis in analyses {
        if let Some(facts) = analysis.laravel() {
            referenced.extend(facts.route_refs.iter().cloned());
        }
    }
    for (_, content) in contents {
        for caps in ROUTE_REF_RE.captures_iter(content) {
            referenced.insert(caps[1].to_string());
        }
    }

    analyses
        .iter()
        .filter_map(|analysis| analysis.laravel())
        .flat_map(|facts| facts.routes.iter())
        .filter(|route| {
            route
                .name
                .as_ref()
                .is_some_and(|name| !referenced.contains(name))
        })
        .cloned()
        .collect()
}
