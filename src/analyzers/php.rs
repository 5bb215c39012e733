//! Structural analyzer for general-purpose PHP sources.
//!
//! Extraction is regex-structural over scrubbed source (comments and string
//! literals blanked): enough declarations, references and control
//! boundaries for usage and duplication analysis, not a conforming AST.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

use crate::analyzers::source::{balanced, find_block_end, scrub_c_like};
use crate::analyzers::Analyzer;
use crate::core::facts::{
    AnalysisFacts, CallReceiver, CallRef, ClassDecl, ClassKind, FunctionDecl, MethodDecl, NameRef,
    NameRefKind, PhpFacts, Span, UseImport, VariableKind, VariableRef, Visibility,
};
use crate::core::{FileAnalysis, Language, UnusedImport, UnusedMethod, UnusedVariable};

static NAMESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*namespace\s+([A-Za-z_][\w\\]*)\s*;").unwrap());
static USE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*use\s+([A-Za-z_][\w\\]*)(?:\s+as\s+([A-Za-z_]\w*))?\s*;").unwrap()
});
static CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:final\s+)?(abstract\s+)?(class|interface|trait)\s+([A-Za-z_]\w*)(?:\s+extends\s+([A-Za-z_][\w\\]*))?(?:\s+implements\s+([\w\\\s,]+?))?\s*(?:\{|$)",
    )
    .unwrap()
});
static FUNCTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*((?:(?:public|protected|private|static|abstract|final)\s+)*)function\s+&?([A-Za-z_]\w*)\s*\(([^)]*)\)\s*(?::\s*\??([\w\\|]+))?",
    )
    .unwrap()
});
static THIS_CALL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$this\s*->\s*(\w+)\s*\(").unwrap());
static INSTANCE_CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\w+)\s*->\s*(\w+)\s*\(").unwrap());
static SELF_CALL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bself\s*::\s*(\w+)\s*\(").unwrap());
static STATIC_CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bstatic\s*::\s*(\w+)\s*\(").unwrap());
static PARENT_CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bparent\s*::\s*(\w+)\s*\(").unwrap());
static CLASS_CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z][\w\\]*)\s*::\s*(\w+)\s*\(").unwrap());
static FUNC_CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\w$>:\\])([a-z_]\w*)\s*\(").unwrap());
static NEW_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bnew\s+([A-Za-z_][\w\\]*)").unwrap());
static INSTANCEOF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\binstanceof\s+([A-Za-z_][\w\\]*)").unwrap());
static CATCH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bcatch\s*\(\s*([\w\\|\s]+?)(?:\s+\$\w+)?\s*\)").unwrap());
static STATIC_ACCESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Z][\w\\]*)\s*::").unwrap());
static ATTRIBUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\[\s*([A-Za-z_][\w\\]*)").unwrap());
static PLAIN_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Z][A-Za-z0-9_]*)\b").unwrap());
static ASSIGN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$([A-Za-z_]\w*)\s*(\?\?=|===|==|=>|[+\-*/.%]=|=)").unwrap()
});
static VAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([A-Za-z_]\w*)").unwrap());
static FOREACH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bforeach\s*\([^)]*\bas\s+(?:\$(\w+)\s*=>\s*)?&?\s*\$(\w+)").unwrap()
});
static FOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bfor\s*\(\s*\$(\w+)").unwrap());
static CATCH_VAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bcatch\s*\([^)]*\$(\w+)\s*\)").unwrap());
static PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:([\w\\?|]+)\s+)?&?(\.{3})?\$([A-Za-z_]\w*)").unwrap());

/// Control keywords that look like function calls to the call pattern
const CALL_KEYWORDS: &[&str] = &[
    "if", "elseif", "for", "foreach", "while", "switch", "catch", "function", "fn", "match",
    "return", "echo", "print", "isset", "unset", "empty", "list", "array", "exit", "die",
    "include", "include_once", "require", "require_once", "declare", "clone", "yield", "use",
];

const SUPERGLOBALS: &[&str] = &[
    "this", "GLOBALS", "_GET", "_POST", "_SERVER", "_SESSION", "_COOKIE", "_FILES", "_ENV",
    "_REQUEST",
];

pub struct PhpAnalyzer;

impl PhpAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PhpAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for PhpAnalyzer {
    fn parse(&self, content: &str, path: PathBuf) -> FileAnalysis {
        let scrubbed = scrub_c_like(content);
        if !balanced(&scrubbed, '{', '}') || !balanced(&scrubbed, '(', ')') {
            return FileAnalysis::with_error(
                path,
                Language::Php,
                "unbalanced braces or parentheses",
            );
        }

        let facts = extract_facts(&scrubbed);
        FileAnalysis::new(path, Language::Php, AnalysisFacts::Php(facts))
    }

    fn language(&self) -> Language {
        Language::Php
    }
}

fn extract_facts(scrubbed: &str) -> PhpFacts {
    let lines: Vec<&str> = scrubbed.lines().collect();
    let depths = line_depths(&lines);

    let namespace = find_namespace(&lines);
    let mut facts = PhpFacts {
        namespace: namespace.clone(),
        ..Default::default()
    };

    extract_imports(&lines, &depths, &mut facts);
    extract_classes(&lines, &depths, &namespace, &mut facts);
    extract_free_functions(&lines, &depths, &mut facts);
    extract_references(&lines, &depths, &mut facts);
    extract_variables(&lines, &mut facts);

    facts
}

/// Brace depth at the start of each line
fn line_depths(lines: &[&str]) -> Vec<i64> {
    let mut depths = Vec::with_capacity(lines.len());
    let mut depth: i64 = 0;
    for line in lines {
        depths.push(depth);
        for c in line.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }
    }
    depths
}

fn find_namespace(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .find_map(|line| NAMESPACE_RE.captures(line))
        .map(|caps| caps[1].to_string())
}

fn extract_imports(lines: &[&str], depths: &[i64], facts: &mut PhpFacts) {
    for (idx, line) in lines.iter().enumerate() {
        if depths[idx] != 0 {
            continue;
        }
        if let Some(caps) = USE_RE.captures(line) {
            facts.imports.push(UseImport {
                path: caps[1].to_string(),
                alias: caps.get(2).map(|m| m.as_str().to_string()),
                line: idx + 1,
            });
        }
    }
}

fn extract_classes(
    lines: &[&str],
    depths: &[i64],
    namespace: &Option<String>,
    facts: &mut PhpFacts,
) {
    for (idx, line) in lines.iter().enumerate() {
        if depths[idx] != 0 {
            continue;
        }
        let Some(caps) = CLASS_RE.captures(line) else {
            continue;
        };

        let name = caps[3].to_string();
        let kind = match &caps[2] {
            "interface" => ClassKind::Interface,
            "trait" => ClassKind::Trait,
            _ => ClassKind::Class,
        };
        let end = find_block_end(lines, idx).unwrap_or(lines.len().saturating_sub(1));
        let span = Span::new(idx + 1, end + 1);

        let fqcn = match namespace {
            Some(ns) => format!("{ns}\\{name}"),
            None => name.clone(),
        };

        let methods = extract_methods(lines, idx + 1, end, kind);

        facts.classes.push(ClassDecl {
            name,
            fqcn,
            kind,
            is_abstract: caps.get(1).is_some(),
            extends: caps.get(4).map(|m| m.as_str().to_string()),
            implements: caps
                .get(5)
                .map(|m| {
                    m.as_str()
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            span,
            methods,
        });
    }
}

fn extract_methods(lines: &[&str], start: usize, end: usize, kind: ClassKind) -> Vec<MethodDecl> {
    let mut methods = Vec::new();

    for idx in start..=end.min(lines.len().saturating_sub(1)) {
        let Some(caps) = FUNCTION_RE.captures(lines[idx]) else {
            continue;
        };
        let modifiers = caps[1].to_string();
        let is_abstract = modifiers.contains("abstract") || kind == ClassKind::Interface;

        let span = if is_abstract {
            Span::new(idx + 1, idx + 1)
        } else {
            let body_end = find_block_end(lines, idx).unwrap_or(idx);
            Span::new(idx + 1, body_end + 1)
        };

        methods.push(MethodDecl {
            name: caps[2].to_string(),
            visibility: parse_visibility(&modifiers),
            is_static: modifiers.contains("static"),
            is_abstract,
            params: parse_param_names(&caps[3]),
            return_type: caps.get(4).map(|m| m.as_str().to_string()),
            span,
        });
    }

    methods
}

fn parse_visibility(modifiers: &str) -> Visibility {
    if modifiers.contains("private") {
        Visibility::Private
    } else if modifiers.contains("protected") {
        Visibility::Protected
    } else {
        Visibility::Public
    }
}

fn parse_param_names(params: &str) -> Vec<String> {
    PARAM_RE
        .captures_iter(params)
        .map(|caps| caps[3].to_string())
        .collect()
}

fn extract_free_functions(lines: &[&str], depths: &[i64], facts: &mut PhpFacts) {
    for (idx, line) in lines.iter().enumerate() {
        if depths[idx] != 0 {
            continue;
        }
        let Some(caps) = FUNCTION_RE.captures(line) else {
            continue;
        };
        let end = find_block_end(lines, idx).unwrap_or(idx);
        facts.functions.push(FunctionDecl {
            name: caps[2].to_string(),
            params: parse_param_names(&caps[3]),
            span: Span::new(idx + 1, end + 1),
        });
    }
}

fn extract_references(lines: &[&str], depths: &[i64], facts: &mut PhpFacts) {
    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let is_import_line = depths[idx] == 0 && USE_RE.is_match(line);

        for caps in THIS_CALL_RE.captures_iter(line) {
            push_call(facts, CallReceiver::This, &caps[1], line_no);
        }
        for caps in INSTANCE_CALL_RE.captures_iter(line) {
            if &caps[1] != "this" {
                push_call(facts, CallReceiver::Instance, &caps[2], line_no);
            }
        }
        for caps in SELF_CALL_RE.captures_iter(line) {
            push_call(facts, CallReceiver::SelfType, &caps[1], line_no);
        }
        for caps in STATIC_CALL_RE.captures_iter(line) {
            push_call(facts, CallReceiver::LateStatic, &caps[1], line_no);
        }
        for caps in PARENT_CALL_RE.captures_iter(line) {
            push_call(facts, CallReceiver::Parent, &caps[1], line_no);
        }
        for caps in CLASS_CALL_RE.captures_iter(line) {
            push_call(
                facts,
                CallReceiver::Class(caps[1].to_string()),
                &caps[2],
                line_no,
            );
        }
        for caps in FUNC_CALL_RE.captures_iter(line) {
            let name = &caps[1];
            if !CALL_KEYWORDS.contains(&name) {
                push_call(facts, CallReceiver::Function, name, line_no);
            }
        }

        for caps in NEW_RE.captures_iter(line) {
            push_name(facts, &caps[1], line_no, NameRefKind::New);
        }
        for caps in INSTANCEOF_RE.captures_iter(line) {
            push_name(facts, &caps[1], line_no, NameRefKind::Instanceof);
        }
        for caps in CATCH_RE.captures_iter(line) {
            for ty in caps[1].split('|') {
                let ty = ty.trim();
                if !ty.is_empty() {
                    push_name(facts, ty, line_no, NameRefKind::Catch);
                }
            }
        }
        for caps in STATIC_ACCESS_RE.captures_iter(line) {
            push_name(facts, &caps[1], line_no, NameRefKind::StaticAccess);
        }
        for caps in ATTRIBUTE_RE.captures_iter(line) {
            push_name(facts, &caps[1], line_no, NameRefKind::Attribute);
        }
        if let Some(caps) = FUNCTION_RE.captures(line) {
            for param_caps in PARAM_RE.captures_iter(&caps[3]) {
                if let Some(hint) = param_caps.get(1) {
                    push_type_hints(facts, hint.as_str(), line_no);
                }
            }
            if let Some(ret) = caps.get(4) {
                push_type_hints(facts, ret.as_str(), line_no);
            }
        }

        // Remaining capitalized identifiers; skipped on import lines so an
        // import never counts as its own usage.
        if !is_import_line {
            for caps in PLAIN_NAME_RE.captures_iter(line) {
                push_name(facts, &caps[1], line_no, NameRefKind::Plain);
            }
        }
    }
}

fn push_type_hints(facts: &mut PhpFacts, hint: &str, line: usize) {
    for ty in hint.split('|') {
        let ty = ty.trim().trim_start_matches('?');
        if !ty.is_empty() && !is_builtin_type(ty) {
            push_name(facts, ty, line, NameRefKind::TypeHint);
        }
    }
}

fn is_builtin_type(ty: &str) -> bool {
    matches!(
        ty.to_ascii_lowercase().as_str(),
        "int" | "float" | "string" | "bool" | "array" | "object" | "mixed" | "void" | "null"
            | "callable" | "iterable" | "self" | "static" | "parent" | "never" | "false" | "true"
    )
}

fn push_call(facts: &mut PhpFacts, receiver: CallReceiver, method: &str, line: usize) {
    facts.calls.push(CallRef {
        receiver,
        method: method.to_string(),
        line,
    });
}

fn push_name(facts: &mut PhpFacts, name: &str, line: usize, kind: NameRefKind) {
    facts.name_refs.push(NameRef {
        name: name.to_string(),
        line,
        kind,
    });
}

fn extract_variables(lines: &[&str], facts: &mut PhpFacts) {
    let scopes = collect_scopes(facts);

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let scope = scopes
            .iter()
            .find(|(_, span)| span.contains(line_no))
            .map(|(name, _)| name.clone());

        let mut classified: Vec<(usize, VariableKind, String)> = Vec::new();

        for caps in ASSIGN_RE.captures_iter(line) {
            let op = &caps[2];
            if op == "==" || op == "===" || op == "=>" {
                continue;
            }
            let m = caps.get(1).unwrap();
            classified.push((m.start(), VariableKind::Assign, m.as_str().to_string()));
        }
        for caps in FOREACH_RE.captures_iter(line) {
            if let Some(key) = caps.get(1) {
                classified.push((key.start(), VariableKind::LoopBinding, key.as_str().into()));
            }
            let val = caps.get(2).unwrap();
            classified.push((val.start(), VariableKind::LoopBinding, val.as_str().into()));
        }
        for caps in FOR_RE.captures_iter(line) {
            let m = caps.get(1).unwrap();
            classified.push((m.start(), VariableKind::LoopBinding, m.as_str().into()));
        }
        for caps in CATCH_VAR_RE.captures_iter(line) {
            let m = caps.get(1).unwrap();
            classified.push((m.start(), VariableKind::CatchBinding, m.as_str().into()));
        }
        if let Some(caps) = FUNCTION_RE.captures(line) {
            for param_caps in PARAM_RE.captures_iter(&caps[3]) {
                let m = param_caps.get(3).unwrap();
                classified.push((m.start(), VariableKind::Param, m.as_str().into()));
            }
        }

        for m in VAR_RE.captures_iter(line) {
            let var = m.get(1).unwrap();
            let name = var.as_str();
            if SUPERGLOBALS.contains(&name) {
                continue;
            }
            let kind = classified
                .iter()
                .find(|(pos, _, n)| var.start().abs_diff(*pos) <= 1 && n == name)
                .map(|(_, kind, _)| *kind)
                .unwrap_or(VariableKind::Read);

            facts.variables.push(VariableRef {
                scope: scope.clone(),
                name: name.to_string(),
                line: line_no,
                kind,
            });
        }
    }
}

fn collect_scopes(facts: &PhpFacts) -> Vec<(String, Span)> {
    let mut scopes = Vec::new();
    for class in &facts.classes {
        for method in &class.methods {
            scopes.push((format!("{}::{}", class.name, method.name), method.span));
        }
    }
    for function in &facts.functions {
        scopes.push((function.name.clone(), function.span));
    }
    scopes
}

/// An import is unused iff its bound name never occurs outside the import
/// line itself, counting aliasing, static access, type hints, instanceof,
/// catch clauses and attributes.
pub fn find_unused_imports(analysis: &FileAnalysis) -> Vec<UnusedImport> {
    let Some(facts) = analysis.php() else {
        return Vec::new();
    };

    facts
        .imports
        .iter()
        .filter(|import| !import_is_used(facts, import))
        .map(|import| UnusedImport {
            file: analysis.path.clone(),
            name: import.bound_name().to_string(),
            path: import.path.clone(),
            line: import.line,
        })
        .collect()
}

fn import_is_used(facts: &PhpFacts, import: &UseImport) -> bool {
    let bound = import.bound_name();

    let named_ref = facts
        .name_refs
        .iter()
        .any(|r| r.line != import.line && last_segment(&r.name).eq_ignore_ascii_case(bound));

    let static_call = facts.calls.iter().any(|c| {
        matches!(&c.receiver, CallReceiver::Class(name)
            if last_segment(name).eq_ignore_ascii_case(bound))
    });

    let hierarchy_ref = facts.classes.iter().any(|class| {
        class
            .extends
            .as_deref()
            .is_some_and(|parent| last_segment(parent).eq_ignore_ascii_case(bound))
            || class
                .implements
                .iter()
                .any(|iface| last_segment(iface).eq_ignore_ascii_case(bound))
    });

    named_ref || static_call || hierarchy_ref
}

fn last_segment(name: &str) -> &str {
    name.rsplit('\\').next().unwrap_or(name)
}

/// Single-file unused-method detection. Public methods are part of the
/// class contract and never reported; batch-wide resolution across the
/// hierarchy lives in `analysis::hierarchy`.
pub fn find_unused_methods(analysis: &FileAnalysis) -> Vec<UnusedMethod> {
    let Some(facts) = analysis.php() else {
        return Vec::new();
    };

    let mut unused = Vec::new();

    for class in &facts.classes {
        if class.kind != ClassKind::Class {
            continue;
        }
        for method in &class.methods {
            if method.visibility.is_public() || method.name.starts_with("__") {
                continue;
            }
            if !method_called_locally(facts, class, &method.name) {
                unused.push(UnusedMethod {
                    file: analysis.path.clone(),
                    class: class.name.clone(),
                    method: method.name.clone(),
                    span: method.span,
                });
            }
        }
    }

    unused
}

fn method_called_locally(facts: &PhpFacts, class: &ClassDecl, method: &str) -> bool {
    let direct = facts.calls.iter().any(|call| {
        if !call.method.eq_ignore_ascii_case(method) {
            return false;
        }
        match &call.receiver {
            CallReceiver::This
            | CallReceiver::Instance
            | CallReceiver::SelfType
            | CallReceiver::LateStatic => true,
            CallReceiver::Class(name) => last_segment(name).eq_ignore_ascii_case(&class.name),
            // Parent:: from a subclass declared in the same file
            CallReceiver::Parent => facts.classes.iter().any(|c| {
                c.extends
                    .as_deref()
                    .is_some_and(|p| last_segment(p).eq_ignore_ascii_case(&class.name))
            }),
            CallReceiver::Function => false,
        }
    });

    // A method declared by an implemented interface cannot be proven dead
    // by call-site analysis.
    let interface_contract = class.implements.iter().any(|iface| {
        facts.classes.iter().any(|c| {
            c.kind == ClassKind::Interface
                && last_segment(iface).eq_ignore_ascii_case(&c.name)
                && c.methods.iter().any(|m| m.name.eq_ignore_ascii_case(method))
        })
    });

    direct || interface_contract
}

/// Assigned-but-never-read locals. Parameters, loop bindings and caught
/// exception variables are always considered used since removing them
/// changes behavior or signatures.
pub fn find_unused_variables(analysis: &FileAnalysis) -> Vec<UnusedVariable> {
    let Some(facts) = analysis.php() else {
        return Vec::new();
    };

    let mut seen: Vec<(Option<String>, String)> = Vec::new();
    let mut unused = Vec::new();

    for var in &facts.variables {
        if var.kind != VariableKind::Assign {
            continue;
        }
        let key = (var.scope.clone(), var.name.clone());
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);

        let pinned = facts.variables.iter().any(|other| {
            other.scope == var.scope
                && other.name == var.name
                && matches!(
                    other.kind,
                    VariableKind::Read
                        | VariableKind::Param
                        | VariableKind::LoopBinding
                        | VariableKind::CatchBinding
                )
        });

        if !pinned {
            unused.push(UnusedVariable {
                file: analysis.path.clone(),
                scope: var.scope.clone(),
                name: var.name.clone(),
                line: var.line,
            });
        }
    }

    unused
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(content: &str) -> FileAnalysis {
        PhpAnalyzer::new().parse(content, PathBuf::from("test.php"))
    }

    #[test]
    fn parse_error_yields_empty_facts() {
        let analysis = parse("<?php\nclass Broken {\n  function f() {\n");
        assert!(analysis.has_errors());
        let facts = analysis.php().unwrap();
        assert!(facts.classes.is_empty());
        assert!(facts.imports.is_empty());
        assert!(facts.calls.is_empty());
    }

    #[test]
    fn extracts_namespace_imports_and_classes() {
        let src = indoc! {"
            <?php
            namespace App\\Services;

            use App\\Models\\Product;
            use Illuminate\\Support\\Str as StringHelper;

            class ProductService
            {
                public function rename(Product $product): void
                {
                    $product->name = StringHelper::slug($product->name);
                }
            }
        "};
        let analysis = parse(src);
        assert!(!analysis.has_errors());
        let facts = analysis.php().unwrap();

        assert_eq!(facts.namespace.as_deref(), Some("App\\Services"));
        assert_eq!(facts.imports.len(), 2);
        assert_eq!(facts.imports[1].bound_name(), "StringHelper");
        assert_eq!(facts.classes.len(), 1);
        assert_eq!(facts.classes[0].fqcn, "App\\Services\\ProductService");
        assert_eq!(facts.classes[0].methods.len(), 1);
        assert_eq!(facts.classes[0].methods[0].params, vec!["product"]);
    }

    #[test]
    fn unused_import_reported_until_a_usage_appears() {
        let unused_src = indoc! {"
            <?php
            use App\\Models\\Product;
            use App\\Models\\Category;

            class Report
            {
                public function build(): array
                {
                    return Product::all();
                }
            }
        "};
        let analysis = parse(unused_src);
        let unused = find_unused_imports(&analysis);
        assert_eq!(unused.len(), 1);
        assert_eq!(unused[0].name, "Category");

        let used_src = unused_src.replace("return Product::all();", "return Category::all();");
        let analysis = parse(&used_src);
        let names: Vec<String> = find_unused_imports(&analysis)
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["Product".to_string()]);
    }

    #[test]
    fn alias_instanceof_and_catch_count_as_usage() {
        let src = indoc! {"
            <?php
            use App\\Exceptions\\SyncError;
            use App\\Models\\Product as Item;
            use App\\Contracts\\Sluggable;

            class Checker
            {
                public function check($value, Sluggable $other): bool
                {
                    try {
                        return $value instanceof Item;
                    } catch (SyncError $e) {
                        return false;
                    }
                }
            }
        "};
        let analysis = parse(src);
        assert!(find_unused_imports(&analysis).is_empty());
    }

    #[test]
    fn private_method_unused_until_called() {
        let src = indoc! {"
            <?php
            class Pricing
            {
                public function total(): float
                {
                    return 10.0;
                }

                private function discount(): float
                {
                    return 0.1;
                }
            }
        "};
        let analysis = parse(src);
        let unused = find_unused_methods(&analysis);
        assert_eq!(unused.len(), 1);
        assert_eq!(unused[0].method, "discount");

        let called = src.replace("return 10.0;", "return 10.0 - $this->discount();");
        let analysis = parse(&called);
        assert!(find_unused_methods(&analysis).is_empty());
    }

    #[test]
    fn public_methods_never_reported_unused() {
        let src = indoc! {"
            <?php
            class Api
            {
                public function neverCalled(): void
                {
                }
            }
        "};
        let analysis = parse(src);
        assert!(find_unused_methods(&analysis).is_empty());
    }

    #[test]
    fn interface_contract_methods_stay_used() {
        let src = indoc! {"
            <?php
            interface Renderer
            {
                public function render(): string;
            }

            class Widget implements Renderer
            {
                protected function render(): string
                {
                    return '';
                }
            }
        "};
        let analysis = parse(src);
        assert!(find_unused_methods(&analysis).is_empty());
    }

    #[test]
    fn unused_variable_detection_spares_loops_and_params() {
        let src = indoc! {"
            <?php
            class Import
            {
                public function run(array $rows): int
                {
                    $count = 0;
                    $orphan = 'never read';
                    foreach ($rows as $row) {
                        $count += 1;
                    }
                    return $count;
                }
            }
        "};
        let analysis = parse(src);
        let unused = find_unused_variables(&analysis);
        assert_eq!(unused.len(), 1);
        assert_eq!(unused[0].name, "orphan");
    }
}
