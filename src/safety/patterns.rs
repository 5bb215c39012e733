//! Dynamic-usage risk signatures.
//!
//! Static reachability analysis cannot see reflection, variable functions,
//! or string-built class names. Each rule here pairs a recognizer with a
//! risk tier; the scanner evaluates the table per removal candidate, so new
//! signatures extend the table without touching the validation core.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        };
        write!(f, "{s}")
    }
}

/// One pattern→tier rule. `regex` matches a dangerous call form; a match in
/// any file containing a removal candidate taints that candidate.
pub struct RiskPattern {
    pub name: &'static str,
    pub regex: Regex,
    pub tier: RiskTier,
}

static DEFAULT_PATTERNS: Lazy<Vec<RiskPattern>> = Lazy::new(|| {
    let rule = |name, pattern: &str, tier| RiskPattern {
        name,
        regex: Regex::new(pattern).unwrap(),
        tier,
    };
    vec![
        rule("reflection", r"new\s+Reflection(?:Class|Method|Function|Property)\b", RiskTier::High),
        rule("dynamic_call_dispatch", r"\bcall_user_func(?:_array)?\s*\(", RiskTier::High),
        rule("variable_variable", r"\$\$\w+", RiskTier::High),
        rule("dynamic_method_call", r"->\s*\$\w+\s*\(", RiskTier::High),
        rule("dynamic_static_call", r"\$\w+\s*::\s*\$?\w+\s*\(", RiskTier::Medium),
        rule("dynamic_class_instantiation", r"new\s+\$\w+", RiskTier::High),
        rule("eval", r"\beval\s*\(", RiskTier::High),
        rule("existence_probe", r"\b(?:class_exists|method_exists|function_exists)\s*\(", RiskTier::Medium),
        rule("magic_dispatch", r"function\s+__(?:call|callStatic|get|set)\b", RiskTier::Medium),
        rule("variable_function", r"^\s*\$\w+\s*\(", RiskTier::Medium),
    ]
});

pub fn default_patterns() -> &'static [RiskPattern] {
    &DEFAULT_PATTERNS
}

/// A removal candidate as the scanner sees it: just a name and where it
/// lives. The scanner does not care whether it was a method, a variable or
/// an import.
#[derive(Clone, Debug)]
pub struct RemovalCandidate {
    pub name: String,
    pub kind: String,
    pub file: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DynamicUsageFinding {
    pub element: String,
    pub file: PathBuf,
    pub line: usize,
    pub pattern: String,
    pub tier: RiskTier,
}

/// Scan one candidate against the whole batch.
///
/// Two signal classes: dangerous call forms in the candidate's own file
/// (anything there could reach the candidate dynamically), and the
/// candidate's name inside a string literal anywhere (strings feed
/// `call_user_func`, `route()`, container bindings and the like).
pub fn scan_candidate(
    candidate: &RemovalCandidate,
    contents: &[(PathBuf, String)],
    patterns: &[RiskPattern],
) -> Vec<DynamicUsageFinding> {
    let mut findings = Vec::new();

    for (path, content) in contents {
        let same_file = *path == candidate.file;

        if same_file {
            for pattern in patterns {
                for (idx, line) in content.lines().enumerate() {
                    if pattern.regex.is_match(line) {
                        findings.push(DynamicUsageFinding {
                            element: candidate.name.clone(),
                            file: path.clone(),
                            line: idx + 1,
                            pattern: pattern.name.to_string(),
                            tier: pattern.tier,
                        });
                    }
                }
            }
        }

        for (idx, line) in content.lines().enumerate() {
            if string_references_name(line, &candidate.name) {
                // A name quoted on the same line as a dynamic call form is
                // almost certainly being dispatched through it
                let tier = if patterns.iter().any(|p| p.regex.is_match(line)) {
                    RiskTier::High
                } else {
                    RiskTier::Medium
                };
                findings.push(DynamicUsageFinding {
                    element: candidate.name.clone(),
                    file: path.clone(),
                    line: idx + 1,
                    pattern: "string_reference".to_string(),
                    tier,
                });
            }
        }
    }

    findings
}

/// The candidate's bare name inside a quoted literal, excluding its own
/// declaration line forms (`function name`, `use ...Name`).
fn string_references_name(line: &str, name: &str) -> bool {
    if name.len() < 3 {
        return false;
    }
    let single = format!("'{name}'");
    let double = format!("\"{name}\"");
    (line.contains(&single) || line.contains(&double))
        && !line.trim_start().starts_with("use ")
        && !line.contains(&format!("function {name}"))
}

/// Highest tier across findings; None when the scan found nothing.
pub fn highest_tier(findings: &[DynamicUsageFinding]) -> Option<RiskTier> {
    findings.iter().map(|f| f.tier).max()
}
