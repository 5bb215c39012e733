pub mod errors;
pub mod facts;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use errors::{Error, Result};
pub use facts::{AnalysisFacts, FileAnalysis, Span};

/// Source dialects the engine analyzes
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Language {
    Php,
    Css,
    JavaScript,
    Blade,
}

impl Language {
    /// Dispatch on path, checking the `.blade.php` double extension before
    /// plain `.php`.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy();
        if name.ends_with(".blade.php") {
            return Some(Language::Blade);
        }
        match path.extension()?.to_string_lossy().as_ref() {
            "php" => Some(Language::Php),
            "css" | "scss" => Some(Language::Css),
            "js" => Some(Language::JavaScript),
            _ => None,
        }
    }

    pub fn all() -> Vec<Language> {
        vec![
            Language::Php,
            Language::Css,
            Language::JavaScript,
            Language::Blade,
        ]
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        static DISPLAY_STRINGS: &[(Language, &str)] = &[
            (Language::Php, "PHP"),
            (Language::Css, "CSS"),
            (Language::JavaScript, "JavaScript"),
            (Language::Blade, "Blade"),
        ];

        let display_str = DISPLAY_STRINGS
            .iter()
            .find(|(lang, _)| lang == self)
            .map(|(_, s)| *s)
            .unwrap_or("Unknown");

        write!(f, "{display_str}")
    }
}

/// What kind of fragment a duplicate group was found in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DuplicateType {
    PhpMethod,
    BladeTemplate,
    CssRule,
    JsFunction,
}

impl std::fmt::Display for DuplicateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        static DISPLAY_STRINGS: &[(DuplicateType, &str)] = &[
            (DuplicateType::PhpMethod, "php_method"),
            (DuplicateType::BladeTemplate, "blade_template"),
            (DuplicateType::CssRule, "css_rule"),
            (DuplicateType::JsFunction, "js_function"),
        ];

        let display_str = DISPLAY_STRINGS
            .iter()
            .find(|(t, _)| t == self)
            .map(|(_, s)| *s)
            .unwrap_or("unknown");

        write!(f, "{display_str}")
    }
}

/// Exact groups share one normalized signature; similar groups pair
/// non-identical structures whose overlap ratio lands between the
/// configured thresholds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum DuplicateKind {
    Exact,
    Similar,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DuplicateOccurrence {
    pub file: PathBuf,
    pub span: Span,
    pub fragment: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub duplicate_type: DuplicateType,
    pub signature: String,
    pub kind: DuplicateKind,
    /// Always at least two entries
    pub occurrences: Vec<DuplicateOccurrence>,
    /// Bounded in [0, 1]; 1.0 for identical normalized structure
    pub similarity: f64,
    /// Bounded in [0, 1]; grows with fragment size and control-flow density
    pub complexity_score: f64,
}

impl DuplicateMatch {
    /// Occurrences that could be replaced by one shared artifact
    pub fn potential_savings(&self) -> usize {
        self.occurrences.len().saturating_sub(1)
    }

    pub fn refactoring_priority(&self) -> f64 {
        self.occurrences.len() as f64 * self.complexity_score
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnusedImport {
    pub file: PathBuf,
    pub name: String,
    pub path: String,
    pub line: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnusedMethod {
    pub file: PathBuf,
    pub class: String,
    pub method: String,
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnusedVariable {
    pub file: PathBuf,
    /// Enclosing method or function, None at file scope
    pub scope: Option<String>,
    pub name: String,
    pub line: usize,
}

/// Suggestion to extract a duplicated template fragment into a reusable
/// component artifact
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComponentExtractionSuggestion {
    pub name: String,
    pub artifact_path: PathBuf,
    pub fragment: String,
    pub locations: Vec<DuplicateOccurrence>,
    pub estimated_saved_lines: usize,
}

/// Suggestion to extract duplicated method bodies into one shared helper
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MethodExtractionSuggestion {
    pub name: String,
    pub artifact_path: PathBuf,
    pub fragment: String,
    pub locations: Vec<DuplicateOccurrence>,
    pub estimated_saved_lines: usize,
}
