use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::core::errors::Error;
use crate::core::{FileAnalysis, Language};

pub mod blade;
pub mod css;
pub mod javascript;
pub mod laravel;
pub mod php;
pub mod source;

/// Common contract for dialect analyzers.
///
/// `parse` is infallible by design: a dialect syntax error produces an
/// analysis flagged with the error and empty fact lists, so one malformed
/// file never aborts a tree-wide scan.
pub trait Analyzer: Send + Sync {
    fn parse(&self, content: &str, path: PathBuf) -> FileAnalysis;
    fn language(&self) -> Language;
}

pub fn get_analyzer(language: Language) -> Box<dyn Analyzer> {
    type AnalyzerFactory = fn() -> Box<dyn Analyzer>;

    static ANALYZER_MAP: &[(Language, AnalyzerFactory)] = &[
        (Language::Php, || Box::new(php::PhpAnalyzer::new())),
        (Language::Css, || Box::new(css::CssAnalyzer::new())),
        (Language::JavaScript, || Box::new(javascript::JsAnalyzer::new())),
        (Language::Blade, || Box::new(blade::BladeAnalyzer::new())),
    ];

    ANALYZER_MAP
        .iter()
        .find(|(lang, _)| *lang == language)
        .map(|(_, factory)| factory())
        .expect("all languages have analyzers")
}

/// Parse a file from disk, dispatching on its path.
///
/// Fails with `FileNotFound` for a missing path and a validation error for
/// an unsupported extension; dialect syntax errors do not fail, they flag
/// the returned analysis.
pub fn parse_path(path: &Path) -> Result<FileAnalysis> {
    if !path.exists() {
        return Err(Error::file_not_found(path).into());
    }
    let language = Language::from_path(path)
        .ok_or_else(|| Error::validation(format!("unsupported file type: {}", path.display())))?;

    let content = std::fs::read_to_string(path)?;
    let analyzer = if language == Language::Php && laravel::LaravelAnalyzer::applies_to(path) {
        Box::new(laravel::LaravelAnalyzer::new()) as Box<dyn Analyzer>
    } else {
        get_analyzer(language)
    };

    Ok(analyzer.parse(&content, path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_is_file_not_found() {
        let err = parse_path(Path::new("/nonexistent/file.php")).unwrap_err();
        let err = err.downcast::<Error>().unwrap();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn dispatch_covers_every_language() {
        for language in Language::all() {
            assert_eq!(get_analyzer(language).language(), language);
        }
    }

    #[test]
    fn blade_double_extension_wins_over_php() {
        assert_eq!(
            Language::from_path(Path::new("resources/views/home.blade.php")),
            Some(Language::Blade)
        );
        assert_eq!(
            Language::from_path(Path::new("app/Models/Product.php")),
            Some(Language::Php)
        );
    }
}
