//! Orphaned asset detection: physical files no text-bearing file in the
//! tree references.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::{protected_directories, protected_files, relative_to_root};
use crate::core::errors::{Error, Result};

static HELPER_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:asset|secure_asset|url|mix|vite)\s*\(\s*['"]([^'"]+)['"]"#).unwrap()
});
static ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:src|href|data-src|poster)\s*=\s*["']([^"']+)["']"#).unwrap());
static CSS_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"url\(\s*['"]?([^'")]+)['"]?\s*\)"#).unwrap());
static PATH_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"['"]([\w\-./]+\.(?:png|jpe?g|gif|svg|webp|ico|css|js|woff2?|ttf|eot|mp4|pdf))['"]"#)
        .unwrap()
});

static LOCALE_THEME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.+[-_](?:[a-z]{2}(?:[-_][A-Za-z]{2})?|dark|light|rtl)$").unwrap()
});
static NUMERIC_STEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());
static PREFIX_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]+[-_]\d+$").unwrap());

const ASSET_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "css", "js", "woff", "woff2", "ttf",
    "eot", "mp4", "pdf",
];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrphanedAsset {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Set when a dynamic-reference heuristic matched; such assets are
    /// reported but never marked safe to delete.
    pub dynamic_hint: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OrphanReport {
    /// Zero references and no dynamic-reference hint
    pub orphaned: Vec<OrphanedAsset>,
    /// Zero references but a name pattern that suggests runtime lookup
    pub possibly_dynamic: Vec<OrphanedAsset>,
    pub reference_counts: HashMap<String, usize>,
}

pub struct OrphanedFileDetector {
    root: PathBuf,
}

impl OrphanedFileDetector {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Scan every text-bearing file for asset references and report
    /// physical assets nothing points at.
    pub fn detect(&self, files: &[PathBuf], contents: &[(PathBuf, String)]) -> OrphanReport {
        let mut reference_counts: HashMap<String, usize> = HashMap::new();

        for (_, content) in contents {
            for reference in extract_references(content) {
                let normalized = normalize_reference(&reference);
                *reference_counts.entry(normalized).or_default() += 1;
            }
        }

        let mut report = OrphanReport {
            reference_counts,
            ..Default::default()
        };

        for file in files {
            if !is_asset(file) {
                continue;
            }
            let relative = relative_to_root(&self.root, file);
            if self.reference_count(&report.reference_counts, &relative) > 0 {
                continue;
            }

            let size_bytes = std::fs::metadata(file).map(|m| m.len()).unwrap_or(0);
            let asset = OrphanedAsset {
                path: relative.clone(),
                size_bytes,
                dynamic_hint: might_be_dynamic(&relative),
            };
            if asset.dynamic_hint.is_some() {
                report.possibly_dynamic.push(asset);
            } else {
                report.orphaned.push(asset);
            }
        }

        report.orphaned.sort_by(|a, b| a.path.cmp(&b.path));
        report.possibly_dynamic.sort_by(|a, b| a.path.cmp(&b.path));
        report
    }

    /// References are usually public-relative while physical paths are
    /// root-relative, so match on aligned path suffixes.
    fn reference_count(&self, counts: &HashMap<String, usize>, relative: &Path) -> usize {
        let relative_str = relative.to_string_lossy().replace('\\', "/");

        counts
            .iter()
            .filter(|(reference, _)| {
                relative_str == **reference
                    || relative_str.ends_with(&format!("/{reference}"))
            })
            .map(|(_, count)| count)
            .sum()
    }

    /// Veto deletion inside system, build, dependency and version-control
    /// directories, and of well-known entry points, regardless of
    /// discovered reference counts.
    pub fn validate_safe_deletion(&self, path: &Path) -> Result<()> {
        let relative = relative_to_root(&self.root, path);
        let relative_str = relative.to_string_lossy().replace('\\', "/");

        for dir in protected_directories() {
            if relative_str.starts_with(&format!("{dir}/")) || relative_str == *dir {
                return Err(Error::validation(format!(
                    "{relative_str} is inside protected directory {dir}"
                )));
            }
        }

        if let Some(name) = relative.file_name().map(|n| n.to_string_lossy()) {
            if protected_files().contains(&name.as_ref()) {
                return Err(Error::validation(format!(
                    "{name} is a protected entry point"
                )));
            }
        }

        Ok(())
    }
}

pub fn is_asset(path: &Path) -> bool {
    path.extension()
        .map(|ext| ASSET_EXTENSIONS.contains(&ext.to_string_lossy().to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Asset-reference literals found in one file: direct paths, helper calls
/// and stylesheet url() values.
pub fn extract_references(content: &str) -> Vec<String> {
    let mut references = Vec::new();

    for caps in HELPER_CALL_RE.captures_iter(content) {
        references.push(caps[1].to_string());
    }
    for caps in ATTR_RE.captures_iter(content) {
        references.push(caps[1].to_string());
    }
    for caps in CSS_URL_RE.captures_iter(content) {
        references.push(caps[1].to_string());
    }
    for caps in PATH_LITERAL_RE.captures_iter(content) {
        references.push(caps[1].to_string());
    }

    references
}

/// Canonical root-relative form: leading-slash and `./` variants collapse;
/// remote URLs, protocol-relative URLs and data URIs pass through
/// unchanged.
pub fn normalize_reference(reference: &str) -> String {
    if reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with("//")
        || reference.starts_with("data:")
    {
        return reference.to_string();
    }

    let without_query = reference
        .split(['?', '#'])
        .next()
        .unwrap_or(reference);

    without_query
        .trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}

/// Locale/theme-suffixed names, purely numeric basenames and
/// `prefix_number` patterns are assembled at runtime and cannot be proven
/// orphaned statically.
pub fn might_be_dynamic(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();

    if NUMERIC_STEM_RE.is_match(&stem) {
        return Some("numeric basename".to_string());
    }
    if PREFIX_NUMBER_RE.is_match(&stem) {
        return Some("prefix_number pattern".to_string());
    }
    if LOCALE_THEME_RE.is_match(&stem) {
        return Some("locale or theme suffix".to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_collapses_local_variants_and_keeps_remote() {
        assert_eq!(normalize_reference("/img/logo.png"), "img/logo.png");
        assert_eq!(normalize_reference("./img/logo.png"), "img/logo.png");
        assert_eq!(normalize_reference("img/logo.png?v=3"), "img/logo.png");
        assert_eq!(
            normalize_reference("https://cdn.example.com/logo.png"),
            "https://cdn.example.com/logo.png"
        );
        assert_eq!(
            normalize_reference("//cdn.example.com/logo.png"),
            "//cdn.example.com/logo.png"
        );
        assert_eq!(
            normalize_reference("data:image/png;base64,AAAA"),
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn extracts_helper_attr_and_css_references() {
        let blade = r#"<img src="{{ asset('img/banner.png') }}"> <a href="/docs/guide.pdf">x</a>"#;
        let refs = extract_references(blade);
        assert!(refs.contains(&"img/banner.png".to_string()));
        assert!(refs.contains(&"/docs/guide.pdf".to_string()));

        let css = ".hero { background: url('../img/hero.jpg'); }";
        let refs = extract_references(css);
        assert!(refs.contains(&"../img/hero.jpg".to_string()));
    }

    #[test]
    fn dynamic_name_heuristics() {
        assert!(might_be_dynamic(Path::new("img/banner_en.png")).is_some());
        assert!(might_be_dynamic(Path::new("img/theme-dark.css")).is_some());
        assert!(might_be_dynamic(Path::new("img/1234.jpg")).is_some());
        assert!(might_be_dynamic(Path::new("img/product_17.png")).is_some());
        assert!(might_be_dynamic(Path::new("img/checkout-banner.png")).is_none());
    }

    #[test]
    fn protected_paths_are_vetoed() {
        let detector = OrphanedFileDetector::new(PathBuf::from("/app"));
        assert!(detector
            .validate_safe_deletion(Path::new("/app/vendor/pkg/file.php"))
            .is_err());
        assert!(detector
            .validate_safe_deletion(Path::new("/app/index.php"))
            .is_err());
        assert!(detector
            .validate_safe_deletion(Path::new("/app/public/img/old.png"))
            .is_ok());
    }
}
