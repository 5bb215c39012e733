//! Engine configuration, loadable from `codesweep.toml`.
//!
//! Similarity thresholds and complexity-scoring constants are deliberately
//! configuration rather than hard-coded detector logic.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::Language;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub duplicates: DuplicateThresholds,
    /// Glob patterns excluded from discovery
    pub excluded_paths: Vec<String>,
    pub included_languages: Vec<Language>,
    /// Maximum file modifications per execution batch
    pub batch_size: usize,
    pub dry_run: bool,
    /// Framework/runtime-critical configuration keys that can never be
    /// marked removable, regardless of reference counts.
    pub protected_config_keys: Vec<String>,
    pub test: TestConfig,
    pub backup_retention_days: i64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            duplicates: DuplicateThresholds::default(),
            excluded_paths: vec![
                "vendor/**".to_string(),
                "node_modules/**".to_string(),
                "storage/**".to_string(),
                "bootstrap/cache/**".to_string(),
            ],
            included_languages: Language::all(),
            batch_size: 25,
            dry_run: false,
            protected_config_keys: default_protected_keys(),
            test: TestConfig::default(),
            backup_retention_days: 30,
        }
    }
}

impl CleanupConfig {
    /// Load `codesweep.toml` from the given root, falling back to defaults
    /// when the file is absent. A present-but-invalid file is an error.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let path = root.join("codesweep.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        let config: CleanupConfig = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn is_protected_key(&self, key: &str) -> bool {
        self.protected_config_keys
            .iter()
            .any(|protected| protected.eq_ignore_ascii_case(key))
    }
}

/// Tunable duplicate-classification constants. Contracts are fixed
/// (similarity at or above `exact` designates an exact duplicate, scores
/// strictly between `similar` and `exact` a similar one); the values are
/// heuristic.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateThresholds {
    pub exact: f64,
    pub similar: f64,
    /// Fragments shorter than this never form groups
    pub min_fragment_lines: usize,
    pub min_occurrences: usize,
    /// Extraction suggestions need this many occurrences...
    pub extraction_min_occurrences: usize,
    /// ...and at least this many lines per occurrence
    pub extraction_min_lines: usize,
}

impl Default for DuplicateThresholds {
    fn default() -> Self {
        Self {
            exact: 0.95,
            similar: 0.70,
            min_fragment_lines: 3,
            min_occurrences: 2,
            extraction_min_occurrences: 3,
            extraction_min_lines: 4,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// Test-suite entry point; None disables test validation
    pub command: Option<String>,
    pub args: Vec<String>,
    /// Elapsed time beyond this is recorded as an operational risk
    pub slow_threshold_secs: u64,
    /// Suites whose failure blocks cleanup outright
    pub critical_suites: Vec<String>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            slow_threshold_secs: 300,
            critical_suites: Vec::new(),
        }
    }
}

fn default_protected_keys() -> Vec<String> {
    [
        "APP_KEY",
        "APP_ENV",
        "APP_DEBUG",
        "APP_URL",
        "DB_CONNECTION",
        "DB_HOST",
        "DB_PORT",
        "DB_DATABASE",
        "DB_USERNAME",
        "DB_PASSWORD",
        "CACHE_DRIVER",
        "SESSION_DRIVER",
        "QUEUE_CONNECTION",
        "LOG_CHANNEL",
        "MAIL_MAILER",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Default locations whose contents are never safe to delete
pub fn protected_directories() -> &'static [&'static str] {
    &[
        ".git",
        "vendor",
        "node_modules",
        "storage/framework",
        "storage/logs",
        "bootstrap/cache",
        "database/migrations",
    ]
}

/// Well-known entry points that are never safe to delete regardless of
/// discovered reference counts
pub fn protected_files() -> &'static [&'static str] {
    &[
        "index.php",
        "artisan",
        "composer.json",
        "composer.lock",
        "package.json",
        "package-lock.json",
        "webpack.mix.js",
        "vite.config.js",
        ".env",
        ".env.example",
        "server.php",
    ]
}

/// Resolve a path relative to the scan root, for report stability
pub fn relative_to_root(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}
