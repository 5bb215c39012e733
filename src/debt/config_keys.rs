//! Dead configuration detection: config-file keys and environment
//! variables with zero live references.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

static ARRAY_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"['"]([\w.\-]+)['"]\s*=>"#).unwrap());
static ENV_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Z][A-Z0-9_]*)=").unwrap());
static CONFIG_CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bconfig\s*\(\s*['"]([\w.\-]+)['"]"#).unwrap());
static ENV_CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\benv\s*\(\s*['"]([A-Z0-9_]+)['"]"#).unwrap());
static GETENV_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bgetenv\s*\(\s*['"]([A-Z0-9_]+)['"]"#).unwrap());
static ENV_SUPERGLOBAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\$_(?:ENV|SERVER)\[\s*['"]([A-Z0-9_]+)['"]"#).unwrap());

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnusedConfigKey {
    pub key: String,
    pub file: PathBuf,
    pub line: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnusedEnvVar {
    pub name: String,
    pub line: usize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigCleanupReport {
    pub unused_config_keys: Vec<UnusedConfigKey>,
    pub unused_env_vars: Vec<UnusedEnvVar>,
    /// Keys that had zero references but sit on the protected allowlist
    pub protected_skipped: Vec<String>,
}

pub struct ConfigurationCleanupDetector {
    protected: Vec<String>,
}

impl ConfigurationCleanupDetector {
    pub fn new(protected: Vec<String>) -> Self {
        Self { protected }
    }

    fn is_protected(&self, key: &str) -> bool {
        self.protected
            .iter()
            .any(|protected| protected.eq_ignore_ascii_case(key))
    }

    pub fn detect(&self, contents: &[(PathBuf, String)]) -> ConfigCleanupReport {
        let used_config = collect_config_usage(contents);
        let used_env = collect_env_usage(contents);

        let mut report = ConfigCleanupReport::default();

        for (path, content) in contents {
            let path_str = path.to_string_lossy().replace('\\', "/");

            if let Some(stem) = config_file_stem(&path_str) {
                for (key, line) in top_level_keys(content) {
                    let dotted = format!("{stem}.{key}");
                    if used_config.contains(&dotted) || used_config.contains(&stem) {
                        continue;
                    }
                    if self.is_protected(&dotted) {
                        report.protected_skipped.push(dotted);
                        continue;
                    }
                    report.unused_config_keys.push(UnusedConfigKey {
                        key: dotted,
                        file: path.clone(),
                        line,
                    });
                }
            }

            if path_str.ends_with(".env") {
                for (idx, line) in content.lines().enumerate() {
                    let Some(caps) = ENV_LINE_RE.captures(line) else {
                        continue;
                    };
                    let name = caps[1].to_string();
                    if used_env.contains(&name) {
                        continue;
                    }
                    if self.is_protected(&name) {
                        report.protected_skipped.push(name);
                        continue;
                    }
                    report.unused_env_vars.push(UnusedEnvVar {
                        name,
                        line: idx + 1,
                    });
                }
            }
        }

        report.unused_config_keys.sort_by(|a, b| a.key.cmp(&b.key));
        report.unused_env_vars.sort_by(|a, b| a.name.cmp(&b.name));
        report
    }
}

fn config_file_stem(path: &str) -> Option<String> {
    let rest = path.split("config/").nth(1)?;
    let stem = rest.strip_suffix(".php")?;
    if stem.contains('/') {
        return None;
    }
    Some(stem.to_string())
}

/// Keys directly under the returned array; nested keys are addressed
/// through their parent and cannot be removed independently.
fn top_level_keys(content: &str) -> Vec<(String, usize)> {
    let mut keys = Vec::new();
    let mut depth = 0i64;
    let mut seen_return = false;

    for (idx, line) in content.lines().enumerate() {
        if !seen_return {
            if line.contains("return") && (line.contains('[') || line.contains("array(")) {
                seen_return = true;
                depth += bracket_delta(line);
            }
            continue;
        }

        if depth == 1 {
            if let Some(caps) = ARRAY_KEY_RE.captures(line) {
                keys.push((caps[1].to_string(), idx + 1));
            }
        }
        depth += bracket_delta(line);
    }

    keys
}

fn bracket_delta(line: &str) -> i64 {
    let mut delta = 0i64;
    for c in line.chars() {
        match c {
            '[' | '(' => delta += 1,
            ']' | ')' => delta -= 1,
            _ => {}
        }
    }
    delta
}

fn collect_config_usage(contents: &[(PathBuf, String)]) -> HashSet<String> {
    let mut used = HashSet::new();
    for (_, content) in contents {
        for caps in CONFIG_CALL_RE.captures_iter(content) {
            used.insert(caps[1].to_string());
        }
    }
    used
}

fn collect_env_usage(contents: &[(PathBuf, String)]) -> HashSet<String> {
    let mut used = HashSet::new();
    for (_, content) in contents {
        for caps in ENV_CALL_RE.captures_iter(content) {
            used.insert(caps[1].to_string());
        }
        for caps in GETENV_RE.captures_iter(content) {
            used.insert(caps[1].to_string());
        }
        for caps in ENV_SUPERGLOBAL_RE.captures_iter(content) {
            used.insert(caps[1].to_string());
        }
    }
    used
}
