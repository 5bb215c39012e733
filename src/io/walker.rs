//! Tree discovery for the analysis batch.

use anyhow::Result;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::core::Language;

pub struct FileWalker {
    root: PathBuf,
    languages: Vec<Language>,
    ignore_patterns: Vec<String>,
}

impl FileWalker {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            languages: Language::all(),
            ignore_patterns: vec![],
        }
    }

    pub fn with_languages(mut self, languages: Vec<Language>) -> Self {
        self.languages = languages;
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Source files of the configured dialects, in stable path order.
    pub fn walk(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = self
            .walk_all()?
            .into_iter()
            .filter(|path| {
                Language::from_path(path).is_some_and(|lang| self.languages.contains(&lang))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Every file under the root regardless of type, for asset and
    /// orphan scanning. Respects .gitignore and the exclude patterns.
    pub fn walk_all(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .build();

        for entry in walker {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && !self.is_excluded(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        if path.components().any(|c| c.as_os_str() == ".git") {
            return true;
        }
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let relative_str = relative.to_string_lossy().replace('\\', "/");

        self.ignore_patterns.iter().any(|pattern| {
            glob::Pattern::new(pattern)
                .map(|p| p.matches(&relative_str))
                .unwrap_or(false)
        })
    }
}

/// Read every discovered file that holds text, pairing path and content.
/// Binary files (assets) are skipped; they participate by path only.
pub fn read_contents(files: &[PathBuf]) -> Vec<(PathBuf, String)> {
    files
        .iter()
        .filter_map(|path| {
            std::fs::read_to_string(path)
                .ok()
                .map(|content| (path.clone(), content))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("app")).unwrap();
        fs::create_dir_all(dir.path().join("vendor/pkg")).unwrap();
        fs::create_dir_all(dir.path().join("resources/views")).unwrap();
        fs::write(dir.path().join("app/Model.php"), "<?php\n").unwrap();
        fs::write(dir.path().join("app/site.css"), "body {}\n").unwrap();
        fs::write(
            dir.path().join("resources/views/home.blade.php"),
            "<div></div>\n",
        )
        .unwrap();
        fs::write(dir.path().join("vendor/pkg/lib.php"), "<?php\n").unwrap();
        fs::write(dir.path().join("logo.png"), [0x89u8, 0x50]).unwrap();
        dir
    }

    #[test]
    fn walk_filters_by_language_and_excludes() {
        let dir = fixture_tree();
        let files = FileWalker::new(dir.path().to_path_buf())
            .with_ignore_patterns(vec!["vendor/**".to_string()])
            .walk()
            .unwrap();

        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"Model.php".to_string()));
        assert!(names.contains(&"site.css".to_string()));
        assert!(names.contains(&"home.blade.php".to_string()));
        assert!(!names.contains(&"lib.php".to_string()));
        assert!(!names.contains(&"logo.png".to_string()));
    }

    #[test]
    fn walk_all_includes_assets() {
        let dir = fixture_tree();
        let files = FileWalker::new(dir.path().to_path_buf()).walk_all().unwrap();
        assert!(files.iter().any(|p| p.ends_with("logo.png")));
    }

    #[test]
    fn language_filter_narrows_the_walk() {
        let dir = fixture_tree();
        let files = FileWalker::new(dir.path().to_path_buf())
            .with_languages(vec![Language::Css])
            .walk()
            .unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("site.css"));
    }
}
