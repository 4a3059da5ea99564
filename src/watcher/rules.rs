// Include/exclude path rules

use crate::utils::FileUtils;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Source of candidate report files
pub trait Rules: Send + Sync {
    /// Rules as written by the user
    fn body(&self) -> &str;

    /// Included roots
    fn paths(&self) -> Vec<PathBuf>;

    /// Every file currently matched by the rules
    fn collect_files(&self) -> Vec<PathBuf>;
}

/// Line-oriented rules: `+:path` includes, `-:path` excludes, a bare path
/// includes. Relative paths are resolved against a base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRules {
    body: String,
    include: Vec<PathBuf>,
    exclude: Vec<PathBuf>,
}

impl PathRules {
    pub fn parse(body: &str, base: &Path) -> Self {
        let mut include = Vec::new();
        let mut exclude = Vec::new();

        for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(path) = line.strip_prefix("-:") {
                exclude.push(resolve(path.trim(), base));
            } else {
                let path = line.strip_prefix("+:").unwrap_or(line);
                include.push(resolve(path.trim(), base));
            }
        }

        Self {
            body: body.to_string(),
            include,
            exclude,
        }
    }

    /// Include every given path
    pub fn from_paths(paths: &[PathBuf]) -> Self {
        let body = paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            body,
            include: paths.to_vec(),
            exclude: Vec::new(),
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.exclude.iter().any(|prefix| path.starts_with(prefix))
    }
}

impl Rules for PathRules {
    fn body(&self) -> &str {
        &self.body
    }

    fn paths(&self) -> Vec<PathBuf> {
        self.include.clone()
    }

    fn collect_files(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        self.include
            .iter()
            .flat_map(|root| FileUtils::collect_report_files(root))
            .filter(|path| !self.is_excluded(path))
            .filter(|path| seen.insert(path.clone()))
            .collect()
    }
}

fn resolve(path: &str, base: &Path) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rule_lines() {
        let rules = PathRules::parse("+:reports\n\n-:reports/old\nbuild/tests\n", Path::new("/ws"));
        assert_eq!(
            rules.paths(),
            vec![PathBuf::from("/ws/reports"), PathBuf::from("/ws/build/tests")]
        );
        assert!(rules.is_excluded(Path::new("/ws/reports/old/a.xml")));
        assert!(!rules.is_excluded(Path::new("/ws/reports/a.xml")));
    }

    #[test]
    fn test_collect_files_applies_excludes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("old")).unwrap();
        std::fs::write(dir.path().join("TEST-a.xml"), "<testsuite/>").unwrap();
        std::fs::write(dir.path().join("old").join("TEST-b.xml"), "<testsuite/>").unwrap();

        let body = format!("+:{}\n-:{}", dir.path().display(), dir.path().join("old").display());
        let rules = PathRules::parse(&body, Path::new("/unused"));
        assert_eq!(rules.collect_files(), vec![dir.path().join("TEST-a.xml")]);
        assert_eq!(rules.body(), body);
    }

    #[test]
    fn test_overlapping_roots_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("r.xml");
        std::fs::write(&report, "<pmd/>").unwrap();

        let rules = PathRules::from_paths(&[dir.path().to_path_buf(), report.clone()]);
        assert_eq!(rules.collect_files(), vec![report]);
    }
}
