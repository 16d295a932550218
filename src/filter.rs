/*!
 * Visibility rules for filesystem entries
 */

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use glob_match::glob_match;
use once_cell::sync::Lazy;

/// Decides whether a filesystem entry is visible to the pipeline
///
/// Implementations must be pure: the answer depends only on the path and
/// the scan root, never on file contents or previous calls.
pub trait PathFilter: Send + Sync {
    /// Whether `path` (a descendant of `root`, or `root` itself) is visible
    fn is_visible(&self, path: &Path, root: &Path) -> bool;
}

/// Leading character that marks hidden files and directories
pub const HIDDEN_MARKER: char = '.';

/// Names that are excluded wherever they appear in a path
pub static DEFAULT_EXCLUDED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Version Control
        ".git",
        ".svn",
        ".hg",
        ".bzr",
        // Dependencies
        "node_modules",
        "bower_components",
        ".yarn",
        ".pnpm-store",
        // IDEs & Editors
        ".idea",
        ".vscode",
        ".vs",
        // Virtual environments
        "venv",
        ".venv",
        "env",
        // Bytecode caches
        "__pycache__",
        ".pytest_cache",
        ".mypy_cache",
    ]
    .into_iter()
    .collect()
});

/// The standard exclusion policy
///
/// A path is invisible when any of its segments relative to the root is an
/// excluded name, matches a user ignore pattern or (unless hidden entries are
/// allowed) starts with [`HIDDEN_MARKER`]. The root is always visible.
#[derive(Debug, Clone)]
pub struct DefaultPathFilter {
    excluded_names: HashSet<String>,
    ignore_patterns: Vec<String>,
    excluded_paths: Vec<PathBuf>,
    include_hidden: bool,
}

impl Default for DefaultPathFilter {
    fn default() -> Self {
        Self {
            excluded_names: DEFAULT_EXCLUDED.iter().map(|s| s.to_string()).collect(),
            ignore_patterns: Vec::new(),
            excluded_paths: Vec::new(),
            include_hidden: false,
        }
    }
}

impl DefaultPathFilter {
    /// Filter with the default excluded-name set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add glob patterns matched against every segment name
    pub fn with_ignore_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_patterns.extend(
            patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.trim().is_empty()),
        );
        self
    }

    /// Exclude one exact absolute path, e.g. the output artifact
    pub fn with_excluded_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.excluded_paths.push(path.into());
        self
    }

    /// Keep entries whose names start with the hidden marker
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    fn segment_is_excluded(&self, segment: &str) -> bool {
        if self.excluded_names.contains(segment) {
            return true;
        }

        if !self.include_hidden && segment.starts_with(HIDDEN_MARKER) {
            return true;
        }

        self.ignore_patterns
            .iter()
            .any(|pattern| glob_match(pattern, segment))
    }
}

impl PathFilter for DefaultPathFilter {
    fn is_visible(&self, path: &Path, root: &Path) -> bool {
        if self.excluded_paths.iter().any(|p| p == path) {
            return false;
        }

        let relative = match path.strip_prefix(root) {
            Ok(rel) => rel,
            // Outside the root: judge the leaf name only
            Err(_) => {
                return path
                    .file_name()
                    .map(|n| !self.segment_is_excluded(&n.to_string_lossy()))
                    .unwrap_or(true)
            }
        };

        !relative.components().any(|component| match component {
            Component::Normal(name) => self.segment_is_excluded(&name.to_string_lossy()),
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visible(filter: &DefaultPathFilter, rel: &str) -> bool {
        let root = Path::new("/work/project");
        filter.is_visible(&root.join(rel), root)
    }

    #[test]
    fn test_root_is_always_visible() {
        let filter = DefaultPathFilter::new();
        let root = Path::new("/work/.hidden-root");
        assert!(filter.is_visible(root, root));
    }

    #[test]
    fn test_excluded_names_at_any_depth() {
        let filter = DefaultPathFilter::new();
        assert!(!visible(&filter, ".git"));
        assert!(!visible(&filter, ".git/config"));
        assert!(!visible(&filter, "web/node_modules/left-pad/index.js"));
        assert!(!visible(&filter, "pkg/__pycache__/mod.cpython-311.pyc"));
        assert!(!visible(&filter, "venv/lib/site.py"));
        assert!(visible(&filter, "src/main.rs"));
        // Exact segment match only
        assert!(visible(&filter, "src/environment.rs"));
    }

    #[test]
    fn test_hidden_entries() {
        let filter = DefaultPathFilter::new();
        assert!(!visible(&filter, ".env.local"));
        assert!(!visible(&filter, ".config/settings.toml"));
        assert!(visible(&filter, "docs/readme.md"));

        let filter = DefaultPathFilter::new().include_hidden(true);
        assert!(visible(&filter, ".config/settings.toml"));
        // Excluded names still win over the hidden switch
        assert!(!visible(&filter, ".git/HEAD"));
    }

    #[test]
    fn test_ignore_patterns_and_excluded_paths() {
        let filter = DefaultPathFilter::new()
            .with_ignore_patterns(["*.log", "target", ""])
            .with_excluded_path("/work/project/out.xml");

        assert!(!visible(&filter, "debug.log"));
        assert!(!visible(&filter, "target/release/app"));
        assert!(!visible(&filter, "out.xml"));
        assert!(visible(&filter, "sub/out.xml"));
        assert!(visible(&filter, "logs.txt"));
    }
}
