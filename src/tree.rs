/*!
 * Indented text rendering of a scan result
 */

use crate::types::{FileSystemEntry, ScanResult};

/// Indentation unit, repeated once per depth level
pub const INDENT: &str = "|   ";

/// Connector placed in front of nested entry names
pub const CONNECTOR: &str = "+-- ";

/// Renders a parent-before-child entry sequence as indented lines
///
/// Rendering is a single linear pass: the scanner already guarantees that
/// every entry follows its parent, so no lookahead is needed.
pub struct TreeRenderer;

impl TreeRenderer {
    /// Render the root name followed by one line per entry
    pub fn render(scan: &ScanResult, root_name: &str) -> Vec<String> {
        Self::render_entries(&scan.entries, root_name)
    }

    /// Render an arbitrary ordered entry slice
    pub fn render_entries(entries: &[FileSystemEntry], root_name: &str) -> Vec<String> {
        let mut lines = Vec::with_capacity(entries.len() + 1);
        lines.push(root_name.to_string());
        lines.extend(entries.iter().map(Self::render_entry));
        lines
    }

    /// Render a single entry line
    ///
    /// Top-level entries are bare names; nested entries get one indent per
    /// level followed by the connector.
    pub fn render_entry(entry: &FileSystemEntry) -> String {
        let depth = entry.depth();
        if depth == 0 {
            return entry.name.clone();
        }

        let mut line =
            String::with_capacity(INDENT.len() * depth + CONNECTOR.len() + entry.name.len());
        for _ in 0..depth {
            line.push_str(INDENT);
        }
        line.push_str(CONNECTOR);
        line.push_str(&entry.name);
        line
    }

    /// Recover the entry depth from a rendered entry line
    ///
    /// Only meaningful for lines after the root line, which is bare like a
    /// top-level entry. Returns `None` for indented lines missing the
    /// connector.
    pub fn depth_of_line(line: &str) -> Option<usize> {
        let mut rest = line;
        let mut depth = 0;
        while let Some(stripped) = rest.strip_prefix(INDENT) {
            rest = stripped;
            depth += 1;
        }

        if depth == 0 {
            return Some(0);
        }
        rest.strip_prefix(CONNECTOR).map(|_| depth)
    }

    /// Render to a single newline-terminated string
    pub fn render_to_string(scan: &ScanResult, root_name: &str) -> String {
        let mut out = Self::render(scan, root_name).join("\n");
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(path: &str, is_file: bool) -> FileSystemEntry {
        let parts: Vec<String> = path.split('/').map(String::from).collect();
        FileSystemEntry {
            name: parts.last().unwrap().clone(),
            absolute_path: PathBuf::from("/p").join(path),
            is_file,
            path_parts: parts,
        }
    }

    fn sample() -> ScanResult {
        ScanResult {
            root: PathBuf::from("/p"),
            entries: vec![
                entry("docs", false),
                entry("docs/guide.md", true),
                entry("src", false),
                entry("src/core", false),
                entry("src/core/mod.rs", true),
                entry("src/main.rs", true),
            ],
            total: 6,
            errors: vec![],
        }
    }

    #[test]
    fn test_render_layout() {
        let lines = TreeRenderer::render(&sample(), "p");
        assert_eq!(
            lines,
            vec![
                "p",
                "docs",
                "|   +-- guide.md",
                "src",
                "|   +-- core",
                "|   |   +-- mod.rs",
                "|   +-- main.rs",
            ]
        );
    }

    #[test]
    fn test_depth_round_trip() {
        let scan = sample();
        let lines = TreeRenderer::render(&scan, "p");

        let depths: Vec<usize> = lines[1..]
            .iter()
            .map(|l| TreeRenderer::depth_of_line(l).unwrap())
            .collect();
        let expected: Vec<usize> = scan.entries.iter().map(|e| e.path_parts.len() - 1).collect();
        assert_eq!(depths, expected);
    }

    #[test]
    fn test_only_nested_entries_get_the_connector() {
        assert_eq!(TreeRenderer::render_entry(&entry("a.txt", true)), "a.txt");
        assert_eq!(TreeRenderer::render_entry(&entry("a/b.txt", true)), "|   +-- b.txt");
        assert_eq!(TreeRenderer::depth_of_line("a.txt"), Some(0));
        assert_eq!(TreeRenderer::depth_of_line("|   |   +-- c"), Some(2));
        assert_eq!(TreeRenderer::depth_of_line("|   c"), None);
    }

    #[test]
    fn test_empty_scan_renders_root_only() {
        let scan = ScanResult {
            root: PathBuf::from("/p"),
            ..ScanResult::default()
        };
        assert_eq!(TreeRenderer::render_to_string(&scan, "p"), "p\n");
    }
}
