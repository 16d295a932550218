/*!
 * Document generation: title page, tree pages and one section per text file
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use rayon::prelude::*;

use crate::classify::{ContentClass, ContentClassifier};
use crate::document::{DocumentSink, PageKind, Paginator};
use crate::error::Result;
use crate::progress::{CancellationToken, ProgressReporter, ProgressTracker};
use crate::scanner::{CountScope, DirectoryScanner};
use crate::tree::TreeRenderer;
use crate::types::{FileSystemEntry, PipelineError};
use crate::utils::{format_file_size, sanitize_line, PLACEHOLDER};

/// Prefix of the timestamp line on the title page
pub const GENERATED_PREFIX: &str = "Generated: ";

/// Line emitted instead of content that is not valid UTF-8
pub const UNDECODABLE_PLACEHOLDER: &str = "[content not shown: not valid UTF-8 text]";

/// Default size above which a file's content is replaced by a notice
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

/// Generation options
#[derive(Debug, Clone, Copy)]
pub struct GenerationOptions {
    /// Body lines per page
    pub lines_per_page: usize,
    /// Files larger than this get a one-line notice instead of content
    pub max_file_size: u64,
    /// Replacement for characters outside printable ASCII
    pub placeholder: char,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            lines_per_page: Paginator::DEFAULT_LINES_PER_PAGE,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            placeholder: PLACEHOLDER,
        }
    }
}

/// Statistics of one generation run
#[derive(Debug, Clone)]
pub struct GenerationSummary {
    /// Path of the written artifact
    pub output_file: PathBuf,
    /// Wall time of the run
    pub duration: Duration,
    /// Visible files counted before generation
    pub files_total: u64,
    /// Files rendered with a content section
    pub files_rendered: usize,
    /// Opaque files listed in the tree only
    pub files_skipped: usize,
    /// Entries shown in the tree
    pub tree_entries: usize,
    /// Pages written
    pub pages: usize,
    /// Content lines written
    pub lines: usize,
    /// Non-fatal errors observed
    pub errors: Vec<PipelineError>,
}

/// Content prepared for one file, before it is written to the sink
enum PreparedFile {
    /// Opaque file, no section
    Skipped,
    /// Sanitized lines of a text file
    Rendered(Vec<String>),
    /// Content could not be read
    Failed(PipelineError),
}

/// Forwards entry errors but not progress
///
/// The tree scan inside a generation run has its own progress stream, which
/// must not leak into the generation percentages.
struct ErrorsOnly<'a>(&'a dyn ProgressReporter);

impl ProgressReporter for ErrorsOnly<'_> {
    fn progress(&self, _percent: u8) {}

    fn entry_error(&self, error: &PipelineError) {
        self.0.entry_error(error);
    }
}

/// Builds a paginated document from a directory tree
#[derive(Clone)]
pub struct DocumentGenerator {
    /// Scanner (and with it, the visibility policy)
    scanner: DirectoryScanner,
    /// Text/opaque decision
    classifier: Arc<dyn ContentClassifier>,
    /// Generation options
    options: GenerationOptions,
}

impl DocumentGenerator {
    /// Create a generator with default options
    pub fn new(scanner: DirectoryScanner, classifier: Arc<dyn ContentClassifier>) -> Self {
        Self {
            scanner,
            classifier,
            options: GenerationOptions::default(),
        }
    }

    /// Replace the generation options
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Generate the document for `root` into `sink`
    ///
    /// Progress counts visible files only. Per-file failures are reported and
    /// the run continues; the sink is finalized exactly once at the end. On
    /// error or cancellation the sink is dropped unfinalized.
    pub fn generate(
        &self,
        root: &Path,
        mut sink: Box<dyn DocumentSink>,
        reporter: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<GenerationSummary> {
        let start_time = Instant::now();
        let abs_root = DirectoryScanner::resolve_root(root)?;

        let files_total = self
            .scanner
            .count_visible(&abs_root, CountScope::Files, cancel)?;
        let mut tracker = ProgressTracker::new(reporter, files_total);

        let scan = self.scanner.scan(&abs_root, &ErrorsOnly(reporter), cancel)?;
        let mut errors = scan.errors.clone();
        let paginator = Paginator::new(self.options.lines_per_page);
        let placeholder = self.options.placeholder;

        // Title page
        let root_name = scan.root_name();
        let title_lines = vec![
            format!("{}{}", GENERATED_PREFIX, Local::now().format("%Y-%m-%d %H:%M:%S")),
            format!("Root: {}", abs_root.display()),
            format!("Host: {}", host_name()),
            format!("Files: {}", files_total),
        ];
        for page in paginator.paginate(
            PageKind::Title,
            Some(sanitize_line(&root_name, placeholder)),
            sanitize_all(title_lines, placeholder),
        ) {
            sink.push_page(page)?;
        }

        // Structure pages
        let tree_lines = TreeRenderer::render(&scan, &root_name);
        let tree_lines = sanitize_all(tree_lines, placeholder);
        for page in paginator.paginate(PageKind::Tree, None, tree_lines) {
            sink.push_page(page)?;
        }

        // Content sections, read in parallel chunks and written in order
        let files: Vec<&FileSystemEntry> = scan.files().collect();
        let chunk_size = (rayon::current_num_threads() * 4).max(1);
        let mut files_rendered = 0;
        let mut files_skipped = 0;
        let mut lines_written = 0;

        for chunk in files.chunks(chunk_size) {
            cancel.check()?;
            let prepared: Vec<PreparedFile> = chunk
                .par_iter()
                .map(|entry| self.prepare(entry))
                .collect();

            for (entry, prepared) in chunk.iter().zip(prepared) {
                cancel.check()?;
                match prepared {
                    PreparedFile::Skipped => {
                        tracing::debug!("Skipping opaque file {}", entry.relative_path());
                        files_skipped += 1;
                    }
                    PreparedFile::Rendered(lines) => {
                        lines_written += lines.len();
                        let header = sanitize_line(&entry.relative_path(), placeholder);
                        for page in paginator.paginate(PageKind::FileContent, Some(header), lines) {
                            sink.push_page(page)?;
                        }
                        files_rendered += 1;
                    }
                    PreparedFile::Failed(error) => {
                        tracker.error(&error);
                        errors.push(error);
                    }
                }
                tracker.advance();
            }
        }

        cancel.check()?;
        tracker.finish();

        let pages = sink.page_count();
        let output_file = sink.finalize()?;
        tracing::info!(
            "Wrote {} pages for {} files to {}",
            pages,
            files_rendered,
            output_file.display()
        );

        Ok(GenerationSummary {
            output_file,
            duration: start_time.elapsed(),
            files_total,
            files_rendered,
            files_skipped,
            tree_entries: scan.entries.len(),
            pages,
            lines: lines_written,
            errors,
        })
    }

    /// Classify, read and sanitize one file
    fn prepare(&self, entry: &FileSystemEntry) -> PreparedFile {
        if self.classifier.classify(&entry.absolute_path) == ContentClass::Opaque {
            return PreparedFile::Skipped;
        }

        match self.read_lines(&entry.absolute_path) {
            Ok(lines) => PreparedFile::Rendered(lines),
            Err(e) => PreparedFile::Failed(PipelineError::for_path(
                &entry.absolute_path,
                format!("cannot read file: {}", e),
            )),
        }
    }

    fn read_lines(&self, path: &Path) -> std::io::Result<Vec<String>> {
        let metadata = fs::metadata(path)?;
        if metadata.len() > self.options.max_file_size {
            return Ok(vec![format!(
                "[file too large to include content: {}]",
                format_file_size(metadata.len())
            )]);
        }

        let bytes = fs::read(path)?;
        let lines = match String::from_utf8(bytes) {
            Ok(text) => text
                .lines()
                .map(|line| sanitize_line(line, self.options.placeholder))
                .collect(),
            Err(_) => vec![UNDECODABLE_PLACEHOLDER.to_string()],
        };
        Ok(lines)
    }
}

fn sanitize_all(lines: Vec<String>, placeholder: char) -> Vec<String> {
    lines
        .iter()
        .map(|line| sanitize_line(line, placeholder))
        .collect()
}

fn host_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
