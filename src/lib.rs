/*!
 * treedoc - Render a directory tree and its text files as a paginated document
 *
 * The library walks a directory under a visibility policy, renders the tree
 * as indented lines and writes a document (title page, tree pages, one
 * section per text file) through a pluggable sink, reporting progress along
 * the way. Runs can execute on background workers that report through an
 * event channel.
 */

pub mod classify;
pub mod config;
pub mod document;
pub mod error;
pub mod filter;
pub mod generator;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod tree;
pub mod types;
pub mod utils;


// Re-export main components for easier access
pub use classify::{ContentClass, ContentClassifier, MimeClassifier};
pub use config::Config;
pub use document::{DocumentSink, OutputFormat, Page, PageKind, Paginator};
pub use error::{Result, ResultExt, TreeDocError};
pub use filter::{DefaultPathFilter, PathFilter};
pub use generator::{DocumentGenerator, GenerationOptions, GenerationSummary};
pub use pipeline::{spawn_generation, spawn_scan, PipelineEvent, PipelineHandle, RunOutcome};
pub use progress::{CancellationToken, NullReporter, ProgressReporter};
pub use report::{ReportFormat, Reporter};
pub use scanner::{DirectoryScanner, ScanOptions};
pub use tree::TreeRenderer;
pub use types::{FileSystemEntry, PipelineError, ScanResult};
pub use utils::format_file_size;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
