/*!
 * Configuration handling for treedoc
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgAction, Parser};
use clap_complete::Shell;

use crate::classify::MimeClassifier;
use crate::document::{OutputFormat, Paginator};
use crate::ensure;
use crate::error::Result;
use crate::filter::DefaultPathFilter;
use crate::generator::{DocumentGenerator, GenerationOptions, DEFAULT_MAX_FILE_SIZE};
use crate::scanner::{DirectoryScanner, ScanOptions};
use crate::types::root_display_name;
use crate::utils::PLACEHOLDER;

/// Command-line arguments for treedoc
#[derive(Parser, Debug, Clone)]
#[clap(
    name = "treedoc",
    version = env!("CARGO_PKG_VERSION"),
    about = "Render a directory tree and its text files into a paginated document",
    long_about = "Walks a directory, skipping hidden and well-known tool directories, and writes a document with a title page, the directory tree and one section per text file."
)]
pub struct Args {
    /// Directory to document
    #[clap(default_value = ".")]
    pub directory_path: String,

    /// Output document path (default: <directory name>.treedoc.<format>)
    pub output_file: Option<String>,

    /// Output document format
    #[clap(long, value_enum, default_value_t = OutputFormat::default())]
    pub format: OutputFormat,

    /// Comma-separated glob patterns; matching names are skipped at any depth
    #[clap(long, value_delimiter = ',')]
    pub ignore: Vec<String>,

    /// Body lines per page
    #[clap(long, default_value_t = Paginator::DEFAULT_LINES_PER_PAGE)]
    pub lines_per_page: usize,

    /// Files larger than this many bytes are noted instead of rendered
    #[clap(long, default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,

    /// Maximum depth below the directory (1 = direct children only)
    #[clap(long)]
    pub max_depth: Option<usize>,

    /// Do not follow symbolic links
    #[clap(long)]
    pub no_follow_links: bool,

    /// Include entries whose names start with '.'
    #[clap(long)]
    pub hidden: bool,

    /// Print the directory tree to stdout instead of writing a document
    #[clap(long)]
    pub tree_only: bool,

    /// Number of threads used to read files
    #[clap(long, default_value = "4")]
    pub threads: usize,

    /// No progress bar and no report
    #[clap(short, long)]
    pub quiet: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Generate shell completions
    #[clap(long = "generate", value_enum)]
    pub generate: Option<Shell>,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory to document
    pub target_dir: PathBuf,

    /// Output document path
    pub output_file: PathBuf,

    /// Output document format
    pub format: OutputFormat,

    /// User ignore patterns
    pub ignore_patterns: Vec<String>,

    /// Body lines per page
    pub lines_per_page: usize,

    /// Size limit for rendered files
    pub max_file_size: u64,

    /// Maximum traversal depth
    pub max_depth: Option<usize>,

    /// Whether symbolic links are followed
    pub follow_links: bool,

    /// Whether hidden entries are kept
    pub include_hidden: bool,

    /// Print the tree only
    pub tree_only: bool,

    /// Number of threads used to read files
    pub num_threads: usize,

    /// Suppress progress and report output
    pub quiet: bool,

    /// Verbosity level from `-v`
    pub verbosity: u8,
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args(args: Args) -> Self {
        let target_dir = PathBuf::from(&args.directory_path);
        let output_file = match args.output_file {
            Some(path) => PathBuf::from(path),
            None => default_output_file(&target_dir, args.format),
        };

        Self {
            target_dir,
            output_file,
            format: args.format,
            ignore_patterns: args.ignore,
            lines_per_page: args.lines_per_page,
            max_file_size: args.max_file_size,
            max_depth: args.max_depth,
            follow_links: !args.no_follow_links,
            include_hidden: args.hidden,
            tree_only: args.tree_only,
            num_threads: args.threads,
            quiet: args.quiet,
            verbosity: args.verbose,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.target_dir.is_dir(),
            Config,
            "Target directory not found: {}",
            self.target_dir.display()
        );
        ensure!(self.lines_per_page > 0, Config, "--lines-per-page must be at least 1");
        ensure!(self.num_threads > 0, Config, "--threads must be at least 1");
        ensure!(
            self.max_depth != Some(0),
            Config,
            "--max-depth must be at least 1"
        );

        if self.tree_only {
            return Ok(());
        }

        ensure!(
            !self.output_file.is_dir(),
            Config,
            "Output path is a directory: {}",
            self.output_file.display()
        );

        if let Some(parent) = self.output_file.parent() {
            ensure!(
                parent.as_os_str().is_empty() || parent.is_dir(),
                Config,
                "Output directory not found: {}",
                parent.display()
            );
        }

        Ok(())
    }

    /// Default tracing filter directive for the chosen verbosity
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Visibility policy; the output document itself is always excluded
    pub fn path_filter(&self) -> DefaultPathFilter {
        let filter = DefaultPathFilter::new()
            .with_ignore_patterns(self.ignore_patterns.iter().cloned())
            .include_hidden(self.include_hidden);

        if self.tree_only {
            filter
        } else {
            filter.with_excluded_path(absolute_output_path(&self.output_file))
        }
    }

    /// Scanner configured from the traversal options
    pub fn scanner(&self) -> DirectoryScanner {
        DirectoryScanner::new(Arc::new(self.path_filter())).with_options(ScanOptions {
            follow_links: self.follow_links,
            max_depth: self.max_depth,
        })
    }

    /// Document generator configured from the generation options
    pub fn generator(&self) -> DocumentGenerator {
        DocumentGenerator::new(self.scanner(), Arc::new(MimeClassifier::new())).with_options(
            GenerationOptions {
                lines_per_page: self.lines_per_page,
                max_file_size: self.max_file_size,
                placeholder: PLACEHOLDER,
            },
        )
    }
}

/// `<directory name>.treedoc.<ext>` in the current directory
fn default_output_file(target_dir: &Path, format: OutputFormat) -> PathBuf {
    let resolved = fs::canonicalize(target_dir).unwrap_or_else(|_| target_dir.to_path_buf());
    PathBuf::from(format!(
        "{}.treedoc.{}",
        root_display_name(&resolved),
        format.extension()
    ))
}

/// Absolute form of a path that may not exist yet
fn absolute_output_path(path: &Path) -> PathBuf {
    if let Ok(abs) = fs::canonicalize(path) {
        return abs;
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    match (fs::canonicalize(parent), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}
