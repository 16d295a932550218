/*!
 * Command-line interface for treedoc
 */

use std::io;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::ThreadPoolBuilder;
use tracing_subscriber::EnvFilter;

use treedoc::config::{Args, Config};
use treedoc::error::{ResultExt, TreeDocError};
use treedoc::pipeline::{spawn_generation, spawn_scan, PipelineEvent, PipelineHandle, RunOutcome};
use treedoc::report::{ReportFormat, Reporter};
use treedoc::tree::TreeRenderer;
use treedoc::utils::truncate_for_display;

fn main() -> io::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    if let Some(shell) = args.generate {
        let mut command = Args::command();
        clap_complete::generate(shell, &mut command, "treedoc", &mut io::stdout());
        return Ok(());
    }

    // Create and validate configuration
    let config = Config::from_args(args);
    init_logging(&config);
    config.validate()?;

    // Configure thread pool
    if let Err(e) = ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build_global()
        .with_context(|| "Failed to set thread pool size")
    {
        tracing::warn!("{}", e);
    }

    if config.tree_only {
        print_tree(&config)
    } else {
        write_document(&config)
    }
}

/// `RUST_LOG` wins over the `-v`/`--quiet` derived level
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn progress_bar(config: &Config, prefix: &'static str) -> ProgressBar {
    if config.quiet {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new(100);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}% {wide_msg:.dim.white}  Elapsed: {elapsed_precise}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress.set_prefix(prefix);
    progress.set_message(config.target_dir.display().to_string());
    progress
}

/// Feed pipeline events into the progress bar until the run ends
fn drive(mut handle: PipelineHandle, progress: &ProgressBar) -> RunOutcome {
    let mut outcome = RunOutcome::default();

    for event in handle.events().iter() {
        match &event {
            PipelineEvent::Progress(percent) => progress.set_position(u64::from(*percent)),
            PipelineEvent::EntryError(error) => {
                let path = error
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                progress.set_message(format!("skipped {}", truncate_for_display(&path, 50)));
            }
            _ => {}
        }
        outcome.record(event);
    }

    handle.join();
    outcome
}

fn failure_to_io(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::Other, message)
}

fn write_document(config: &Config) -> io::Result<()> {
    let progress = progress_bar(config, "Generating");

    let handle = spawn_generation(
        config.generator(),
        config.target_dir.clone(),
        config.format,
        config.output_file.clone(),
    )?;
    let outcome = drive(handle, &progress);
    progress.finish_and_clear();

    if let Some(failure) = outcome.failure {
        return Err(failure_to_io(failure));
    }

    let summary = outcome
        .summary
        .ok_or_else(|| TreeDocError::Unexpected("generation finished without a summary".into()))?;

    if !config.quiet {
        Reporter::new(ReportFormat::ConsoleTable).print_report(&summary);
    }

    Ok(())
}

fn print_tree(config: &Config) -> io::Result<()> {
    let progress = progress_bar(config, "Scanning");

    let handle = spawn_scan(config.scanner(), config.target_dir.clone())?;
    let outcome = drive(handle, &progress);
    progress.finish_and_clear();

    if let Some(failure) = outcome.failure {
        return Err(failure_to_io(failure));
    }

    let scan = outcome
        .structure
        .ok_or_else(|| TreeDocError::Unexpected("scan finished without a result".into()))?;

    println!("{}", TreeRenderer::render_to_string(&scan, &scan.root_name()));

    if !scan.errors.is_empty() && !config.quiet {
        eprintln!(
            "\n{}",
            Reporter::new(ReportFormat::ConsoleTable).errors_table(&scan.errors)
        );
    }

    Ok(())
}
