//! Background Removal CLI Tool
//!
//! `single` removes the background of one image and is also what runs when no
//! command is named; `batch` handles many files or directories with a bounded
//! number of concurrent removals. Every output is an RGBA PNG with color
//! cleared under fully transparent pixels.

use super::config::CliConfigBuilder;
use crate::{
    processor::{BackendFactory, BackgroundRemover, DefaultBackendFactory},
    services::{ImageIOService, TransparentColorMode},
    tracing_config::{spans, TracingConfig, TracingFormat},
};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, Instrument, Span};

/// Background removal CLI tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "remove-background")]
#[command(args_conflicts_with_subcommands = true, arg_required_else_help = true)]
pub struct Cli {
    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Console, global = true)]
    pub log_format: LogFormat,

    /// Tracing filter directives (e.g. `remove_background=trace`); overrides -v
    #[arg(long, value_name = "FILTER", global = true)]
    pub log_filter: Option<String>,

    /// List available backends and execution providers, then exit
    #[arg(long)]
    pub list_providers: bool,

    #[command(subcommand)]
    pub command: Option<Command>,

    // `single` arguments, used when no command is named
    #[command(flatten)]
    pub single: Option<SingleArgs>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Remove the background of a single image
    Single(SingleArgs),
    /// Remove the background of many images
    Batch(BatchArgs),
}

/// Model options shared by both commands
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Path to the ONNX segmentation model
    #[arg(short, long, value_name = "PATH")]
    pub model: PathBuf,

    /// Name of the model input the image is fed to
    #[arg(short, long, default_value = "input_image")]
    pub parameter: String,

    /// Model input and output size in pixels (square)
    #[arg(short, long, default_value_t = 320)]
    pub size: u32,

    /// JSON model configuration; overrides --size and --parameter
    #[arg(long, value_name = "FILE")]
    pub model_config: Option<PathBuf>,

    /// CUDA device index; runs on the CPU when absent
    #[arg(short, long, value_name = "DEVICE")]
    pub gpu: Option<u32>,

    /// Inference runtime [default: onnx when compiled in]
    #[arg(long, value_enum)]
    pub backend: Option<CliBackend>,

    /// Number of intra-op threads (0 = runtime default)
    #[arg(short, long, default_value_t = 0)]
    pub threads: usize,
}

#[derive(Args, Debug, Clone)]
pub struct SingleArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Input image
    #[arg(short, long, value_name = "INPUT")]
    pub input: PathBuf,

    /// Output PNG file
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Input images or directories
    #[arg(short, long, value_name = "INPUT", num_args = 1.., required = true)]
    pub input: Vec<PathBuf>,

    /// Output directory, created if missing
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Maximum number of images processed at once
    #[arg(short = 'c', long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,

    /// Prefix prepended to every output file name
    #[arg(short = 'f', long, default_value = "")]
    pub prefix: String,

    /// Search input directories recursively
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliBackend {
    Onnx,
    Tract,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum LogFormat {
    /// Colored console output
    Console,
    /// Plain compact output, for CI logs
    Compact,
    /// JSON lines (needs the `tracing-json` feature)
    Json,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli).context("Failed to initialize tracing")?;

    if cli.list_providers {
        show_provider_diagnostics();
        return Ok(());
    }

    match (cli.command, cli.single) {
        (Some(Command::Single(args)), _) | (None, Some(args)) => run_single(&args),
        (Some(Command::Batch(args)), _) => run_batch(args).await,
        (None, None) => {
            Cli::command().print_help()?;
            Ok(())
        },
    }
}

/// Tracing settings selected by the global logging flags
fn tracing_config(cli: &Cli) -> Result<TracingConfig> {
    let format = match cli.log_format {
        LogFormat::Console => TracingFormat::Console,
        LogFormat::Compact => TracingFormat::Compact,
        #[cfg(feature = "tracing-json")]
        LogFormat::Json => TracingFormat::Json,
        #[cfg(not(feature = "tracing-json"))]
        LogFormat::Json => {
            anyhow::bail!("JSON logs need a build with the 'tracing-json' feature")
        },
    };

    let mut config = TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(format);
    if let Some(filter) = &cli.log_filter {
        config = config.with_env_filter(filter.as_str());
    }
    Ok(config)
}

/// Initialize tracing based on verbosity level
fn init_tracing(cli: &Cli) -> Result<()> {
    tracing_config(cli)?
        .init()
        .context("Failed to initialize tracing subscriber")?;

    debug!(verbosity = cli.verbose, "Tracing initialized");
    Ok(())
}

/// Print compiled-in backends and ONNX Runtime execution providers
fn show_provider_diagnostics() {
    println!("Backend and Execution Provider Diagnostics");

    println!("\nAvailable backends:");
    for backend in DefaultBackendFactory.available_backends() {
        println!("  {backend}");
    }

    #[cfg(feature = "onnx")]
    {
        println!("\nONNX Runtime execution providers:");
        for line in provider_lines(&crate::backends::OnnxBackend::list_providers()) {
            println!("{line}");
        }
        println!("\nSelect CUDA with --gpu DEVICE; the CPU is used otherwise.");
    }
}

/// One line per execution provider: name, availability and description
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
fn provider_lines(providers: &[(String, bool, String)]) -> Vec<String> {
    providers
        .iter()
        .map(|(name, available, description)| {
            let status = if *available {
                "available"
            } else {
                "not available"
            };
            format!("  {name}: {status} - {description}")
        })
        .collect()
}

/// Validate the model arguments and load the model
fn load_remover(args: &ModelArgs) -> Result<BackgroundRemover> {
    CliConfigBuilder::validate_model_args(args)?;
    let config = CliConfigBuilder::from_model_args(args)?;

    info!(
        "Loading model: {}",
        args.model
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
    );

    BackgroundRemover::new(args.model.as_path(), config)
        .with_context(|| format!("Failed to load model {}", args.model.display()))
}

fn run_single(args: &SingleArgs) -> Result<()> {
    let start_time = Instant::now();

    if same_file(&args.input, &args.output) {
        anyhow::bail!(
            "Output {} would overwrite its input",
            args.output.display()
        );
    }

    let remover = load_remover(&args.model)?;

    info!("Processing {}", args.input.display());
    process_file(&remover, &args.input, &args.output)?;

    info!(
        "Background removed in {:.0}ms",
        start_time.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

async fn run_batch(args: BatchArgs) -> Result<()> {
    let start_time = Instant::now();

    let inputs = collect_inputs(&args.input, args.recursive)?;
    if inputs.is_empty() {
        warn!("No supported image files found in the provided inputs");
        return Ok(());
    }

    if !args.output.exists() {
        std::fs::create_dir_all(&args.output).with_context(|| {
            format!("Failed to create output directory: {}", args.output.display())
        })?;
    } else if !args.output.is_dir() {
        anyhow::bail!(
            "Output path exists and is not a directory: {}",
            args.output.display()
        );
    }

    let jobs = plan_outputs(&inputs, &args.output, &args.prefix)?;

    let remover = Arc::new(load_remover(&args.model)?);
    let concurrency = usize::from(args.concurrency);
    let span = spans::batch_processing(jobs.len(), concurrency);

    let (processed_count, failed_count) = process_batch(remover, jobs, concurrency)
        .instrument(span)
        .await?;

    let total_time = start_time.elapsed();
    info!("Batch processing summary:");
    info!("  Files processed: {}", processed_count);
    info!("  Files failed: {}", failed_count);
    info!("  Background removed in {:.0}ms", total_time.as_secs_f64() * 1000.0);

    if failed_count > 0 {
        anyhow::bail!("{failed_count} of {} file(s) failed", processed_count + failed_count);
    }
    Ok(())
}

/// Run every job with at most `concurrency` removals in flight
///
/// Returns the number of processed and failed files.
async fn process_batch(
    remover: Arc<BackgroundRemover>,
    jobs: Vec<(PathBuf, PathBuf)>,
    concurrency: usize,
) -> Result<(usize, usize)> {
    info!("Processing {} file(s)...", jobs.len());
    let semaphore = Arc::new(Semaphore::new(concurrency));

    let pb = ProgressBar::new(jobs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let mut handles = Vec::with_capacity(jobs.len());
    for (input, output) in jobs {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .context("Concurrency limiter closed")?;
        let remover = Arc::clone(&remover);
        let pb = pb.clone();
        let parent = Span::current();

        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let _parent = parent.entered();
            pb.set_message(input.display().to_string());
            let result = process_file(&remover, &input, &output);
            pb.inc(1);
            (input, result)
        }));
    }

    let mut processed_count = 0usize;
    let mut failed_count = 0usize;
    for handle in handles {
        let (input, result) = handle.await.context("Worker task failed")?;
        match result {
            Ok(()) => processed_count += 1,
            Err(e) => {
                error!("Failed to process {}: {:#}", input.display(), e);
                failed_count += 1;
            },
        }
    }

    pb.finish_with_message(format!(
        "Completed! Processed: {processed_count}, Failed: {failed_count}"
    ));

    Ok((processed_count, failed_count))
}

/// Remove the background of one file and save it as PNG
fn process_file(remover: &BackgroundRemover, input: &Path, output: &Path) -> Result<()> {
    let _span = spans::file_processing(input).entered();

    let result = remover
        .remove_background_from_path(input)
        .with_context(|| format!("Failed to remove background from {}", input.display()))?;

    info!("Saving {}", output.display());
    ImageIOService::save_png(&result, output, TransparentColorMode::Clear)
        .with_context(|| format!("Failed to save {}", output.display()))?;
    Ok(())
}

/// Expand files and directories into a sorted list of image files
fn collect_inputs(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut all_files = Vec::new();

    for path in inputs {
        if path.is_file() {
            if ImageIOService::is_supported_format(path) {
                all_files.push(path.clone());
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            all_files.extend(find_image_files(path, recursive)?);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    all_files.sort();
    all_files.dedup();
    Ok(all_files)
}

/// Find image files in a directory
fn find_image_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in walkdir::WalkDir::new(dir).max_depth(max_depth) {
        let entry = entry?;
        if entry.file_type().is_file() && ImageIOService::is_supported_format(entry.path()) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Output file for `input`: `PREFIX + stem + ".png"` inside `output_dir`
fn output_path_for(input: &Path, output_dir: &Path, prefix: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    output_dir.join(format!("{prefix}{stem}.png"))
}

/// Pair every input with its output, refusing plans that would overwrite an
/// input or write two results to the same file
fn plan_outputs(
    inputs: &[PathBuf],
    output_dir: &Path,
    prefix: &str,
) -> Result<Vec<(PathBuf, PathBuf)>> {
    let mut jobs = Vec::with_capacity(inputs.len());
    let sources: HashMap<PathBuf, &Path> = inputs
        .iter()
        .map(|input| (normalize(input), input.as_path()))
        .collect();
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();

    for input in inputs {
        let output = output_path_for(input, output_dir, prefix);
        let normalized = normalize(&output);

        if let Some(collision) = sources.get(&normalized) {
            anyhow::bail!(
                "Output {} would overwrite input {}; choose another output directory or a --prefix",
                output.display(),
                collision.display()
            );
        }

        if let Some(previous) = claimed.insert(normalized, input) {
            anyhow::bail!(
                "Inputs {} and {} would both be written to {}",
                previous.display(),
                input.display(),
                output.display()
            );
        }

        jobs.push((input.clone(), output));
    }

    Ok(jobs)
}

/// Absolute form of a path that may not exist yet
fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => std::fs::canonicalize(parent)
            .map(|dir| dir.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    normalize(a) == normalize(b)
}
