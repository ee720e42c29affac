//! # Space Image Compressor - Main Entry Point
//!
//! Front-end da riga di comando sopra al motore in memoria.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti con `clap` (sottocomandi `compress` e `inspect`)
//! - Inizializzazione del logging con `tracing` (sempre su stderr)
//! - Caricamento della configurazione e applicazione degli override CLI
//! - Lettura degli input e scrittura degli output su disco
//!
//! ## Flusso di `compress`:
//! 1. Carica la configurazione (file opzionale + flag)
//! 2. Espande file e directory in una lista di immagini
//! 3. Elabora a blocchi di `max_files_per_batch` file
//! 4. Scrive gli output (estensione del formato risolto) e il report JSON
//!
//! ## Esempio di utilizzo:
//! ```bash
//! image-compressor compress ./assets --format webp --output ./out --workers 4
//! image-compressor inspect logo.png
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use space_image_compressor::advisor;
use space_image_compressor::api::{self, BatchResponse, Limits, UploadedFile};
use space_image_compressor::batch::ProgressTracker;
use space_image_compressor::config::MAX_FILES_PER_BATCH;
use space_image_compressor::file_manager::FileManager;
use space_image_compressor::json_output::{JsonConfig, JsonMessage};
use space_image_compressor::progress::ProgressManager;
use space_image_compressor::{BatchRunner, CompressionResult, Config, OutputFormat, ProgressEvent};

const DEFAULT_CONFIG_FILE: &str = "image-compressor.json";

#[derive(Parser)]
#[command(name = "image-compressor")]
#[command(about = "Compress PNG, JPEG and WebP images without leaving memory")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compress files or whole directories
    Compress(CompressArgs),

    /// Analyse one image and suggest an output format
    Inspect {
        /// Image to analyse
        path: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct CompressArgs {
    /// Files or directories to compress
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Target format: original, png, jpeg or webp
    #[arg(short, long, default_value = "original")]
    format: OutputFormat,

    /// Directory for the compressed files (nothing is written when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Emit JSON-lines progress on stdout
    #[arg(long)]
    json: bool,

    /// Write the batch response as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Use only the built-in median-cut quantizer
    #[arg(long)]
    no_perceptual: bool,

    /// Skip the lossless post-optimization pass
    #[arg(long)]
    no_post_optimize: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log su stderr: stdout resta libero per JSON e report
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Command::Compress(args) => {
            let json = args.json;
            let outcome = run_compress(args).await;
            if let Err(e) = &outcome {
                if json {
                    JsonMessage::error("Compression failed".to_string(), Some(format!("{:#}", e))).emit();
                }
            }
            outcome
        }
        Command::Inspect { path, json } => run_inspect(&path, json).await,
    }
}

async fn run_compress(args: CompressArgs) -> Result<()> {
    let mut config = Config::from_file(&args.config).await?;
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if args.no_perceptual {
        config.perceptual_quantizer = false;
    }
    if args.no_post_optimize {
        config.post_optimize = false;
    }
    config.json_output = args.json;
    config.validate()?;

    if let Some(ref output_dir) = args.output {
        if output_dir.exists() && !output_dir.is_dir() {
            return Err(anyhow::anyhow!("Output path is not a directory: {}", output_dir.display()));
        }
    }

    let scanning = (!args.json).then(|| ProgressManager::spinner("Scanning for images..."));
    let files = FileManager::find_image_files(&args.paths)?;
    if let Some(spinner) = scanning {
        spinner.finish_and_clear();
    }
    if files.is_empty() {
        return Err(anyhow::anyhow!("No image files found"));
    }
    info!("Found {} image(s), target format: {}", files.len(), args.format);

    let (stop_sender, stop_receiver) = BatchRunner::create_cancellation_channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight files");
            stop_sender.send(()).ok();
        }
    });

    let limits = Limits::from(&config);
    let mut runner = BatchRunner::from_config(&config).with_cancellation(stop_receiver);
    let mut tracker = ProgressTracker::new(files.len(), config.json_output);
    if config.json_output {
        JsonMessage::start(files.len(), args.format, JsonConfig::from(&config)).emit();
    }

    let chunk_size = config.max_files_per_batch.min(MAX_FILES_PER_BATCH);
    let total = files.len();
    let mut results: Vec<CompressionResult> = Vec::with_capacity(total);

    for chunk in files.chunks(chunk_size) {
        let mut uploads = Vec::with_capacity(chunk.len());
        for path in chunk {
            let data = FileManager::read_file(path).await?;
            uploads.push(UploadedFile::new(FileManager::display_name(path), data));
        }

        let offset = results.len();
        let chunk_results = api::compress_uploads(uploads, args.format, &mut runner, &limits, |event| {
            tracker.handle_event(&ProgressEvent {
                index: offset + event.index,
                total,
                completed: offset + event.completed,
                result: event.result,
            })
        })
        .await?;

        if let Some(ref output_dir) = args.output {
            for (path, result) in chunk.iter().zip(&chunk_results) {
                write_output(path, output_dir, result).await?;
            }
        }
        results.extend(chunk_results);
    }

    let stats = tracker.finish();
    if !config.json_output {
        info!("{}", stats.format_summary());
    }

    if let Some(ref report_path) = args.report {
        let response = BatchResponse::from_results(&results);
        let report = serde_json::to_string_pretty(&response)?;
        FileManager::write_file(report_path, report.as_bytes()).await?;
        info!("Report written to {}", report_path.display());
    }

    Ok(())
}

async fn write_output(input: &Path, output_dir: &Path, result: &CompressionResult) -> Result<()> {
    let Some(format) = result.resolved_format else {
        return Ok(());
    };
    if !result.success {
        return Ok(());
    }
    let target = FileManager::output_path(input, output_dir, format)?;
    FileManager::write_file(&target, &result.encoded_data).await?;
    info!(
        "{} -> {} ({})",
        input.display(),
        target.display(),
        FileManager::format_size(result.compressed_size as u64)
    );
    Ok(())
}

async fn run_inspect(path: &Path, json: bool) -> Result<()> {
    let bytes = FileManager::read_file(path).await?;
    let report = match advisor::inspect(&bytes) {
        Ok(report) => report,
        Err(e) => {
            if json {
                JsonMessage::error(format!("Cannot inspect {}", path.display()), Some(e.to_string())).emit();
            }
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let source = &report.source;
    println!("File:          {}", path.display());
    println!("Format:        {}", source.format);
    println!("Dimensions:    {}x{}", source.width, source.height);
    println!("Color mode:    {:?}", source.color_mode);
    println!("Size:          {}", FileManager::format_size(bytes.len() as u64));
    println!("Colors:        {} ({})", report.distinct_colors, report.palette_bucket);
    println!("Transparency:  {}", if report.uses_transparency { "yes" } else { "no" });
    println!("Suggested:     {}", report.suggested_format);
    Ok(())
}
