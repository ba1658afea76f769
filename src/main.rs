// Command-line front end for the batch converter.
// The engine itself lives in the library crate (lib.rs).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use image_batch_converter::core::{
    AppState, ChannelSink, ConverterConfig, ConverterEvent, ItemId, NotificationLevel,
    OptionsPatch, OutputScale, PartialDimensions, ProgressType, QualityPreset, ResizeMode,
    ResizePatch,
};
use image_batch_converter::export::{build_archive, completed_entries};
use image_batch_converter::history::{JsonFileStore, KeyValueStore, MemoryStore};
use image_batch_converter::processing::{BatchProcessor, RasterCodec};
use image_batch_converter::utils::{ImageFormat, read_source, write_output};

#[derive(Parser, Debug)]
#[command(name = "image-batch-converter")]
#[command(version, about = "Convert, resize and re-encode images in batches", long_about = None)]
struct Cli {
    /// Images to convert (png, jpeg, webp, bmp, avif)
    #[arg(value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Target format: jpeg, png, webp, bmp, avif, tiff, ico
    #[arg(short, long, value_parser = parse_format)]
    format: Option<ImageFormat>,

    /// Encoder quality for lossy formats
    #[arg(short, long, value_enum)]
    quality: Option<QualityArg>,

    /// Pre-scale: original, half, or a percentage (1-400)
    #[arg(long, value_parser = parse_scale)]
    scale: Option<ScaleArg>,

    /// Target width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Target height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Layout inside an explicit width×height
    #[arg(long, value_enum, default_value = "fit")]
    mode: ModeArg,

    /// Do not derive the missing axis from the aspect ratio
    #[arg(long)]
    stretch: bool,

    /// Rename pattern for archive entries, with {n} and {name} tokens
    #[arg(long)]
    rename: Option<String>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Package the results into a single ZIP archive
    #[arg(long)]
    zip: bool,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON file persisting history and rename pattern
    #[arg(long)]
    store: Option<PathBuf>,

    /// Print the conversion history and exit
    #[arg(long)]
    history: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum QualityArg {
    High,
    Medium,
    Low,
}

impl From<QualityArg> for QualityPreset {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::High => Self::High,
            QualityArg::Medium => Self::Medium,
            QualityArg::Low => Self::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Fit,
    Fill,
}

impl From<ModeArg> for ResizeMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Fit => Self::Fit,
            ModeArg::Fill => Self::Fill,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ScaleArg {
    scale: OutputScale,
    percent: Option<u32>,
}

fn parse_format(value: &str) -> Result<ImageFormat, String> {
    value.parse().map_err(|e: image_batch_converter::ConverterError| e.to_string())
}

fn parse_scale(value: &str) -> Result<ScaleArg, String> {
    match value.trim().to_lowercase().as_str() {
        "original" => Ok(ScaleArg { scale: OutputScale::Original, percent: None }),
        "half" => Ok(ScaleArg { scale: OutputScale::Half, percent: None }),
        other => other
            .trim_end_matches('%')
            .parse::<u32>()
            .map(|percent| ScaleArg { scale: OutputScale::Custom, percent: Some(percent) })
            .map_err(|_| format!("expected original, half or a percentage, got '{value}'")),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)         // Remove file path
        .with_line_number(false)  // Remove line numbers
        .with_thread_ids(false)   // Remove thread IDs
        .with_thread_names(false) // Remove thread names
        .with_target(false)       // Remove module path
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Logs events as they arrive; notifications are the user-facing part.
fn spawn_event_logger(mut rx: tokio::sync::mpsc::UnboundedReceiver<ConverterEvent>) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ConverterEvent::Notification(n) => match n.level {
                    NotificationLevel::Error => warn!("{}", n.message),
                    _ => info!("{}", n.message),
                },
                ConverterEvent::Batch(progress) if progress.progress_type == ProgressType::Progress => {
                    info!(
                        "[{}/{}] {}%",
                        progress.completed_tasks, progress.total_tasks, progress.progress_percentage
                    );
                }
                ConverterEvent::ItemProgress { id, progress } => debug!("{id}: {progress}%"),
                _ => {}
            }
        }
    });
}

fn open_store(path: Option<&Path>) -> Result<Arc<dyn KeyValueStore>> {
    Ok(match path {
        Some(path) => Arc::new(
            JsonFileStore::open(path)
                .with_context(|| format!("Failed to open store {}", path.display()))?,
        ),
        None => Arc::new(MemoryStore::new()),
    })
}

/// Applies the command-line settings to one freshly added item.
async fn configure_item(
    processor: &BatchProcessor<RasterCodec>,
    id: &ItemId,
    cli: &Cli,
) -> image_batch_converter::ConverterResult<()> {
    let state = processor.state();
    if let Some(format) = cli.format {
        state.set_target_format(id, format)?;
    }
    state.set_options(
        id,
        OptionsPatch {
            quality_preset: cli.quality.map(Into::into),
            output_scale: cli.scale.map(|s| s.scale),
            custom_scale_percent: cli.scale.and_then(|s| s.percent),
        },
    )?;

    if cli.width.is_some() || cli.height.is_some() {
        processor.ensure_dimensions(id).await?;
        state.update_resize(
            id,
            ResizePatch {
                maintain_aspect_ratio: Some(!cli.stretch),
                mode: Some(cli.mode.into()),
                ..Default::default()
            },
        )?;
        state.set_resize_target(id, PartialDimensions::new(cli.width, cli.height))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => ConverterConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ConverterConfig::default(),
    };
    if let Some(store) = &cli.store {
        config.store_path = Some(store.clone());
    }
    let store = open_store(config.store_path.as_deref())?;

    let (sink, rx) = ChannelSink::new();
    spawn_event_logger(rx);
    let state = AppState::new(config, store, Arc::new(sink));

    if cli.history {
        let history = state.history();
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }
    if cli.inputs.is_empty() {
        bail!("No input files given");
    }
    if let Some(pattern) = &cli.rename {
        state
            .set_rename_pattern(Some(pattern.clone()))
            .context("Failed to save rename pattern")?;
    }

    let mut sources = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        match read_source(path).await {
            Ok(source) => sources.push(source),
            Err(e) => warn!("Skipping {}: {e}", path.display()),
        }
    }

    let processor = BatchProcessor::new(state.clone(), RasterCodec::new());
    let report = state.add_files(sources);
    for id in &report.added {
        if let Err(e) = configure_item(&processor, id, &cli).await {
            warn!("Settings not applied to {id}: {e}");
        }
    }

    let summary = processor.convert_all().await?;

    if cli.zip {
        let entries = completed_entries(&state.registry(), state.rename_pattern().as_deref());
        if !entries.is_empty() {
            let bytes = build_archive(&entries)?;
            let path = cli.output.join(&state.config().archive_name);
            write_output(&path, &bytes).await?;
            info!("Wrote {}", path.display());
        }
    } else {
        let outputs: Vec<_> = state
            .registry()
            .completed()
            .filter_map(|item| Some((item.download_name()?, item.artifact()?.bytes.clone())))
            .collect();
        for (name, bytes) in outputs {
            let path = cli.output.join(name);
            write_output(&path, &bytes).await?;
            debug!("Wrote {}", path.display());
        }
    }

    info!(
        "Done: {} converted, {} failed, {} skipped",
        summary.succeeded, summary.failed, summary.skipped
    );
    if summary.failed > 0 {
        bail!("{} file(s) failed to convert", summary.failed);
    }
    Ok(())
}
