use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use giffer_app::config::{self, AppConfig};
use giffer_app::download::{DirectoryDownloads, download_filename};
use giffer_app::orchestrator::{ConvertOutcome, Orchestrator, OrchestratorSettings};
use giffer_app::prefs::{JsonFilePreferences, MemoryPreferences, PreferenceStore, Preferences};
use giffer_app::resource::BlobRegistry;
use giffer_core::InputFile;
use giffer_transcoder::{FfmpegEngine, TranscoderHandle};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "giffer", version, about = "Convert a video to GIF or MP4")]
struct Cli {
    /// Input video.
    input: PathBuf,

    /// Output kind (`gif` or `mp4`). Unknown values fall back to gif.
    #[arg(long)]
    kind: Option<String>,

    /// Output width in pixels.
    #[arg(long)]
    width: Option<String>,

    /// Output frame rate.
    #[arg(long)]
    fps: Option<String>,

    /// Output file name without extension.
    #[arg(long)]
    name: Option<String>,

    /// Remember the given options for later runs.
    #[arg(long)]
    save: bool,

    /// Do not save the result into the download directory.
    #[arg(long)]
    no_download: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(config::log_json_from_env());
    let config = AppConfig::from_env();
    let cli = Cli::parse();

    let file_prefs = JsonFilePreferences::open(&config.prefs_path);
    info!(path = ?file_prefs.path(), "preferences loaded");
    let store: Arc<dyn PreferenceStore> = if cli.save {
        Arc::new(file_prefs)
    } else {
        Arc::new(MemoryPreferences::from_entries(file_prefs.entries()))
    };

    let engine = Arc::new(FfmpegEngine::new(&config.transcoder_config()));
    let transcoder = Arc::new(TranscoderHandle::new(engine));
    let blobs = BlobRegistry::new();
    let downloads = Arc::new(DirectoryDownloads::new(&config.download_dir, blobs.clone()));
    let auto_download = config.auto_download && !cli.no_download;

    let orchestrator = Orchestrator::new(
        transcoder,
        blobs,
        downloads.clone(),
        Preferences::new(store),
        OrchestratorSettings {
            gif_mode: config.gif_mode,
            auto_download,
            size_decimals: config.size_decimals,
        },
    );

    if let Some(v) = &cli.width {
        orchestrator.set_width(v).context("failed to store width")?;
    }
    if let Some(v) = &cli.fps {
        orchestrator.set_fps(v).context("failed to store fps")?;
    }
    if let Some(v) = &cli.kind {
        orchestrator.set_output_kind(v).context("failed to store kind")?;
    }
    if let Some(v) = &cli.name {
        orchestrator.set_filename(v).context("failed to store file name")?;
    }

    orchestrator
        .load_engine()
        .await
        .context("failed to load ffmpeg")?;

    let bytes = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let name = cli
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    orchestrator.select_file(InputFile::new(bytes, name, mime_hint(&cli.input)));

    let outcome = orchestrator.convert().await;
    let result = match outcome {
        ConvertOutcome::Succeeded { url, size_display } => {
            let raw = orchestrator.raw_settings();
            info!(settings = ?raw, "done");
            if auto_download {
                saved_output(&orchestrator, &downloads, &url, &raw.filename).map(|path| {
                    println!(
                        "Converted {} ({size_display}) -> {}",
                        cli.input.display(),
                        path.display()
                    );
                })
            } else {
                println!("Converted {} ({size_display})", cli.input.display());
                Ok(())
            }
        }
        ConvertOutcome::Failed(e) => {
            eprintln!("{}", e.user_message());
            Err(anyhow::anyhow!(e))
        }
        ConvertOutcome::NotReady => Err(anyhow::anyhow!("engine not ready")),
        ConvertOutcome::Ignored(reason) => Err(anyhow::anyhow!("conversion not started: {reason:?}")),
        ConvertOutcome::Stale => Err(anyhow::anyhow!("conversion result was superseded")),
    };

    orchestrator.close();
    result
}

/// Locate the auto-downloaded copy of the output, failing when it was not
/// written.
fn saved_output(
    orchestrator: &Orchestrator,
    downloads: &DirectoryDownloads,
    url: &str,
    filename: &str,
) -> anyhow::Result<PathBuf> {
    let kind = orchestrator
        .snapshot()
        .output_kind
        .context("conversion finished without an output kind")?;
    let blob = orchestrator
        .blobs()
        .resolve(url)
        .context("output was released before it could be saved")?;
    let name = download_filename(filename, kind);
    downloads
        .saved_copy(&name, blob.size())
        .with_context(|| format!("failed to save {}", downloads.target_path(&name).display()))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn mime_hint(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "mov" => Some("video/quicktime"),
        "mkv" => Some("video/x-matroska"),
        "avi" => Some("video/x-msvideo"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}
