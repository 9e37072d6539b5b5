pub mod args;
pub mod engine;
pub mod ffmpeg;
pub mod handle;
pub mod job;
pub mod staging;

use std::path::PathBuf;
use thiserror::Error;

pub use engine::{Engine, FileStat};
pub use ffmpeg::FfmpegEngine;
pub use handle::{LoadState, TranscoderHandle};
pub use job::{ConversionJob, InFlight, InFlightGuard, JobOutput, StartRejected};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("ffmpeg not found at {0}")]
    BinaryNotFound(PathBuf),
    #[error("engine load failed: {0}")]
    LoadFailed(String),
    #[error("engine not loaded")]
    NotLoaded,
    #[error("invalid engine path: {0:?}")]
    InvalidPath(String),
    #[error("ffmpeg failed: {0}")]
    RunFailed(String),
    #[error("file not found in engine filesystem: {0}")]
    FileNotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// How GIF output is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GifMode {
    /// Two-pass palettegen/paletteuse filter graph.
    #[default]
    Palette,
    /// Single fps+scale filter with ffmpeg's default palette.
    Simple,
}

impl GifMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "palette" => Some(Self::Palette),
            "simple" => Some(Self::Simple),
            _ => None,
        }
    }
}

/// Transcoder configuration.
#[derive(Debug, Clone)]
pub struct TranscoderConfig {
    pub ffmpeg_path: PathBuf,
    /// Scratch directory backing the engine filesystem. `None` uses a fresh
    /// temp dir removed when the engine is dropped.
    pub scratch_dir: Option<PathBuf>,
    pub log_engine_output: bool,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            scratch_dir: None,
            log_engine_output: false,
        }
    }
}
