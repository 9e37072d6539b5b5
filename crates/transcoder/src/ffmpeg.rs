use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use bytes::Bytes;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::engine::{Engine, FileStat};
use crate::{EngineError, TranscoderConfig};

/// Lines of ffmpeg stderr kept for diagnostics.
const STDERR_TAIL_LINES: usize = 20;

enum Scratch {
    Temp(TempDir),
    Fixed(PathBuf),
}

impl Scratch {
    fn path(&self) -> &Path {
        match self {
            Self::Temp(dir) => dir.path(),
            Self::Fixed(path) => path,
        }
    }
}

/// Engine backed by the `ffmpeg` binary. Its filesystem is a scratch
/// directory and every `run` is executed with that directory as cwd.
pub struct FfmpegEngine {
    ffmpeg_path: PathBuf,
    scratch_dir: Option<PathBuf>,
    log_output: bool,
    scratch: OnceLock<Scratch>,
}

impl FfmpegEngine {
    pub fn new(config: &TranscoderConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            scratch_dir: config.scratch_dir.clone(),
            log_output: config.log_engine_output,
            scratch: OnceLock::new(),
        }
    }

    /// Scratch directory, once loaded.
    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.get().map(Scratch::path)
    }

    fn prepare_scratch(&self) -> Result<&Path, EngineError> {
        if let Some(s) = self.scratch.get() {
            return Ok(s.path());
        }
        let scratch = match &self.scratch_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                Scratch::Fixed(dir.clone())
            }
            None => Scratch::Temp(tempfile::Builder::new().prefix("giffer-").tempdir()?),
        };
        Ok(self.scratch.get_or_init(|| scratch).path())
    }

    /// Map an engine path onto the scratch dir. Only bare file names are
    /// accepted.
    fn resolve(&self, path: &str) -> Result<PathBuf, EngineError> {
        let root = self.scratch_path().ok_or(EngineError::NotLoaded)?;
        if path.is_empty()
            || path == "."
            || path == ".."
            || path.contains(['/', '\\'])
            || Path::new(path).is_absolute()
        {
            return Err(EngineError::InvalidPath(path.to_string()));
        }
        Ok(root.join(path))
    }

    async fn version(&self) -> Result<String, EngineError> {
        let output = tokio::process::Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-version"])
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => EngineError::BinaryNotFound(self.ffmpeg_path.clone()),
                _ => EngineError::LoadFailed(format!("spawn: {e}")),
            })?;

        if !output.status.success() {
            return Err(EngineError::LoadFailed("ffmpeg -version failed".into()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().to_string())
    }
}

#[async_trait::async_trait]
impl Engine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn load(&self) -> Result<(), EngineError> {
        let version = self.version().await?;
        let scratch = self.prepare_scratch()?;
        info!(ffmpeg = ?self.ffmpeg_path, %version, scratch = ?scratch, "ffmpeg engine loaded");
        Ok(())
    }

    async fn write_file(&self, path: &str, data: Bytes) -> Result<(), EngineError> {
        let target = self.resolve(path)?;
        tokio::fs::write(&target, &data).await?;
        Ok(())
    }

    async fn run(&self, args: &[String]) -> Result<(), EngineError> {
        let cwd = self.scratch_path().ok_or(EngineError::NotLoaded)?;

        let output = tokio::process::Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-y"])
            .args(args)
            .current_dir(cwd)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .output()
            .await
            .map_err(|e| EngineError::RunFailed(format!("spawn: {e}")))?;

        let tail = stderr_tail(&output.stderr);
        if !output.status.success() {
            warn!(status = %output.status, stderr = %tail, "ffmpeg exited with error");
            return Err(EngineError::RunFailed(format!("exit status {}", output.status)));
        }
        if self.log_output {
            debug!(?args, stderr = %tail, "ffmpeg finished");
        }
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<Bytes, EngineError> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(EngineError::FileNotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn stat(&self, path: &str) -> Result<FileStat, EngineError> {
        let target = self.resolve(path)?;
        match tokio::fs::metadata(&target).await {
            Ok(meta) => Ok(FileStat { size: meta.len() }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(EngineError::FileNotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_file(&self, path: &str) -> Result<(), EngineError> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(EngineError::FileNotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
