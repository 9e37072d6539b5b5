//! Capability interface of the media engine.
//!
//! The engine owns a private filesystem addressed by bare file names. The
//! conversion logic only ever talks to it through this trait.

use bytes::Bytes;

use crate::EngineError;

/// Result of a `stat` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
}

#[async_trait::async_trait]
pub trait Engine: Send + Sync {
    fn name(&self) -> &str;

    /// Prepare the engine. Called once per process.
    async fn load(&self) -> Result<(), EngineError>;

    async fn write_file(&self, path: &str, data: Bytes) -> Result<(), EngineError>;

    /// Run one transcode with ffmpeg-style arguments. Resolves when the
    /// output is complete; there are no partial results.
    async fn run(&self, args: &[String]) -> Result<(), EngineError>;

    async fn read_file(&self, path: &str) -> Result<Bytes, EngineError>;

    async fn stat(&self, path: &str) -> Result<FileStat, EngineError>;

    async fn remove_file(&self, path: &str) -> Result<(), EngineError>;
}
