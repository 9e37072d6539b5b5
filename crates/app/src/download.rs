use std::path::{Path, PathBuf};

use giffer_core::OutputKind;
use tracing::{info, warn};

use crate::resource::BlobRegistry;

/// Base name used when the user leaves the filename empty.
pub const DEFAULT_FILENAME: &str = "mygif";

/// Starts a save of an object URL under a suggested file name. Nothing is
/// reported back to the caller.
pub trait DownloadTrigger: Send + Sync {
    fn trigger(&self, url: &str, suggested_filename: &str);
}

/// Transient link built for a single download, then discarded.
#[derive(Debug)]
pub struct DownloadLink {
    href: String,
    download: String,
}

impl DownloadLink {
    pub fn new(href: impl Into<String>, download: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            download: download.into(),
        }
    }

    /// Fire the link once. Consumes it.
    pub fn click(self, trigger: &dyn DownloadTrigger) {
        trigger.trigger(&self.href, &self.download);
    }
}

/// `<base>.<ext>`, with an empty base replaced by the default name.
pub fn download_filename(base: &str, kind: OutputKind) -> String {
    let base = base.trim();
    let base = if base.is_empty() { DEFAULT_FILENAME } else { base };
    format!("{base}.{}", kind.ext())
}

/// Saves downloads into a directory by resolving the object URL.
pub struct DirectoryDownloads {
    dir: PathBuf,
    registry: BlobRegistry,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>, registry: BlobRegistry) -> Self {
        Self {
            dir: dir.into(),
            registry,
        }
    }

    /// Where a download with this suggested name lands.
    pub fn target_path(&self, suggested_filename: &str) -> PathBuf {
        // Only the final path component is honored.
        let name = Path::new(suggested_filename)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_FILENAME.into());
        self.dir.join(name)
    }

    /// Path of a saved download, if the file is there with the expected
    /// size.
    pub fn saved_copy(&self, suggested_filename: &str, expected_len: u64) -> Option<PathBuf> {
        let target = self.target_path(suggested_filename);
        let meta = std::fs::metadata(&target).ok()?;
        (meta.is_file() && meta.len() == expected_len).then_some(target)
    }
}

impl DownloadTrigger for DirectoryDownloads {
    fn trigger(&self, url: &str, suggested_filename: &str) {
        let Some(blob) = self.registry.resolve(url) else {
            warn!(%url, "download requested for a revoked url");
            return;
        };
        let target = self.target_path(suggested_filename);

        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!(dir = ?self.dir, error = %e, "failed to create download dir");
            return;
        }
        match std::fs::write(&target, &blob.bytes) {
            Ok(()) => info!(path = ?target, bytes = blob.size(), "download saved"),
            Err(e) => warn!(path = ?target, error = %e, "failed to save download"),
        }
    }
}
