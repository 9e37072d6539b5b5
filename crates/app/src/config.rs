use std::path::PathBuf;

use giffer_transcoder::{GifMode, TranscoderConfig};
use tracing::warn;

/// Runtime configuration, read from `GIFFER_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ffmpeg_path: PathBuf,
    pub scratch_dir: Option<PathBuf>,
    pub prefs_path: PathBuf,
    pub download_dir: PathBuf,
    pub auto_download: bool,
    pub gif_mode: GifMode,
    /// Decimal places in the displayed output size.
    pub size_decimals: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            scratch_dir: None,
            prefs_path: PathBuf::from("giffer-prefs.json"),
            download_dir: PathBuf::from("."),
            auto_download: true,
            gif_mode: GifMode::Palette,
            size_decimals: 2,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unparsable values keep the
    /// default and log a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("GIFFER_FFMPEG") {
            config.ffmpeg_path = v.into();
        }
        if let Some(v) = lookup("GIFFER_SCRATCH_DIR") {
            config.scratch_dir = Some(v.into());
        }
        if let Some(v) = lookup("GIFFER_PREFS") {
            config.prefs_path = v.into();
        }
        if let Some(v) = lookup("GIFFER_DOWNLOAD_DIR") {
            config.download_dir = v.into();
        }
        if let Some(v) = lookup("GIFFER_AUTO_DOWNLOAD") {
            match parse_bool(&v) {
                Some(b) => config.auto_download = b,
                None => warn!(value = %v, "invalid GIFFER_AUTO_DOWNLOAD, keeping default"),
            }
        }
        if let Some(v) = lookup("GIFFER_GIF_MODE") {
            match GifMode::parse(&v) {
                Some(mode) => config.gif_mode = mode,
                None => warn!(value = %v, "invalid GIFFER_GIF_MODE, keeping default"),
            }
        }
        if let Some(v) = lookup("GIFFER_SIZE_DECIMALS") {
            match v.trim().parse() {
                Ok(d) => config.size_decimals = d,
                Err(_) => warn!(value = %v, "invalid GIFFER_SIZE_DECIMALS, keeping default"),
            }
        }

        config
    }

    pub fn transcoder_config(&self) -> TranscoderConfig {
        TranscoderConfig {
            ffmpeg_path: self.ffmpeg_path.clone(),
            scratch_dir: self.scratch_dir.clone(),
            log_engine_output: true,
        }
    }
}

/// Whether `GIFFER_LOG_JSON` asks for JSON log lines. Read before the
/// subscriber exists, so it cannot log.
pub fn log_json_from_env() -> bool {
    std::env::var("GIFFER_LOG_JSON")
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(false)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert!(config.auto_download);
        assert_eq!(config.gif_mode, GifMode::Palette);
        assert!(config.scratch_dir.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GIFFER_FFMPEG", "/opt/ffmpeg/bin/ffmpeg"),
            ("GIFFER_AUTO_DOWNLOAD", "off"),
            ("GIFFER_GIF_MODE", "simple"),
            ("GIFFER_SIZE_DECIMALS", "0"),
            ("GIFFER_SCRATCH_DIR", "/tmp/giffer"),
        ]));
        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert!(!config.auto_download);
        assert_eq!(config.gif_mode, GifMode::Simple);
        assert_eq!(config.size_decimals, 0);
        let tc = config.transcoder_config();
        assert_eq!(tc.scratch_dir, Some(PathBuf::from("/tmp/giffer")));
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GIFFER_AUTO_DOWNLOAD", "maybe"),
            ("GIFFER_GIF_MODE", "dither"),
        ]));
        assert!(config.auto_download);
        assert_eq!(config.gif_mode, GifMode::Palette);
    }
}
