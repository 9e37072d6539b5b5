use serde::{Deserialize, Serialize};

/// Output container produced by a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Gif,
    Mp4,
}

impl OutputKind {
    /// Supported kinds in selection order. The first entry is the fallback.
    pub const SUPPORTED: [OutputKind; 2] = [OutputKind::Gif, OutputKind::Mp4];

    pub fn ext(self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Mp4 => "mp4",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Gif => "image/gif",
            Self::Mp4 => "video/mp4",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Gif => "GIF",
            Self::Mp4 => "MP4",
        }
    }

    /// Exact lookup by file extension.
    pub fn from_ext(ext: &str) -> Option<Self> {
        Self::SUPPORTED.into_iter().find(|k| k.ext() == ext)
    }

    /// Lookup by extension, falling back to the first supported kind.
    pub fn from_ext_or_default(ext: &str) -> Self {
        Self::from_ext(ext).unwrap_or(Self::SUPPORTED[0])
    }

    /// File name a conversion of this kind writes inside the engine filesystem.
    pub fn output_path(self) -> String {
        format!("output.{}", self.ext())
    }
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.ext())
    }
}

/// Externally visible conversion status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    Idle,
    Converting,
    Succeeded,
    Failed,
}

impl ConversionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Converting => "converting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Internal phase of a single conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Idle,
    Staging,
    Transcoding,
    ReadingOutput,
    Succeeded,
    Failed,
}

impl JobPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Staging => "staging",
            Self::Transcoding => "transcoding",
            Self::ReadingOutput => "reading_output",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
