use bytes::Bytes;
use uuid::Uuid;

/// MIME hint used when the selection surface does not provide one.
pub const DEFAULT_INPUT_MIME: &str = "video/mp4";

/// A user-selected source file. Each selection gets a fresh identity, so two
/// selections of identical bytes are still different inputs.
#[derive(Debug, Clone)]
pub struct InputFile {
    id: Uuid,
    pub name: String,
    pub mime_hint: String,
    pub bytes: Bytes,
}

impl InputFile {
    pub fn new(bytes: impl Into<Bytes>, name: impl Into<String>, mime_hint: Option<&str>) -> Self {
        let mime_hint = match mime_hint {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => DEFAULT_INPUT_MIME.to_string(),
        };
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            mime_hint,
            bytes: bytes.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
