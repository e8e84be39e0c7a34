use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::HeicuError;

/// Immutable handle to one user-supplied file.
///
/// Cloning is cheap and shares the bytes, which is how a re-run hands the
/// same original to a new job.
#[derive(Clone)]
pub struct InputFile {
    name: String,
    media_type: String,
    bytes: Arc<[u8]>,
}

impl InputFile {
    /// Creates a file handle from in-memory bytes. `media_type` is whatever
    /// the source declared and may be empty.
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: Arc::from(bytes),
        }
    }

    /// Reads a file from disk, guessing the declared media type from its extension.
    pub async fn read(path: &Path) -> Result<Self, HeicuError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| HeicuError::ReadInput {
                path: path.to_path_buf(),
                source: e,
            })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let media_type = Self::guess_media_type(path).unwrap_or_default();

        Ok(Self::new(name, media_type, bytes))
    }

    fn guess_media_type(path: &Path) -> Option<String> {
        mime_guess::from_path(path).first().map(|m| m.to_string())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True when both handles share the same underlying bytes.
    pub fn same_source(&self, other: &InputFile) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

impl fmt::Debug for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}
