//! Icon resources: raw payload plus a content identifier, shared by value.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

/// MIME type used when the file extension is unknown.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Resource identifier. Random, unique per loaded resource.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct ResourceId(Uuid);

impl ResourceId {
    pub fn generate() -> Self {
        ResourceId(Uuid::new_v4())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

/// Icon payload. Cloning shares the bytes; two clones keep the same identifier
/// and are sent once per packet.
#[derive(Debug, Clone)]
pub struct Resource {
    id: ResourceId,
    data: Arc<[u8]>,
    source_path: Option<PathBuf>,
    mime_type: String,
}

impl Resource {
    /// Read an icon from disk. MIME type is guessed from the extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| ResourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            id: ResourceId::generate(),
            data: data.into(),
            source_path: Some(path.to_path_buf()),
            mime_type: guess_mime_type(path).to_string(),
        })
    }

    /// Wrap in-memory bytes. No source path, so path-based icon modes fall back to a data URL.
    pub fn from_bytes(data: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        let data: Vec<u8> = data.into();
        Self {
            id: ResourceId::generate(),
            data: data.into(),
            source_path: None,
            mime_type: mime_type.into(),
        }
    }

    /// Reference a remote icon by URL (for `IconMode::HttpUrl`). The payload is
    /// still used when the mode falls back to a data URL.
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source_path = Some(source.into());
        self
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// Guess an image MIME type from a file extension (case-insensitive).
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("ico") => "image/x-icon",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        _ => DEFAULT_MIME_TYPE,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("failed to read icon {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
