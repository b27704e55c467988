//! The file selected for upload.

use std::path::Path;

use image::ImageFormat;

/// MIME type used when the content cannot be identified.
pub const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// A file picked by the user, held in memory for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Original file name, without directories.
    pub name: String,

    /// Declared MIME type.
    pub mime_type: String,

    /// File contents.
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    /// Create a file from its parts.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, declaring the MIME type detected from its content.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("invoice")
            .to_string();
        let mime_type = sniff_mime_type(&bytes, &name).to_string();

        Ok(Self {
            name,
            mime_type,
            bytes,
        })
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Detect the MIME type of a file from its magic bytes, then its extension.
pub fn sniff_mime_type(bytes: &[u8], name: &str) -> &'static str {
    image::guess_format(bytes)
        .or_else(|_| ImageFormat::from_path(name))
        .map(|format| format.to_mime_type())
        .unwrap_or(UNKNOWN_MIME_TYPE)
}
