//! Client-side checks on the selected file, run before any network activity.

use regex::Regex;

use crate::error::{ConfigError, ValidationError};
use crate::models::config::{DEFAULT_ACCEPTED_TYPES, DEFAULT_MAX_FILE_SIZE, UploadConfig};
use crate::models::file::SelectedFile;

/// Validates files against an accepted MIME pattern and a size ceiling.
#[derive(Debug, Clone)]
pub struct FileValidator {
    accepted_types: Regex,
    max_file_size: u64,
}

impl FileValidator {
    /// Create a validator. `accepted_types` is matched anywhere in the MIME type.
    pub fn new(accepted_types: &str, max_file_size: u64) -> Result<Self, ConfigError> {
        let accepted_types = Regex::new(accepted_types).map_err(|e| ConfigError::Invalid {
            key: "upload.accepted_types".to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            accepted_types,
            max_file_size,
        })
    }

    /// Create a validator from the upload configuration.
    pub fn from_config(config: &UploadConfig) -> Result<Self, ConfigError> {
        Self::new(&config.accepted_types, config.max_file_size)
    }

    /// Largest accepted file in bytes.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Check a selection. Presence, then type, then size.
    pub fn validate<'a>(
        &self,
        file: Option<&'a SelectedFile>,
    ) -> Result<&'a SelectedFile, ValidationError> {
        let file = file.ok_or(ValidationError::MissingFile)?;
        self.check(&file.mime_type, file.size())?;
        Ok(file)
    }

    /// Check a declared MIME type and size without the file contents.
    pub fn check(&self, mime_type: &str, size: u64) -> Result<(), ValidationError> {
        if !self.accepted_types.is_match(mime_type) {
            return Err(ValidationError::UnsupportedType(mime_type.to_string()));
        }

        if size > self.max_file_size {
            return Err(ValidationError::TooLarge {
                size,
                limit: self.max_file_size,
            });
        }

        Ok(())
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self {
            accepted_types: Regex::new(DEFAULT_ACCEPTED_TYPES).unwrap(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}
