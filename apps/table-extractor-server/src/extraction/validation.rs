//! Request path validation
//!
//! Runs before any backend and before any directory is touched.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Input file does not exist or is not a file.")]
    InputNotFound(String),

    #[error("Output path exists and is not a directory.")]
    OutputNotDirectory(String),
}

/// Input must be an existing regular file
pub fn validate_input_file(path: &Path) -> Result<(), ValidationError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ValidationError::InputNotFound(path.display().to_string()))
    }
}

/// Output root may be absent, but if present it must be a directory
pub fn validate_output_dir(path: &Path) -> Result<(), ValidationError> {
    if !path.exists() || path.is_dir() {
        Ok(())
    } else {
        Err(ValidationError::OutputNotDirectory(path.display().to_string()))
    }
}
