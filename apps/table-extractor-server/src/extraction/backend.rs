//! Extraction backend trait

use std::path::Path;

use async_trait::async_trait;

use super::error::ExtractionError;
use super::ledger::JobHandle;
use super::types::{BackendName, ExtractionResult};

/// One external table-extraction capability
///
/// Implementations write their artifacts into `output_dir`, which the
/// orchestrator has already created empty. Per-table problems are logged and
/// skipped; only failures that prevent the whole run are returned as errors.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Backend identifier
    fn name(&self) -> BackendName;

    /// Extract every table from `input` into `output_dir`
    async fn extract(
        &self,
        input: &Path,
        output_dir: &Path,
        job: &mut JobHandle<'_>,
    ) -> Result<ExtractionResult, ExtractionError>;
}

/// Stem of the input file name, used to name artifacts
pub fn document_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Absolute form of a path for reporting
pub fn display_path(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
