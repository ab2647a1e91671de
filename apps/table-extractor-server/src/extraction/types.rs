//! Extraction Types
//!
//! Report shapes shared by every backend and the orchestrator.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Extraction backend identifier
///
/// Declaration order is the execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BackendName {
    /// Local document-structure parser (Docling)
    #[serde(rename = "structure-parser")]
    StructureParser,
    /// Cloud parsing API paired with a language model (LlamaParse + OpenAI)
    #[serde(rename = "cloud-parse")]
    CloudParse,
    /// Remote partitioning API (Unstructured)
    #[serde(rename = "partition-api")]
    PartitionApi,
}

impl BackendName {
    /// All backends in execution order
    pub const ALL: [BackendName; 3] = [
        BackendName::StructureParser,
        BackendName::CloudParse,
        BackendName::PartitionApi,
    ];

    /// Wire name, also used as the backend's output subdirectory
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StructureParser => "structure-parser",
            Self::CloudParse => "cloud-parse",
            Self::PartitionApi => "partition-api",
        }
    }
}

impl fmt::Display for BackendName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for one table written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Zero-based index of the table within the backend's output
    pub table_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_path: Option<String>,
    pub html_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excel_path: Option<String>,
    /// Data rows, header excluded
    pub rows: usize,
    pub columns: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename_csv: Option<String>,
    pub filename_html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename_excel: Option<String>,
}

/// Result of running one backend over one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub job_id: String,
    pub status: String,
    /// Stem of the input file name
    pub document_name: String,
    /// Wall-clock seconds spent inside the backend
    pub processing_time: f64,
    pub total_tables: usize,
    pub tables: Vec<TableInfo>,
    pub output_directory: String,
    pub message: String,
}

impl ExtractionResult {
    /// Build a completed result, deriving the summary message
    pub fn completed(
        job_id: &str,
        document_name: &str,
        processing_time: f64,
        total_tables: usize,
        tables: Vec<TableInfo>,
        output_directory: String,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: "completed".to_string(),
            document_name: document_name.to_string(),
            processing_time,
            total_tables,
            tables,
            output_directory,
            message: format!(
                "Successfully extracted {} tables in {:.2} seconds",
                total_tables, processing_time
            ),
        }
    }

    /// Note tables that were found but could not be saved
    pub fn with_skipped(mut self, skipped: usize) -> Self {
        if skipped > 0 {
            self.message = format!("{} ({} skipped)", self.message, skipped);
        }
        self
    }
}

/// Per-backend outcome: a result, or the error text for that backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackendOutcome {
    Success(ExtractionResult),
    Failure(String),
}

impl BackendOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn result(&self) -> Option<&ExtractionResult> {
        match self {
            Self::Success(result) => Some(result),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(message) => Some(message),
        }
    }
}

/// Outcomes keyed by backend, iterated in execution order
pub type OutcomeMap = BTreeMap<BackendName, BackendOutcome>;
