//! Service client types
//!
//! Capability traits for the external extraction services and the data they
//! hand back. Backends depend only on these traits, never on a transport.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::artifacts::TableData;

/// Service client error types
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service not configured: {0}")]
    NotConfigured(String),

    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("remote job {job_id} ended with status {status}")]
    JobFailed { job_id: String, status: String },

    #[error("remote job {0} did not finish in time")]
    JobTimeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Structure parser (Docling)
// ============================================================================

/// One table detected by the structure parser
#[derive(Debug, Clone)]
pub struct StructuredTable {
    /// Row/column view of the table
    pub data: TableData,
    /// The parser's own HTML rendering, or the reason it could not produce one
    pub native_html: Result<String, String>,
}

/// Converts a whole document and enumerates its tables
#[async_trait]
pub trait StructureParser: Send + Sync {
    async fn convert(&self, input: &Path) -> Result<Vec<StructuredTable>, ServiceError>;
}

// ============================================================================
// Cloud parser (LlamaParse) and text completion (OpenAI)
// ============================================================================

/// One parsed text section of a document, in document order
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSection {
    pub text: String,
}

/// Parses a document into ordered text sections
#[async_trait]
pub trait SectionParser: Send + Sync {
    async fn parse(&self, input: &Path) -> Result<Vec<DocumentSection>, ServiceError>;
}

/// Text-completion model
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ServiceError>;
}

// ============================================================================
// Partition API (Unstructured)
// ============================================================================

/// Fixed partition request parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionParameters {
    pub strategy: &'static str,
    pub split_pdf_page: bool,
    pub split_pdf_allow_failed: bool,
    pub split_pdf_concurrency_level: u32,
    pub extract_image_block_types: Vec<&'static str>,
    pub infer_table_structure: bool,
    pub chunking_strategy: &'static str,
    pub max_characters: u32,
    pub new_after_n_chars: u32,
    pub combine_text_under_n_chars: u32,
}

impl Default for PartitionParameters {
    fn default() -> Self {
        Self {
            strategy: "hi_res",
            split_pdf_page: true,
            split_pdf_allow_failed: true,
            split_pdf_concurrency_level: 15,
            extract_image_block_types: vec!["Image", "Table"],
            infer_table_structure: true,
            chunking_strategy: "by_title",
            max_characters: 4000,
            new_after_n_chars: 3800,
            combine_text_under_n_chars: 2000,
        }
    }
}

impl PartitionParameters {
    /// Form fields as sent to the partition endpoint
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("strategy", self.strategy.to_string()),
            ("split_pdf_page", self.split_pdf_page.to_string()),
            ("split_pdf_allow_failed", self.split_pdf_allow_failed.to_string()),
            (
                "split_pdf_concurrency_level",
                self.split_pdf_concurrency_level.to_string(),
            ),
            ("infer_table_structure", self.infer_table_structure.to_string()),
            ("chunking_strategy", self.chunking_strategy.to_string()),
            ("max_characters", self.max_characters.to_string()),
            ("new_after_n_chars", self.new_after_n_chars.to_string()),
            (
                "combine_text_under_n_chars",
                self.combine_text_under_n_chars.to_string(),
            ),
        ];
        for block_type in &self.extract_image_block_types {
            fields.push(("extract_image_block_types", block_type.to_string()));
        }
        fields
    }
}

/// Element returned by the partition API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartitionElement {
    #[serde(rename = "type", default)]
    pub element_type: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub metadata: ElementMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ElementMetadata {
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub text_as_html: Option<String>,
    #[serde(default)]
    pub image_base64: Option<String>,
}

impl PartitionElement {
    /// Tables, and anything carrying an HTML or image rendering
    pub fn is_table_like(&self) -> bool {
        self.element_type == "Table"
            || self.metadata.text_as_html.is_some()
            || self.metadata.image_base64.is_some()
    }
}

/// Partitions a whole file in one request
#[async_trait]
pub trait PartitionClient: Send + Sync {
    async fn partition(
        &self,
        input: &Path,
        params: &PartitionParameters,
    ) -> Result<Vec<PartitionElement>, ServiceError>;
}
