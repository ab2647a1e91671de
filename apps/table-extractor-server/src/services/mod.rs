//! Service Clients
//!
//! Capability traits for the external extraction services plus their HTTP
//! implementations:
//! - docling-serve (document structure parser)
//! - LlamaParse (cloud section parser)
//! - OpenAI chat completions (text completion)
//! - Unstructured (partition API)

mod docling;
mod http;
mod llamaparse;
mod openai;
mod types;
mod unstructured;

pub use docling::{DoclingConfig, DoclingServeClient};
pub use http::DEFAULT_HTTP_TIMEOUT_SECS;
pub use llamaparse::{LlamaParseClient, LlamaParseConfig, DEFAULT_LLAMAPARSE_URL};
pub use openai::{OpenAiClient, OpenAiConfig, DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_URL};
pub use types::{
    DocumentSection, ElementMetadata, PartitionClient, PartitionElement, PartitionParameters,
    SectionParser, ServiceError, StructureParser, StructuredTable, TextCompletion,
};
pub use unstructured::{UnstructuredClient, UnstructuredConfig, DEFAULT_UNSTRUCTURED_URL};
