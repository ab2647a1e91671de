//! Extraction Backends
//!
//! Adapters that turn one external extraction capability into
//! [`ExtractionBackend`](crate::extraction::ExtractionBackend) runs:
//! - `structure-parser`: document structure parser (CSV + HTML)
//! - `cloud-parse`: cloud section parser plus a language model (HTML + summary page)
//! - `partition-api`: remote partitioning service (HTML + Excel)

mod cloud_parse;
mod partition_api;
mod structure_parser;

pub use cloud_parse::{
    classify_reply, split_tables, CloudParseBackend, SectionReply, ERROR_PROCESSING,
    NO_TABLES_FOUND,
};
pub use partition_api::PartitionApiBackend;
pub use structure_parser::StructureParserBackend;
