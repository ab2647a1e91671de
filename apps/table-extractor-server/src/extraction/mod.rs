//! Extraction Module
//!
//! Multi-backend table extraction jobs.
//!
//! The [`Orchestrator`] validates a request, prepares the job's output tree
//! and runs every enabled [`ExtractionBackend`] in turn. Each backend reports
//! progress through an exclusive [`JobHandle`] and ends up as one
//! [`BackendOutcome`] in the combined report.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use table_extractor_server::extraction::{BackendName, Orchestrator, OrchestratorConfig};
//!
//! let orchestrator = Orchestrator::new(OrchestratorConfig::default())
//!     .with_backend(structure_parser);
//!
//! let enabled = [BackendName::StructureParser].into_iter().collect();
//! let report = orchestrator.run(&input, &output_root, &enabled).await?;
//! ```

mod backend;
mod error;
mod ledger;
mod orchestrator;
mod types;
mod validation;

pub use backend::{display_path, document_stem, ExtractionBackend};
pub use error::{ExtractionError, ExtractionErrorKind};
pub use ledger::{item_progress, JobHandle, JobLedger, JobRecord, JobStatus};
pub use orchestrator::{
    job_directory, JobReport, Orchestrator, OrchestratorConfig, OrchestratorError,
    DEFAULT_BACKEND_TIMEOUT_SECS, OUTPUTS_DIR,
};
pub use types::{BackendName, BackendOutcome, ExtractionResult, OutcomeMap, TableInfo};
pub use validation::{validate_input_file, validate_output_dir, ValidationError};
