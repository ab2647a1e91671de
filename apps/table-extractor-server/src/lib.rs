//! Table Extractor Server Library
//!
//! Runs a document through one or more external table-extraction services
//! and writes per-table CSV, HTML and Excel artifacts into a job directory.
//! The server binary is in main.rs.
//!
//! # Modules
//!
//! - `extraction`: job orchestration, job ledger and the backend contract
//! - `backends`: the three extraction backends
//! - `services`: HTTP clients for the external services
//! - `artifacts`: HTML templates, CSV/Excel writers and HTML table parsing
//! - `routes`: HTTP surface

pub mod artifacts;
pub mod backends;
pub mod config;
pub mod error;
pub mod extraction;
pub mod routes;
pub mod services;
pub mod state;
