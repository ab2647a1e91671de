//! Job Ledger
//!
//! Per-request job status bookkeeping. The orchestrator owns the ledger and
//! lends each backend an exclusive [`JobHandle`] for the duration of its run,
//! so no status record is shared between concurrent requests.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Mutable status record for one job
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    /// Advisory progress percentage (0-100)
    pub progress: u8,
    pub message: String,
    /// Per-item problems that did not fail the run, in the order reported
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Index of the first warning raised by the current run
    #[serde(skip)]
    run_warnings_from: usize,
}

impl JobRecord {
    fn new(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: JobStatus::Pending,
            progress: 0,
            message: "Queued".to_string(),
            warnings: Vec::new(),
            completed_at: None,
            run_warnings_from: 0,
        }
    }
}

/// In-memory job table scoped to one request
#[derive(Debug, Default)]
pub struct JobLedger {
    jobs: HashMap<String, JobRecord>,
}

impl JobLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending job if it does not exist yet
    pub fn create(&mut self, job_id: &str) -> &JobRecord {
        self.jobs
            .entry(job_id.to_string())
            .or_insert_with(|| JobRecord::new(job_id))
    }

    /// Borrow an exclusive status handle for a job, creating it if needed
    pub fn handle(&mut self, job_id: &str) -> JobHandle<'_> {
        let record = self
            .jobs
            .entry(job_id.to_string())
            .or_insert_with(|| JobRecord::new(job_id));
        JobHandle { record }
    }

    pub fn get(&self, job_id: &str) -> Option<&JobRecord> {
        self.jobs.get(job_id)
    }

    /// Consume the ledger, returning the record for a job
    pub fn into_record(mut self, job_id: &str) -> JobRecord {
        self.jobs
            .remove(job_id)
            .unwrap_or_else(|| JobRecord::new(job_id))
    }
}

/// Exclusive handle used by a backend to report progress
#[derive(Debug)]
pub struct JobHandle<'a> {
    record: &'a mut JobRecord,
}

impl<'a> JobHandle<'a> {
    pub fn job_id(&self) -> &str {
        &self.record.job_id
    }

    pub fn record(&self) -> &JobRecord {
        self.record
    }

    /// Begin a backend run. Progress restarts from `progress`.
    pub fn start(&mut self, progress: u8, message: impl Into<String>) {
        self.record.status = JobStatus::Processing;
        self.record.progress = progress.min(100);
        self.record.message = message.into();
        self.record.completed_at = None;
        self.record.run_warnings_from = self.record.warnings.len();
        tracing::debug!(
            "Job {} [{}%]: {}",
            self.record.job_id,
            self.record.progress,
            self.record.message
        );
    }

    /// Advance progress; never moves backwards within a run
    pub fn progress(&mut self, progress: u8, message: impl Into<String>) {
        self.record.progress = self.record.progress.max(progress.min(100));
        self.record.message = message.into();
        tracing::debug!(
            "Job {} [{}%]: {}",
            self.record.job_id,
            self.record.progress,
            self.record.message
        );
    }

    /// Record a problem that skipped part of the output without failing the run
    pub fn warn(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        tracing::warn!("Job {}: {}", self.record.job_id, warning);
        self.record.warnings.push(warning);
    }

    /// Warnings raised since the current run started
    pub fn run_warnings(&self) -> &[String] {
        &self.record.warnings[self.record.run_warnings_from..]
    }

    pub fn complete(&mut self) {
        self.record.status = JobStatus::Completed;
        self.record.progress = 100;
        self.record.message = match self.run_warnings().len() {
            0 => "Processing completed successfully!".to_string(),
            n => format!("Processing completed with {} warnings", n),
        };
        self.record.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, reason: impl std::fmt::Display) {
        self.record.status = JobStatus::Failed;
        self.record.message = format!("Processing failed: {}", reason);
        self.record.completed_at = Some(Utc::now());
    }
}

/// Progress for item `index` of `total`, spread over `span` points after `base`
pub fn item_progress(base: u8, span: u8, index: usize, total: usize) -> u8 {
    if total == 0 {
        return base.saturating_add(span);
    }
    let step = (index as f64 / total as f64) * span as f64;
    base.saturating_add(step as u8)
}
