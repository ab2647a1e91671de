//! Extraction Orchestrator
//!
//! Runs the enabled backends for one document, one after another, and folds
//! their results into a single report. A backend that errors, panics or
//! times out only affects its own entry in the report.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::backend::ExtractionBackend;
use super::error::{ExtractionError, ExtractionErrorKind};
use super::ledger::{JobHandle, JobLedger, JobRecord};
use super::types::{BackendName, BackendOutcome, OutcomeMap};
use super::validation::{validate_input_file, validate_output_dir, ValidationError};

/// Directory under the output root that holds every job
pub const OUTPUTS_DIR: &str = "table_outputs";

/// Default upper bound for a single backend run
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to prepare job directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound for one backend run
    pub backend_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            backend_timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
        }
    }
}

/// Combined report for one job
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: String,
    pub outcomes: OutcomeMap,
    /// Final ledger record for the job
    pub job: JobRecord,
}

/// Fans a document out to the registered backends
pub struct Orchestrator {
    config: OrchestratorConfig,
    backends: BTreeMap<BackendName, Arc<dyn ExtractionBackend>>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            backends: BTreeMap::new(),
        }
    }

    /// Register a backend, replacing any previous one with the same name
    pub fn with_backend(mut self, backend: Arc<dyn ExtractionBackend>) -> Self {
        self.backends.insert(backend.name(), backend);
        self
    }

    /// Registered backends in execution order
    pub fn registered_backends(&self) -> Vec<BackendName> {
        self.backends.keys().copied().collect()
    }

    /// Run the enabled backends under a freshly generated job id
    pub async fn run(
        &self,
        input: &Path,
        output_root: &Path,
        enabled: &BTreeSet<BackendName>,
    ) -> Result<JobReport, OrchestratorError> {
        let job_id = Uuid::new_v4().to_string();
        self.run_with_job_id(&job_id, input, output_root, enabled)
            .await
    }

    /// Run the enabled backends under the given job id
    pub async fn run_with_job_id(
        &self,
        job_id: &str,
        input: &Path,
        output_root: &Path,
        enabled: &BTreeSet<BackendName>,
    ) -> Result<JobReport, OrchestratorError> {
        validate_input_file(input)?;
        validate_output_dir(output_root)?;

        let job_dir = job_directory(output_root, job_id);
        std::fs::create_dir_all(&job_dir).map_err(|source| OrchestratorError::Io {
            path: job_dir.display().to_string(),
            source,
        })?;

        tracing::info!(
            "Starting extraction job {} for file: {} (backends: {:?})",
            job_id,
            input.display(),
            enabled
        );

        let mut ledger = JobLedger::new();
        ledger.create(job_id);

        // Prepare every backend directory before the first backend runs
        let mut prepared: BTreeMap<BackendName, Result<PathBuf, ExtractionError>> =
            BTreeMap::new();
        for &name in enabled {
            let dir = job_dir.join(name.as_str());
            let prepared_dir = freshen_dir(&dir)
                .map(|_| dir)
                .map_err(|e| ExtractionError::io(name, e));
            prepared.insert(name, prepared_dir);
        }

        let mut outcomes = OutcomeMap::new();
        for (name, dir) in prepared {
            let mut job = ledger.handle(job_id);
            let outcome = match dir {
                Ok(dir) => self.run_backend(name, input, &dir, &mut job).await,
                Err(err) => {
                    tracing::error!("{}", err);
                    job.fail(&err.kind);
                    BackendOutcome::Failure(err.to_string())
                }
            };
            outcomes.insert(name, outcome);
        }

        tracing::info!("Extraction job {} completed.", job_id);

        let job = ledger.into_record(job_id);

        Ok(JobReport {
            job_id: job_id.to_string(),
            outcomes,
            job,
        })
    }

    async fn run_backend(
        &self,
        name: BackendName,
        input: &Path,
        output_dir: &Path,
        job: &mut JobHandle<'_>,
    ) -> BackendOutcome {
        let Some(backend) = self.backends.get(&name).cloned() else {
            let err = ExtractionError::new(name, ExtractionErrorKind::NotConfigured);
            tracing::error!("{}", err);
            job.fail(&err.kind);
            return BackendOutcome::Failure(err.to_string());
        };

        let timeout = self.config.backend_timeout;
        let run = AssertUnwindSafe(backend.extract(input, output_dir, job)).catch_unwind();

        let result = match tokio::time::timeout(timeout, run).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(ExtractionError::new(
                name,
                ExtractionErrorKind::Panicked(panic_message(panic.as_ref())),
            )),
            Err(_) => Err(ExtractionError::new(
                name,
                ExtractionErrorKind::Timeout(timeout.as_secs()),
            )),
        };

        match result {
            Ok(result) => {
                tracing::info!(
                    "{} extracted {} tables in {:.2}s",
                    name,
                    result.total_tables,
                    result.processing_time
                );
                BackendOutcome::Success(result)
            }
            Err(err) => {
                tracing::error!("{}", err);
                job.fail(&err.kind);
                BackendOutcome::Failure(err.to_string())
            }
        }
    }
}

/// `<output_root>/table_outputs/job_<job_id>`
pub fn job_directory(output_root: &Path, job_id: &str) -> PathBuf {
    output_root.join(OUTPUTS_DIR).join(format!("job_{}", job_id))
}

/// Remove a directory left by a previous run and recreate it empty
fn freshen_dir(dir: &Path) -> std::io::Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::create_dir_all(dir)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::ledger::JobStatus;
    use crate::extraction::types::ExtractionResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    enum Behaviour {
        Tables(usize),
        Fail(&'static str),
        Panic,
        Hang,
    }

    struct FakeBackend {
        name: BackendName,
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl FakeBackend {
        fn new(name: BackendName, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                name,
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ExtractionBackend for FakeBackend {
        fn name(&self) -> BackendName {
            self.name
        }

        async fn extract(
            &self,
            input: &Path,
            output_dir: &Path,
            job: &mut JobHandle<'_>,
        ) -> Result<ExtractionResult, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            job.start(10, "Initializing...");
            match self.behaviour {
                Behaviour::Tables(count) => {
                    for i in 0..count {
                        std::fs::write(output_dir.join(format!("t-{}.html", i)), "<table/>")
                            .unwrap();
                    }
                    job.complete();
                    Ok(ExtractionResult::completed(
                        job.job_id(),
                        &input.file_stem().unwrap().to_string_lossy(),
                        0.01,
                        count,
                        vec![],
                        output_dir.display().to_string(),
                    ))
                }
                Behaviour::Fail(msg) => Err(ExtractionError::new(
                    self.name,
                    ExtractionErrorKind::Service(msg.to_string()),
                )),
                Behaviour::Panic => panic!("parser exploded"),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!()
                }
            }
        }
    }

    fn input_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("quarterly.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();
        path
    }

    fn all_backends(behaviours: [Behaviour; 3]) -> Orchestrator {
        let [a, b, c] = behaviours;
        Orchestrator::new(OrchestratorConfig::default())
            .with_backend(FakeBackend::new(BackendName::StructureParser, a))
            .with_backend(FakeBackend::new(BackendName::CloudParse, b))
            .with_backend(FakeBackend::new(BackendName::PartitionApi, c))
    }

    #[tokio::test]
    async fn test_outcome_keys_match_enabled_subset() {
        let temp_dir = TempDir::new().unwrap();
        let input = input_file(&temp_dir);
        let orchestrator = all_backends([
            Behaviour::Tables(1),
            Behaviour::Tables(2),
            Behaviour::Tables(3),
        ]);

        let subsets: Vec<BTreeSet<BackendName>> = vec![
            BTreeSet::new(),
            [BackendName::CloudParse].into(),
            [BackendName::StructureParser, BackendName::PartitionApi].into(),
            BackendName::ALL.into(),
        ];

        for enabled in subsets {
            let report = orchestrator
                .run(&input, &temp_dir.path().join("out"), &enabled)
                .await
                .unwrap();
            let keys: BTreeSet<BackendName> = report.outcomes.keys().copied().collect();
            assert_eq!(keys, enabled);
        }
    }

    #[tokio::test]
    async fn test_failing_backend_does_not_affect_others() {
        let temp_dir = TempDir::new().unwrap();
        let input = input_file(&temp_dir);
        let orchestrator = all_backends([
            Behaviour::Tables(2),
            Behaviour::Fail("service unreachable"),
            Behaviour::Tables(1),
        ]);

        let report = orchestrator
            .run(&input, &temp_dir.path().join("out"), &BackendName::ALL.into())
            .await
            .unwrap();

        let failure = report.outcomes[&BackendName::CloudParse].error().unwrap();
        assert!(failure.contains("cloud-parse"));
        assert!(failure.contains("service unreachable"));
        assert_eq!(
            report.outcomes[&BackendName::StructureParser]
                .result()
                .unwrap()
                .total_tables,
            2
        );
        assert_eq!(
            report.outcomes[&BackendName::PartitionApi]
                .result()
                .unwrap()
                .total_tables,
            1
        );
        // Last backend succeeded, so the ledger ends completed
        assert_eq!(report.job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_panic_is_captured_as_failure() {
        let temp_dir = TempDir::new().unwrap();
        let input = input_file(&temp_dir);
        let orchestrator = all_backends([
            Behaviour::Panic,
            Behaviour::Tables(1),
            Behaviour::Tables(1),
        ]);

        let report = orchestrator
            .run(&input, &temp_dir.path().join("out"), &BackendName::ALL.into())
            .await
            .unwrap();

        let failure = report.outcomes[&BackendName::StructureParser].error().unwrap();
        assert!(failure.contains("structure-parser"));
        assert!(failure.contains("parser exploded"));
        assert!(report.outcomes[&BackendName::CloudParse].is_success());
        assert!(report.outcomes[&BackendName::PartitionApi].is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_backend_times_out() {
        let temp_dir = TempDir::new().unwrap();
        let input = input_file(&temp_dir);
        let orchestrator = Orchestrator::new(OrchestratorConfig {
            backend_timeout: Duration::from_secs(5),
        })
        .with_backend(FakeBackend::new(BackendName::PartitionApi, Behaviour::Hang))
        .with_backend(FakeBackend::new(BackendName::CloudParse, Behaviour::Tables(1)));

        let enabled: BTreeSet<_> = [BackendName::CloudParse, BackendName::PartitionApi].into();
        let report = orchestrator
            .run(&input, &temp_dir.path().join("out"), &enabled)
            .await
            .unwrap();

        let failure = report.outcomes[&BackendName::PartitionApi].error().unwrap();
        assert!(failure.contains("timed out after 5 seconds"));
        assert!(report.outcomes[&BackendName::CloudParse].is_success());
        assert_eq!(report.job.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_unregistered_backend_reports_failure() {
        let temp_dir = TempDir::new().unwrap();
        let input = input_file(&temp_dir);
        let orchestrator = Orchestrator::new(OrchestratorConfig::default());

        let report = orchestrator
            .run(
                &input,
                &temp_dir.path().join("out"),
                &[BackendName::StructureParser].into(),
            )
            .await
            .unwrap();

        let failure = report.outcomes[&BackendName::StructureParser].error().unwrap();
        assert!(failure.contains("structure-parser"));
        assert!(failure.contains("not configured"));
    }

    #[tokio::test]
    async fn test_missing_input_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FakeBackend::new(BackendName::StructureParser, Behaviour::Tables(1));
        let orchestrator =
            Orchestrator::new(OrchestratorConfig::default()).with_backend(backend.clone());
        let output_root = temp_dir.path().join("out");

        let err = orchestrator
            .run(
                &temp_dir.path().join("missing.pdf"),
                &output_root,
                &BackendName::ALL.into(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Validation(ValidationError::InputNotFound(_))
        ));
        assert!(!output_root.exists());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_output_root_that_is_a_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let input = input_file(&temp_dir);
        let output_root = temp_dir.path().join("out.txt");
        std::fs::write(&output_root, b"x").unwrap();

        let err = all_backends([
            Behaviour::Tables(1),
            Behaviour::Tables(1),
            Behaviour::Tables(1),
        ])
        .run(&input, &output_root, &BackendName::ALL.into())
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Validation(ValidationError::OutputNotDirectory(_))
        ));
    }

    #[tokio::test]
    async fn test_rerun_freshens_backend_directories() {
        let temp_dir = TempDir::new().unwrap();
        let input = input_file(&temp_dir);
        let output_root = temp_dir.path().join("out");
        let orchestrator = all_backends([
            Behaviour::Tables(1),
            Behaviour::Tables(0),
            Behaviour::Tables(0),
        ]);
        let enabled: BTreeSet<_> = [BackendName::StructureParser].into();

        orchestrator
            .run_with_job_id("fixed", &input, &output_root, &enabled)
            .await
            .unwrap();

        let backend_dir = job_directory(&output_root, "fixed").join("structure-parser");
        let stray = backend_dir.join("stray.csv");
        std::fs::write(&stray, "left over").unwrap();

        // A sibling outside the backend directory is left alone
        let sibling = output_root.join("keep.txt");
        std::fs::write(&sibling, "mine").unwrap();

        orchestrator
            .run_with_job_id("fixed", &input, &output_root, &enabled)
            .await
            .unwrap();

        assert!(!stray.exists());
        assert!(backend_dir.join("t-0.html").exists());
        assert!(sibling.exists());
    }

    #[tokio::test]
    async fn test_zero_tables_still_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let input = input_file(&temp_dir);
        let output_root = temp_dir.path().join("out");
        let orchestrator = all_backends([
            Behaviour::Tables(0),
            Behaviour::Tables(0),
            Behaviour::Tables(0),
        ]);

        let report = orchestrator
            .run(&input, &output_root, &[BackendName::PartitionApi].into())
            .await
            .unwrap();

        let dir = job_directory(&output_root, &report.job_id).join("partition-api");
        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
        assert_eq!(
            report.outcomes[&BackendName::PartitionApi]
                .result()
                .unwrap()
                .total_tables,
            0
        );
    }
}
