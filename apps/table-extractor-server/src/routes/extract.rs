//! Table extraction route
//!
//! `POST /extract` takes a form naming a document already on the server, an
//! output directory and the backends to run. The response carries one entry
//! per enabled backend: the extraction result, or the error text.

use std::collections::BTreeSet;
use std::path::Path;

use axum::{extract::State, routing::post, Form, Json, Router};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::extraction::{BackendName, OutcomeMap};
use crate::state::AppState;

/// Create the extract router
pub fn router() -> Router<AppState> {
    Router::new().route("/extract", post(extract))
}

/// Extraction request form
#[derive(Debug, Deserialize)]
pub struct ExtractForm {
    /// Path of the input document on the server
    pub input_file_path: String,
    /// Output root; job directories are created below it
    pub output_dir: String,
    #[serde(deserialize_with = "form_bool")]
    pub docling: bool,
    #[serde(deserialize_with = "form_bool")]
    pub llamaparse: bool,
    #[serde(deserialize_with = "form_bool")]
    pub unstructured: bool,
}

impl ExtractForm {
    /// Backends switched on by the form
    pub fn enabled_backends(&self) -> BTreeSet<BackendName> {
        [
            (self.docling, BackendName::StructureParser),
            (self.llamaparse, BackendName::CloudParse),
            (self.unstructured, BackendName::PartitionApi),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub job_id: String,
    pub results: OutcomeMap,
}

async fn extract(
    State(state): State<AppState>,
    Form(form): Form<ExtractForm>,
) -> Result<Json<ExtractResponse>> {
    let enabled = form.enabled_backends();
    tracing::debug!(
        "Extraction requested for {} into {} ({:?})",
        form.input_file_path,
        form.output_dir,
        enabled
    );

    let report = state
        .orchestrator()
        .run(
            Path::new(&form.input_file_path),
            Path::new(&form.output_dir),
            &enabled,
        )
        .await?;

    Ok(Json(ExtractResponse {
        job_id: report.job_id,
        results: report.outcomes,
    }))
}

/// Parse an HTML form boolean
pub fn parse_form_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn form_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_form_bool(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid boolean: {:?}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{
        ExtractionBackend, ExtractionError, ExtractionErrorKind, ExtractionResult, JobHandle,
        Orchestrator, OrchestratorConfig,
    };
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct CountingBackend;

    #[async_trait]
    impl ExtractionBackend for CountingBackend {
        fn name(&self) -> BackendName {
            BackendName::StructureParser
        }

        async fn extract(
            &self,
            input: &Path,
            output_dir: &Path,
            job: &mut JobHandle<'_>,
        ) -> std::result::Result<ExtractionResult, ExtractionError> {
            job.start(10, "Initializing...");
            job.complete();
            Ok(ExtractionResult::completed(
                job.job_id(),
                &crate::extraction::document_stem(input),
                0.0,
                0,
                vec![],
                output_dir.display().to_string(),
            ))
        }
    }

    struct BrokenBackend;

    #[async_trait]
    impl ExtractionBackend for BrokenBackend {
        fn name(&self) -> BackendName {
            BackendName::PartitionApi
        }

        async fn extract(
            &self,
            _input: &Path,
            _output_dir: &Path,
            _job: &mut JobHandle<'_>,
        ) -> std::result::Result<ExtractionResult, ExtractionError> {
            Err(ExtractionError::new(
                BackendName::PartitionApi,
                ExtractionErrorKind::Credentials("UNSTRUCTURED_API_KEY is not set".to_string()),
            ))
        }
    }

    fn app() -> Router {
        let orchestrator = Orchestrator::new(OrchestratorConfig::default())
            .with_backend(Arc::new(CountingBackend))
            .with_backend(Arc::new(BrokenBackend));
        crate::routes::app(AppState::new(orchestrator))
    }

    fn form_request(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/extract")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn encode(value: &str) -> String {
        urlencoding::encode(value).into_owned()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_form_bool_values() {
        for value in ["true", "TRUE", "1", "yes", "on"] {
            assert_eq!(parse_form_bool(value), Some(true), "{}", value);
        }
        for value in ["false", "0", "No", "off"] {
            assert_eq!(parse_form_bool(value), Some(false), "{}", value);
        }
        assert_eq!(parse_form_bool("maybe"), None);
    }

    #[tokio::test]
    async fn test_missing_input_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out");
        let body = format!(
            "input_file_path={}&output_dir={}&docling=true&llamaparse=false&unstructured=false",
            encode(&dir.path().join("missing.pdf").display().to_string()),
            encode(&output.display().to_string()),
        );

        let response = app().oneshot(form_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["detail"], "Input file does not exist or is not a file.");
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_partial_failure_still_succeeds() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("report.pdf");
        std::fs::write(&input, b"%PDF-1.7").unwrap();
        let output = dir.path().join("out");
        let body = format!(
            "input_file_path={}&output_dir={}&docling=1&llamaparse=off&unstructured=yes",
            encode(&input.display().to_string()),
            encode(&output.display().to_string()),
        );

        let response = app().oneshot(form_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;

        let results = json["results"].as_object().unwrap();
        let keys: BTreeSet<&str> = results.keys().map(String::as_str).collect();
        assert_eq!(keys, BTreeSet::from(["partition-api", "structure-parser"]));
        assert_eq!(results["structure-parser"]["total_tables"], 0);
        assert!(results["partition-api"]
            .as_str()
            .unwrap()
            .contains("UNSTRUCTURED_API_KEY is not set"));

        let job_id = json["job_id"].as_str().unwrap();
        let job_dir = output.join("table_outputs").join(format!("job_{}", job_id));
        assert!(job_dir.join("structure-parser").is_dir());
        assert!(job_dir.join("partition-api").is_dir());
        assert!(!job_dir.join("cloud-parse").exists());
    }

    #[tokio::test]
    async fn test_paths_with_form_delimiters() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("q&a=1+2 #draft");
        std::fs::create_dir_all(&nested).unwrap();
        let input = nested.join("report.pdf");
        std::fs::write(&input, b"%PDF-1.7").unwrap();
        let output = nested.join("out");
        let body = format!(
            "input_file_path={}&output_dir={}&docling=true&llamaparse=false&unstructured=false",
            encode(&input.display().to_string()),
            encode(&output.display().to_string()),
        );

        let response = app().oneshot(form_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["results"]["structure-parser"]["document_name"], "report");
        assert!(output.join("table_outputs").is_dir());
    }

    #[tokio::test]
    async fn test_malformed_boolean_is_rejected() {
        let body = "input_file_path=%2Fx&output_dir=%2Fy&docling=maybe&llamaparse=0&unstructured=0";
        let response = app().oneshot(form_request(body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
