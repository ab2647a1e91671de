//! LlamaParse client
//!
//! Uploads a document, waits for the parsing job to finish and returns one
//! section per parsed page.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::http::{build_client, check_status, endpoint, file_part, required};
use super::types::{DocumentSection, SectionParser, ServiceError};

pub const DEFAULT_LLAMAPARSE_URL: &str = "https://api.cloud.llamaindex.ai";

#[derive(Debug, Clone)]
pub struct LlamaParseConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    /// Delay between job status checks
    pub poll_interval: Duration,
    /// Status checks before giving up on a job
    pub max_polls: u32,
}

impl Default for LlamaParseConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_LLAMAPARSE_URL.to_string(),
            timeout: Duration::from_secs(super::http::DEFAULT_HTTP_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(2),
            max_polls: 300,
        }
    }
}

pub struct LlamaParseClient {
    client: Client,
    config: LlamaParseConfig,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct JsonResult {
    #[serde(default)]
    pages: Vec<ParsedPage>,
}

#[derive(Debug, Deserialize)]
struct ParsedPage {
    #[serde(default)]
    md: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl LlamaParseClient {
    pub fn new(config: LlamaParseConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            config,
        })
    }

    async fn upload(&self, api_key: &str, input: &Path) -> Result<String, ServiceError> {
        let form = reqwest::multipart::Form::new()
            .part("file", file_part(input).await?)
            .text("result_type", "markdown")
            .text("extract_charts", "true")
            .text("auto_mode", "true")
            .text("auto_mode_trigger_on_image_in_page", "true")
            .text("auto_mode_trigger_on_table_in_page", "true");

        let response = self
            .client
            .post(endpoint(&self.config.base_url, "/api/parsing/upload"))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;
        let job: JobStatusResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::Decode(format!("Failed to parse upload response: {}", e)))?;

        tracing::debug!("LlamaParse job {} created ({})", job.id, job.status);
        Ok(job.id)
    }

    async fn wait_for_job(&self, api_key: &str, job_id: &str) -> Result<(), ServiceError> {
        let url = endpoint(&self.config.base_url, &format!("/api/parsing/job/{}", job_id));

        for _ in 0..self.config.max_polls {
            let response = self.client.get(&url).bearer_auth(api_key).send().await?;
            let job: JobStatusResponse = check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| ServiceError::Decode(format!("Failed to parse job status: {}", e)))?;

            if job_finished(job_id, &job.status)? {
                return Ok(());
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }

        Err(ServiceError::JobTimeout(job_id.to_string()))
    }

    async fn fetch_pages(&self, api_key: &str, job_id: &str) -> Result<Vec<DocumentSection>, ServiceError> {
        let url = endpoint(
            &self.config.base_url,
            &format!("/api/parsing/job/{}/result/json", job_id),
        );
        let response = self.client.get(&url).bearer_auth(api_key).send().await?;
        let result: JsonResult = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::Decode(format!("Failed to parse job result: {}", e)))?;

        Ok(sections_from_pages(result.pages))
    }
}

#[async_trait]
impl SectionParser for LlamaParseClient {
    async fn parse(&self, input: &Path) -> Result<Vec<DocumentSection>, ServiceError> {
        let api_key = required(
            &self.config.api_key,
            ServiceError::MissingCredentials("LLAMAPARSE_API_KEY"),
        )?;

        let job_id = self.upload(api_key, input).await?;
        self.wait_for_job(api_key, &job_id).await?;
        self.fetch_pages(api_key, &job_id).await
    }
}

/// `Ok(true)` when done, `Ok(false)` while pending
fn job_finished(job_id: &str, status: &str) -> Result<bool, ServiceError> {
    match status {
        "SUCCESS" => Ok(true),
        "ERROR" | "CANCELED" | "CANCELLED" => Err(ServiceError::JobFailed {
            job_id: job_id.to_string(),
            status: status.to_string(),
        }),
        _ => Ok(false),
    }
}

/// One section per page: markdown when available, plain text otherwise
fn sections_from_pages(pages: Vec<ParsedPage>) -> Vec<DocumentSection> {
    pages
        .into_iter()
        .map(|page| {
            let text = page
                .md
                .filter(|md| !md.trim().is_empty())
                .or(page.text)
                .unwrap_or_default();
            DocumentSection { text }
        })
        .collect()
}
