//! Unstructured partition API client

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::http::{build_client, check_status, file_part, required};
use super::types::{PartitionClient, PartitionElement, PartitionParameters, ServiceError};

pub const DEFAULT_UNSTRUCTURED_URL: &str = "https://api.unstructuredapp.io/general/v0/general";

#[derive(Debug, Clone)]
pub struct UnstructuredConfig {
    pub api_key: Option<String>,
    /// Full partition endpoint URL
    pub url: String,
    pub timeout: Duration,
}

impl Default for UnstructuredConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            url: DEFAULT_UNSTRUCTURED_URL.to_string(),
            timeout: Duration::from_secs(super::http::DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

pub struct UnstructuredClient {
    client: Client,
    config: UnstructuredConfig,
}

impl UnstructuredClient {
    pub fn new(config: UnstructuredConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            config,
        })
    }
}

#[async_trait]
impl PartitionClient for UnstructuredClient {
    async fn partition(
        &self,
        input: &Path,
        params: &PartitionParameters,
    ) -> Result<Vec<PartitionElement>, ServiceError> {
        let api_key = required(
            &self.config.api_key,
            ServiceError::MissingCredentials("UNSTRUCTURED_API_KEY"),
        )?;

        let mut form = reqwest::multipart::Form::new().part("files", file_part(input).await?);
        for (name, value) in params.form_fields() {
            form = form.text(name, value);
        }

        tracing::debug!("Partitioning {} via {}", input.display(), self.config.url);

        let response = self
            .client
            .post(&self.config.url)
            .header("unstructured-api-key", api_key)
            .header("accept", "application/json")
            .multipart(form)
            .send()
            .await?;

        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::Decode(format!("Failed to parse partition response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key() {
        let client = UnstructuredClient::new(UnstructuredConfig::default()).unwrap();
        let result = client
            .partition(Path::new("/nonexistent.pdf"), &PartitionParameters::default())
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::MissingCredentials("UNSTRUCTURED_API_KEY"))
        ));
    }
}
