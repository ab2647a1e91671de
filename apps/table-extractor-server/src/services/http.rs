//! Shared HTTP plumbing for the service clients

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::Part;
use reqwest::{Client, Response};

use super::types::ServiceError;

/// Default request timeout for service calls
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;

/// Build a client with a request timeout
pub fn build_client(timeout: Duration) -> Result<Client, ServiceError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Read a file into a multipart part named after the file
pub async fn file_part(path: &Path) -> Result<Part, ServiceError> {
    let data = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    Ok(Part::bytes(data)
        .file_name(file_name)
        .mime_str(mime.as_ref())?)
}

/// Pass successful responses through, turn the rest into `ServiceError::Http`
pub async fn check_status(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Http {
        status: status.as_u16(),
        body,
    })
}

/// Join a base URL and a path without doubling slashes
pub fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// A configured, non-blank value, or the given error
pub fn required<'a>(value: &'a Option<String>, err: ServiceError) -> Result<&'a str, ServiceError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(err),
    }
}
