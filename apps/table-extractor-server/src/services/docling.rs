//! docling-serve client
//!
//! Converts a document through a `docling-serve` sidecar and reads the
//! tables out of the returned Docling JSON document.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use html_escape::encode_text;
use reqwest::Client;
use serde::Deserialize;

use super::http::{build_client, check_status, endpoint, file_part, required};
use super::types::{ServiceError, StructureParser, StructuredTable};
use crate::artifacts::TableData;

const CONVERT_PATH: &str = "/v1/convert/file";

/// Multi-row column headers are joined with this separator
const HEADER_SEPARATOR: &str = ".";

#[derive(Debug, Clone)]
pub struct DoclingConfig {
    /// docling-serve base URL, e.g. `http://localhost:5001`
    pub base_url: Option<String>,
    pub timeout: Duration,
}

pub struct DoclingServeClient {
    client: Client,
    base_url: Option<String>,
}

impl DoclingServeClient {
    pub fn new(config: DoclingConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            base_url: config.base_url,
        })
    }
}

#[async_trait]
impl StructureParser for DoclingServeClient {
    async fn convert(&self, input: &Path) -> Result<Vec<StructuredTable>, ServiceError> {
        let base = required(
            &self.base_url,
            ServiceError::NotConfigured("DOCLING_URL is not set".to_string()),
        )?;

        let form = reqwest::multipart::Form::new()
            .part("files", file_part(input).await?)
            .text("to_formats", "json")
            .text("do_table_structure", "true");

        tracing::debug!("Converting {} with docling-serve at {}", input.display(), base);

        let response = self
            .client
            .post(endpoint(base, CONVERT_PATH))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: ConvertResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(format!("Failed to parse conversion response: {}", e)))?;

        tables_from_response(body)
    }
}

// ============================================================================
// Response model (the subset of DoclingDocument used here)
// ============================================================================

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
    document: Option<ConvertedDocument>,
}

#[derive(Debug, Deserialize)]
struct ConvertedDocument {
    json_content: Option<DoclingDocument>,
}

#[derive(Debug, Deserialize)]
struct DoclingDocument {
    #[serde(default)]
    tables: Vec<DoclingTable>,
}

#[derive(Debug, Deserialize)]
struct DoclingTable {
    data: DoclingTableData,
}

#[derive(Debug, Default, Deserialize)]
struct DoclingTableData {
    #[serde(default)]
    num_rows: usize,
    #[serde(default)]
    num_cols: usize,
    #[serde(default)]
    grid: Vec<Vec<DoclingCell>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DoclingCell {
    #[serde(default)]
    text: String,
    #[serde(default = "one")]
    row_span: usize,
    #[serde(default = "one")]
    col_span: usize,
    #[serde(default)]
    start_row_offset_idx: usize,
    #[serde(default)]
    start_col_offset_idx: usize,
    #[serde(default)]
    column_header: bool,
}

fn one() -> usize {
    1
}

fn tables_from_response(body: ConvertResponse) -> Result<Vec<StructuredTable>, ServiceError> {
    if matches!(body.status.as_deref(), Some("failure")) {
        let errors = serde_json::to_string(&body.errors).unwrap_or_default();
        return Err(ServiceError::Decode(format!("conversion failed: {}", errors)));
    }

    let document = body
        .document
        .and_then(|d| d.json_content)
        .ok_or_else(|| ServiceError::Decode("response has no json_content".to_string()))?;

    Ok(document
        .tables
        .into_iter()
        .map(|table| StructuredTable {
            data: table_data(&table.data),
            native_html: native_html(&table.data),
        })
        .collect())
}

/// Grid values with the leading `column_header` rows as labels
fn table_data(data: &DoclingTableData) -> TableData {
    let header_rows = data
        .grid
        .iter()
        .take_while(|row| row.iter().any(|cell| cell.column_header))
        .count();

    let grid = data
        .grid
        .iter()
        .map(|row| row.iter().map(|cell| cell.text.clone()).collect())
        .collect();

    TableData::from_grid(grid, header_rows, HEADER_SEPARATOR)
}

/// Docling's own rendering: one element per spanning cell, header cells as `<th>`
fn native_html(data: &DoclingTableData) -> Result<String, String> {
    if data.grid.is_empty() {
        return Err("table grid is empty".to_string());
    }
    if data.grid.len() != data.num_rows {
        return Err(format!(
            "grid has {} rows, table declares {}",
            data.grid.len(),
            data.num_rows
        ));
    }

    let mut html = String::from("<table><tbody>");
    for (i, row) in data.grid.iter().enumerate() {
        if row.len() != data.num_cols {
            return Err(format!(
                "row {} has {} cells, table declares {}",
                i,
                row.len(),
                data.num_cols
            ));
        }
        html.push_str("<tr>");
        for (j, cell) in row.iter().enumerate() {
            if cell.start_row_offset_idx > i || cell.start_col_offset_idx > j {
                return Err(format!("cell ({}, {}) starts after its grid position", i, j));
            }
            // Covered by a spanning cell emitted earlier
            if cell.start_row_offset_idx != i || cell.start_col_offset_idx != j {
                continue;
            }
            let tag = if cell.column_header { "th" } else { "td" };
            html.push('<');
            html.push_str(tag);
            if cell.row_span > 1 {
                html.push_str(&format!(" rowspan=\"{}\"", cell.row_span));
            }
            if cell.col_span > 1 {
                html.push_str(&format!(" colspan=\"{}\"", cell.col_span));
            }
            html.push('>');
            html.push_str(&encode_text(&cell.text));
            html.push_str(&format!("</{}>", tag));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    Ok(html)
}
