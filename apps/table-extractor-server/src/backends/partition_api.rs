//! Partition API backend
//!
//! The whole file is partitioned in one request. Table-like elements are
//! saved as HTML pages and, when their HTML parses back into rows and
//! columns, as Excel workbooks.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Local;
use html_escape::encode_text;

use crate::artifacts::{
    parse_html_table, render_table_page, ArtifactError, ArtifactWriter, TableOrigin, TablePage,
    WrittenTable,
};
use crate::extraction::{
    display_path, document_stem, item_progress, BackendName, ExtractionBackend, ExtractionError,
    ExtractionResult, JobHandle, TableInfo,
};
use crate::services::{PartitionClient, PartitionElement, PartitionParameters};

const NAME: BackendName = BackendName::PartitionApi;

/// Table candidate pulled from a partition element
#[derive(Debug, Clone, PartialEq)]
struct TableCandidate {
    /// `text_as_html` when present
    html: Option<String>,
    text: String,
    page: Option<u32>,
}

impl TableCandidate {
    fn from_element(element: PartitionElement) -> Self {
        Self {
            html: element.metadata.text_as_html.filter(|h| !h.trim().is_empty()),
            text: element.text,
            page: element.metadata.page_number,
        }
    }

    /// Page body: the HTML rendering, or the raw text kept verbatim
    fn body(&self) -> Option<String> {
        match &self.html {
            Some(html) => Some(html.clone()),
            None if !self.text.trim().is_empty() => {
                Some(format!("<pre>{}</pre>", encode_text(&self.text)))
            }
            None => None,
        }
    }

    fn page_label(&self) -> String {
        self.page
            .map(|p| p.to_string())
            .unwrap_or_else(|| "UNKNOWN".to_string())
    }
}

pub struct PartitionApiBackend {
    client: Arc<dyn PartitionClient>,
    params: PartitionParameters,
}

impl PartitionApiBackend {
    pub fn new(client: Arc<dyn PartitionClient>) -> Self {
        Self {
            client,
            params: PartitionParameters::default(),
        }
    }
}

#[async_trait]
impl ExtractionBackend for PartitionApiBackend {
    fn name(&self) -> BackendName {
        NAME
    }

    async fn extract(
        &self,
        input: &Path,
        output_dir: &Path,
        job: &mut JobHandle<'_>,
    ) -> Result<ExtractionResult, ExtractionError> {
        job.start(10, "Initializing Unstructured client...");
        tracing::info!("[{}] Starting extraction for job {}", NAME, job.job_id());
        let start = Instant::now();

        job.progress(20, "Processing document with Unstructured...");
        let elements = self
            .client
            .partition(input, &self.params)
            .await
            .map_err(|e| ExtractionError::service(NAME, e))?;

        let candidates: Vec<TableCandidate> = elements
            .into_iter()
            .filter(PartitionElement::is_table_like)
            .map(TableCandidate::from_element)
            .collect();

        let doc_stem = document_stem(input);
        let writer = ArtifactWriter::new(output_dir, &doc_stem);
        let total = candidates.len();
        job.progress(30, format!("Found {} tables. Processing...", total));

        let mut infos = Vec::new();
        let mut skipped = 0;
        for (ix, candidate) in candidates.iter().enumerate() {
            job.progress(
                item_progress(30, 60, ix, total),
                format!("Processing table {}/{}...", ix + 1, total),
            );

            let Some(body) = candidate.body() else {
                tracing::warn!("[{}] Table {} has no content, skipping...", NAME, ix + 1);
                continue;
            };

            match save_table(&writer, ix, candidate, &body, &doc_stem, job) {
                Ok(info) => infos.push(info),
                Err(e) => {
                    skipped += 1;
                    job.warn(format!("[{}] Failed to save table {}: {}", NAME, ix + 1, e));
                }
            }
        }

        let processing_time = start.elapsed().as_secs_f64();
        job.complete();
        tracing::info!(
            "[{}] Extraction completed for job {}: {} tables in {:.2}s",
            NAME,
            job.job_id(),
            infos.len(),
            processing_time
        );

        Ok(ExtractionResult::completed(
            job.job_id(),
            &doc_stem,
            processing_time,
            infos.len(),
            infos,
            display_path(output_dir),
        )
        .with_skipped(skipped))
    }
}

fn save_table(
    writer: &ArtifactWriter,
    ix: usize,
    candidate: &TableCandidate,
    body: &str,
    doc_stem: &str,
    job: &mut JobHandle<'_>,
) -> Result<TableInfo, ArtifactError> {
    let number = ix + 1;
    let page = render_table_page(&TablePage {
        number,
        document: doc_stem,
        origin: TableOrigin::Page(candidate.page_label()),
        generated_at: Local::now().naive_local(),
        body,
    });
    let mut written = WrittenTable::new(writer.write_html(number, &page)?);

    let mut shape = (0, 0);
    match parse_html_table(body) {
        Ok(table) => {
            shape = (table.row_count(), table.column_count());
            match writer.write_excel(number, &table) {
                Ok(path) => written.excel = Some(path),
                Err(e) => job.warn(format!(
                    "[{}] Failed to convert HTML to Excel for table {}: {}",
                    NAME, number, e
                )),
            }
        }
        Err(e) => job.warn(format!(
            "[{}] Failed to convert HTML to Excel for table {}: {}",
            NAME, number, e
        )),
    }

    Ok(written.into_table_info(ix, shape.0, shape.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{JobLedger, JobStatus};
    use crate::services::{ElementMetadata, ServiceError};
    use tempfile::TempDir;

    struct FakePartition {
        elements: Vec<PartitionElement>,
    }

    #[async_trait]
    impl PartitionClient for FakePartition {
        async fn partition(
            &self,
            _input: &Path,
            params: &PartitionParameters,
        ) -> Result<Vec<PartitionElement>, ServiceError> {
            assert_eq!(params.strategy, "hi_res");
            Ok(self.elements.clone())
        }
    }

    struct RejectingPartition;

    #[async_trait]
    impl PartitionClient for RejectingPartition {
        async fn partition(
            &self,
            _input: &Path,
            _params: &PartitionParameters,
        ) -> Result<Vec<PartitionElement>, ServiceError> {
            Err(ServiceError::Http {
                status: 401,
                body: "invalid api key".to_string(),
            })
        }
    }

    fn element(kind: &str, text: &str, html: Option<&str>, page: Option<u32>) -> PartitionElement {
        PartitionElement {
            element_type: kind.to_string(),
            text: text.to_string(),
            metadata: ElementMetadata {
                page_number: page,
                text_as_html: html.map(str::to_string),
                image_base64: None,
            },
        }
    }

    async fn run(
        client: Arc<dyn PartitionClient>,
        dir: &TempDir,
    ) -> (Result<ExtractionResult, ExtractionError>, JobLedger) {
        let input = dir.path().join("invoice.pdf");
        std::fs::write(&input, b"%PDF-1.7").unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir_all(&out).unwrap();

        let backend = PartitionApiBackend::new(client);
        let mut ledger = JobLedger::new();
        let result = {
            let mut job = ledger.handle("job-1");
            backend.extract(&input, &out, &mut job).await
        };
        (result, ledger)
    }

    #[tokio::test]
    async fn test_tables_saved_with_excel() {
        let dir = TempDir::new().unwrap();
        let client = FakePartition {
            elements: vec![
                element("Title", "Invoice", None, Some(1)),
                element(
                    "Table",
                    "Item Price Bolt 3",
                    Some("<table><tr><th>Item</th><th>Price</th></tr><tr><td>Bolt</td><td>3</td></tr></table>"),
                    Some(2),
                ),
            ],
        };
        let (result, ledger) = run(Arc::new(client), &dir).await;
        let result = result.unwrap();

        assert_eq!(result.total_tables, 1);
        let info = &result.tables[0];
        assert_eq!((info.rows, info.columns), (1, 2));
        assert_eq!(info.filename_excel.as_deref(), Some("invoice-table-1.xlsx"));
        assert!(info.csv_path.is_none());

        let html = std::fs::read_to_string(&info.html_path).unwrap();
        assert!(html.contains("<strong>Page:</strong> 2 | "));
        assert_eq!(ledger.get("job-1").unwrap().status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_unparseable_table_keeps_html() {
        let dir = TempDir::new().unwrap();
        let client = FakePartition {
            elements: vec![element("Table", "Q1 <10> Q2", None, None)],
        };
        let (result, ledger) = run(Arc::new(client), &dir).await;
        let result = result.unwrap();

        assert_eq!(result.total_tables, 1);
        assert!(!result.message.contains("skipped"));
        let info = &result.tables[0];
        assert!(info.excel_path.is_none());

        let record = ledger.get("job-1").unwrap();
        assert_eq!(record.warnings.len(), 1);
        assert!(record.warnings[0]
            .starts_with("[partition-api] Failed to convert HTML to Excel for table 1"));
        assert_eq!((info.rows, info.columns), (0, 0));

        let html = std::fs::read_to_string(&info.html_path).unwrap();
        assert!(html.contains("<pre>Q1 &lt;10&gt; Q2</pre>"));
        assert!(html.contains("<strong>Page:</strong> UNKNOWN | "));
        assert!(!dir.path().join("out/invoice-table-1.xlsx").exists());
    }

    #[tokio::test]
    async fn test_no_table_elements() {
        let dir = TempDir::new().unwrap();
        let client = FakePartition {
            elements: vec![element("NarrativeText", "Hello", None, Some(1))],
        };
        let (result, _) = run(Arc::new(client), &dir).await;
        let result = result.unwrap();

        assert_eq!(result.total_tables, 0);
        let out = dir.path().join("out");
        assert!(out.is_dir());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_key_is_credentials_failure() {
        let dir = TempDir::new().unwrap();
        let (result, _) = run(Arc::new(RejectingPartition), &dir).await;
        let err = result.unwrap_err();
        assert!(matches!(
            err.kind,
            crate::extraction::ExtractionErrorKind::Credentials(_)
        ));
    }
}
