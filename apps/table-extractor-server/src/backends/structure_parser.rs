//! Structure parser backend
//!
//! One conversion call yields every table with its grid and the parser's own
//! HTML rendering. Each non-empty table is saved as CSV and HTML.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Local;

use crate::artifacts::{
    render_fallback_page, render_table_page, ArtifactError, ArtifactWriter, TableOrigin, TablePage,
    WrittenTable,
};
use crate::extraction::{
    display_path, document_stem, item_progress, BackendName, ExtractionBackend, ExtractionError,
    ExtractionResult, JobHandle, TableInfo,
};
use crate::services::{StructureParser, StructuredTable};

const NAME: BackendName = BackendName::StructureParser;

pub struct StructureParserBackend {
    parser: Arc<dyn StructureParser>,
}

impl StructureParserBackend {
    pub fn new(parser: Arc<dyn StructureParser>) -> Self {
        Self { parser }
    }
}

#[async_trait]
impl ExtractionBackend for StructureParserBackend {
    fn name(&self) -> BackendName {
        NAME
    }

    async fn extract(
        &self,
        input: &Path,
        output_dir: &Path,
        job: &mut JobHandle<'_>,
    ) -> Result<ExtractionResult, ExtractionError> {
        job.start(10, "Initializing DocumentConverter...");
        tracing::info!("[{}] Starting extraction for job {}", NAME, job.job_id());
        let start = Instant::now();

        job.progress(20, "Converting document...");
        let tables = self
            .parser
            .convert(input)
            .await
            .map_err(|e| ExtractionError::service(NAME, e))?;

        let doc_stem = document_stem(input);
        let writer = ArtifactWriter::new(output_dir, &doc_stem);
        let total = tables.len();
        job.progress(30, format!("Found {} tables. Processing...", total));

        let mut infos = Vec::new();
        let mut skipped = 0;
        for (ix, table) in tables.iter().enumerate() {
            job.progress(
                item_progress(30, 60, ix, total),
                format!("Processing table {}/{}...", ix + 1, total),
            );

            if table.data.is_empty() {
                tracing::warn!("[{}] Table {} is empty, skipping...", NAME, ix);
                continue;
            }

            match save_table(&writer, ix, table, &doc_stem) {
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
    table: &StructuredTable,
    doc_stem: &str,
) -> Result<TableInfo, ArtifactError> {
    let number = ix + 1;
    let rows = table.data.row_count();
    let columns = table.data.column_count();
    tracing::info!(
        "[{}] Processing Table {}: {} rows, {} columns",
        NAME,
        number,
        rows,
        columns
    );

    let csv = writer.write_csv(number, &table.data)?;

    let page = match &table.native_html {
        Ok(body) => render_table_page(&TablePage {
            number,
            document: doc_stem,
            origin: TableOrigin::Dimensions { rows, columns },
            generated_at: Local::now().naive_local(),
            body,
        }),
        Err(reason) => {
            tracing::warn!(
                "[{}] Native HTML export failed: {}. Using fallback rendering.",
                NAME,
                reason
            );
            render_fallback_page(number, doc_stem, &table.data.to_html())
        }
    };
    let html = writer.write_html(number, &page)?;

    let mut written = WrittenTable::new(html);
    written.csv = Some(csv);
    Ok(written.into_table_info(ix, rows, columns))
}
