//! Cloud parse backend
//!
//! The document is parsed into sections by a cloud parser, then a language
//! model is asked to return each section's tables as HTML. Every recovered
//! table is saved as an HTML page, plus a CSV when the fragment parses into
//! rows and columns, and all fragments are collected in one summary page.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Local;

use crate::artifacts::{
    parse_html_table, render_summary_page, render_table_page, ArtifactError, ArtifactWriter,
    TableOrigin, TablePage, WrittenTable,
};
use crate::extraction::{
    display_path, document_stem, item_progress, BackendName, ExtractionBackend, ExtractionError,
    ExtractionResult, JobHandle, TableInfo,
};
use crate::services::{SectionParser, TextCompletion};

const NAME: BackendName = BackendName::CloudParse;

/// Model reply for a section without tables
pub const NO_TABLES_FOUND: &str = "NO_TABLES_FOUND";

/// Stand-in reply when the completion call fails
pub const ERROR_PROCESSING: &str = "ERROR_PROCESSING";

const SYSTEM_PROMPT: &str = "You are an expert at extracting and formatting tables from text. \
                             Return only HTML tables or 'NO_TABLES_FOUND'.";

fn table_prompt(text: &str) -> String {
    format!(
        "Please analyze the following text and extract any tables you find. \
         Convert each table to proper HTML format with:\n\
         1. Proper HTML table structure (<table>, <thead>, <tbody>, <tr>, <th>, <td>)\n\
         2. Clean, readable formatting\n\
         3. Preserve all data accurately\n\
         4. If multiple tables exist, separate them clearly\n\
         5. If no tables are found, return \"{sentinel}\"\n\
         \n\
         Text to analyze:\n\
         {text}\n\
         \n\
         Please return only the HTML table(s) or \"{sentinel}\":",
        sentinel = NO_TABLES_FOUND,
        text = text
    )
}

/// Classified model reply for one section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionReply {
    NoTables,
    Error,
    /// Table fragments in reply order; may be empty for prose-only replies
    Tables(Vec<String>),
}

/// Classify a model reply and recover its table fragments
pub fn classify_reply(reply: &str) -> SectionReply {
    match reply.trim() {
        NO_TABLES_FOUND => SectionReply::NoTables,
        ERROR_PROCESSING => SectionReply::Error,
        _ => SectionReply::Tables(split_tables(reply)),
    }
}

/// Split a reply on `</table>` and keep every part that opens a table.
///
/// Falls back to the whole reply when it mentions `<table` but no part
/// yields a fragment.
pub fn split_tables(reply: &str) -> Vec<String> {
    const OPEN: &str = "<table";
    const CLOSE: &str = "</table>";

    // ASCII lowercasing keeps byte offsets aligned with `reply`
    if !reply.to_ascii_lowercase().contains(OPEN) {
        return Vec::new();
    }

    let tables: Vec<String> = reply
        .split(CLOSE)
        .filter_map(|part| {
            part.to_ascii_lowercase()
                .find(OPEN)
                .map(|start| format!("{}{}", &part[start..], CLOSE))
        })
        .collect();

    if tables.is_empty() {
        vec![reply.to_string()]
    } else {
        tables
    }
}

pub struct CloudParseBackend {
    parser: Arc<dyn SectionParser>,
    completion: Arc<dyn TextCompletion>,
}

impl CloudParseBackend {
    pub fn new(parser: Arc<dyn SectionParser>, completion: Arc<dyn TextCompletion>) -> Self {
        Self { parser, completion }
    }

    async fn ask_for_tables(&self, section_number: usize, text: &str) -> String {
        match self.completion.complete(SYSTEM_PROMPT, &table_prompt(text)).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(
                    "[{}] Completion error in section {}: {}",
                    NAME,
                    section_number,
                    e
                );
                ERROR_PROCESSING.to_string()
            }
        }
    }
}

#[async_trait]
impl ExtractionBackend for CloudParseBackend {
    fn name(&self) -> BackendName {
        NAME
    }

    async fn extract(
        &self,
        input: &Path,
        output_dir: &Path,
        job: &mut JobHandle<'_>,
    ) -> Result<ExtractionResult, ExtractionError> {
        job.start(10, "Initializing LlamaParse...");
        tracing::info!("[{}] Starting extraction for job {}", NAME, job.job_id());
        let start = Instant::now();

        job.progress(20, "Processing document with LlamaParse...");
        let sections = self
            .parser
            .parse(input)
            .await
            .map_err(|e| ExtractionError::service(NAME, e))?;
        tracing::info!("[{}] Extracted {} document sections", NAME, sections.len());

        let total = sections.len();
        job.progress(
            40,
            format!("Found {} document sections. Processing with OpenAI...", total),
        );

        let doc_stem = document_stem(input);
        let writer = ArtifactWriter::new(output_dir, &doc_stem);
        let mut fragments: Vec<String> = Vec::new();
        let mut infos: Vec<TableInfo> = Vec::new();
        let mut skipped = 0;

        for (ix, section) in sections.iter().enumerate() {
            let section_number = ix + 1;
            job.progress(
                item_progress(40, 50, ix, total),
                format!("Processing section {}/{} with OpenAI...", section_number, total),
            );

            let reply = self.ask_for_tables(section_number, &section.text).await;
            let tables = match classify_reply(&reply) {
                SectionReply::NoTables => {
                    tracing::info!("[{}] No tables found in section {}", NAME, section_number);
                    continue;
                }
                SectionReply::Error => {
                    job.warn(format!("[{}] Error processing section {}", NAME, section_number));
                    continue;
                }
                SectionReply::Tables(tables) => tables,
            };

            for table_html in tables {
                let index = fragments.len();
                match save_table(&writer, index, section_number, &table_html, &doc_stem, job) {
                    Ok(info) => infos.push(info),
                    Err(e) => {
                        skipped += 1;
                        job.warn(format!("[{}] Failed to save table {}: {}", NAME, index + 1, e));
                    }
                }
                fragments.push(table_html);
            }
        }

        if !fragments.is_empty() {
            let summary = render_summary_page(&doc_stem, fragments.as_slice());
            if let Err(e) = writer.write_summary(&summary) {
                job.warn(format!("[{}] Failed to save summary file: {}", NAME, e));
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
    index: usize,
    section_number: usize,
    table_html: &str,
    doc_stem: &str,
    job: &mut JobHandle<'_>,
) -> Result<TableInfo, ArtifactError> {
    let number = index + 1;
    let page = render_table_page(&TablePage {
        number,
        document: doc_stem,
        origin: TableOrigin::Section(section_number),
        generated_at: Local::now().naive_local(),
        body: table_html,
    });
    let mut written = WrittenTable::new(writer.write_html(number, &page)?);

    let (rows, columns) = match parse_html_table(table_html) {
        Ok(table) => {
            match writer.write_csv(number, &table) {
                Ok(path) => written.csv = Some(path),
                Err(e) => job.warn(format!(
                    "[{}] Failed to save CSV for table {}: {}",
                    NAME, number, e
                )),
            }
            (table.row_count(), table.column_count())
        }
        Err(e) => {
            tracing::warn!("[{}] Table {} is not tabular HTML: {}", NAME, number, e);
            (0, 0)
        }
    };

    Ok(written.into_table_info(index, rows, columns))
}
