//! Artifact Writer
//!
//! Writes table artifacts into a backend's output directory using the
//! `<stem>-table-<n>.<ext>` naming scheme.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use thiserror::Error;

use super::table::TableData;
use crate::extraction::{display_path, TableInfo};

/// Spreadsheet limits
const MAX_SHEET_ROWS: usize = 1_048_576;
const MAX_SHEET_COLUMNS: usize = 16_384;

const SHEET_NAME: &str = "Sheet1";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("table of {rows}x{columns} exceeds spreadsheet limits")]
    TooLarge { rows: usize, columns: usize },
}

/// Artifact kinds written per table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Csv,
    Html,
    Excel,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Html => "html",
            Self::Excel => "xlsx",
        }
    }
}

/// Writes artifacts for one document into one directory
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dest_dir: PathBuf,
    doc_stem: String,
}

impl ArtifactWriter {
    pub fn new(dest_dir: &Path, doc_stem: &str) -> Self {
        Self {
            dest_dir: dest_dir.to_path_buf(),
            doc_stem: doc_stem.to_string(),
        }
    }

    /// `<stem>-table-<number>.<ext>`, `number` is 1-based
    pub fn file_name(&self, number: usize, kind: ArtifactKind) -> String {
        format!("{}-table-{}.{}", self.doc_stem, number, kind.extension())
    }

    pub fn path(&self, number: usize, kind: ArtifactKind) -> PathBuf {
        self.dest_dir.join(self.file_name(number, kind))
    }

    /// `<stem>-all-tables.html`
    pub fn summary_path(&self) -> PathBuf {
        self.dest_dir.join(format!("{}-all-tables.html", self.doc_stem))
    }

    pub fn write_csv(&self, number: usize, table: &TableData) -> Result<PathBuf, ArtifactError> {
        let path = self.path(number, ArtifactKind::Csv);
        write_csv(table, &path)?;
        tracing::info!("Saved CSV: {}", path.display());
        Ok(path)
    }

    pub fn write_html(&self, number: usize, page: &str) -> Result<PathBuf, ArtifactError> {
        let path = self.path(number, ArtifactKind::Html);
        std::fs::write(&path, page)?;
        tracing::info!("Saved HTML: {}", path.display());
        Ok(path)
    }

    pub fn write_excel(&self, number: usize, table: &TableData) -> Result<PathBuf, ArtifactError> {
        let path = self.path(number, ArtifactKind::Excel);
        write_xlsx(table, &path)?;
        tracing::info!("Saved Excel: {}", path.display());
        Ok(path)
    }

    pub fn write_summary(&self, page: &str) -> Result<PathBuf, ArtifactError> {
        let path = self.summary_path();
        std::fs::write(&path, page)?;
        tracing::info!("Saved summary file: {}", path.display());
        Ok(path)
    }
}

/// Paths written for one table; the HTML page always exists
#[derive(Debug, Clone)]
pub struct WrittenTable {
    pub html: PathBuf,
    pub csv: Option<PathBuf>,
    pub excel: Option<PathBuf>,
}

impl WrittenTable {
    pub fn new(html: PathBuf) -> Self {
        Self {
            html,
            csv: None,
            excel: None,
        }
    }

    /// Report entry for the table
    pub fn into_table_info(self, table_index: usize, rows: usize, columns: usize) -> TableInfo {
        TableInfo {
            table_index,
            filename_csv: self.csv.as_deref().map(file_name),
            csv_path: self.csv.as_deref().map(display_path),
            filename_html: file_name(&self.html),
            html_path: display_path(&self.html),
            filename_excel: self.excel.as_deref().map(file_name),
            excel_path: self.excel.as_deref().map(display_path),
            rows,
            columns,
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Header line followed by one record per data row
pub fn write_csv(table: &TableData, path: &Path) -> Result<(), ArtifactError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Single-sheet workbook: bold header row, then data rows
pub fn write_xlsx(table: &TableData, path: &Path) -> Result<(), ArtifactError> {
    if table.row_count() + 1 > MAX_SHEET_ROWS || table.column_count() > MAX_SHEET_COLUMNS {
        return Err(ArtifactError::TooLarge {
            rows: table.row_count(),
            columns: table.column_count(),
        });
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, label) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, label, &header_format)?;
    }

    for (row_idx, row) in table.rows().iter().enumerate() {
        let sheet_row = (row_idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            match numeric_value(cell) {
                Some(number) => worksheet.write_number(sheet_row, col as u16, number)?,
                None => worksheet.write_string(sheet_row, col as u16, cell)?,
            };
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn numeric_value(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}
