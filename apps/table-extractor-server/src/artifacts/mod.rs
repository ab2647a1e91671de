//! Artifact Module
//!
//! Everything a backend writes to disk: the styled HTML pages, CSV and
//! Excel files, and the HTML table parser that turns service-produced
//! markup back into rows and columns.

mod html;
mod table;
mod writer;

pub use html::{render_fallback_page, render_summary_page, render_table_page, TableOrigin, TablePage};
pub use table::{parse_html_table, TableData, TableParseError};
pub use writer::{write_csv, write_xlsx, ArtifactError, ArtifactKind, ArtifactWriter, WrittenTable};
