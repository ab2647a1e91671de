//! Tabular data
//!
//! Row/column view of a detected table plus the HTML table parser used to
//! recover that view from service-produced HTML.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Upper bound for a single `colspan`/`rowspan`
const MAX_SPAN: usize = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableParseError {
    #[error("no <table> element found")]
    NoTable,

    #[error("table has no cells")]
    EmptyTable,

    #[error("invalid selector: {0}")]
    Selector(String),
}

/// Column labels plus data rows; every row has exactly one cell per column
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableData {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableData {
    /// Build a table, padding short rows with empty cells.
    ///
    /// Rows wider than the header extend it with positional labels.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(columns.len()))
            .max()
            .unwrap_or(0);

        let mut columns = columns;
        while columns.len() < width {
            columns.push(columns.len().to_string());
        }

        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Self { columns, rows }
    }

    /// Build a table whose first `header_rows` grid rows label the columns.
    ///
    /// Multi-row headers are flattened per column with `separator`; without
    /// header rows the columns get positional labels.
    pub fn from_grid(grid: Vec<Vec<String>>, header_rows: usize, separator: &str) -> Self {
        let header_rows = header_rows.min(grid.len());
        let mut grid = grid;
        let body = grid.split_off(header_rows);
        let header = grid;

        let width = header
            .iter()
            .chain(body.iter())
            .map(Vec::len)
            .max()
            .unwrap_or(0);

        let columns = if header.is_empty() {
            (0..width).map(|i| i.to_string()).collect()
        } else {
            (0..width)
                .map(|col| flatten_header(&header, col, separator))
                .collect()
        };

        Self::new(columns, body)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True when the table has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Generic HTML rendering of the table
    pub fn to_html(&self) -> String {
        let mut html = String::from("<table border=\"1\" class=\"dataframe\">\n");
        html.push_str("  <thead>\n    <tr style=\"text-align: right;\">\n");
        for column in &self.columns {
            html.push_str(&format!(
                "      <th>{}</th>\n",
                html_escape::encode_text(column)
            ));
        }
        html.push_str("    </tr>\n  </thead>\n  <tbody>\n");
        for row in &self.rows {
            html.push_str("    <tr>\n");
            for cell in row {
                html.push_str(&format!("      <td>{}</td>\n", html_escape::encode_text(cell)));
            }
            html.push_str("    </tr>\n");
        }
        html.push_str("  </tbody>\n</table>");
        html
    }
}

fn flatten_header(header: &[Vec<String>], col: usize, separator: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for row in header {
        let Some(label) = row.get(col).map(|s| s.trim()) else {
            continue;
        };
        // Spanned header cells repeat their label; keep it once
        if !label.is_empty() && parts.last() != Some(&label) {
            parts.push(label);
        }
    }
    if parts.is_empty() {
        col.to_string()
    } else {
        parts.join(separator)
    }
}

// ============================================================================
// HTML table parsing
// ============================================================================

fn selector(source: &str) -> Result<Selector, TableParseError> {
    Selector::parse(source).map_err(|e| TableParseError::Selector(format!("{:?}", e)))
}

/// Parse the first `<table>` in an HTML fragment.
///
/// Header rows are the rows inside `<thead>`, or, when there is no
/// `<thead>`, the leading rows made only of `<th>` cells. `colspan` and
/// `rowspan` are expanded by repeating the cell text, and multi-row headers
/// are joined with a space.
pub fn parse_html_table(html: &str) -> Result<TableData, TableParseError> {
    let fragment = Html::parse_fragment(html);
    let table_selector = selector("table")?;
    let row_selector = selector("tr")?;

    let table = fragment
        .select(&table_selector)
        .next()
        .ok_or(TableParseError::NoTable)?;
    let has_thead = table
        .children()
        .filter_map(ElementRef::wrap)
        .any(|e| e.value().name() == "thead");

    let mut grid: Vec<Vec<String>> = Vec::new();
    let mut header_rows = 0;
    let mut in_header = true;
    let mut carry: Vec<Option<(usize, String)>> = Vec::new();

    // Rows of tables nested inside a cell belong to that cell's text
    let own_rows = table
        .select(&row_selector)
        .filter(|row| enclosing_table(*row) == Some(table));

    for row in own_rows {
        let cells: Vec<ElementRef> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|e| matches!(e.value().name(), "td" | "th"))
            .collect();

        if in_header {
            let is_header = if has_thead {
                parent_name(row) == Some("thead")
            } else {
                !cells.is_empty() && cells.iter().all(|c| c.value().name() == "th")
            };
            if is_header {
                header_rows += 1;
            } else {
                in_header = false;
            }
        }

        grid.push(expand_row(&cells, &mut carry));
    }

    // Rowspans reaching past the last row still occupy cells
    while carry.iter().any(Option::is_some) {
        grid.push(expand_row(&[], &mut carry));
    }

    if grid.iter().all(|r| r.is_empty()) {
        return Err(TableParseError::EmptyTable);
    }

    Ok(TableData::from_grid(grid, header_rows, " "))
}

fn parent_name<'a>(element: ElementRef<'a>) -> Option<&'a str> {
    element
        .parent()
        .and_then(ElementRef::wrap)
        .map(|parent| parent.value().name())
}

fn enclosing_table(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "table")
}

fn span_attr(cell: &ElementRef, name: &str) -> usize {
    cell.value()
        .attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(1)
        .min(MAX_SPAN)
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn take_carry(carry: &mut [Option<(usize, String)>], col: usize) -> Option<String> {
    let slot = carry.get_mut(col)?;
    let (remaining, text) = slot.as_mut()?;
    let value = text.clone();
    *remaining -= 1;
    if *remaining == 0 {
        *slot = None;
    }
    Some(value)
}

fn expand_row(cells: &[ElementRef], carry: &mut Vec<Option<(usize, String)>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut col = 0;

    for cell in cells {
        while let Some(text) = take_carry(carry, col) {
            out.push(text);
            col += 1;
        }

        let text = cell_text(cell);
        let colspan = span_attr(cell, "colspan");
        let rowspan = span_attr(cell, "rowspan");
        for _ in 0..colspan {
            if carry.len() <= col {
                carry.resize(col + 1, None);
            }
            if rowspan > 1 {
                carry[col] = Some((rowspan - 1, text.clone()));
            }
            out.push(text.clone());
            col += 1;
        }
    }

    // Carried cells to the right of the last explicit cell
    for c in col..carry.len() {
        if let Some(text) = take_carry(carry, c) {
            out.resize(c, String::new());
            out.push(text);
        }
    }

    out
}
