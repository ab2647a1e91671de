//! HTML page templates
//!
//! Every table artifact is embedded in the same styled page. The output is
//! fully determined by its inputs; only the generation timestamp and the
//! table body differ between two tables of the same document.

use chrono::NaiveDateTime;
use html_escape::encode_text;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BASE_STYLE: &str = r#"        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 20px;
            background-color: #f5f5f5;
        }
        .container {
            max-width: 1200px;
            margin: 0 auto;
            background: white;
            padding: 20px;
            border-radius: 8px;
            box-shadow: 0 2px 10px rgba(0,0,0,0.1);
        }
        h1 {
            color: #333;
            border-bottom: 3px solid #667eea;
            padding-bottom: 10px;
        }
"#;

const SECTION_STYLE: &str = r#"        .table-section {
            margin: 30px 0;
            padding: 20px;
            border: 1px solid #ddd;
            border-radius: 8px;
        }
"#;

const TABLE_STYLE: &str = r#"        table {
            border-collapse: collapse;
            width: 100%;
            margin-top: 20px;
        }
        th {
            background: #667eea;
            color: white;
            padding: 12px;
            text-align: left;
        }
        td {
            border: 1px solid #ddd;
            padding: 10px;
        }
        tr:nth-child(even) {
            background-color: #f9f9f9;
        }
        tr:hover {
            background-color: #f5f5f5;
        }
        .stats {
            background: #f8f9fa;
            padding: 15px;
            border-radius: 6px;
            margin-bottom: 20px;
        }
"#;

/// Where a table came from, shown in the page's stats block
#[derive(Debug, Clone, PartialEq)]
pub enum TableOrigin {
    /// Table shape, for backends that produce a grid
    Dimensions { rows: usize, columns: usize },
    /// 1-based section of the parsed document
    Section(usize),
    /// Page label reported by the service
    Page(String),
}

/// Inputs for one table page
#[derive(Debug, Clone)]
pub struct TablePage<'a> {
    /// 1-based table number
    pub number: usize,
    pub document: &'a str,
    pub origin: TableOrigin,
    pub generated_at: NaiveDateTime,
    /// Table markup, embedded as-is
    pub body: &'a str,
}

fn head(title: &str, extra_style: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n    <meta charset=\"UTF-8\">\n    \
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n    \
         <title>{}</title>\n    <style>\n{}{}{}    </style>\n</head>\n",
        title, BASE_STYLE, extra_style, TABLE_STYLE
    )
}

/// Styled page for a single table
pub fn render_table_page(page: &TablePage<'_>) -> String {
    let document = encode_text(page.document);
    let origin = match &page.origin {
        TableOrigin::Dimensions { rows, columns } => format!(
            "<strong>Rows:</strong> {} | \n            <strong>Columns:</strong> {} | ",
            rows, columns
        ),
        TableOrigin::Section(section) => format!("<strong>Section:</strong> {} | ", section),
        TableOrigin::Page(label) => format!("<strong>Page:</strong> {} | ", encode_text(label)),
    };

    let mut html = head(&format!("Table {} - {}", page.number, document), "");
    html.push_str(&format!(
        "<body>\n    <div class=\"container\">\n        <h1>📊 Table {}</h1>\n        \
         <div class=\"stats\">\n            <strong>Document:</strong> {}<br>\n            \
         {}\n            <strong>Generated:</strong> {}\n        </div>\n        {}\n    \
         </div>\n</body>\n</html>",
        page.number,
        document,
        origin,
        page.generated_at.format(TIMESTAMP_FORMAT),
        page.body
    ));
    html
}

/// Minimal page used when the styled export is unavailable
pub fn render_fallback_page(number: usize, document: &str, table_html: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><title>Table {n}</title></head>\n\
         <body><h1>Table {n} - {doc}</h1>\n{table}</body></html>",
        n = number,
        doc = encode_text(document),
        table = table_html
    )
}

/// One page aggregating every table fragment, in discovery order
pub fn render_summary_page<S: AsRef<str>>(document: &str, fragments: &[S]) -> String {
    let document = encode_text(document);
    let sections: String = fragments
        .iter()
        .map(|f| format!("<div class=\"table-section\">{}</div>", f.as_ref()))
        .collect();

    let mut html = head(&format!("All Tables - {}", document), SECTION_STYLE);
    html.push_str(&format!(
        "<body>\n    <div class=\"container\">\n        <h1>All Tables - {}</h1>\n        \
         {}\n    </div>\n</body>\n</html>",
        document, sections
    ));
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn test_table_page_is_deterministic() {
        let page = TablePage {
            number: 2,
            document: "report",
            origin: TableOrigin::Dimensions { rows: 3, columns: 4 },
            generated_at: timestamp(),
            body: "<table><tr><td>1</td></tr></table>",
        };
        let first = render_table_page(&page);
        let second = render_table_page(&page);
        assert_eq!(first, second);

        assert!(first.starts_with("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n"));
        assert!(first.contains("<title>Table 2 - report</title>"));
        assert!(first.contains("<h1>📊 Table 2</h1>"));
        assert!(first.contains(
            "<strong>Rows:</strong> 3 | \n            <strong>Columns:</strong> 4 | \n            <strong>Generated:</strong> 2024-03-09 14:05:07"
        ));
        assert!(first.contains("        <table><tr><td>1</td></tr></table>\n    </div>"));
        assert!(first.ends_with("</body>\n</html>"));
        assert!(!first.contains(".table-section"));
    }

    #[test]
    fn test_only_timestamp_and_body_vary() {
        let make = |generated_at, body| {
            render_table_page(&TablePage {
                number: 1,
                document: "doc",
                origin: TableOrigin::Section(4),
                generated_at,
                body,
            })
        };
        let a = make(timestamp(), "<table>A</table>");
        let later = timestamp() + chrono::Duration::seconds(61);
        let b = make(later, "<table>B</table>");

        let normalize = |s: &str| {
            s.replace("2024-03-09 14:05:07", "TS")
                .replace("2024-03-09 14:06:08", "TS")
                .replace("<table>A</table>", "BODY")
                .replace("<table>B</table>", "BODY")
        };
        assert_eq!(normalize(&a), normalize(&b));
        assert!(a.contains("<strong>Section:</strong> 4 | "));
    }

    #[test]
    fn test_page_origin_is_escaped() {
        let html = render_table_page(&TablePage {
            number: 1,
            document: "a&b",
            origin: TableOrigin::Page("UNKNOWN".to_string()),
            generated_at: timestamp(),
            body: "",
        });
        assert!(html.contains("<strong>Page:</strong> UNKNOWN | "));
        assert!(html.contains("<strong>Document:</strong> a&amp;b<br>"));
    }

    #[test]
    fn test_summary_page_keeps_order() {
        let html = render_summary_page("doc", &["<table>1</table>", "<table>2</table>"][..]);
        assert!(html.contains("<title>All Tables - doc</title>"));
        assert!(html.contains(".table-section {"));
        assert!(html.contains(
            "<div class=\"table-section\"><table>1</table></div><div class=\"table-section\"><table>2</table></div>"
        ));
    }

    #[test]
    fn test_fallback_page() {
        let html = render_fallback_page(3, "doc", "<table></table>");
        assert_eq!(
            html,
            "<!DOCTYPE html>\n<html><head><title>Table 3</title></head>\n<body><h1>Table 3 - doc</h1>\n<table></table></body></html>"
        );
    }
}
