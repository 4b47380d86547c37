//! Self-contained HTML rendering of report tables.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::AppError;
use crate::report::Table;

const STYLE: &str = "\
body { font-family: sans-serif; margin: 2em; }
table { border-collapse: collapse; margin-bottom: 2em; }
caption { text-align: left; font-weight: bold; padding-bottom: 0.5em; }
th, td { padding: 0.25em 0.75em; border-bottom: 1px solid #ddd; }
th { background: #f3f3f3; }
td.num, th.num { text-align: right; font-variant-numeric: tabular-nums; }
tfoot td { font-weight: bold; border-top: 2px solid #333; }
";

/// Render one `<table>` element.
pub fn render_html_table(table: &Table) -> String {
    let mut out = String::new();
    out.push_str("<table>\n");
    out.push_str(&format!("<caption>{}</caption>\n", escape(&table.caption)));

    out.push_str("<thead><tr>");
    for (i, h) in table.headers.iter().enumerate() {
        out.push_str(&format!("<th{}>{}</th>", cell_class(i), escape(h)));
    }
    out.push_str("</tr></thead>\n");

    out.push_str("<tbody>\n");
    for row in &table.rows {
        out.push_str(&render_row(row));
    }
    out.push_str("</tbody>\n");

    if let Some(footer) = &table.footer {
        out.push_str("<tfoot>\n");
        out.push_str(&render_row(footer));
        out.push_str("</tfoot>\n");
    }

    out.push_str("</table>\n");
    out
}

/// Render a complete HTML document containing `tables`.
pub fn render_html_document(title: &str, tables: &[Table]) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape(title)));
    out.push_str(&format!("<style>\n{STYLE}</style>\n"));
    out.push_str("</head>\n<body>\n");
    out.push_str(&format!("<h1>{}</h1>\n", escape(title)));
    for table in tables {
        out.push_str(&render_html_table(table));
    }
    out.push_str("</body>\n</html>\n");
    out
}

pub fn write_html(path: &Path, title: &str, tables: &[Table]) -> Result<(), AppError> {
    fs::write(path, render_html_document(title, tables))
        .map_err(|e| AppError::usage(format!("Failed to write HTML '{}': {e}", path.display())))?;
    info!(path = %path.display(), tables = tables.len(), "wrote HTML report");
    Ok(())
}

fn render_row(cells: &[String]) -> String {
    let mut out = String::from("<tr>");
    for (i, cell) in cells.iter().enumerate() {
        out.push_str(&format!("<td{}>{}</td>", cell_class(i), escape(cell)));
    }
    out.push_str("</tr>\n");
    out
}

// First column holds labels; everything after it is numeric.
fn cell_class(col: usize) -> &'static str {
    if col == 0 { "" } else { " class=\"num\"" }
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table {
            caption: "Net completions".to_string(),
            headers: vec!["Borough".to_string(), "2020/21".to_string()],
            rows: vec![vec!["Barking & Dagenham".to_string(), "1,200".to_string()]],
            footer: Some(vec!["London".to_string(), "1,200".to_string()]),
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<a href=\"x\">Tom's & co</a>"), "&lt;a href=&quot;x&quot;&gt;Tom&#39;s &amp; co&lt;/a&gt;");
    }

    #[test]
    fn table_has_caption_numeric_cells_and_footer() {
        let html = render_html_table(&table());
        assert!(html.contains("<caption>Net completions</caption>"));
        assert!(html.contains("<td>Barking &amp; Dagenham</td><td class=\"num\">1,200</td>"));
        assert!(html.contains("<tfoot>\n<tr><td>London</td>"));
    }

    #[test]
    fn document_wraps_all_tables() {
        let html = render_html_document("AMR <tables>", &[table(), table()]);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>AMR &lt;tables&gt;</title>"));
        assert_eq!(html.matches("<table>").count(), 2);
    }

    #[test]
    fn write_html_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("amr.html");
        write_html(&path, "AMR", &[table()]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Barking &amp; Dagenham"));
    }
}
