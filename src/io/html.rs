//! HTML tables

use super::{frame_from_cells, series_cells, CellValue};
use crate::error::{DataPrepError, Result};
use polars::prelude::*;
use scraper::{ElementRef, Html, Selector};
use std::path::Path;

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| DataPrepError::DataError(format!("invalid selector {}: {}", css, e)))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Render the table as an HTML document with a single `<table>`
pub(crate) fn render(df: &DataFrame) -> Result<String> {
    let columns = df
        .get_columns()
        .iter()
        .map(|c| series_cells(c.as_materialized_series()))
        .collect::<Result<Vec<_>>>()?;

    let mut html = String::from("<table border=\"1\" class=\"dataframe\">\n  <thead>\n    <tr>\n");
    for name in df.get_column_names() {
        html.push_str(&format!("      <th>{}</th>\n", escape(name.as_str())));
    }
    html.push_str("    </tr>\n  </thead>\n  <tbody>\n");

    for row in 0..df.height() {
        html.push_str("    <tr>\n");
        for column in &columns {
            let text = column[row].render().unwrap_or_default();
            html.push_str(&format!("      <td>{}</td>\n", escape(&text)));
        }
        html.push_str("    </tr>\n");
    }
    html.push_str("  </tbody>\n</table>\n");
    Ok(html)
}

pub(crate) fn write(df: &DataFrame, path: &Path) -> Result<()> {
    std::fs::write(path, render(df)?)?;
    Ok(())
}

/// Parse the first `<table>` in a document.
///
/// The first row holds the column names. Empty and `NaN` cells are missing;
/// column types are inferred from the cell text.
pub(crate) fn parse(document: &str) -> Result<DataFrame> {
    let doc = Html::parse_document(document);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;

    let table = doc
        .select(&table_sel)
        .next()
        .ok_or_else(|| DataPrepError::DataError("no <table> found".to_string()))?;

    let mut rows = table
        .select(&row_sel)
        .map(|row| row.select(&cell_sel).map(cell_text).collect::<Vec<_>>());

    let names: Vec<String> = match rows.next() {
        Some(header) => header
            .into_iter()
            .enumerate()
            .map(|(i, name)| if name.is_empty() { format!("Unnamed: {}", i) } else { name })
            .collect(),
        None => return Ok(DataFrame::empty()),
    };

    let mut columns: Vec<Vec<CellValue>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (i, column) in columns.iter_mut().enumerate() {
            column.push(row.get(i).map_or(CellValue::Empty, |text| CellValue::parse(text)));
        }
    }

    frame_from_cells(&names, &columns)
}

pub(crate) fn read(path: &Path) -> Result<DataFrame> {
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_escapes_and_blanks_missing() {
        let df = df!(
            "name" => &[Some("a<b"), None],
            "x" => &[Some(1i64), Some(2)]
        )
        .unwrap();
        let html = render(&df).unwrap();
        assert!(html.contains("<th>name</th>"));
        assert!(html.contains("<td>a&lt;b</td>"));
        assert!(html.contains("<td></td>"));
    }

    #[test]
    fn test_parse_first_table() {
        let doc = r#"
            <html><body>
            <table>
              <tr><th>id</th><th>city</th><th>score</th></tr>
              <tr><td>1</td><td>Paris</td><td>1.5</td></tr>
              <tr><td>2</td><td></td><td>NaN</td></tr>
            </table>
            <table><tr><th>other</th></tr></table>
            </body></html>
        "#;
        let df = parse(doc).unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.column("id").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("city").unwrap().null_count(), 1);
        assert_eq!(df.column("score").unwrap().null_count(), 1);
    }

    #[test]
    fn test_round_trip() {
        let df = df!(
            "city" => &[Some("Lyon"), None, Some("Nice")],
            "rate" => &[Some(0.5), Some(1.25), None]
        )
        .unwrap();
        let parsed = parse(&render(&df).unwrap()).unwrap();
        assert_eq!(parsed.shape(), (3, 2));
        assert_eq!(parsed.column("rate").unwrap().dtype(), &DataType::Float64);
        assert_eq!(parsed.column("city").unwrap().null_count(), 1);
    }

    #[test]
    fn test_no_table_is_error() {
        assert!(parse("<p>nothing here</p>").is_err());
    }
}
