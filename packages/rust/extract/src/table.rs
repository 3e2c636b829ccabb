//! Named-field decoding of HTML table rows.
//!
//! Listing tables are walked row by row; each row's `<td>` cells are handed
//! to a [`RowDecoder`] which either produces a typed row or reports a
//! [`HerbGraphError::MalformedRow`]. Header rows (no `<td>`) are not rows.

use herbgraph_shared::{HerbGraphError, Result};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("valid selector"));
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").expect("valid selector"));

/// A hyperlink found inside a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub text: String,
    pub href: Option<String>,
}

/// The data cells of one table row.
#[derive(Debug, Clone)]
pub struct RowCells<'a> {
    /// Zero-based position among the data rows of the table.
    pub index: usize,
    cells: Vec<ElementRef<'a>>,
}

impl<'a> RowCells<'a> {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The cell at `column`, or a malformed-row error if the row is too short.
    pub fn cell(&self, column: usize) -> Result<ElementRef<'a>> {
        self.cells.get(column).copied().ok_or_else(|| {
            HerbGraphError::malformed_row(
                column,
                format!("row has {} cells", self.cells.len()),
            )
        })
    }

    /// Concatenated text of the cell at `column`.
    pub fn text(&self, column: usize) -> Result<String> {
        Ok(cell_text(self.cell(column)?))
    }

    /// Hyperlinks inside the cell at `column`, in document order.
    pub fn links(&self, column: usize) -> Result<Vec<Link>> {
        Ok(cell_links(self.cell(column)?))
    }
}

/// A typed view of a table row.
pub trait RowDecoder: Sized {
    /// Minimum number of data cells a row needs.
    const COLUMNS: usize;

    /// Decode the named fields from a row that has at least [`Self::COLUMNS`] cells.
    fn decode(row: &RowCells<'_>) -> Result<Self>;
}

/// Rows decoded from one or more tables, plus the rows that failed.
#[derive(Debug)]
pub struct DecodedRows<T> {
    pub rows: Vec<T>,
    pub malformed: Vec<(usize, HerbGraphError)>,
}

/// Collect the data rows of every table matching `table_sel`.
///
/// With `first_only`, only the first matching table is read.
pub fn table_rows<'a>(doc: &'a Html, table_sel: &Selector, first_only: bool) -> Vec<RowCells<'a>> {
    let tables = doc.select(table_sel);
    let tables: Vec<ElementRef<'a>> = if first_only {
        tables.take(1).collect()
    } else {
        tables.collect()
    };

    tables
        .into_iter()
        .flat_map(|table| table.select(&ROW_SEL))
        .map(|tr| tr.select(&CELL_SEL).collect::<Vec<_>>())
        .filter(|cells| !cells.is_empty())
        .enumerate()
        .map(|(index, cells)| RowCells { index, cells })
        .collect()
}

/// Decode every row, checking the column count before handing it to `T`.
pub fn decode_rows<T: RowDecoder>(rows: &[RowCells<'_>]) -> DecodedRows<T> {
    let mut decoded = Vec::with_capacity(rows.len());
    let mut malformed = Vec::new();

    for row in rows {
        let result = if row.len() < T::COLUMNS {
            // cells are indexed from 0, so the first absent column is the cell count
            let first_missing = row.len();
            Err(HerbGraphError::malformed_row(
                first_missing,
                format!(
                    "row has {} of {} cells, column {first_missing} missing",
                    row.len(),
                    T::COLUMNS
                ),
            ))
        } else {
            T::decode(row)
        };

        match result {
            Ok(value) => decoded.push(value),
            Err(e) => malformed.push((row.index, e)),
        }
    }

    DecodedRows {
        rows: decoded,
        malformed,
    }
}

/// All text inside an element, concatenated.
pub fn cell_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// Every `<a>` inside an element with its trimmed text and `href`.
pub fn cell_links(el: ElementRef<'_>) -> Vec<Link> {
    el.select(&LINK_SEL)
        .map(|a| Link {
            text: a.text().collect::<String>().trim().to_string(),
            href: a.value().attr("href").map(str::to_string),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TwoCol {
        first: String,
        second_links: Vec<Link>,
    }

    impl RowDecoder for TwoCol {
        const COLUMNS: usize = 2;

        fn decode(row: &RowCells<'_>) -> Result<Self> {
            Ok(Self {
                first: row.text(0)?.trim().to_string(),
                second_links: row.links(1)?,
            })
        }
    }

    fn table_sel() -> Selector {
        Selector::parse("table.wikitable").unwrap()
    }

    const HTML: &str = r#"
        <table class="wikitable">
          <tr><th>A</th><th>B</th></tr>
          <tr><td>one</td><td><a href="/x">X</a> and <a>Y</a></td></tr>
          <tr><td>short</td></tr>
        </table>
        <table class="wikitable">
          <tr><td>two</td><td>plain</td></tr>
        </table>
    "#;

    #[test]
    fn header_rows_are_skipped() {
        let doc = Html::parse_document(HTML);
        let rows = table_rows(&doc, &table_sel(), false);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].index, 0);
    }

    #[test]
    fn first_only_reads_one_table() {
        let doc = Html::parse_document(HTML);
        let rows = table_rows(&doc, &table_sel(), true);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn short_rows_are_reported_malformed() {
        let doc = Html::parse_document(HTML);
        let rows = table_rows(&doc, &table_sel(), false);
        let decoded: DecodedRows<TwoCol> = decode_rows(&rows);

        assert_eq!(decoded.rows.len(), 2);
        assert_eq!(decoded.malformed.len(), 1);
        assert_eq!(decoded.malformed[0].0, 1);
        assert!(matches!(
            decoded.malformed[0].1,
            HerbGraphError::MalformedRow { column: 1, .. }
        ));
    }

    #[test]
    fn links_keep_text_and_href() {
        let doc = Html::parse_document(HTML);
        let rows = table_rows(&doc, &table_sel(), false);
        let decoded: DecodedRows<TwoCol> = decode_rows(&rows);

        let first = &decoded.rows[0];
        assert_eq!(first.first, "one");
        assert_eq!(
            first.second_links,
            vec![
                Link { text: "X".into(), href: Some("/x".into()) },
                Link { text: "Y".into(), href: None },
            ]
        );
        assert!(decoded.rows[1].second_links.is_empty());
    }

    #[test]
    fn short_row_reports_first_missing_column() {
        let html = r#"<table class="wikitable"><tr><td>only</td></tr></table>"#;
        let doc = Html::parse_document(html);
        let rows = table_rows(&doc, &table_sel(), true);

        struct ThreeCol;
        impl RowDecoder for ThreeCol {
            const COLUMNS: usize = 3;
            fn decode(_row: &RowCells<'_>) -> Result<Self> {
                Ok(Self)
            }
        }

        let decoded: DecodedRows<ThreeCol> = decode_rows(&rows);
        let (_, err) = &decoded.malformed[0];
        assert!(matches!(err, HerbGraphError::MalformedRow { column: 1, .. }));
        assert!(err.to_string().contains("column 1"));
    }

    #[test]
    fn missing_cell_is_malformed() {
        let doc = Html::parse_document(HTML);
        let rows = table_rows(&doc, &table_sel(), false);
        let err = rows[1].cell(1).unwrap_err();
        assert!(err.to_string().contains("column 1"));
    }
}
