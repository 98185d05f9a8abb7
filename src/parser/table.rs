use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());
static PRICE_TABLE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)price|table").unwrap());

/// Text of every row's cells in the price table, header row excluded.
///
/// The price table is the first `<table>` whose class looks like a price
/// table, else the first `<table>` in the document. `None` if the page has
/// no table at all.
pub fn price_table_rows(html: &str) -> Option<Vec<Vec<String>>> {
    let doc = Html::parse_document(html);
    let table = find_price_table(&doc)?;

    let rows = table
        .select(&ROW)
        .skip(1)
        .map(|row| row.select(&CELL).map(cell_text).collect())
        .collect();
    Some(rows)
}

fn find_price_table(doc: &Html) -> Option<ElementRef<'_>> {
    doc.select(&TABLE)
        .find(|t| {
            t.value()
                .attr("class")
                .is_some_and(|class| PRICE_TABLE_CLASS.is_match(class))
        })
        .or_else(|| doc.select(&TABLE).next())
}

/// Concatenate the trimmed text fragments of a cell.
fn cell_text(cell: ElementRef) -> String {
    cell.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_classed_price_table() {
        let html = r#"
            <table id="nav"><tr><td>menu</td></tr><tr><td>home</td></tr></table>
            <table class="fruit-prices">
              <tr><th>name</th><th>grade</th></tr>
              <tr><td>ส้ม</td><td>A</td></tr>
            </table>"#;
        let rows = price_table_rows(html).unwrap();
        assert_eq!(rows, vec![vec!["ส้ม".to_string(), "A".to_string()]]);
    }

    #[test]
    fn class_match_is_case_insensitive() {
        let html = r#"
            <table><tr><td>h</td></tr><tr><td>first</td></tr></table>
            <table class="Data-TABLE"><tr><td>h</td></tr><tr><td>second</td></tr></table>"#;
        let rows = price_table_rows(html).unwrap();
        assert_eq!(rows[0][0], "second");
    }

    #[test]
    fn falls_back_to_first_table() {
        let html = r#"
            <table id="a"><tr><td>h</td></tr><tr><td>one</td></tr></table>
            <table id="b"><tr><td>h</td></tr><tr><td>two</td></tr></table>"#;
        let rows = price_table_rows(html).unwrap();
        assert_eq!(rows[0][0], "one");
    }

    #[test]
    fn no_table() {
        assert!(price_table_rows("<html><body><p>closed today</p></body></html>").is_none());
        assert!(price_table_rows("").is_none());
    }

    #[test]
    fn header_only_table_has_no_rows() {
        let rows = price_table_rows("<table><tr><th>name</th></tr></table>").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn cell_text_is_stripped_and_joined() {
        let html = "<table><tr><td>h</td></tr><tr><td>  ส้ม <b> แมนดาริน </b>\n</td></tr></table>";
        let rows = price_table_rows(html).unwrap();
        assert_eq!(rows[0][0], "ส้มแมนดาริน");
    }
}
