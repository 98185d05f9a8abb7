pub mod filter;
pub mod price;
pub mod table;

use serde::Serialize;

use crate::error::{Error, Result};
use filter::contains_orange_keyword;
use price::parse_price_range;

pub const DEFAULT_GRADE: &str = "ไม่ระบุ";
pub const DEFAULT_UNIT: &str = "กก.";

/// One scraped price observation. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecord {
    pub name: String,
    pub grade: String,
    pub price_min: f64,
    pub price_max: f64,
    pub unit: String,
}

/// Page markup → price table → matching, parsable rows.
///
/// Rows with fewer than four cells, a label outside the keyword set, or an
/// unparsable price are dropped. An empty result is not an error here.
pub fn extract_price_records(html: &str) -> Result<Vec<PriceRecord>> {
    let rows = table::price_table_rows(html).ok_or(Error::DataNotFound)?;
    Ok(rows.iter().filter_map(|cells| row_to_record(cells)).collect())
}

fn row_to_record(cells: &[String]) -> Option<PriceRecord> {
    if cells.len() < 4 {
        return None;
    }

    let name = &cells[0];
    if !contains_orange_keyword(name) {
        return None;
    }

    let grade = cells.get(1).map_or(DEFAULT_GRADE, String::as_str);
    let price_text = cells.get(2).map_or("", String::as_str);
    let unit = cells.get(3).map_or(DEFAULT_UNIT, String::as_str);
    let (price_min, price_max) = parse_price_range(price_text)?;

    Some(PriceRecord {
        name: name.clone(),
        grade: grade.to_string(),
        price_min,
        price_max,
        unit: unit.to_string(),
    })
}
