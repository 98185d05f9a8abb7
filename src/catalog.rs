use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::{CatalogStore, ProductType};
use crate::error::{Error, Result};
use crate::parser::filter::product_id_for;
use crate::parser::price::round2;
use crate::parser::PriceRecord;
use crate::scrape::PageScraper;

pub const PRICE_SOURCE: &str = "Talaadthai.com";

/// Catalog product joined with its reference measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub price_per_kg: f64,
    pub color: Option<String>,
    pub grade: Option<String>,
    pub height: Option<f64>,
    pub radius: Option<f64>,
    pub diameter: Option<f64>,
    pub weight_avg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LivePrice {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub source: &'static str,
    pub updated_at: &'static str,
}

/// Midpoint of each record's range keyed by catalog id. When several
/// records map to the same product the last one wins.
pub fn midpoint_prices(records: &[PriceRecord]) -> Vec<(&'static str, f64)> {
    let mut prices: Vec<(&'static str, f64)> = Vec::new();
    for r in records {
        let Some(id) = product_id_for(&r.name) else {
            continue;
        };
        let mid = (r.price_min + r.price_max) / 2.0;
        match prices.iter_mut().find(|(known, _)| *known == id) {
            Some(slot) => slot.1 = mid,
            None => prices.push((id, mid)),
        }
    }
    prices
}

/// Overlay scraped prices onto the stored catalog.
///
/// If the source is unreachable or has no price table the stored prices
/// stay as they are; that is logged, not returned. Returns how many
/// products were updated.
pub async fn refresh_prices(store: &CatalogStore, scraper: &PageScraper) -> Result<usize> {
    let records = match scraper.fetch_prices().await {
        Ok(records) => records,
        Err(e @ (Error::ServiceUnavailable(_) | Error::DataNotFound)) => {
            warn!("Live price merge skipped, serving stored prices: {}", e);
            return Ok(0);
        }
        Err(e) => return Err(e),
    };

    let mut updated = 0;
    for (id, mid) in midpoint_prices(&records) {
        let price = round2(mid);
        if !price.is_finite() {
            warn!("Ignoring non-finite scraped price for {}", id);
            continue;
        }
        if store.update_unit_price(id, price)? {
            debug!("Updated {} to {}/kg", id, price);
            updated += 1;
        }
    }
    info!("Merged live prices into {} products", updated);
    Ok(updated)
}

/// Refresh prices, then return the whole catalog.
pub async fn live_catalog(store: &CatalogStore, scraper: &PageScraper) -> Result<Vec<CatalogEntry>> {
    refresh_prices(store, scraper).await?;
    store
        .list_product_types()?
        .into_iter()
        .map(|p| to_entry(store, p))
        .collect()
}

/// Refresh prices, then look up one product.
pub async fn live_entry(
    store: &CatalogStore,
    scraper: &PageScraper,
    orange_id: &str,
) -> Result<CatalogEntry> {
    refresh_prices(store, scraper).await?;
    let product = store
        .get_product_type(orange_id)?
        .ok_or_else(|| Error::NotFound(orange_id.to_string()))?;
    to_entry(store, product)
}

pub async fn live_prices(store: &CatalogStore, scraper: &PageScraper) -> Result<Vec<LivePrice>> {
    refresh_prices(store, scraper).await?;
    Ok(store
        .list_product_types()?
        .into_iter()
        .map(|p| LivePrice {
            id: p.id,
            name: p.name,
            price: p.price_per_kg,
            source: PRICE_SOURCE,
            updated_at: "Real-time",
        })
        .collect())
}

fn to_entry(store: &CatalogStore, p: ProductType) -> Result<CatalogEntry> {
    let m = store.get_measurement(&p.id)?;
    Ok(CatalogEntry {
        height: m.as_ref().map(|m| m.height_cm),
        radius: m.as_ref().map(|m| m.radius_cm),
        diameter: m.as_ref().map(|m| m.diameter_cm),
        weight_avg: m.as_ref().map(|m| m.weight_avg_g),
        id: p.id,
        name: p.name,
        price_per_kg: p.price_per_kg,
        color: p.color,
        grade: p.grade,
    })
}
