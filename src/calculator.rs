use tracing::info;

use crate::db::{CalculationRecord, CatalogStore, NewCalculation};
use crate::error::{Error, Result};
use crate::parser::price::round2;

/// A recorded calculation together with the product name it was priced for.
#[derive(Debug, Clone)]
pub struct Quote {
    pub orange_name: String,
    pub record: CalculationRecord,
}

/// Price `weight_kg` of a stored product at its current unit price and
/// record the result. The unit price is copied into the record, so later
/// price updates never rewrite history.
pub fn calculate(store: &CatalogStore, orange_id: &str, weight_kg: f64) -> Result<Quote> {
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "weight must be a positive number of kilograms, got {}",
            weight_kg
        )));
    }

    let product = store
        .get_product_type(orange_id)?
        .ok_or_else(|| Error::NotFound(orange_id.to_string()))?;

    let total_price = round2(weight_kg * product.price_per_kg);
    if !total_price.is_finite() {
        return Err(Error::InvalidInput(format!(
            "weight {} kg at {}/kg has no finite total",
            weight_kg, product.price_per_kg
        )));
    }

    let record = store.insert_calculation(&NewCalculation {
        orange_id: product.id.clone(),
        weight_kg,
        price_per_kg: product.price_per_kg,
        total_price,
    })?;

    info!(
        "Calculated {} kg of {} at {}/kg = {}",
        weight_kg, product.id, product.price_per_kg, record.total_price
    );

    Ok(Quote {
        orange_name: product.name,
        record,
    })
}
