use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

use crate::calculator;
use crate::catalog::{self, CatalogEntry, LivePrice};
use crate::db::{CalculationRecord, CatalogStore, Measurement, ProductCount};
use crate::error::Error;
use crate::parser::PriceRecord;
use crate::scrape::PageScraper;

const DEFAULT_CALCULATION_LIMIT: usize = 20;

#[derive(Clone)]
pub struct AppState {
    pub store: CatalogStore,
    pub scraper: PageScraper,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/oranges", get(scraped_prices))
        .route("/api/oranges", get(list_oranges))
        .route("/api/oranges/:id", get(get_orange))
        .route("/api/calculate", post(calculate))
        .route("/api/prices", get(prices))
        .route("/api/calculations", get(calculations))
        .route("/api/measurements", get(measurements))
        .route("/api/stats", get(stats))
        .with_state(state)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Error::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable"),
            Error::DataNotFound => (StatusCode::NOT_FOUND, "data_not_found"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            Error::Storage(_) | Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        };
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        json_error(status, code, self.to_string())
    }
}

fn json_error(status: StatusCode, code: &'static str, message: String) -> Response {
    (status, Json(json!({ "error": code, "message": message }))).into_response()
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Orange Price Scraper API",
        "endpoints": {
            "/oranges": "Filtered orange prices scraped from talaadthai.com",
            "/api/oranges": "Orange catalog with live prices",
            "/api/oranges/{id}": "Single orange",
            "/api/calculate": "POST ?orange_id=&weight= to price and record a purchase",
            "/api/prices": "Current price per kg",
            "/api/calculations": "Calculation history, newest first",
            "/api/measurements": "Reference measurements",
            "/api/stats": "Catalog statistics",
            "/health": "Liveness",
        }
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "Orange Price Scraper" }))
}

async fn scraped_prices(State(state): State<AppState>) -> Result<Json<Vec<PriceRecord>>, Error> {
    Ok(Json(state.scraper.fetch_prices().await?))
}

async fn list_oranges(State(state): State<AppState>) -> Result<Json<Vec<CatalogEntry>>, Error> {
    Ok(Json(catalog::live_catalog(&state.store, &state.scraper).await?))
}

async fn get_orange(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CatalogEntry>, Error> {
    Ok(Json(catalog::live_entry(&state.store, &state.scraper, &id).await?))
}

#[derive(Deserialize)]
struct CalculateParams {
    orange_id: String,
    weight: f64,
}

#[derive(Serialize)]
struct CalculationResponse {
    id: i64,
    orange_id: String,
    orange_name: String,
    weight: f64,
    price_per_kg: f64,
    total_price: f64,
    date: chrono::NaiveDate,
}

async fn calculate(
    State(state): State<AppState>,
    params: Result<Query<CalculateParams>, QueryRejection>,
) -> Result<Json<CalculationResponse>, Error> {
    let Query(params) = params.map_err(|e| Error::InvalidInput(e.body_text()))?;
    let quote = calculator::calculate(&state.store, &params.orange_id, params.weight)?;
    let r = quote.record;
    Ok(Json(CalculationResponse {
        id: r.id,
        orange_id: r.orange_id,
        orange_name: quote.orange_name,
        weight: r.weight_kg,
        price_per_kg: r.price_per_kg,
        total_price: r.total_price,
        date: r.date,
    }))
}

async fn prices(State(state): State<AppState>) -> Result<Json<Vec<LivePrice>>, Error> {
    Ok(Json(catalog::live_prices(&state.store, &state.scraper).await?))
}

#[derive(Deserialize)]
struct LimitParams {
    limit: Option<usize>,
}

async fn calculations(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<CalculationRecord>>, Error> {
    let limit = params.limit.unwrap_or(DEFAULT_CALCULATION_LIMIT);
    Ok(Json(state.store.list_calculations(limit)?))
}

async fn measurements(State(state): State<AppState>) -> Result<Json<Vec<Measurement>>, Error> {
    Ok(Json(state.store.list_measurements()?))
}

#[derive(Serialize)]
struct StatsResponse {
    product_types: i64,
    calculations: i64,
    most_calculated: Option<ProductCount>,
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, Error> {
    Ok(Json(StatsResponse {
        product_types: state.store.count_product_types()?,
        calculations: state.store.count_calculations()?,
        most_calculated: state.store.most_frequent_calculation_product()?,
    }))
}
