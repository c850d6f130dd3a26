//! Product resolution endpoints
//!
//! GET /product/:barcode resolves cache-first; POST /product/:barcode/refresh
//! forces a fresh resolution.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::models::ProductRecord;
use crate::pipeline::ResolveOptions;
use crate::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct ResolveQuery {
    #[serde(default)]
    pub premium: bool,
    #[serde(default)]
    pub offline: bool,
}

fn validate_barcode(barcode: &str) -> Result<(), ApiError> {
    if barcode.is_empty() || barcode.len() > 48 {
        return Err(ApiError::BadRequest("Invalid barcode".to_string()));
    }
    if !barcode.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::BadRequest(
            "Barcode must be alphanumeric".to_string(),
        ));
    }
    Ok(())
}

/// GET /product/:barcode
pub async fn get_product(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
    Query(query): Query<ResolveQuery>,
) -> ApiResult<Json<ProductRecord>> {
    validate_barcode(&barcode)?;

    let opts = ResolveOptions {
        use_cache: true,
        premium: query.premium,
        offline: query.offline,
    };

    match state.resolver.resolve(&barcode, opts).await? {
        Some(record) => Ok(Json(record)),
        // Offline means we never asked the providers, so a miss is an
        // availability problem, not a statement that no data exists.
        None if query.offline => Err(ApiError::Unavailable(format!(
            "No cached record for {barcode} while offline"
        ))),
        None => Err(ApiError::NotFound(format!("No data for {barcode}"))),
    }
}

/// POST /product/:barcode/refresh
pub async fn refresh_product(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
    Query(query): Query<ResolveQuery>,
) -> ApiResult<Json<ProductRecord>> {
    validate_barcode(&barcode)?;

    match state.resolver.refresh(&barcode, query.premium).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::NotFound(format!("No data for {barcode}"))),
    }
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/product/:barcode", get(get_product))
        .route("/product/:barcode/refresh", post(refresh_product))
}
