use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    models::{
        lenient_decimal, Batch, BatchFilter, BatchPatch, NewBatch, NewStockEntry, Parameters,
        StockEntry, StockStatus, StockType,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct BatchListQuery {
    /// Page number (1-indexed)
    pub page: Option<u64>,
    /// Page size (max 100)
    pub limit: Option<u64>,
    /// Optional product type filter (exact match)
    pub product_type: Option<String>,
    /// Optional brand filter (exact match)
    pub brand: Option<String>,
    /// Only batches produced on or after this date
    pub produced_from: Option<NaiveDate>,
    /// Only batches produced on or before this date
    pub produced_to: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockEntrySummary {
    pub id: Uuid,
    pub stock_type: StockType,
    pub status: StockStatus,
    pub quantity: Option<i32>,
    pub length_per_unit: Option<Decimal>,
    pub pieces_per_bundle: Option<i32>,
    pub piece_length_meters: Option<Decimal>,
    pub piece_count: Option<i32>,
    pub total_available: Option<Decimal>,
}

impl From<StockEntry> for StockEntrySummary {
    fn from(entry: StockEntry) -> Self {
        Self {
            id: entry.id,
            stock_type: entry.stock_type,
            status: entry.status,
            quantity: entry.quantity,
            length_per_unit: entry.length_per_unit,
            pieces_per_bundle: entry.pieces_per_bundle,
            piece_length_meters: entry.piece_length_meters,
            piece_count: entry.piece_count,
            total_available: entry.total_available,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchSummary {
    pub id: Uuid,
    pub batch_code: String,
    pub batch_no: i32,
    pub production_date: NaiveDate,
    pub product_type_name: String,
    pub brand_name: String,
    pub parameters: Parameters,
    pub stock_entries: Vec<StockEntrySummary>,
}

impl From<Batch> for BatchSummary {
    fn from(batch: Batch) -> Self {
        Self {
            id: batch.id,
            batch_code: batch.batch_code,
            batch_no: batch.batch_no,
            production_date: batch.production_date,
            product_type_name: batch.product_type_name,
            brand_name: batch.brand_name,
            parameters: batch.parameters,
            stock_entries: batch.stock_entries.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateStockEntryRequest {
    pub stock_type: StockType,
    pub quantity: Option<i32>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub length_per_unit: Option<Decimal>,
    pub pieces_per_bundle: Option<i32>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub piece_length_meters: Option<Decimal>,
    pub piece_count: Option<i32>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub total_available: Option<Decimal>,
}

impl From<CreateStockEntryRequest> for NewStockEntry {
    fn from(request: CreateStockEntryRequest) -> Self {
        Self {
            stock_type: request.stock_type,
            quantity: request.quantity,
            length_per_unit: request.length_per_unit,
            pieces_per_bundle: request.pieces_per_bundle,
            piece_length_meters: request.piece_length_meters,
            piece_count: request.piece_count,
            total_available: request.total_available,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBatchRequest {
    #[validate(length(min = 1, message = "Batch code cannot be empty"))]
    pub batch_code: String,
    pub batch_no: i32,
    pub production_date: NaiveDate,
    #[validate(length(min = 1, message = "Product type cannot be empty"))]
    pub product_type_name: String,
    #[validate(length(min = 1, message = "Brand cannot be empty"))]
    pub brand_name: String,
    #[serde(default)]
    pub parameters: Parameters,
    #[validate(length(min = 1, message = "At least one stock entry is required"))]
    pub stock_entries: Vec<CreateStockEntryRequest>,
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UpdateBatchRequest {
    pub batch_code: Option<String>,
    pub batch_no: Option<i32>,
    pub production_date: Option<NaiveDate>,
    pub product_type_name: Option<String>,
    pub brand_name: Option<String>,
    pub parameters: Option<Parameters>,
}

pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<BatchListQuery>,
) -> ApiResult<PaginatedResponse<BatchSummary>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let filter = BatchFilter {
        product_type_name: query.product_type,
        brand_name: query.brand,
        produced_from: query.produced_from,
        produced_to: query.produced_to,
    };

    let (batches, total) = state.services.batches.list_batches(page, limit, filter).await?;

    let items: Vec<BatchSummary> = batches.into_iter().map(BatchSummary::from).collect();
    let total_pages = (total + limit - 1) / limit;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages,
    })))
}

pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<BatchSummary> {
    let batch = state.services.batches.get_batch(&id).await?;
    Ok(Json(ApiResponse::success(BatchSummary::from(batch))))
}

pub async fn create_batch(
    State(state): State<AppState>,
    Json(payload): Json<CreateBatchRequest>,
) -> ApiResult<BatchSummary> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let input = NewBatch {
        batch_code: payload.batch_code,
        batch_no: payload.batch_no,
        production_date: payload.production_date,
        product_type_name: payload.product_type_name,
        brand_name: payload.brand_name,
        parameters: payload.parameters,
        stock_entries: payload.stock_entries.into_iter().map(Into::into).collect(),
    };

    let created = state.services.batches.create_batch(input).await?;
    Ok(Json(ApiResponse::success(BatchSummary::from(created))))
}

pub async fn update_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBatchRequest>,
) -> ApiResult<BatchSummary> {
    let patch = BatchPatch {
        batch_code: payload.batch_code,
        batch_no: payload.batch_no,
        production_date: payload.production_date,
        product_type_name: payload.product_type_name,
        brand_name: payload.brand_name,
        parameters: payload.parameters,
    };

    let updated = state.services.batches.update_batch(&id, patch).await?;
    Ok(Json(ApiResponse::success(BatchSummary::from(updated))))
}

pub async fn delete_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.batches.delete_batch(&id).await?;
    Ok(Json(ApiResponse::success(json!({
        "batch_id": id,
        "deleted": true
    }))))
}
