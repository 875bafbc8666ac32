use axum::{
    extract::{Query, State},
    response::Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    models::{Parameters, StockStatus},
    services::{StockFilter, StockGroupView},
    stock::{StockRollUp, TotalUnit},
    ApiResponse, ApiResult, AppState,
};

use super::batches::StockEntrySummary;

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct GroupedStockQuery {
    /// Optional product type filter (exact match)
    pub product_type: Option<String>,
    /// Optional brand filter (exact match)
    pub brand: Option<String>,
    /// Status to aggregate; defaults to AVAILABLE
    pub status: Option<StockStatus>,
}

/// One stock entry tagged with its originating batch.
#[derive(Debug, Serialize, ToSchema)]
pub struct StockLineView {
    pub batch_code: String,
    pub batch_no: i32,
    #[serde(flatten)]
    pub entry: StockEntrySummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VariantGroupView {
    pub product_type_name: String,
    pub brand_name: String,
    pub parameters: Parameters,
    pub lines: Vec<StockLineView>,
    pub rollup: StockRollUp,
    pub total: Decimal,
    pub total_unit: TotalUnit,
}

impl From<StockGroupView> for VariantGroupView {
    fn from(group: StockGroupView) -> Self {
        Self {
            product_type_name: group.product_type_name,
            brand_name: group.brand_name,
            parameters: group.parameters,
            lines: group
                .lines
                .into_iter()
                .map(|line| StockLineView {
                    batch_code: line.batch_code,
                    batch_no: line.batch_no,
                    entry: line.entry.into(),
                })
                .collect(),
            rollup: group.rollup,
            total: group.total,
            total_unit: group.total_unit,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ShareMessageRequest {
    /// Selected stock entry ids, in display order
    #[validate(length(min = 1, message = "Select at least one stock entry"))]
    pub stock_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShareMessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DispatchRequest {
    #[validate(length(min = 1, message = "Select at least one stock entry"))]
    pub stock_ids: Vec<Uuid>,
    /// Free-form dispatch note, e.g. vehicle or customer reference
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReturnRequest {
    #[validate(length(min = 1, message = "Select at least one stock entry"))]
    pub stock_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ScrapRequest {
    #[validate(length(min = 1, message = "Select at least one stock entry"))]
    pub stock_ids: Vec<Uuid>,
    #[validate(length(min = 1, message = "A scrap reason is required"))]
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementResponse {
    pub updated: u64,
    pub status: StockStatus,
}

pub async fn grouped_stock(
    State(state): State<AppState>,
    Query(query): Query<GroupedStockQuery>,
) -> ApiResult<Vec<VariantGroupView>> {
    let filter = StockFilter {
        product_type_name: query.product_type,
        brand_name: query.brand,
        status: query.status,
    };

    let groups = state.services.stock.grouped_stock(filter).await?;
    let views: Vec<VariantGroupView> = groups.into_iter().map(VariantGroupView::from).collect();

    Ok(Json(ApiResponse::success(views)))
}

pub async fn share_message(
    State(state): State<AppState>,
    Json(payload): Json<ShareMessageRequest>,
) -> ApiResult<ShareMessageResponse> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let message = state.services.stock.share_message(&payload.stock_ids).await?;
    Ok(Json(ApiResponse::success(ShareMessageResponse { message })))
}

pub async fn dispatch_stock(
    State(state): State<AppState>,
    Json(payload): Json<DispatchRequest>,
) -> ApiResult<MovementResponse> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let updated = state
        .services
        .stock
        .dispatch(&payload.stock_ids, payload.note)
        .await?;
    Ok(Json(ApiResponse::success(MovementResponse {
        updated,
        status: StockStatus::Dispatched,
    })))
}

pub async fn return_stock(
    State(state): State<AppState>,
    Json(payload): Json<ReturnRequest>,
) -> ApiResult<MovementResponse> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let updated = state.services.stock.return_stock(&payload.stock_ids).await?;
    Ok(Json(ApiResponse::success(MovementResponse {
        updated,
        status: StockStatus::Available,
    })))
}

pub async fn scrap_stock(
    State(state): State<AppState>,
    Json(payload): Json<ScrapRequest>,
) -> ApiResult<MovementResponse> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let updated = state
        .services
        .stock
        .scrap(&payload.stock_ids, payload.reason)
        .await?;
    Ok(Json(ApiResponse::success(MovementResponse {
        updated,
        status: StockStatus::Scrapped,
    })))
}
