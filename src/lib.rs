//! PipeStock API Library
//!
//! Warehouse stock backend for pipe production: batch entry,
//! variant-grouped inventory views, dispatch/return/scrap movements,
//! and the shareable stock summary.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod services;
pub mod stock;

use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, Router};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

// API routes
pub fn api_v1_routes() -> Router<AppState> {
    let batches = Router::new()
        .route(
            "/batches",
            get(handlers::batches::list_batches).post(handlers::batches::create_batch),
        )
        .route(
            "/batches/:id",
            get(handlers::batches::get_batch)
                .put(handlers::batches::update_batch)
                .delete(handlers::batches::delete_batch),
        );

    let stock = Router::new()
        .route("/stock/grouped", get(handlers::stock::grouped_stock))
        .route(
            "/stock/share-message",
            axum::routing::post(handlers::stock::share_message),
        )
        .route(
            "/stock/dispatch",
            axum::routing::post(handlers::stock::dispatch_stock),
        )
        .route(
            "/stock/return",
            axum::routing::post(handlers::stock::return_stock),
        )
        .route(
            "/stock/scrap",
            axum::routing::post(handlers::stock::scrap_stock),
        );

    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        // Batches API
        .merge(batches)
        // Stock API
        .merge(stock)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "service": "pipestock-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
