//! Comanda API Library
//!
//! This crate provides the core functionality for the Comanda order engine:
//! order lifecycle, stock-safe checkout, loyalty points and SRI fiscal
//! submission.
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
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes mounted under `/api/v1`
pub fn api_v1_routes() -> Router<AppState> {
    // Order lifecycle routes
    let orders = Router::new()
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route(
            "/orders/:id/confirm",
            axum::routing::post(handlers::orders::confirm_order),
        )
        .route(
            "/orders/:id/prepare",
            axum::routing::post(handlers::orders::start_preparing),
        )
        .route(
            "/orders/:id/ready",
            axum::routing::post(handlers::orders::mark_ready),
        )
        .route(
            "/orders/:id/deliver",
            axum::routing::post(handlers::orders::start_delivery),
        )
        .route(
            "/orders/:id/delivered",
            axum::routing::post(handlers::orders::mark_delivered),
        )
        .route(
            "/orders/:id/complete",
            axum::routing::post(handlers::orders::complete_order),
        )
        .route(
            "/orders/:id/cancel",
            axum::routing::post(handlers::orders::cancel_order),
        )
        .route(
            "/orders/:id/reject",
            axum::routing::post(handlers::orders::reject_order),
        )
        .route(
            "/orders/:id/pay",
            axum::routing::post(handlers::orders::record_payment),
        )
        .route(
            "/orders/:id/items",
            axum::routing::post(handlers::orders::add_order_item),
        )
        .route(
            "/orders/:id/items/:item_id",
            axum::routing::delete(handlers::orders::remove_order_item),
        );

    // Loyalty routes
    let loyalty = Router::new()
        .route(
            "/loyalty/:customer_id/balance",
            get(handlers::loyalty::get_balance),
        )
        .route(
            "/loyalty/:customer_id/transactions",
            get(handlers::loyalty::list_transactions),
        )
        .route(
            "/loyalty/:customer_id/redeem",
            axum::routing::post(handlers::loyalty::redeem_points),
        );

    // Fiscal document routes
    let fiscal = Router::new()
        .route(
            "/fiscal/orders/:order_id",
            get(handlers::fiscal::get_document),
        )
        .route(
            "/fiscal/orders/:order_id/retry",
            axum::routing::post(handlers::fiscal::retry_submission),
        );

    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(orders)
        .merge(loyalty)
        .merge(fiscal)
}

async fn api_status() -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "comanda-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    summary = "Health check",
    description = "Reports service and database health.",
    responses(
        (status = 200, description = "Service health report", body = ApiResponse<serde_json::Value>)
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match db::check_connection(state.db.as_ref()).await {
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

pub mod prelude {
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::openapi::*;
    pub use crate::services::*;
    pub use crate::tracing::*;
}
