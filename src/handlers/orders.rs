use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::entities::order::{OrderStatus, SalesChannel};
use crate::errors::ServiceError;
use crate::services::orders::{
    CancelOrderRequest, CreateOrderRequest, OrderItemRequest, OrderListResponse, OrderResponse,
    RejectOrderRequest,
};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListOrdersQuery {
    /// Page number, 1-based.
    #[serde(default = "default_page")]
    pub page: u64,
    /// Page size; clamped to the configured maximum.
    pub per_page: Option<u64>,
    pub status: Option<OrderStatus>,
    pub channel: Option<SalesChannel>,
}

fn default_page() -> u64 {
    1
}

fn effective_page_size(state: &AppState, requested: Option<u64>) -> u64 {
    requested
        .unwrap_or(state.config.api_default_page_size)
        .clamp(1, state.config.api_max_page_size)
}

/// Create an order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Create order",
    description = "Creates an order with its line items, decrements stock and computes totals atomically",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    request.validate()?;
    let order = state.services.orders.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

/// List orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    description = "Paginated order list, newest first, optionally filtered by status and channel",
    params(ListOrdersQuery),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<OrderListResponse>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<ApiResponse<OrderListResponse>>, ServiceError> {
    let per_page = effective_page_size(&state, query.per_page);
    let list = state
        .services
        .orders
        .list_orders(query.page.max(1), per_page, query.status, query.channel)
        .await?;
    Ok(Json(ApiResponse::success(list)))
}

/// Fetch one order with its items
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Confirm a pending order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/confirm",
    summary = "Confirm order",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order confirmed", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Illegal transition", body = crate::errors::ErrorResponse),
    )
)]
pub async fn confirm_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.confirm_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Move a confirmed order into preparation
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/prepare",
    summary = "Start preparing",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order preparing", body = ApiResponse<OrderResponse>),
        (status = 409, description = "Illegal transition", body = crate::errors::ErrorResponse),
    )
)]
pub async fn start_preparing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.start_preparing(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Mark the order ready for pickup or delivery
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/ready",
    summary = "Mark ready",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order ready", body = ApiResponse<OrderResponse>),
        (status = 409, description = "Illegal transition", body = crate::errors::ErrorResponse),
    )
)]
pub async fn mark_ready(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.mark_ready(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Hand the order to the courier
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/deliver",
    summary = "Start delivery",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order out for delivery", body = ApiResponse<OrderResponse>),
        (status = 409, description = "Illegal transition", body = crate::errors::ErrorResponse),
    )
)]
pub async fn start_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.start_delivery(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Record that the courier delivered the order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/delivered",
    summary = "Mark delivered",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order delivered", body = ApiResponse<OrderResponse>),
        (status = 409, description = "Illegal transition", body = crate::errors::ErrorResponse),
    )
)]
pub async fn mark_delivered(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.mark_delivered(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Close out an in-store order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/complete",
    summary = "Complete order",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order completed", body = ApiResponse<OrderResponse>),
        (status = 409, description = "Illegal transition", body = crate::errors::ErrorResponse),
    )
)]
pub async fn complete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.complete_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Cancel an order and restore its stock
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    summary = "Cancel order",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<OrderResponse>),
        (status = 409, description = "Order is past the cancellation window", body = crate::errors::ErrorResponse),
    )
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<CancelOrderRequest>>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let reason = request.and_then(|Json(body)| body.reason);
    let order = state.services.orders.cancel_order(id, reason).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Reject an incoming order (kitchen refusal; stock is not restored)
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/reject",
    summary = "Reject order",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = RejectOrderRequest,
    responses(
        (status = 200, description = "Order rejected", body = ApiResponse<OrderResponse>),
        (status = 409, description = "Order cannot be rejected", body = crate::errors::ErrorResponse),
    )
)]
pub async fn reject_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<RejectOrderRequest>>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let reason = request.and_then(|Json(body)| body.reason);
    let order = state.services.orders.reject_order(id, reason).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Record payment for the order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/pay",
    summary = "Record payment",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Payment recorded", body = ApiResponse<OrderResponse>),
        (status = 409, description = "Payment already settled", body = crate::errors::ErrorResponse),
    )
)]
pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.record_payment(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Add a line item to an order still in the kitchen
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/items",
    summary = "Add order item",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = OrderItemRequest,
    responses(
        (status = 200, description = "Item added, totals recomputed", body = ApiResponse<OrderResponse>),
        (status = 409, description = "Order no longer editable", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
    )
)]
pub async fn add_order_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<OrderItemRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.add_item(id, request).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Remove a line item from an order still in the kitchen
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}/items/{item_id}",
    summary = "Remove order item",
    params(
        ("id" = Uuid, Path, description = "Order id"),
        ("item_id" = Uuid, Path, description = "Order item id"),
    ),
    responses(
        (status = 200, description = "Item removed, totals recomputed", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Order would be left empty", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order no longer editable", body = crate::errors::ErrorResponse),
    )
)]
pub async fn remove_order_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.remove_item(id, item_id).await?;
    Ok(Json(ApiResponse::success(order)))
}
