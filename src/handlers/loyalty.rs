use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::entities::coupon::{self, RewardKind};
use crate::entities::point_transaction::{self, TransactionKind};
use crate::errors::ServiceError;
use crate::services::loyalty::LoyaltyBalance;
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RedeemRequest {
    /// Points to convert; must not exceed the available balance.
    #[validate(range(min = 1, message = "Points to redeem must be positive"))]
    pub points: i64,
    pub reward_kind: RewardKind,
    /// Coupon value: percentage (0-100) or flat amount per `reward_kind`.
    pub value: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponResponse {
    pub id: Uuid,
    pub code: String,
    pub reward_kind: RewardKind,
    pub value: Decimal,
    pub used: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<coupon::Model> for CouponResponse {
    fn from(model: coupon::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            reward_kind: model.reward_kind,
            value: model.value,
            used: model.used,
            expires_at: model.expires_at,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub points_change: i64,
    pub order_id: Option<Uuid>,
    pub coupon_id: Option<Uuid>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<point_transaction::Model> for TransactionResponse {
    fn from(model: point_transaction::Model) -> Self {
        Self {
            id: model.id,
            kind: model.kind,
            points_change: model.points_change,
            order_id: model.order_id,
            coupon_id: model.coupon_id,
            description: model.description,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TransactionsQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    pub per_page: Option<u64>,
}

fn default_page() -> u64 {
    1
}

/// Current points balance for a customer
#[utoipa::path(
    get,
    path = "/api/v1/loyalty/{customer_id}/balance",
    summary = "Get loyalty balance",
    params(("customer_id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Balance retrieved", body = ApiResponse<LoyaltyBalance>),
        (status = 404, description = "Unknown customer", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_balance(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<ApiResponse<LoyaltyBalance>>, ServiceError> {
    let balance = state.services.loyalty.get_balance(customer_id).await?;
    Ok(Json(ApiResponse::success(balance)))
}

/// Points ledger for a customer, newest first
#[utoipa::path(
    get,
    path = "/api/v1/loyalty/{customer_id}/transactions",
    summary = "List point transactions",
    params(
        ("customer_id" = Uuid, Path, description = "Customer id"),
        TransactionsQuery,
    ),
    responses(
        (status = 200, description = "Transactions retrieved", body = ApiResponse<TransactionListResponse>),
    )
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<ApiResponse<TransactionListResponse>>, ServiceError> {
    let page = query.page.max(1);
    let per_page = query
        .per_page
        .unwrap_or(state.config.api_default_page_size)
        .clamp(1, state.config.api_max_page_size);

    let (transactions, total) = state
        .services
        .loyalty
        .list_transactions(customer_id, page, per_page)
        .await?;

    Ok(Json(ApiResponse::success(TransactionListResponse {
        transactions: transactions.into_iter().map(Into::into).collect(),
        total,
        page,
        per_page,
    })))
}

/// Convert points into a single-use reward coupon
#[utoipa::path(
    post,
    path = "/api/v1/loyalty/{customer_id}/redeem",
    summary = "Redeem points",
    params(("customer_id" = Uuid, Path, description = "Customer id")),
    request_body = RedeemRequest,
    responses(
        (status = 201, description = "Coupon issued", body = ApiResponse<CouponResponse>),
        (status = 400, description = "Insufficient points", body = crate::errors::ErrorResponse),
        (status = 404, description = "No loyalty account", body = crate::errors::ErrorResponse),
    )
)]
pub async fn redeem_points(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<RedeemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CouponResponse>>), ServiceError> {
    request.validate()?;
    let coupon = state
        .services
        .loyalty
        .redeem_points(customer_id, request.points, request.reward_kind, request.value)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(coupon.into())),
    ))
}
