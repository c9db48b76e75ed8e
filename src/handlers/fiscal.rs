use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::sri_document::{self, SriStatus};
use crate::errors::ServiceError;
use crate::{ApiResponse, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct FiscalDocumentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub fiscal_number: Option<String>,
    pub access_key: Option<String>,
    pub status: SriStatus,
    pub error_message: Option<String>,
    pub authorized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<sri_document::Model> for FiscalDocumentResponse {
    fn from(model: sri_document::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            fiscal_number: model.fiscal_number,
            access_key: model.access_key,
            status: model.status,
            error_message: model.error_message,
            authorized_at: model.authorized_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Fiscal document recorded for an order
#[utoipa::path(
    get,
    path = "/api/v1/fiscal/orders/{order_id}",
    summary = "Get fiscal document",
    params(("order_id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Document retrieved", body = ApiResponse<FiscalDocumentResponse>),
        (status = 404, description = "No document for this order", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_document(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ApiResponse<FiscalDocumentResponse>>, ServiceError> {
    let document = state.services.fiscal.get_document(order_id).await?;
    Ok(Json(ApiResponse::success(document.into())))
}

/// Re-submit a failed fiscal document
#[utoipa::path(
    post,
    path = "/api/v1/fiscal/orders/{order_id}/retry",
    summary = "Retry fiscal submission",
    description = "Re-runs the submission for the order's document; an authorized document is returned unchanged",
    params(("order_id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Submission attempted", body = ApiResponse<FiscalDocumentResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 400, description = "Order is not a completed sale", body = crate::errors::ErrorResponse),
    )
)]
pub async fn retry_submission(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ApiResponse<FiscalDocumentResponse>>, ServiceError> {
    let document = state.services.fiscal.retry_submission(order_id).await?;
    Ok(Json(ApiResponse::success(document.into())))
}
