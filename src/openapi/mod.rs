use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Comanda API",
        version = "1.0.0",
        description = r#"
# Comanda Order Engine API

Order lifecycle, stock-safe checkout, tax-inclusive totals, loyalty points and
SRI fiscal submission for a multi-tenant restaurant/retail platform.

## Features

- **Orders**: creation with atomic stock decrement, kitchen lifecycle
  transitions, cancellation with stock restore
- **Totals**: tax-inclusive pricing, per-line tax, discount codes and
  single-use reward coupons
- **Loyalty**: configurable earning rules, points ledger, redemption into
  coupons
- **Fiscal**: idempotent electronic invoice submission with tax
  desegregation (Ecuador SRI conventions)

## Error Handling

Errors use a consistent JSON shape with appropriate HTTP status codes:

```json
{
  "error": "Unprocessable Entity",
  "message": "Insufficient stock for product Espresso: 1 available, 2 requested",
  "request_id": "req-abc123xyz",
  "timestamp": "2025-08-25T10:30:00.000Z"
}
```

## Pagination

List endpoints accept `page` (default: 1) and `per_page` (default and
maximum come from server configuration).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Order lifecycle and line items"),
        (name = "Loyalty", description = "Points balance, ledger and redemption"),
        (name = "Fiscal", description = "Electronic invoice documents"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        // Orders
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::confirm_order,
        crate::handlers::orders::start_preparing,
        crate::handlers::orders::mark_ready,
        crate::handlers::orders::start_delivery,
        crate::handlers::orders::mark_delivered,
        crate::handlers::orders::complete_order,
        crate::handlers::orders::cancel_order,
        crate::handlers::orders::reject_order,
        crate::handlers::orders::record_payment,
        crate::handlers::orders::add_order_item,
        crate::handlers::orders::remove_order_item,

        // Loyalty
        crate::handlers::loyalty::get_balance,
        crate::handlers::loyalty::list_transactions,
        crate::handlers::loyalty::redeem_points,

        // Fiscal
        crate::handlers::fiscal::get_document,
        crate::handlers::fiscal::retry_submission,

        // Health
        crate::health_check,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,

            // Order types
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::OrderItemRequest,
            crate::services::orders::OrderItemExtraRequest,
            crate::services::orders::CancelOrderRequest,
            crate::services::orders::RejectOrderRequest,
            crate::services::orders::OrderResponse,
            crate::services::orders::OrderItemResponse,
            crate::services::orders::OrderItemExtraResponse,
            crate::services::orders::OrderListResponse,
            crate::entities::order::OrderStatus,
            crate::entities::order::PaymentStatus,
            crate::entities::order::SalesChannel,

            // Loyalty types
            crate::handlers::loyalty::RedeemRequest,
            crate::handlers::loyalty::CouponResponse,
            crate::handlers::loyalty::TransactionResponse,
            crate::handlers::loyalty::TransactionListResponse,
            crate::services::loyalty::LoyaltyBalance,
            crate::entities::coupon::RewardKind,
            crate::entities::point_transaction::TransactionKind,

            // Fiscal types
            crate::handlers::fiscal::FiscalDocumentResponse,
            crate::entities::sri_document::SriStatus,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
