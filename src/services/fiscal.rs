use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::FiscalConfig,
    entities::{
        order::{self, Entity as Order},
        order_item::{self, Entity as OrderItem},
        sri_document::{self, Entity as SriDocument, SriStatus},
    },
    errors::ServiceError,
    services::order_totals::round_money,
};

/// Placeholder identity used when an order has no customer identification.
pub const FINAL_CONSUMER_ID: &str = "9999999999999";
pub const FINAL_CONSUMER_ID_TYPE: &str = "07";
pub const FINAL_CONSUMER_NAME: &str = "CONSUMIDOR FINAL";

pub const ID_TYPE_RUC: &str = "04";
pub const ID_TYPE_CEDULA: &str = "05";
pub const ID_TYPE_PASSPORT: &str = "06";

pub const TAX_CODE_ZERO: &str = "0";
pub const TAX_CODE_STANDARD: &str = "2";

/// Normalizes a tax rate to percent form. Catalog rows authored with a
/// fractional rate (0.15) mean the same thing as 15.
pub fn normalize_tax_rate(rate: Decimal) -> Decimal {
    if rate > Decimal::ZERO && rate < Decimal::ONE {
        rate * Decimal::ONE_HUNDRED
    } else {
        rate
    }
}

pub fn tax_code_for_rate(rate_percent: Decimal) -> &'static str {
    if rate_percent <= Decimal::ZERO {
        TAX_CODE_ZERO
    } else {
        TAX_CODE_STANDARD
    }
}

/// Recovers the tax-exclusive base price from a tax-inclusive one:
/// `price_excl = price_incl / (1 + rate/100)`, rounded to minor units.
pub fn price_excluding_tax(price_incl: Decimal, rate_percent: Decimal) -> Decimal {
    if rate_percent <= Decimal::ZERO {
        return round_money(price_incl);
    }
    let divisor = Decimal::ONE + rate_percent / Decimal::ONE_HUNDRED;
    round_money(price_incl / divisor)
}

/// Classifies a customer identification by shape: 13 digits is a RUC,
/// 10 digits a cedula, anything else a passport.
pub fn identification_type(identification: &str) -> &'static str {
    let all_digits = !identification.is_empty()
        && identification.chars().all(|c| c.is_ascii_digit());
    match identification.len() {
        13 if all_digits => ID_TYPE_RUC,
        10 if all_digits => ID_TYPE_CEDULA,
        _ => ID_TYPE_PASSPORT,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub code: String,
    pub description: String,
    pub quantity: i32,
    /// Tax-exclusive unit price, already desegregated and rounded.
    pub unit_price: Decimal,
    pub discount: Decimal,
    pub tax_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRequest {
    pub issue_date: NaiveDate,
    pub customer_identification_type: String,
    pub customer_identification: String,
    pub customer_name: String,
    pub items: Vec<InvoiceLine>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceDetails {
    pub number: Option<String>,
    pub access_key: Option<String>,
    pub authorization_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceResponse {
    pub success: bool,
    #[serde(default)]
    pub invoice: Option<InvoiceDetails>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Builds the provider payload from an order and its line snapshots.
pub fn build_invoice(order: &order::Model, items: &[order_item::Model]) -> InvoiceRequest {
    let identification = order
        .customer_identification
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let (customer_identification, customer_identification_type, customer_name) =
        match identification {
            Some(identification) => (
                identification.to_string(),
                identification_type(identification).to_string(),
                order.customer_name.clone(),
            ),
            None => (
                FINAL_CONSUMER_ID.to_string(),
                FINAL_CONSUMER_ID_TYPE.to_string(),
                FINAL_CONSUMER_NAME.to_string(),
            ),
        };

    let issue_date = order
        .completed_at
        .or(order.delivered_at)
        .unwrap_or_else(Utc::now)
        .date_naive();

    let items = items
        .iter()
        .map(|item| {
            let rate = normalize_tax_rate(item.tax_rate);
            let description = match &item.size_name {
                Some(size) => format!("{} ({})", item.product_name, size),
                None => item.product_name.clone(),
            };
            InvoiceLine {
                code: item
                    .product_code
                    .clone()
                    .unwrap_or_else(|| item.product_id.to_string()),
                description,
                quantity: item.quantity,
                unit_price: price_excluding_tax(item.unit_price, rate),
                discount: Decimal::ZERO,
                tax_code: tax_code_for_rate(rate).to_string(),
            }
        })
        .collect();

    InvoiceRequest {
        issue_date,
        customer_identification_type,
        customer_identification,
        customer_name,
        items,
    }
}

/// HTTP client for the fiscal provider bridge.
#[derive(Clone)]
pub struct SriClient {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    max_retries: u32,
}

impl SriClient {
    pub fn new(config: &FiscalConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            max_retries: config.max_retries.max(1),
        }
    }

    /// Posts an invoice. Server errors and transport failures are retried
    /// with exponential backoff; a 4xx refusal is definitive and is not.
    #[instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn submit_invoice(
        &self,
        request: &InvoiceRequest,
    ) -> Result<(InvoiceResponse, serde_json::Value), ServiceError> {
        let url = format!("{}/invoices", self.base_url);

        for attempt in 1..=self.max_retries {
            let mut req = self.client.post(&url).json(request);
            if let Some(token) = &self.api_token {
                req = req.bearer_auth(token);
            }

            match req.send().await {
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .json::<serde_json::Value>()
                        .await
                        .unwrap_or(serde_json::Value::Null);

                    if status.is_success() {
                        let parsed: InvoiceResponse = serde_json::from_value(body.clone())
                            .map_err(|e| {
                                ServiceError::ExternalServiceError(format!(
                                    "Malformed fiscal provider response: {}",
                                    e
                                ))
                            })?;
                        return Ok((parsed, body));
                    }

                    if status.is_client_error() {
                        let message = body
                            .get("message")
                            .and_then(|m| m.as_str())
                            .unwrap_or("request refused");
                        return Err(ServiceError::ExternalServiceError(format!(
                            "Fiscal provider returned {}: {}",
                            status, message
                        )));
                    }

                    warn!(
                        %status,
                        attempt,
                        max_retries = self.max_retries,
                        "fiscal provider returned server error"
                    );
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        attempt,
                        max_retries = self.max_retries,
                        "fiscal provider request failed"
                    );
                }
            }

            if attempt < self.max_retries {
                let backoff = Duration::from_secs(2_u64.pow(attempt - 1));
                tokio::time::sleep(backoff).await;
            }
        }

        Err(ServiceError::ExternalServiceError(format!(
            "Fiscal provider unreachable after {} attempts",
            self.max_retries
        )))
    }
}

#[derive(Clone)]
pub struct FiscalService {
    db: Arc<DatabaseConnection>,
    client: SriClient,
}

impl FiscalService {
    pub fn new(db: Arc<DatabaseConnection>, config: &FiscalConfig) -> Self {
        Self {
            db,
            client: SriClient::new(config),
        }
    }

    /// Submits the fiscal document for a completed sale. Idempotent: the
    /// per-order document is created once and updated in place, and an
    /// already-authorized document is returned without contacting the
    /// provider again. Submission failures are recorded on the document,
    /// never surfaced as an order failure.
    #[instrument(skip(self))]
    pub async fn submit_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<sri_document::Model, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if !order.status.is_sale_complete() {
            return Err(ServiceError::ValidationError(format!(
                "Order {} is not a completed sale, no fiscal document can be issued",
                order.order_number
            )));
        }

        let document = self.get_or_create_document(&order).await?;
        if document.status == SriStatus::Authorized {
            info!(order_id = %order.id, "fiscal document already authorized, skipping");
            return Ok(document);
        }

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&*self.db)
            .await?;
        let request = build_invoice(&order, &items);

        match self.client.submit_invoice(&request).await {
            Ok((response, raw)) => self.record_outcome(document, response, raw).await,
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "fiscal submission failed");
                self.mark_failed(document, e.to_string()).await
            }
        }
    }

    /// Explicit re-submission against the same idempotent record.
    pub async fn retry_submission(
        &self,
        order_id: Uuid,
    ) -> Result<sri_document::Model, ServiceError> {
        self.submit_for_order(order_id).await
    }

    pub async fn get_document(&self, order_id: Uuid) -> Result<sri_document::Model, ServiceError> {
        SriDocument::find()
            .filter(sri_document::Column::OrderId.eq(order_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No fiscal document for order {}", order_id))
            })
    }

    async fn get_or_create_document(
        &self,
        order: &order::Model,
    ) -> Result<sri_document::Model, ServiceError> {
        if let Some(existing) = SriDocument::find()
            .filter(sri_document::Column::OrderId.eq(order.id))
            .one(&*self.db)
            .await?
        {
            return Ok(existing);
        }

        let draft = sri_document::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            fiscal_number: Set(None),
            access_key: Set(None),
            status: Set(SriStatus::Draft),
            error_message: Set(None),
            raw_response: Set(None),
            authorized_at: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        Ok(draft.insert(&*self.db).await?)
    }

    async fn record_outcome(
        &self,
        document: sri_document::Model,
        response: InvoiceResponse,
        raw: serde_json::Value,
    ) -> Result<sri_document::Model, ServiceError> {
        let order_id = document.order_id;
        let mut active: sri_document::ActiveModel = document.into();
        active.raw_response = Set(Some(raw));
        active.updated_at = Set(Utc::now());

        if response.success {
            let invoice = response.invoice.unwrap_or_default();
            let authorized = invoice.authorization_date.is_some();
            active.status = Set(if authorized {
                SriStatus::Authorized
            } else {
                SriStatus::Sent
            });
            active.fiscal_number = Set(invoice.number.clone());
            active.access_key = Set(invoice.access_key.clone());
            active.authorized_at = Set(invoice.authorization_date);
            active.error_message = Set(None);

            info!(
                %order_id,
                fiscal_number = invoice.number.as_deref().unwrap_or(""),
                authorized,
                "fiscal document accepted"
            );
            counter!("fiscal.submissions.accepted", 1);
        } else {
            let message = response
                .message
                .unwrap_or_else(|| "Fiscal provider reported failure".to_string());
            warn!(%order_id, message = %message, "fiscal provider rejected document");
            active.status = Set(SriStatus::Failed);
            active.error_message = Set(Some(message));
            counter!("fiscal.submissions.failed", 1);
        }

        Ok(active.update(&*self.db).await?)
    }

    async fn mark_failed(
        &self,
        document: sri_document::Model,
        message: String,
    ) -> Result<sri_document::Model, ServiceError> {
        let mut active: sri_document::ActiveModel = document.into();
        active.status = Set(SriStatus::Failed);
        active.error_message = Set(Some(message));
        active.updated_at = Set(Utc::now());
        counter!("fiscal.submissions.failed", 1);
        Ok(active.update(&*self.db).await?)
    }
}
