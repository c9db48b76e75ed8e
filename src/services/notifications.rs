use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    config::NotificationsConfig,
    entities::{order, order_item},
};

#[derive(Debug, Clone, Serialize)]
pub struct OrderSummaryLine {
    pub product_name: String,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// Read-only snapshot pushed to printing/notification consumers.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub order_number: String,
    pub channel: order::SalesChannel,
    pub customer_name: String,
    pub items: Vec<OrderSummaryLine>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub delivery_fee: Decimal,
    pub tip_amount: Decimal,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl OrderSummary {
    pub fn from_order(order: &order::Model, items: &[order_item::Model]) -> Self {
        Self {
            order_number: order.order_number.clone(),
            channel: order.channel,
            customer_name: order.customer_name.clone(),
            items: items
                .iter()
                .map(|item| OrderSummaryLine {
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    line_total: item.line_total,
                })
                .collect(),
            subtotal: order.subtotal,
            tax_amount: order.tax_amount,
            discount_amount: order.discount_amount,
            delivery_fee: order.delivery_fee,
            tip_amount: order.tip_amount,
            total_amount: order.total_amount,
            created_at: order.created_at,
        }
    }
}

/// Best-effort webhook delivery. Failures are logged and never reach the
/// order path.
#[derive(Clone)]
pub struct NotificationService {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl NotificationService {
    pub fn new(config: &NotificationsConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap(),
            webhook_url: config.webhook_url.clone(),
        }
    }

    /// Pushes an order summary without waiting for the result.
    pub fn notify_order_created(&self, summary: OrderSummary) {
        let Some(url) = self.webhook_url.clone() else {
            debug!("no notification webhook configured, skipping");
            return;
        };
        let client = self.client.clone();

        tokio::spawn(async move {
            match client.post(&url).json(&summary).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(order = %summary.order_number, "order notification delivered");
                }
                Ok(response) => {
                    warn!(
                        order = %summary.order_number,
                        status = %response.status(),
                        "order notification rejected"
                    );
                }
                Err(e) => {
                    warn!(order = %summary.order_number, error = %e, "order notification failed");
                }
            }
        });
    }
}
