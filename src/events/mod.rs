use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    entities::{
        order::Entity as Order,
        order_item::{self, Entity as OrderItem},
    },
    errors::ServiceError,
    services::{
        fiscal::FiscalService,
        loyalty::LoyaltyService,
        notifications::{NotificationService, OrderSummary},
    },
};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))
    }
}

/// Domain events, published only after the transaction that caused them
/// has committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
    },
    /// First edge into a paid, sale-complete state. Published at most once
    /// per order; loyalty awarding and fiscal submission hang off it.
    OrderCompleted {
        order_id: Uuid,
    },
    OrderCancelled {
        order_id: Uuid,
    },
    OrderRejected {
        order_id: Uuid,
    },
    PointsAwarded {
        customer_id: Uuid,
        order_id: Uuid,
        points: i64,
    },
}

/// Everything the event consumers need.
#[derive(Clone)]
pub struct EventContext {
    pub db: Arc<DatabaseConnection>,
    pub loyalty: LoyaltyService,
    pub fiscal: FiscalService,
    pub notifications: NotificationService,
    /// Wait before the fiscal read so the completing transaction is visible
    /// from the background task's own connection.
    pub fiscal_dispatch_delay: Duration,
}

/// Consumes domain events until every sender is dropped. Handler failures
/// are logged and never propagate back into the request path.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, ctx: EventContext) {
    info!("starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::OrderCreated { order_id } => {
                if let Err(e) = handle_order_created(&ctx, order_id).await {
                    error!(order_id = %order_id, error = %e, "order created handler failed");
                }
            }
            Event::OrderCompleted { order_id } => {
                if let Err(e) = handle_order_completed(&ctx, order_id).await {
                    error!(order_id = %order_id, error = %e, "order completed handler failed");
                }
            }
            Event::OrderCancelled { order_id } => {
                info!(order_id = %order_id, "order cancelled");
            }
            Event::OrderRejected { order_id } => {
                info!(order_id = %order_id, "order rejected");
            }
            Event::PointsAwarded {
                customer_id,
                order_id,
                points,
            } => {
                info!(
                    customer_id = %customer_id,
                    order_id = %order_id,
                    points,
                    "loyalty points credited"
                );
            }
        }
    }

    warn!("event processing loop has ended");
}

async fn handle_order_created(ctx: &EventContext, order_id: Uuid) -> Result<(), ServiceError> {
    let Some(order) = Order::find_by_id(order_id).one(&*ctx.db).await? else {
        warn!(order_id = %order_id, "created order not found");
        return Ok(());
    };
    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(&*ctx.db)
        .await?;

    ctx.notifications
        .notify_order_created(OrderSummary::from_order(&order, &items));
    Ok(())
}

/// Awards loyalty points, then schedules the fiscal submission after the
/// configured delay. Either side effect failing leaves the order untouched.
async fn handle_order_completed(ctx: &EventContext, order_id: Uuid) -> Result<(), ServiceError> {
    let Some(order) = Order::find_by_id(order_id).one(&*ctx.db).await? else {
        warn!(order_id = %order_id, "completed order not found");
        return Ok(());
    };

    if let Err(e) = ctx.loyalty.award_for_order(&order).await {
        error!(order_id = %order_id, error = %e, "loyalty award failed");
    }

    let fiscal = ctx.fiscal.clone();
    let delay = ctx.fiscal_dispatch_delay;
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match fiscal.submit_for_order(order_id).await {
            Ok(document) => {
                info!(
                    order_id = %order_id,
                    status = ?document.status,
                    "fiscal submission finished"
                );
            }
            Err(e) => {
                error!(order_id = %order_id, error = %e, "fiscal submission errored");
            }
        }
    });

    Ok(())
}
