use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        customer::Entity as Customer,
        extra::Entity as Extra,
        order::{self, Entity as Order, OrderStatus, PaymentStatus, SalesChannel},
        order_item::{self, Entity as OrderItem},
        order_item_extra::{self, Entity as OrderItemExtra},
        product::Entity as Product,
        product_size::Entity as ProductSize,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        discounts,
        fiscal::normalize_tax_rate,
        order_status::{can_cancel, can_modify_items, can_reject, is_valid_transition},
        order_totals::{compute_totals, line_total, round_money, PricedLine},
        stock,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemExtraRequest {
    pub extra_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub size_id: Option<Uuid>,
    pub quantity: i32,
    #[serde(default)]
    pub extras: Vec<OrderItemExtraRequest>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_id: Option<Uuid>,
    /// Name snapshot for the order; required when no customer is referenced.
    pub customer_name: Option<String>,
    pub channel: SalesChannel,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<OrderItemRequest>,
    pub discount_code: Option<String>,
    #[serde(default)]
    pub delivery_fee: Decimal,
    #[serde(default)]
    pub tip_amount: Decimal,
    pub notes: Option<String>,
    pub table_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RejectOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderItemExtraResponse {
    pub id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub size_id: Option<Uuid>,
    pub size_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
    pub line_total: Decimal,
    pub notes: Option<String>,
    pub extras: Vec<OrderItemExtraResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_identification: Option<String>,
    pub channel: SalesChannel,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub delivery_fee: Decimal,
    pub tip_amount: Decimal,
    pub total_amount: Decimal,
    pub discount_code: Option<String>,
    pub notes: Option<String>,
    pub table_reference: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// A line resolved against the catalog, carrying every snapshot the order
/// item will persist. `unit_price` folds in the size adjustment and the
/// per-unit extras total so `line_total == unit_price * quantity` holds.
struct PreparedLine {
    product_id: Uuid,
    product_code: Option<String>,
    product_name: String,
    size_id: Option<Uuid>,
    size_name: Option<String>,
    quantity: i32,
    unit_price: Decimal,
    unit_cost: Decimal,
    tax_rate: Decimal,
    tracks_stock: bool,
    notes: Option<String>,
    extras: Vec<PreparedExtra>,
}

struct PreparedExtra {
    extra_id: Uuid,
    name: String,
    unit_price: Decimal,
    quantity: i32,
}

impl PreparedLine {
    fn priced(&self) -> PricedLine {
        PricedLine {
            unit_price: self.unit_price,
            quantity: self.quantity,
            tax_rate: self.tax_rate,
        }
    }
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates an order in a single transaction: catalog lookups, per-product
    /// stock decrement under lock, discount resolution and totals. Any
    /// failure rolls the whole creation back; no partial order or partial
    /// decrement survives.
    #[instrument(skip(self, request), fields(channel = ?request.channel))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;
        if request.delivery_fee < Decimal::ZERO || request.tip_amount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Delivery fee and tip cannot be negative".into(),
            ));
        }

        let txn = self.db.begin().await?;

        let (customer_id, customer_name, customer_identification) =
            resolve_customer_snapshot(&txn, &request).await?;

        let mut lines = Vec::with_capacity(request.items.len());
        for item_request in &request.items {
            lines.push(prepare_line(&txn, item_request).await?);
        }

        // Aggregate per product and lock in key order so two multi-line
        // orders cannot deadlock on each other.
        let mut required: BTreeMap<Uuid, i32> = BTreeMap::new();
        for line in lines.iter().filter(|l| l.tracks_stock) {
            *required.entry(line.product_id).or_insert(0) += line.quantity;
        }
        for (product_id, quantity) in required {
            stock::lock_product(&txn, product_id)
                .await?
                .decrement(quantity)
                .await?;
        }

        let priced: Vec<PricedLine> = lines.iter().map(PreparedLine::priced).collect();
        let subtotal = round_money(
            priced
                .iter()
                .map(|l| line_total(l.unit_price, l.quantity))
                .sum::<Decimal>(),
        );

        let order_id = Uuid::new_v4();
        let applied_discount = match request.discount_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                Some(discounts::resolve_code(&txn, code, order_id, subtotal).await?)
            }
            _ => None,
        };
        let discount_amount = applied_discount
            .as_ref()
            .map(|d| d.amount)
            .unwrap_or(Decimal::ZERO);

        let totals = compute_totals(
            &priced,
            request.delivery_fee,
            request.tip_amount,
            discount_amount,
        );

        let now = Utc::now();
        let order_model = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(generate_order_number()),
            customer_id: Set(customer_id),
            customer_name: Set(customer_name),
            customer_identification: Set(customer_identification),
            channel: Set(request.channel),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PaymentStatus::Pending),
            subtotal: Set(totals.subtotal),
            tax_amount: Set(totals.tax_amount),
            discount_amount: Set(totals.discount_amount),
            delivery_fee: Set(totals.delivery_fee),
            tip_amount: Set(totals.tip_amount),
            total_amount: Set(totals.total),
            discount_code: Set(applied_discount.as_ref().map(|d| d.code.clone())),
            notes: Set(request.notes.clone()),
            table_reference: Set(request.table_reference.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            confirmed_at: Set(None),
            ready_at: Set(None),
            delivered_at: Set(None),
            completed_at: Set(None),
            cancelled_at: Set(None),
            version: Set(1),
        }
        .insert(&txn)
        .await?;

        let mut item_models = Vec::with_capacity(lines.len());
        for line in &lines {
            item_models.push(insert_line(&txn, order_id, line).await?);
        }

        txn.commit().await?;

        info!(
            order_id = %order_id,
            order_number = %order_model.order_number,
            total = %order_model.total_amount,
            "order created"
        );
        counter!("orders.created", 1);

        if let Err(e) = self.event_sender.send(Event::OrderCreated { order_id }).await {
            warn!(error = %e, order_id = %order_id, "failed to publish order created event");
        }

        Ok(build_response(order_model, item_models))
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let order = self.find_order(&*self.db, order_id).await?;
        let mut items = load_items_for(&*self.db, std::slice::from_ref(&order)).await?;
        let order_items = items.remove(&order.id).unwrap_or_default();
        Ok(build_response(order, order_items))
    }

    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
        status: Option<OrderStatus>,
        channel: Option<SalesChannel>,
    ) -> Result<OrderListResponse, ServiceError> {
        let mut query = Order::find();
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        if let Some(channel) = channel {
            query = query.filter(order::Column::Channel.eq(channel));
        }

        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut items_by_order = load_items_for(&*self.db, &orders).await?;
        let orders = orders
            .into_iter()
            .map(|order| {
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                build_response(order, items)
            })
            .collect();

        Ok(OrderListResponse {
            orders,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self))]
    pub async fn confirm_order(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        self.transition(order_id, OrderStatus::Confirmed).await
    }

    #[instrument(skip(self))]
    pub async fn start_preparing(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        self.transition(order_id, OrderStatus::Preparing).await
    }

    #[instrument(skip(self))]
    pub async fn mark_ready(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        self.transition(order_id, OrderStatus::Ready).await
    }

    #[instrument(skip(self))]
    pub async fn start_delivery(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        self.transition(order_id, OrderStatus::Delivering).await
    }

    #[instrument(skip(self))]
    pub async fn mark_delivered(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        self.transition(order_id, OrderStatus::Delivered).await
    }

    #[instrument(skip(self))]
    pub async fn complete_order(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        self.transition(order_id, OrderStatus::Completed).await
    }

    /// Cancels an order and returns every line's quantity to stock. The
    /// restore runs after the cancellation commits, as its own atomic
    /// increments; it does not reuse the creation lock window.
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        reason: Option<String>,
    ) -> Result<OrderResponse, ServiceError> {
        let txn = self.db.begin().await?;
        let order = self.find_order(&txn, order_id).await?;

        if !can_cancel(order.status) {
            return Err(ServiceError::InvalidStatusTransition(format!(
                "Order {} cannot be cancelled from status {}",
                order.order_number,
                order.status.as_str()
            )));
        }

        let items = order.find_related(OrderItem).all(&txn).await?;

        let now = Utc::now();
        let mut active: order::ActiveModel = order.clone().into();
        active.status = Set(OrderStatus::Cancelled);
        active.cancelled_at = Set(Some(now));
        if let Some(reason) = &reason {
            active.notes = Set(Some(append_note(
                order.notes.as_deref(),
                "Cancelled",
                reason,
            )));
        }
        active.updated_at = Set(now);
        active.version = Set(order.version + 1);
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        for item in &items {
            stock::restock(&*self.db, item.product_id, item.quantity).await?;
        }

        info!(order_id = %order_id, "order cancelled");
        counter!("orders.cancelled", 1);

        if let Err(e) = self
            .event_sender
            .send(Event::OrderCancelled { order_id })
            .await
        {
            warn!(error = %e, order_id = %order_id, "failed to publish order cancelled event");
        }

        self.response_for(updated).await
    }

    /// Rejects an order (store-side refusal). Allowed from any non-terminal
    /// state; stock is not restored.
    #[instrument(skip(self))]
    pub async fn reject_order(
        &self,
        order_id: Uuid,
        reason: Option<String>,
    ) -> Result<OrderResponse, ServiceError> {
        let txn = self.db.begin().await?;
        let order = self.find_order(&txn, order_id).await?;

        if !can_reject(order.status) {
            return Err(ServiceError::InvalidStatusTransition(format!(
                "Order {} cannot be rejected from status {}",
                order.order_number,
                order.status.as_str()
            )));
        }

        let now = Utc::now();
        let mut active: order::ActiveModel = order.clone().into();
        active.status = Set(OrderStatus::Rejected);
        if let Some(reason) = &reason {
            active.notes = Set(Some(append_note(
                order.notes.as_deref(),
                "Rejected",
                reason,
            )));
        }
        active.updated_at = Set(now);
        active.version = Set(order.version + 1);
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(order_id = %order_id, "order rejected");
        counter!("orders.rejected", 1);

        if let Err(e) = self
            .event_sender
            .send(Event::OrderRejected { order_id })
            .await
        {
            warn!(error = %e, order_id = %order_id, "failed to publish order rejected event");
        }

        self.response_for(updated).await
    }

    /// Marks the order paid. If the order already sits in a sale-complete
    /// status this fires the completion effects that were waiting on payment.
    #[instrument(skip(self))]
    pub async fn record_payment(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let txn = self.db.begin().await?;
        let order = self.find_order(&txn, order_id).await?;

        if matches!(
            order.status,
            OrderStatus::Cancelled | OrderStatus::Rejected
        ) {
            return Err(ServiceError::Conflict(format!(
                "Order {} is {} and cannot take a payment",
                order.order_number,
                order.status.as_str()
            )));
        }

        if order.payment_status != PaymentStatus::Pending {
            return Err(ServiceError::Conflict(format!(
                "Order {} payment is already {}",
                order.order_number,
                order.payment_status.as_str()
            )));
        }

        let mut active: order::ActiveModel = order.clone().into();
        active.payment_status = Set(PaymentStatus::Paid);
        active.updated_at = Set(Utc::now());
        active.version = Set(order.version + 1);
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(order_id = %order_id, "order payment recorded");

        if updated.status.is_sale_complete() {
            if let Err(e) = self
                .event_sender
                .send(Event::OrderCompleted { order_id })
                .await
            {
                warn!(error = %e, order_id = %order_id, "failed to publish order completed event");
            }
        }

        self.response_for(updated).await
    }

    /// Adds a line to an editable order, decrementing stock under lock and
    /// recomputing totals from the full item set.
    #[instrument(skip(self, request))]
    pub async fn add_item(
        &self,
        order_id: Uuid,
        request: OrderItemRequest,
    ) -> Result<OrderResponse, ServiceError> {
        let txn = self.db.begin().await?;
        let order = self.find_order(&txn, order_id).await?;

        if !can_modify_items(order.status) {
            return Err(ServiceError::InvalidStatusTransition(format!(
                "Items cannot be added to order {} in status {}",
                order.order_number,
                order.status.as_str()
            )));
        }

        let line = prepare_line(&txn, &request).await?;
        if line.tracks_stock {
            stock::lock_product(&txn, line.product_id)
                .await?
                .decrement(line.quantity)
                .await?;
        }
        insert_line(&txn, order.id, &line).await?;

        let updated = recompute_and_store(&txn, order).await?;
        txn.commit().await?;

        info!(order_id = %order_id, "order item added");
        self.response_for(updated).await
    }

    /// Removes a line and returns its quantity to stock after the commit.
    /// An order always keeps at least one item.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        order_id: Uuid,
        item_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let txn = self.db.begin().await?;
        let order = self.find_order(&txn, order_id).await?;

        if !can_modify_items(order.status) {
            return Err(ServiceError::InvalidStatusTransition(format!(
                "Items cannot be removed from order {} in status {}",
                order.order_number,
                order.status.as_str()
            )));
        }

        let item = OrderItem::find_by_id(item_id)
            .one(&txn)
            .await?
            .filter(|item| item.order_id == order.id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Order item {} not found on order {}",
                    item_id, order.order_number
                ))
            })?;

        let remaining = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .count(&txn)
            .await?;
        if remaining <= 1 {
            return Err(ServiceError::ValidationError(
                "An order must keep at least one item".into(),
            ));
        }

        OrderItemExtra::delete_many()
            .filter(order_item_extra::Column::OrderItemId.eq(item.id))
            .exec(&txn)
            .await?;
        OrderItem::delete_by_id(item.id).exec(&txn).await?;

        let updated = recompute_and_store(&txn, order).await?;
        txn.commit().await?;

        stock::restock(&*self.db, item.product_id, item.quantity).await?;

        info!(order_id = %order_id, item_id = %item_id, "order item removed");
        self.response_for(updated).await
    }

    /// Applies a lifecycle transition, stamping the milestone timestamp and
    /// auto-promoting a pending payment when the sale completes. Publishes
    /// `OrderCompleted` exactly once, on the first edge into a paid
    /// sale-complete state.
    async fn transition(
        &self,
        order_id: Uuid,
        target: OrderStatus,
    ) -> Result<OrderResponse, ServiceError> {
        let txn = self.db.begin().await?;
        let order = self.find_order(&txn, order_id).await?;

        if !is_valid_transition(order.status, target) {
            return Err(ServiceError::InvalidStatusTransition(format!(
                "Order {} cannot move from {} to {}",
                order.order_number,
                order.status.as_str(),
                target.as_str()
            )));
        }

        let was_complete_sale =
            order.status.is_sale_complete() && order.payment_status == PaymentStatus::Paid;

        let now = Utc::now();
        let old_status = order.status;
        let mut active: order::ActiveModel = order.clone().into();
        active.status = Set(target);
        match target {
            OrderStatus::Confirmed => active.confirmed_at = Set(Some(now)),
            OrderStatus::Ready => active.ready_at = Set(Some(now)),
            OrderStatus::Delivered => active.delivered_at = Set(Some(now)),
            OrderStatus::Completed => active.completed_at = Set(Some(now)),
            _ => {}
        }
        if target.is_sale_complete() && order.payment_status == PaymentStatus::Pending {
            active.payment_status = Set(PaymentStatus::Paid);
        }
        active.updated_at = Set(now);
        active.version = Set(order.version + 1);

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(
            order_id = %order_id,
            from = old_status.as_str(),
            to = target.as_str(),
            "order status changed"
        );

        let is_complete_sale =
            updated.status.is_sale_complete() && updated.payment_status == PaymentStatus::Paid;
        if is_complete_sale && !was_complete_sale {
            if let Err(e) = self
                .event_sender
                .send(Event::OrderCompleted { order_id })
                .await
            {
                warn!(error = %e, order_id = %order_id, "failed to publish order completed event");
            }
        }

        self.response_for(updated).await
    }

    async fn find_order<C: ConnectionTrait>(
        &self,
        db: &C,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        Order::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    async fn response_for(&self, order: order::Model) -> Result<OrderResponse, ServiceError> {
        let mut items = load_items_for(&*self.db, std::slice::from_ref(&order)).await?;
        let order_items = items.remove(&order.id).unwrap_or_default();
        Ok(build_response(order, order_items))
    }
}

async fn resolve_customer_snapshot(
    txn: &DatabaseTransaction,
    request: &CreateOrderRequest,
) -> Result<(Option<Uuid>, String, Option<String>), ServiceError> {
    let requested_name = request
        .customer_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    match request.customer_id {
        Some(customer_id) => {
            let customer = Customer::find_by_id(customer_id)
                .one(txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!("Unknown customer {}", customer_id))
                })?;
            let name = requested_name.unwrap_or(customer.name);
            Ok((Some(customer.id), name, customer.identification))
        }
        None => {
            let name = requested_name.ok_or_else(|| {
                ServiceError::ValidationError(
                    "Customer name is required for orders without a customer".into(),
                )
            })?;
            Ok((None, name, None))
        }
    }
}

/// Resolves one requested line against the catalog. Unknown or inactive
/// products, sizes and extras are validation errors; nothing is mutated.
async fn prepare_line(
    txn: &DatabaseTransaction,
    request: &OrderItemRequest,
) -> Result<PreparedLine, ServiceError> {
    if request.quantity < 1 {
        return Err(ServiceError::ValidationError(
            "Item quantity must be at least 1".into(),
        ));
    }

    let product = Product::find_by_id(request.product_id)
        .one(txn)
        .await?
        .ok_or_else(|| {
            ServiceError::ValidationError(format!("Unknown product {}", request.product_id))
        })?;
    if !product.active {
        return Err(ServiceError::ValidationError(format!(
            "Product {} is not available",
            product.name
        )));
    }

    let mut unit_price = product.price;

    let (size_id, size_name) = match request.size_id {
        Some(size_id) => {
            let size = ProductSize::find_by_id(size_id)
                .one(txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!("Unknown size {}", size_id))
                })?;
            if size.product_id != product.id {
                return Err(ServiceError::ValidationError(format!(
                    "Size {} does not belong to product {}",
                    size.name, product.name
                )));
            }
            if !size.active {
                return Err(ServiceError::ValidationError(format!(
                    "Size {} is not available",
                    size.name
                )));
            }
            unit_price += size.price_adjustment;
            (Some(size.id), Some(size.name))
        }
        None => (None, None),
    };

    let mut extras = Vec::with_capacity(request.extras.len());
    for extra_request in &request.extras {
        if extra_request.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Extra quantity must be at least 1".into(),
            ));
        }
        let extra = Extra::find_by_id(extra_request.extra_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("Unknown extra {}", extra_request.extra_id))
            })?;
        if !extra.active {
            return Err(ServiceError::ValidationError(format!(
                "Extra {} is not available",
                extra.name
            )));
        }
        unit_price += extra.price * Decimal::from(extra_request.quantity);
        extras.push(PreparedExtra {
            extra_id: extra.id,
            name: extra.name,
            unit_price: extra.price,
            quantity: extra_request.quantity,
        });
    }

    Ok(PreparedLine {
        product_id: product.id,
        product_code: product.code,
        product_name: product.name,
        size_id,
        size_name,
        quantity: request.quantity,
        unit_price,
        unit_cost: product.cost,
        tax_rate: normalize_tax_rate(product.tax_rate),
        tracks_stock: product.tracks_stock,
        notes: request.notes.clone(),
        extras,
    })
}

async fn insert_line(
    txn: &DatabaseTransaction,
    order_id: Uuid,
    line: &PreparedLine,
) -> Result<(order_item::Model, Vec<order_item_extra::Model>), ServiceError> {
    let item = order_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        product_id: Set(line.product_id),
        product_name: Set(line.product_name.clone()),
        product_code: Set(line.product_code.clone()),
        size_id: Set(line.size_id),
        size_name: Set(line.size_name.clone()),
        quantity: Set(line.quantity),
        unit_price: Set(line.unit_price),
        unit_cost: Set(line.unit_cost),
        tax_rate: Set(line.tax_rate),
        line_total: Set(line_total(line.unit_price, line.quantity)),
        notes: Set(line.notes.clone()),
        created_at: Set(Utc::now()),
    }
    .insert(txn)
    .await?;

    let mut extra_models = Vec::with_capacity(line.extras.len());
    for extra in &line.extras {
        let model = order_item_extra::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_item_id: Set(item.id),
            extra_id: Set(extra.extra_id),
            name: Set(extra.name.clone()),
            unit_price: Set(extra.unit_price),
            quantity: Set(extra.quantity),
        }
        .insert(txn)
        .await?;
        extra_models.push(model);
    }

    Ok((item, extra_models))
}

/// Recomputes totals from the order's full item set and persists them.
/// The stored discount is kept and re-clamped against the new subtotal.
async fn recompute_and_store(
    txn: &DatabaseTransaction,
    order: order::Model,
) -> Result<order::Model, ServiceError> {
    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .all(txn)
        .await?;
    let priced: Vec<PricedLine> = items
        .iter()
        .map(|item| PricedLine {
            unit_price: item.unit_price,
            quantity: item.quantity,
            tax_rate: item.tax_rate,
        })
        .collect();

    let totals = compute_totals(
        &priced,
        order.delivery_fee,
        order.tip_amount,
        order.discount_amount,
    );

    let mut active: order::ActiveModel = order.clone().into();
    active.subtotal = Set(totals.subtotal);
    active.tax_amount = Set(totals.tax_amount);
    active.discount_amount = Set(totals.discount_amount);
    active.total_amount = Set(totals.total);
    active.updated_at = Set(Utc::now());
    active.version = Set(order.version + 1);
    Ok(active.update(txn).await?)
}

async fn load_items_for<C: ConnectionTrait>(
    db: &C,
    orders: &[order::Model],
) -> Result<HashMap<Uuid, Vec<(order_item::Model, Vec<order_item_extra::Model>)>>, ServiceError> {
    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    if order_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_item::Column::CreatedAt)
        .all(db)
        .await?;

    let item_ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
    let mut extras_by_item: HashMap<Uuid, Vec<order_item_extra::Model>> = HashMap::new();
    if !item_ids.is_empty() {
        let extras = OrderItemExtra::find()
            .filter(order_item_extra::Column::OrderItemId.is_in(item_ids))
            .all(db)
            .await?;
        for extra in extras {
            extras_by_item
                .entry(extra.order_item_id)
                .or_default()
                .push(extra);
        }
    }

    let mut by_order: HashMap<Uuid, Vec<(order_item::Model, Vec<order_item_extra::Model>)>> =
        HashMap::new();
    for item in items {
        let extras = extras_by_item.remove(&item.id).unwrap_or_default();
        by_order.entry(item.order_id).or_default().push((item, extras));
    }
    Ok(by_order)
}

fn build_response(
    order: order::Model,
    items: Vec<(order_item::Model, Vec<order_item_extra::Model>)>,
) -> OrderResponse {
    let items = items
        .into_iter()
        .map(|(item, extras)| OrderItemResponse {
            id: item.id,
            product_id: item.product_id,
            product_name: item.product_name,
            size_id: item.size_id,
            size_name: item.size_name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            tax_rate: item.tax_rate,
            line_total: item.line_total,
            notes: item.notes,
            extras: extras
                .into_iter()
                .map(|extra| OrderItemExtraResponse {
                    id: extra.id,
                    name: extra.name,
                    unit_price: extra.unit_price,
                    quantity: extra.quantity,
                })
                .collect(),
        })
        .collect();

    OrderResponse {
        id: order.id,
        order_number: order.order_number,
        customer_id: order.customer_id,
        customer_name: order.customer_name,
        customer_identification: order.customer_identification,
        channel: order.channel,
        status: order.status,
        payment_status: order.payment_status,
        subtotal: order.subtotal,
        tax_amount: order.tax_amount,
        discount_amount: order.discount_amount,
        delivery_fee: order.delivery_fee,
        tip_amount: order.tip_amount,
        total_amount: order.total_amount,
        discount_code: order.discount_code,
        notes: order.notes,
        table_reference: order.table_reference,
        items,
        created_at: order.created_at,
        updated_at: order.updated_at,
        version: order.version,
    }
}

fn append_note(existing: Option<&str>, label: &str, reason: &str) -> String {
    match existing {
        Some(existing) if !existing.is_empty() => {
            format!("{}\n{}: {}", existing, label, reason)
        }
        _ => format!("{}: {}", label, reason),
    }
}

fn generate_order_number() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("ORD-{}", raw[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_numbers_are_short_and_prefixed() {
        let number = generate_order_number();
        assert!(number.starts_with("ORD-"));
        assert_eq!(number.len(), 12);
        assert!(number[4..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn notes_append_with_label() {
        assert_eq!(
            append_note(None, "Cancelled", "customer changed mind"),
            "Cancelled: customer changed mind"
        );
        assert_eq!(
            append_note(Some("no onions"), "Cancelled", "late"),
            "no onions\nCancelled: late"
        );
    }

    #[test]
    fn response_mapping_keeps_monetary_fields() {
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order = order::Model {
            id: order_id,
            order_number: "ORD-12AB34CD".into(),
            customer_id: None,
            customer_name: "Walk-in".into(),
            customer_identification: None,
            channel: SalesChannel::Pos,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            subtotal: dec!(20.00),
            tax_amount: dec!(3.00),
            discount_amount: dec!(2.00),
            delivery_fee: dec!(1.50),
            tip_amount: dec!(1.00),
            total_amount: dec!(23.50),
            discount_code: Some("WELCOME".into()),
            notes: None,
            table_reference: None,
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            ready_at: None,
            delivered_at: None,
            completed_at: None,
            cancelled_at: None,
            version: 1,
        };
        let item = order_item::Model {
            id: Uuid::new_v4(),
            order_id,
            product_id: Uuid::new_v4(),
            product_name: "Latte".into(),
            product_code: Some("LAT-01".into()),
            size_id: None,
            size_name: None,
            quantity: 4,
            unit_price: dec!(5.00),
            unit_cost: dec!(1.20),
            tax_rate: dec!(15),
            line_total: dec!(20.00),
            notes: None,
            created_at: now,
        };

        let response = build_response(order, vec![(item, Vec::new())]);
        assert_eq!(response.total_amount, dec!(23.50));
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].line_total, dec!(20.00));
        // total identity holds on the mapped response
        assert_eq!(
            response.total_amount,
            response.subtotal + response.tax_amount + response.delivery_fee
                + response.tip_amount
                - response.discount_amount
        );
    }
}
