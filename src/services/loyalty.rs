use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{
        coupon::{self, RewardKind},
        customer::Entity as Customer,
        earning_rule::{self, Entity as EarningRule, RuleChannel, RuleKind},
        loyalty_account::{self, Entity as LoyaltyAccount},
        order::{self, PaymentStatus, SalesChannel},
        point_transaction::{self, Entity as PointTransaction, TransactionKind},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Step divisor used by per-amount-step rules that do not configure one.
pub const DEFAULT_AMOUNT_STEP: Decimal = Decimal::ONE;

/// Whether a rule applies to orders from the given channel.
pub fn rule_matches_channel(rule_channel: RuleChannel, channel: SalesChannel) -> bool {
    match rule_channel {
        RuleChannel::All => true,
        RuleChannel::Web => channel == SalesChannel::Web,
        RuleChannel::Pos => channel == SalesChannel::Pos,
    }
}

fn is_per_step(rule: &earning_rule::Model) -> bool {
    // A configured positive step wins over the kind label; a missing or
    // non-positive step leaves the decision to the label, with the default
    // divisor filling in at computation time.
    match rule.amount_step {
        Some(step) if step > Decimal::ZERO => true,
        _ => rule.rule_kind == RuleKind::PerAmountStep,
    }
}

/// Selects the single best-matching earning rule for an order amount.
///
/// Candidates are active rules whose channel matches and whose threshold the
/// amount clears. The winner is the one with the highest threshold; on a tie,
/// a channel-specific rule beats an `all` rule. Rules never stack.
pub fn select_best_rule<'a>(
    rules: &'a [earning_rule::Model],
    amount: Decimal,
    channel: SalesChannel,
) -> Option<&'a earning_rule::Model> {
    let mut candidates: Vec<&earning_rule::Model> = rules
        .iter()
        .filter(|r| r.active)
        .filter(|r| rule_matches_channel(r.channel, channel))
        .filter(|r| r.min_order_value <= amount)
        .collect();

    candidates.sort_by(|a, b| {
        b.min_order_value
            .cmp(&a.min_order_value)
            .then_with(|| (b.channel != RuleChannel::All).cmp(&(a.channel != RuleChannel::All)))
    });

    candidates.first().copied()
}

/// Points produced by one rule for an amount.
pub fn rule_points(rule: &earning_rule::Model, amount: Decimal) -> i64 {
    if is_per_step(rule) {
        let step = match rule.amount_step {
            Some(step) if step > Decimal::ZERO => step,
            _ => DEFAULT_AMOUNT_STEP,
        };
        let steps = (amount / step).floor().to_i64().unwrap_or(0);
        steps * i64::from(rule.points_to_award)
    } else {
        i64::from(rule.points_to_award)
    }
}

/// Pure engine entry point: `(order_amount, channel) -> points`.
pub fn points_for_amount(
    rules: &[earning_rule::Model],
    amount: Decimal,
    channel: SalesChannel,
) -> i64 {
    match select_best_rule(rules, amount, channel) {
        Some(rule) => rule_points(rule, amount),
        None => 0,
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoyaltyBalance {
    pub customer_id: Uuid,
    pub points_balance: i64,
    pub lifetime_points: i64,
}

#[derive(Clone)]
pub struct LoyaltyService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl LoyaltyService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Awards points for a paid order. Idempotent: an order already credited
    /// in the ledger is skipped, never double-awarded.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn award_for_order(&self, order: &order::Model) -> Result<i64, ServiceError> {
        let Some(customer_id) = order.customer_id else {
            debug!("order has no customer, skipping loyalty award");
            return Ok(0);
        };
        if order.payment_status != PaymentStatus::Paid {
            debug!("order not paid, skipping loyalty award");
            return Ok(0);
        }

        let rules = EarningRule::find()
            .filter(earning_rule::Column::Active.eq(true))
            .all(&*self.db)
            .await?;
        let points = points_for_amount(&rules, order.total_amount, order.channel);
        if points <= 0 {
            debug!("no earning rule matched, nothing to award");
            return Ok(0);
        }

        let txn = self.db.begin().await?;

        let already_awarded = PointTransaction::find()
            .filter(point_transaction::Column::OrderId.eq(order.id))
            .filter(point_transaction::Column::Kind.eq(TransactionKind::Earn))
            .one(&txn)
            .await?
            .is_some();
        if already_awarded {
            info!("order already credited, skipping award");
            txn.rollback().await?;
            return Ok(0);
        }

        let account = self.get_or_create_account(&txn, customer_id).await?;

        let new_balance = account.points_balance + points;
        let new_lifetime = account.lifetime_points + points;
        let account_id = account.id;
        let mut active: loyalty_account::ActiveModel = account.into();
        active.points_balance = Set(new_balance);
        active.lifetime_points = Set(new_lifetime);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        let entry = point_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(account_id),
            kind: Set(TransactionKind::Earn),
            points_change: Set(points),
            order_id: Set(Some(order.id)),
            coupon_id: Set(None),
            description: Set(format!("Points earned for order {}", order.order_number)),
            created_at: Set(Utc::now()),
        };
        entry.insert(&txn).await?;

        txn.commit().await?;

        info!(customer_id = %customer_id, points, "loyalty points awarded");
        counter!("loyalty.points.awarded", points as u64);

        if let Err(e) = self
            .event_sender
            .send(Event::PointsAwarded {
                customer_id,
                order_id: order.id,
                points,
            })
            .await
        {
            warn!(error = %e, order_id = %order.id, "failed to publish points awarded event");
        }

        Ok(points)
    }

    /// Converts points into a single-use reward coupon. The redemption is
    /// recorded as a negative ledger entry referencing the coupon.
    #[instrument(skip(self))]
    pub async fn redeem_points(
        &self,
        customer_id: Uuid,
        points: i64,
        reward_kind: RewardKind,
        value: Decimal,
    ) -> Result<coupon::Model, ServiceError> {
        if points <= 0 {
            return Err(ServiceError::ValidationError(
                "Points to redeem must be positive".into(),
            ));
        }
        if value <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Reward value must be positive".into(),
            ));
        }

        let txn = self.db.begin().await?;

        let account = LoyaltyAccount::find()
            .filter(loyalty_account::Column::CustomerId.eq(customer_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "No loyalty account for customer {}",
                    customer_id
                ))
            })?;

        if account.points_balance < points {
            warn!(
                balance = account.points_balance,
                requested = points,
                "redemption over balance refused"
            );
            return Err(ServiceError::ValidationError(format!(
                "Insufficient points: {} available, {} requested",
                account.points_balance, points
            )));
        }

        let new_balance = account.points_balance - points;
        let account_id = account.id;
        let mut active: loyalty_account::ActiveModel = account.into();
        active.points_balance = Set(new_balance);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        let issued = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            code: Set(generate_coupon_code()),
            reward_kind: Set(reward_kind),
            value: Set(value),
            used: Set(false),
            used_on_order_id: Set(None),
            expires_at: Set(None),
            created_at: Set(Utc::now()),
        };
        let issued = issued.insert(&txn).await?;

        let entry = point_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(account_id),
            kind: Set(TransactionKind::Redeem),
            points_change: Set(-points),
            order_id: Set(None),
            coupon_id: Set(Some(issued.id)),
            description: Set(format!("Redeemed {} points for coupon {}", points, issued.code)),
            created_at: Set(Utc::now()),
        };
        entry.insert(&txn).await?;

        txn.commit().await?;

        info!(customer_id = %customer_id, points, coupon = %issued.code, "points redeemed");
        counter!("loyalty.points.redeemed", points as u64);
        Ok(issued)
    }

    #[instrument(skip(self))]
    pub async fn get_balance(&self, customer_id: Uuid) -> Result<LoyaltyBalance, ServiceError> {
        Customer::find_by_id(customer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", customer_id))
            })?;

        let account = LoyaltyAccount::find()
            .filter(loyalty_account::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?;

        Ok(match account {
            Some(account) => LoyaltyBalance {
                customer_id,
                points_balance: account.points_balance,
                lifetime_points: account.lifetime_points,
            },
            None => LoyaltyBalance {
                customer_id,
                points_balance: 0,
                lifetime_points: 0,
            },
        })
    }

    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        customer_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<point_transaction::Model>, u64), ServiceError> {
        let account = LoyaltyAccount::find()
            .filter(loyalty_account::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?;
        let Some(account) = account else {
            return Ok((Vec::new(), 0));
        };

        let paginator = PointTransaction::find()
            .filter(point_transaction::Column::AccountId.eq(account.id))
            .order_by_desc(point_transaction::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    async fn get_or_create_account(
        &self,
        txn: &sea_orm::DatabaseTransaction,
        customer_id: Uuid,
    ) -> Result<loyalty_account::Model, ServiceError> {
        if let Some(existing) = LoyaltyAccount::find()
            .filter(loyalty_account::Column::CustomerId.eq(customer_id))
            .one(txn)
            .await?
        {
            return Ok(existing);
        }

        let account = loyalty_account::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            points_balance: Set(0),
            lifetime_points: Set(0),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        Ok(account.insert(txn).await?)
    }
}

fn generate_coupon_code() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("CPN-{}", raw[..8].to_uppercase())
}
