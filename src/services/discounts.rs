use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    entities::{
        coupon::{self, Entity as Coupon, RewardKind},
        discount::{self, DiscountKind, Entity as Discount},
        discount_usage,
    },
    errors::ServiceError,
    services::order_totals::round_money,
};

/// Where a resolved discount came from. Only one source ever applies to an
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscountSource {
    Coupon { coupon_id: Uuid },
    StoreDiscount { discount_id: Uuid },
}

#[derive(Debug, Clone)]
pub struct AppliedDiscount {
    pub amount: Decimal,
    pub code: String,
    pub source: DiscountSource,
}

/// Resolves a user-supplied code against the two discount sources, in fixed
/// priority order: loyalty coupon first, then store discount.
///
/// A matched coupon is consumed immediately via a conditional update, so a
/// concurrent second use of the same coupon loses the race and fails. The
/// resolved amount is clamped to the subtotal.
pub async fn resolve_code(
    txn: &DatabaseTransaction,
    code: &str,
    order_id: Uuid,
    subtotal: Decimal,
) -> Result<AppliedDiscount, ServiceError> {
    let mut saw_used_coupon = false;

    if let Some(found) = Coupon::find()
        .filter(coupon::Column::Code.eq(code))
        .one(txn)
        .await?
    {
        if found.used {
            saw_used_coupon = true;
        } else {
            if let Some(expires_at) = found.expires_at {
                if expires_at < Utc::now() {
                    return Err(ServiceError::ValidationError(format!(
                        "Coupon '{}' has expired",
                        code
                    )));
                }
            }

            // Consume before applying; zero rows affected means a concurrent
            // checkout spent it first.
            let consumed = Coupon::update_many()
                .col_expr(coupon::Column::Used, sea_orm::sea_query::Expr::value(true))
                .col_expr(
                    coupon::Column::UsedOnOrderId,
                    sea_orm::sea_query::Expr::value(order_id),
                )
                .filter(coupon::Column::Id.eq(found.id))
                .filter(coupon::Column::Used.eq(false))
                .exec(txn)
                .await?;
            if consumed.rows_affected == 0 {
                return Err(ServiceError::Conflict(format!(
                    "Coupon '{}' has already been used",
                    code
                )));
            }

            let amount = coupon_discount(found.reward_kind, found.value, subtotal);
            info!(coupon_id = %found.id, %amount, "loyalty coupon applied");
            return Ok(AppliedDiscount {
                amount,
                code: code.to_string(),
                source: DiscountSource::Coupon {
                    coupon_id: found.id,
                },
            });
        }
    }

    if let Some(found) = Discount::find()
        .filter(discount::Column::Code.eq(code))
        .filter(discount::Column::Active.eq(true))
        .one(txn)
        .await?
    {
        let amount = store_discount_amount(&found, subtotal)?;

        let usage = discount_usage::ActiveModel {
            id: Set(Uuid::new_v4()),
            discount_id: Set(found.id),
            order_id: Set(order_id),
            amount_applied: Set(amount),
            created_at: Set(Utc::now()),
        };
        usage.insert(txn).await?;

        debug!(discount_id = %found.id, %amount, "store discount applied");
        return Ok(AppliedDiscount {
            amount,
            code: code.to_string(),
            source: DiscountSource::StoreDiscount {
                discount_id: found.id,
            },
        });
    }

    if saw_used_coupon {
        warn!(code, "discount code already consumed");
        return Err(ServiceError::Conflict(format!(
            "Coupon '{}' has already been used",
            code
        )));
    }

    Err(ServiceError::ValidationError(format!(
        "Unknown discount code '{}'",
        code
    )))
}

/// Discount from a loyalty coupon: percentage of the subtotal or a flat
/// amount, clamped to the subtotal.
pub fn coupon_discount(kind: RewardKind, value: Decimal, subtotal: Decimal) -> Decimal {
    let raw = match kind {
        RewardKind::Percentage => subtotal * (value / Decimal::from(100)),
        RewardKind::FixedAmount => value,
    };
    round_money(raw).min(subtotal).max(Decimal::ZERO)
}

/// Discount from a store-wide code, honoring its own minimum purchase and
/// maximum cap. An order below the minimum is a validation error naming the
/// threshold, not a silent zero.
pub fn store_discount_amount(
    d: &discount::Model,
    subtotal: Decimal,
) -> Result<Decimal, ServiceError> {
    let now = Utc::now();
    if d.starts_at.map(|s| s > now).unwrap_or(false) || d.ends_at.map(|e| e < now).unwrap_or(false)
    {
        return Err(ServiceError::ValidationError(format!(
            "Discount code '{}' is not currently active",
            d.code
        )));
    }

    if let Some(min) = d.min_purchase_amount {
        if subtotal < min {
            return Err(ServiceError::ValidationError(format!(
                "Discount code '{}' requires a minimum purchase of {}",
                d.code, min
            )));
        }
    }

    let raw = match d.discount_kind {
        DiscountKind::Percentage => subtotal * (d.value / Decimal::from(100)),
        DiscountKind::FixedAmount => d.value,
    };

    let capped = match d.max_discount_amount {
        Some(cap) => raw.min(cap),
        None => raw,
    };

    Ok(round_money(capped).min(subtotal).max(Decimal::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn store_discount(kind: DiscountKind, value: Decimal) -> discount::Model {
        discount::Model {
            id: Uuid::new_v4(),
            code: "SAVE".into(),
            discount_kind: kind,
            value,
            min_purchase_amount: None,
            max_discount_amount: None,
            active: true,
            starts_at: None,
            ends_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn percentage_coupon_discount() {
        let amount = coupon_discount(RewardKind::Percentage, dec!(10), dec!(50.00));
        assert_eq!(amount, dec!(5.00));
    }

    #[test]
    fn flat_coupon_clamped_to_subtotal() {
        let amount = coupon_discount(RewardKind::FixedAmount, dec!(20.00), dec!(12.50));
        assert_eq!(amount, dec!(12.50));
    }

    #[test]
    fn store_percentage_discount() {
        let d = store_discount(DiscountKind::Percentage, dec!(25));
        assert_eq!(store_discount_amount(&d, dec!(40.00)).unwrap(), dec!(10.00));
    }

    #[test]
    fn store_discount_respects_cap() {
        let mut d = store_discount(DiscountKind::Percentage, dec!(50));
        d.max_discount_amount = Some(dec!(5.00));
        assert_eq!(store_discount_amount(&d, dec!(100.00)).unwrap(), dec!(5.00));
    }

    #[test]
    fn store_discount_below_minimum_rejected() {
        let mut d = store_discount(DiscountKind::FixedAmount, dec!(3.00));
        d.min_purchase_amount = Some(dec!(25.00));
        let err = store_discount_amount(&d, dec!(10.00)).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[test]
    fn store_discount_outside_window_rejected() {
        let mut d = store_discount(DiscountKind::FixedAmount, dec!(3.00));
        d.ends_at = Some(Utc::now() - chrono::Duration::days(1));
        let err = store_discount_amount(&d, dec!(10.00)).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}
