use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Currency minor-unit precision.
pub const MONEY_SCALE: u32 = 2;

/// Inputs to the totals computation: one entry per order line, carrying the
/// snapshot values the line was created with.
#[derive(Debug, Clone, Copy)]
pub struct PricedLine {
    /// Tax-inclusive unit price.
    pub unit_price: Decimal,
    pub quantity: i32,
    /// Tax rate in percent form (15 means 15%).
    pub tax_rate: Decimal,
}

/// Result of a totals pass over an order's lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub delivery_fee: Decimal,
    pub tip_amount: Decimal,
    pub total: Decimal,
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// A line's total is exactly unit price times quantity. Never recomputed
/// from the current catalog price after creation.
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Computes an order's monetary fields from its lines.
///
/// Tax is accumulated per line at each line's own rate, because products
/// carry different tax codes; a blended rate would misstate mixed orders.
/// The discount is clamped to the subtotal so the total never goes negative.
pub fn compute_totals(
    lines: &[PricedLine],
    delivery_fee: Decimal,
    tip_amount: Decimal,
    discount_amount: Decimal,
) -> OrderTotals {
    let mut subtotal = Decimal::ZERO;
    let mut tax = Decimal::ZERO;

    for line in lines {
        let lt = line_total(line.unit_price, line.quantity);
        subtotal += lt;
        tax += lt * (line.tax_rate / Decimal::from(100));
    }

    let subtotal = round_money(subtotal);
    let tax = round_money(tax);
    let discount = round_money(discount_amount).min(subtotal).max(Decimal::ZERO);
    let delivery_fee = round_money(delivery_fee);
    let tip = round_money(tip_amount);

    let total = subtotal + tax + delivery_fee + tip - discount;

    OrderTotals {
        subtotal,
        tax_amount: tax,
        discount_amount: discount,
        delivery_fee,
        tip_amount: tip,
        total,
    }
}
