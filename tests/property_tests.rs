//! Property-based tests for the money arithmetic: order totals, discount
//! clamping, tax desegregation and loyalty step math across a wide range
//! of inputs.

use proptest::prelude::*;
use rust_decimal::Decimal;

use comanda_api::services::fiscal::{normalize_tax_rate, price_excluding_tax};
use comanda_api::services::order_totals::{compute_totals, line_total, round_money, PricedLine};

// Strategies for generating test data
fn money_strategy() -> impl Strategy<Value = Decimal> {
    // 0.00 .. 10_000.00 in cents
    (0u64..1_000_000).prop_map(|cents| Decimal::new(cents as i64, 2))
}

fn tax_rate_strategy() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        Just(Decimal::ZERO),
        Just(Decimal::from(12)),
        Just(Decimal::from(15)),
        (1u32..30).prop_map(Decimal::from),
    ]
}

fn quantity_strategy() -> impl Strategy<Value = i32> {
    1i32..100
}

fn line_strategy() -> impl Strategy<Value = PricedLine> {
    (money_strategy(), quantity_strategy(), tax_rate_strategy()).prop_map(
        |(unit_price, quantity, tax_rate)| PricedLine {
            unit_price,
            quantity,
            tax_rate,
        },
    )
}

proptest! {
    // Property: the order total identity holds for any combination of
    // lines, fees and discounts.
    #[test]
    fn totals_identity_holds(
        lines in prop::collection::vec(line_strategy(), 1..8),
        delivery_fee in money_strategy(),
        tip in money_strategy(),
        discount in money_strategy(),
    ) {
        let totals = compute_totals(&lines, delivery_fee, tip, discount);

        prop_assert_eq!(
            totals.total,
            totals.subtotal + totals.tax_amount + totals.delivery_fee
                + totals.tip_amount - totals.discount_amount
        );
        prop_assert!(totals.total >= Decimal::ZERO);
        prop_assert!(totals.subtotal >= Decimal::ZERO);
        prop_assert!(totals.tax_amount >= Decimal::ZERO);
    }

    // Property: the applied discount never exceeds the subtotal, no matter
    // how large the requested discount is.
    #[test]
    fn discount_is_clamped_to_subtotal(
        lines in prop::collection::vec(line_strategy(), 1..4),
        discount in (0u64..100_000_000).prop_map(|c| Decimal::new(c as i64, 2)),
    ) {
        let totals = compute_totals(&lines, Decimal::ZERO, Decimal::ZERO, discount);
        prop_assert!(totals.discount_amount <= totals.subtotal);
        prop_assert!(totals.discount_amount >= Decimal::ZERO);
    }

    // Property: a line total is exactly unit price times quantity.
    #[test]
    fn line_total_is_exact(
        unit_price in money_strategy(),
        quantity in quantity_strategy(),
    ) {
        prop_assert_eq!(
            line_total(unit_price, quantity),
            unit_price * Decimal::from(quantity)
        );
    }

    // Property: the subtotal equals the rounded sum of line totals.
    #[test]
    fn subtotal_is_sum_of_lines(lines in prop::collection::vec(line_strategy(), 1..8)) {
        let totals = compute_totals(&lines, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        let expected: Decimal = lines
            .iter()
            .map(|l| line_total(l.unit_price, l.quantity))
            .sum();
        prop_assert_eq!(totals.subtotal, round_money(expected));
    }

    // Property: desegregation never increases the price, leaves zero-rate
    // prices alone, and recombining with the rate lands within one cent of
    // the original.
    #[test]
    fn desegregation_round_trips_within_a_cent(
        price in money_strategy(),
        rate in tax_rate_strategy(),
    ) {
        let excl = price_excluding_tax(price, rate);
        prop_assert!(excl <= round_money(price));
        prop_assert!(excl >= Decimal::ZERO);

        if rate == Decimal::ZERO {
            prop_assert_eq!(excl, round_money(price));
        } else {
            let recombined = excl * (Decimal::ONE + rate / Decimal::ONE_HUNDRED);
            let diff = (round_money(recombined) - round_money(price)).abs();
            prop_assert!(
                diff <= Decimal::new(1, 2),
                "price {} at {}% desegregated to {} recombines to {}",
                price, rate, excl, recombined
            );
        }
    }

    // Property: rate normalization is idempotent and maps fractions onto
    // their percent form.
    #[test]
    fn rate_normalization_is_idempotent(rate in tax_rate_strategy()) {
        let normalized = normalize_tax_rate(rate);
        prop_assert_eq!(normalize_tax_rate(normalized), normalized);

        let fractional = rate / Decimal::ONE_HUNDRED;
        if fractional > Decimal::ZERO && fractional < Decimal::ONE {
            prop_assert_eq!(normalize_tax_rate(fractional), rate);
        }
    }

    // Property: rounding is stable at two decimals.
    #[test]
    fn money_rounding_is_stable(price in money_strategy()) {
        let rounded = round_money(price);
        prop_assert_eq!(round_money(rounded), rounded);
        prop_assert!(rounded.scale() <= 2);
    }
}
