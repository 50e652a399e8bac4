//! Pricing engine: subtotal, discount, tax and total for one pricing table.
//!
//! Pure and order-independent. The pipeline is:
//!
//! ```text
//! selected   = items where !isOptional || isSelected
//! subtotal   = Σ quantity × unitPrice over selected
//! discount   = percentage ? subtotal × value / 100 : value
//!              (both clamped to subtotal, so total never goes negative)
//! after      = subtotal − discount
//! tax        = after × taxRate / 100
//! total      = after + tax
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use folio_types::{DiscountType, PricingBlockData};

/// Result of [`compute_pricing`]. All values are exact decimals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

impl PricingSummary {
    /// `subtotal − discount`.
    pub fn after_discount(&self) -> Decimal {
        self.subtotal - self.discount
    }

    /// Round every figure to `dp` places, half away from zero. Display only.
    pub fn rounded(&self, dp: u32) -> Self {
        let r = |v: Decimal| v.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
        Self {
            subtotal: r(self.subtotal),
            discount: r(self.discount),
            tax: r(self.tax),
            total: r(self.total),
        }
    }
}

/// Compute the totals for a pricing table.
///
/// Never panics. Arithmetic that leaves the `Decimal` range saturates at
/// `Decimal::MAX`; tables that pass [`PricingBlockData::validate`] never
/// get there.
pub fn compute_pricing(data: &PricingBlockData) -> PricingSummary {
    let subtotal = data
        .selected_items()
        .map(|item| item.line_total().unwrap_or(Decimal::MAX))
        .fold(Decimal::ZERO, Decimal::saturating_add);

    let raw_discount = match data.discount_type {
        DiscountType::Percentage => {
            subtotal.saturating_mul(data.discount_value) / Decimal::ONE_HUNDRED
        }
        DiscountType::Fixed => data.discount_value,
    };
    let discount = raw_discount.max(Decimal::ZERO).min(subtotal);

    let after_discount = subtotal - discount;
    let tax = if data.tax_rate.is_zero() {
        Decimal::ZERO
    } else {
        after_discount.saturating_mul(data.tax_rate) / Decimal::ONE_HUNDRED
    };

    PricingSummary {
        subtotal,
        discount,
        tax,
        total: after_discount.saturating_add(tax),
    }
}

/// Format an amount with its currency code, two decimals: `"97.20 USD"`.
pub fn format_money(amount: Decimal, currency: &str) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2} {currency}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::{ItemId, PricingItem};
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(id: &str, qty: u32, price: &str) -> PricingItem {
        let mut item = PricingItem::new(id).priced(qty, dec(price));
        item.id = ItemId::from(id);
        item
    }

    fn table(items: Vec<PricingItem>) -> PricingBlockData {
        PricingBlockData {
            items,
            ..PricingBlockData::empty()
        }
    }

    #[test]
    fn test_percentage_discount_with_tax() {
        let mut data = table(vec![item("a", 2, "50")]);
        data.discount_type = DiscountType::Percentage;
        data.discount_value = dec("10");
        data.tax_rate = dec("8");

        let summary = compute_pricing(&data);
        assert_eq!(summary.subtotal, dec("100"));
        assert_eq!(summary.discount, dec("10"));
        assert_eq!(summary.after_discount(), dec("90"));
        assert_eq!(summary.tax, dec("7.2"));
        assert_eq!(summary.total, dec("97.2"));
    }

    #[test]
    fn test_empty_items_all_zero() {
        let mut data = table(vec![]);
        data.discount_value = dec("20");
        data.tax_rate = dec("10");
        assert_eq!(compute_pricing(&data), PricingSummary::default());

        data.discount_type = DiscountType::Fixed;
        assert_eq!(compute_pricing(&data), PricingSummary::default());
    }

    #[test]
    fn test_fixed_discount_clamped_to_subtotal() {
        let mut data = table(vec![item("a", 1, "30")]);
        data.discount_type = DiscountType::Fixed;
        data.discount_value = dec("45");
        data.tax_rate = dec("20");

        let summary = compute_pricing(&data);
        assert_eq!(summary.discount, dec("30"));
        assert_eq!(summary.tax, Decimal::ZERO);
        assert_eq!(summary.total, Decimal::ZERO);
    }

    #[test]
    fn test_unselected_optional_items_excluded() {
        let mut optional = item("opt", 1, "500");
        optional.is_optional = true;
        let mut forced = item("base", 1, "100");
        forced.is_selected = false; // ignored for non-optional items

        let mut data = table(vec![forced, optional]);
        assert_eq!(compute_pricing(&data).total, dec("100"));

        data.items[1].is_selected = true;
        assert_eq!(compute_pricing(&data).total, dec("600"));
    }

    #[test]
    fn test_rounded_and_formatted() {
        let summary = PricingSummary {
            subtotal: dec("10.005"),
            discount: Decimal::ZERO,
            tax: dec("0.8004"),
            total: dec("10.8054"),
        };
        let r = summary.rounded(2);
        assert_eq!(r.subtotal, dec("10.01"));
        assert_eq!(r.tax, dec("0.80"));
        assert_eq!(format_money(dec("97.2"), "USD"), "97.20 USD");
    }

    #[test]
    fn test_summary_serializes_as_numbers() {
        let summary = compute_pricing(&table(vec![item("a", 3, "1.5")]));
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["subtotal"], serde_json::json!(4.5));
        assert_eq!(json["total"], serde_json::json!(4.5));
    }

    #[test]
    fn test_out_of_range_table_saturates_instead_of_panicking() {
        // Built directly, so it never went through validation.
        let mut data = table(vec![item("a", 10, "10000000000000000000000000000")]);
        data.tax_rate = dec("50");
        assert!(data.validate().is_err());

        let summary = compute_pricing(&data);
        assert_eq!(summary.subtotal, Decimal::MAX);
        assert_eq!(summary.discount, Decimal::ZERO);
        assert!(summary.total >= summary.subtotal);
    }

    fn arb_item() -> impl Strategy<Value = PricingItem> {
        (1u32..50, 0i64..100_000, any::<bool>(), any::<bool>()).prop_map(
            |(qty, cents, optional, selected)| {
                let mut item = PricingItem::new("p").priced(qty, Decimal::new(cents, 2));
                item.is_optional = optional;
                item.is_selected = selected;
                item
            },
        )
    }

    proptest! {
        #[test]
        fn prop_total_never_negative(
            items in proptest::collection::vec(arb_item(), 0..8),
            fixed in any::<bool>(),
            discount in 0i64..2_000_000,
            tax in 0i64..=100,
        ) {
            let mut data = table(items);
            if fixed {
                data.discount_type = DiscountType::Fixed;
                data.discount_value = Decimal::new(discount, 2);
            } else {
                data.discount_value = Decimal::new(discount % 10_001, 2);
            }
            data.tax_rate = Decimal::from(tax);

            let summary = compute_pricing(&data);
            prop_assert!(summary.total >= Decimal::ZERO);
            prop_assert!(summary.discount <= summary.subtotal);
        }

        #[test]
        fn prop_item_order_irrelevant(
            items in proptest::collection::vec(arb_item(), 0..8),
            tax in 0i64..=100,
        ) {
            let mut data = table(items);
            data.tax_rate = Decimal::from(tax);
            data.discount_value = Decimal::from(5);
            let forward = compute_pricing(&data);
            data.items.reverse();
            prop_assert_eq!(forward, compute_pricing(&data));
        }
    }
}
