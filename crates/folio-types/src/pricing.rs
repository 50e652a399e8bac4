//! Pricing table payload: line items plus discount and tax configuration.
//!
//! Monetary values are `rust_decimal::Decimal` so sums, percentages and tax
//! stay exact. On the wire they are plain JSON numbers.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::{ItemId, ValidationError};

/// Currency used when a pricing block does not name one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Tax label used when a pricing block does not name one.
pub const DEFAULT_TAX_LABEL: &str = "Tax";

/// One line of a pricing table.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingItem {
    pub id: ItemId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Always ≥ 1 once validated.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(default)]
    pub is_optional: bool,
    /// Only meaningful when `is_optional` is set.
    #[serde(default)]
    pub is_selected: bool,
    /// Whether the signer may change the quantity in sign mode.
    #[serde(default)]
    pub allow_quantity_change: bool,
}

fn default_quantity() -> u32 {
    1
}

impl PricingItem {
    /// A fresh item with quantity 1, zero price and a generated ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ItemId::generate(),
            name: name.into(),
            description: String::new(),
            quantity: 1,
            unit_price: Decimal::ZERO,
            is_optional: false,
            is_selected: false,
            allow_quantity_change: false,
        }
    }

    /// Builder-style quantity and price, handy in tests and fixtures.
    pub fn priced(mut self, quantity: u32, unit_price: Decimal) -> Self {
        self.quantity = quantity;
        self.unit_price = unit_price;
        self
    }

    /// Non-optional items are always included; optional ones only when picked.
    pub fn is_effectively_selected(&self) -> bool {
        !self.is_optional || self.is_selected
    }

    /// `quantity × unit_price`, regardless of selection. `None` when the
    /// product does not fit in a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.unit_price)
    }

    /// Check quantity, price and ID.
    ///
    /// Any non-empty ID passes here, dots included; only IDs minted by
    /// commands are held to [`ItemId::is_valid`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.as_str().is_empty() {
            return Err(ValidationError::InvalidId(self.id.to_string()));
        }
        if self.quantity < 1 {
            return Err(ValidationError::NonPositiveQuantity {
                item: self.id.clone(),
                quantity: i64::from(self.quantity),
            });
        }
        if self.unit_price.is_sign_negative() && !self.unit_price.is_zero() {
            return Err(ValidationError::NegativeUnitPrice {
                item: self.id.clone(),
                price: self.unit_price,
            });
        }
        if self.line_total().is_none() {
            return Err(ValidationError::LineTotalOverflow(self.id.clone()));
        }
        Ok(())
    }
}

/// How `discount_value` is interpreted.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DiscountType {
    /// Percent of the subtotal.
    #[default]
    Percentage,
    /// Absolute amount in the block's currency.
    Fixed,
}

/// Payload of a `pricing_table` block.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingBlockData {
    #[serde(default)]
    pub items: Vec<PricingItem>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub discount_type: DiscountType,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub discount_value: Decimal,
    /// Percent, in [0, 100].
    #[serde(default, with = "rust_decimal::serde::float")]
    pub tax_rate: Decimal,
    #[serde(default = "default_tax_label")]
    pub tax_label: String,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_tax_label() -> String {
    DEFAULT_TAX_LABEL.to_string()
}

impl Default for PricingBlockData {
    /// What a freshly added pricing table starts with: one blank item.
    fn default() -> Self {
        Self {
            items: vec![PricingItem::new("")],
            currency: default_currency(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
            tax_label: default_tax_label(),
        }
    }
}

impl PricingBlockData {
    /// An empty table (no items) with default settings.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            ..Self::default()
        }
    }

    /// Look up an item by ID.
    pub fn item(&self, id: &ItemId) -> Option<&PricingItem> {
        self.items.iter().find(|i| &i.id == id)
    }

    /// Mutable lookup by ID.
    pub fn item_mut(&mut self, id: &ItemId) -> Option<&mut PricingItem> {
        self.items.iter_mut().find(|i| &i.id == id)
    }

    /// Items that count toward the subtotal.
    pub fn selected_items(&self) -> impl Iterator<Item = &PricingItem> {
        self.items.iter().filter(|i| i.is_effectively_selected())
    }

    /// Check every item plus discount and tax ranges.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for item in &self.items {
            item.validate()?;
            if !seen.insert(&item.id) {
                return Err(ValidationError::DuplicateItem(item.id.clone()));
            }
        }

        if self.discount_value.is_sign_negative() && !self.discount_value.is_zero() {
            return Err(ValidationError::NegativeDiscount(self.discount_value));
        }
        if self.discount_type == DiscountType::Percentage && self.discount_value > Decimal::ONE_HUNDRED
        {
            return Err(ValidationError::DiscountOutOfRange(self.discount_value));
        }
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE_HUNDRED {
            return Err(ValidationError::TaxRateOutOfRange(self.tax_rate));
        }
        self.check_totals()
    }

    /// Every intermediate of the totals pipeline must fit in a `Decimal`
    /// for any selection of optional items.
    ///
    /// Bounded with the gross sum of all items: the subtotal, the amount
    /// after discount and the taxable base are never larger.
    fn check_totals(&self) -> Result<(), ValidationError> {
        let mut gross = Decimal::ZERO;
        for item in &self.items {
            let line = item
                .line_total()
                .ok_or_else(|| ValidationError::LineTotalOverflow(item.id.clone()))?;
            gross = gross.checked_add(line).ok_or(ValidationError::PricingOverflow)?;
        }

        if self.discount_type == DiscountType::Percentage {
            gross
                .checked_mul(self.discount_value)
                .ok_or(ValidationError::PricingOverflow)?;
        }
        let tax = gross
            .checked_mul(self.tax_rate)
            .ok_or(ValidationError::PricingOverflow)?
            / Decimal::ONE_HUNDRED;
        gross.checked_add(tax).ok_or(ValidationError::PricingOverflow)?;
        Ok(())
    }
}
