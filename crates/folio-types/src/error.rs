//! Validation errors raised at the command boundary.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{BlockId, BlockKind, ItemId};

/// Reasons a command or payload is rejected before it touches state.
///
/// Evaluation never produces these; they exist so malformed input is refused
/// up front and the document is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Condition field path does not match any known path shape.
    #[error("malformed condition path: {0:?}")]
    MalformedPath(String),

    /// Item quantity below 1.
    #[error("item {item} has non-positive quantity {quantity}")]
    NonPositiveQuantity { item: ItemId, quantity: i64 },

    /// Negative unit price.
    #[error("item {item} has negative unit price {price}")]
    NegativeUnitPrice { item: ItemId, price: Decimal },

    /// Negative discount value.
    #[error("discount value {0} is negative")]
    NegativeDiscount(Decimal),

    /// Percentage discount above 100.
    #[error("percentage discount {0} exceeds 100")]
    DiscountOutOfRange(Decimal),

    /// Tax rate outside [0, 100].
    #[error("tax rate {0} is outside [0, 100]")]
    TaxRateOutOfRange(Decimal),

    /// `quantity × unitPrice` does not fit in a decimal.
    #[error("line total of item {0} is out of range")]
    LineTotalOverflow(ItemId),

    /// Table totals (sum, discount or tax) do not fit in a decimal.
    #[error("pricing totals are out of range")]
    PricingOverflow,

    /// Two items in one pricing block share an ID.
    #[error("duplicate pricing item id: {0}")]
    DuplicateItem(ItemId),

    /// Two blocks in one document share an ID.
    #[error("duplicate block id: {0}")]
    DuplicateBlock(BlockId),

    /// Empty or otherwise unusable identifier.
    #[error("invalid identifier: {0:?}")]
    InvalidId(String),

    /// Heading level outside 1..=3.
    #[error("heading level {0} is outside 1..=3")]
    HeadingLevel(u8),

    /// A payload or patch does not fit the block's kind.
    #[error("invalid {kind} data: {reason}")]
    InvalidData { kind: BlockKind, reason: String },

    /// Typed replace with a payload of a different kind.
    #[error("kind mismatch: block is {expected}, payload is {got}")]
    KindMismatch { expected: BlockKind, got: BlockKind },

    /// Pricing-item operation aimed at a block that is not a pricing table.
    #[error("block {0} is not a pricing table")]
    NotPricingTable(BlockId),
}
