//! Payment amount resolution for payment blocks.
//!
//! Charging is done by an external provider; this only answers "how much".

use rust_decimal::Decimal;

use folio_types::{Block, PaymentAmount, PaymentBlockData};

use crate::context::first_pricing_table;
use crate::pricing::compute_pricing;

/// Amount a payment block charges.
///
/// `PricingTotal` follows the same first-pricing-table rule as the evaluation
/// context. `None` when the payment is tied to a pricing total but the
/// document has no pricing table.
pub fn resolve_payment_amount(payment: &PaymentBlockData, blocks: &[Block]) -> Option<Decimal> {
    match &payment.amount {
        PaymentAmount::Fixed(amount) => Some(*amount),
        PaymentAmount::PricingTotal => first_pricing_table(blocks).map(|p| compute_pricing(p).total),
    }
}
