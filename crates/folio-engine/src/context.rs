//! Evaluation context: the flat, addressable projection of document state
//! that visibility rules read.
//!
//! Only the **first** pricing table in document order contributes. With no
//! pricing table the context is empty, and every rule that references a
//! pricing path fails closed.
//!
//! | Path                              | Value                                 |
//! |-----------------------------------|---------------------------------------|
//! | `pricing.total`                   | computed total (number)               |
//! | `pricing.items.<id>.isSelected`   | non-optional or explicitly selected   |
//! | `pricing.items.<id>.quantity`     | current quantity (number)             |

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;

use folio_types::{Block, FieldPath, PricingBlockData};

use crate::pricing::{PricingSummary, compute_pricing};

/// A value stored in the context. Conditions compare against these.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ContextValue {
    Bool(bool),
    Number(f64),
}

/// Flat map from [`FieldPath`] to value, plus the pricing summary it came from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvaluationContext {
    values: HashMap<FieldPath, ContextValue>,
    pricing: Option<PricingSummary>,
}

impl EvaluationContext {
    /// An empty context (no pricing table).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Project a block sequence into a context.
    pub fn build(blocks: &[Block]) -> Self {
        match first_pricing_table(blocks) {
            Some(data) => Self::from_pricing(data),
            None => Self::empty(),
        }
    }

    /// Context for a single pricing table.
    pub fn from_pricing(data: &PricingBlockData) -> Self {
        let summary = compute_pricing(data);
        let mut values = HashMap::with_capacity(1 + data.items.len() * 2);

        values.insert(
            FieldPath::Total,
            ContextValue::Number(summary.total.to_f64().unwrap_or(0.0)),
        );
        for item in &data.items {
            values.insert(
                FieldPath::ItemSelected(item.id.clone()),
                ContextValue::Bool(item.is_effectively_selected()),
            );
            values.insert(
                FieldPath::ItemQuantity(item.id.clone()),
                ContextValue::Number(f64::from(item.quantity)),
            );
        }

        Self {
            values,
            pricing: Some(summary),
        }
    }

    pub fn get(&self, path: &FieldPath) -> Option<ContextValue> {
        self.values.get(path).copied()
    }

    pub fn contains(&self, path: &FieldPath) -> bool {
        self.values.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Totals of the pricing table the context was built from.
    pub fn pricing(&self) -> Option<&PricingSummary> {
        self.pricing.as_ref()
    }

    /// Override or add a value. Useful for previewing conditions.
    pub fn insert(&mut self, path: FieldPath, value: ContextValue) {
        self.values.insert(path, value);
    }
}

/// The pricing table that feeds the context: first in document order.
pub fn first_pricing_table(blocks: &[Block]) -> Option<&PricingBlockData> {
    blocks.iter().find_map(|b| b.data.as_pricing())
}

/// Change fingerprint of everything the context depends on.
pub fn pricing_fingerprint(blocks: &[Block]) -> u64 {
    let mut hasher = DefaultHasher::new();
    first_pricing_table(blocks).hash(&mut hasher);
    hasher.finish()
}

/// Memoizes the context by pricing fingerprint.
///
/// Edits to unrelated blocks (text, signatures, ordering of non-pricing
/// blocks) leave the fingerprint unchanged and reuse the cached context.
#[derive(Debug, Default)]
pub struct ContextCache {
    cached: Option<(u64, Arc<EvaluationContext>)>,
    hits: u64,
    misses: u64,
}

impl ContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached context if the fingerprint matches, else rebuild.
    pub fn get_or_build(&mut self, blocks: &[Block]) -> Arc<EvaluationContext> {
        let fingerprint = pricing_fingerprint(blocks);
        if let Some((cached_fp, ctx)) = &self.cached {
            if *cached_fp == fingerprint {
                self.hits += 1;
                return Arc::clone(ctx);
            }
        }

        self.misses += 1;
        let ctx = Arc::new(EvaluationContext::build(blocks));
        tracing::trace!(fingerprint, entries = ctx.len(), "rebuilt evaluation context");
        self.cached = Some((fingerprint, Arc::clone(&ctx)));
        ctx
    }

    /// `(hits, misses)` since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
