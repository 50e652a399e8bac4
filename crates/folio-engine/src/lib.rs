//! Pure document core for folio.
//!
//! Everything here is synchronous and side-effect free apart from the
//! [`BlockStore`] mutating its own block list. Pricing state feeds the
//! evaluation context, the context decides which blocks are live, and the
//! completion gate only counts live signature blocks:
//!
//! ```text
//! blocks ──► first pricing table ──► compute_pricing ──► EvaluationContext
//!                                                              │
//!                          ┌───────────────────────────────────┤
//!                          ▼                                   ▼
//!                  evaluate_visibility                  check_submission
//!                 IndexMap<BlockId, bool>               SubmissionCheck
//! ```

pub mod context;
pub mod evaluate;
pub mod gate;
pub mod payment;
pub mod pricing;
pub mod store;

use indexmap::IndexMap;
use serde::Serialize;

use folio_types::{Block, BlockId};

pub use context::{ContextCache, ContextValue, EvaluationContext, first_pricing_table};
pub use evaluate::{
    evaluate_group, evaluate_rule, evaluate_visibility, is_block_visible, visibility_with,
};
pub use gate::{SubmissionCheck, SubmissionError, can_submit, check_submission};
pub use payment::resolve_payment_amount;
pub use pricing::{PricingSummary, compute_pricing, format_money};
pub use store::{BlockStore, Outcome};

/// Everything derived from a block list in one pass: visibility, the pricing
/// totals behind the context, and the completion gate.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub visibility: IndexMap<BlockId, bool>,
    pub pricing: Option<PricingSummary>,
    pub submission: SubmissionCheck,
}

impl Evaluation {
    /// Evaluate against a prebuilt context.
    pub fn with_context(blocks: &[Block], ctx: &EvaluationContext) -> Self {
        Self {
            visibility: visibility_with(blocks, ctx),
            pricing: ctx.pricing().copied(),
            submission: check_submission(blocks, ctx),
        }
    }

    /// Build a fresh context and evaluate.
    pub fn compute(blocks: &[Block]) -> Self {
        Self::with_context(blocks, &EvaluationContext::build(blocks))
    }

    /// Evaluate, reusing the cached context when pricing state is unchanged.
    pub fn cached(blocks: &[Block], cache: &mut ContextCache) -> Self {
        let ctx = cache.get_or_build(blocks);
        Self::with_context(blocks, &ctx)
    }

    /// Count of blocks currently hidden by their condition.
    pub fn hidden_count(&self) -> usize {
        self.visibility.values().filter(|v| !**v).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::{
        BlockData, BlockKind, ConditionGroup, ConditionRule, FieldPath, Operator, PricingBlockData,
        PricingItem, SignatureBlockData,
    };
    use rust_decimal::Decimal;

    fn proposal(total_price: i64) -> Vec<Block> {
        let mut pricing = PricingBlockData::empty();
        pricing.items.push(PricingItem::new("Build").priced(1, Decimal::from(total_price)));

        let big_deal = ConditionGroup::all(vec![ConditionRule::new(
            FieldPath::Total,
            Operator::Gt,
            1000.0,
        )]);

        vec![
            Block::new(BlockKind::Heading).with_id("title"),
            Block::with_data(BlockData::PricingTable(pricing)).with_id("price"),
            Block::with_data(BlockData::Signature(SignatureBlockData {
                role: "Client".into(),
                required: true,
                signature_value: Some("Ada".into()),
                signed_at: Some(1),
            }))
            .with_id("client"),
            Block::with_data(BlockData::Signature(SignatureBlockData {
                role: "Director".into(),
                ..SignatureBlockData::default()
            }))
            .with_id("director")
            .with_visibility(big_deal),
        ]
    }

    #[test]
    fn test_small_deal_skips_director_signature() {
        let eval = Evaluation::compute(&proposal(500));
        assert!(!eval.visibility[&BlockId::from("director")]);
        assert_eq!(eval.hidden_count(), 1);
        assert!(eval.submission.ok);
        assert_eq!(eval.pricing.map(|p| p.total), Some(Decimal::from(500)));
    }

    #[test]
    fn test_large_deal_requires_director_signature() {
        let eval = Evaluation::compute(&proposal(5000));
        assert!(eval.visibility[&BlockId::from("director")]);
        assert!(!eval.submission.ok);
        assert_eq!(eval.submission.missing_roles, vec!["Director".to_string()]);
    }

    #[test]
    fn test_cached_matches_fresh() {
        let blocks = proposal(5000);
        let mut cache = ContextCache::new();
        let first = Evaluation::cached(&blocks, &mut cache);
        let second = Evaluation::cached(&blocks, &mut cache);
        assert_eq!(first, Evaluation::compute(&blocks));
        assert_eq!(first, second);
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_loaded_dotted_item_id_drives_visibility() {
        let doc = folio_types::Document::from_json(
            r#"{
                "title": "Phased rollout",
                "blocks": [
                    {"id": "price", "type": "pricing_table", "data": {"items": [
                        {"id": "item.1", "quantity": 2, "unitPrice": 40,
                         "isOptional": true, "isSelected": true}
                    ]}},
                    {"id": "phase-note", "type": "text", "data": {"content": "Phase one"},
                     "visibility": {"logic": "AND", "rules": [
                        {"field": "pricing.items.item.1.isSelected", "operator": "==", "value": true},
                        {"field": "pricing.items.item.1.quantity", "operator": ">=", "value": 2}
                     ]}}
                ]
            }"#,
        )
        .unwrap();

        let eval = Evaluation::compute(&doc.blocks);
        assert!(eval.visibility[&BlockId::from("phase-note")]);
        assert_eq!(eval.pricing.map(|p| p.total), Some(Decimal::from(80)));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(Evaluation::compute(&proposal(5000))).unwrap();
        assert_eq!(json["submission"]["missingRoles"][0], "Director");
        assert_eq!(json["visibility"]["title"], true);
        assert_eq!(json["pricing"]["total"], 5000.0);
    }
}
