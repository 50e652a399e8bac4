//! Condition evaluator: rule groups over an [`EvaluationContext`].
//!
//! Evaluation never fails. A missing path, a type mismatch, or a non-numeric
//! operand to an ordering operator all yield `false`, so a broken reference
//! can only ever hide content, never reveal or require it.

use indexmap::IndexMap;

use folio_types::{Block, BlockId, ConditionGroup, ConditionRule, ConditionValue, Logic, Operator};

use crate::context::{ContextValue, EvaluationContext};

/// Evaluate one rule against the context.
pub fn evaluate_rule(rule: &ConditionRule, ctx: &EvaluationContext) -> bool {
    let Some(actual) = ctx.get(&rule.field) else {
        return false;
    };

    match (actual, &rule.value) {
        (ContextValue::Number(lhs), ConditionValue::Number(rhs)) => {
            compare_numbers(lhs, rule.operator, *rhs)
        }
        // Booleans have no ordering.
        (ContextValue::Bool(_), ConditionValue::Bool(_)) if rule.operator.is_numeric() => false,
        (ContextValue::Bool(lhs), ConditionValue::Bool(rhs)) => match rule.operator {
            Operator::Ne => lhs != *rhs,
            _ => lhs == *rhs,
        },
        // Mismatched types never compare, for equality or inequality.
        _ => false,
    }
}

fn compare_numbers(lhs: f64, op: Operator, rhs: f64) -> bool {
    match op {
        Operator::Eq => lhs == rhs,
        Operator::Ne => lhs != rhs,
        Operator::Gt => lhs > rhs,
        Operator::Lt => lhs < rhs,
        Operator::Ge => lhs >= rhs,
        Operator::Le => lhs <= rhs,
    }
}

/// Combine a group's rules. An empty group is unconditional (`true`).
pub fn evaluate_group(group: &ConditionGroup, ctx: &EvaluationContext) -> bool {
    if group.rules.is_empty() {
        return true;
    }
    match group.logic {
        Logic::And => group.rules.iter().all(|r| evaluate_rule(r, ctx)),
        Logic::Or => group.rules.iter().any(|r| evaluate_rule(r, ctx)),
    }
}

/// A block with no condition is always visible.
pub fn is_block_visible(block: &Block, ctx: &EvaluationContext) -> bool {
    match &block.visibility {
        None => true,
        Some(group) => evaluate_group(group, ctx),
    }
}

/// Visibility of every block against a prebuilt context, in document order.
pub fn visibility_with(blocks: &[Block], ctx: &EvaluationContext) -> IndexMap<BlockId, bool> {
    blocks
        .iter()
        .map(|b| (b.id.clone(), is_block_visible(b, ctx)))
        .collect()
}

/// Build the context from `blocks` and evaluate every block's visibility.
pub fn evaluate_visibility(blocks: &[Block]) -> IndexMap<BlockId, bool> {
    let ctx = EvaluationContext::build(blocks);
    visibility_with(blocks, &ctx)
}
