//! Signature completion gate: may this document be submitted?
//!
//! Visibility is authoritative over `required`: a required signature block
//! whose condition currently hides it drops out of the requirement. Blocks
//! form a flat sequence, so a block's own condition is the only one that can
//! hide it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use folio_types::Block;

use crate::context::EvaluationContext;
use crate::evaluate::is_block_visible;

/// Outcome of the completion gate.
///
/// A plain value rather than an error: the caller renders `missing_roles`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionCheck {
    pub ok: bool,
    /// Signer roles still owing a signature, in document order, no repeats.
    pub missing_roles: Vec<String>,
    /// Number of required signatures that are currently visible.
    pub required: usize,
    /// How many of those are signed.
    pub completed: usize,
}

/// Submission attempted while signatures are outstanding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("missing signatures for: {}", .missing_roles.join(", "))]
pub struct SubmissionError {
    pub missing_roles: Vec<String>,
}

impl SubmissionCheck {
    /// `Ok(())` when submittable, otherwise the missing roles as an error.
    pub fn into_result(self) -> Result<(), SubmissionError> {
        if self.ok {
            Ok(())
        } else {
            Err(SubmissionError {
                missing_roles: self.missing_roles,
            })
        }
    }
}

/// Gate against a prebuilt context.
pub fn check_submission(blocks: &[Block], ctx: &EvaluationContext) -> SubmissionCheck {
    let mut required = 0;
    let mut completed = 0;
    let mut missing_roles: Vec<String> = Vec::new();

    for block in blocks {
        let Some(sig) = block.data.as_signature() else {
            continue;
        };
        if !sig.required || !is_block_visible(block, ctx) {
            continue;
        }
        required += 1;
        if sig.is_signed() {
            completed += 1;
        } else if !missing_roles.contains(&sig.role) {
            missing_roles.push(sig.role.clone());
        }
    }

    SubmissionCheck {
        ok: completed == required,
        missing_roles,
        required,
        completed,
    }
}

/// Build the context from `blocks` and run the gate.
pub fn can_submit(blocks: &[Block]) -> SubmissionCheck {
    let ctx = EvaluationContext::build(blocks);
    check_submission(blocks, &ctx)
}
