//! The persisted document: a title plus an ordered block sequence.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Block, BlockId, PricingBlockData, SignatureBlockData, ValidationError};

/// Title given to documents created without one.
pub const UNTITLED: &str = "Untitled proposal";

/// `{ title, blocks }`, the JSON form exchanged with persistence.
///
/// Block order in `blocks` is the only ordering signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

fn default_title() -> String {
    UNTITLED.to_string()
}

impl Default for Document {
    fn default() -> Self {
        Self::new(UNTITLED)
    }
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    /// Builder-style block list.
    pub fn with_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    /// Index of a block in document order.
    pub fn position(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| &b.id == id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.position(id).is_some()
    }

    /// Pricing tables in document order.
    pub fn pricing_tables(&self) -> impl Iterator<Item = (&Block, &PricingBlockData)> {
        self.blocks
            .iter()
            .filter_map(|b| b.data.as_pricing().map(|p| (b, p)))
    }

    /// Signature blocks in document order.
    pub fn signature_blocks(&self) -> impl Iterator<Item = (&Block, &SignatureBlockData)> {
        self.blocks
            .iter()
            .filter_map(|b| b.data.as_signature().map(|s| (b, s)))
    }

    /// Check that block IDs are unique and every block is valid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for block in &self.blocks {
            block.validate()?;
            if !seen.insert(&block.id) {
                return Err(ValidationError::DuplicateBlock(block.id.clone()));
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let doc: Document = serde_json::from_str(json)?;
        doc.validate().map_err(serde::de::Error::custom)?;
        Ok(doc)
    }
}
