//! Block store: the ordered block sequence and its mutations.
//!
//! Position in the vector is the only ordering signal; there is no rank field.
//! Every operation is total: aiming at a missing block returns
//! [`Outcome::NoOp`] instead of failing, so replaying a command history never
//! breaks on a block that has since gone away. Malformed *input* (bad payload,
//! bad item) is still refused with a [`ValidationError`] and leaves the store
//! untouched.

use serde_json::{Map, Value};

use folio_types::{
    Block, BlockData, BlockId, BlockKind, ConditionGroup, ItemId, PricingBlockData, PricingItem,
    ValidationError,
};

/// Whether a store operation changed anything.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// State changed.
    Applied,
    /// Target missing or the operation had nothing to do.
    NoOp,
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

/// Ordered collection of blocks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockStore {
    /// Blocks in document order.
    blocks: Vec<Block>,

    /// Store version (bumped on any applied mutation).
    version: u64,
}

impl BlockStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing block sequence.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks, version: 0 }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    pub fn position(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| &b.id == id)
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    // =========================================================================
    // Block Operations
    // =========================================================================

    /// Insert a block of `kind` with default payload at `at` (default: end).
    ///
    /// An index past the end is clamped to the end.
    pub fn add_block(&mut self, kind: BlockKind, at: Option<usize>) -> BlockId {
        let block = Block::new(kind);
        let id = block.id.clone();
        let index = at.unwrap_or(self.blocks.len()).min(self.blocks.len());
        self.blocks.insert(index, block);
        self.touch();
        tracing::debug!(block_id = %id, kind = %kind, index, "added block");
        id
    }

    /// Insert a fully formed block (restore, paste, duplicate).
    pub fn insert_block(&mut self, block: Block, at: Option<usize>) -> Result<BlockId, ValidationError> {
        block.validate()?;
        if self.get(&block.id).is_some() {
            return Err(ValidationError::DuplicateBlock(block.id));
        }
        let id = block.id.clone();
        let index = at.unwrap_or(self.blocks.len()).min(self.blocks.len());
        self.blocks.insert(index, block);
        self.touch();
        Ok(id)
    }

    /// Delete a block.
    pub fn remove_block(&mut self, id: &BlockId) -> Outcome {
        match self.position(id) {
            Some(index) => {
                self.blocks.remove(index);
                self.touch();
                tracing::debug!(block_id = %id, index, "removed block");
                Outcome::Applied
            }
            None => {
                tracing::debug!(block_id = %id, "remove_block: no such block");
                Outcome::NoOp
            }
        }
    }

    /// Move `id` to sit immediately before `before`, or to the end when
    /// `before` is `None`. Relative order of every other block is preserved.
    ///
    /// No-op when `id` is missing, `before` names a missing block or `id`
    /// itself, or the block is already in place.
    pub fn move_block(&mut self, id: &BlockId, before: Option<&BlockId>) -> Outcome {
        let Some(from) = self.position(id) else {
            return Outcome::NoOp;
        };
        if before == Some(id) {
            return Outcome::NoOp;
        }
        if let Some(anchor) = before {
            if self.position(anchor).is_none() {
                return Outcome::NoOp;
            }
        }

        let block = self.blocks.remove(from);
        let to = match before {
            Some(anchor) => self.position(anchor).unwrap_or(self.blocks.len()),
            None => self.blocks.len(),
        };
        self.blocks.insert(to, block);

        if to == from {
            return Outcome::NoOp;
        }
        self.touch();
        tracing::debug!(block_id = %id, from, to, "moved block");
        Outcome::Applied
    }

    /// Shallow-merge `patch` into a block's payload. `id` and kind are untouched.
    pub fn update_block_data(
        &mut self,
        id: &BlockId,
        patch: &Map<String, Value>,
    ) -> Result<Outcome, ValidationError> {
        let Some(index) = self.position(id) else {
            return Ok(Outcome::NoOp);
        };
        let merged = self.blocks[index].data.merge_patch(patch)?;
        if merged == self.blocks[index].data {
            return Ok(Outcome::NoOp);
        }
        self.blocks[index].data = merged;
        self.touch();
        tracing::debug!(block_id = %id, fields = patch.len(), "updated block data");
        Ok(Outcome::Applied)
    }

    /// Replace a block's payload wholesale. The kind must not change.
    pub fn replace_block_data(
        &mut self,
        id: &BlockId,
        data: BlockData,
    ) -> Result<Outcome, ValidationError> {
        let Some(index) = self.position(id) else {
            return Ok(Outcome::NoOp);
        };
        let expected = self.blocks[index].kind();
        if data.kind() != expected {
            return Err(ValidationError::KindMismatch {
                expected,
                got: data.kind(),
            });
        }
        data.validate()?;
        if data == self.blocks[index].data {
            return Ok(Outcome::NoOp);
        }
        self.blocks[index].data = data;
        self.touch();
        Ok(Outcome::Applied)
    }

    /// Attach, replace or clear (`None`) a block's visibility condition.
    pub fn set_visibility(&mut self, id: &BlockId, visibility: Option<ConditionGroup>) -> Outcome {
        let Some(index) = self.position(id) else {
            return Outcome::NoOp;
        };
        if self.blocks[index].visibility == visibility {
            return Outcome::NoOp;
        }
        self.blocks[index].visibility = visibility;
        self.touch();
        Outcome::Applied
    }

    /// Copy a block (fresh ID) directly after the original.
    pub fn duplicate_block(&mut self, id: &BlockId) -> Option<BlockId> {
        let index = self.position(id)?;
        let mut copy = self.blocks[index].clone();
        copy.id = BlockId::generate();
        let new_id = copy.id.clone();
        self.blocks.insert(index + 1, copy);
        self.touch();
        tracing::debug!(block_id = %id, copy = %new_id, "duplicated block");
        Some(new_id)
    }

    // =========================================================================
    // Pricing item operations
    // =========================================================================

    /// Resolve a pricing table for an item operation.
    ///
    /// `Ok(None)` when the block is missing (no-op); an error when it exists
    /// but is not a pricing table.
    fn pricing_table_mut(
        &mut self,
        id: &BlockId,
    ) -> Result<Option<&mut PricingBlockData>, ValidationError> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };
        match self.blocks[index].data.as_pricing_mut() {
            Some(data) => Ok(Some(data)),
            None => Err(ValidationError::NotPricingTable(id.clone())),
        }
    }

    /// Append an item (default item when `None`) to a pricing table.
    ///
    /// The item ID must satisfy [`ItemId::is_valid`], and the table must still
    /// validate with the item added.
    pub fn add_pricing_item(
        &mut self,
        block_id: &BlockId,
        item: Option<PricingItem>,
    ) -> Result<Option<ItemId>, ValidationError> {
        let item = item.unwrap_or_else(|| PricingItem::new(""));
        if !item.id.is_valid() {
            return Err(ValidationError::InvalidId(item.id.to_string()));
        }
        item.validate()?;
        let Some(table) = self.pricing_table_mut(block_id)? else {
            return Ok(None);
        };
        if table.item(&item.id).is_some() {
            return Err(ValidationError::DuplicateItem(item.id));
        }

        let item_id = item.id.clone();
        let mut candidate = table.clone();
        candidate.items.push(item);
        candidate.validate()?;
        *table = candidate;
        self.touch();
        Ok(Some(item_id))
    }

    /// Shallow-merge `patch` into one item. The item's `id` is never changed.
    pub fn update_pricing_item(
        &mut self,
        block_id: &BlockId,
        item_id: &ItemId,
        patch: &Map<String, Value>,
    ) -> Result<Outcome, ValidationError> {
        let invalid = |e: serde_json::Error| ValidationError::InvalidData {
            kind: BlockKind::PricingTable,
            reason: e.to_string(),
        };

        let Some(table) = self.pricing_table_mut(block_id)? else {
            return Ok(Outcome::NoOp);
        };
        let Some(current) = table.item(item_id) else {
            return Ok(Outcome::NoOp);
        };

        let mut merged = match serde_json::to_value(current).map_err(invalid)? {
            Value::Object(map) => map,
            other => {
                return Err(ValidationError::InvalidData {
                    kind: BlockKind::PricingTable,
                    reason: format!("item encoded as {other}, expected an object"),
                });
            }
        };
        for (key, value) in patch {
            if key != "id" {
                merged.insert(key.clone(), value.clone());
            }
        }
        let updated: PricingItem =
            serde_json::from_value(Value::Object(merged)).map_err(invalid)?;
        if &updated == current {
            return Ok(Outcome::NoOp);
        }

        let mut candidate = table.clone();
        if let Some(slot) = candidate.item_mut(item_id) {
            *slot = updated;
        }
        candidate.validate()?;
        *table = candidate;
        self.touch();
        Ok(Outcome::Applied)
    }

    /// Remove one item from a pricing table.
    pub fn remove_pricing_item(
        &mut self,
        block_id: &BlockId,
        item_id: &ItemId,
    ) -> Result<Outcome, ValidationError> {
        let Some(table) = self.pricing_table_mut(block_id)? else {
            return Ok(Outcome::NoOp);
        };
        let before = table.items.len();
        table.items.retain(|i| &i.id != item_id);
        if table.items.len() == before {
            return Ok(Outcome::NoOp);
        }
        self.touch();
        Ok(Outcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::{ConditionRule, FieldPath, Operator, TextData};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn store_with(ids: &[&str]) -> BlockStore {
        BlockStore::from_blocks(
            ids.iter()
                .map(|id| Block::new(BlockKind::Text).with_id(*id))
                .collect(),
        )
    }

    fn order(store: &BlockStore) -> Vec<String> {
        store.blocks().iter().map(|b| b.id.to_string()).collect()
    }

    fn patch(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_add_block_at_end_and_index() {
        let mut store = store_with(&["a", "b"]);
        let end = store.add_block(BlockKind::Divider, None);
        assert_eq!(store.blocks()[2].id, end);

        let front = store.add_block(BlockKind::Heading, Some(0));
        assert_eq!(store.blocks()[0].id, front);
        assert_eq!(store.blocks()[0].kind(), BlockKind::Heading);

        let clamped = store.add_block(BlockKind::Text, Some(99));
        assert_eq!(store.blocks().last().unwrap().id, clamped);
        assert_eq!(store.version(), 3);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut store = store_with(&["a"]);
        assert_eq!(store.remove_block(&"zz".into()), Outcome::NoOp);
        assert_eq!(store.remove_block(&"a".into()), Outcome::Applied);
        assert!(store.is_empty());
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn test_move_before_anchor() {
        let mut store = store_with(&["a", "b", "c", "d"]);
        assert_eq!(store.move_block(&"d".into(), Some(&"b".into())), Outcome::Applied);
        assert_eq!(order(&store), ["a", "d", "b", "c"]);

        assert_eq!(store.move_block(&"a".into(), Some(&"c".into())), Outcome::Applied);
        assert_eq!(order(&store), ["d", "b", "a", "c"]);
    }

    #[test]
    fn test_move_to_end() {
        let mut store = store_with(&["a", "b", "c"]);
        assert_eq!(store.move_block(&"a".into(), None), Outcome::Applied);
        assert_eq!(order(&store), ["b", "c", "a"]);
        assert_eq!(store.move_block(&"a".into(), None), Outcome::NoOp);
    }

    #[test]
    fn test_move_noops() {
        let mut store = store_with(&["a", "b", "c"]);
        assert_eq!(store.move_block(&"x".into(), None), Outcome::NoOp);
        assert_eq!(store.move_block(&"a".into(), Some(&"x".into())), Outcome::NoOp);
        assert_eq!(store.move_block(&"a".into(), Some(&"a".into())), Outcome::NoOp);
        assert_eq!(store.move_block(&"a".into(), Some(&"b".into())), Outcome::NoOp);
        assert_eq!(order(&store), ["a", "b", "c"]);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_update_block_data_merges() {
        let mut store = BlockStore::new();
        let id = store.add_block(BlockKind::Signature, None);
        let outcome = store
            .update_block_data(&id, &patch(json!({ "role": "Buyer" })))
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);
        let sig = store.get(&id).unwrap().data.as_signature().unwrap();
        assert_eq!(sig.role, "Buyer");
        assert!(sig.required);
        assert_eq!(store.get(&id).unwrap().id, id);
    }

    #[test]
    fn test_update_block_data_rejects_invalid_and_keeps_state() {
        let mut store = BlockStore::new();
        let id = store.add_block(BlockKind::PricingTable, None);
        let before = store.clone();
        let err = store
            .update_block_data(&id, &patch(json!({ "taxRate": 120 })))
            .unwrap_err();
        assert!(matches!(err, ValidationError::TaxRateOutOfRange(_)));
        assert_eq!(store, before);
    }

    #[test]
    fn test_update_missing_block_is_noop() {
        let mut store = BlockStore::new();
        let outcome = store
            .update_block_data(&"nope".into(), &patch(json!({ "content": "x" })))
            .unwrap();
        assert_eq!(outcome, Outcome::NoOp);
    }

    #[test]
    fn test_replace_block_data_checks_kind() {
        let mut store = store_with(&["t"]);
        let err = store
            .replace_block_data(&"t".into(), BlockData::Divider)
            .unwrap_err();
        assert!(matches!(err, ValidationError::KindMismatch { .. }));

        let outcome = store
            .replace_block_data(
                &"t".into(),
                BlockData::Text(TextData {
                    content: "hello".into(),
                }),
            )
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);
    }

    #[test]
    fn test_set_visibility() {
        let mut store = store_with(&["a"]);
        let group = ConditionGroup::all(vec![ConditionRule::new(
            FieldPath::Total,
            Operator::Gt,
            10.0,
        )]);
        assert_eq!(store.set_visibility(&"a".into(), Some(group.clone())), Outcome::Applied);
        assert_eq!(store.set_visibility(&"a".into(), Some(group)), Outcome::NoOp);
        assert_eq!(store.set_visibility(&"a".into(), None), Outcome::Applied);
        assert_eq!(store.set_visibility(&"b".into(), None), Outcome::NoOp);
    }

    #[test]
    fn test_duplicate_inserts_after_original() {
        let mut store = store_with(&["a", "b"]);
        let copy = store.duplicate_block(&"a".into()).unwrap();
        assert_eq!(store.blocks()[1].id, copy);
        assert_eq!(store.blocks()[1].data, store.blocks()[0].data);
        assert!(store.duplicate_block(&"zz".into()).is_none());
    }

    #[test]
    fn test_insert_block_rejects_duplicate_id() {
        let mut store = store_with(&["a"]);
        let err = store
            .insert_block(Block::new(BlockKind::Text).with_id("a"), None)
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateBlock("a".into()));
    }

    #[test]
    fn test_pricing_item_lifecycle() {
        let mut store = BlockStore::new();
        let table = store.add_block(BlockKind::PricingTable, None);

        let item = store.add_pricing_item(&table, None).unwrap().unwrap();
        let data = store.get(&table).unwrap().data.as_pricing().unwrap();
        assert_eq!(data.items.len(), 2);

        let outcome = store
            .update_pricing_item(
                &table,
                &item,
                &patch(json!({ "quantity": 3, "unitPrice": 20, "id": "hijack" })),
            )
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);
        let data = store.get(&table).unwrap().data.as_pricing().unwrap();
        let updated = data.item(&item).unwrap();
        assert_eq!(updated.quantity, 3);

        let err = store
            .update_pricing_item(&table, &item, &patch(json!({ "quantity": 0 })))
            .unwrap_err();
        assert!(matches!(err, ValidationError::NonPositiveQuantity { .. }));

        assert_eq!(store.remove_pricing_item(&table, &item).unwrap(), Outcome::Applied);
        assert_eq!(store.remove_pricing_item(&table, &item).unwrap(), Outcome::NoOp);
    }

    #[test]
    fn test_item_edits_that_overflow_totals_are_refused() {
        let mut store = BlockStore::new();
        let table = store.add_block(BlockKind::PricingTable, None);
        let item = store.add_pricing_item(&table, None).unwrap().unwrap();
        let version = store.version();

        let err = store
            .update_pricing_item(
                &table,
                &item,
                &patch(json!({ "quantity": 10, "unitPrice": 1e28 })),
            )
            .unwrap_err();
        assert!(matches!(err, ValidationError::LineTotalOverflow(_)));

        // Each line fits on its own; together they do not.
        let big = Decimal::from_i128_with_scale(5 * 10i128.pow(28), 0);
        store
            .update_pricing_item(&table, &item, &patch(json!({ "unitPrice": 5e28 })))
            .unwrap();
        let mut second = PricingItem::new("Overage").priced(1, big);
        second.id = ItemId::from("overage");
        let err = store.add_pricing_item(&table, Some(second)).unwrap_err();
        assert_eq!(err, ValidationError::PricingOverflow);

        assert_eq!(store.version(), version + 1);
        let data = store.get(&table).unwrap().data.as_pricing().unwrap();
        assert_eq!(data.items.len(), 2);
    }

    #[test]
    fn test_added_item_ids_may_not_contain_dots() {
        let mut store = BlockStore::new();
        let table = store.add_block(BlockKind::PricingTable, None);
        let mut item = PricingItem::new("Phase");
        item.id = ItemId::from("phase.1");
        assert_eq!(
            store.add_pricing_item(&table, Some(item)),
            Err(ValidationError::InvalidId("phase.1".into()))
        );
    }

    #[test]
    fn test_item_ops_on_wrong_kind() {
        let mut store = store_with(&["t"]);
        assert_eq!(
            store.add_pricing_item(&"t".into(), None),
            Err(ValidationError::NotPricingTable("t".into()))
        );
        assert_eq!(store.add_pricing_item(&"missing".into(), None), Ok(None));
    }
}
