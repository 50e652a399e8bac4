//! Editing commands, the only way a [`Document`] changes.
//!
//! Commands serialize as `{"op": "add_block", ...}` so a script of edits can
//! be stored as JSON and replayed through a session. Op names are snake_case;
//! fields are camelCase like the document payloads they carry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use folio_engine::{BlockStore, Outcome};
use folio_types::{
    Block, BlockData, BlockId, BlockKind, ConditionGroup, Document, ItemId, PricingItem,
    ValidationError,
};

/// One mutating edit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Command {
    /// Insert a block with default payload. `id` is generated when omitted.
    AddBlock {
        kind: BlockKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<BlockId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        at: Option<usize>,
    },
    RemoveBlock {
        id: BlockId,
    },
    /// Move before `before`, or to the end when `before` is omitted.
    MoveBlock {
        id: BlockId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        before: Option<BlockId>,
    },
    /// Shallow-merge `patch` into the payload.
    UpdateBlockData {
        id: BlockId,
        patch: Map<String, Value>,
    },
    /// Replace the payload wholesale; `data` is read as the block's kind.
    ReplaceBlockData {
        id: BlockId,
        data: Value,
    },
    SetVisibility {
        id: BlockId,
        #[serde(default)]
        visibility: Option<ConditionGroup>,
    },
    DuplicateBlock {
        id: BlockId,
    },
    SetTitle {
        title: String,
    },
    AddPricingItem {
        block_id: BlockId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item: Option<PricingItem>,
    },
    UpdatePricingItem {
        block_id: BlockId,
        item_id: ItemId,
        patch: Map<String, Value>,
    },
    RemovePricingItem {
        block_id: BlockId,
        item_id: ItemId,
    },
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddBlock { .. } => "add_block",
            Command::RemoveBlock { .. } => "remove_block",
            Command::MoveBlock { .. } => "move_block",
            Command::UpdateBlockData { .. } => "update_block_data",
            Command::ReplaceBlockData { .. } => "replace_block_data",
            Command::SetVisibility { .. } => "set_visibility",
            Command::DuplicateBlock { .. } => "duplicate_block",
            Command::SetTitle { .. } => "set_title",
            Command::AddPricingItem { .. } => "add_pricing_item",
            Command::UpdatePricingItem { .. } => "update_pricing_item",
            Command::RemovePricingItem { .. } => "remove_pricing_item",
        }
    }

    /// Run the command against `document` in place.
    ///
    /// On error the document may be partially modified; callers apply to a
    /// copy and discard it (see [`crate::DocumentState::apply`]).
    pub fn execute(&self, document: &mut Document) -> Result<Outcome, ValidationError> {
        if let Command::SetTitle { title } = self {
            if &document.title == title {
                return Ok(Outcome::NoOp);
            }
            document.title = title.clone();
            return Ok(Outcome::Applied);
        }

        let mut store = BlockStore::from_blocks(std::mem::take(&mut document.blocks));
        let result = self.execute_on_store(&mut store);
        document.blocks = store.into_blocks();
        result
    }

    fn execute_on_store(&self, store: &mut BlockStore) -> Result<Outcome, ValidationError> {
        match self {
            Command::AddBlock { kind, id: None, at } => {
                let _ = store.add_block(*kind, *at);
                Ok(Outcome::Applied)
            }
            Command::AddBlock {
                kind,
                id: Some(id),
                at,
            } => {
                if !id.is_valid() {
                    return Err(ValidationError::InvalidId(id.to_string()));
                }
                store.insert_block(Block::new(*kind).with_id(id.clone()), *at)?;
                Ok(Outcome::Applied)
            }
            Command::RemoveBlock { id } => Ok(store.remove_block(id)),
            Command::MoveBlock { id, before } => Ok(store.move_block(id, before.as_ref())),
            Command::UpdateBlockData { id, patch } => store.update_block_data(id, patch),
            Command::ReplaceBlockData { id, data } => {
                let Some(kind) = store.get(id).map(Block::kind) else {
                    return Ok(Outcome::NoOp);
                };
                let data = BlockData::from_value(kind, data.clone())?;
                store.replace_block_data(id, data)
            }
            Command::SetVisibility { id, visibility } => {
                Ok(store.set_visibility(id, visibility.clone()))
            }
            Command::DuplicateBlock { id } => Ok(match store.duplicate_block(id) {
                Some(_) => Outcome::Applied,
                None => Outcome::NoOp,
            }),
            Command::AddPricingItem { block_id, item } => {
                Ok(match store.add_pricing_item(block_id, item.clone())? {
                    Some(_) => Outcome::Applied,
                    None => Outcome::NoOp,
                })
            }
            Command::UpdatePricingItem {
                block_id,
                item_id,
                patch,
            } => store.update_pricing_item(block_id, item_id, patch),
            Command::RemovePricingItem { block_id, item_id } => {
                store.remove_pricing_item(block_id, item_id)
            }
            Command::SetTitle { .. } => Ok(Outcome::NoOp),
        }
    }
}

/// History navigation, kept apart from [`Command`] because it is not an edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HistoryStep {
    Undo,
    Redo,
}

/// One entry of an edit script: an edit or a history step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    History(HistoryStep),
    Edit(Command),
}

impl From<Command> for Step {
    fn from(command: Command) -> Self {
        Step::Edit(command)
    }
}

/// Parse a JSON array of steps.
pub fn parse_script(json: &str) -> Result<Vec<Step>, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_wire_format() {
        let cmd: Command = serde_json::from_value(json!({
            "op": "move_block",
            "id": "b2",
        }))
        .unwrap();
        assert_eq!(
            cmd,
            Command::MoveBlock {
                id: BlockId::from("b2"),
                before: None
            }
        );

        let cmd: Command = serde_json::from_value(json!({
            "op": "add_block",
            "kind": "pricing_table",
            "at": 0,
        }))
        .unwrap();
        assert_eq!(cmd.name(), "add_block");
    }

    #[test]
    fn test_command_fields_are_camel_case() {
        let cmd: Command = serde_json::from_value(json!({
            "op": "update_pricing_item",
            "blockId": "price",
            "itemId": "base",
            "patch": {"unitPrice": 120},
        }))
        .unwrap();
        assert!(matches!(cmd, Command::UpdatePricingItem { .. }));

        let out = serde_json::to_value(&cmd).unwrap();
        assert_eq!(out["blockId"], "price");
        assert_eq!(out["itemId"], "base");
        assert!(out.get("block_id").is_none());
    }

    #[test]
    fn test_script_mixes_edits_and_history() {
        let steps = parse_script(
            r#"[
                {"op": "add_block", "kind": "text", "id": "t1"},
                {"op": "undo"},
                {"op": "redo"},
                {"op": "set_title", "title": "Q3 retainer"}
            ]"#,
        )
        .unwrap();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[1], Step::History(HistoryStep::Undo));
        assert_eq!(steps[2], Step::History(HistoryStep::Redo));
        assert!(matches!(steps[3], Step::Edit(Command::SetTitle { .. })));
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        assert!(parse_script(r#"[{"op": "explode"}]"#).is_err());
    }

    #[test]
    fn test_execute_add_with_explicit_id() {
        let mut doc = Document::default();
        let cmd = Command::AddBlock {
            kind: BlockKind::Signature,
            id: Some("sig".into()),
            at: None,
        };
        assert_eq!(cmd.execute(&mut doc).unwrap(), Outcome::Applied);
        assert!(doc.contains(&BlockId::from("sig")));

        let err = cmd.execute(&mut doc).unwrap_err();
        assert_eq!(err, ValidationError::DuplicateBlock("sig".into()));
    }

    #[test]
    fn test_execute_missing_target_is_noop() {
        let mut doc = Document::default();
        let cmd = Command::UpdateBlockData {
            id: "ghost".into(),
            patch: Map::new(),
        };
        assert_eq!(cmd.execute(&mut doc).unwrap(), Outcome::NoOp);

        let cmd = Command::ReplaceBlockData {
            id: "ghost".into(),
            data: json!({"content": "hi"}),
        };
        assert_eq!(cmd.execute(&mut doc).unwrap(), Outcome::NoOp);
    }

    #[test]
    fn test_set_title_same_value_is_noop() {
        let mut doc = Document::new("Same");
        let cmd = Command::SetTitle {
            title: "Same".into(),
        };
        assert_eq!(cmd.execute(&mut doc).unwrap(), Outcome::NoOp);
    }
}
