//! Block model: a closed set of kinds with a typed payload per kind.
//!
//! ## Design: Block = id + BlockData + optional condition
//!
//! `BlockData` is a tagged enum, so every consumer matches exhaustively and
//! nothing casts payloads at runtime. The kind is never stored separately;
//! [`BlockData::kind`] derives it from the variant, so the two cannot diverge.
//!
//! ## Wire format
//!
//! ```json
//! { "id": "b1", "type": "pricing_table", "data": { ... }, "visibility": { ... } }
//! ```
//!
//! `data` may be omitted or `null`, in which case the kind's defaults apply.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::EnumString;

use crate::{BlockId, ConditionGroup, PricingBlockData, ValidationError};

/// What a block *is*.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BlockKind {
    /// Free-form rich text.
    Text,
    /// Section heading.
    Heading,
    /// Embedded image.
    Image,
    /// Embedded video.
    Video,
    /// Horizontal rule.
    Divider,
    /// Line items with discount and tax.
    #[strum(serialize = "pricing_table", serialize = "pricing")]
    PricingTable,
    /// Signature field for one signer role.
    Signature,
    /// Payment collection.
    Payment,
}

impl BlockKind {
    /// Every kind, in palette order.
    pub const ALL: [BlockKind; 8] = [
        BlockKind::Text,
        BlockKind::Heading,
        BlockKind::Image,
        BlockKind::Video,
        BlockKind::Divider,
        BlockKind::PricingTable,
        BlockKind::Signature,
        BlockKind::Payment,
    ];

    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Text => "text",
            BlockKind::Heading => "heading",
            BlockKind::Image => "image",
            BlockKind::Video => "video",
            BlockKind::Divider => "divider",
            BlockKind::PricingTable => "pricing_table",
            BlockKind::Signature => "signature",
            BlockKind::Payment => "payment",
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextData {
    #[serde(default)]
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingData {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_heading_level")]
    pub level: u8,
}

fn default_heading_level() -> u8 {
    2
}

impl Default for HeadingData {
    fn default() -> Self {
        Self {
            text: String::new(),
            level: default_heading_level(),
        }
    }
}

/// Image or video reference. Upload and storage are handled elsewhere.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaData {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Signature field. `signature_value` and `signed_at` are written back by
/// the signature capture UI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureBlockData {
    #[serde(default = "default_signer_role")]
    pub role: String,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_value: Option<String>,
    /// Unix millis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<u64>,
}

fn default_signer_role() -> String {
    "Client".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SignatureBlockData {
    fn default() -> Self {
        Self {
            role: default_signer_role(),
            required: true,
            signature_value: None,
            signed_at: None,
        }
    }
}

impl SignatureBlockData {
    /// Signed means a non-blank signature value.
    pub fn is_signed(&self) -> bool {
        self.signature_value
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty())
    }
}

/// Where a payment block's amount comes from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentAmount {
    /// Total of the document's first pricing table.
    #[default]
    PricingTotal,
    /// A fixed amount.
    Fixed(#[serde(with = "rust_decimal::serde::float")] Decimal),
}

/// Payment status, written back by the payment collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBlockData {
    #[serde(default)]
    pub amount: PaymentAmount,
    #[serde(default = "default_payment_currency")]
    pub currency: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub status: PaymentStatus,
    /// Unix millis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<u64>,
}

fn default_payment_currency() -> String {
    crate::pricing::DEFAULT_CURRENCY.to_string()
}

impl Default for PaymentBlockData {
    fn default() -> Self {
        Self {
            amount: PaymentAmount::PricingTotal,
            currency: default_payment_currency(),
            required: false,
            status: PaymentStatus::Pending,
            paid_at: None,
        }
    }
}

/// Type-specific payload of a block.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockData {
    Text(TextData),
    Heading(HeadingData),
    Image(MediaData),
    Video(MediaData),
    Divider,
    PricingTable(PricingBlockData),
    Signature(SignatureBlockData),
    Payment(PaymentBlockData),
}

impl BlockData {
    /// The payload a freshly added block of `kind` starts with.
    pub fn default_for(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Text => BlockData::Text(TextData::default()),
            BlockKind::Heading => BlockData::Heading(HeadingData::default()),
            BlockKind::Image => BlockData::Image(MediaData::default()),
            BlockKind::Video => BlockData::Video(MediaData::default()),
            BlockKind::Divider => BlockData::Divider,
            BlockKind::PricingTable => BlockData::PricingTable(PricingBlockData::default()),
            BlockKind::Signature => BlockData::Signature(SignatureBlockData::default()),
            BlockKind::Payment => BlockData::Payment(PaymentBlockData::default()),
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            BlockData::Text(_) => BlockKind::Text,
            BlockData::Heading(_) => BlockKind::Heading,
            BlockData::Image(_) => BlockKind::Image,
            BlockData::Video(_) => BlockKind::Video,
            BlockData::Divider => BlockKind::Divider,
            BlockData::PricingTable(_) => BlockKind::PricingTable,
            BlockData::Signature(_) => BlockKind::Signature,
            BlockData::Payment(_) => BlockKind::Payment,
        }
    }

    /// Decode a JSON payload for `kind`. `null` yields the kind's defaults.
    pub fn from_value(kind: BlockKind, value: Value) -> Result<Self, ValidationError> {
        if value.is_null() {
            return Ok(Self::default_for(kind));
        }

        let invalid = |e: serde_json::Error| ValidationError::InvalidData {
            kind,
            reason: e.to_string(),
        };

        let data = match kind {
            BlockKind::Text => BlockData::Text(serde_json::from_value(value).map_err(invalid)?),
            BlockKind::Heading => {
                BlockData::Heading(serde_json::from_value(value).map_err(invalid)?)
            }
            BlockKind::Image => BlockData::Image(serde_json::from_value(value).map_err(invalid)?),
            BlockKind::Video => BlockData::Video(serde_json::from_value(value).map_err(invalid)?),
            BlockKind::Divider => BlockData::Divider,
            BlockKind::PricingTable => {
                BlockData::PricingTable(serde_json::from_value(value).map_err(invalid)?)
            }
            BlockKind::Signature => {
                BlockData::Signature(serde_json::from_value(value).map_err(invalid)?)
            }
            BlockKind::Payment => {
                BlockData::Payment(serde_json::from_value(value).map_err(invalid)?)
            }
        };
        Ok(data)
    }

    /// Encode the payload as a JSON object (`{}` for dividers).
    pub fn to_value(&self) -> Value {
        let encoded = match self {
            BlockData::Text(d) => serde_json::to_value(d),
            BlockData::Heading(d) => serde_json::to_value(d),
            BlockData::Image(d) | BlockData::Video(d) => serde_json::to_value(d),
            BlockData::Divider => Ok(Value::Object(Map::new())),
            BlockData::PricingTable(d) => serde_json::to_value(d),
            BlockData::Signature(d) => serde_json::to_value(d),
            BlockData::Payment(d) => serde_json::to_value(d),
        };
        // Plain data structs with string keys always encode.
        encoded.unwrap_or_default()
    }

    /// Shallow-merge `patch` into this payload and decode the result.
    ///
    /// Top-level keys in `patch` replace the existing ones; keys not present
    /// are kept. The merged payload is validated before it is returned.
    pub fn merge_patch(&self, patch: &Map<String, Value>) -> Result<Self, ValidationError> {
        let kind = self.kind();
        let mut merged = match self.to_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }
        let data = Self::from_value(kind, Value::Object(merged))?;
        data.validate()?;
        Ok(data)
    }

    /// Kind-specific invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            BlockData::Heading(h) if !(1..=3).contains(&h.level) => {
                Err(ValidationError::HeadingLevel(h.level))
            }
            BlockData::PricingTable(p) => p.validate(),
            BlockData::Payment(PaymentBlockData {
                amount: PaymentAmount::Fixed(amount),
                ..
            }) if amount.is_sign_negative() && !amount.is_zero() => {
                Err(ValidationError::InvalidData {
                    kind: BlockKind::Payment,
                    reason: format!("negative payment amount {amount}"),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn as_pricing(&self) -> Option<&PricingBlockData> {
        match self {
            BlockData::PricingTable(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_pricing_mut(&mut self) -> Option<&mut PricingBlockData> {
        match self {
            BlockData::PricingTable(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_signature(&self) -> Option<&SignatureBlockData> {
        match self {
            BlockData::Signature(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_payment(&self) -> Option<&PaymentBlockData> {
        match self {
            BlockData::Payment(p) => Some(p),
            _ => None,
        }
    }
}

// ============================================================================
// Block
// ============================================================================

/// An addressable, typed unit of document content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBlock", into = "RawBlock")]
pub struct Block {
    pub id: BlockId,
    pub data: BlockData,
    /// `None` means always visible.
    pub visibility: Option<ConditionGroup>,
}

impl Block {
    /// A new block of `kind` with default payload and a generated ID.
    pub fn new(kind: BlockKind) -> Self {
        Self::with_data(BlockData::default_for(kind))
    }

    /// A new block with the given payload and a generated ID.
    pub fn with_data(data: BlockData) -> Self {
        Self {
            id: BlockId::generate(),
            data,
            visibility: None,
        }
    }

    /// Builder-style explicit ID.
    pub fn with_id(mut self, id: impl Into<BlockId>) -> Self {
        self.id = id.into();
        self
    }

    /// Builder-style visibility condition.
    pub fn with_visibility(mut self, group: ConditionGroup) -> Self {
        self.visibility = Some(group);
        self
    }

    pub fn kind(&self) -> BlockKind {
        self.data.kind()
    }

    /// Check the ID and the payload.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.as_str().is_empty() {
            return Err(ValidationError::InvalidId(self.id.to_string()));
        }
        self.data.validate()
    }
}

/// Serde mirror of [`Block`] with the payload left as raw JSON.
#[derive(Serialize, Deserialize)]
struct RawBlock {
    id: BlockId,
    #[serde(rename = "type")]
    kind: BlockKind,
    #[serde(default)]
    data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    visibility: Option<ConditionGroup>,
}

impl TryFrom<RawBlock> for Block {
    type Error = ValidationError;

    fn try_from(raw: RawBlock) -> Result<Self, Self::Error> {
        let block = Block {
            id: raw.id,
            data: BlockData::from_value(raw.kind, raw.data)?,
            visibility: raw.visibility,
        };
        block.validate()?;
        Ok(block)
    }
}

impl From<Block> for RawBlock {
    fn from(block: Block) -> Self {
        RawBlock {
            id: block.id,
            kind: block.data.kind(),
            data: block.data.to_value(),
            visibility: block.visibility,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConditionRule, FieldPath, Operator};
    use serde_json::json;

    #[test]
    fn test_kind_strings_round_trip() {
        for kind in BlockKind::ALL {
            assert_eq!(BlockKind::from_str(kind.as_str()), Some(kind));
            let encoded = serde_json::to_value(kind).unwrap();
            assert_eq!(encoded, json!(kind.as_str()));
        }
        assert_eq!(BlockKind::from_str("PRICING"), Some(BlockKind::PricingTable));
        assert_eq!(BlockKind::from_str("nope"), None);
    }

    #[test]
    fn test_defaults_match_kind() {
        for kind in BlockKind::ALL {
            let block = Block::new(kind);
            assert_eq!(block.kind(), kind);
            assert!(block.visibility.is_none());
            assert!(block.validate().is_ok());
        }
    }

    #[test]
    fn test_block_wire_format() {
        let json = json!({
            "id": "sig1",
            "type": "signature",
            "data": { "role": "Buyer", "required": true },
            "visibility": {
                "logic": "AND",
                "rules": [{ "field": "pricing.total", "operator": ">", "value": 500 }]
            }
        });
        let block: Block = serde_json::from_value(json).unwrap();
        assert_eq!(block.id.as_str(), "sig1");
        let sig = block.data.as_signature().unwrap();
        assert_eq!(sig.role, "Buyer");
        assert!(!sig.is_signed());
        let rule = &block.visibility.as_ref().unwrap().rules[0];
        assert_eq!(rule.field, FieldPath::Total);

        let back = serde_json::to_value(&block).unwrap();
        assert_eq!(back["type"], "signature");
        assert_eq!(back["data"]["role"], "Buyer");
        assert!(back["data"].get("signatureValue").is_none());
    }

    #[test]
    fn test_missing_data_gets_defaults() {
        let block: Block = serde_json::from_value(json!({ "id": "h", "type": "heading" })).unwrap();
        assert_eq!(block.data, BlockData::Heading(HeadingData::default()));

        let divider: Block =
            serde_json::from_value(json!({ "id": "d", "type": "divider", "data": {} })).unwrap();
        assert_eq!(divider.data, BlockData::Divider);
        assert!(serde_json::to_value(&divider).unwrap().get("visibility").is_none());
    }

    #[test]
    fn test_invalid_payload_rejected_on_load() {
        let result: Result<Block, _> = serde_json::from_value(json!({
            "id": "p", "type": "pricing_table",
            "data": { "items": [], "taxRate": 250 }
        }));
        assert!(result.is_err());

        let result: Result<Block, _> = serde_json::from_value(json!({
            "id": "t", "type": "text", "data": { "content": 42 }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_patch_keeps_other_fields() {
        let data = BlockData::Heading(HeadingData {
            text: "Intro".into(),
            level: 1,
        });
        let patch = json!({ "text": "Overview" });
        let merged = data.merge_patch(patch.as_object().unwrap()).unwrap();
        assert_eq!(
            merged,
            BlockData::Heading(HeadingData {
                text: "Overview".into(),
                level: 1
            })
        );
    }

    #[test]
    fn test_merge_patch_validates() {
        let data = BlockData::Heading(HeadingData::default());
        let patch = json!({ "level": 9 });
        assert_eq!(
            data.merge_patch(patch.as_object().unwrap()),
            Err(ValidationError::HeadingLevel(9))
        );

        let pricing = BlockData::default_for(BlockKind::PricingTable);
        let patch = json!({ "taxRate": 101 });
        assert!(matches!(
            pricing.merge_patch(patch.as_object().unwrap()),
            Err(ValidationError::TaxRateOutOfRange(_))
        ));
    }

    #[test]
    fn test_merge_patch_type_mismatch() {
        let data = BlockData::Text(TextData::default());
        let patch = json!({ "content": ["not", "a", "string"] });
        assert!(matches!(
            data.merge_patch(patch.as_object().unwrap()),
            Err(ValidationError::InvalidData { kind: BlockKind::Text, .. })
        ));
    }

    #[test]
    fn test_signed_requires_non_blank_value() {
        let mut sig = SignatureBlockData::default();
        assert!(!sig.is_signed());
        sig.signature_value = Some("   ".into());
        assert!(!sig.is_signed());
        sig.signature_value = Some("Ada Lovelace".into());
        assert!(sig.is_signed());
    }

    #[test]
    fn test_payment_amount_wire_format() {
        let fixed: PaymentBlockData =
            serde_json::from_value(json!({ "amount": { "fixed": 250 }, "required": true }))
                .unwrap();
        assert_eq!(fixed.amount, PaymentAmount::Fixed(Decimal::from(250)));
        let total: PaymentBlockData =
            serde_json::from_value(json!({ "amount": "pricing_total" })).unwrap();
        assert_eq!(total.amount, PaymentAmount::PricingTotal);
        assert_eq!(total.status, PaymentStatus::Pending);
    }

    #[test]
    fn test_builder_helpers() {
        let rule = ConditionRule::new(FieldPath::Total, Operator::Gt, 100.0);
        let block = Block::new(BlockKind::Text)
            .with_id("t1")
            .with_visibility(ConditionGroup::all(vec![rule]));
        assert_eq!(block.id.as_str(), "t1");
        assert_eq!(block.visibility.unwrap().rules.len(), 1);
    }
}
