//! Visibility conditions: rule groups over a typed field path.
//!
//! On the wire a rule's `field` is a dotted string such as
//! `"pricing.items.item1.isSelected"`. It is parsed into a [`FieldPath`] once,
//! when the condition is deserialized or constructed, so evaluation never
//! re-parses strings. A malformed path is a [`ValidationError`] at that point.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ItemId, ValidationError};

const TOTAL_PATH: &str = "pricing.total";
const ITEMS_PREFIX: &str = "pricing.items.";
const SELECTED_FIELD: &str = "isSelected";
const QUANTITY_FIELD: &str = "quantity";

/// Addressable location in the evaluation context.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldPath {
    /// `pricing.total`
    Total,
    /// `pricing.items.<id>.isSelected`
    ItemSelected(ItemId),
    /// `pricing.items.<id>.quantity`
    ItemQuantity(ItemId),
}

impl FromStr for FieldPath {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == TOTAL_PATH {
            return Ok(FieldPath::Total);
        }

        let malformed = || ValidationError::MalformedPath(s.to_string());
        let rest = s.strip_prefix(ITEMS_PREFIX).ok_or_else(malformed)?;
        // The field name never contains a dot, so the item ID may.
        let (id, field) = rest.rsplit_once('.').ok_or_else(malformed)?;
        if id.is_empty() {
            return Err(malformed());
        }
        let id = ItemId::from(id);

        match field {
            SELECTED_FIELD => Ok(FieldPath::ItemSelected(id)),
            QUANTITY_FIELD => Ok(FieldPath::ItemQuantity(id)),
            _ => Err(malformed()),
        }
    }
}

impl TryFrom<String> for FieldPath {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> String {
        path.to_string()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Total => f.write_str(TOTAL_PATH),
            FieldPath::ItemSelected(id) => write!(f, "{ITEMS_PREFIX}{id}.{SELECTED_FIELD}"),
            FieldPath::ItemQuantity(id) => write!(f, "{ITEMS_PREFIX}{id}.{QUANTITY_FIELD}"),
        }
    }
}

/// Comparison operator of a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
}

impl Operator {
    /// Ordering operators only apply to numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Operator::Gt | Operator::Lt | Operator::Ge | Operator::Le)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Literal on the right-hand side of a rule.
///
/// Untagged: JSON `true`, `5` and `"5"` map to three distinct variants, and
/// evaluation never coerces between them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<bool> for ConditionValue {
    fn from(v: bool) -> Self {
        ConditionValue::Bool(v)
    }
}

impl From<f64> for ConditionValue {
    fn from(v: f64) -> Self {
        ConditionValue::Number(v)
    }
}

impl From<i64> for ConditionValue {
    fn from(v: i64) -> Self {
        ConditionValue::Number(v as f64)
    }
}

impl From<&str> for ConditionValue {
    fn from(v: &str) -> Self {
        ConditionValue::Text(v.to_string())
    }
}

/// A single comparison: `context[field] <operator> value`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConditionRule {
    pub field: FieldPath,
    #[serde(alias = "op")]
    pub operator: Operator,
    pub value: ConditionValue,
}

impl ConditionRule {
    pub fn new(field: FieldPath, operator: Operator, value: impl Into<ConditionValue>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
        }
    }

    /// Build from a dotted path string, rejecting malformed paths.
    pub fn parse(
        field: &str,
        operator: Operator,
        value: impl Into<ConditionValue>,
    ) -> Result<Self, ValidationError> {
        Ok(Self::new(field.parse()?, operator, value))
    }
}

/// How a group combines its rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Logic {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

/// A block's visibility condition.
///
/// An empty `rules` list means "no condition" and always passes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub rules: Vec<ConditionRule>,
}

impl ConditionGroup {
    pub fn all(rules: Vec<ConditionRule>) -> Self {
        Self {
            logic: Logic::And,
            rules,
        }
    }

    pub fn any(rules: Vec<ConditionRule>) -> Self {
        Self {
            logic: Logic::Or,
            rules,
        }
    }

    /// True when the group carries no rules.
    pub fn is_unconditional(&self) -> bool {
        self.rules.is_empty()
    }
}
