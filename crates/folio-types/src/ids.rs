//! Typed identifiers for blocks and pricing items.
//!
//! Both ID types wrap an opaque string. Freshly generated IDs are UUIDv7
//! (time-ordered) rendered as 32 hex characters; IDs read from a persisted
//! document are accepted verbatim as long as they are non-empty. The
//! `short()` form is for human-facing output only, never a lookup key.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A block identifier, unique within a document.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

/// A pricing item identifier, unique within its owning pricing block.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_string_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Generate a new time-ordered ID (UUIDv7, 32 hex chars).
            pub fn generate() -> Self {
                Self(uuid::Uuid::now_v7().as_simple().to_string())
            }

            /// The raw string form.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// First 8 characters, for human display only.
            pub fn short(&self) -> &str {
                match self.0.char_indices().nth(8) {
                    Some((idx, _)) => &self.0[..idx],
                    None => &self.0,
                }
            }

            /// Whether a command may introduce this ID: non-empty, no dots.
            ///
            /// IDs loaded from a document only need to be non-empty.
            pub fn is_valid(&self) -> bool {
                !self.0.is_empty() && !self.0.contains('.')
            }

            /// Consume into the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl Borrow<str> for $T {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $T {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($name, "({})"), self.0)
            }
        }
    };
}

impl_string_id!(BlockId, "BlockId");
impl_string_id!(ItemId, "ItemId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_hex() {
        let a = BlockId::generate();
        let b = BlockId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(a.is_valid());
    }

    #[test]
    fn test_short_form() {
        let id = ItemId::from("item1");
        assert_eq!(id.short(), "item1");
        let long = BlockId::from("0123456789abcdef");
        assert_eq!(long.short(), "01234567");
    }

    #[test]
    fn test_validity() {
        assert!(!BlockId::from("").is_valid());
        assert!(!ItemId::from("a.b").is_valid());
        assert!(ItemId::from("item-1").is_valid());
    }

    #[test]
    fn test_serde_transparent() {
        let id = BlockId::from("b1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"b1\"");
        let back: BlockId = serde_json::from_str("\"b1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_debug_names_type() {
        assert_eq!(format!("{:?}", ItemId::from("x")), "ItemId(x)");
    }
}
