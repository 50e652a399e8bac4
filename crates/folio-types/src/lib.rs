//! Shared block, pricing and condition types for folio.
//!
//! This crate is the document model foundation: typed IDs, the closed set of
//! block kinds with their payloads, pricing tables, visibility conditions and
//! the persisted [`Document`]. It has **no internal folio dependencies**: a
//! pure leaf crate that the engine and kernel build on.
//!
//! # Entity Overview
//!
//! ```text
//! Document { title }
//!     └── blocks: ordered Block[]          (order is the only ordering signal)
//!           ├── id: BlockId                (unique within the document)
//!           ├── data: BlockData            (one variant per BlockKind)
//!           │     └── PricingTable → PricingBlockData
//!           │           └── items: PricingItem[] (ItemId unique per block)
//!           └── visibility?: ConditionGroup
//!                 └── rules: ConditionRule { FieldPath, Operator, ConditionValue }
//! ```
//!
//! # Key Types
//!
//! |---------------------|--------------------------------------------------|
//! | Type                | Purpose                                          |
//! |---------------------|--------------------------------------------------|
//! | [`Document`]        | Persisted `{ title, blocks }`                    |
//! | [`Block`]           | Addressable typed content unit                   |
//! | [`BlockData`]       | Closed payload enum, exhaustive matching         |
//! | [`PricingBlockData`]| Items + discount + tax                           |
//! | [`ConditionGroup`]  | AND/OR rule group deciding visibility            |
//! | [`FieldPath`]       | Parsed condition address (no string lookups)     |
//! | [`ValidationError`] | Why a command or payload was refused             |
//! |---------------------|--------------------------------------------------|

pub mod block;
pub mod condition;
pub mod document;
pub mod error;
pub mod ids;
pub mod pricing;

// Re-export primary types at crate root for convenience.
pub use block::{
    Block, BlockData, BlockKind, HeadingData, MediaData, PaymentAmount, PaymentBlockData,
    PaymentStatus, SignatureBlockData, TextData,
};
pub use condition::{ConditionGroup, ConditionRule, ConditionValue, FieldPath, Logic, Operator};
pub use document::Document;
pub use error::ValidationError;
pub use ids::{BlockId, ItemId};
pub use pricing::{DiscountType, PricingBlockData, PricingItem};
