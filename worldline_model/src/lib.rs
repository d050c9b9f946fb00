//! # Worldline Model
//!
//! The save-record crate: the shape of a stored node, the three-key identity
//! scheme (record, content, tree), and the persistence contract the engine is
//! fed from. This crate holds no layout or import logic.
//!
//! ## Identity
//!
//! - **RecordId**: one stored record, never reused
//! - **ContentId**: one narrative beat, stable across export/import cycles
//! - **TreeId**: the worldline a node belongs to; the sole grouping key

pub mod identity;
pub mod ids;
pub mod node;
pub mod store;

pub use identity::*;
pub use ids::*;
pub use node::*;
pub use store::*;
