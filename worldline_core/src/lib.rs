//! # Worldline Core (The Worldline Engine)
//!
//! Turns an unordered collection of save records into branching narrative
//! trees, and back. Every entry point is a pure, synchronous function of its
//! inputs; storage and rendering belong to the caller.
//!
//! ## Core Components
//!
//! - **ancestry**: Inherit-if-missing resolution of display attributes
//! - **classify**: Free-text vs. choice classification of each transition
//! - **worldline**: Adjacency, roots and depth for one tree
//! - **layout**: Tidy-tree positions and a renderable edge list
//! - **import**: Payload detection, history expansion and idempotent merge
//! - **export**: The self-describing backup document
//!
//! ## Data Flow
//!
//! foreign bytes -> `import` -> admitted nodes -> storage (caller) ->
//! `layout` -> positioned nodes + classified edges -> presentation (caller)

pub mod ancestry;
pub mod classify;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod layout;
pub mod worldline;

pub use ancestry::*;
pub use classify::*;
pub use config::*;
pub use error::*;
pub use export::*;
pub use import::*;
pub use layout::*;
pub use worldline::*;

pub use worldline_model as model;
