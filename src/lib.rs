//! GBLN value bridge - typed trees for dynamic host values
//!
//! Converts host values (maps, lists, integers, strings, booleans, null) into
//! GBLN value trees using the narrowest type that holds each value, and back.
//! Tree nodes live in an engine behind opaque handles; [`OwnedNode`] gives
//! each node exactly one owner and releases it exactly once.
//!
//! # Example
//!
//! ```rust
//! use gbln_bridge::{field, Gbln, HostValue, ValueType};
//!
//! let gbln = Gbln::in_memory();
//! let user = HostValue::map(vec![
//!     field("id", HostValue::int(12345)),
//!     field("name", HostValue::str("Alice")),
//! ]);
//!
//! let root = gbln.encode(&user).unwrap();
//! assert_eq!(root.get("id").unwrap().value_type().unwrap(), ValueType::I16);
//! assert_eq!(gbln.decode(root.view()).unwrap(), user);
//! ```

mod api;
mod bridge;
mod carrier;
mod config;
mod engine;
mod error;
mod json_bridge;
mod memory;
mod node;
mod selector;
mod translate;
mod types;

pub use api::*;
pub use bridge::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use json_bridge::*;
pub use memory::*;
pub use node::*;
pub use selector::*;
pub use types::*;

#[cfg(test)]
mod tests;
