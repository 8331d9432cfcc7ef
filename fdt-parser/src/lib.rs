//! Parser for flattened device tree blobs (DTB).
//!
//! Parses the binary container into an immutable, zero-copy node arena:
//! a fixed big-endian header, a structure block of begin-node /
//! end-node / property tokens, and a strings block of property names.
//! Nodes are addressed by [`NodeId`] and cross-references (phandles) are
//! resolved through an index built after parsing, so forward references
//! and reference cycles are handled without ownership cycles.
//!
//! ```no_run
//! # fn main() -> Result<(), fdt_parser::DtbError> {
//! let data = std::fs::read("board.dtb").unwrap();
//! let fdt = fdt_parser::Fdt::parse(&data)?;
//!
//! for child in fdt.children(fdt.root()) {
//!     println!("{}", fdt.path(child));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! This crate knows nothing about what the tree describes; semantic
//! interpretation is left to its consumers.

mod error;
mod parser;
mod prop;
mod tree;

pub use error::{DtbError, PropertyType, SchemaError};
pub use tree::{Fdt, NodeId, Property};
