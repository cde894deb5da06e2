//! Structure registry and declaration formatting.
//!
//! Decoded types only become declarations once every structure of an image is known:
//! the same shape has to be declared once and referenced everywhere else by one name.
//! This module holds the two halves of that process.
//!
//! - [`StructureRegistry`] collects, deduplicates and names all structures and unions
//!   (see the [`registry`] module for the phases).
//! - [`TypeFormatter`] writes C declarations for decoded types, resolving structures
//!   through the frozen registry.

pub mod formatter;
pub mod registry;

pub use formatter::{Expansion, Placeholder, ReferenceDelegate, TypeFormatter};
pub use registry::{
    Deduplicated, FrozenRegistry, Merged, Placeholders, Registration, StructureEntry,
    StructureLookup, StructureRegistry, Usage,
};
