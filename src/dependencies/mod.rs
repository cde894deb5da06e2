//! Declaration ordering by inheritance and protocol conformance.
//!
//! A class can only be declared after its superclass, and a declaration adopting a
//! protocol needs that protocol first. [`DependencySorter`] orders all declarations of an
//! image so every such dependency precedes its dependent.
//!
//! # Identifiers
//!
//! Classes, protocols and categories share one namespace of identifiers, built with
//! [`DependencyNode::class_id`], [`DependencyNode::protocol_id`] and
//! [`DependencyNode::category_id`]. Protocol identifiers are wrapped in angle brackets,
//! so a protocol and a class with the same name stay distinct.
//!
//! # Examples
//!
//! ```rust
//! use classdump::dependencies::{DependencyNode, DependencySorter};
//!
//! let mut sorter = DependencySorter::new();
//! sorter.add(DependencyNode::new("B", ["A"]));
//! sorter.add(DependencyNode::new("A", ["NSObject"]));
//!
//! assert_eq!(sorter.sort(), vec!["A", "B"]);
//! ```

mod graph;

pub use graph::{DependencyNode, DependencySorter, SortOutcome};
