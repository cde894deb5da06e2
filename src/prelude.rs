//! # classdump Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the classdump library.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all classdump operations
pub use crate::Error;

/// The result type used throughout classdump
pub use crate::Result;

/// Options controlling a dump
pub use crate::DumpConfig;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Pipeline driver and its output
pub use crate::dump::{dump_images, ClassDump, Node, Output, OutputUnit, Visitor};

/// Renderer strategies
pub use crate::dump::{FindMethodVisitor, MultiFileVisitor, TextVisitor};

// ================================================================================================
// Objective-C Records
// ================================================================================================

/// Records of an image, as delivered by a Mach-O reader
pub use crate::objc::{
    ObjcCategory, ObjcClass, ObjcImage, ObjcIvar, ObjcMethod, ObjcProperty, ObjcProtocol,
    PropertyAttributes,
};

// ================================================================================================
// Type Encodings
// ================================================================================================

/// Decoding and re-encoding of type encodings
pub use crate::encoding::{
    encode, parse_method_signature, parse_type, MethodSignature, Primitive, Qualifiers, Type,
};

// ================================================================================================
// Type System
// ================================================================================================

/// Structure registry, formatter and their seams
pub use crate::typesystem::{
    Expansion, FrozenRegistry, ReferenceDelegate, StructureEntry, StructureLookup,
    StructureRegistry, TypeFormatter, Usage,
};

// ================================================================================================
// Dependency Ordering
// ================================================================================================

/// Topological sorting of declarations
pub use crate::dependencies::{DependencyNode, DependencySorter};
