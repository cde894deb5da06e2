// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # classdump
//!
//! Reconstructs Objective-C declarations from the runtime metadata of compiled binaries.
//!
//! Compiled Objective-C images carry their classes, protocols and categories together with
//! compact type encodings for every method, instance variable and property. `classdump`
//! decodes these encodings, discovers and names every structure and union used anywhere in
//! the image, orders the declarations so that superclasses and adopted protocols come first,
//! and writes them out as header text.
//!
//! ## Features
//!
//! - **Complete encoding grammar** - primitives, objects with class and protocol names,
//!   pointers, arrays, structures, unions, bitfields, blocks with signatures, function
//!   pointers and qualifiers
//! - **Structure deduplication** - every distinct structure shape is declared once, anonymous
//!   shapes get stable `CDStruct_...` typedef names
//! - **Deterministic ordering** - dependency-based topological sort with cycle breaking
//! - **Several renderers** - one combined stream, one unit per declaration, or method search
//! - **Best-effort output** - undecodable encodings are rendered as comments, the rest of
//!   the image is still dumped
//!
//! ## Quick Start
//!
//! ```rust
//! use classdump::prelude::*;
//!
//! let mut class = ObjcClass::new("Document").with_superclass("NSObject");
//! class.ivars.push(ObjcIvar::new("_range", "{_NSRange=\"location\"Q\"length\"Q}", 8));
//! class
//!     .instance_methods
//!     .push(ObjcMethod::new("selectedRange", "{_NSRange=QQ}16@0:8"));
//!
//! let mut image = ObjcImage::new("Documents");
//! image.classes.push(class);
//!
//! let dump = ClassDump::new(&image, DumpConfig::default())?;
//! if let Output::Combined(text) = dump.render()? {
//!     assert!(text.contains("struct _NSRange {"));
//!     assert!(text.contains("- (struct _NSRange)selectedRange;"));
//! }
//! # Ok::<(), classdump::Error>(())
//! ```
//!
//! ## Architecture
//!
//! The pipeline runs leaves first:
//!
//! - [`encoding`] - lexer, recursive descent parser and type tree of the encoding language
//! - [`typesystem`] - the structure registry and the type formatter writing C declarations
//! - [`dependencies`] - topological ordering of declarations
//! - [`dump`] - the pipeline driver and the renderer strategies
//!
//! The Objective-C records themselves are described by [`objc`]; extracting them from a
//! Mach-O image is left to the caller.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result). Malformed encodings produce
//! [`Error::Syntax`], which the dump pipeline records per member instead of failing:
//!
//! ```rust
//! use classdump::{encoding::parse_type, Error};
//!
//! match parse_type("{Bad=^") {
//!     Ok(ty) => println!("parsed {:?}", ty),
//!     Err(Error::Syntax { offset, .. }) => println!("syntax error at {}", offset),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Development and Testing
//!
//! ### Fuzzing
//!
//! ```bash
//! cargo +nightly fuzz run parse_encoding --release
//! ```
//!
//! ### Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! ```

#[macro_use]
pub(crate) mod error;
pub(crate) mod utils;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use classdump::prelude::*;
///
/// let ty = parse_type("^{CGPoint=dd}")?;
/// assert_eq!(ty.structure_depth(), 2);
/// # Ok::<(), classdump::Error>(())
/// ```
pub mod prelude;

/// Output configuration
pub mod config;

/// Topological ordering of protocols, classes and categories
pub mod dependencies;

/// The dump pipeline and its renderers
pub mod dump;

/// Lexer, parser and type tree of Objective-C runtime type encodings
///
/// # Key Types
///
/// - [`encoding::Type`] - A decoded type
/// - [`encoding::MethodSignature`] - A decoded method encoding
/// - [`encoding::EncodingParser`] - The recursive descent parser
///
/// # Main Functions
///
/// - [`encoding::parse_type`] - Decode a single type
/// - [`encoding::parse_method_signature`] - Decode a method encoding
/// - [`encoding::encode`] - Write a type back as encoding
pub mod encoding;

/// Objective-C runtime records as extracted from an image
pub mod objc;

/// Structure registry and type formatter
pub mod typesystem;

/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
///
/// # Examples
///
/// ```rust
/// use classdump::{encoding::{parse_type, Type}, Result};
///
/// fn pointee(encoding: &str) -> Result<Type> {
///     match parse_type(encoding)? {
///         Type::Pointer(inner) => Ok(*inner),
///         other => Ok(other),
///     }
/// }
/// # assert!(pointee("^i").is_ok());
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `classdump` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

/// Options controlling a dump
pub use config::DumpConfig;

/// Main entry point: decode, register, order and render the records of one image
pub use dump::{dump_images, ClassDump, Output, OutputUnit};
