//! Objective-C runtime type encodings.
//!
//! The compiler describes the type of every instance variable, method and property
//! with a compact string: `i` for `int`, `^{CGPoint=dd}` for a pointer to a struct,
//! `v24@0:8q16` for a method returning `void` with one `long long` argument. This module
//! turns such strings into [`Type`] trees and back.
//!
//! # Grammar
//!
//! - Single-character primitive codes (`c i s l q C I S L Q f d B v * # : ?` ...)
//! - `@` for objects, optionally followed by a quoted class name and/or protocol list
//! - `^type` for pointers, `^?` for function pointers
//! - `[Ntype]` for fixed size arrays
//! - `{name=members}` and `(name=members)` for structures and unions, with optional quoted
//!   member names. A tag of `?` marks an anonymous structure.
//! - `bN` for bitfields, valid only as structure members
//! - Qualifier prefixes `r n N o O R V A j`
//! - `@?` for blocks, `@?<...>` when the block's signature is encoded
//!
//! Method encodings list the return type followed by every parameter, each with an
//! optional stack offset that is recorded but has no meaning for the declaration.
//!
//! # Examples
//!
//! ```rust
//! use classdump::encoding::{encode, parse_method_signature, parse_type};
//!
//! let range = parse_type("{_NSRange=QQ}")?;
//! assert_eq!(encode(&range), "{_NSRange=QQ}");
//!
//! let method = parse_method_signature("v32@0:8{_NSRange=QQ}16")?;
//! assert_eq!(method.arguments().count(), 1);
//! # Ok::<(), classdump::Error>(())
//! ```

mod encoder;
mod lexer;
mod parser;
mod types;

pub use encoder::{encode, encode_shape};
pub use lexer::{classify, Lexer, LexerState, Token, TokenKind};
pub use parser::EncodingParser;
pub use types::*;

use crate::Result;

/// Parse a single [`Type`] from an encoding string
///
/// ## Arguments
/// * 'encoding' - The encoding to parse
///
/// # Errors
/// Returns an error if the encoding is malformed
pub fn parse_type(encoding: &str) -> Result<Type> {
    EncodingParser::new(encoding).parse_type()
}

/// Parse the type of an instance variable, which may be a bitfield
///
/// ## Arguments
/// * 'encoding' - The encoding to parse
///
/// # Errors
/// Returns an error if the encoding is malformed
pub fn parse_ivar_type(encoding: &str) -> Result<Type> {
    EncodingParser::new(encoding).parse_ivar_type()
}

/// Parse a [`MethodSignature`] from a method type encoding
///
/// ## Arguments
/// * 'encoding' - The encoding to parse
///
/// # Errors
/// Returns an error if the encoding is malformed
pub fn parse_method_signature(encoding: &str) -> Result<MethodSignature> {
    EncodingParser::new(encoding).parse_method_signature()
}
