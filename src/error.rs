use thiserror::Error;

macro_rules! inconsistency {
    // Single string version
    ($msg:expr) => {
        crate::Error::InternalInconsistency {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::InternalInconsistency {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Recoverable
/// - [`Error::Syntax`] - A type encoding could not be interpreted. The pipeline stores the
///   error on the affected member and renders a fallback comment in its place.
/// - [`Error::NamingConflict`] - Two structurally distinct structures share a tag name. The
///   structure registry resolves these with suffixed typedef names, so this variant is only
///   produced on request by strict callers.
///
/// ## Fatal
/// - [`Error::InternalInconsistency`] - An operation's precondition was violated, e.g. merging
///   two shapes that are not mergeable, or looking up a structure after the registry was frozen
///   that was never registered. This indicates a bug and aborts processing of the image.
/// - [`Error::Io`] - Writing per-unit output to disk failed.
///
/// # Examples
///
/// ```rust
/// use classdump::{encoding::parse_type, Error};
///
/// match parse_type("{Bad=^") {
///     Ok(ty) => println!("parsed {:?}", ty),
///     Err(Error::Syntax { offset, remaining, .. }) => {
///         println!("syntax error at {}: '{}'", offset, remaining);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A type encoding could not be interpreted.
    ///
    /// # Fields
    ///
    /// * `offset` - Byte offset into the encoding where interpretation failed
    /// * `remaining` - The unconsumed rest of the encoding, starting at `offset`
    /// * `message` - What the parser expected to find
    #[error("Syntax error at offset {offset} ('{remaining}'): {message}")]
    Syntax {
        /// Byte offset into the encoding string
        offset: usize,
        /// The remaining, unparsed part of the encoding string
        remaining: String,
        /// Description of the failure
        message: String,
    },

    /// A precondition of an internal operation was violated.
    ///
    /// This is never caused by malformed input alone. The error includes the
    /// source location where the violation was detected.
    #[error("Internal inconsistency - {file}:{line}: {message}")]
    InternalInconsistency {
        /// The message describing the violated precondition
        message: String,
        /// The source file in which the violation was detected
        file: &'static str,
        /// The source line in which the violation was detected
        line: u32,
    },

    /// Two structurally different structures share the same tag name.
    #[error("Conflicting definitions for structure '{0}'")]
    NamingConflict(String),

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that occur while writing output units.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a syntax error for `input` at byte position `offset`.
    pub(crate) fn syntax(input: &str, offset: usize, message: impl Into<String>) -> Self {
        let remaining = input.get(offset..).unwrap_or_default().to_string();
        Error::Syntax {
            offset,
            remaining,
            message: message.into(),
        }
    }

    /// Returns true if the pipeline recovers from this error locally.
    ///
    /// Recoverable errors are attached to the member or structure they concern and
    /// never prevent the rest of the image from being rendered.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Syntax { .. } | Error::NamingConflict(_))
    }
}
