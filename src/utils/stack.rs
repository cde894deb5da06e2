//! Stack growth for the recursive walks over type encodings.
//!
//! Encodings nest structures, pointers and arrays without any bound other than
//! the input length. Every recursive walk (parsing, registration, merging,
//! re-encoding and formatting) enters its recursive step through
//! [`ensure_sufficient_stack`], which grows the native stack on demand instead
//! of imposing a hard depth limit.

/// Minimum stack space to keep available (100KB red zone).
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, growing the stack first if less than the red zone remains.
#[inline]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
