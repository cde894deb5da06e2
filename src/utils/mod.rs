//! Shared helpers used across the decode, registry and rendering stages.

mod stack;

pub(crate) use stack::ensure_sufficient_stack;
