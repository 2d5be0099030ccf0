//! Operator evaluation
//!
//! Each submodule pairs the native semantics of an operator family on
//! built-in values with the `impl Interpreter` layer that dispatches to user
//! dunder methods first.

pub mod access;
pub mod binary;
pub mod compare;
pub mod unary;

pub(crate) use binary::modular_pow;

use super::errors::{type_error, ExecResult};
use crate::memory::value::{HashKey, Value};

/// Hash key for dict/set use, or `TypeError: unhashable type`
pub(crate) fn hash_key(value: &Value) -> ExecResult<HashKey> {
    value
        .hash_key()
        .map_err(|type_name| type_error(format!("unhashable type: '{}'", type_name)))
}

/// Message for integer results outside the 64-bit range
pub(crate) const INT_OVERFLOW: &str = "int too large to represent (64-bit limit)";
