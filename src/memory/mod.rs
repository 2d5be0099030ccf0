//! Memory model for the Python interpreter
//!
//! This module provides the core runtime abstractions:
//! - [`value`]: Runtime value representation (scalars, shared containers, objects)
//! - [`stack`]: Namespaces, frames and the call stack
//!
//! # Sharing
//!
//! Python variables are references. Containers and objects live behind `Rc`
//! and are mutated through `RefCell`, so every alias observes a mutation.
//! A function stored in the module it was defined in forms a reference cycle
//! through its globals; the tracer clears the module namespace when a run ends
//! so those cycles are released.

pub mod stack;
pub mod value;
