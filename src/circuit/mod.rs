//! Circuit topology and validation.
//!
//! This module provides the in-memory representation of a circuit as built
//! by a construction front end. The [`Circuit`] struct holds all nodes and
//! components in a form the analyses can stamp and mutate.

mod graph;
mod node;
mod types;
mod validate;

pub use graph::Circuit;
pub use node::Node;
pub use types::*;
pub use validate::validate_circuit;
