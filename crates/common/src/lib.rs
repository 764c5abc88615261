//! Common utilities and types shared across catalogx crates.
//!
//! Holds the error taxonomy, hashing helpers and the namespace-aware
//! XML tree that both flow documents and bundle descriptors are built on.

pub mod error;
pub mod hash;
pub mod xml;

pub use error::{Error, Result};
pub use xml::{Document, Namespaces, NodeId};
