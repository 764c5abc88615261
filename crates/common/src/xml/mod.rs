//! Generic typed-tree XML document.
//!
//! Flow documents and bundle descriptors are both thin models over
//! [`Document`]: an owned, ordered element tree that can be parsed,
//! queried with namespace-scoped paths, mutated, and serialized again.

mod document;
mod query;

pub use document::{Content, Document, NodeId};
pub use query::Namespaces;
