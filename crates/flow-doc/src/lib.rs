//! Flow documents for bulk asset import.
//!
//! A flow document lists typed asset instances, their attributes and parent
//! references, plus the import actions that tell the catalog how to apply
//! them. This crate builds and queries those documents and derives the
//! identity strings used to correlate database tables and columns.

pub mod flow;
pub mod identity;

pub use flow::{FlowDocument, ImportAction, ParentRef, FLOW_NAMESPACE, FLOW_PREFIX};
pub use identity::column_identity_from_table_identity;
