//! Catalog service client for catalogx.
//!
//! The rest of the workspace only needs a handful of catalog calls; they
//! are captured by the [`CatalogClient`] trait so the create-or-update
//! decisions can run against any implementation.

pub mod attribute;
pub mod client;
pub mod config;
pub mod rest;
pub mod upsert;

#[cfg(test)]
mod mock;

pub use attribute::{load_definition, upsert_custom_attribute, validate_definition};
pub use client::CatalogClient;
pub use config::ConnectionConfig;
pub use rest::RestCatalogClient;
pub use upsert::{upsert_bundle, UpsertAction, UpsertMode, UpsertOutcome};
