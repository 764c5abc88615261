//! The catalog client capability.

use async_trait::async_trait;
use catalogx_common::Result;
use serde_json::Value;
use std::path::Path;

/// Calls the catalog service must support.
///
/// Responses are returned as raw JSON; their schema belongs to the service.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Register a new bundle from a zip archive.
    async fn create_bundle(&self, archive: &Path) -> Result<Value>;

    /// Replace an existing bundle from a zip archive.
    async fn update_bundle(&self, archive: &Path) -> Result<Value>;

    /// IDs of the bundles already registered.
    async fn list_bundles(&self) -> Result<Vec<String>>;

    /// Create or update assets from flow document XML.
    async fn create_assets(&self, flow_xml: &str) -> Result<Value>;

    /// Existing custom attribute definitions (summary form).
    async fn list_custom_attributes(&self, page_size: u32) -> Result<Vec<Value>>;

    async fn create_custom_attribute(&self, definition: &Value) -> Result<Value>;

    async fn update_custom_attribute(&self, rid: &str, definition: &Value) -> Result<Value>;

    /// GET an arbitrary service path.
    async fn get_raw(&self, path: &str) -> Result<Value>;
}
