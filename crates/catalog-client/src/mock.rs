//! In-memory `CatalogClient` that records every call.

use crate::client::CatalogClient;
use async_trait::async_trait;
use catalogx_common::{Error, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct MockCatalog {
    pub bundles: Vec<String>,
    pub attributes: Vec<Value>,
    /// Responses for `get_raw`, keyed by path.
    pub raw: HashMap<String, Value>,
    pub calls: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<Value>>,
}

impl MockCatalog {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CatalogClient for MockCatalog {
    async fn create_bundle(&self, archive: &Path) -> Result<Value> {
        self.record(format!("create_bundle {}", archive.display()));
        Ok(json!({"created": true}))
    }

    async fn update_bundle(&self, archive: &Path) -> Result<Value> {
        self.record(format!("update_bundle {}", archive.display()));
        Ok(json!({"updated": true}))
    }

    async fn list_bundles(&self) -> Result<Vec<String>> {
        self.record("list_bundles".to_string());
        Ok(self.bundles.clone())
    }

    async fn create_assets(&self, flow_xml: &str) -> Result<Value> {
        self.record("create_assets".to_string());
        self.sent.lock().unwrap().push(Value::String(flow_xml.to_string()));
        Ok(Value::Null)
    }

    async fn list_custom_attributes(&self, page_size: u32) -> Result<Vec<Value>> {
        self.record(format!("list_custom_attributes {}", page_size));
        Ok(self.attributes.clone())
    }

    async fn create_custom_attribute(&self, definition: &Value) -> Result<Value> {
        self.record("create_custom_attribute".to_string());
        self.sent.lock().unwrap().push(definition.clone());
        Ok(json!({"_id": "new-rid"}))
    }

    async fn update_custom_attribute(&self, rid: &str, definition: &Value) -> Result<Value> {
        self.record(format!("update_custom_attribute {}", rid));
        self.sent.lock().unwrap().push(definition.clone());
        Ok(json!({"_id": rid}))
    }

    async fn get_raw(&self, path: &str) -> Result<Value> {
        self.record(format!("get_raw {}", path));
        self.raw
            .get(path)
            .cloned()
            .ok_or_else(|| Error::Http(format!("{} returned 404 Not Found", path)))
    }
}
