//! `CatalogClient` over the catalog's REST API.

use crate::client::CatalogClient;
use crate::config::ConnectionConfig;
use async_trait::async_trait;
use catalogx_common::{Error, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Root of the REST API on the catalog host.
pub const API_ROOT: &str = "/ibm/iis/igc-rest/v1";

/// REST client authenticated with HTTP basic credentials.
pub struct RestCatalogClient {
    base_url: String,
    username: String,
    password: String,
    client: reqwest::Client,
}

impl RestCatalogClient {
    /// Build a client for `config`. `password` is the already resolved
    /// password (see [`ConnectionConfig::resolve_password`]).
    pub fn new(config: &ConnectionConfig, password: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(http_error)?;

        Ok(Self {
            base_url: format!("{}{}", config.base_url(), API_ROOT),
            username: config.username.clone(),
            password,
            client,
        })
    }

    /// Full URL for an API path such as `/bundles`.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with(API_ROOT) {
            format!("{}{}", self.base_url.trim_end_matches(API_ROOT), path)
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Value> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| Error::Http(format!("{} request failed: {}", what, e)))?;
        read_response(response, what).await
    }

    async fn send_bundle(&self, archive: &Path, update: bool) -> Result<Value> {
        let data = tokio::fs::read(archive).await?;
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bundle.zip".to_string());
        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str("application/zip")
            .map_err(http_error)?;
        let form = Form::new().part("file", part);

        let url = self.url("/bundles");
        let request = if update {
            self.client.put(&url)
        } else {
            self.client.post(&url)
        };
        info!(
            "{} bundle from {:?}",
            if update { "Updating" } else { "Creating" },
            archive
        );
        self.send(request.multipart(form), "bundle upload").await
    }
}

#[async_trait]
impl CatalogClient for RestCatalogClient {
    async fn create_bundle(&self, archive: &Path) -> Result<Value> {
        self.send_bundle(archive, false).await
    }

    async fn update_bundle(&self, archive: &Path) -> Result<Value> {
        self.send_bundle(archive, true).await
    }

    async fn list_bundles(&self) -> Result<Vec<String>> {
        let value = self
            .send(self.client.get(self.url("/bundles")), "bundle list")
            .await?;
        Ok(bundle_ids(&value))
    }

    async fn create_assets(&self, flow_xml: &str) -> Result<Value> {
        let request = self
            .client
            .post(self.url("/bundles/assets"))
            .header("Content-Type", "application/xml")
            .body(flow_xml.to_string());
        self.send(request, "asset load").await
    }

    async fn list_custom_attributes(&self, page_size: u32) -> Result<Vec<Value>> {
        let request = self
            .client
            .get(self.url("/administration/attributes"))
            .query(&[("pageSize", page_size)]);
        let value = self.send(request, "custom attribute list").await?;
        Ok(match value {
            Value::Object(mut map) => match map.remove("items") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            Value::Array(items) => items,
            _ => Vec::new(),
        })
    }

    async fn create_custom_attribute(&self, definition: &Value) -> Result<Value> {
        let request = self
            .client
            .post(self.url("/administration/attributes"))
            .json(definition);
        self.send(request, "custom attribute creation").await
    }

    async fn update_custom_attribute(&self, rid: &str, definition: &Value) -> Result<Value> {
        let request = self
            .client
            .put(self.url(&format!("/administration/attributes/{}", rid)))
            .json(definition);
        self.send(request, "custom attribute update").await
    }

    async fn get_raw(&self, path: &str) -> Result<Value> {
        self.send(self.client.get(self.url(path)), path).await
    }
}

fn http_error(e: reqwest::Error) -> Error {
    Error::Http(e.to_string())
}

/// Decode a response body: empty is `Null`, non-JSON text is a string.
async fn read_response(response: Response, what: &str) -> Result<Value> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Http(format!("failed to read {} response: {}", what, e)))?;

    if !status.is_success() {
        return Err(Error::Http(format!("{} returned {}: {}", what, status, body.trim())));
    }
    debug!("{} returned {} ({} bytes)", what, status, body.len());
    Ok(body_to_value(&body))
}

fn body_to_value(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// Bundle IDs from a bundle list response: plain strings, or objects
/// carrying an `id`.
fn bundle_ids(value: &Value) -> Vec<String> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(id) => Some(id.clone()),
            Value::Object(map) => map.get("id").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn client() -> RestCatalogClient {
        let config =
            ConnectionConfig::from_yaml("host: igc.local\nusername: isadmin\n").unwrap();
        RestCatalogClient::new(&config, "secret".to_string()).unwrap()
    }

    #[test]
    fn test_url_building() {
        let client = client();
        assert_eq!(
            client.url("/bundles"),
            "https://igc.local:9443/ibm/iis/igc-rest/v1/bundles"
        );
        assert_eq!(
            client.url("administration/attributes/abc"),
            "https://igc.local:9443/ibm/iis/igc-rest/v1/administration/attributes/abc"
        );
        assert_eq!(
            client.url("/ibm/iis/igc-rest/v1/administration/attributes/abc"),
            "https://igc.local:9443/ibm/iis/igc-rest/v1/administration/attributes/abc"
        );
    }

    #[test]
    fn test_body_decoding() {
        assert_eq!(body_to_value(""), Value::Null);
        assert_eq!(body_to_value("  \n"), Value::Null);
        assert_eq!(body_to_value(r#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(body_to_value("Bundle created"), json!("Bundle created"));
    }

    #[test]
    fn test_bundle_ids_accept_strings_and_objects() {
        let value = json!(["MyBundle", {"id": "Other"}, 42, {"name": "no-id"}]);
        assert_eq!(bundle_ids(&value), vec!["MyBundle", "Other"]);
        assert!(bundle_ids(&json!({"items": []})).is_empty());
    }
}
