//! Custom attribute definitions and their create-or-update.

use crate::client::CatalogClient;
use crate::rest::API_ROOT;
use crate::upsert::{UpsertAction, UpsertOutcome};
use catalogx_common::{Error, Result};
use jsonschema::JSONSchema;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::{error, info};

/// Page size used when looking for an existing definition.
pub const ATTRIBUTE_PAGE_SIZE: u32 = 1000;

/// Fields the catalog refuses to change on an existing custom attribute.
pub const NON_EDITABLE_FIELDS: [&str; 3] = ["attributeType", "visibleInContainedObject", "multiValued"];

/// JSON Schema for custom attribute definition files.
pub const CUSTOM_ATTRIBUTE_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "title": "Custom attribute definition",
  "type": "object",
  "required": ["name", "appliesTo", "attributeType"],
  "properties": {
    "name": { "type": "string", "minLength": 1 },
    "description": { "type": "string" },
    "appliesTo": {
      "type": "array",
      "items": { "type": "string" }
    },
    "attributeType": { "type": "string" },
    "multiValued": { "type": "boolean" },
    "visibleInContainedObject": { "type": "boolean" }
  }
}"#;

/// Get the custom attribute schema as a parsed JSON value.
pub fn custom_attribute_schema() -> Value {
    serde_json::from_str(CUSTOM_ATTRIBUTE_SCHEMA).expect("Invalid custom attribute schema")
}

/// Check a definition against [`CUSTOM_ATTRIBUTE_SCHEMA`]. Every violation
/// is reported in one [`Error::Schema`].
pub fn validate_definition(definition: &Value) -> Result<()> {
    let schema = custom_attribute_schema();
    let compiled = JSONSchema::compile(&schema).map_err(|e| Error::Schema(e.to_string()))?;

    if let Err(errors) = compiled.validate(definition) {
        let messages: Vec<String> = errors
            .map(|e| format!("{} at '{}'", e, e.instance_path))
            .collect();
        return Err(Error::Schema(messages.join("; ")));
    }
    Ok(())
}

/// Read a definition file and check it against the schema.
pub fn load_definition(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    let definition: Value = serde_json::from_str(&content)?;
    validate_definition(&definition)?;
    Ok(definition)
}

/// Create the custom attribute, or update the existing one with the same
/// name whose `appliesTo` overlaps.
///
/// An update must not change any of [`NON_EDITABLE_FIELDS`]; those are
/// stripped from the definition before it is sent. With `force_create`
/// no lookup is done.
pub async fn upsert_custom_attribute(
    client: &dyn CatalogClient,
    definition: &Value,
    force_create: bool,
) -> Result<UpsertOutcome> {
    validate_definition(definition)?;

    if !force_create {
        if let Some(rid) = find_overlapping(client, definition).await? {
            let existing = client
                .get_raw(&format!("{}/administration/attributes/{}", API_ROOT, rid))
                .await?;
            let update = editable_part(definition, &existing)?;
            info!("Updating custom attribute {} ({})", name_of(definition), rid);
            let response = client.update_custom_attribute(&rid, &update).await?;
            return Ok(UpsertOutcome {
                action: UpsertAction::Updated,
                response,
            });
        }
    }

    info!("Creating custom attribute {}", name_of(definition));
    let response = client.create_custom_attribute(definition).await?;
    Ok(UpsertOutcome {
        action: UpsertAction::Created,
        response,
    })
}

/// ID of an existing attribute with the same name and at least one
/// `appliesTo` type in common.
async fn find_overlapping(client: &dyn CatalogClient, definition: &Value) -> Result<Option<String>> {
    let name = name_of(definition);
    let existing = client.list_custom_attributes(ATTRIBUTE_PAGE_SIZE).await?;
    let Some(found) = existing
        .iter()
        .find(|item| item.get("name").and_then(Value::as_str) == Some(name))
    else {
        return Ok(None);
    };

    let wanted = applies_to(definition);
    if applies_to(found).is_disjoint(&wanted) {
        info!(
            "Custom attribute {} exists for other asset types, creating a new one",
            name
        );
        return Ok(None);
    }

    found
        .get("id")
        .or_else(|| found.get("_id"))
        .and_then(Value::as_str)
        .map(|rid| Some(rid.to_string()))
        .ok_or_else(|| Error::NotFound(format!("id of existing custom attribute '{}'", name)))
}

/// The definition without its non-editable fields, failing when one of
/// them differs from the existing definition.
fn editable_part(definition: &Value, existing: &Value) -> Result<Value> {
    let mut update = definition.clone();
    let Some(fields) = update.as_object_mut() else {
        return Err(Error::Schema("definition must be an object".to_string()));
    };

    let mut conflicts = Vec::new();
    for field in NON_EDITABLE_FIELDS {
        if let Some(wanted) = fields.remove(field) {
            let current = existing.get(field).unwrap_or(&Value::Null);
            if *current != wanted {
                error!(
                    "New definition specifies different '{}' from existing definition ({} vs {})",
                    field, wanted, current
                );
                conflicts.push(format!("'{}' ({} vs {})", field, wanted, current));
            }
        }
    }

    if conflicts.is_empty() {
        Ok(update)
    } else {
        Err(Error::Conflict(format!(
            "cannot change {} of custom attribute '{}'",
            conflicts.join(", "),
            name_of(definition)
        )))
    }
}

fn name_of(definition: &Value) -> &str {
    definition.get("name").and_then(Value::as_str).unwrap_or_default()
}

fn applies_to(definition: &Value) -> HashSet<&str> {
    definition
        .get("appliesTo")
        .and_then(Value::as_array)
        .map(|types| types.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockCatalog;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn definition() -> Value {
        json!({
            "name": "Data Steward",
            "appliesTo": ["term", "database_table"],
            "attributeType": "STRING",
            "multiValued": false
        })
    }

    fn catalog_with_existing(applies_to: Value) -> MockCatalog {
        let mut raw = std::collections::HashMap::new();
        raw.insert(
            "/ibm/iis/igc-rest/v1/administration/attributes/rid-1".to_string(),
            json!({
                "name": "Data Steward",
                "appliesTo": applies_to,
                "attributeType": "STRING",
                "multiValued": false,
                "visibleInContainedObject": true
            }),
        );
        MockCatalog {
            attributes: vec![json!({"id": "rid-1", "name": "Data Steward", "appliesTo": applies_to})],
            raw,
            ..Default::default()
        }
    }

    #[test]
    fn test_schema_rejects_incomplete_definition() {
        assert!(validate_definition(&definition()).is_ok());

        let err = validate_definition(&json!({"name": "x", "appliesTo": "term"})).unwrap_err();
        let message = match err {
            Error::Schema(message) => message,
            other => panic!("expected schema error, got {:?}", other),
        };
        assert!(message.contains("attributeType"), "{}", message);
        assert!(message.contains("/appliesTo"), "{}", message);
    }

    #[test]
    fn test_load_definition_reports_json_errors() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("steward.json");
        std::fs::write(&good, definition().to_string()).unwrap();
        assert_eq!(load_definition(&good).unwrap(), definition());

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{\"name\": ").unwrap();
        assert!(matches!(load_definition(&broken), Err(Error::Json(_))));

        assert!(load_definition(&dir.path().join("missing.json"))
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_unknown_name_is_created() {
        let client = MockCatalog {
            attributes: vec![json!({"id": "x", "name": "Other", "appliesTo": ["term"]})],
            ..Default::default()
        };
        let outcome = upsert_custom_attribute(&client, &definition(), false)
            .await
            .unwrap();
        assert_eq!(outcome.action, UpsertAction::Created);
        assert_eq!(
            client.calls(),
            vec!["list_custom_attributes 1000", "create_custom_attribute"]
        );
        assert_eq!(client.sent(), vec![definition()]);
    }

    #[tokio::test]
    async fn test_empty_catalog_is_created() {
        let client = MockCatalog::default();
        let outcome = upsert_custom_attribute(&client, &definition(), false)
            .await
            .unwrap();
        assert_eq!(outcome.action, UpsertAction::Created);
    }

    #[tokio::test]
    async fn test_disjoint_applies_to_is_created() {
        let client = catalog_with_existing(json!(["category"]));
        let outcome = upsert_custom_attribute(&client, &definition(), false)
            .await
            .unwrap();
        assert_eq!(outcome.action, UpsertAction::Created);
    }

    #[tokio::test]
    async fn test_overlap_updates_without_non_editable_fields() {
        let client = catalog_with_existing(json!(["term"]));
        let outcome = upsert_custom_attribute(&client, &definition(), false)
            .await
            .unwrap();
        assert_eq!(outcome.action, UpsertAction::Updated);
        assert_eq!(
            client.calls(),
            vec![
                "list_custom_attributes 1000",
                "get_raw /ibm/iis/igc-rest/v1/administration/attributes/rid-1",
                "update_custom_attribute rid-1",
            ]
        );
        assert_eq!(
            client.sent(),
            vec![json!({"name": "Data Steward", "appliesTo": ["term", "database_table"]})]
        );
    }

    #[tokio::test]
    async fn test_changed_non_editable_field_is_conflict() {
        let client = catalog_with_existing(json!(["term"]));
        let mut changed = definition();
        changed["attributeType"] = json!("DATE");
        changed["multiValued"] = json!(true);

        let err = upsert_custom_attribute(&client, &changed, false)
            .await
            .unwrap_err();
        let message = match err {
            Error::Conflict(message) => message,
            other => panic!("expected conflict, got {:?}", other),
        };
        assert!(message.contains("'attributeType'"));
        assert!(message.contains("'multiValued'"));
        assert!(client.sent().is_empty());
    }

    #[tokio::test]
    async fn test_force_create_skips_lookup() {
        let client = catalog_with_existing(json!(["term"]));
        upsert_custom_attribute(&client, &definition(), true)
            .await
            .unwrap();
        assert_eq!(client.calls(), vec!["create_custom_attribute"]);
    }
}
