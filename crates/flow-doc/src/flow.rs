//! The flow document model.

use catalogx_common::{Document, Error, Namespaces, NodeId, Result};
use tracing::debug;

/// Namespace of flow documents.
pub const FLOW_NAMESPACE: &str = "http://www.ibm.com/iis/flow-doc";

/// Prefix bound to [`FLOW_NAMESPACE`] for queries.
pub const FLOW_PREFIX: &str = "flowdoc";

/// Reference from an asset to its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    /// Reference role, e.g. the parent's class name.
    pub role: String,
    /// Flow XML ID of the parent asset.
    pub asset_id: String,
}

impl ParentRef {
    pub fn new(role: impl Into<String>, asset_id: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            asset_id: asset_id.into(),
        }
    }
}

/// An import directive as stored in the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportAction {
    /// Assets to create, replacing existing ones with all children.
    pub complete: Vec<String>,
    /// Assets to create when absent, otherwise merge children into.
    pub partial: Vec<String>,
}

/// A flow document describing asset instances for bulk import.
///
/// The model exclusively owns its [`Document`]; mutate it from a single
/// owner and clone it when another task needs its own copy.
#[derive(Debug, Clone)]
pub struct FlowDocument {
    doc: Document,
    namespaces: Namespaces,
}

impl Default for FlowDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowDocument {
    /// Create an empty flow document with a single `assets` container.
    pub fn new() -> Self {
        let mut doc = Document::new_with_root("doc", Some(FLOW_NAMESPACE));
        let root = doc.root();
        doc.append_element(root, "assets");
        Self {
            doc,
            namespaces: Namespaces::new().with(FLOW_PREFIX, FLOW_NAMESPACE),
        }
    }

    /// Parse an existing flow document.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut flow = Self::new();
        flow.parse(xml)?;
        Ok(flow)
    }

    /// Replace the current document with the parsed `xml`. No validation is
    /// performed; on error the previous document is kept.
    pub fn parse(&mut self, xml: &str) -> Result<()> {
        self.doc = Document::parse(xml)?;
        debug!("Parsed flow document with {} assets", self.assets().len());
        Ok(())
    }

    /// The underlying document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Run a path query against the document. The `flowdoc` prefix is bound
    /// to the flow namespace.
    pub fn find_assets(&self, expr: &str) -> Result<Vec<NodeId>> {
        self.doc.select(expr, None, &self.namespaces)
    }

    /// First match of [`FlowDocument::find_assets`].
    pub fn find_asset(&self, expr: &str) -> Result<Option<NodeId>> {
        self.doc.select_first(expr, None, &self.namespaces)
    }

    /// Every asset in the assets container, in document order.
    pub fn assets(&self) -> Vec<NodeId> {
        match self.assets_container() {
            Some(container) => self.flow_children(container, "asset").collect(),
            None => Vec::new(),
        }
    }

    /// First asset with the given `class`.
    pub fn asset_by_class(&self, class_name: &str) -> Option<NodeId> {
        self.assets()
            .into_iter()
            .find(|a| self.doc.attribute(*a, "class") == Some(class_name))
    }

    /// Asset with the given flow XML ID (not the RID).
    pub fn asset_by_id(&self, xml_id: &str) -> Option<NodeId> {
        self.assets()
            .into_iter()
            .find(|a| self.doc.attribute(*a, "ID") == Some(xml_id))
    }

    /// Display name (`repr`) of an asset.
    pub fn asset_name(&self, asset: NodeId) -> Result<&str> {
        self.required_attribute(asset, "repr")
    }

    /// Repository ID (`externalID`) of an asset.
    pub fn asset_rid(&self, asset: NodeId) -> Result<&str> {
        self.required_attribute(asset, "externalID")
    }

    pub fn asset_class(&self, asset: NodeId) -> Result<&str> {
        self.required_attribute(asset, "class")
    }

    pub fn asset_xml_id(&self, asset: NodeId) -> Result<&str> {
        self.required_attribute(asset, "ID")
    }

    /// Display name of the asset with the given flow XML ID.
    pub fn asset_name_by_id(&self, xml_id: &str) -> Result<&str> {
        let asset = self.require_asset(xml_id)?;
        self.asset_name(asset)
    }

    /// Value of a named `attribute` child.
    pub fn asset_attribute(&self, asset: NodeId, name: &str) -> Option<&str> {
        self.flow_children(asset, "attribute")
            .find(|a| self.doc.attribute(*a, "name") == Some(name))
            .and_then(|a| self.doc.attribute(a, "value"))
    }

    /// All `(name, value)` attribute pairs in document order.
    pub fn asset_attributes(&self, asset: NodeId) -> Vec<(&str, &str)> {
        self.flow_children(asset, "attribute")
            .filter_map(|a| Some((self.doc.attribute(a, "name")?, self.doc.attribute(a, "value")?)))
            .collect()
    }

    /// The asset's parent reference, if it has one.
    pub fn asset_reference(&self, asset: NodeId) -> Option<ParentRef> {
        let reference = self.flow_children(asset, "reference").next()?;
        Some(ParentRef::new(
            self.doc.attribute(reference, "name")?,
            self.doc.attribute(reference, "assetIDs")?,
        ))
    }

    /// Flow XML ID of the asset's parent.
    pub fn parent_asset_id(&self, asset: NodeId) -> Result<&str> {
        self.check_handle(asset)?;
        let reference = self
            .flow_children(asset, "reference")
            .next()
            .ok_or_else(|| Error::NotFound(format!("reference on {}", self.describe(asset))))?;
        self.doc.attribute(reference, "assetIDs").ok_or_else(|| {
            Error::NotFound(format!("assetIDs of reference on {}", self.describe(asset)))
        })
    }

    /// Append an asset. A `name` attribute carrying `name` is always written
    /// first; any `name` entry in `attributes` is ignored.
    ///
    /// Fails with [`Error::DuplicateId`] when an asset with `xml_id` already
    /// exists, leaving the document untouched.
    pub fn add_asset<I, K, V>(
        &mut self,
        class_name: &str,
        name: &str,
        xml_id: &str,
        attributes: I,
        parent: Option<ParentRef>,
    ) -> Result<NodeId>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if self.asset_by_id(xml_id).is_some() {
            return Err(Error::DuplicateId(xml_id.to_string()));
        }
        let container = self
            .assets_container()
            .ok_or_else(|| Error::NotFound("assets element in flow document".to_string()))?;

        let asset = self.doc.append_element(container, "asset");
        self.doc.set_attribute(asset, "class", class_name);
        self.doc.set_attribute(asset, "repr", name);
        self.doc.set_attribute(asset, "ID", xml_id);
        self.append_attribute(asset, "name", name);

        for (key, value) in attributes {
            if key.as_ref() != "name" {
                self.append_attribute(asset, key.as_ref(), value.as_ref());
            }
        }

        if let Some(parent) = parent {
            let reference = self.doc.append_element(asset, "reference");
            self.doc.set_attribute(reference, "name", &parent.role);
            self.doc.set_attribute(reference, "assetIDs", &parent.asset_id);
        }

        debug!("Added {} asset '{}' ({})", class_name, name, xml_id);
        Ok(asset)
    }

    /// Append an import action. `partial` is written only when non-empty.
    pub fn add_import_action<S: AsRef<str>>(&mut self, complete: &[S], partial: &[S]) -> NodeId {
        let root = self.doc.root();
        let action = self.doc.append_element(root, "importAction");
        self.doc
            .set_attribute(action, "completeAssetIDs", &join_ids(complete));
        if !partial.is_empty() {
            self.doc
                .set_attribute(action, "partialAssetIDs", &join_ids(partial));
        }
        action
    }

    /// Import actions in document order.
    pub fn import_actions(&self) -> Vec<ImportAction> {
        self.flow_children(self.doc.root(), "importAction")
            .map(|a| ImportAction {
                complete: split_ids(self.doc.attribute(a, "completeAssetIDs")),
                partial: split_ids(self.doc.attribute(a, "partialAssetIDs")),
            })
            .collect()
    }

    /// The full document as indented XML.
    pub fn serialize(&self) -> Result<String> {
        self.doc.to_xml()
    }

    /// The full document without formatting whitespace, as submitted to the
    /// catalog.
    pub fn serialize_compact(&self) -> Result<String> {
        self.doc.to_xml_compact()
    }

    pub(crate) fn require_asset(&self, xml_id: &str) -> Result<NodeId> {
        self.asset_by_id(xml_id)
            .ok_or_else(|| Error::NotFound(format!("asset with ID '{}'", xml_id)))
    }

    /// Handles taken before the last `parse` belong to the replaced document.
    fn check_handle(&self, asset: NodeId) -> Result<()> {
        if self.doc.contains(asset) {
            Ok(())
        } else {
            Err(Error::NotFound(format!(
                "asset node {:?} in the current flow document",
                asset
            )))
        }
    }

    fn required_attribute(&self, asset: NodeId, name: &str) -> Result<&str> {
        self.check_handle(asset)?;
        self.doc
            .attribute(asset, name)
            .ok_or_else(|| Error::NotFound(format!("attribute '{}' on {}", name, self.describe(asset))))
    }

    fn describe(&self, asset: NodeId) -> String {
        match self.doc.attribute(asset, "ID") {
            Some(id) => format!("asset '{}'", id),
            None => format!("<{}>", self.doc.qualified_name(asset)),
        }
    }

    fn assets_container(&self) -> Option<NodeId> {
        self.flow_children(self.doc.root(), "assets").next()
    }

    fn flow_children<'a>(
        &'a self,
        parent: NodeId,
        local: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.doc.children(parent).filter(move |c| {
            self.doc.local_name(*c) == local && self.doc.namespace(*c) == Some(FLOW_NAMESPACE)
        })
    }

    fn append_attribute(&mut self, asset: NodeId, name: &str, value: &str) {
        let attr = self.doc.append_element(asset, "attribute");
        self.doc.set_attribute(attr, "name", name);
        self.doc.set_attribute(attr, "value", value);
    }
}

fn join_ids<S: AsRef<str>>(ids: &[S]) -> String {
    ids.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ")
}

fn split_ids(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}
