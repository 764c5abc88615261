//! The asset-type descriptor of a bundle directory.

use crate::labels::LabelRegistry;
use catalogx_common::{Document, Error, Namespaces, NodeId, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Descriptor file name inside a bundle directory.
pub const DESCRIPTOR_FILE: &str = "asset_type_descriptor.xml";

/// Namespace of asset-type descriptors.
pub const DESCRIPTOR_NAMESPACE: &str = "http://www.ibm.com/iis/igc/asset-type-descriptor";

/// Prefix bound to [`DESCRIPTOR_NAMESPACE`] for queries.
pub const DESCRIPTOR_PREFIX: &str = "atd";

pub const I18N_DIR: &str = "i18n";
pub const ICONS_DIR: &str = "icons";
pub const LABELS_FILE: &str = "labels.properties";
pub const LABELS_BACKUP_FILE: &str = "labels.properties.backup";

/// One `label` or `pluralLabel` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDefinition {
    pub key: String,
    /// Text in the default locale (`inDefaultLocale`).
    pub default_text: String,
    pub plural: bool,
}

/// A `class` definition and every label nested under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    pub local_id: String,
    pub labels: Vec<LabelDefinition>,
}

/// A loaded `asset_type_descriptor.xml`. Read-only once loaded.
#[derive(Debug, Clone)]
pub struct BundleDescriptor {
    base_path: PathBuf,
    bundle_id: String,
    doc: Document,
    namespaces: Namespaces,
}

impl BundleDescriptor {
    /// Load the descriptor from `base_path`.
    ///
    /// Fails with [`Error::NotFound`] when the descriptor file, the root
    /// `descriptor` element or its `bundleId` attribute is missing.
    pub fn load(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        let descriptor_path = base_path.join(DESCRIPTOR_FILE);
        let xml = std::fs::read_to_string(&descriptor_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(descriptor_path.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;

        let doc = Document::parse(&xml)?;
        let namespaces = Namespaces::new().with(DESCRIPTOR_PREFIX, DESCRIPTOR_NAMESPACE);
        let root = doc
            .select_first("/atd:descriptor", None, &namespaces)?
            .ok_or_else(|| {
                Error::NotFound(format!("descriptor element in {}", descriptor_path.display()))
            })?;
        let bundle_id = doc
            .attribute(root, "bundleId")
            .ok_or_else(|| {
                Error::NotFound(format!("bundleId attribute in {}", descriptor_path.display()))
            })?
            .to_string();

        debug!("Loaded descriptor for bundle {}", bundle_id);
        Ok(Self {
            base_path,
            bundle_id,
            doc,
            namespaces,
        })
    }

    /// Declared bundle identifier; also the archive's base file name.
    pub fn bundle_id(&self) -> &str {
        &self.bundle_id
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.base_path.join(DESCRIPTOR_FILE)
    }

    pub fn i18n_dir(&self) -> PathBuf {
        self.base_path.join(I18N_DIR)
    }

    pub fn labels_path(&self) -> PathBuf {
        self.i18n_dir().join(LABELS_FILE)
    }

    pub fn icons_dir(&self) -> PathBuf {
        self.base_path.join(ICONS_DIR)
    }

    /// The parsed descriptor document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Every top-level `class` with its nested labels, in document order.
    pub fn classes(&self) -> Result<Vec<ClassDescriptor>> {
        let classes = self
            .doc
            .select("/atd:descriptor/atd:class", None, &self.namespaces)?;

        Ok(classes
            .into_iter()
            .map(|class| ClassDescriptor {
                local_id: self.doc.attribute(class, "localId").unwrap_or_default().to_string(),
                labels: self.label_definitions(class),
            })
            .collect())
    }

    /// Default-locale labels for the whole document: every `label`, then
    /// every `pluralLabel`, each in document order.
    pub fn default_labels(&self) -> LabelRegistry {
        let mut registry = LabelRegistry::new();
        for label in self.label_definitions(self.doc.root()) {
            if !registry.insert(label.key.clone(), label.default_text) {
                debug!("Label key {} declared more than once", label.key);
            }
        }
        registry
    }

    /// Regenerate `i18n/labels.properties` from the descriptor.
    ///
    /// An existing labels file is renamed to `labels.properties.backup`
    /// first; its content is not merged into the new file.
    pub fn generate_labels(&self) -> Result<LabelRegistry> {
        let registry = self.default_labels();
        std::fs::create_dir_all(self.i18n_dir())?;

        let labels_path = self.labels_path();
        if labels_path.exists() {
            let backup = self.i18n_dir().join(LABELS_BACKUP_FILE);
            if backup.exists() {
                std::fs::remove_file(&backup)?;
            }
            std::fs::rename(&labels_path, &backup)?;
            info!("Previous labels moved to {:?}", backup);
        }

        std::fs::write(&labels_path, registry.to_properties())?;
        info!("Wrote {} labels to {:?}", registry.len(), labels_path);
        Ok(registry)
    }

    fn label_definitions(&self, scope: NodeId) -> Vec<LabelDefinition> {
        let singular = self.doc.descendants_by_local_name(scope, "label");
        let plural = self.doc.descendants_by_local_name(scope, "pluralLabel");

        singular
            .into_iter()
            .map(|n| (n, false))
            .chain(plural.into_iter().map(|n| (n, true)))
            .filter_map(|(node, plural)| {
                let Some(key) = self.doc.attribute(node, "key") else {
                    warn!("Skipping label without a key in bundle {}", self.bundle_id);
                    return None;
                };
                Some(LabelDefinition {
                    key: key.to_string(),
                    default_text: self
                        .doc
                        .attribute(node, "inDefaultLocale")
                        .unwrap_or_default()
                        .to_string(),
                    plural,
                })
            })
            .collect()
    }
}
