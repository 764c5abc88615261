//! Bundle completeness checks.

use crate::descriptor::BundleDescriptor;
use crate::labels::LabelRegistry;
use catalogx_common::Result;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{info, warn};

/// Suffix of the large icon file for a class.
pub const BIG_ICON_SUFFIX: &str = "-bigIcon.gif";

/// Suffix of the small icon file for a class.
pub const SMALL_ICON_SUFFIX: &str = "-icon.gif";

/// A single completeness problem found in a bundle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("Class '{class_id}' is missing its large icon: {file}")]
    MissingBigIcon { class_id: String, file: String },

    #[error("Class '{class_id}' is missing its small icon: {file}")]
    MissingSmallIcon { class_id: String, file: String },

    #[error("Class '{class_id}' is missing label for property: {key}")]
    MissingLabel { class_id: String, key: String },
}

/// Result of bundle validation.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            issues: Vec::new(),
        }
    }

    pub fn add_issue(&mut self, issue: ValidationIssue) {
        self.valid = false;
        self.issues.push(issue);
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

pub fn big_icon_name(class_id: &str) -> String {
    format!("{}{}", class_id, BIG_ICON_SUFFIX)
}

pub fn small_icon_name(class_id: &str) -> String {
    format!("{}{}", class_id, SMALL_ICON_SUFFIX)
}

impl BundleDescriptor {
    /// Check that every class has both icons and a translation for each of
    /// its labels.
    ///
    /// Missing icons or labels are collected as issues and make the result
    /// invalid. A missing `icons/` directory or labels file is an I/O error.
    /// With `report_issues`, each issue is logged as it is found.
    pub fn validate(&self, report_issues: bool) -> Result<ValidationResult> {
        let classes = self.classes()?;

        let mut icons = HashSet::new();
        for entry in std::fs::read_dir(self.icons_dir())? {
            icons.insert(entry?.file_name().to_string_lossy().into_owned());
        }
        let labels = LabelRegistry::read(&self.labels_path())?;

        let mut result = ValidationResult::new();
        let mut record = |issue: ValidationIssue| {
            if report_issues {
                warn!("{}", issue);
            }
            result.add_issue(issue);
        };

        for class in &classes {
            let big = big_icon_name(&class.local_id);
            if !icons.contains(&big) {
                record(ValidationIssue::MissingBigIcon {
                    class_id: class.local_id.clone(),
                    file: big,
                });
            }
            let small = small_icon_name(&class.local_id);
            if !icons.contains(&small) {
                record(ValidationIssue::MissingSmallIcon {
                    class_id: class.local_id.clone(),
                    file: small,
                });
            }
            for label in &class.labels {
                if !labels.contains_key(&label.key) {
                    record(ValidationIssue::MissingLabel {
                        class_id: class.local_id.clone(),
                        key: label.key.clone(),
                    });
                }
            }
        }

        if result.valid {
            info!(
                "Bundle {} is complete ({} classes)",
                self.bundle_id(),
                classes.len()
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::bundle_dir;
    use assert_fs::prelude::*;
    use catalogx_common::Error;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_complete_bundle_is_valid() {
        let temp = bundle_dir();
        let result = BundleDescriptor::load(temp.path())
            .unwrap()
            .validate(true)
            .unwrap();
        assert!(result.valid, "Issues: {:?}", result.issues);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_missing_small_icon_is_reported() {
        let temp = bundle_dir();
        std::fs::remove_file(temp.child("icons/MyType-icon.gif").path()).unwrap();

        let result = BundleDescriptor::load(temp.path())
            .unwrap()
            .validate(true)
            .unwrap();
        assert!(!result.valid);
        assert_eq!(
            result.issues,
            vec![ValidationIssue::MissingSmallIcon {
                class_id: "MyType".to_string(),
                file: "MyType-icon.gif".to_string(),
            }]
        );
        assert_eq!(
            result.issues[0].to_string(),
            "Class 'MyType' is missing its small icon: MyType-icon.gif"
        );
    }

    #[test]
    fn test_missing_big_icon_flips_only_that_class() {
        let temp = bundle_dir();
        std::fs::remove_file(temp.child("icons/Region-bigIcon.gif").path()).unwrap();

        let result = BundleDescriptor::load(temp.path())
            .unwrap()
            .validate(false)
            .unwrap();
        assert_eq!(
            result.issues,
            vec![ValidationIssue::MissingBigIcon {
                class_id: "Region".to_string(),
                file: "Region-bigIcon.gif".to_string(),
            }]
        );
    }

    #[test]
    fn test_key_prefix_does_not_satisfy_label() {
        let temp = bundle_dir();
        temp.child("i18n/labels.properties")
            .write_str(
                "myt.name.long=Long\nmyt.names=My Types\nmyt.owner=Owner\n\
                 region=Region\nregions=Regions\n",
            )
            .unwrap();

        let result = BundleDescriptor::load(temp.path())
            .unwrap()
            .validate(false)
            .unwrap();
        assert_eq!(
            result.issues,
            vec![ValidationIssue::MissingLabel {
                class_id: "MyType".to_string(),
                key: "myt.name".to_string(),
            }]
        );
    }

    #[test]
    fn test_generated_labels_satisfy_validation_for_special_keys() {
        let temp = bundle_dir();
        let xml = crate::test_fixtures::DESCRIPTOR_XML
            .replace(r#"key="myt.name""#, r#"key="myt:name""#)
            .replace(r#"key="region""#, r##"key="#region""##);
        temp.child("asset_type_descriptor.xml").write_str(&xml).unwrap();

        let descriptor = BundleDescriptor::load(temp.path()).unwrap();
        descriptor.generate_labels().unwrap();
        let result = descriptor.validate(false).unwrap();
        assert!(result.valid, "Issues: {:?}", result.issues);
    }

    #[test]
    fn test_missing_icons_dir_is_io_error() {
        let temp = bundle_dir();
        std::fs::remove_dir_all(temp.child("icons").path()).unwrap();

        let err = BundleDescriptor::load(temp.path())
            .unwrap()
            .validate(true)
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_missing_labels_file_is_io_error() {
        let temp = bundle_dir();
        std::fs::remove_file(temp.child("i18n/labels.properties").path()).unwrap();

        let err = BundleDescriptor::load(temp.path())
            .unwrap()
            .validate(true)
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
