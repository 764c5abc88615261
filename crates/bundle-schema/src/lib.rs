//! Asset-type bundle definitions for catalogx.
//!
//! A bundle directory holds `asset_type_descriptor.xml`, an `icons/`
//! directory and translated labels under `i18n/`. This crate loads the
//! descriptor, regenerates and checks labels and icons, and packages the
//! directory into a deployable zip archive.

pub mod descriptor;
pub mod labels;
pub mod packager;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use descriptor::{BundleDescriptor, ClassDescriptor, LabelDefinition};
pub use labels::LabelRegistry;
pub use packager::{create_bundle_archive, ArchiveSummary, PackageOutcome};
pub use validation::{ValidationIssue, ValidationResult};
