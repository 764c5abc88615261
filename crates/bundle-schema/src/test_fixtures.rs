//! Bundle directories for tests.

use assert_fs::prelude::*;
use assert_fs::TempDir;

/// Descriptor with one family and two classes, `MyType` and `Region`.
pub const DESCRIPTOR_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<descriptor xmlns="http://www.ibm.com/iis/igc/asset-type-descriptor" bundleId="MyBundle">
  <family localId="MyFamily">
    <label key="family.my" inDefaultLocale="My Family"/>
  </family>
  <class localId="MyType" dataAccessRole="None">
    <label key="myt.name" inDefaultLocale="My Type"/>
    <pluralLabel key="myt.names" inDefaultLocale="My Types"/>
    <property localId="owner" type="string">
      <label key="myt.owner" inDefaultLocale="Owner"/>
    </property>
  </class>
  <class localId="Region">
    <label key="region" inDefaultLocale="Region"/>
    <pluralLabel key="regions" inDefaultLocale="Regions"/>
  </class>
</descriptor>
"#;

/// Labels covering every key in [`DESCRIPTOR_XML`].
pub const LABELS: &str = "family.my=My Family\n\
myt.name=My Type\n\
myt.owner=Owner\n\
region=Region\n\
myt.names=My Types\n\
regions=Regions\n";

pub const ICONS: [&str; 4] = [
    "MyType-bigIcon.gif",
    "MyType-icon.gif",
    "Region-bigIcon.gif",
    "Region-icon.gif",
];

/// A complete, valid bundle directory.
pub fn bundle_dir() -> TempDir {
    let temp = TempDir::new().unwrap();
    temp.child("asset_type_descriptor.xml")
        .write_str(DESCRIPTOR_XML)
        .unwrap();
    temp.child("i18n").create_dir_all().unwrap();
    temp.child("i18n/labels.properties").write_str(LABELS).unwrap();
    temp.child("icons").create_dir_all().unwrap();
    for icon in ICONS {
        temp.child("icons").child(icon).write_binary(b"GIF89a").unwrap();
    }
    temp
}
