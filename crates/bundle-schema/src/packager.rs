//! Bundle archive creation.

use crate::descriptor::{BundleDescriptor, DESCRIPTOR_FILE, I18N_DIR, ICONS_DIR};
use catalogx_common::{hash, Error, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Facts about a written bundle archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Number of entries, directories included.
    pub entries: usize,
    pub size_bytes: u64,
    pub sha256: String,
}

/// Completion of [`create_bundle_archive`].
///
/// The intended archive path is always reported, also when archiving
/// failed; callers must inspect `result`.
#[derive(Debug)]
pub struct PackageOutcome {
    pub archive_path: PathBuf,
    pub result: Result<ArchiveSummary>,
}

impl PackageOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// The archive path on success, the archiving error otherwise.
    pub fn into_result(self) -> Result<PathBuf> {
        self.result.map(|_| self.archive_path)
    }
}

/// Where the archive for `descriptor` is written: `<base>/<bundleId>-bundle.zip`.
pub fn archive_path(descriptor: &BundleDescriptor) -> PathBuf {
    descriptor
        .base_path()
        .join(format!("{}-bundle.zip", descriptor.bundle_id()))
}

/// Package the descriptor, `i18n/` and `icons/` into the bundle archive.
///
/// Archiving runs on a blocking worker. Calls for the same bundle
/// directory write the same file and must not overlap. A partially
/// written archive is removed on failure.
pub async fn create_bundle_archive(descriptor: &BundleDescriptor) -> PackageOutcome {
    let archive_path = archive_path(descriptor);
    let base = descriptor.base_path().to_path_buf();
    let descriptor_path = descriptor.descriptor_path();
    let target = archive_path.clone();

    let result = match tokio::task::spawn_blocking(move || {
        write_archive(&base, &descriptor_path, &target)
    })
    .await
    {
        Ok(result) => result,
        Err(e) => Err(Error::Archive(format!("archive task failed: {}", e))),
    };

    match &result {
        Ok(summary) => info!(
            "Bundle archive written to {:?} ({} entries, sha256 {})",
            archive_path, summary.entries, summary.sha256
        ),
        Err(e) => {
            warn!("Failed to create bundle archive {:?}: {}", archive_path, e);
            if archive_path.exists() {
                if let Err(rm) = std::fs::remove_file(&archive_path) {
                    warn!("Could not remove partial archive {:?}: {}", archive_path, rm);
                }
            }
        }
    }

    PackageOutcome {
        archive_path,
        result,
    }
}

/// Write the archive synchronously.
pub fn write_archive(base: &Path, descriptor_path: &Path, target: &Path) -> Result<ArchiveSummary> {
    let output = File::create(target).map_err(|e| write_failure(target, e))?;
    let mut zip = ZipWriter::new(output);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    add_file(&mut zip, descriptor_path, DESCRIPTOR_FILE, options)?;
    let mut entries = 1;
    for dir in [I18N_DIR, ICONS_DIR] {
        entries += add_directory(&mut zip, &base.join(dir), dir, options)?;
    }
    zip.finish()?;

    Ok(ArchiveSummary {
        entries,
        size_bytes: std::fs::metadata(target)
            .map_err(|e| write_failure(target, e))?
            .len(),
        sha256: hash::sha256_file(target).map_err(|e| write_failure(target, e))?,
    })
}

fn write_failure(target: &Path, e: std::io::Error) -> Error {
    Error::Archive(format!("cannot write {}: {}", target.display(), e))
}

fn add_file(
    zip: &mut ZipWriter<File>,
    source: &Path,
    name: &str,
    options: SimpleFileOptions,
) -> Result<()> {
    let mut input = File::open(source)
        .map_err(|e| Error::Archive(format!("cannot read {}: {}", source.display(), e)))?;
    zip.start_file(name, options)?;
    std::io::copy(&mut input, zip)
        .map_err(|e| Error::Archive(format!("cannot archive {}: {}", source.display(), e)))?;
    debug!("Archived {}", name);
    Ok(())
}

/// Add `dir` recursively under `prefix/`, returning the number of entries.
fn add_directory(
    zip: &mut ZipWriter<File>,
    dir: &Path,
    prefix: &str,
    options: SimpleFileOptions,
) -> Result<usize> {
    let mut count = 0;
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry
            .map_err(|e| Error::Archive(format!("cannot read {}: {}", dir.display(), e)))?;
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| Error::Archive(e.to_string()))?;

        let mut name = prefix.to_string();
        for component in relative.components() {
            name.push('/');
            name.push_str(&component.as_os_str().to_string_lossy());
        }

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{}/", name), options)?;
        } else {
            add_file(zip, entry.path(), &name, options)?;
        }
        count += 1;
    }
    Ok(count)
}
