//! Packaged-archive walk
//!
//! Locates the archive the application runs from and lists its compiled
//! units under the namespace. Locators are tried in order and the first
//! candidate that opens as an archive is used.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use super::{unit_name, DiscoveryStrategy, ScanContext, ScanError};

/// Produces candidate archive paths
pub trait ArchiveLocator: Send + Sync {
    /// Short name for logging
    fn name(&self) -> &'static str;

    /// Candidate paths, in preference order
    fn candidates(&self, ctx: &ScanContext<'_>) -> Vec<PathBuf>;

    /// Whether a candidate that fails to open aborts the scan
    fn is_required(&self) -> bool {
        false
    }
}

/// The code source of the type the scan runs on behalf of
#[derive(Debug, Default, Clone, Copy)]
pub struct CallerCodeSource;

impl ArchiveLocator for CallerCodeSource {
    fn name(&self) -> &'static str {
        "caller"
    }

    fn candidates(&self, ctx: &ScanContext<'_>) -> Vec<PathBuf> {
        ctx.caller
            .and_then(|caller| ctx.loader.code_source(caller))
            .into_iter()
            .collect()
    }
}

/// The scanner's own location: the configured path or the running executable
#[derive(Debug, Default, Clone, Copy)]
pub struct OwnCodeSource;

impl ArchiveLocator for OwnCodeSource {
    fn name(&self) -> &'static str {
        "self"
    }

    fn candidates(&self, ctx: &ScanContext<'_>) -> Vec<PathBuf> {
        ctx.options
            .self_location
            .clone()
            .or_else(|| std::env::current_exe().ok())
            .into_iter()
            .collect()
    }
}

/// Conventional archive names (`application.jar`, `app.jar`)
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultArchiveNames;

impl ArchiveLocator for DefaultArchiveNames {
    fn name(&self) -> &'static str {
        "default-names"
    }

    fn candidates(&self, ctx: &ScanContext<'_>) -> Vec<PathBuf> {
        ctx.options.default_archives.clone()
    }
}

/// The explicitly configured archive
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplicitArchive;

impl ArchiveLocator for ExplicitArchive {
    fn name(&self) -> &'static str {
        "explicit"
    }

    fn candidates(&self, ctx: &ScanContext<'_>) -> Vec<PathBuf> {
        ctx.options.explicit_archive.clone().into_iter().collect()
    }

    fn is_required(&self) -> bool {
        true
    }
}

/// Lists compiled units inside the first archive a locator finds
pub struct ArchiveWalk {
    locators: Vec<Box<dyn ArchiveLocator>>,
}

impl ArchiveWalk {
    /// Walk with a custom locator order
    pub fn with_locators(locators: Vec<Box<dyn ArchiveLocator>>) -> Self {
        Self { locators }
    }
}

impl Default for ArchiveWalk {
    fn default() -> Self {
        Self::with_locators(vec![
            Box::new(CallerCodeSource),
            Box::new(OwnCodeSource),
            Box::new(DefaultArchiveNames),
            Box::new(ExplicitArchive),
        ])
    }
}

impl DiscoveryStrategy for ArchiveWalk {
    fn name(&self) -> &'static str {
        "archive"
    }

    fn discover(&self, ctx: &ScanContext<'_>) -> Result<BTreeSet<String>, ScanError> {
        for locator in &self.locators {
            for path in locator.candidates(ctx) {
                match open_archive(&path) {
                    Ok(archive) => {
                        debug!(locator = locator.name(), path = %path.display(), "archive located");
                        return Ok(list_units(&archive, ctx));
                    }
                    Err(err) if locator.is_required() => return Err(err),
                    Err(err) => {
                        debug!(locator = locator.name(), error = %err, "archive candidate rejected");
                    }
                }
            }
        }
        Ok(BTreeSet::new())
    }
}

fn open_archive(path: &Path) -> Result<ZipArchive<BufReader<File>>, ScanError> {
    if !path.is_file() {
        return Err(ScanError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "no archive at this path"),
        });
    }
    let file = File::open(path).map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ZipArchive::new(BufReader::new(file)).map_err(|source| ScanError::Zip {
        path: path.to_path_buf(),
        source,
    })
}

fn should_skip_entry(name: &str) -> bool {
    name.ends_with('/') || name.starts_with("META-INF/")
}

fn list_units<R: Read + Seek>(archive: &ZipArchive<R>, ctx: &ScanContext<'_>) -> BTreeSet<String> {
    let prefix = if ctx.namespace.is_root() {
        String::new()
    } else {
        format!("{}/", ctx.namespace.as_path())
    };
    let extension = ctx.options.unit_extension.as_str();

    archive
        .file_names()
        .filter(|name| !should_skip_entry(name) && name.starts_with(prefix.as_str()))
        .filter_map(|name| unit_name(name, extension))
        .collect()
}
