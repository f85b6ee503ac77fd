//! Namespace scanning
//!
//! Finds every type under a namespace and loads it through a
//! [`TypeLoader`]. Discovery strategies run in order; the first one that
//! produces at least one loadable type wins:
//!
//! 1. [`DirectoryWalk`]: compiled units under class-path directories
//! 2. [`ArchiveWalk`]: entries of the packaged archive, located by an
//!    ordered list of [`ArchiveLocator`]s
//!
//! Names that fail to load are skipped and reported in the result.

mod archive;
mod directory;

pub use archive::{
    ArchiveLocator, ArchiveWalk, CallerCodeSource, DefaultArchiveNames, ExplicitArchive,
    OwnCodeSource,
};
pub use directory::DirectoryWalk;

use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};
use zip::result::ZipError;

use crate::error::LoadError;
use crate::types::{TypeDescriptor, TypeLoader};

/// Default extension of compiled units
pub const DEFAULT_UNIT_EXTENSION: &str = "class";

/// Default archive file names tried when nothing else locates an archive
pub const DEFAULT_ARCHIVE_NAMES: &[&str] = &["application.jar", "app.jar"];

/// Fatal scan failures
#[derive(Debug, Error)]
pub enum ScanError {
    /// Filesystem failure while walking a directory or opening an archive
    #[error("IO error while scanning {path}: {source}")]
    Io {
        /// Path being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Archive could not be read
    #[error("ZIP error while scanning {path}: {source}")]
    Zip {
        /// Archive path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: ZipError,
    },
}

// ============================================================================
// Namespaces
// ============================================================================

/// A dotted namespace prefix such as `com.acme.model`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    dotted: String,
}

impl Namespace {
    /// Parse a namespace, ignoring leading and trailing dots
    pub fn new(name: &str) -> Self {
        Self {
            dotted: name.trim_matches('.').to_string(),
        }
    }

    /// Dotted form
    pub fn as_str(&self) -> &str {
        &self.dotted
    }

    /// Whether this is the root namespace
    pub fn is_root(&self) -> bool {
        self.dotted.is_empty()
    }

    /// Slash-separated relative path (`com/acme/model`)
    pub fn as_path(&self) -> String {
        self.dotted.replace('.', "/")
    }

    /// Whether a fully-qualified type name lies under this namespace
    pub fn contains(&self, type_name: &str) -> bool {
        self.is_root()
            || type_name
                .strip_prefix(self.dotted.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    }
}

/// Type name for a slash-separated unit path, if it has the unit extension
///
/// `com/acme/Point.class` -> `com.acme.Point`
pub fn unit_name(relative: &str, extension: &str) -> Option<String> {
    let stem = relative.strip_suffix(extension)?.strip_suffix('.')?;
    let parts: Vec<&str> = stem.split('/').filter(|part| !part.is_empty()).collect();
    if parts.is_empty() || stem.ends_with('/') {
        return None;
    }
    Some(parts.join("."))
}

// ============================================================================
// Options and strategies
// ============================================================================

/// Where and what to scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Extension of compiled units, without the dot
    pub unit_extension: String,
    /// Directory roots searched by the directory walk
    pub classpath: Vec<PathBuf>,
    /// Location of the scanner itself; the running executable when unset
    pub self_location: Option<PathBuf>,
    /// Archive names tried after the code sources
    pub default_archives: Vec<PathBuf>,
    /// Archive tried last; failing to open it is fatal
    pub explicit_archive: Option<PathBuf>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            unit_extension: DEFAULT_UNIT_EXTENSION.to_string(),
            classpath: Vec::new(),
            self_location: None,
            default_archives: DEFAULT_ARCHIVE_NAMES.iter().map(PathBuf::from).collect(),
            explicit_archive: None,
        }
    }
}

/// Inputs available to a discovery strategy
pub struct ScanContext<'a> {
    /// Namespace being scanned
    pub namespace: &'a Namespace,
    /// Scan options
    pub options: &'a ScanOptions,
    /// Loader, for code-source lookups
    pub loader: &'a dyn TypeLoader,
    /// Type on whose behalf the scan runs, if any
    pub caller: Option<&'a str>,
}

/// One way of discovering type names under a namespace
pub trait DiscoveryStrategy: Send + Sync {
    /// Short name reported in scan results
    fn name(&self) -> &'static str;

    /// Fully-qualified names found, de-duplicated and sorted
    fn discover(&self, ctx: &ScanContext<'_>) -> Result<BTreeSet<String>, ScanError>;
}

// ============================================================================
// Results
// ============================================================================

/// A discovered name that failed to load
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedType {
    /// Fully-qualified name
    pub name: String,
    /// Load failure
    pub error: LoadError,
}

/// Names found by the first productive strategy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    /// Strategy that found them
    pub strategy: Option<&'static str>,
    /// Fully-qualified names, sorted
    pub names: BTreeSet<String>,
}

/// Loaded types under a namespace
#[derive(Debug, Clone)]
pub struct ScanResult {
    namespace: String,
    strategy: Option<&'static str>,
    types: Vec<Arc<TypeDescriptor>>,
    skipped: Vec<SkippedType>,
}

impl ScanResult {
    /// Namespace that was scanned
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Strategy that produced the types; `None` when nothing was found
    pub fn strategy(&self) -> Option<&'static str> {
        self.strategy
    }

    /// Loaded types, sorted by name
    pub fn types(&self) -> &[Arc<TypeDescriptor>] {
        &self.types
    }

    /// Names of the loaded types
    pub fn names(&self) -> Vec<&str> {
        self.types.iter().map(|ty| ty.name()).collect()
    }

    /// Whether a type with `name` was loaded
    pub fn contains(&self, name: &str) -> bool {
        self.types.iter().any(|ty| ty.name() == name)
    }

    /// Names that failed to load
    pub fn skipped(&self) -> &[SkippedType] {
        &self.skipped
    }

    /// Number of loaded types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no type was loaded
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Take the loaded types
    pub fn into_types(self) -> Vec<Arc<TypeDescriptor>> {
        self.types
    }
}

// ============================================================================
// Scanner
// ============================================================================

/// Discovers and loads every type under a namespace
pub struct NamespaceScanner {
    loader: Arc<dyn TypeLoader>,
    options: ScanOptions,
    strategies: Vec<Box<dyn DiscoveryStrategy>>,
}

impl NamespaceScanner {
    /// Scanner with the default strategies: directory walk, then archive walk
    pub fn new(loader: Arc<dyn TypeLoader>, options: ScanOptions) -> Self {
        Self::with_strategies(
            loader,
            options,
            vec![Box::new(DirectoryWalk), Box::new(ArchiveWalk::default())],
        )
    }

    /// Scanner with a custom strategy order
    pub fn with_strategies(
        loader: Arc<dyn TypeLoader>,
        options: ScanOptions,
        strategies: Vec<Box<dyn DiscoveryStrategy>>,
    ) -> Self {
        Self {
            loader,
            options,
            strategies,
        }
    }

    /// Scan options
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Load every type under `namespace`
    pub fn scan(&self, namespace: &str) -> Result<ScanResult, ScanError> {
        self.scan_from(namespace, None)
    }

    /// Load every type under `namespace` on behalf of `caller`, whose code
    /// source is the first archive candidate
    pub fn scan_from(&self, namespace: &str, caller: Option<&str>) -> Result<ScanResult, ScanError> {
        let namespace = Namespace::new(namespace);
        let ctx = ScanContext {
            namespace: &namespace,
            options: &self.options,
            loader: self.loader.as_ref(),
            caller,
        };

        let mut skipped: Vec<SkippedType> = Vec::new();
        for strategy in &self.strategies {
            let names = strategy.discover(&ctx)?;
            if names.is_empty() {
                debug!(namespace = namespace.as_str(), strategy = strategy.name(), "no units found");
                continue;
            }

            let mut types = Vec::with_capacity(names.len());
            for name in names {
                match self.loader.load(&name) {
                    Ok(ty) => types.push(ty),
                    Err(error) => {
                        warn!(name = %name, error = %error, "skipping type that failed to load");
                        if !skipped.iter().any(|s| s.name == name) {
                            skipped.push(SkippedType { name, error });
                        }
                    }
                }
            }

            if !types.is_empty() {
                debug!(
                    namespace = namespace.as_str(),
                    strategy = strategy.name(),
                    loaded = types.len(),
                    "namespace scanned"
                );
                return Ok(ScanResult {
                    namespace: namespace.as_str().to_string(),
                    strategy: Some(strategy.name()),
                    types,
                    skipped,
                });
            }
        }

        Ok(ScanResult {
            namespace: namespace.as_str().to_string(),
            strategy: None,
            types: Vec::new(),
            skipped,
        })
    }

    /// Names under `namespace` from the first strategy that finds any,
    /// without loading them
    pub fn discover_names(&self, namespace: &str) -> Result<Discovery, ScanError> {
        let namespace = Namespace::new(namespace);
        let ctx = ScanContext {
            namespace: &namespace,
            options: &self.options,
            loader: self.loader.as_ref(),
            caller: None,
        };

        for strategy in &self.strategies {
            let names = strategy.discover(&ctx)?;
            if !names.is_empty() {
                return Ok(Discovery {
                    strategy: Some(strategy.name()),
                    names,
                });
            }
        }
        Ok(Discovery::default())
    }
}
