//! Class-path directory walk
//!
//! Symlinked directories are followed; each canonical directory is visited
//! once. Directories that cannot be read are logged and skipped.

use std::collections::{BTreeSet, HashSet};
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::warn;

use super::{unit_name, DiscoveryStrategy, ScanContext, ScanError};

/// Walks `root/<namespace path>` under every class-path directory
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryWalk;

impl DiscoveryStrategy for DirectoryWalk {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn discover(&self, ctx: &ScanContext<'_>) -> Result<BTreeSet<String>, ScanError> {
        let mut names = BTreeSet::new();
        let extension = ctx.options.unit_extension.as_str();

        for root in &ctx.options.classpath {
            let base = root.join(ctx.namespace.as_path());
            if !base.is_dir() {
                continue;
            }

            let mut visited: HashSet<PathBuf> = HashSet::new();
            let mut dirs = vec![base];
            while let Some(dir) = dirs.pop() {
                match fs::canonicalize(&dir) {
                    Ok(canonical) => {
                        if !visited.insert(canonical) {
                            continue;
                        }
                    }
                    Err(error) => {
                        warn!(path = %dir.display(), error = %error, "skipping unresolvable directory");
                        continue;
                    }
                }

                let entries = match fs::read_dir(&dir) {
                    Ok(entries) => entries,
                    Err(error) => {
                        warn!(path = %dir.display(), error = %error, "skipping unreadable directory");
                        continue;
                    }
                };
                for entry in entries {
                    let entry = match entry {
                        Ok(entry) => entry,
                        Err(error) => {
                            warn!(path = %dir.display(), error = %error, "skipping unreadable entry");
                            continue;
                        }
                    };
                    let path = entry.path();
                    // Follows symlinks
                    if path.is_dir() {
                        dirs.push(path);
                        continue;
                    }

                    let has_extension = path
                        .extension()
                        .and_then(OsStr::to_str)
                        .is_some_and(|ext| ext == extension);
                    if !has_extension {
                        continue;
                    }
                    if let Some(name) = relative_unit_name(root, &path, extension) {
                        names.insert(name);
                    }
                }
            }
        }

        Ok(names)
    }
}

/// Slash-joined path of `path` relative to `root`, mapped to a type name
fn relative_unit_name(root: &Path, path: &Path, extension: &str) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<&str>>>()?;
    unit_name(&parts.join("/"), extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{Namespace, ScanOptions};
    use crate::types::TypeRegistry;
    use std::path::PathBuf;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn discover(roots: Vec<PathBuf>, namespace: &str) -> BTreeSet<String> {
        let registry = TypeRegistry::new();
        let namespace = Namespace::new(namespace);
        let options = ScanOptions {
            classpath: roots,
            ..ScanOptions::default()
        };
        let ctx = ScanContext {
            namespace: &namespace,
            options: &options,
            loader: &registry,
            caller: None,
        };
        DirectoryWalk.discover(&ctx).unwrap()
    }

    #[test]
    fn test_walks_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "com/acme/Point.class");
        touch(dir.path(), "com/acme/shapes/Line.class");
        touch(dir.path(), "com/acme/README.txt");
        touch(dir.path(), "com/other/Skip.class");

        let names = discover(vec![dir.path().to_path_buf()], "com.acme");
        let expected: BTreeSet<String> = ["com.acme.Point", "com.acme.shapes.Line"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_merges_roots_and_dedups() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        touch(a.path(), "com/acme/Point.class");
        touch(b.path(), "com/acme/Point.class");
        touch(b.path(), "com/acme/Circle.class");

        let names = discover(vec![a.path().to_path_buf(), b.path().to_path_buf()], "com.acme");
        assert_eq!(names.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_follows_symlinked_packages() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        touch(dir.path(), "com/acme/A.class");
        touch(outside.path(), "B.class");
        std::os::unix::fs::symlink(outside.path(), dir.path().join("com/acme/sub")).unwrap();
        // Loop back to the package root
        std::os::unix::fs::symlink(dir.path().join("com/acme"), outside.path().join("again")).unwrap();

        let names = discover(vec![dir.path().to_path_buf()], "com.acme");
        let expected: BTreeSet<String> = ["com.acme.A", "com.acme.sub.B"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(names, expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "com/acme/A.class");
        touch(dir.path(), "com/acme/locked/B.class");
        let locked = dir.path().join("com/acme/locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let readable = fs::read_dir(&locked).is_ok();

        let names = discover(vec![dir.path().to_path_buf()], "com.acme");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(names.contains("com.acme.A"));
        // Privileged users can still read it
        assert_eq!(names.contains("com.acme.locked.B"), readable);
    }

    #[test]
    fn test_missing_namespace_directory() {
        let dir = tempfile::tempdir().unwrap();
        let names = discover(
            vec![dir.path().to_path_buf(), PathBuf::from("/nonexistent/reflekt")],
            "com.acme",
        );
        assert!(names.is_empty());
    }
}
