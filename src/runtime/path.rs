//! Path utility functions for normalization and containment checks.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by processing `.` and `..` components lexically.
/// This does not access the filesystem and does not follow symlinks.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push(component);
                }
            }
            _ => result.push(component),
        }
    }
    result
}

/// Check if `path` is `dir` or lies below it, comparing normalized components.
///
/// `/pkg/rg/../../etc/passwd` is NOT under `/pkg`.
pub fn is_path_under(path: &Path, dir: &Path) -> bool {
    let normalized_path = normalize_path(path);
    let normalized_dir = normalize_path(dir);

    let path_components: Vec<_> = normalized_path.components().collect();
    let dir_components: Vec<_> = normalized_dir.components().collect();

    if path_components.len() < dir_components.len() {
        return false;
    }

    dir_components
        .iter()
        .zip(path_components.iter())
        .all(|(d, p)| d == p)
}

/// Resolve a symlink target read from `link` into an absolute, normalized path.
pub(crate) fn resolve_link_target(link: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        normalize_path(target)
    } else {
        let parent = link.parent().unwrap_or(Path::new("."));
        normalize_path(&parent.join(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_with_dot_and_parent() {
        assert_eq!(
            normalize_path(Path::new("/usr/./local/../bin/./tool")),
            PathBuf::from("/usr/bin/tool")
        );
    }

    #[test]
    fn test_normalize_path_relative() {
        assert_eq!(
            normalize_path(Path::new("foo/bar/../baz")),
            PathBuf::from("foo/baz")
        );
    }

    #[test]
    fn test_normalize_path_only_dots() {
        assert_eq!(normalize_path(Path::new("./././.")), PathBuf::from(""));
    }

    #[cfg(unix)]
    #[test]
    fn test_is_path_under() {
        assert!(is_path_under(
            Path::new("/root/pkg/rg/rg-13.0.0/rg"),
            Path::new("/root/pkg/rg")
        ));
        assert!(is_path_under(Path::new("/root/pkg"), Path::new("/root/pkg")));
        assert!(!is_path_under(
            Path::new("/root/pkg/rg/../../etc/passwd"),
            Path::new("/root/pkg")
        ));
        // Component comparison, not string prefix
        assert!(!is_path_under(
            Path::new("/root/pkg/rgx/bin"),
            Path::new("/root/pkg/rg")
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_link_target() {
        assert_eq!(
            resolve_link_target(Path::new("/root/bin/rg"), Path::new("../pkg/rg/rg-1/rg")),
            PathBuf::from("/root/pkg/rg/rg-1/rg")
        );
        assert_eq!(
            resolve_link_target(Path::new("/root/bin/rg"), Path::new("/abs/rg")),
            PathBuf::from("/abs/rg")
        );
    }
}
