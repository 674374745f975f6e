//! Filesystem and path utilities.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use tempfile::NamedTempFile;

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a file atomically.
///
/// The content goes to a temporary file in the destination directory which
/// is then renamed over `path`. Readers see either the old file or the new
/// one, never a truncated write.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_dir(&parent)?;

    let mut tmp = NamedTempFile::new_in(&parent)
        .with_context(|| format!("failed to create temporary file in {}", parent.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write file: {}", path.display()))?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to write file: {}", path.display()))?;
    Ok(())
}

/// Normalize `.` and `..` components without touching the filesystem.
///
/// Leading `..` components of a relative path are kept; `..` directly
/// under a root is dropped.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Render a path with `/` separators regardless of host platform.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Make `path` absolute against `cwd` and normalize it lexically.
pub fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_lexically(path)
    } else {
        normalize_lexically(&cwd.join(path))
    }
}

/// Make `path` absolute against the process working directory.
pub fn make_absolute(path: &Path) -> PathBuf {
    match std::path::absolute(path) {
        Ok(abs) => normalize_lexically(&abs),
        Err(_) => normalize_lexically(path),
    }
}

/// Express `path` relative to `root` when it lives under it.
///
/// Paths outside `root` stay absolute so the result never depends on where
/// the project was checked out relative to its siblings.
pub fn relative_to_root(root: &Path, path: &Path) -> PathBuf {
    let path = normalize_lexically(path);
    let root = normalize_lexically(root);
    if path.starts_with(&root) {
        match pathdiff::diff_paths(&path, &root) {
            Some(rel) if rel.as_os_str().is_empty() => PathBuf::from("."),
            Some(rel) => rel,
            None => path,
        }
    } else {
        path
    }
}

/// Check whether a pattern contains glob metacharacters.
pub fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Expand path patterns relative to `base`.
///
/// Plain entries are kept verbatim (even when the file is missing, so the
/// build step can report it). Glob entries expand to the matching files,
/// sorted, returned relative to `base`.
pub fn expand_patterns(base: &Path, patterns: &[String]) -> Result<Vec<String>> {
    let mut results = Vec::new();

    for pattern in patterns {
        if !is_glob_pattern(pattern) {
            results.push(pattern.clone());
            continue;
        }

        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        let mut matched = Vec::new();
        for entry in
            glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", pattern))?
        {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        let rel = pathdiff::diff_paths(&path, base).unwrap_or(path);
                        matched.push(to_slash(&rel));
                    }
                }
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                }
            }
        }

        if matched.is_empty() {
            tracing::warn!("pattern `{}` matched no files under {}", pattern, base.display());
        }
        matched.sort();
        results.extend(matched);
    }

    let mut seen = std::collections::HashSet::new();
    results.retain(|p| seen.insert(p.clone()));
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("a/./b/../c")),
            PathBuf::from("a/c")
        );
        assert_eq!(normalize_lexically(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize_lexically(Path::new("a/..")), PathBuf::from("."));
        assert_eq!(
            normalize_lexically(Path::new("/work/../../core")),
            PathBuf::from("/core")
        );
    }

    #[test]
    fn test_relative_to_root() {
        let root = Path::new("/work/app");
        assert_eq!(
            relative_to_root(root, Path::new("/work/app/deps/core/inc")),
            PathBuf::from("deps/core/inc")
        );
        assert_eq!(relative_to_root(root, Path::new("/work/app")), PathBuf::from("."));
        assert_eq!(
            relative_to_root(root, Path::new("/opt/sdk/include")),
            PathBuf::from("/opt/sdk/include")
        );
    }

    #[test]
    fn test_expand_patterns() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("b.cpp"), "").unwrap();
        fs::write(src.join("a.cpp"), "").unwrap();
        fs::write(src.join("readme.txt"), "").unwrap();

        let files = expand_patterns(
            tmp.path(),
            &["src/*.cpp".to_string(), "missing.cpp".to_string()],
        )
        .unwrap();
        assert_eq!(files, vec!["src/a.cpp", "src/b.cpp", "missing.cpp"]);
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out").join("file.txt");

        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }
}
