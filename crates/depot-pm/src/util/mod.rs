//! Utility functions for the installer.

mod archive;
mod checksum;

pub use archive::{ArchiveExtractor, ArchiveType};
pub use checksum::{compute_checksum, verify_checksum, ChecksumType};

use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::Result;

/// Turn a package name into a single safe path component.
///
/// # Examples
///
/// ```
/// use depot_pm::util::sanitize_name;
///
/// assert_eq!(sanitize_name("org.example:lib"), "org.example_lib");
/// assert_eq!(sanitize_name("../evil"), ".._evil");
/// ```
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

/// Whether `path` is a directory with at least one entry.
pub fn is_non_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Move `path` into `backup_root` under a timestamped name.
///
/// Returns the new location. The directory is never deleted.
pub fn move_aside(path: &Path, backup_root: &Path, name: &str) -> Result<PathBuf> {
    fs::create_dir_all(backup_root)?;
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    let mut target = backup_root.join(format!("{}-{}", sanitize_name(name), stamp));
    let mut attempt = 1;
    while target.exists() {
        target = backup_root.join(format!("{}-{}-{}", sanitize_name(name), stamp, attempt));
        attempt += 1;
    }
    fs::rename(path, &target)?;
    Ok(target)
}

/// Newest modification time of `path` and, for directories, everything below it.
pub fn latest_modification(path: &Path) -> Option<DateTime<Utc>> {
    if !path.exists() {
        return None;
    }

    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !e.path().components().any(|c| c.as_os_str() == ".git"))
        .filter_map(|e| e.metadata().ok()?.modified().ok())
        .map(DateTime::<Utc>::from)
        .max()
}

/// Copy a file or a directory tree to `dest`.
pub fn mirror(source: &Path, dest: &Path) -> Result<()> {
    if source.is_file() {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, dest)?;
        return Ok(());
    }

    fs::create_dir_all(dest)?;
    for entry in WalkDir::new(source)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let relative = path.strip_prefix(source).unwrap_or(path);
        let target = dest.join(relative);

        if path.is_dir() {
            fs::create_dir_all(&target)?;
        } else if path.is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &target)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("g:a:classifier"), "g_a_classifier");
        assert_eq!(sanitize_name("widgets"), "widgets");
        assert_eq!(sanitize_name("a/b\\c"), "a_b_c");
    }

    #[test]
    fn test_move_aside_keeps_contents() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("pkg");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("file.txt"), "old").unwrap();

        assert!(is_non_empty_dir(&dir));
        let moved = move_aside(&dir, &temp.path().join(".backup"), "g:a").unwrap();

        assert!(!dir.exists());
        assert_eq!(fs::read_to_string(moved.join("file.txt")).unwrap(), "old");
        assert!(moved.file_name().unwrap().to_string_lossy().starts_with("g_a-"));
    }

    #[test]
    fn test_mirror_directory() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("nested/a.txt"), "a").unwrap();

        let dest = temp.path().join("dest");
        mirror(&src, &dest).unwrap();
        assert_eq!(fs::read_to_string(dest.join("nested/a.txt")).unwrap(), "a");
        assert!(latest_modification(&dest).is_some());
        assert!(latest_modification(&temp.path().join("missing")).is_none());
    }
}
