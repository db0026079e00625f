//! Archive extraction (zip, jar, tar, tar.gz).

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use crate::{DepotError, Result};

/// Supported archive types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveType {
    /// Detect archive type from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let path_str = path.to_string_lossy().to_lowercase();

        if path_str.ends_with(".zip") || path_str.ends_with(".jar") || path_str.ends_with(".war") {
            Some(ArchiveType::Zip)
        } else if path_str.ends_with(".tar.gz") || path_str.ends_with(".tgz") {
            Some(ArchiveType::TarGz)
        } else if path_str.ends_with(".tar") {
            Some(ArchiveType::Tar)
        } else {
            None
        }
    }
}

/// Archive extractor
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    /// Extract an archive, detecting its type from the file name
    pub fn extract(archive_path: &Path, dest_dir: &Path) -> Result<()> {
        let archive_type = ArchiveType::from_path(archive_path).ok_or_else(|| {
            DepotError::InstallationFailed(format!(
                "Unsupported archive format: {}",
                archive_path.display()
            ))
        })?;
        Self::extract_with_type(archive_path, dest_dir, archive_type)
    }

    /// Extract an archive with explicit type
    pub fn extract_with_type(
        archive_path: &Path,
        dest_dir: &Path,
        archive_type: ArchiveType,
    ) -> Result<()> {
        std::fs::create_dir_all(dest_dir)?;

        match archive_type {
            ArchiveType::Zip => Self::extract_zip(archive_path, dest_dir),
            ArchiveType::Tar => {
                let reader = BufReader::new(File::open(archive_path)?);
                Self::extract_tar_reader(reader, dest_dir)
            }
            ArchiveType::TarGz => {
                let reader = BufReader::new(File::open(archive_path)?);
                Self::extract_tar_reader(GzDecoder::new(reader), dest_dir)
            }
        }
    }

    fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
        let file = File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(BufReader::new(file))
            .map_err(|e| DepotError::InstallationFailed(format!("Failed to open zip: {}", e)))?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| DepotError::InstallationFailed(format!("Failed to read zip entry: {}", e)))?;

            let relative = checked_relative(entry.name())?;
            if relative.as_os_str().is_empty() {
                continue;
            }
            let outpath = dest_dir.join(&relative);

            if entry.is_dir() {
                std::fs::create_dir_all(&outpath)?;
                continue;
            }
            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&outpath)?;
            std::io::copy(&mut entry, &mut outfile)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))?;
                }
            }
        }

        Ok(())
    }

    fn extract_tar_reader<R: Read>(reader: R, dest_dir: &Path) -> Result<()> {
        let mut archive = tar::Archive::new(reader);

        let entries = archive
            .entries()
            .map_err(|e| DepotError::InstallationFailed(format!("Failed to read tar: {}", e)))?;
        for entry in entries {
            let mut entry = entry
                .map_err(|e| DepotError::InstallationFailed(format!("Failed to read tar entry: {}", e)))?;
            let name = entry
                .path()
                .map_err(|e| DepotError::InstallationFailed(format!("Invalid path in tar: {}", e)))?
                .to_string_lossy()
                .to_string();

            let relative = checked_relative(&name)?;
            if relative.as_os_str().is_empty() {
                continue;
            }
            let outpath = dest_dir.join(&relative);

            if entry.header().entry_type().is_dir() {
                std::fs::create_dir_all(&outpath)?;
                continue;
            }
            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)?;
            }
            entry
                .unpack(&outpath)
                .map_err(|e| DepotError::InstallationFailed(format!("Failed to extract: {}", e)))?;
        }

        Ok(())
    }
}

/// Reject absolute entries and entries escaping the destination.
fn checked_relative(name: &str) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => {
                return Err(DepotError::InstallationFailed(format!(
                    "Path traversal detected in archive: {}",
                    name
                )))
            }
        }
    }
    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_archive_type_from_path() {
        assert_eq!(ArchiveType::from_path(Path::new("natives.zip")), Some(ArchiveType::Zip));
        assert_eq!(ArchiveType::from_path(Path::new("lib.jar")), Some(ArchiveType::Zip));
        assert_eq!(ArchiveType::from_path(Path::new("dist.tar.gz")), Some(ArchiveType::TarGz));
        assert_eq!(ArchiveType::from_path(Path::new("dist.tgz")), Some(ArchiveType::TarGz));
        assert_eq!(ArchiveType::from_path(Path::new("dist.tar")), Some(ArchiveType::Tar));
        assert_eq!(ArchiveType::from_path(Path::new("notes.txt")), None);
    }

    #[test]
    fn test_checked_relative() {
        assert_eq!(checked_relative("a/./b.txt").unwrap(), PathBuf::from("a/b.txt"));
        assert!(checked_relative("../escape").is_err());
        assert!(checked_relative("/etc/passwd").is_err());
    }

    #[test]
    fn test_extract_zip() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("natives.zip");
        {
            let mut writer = zip::ZipWriter::new(File::create(&archive).unwrap());
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("lib/native.so", options).unwrap();
            writer.write_all(b"ELF").unwrap();
            writer.finish().unwrap();
        }

        let dest = temp.path().join("out");
        ArchiveExtractor::extract(&archive, &dest).unwrap();
        assert_eq!(std::fs::read(dest.join("lib/native.so")).unwrap(), b"ELF");
    }
}
