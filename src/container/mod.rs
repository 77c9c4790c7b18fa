//! Sample Container
//!
//! Packs named PCM samples and their metadata into a single DWP3 blob and
//! reads it back.

pub mod format;
pub mod manifest;

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;

use log::info;
use tempfile::NamedTempFile;

pub use format::{deserialize, serialize, MAGIC};
pub use manifest::{Manifest, ManifestEntry, ManifestExtra, Sample};

use crate::error::{Result, SlicerError};

/// File name `unpack_to_dir` reserves for the manifest
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Write `bytes` to `path` via a temporary file in the same directory
///
/// The target either keeps its previous contents or holds all of `bytes`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| SlicerError::Io(e.error))?;
    Ok(())
}

/// Serialize samples and write them to `path`
pub fn write_container(path: &Path, samples: &[Sample], extra: ManifestExtra) -> Result<()> {
    let bytes = serialize(samples, extra)?;
    write_atomic(path, &bytes)?;
    info!(
        "Wrote {} samples ({} bytes) to {}",
        samples.len(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

/// Read and parse a container file
pub fn read_container(path: &Path) -> Result<(Manifest, Vec<Sample>)> {
    if !path.exists() {
        return Err(SlicerError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    deserialize(&fs::read(path)?)
}

/// Write each sample's bytes plus `manifest.json` into `dir`
///
/// Sample names are used as file names. All names are checked before
/// anything is written: a name that is not a plain file name, a repeated
/// name, or [`MANIFEST_FILE_NAME`] is rejected.
pub fn unpack_to_dir(dir: &Path, manifest: &Manifest, samples: &[Sample]) -> Result<()> {
    let mut names = HashSet::with_capacity(samples.len());
    for sample in samples {
        let file_name = Path::new(&sample.name);
        if file_name.file_name() != Some(file_name.as_os_str()) {
            return Err(SlicerError::invalid(format!(
                "sample name '{}' is not a plain file name",
                sample.name
            )));
        }
        if sample.name == MANIFEST_FILE_NAME {
            return Err(SlicerError::invalid(format!(
                "sample name '{}' is reserved for the manifest",
                sample.name
            )));
        }
        if !names.insert(sample.name.as_str()) {
            return Err(SlicerError::invalid(format!(
                "duplicate sample name '{}'",
                sample.name
            )));
        }
    }

    fs::create_dir_all(dir)?;
    for sample in samples {
        fs::write(dir.join(&sample.name), &sample.data)?;
    }
    fs::write(dir.join(MANIFEST_FILE_NAME), manifest.to_json_pretty()?)?;
    info!("Unpacked {} samples to {}", samples.len(), dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(name: &str) -> Sample {
        Sample {
            name: name.to_string(),
            data: vec![0, 1, 2],
            note: "A4".to_string(),
            velocity: 127,
            loop_region: None,
        }
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kit.dwp");
        let samples = vec![sample("a.wav"), sample("b.wav")];

        write_container(&path, &samples, ManifestExtra::default()).unwrap();
        let (manifest, read) = read_container(&path).unwrap();
        assert_eq!(read, samples);
        assert_eq!(manifest.samples.len(), 2);
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kit.dwp");
        write_container(&path, &[sample("a.wav")], ManifestExtra::default()).unwrap();
        write_container(&path, &[sample("b.wav")], ManifestExtra::default()).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("kit.dwp")]);
        assert_eq!(read_container(&path).unwrap().1[0].name, "b.wav");
    }

    #[test]
    fn test_write_into_missing_dir_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("kit.dwp");
        let result = write_container(&path, &[sample("a.wav")], ManifestExtra::default());
        assert!(matches!(result, Err(SlicerError::Io(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_container(Path::new("/nonexistent/kit.dwp"));
        assert!(matches!(result, Err(SlicerError::FileNotFound { .. })));
    }

    #[test]
    fn test_unpack_writes_files() {
        let dir = TempDir::new().unwrap();
        let samples = vec![sample("a.wav")];
        let manifest = Manifest::from_samples(&samples, ManifestExtra::default());

        unpack_to_dir(dir.path(), &manifest, &samples).unwrap();
        assert_eq!(fs::read(dir.path().join("a.wav")).unwrap(), vec![0, 1, 2]);
        let json = fs::read_to_string(dir.path().join("manifest.json")).unwrap();
        let parsed: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn test_unpack_rejects_path_names() {
        let dir = TempDir::new().unwrap();
        let samples = vec![sample("../escape.wav")];
        let manifest = Manifest::from_samples(&samples, ManifestExtra::default());
        assert!(unpack_to_dir(dir.path(), &manifest, &samples).is_err());
    }

    #[test]
    fn test_unpack_rejects_reserved_and_duplicate_names() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");

        let reserved = vec![sample("a.wav"), sample(MANIFEST_FILE_NAME)];
        let manifest = Manifest::from_samples(&reserved, ManifestExtra::default());
        let result = unpack_to_dir(&out, &manifest, &reserved);
        assert!(matches!(result, Err(SlicerError::InvalidInput { .. })));

        let mut second = sample("a.wav");
        second.data = vec![7, 7];
        let duplicated = vec![sample("a.wav"), second];
        let manifest = Manifest::from_samples(&duplicated, ManifestExtra::default());
        let result = unpack_to_dir(&out, &manifest, &duplicated);
        assert!(matches!(result, Err(SlicerError::InvalidInput { .. })));

        // Rejected before the directory is touched
        assert!(!out.exists());
    }
}
