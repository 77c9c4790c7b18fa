//! Session configuration
//!
//! Loaded from a JSON file; every field is optional and falls back to its
//! default. CLI flags override individual fields after loading.

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dsp::normalize::DEFAULT_TARGET_PEAK;
use crate::dsp::onset::OnsetConfig;
use crate::error::{Result, SlicerError};
use crate::slicing::{NoteMode, DEFAULT_VELOCITY, MAX_VELOCITY};

/// Default crossfade between neighbouring samples
pub const DEFAULT_CROSSFADE_MS: u32 = 12;

/// Default slice count for equal division
pub const DEFAULT_EQUAL_SLICES: usize = 60;

/// Pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Crossfade length in milliseconds (0 disables padding and fades)
    pub crossfade_ms: u32,
    pub onset: OnsetConfig,
    /// Linear peak used by every normalization step
    pub normalize_target: f32,
    /// Normalize each sample before encoding
    pub normalize_samples: bool,
    /// Labels for generated markers
    pub note_mode: NoteMode,
    pub default_velocity: u8,
    pub equal_slices: usize,
    /// Samples are named `{prefix}_{index}.wav`
    pub sample_name_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            crossfade_ms: DEFAULT_CROSSFADE_MS,
            onset: OnsetConfig::default(),
            normalize_target: DEFAULT_TARGET_PEAK,
            normalize_samples: false,
            note_mode: NoteMode::Fixed,
            default_velocity: DEFAULT_VELOCITY,
            equal_slices: DEFAULT_EQUAL_SLICES,
            sample_name_prefix: "sample".to_string(),
        }
    }
}

impl SessionConfig {
    /// Load and validate a JSON config file
    ///
    /// # Errors
    /// - `FileNotFound` if `path` does not exist
    /// - `Serialization` if the file is not valid JSON for this shape
    /// - `InvalidInput` if a value is out of range
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SlicerError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let text = fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&text)?;
        config.validate()?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Check every field for a usable value
    pub fn validate(&self) -> Result<()> {
        self.onset.validate()?;
        if !self.normalize_target.is_finite()
            || self.normalize_target <= 0.0
            || self.normalize_target > 1.0
        {
            return Err(SlicerError::invalid(format!(
                "normalize_target must be in (0, 1], got {}",
                self.normalize_target
            )));
        }
        if self.default_velocity > MAX_VELOCITY {
            return Err(SlicerError::invalid(format!(
                "default_velocity must be at most {}, got {}",
                MAX_VELOCITY, self.default_velocity
            )));
        }
        if self.equal_slices == 0 {
            return Err(SlicerError::invalid("equal_slices must be at least 1"));
        }
        if self.sample_name_prefix.is_empty()
            || self.sample_name_prefix.contains(['/', '\\'])
        {
            return Err(SlicerError::invalid(format!(
                "sample_name_prefix '{}' must be a non-empty plain name",
                self.sample_name_prefix
            )));
        }
        Ok(())
    }

    /// Name of the sample at `index`
    pub fn sample_name(&self, index: usize) -> String {
        format!("{}_{}.wav", self.sample_name_prefix, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::onset::Downmix;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.crossfade_ms, 12);
        assert_eq!(config.normalize_target, 0.98);
        assert_eq!(config.equal_slices, 60);
        assert_eq!(config.sample_name(3), "sample_3.wav");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("slice.json");
        fs::write(
            &path,
            r#"{"crossfade_ms": 20, "note_mode": "chromatic", "onset": {"downmix": "first_channel"}}"#,
        )
        .unwrap();

        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.crossfade_ms, 20);
        assert_eq!(config.note_mode, NoteMode::Chromatic);
        assert_eq!(config.onset.downmix, Downmix::FirstChannel);
        assert_eq!(config.onset.window_ms, 30.0);
        assert_eq!(config.sample_name_prefix, "sample");
    }

    #[test]
    fn test_load_rejects_bad_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"normalize_target": 2.0}"#).unwrap();
        assert!(matches!(
            SessionConfig::load(&path),
            Err(SlicerError::InvalidInput { .. })
        ));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            SessionConfig::load(&path),
            Err(SlicerError::Serialization(_))
        ));

        assert!(matches!(
            SessionConfig::load(&dir.path().join("missing.json")),
            Err(SlicerError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_validate_prefix_and_slices() {
        let config = SessionConfig {
            sample_name_prefix: "a/b".to_string(),
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SessionConfig {
            equal_slices: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
