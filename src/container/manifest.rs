//! Container manifest and sample records

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::slicing::LoopRegion;

/// One named, encoded sample ready for packaging
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Unique within a container, e.g. "sample_0.wav"
    pub name: String,
    /// Encoded PCM WAV bytes
    pub data: Vec<u8>,
    pub note: String,
    pub velocity: u8,
    pub loop_region: Option<LoopRegion>,
}

impl Sample {
    /// SHA-256 of the encoded bytes, lowercase hex
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.data);
        format!("{:x}", hasher.finalize())
    }

    /// Manifest entry describing this sample
    pub fn manifest_entry(&self, crossfade_ms: Option<u32>) -> ManifestEntry {
        ManifestEntry {
            name: self.name.clone(),
            note: self.note.clone(),
            velocity: self.velocity,
            loop_region: self.loop_region,
            crossfade_ms,
        }
    }
}

/// Settings recorded alongside the per-sample metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManifestExtra {
    pub crossfade_ms: Option<u32>,
}

/// Per-sample manifest record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub note: String,
    pub velocity: u8,
    #[serde(rename = "loop", default)]
    pub loop_region: Option<LoopRegion>,
    #[serde(
        rename = "crossfadeMs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub crossfade_ms: Option<u32>,
}

/// JSON manifest stored at the head of a container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub samples: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn from_samples(samples: &[Sample], extra: ManifestExtra) -> Self {
        Self {
            samples: samples
                .iter()
                .map(|s| s.manifest_entry(extra.crossfade_ms))
                .collect(),
        }
    }

    /// Crossfade recorded for the container, if every entry agrees on one
    pub fn crossfade_ms(&self) -> Option<u32> {
        let first = self.samples.first()?.crossfade_ms;
        self.samples
            .iter()
            .all(|e| e.crossfade_ms == first)
            .then_some(first)
            .flatten()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(name: &str) -> Sample {
        Sample {
            name: name.to_string(),
            data: b"abc".to_vec(),
            note: "C4".to_string(),
            velocity: 100,
            loop_region: None,
        }
    }

    #[test]
    fn test_checksum_is_sha256_hex() {
        assert_eq!(
            sample("a").checksum(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_manifest_json_shape() {
        let mut s = sample("sample_0.wav");
        s.loop_region = Some(LoopRegion { start: 0.1, end: 0.4 });
        let manifest = Manifest::from_samples(&[s], ManifestExtra { crossfade_ms: Some(12) });

        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "samples": [{
                    "name": "sample_0.wav",
                    "note": "C4",
                    "velocity": 100,
                    "loop": {"start": 0.1, "end": 0.4},
                    "crossfadeMs": 12
                }]
            })
        );
        assert_eq!(manifest.crossfade_ms(), Some(12));
    }

    #[test]
    fn test_crossfade_omitted_when_absent() {
        let manifest = Manifest::from_samples(&[sample("x")], ManifestExtra::default());
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(!json.contains("crossfadeMs"));
        assert!(json.contains(r#""loop":null"#));
        assert_eq!(manifest.crossfade_ms(), None);
    }
}
