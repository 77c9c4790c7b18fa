//! DWP3 binary layout
//!
//! ```text
//! magic            4 bytes  "DWP3"
//! manifest length  u32 LE
//! manifest         UTF-8 JSON
//! sample count     u32 LE
//! per sample:
//!   name length u32 | name | data length u32 | data | pitch u8 | velocity u8
//! ```
//!
//! The JSON manifest is authoritative. The inline table repeats the name,
//! pitch and velocity so a reader can index the blob without parsing JSON,
//! and must agree with the manifest entry for entry. Sample names are
//! unique within a container.

use std::collections::HashSet;

use log::debug;

use super::manifest::{Manifest, ManifestExtra, Sample};
use crate::error::{Result, SlicerError};
use crate::slicing::{pitch_byte, MAX_VELOCITY};

/// File signature
pub const MAGIC: &[u8; 4] = b"DWP3";

/// Serialize samples into a container
///
/// # Errors
/// `InvalidInput` on duplicate names, a velocity above 127, or a name,
/// payload or manifest too long for a u32 length field. Validation runs
/// before any bytes are produced.
pub fn serialize(samples: &[Sample], extra: ManifestExtra) -> Result<Vec<u8>> {
    let mut names = HashSet::with_capacity(samples.len());
    for sample in samples {
        if !names.insert(sample.name.as_str()) {
            return Err(SlicerError::invalid(format!(
                "duplicate sample name '{}'",
                sample.name
            )));
        }
        if sample.velocity > MAX_VELOCITY {
            return Err(SlicerError::invalid(format!(
                "sample '{}' has velocity {} (max {})",
                sample.name, sample.velocity, MAX_VELOCITY
            )));
        }
        length_u32(sample.name.len(), "sample name")?;
        length_u32(sample.data.len(), "sample data")?;
    }
    let count = length_u32(samples.len(), "sample count")?;

    let manifest = serde_json::to_vec(&Manifest::from_samples(samples, extra))?;
    let manifest_len = length_u32(manifest.len(), "manifest")?;

    let payload: usize = samples
        .iter()
        .map(|s| 4 + s.name.len() + 4 + s.data.len() + 2)
        .sum();
    let mut out = Vec::with_capacity(MAGIC.len() + 4 + manifest.len() + 4 + payload);

    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&manifest_len.to_le_bytes());
    out.extend_from_slice(&manifest);
    out.extend_from_slice(&count.to_le_bytes());
    for sample in samples {
        out.extend_from_slice(&(sample.name.len() as u32).to_le_bytes());
        out.extend_from_slice(sample.name.as_bytes());
        out.extend_from_slice(&(sample.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&sample.data);
        out.push(pitch_byte(&sample.note));
        out.push(sample.velocity);
    }

    debug!("Serialized {} samples into {} bytes", samples.len(), out.len());
    Ok(out)
}

/// Parse a container back into its manifest and samples
///
/// # Errors
/// `Format` on a bad signature, truncation, invalid UTF-8 or JSON,
/// trailing bytes, a repeated sample name, or any disagreement between
/// the manifest and the inline sample table.
pub fn deserialize(bytes: &[u8]) -> Result<(Manifest, Vec<Sample>)> {
    let mut reader = ByteReader::new(bytes);

    if reader.take(MAGIC.len(), "magic")? != MAGIC {
        return Err(SlicerError::format("not a DWP3 container (bad magic)"));
    }

    let manifest_len = reader.read_u32("manifest length")? as usize;
    let manifest_bytes = reader.take(manifest_len, "manifest")?;
    let manifest_text = std::str::from_utf8(manifest_bytes).map_err(|e| SlicerError::Format {
        reason: "manifest is not valid UTF-8".to_string(),
        source: Some(Box::new(e)),
    })?;
    let manifest: Manifest = serde_json::from_str(manifest_text).map_err(|e| SlicerError::Format {
        reason: "manifest is not valid JSON".to_string(),
        source: Some(Box::new(e)),
    })?;

    let count = reader.read_u32("sample count")? as usize;
    if count != manifest.samples.len() {
        return Err(SlicerError::format(format!(
            "manifest lists {} samples but table holds {}",
            manifest.samples.len(),
            count
        )));
    }

    let mut samples = Vec::with_capacity(count);
    let mut names = HashSet::with_capacity(count);
    for (index, entry) in manifest.samples.iter().enumerate() {
        if !names.insert(entry.name.as_str()) {
            return Err(SlicerError::format(format!(
                "duplicate sample name '{}'",
                entry.name
            )));
        }

        let name_len = reader.read_u32("name length")? as usize;
        let name = std::str::from_utf8(reader.take(name_len, "name")?).map_err(|e| {
            SlicerError::Format {
                reason: format!("sample {} name is not valid UTF-8", index),
                source: Some(Box::new(e)),
            }
        })?;
        let data_len = reader.read_u32("data length")? as usize;
        let data = reader.take(data_len, "sample data")?.to_vec();
        let pitch = reader.read_u8("pitch")?;
        let velocity = reader.read_u8("velocity")?;

        if name != entry.name {
            return Err(SlicerError::format(format!(
                "sample {} is named '{}' in the table but '{}' in the manifest",
                index, name, entry.name
            )));
        }
        if velocity != entry.velocity || velocity > MAX_VELOCITY {
            return Err(SlicerError::format(format!(
                "sample '{}' velocity {} does not match manifest ({})",
                name, velocity, entry.velocity
            )));
        }
        if pitch != pitch_byte(&entry.note) {
            return Err(SlicerError::format(format!(
                "sample '{}' pitch {} does not match note '{}'",
                name, pitch, entry.note
            )));
        }

        samples.push(Sample {
            name: entry.name.clone(),
            data,
            note: entry.note.clone(),
            velocity,
            loop_region: entry.loop_region,
        });
    }

    if reader.remaining() > 0 {
        return Err(SlicerError::format(format!(
            "{} trailing bytes after sample table",
            reader.remaining()
        )));
    }

    debug!("Deserialized {} samples", samples.len());
    Ok((manifest, samples))
}

fn length_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| SlicerError::invalid(format!("{} length {} exceeds u32", what, len)))
}

/// Bounds-checked cursor over the container bytes
struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(SlicerError::format(format!(
                "truncated container: {} needs {} bytes at offset {}, {} left",
                what,
                len,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u32(&mut self, what: &str) -> Result<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4, what)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn read_u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slicing::LoopRegion;
    use pretty_assertions::assert_eq;

    fn samples() -> Vec<Sample> {
        vec![
            Sample {
                name: "sample_0.wav".to_string(),
                data: vec![1, 2, 3, 4],
                note: "C4".to_string(),
                velocity: 100,
                loop_region: None,
            },
            Sample {
                name: "sample_1.wav".to_string(),
                data: vec![9; 10],
                note: "F#3".to_string(),
                velocity: 64,
                loop_region: Some(LoopRegion { start: 0.0, end: 0.5 }),
            },
        ]
    }

    #[test]
    fn test_layout() {
        let bytes = serialize(&samples()[..1], ManifestExtra::default()).unwrap();
        assert_eq!(&bytes[..4], b"DWP3");

        let manifest_len = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
        let manifest: Manifest = serde_json::from_slice(&bytes[8..8 + manifest_len]).unwrap();
        assert_eq!(manifest.samples[0].name, "sample_0.wav");

        let mut at = 8 + manifest_len;
        assert_eq!(&bytes[at..at + 4], &1u32.to_le_bytes());
        at += 4;
        assert_eq!(&bytes[at..at + 4], &12u32.to_le_bytes());
        at += 4 + 12;
        assert_eq!(&bytes[at..at + 4], &4u32.to_le_bytes());
        at += 4 + 4;
        assert_eq!(&bytes[at..], &[60u8, 100]);
    }

    #[test]
    fn test_roundtrip_preserves_samples() {
        let input = samples();
        let bytes = serialize(&input, ManifestExtra { crossfade_ms: Some(20) }).unwrap();
        let (manifest, output) = deserialize(&bytes).unwrap();

        assert_eq!(output, input);
        assert_eq!(manifest.crossfade_ms(), Some(20));
        assert_eq!(pitch_byte(&output[1].note), 54);
    }

    #[test]
    fn test_empty_container() {
        let bytes = serialize(&[], ManifestExtra::default()).unwrap();
        let (manifest, output) = deserialize(&bytes).unwrap();
        assert!(manifest.samples.is_empty());
        assert!(output.is_empty());
    }

    #[test]
    fn test_unparseable_note_writes_default_pitch() {
        let mut input = samples();
        input[0].note = "kick".to_string();
        let bytes = serialize(&input[..1], ManifestExtra::default()).unwrap();
        assert_eq!(bytes[bytes.len() - 2], 60);
        assert_eq!(deserialize(&bytes).unwrap().1[0].note, "kick");
    }

    #[test]
    fn test_rejects_invalid_input() {
        let mut dup = samples();
        dup[1].name = dup[0].name.clone();
        assert!(matches!(
            serialize(&dup, ManifestExtra::default()),
            Err(SlicerError::InvalidInput { .. })
        ));

        let mut loud = samples();
        loud[0].velocity = 128;
        assert!(matches!(
            serialize(&loud, ManifestExtra::default()),
            Err(SlicerError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = serialize(&samples(), ManifestExtra::default()).unwrap();
        bytes[3] = b'2';
        assert!(matches!(deserialize(&bytes), Err(SlicerError::Format { .. })));
    }

    #[test]
    fn test_every_truncation_fails() {
        let bytes = serialize(&samples(), ManifestExtra::default()).unwrap();
        for len in 0..bytes.len() {
            assert!(
                matches!(deserialize(&bytes[..len]), Err(SlicerError::Format { .. })),
                "truncation at {} accepted",
                len
            );
        }
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = serialize(&samples(), ManifestExtra::default()).unwrap();
        bytes.push(0);
        assert!(matches!(deserialize(&bytes), Err(SlicerError::Format { .. })));
    }

    #[test]
    fn test_table_disagreeing_with_manifest() {
        let bytes = serialize(&samples()[..1], ManifestExtra::default()).unwrap();

        let mut velocity = bytes.clone();
        let last = velocity.len() - 1;
        velocity[last] = 90;
        assert!(matches!(deserialize(&velocity), Err(SlicerError::Format { .. })));

        let mut pitch = bytes.clone();
        pitch[last - 1] = 61;
        assert!(matches!(deserialize(&pitch), Err(SlicerError::Format { .. })));

        // "sample_0.wav" -> "sample_9.wav" in the table only
        let mut name = bytes;
        let manifest_len = u32::from_le_bytes(name[4..8].try_into().unwrap()) as usize;
        let name_at = 8 + manifest_len + 4 + 4;
        name[name_at + 7] = b'9';
        assert!(matches!(deserialize(&name), Err(SlicerError::Format { .. })));
    }

    /// Assemble a container by hand so the table can hold anything
    fn raw_container(manifest: &Manifest, table: &[(&str, u8, u8)]) -> Vec<u8> {
        let json = serde_json::to_vec(manifest).unwrap();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&(json.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&json);
        bytes.extend_from_slice(&(table.len() as u32).to_le_bytes());
        for (name, pitch, velocity) in table {
            bytes.extend_from_slice(&(name.len() as u32).to_le_bytes());
            bytes.extend_from_slice(name.as_bytes());
            bytes.extend_from_slice(&2u32.to_le_bytes());
            bytes.extend_from_slice(&[0, 0]);
            bytes.push(*pitch);
            bytes.push(*velocity);
        }
        bytes
    }

    #[test]
    fn test_huge_octave_note_is_a_format_error() {
        let mut input = samples();
        input[0].note = "B2147483646".to_string();
        let manifest = Manifest::from_samples(&input[..1], ManifestExtra::default());

        let bytes = raw_container(&manifest, &[("sample_0.wav", 61, 100)]);
        assert!(matches!(deserialize(&bytes), Err(SlicerError::Format { .. })));

        // Unparseable octave falls back to middle C on write
        let bytes = serialize(&input[..1], ManifestExtra::default()).unwrap();
        assert_eq!(bytes[bytes.len() - 2], 60);
        assert_eq!(deserialize(&bytes).unwrap().1[0].note, "B2147483646");
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let mut input = samples();
        input[1].name = input[0].name.clone();
        input[1].note = input[0].note.clone();
        input[1].velocity = input[0].velocity;
        let manifest = Manifest::from_samples(&input, ManifestExtra::default());

        let table = [("sample_0.wav", 60, 100), ("sample_0.wav", 60, 100)];
        let bytes = raw_container(&manifest, &table);
        assert!(matches!(deserialize(&bytes), Err(SlicerError::Format { .. })));

        let unique = raw_container(
            &Manifest::from_samples(&input[..1], ManifestExtra::default()),
            &[("sample_0.wav", 60, 100)],
        );
        assert_eq!(deserialize(&unique).unwrap().1.len(), 1);
    }

    #[test]
    fn test_invalid_manifest_json() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(b"{x}");
        bytes.extend_from_slice(&0u32.to_le_bytes());
        assert!(matches!(deserialize(&bytes), Err(SlicerError::Format { .. })));
    }
}
