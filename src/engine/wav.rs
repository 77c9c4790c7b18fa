//! PCM codec
//!
//! Encodes float buffers to 16-bit little-endian PCM WAV byte streams and
//! decodes WAV byte streams back into `AudioBuffer`s. Every encoded slice
//! and every container payload goes through this module.
//!
//! Quantization is asymmetric to match the two's-complement range:
//! negative samples scale by 32768, non-negative samples by 32767.
//!
//! Mono and stereo output carries the canonical 44-byte PCM header. With
//! more than two channels hound writes a WAVE_FORMAT_EXTENSIBLE `fmt `
//! chunk instead, so the sample data does not start at offset 44; readers
//! must locate the `data` chunk from the header.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::engine::buffer::AudioBuffer;
use crate::error::{Result, SlicerError};

/// Bit depth written by the encoder
pub const PCM_BITS_PER_SAMPLE: u16 = 16;

/// Convert a float sample to a signed 16-bit value
#[inline]
pub fn quantize_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    let scaled = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
    scaled.round() as i16
}

/// Inverse of [`quantize_i16`]
#[inline]
pub fn dequantize_i16(value: i16) -> f32 {
    if value < 0 {
        value as f32 / 32768.0
    } else {
        value as f32 / 32767.0
    }
}

/// Encode interleaved float samples as a 16-bit PCM WAV byte stream
///
/// # Errors
/// * `InvalidInput` - if `channels` is 0, `sample_rate` is 0, or the sample
///   count is not a whole number of frames
pub fn encode_interleaved(interleaved: &[f32], channels: u16, sample_rate: u32) -> Result<Vec<u8>> {
    if channels < 1 {
        return Err(SlicerError::invalid("channel count must be at least 1"));
    }
    if sample_rate == 0 {
        return Err(SlicerError::invalid("sample rate must be greater than 0"));
    }
    if interleaved.len() % channels as usize != 0 {
        return Err(SlicerError::invalid(format!(
            "{} samples do not divide into {} channels",
            interleaved.len(),
            channels
        )));
    }

    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: PCM_BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    };

    let mut bytes = Vec::with_capacity(44 + interleaved.len() * 2);
    let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec).map_err(encode_error)?;
    for &sample in interleaved {
        writer
            .write_sample(quantize_i16(sample))
            .map_err(encode_error)?;
    }
    writer.finalize().map_err(encode_error)?;

    Ok(bytes)
}

/// Encode an `AudioBuffer` using its own channel count and sample rate
pub fn encode(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    let channels = u16::try_from(buffer.channels())
        .map_err(|_| SlicerError::invalid(format!("{} channels exceed the WAV limit", buffer.channels())))?;
    encode_interleaved(&buffer.to_interleaved(), channels, buffer.sample_rate)
}

/// Decode a WAV byte stream into an `AudioBuffer`
///
/// 16-bit data is the inverse of [`encode`]. 8/24/32-bit integer and
/// 32-bit float PCM are also accepted so recordings from other tools can
/// be loaded through the same entry point.
///
/// # Errors
/// * `Format` - if the header is malformed or unsupported, or the data
///   chunk is truncated
pub fn decode(bytes: &[u8]) -> Result<AudioBuffer> {
    let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| SlicerError::Format {
        reason: format!("Failed to parse WAV header: {}", e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(SlicerError::format("WAV header declares 0 channels"));
    }
    if spec.sample_rate == 0 {
        return Err(SlicerError::format("WAV header declares a 0 Hz sample rate"));
    }

    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    if interleaved.len() % channels != 0 {
        return Err(SlicerError::format(format!(
            "data chunk holds {} samples, not a whole number of {}-channel frames",
            interleaved.len(),
            channels
        )));
    }

    debug!(
        "Decoded WAV: {} ch, {} Hz, {}-bit, {} frames",
        channels,
        spec.sample_rate,
        spec.bits_per_sample,
        interleaved.len() / channels
    );

    AudioBuffer::from_interleaved(&interleaved, channels, spec.sample_rate)
}

/// Read a WAV file from disk and decode it
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `Format` - If the file is not a readable PCM WAV
pub fn import_audio(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(SlicerError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let bytes = fs::read(path)?;
    decode(&bytes)
}

/// Encode a buffer as 16-bit PCM and write it to disk
pub fn export_audio(buffer: &AudioBuffer, path: &Path) -> Result<()> {
    let bytes = encode(buffer)?;
    fs::write(path, bytes)?;
    Ok(())
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn encode_error(e: hound::Error) -> SlicerError {
    match e {
        hound::Error::IoError(io) => SlicerError::Io(io),
        other => SlicerError::invalid(format!("WAV encoding failed: {}", other)),
    }
}

fn sample_error(e: hound::Error) -> SlicerError {
    SlicerError::Format {
        reason: format!("Failed to read samples: {}", e),
        source: Some(Box::new(e)),
    }
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(sample_error),
        SampleFormat::Int => match bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|s| s.map(|v| v as f32 / 128.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(sample_error),
            16 => reader
                .samples::<i16>()
                .map(|s| s.map(dequantize_i16))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(sample_error),
            // 24-bit stored as i32 in hound
            24 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 8388608.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(sample_error),
            32 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 2147483648.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(sample_error),
            _ => Err(SlicerError::format(format!(
                "unsupported {}-bit integer PCM",
                bits_per_sample
            ))),
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
