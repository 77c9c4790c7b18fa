//! Peak Normalizer
//!
//! Scales a buffer so its absolute peak lands on a target level. The same
//! gain is applied to every channel, so inter-channel balance is kept.

use log::debug;

use crate::engine::buffer::{linear_to_db, AudioBuffer};
use crate::error::{Result, SlicerError};

/// Default target peak (linear, about -0.18 dBFS)
pub const DEFAULT_TARGET_PEAK: f32 = 0.98;

/// Peak normalizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    target_peak: f32,
}

impl Normalizer {
    /// Create a normalizer for the given linear target
    ///
    /// # Errors
    /// `InvalidInput` unless `0 < target_peak <= 1`.
    pub fn new(target_peak: f32) -> Result<Self> {
        if !target_peak.is_finite() || target_peak <= 0.0 || target_peak > 1.0 {
            return Err(SlicerError::invalid(format!(
                "normalize target must be in (0, 1], got {}",
                target_peak
            )));
        }
        Ok(Self { target_peak })
    }

    pub fn target_peak(&self) -> f32 {
        self.target_peak
    }

    /// Gain that maps the buffer's peak onto the target
    ///
    /// # Errors
    /// - `InvalidInput` if any sample is NaN or infinite
    /// - `SilentInput` if the peak is 0
    pub fn gain_for(&self, buffer: &AudioBuffer) -> Result<f32> {
        if !buffer.is_finite() {
            return Err(SlicerError::invalid("buffer contains non-finite samples"));
        }
        let peak = buffer.peak();
        if peak == 0.0 {
            return Err(SlicerError::SilentInput);
        }
        Ok(self.target_peak / peak)
    }

    /// Return a normalized copy of `buffer`
    ///
    /// Shape (channels, frames, rate) is unchanged. Output samples are
    /// clamped to [-1, 1].
    pub fn apply(&self, buffer: &AudioBuffer) -> Result<AudioBuffer> {
        let gain = self.gain_for(buffer)?;
        debug!(
            "Normalizing: peak {:.1} dB, gain {:+.2} dB",
            buffer.peak_db(),
            linear_to_db(gain)
        );

        let mut output = buffer.clone();
        for channel in output.samples.iter_mut() {
            for sample in channel.iter_mut() {
                *sample *= gain;
            }
        }
        output.clamp();
        Ok(output)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            target_peak: DEFAULT_TARGET_PEAK,
        }
    }
}

/// Normalize `buffer` to `target_peak`
pub fn normalize(buffer: &AudioBuffer, target_peak: f32) -> Result<AudioBuffer> {
    Normalizer::new(target_peak)?.apply(buffer)
}
