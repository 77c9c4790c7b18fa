//! Onset Detection
//!
//! Energy-based onset picking: windowed RMS with half-window hop, positive
//! first difference as onset strength, and a mean-relative threshold with
//! an absolute floor. Accepted onsets are kept at least `min_spacing_ms`
//! apart.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::engine::AudioBuffer;
use crate::error::{Result, SlicerError};

// ============================================================================
// Configuration
// ============================================================================

/// How channels are folded into the single energy signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Downmix {
    /// Mean of absolute sample values across channels
    #[default]
    AverageAbs,
    /// Channel 0 only
    FirstChannel,
}

/// Onset detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnsetConfig {
    /// RMS window length in milliseconds (hop is half of this)
    pub window_ms: f32,
    /// Threshold as a multiple of the mean onset strength
    pub threshold_multiplier: f32,
    /// Minimum distance between accepted onsets
    pub min_spacing_ms: f32,
    /// Lowest threshold regardless of the mean
    pub floor_threshold: f32,
    pub downmix: Downmix,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            window_ms: 30.0,
            threshold_multiplier: 3.0,
            min_spacing_ms: 40.0,
            floor_threshold: 0.0007,
            downmix: Downmix::AverageAbs,
        }
    }
}

impl OnsetConfig {
    /// Shorter window, stricter threshold, first channel only
    pub fn first_channel() -> Self {
        Self {
            window_ms: 20.0,
            threshold_multiplier: 4.0,
            min_spacing_ms: 50.0,
            floor_threshold: 0.001,
            downmix: Downmix::FirstChannel,
        }
    }

    /// Check that every parameter is finite and in range
    pub fn validate(&self) -> Result<()> {
        if !self.window_ms.is_finite() || self.window_ms <= 0.0 {
            return Err(SlicerError::invalid(format!(
                "onset window must be positive, got {} ms",
                self.window_ms
            )));
        }
        for (name, value) in [
            ("threshold_multiplier", self.threshold_multiplier),
            ("min_spacing_ms", self.min_spacing_ms),
            ("floor_threshold", self.floor_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SlicerError::invalid(format!(
                    "onset {} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Detector
// ============================================================================

/// Energy-based onset detector
#[derive(Debug, Clone)]
pub struct OnsetDetector {
    config: OnsetConfig,
}

impl OnsetDetector {
    /// Create a detector, validating the configuration
    pub fn new(config: OnsetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &OnsetConfig {
        &self.config
    }

    /// Window and hop lengths in frames for a given rate
    pub fn window_and_hop(&self, sample_rate: u32) -> (usize, usize) {
        let window = ((self.config.window_ms as f64 / 1000.0) * sample_rate as f64)
            .round()
            .max(1.0) as usize;
        let hop = ((window as f64) / 2.0).round().max(1.0) as usize;
        (window, hop)
    }

    /// Onset strength per hop: positive energy increase from window k to k+1
    pub fn onset_strength(&self, buffer: &AudioBuffer) -> Vec<f32> {
        let (window, hop) = self.window_and_hop(buffer.sample_rate);
        let energy = energy_envelope(&self.energy_signal(buffer), window, hop);
        energy
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).max(0.0))
            .collect()
    }

    /// Detect onset times in seconds
    ///
    /// Output is strictly increasing and lies in `[0, duration)`. An empty
    /// vector means no window rose above the threshold.
    pub fn detect(&self, buffer: &AudioBuffer) -> Vec<f64> {
        if buffer.is_empty() || buffer.channels() == 0 || buffer.sample_rate == 0 {
            return Vec::new();
        }

        let (_, hop) = self.window_and_hop(buffer.sample_rate);
        let strength = self.onset_strength(buffer);
        if strength.is_empty() {
            return Vec::new();
        }

        let mean = strength.iter().map(|&s| s as f64).sum::<f64>() / strength.len() as f64;
        let threshold = (mean * self.config.threshold_multiplier as f64)
            .max(self.config.floor_threshold as f64);
        let min_spacing = self.config.min_spacing_ms as f64 / 1000.0;
        let sample_rate = buffer.sample_rate as f64;

        let mut times: Vec<f64> = Vec::new();
        for (k, &value) in strength.iter().enumerate() {
            if (value as f64) <= threshold {
                continue;
            }
            // strength[k] is the rise into window k + 1
            let time = ((k + 1) * hop) as f64 / sample_rate;
            match times.last() {
                Some(&last) if time - last < min_spacing => {}
                _ => times.push(time),
            }
        }

        debug!(
            "Onset detection: {} candidates, threshold {:.5}, {} accepted",
            strength.len(),
            threshold,
            times.len()
        );

        times
    }

    fn energy_signal(&self, buffer: &AudioBuffer) -> Vec<f32> {
        match self.config.downmix {
            Downmix::FirstChannel => buffer.channel(0).to_vec(),
            Downmix::AverageAbs => {
                let channels = buffer.channels() as f32;
                (0..buffer.len())
                    .map(|i| {
                        buffer.samples.iter().map(|ch| ch[i].abs()).sum::<f32>() / channels
                    })
                    .collect()
            }
        }
    }
}

impl Default for OnsetDetector {
    fn default() -> Self {
        Self {
            config: OnsetConfig::default(),
        }
    }
}

/// Detect onsets with the given configuration
pub fn detect(buffer: &AudioBuffer, config: &OnsetConfig) -> Result<Vec<f64>> {
    Ok(OnsetDetector::new(config.clone())?.detect(buffer))
}

/// Windowed RMS; a window is only used while it ends strictly before the
/// last frame
fn energy_envelope(data: &[f32], window: usize, hop: usize) -> Vec<f32> {
    let mut energies = Vec::new();
    let mut start = 0;
    while start + window < data.len() {
        let sum: f64 = data[start..start + window]
            .iter()
            .map(|&s| (s as f64) * (s as f64))
            .sum();
        energies.push((sum / window as f64).sqrt() as f32);
        start += hop;
    }
    energies
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::signal::{generate_pulse_train, generate_test_tone};

    const SR: u32 = 44100;

    #[test]
    fn test_silent_buffer_yields_nothing() {
        let buffer = AudioBuffer::new(2, SR as usize * 2, SR);
        assert!(OnsetDetector::default().detect(&buffer).is_empty());
    }

    #[test]
    fn test_empty_and_short_buffers() {
        assert!(OnsetDetector::default().detect(&AudioBuffer::new(1, 0, SR)).is_empty());
        assert!(OnsetDetector::default().detect(&AudioBuffer::new(1, 100, SR)).is_empty());
    }

    #[test]
    fn test_steady_tone_yields_nothing() {
        // 30 ms holds exactly 30 cycles of 1 kHz, so every window has equal energy
        let buffer = generate_test_tone(1000.0, 2.0, SR);
        assert!(OnsetDetector::default().detect(&buffer).is_empty());
    }

    #[test]
    fn test_pulses_detected_within_one_window() {
        let pulses = [0.5, 1.25, 2.0, 2.75];
        let buffer = generate_pulse_train(&pulses, 0.05, 0.8, 3.5, SR);
        let detector = OnsetDetector::default();
        let window_secs = detector.config().window_ms as f64 / 1000.0;

        let times = detector.detect(&buffer);
        assert_eq!(times.len(), pulses.len(), "got {:?}", times);
        for (t, p) in times.iter().zip(pulses) {
            assert!((t - p).abs() < window_secs, "onset {} too far from pulse {}", t, p);
        }
        assert!(times.windows(2).all(|w| w[0] < w[1]));
        assert!(times.iter().all(|&t| t >= 0.0 && t < buffer.duration_secs()));
    }

    #[test]
    fn test_min_spacing_merges_close_pulses() {
        // Two bursts 20 ms apart fall inside one 40 ms spacing window
        let buffer = generate_pulse_train(&[1.0, 1.02, 2.0], 0.01, 0.8, 3.0, SR);
        let times = OnsetDetector::default().detect(&buffer);
        assert_eq!(times.len(), 2, "got {:?}", times);
    }

    #[test]
    fn test_first_channel_downmix_ignores_other_channels() {
        let pulses = generate_pulse_train(&[0.5, 1.5], 0.05, 0.8, 2.0, SR);
        let silent = vec![0.0; pulses.len()];
        let stereo =
            AudioBuffer::from_channels(vec![silent, pulses.channel(0).to_vec()], SR).unwrap();

        let first = OnsetDetector::new(OnsetConfig::first_channel()).unwrap();
        assert!(first.detect(&stereo).is_empty());

        let average = OnsetDetector::default();
        assert_eq!(average.detect(&stereo).len(), 2);
    }

    #[test]
    fn test_window_and_hop() {
        let detector = OnsetDetector::default();
        assert_eq!(detector.window_and_hop(44100), (1323, 662));

        let first = OnsetDetector::new(OnsetConfig::first_channel()).unwrap();
        assert_eq!(first.window_and_hop(44100), (882, 441));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = OnsetConfig {
            window_ms: 0.0,
            ..OnsetConfig::default()
        };
        assert!(matches!(
            OnsetDetector::new(config),
            Err(SlicerError::InvalidInput { .. })
        ));

        let config = OnsetConfig {
            threshold_multiplier: f32::NAN,
            ..OnsetConfig::default()
        };
        assert!(detect(&AudioBuffer::new(1, 10, SR), &config).is_err());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: OnsetConfig = serde_json::from_str(r#"{"window_ms": 20.0}"#).unwrap();
        assert_eq!(config.window_ms, 20.0);
        assert_eq!(config.min_spacing_ms, 40.0);
        assert_eq!(config.downmix, Downmix::AverageAbs);
    }
}
