//! Test signal generators
//!
//! Deterministic signals used by the test suites and by the CLI's
//! self-check paths.

use crate::engine::buffer::AudioBuffer;

/// Generate a mono sine tone at full scale
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
    let num_frames = (duration_secs * sample_rate as f32) as usize;
    let mut buffer = AudioBuffer::new(1, num_frames, sample_rate);

    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
    for (i, sample) in buffer.channel_mut(0).iter_mut().enumerate() {
        *sample = (angular_freq * i as f32).sin();
    }

    buffer
}

/// Generate a stereo tone with different frequencies per channel
pub fn generate_stereo_test_tone(
    freq_left: f32,
    freq_right: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> AudioBuffer {
    let num_frames = (duration_secs * sample_rate as f32) as usize;
    let mut buffer = AudioBuffer::new(2, num_frames, sample_rate);

    for (ch, freq) in [freq_left, freq_right].into_iter().enumerate() {
        let angular_freq = 2.0 * std::f32::consts::PI * freq / sample_rate as f32;
        for (i, sample) in buffer.channel_mut(ch).iter_mut().enumerate() {
            *sample = (angular_freq * i as f32).sin();
        }
    }

    buffer
}

/// Constant-valued buffer, handy for inspecting gain curves
pub fn generate_dc(value: f32, num_channels: usize, duration_secs: f64, sample_rate: u32) -> AudioBuffer {
    let num_frames = (duration_secs * sample_rate as f64).round() as usize;
    AudioBuffer {
        samples: vec![vec![value; num_frames]; num_channels],
        sample_rate,
    }
}

/// Silence with short sine bursts starting at each of `onsets` (seconds)
///
/// Bursts are a 1 kHz tone (sample_rate/8 at very low rates) and are
/// truncated at the end of the buffer.
pub fn generate_pulse_train(
    onsets: &[f64],
    burst_secs: f64,
    amplitude: f32,
    duration_secs: f64,
    sample_rate: u32,
) -> AudioBuffer {
    let num_frames = (duration_secs * sample_rate as f64).round() as usize;
    let burst_frames = (burst_secs * sample_rate as f64).round() as usize;
    let mut buffer = AudioBuffer::new(1, num_frames, sample_rate);
    let burst_freq = (sample_rate as f32 / 8.0).min(1000.0);
    let angular_freq = 2.0 * std::f32::consts::PI * burst_freq / sample_rate as f32;

    let data = buffer.channel_mut(0);
    for &onset in onsets {
        let start = (onset * sample_rate as f64).round() as usize;
        let end = (start + burst_frames).min(num_frames);
        for (k, sample) in data[start.min(end)..end].iter_mut().enumerate() {
            *sample = amplitude * (angular_freq * k as f32).sin();
        }
    }

    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_test_tone() {
        let buffer = generate_test_tone(440.0, 1.0, 48000);
        assert_eq!(buffer.len(), 48000);
        assert_eq!(buffer.channels(), 1);

        // Half a cycle in, the sine should be back near zero
        let half_cycle = (48000.0_f32 / 440.0 / 2.0) as usize;
        assert!(buffer.channel(0)[half_cycle].abs() < 0.1);
    }

    #[test]
    fn test_generate_stereo_test_tone() {
        let buffer = generate_stereo_test_tone(440.0, 880.0, 0.5, 48000);
        assert_eq!(buffer.channels(), 2);
        assert!((buffer.channel(0)[100] - buffer.channel(1)[100]).abs() > 0.01);
    }

    #[test]
    fn test_pulse_train_places_bursts() {
        let buffer = generate_pulse_train(&[0.5, 1.0], 0.05, 0.8, 2.0, 1000);
        let data = buffer.channel(0);
        assert_eq!(buffer.len(), 2000);
        assert!(data[..500].iter().all(|&s| s == 0.0));
        assert!(data[500..550].iter().any(|&s| s.abs() > 0.5));
        assert!(data[550..1000].iter().all(|&s| s == 0.0));
        assert!(data[1000..1050].iter().any(|&s| s.abs() > 0.5));
    }

    #[test]
    fn test_pulse_train_truncates_at_end() {
        let buffer = generate_pulse_train(&[0.99, 5.0], 0.05, 0.8, 1.0, 1000);
        assert_eq!(buffer.len(), 1000);
    }
}
