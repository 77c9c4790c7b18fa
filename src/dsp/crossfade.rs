//! Crossfade synthesis
//!
//! Cuts the source into one segment per zone. Each segment is padded by the
//! crossfade length on both sides and gets a linear ramp centred on every
//! interior zone boundary, so the fade-out of one segment and the fade-in
//! of the next sum to unity gain across the join. At each boundary the
//! crossfade is shortened to half the shorter neighbouring zone, which keeps
//! the sum at unity around short zones too. The outer edges of the
//! recording are never faded.

use log::debug;

use crate::engine::buffer::{secs_to_frames, AudioBuffer};
use crate::error::{Result, SlicerError};
use crate::progress::Progress;
use crate::slicing::Zone;

/// Audio rendered for one zone
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub zone: Zone,
    /// First source frame included (padding included)
    pub start_frame: usize,
    /// One past the last source frame included
    pub end_frame: usize,
    pub buffer: AudioBuffer,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.end_frame - self.start_frame
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Crossfade length in frames for a duration in milliseconds
pub fn crossfade_frames(crossfade_ms: f64, sample_rate: u32) -> usize {
    secs_to_frames(crossfade_ms / 1000.0, sample_rate)
}

/// Render one segment per zone with crossfades at internal boundaries
///
/// # Arguments
/// * `source` - The full recording
/// * `zones` - Partition of the recording, as produced by the planner
/// * `crossfade_ms` - Ramp half-length; 0 gives plain hard cuts
/// * `progress` - Receives one checkpoint per zone
///
/// # Returns
/// Segments in zone order. Every segment has the source's channel count
/// and sample rate.
///
/// # Errors
/// - `InvalidInput` if `crossfade_ms` is negative or not finite
/// - `Cancelled` if the host stops the run between zones
pub fn synthesize(
    source: &AudioBuffer,
    zones: &[Zone],
    crossfade_ms: f64,
    progress: &mut Progress<'_>,
) -> Result<Vec<Segment>> {
    if !crossfade_ms.is_finite() || crossfade_ms < 0.0 {
        return Err(SlicerError::invalid(format!(
            "crossfade must be a non-negative number of milliseconds, got {}",
            crossfade_ms
        )));
    }

    let fade = crossfade_frames(crossfade_ms, source.sample_rate);
    let bounds = zone_frames(source, zones);
    let total = zones.len();
    let mut segments = Vec::with_capacity(total);

    let half = |(start, end): (usize, usize)| (end - start) / 2;

    for (i, zone) in zones.iter().enumerate() {
        let (start, end) = bounds[i];
        let own = fade.min(half(bounds[i]));
        let fade_in = if start == 0 {
            0
        } else {
            i.checked_sub(1).map_or(own, |prev| own.min(half(bounds[prev])))
        };
        let fade_out = if end == source.len() {
            0
        } else {
            bounds.get(i + 1).map_or(own, |&next| own.min(half(next)))
        };

        segments.push(render_zone(source, zone, (start, end), fade_in, fade_out));
        progress.checkpoint(
            (i + 1) as f32 / total as f32,
            &format!("Rendered slice {}/{}", i + 1, total),
        )?;
    }

    debug!(
        "Synthesized {} segments with {} frame crossfade",
        segments.len(),
        fade
    );
    Ok(segments)
}

/// Hard-cut every zone, without padding or fades
pub fn extract(source: &AudioBuffer, zones: &[Zone]) -> Vec<Segment> {
    zones
        .iter()
        .zip(zone_frames(source, zones))
        .map(|(zone, frames)| render_zone(source, zone, frames, 0, 0))
        .collect()
}

/// Zone edges in source frames, clamped to the recording
fn zone_frames(source: &AudioBuffer, zones: &[Zone]) -> Vec<(usize, usize)> {
    let len = source.len();
    zones
        .iter()
        .map(|zone| {
            let start = secs_to_frames(zone.start, source.sample_rate).min(len);
            let end = secs_to_frames(zone.end, source.sample_rate)
                .min(len)
                .max(start);
            (start, end)
        })
        .collect()
}

/// Cut `[zone_start - fade_in, zone_end + fade_out)` and apply the ramps
///
/// Each fade is at most half the zone, so the two ramps never overlap.
fn render_zone(
    source: &AudioBuffer,
    zone: &Zone,
    (zone_start, zone_end): (usize, usize),
    fade_in: usize,
    fade_out: usize,
) -> Segment {
    let start_frame = zone_start.saturating_sub(fade_in);
    let end_frame = (zone_end + fade_out).min(source.len());
    let mut buffer = source.slice_frames(start_frame, end_frame);

    if fade_in > 0 || fade_out > 0 {
        let in_from = zone_start as f64 - fade_in as f64;
        let out_to = (zone_end + fade_out) as f64;

        for channel in buffer.samples.iter_mut() {
            for (offset, sample) in channel.iter_mut().enumerate() {
                let n = (start_frame + offset) as f64;
                let mut gain = 1.0;
                if fade_in > 0 {
                    gain *= ((n - in_from) / (2 * fade_in) as f64).clamp(0.0, 1.0);
                }
                if fade_out > 0 {
                    gain *= ((out_to - n) / (2 * fade_out) as f64).clamp(0.0, 1.0);
                }
                *sample *= gain as f32;
            }
        }
    }

    Segment {
        zone: *zone,
        start_frame,
        end_frame,
        buffer,
    }
}
