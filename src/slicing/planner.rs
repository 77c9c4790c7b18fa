//! Slice planning
//!
//! Turns an unordered set of marker times into zones that partition
//! `[0, duration)`. Zone boundaries are logical: crossfade padding is added
//! later, to the extracted audio only.

use super::marker::MarkerList;

/// Marker times closer than this are treated as the same boundary
const TIME_EPSILON: f64 = 1e-9;

/// Half-open interval `[start, end)` that becomes one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    /// Position in the plan, starting at 0
    pub index: usize,
    pub start: f64,
    pub end: f64,
    /// Index of the marker that opens this zone, if any
    pub marker: Option<usize>,
}

impl Zone {
    #[inline]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    #[inline]
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }
}

/// Plan zones from bare marker times
///
/// Times are sorted, clamped to `[0, duration]` and deduplicated; 0 and
/// `duration` are added as outer bounds. No times yields one zone covering
/// the whole recording. A non-positive duration yields no zones.
pub fn plan(marker_times: &[f64], duration: f64) -> Vec<Zone> {
    build_zones(marker_times.iter().map(|&t| (t, None)).collect(), duration)
}

/// Plan zones from a marker list, remembering which marker opens each zone
///
/// When several markers share a time, the earliest in list order wins.
/// The leading zone has no marker unless one sits at t = 0.
pub fn plan_markers(markers: &MarkerList, duration: f64) -> Vec<Zone> {
    build_zones(
        markers
            .iter()
            .enumerate()
            .map(|(i, m)| (m.time, Some(i)))
            .collect(),
        duration,
    )
}

/// Marker times that split `duration` into `count` equal zones
///
/// Emits `i * duration / count` for `i` in `1..count`; a count of 0 or 1
/// yields no times.
pub fn equal_division(count: usize, duration: f64) -> Vec<f64> {
    (1..count)
        .map(|i| i as f64 * duration / count as f64)
        .collect()
}

/// Shorthand for planning an equal division directly
pub fn plan_equal(count: usize, duration: f64) -> Vec<Zone> {
    plan(&equal_division(count, duration), duration)
}

fn build_zones(mut points: Vec<(f64, Option<usize>)>, duration: f64) -> Vec<Zone> {
    if !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }

    points.retain(|(t, _)| t.is_finite());
    for point in points.iter_mut() {
        point.0 = point.0.clamp(0.0, duration);
    }
    points.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut bounds: Vec<(f64, Option<usize>)> = vec![(0.0, None)];
    for (time, marker) in points {
        // bounds is never empty
        let last = bounds.len() - 1;
        if time - bounds[last].0 <= TIME_EPSILON {
            if bounds[last].1.is_none() {
                bounds[last].1 = marker;
            }
        } else {
            bounds.push((time, marker));
        }
    }

    if bounds.len() > 1 && duration - bounds[bounds.len() - 1].0 <= TIME_EPSILON {
        bounds.pop();
    }
    bounds.push((duration, None));

    bounds
        .windows(2)
        .enumerate()
        .map(|(index, pair)| Zone {
            index,
            start: pair[0].0,
            end: pair[1].0,
            marker: pair[0].1,
        })
        .collect()
}
