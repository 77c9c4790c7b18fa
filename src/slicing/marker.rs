//! Slice markers
//!
//! A `MarkerList` is an index-addressed collection. Markers are never
//! matched by identity: every edit names the position it applies to, and
//! the list is only sorted (as a copy) when zones are planned.

use serde::{Deserialize, Serialize};

use super::note::{chromatic_note, DEFAULT_NOTE};
use crate::error::{Result, SlicerError};

/// Velocity given to samples without an explicit one
pub const DEFAULT_VELOCITY: u8 = 100;

/// Highest MIDI velocity
pub const MAX_VELOCITY: u8 = 127;

/// Offset applied to a duplicated marker so it does not land on its source
pub const DUPLICATE_OFFSET_SECS: f64 = 0.01;

/// Sustain loop inside a sample, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopRegion {
    pub start: f64,
    pub end: f64,
}

impl LoopRegion {
    /// Create a loop region, rejecting non-finite or inverted bounds
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || end < start {
            return Err(SlicerError::invalid(format!(
                "invalid loop region [{}, {}]",
                start, end
            )));
        }
        Ok(Self { start, end })
    }
}

/// How generated markers (onsets, equal division) are labelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteMode {
    /// Every marker gets the default note
    #[default]
    Fixed,
    /// Notes rise with the marker's position in the recording
    Chromatic,
}

impl NoteMode {
    /// Label for a marker at `time` in a recording of `duration` seconds
    pub fn note_for(&self, time: f64, duration: f64) -> String {
        match self {
            NoteMode::Fixed => DEFAULT_NOTE.to_string(),
            NoteMode::Chromatic => chromatic_note(time, duration),
        }
    }
}

/// A slice point with the metadata of the sample it opens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Position in seconds
    pub time: f64,
    /// Pitch label, e.g. "C4"
    pub note: String,
    /// MIDI velocity, 0-127
    pub velocity: u8,
    /// Optional sustain loop
    #[serde(rename = "loop", default)]
    pub loop_region: Option<LoopRegion>,
}

impl Marker {
    /// Marker at `time` with the default note and velocity
    pub fn new(time: f64) -> Self {
        Self {
            time,
            note: DEFAULT_NOTE.to_string(),
            velocity: DEFAULT_VELOCITY,
            loop_region: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Set the velocity, saturating at 127
    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity.min(MAX_VELOCITY);
        self
    }

    pub fn with_loop(mut self, loop_region: LoopRegion) -> Self {
        self.loop_region = Some(loop_region);
        self
    }
}

/// Ordered-by-creation collection of markers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerList {
    markers: Vec<Marker>,
}

impl MarkerList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_markers(markers: Vec<Marker>) -> Self {
        Self { markers }
    }

    /// Build markers at `times`, labelled according to `mode`
    pub fn from_times(times: &[f64], mode: NoteMode, velocity: u8, duration: f64) -> Self {
        let markers = times
            .iter()
            .map(|&t| {
                Marker::new(t)
                    .with_note(mode.note_for(t, duration))
                    .with_velocity(velocity)
            })
            .collect();
        Self { markers }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Marker> {
        self.markers.iter()
    }

    pub fn as_slice(&self) -> &[Marker] {
        &self.markers
    }

    pub fn get(&self, index: usize) -> Option<&Marker> {
        self.markers.get(index)
    }

    /// Marker times in list order (unsorted)
    pub fn times(&self) -> Vec<f64> {
        self.markers.iter().map(|m| m.time).collect()
    }

    /// Append a marker and return its index
    pub fn push(&mut self, marker: Marker) -> usize {
        self.markers.push(marker);
        self.markers.len() - 1
    }

    /// Insert a marker at `index`, shifting later markers up
    pub fn insert(&mut self, index: usize, marker: Marker) -> Result<()> {
        if index > self.markers.len() {
            return Err(SlicerError::invalid(format!(
                "insert position {} out of range ({} markers)",
                index,
                self.markers.len()
            )));
        }
        self.markers.insert(index, marker);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Marker> {
        self.check_index(index)?;
        Ok(self.markers.remove(index))
    }

    /// Move a marker, clamping the new time to `[0, duration]`
    pub fn move_to(&mut self, index: usize, time: f64, duration: f64) -> Result<()> {
        if !time.is_finite() {
            return Err(SlicerError::invalid(format!("marker time {} is not finite", time)));
        }
        let marker = self.marker_mut(index)?;
        marker.time = time.clamp(0.0, duration.max(0.0));
        Ok(())
    }

    pub fn set_note(&mut self, index: usize, note: impl Into<String>) -> Result<()> {
        self.marker_mut(index)?.note = note.into();
        Ok(())
    }

    /// Set a marker's velocity, clamping to 0..=127
    pub fn set_velocity(&mut self, index: usize, velocity: i32) -> Result<()> {
        self.marker_mut(index)?.velocity = velocity.clamp(0, MAX_VELOCITY as i32) as u8;
        Ok(())
    }

    pub fn set_loop(&mut self, index: usize, loop_region: Option<LoopRegion>) -> Result<()> {
        self.marker_mut(index)?.loop_region = loop_region;
        Ok(())
    }

    /// Copy a marker to just after its own position; returns the new index
    pub fn duplicate(&mut self, index: usize) -> Result<usize> {
        self.check_index(index)?;
        let mut copy = self.markers[index].clone();
        copy.time += DUPLICATE_OFFSET_SECS;
        Ok(self.push(copy))
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }

    fn marker_mut(&mut self, index: usize) -> Result<&mut Marker> {
        self.check_index(index)?;
        Ok(&mut self.markers[index])
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.markers.len() {
            return Err(SlicerError::invalid(format!(
                "marker index {} out of range ({} markers)",
                index,
                self.markers.len()
            )));
        }
        Ok(())
    }
}
