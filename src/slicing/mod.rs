//! Slicing Module
//!
//! Markers, note labels and zone planning.

pub mod marker;
pub mod note;
pub mod planner;

pub use marker::{LoopRegion, Marker, MarkerList, NoteMode, DEFAULT_VELOCITY, MAX_VELOCITY};
pub use note::{midi_to_note, note_to_midi, pitch_byte, DEFAULT_NOTE};
pub use planner::{equal_division, plan, plan_equal, plan_markers, Zone};
