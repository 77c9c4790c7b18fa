//! DSP Stages
//!
//! Offline signal processing used by the slicing pipeline. Each stage
//! takes an `AudioBuffer` by reference and returns new audio or analysis
//! results; nothing here mutates the caller's buffer.

pub mod crossfade;
pub mod normalize;
pub mod onset;

pub use crossfade::{crossfade_frames, extract, synthesize, Segment};
pub use normalize::{normalize, Normalizer, DEFAULT_TARGET_PEAK};
pub use onset::{detect, Downmix, OnsetConfig, OnsetDetector};
