//! Slicekit - Recording-to-Sampler Pipeline
//!
//! Slicekit turns one recording into a set of instrument samples:
//! 1. Markers are placed by onset detection, equal division, or by hand
//! 2. The planner turns markers into zones that partition the recording
//! 3. Each zone is cut with crossfade padding, optionally normalized and
//!    encoded as 16-bit PCM WAV
//! 4. The samples and their metadata are packed into a DWP3 container
//!
//! # Architecture
//!
//! - `engine`: audio buffers and the PCM codec
//! - `dsp`: onset detection, crossfade synthesis, peak normalization
//! - `slicing`: markers, note labels, zone planning
//! - `container`: the DWP3 binary format
//! - `session`: the stateful pipeline tying the stages together

pub mod cli;
pub mod config;
pub mod container;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod progress;
pub mod session;
pub mod slicing;

pub use config::SessionConfig;
pub use error::{Result, SlicerError};
pub use progress::{CancelToken, Flow, Progress};
pub use session::PipelineSession;
