//! Audio Engine Module
//!
//! Core audio types and I/O:
//! - Audio buffer model
//! - 16-bit PCM WAV codec and file import/export
//! - Deterministic test signals

pub mod buffer;
pub mod signal;
pub mod wav;

pub use buffer::{linear_to_db, secs_to_frames, AudioBuffer};
pub use wav::{decode, encode, encode_interleaved, export_audio, import_audio};
