//! CLI Module
//!
//! Command-line interface for slicing recordings into sample containers.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::slicing::NoteMode;

/// Slicekit - cut a recording into crossfaded samples and pack them as DWP3
#[derive(Parser, Debug)]
#[command(name = "slicekit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Note labelling for generated markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NotesArg {
    Fixed,
    Chromatic,
}

impl From<NotesArg> for NoteMode {
    fn from(arg: NotesArg) -> Self {
        match arg {
            NotesArg::Fixed => NoteMode::Fixed,
            NotesArg::Chromatic => NoteMode::Chromatic,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Slice a recording and write a DWP3 container
    #[command(name = "slice")]
    Slice {
        /// Input WAV file
        input: PathBuf,

        /// Output container path
        #[arg(short, long)]
        output: PathBuf,

        /// Split into N equal slices (default from config)
        #[arg(long, value_name = "N", conflicts_with_all = ["onsets", "at"])]
        equal: Option<usize>,

        /// Place markers at detected onsets
        #[arg(long, conflicts_with = "at")]
        onsets: bool,

        /// Place markers at these times (seconds)
        #[arg(long, value_name = "SECONDS", num_args = 1..)]
        at: Vec<f64>,

        /// Crossfade length between neighbouring samples
        #[arg(long, value_name = "MS")]
        crossfade_ms: Option<u32>,

        /// Peak-normalize the whole recording before slicing
        #[arg(long)]
        normalize: bool,

        /// Peak-normalize each sample individually
        #[arg(long)]
        normalize_samples: bool,

        /// How generated markers are labelled
        #[arg(long, value_enum)]
        notes: Option<NotesArg>,

        /// Also write every sample and manifest.json to this directory
        #[arg(long, value_name = "DIR")]
        samples_dir: Option<PathBuf>,

        /// JSON session config
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Print detected onset times
    #[command(name = "onsets")]
    Onsets {
        /// Input WAV file
        input: PathBuf,

        /// JSON session config (onset section is used)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Peak-normalize a WAV file
    #[command(name = "normalize")]
    Normalize {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file (16-bit PCM)
        #[arg(short, long)]
        output: PathBuf,

        /// Linear target peak
        #[arg(long, default_value_t = crate::dsp::DEFAULT_TARGET_PEAK)]
        target: f32,
    },

    /// Show the manifest and per-sample checksums of a container
    #[command(name = "inspect")]
    Inspect {
        /// DWP3 container
        path: PathBuf,
    },

    /// Extract every sample of a container into a directory
    #[command(name = "unpack")]
    Unpack {
        /// DWP3 container
        path: PathBuf,

        /// Destination directory
        #[arg(short, long)]
        output: PathBuf,
    },
}
