//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::SessionConfig;
use crate::container;
use crate::dsp;
use crate::engine;
use crate::error::Result;
use crate::progress::{Flow, Progress};
use crate::session::PipelineSession;
use crate::slicing::NoteMode;

/// Options for the `slice` command
#[derive(Debug, Clone, Default)]
pub struct SliceOptions {
    pub equal: Option<usize>,
    pub onsets: bool,
    pub at: Vec<f64>,
    pub crossfade_ms: Option<u32>,
    pub normalize: bool,
    pub normalize_samples: bool,
    pub notes: Option<NoteMode>,
    pub samples_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::load(path),
        None => Ok(SessionConfig::default()),
    }
}

fn logging_progress<'a>() -> Progress<'a> {
    Progress::new(|fraction, message: &str| {
        debug!("[{:>3.0}%] {}", fraction * 100.0, message);
        Flow::Continue
    })
}

/// Slice a recording and write the container.
pub fn slice(input: &Path, output: &Path, options: &SliceOptions) -> Result<()> {
    let mut config = load_config(options.config.as_deref())?;
    if let Some(ms) = options.crossfade_ms {
        config.crossfade_ms = ms;
    }
    if let Some(mode) = options.notes {
        config.note_mode = mode;
    }
    if options.normalize_samples {
        config.normalize_samples = true;
    }
    let equal = options.equal.unwrap_or(config.equal_slices);

    let mut session = PipelineSession::new(config)?;
    session.load_file(input)?;

    if options.normalize {
        session.normalize_source()?;
    }

    let mut progress = logging_progress();
    let markers = if options.onsets {
        session.detect_onsets(&mut progress)?
    } else if !options.at.is_empty() {
        session.place_markers(&options.at)?
    } else {
        session.divide_equally(equal)?
    };
    info!("Placed {} markers", markers);

    let bytes = session.export_container(&mut progress)?;
    container::write_atomic(output, &bytes)?;

    if let Some(dir) = &options.samples_dir {
        container::unpack_to_dir(dir, &session.manifest(), session.samples())?;
        println!("Samples written to: {}", dir.display());
    }

    println!(
        "Wrote {} samples ({} bytes) to {}",
        session.samples().len(),
        bytes.len(),
        output.display()
    );
    Ok(())
}

/// Print detected onset times, one per line.
pub fn onsets(input: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let buffer = engine::import_audio(input)?;
    let times = dsp::detect(&buffer, &config.onset)?;

    info!("{} onsets in {}", times.len(), input.display());
    if times.is_empty() {
        println!("No onsets detected.");
    }
    for time in times {
        println!("{:.4}", time);
    }
    Ok(())
}

/// Peak-normalize a WAV file.
pub fn normalize(input: &Path, output: &Path, target: f32) -> Result<()> {
    let buffer = engine::import_audio(input)?;
    let normalized = dsp::normalize(&buffer, target)?;
    engine::export_audio(&normalized, output)?;

    println!(
        "Normalized {} -> {} (peak {:.1} dB -> {:.1} dB)",
        input.display(),
        output.display(),
        buffer.peak_db(),
        normalized.peak_db()
    );
    Ok(())
}

/// Print a container's manifest and per-sample checksums.
pub fn inspect(path: &Path) -> Result<()> {
    let (manifest, samples) = container::read_container(path)?;

    println!("Container: {}", path.display());
    println!("Samples: {}", samples.len());
    if let Some(ms) = manifest.crossfade_ms() {
        println!("Crossfade: {} ms", ms);
    }
    println!("{:-<100}", "");
    for sample in &samples {
        println!(
            "{:<24} {:<5} vel {:>3} {:>10} bytes  sha256:{}",
            sample.name,
            sample.note,
            sample.velocity,
            sample.data.len(),
            sample.checksum()
        );
        if let Some(region) = sample.loop_region {
            println!("{:<24} loop {:.3}s - {:.3}s", "", region.start, region.end);
        }
    }
    println!("{:-<100}", "");
    Ok(())
}

/// Write each sample of a container to a directory.
pub fn unpack(path: &Path, output: &Path) -> Result<()> {
    let (manifest, samples) = container::read_container(path)?;
    container::unpack_to_dir(output, &manifest, &samples)?;
    println!("Unpacked {} samples to {}", samples.len(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::signal::{generate_dc, generate_pulse_train};
    use crate::error::SlicerError;
    use tempfile::TempDir;

    #[test]
    fn test_slice_equal_and_unpack() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.dwp");
        engine::export_audio(&generate_dc(0.5, 2, 1.0, 22050), &input).unwrap();

        let options = SliceOptions {
            equal: Some(4),
            samples_dir: Some(dir.path().join("samples")),
            ..SliceOptions::default()
        };
        slice(&input, &output, &options).unwrap();

        let (_, samples) = container::read_container(&output).unwrap();
        assert_eq!(samples.len(), 4);
        assert!(dir.path().join("samples/sample_3.wav").exists());
        assert!(dir.path().join("samples/manifest.json").exists());

        unpack(&output, &dir.path().join("unpacked")).unwrap();
        assert!(dir.path().join("unpacked/sample_0.wav").exists());
        inspect(&output).unwrap();
    }

    #[test]
    fn test_slice_onsets_on_silence_fails() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("silent.wav");
        engine::export_audio(&generate_dc(0.0, 1, 1.0, 22050), &input).unwrap();

        let options = SliceOptions {
            onsets: true,
            ..SliceOptions::default()
        };
        let result = slice(&input, &dir.path().join("out.dwp"), &options);
        assert!(matches!(result, Err(SlicerError::NoOnsetsDetected)));
        assert!(!dir.path().join("out.dwp").exists());
    }

    #[test]
    fn test_slice_keeps_previous_output_on_failure() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("silent.wav");
        let output = dir.path().join("out.dwp");
        engine::export_audio(&generate_dc(0.0, 1, 1.0, 22050), &input).unwrap();
        std::fs::write(&output, b"previous").unwrap();

        let options = SliceOptions {
            onsets: true,
            ..SliceOptions::default()
        };
        assert!(slice(&input, &output, &options).is_err());
        assert_eq!(std::fs::read(&output).unwrap(), b"previous");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_onsets_and_normalize_commands() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("pulses.wav");
        let output = dir.path().join("norm.wav");
        engine::export_audio(&generate_pulse_train(&[0.25, 0.75], 0.05, 0.4, 1.0, 44100), &input)
            .unwrap();

        onsets(&input, None).unwrap();
        normalize(&input, &output, 0.9).unwrap();
        let peak = engine::import_audio(&output).unwrap().peak();
        assert!((peak - 0.9).abs() < 1e-3);
    }
}
