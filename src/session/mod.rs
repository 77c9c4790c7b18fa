//! Pipeline Session
//!
//! Owns everything one slicing run needs: the decoded recording, the
//! marker list and the last built samples. Stages run synchronously on the
//! caller's thread and report through a [`Progress`] handle; a cancelled or
//! failed stage leaves the session as it was.

use std::path::Path;

use log::{debug, info, warn};

use crate::config::SessionConfig;
use crate::container::{self, Manifest, ManifestExtra, Sample};
use crate::dsp::{self, Normalizer, OnsetDetector};
use crate::engine::{self, AudioBuffer};
use crate::error::{Result, SlicerError};
use crate::progress::Progress;
use crate::slicing::{self, MarkerList, Zone, DEFAULT_NOTE};

/// Share of an export's progress spent building samples
const BUILD_SPAN: f32 = 0.7;

/// Stateful slicing pipeline
#[derive(Debug, Clone, Default)]
pub struct PipelineSession {
    config: SessionConfig,
    source: Option<AudioBuffer>,
    markers: MarkerList,
    samples: Vec<Sample>,
}

impl PipelineSession {
    /// Create an empty session
    ///
    /// # Errors
    /// `InvalidInput` if the configuration does not validate.
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replace the configuration; previously built samples are dropped
    pub fn set_config(&mut self, config: SessionConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.samples.clear();
        Ok(())
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Take ownership of a decoded recording
    ///
    /// Markers and samples from a previous recording are discarded.
    ///
    /// # Errors
    /// `InvalidInput` if the buffer has no channels or a zero sample rate.
    pub fn load_buffer(&mut self, buffer: AudioBuffer) -> Result<()> {
        if buffer.channels() == 0 || buffer.sample_rate == 0 {
            return Err(SlicerError::invalid(format!(
                "cannot load a buffer with {} channels at {} Hz",
                buffer.channels(),
                buffer.sample_rate
            )));
        }
        info!(
            "Loaded recording: {} ch, {} Hz, {:.3} s",
            buffer.channels(),
            buffer.sample_rate,
            buffer.duration_secs()
        );
        self.source = Some(buffer);
        self.markers.clear();
        self.samples.clear();
        Ok(())
    }

    /// Decode a WAV file and load it
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let buffer = engine::import_audio(path)?;
        self.load_buffer(buffer)
    }

    /// Decode a WAV file on tokio's blocking pool, then load it
    #[cfg(feature = "async")]
    pub async fn load_file_async(&mut self, path: std::path::PathBuf) -> Result<()> {
        let buffer = tokio::task::spawn_blocking(move || engine::import_audio(&path))
            .await
            .map_err(|e| SlicerError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;
        self.load_buffer(buffer)
    }

    /// The loaded recording
    ///
    /// # Errors
    /// `NoInputLoaded` before anything was loaded.
    pub fn source(&self) -> Result<&AudioBuffer> {
        self.source.as_ref().ok_or(SlicerError::NoInputLoaded)
    }

    /// Duration of the loaded recording in seconds (0 when empty)
    pub fn duration(&self) -> f64 {
        self.source.as_ref().map_or(0.0, AudioBuffer::duration_secs)
    }

    // ========================================================================
    // Markers
    // ========================================================================

    pub fn markers(&self) -> &MarkerList {
        &self.markers
    }

    /// Mutable access for index-based marker edits
    pub fn markers_mut(&mut self) -> &mut MarkerList {
        &mut self.markers
    }

    pub fn set_markers(&mut self, markers: MarkerList) {
        self.markers = markers;
    }

    /// Replace the markers with ones at `times`, labelled per the config
    pub fn place_markers(&mut self, times: &[f64]) -> Result<usize> {
        let duration = self.source()?.duration_secs();
        self.markers = MarkerList::from_times(
            times,
            self.config.note_mode,
            self.config.default_velocity,
            duration,
        );
        Ok(self.markers.len())
    }

    /// Replace the markers with detected onsets
    ///
    /// Returns the number of markers placed.
    ///
    /// # Errors
    /// - `NoInputLoaded` without a recording
    /// - `NoOnsetsDetected` when nothing rose above the threshold; the
    ///   existing markers are kept
    /// - `Cancelled` if the host stops the run
    pub fn detect_onsets(&mut self, progress: &mut Progress<'_>) -> Result<usize> {
        let source = self.source()?;
        let detector = OnsetDetector::new(self.config.onset.clone())?;

        progress.checkpoint(0.0, "Detecting onsets")?;
        let times = detector.detect(source);
        if times.is_empty() {
            warn!("No onsets detected");
            return Err(SlicerError::NoOnsetsDetected);
        }
        progress.checkpoint(1.0, &format!("Detected {} onsets", times.len()))?;

        info!("Detected {} onsets", times.len());
        self.place_markers(&times)
    }

    /// Replace the markers with `count - 1` evenly spaced ones
    ///
    /// # Errors
    /// `InvalidInput` if `count` is 0.
    pub fn divide_equally(&mut self, count: usize) -> Result<usize> {
        if count == 0 {
            return Err(SlicerError::invalid("slice count must be at least 1"));
        }
        let duration = self.source()?.duration_secs();
        self.place_markers(&slicing::equal_division(count, duration))
    }

    /// Zones for the current markers
    pub fn plan(&self) -> Result<Vec<Zone>> {
        Ok(slicing::plan_markers(&self.markers, self.source()?.duration_secs()))
    }

    // ========================================================================
    // Processing
    // ========================================================================

    /// Peak-normalize the loaded recording in place
    ///
    /// Samples built from the previous audio are discarded.
    pub fn normalize_source(&mut self) -> Result<()> {
        let normalized = Normalizer::new(self.config.normalize_target)?.apply(self.source()?)?;
        self.source = Some(normalized);
        self.samples.clear();
        Ok(())
    }

    /// Cut, fade, optionally normalize and encode one sample per zone
    ///
    /// # Errors
    /// - `NoInputLoaded` without a recording
    /// - `Cancelled` if the host stops the run; earlier samples are kept
    pub fn build_samples(&mut self, progress: &mut Progress<'_>) -> Result<&[Sample]> {
        self.build_within(progress, 0.0, 1.0)?;
        Ok(&self.samples)
    }

    /// Samples from the last successful build
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Build samples and pack them into a DWP3 container
    pub fn export_container(&mut self, progress: &mut Progress<'_>) -> Result<Vec<u8>> {
        self.build_within(progress, 0.0, BUILD_SPAN)?;

        progress.set_span(BUILD_SPAN, 1.0);
        progress.checkpoint(0.0, "Writing container")?;
        let bytes = container::serialize(&self.samples, self.manifest_extra())?;
        progress.checkpoint(1.0, "Container ready")?;

        info!(
            "Exported {} samples ({} bytes)",
            self.samples.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Manifest describing the last built samples
    pub fn manifest(&self) -> Manifest {
        Manifest::from_samples(&self.samples, self.manifest_extra())
    }

    fn manifest_extra(&self) -> ManifestExtra {
        ManifestExtra {
            crossfade_ms: Some(self.config.crossfade_ms),
        }
    }

    fn build_within(&mut self, progress: &mut Progress<'_>, start: f32, end: f32) -> Result<()> {
        let source = self.source()?;
        let zones = slicing::plan_markers(&self.markers, source.duration_secs());
        let mid = start + (end - start) / 2.0;

        progress.set_span(start, mid);
        let segments = dsp::synthesize(source, &zones, self.config.crossfade_ms as f64, progress)?;

        let normalizer = if self.config.normalize_samples {
            Some(Normalizer::new(self.config.normalize_target)?)
        } else {
            None
        };

        progress.set_span(mid, end);
        let total = segments.len();
        let mut samples = Vec::with_capacity(total);
        for (i, segment) in segments.into_iter().enumerate() {
            let audio = match normalizer {
                Some(n) => match n.apply(&segment.buffer) {
                    Ok(normalized) => normalized,
                    Err(SlicerError::SilentInput) => {
                        debug!("Slice {} is silent; left unnormalized", i);
                        segment.buffer
                    }
                    Err(e) => return Err(e),
                },
                None => segment.buffer,
            };

            let marker = segment.zone.marker.and_then(|m| self.markers.get(m));
            samples.push(Sample {
                name: self.config.sample_name(i),
                data: engine::encode(&audio)?,
                note: marker.map_or_else(|| DEFAULT_NOTE.to_string(), |m| m.note.clone()),
                velocity: marker.map_or(self.config.default_velocity, |m| m.velocity),
                loop_region: marker.and_then(|m| m.loop_region),
            });
            progress.checkpoint(
                (i + 1) as f32 / total as f32,
                &format!("Encoded {}", self.config.sample_name(i)),
            )?;
        }

        info!("Built {} samples", samples.len());
        self.samples = samples;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
