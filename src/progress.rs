//! Progress reporting and cancellation
//!
//! Long stages call [`Progress::checkpoint`] after each unit of work. The
//! host sees an overall fraction and a message, and can stop the stage
//! either by returning [`Flow::Cancel`] from its callback or by flipping a
//! [`CancelToken`] from another thread.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::trace;

use crate::error::{Result, SlicerError};

/// Callback verdict after a progress report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Continue,
    Cancel,
}

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

type Callback<'a> = Box<dyn FnMut(f32, &str) -> Flow + 'a>;

/// Progress sink threaded through the pipeline stages
///
/// Fractions reported by a stage are local (0.0 to 1.0) and are mapped
/// into the span set by the caller, so a session can give each stage its
/// own slice of the overall bar.
pub struct Progress<'a> {
    callback: Option<Callback<'a>>,
    cancel: Option<CancelToken>,
    span: (f32, f32),
}

impl<'a> Progress<'a> {
    /// A sink that ignores reports and never cancels
    pub fn none() -> Self {
        Self {
            callback: None,
            cancel: None,
            span: (0.0, 1.0),
        }
    }

    /// Report to `callback`
    pub fn new(callback: impl FnMut(f32, &str) -> Flow + 'a) -> Self {
        Self {
            callback: Some(Box::new(callback)),
            ..Self::none()
        }
    }

    /// Also stop when `token` is cancelled
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Map subsequent local fractions into `[start, end]`
    pub fn set_span(&mut self, start: f32, end: f32) {
        let start = start.clamp(0.0, 1.0);
        self.span = (start, end.clamp(start, 1.0));
    }

    /// Report progress and yield to the host
    ///
    /// # Errors
    /// `Cancelled` if the callback asked to stop or the token was set.
    pub fn checkpoint(&mut self, fraction: f32, message: &str) -> Result<()> {
        let (start, end) = self.span;
        let overall = start + (end - start) * fraction.clamp(0.0, 1.0);
        trace!("[{:>3.0}%] {}", overall * 100.0, message);

        if let Some(callback) = self.callback.as_mut() {
            if callback(overall, message) == Flow::Cancel {
                return Err(SlicerError::Cancelled);
            }
        }
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(SlicerError::Cancelled);
        }
        Ok(())
    }
}

impl Default for Progress<'_> {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Progress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("has_callback", &self.callback.is_some())
            .field("cancel", &self.cancel)
            .field("span", &self.span)
            .finish()
    }
}
