//! Progress reporting for pattern generation.
//!
//! A [`Progress`] wraps a callback that receives a [`ProgressUpdate`] on every
//! stage transition and after each flattened panel.
//!
//! # Example
//!
//! ```
//! use flatpattern::algo::progress::{GenerationStage, Progress};
//!
//! let progress = Progress::new(|update| {
//!     println!("[{}/{}] {:?}", update.completed, update.total, update.stage);
//! });
//! progress.report(GenerationStage::Segmenting, 0, 1);
//! ```

use std::fmt;

/// Stage of a generation request.
///
/// Requests move forward only:
/// `Idle → Segmenting → Flattening → Validating → {Ready | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GenerationStage {
    /// Nothing started yet.
    Idle,
    /// Partitioning the mesh into panels.
    Segmenting,
    /// Flattening panels, one task per panel.
    Flattening,
    /// Checking the flattened set.
    Validating,
    /// Finished with a result.
    Ready,
    /// Finished with an error.
    Failed,
}

impl GenerationStage {
    /// Whether no further transition is possible.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }

    /// Whether moving to `next` is a legal forward transition.
    pub fn can_advance_to(&self, next: GenerationStage) -> bool {
        match (self, next) {
            (s, _) if s.is_terminal() => false,
            (_, Self::Failed) => true,
            (Self::Idle, Self::Segmenting)
            | (Self::Segmenting, Self::Flattening)
            | (Self::Flattening, Self::Validating)
            | (Self::Validating, Self::Ready) => true,
            _ => false,
        }
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Segmenting => "segmenting",
            Self::Flattening => "flattening",
            Self::Validating => "validating",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Current stage.
    pub stage: GenerationStage,
    /// Work items finished within the stage.
    pub completed: usize,
    /// Work items in the stage.
    pub total: usize,
}

/// A progress callback, shareable across panel tasks.
pub struct Progress {
    callback: Box<dyn Fn(&ProgressUpdate) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&ProgressUpdate) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, stage: GenerationStage, completed: usize, total: usize) {
        (self.callback)(&ProgressUpdate {
            stage,
            completed,
            total,
        });
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}
