//! End-to-end pattern generation.
//!
//! [`PatternGenerator`] runs one request through
//! `Idle → Segmenting → Flattening → Validating → {Ready | Failed}`:
//!
//! - segmentation or argument failures abort the request
//! - each panel is flattened in its own task; a panel whose topology or
//!   numerics fail is dropped and recorded as a [`PanelFailure`]
//! - survivors are arranged on the fabric and validated as a set
//!
//! # Example
//!
//! ```
//! use flatpattern::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(0.2, 0.0, 0.0),
//!     Point3::new(0.2, 0.2, 0.0),
//!     Point3::new(0.0, 0.2, 0.0),
//! ];
//! let mesh = Mesh::from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
//!
//! let generator = PatternGenerator::new(GeneratorOptions::new(1));
//! let pattern = generator.generate(&mesh, &CancelToken::new()).unwrap();
//! assert_eq!(pattern.panels.len(), 1);
//! assert!(pattern.validation.is_valid);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use log::{info, warn};
use rayon::prelude::*;

use crate::algo::cancel::CancelToken;
use crate::algo::layout::arrange_panels;
use crate::algo::parameterize::{flatten_with_cancel, FlattenOptions, FlattenedPanel};
use crate::algo::progress::{GenerationStage, Progress};
use crate::algo::segment::{segment, SegmentOptions};
use crate::algo::validate::{validate_panel_set, PatternSetValidationResult, ValidationOptions};
use crate::error::{PatternError, Result};
use crate::mesh::{Mesh, Panel, PanelId};

/// Options for a generation request.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneratorOptions {
    /// Upper bound on the number of panels.
    pub target_panel_count: usize,

    /// Segmentation settings.
    pub segment: SegmentOptions,

    /// Flattening settings.
    pub flatten: FlattenOptions,

    /// Validation thresholds.
    pub validation: ValidationOptions,

    /// Spacing between arranged panels (mm).
    pub layout_gap_mm: f64,

    /// Whether panels are flattened concurrently.
    pub parallel: bool,
}

impl GeneratorOptions {
    /// Default options for up to `target_panel_count` panels.
    pub fn new(target_panel_count: usize) -> Self {
        Self {
            target_panel_count,
            segment: SegmentOptions::default(),
            flatten: FlattenOptions::default(),
            validation: ValidationOptions::default(),
            layout_gap_mm: 10.0,
            parallel: true,
        }
    }

    /// Set segmentation options.
    pub fn with_segment(mut self, segment: SegmentOptions) -> Self {
        self.segment = segment;
        self
    }

    /// Set flattening options.
    pub fn with_flatten(mut self, flatten: FlattenOptions) -> Self {
        self.flatten = flatten;
        self
    }

    /// Set validation thresholds.
    pub fn with_validation(mut self, validation: ValidationOptions) -> Self {
        self.validation = validation;
        self
    }

    /// Set the gap between arranged panels.
    pub fn with_layout_gap(mut self, gap_mm: f64) -> Self {
        self.layout_gap_mm = gap_mm;
        self
    }

    /// Flatten panels one after another.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self.flatten = self.flatten.sequential();
        self
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.target_panel_count == 0 {
            return Err(PatternError::invalid_param(
                "target_panel_count",
                self.target_panel_count,
                "must be at least 1",
            ));
        }
        if !(self.layout_gap_mm >= 0.0) || !self.layout_gap_mm.is_finite() {
            return Err(PatternError::invalid_param(
                "layout_gap_mm",
                self.layout_gap_mm,
                "must be finite and non-negative",
            ));
        }
        self.segment.validate()?;
        self.flatten.validate()?;
        self.validation.validate()
    }
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self::new(8)
    }
}

/// A panel that was dropped during flattening.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelFailure {
    /// The dropped panel.
    pub panel_id: PanelId,
    /// Why it was dropped.
    pub error: PatternError,
}

/// Output of a successful request.
#[derive(Debug, Clone)]
pub struct GeneratedPattern {
    /// Segmentation result, one entry per attempted panel.
    pub segments: Vec<Panel>,

    /// Flattened panels that survived, arranged on the fabric.
    pub panels: Vec<FlattenedPanel>,

    /// Panels dropped during flattening.
    pub failures: Vec<PanelFailure>,

    /// Validation of the arranged set. `panel_results` line up with `panels`.
    pub validation: PatternSetValidationResult,
}

impl GeneratedPattern {
    /// Panels without error or critical issues.
    pub fn accepted_panels(&self) -> Vec<&FlattenedPanel> {
        self.panels
            .iter()
            .zip(&self.validation.panel_results)
            .filter(|(_, r)| r.is_valid)
            .map(|(p, _)| p)
            .collect()
    }

    /// Panels carrying an error or critical issue.
    pub fn rejected_panel_ids(&self) -> Vec<PanelId> {
        self.validation
            .panel_results
            .iter()
            .filter(|r| !r.is_valid)
            .map(|r| r.panel_id)
            .collect()
    }
}

/// Runs segmentation, flattening and validation for a mesh.
#[derive(Debug, Default)]
pub struct PatternGenerator {
    options: GeneratorOptions,
    progress: Progress,
}

impl PatternGenerator {
    /// Create a generator.
    pub fn new(options: GeneratorOptions) -> Self {
        Self {
            options,
            progress: Progress::none(),
        }
    }

    /// Report progress to `progress`.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Generation options.
    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Generate a pattern for `mesh`.
    ///
    /// # Errors
    ///
    /// - [`PatternError::InvalidParameter`] or [`PatternError::EmptyMesh`]
    ///   for unusable options or input
    /// - [`PatternError::Cancelled`] if `cancel` fires before the request
    ///   finishes flattening
    /// - [`PatternError::NoPanelsSurvived`] if every panel was dropped
    pub fn generate(&self, mesh: &Mesh, cancel: &CancelToken) -> Result<GeneratedPattern> {
        let mut stages = StageTracker {
            stage: GenerationStage::Idle,
            progress: &self.progress,
        };
        match self.run(mesh, cancel, &mut stages) {
            Ok(pattern) => Ok(pattern),
            Err(err) => {
                warn!("pattern generation failed: {}", err);
                stages.advance(GenerationStage::Failed, 0);
                Err(err)
            }
        }
    }

    fn run(&self, mesh: &Mesh, cancel: &CancelToken, stages: &mut StageTracker<'_>) -> Result<GeneratedPattern> {
        self.options.validate()?;
        cancel.check()?;

        stages.advance(GenerationStage::Segmenting, 1);
        let segments = segment(mesh, self.options.target_panel_count, &self.options.segment)?;
        cancel.check()?;

        stages.advance(GenerationStage::Flattening, segments.len());
        let outcomes = self.flatten_all(&segments, mesh, cancel);
        cancel.check()?;

        let mut flattened = Vec::with_capacity(segments.len());
        let mut failures = Vec::new();
        for (panel, outcome) in segments.iter().zip(outcomes) {
            match outcome {
                Ok(flat) => flattened.push(flat),
                Err(error) if error.is_panel_local() => {
                    warn!("dropping {}: {}", panel.id(), error);
                    failures.push(PanelFailure {
                        panel_id: panel.id(),
                        error,
                    });
                }
                Err(error) => return Err(error),
            }
        }
        if flattened.is_empty() {
            return Err(PatternError::NoPanelsSurvived {
                attempted: segments.len(),
            });
        }

        stages.advance(GenerationStage::Validating, 1);
        let width = self.layout_width(&flattened);
        let panels = arrange_panels(&flattened, width, self.options.layout_gap_mm)?;
        let validation = validate_panel_set(&panels, &self.options.validation)?;

        info!(
            "generated {} panels ({} dropped): {}",
            panels.len(),
            failures.len(),
            validation.summary()
        );
        stages.advance(GenerationStage::Ready, 0);

        Ok(GeneratedPattern {
            segments,
            panels,
            failures,
            validation,
        })
    }

    /// One flattening task per panel. Tasks that start after cancellation
    /// return [`PatternError::Cancelled`] without doing any work.
    fn flatten_all(&self, segments: &[Panel], mesh: &Mesh, cancel: &CancelToken) -> Vec<Result<FlattenedPanel>> {
        let done = AtomicUsize::new(0);
        let total = segments.len();
        let task = |panel: &Panel| -> Result<FlattenedPanel> {
            cancel.check()?;
            let result = flatten_with_cancel(panel, mesh, &self.options.flatten, Some(cancel));
            let completed = done.fetch_add(1, Ordering::Relaxed) + 1;
            self.progress.report(GenerationStage::Flattening, completed, total);
            result
        };

        if self.options.parallel {
            segments.par_iter().map(task).collect()
        } else {
            segments.iter().map(task).collect()
        }
    }

    /// Arrangement width: the widest configured fabric, widened to fit the
    /// widest panel.
    fn layout_width(&self, panels: &[FlattenedPanel]) -> f64 {
        let fabric = self
            .options
            .validation
            .fabric_widths_mm
            .iter()
            .copied()
            .fold(0.0, f64::max);
        let widest = panels.iter().map(FlattenedPanel::width).fold(0.0, f64::max);
        fabric.max(widest).max(1.0)
    }
}

/// Forward-only stage bookkeeping for one request.
struct StageTracker<'a> {
    stage: GenerationStage,
    progress: &'a Progress,
}

impl StageTracker<'_> {
    fn advance(&mut self, next: GenerationStage, total: usize) {
        if !self.stage.can_advance_to(next) {
            return;
        }
        info!("stage {} -> {}", self.stage, next);
        self.stage = next;
        self.progress.report(next, 0, total);
    }
}
