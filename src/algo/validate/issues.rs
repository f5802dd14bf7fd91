//! Validation findings and result types.

use chrono::{DateTime, Utc};

use crate::mesh::PanelId;

/// Severity of a validation issue.
///
/// Ordered from least to most severe. [`Severity::Error`] and
/// [`Severity::Critical`] block acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// Worth a look, does not block.
    Warning,
    /// The panel cannot be cut as is.
    Error,
    /// The geometry itself is broken.
    Critical,
}

impl Severity {
    /// Get a human-readable name for the severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Critical => "Critical",
        }
    }

    /// Whether this severity blocks acceptance.
    #[inline]
    pub fn is_blocking(&self) -> bool {
        *self >= Severity::Error
    }
}

/// What a finding is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IssueCategory {
    /// Point count, duplicates, degenerate extent.
    Geometry,
    /// Seam allowance width.
    SeamAllowance,
    /// Area, aspect ratio, edge length.
    Size,
    /// Cut-line length change from 3D to 2D.
    Distortion,
    /// Cut lines crossing each other.
    SelfIntersection,
    /// Two panels sharing fabric.
    Overlap,
    /// Fabric width fit.
    FabricWidth,
    /// Long-axis direction across panels.
    Orientation,
}

impl IssueCategory {
    /// Get a human-readable name for the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Geometry => "Geometry",
            Self::SeamAllowance => "Seam Allowance",
            Self::Size => "Size",
            Self::Distortion => "Distortion",
            Self::SelfIntersection => "Self-Intersection",
            Self::Overlap => "Overlap",
            Self::FabricWidth => "Fabric Width",
            Self::Orientation => "Orientation",
        }
    }
}

/// A validation finding with a severity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationIssue {
    /// What the issue is about.
    pub category: IssueCategory,

    /// How serious it is.
    pub severity: Severity,

    /// Human-readable description.
    pub message: String,

    /// Panels involved (one for panel issues, two for overlaps).
    pub panels: Vec<PanelId>,

    /// Edge indices involved, into the panel's edge list.
    pub edges: Vec<usize>,
}

impl ValidationIssue {
    /// Create a new issue.
    pub fn new(category: IssueCategory, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            category,
            severity,
            message: message.into(),
            panels: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Attach a panel.
    pub fn with_panel(mut self, id: PanelId) -> Self {
        self.panels.push(id);
        self
    }

    /// Attach edge indices.
    pub fn with_edges(mut self, edges: Vec<usize>) -> Self {
        self.edges = edges;
        self
    }

    /// Whether this issue blocks acceptance.
    #[inline]
    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }

    /// Check if this is a critical issue.
    #[inline]
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// An advisory finding. Never blocks acceptance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationWarning {
    /// What the warning is about.
    pub category: IssueCategory,

    /// Human-readable description.
    pub message: String,

    /// Panel concerned.
    pub panel: Option<PanelId>,
}

impl ValidationWarning {
    /// Create a new warning about a panel.
    pub fn new(category: IssueCategory, panel: PanelId, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            panel: Some(panel),
        }
    }
}

/// Result of validating one panel.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternValidationResult {
    /// No error or critical issue was found.
    pub is_valid: bool,

    /// Findings with a severity.
    pub issues: Vec<ValidationIssue>,

    /// Advisory findings.
    pub warnings: Vec<ValidationWarning>,

    /// Panel validated.
    pub panel_id: PanelId,

    /// When validation ran.
    pub timestamp: DateTime<Utc>,
}

impl PatternValidationResult {
    /// Build a result, deriving `is_valid` from the issues.
    pub fn new(panel_id: PanelId, issues: Vec<ValidationIssue>, warnings: Vec<ValidationWarning>) -> Self {
        Self {
            is_valid: !issues.iter().any(ValidationIssue::is_blocking),
            issues,
            warnings,
            panel_id,
            timestamp: Utc::now(),
        }
    }

    /// Number of issues with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Most severe issue level, if any.
    pub fn worst_severity(&self) -> Option<Severity> {
        self.issues.iter().map(|i| i.severity).max()
    }
}

/// How a pattern set fits the available fabric widths.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FabricCompatibility {
    /// Widest panel bounding box (mm).
    pub max_panel_width_mm: f64,

    /// Configured widths every panel fits on, narrowest first.
    pub compatible_widths_mm: Vec<f64>,

    /// Narrowest compatible width, or the widest panel's width.
    pub recommended_width_mm: f64,

    /// No configured width fits every panel.
    pub requires_custom_width: bool,
}

/// Result of validating a set of panels.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternSetValidationResult {
    /// No error or critical issue anywhere in the set.
    pub is_valid: bool,

    /// Per-panel results, in input order.
    pub panel_results: Vec<PatternValidationResult>,

    /// Set-level findings (overlaps, fabric width, orientation).
    pub layout_issues: Vec<ValidationIssue>,

    /// Fabric fit, absent for an empty set.
    pub fabric_compatibility: Option<FabricCompatibility>,

    /// Sum of panel areas (mm²).
    pub total_area_mm2: f64,

    /// Suggested fabric width (mm).
    pub recommended_fabric_width_mm: Option<f64>,

    /// When validation ran.
    pub timestamp: DateTime<Utc>,
}

impl PatternSetValidationResult {
    /// All issues, panel-level first.
    pub fn all_issues(&self) -> impl Iterator<Item = &ValidationIssue> + '_ {
        self.panel_results
            .iter()
            .flat_map(|r| r.issues.iter())
            .chain(self.layout_issues.iter())
    }

    /// Number of critical issues in the set.
    pub fn critical_count(&self) -> usize {
        self.all_issues().filter(|i| i.is_critical()).count()
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let mut s = format!(
            "{} panels, {:.0} mm², {}",
            self.panel_results.len(),
            self.total_area_mm2,
            if self.is_valid { "valid" } else { "invalid" }
        );
        for severity in [Severity::Critical, Severity::Error, Severity::Warning] {
            let n = self.all_issues().filter(|i| i.severity == severity).count();
            if n > 0 {
                s.push_str(&format!(", {} {}", n, severity.as_str().to_lowercase()));
            }
        }
        if let Some(width) = self.recommended_fabric_width_mm {
            s.push_str(&format!(", fabric {:.1} mm", width));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
        assert!(!Severity::Warning.is_blocking());
        assert!(Severity::Error.is_blocking());
        assert!(Severity::Critical.is_blocking());
    }

    #[test]
    fn test_result_validity() {
        let warning = ValidationIssue::new(IssueCategory::Size, Severity::Warning, "short edge");
        let ok = PatternValidationResult::new(PanelId(0), vec![warning.clone()], Vec::new());
        assert!(ok.is_valid);
        assert_eq!(ok.worst_severity(), Some(Severity::Warning));

        let error = ValidationIssue::new(IssueCategory::SeamAllowance, Severity::Error, "narrow seam")
            .with_panel(PanelId(0))
            .with_edges(vec![4]);
        let bad = PatternValidationResult::new(PanelId(0), vec![warning, error], Vec::new());
        assert!(!bad.is_valid);
        assert_eq!(bad.count(Severity::Error), 1);
        assert_eq!(bad.issues[1].edges, vec![4]);
    }

    #[test]
    fn test_category_as_str() {
        assert_eq!(IssueCategory::SelfIntersection.as_str(), "Self-Intersection");
        assert_eq!(Severity::Critical.as_str(), "Critical");
    }
}
