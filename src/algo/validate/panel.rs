//! Single-panel checks.

use std::collections::BTreeMap;

use log::trace;
use nalgebra::Point2;

use crate::algo::parameterize::{EdgeKind, FlattenedPanel};
use crate::geometry::{segments_intersect, triangle_signed_area};

use super::issues::{IssueCategory, PatternValidationResult, Severity, ValidationIssue, ValidationWarning};
use super::ValidationOptions;

/// Points closer than this (mm) count as coincident.
const DUPLICATE_TOLERANCE_MM: f64 = 1e-6;

/// Signed triangle area (mm²) below which three points count as collinear.
const COLLINEAR_TOLERANCE: f64 = 1e-6;

/// Run every single-panel check on `panel`.
///
/// Geometry problems that make the other checks meaningless (fewer than
/// three points, zero extent, all points collinear) end validation early.
pub fn validate_panel(panel: &FlattenedPanel, options: &ValidationOptions) -> PatternValidationResult {
    let mut checker = Checker {
        panel,
        options,
        issues: Vec::new(),
        warnings: Vec::new(),
    };

    if checker.check_geometry() {
        checker.check_seam_allowances();
        checker.check_size();
        checker.check_edge_lengths();
        checker.check_distortion();
        checker.check_self_intersection();
    }

    trace!(
        "{}: {} issues, {} warnings",
        panel.panel_id(),
        checker.issues.len(),
        checker.warnings.len()
    );
    PatternValidationResult::new(panel.panel_id(), checker.issues, checker.warnings)
}

struct Checker<'a> {
    panel: &'a FlattenedPanel,
    options: &'a ValidationOptions,
    issues: Vec<ValidationIssue>,
    warnings: Vec<ValidationWarning>,
}

impl Checker<'_> {
    fn issue(&mut self, category: IssueCategory, severity: Severity, message: String, edges: Vec<usize>) {
        self.issues.push(
            ValidationIssue::new(category, severity, message)
                .with_panel(self.panel.panel_id())
                .with_edges(edges),
        );
    }

    fn warn(&mut self, category: IssueCategory, message: String) {
        self.warnings
            .push(ValidationWarning::new(category, self.panel.panel_id(), message));
    }

    /// Returns false when the remaining checks should be skipped.
    fn check_geometry(&mut self) -> bool {
        let panel = self.panel;
        let points = panel.points();
        if points.len() < 3 {
            self.issue(
                IssueCategory::Geometry,
                Severity::Critical,
                format!("panel has {} points, needs at least 3", points.len()),
                Vec::new(),
            );
            return false;
        }

        let duplicates = count_duplicates(points);
        if duplicates > 0 {
            self.issue(
                IssueCategory::Geometry,
                Severity::Error,
                format!("{} coincident duplicate points", duplicates),
                Vec::new(),
            );
        }

        let bounds = panel.bounds();
        if bounds.width() <= DUPLICATE_TOLERANCE_MM || bounds.height() <= DUPLICATE_TOLERANCE_MM {
            self.issue(
                IssueCategory::Geometry,
                Severity::Critical,
                format!(
                    "degenerate bounding box {:.3} x {:.3} mm",
                    bounds.width(),
                    bounds.height()
                ),
                Vec::new(),
            );
            return false;
        }

        if all_collinear(points) {
            self.issue(
                IssueCategory::Geometry,
                Severity::Critical,
                "all points are collinear".to_string(),
                Vec::new(),
            );
            return false;
        }
        true
    }

    fn check_seam_allowances(&mut self) {
        let min = self.options.min_seam_allowance_mm;
        let max = self.options.max_seam_allowance_mm;
        let mut narrow = Vec::new();
        let mut wide = Vec::new();
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;

        for (i, edge) in self.panel.edges().iter().enumerate() {
            if edge.kind != EdgeKind::SeamAllowance {
                continue;
            }
            let width = edge.original_length_mm;
            lo = lo.min(width);
            hi = hi.max(width);
            if width < min {
                narrow.push(i);
            } else if width > max {
                wide.push(i);
            }
        }

        if !narrow.is_empty() {
            self.issue(
                IssueCategory::SeamAllowance,
                Severity::Error,
                format!(
                    "{} seam allowances narrower than {:.1} mm (narrowest {:.1} mm)",
                    narrow.len(),
                    min,
                    lo
                ),
                narrow,
            );
        }
        if !wide.is_empty() {
            self.issue(
                IssueCategory::SeamAllowance,
                Severity::Warning,
                format!(
                    "{} seam allowances wider than {:.1} mm (widest {:.1} mm)",
                    wide.len(),
                    max,
                    hi
                ),
                wide,
            );
        }
        if hi - lo > self.options.standard_seam_allowance_mm / 2.0 {
            self.warn(
                IssueCategory::SeamAllowance,
                format!("seam allowances vary from {:.1} to {:.1} mm", lo, hi),
            );
        }
    }

    fn check_size(&mut self) {
        let area = self.panel.area();
        if area < self.options.min_panel_area_mm2 {
            self.issue(
                IssueCategory::Size,
                Severity::Error,
                format!(
                    "area {:.1} mm² is below the {:.1} mm² minimum",
                    area, self.options.min_panel_area_mm2
                ),
                Vec::new(),
            );
        }

        let (w, h) = (self.panel.width(), self.panel.height());
        let aspect = w.max(h) / w.min(h);
        if aspect > self.options.max_aspect_ratio {
            self.warn(
                IssueCategory::Size,
                format!("aspect ratio {:.1}:1 exceeds {:.1}:1", aspect, self.options.max_aspect_ratio),
            );
        }
    }

    fn check_edge_lengths(&mut self) {
        let panel = self.panel;
        let points = panel.points();
        let min = self.options.min_edge_length_mm;
        let mut short = Vec::new();
        let mut shortest = f64::INFINITY;
        for (i, edge) in panel.edges().iter().enumerate() {
            if !edge.is_cut_line() {
                continue;
            }
            let len = edge.flattened_length(points);
            if len < min {
                short.push(i);
                shortest = shortest.min(len);
            }
        }
        if !short.is_empty() {
            self.issue(
                IssueCategory::Size,
                Severity::Warning,
                format!(
                    "{} cut lines shorter than {:.1} mm (shortest {:.2} mm)",
                    short.len(),
                    min,
                    shortest
                ),
                short,
            );
        }
    }

    fn check_distortion(&mut self) {
        let panel = self.panel;
        let points = panel.points();
        let (low, high) = self.options.distortion_range;
        let mut count = 0;
        let mut worst: Option<f64> = None;
        for edge in panel.cut_lines() {
            if edge.original_length_mm <= 0.0 {
                continue;
            }
            let ratio = edge.flattened_length(points) / edge.original_length_mm;
            if ratio < low || ratio > high {
                count += 1;
                // Distance from 1 on a log scale, so 0.5 and 2.0 rank equally.
                let off = ratio.ln().abs();
                if worst.map_or(true, |w: f64| off > w.ln().abs()) {
                    worst = Some(ratio);
                }
            }
        }
        if let Some(ratio) = worst {
            self.warn(
                IssueCategory::Distortion,
                format!(
                    "{} cut lines outside the {:.2}-{:.2} length ratio (worst {:.3})",
                    count, low, high, ratio
                ),
            );
        }
    }

    fn check_self_intersection(&mut self) {
        let panel = self.panel;
        let points = panel.points();
        let cuts: Vec<(usize, usize, usize)> = panel
            .edges()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_cut_line())
            .map(|(i, e)| (i, e.start, e.end))
            .collect();

        let mut crossing = Vec::new();
        for a in 0..cuts.len() {
            let (ea, a0, a1) = cuts[a];
            for &(eb, b0, b1) in &cuts[a + 1..] {
                if a0 == b0 || a0 == b1 || a1 == b0 || a1 == b1 {
                    continue;
                }
                if segments_intersect(&points[a0], &points[a1], &points[b0], &points[b1]) {
                    crossing.push(ea);
                    crossing.push(eb);
                }
            }
        }

        if !crossing.is_empty() {
            crossing.sort_unstable();
            crossing.dedup();
            self.issue(
                IssueCategory::SelfIntersection,
                Severity::Critical,
                format!("{} cut lines cross another cut line", crossing.len()),
                crossing,
            );
        }
    }
}

/// Number of points coinciding with an earlier point.
fn count_duplicates(points: &[Point2<f64>]) -> usize {
    let mut seen: BTreeMap<(i64, i64), usize> = BTreeMap::new();
    let mut duplicates = 0;
    for p in points {
        let key = (
            (p.x / DUPLICATE_TOLERANCE_MM).round() as i64,
            (p.y / DUPLICATE_TOLERANCE_MM).round() as i64,
        );
        let count = seen.entry(key).or_insert(0);
        if *count > 0 {
            duplicates += 1;
        }
        *count += 1;
    }
    duplicates
}

fn all_collinear(points: &[Point2<f64>]) -> bool {
    let origin = points[0];
    // Farthest point from the first gives the most stable reference line.
    let Some(far) = points
        .iter()
        .max_by(|a, b| (*a - origin).norm_squared().total_cmp(&(*b - origin).norm_squared()))
    else {
        return true;
    };
    points
        .iter()
        .all(|p| triangle_signed_area(&origin, far, p).abs() < COLLINEAR_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::parameterize::PatternEdge;
    use crate::mesh::{PanelColor, PanelId};

    fn create_rectangle(w: f64, h: f64, seam: f64) -> FlattenedPanel {
        FlattenedPanel::from_outline(
            PanelId(0),
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(w, 0.0),
                Point2::new(w, h),
                Point2::new(0.0, h),
            ],
            seam,
        )
    }

    fn with_edges(outline: Vec<Point2<f64>>, edges: Vec<PatternEdge>) -> FlattenedPanel {
        let n = outline.len();
        FlattenedPanel::new(
            PanelId(7),
            outline,
            Vec::new(),
            (0..n).collect(),
            edges,
            Vec::new(),
            PanelColor::default(),
        )
    }

    fn seam_issues(result: &PatternValidationResult) -> Vec<Severity> {
        result
            .issues
            .iter()
            .filter(|i| i.category == IssueCategory::SeamAllowance)
            .map(|i| i.severity)
            .collect()
    }

    #[test]
    fn test_clean_rectangle_is_valid() {
        let result = validate_panel(&create_rectangle(200.0, 100.0, 5.0), &ValidationOptions::default());
        assert!(result.is_valid);
        assert!(result.issues.is_empty(), "{:?}", result.issues);
        assert!(result.warnings.is_empty());
        assert_eq!(result.panel_id, PanelId(0));
    }

    #[test]
    fn test_seam_allowance_bounds() {
        let options = ValidationOptions::default();

        let narrow = validate_panel(&create_rectangle(200.0, 100.0, 2.0), &options);
        assert_eq!(seam_issues(&narrow), vec![Severity::Error]);
        assert!(!narrow.is_valid);

        let fine = validate_panel(&create_rectangle(200.0, 100.0, 10.0), &options);
        assert!(seam_issues(&fine).is_empty());

        let wide = validate_panel(&create_rectangle(200.0, 100.0, 20.0), &options);
        assert_eq!(seam_issues(&wide), vec![Severity::Warning]);
        assert!(wide.is_valid);
    }

    #[test]
    fn test_inconsistent_seams_warn() {
        let outline = vec![
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 0.0),
            Point2::new(100.0, 100.0),
        ];
        let edges = vec![
            PatternEdge::cut_line(0, 1, 100.0),
            PatternEdge::cut_line(1, 2, 100.0),
            PatternEdge::cut_line(2, 0, 141.42),
            PatternEdge::seam_allowance(0, 1, 4.0),
            PatternEdge::seam_allowance(1, 2, 8.0),
            PatternEdge::seam_allowance(2, 0, 5.0),
        ];
        let result = validate_panel(&with_edges(outline, edges), &ValidationOptions::default());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.category == IssueCategory::SeamAllowance));
        assert!(result.is_valid);
    }

    #[test]
    fn test_too_few_points() {
        let outline = vec![Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)];
        let result = validate_panel(&with_edges(outline, Vec::new()), &ValidationOptions::default());
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].severity, Severity::Critical);
    }

    #[test]
    fn test_collinear_points() {
        let outline = vec![
            Point2::new(0.0, 0.0),
            Point2::new(50.0, 50.0),
            Point2::new(100.0, 100.0),
        ];
        let result = validate_panel(&with_edges(outline, Vec::new()), &ValidationOptions::default());
        assert!(!result.is_valid);
        assert!(result.issues[0].message.contains("collinear"));
    }

    #[test]
    fn test_degenerate_bounds() {
        let outline = vec![
            Point2::new(0.0, 0.0),
            Point2::new(50.0, 0.0),
            Point2::new(100.0, 0.0),
        ];
        let result = validate_panel(&with_edges(outline, Vec::new()), &ValidationOptions::default());
        assert!(!result.is_valid);
        assert!(result.issues[0].message.contains("bounding box"));
    }

    #[test]
    fn test_duplicate_points() {
        let outline = vec![
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 0.0),
            Point2::new(100.0, 100.0),
            Point2::new(100.0, 100.0),
            Point2::new(0.0, 100.0),
        ];
        let result = validate_panel(&with_edges(outline, Vec::new()), &ValidationOptions::default());
        assert!(!result.is_valid);
        assert!(result
            .issues
            .iter()
            .any(|i| i.category == IssueCategory::Geometry && i.severity == Severity::Error));
    }

    #[test]
    fn test_small_and_thin_panels() {
        let options = ValidationOptions::default();

        let small = validate_panel(&create_rectangle(8.0, 8.0, 5.0), &options);
        assert!(small
            .issues
            .iter()
            .any(|i| i.category == IssueCategory::Size && i.severity == Severity::Error));
        // Edges shorter than 10 mm are flagged too.
        assert!(small
            .issues
            .iter()
            .any(|i| i.category == IssueCategory::Size && i.severity == Severity::Warning));

        let thin = validate_panel(&create_rectangle(500.0, 20.0, 5.0), &options);
        assert!(thin.is_valid);
        assert!(thin.warnings.iter().any(|w| w.category == IssueCategory::Size));
    }

    #[test]
    fn test_distortion_warning() {
        let outline = vec![
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 0.0),
            Point2::new(100.0, 100.0),
            Point2::new(0.0, 100.0),
        ];
        let edges = vec![
            // Flattened to a third of its 3D length.
            PatternEdge::cut_line(0, 1, 300.0),
            PatternEdge::cut_line(1, 2, 100.0),
            PatternEdge::cut_line(2, 3, 100.0),
            PatternEdge::cut_line(3, 0, 100.0),
        ];
        let result = validate_panel(&with_edges(outline, edges), &ValidationOptions::default());
        assert!(result.is_valid);
        let warning = result
            .warnings
            .iter()
            .find(|w| w.category == IssueCategory::Distortion)
            .unwrap();
        assert!(warning.message.starts_with("1 cut lines"));
    }

    #[test]
    fn test_self_intersection() {
        // Bow tie: edges 0-1 and 2-3 cross.
        let outline = vec![
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 100.0),
            Point2::new(100.0, 0.0),
            Point2::new(0.0, 100.0),
        ];
        let edges = vec![
            PatternEdge::cut_line(0, 1, 141.4),
            PatternEdge::cut_line(1, 2, 100.0),
            PatternEdge::cut_line(2, 3, 141.4),
            PatternEdge::cut_line(3, 0, 100.0),
        ];
        let result = validate_panel(&with_edges(outline, edges), &ValidationOptions::default());
        let issue = result
            .issues
            .iter()
            .find(|i| i.category == IssueCategory::SelfIntersection)
            .unwrap();
        assert_eq!(issue.severity, Severity::Critical);
        assert_eq!(issue.edges, vec![0, 2]);
        assert!(!result.is_valid);
    }
}
