//! Static tooth-chart geometry and SVG rendering
//!
//! Every tooth gets an axis-aligned rectangle. Widths follow average
//! mesio-distal crown widths, heights follow the tooth kind. The chart is
//! drawn from the practitioner's point of view: quadrants 1 and 4 sit left of
//! the midline, upper teeth stand on the occlusal line and lower teeth hang
//! below it.

use serde::Serialize;
use std::fmt::Write;

use super::{arch_sequence, Arch, Dentition, ToothKind, ToothNumber};

/// Pixels per millimetre
const SCALE: f64 = 6.0;
const MARGIN: f64 = 24.0;
const TOOTH_GAP: f64 = 2.0;
const MIDLINE_GAP: f64 = 6.0;
const ARCH_GAP: f64 = 28.0;
const BLOCK_GAP: f64 = 48.0;
const MAX_CROWN_HEIGHT: f64 = 11.0;

/// Crown widths in mm by position (1 = central incisor)
const PERMANENT_UPPER_WIDTHS: [f64; 8] = [8.5, 6.5, 7.5, 7.0, 6.5, 10.0, 9.0, 8.5];
const PERMANENT_LOWER_WIDTHS: [f64; 8] = [5.0, 5.5, 7.0, 7.0, 7.0, 11.0, 10.5, 10.0];
const DECIDUOUS_UPPER_WIDTHS: [f64; 5] = [6.5, 5.2, 7.0, 7.3, 8.2];
const DECIDUOUS_LOWER_WIDTHS: [f64; 5] = [4.2, 4.7, 5.0, 7.7, 9.9];

/// Which dentitions a chart shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DentitionMode {
    #[default]
    Permanent,
    Deciduous,
    /// Permanent block with the deciduous block below it
    Mixed,
}

impl DentitionMode {
    /// Smallest mode that can show all of the given teeth
    pub fn covering(teeth: &[ToothNumber]) -> Self {
        let permanent = teeth.iter().any(|t| t.dentition() == Dentition::Permanent);
        let deciduous = teeth.iter().any(|t| t.dentition() == Dentition::Deciduous);
        match (permanent, deciduous) {
            (true, true) => DentitionMode::Mixed,
            (false, true) => DentitionMode::Deciduous,
            _ => DentitionMode::Permanent,
        }
    }

    fn dentitions(&self) -> &'static [Dentition] {
        match self {
            DentitionMode::Permanent => &[Dentition::Permanent],
            DentitionMode::Deciduous => &[Dentition::Deciduous],
            DentitionMode::Mixed => &[Dentition::Permanent, Dentition::Deciduous],
        }
    }
}

/// Rectangle occupied by one tooth, in SVG user units
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToothGeometry {
    pub tooth: ToothNumber,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ToothGeometry {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// A highlighted tooth on a rendered chart
#[derive(Debug, Clone)]
pub struct ChartMark {
    pub tooth: ToothNumber,
    /// CSS colour used to fill the tooth
    pub fill: String,
    /// Short text drawn inside the tooth
    pub label: Option<String>,
}

/// Precomputed geometry for a whole chart
#[derive(Debug, Clone)]
pub struct ChartLayout {
    mode: DentitionMode,
    teeth: Vec<ToothGeometry>,
    width: f64,
    height: f64,
}

fn crown_width(tooth: ToothNumber) -> f64 {
    let i = (tooth.position() - 1) as usize;
    let mm = match (tooth.dentition(), tooth.arch()) {
        (Dentition::Permanent, Arch::Upper) => PERMANENT_UPPER_WIDTHS[i],
        (Dentition::Permanent, Arch::Lower) => PERMANENT_LOWER_WIDTHS[i],
        (Dentition::Deciduous, Arch::Upper) => DECIDUOUS_UPPER_WIDTHS[i],
        (Dentition::Deciduous, Arch::Lower) => DECIDUOUS_LOWER_WIDTHS[i],
    };
    mm * SCALE
}

fn crown_height(tooth: ToothNumber) -> f64 {
    let mm = match tooth.kind() {
        ToothKind::Incisor => 10.5,
        ToothKind::Canine => MAX_CROWN_HEIGHT,
        ToothKind::Premolar => 8.5,
        ToothKind::Molar => 7.5,
    };
    let mm = if tooth.dentition() == Dentition::Deciduous {
        mm * 0.8
    } else {
        mm
    };
    mm * SCALE
}

/// Width from the midline to the distal edge of the last tooth on one side
fn half_row_width(arch: Arch, dentition: Dentition) -> f64 {
    let seq = arch_sequence(arch, dentition);
    let side = &seq[seq.len() / 2..];
    let teeth: f64 = side.iter().map(|t| crown_width(*t)).sum();
    MIDLINE_GAP / 2.0 + teeth + TOOTH_GAP * (side.len() as f64 - 1.0)
}

impl ChartLayout {
    pub fn new(mode: DentitionMode) -> Self {
        let half_width = mode
            .dentitions()
            .iter()
            .flat_map(|d| [Arch::Upper, Arch::Lower].map(|a| half_row_width(a, *d)))
            .fold(0.0_f64, f64::max);
        let width = 2.0 * (half_width + MARGIN);
        let midline = width / 2.0;

        let block_height = 2.0 * MAX_CROWN_HEIGHT * SCALE + ARCH_GAP;
        let mut teeth = Vec::new();
        let mut top = MARGIN;

        for dentition in mode.dentitions() {
            let occlusal_y = top + MAX_CROWN_HEIGHT * SCALE + ARCH_GAP / 2.0;
            for arch in [Arch::Upper, Arch::Lower] {
                place_arch(&mut teeth, arch, *dentition, midline, occlusal_y);
            }
            top += block_height + BLOCK_GAP;
        }
        let height = top - BLOCK_GAP + MARGIN;

        Self {
            mode,
            teeth,
            width,
            height,
        }
    }

    pub fn mode(&self) -> DentitionMode {
        self.mode
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Midline x coordinate
    pub fn midline(&self) -> f64 {
        self.width / 2.0
    }

    pub fn view_box(&self) -> String {
        format!("0 0 {:.1} {:.1}", self.width, self.height)
    }

    pub fn teeth(&self) -> &[ToothGeometry] {
        &self.teeth
    }

    /// Geometry of one tooth, if the chart shows its dentition
    pub fn geometry(&self, tooth: ToothNumber) -> Option<&ToothGeometry> {
        self.teeth.iter().find(|g| g.tooth == tooth)
    }

    /// The tooth under a point, if any
    pub fn hit_test(&self, x: f64, y: f64) -> Option<ToothNumber> {
        self.teeth.iter().find(|g| g.contains(x, y)).map(|g| g.tooth)
    }
}

fn place_arch(
    out: &mut Vec<ToothGeometry>,
    arch: Arch,
    dentition: Dentition,
    midline: f64,
    occlusal_y: f64,
) {
    let seq = arch_sequence(arch, dentition);
    let (left, right) = seq.split_at(seq.len() / 2);

    let y_for = |tooth: ToothNumber| match arch {
        Arch::Upper => occlusal_y - ARCH_GAP / 2.0 - crown_height(tooth),
        Arch::Lower => occlusal_y + ARCH_GAP / 2.0,
    };

    let mut cursor = midline - MIDLINE_GAP / 2.0;
    for tooth in left.iter().rev() {
        let width = crown_width(*tooth);
        let x = cursor - width;
        out.push(ToothGeometry {
            tooth: *tooth,
            x,
            y: y_for(*tooth),
            width,
            height: crown_height(*tooth),
        });
        cursor = x - TOOTH_GAP;
    }

    let mut cursor = midline + MIDLINE_GAP / 2.0;
    for tooth in right {
        let width = crown_width(*tooth);
        out.push(ToothGeometry {
            tooth: *tooth,
            x: cursor,
            y: y_for(*tooth),
            width,
            height: crown_height(*tooth),
        });
        cursor += width + TOOTH_GAP;
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render a standalone SVG document for the chart
pub fn render_svg(layout: &ChartLayout, marks: &[ChartMark]) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{}" width="{:.0}" height="{:.0}" font-family="sans-serif">"#,
        layout.view_box(),
        layout.width(),
        layout.height()
    );
    let _ = writeln!(
        svg,
        r##"  <line x1="{m:.1}" y1="{top:.1}" x2="{m:.1}" y2="{bottom:.1}" stroke="#bbbbbb" stroke-dasharray="4 4"/>"##,
        m = layout.midline(),
        top = MARGIN / 2.0,
        bottom = layout.height() - MARGIN / 2.0
    );

    for geometry in layout.teeth() {
        let mark = marks.iter().find(|m| m.tooth == geometry.tooth);
        let fill = mark.map(|m| m.fill.as_str()).unwrap_or("#ffffff");
        let (cx, cy) = geometry.center();
        let number_y = match geometry.tooth.arch() {
            Arch::Upper => geometry.y - 5.0,
            Arch::Lower => geometry.y + geometry.height + 14.0,
        };

        let _ = writeln!(svg, r#"  <g id="tooth-{}">"#, geometry.tooth);
        let _ = writeln!(
            svg,
            r##"    <rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" rx="4" fill="{}" stroke="#444444"/>"##,
            geometry.x,
            geometry.y,
            geometry.width,
            geometry.height,
            escape_xml(fill)
        );
        let _ = writeln!(
            svg,
            r#"    <text x="{:.1}" y="{:.1}" font-size="11" text-anchor="middle">{}</text>"#,
            cx, number_y, geometry.tooth
        );
        if let Some(label) = mark.and_then(|m| m.label.as_deref()) {
            let _ = writeln!(
                svg,
                r#"    <text x="{:.1}" y="{:.1}" font-size="9" text-anchor="middle" dominant-baseline="middle">{}</text>"#,
                cx,
                cy,
                escape_xml(label)
            );
        }
        svg.push_str("  </g>\n");
    }

    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(code: u8) -> ToothNumber {
        ToothNumber::try_from(code).unwrap()
    }

    #[test]
    fn test_permanent_layout_has_all_teeth() {
        let layout = ChartLayout::new(DentitionMode::Permanent);
        assert_eq!(layout.teeth().len(), 32);
        assert!(layout.geometry(t(55)).is_none());
    }

    #[test]
    fn test_mixed_layout_has_both_dentitions() {
        let layout = ChartLayout::new(DentitionMode::Mixed);
        assert_eq!(layout.teeth().len(), 52);
        let permanent = layout.geometry(t(11)).unwrap();
        let deciduous = layout.geometry(t(51)).unwrap();
        assert!(deciduous.y > permanent.y);
    }

    #[test]
    fn test_central_incisors_mirror_midline() {
        let layout = ChartLayout::new(DentitionMode::Permanent);
        let right = layout.geometry(t(11)).unwrap();
        let left = layout.geometry(t(21)).unwrap();
        let m = layout.midline();
        let gap_right = m - (right.x + right.width);
        let gap_left = left.x - m;
        assert!((gap_right - gap_left).abs() < 1e-9);
        assert!((right.width - left.width).abs() < 1e-9);
    }

    #[test]
    fn test_rows_do_not_overlap_and_are_ordered() {
        let layout = ChartLayout::new(DentitionMode::Permanent);
        for arch in [Arch::Upper, Arch::Lower] {
            let seq = arch_sequence(arch, Dentition::Permanent);
            for pair in seq.windows(2) {
                let a = layout.geometry(pair[0]).unwrap();
                let b = layout.geometry(pair[1]).unwrap();
                assert!(a.x + a.width <= b.x, "{} overlaps {}", pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn test_upper_above_lower() {
        let layout = ChartLayout::new(DentitionMode::Permanent);
        let upper = layout.geometry(t(16)).unwrap();
        let lower = layout.geometry(t(46)).unwrap();
        assert!(upper.y + upper.height < lower.y);
        // upper crowns share the occlusal edge
        let canine = layout.geometry(t(13)).unwrap();
        assert!(((upper.y + upper.height) - (canine.y + canine.height)).abs() < 1e-9);
    }

    #[test]
    fn test_chart_fits_inside_view_box() {
        for mode in [
            DentitionMode::Permanent,
            DentitionMode::Deciduous,
            DentitionMode::Mixed,
        ] {
            let layout = ChartLayout::new(mode);
            for g in layout.teeth() {
                assert!(g.x >= 0.0 && g.x + g.width <= layout.width());
                assert!(g.y >= 0.0 && g.y + g.height <= layout.height());
            }
        }
    }

    #[test]
    fn test_hit_test() {
        let layout = ChartLayout::new(DentitionMode::Permanent);
        let (cx, cy) = layout.geometry(t(46)).unwrap().center();
        assert_eq!(layout.hit_test(cx, cy), Some(t(46)));
        assert_eq!(layout.hit_test(layout.midline(), 1.0), None);
    }

    #[test]
    fn test_covering_mode() {
        assert_eq!(DentitionMode::covering(&[t(11)]), DentitionMode::Permanent);
        assert_eq!(DentitionMode::covering(&[t(51)]), DentitionMode::Deciduous);
        assert_eq!(DentitionMode::covering(&[t(11), t(85)]), DentitionMode::Mixed);
        assert_eq!(DentitionMode::covering(&[]), DentitionMode::Permanent);
    }

    #[test]
    fn test_render_svg_marks() {
        let layout = ChartLayout::new(DentitionMode::Permanent);
        let marks = vec![ChartMark {
            tooth: t(36),
            fill: "#f4a261".to_string(),
            label: Some("C&B".to_string()),
        }];
        let svg = render_svg(&layout, &marks);
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<rect").count(), 32);
        assert!(svg.contains(r#"<g id="tooth-36">"#));
        assert!(svg.contains("#f4a261"));
        assert!(svg.contains("C&amp;B"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
