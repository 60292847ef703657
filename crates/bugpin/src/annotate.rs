//! Vector annotations replayed over a displayed screenshot and
//! re-rendered at native resolution for export.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::host::Host;
use crate::types::{Point, Rect, Size};

/// Base stroke width at display scale.
const BASE_STROKE: f64 = 3.0;
/// Arrowhead size at display scale.
const ARROW_HEAD: f64 = 12.0;
/// Label font size at display scale.
const FONT_SIZE: f64 = 16.0;

pub const DEFAULT_COLOR: &str = "#ef4444";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Arrow,
    Rectangle,
    Freehand,
    Text,
}

/// One annotation. Points are in displayed-image coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub id: Uuid,
    pub kind: AnnotationKind,
    pub points: Vec<Point>,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A primitive drawing instruction produced by replaying the annotation
/// list. The embedder rasterizes these onto its canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Line { from: Point, to: Point, width: f64, color: String },
    ArrowHead { tip: Point, angle: f64, size: f64, color: String },
    RectOutline { rect: Rect, width: f64, color: String },
    Stroke { points: Vec<Point>, width: f64, color: String },
    Label { at: Point, text: String, font_size: f64, color: String },
}

/// The annotation session for one screenshot: an ordered, append-only
/// list replayed onto a canvas sized to the displayed image, and
/// re-rendered at native resolution for export.
pub struct AnnotationCanvas {
    annotations: Vec<Annotation>,
    displayed: Size,
    native: Size,
    color: String,
    freehand_active: bool,
}

impl AnnotationCanvas {
    pub fn new(displayed: Size, native: Size) -> Self {
        Self {
            annotations: Vec::new(),
            displayed,
            native,
            color: DEFAULT_COLOR.to_string(),
            freehand_active: false,
        }
    }

    pub fn set_color(&mut self, color: &str) {
        self.color = color.to_string();
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn add_arrow(&mut self, from: Point, to: Point) {
        self.end_freehand();
        self.push(AnnotationKind::Arrow, vec![from, to], None);
    }

    pub fn add_rectangle(&mut self, a: Point, b: Point) {
        self.end_freehand();
        self.push(AnnotationKind::Rectangle, vec![a, b], None);
    }

    /// Start a freehand stroke at the pointer-down position.
    pub fn begin_freehand(&mut self, at: Point) {
        self.end_freehand();
        self.push(AnnotationKind::Freehand, vec![at], None);
        self.freehand_active = true;
    }

    /// Append to the active stroke while the pointer is down.
    pub fn extend_freehand(&mut self, at: Point) {
        if !self.freehand_active {
            return;
        }
        if let Some(last) = self.annotations.last_mut() {
            last.points.push(at);
        }
    }

    pub fn end_freehand(&mut self) {
        self.freehand_active = false;
    }

    /// Place a text annotation, obtaining the string via the host's
    /// blocking prompt. A dismissed prompt places nothing.
    pub fn add_text(&mut self, host: &dyn Host, at: Point) {
        self.end_freehand();
        if let Some(text) = host.prompt_text("Annotation text") {
            if !text.trim().is_empty() {
                self.push(AnnotationKind::Text, vec![at], Some(text));
            }
        }
    }

    /// Remove the most recent annotation.
    pub fn undo(&mut self) {
        self.end_freehand();
        self.annotations.pop();
    }

    pub fn clear(&mut self) {
        self.end_freehand();
        self.annotations.clear();
    }

    /// Replay at displayed scale.
    pub fn render(&self) -> Vec<DrawOp> {
        self.render_scaled(1.0, 1.0)
    }

    /// Replay at native resolution: every point and stroke width scaled
    /// by the ratio of native to displayed size. This is the flattened
    /// image actually submitted.
    pub fn export(&self) -> (Vec<DrawOp>, Size) {
        let sx = self.native.width / self.displayed.width;
        let sy = self.native.height / self.displayed.height;
        (self.render_scaled(sx, sy), self.native)
    }

    fn render_scaled(&self, sx: f64, sy: f64) -> Vec<DrawOp> {
        let line_scale = (sx + sy) / 2.0;
        let width = BASE_STROKE * line_scale;
        let mut ops = Vec::new();
        for annotation in &self.annotations {
            let p = |point: &Point| Point::new(point.x * sx, point.y * sy);
            match annotation.kind {
                AnnotationKind::Arrow => {
                    let [from, to] = [p(&annotation.points[0]), p(&annotation.points[1])];
                    ops.push(DrawOp::Line {
                        from,
                        to,
                        width,
                        color: annotation.color.clone(),
                    });
                    ops.push(DrawOp::ArrowHead {
                        tip: to,
                        angle: (to.y - from.y).atan2(to.x - from.x),
                        size: ARROW_HEAD * line_scale,
                        color: annotation.color.clone(),
                    });
                }
                AnnotationKind::Rectangle => {
                    let [a, b] = [p(&annotation.points[0]), p(&annotation.points[1])];
                    ops.push(DrawOp::RectOutline {
                        rect: Rect::new(
                            a.x.min(b.x),
                            a.y.min(b.y),
                            (b.x - a.x).abs(),
                            (b.y - a.y).abs(),
                        ),
                        width,
                        color: annotation.color.clone(),
                    });
                }
                AnnotationKind::Freehand => {
                    ops.push(DrawOp::Stroke {
                        points: annotation.points.iter().map(|pt| p(pt)).collect(),
                        width,
                        color: annotation.color.clone(),
                    });
                }
                AnnotationKind::Text => {
                    ops.push(DrawOp::Label {
                        at: p(&annotation.points[0]),
                        text: annotation.text.clone().unwrap_or_default(),
                        font_size: FONT_SIZE * line_scale,
                        color: annotation.color.clone(),
                    });
                }
            }
        }
        ops
    }

    fn push(&mut self, kind: AnnotationKind, points: Vec<Point>, text: Option<String>) {
        self.annotations.push(Annotation {
            id: Uuid::new_v4(),
            kind,
            points,
            color: self.color.clone(),
            text,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::sim::SimHost;

    fn canvas() -> AnnotationCanvas {
        AnnotationCanvas::new(Size::new(100.0, 50.0), Size::new(200.0, 100.0))
    }

    #[test]
    fn arrowhead_angle_follows_segment() {
        let mut c = canvas();
        c.add_arrow(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        c.add_arrow(Point::new(0.0, 0.0), Point::new(0.0, 10.0));
        let ops = c.render();
        let angles: Vec<f64> = ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::ArrowHead { angle, .. } => Some(*angle),
                _ => None,
            })
            .collect();
        assert!((angles[0] - 0.0).abs() < 1e-9);
        assert!((angles[1] - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn rectangle_is_normalized() {
        let mut c = canvas();
        c.add_rectangle(Point::new(30.0, 40.0), Point::new(10.0, 20.0));
        match &c.render()[0] {
            DrawOp::RectOutline { rect, .. } => {
                assert_eq!(*rect, Rect::new(10.0, 20.0, 20.0, 20.0));
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn freehand_appends_while_active() {
        let mut c = canvas();
        c.begin_freehand(Point::new(1.0, 1.0));
        c.extend_freehand(Point::new(2.0, 2.0));
        c.extend_freehand(Point::new(3.0, 3.0));
        c.end_freehand();
        c.extend_freehand(Point::new(9.0, 9.0));
        assert_eq!(c.annotations()[0].points.len(), 3);
    }

    #[test]
    fn text_comes_from_blocking_prompt() {
        let host = SimHost::default();
        let mut c = canvas();
        c.add_text(&host, Point::new(5.0, 5.0));
        assert!(c.annotations().is_empty());

        host.set_prompt_reply(Some("broken here"));
        c.add_text(&host, Point::new(5.0, 5.0));
        assert_eq!(c.annotations().len(), 1);
        assert_eq!(c.annotations()[0].text.as_deref(), Some("broken here"));
    }

    #[test]
    fn undo_removes_last_and_clear_empties() {
        let mut c = canvas();
        c.add_arrow(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        c.add_rectangle(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        c.undo();
        assert_eq!(c.annotations().len(), 1);
        assert_eq!(c.annotations()[0].kind, AnnotationKind::Arrow);
        c.clear();
        assert!(c.annotations().is_empty());
    }

    #[test]
    fn export_preserves_relative_positions() {
        let mut c = canvas();
        // Point at 25% / 20% of the displayed image.
        c.begin_freehand(Point::new(25.0, 10.0));
        c.end_freehand();

        let (ops, size) = c.export();
        assert_eq!(size, Size::new(200.0, 100.0));
        match &ops[0] {
            DrawOp::Stroke { points, width, .. } => {
                assert!((points[0].x / size.width - 0.25).abs() < 1e-9);
                assert!((points[0].y / size.height - 0.2).abs() < 1e-9);
                // Stroke width scales with the resolution ratio (2x).
                assert!((width - BASE_STROKE * 2.0).abs() < 1e-9);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }
}
