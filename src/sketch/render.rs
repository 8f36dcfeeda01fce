use crate::sketch::composite::composite_coverage;
use crate::sketch::geometry::{midpoint, Point, StrokePoint, Transform};
use crate::sketch::model::{Color, CompositeMode, ToolConfig};
use crate::sketch::surface::Surface;
use image::RgbaImage;

/// Maximum distance, in device pixels, between a flattened curve and the
/// true quadratic.
const FLATTEN_TOLERANCE: f64 = 0.25;
const MAX_CURVE_SUBDIVISIONS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl DirtyRect {
    /// Smallest pixel rectangle covering `points` grown by `pad`.
    pub fn around(points: &[Point], pad: f64) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points.iter().skip(1) {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let x0 = (min_x - pad).floor();
        let y0 = (min_y - pad).floor();
        let x1 = (max_x + pad).ceil();
        let y1 = (max_y + pad).ceil();
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            return None;
        }
        let clamp_i32 = |v: f64| v.clamp(i32::MIN as f64 / 2.0, i32::MAX as f64 / 2.0) as i32;
        Some(Self {
            x: clamp_i32(x0),
            y: clamp_i32(y0),
            width: (clamp_i32(x1) - clamp_i32(x0)).max(1),
            height: (clamp_i32(y1) - clamp_i32(y0)).max(1),
        })
    }

    pub fn clamp(self, width: u32, height: u32) -> Option<DirtyRect> {
        let max_w = width.min(i32::MAX as u32) as i32;
        let max_h = height.min(i32::MAX as u32) as i32;
        let x0 = self.x.clamp(0, max_w);
        let y0 = self.y.clamp(0, max_h);
        let x1 = (self.x + self.width).clamp(0, max_w);
        let y1 = (self.y + self.height).clamp(0, max_h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(DirtyRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(Point),
    QuadTo { ctrl: Point, to: Point },
}

/// Logical-space path produced by midpoint smoothing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StrokePath {
    segments: Vec<PathSegment>,
}

impl StrokePath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Points every segment ends at, in drawing order.
    pub fn on_curve_points(&self) -> impl Iterator<Item = Point> + '_ {
        self.segments.iter().map(|segment| match segment {
            PathSegment::MoveTo(p) => *p,
            PathSegment::QuadTo { to, .. } => *to,
        })
    }

    /// Device-space polyline approximating the path.
    pub fn flatten(&self, transform: Transform) -> Vec<Point> {
        let mut out = Vec::with_capacity(self.segments.len() * 4);
        let mut current = None;
        for segment in &self.segments {
            match *segment {
                PathSegment::MoveTo(p) => {
                    let p = transform.apply(p);
                    out.push(p);
                    current = Some(p);
                }
                PathSegment::QuadTo { ctrl, to } => {
                    let Some(from) = current else {
                        continue;
                    };
                    let ctrl = transform.apply(ctrl);
                    let to = transform.apply(to);
                    flatten_quad(from, ctrl, to, &mut out);
                    current = Some(to);
                }
            }
        }
        out
    }
}

/// Builds the smoothed path: for each consecutive pair the earlier point is
/// the control and their midpoint the end of a quadratic curve.
pub fn build_stroke_path(points: &[StrokePoint]) -> StrokePath {
    let Some(first) = points.first() else {
        return StrokePath::default();
    };
    let mut segments = Vec::with_capacity(points.len());
    segments.push(PathSegment::MoveTo(first.position()));
    for pair in points.windows(2) {
        let ctrl = pair[0].position();
        segments.push(PathSegment::QuadTo {
            ctrl,
            to: midpoint(ctrl, pair[1].position()),
        });
    }
    StrokePath { segments }
}

fn flatten_quad(from: Point, ctrl: Point, to: Point, out: &mut Vec<Point>) {
    let dev_x = from.x - 2.0 * ctrl.x + to.x;
    let dev_y = from.y - 2.0 * ctrl.y + to.y;
    let deviation = (dev_x * dev_x + dev_y * dev_y).sqrt() / 4.0;
    let steps = ((deviation / FLATTEN_TOLERANCE).sqrt().ceil() as usize).clamp(1, MAX_CURVE_SUBDIVISIONS);

    for step in 1..steps {
        let t = step as f64 / steps as f64;
        let mt = 1.0 - t;
        out.push(Point::new(
            mt * mt * from.x + 2.0 * mt * t * ctrl.x + t * t * to.x,
            mt * mt * from.y + 2.0 * mt * t * ctrl.y + t * t * to.y,
        ));
    }
    out.push(to);
}

/// Rasterizes the active stroke onto a [`Surface`].
#[derive(Debug, Default)]
pub struct StrokeRenderer {
    renders: u64,
}

impl StrokeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames that drew something.
    pub fn renders(&self) -> u64 {
        self.renders
    }

    /// Draws the whole point list with the current tool settings.
    ///
    /// One point draws a dot; more draw the smoothed path stroked once.
    pub fn render(
        &mut self,
        surface: &mut Surface,
        config: &ToolConfig,
        points: &[StrokePoint],
    ) -> Option<DirtyRect> {
        if points.is_empty() {
            return None;
        }
        self.renders = self.renders.saturating_add(1);

        {
            let state = surface.state_mut();
            state.line_width = config.effective_width() as f64;
            state.composite = config.tool.composite_mode();
            state.stroke_color = config.stroke_color;
            state.fill_color = config.fill_color();
        }

        let (bitmap, transform, state) = surface.canvas_mut();
        let half_width = state.line_width * transform.length_scale() / 2.0;

        if let [only] = points {
            let center = transform.apply(only.position());
            return rasterize_round_polyline(
                bitmap,
                &[center],
                half_width,
                state.fill_color,
                state.composite,
            );
        }

        let polyline = build_stroke_path(points).flatten(transform);
        rasterize_round_polyline(
            bitmap,
            &polyline,
            half_width,
            state.stroke_color,
            state.composite,
        )
    }
}

/// Anti-aliased round-capped, round-joined stroke of a device-space polyline.
///
/// Coverage is max-accumulated over all segments before compositing so
/// overlapping joins are painted once.
pub fn rasterize_round_polyline(
    bitmap: &mut RgbaImage,
    points: &[Point],
    half_width: f64,
    color: Color,
    mode: CompositeMode,
) -> Option<DirtyRect> {
    if half_width <= 0.0 || !half_width.is_finite() {
        return None;
    }
    let (width, height) = bitmap.dimensions();
    let bounds = DirtyRect::around(points, half_width + 1.0)?.clamp(width, height)?;
    let stride = bounds.width as usize;
    let mut mask = vec![0f32; stride * bounds.height as usize];

    let single = [points[0], points[0]];
    let segments: Vec<&[Point]> = if points.len() == 1 {
        vec![&single[..]]
    } else {
        points.windows(2).collect()
    };

    for segment in segments {
        let (a, b) = (segment[0], segment[1]);
        let Some(seg_bounds) = DirtyRect::around(segment, half_width + 1.0)
            .and_then(|r| r.clamp(width, height))
            .and_then(|r| intersect(r, bounds))
        else {
            continue;
        };
        for y in seg_bounds.y..(seg_bounds.y + seg_bounds.height) {
            let row = (y - bounds.y) as usize * stride;
            for x in seg_bounds.x..(seg_bounds.x + seg_bounds.width) {
                let sample = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                let distance = point_segment_distance_sq(sample, a, b).sqrt();
                let coverage = (half_width + 0.5 - distance).clamp(0.0, 1.0) as f32;
                let cell = &mut mask[row + (x - bounds.x) as usize];
                if coverage > *cell {
                    *cell = coverage;
                }
            }
        }
    }

    for y in 0..bounds.height {
        for x in 0..bounds.width {
            let coverage = mask[y as usize * stride + x as usize];
            if coverage <= 0.0 {
                continue;
            }
            let px = bitmap.get_pixel_mut((bounds.x + x) as u32, (bounds.y + y) as u32);
            composite_coverage(px, color, coverage, mode);
        }
    }
    Some(bounds)
}

fn intersect(a: DirtyRect, b: DirtyRect) -> Option<DirtyRect> {
    let x0 = a.x.max(b.x);
    let y0 = a.y.max(b.y);
    let x1 = (a.x + a.width).min(b.x + b.width);
    let y1 = (a.y + a.height).min(b.y + b.height);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(DirtyRect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}

fn point_segment_distance_sq(point: Point, start: Point, end: Point) -> f64 {
    let vx = end.x - start.x;
    let vy = end.y - start.y;
    let len_sq = vx * vx + vy * vy;
    if len_sq <= f64::EPSILON {
        return point.distance_sq(start);
    }
    let t = (((point.x - start.x) * vx + (point.y - start.y) * vy) / len_sq).clamp(0.0, 1.0);
    point.distance_sq(Point::new(start.x + vx * t, start.y + vy * t))
}
