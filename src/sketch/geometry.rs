use serde::{Deserialize, Serialize};

/// Pressure recorded when the input device reports none.
pub const DEFAULT_PRESSURE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// A sampled pointer location in canvas-local logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    pub pressure: f32,
}

impl StrokePoint {
    pub fn new(x: f64, y: f64, pressure: f32) -> Self {
        Self { x, y, pressure }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

pub fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Layout box of an element in client (CSS pixel) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutRect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// Zero (or negative) extent means the element has not been laid out.
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x < self.left + self.width
            && point.y >= self.top
            && point.y < self.top + self.height
    }

    /// Device-pixel dimensions of this box at the given scale.
    pub fn device_size(&self, dpr: f64) -> (u32, u32) {
        (scaled_dimension(self.width, dpr), scaled_dimension(self.height, dpr))
    }
}

pub fn scaled_dimension(logical: f64, dpr: f64) -> u32 {
    let scaled = (logical * dpr).round();
    if scaled.is_finite() && scaled > 0.0 {
        scaled.min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Converts a client-space pointer sample to canvas-local coordinates.
pub fn client_to_canvas(
    client_x: f64,
    client_y: f64,
    pressure: Option<f32>,
    canvas: &LayoutRect,
) -> StrokePoint {
    let pressure = match pressure {
        Some(p) if p > 0.0 && p.is_finite() => p,
        _ => DEFAULT_PRESSURE,
    };
    StrokePoint::new(client_x - canvas.left, client_y - canvas.top, pressure)
}

/// Axis-aligned scale transform from logical to device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub sx: f64,
    pub sy: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self { sx: 1.0, sy: 1.0 };

    pub fn scaled(self, sx: f64, sy: f64) -> Self {
        Self {
            sx: self.sx * sx,
            sy: self.sy * sy,
        }
    }

    pub fn apply(&self, point: Point) -> Point {
        Point::new(point.x * self.sx, point.y * self.sy)
    }

    /// Scale applied to lengths such as line widths.
    pub fn length_scale(&self) -> f64 {
        (self.sx.abs() * self.sy.abs()).sqrt()
    }
}
