use crate::sketch::geometry::{LayoutRect, Transform};
use crate::sketch::model::{Color, CompositeMode};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// Mutable drawing state attached to the surface, mirroring a 2D context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawingState {
    pub composite: CompositeMode,
    pub line_width: f64,
    pub stroke_color: Color,
    pub fill_color: Color,
    pub shadow_blur: f64,
}

impl Default for DrawingState {
    fn default() -> Self {
        Self {
            composite: CompositeMode::SourceOver,
            line_width: 1.0,
            stroke_color: Color::BLACK,
            fill_color: Color::BLACK,
            shadow_blur: 0.0,
        }
    }
}

/// Owns the backing store and keeps it in step with layout and display scale.
#[derive(Debug, Clone)]
pub struct Surface {
    bitmap: RgbaImage,
    dpr: f64,
    layout: LayoutRect,
    transform: Transform,
    state: DrawingState,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Surface {
    pub fn new(dpr: f64) -> Self {
        let dpr = sanitize_dpr(dpr);
        Self {
            bitmap: RgbaImage::new(0, 0),
            dpr,
            layout: LayoutRect::default(),
            transform: Transform::IDENTITY.scaled(dpr, dpr),
            state: DrawingState::default(),
        }
    }

    pub fn dpr(&self) -> f64 {
        self.dpr
    }

    /// Records a new device pixel ratio. Takes effect on the next resize.
    pub fn set_dpr(&mut self, dpr: f64) {
        self.dpr = sanitize_dpr(dpr);
    }

    pub fn layout(&self) -> &LayoutRect {
        &self.layout
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn state(&self) -> &DrawingState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DrawingState {
        &mut self.state
    }

    pub fn backing_size(&self) -> (u32, u32) {
        self.bitmap.dimensions()
    }

    pub fn bitmap(&self) -> &RgbaImage {
        &self.bitmap
    }

    pub fn bitmap_mut(&mut self) -> &mut RgbaImage {
        &mut self.bitmap
    }

    /// Also hands back the transform so callers can draw without a second borrow.
    pub fn canvas_mut(&mut self) -> (&mut RgbaImage, Transform, &DrawingState) {
        (&mut self.bitmap, self.transform, &self.state)
    }

    pub fn is_blank(&self) -> bool {
        self.bitmap.pixels().all(|px| px[3] == 0)
    }

    /// Resizes the backing store to match `layout` at the current scale.
    ///
    /// Existing pixels are resampled to the new store, so content survives
    /// window resizes at reduced fidelity. A box without area is ignored; the
    /// element has not been laid out yet. Returns whether anything changed.
    pub fn resize(&mut self, layout: LayoutRect) -> bool {
        if !layout.has_area() {
            tracing::debug!(
                width = layout.width,
                height = layout.height,
                "skipping surface resize until layout is ready"
            );
            return false;
        }
        self.layout = layout;

        let snapshot = std::mem::replace(&mut self.bitmap, RgbaImage::new(0, 0));
        let (width, height) = layout.device_size(self.dpr);

        // Resizing a backing store resets its drawing state.
        self.state = DrawingState::default();
        self.transform = Transform::IDENTITY.scaled(self.dpr, self.dpr);

        self.bitmap = if snapshot.width() == 0 || snapshot.height() == 0 {
            RgbaImage::new(width, height)
        } else if snapshot.dimensions() == (width, height) {
            snapshot
        } else {
            resample(&snapshot, width, height)
        };

        tracing::debug!(width, height, dpr = self.dpr, "surface resized");
        true
    }

    /// Clears every backing-store pixel to transparent.
    pub fn clear(&mut self) {
        self.transform = Transform::IDENTITY;
        for px in self.bitmap.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
        self.transform = self.transform.scaled(self.dpr, self.dpr);
    }

    /// Returns drawing state to plain painting after a stroke.
    pub fn reset_stroke_state(&mut self) {
        self.state.shadow_blur = 0.0;
        self.state.composite = CompositeMode::SourceOver;
    }
}

fn sanitize_dpr(dpr: f64) -> f64 {
    if dpr.is_finite() && dpr > 0.0 {
        dpr
    } else {
        1.0
    }
}

/// Bilinear resample in premultiplied space so transparent neighbours do not
/// darken stroke edges.
pub fn resample(src: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if width == 0 || height == 0 {
        return RgbaImage::new(width, height);
    }
    let mut premultiplied = src.clone();
    for px in premultiplied.pixels_mut() {
        let a = px[3] as u32;
        for c in 0..3 {
            px[c] = ((px[c] as u32 * a + 127) / 255) as u8;
        }
    }

    let mut out = imageops::resize(&premultiplied, width, height, FilterType::Triangle);
    for px in out.pixels_mut() {
        let a = px[3] as u32;
        if a == 0 {
            *px = Rgba([0, 0, 0, 0]);
            continue;
        }
        for c in 0..3 {
            px[c] = ((px[c] as u32 * 255 + a / 2) / a).min(255) as u8;
        }
    }
    out
}
