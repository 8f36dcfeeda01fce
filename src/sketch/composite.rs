use crate::sketch::model::{Color, CompositeMode};
use image::{Rgba, RgbaImage};

impl From<Rgba<u8>> for Color {
    fn from(px: Rgba<u8>) -> Self {
        Color::rgba(px[0], px[1], px[2], px[3])
    }
}

impl From<Color> for Rgba<u8> {
    fn from(color: Color) -> Self {
        Rgba(color.to_array())
    }
}

pub fn filled(width: u32, height: u32, fill: Color) -> RgbaImage {
    RgbaImage::from_pixel(width, height, fill.into())
}

/// Straight-alpha source-over.
pub fn blend_pixel(bottom: Color, top: Color) -> Color {
    let sa = top.a as f32 / 255.0;
    let da = bottom.a as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    if out_a <= f32::EPSILON {
        return Color::TRANSPARENT;
    }

    let blend = |s: u8, d: u8| -> u8 {
        (((s as f32 * sa) + (d as f32 * da * (1.0 - sa))) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };

    Color {
        r: blend(top.r, bottom.r),
        g: blend(top.g, bottom.g),
        b: blend(top.b, bottom.b),
        a: (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    }
}

/// Destination-out: keeps destination color, scales its alpha by the
/// inverse of the source alpha.
pub fn erase_pixel(bottom: Color, top: Color) -> Color {
    let sa = top.a as f32 / 255.0;
    let remaining = (bottom.a as f32 * (1.0 - sa)).round().clamp(0.0, 255.0) as u8;
    if remaining == 0 {
        return Color::TRANSPARENT;
    }
    Color {
        a: remaining,
        ..bottom
    }
}

/// Applies `color` to one pixel with partial `coverage` in `[0, 1]`.
pub fn composite_coverage(px: &mut Rgba<u8>, color: Color, coverage: f32, mode: CompositeMode) {
    if coverage <= 0.0 {
        return;
    }
    let alpha = (color.a as f32 * coverage.min(1.0)).round().clamp(0.0, 255.0) as u8;
    let top = Color { a: alpha, ..color };
    let bottom = Color::from(*px);
    let out = match mode {
        CompositeMode::SourceOver => blend_pixel(bottom, top),
        CompositeMode::DestinationOut => erase_pixel(bottom, top),
    };
    *px = out.into();
}

/// Source-over draws `src` onto `dst` with its top-left at `(x, y)`,
/// clipping anything outside `dst`.
pub fn draw_image(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    let (dst_w, dst_h) = (dst.width() as i64, dst.height() as i64);
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + src.width() as i64).min(dst_w);
    let y1 = (y + src.height() as i64).min(dst_h);
    if x1 <= x0 || y1 <= y0 {
        return;
    }

    for dy in y0..y1 {
        for dx in x0..x1 {
            let top = Color::from(*src.get_pixel((dx - x) as u32, (dy - y) as u32));
            if top.a == 0 {
                continue;
            }
            let px = dst.get_pixel_mut(dx as u32, dy as u32);
            *px = blend_pixel(Color::from(*px), top).into();
        }
    }
}
