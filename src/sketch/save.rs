use crate::sketch::composite::{draw_image, filled};
use crate::sketch::geometry::LayoutRect;
use crate::sketch::model::Color;
use crate::sketch::surface::resample;
use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use image::{ImageOutputFormat, RgbaImage};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub const DEFAULT_EXPORT_PREFIX: &str = "sketch";
/// What a browser yields for a canvas without pixels.
pub const EMPTY_DATA_URL: &str = "data:,";

/// Geometry and pixels needed to flatten the page for export.
#[derive(Debug, Clone, Copy)]
pub struct ExportRequest<'a> {
    pub page_stack: LayoutRect,
    pub canvas: LayoutRect,
    pub dpr: f64,
    pub bitmap: &'a RgbaImage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedImage {
    pub filename: String,
    pub image: RgbaImage,
    pub png: Vec<u8>,
}

impl ExportedImage {
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    pub fn data_url(&self) -> String {
        if self.is_empty() {
            return EMPTY_DATA_URL.to_string();
        }
        png_data_url(&self.png)
    }
}

pub fn png_data_url(png: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(png)
    )
}

pub fn export_filename(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}.png", prefix, now.timestamp_millis())
}

/// Flattens the canvas onto a white page the size of the page stack.
///
/// The canvas bitmap is scaled to its displayed size so backing-store
/// resolution does not leak into the output.
pub fn flatten_page(request: &ExportRequest<'_>) -> RgbaImage {
    let (width, height) = request.page_stack.device_size(request.dpr);
    let mut page = filled(width, height, Color::WHITE);
    if width == 0 || height == 0 {
        return page;
    }

    let (canvas_w, canvas_h) = request.canvas.device_size(request.dpr);
    let bitmap = request.bitmap;
    if canvas_w == 0 || canvas_h == 0 || bitmap.width() == 0 || bitmap.height() == 0 {
        return page;
    }

    let offset_x = ((request.canvas.left - request.page_stack.left) * request.dpr).round() as i64;
    let offset_y = ((request.canvas.top - request.page_stack.top) * request.dpr).round() as i64;

    if bitmap.dimensions() == (canvas_w, canvas_h) {
        draw_image(&mut page, bitmap, offset_x, offset_y);
    } else {
        let scaled = resample(bitmap, canvas_w, canvas_h);
        draw_image(&mut page, &scaled, offset_x, offset_y);
    }
    page
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    if image.width() == 0 || image.height() == 0 {
        return Ok(Vec::new());
    }
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageOutputFormat::Png)
        .context("encode export as png")?;
    Ok(bytes.into_inner())
}

/// Builds the flattened PNG. A zero-area page yields an empty image rather
/// than an error.
pub fn export_png(
    request: &ExportRequest<'_>,
    prefix: &str,
    now: DateTime<Utc>,
) -> Result<ExportedImage> {
    let image = flatten_page(request);
    if image.width() == 0 || image.height() == 0 {
        tracing::debug!(
            width = request.page_stack.width,
            height = request.page_stack.height,
            "exporting degenerate page geometry"
        );
    }
    let png = encode_png(&image)?;
    Ok(ExportedImage {
        filename: export_filename(prefix, now),
        image,
        png,
    })
}

/// Where finished exports go: a browser download, a folder, a test buffer.
pub trait DownloadSink {
    fn deliver(&mut self, export: &ExportedImage) -> Result<Option<PathBuf>>;
}

#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&mut self, export: &ExportedImage) -> Result<Option<PathBuf>> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create export folder {}", self.dir.display()))?;
        let path = self.dir.join(&export.filename);
        fs::write(&path, &export.png)
            .with_context(|| format!("write export {}", path.display()))?;
        tracing::info!(path = %path.display(), bytes = export.png.len(), "sketch exported");
        Ok(Some(path))
    }
}

/// Keeps exports in memory for hosts that hand bytes to another layer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub downloads: Vec<ExportedImage>,
}

impl DownloadSink for MemorySink {
    fn deliver(&mut self, export: &ExportedImage) -> Result<Option<PathBuf>> {
        self.downloads.push(export.clone());
        Ok(None)
    }
}
