use crate::sketch::model::Tool;
use crate::sketch::save::{encode_png, png_data_url};
use anyhow::{anyhow, bail, Context, Result};
use image::imageops::{self, FilterType};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Hotspots closer than this to the right edge are pulled in.
const HOTSPOT_RIGHT_INSET: f64 = 7.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorMeta {
    pub src: String,
    /// Longest side of the rendered glyph, in pixels.
    pub size: u32,
    pub hotspot_x: f64,
    pub hotspot_y: f64,
}

pub fn default_cursor_meta() -> HashMap<Tool, CursorMeta> {
    HashMap::from([
        (
            Tool::Pencil,
            CursorMeta {
                src: "assets/pencil.png".into(),
                size: 64,
                hotspot_x: 12.0,
                hotspot_y: 52.0,
            },
        ),
        (
            Tool::Eraser,
            CursorMeta {
                src: "assets/leaf.png".into(),
                size: 54,
                hotspot_x: 18.0,
                hotspot_y: 18.0,
            },
        ),
    ])
}

#[derive(Debug, Clone, PartialEq)]
pub struct CursorGlyph {
    pub tool: Tool,
    pub width: u32,
    pub height: u32,
    pub hotspot_x: f64,
    pub hotspot_y: f64,
    pub data_url: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cursor {
    #[default]
    Crosshair,
    Glyph(Arc<CursorGlyph>),
}

impl Cursor {
    /// CSS `cursor` property value.
    pub fn css_value(&self) -> String {
        match self {
            Cursor::Crosshair => "crosshair".to_string(),
            Cursor::Glyph(glyph) => format!(
                "url({}) {} {}, crosshair",
                glyph.data_url, glyph.hotspot_x, glyph.hotspot_y
            ),
        }
    }
}

/// Fetches cursor artwork by its configured source string.
pub trait AssetSource: Send + Sync {
    fn load(&self, src: &str) -> Result<DynamicImage>;
}

/// Resolves asset paths relative to a root directory.
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for FsAssetSource {
    fn load(&self, src: &str) -> Result<DynamicImage> {
        let path = self.root.join(src);
        image::open(&path).with_context(|| format!("load cursor image {}", path.display()))
    }
}

/// Scales `image` so its longest side is `meta.size` and encodes it.
pub fn build_glyph(tool: Tool, image: &DynamicImage, meta: &CursorMeta) -> Result<CursorGlyph> {
    let (src_w, src_h) = (image.width(), image.height());
    if src_w == 0 || src_h == 0 {
        bail!("cursor image for {tool} has no pixels");
    }
    let scale = meta.size as f64 / src_w.max(src_h) as f64;
    let width = ((src_w as f64 * scale).round() as u32).max(1);
    let height = ((src_h as f64 * scale).round() as u32).max(1);

    let scaled = imageops::resize(&image.to_rgba8(), width, height, FilterType::Triangle);
    let png = encode_png(&scaled).with_context(|| format!("encode cursor for {tool}"))?;

    Ok(CursorGlyph {
        tool,
        width,
        height,
        hotspot_x: meta
            .hotspot_x
            .max(0.0)
            .min(width as f64 - HOTSPOT_RIGHT_INSET)
            .max(0.0),
        hotspot_y: meta.hotspot_y.max(0.0).min(height as f64),
        data_url: png_data_url(&png),
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CursorRequest {
    Ready(Cursor),
    Pending,
}

struct LoadOutcome {
    tool: Tool,
    result: Result<CursorGlyph>,
}

/// Memoizing cursor loader keyed by tool.
///
/// Decoding runs on a worker thread; results are applied when the host calls
/// [`poll`](CursorLoader::poll). A second request for a tool already loading
/// joins that load instead of starting another.
pub struct CursorLoader {
    source: Arc<dyn AssetSource>,
    meta: HashMap<Tool, CursorMeta>,
    cache: HashMap<Tool, Arc<CursorGlyph>>,
    in_flight: HashSet<Tool>,
    selected: Option<Tool>,
    current: Cursor,
    loads_started: u64,
    outcome_tx: Sender<LoadOutcome>,
    outcome_rx: Receiver<LoadOutcome>,
}

impl CursorLoader {
    pub fn new(source: Arc<dyn AssetSource>, meta: HashMap<Tool, CursorMeta>) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::channel();
        Self {
            source,
            meta,
            cache: HashMap::new(),
            in_flight: HashSet::new(),
            selected: None,
            current: Cursor::Crosshair,
            loads_started: 0,
            outcome_tx,
            outcome_rx,
        }
    }

    pub fn current(&self) -> &Cursor {
        &self.current
    }

    pub fn cached(&self, tool: Tool) -> Option<Arc<CursorGlyph>> {
        self.cache.get(&tool).cloned()
    }

    pub fn is_loading(&self, tool: Tool) -> bool {
        self.in_flight.contains(&tool)
    }

    pub fn loads_started(&self) -> u64 {
        self.loads_started
    }

    /// Switches the cursor to `tool`'s glyph, loading it on first use. Until
    /// a load finishes the previous cursor stays in place.
    pub fn select(&mut self, tool: Tool) -> CursorRequest {
        self.selected = Some(tool);

        if let Some(glyph) = self.cache.get(&tool) {
            self.current = Cursor::Glyph(glyph.clone());
            return CursorRequest::Ready(self.current.clone());
        }

        let Some(meta) = self.meta.get(&tool).cloned() else {
            self.current = Cursor::Crosshair;
            return CursorRequest::Ready(Cursor::Crosshair);
        };

        if !self.in_flight.insert(tool) {
            return CursorRequest::Pending;
        }

        self.loads_started = self.loads_started.saturating_add(1);
        let source = Arc::clone(&self.source);
        let tx = self.outcome_tx.clone();
        thread::spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                source
                    .load(&meta.src)
                    .and_then(|image| build_glyph(tool, &image, &meta))
            }))
            .unwrap_or_else(|payload| {
                Err(anyhow!("cursor load panicked: {}", panic_message(&*payload)))
            });
            let _ = tx.send(LoadOutcome { tool, result });
        });
        tracing::debug!(%tool, "cursor load started");
        CursorRequest::Pending
    }

    /// Applies finished loads. Returns whether the current cursor changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.outcome_rx.try_recv() {
                Ok(outcome) => changed |= self.apply(outcome),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        changed
    }

    /// Blocks until no load is in flight or `timeout` passes.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.in_flight.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.outcome_rx.recv_timeout(remaining) {
                Ok(outcome) => {
                    self.apply(outcome);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return false;
                }
            }
        }
        true
    }

    fn apply(&mut self, outcome: LoadOutcome) -> bool {
        let LoadOutcome { tool, result } = outcome;
        self.in_flight.remove(&tool);
        let still_selected = self.selected == Some(tool);

        match result {
            Ok(glyph) => {
                let glyph = Arc::new(glyph);
                self.cache.insert(tool, glyph.clone());
                if still_selected {
                    self.current = Cursor::Glyph(glyph);
                }
                still_selected
            }
            Err(err) => {
                tracing::warn!(%tool, error = %format!("{err:#}"), "cursor load failed; using crosshair");
                if still_selected && self.current != Cursor::Crosshair {
                    self.current = Cursor::Crosshair;
                    return true;
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use image::{Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WAIT: Duration = Duration::from_secs(5);

    #[derive(Default)]
    struct GeneratedSource {
        loads: AtomicUsize,
    }

    impl AssetSource for GeneratedSource {
        fn load(&self, src: &str) -> Result<DynamicImage> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if src.contains("missing") {
                return Err(anyhow!("no such asset {src}"));
            }
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                128,
                64,
                Rgba([0, 0, 0, 255]),
            )))
        }
    }

    fn loader_with(source: Arc<GeneratedSource>) -> CursorLoader {
        CursorLoader::new(source, default_cursor_meta())
    }

    #[test]
    fn glyph_is_scaled_to_target_and_hotspot_clamped() {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(100, 50));
        let meta = CursorMeta {
            src: String::new(),
            size: 64,
            hotspot_x: 70.0,
            hotspot_y: 52.0,
        };
        let glyph = build_glyph(Tool::Pencil, &image, &meta).expect("glyph");
        assert_eq!((glyph.width, glyph.height), (64, 32));
        assert!((glyph.hotspot_x - 56.7).abs() < 1e-9);
        assert_eq!(glyph.hotspot_y, 32.0);
        assert!(glyph.data_url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn tiny_dimensions_never_round_to_zero() {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(400, 1));
        let meta = CursorMeta {
            src: String::new(),
            size: 54,
            hotspot_x: 18.0,
            hotspot_y: 18.0,
        };
        let glyph = build_glyph(Tool::Eraser, &image, &meta).expect("glyph");
        assert_eq!((glyph.width, glyph.height), (54, 1));
    }

    #[test]
    fn concurrent_requests_share_one_load_and_cache_result() {
        let source = Arc::new(GeneratedSource::default());
        let mut loader = loader_with(source.clone());

        assert_eq!(loader.select(Tool::Pencil), CursorRequest::Pending);
        assert_eq!(loader.select(Tool::Pencil), CursorRequest::Pending);
        assert_eq!(loader.current(), &Cursor::Crosshair);
        assert!(loader.wait_idle(WAIT));

        assert_eq!(loader.loads_started(), 1);
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
        assert!(matches!(loader.current(), Cursor::Glyph(glyph) if glyph.tool == Tool::Pencil));

        assert!(matches!(loader.select(Tool::Pencil), CursorRequest::Ready(Cursor::Glyph(_))));
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn superseded_load_is_cached_but_not_applied() {
        let mut loader = loader_with(Arc::new(GeneratedSource::default()));
        loader.select(Tool::Pencil);
        loader.select(Tool::Eraser);
        assert!(loader.wait_idle(WAIT));

        assert!(loader.cached(Tool::Pencil).is_some());
        assert!(matches!(loader.current(), Cursor::Glyph(glyph) if glyph.tool == Tool::Eraser));
    }

    #[test]
    fn failed_load_falls_back_to_crosshair_without_caching() {
        let mut meta = default_cursor_meta();
        if let Some(pencil) = meta.get_mut(&Tool::Pencil) {
            pencil.src = "assets/missing.png".into();
        }
        let source = Arc::new(GeneratedSource::default());
        let mut loader = CursorLoader::new(source.clone(), meta);

        loader.select(Tool::Eraser);
        assert!(loader.wait_idle(WAIT));
        loader.select(Tool::Pencil);
        assert!(matches!(loader.current(), Cursor::Glyph(_)));
        assert!(loader.wait_idle(WAIT));

        assert_eq!(loader.current(), &Cursor::Crosshair);
        assert!(loader.cached(Tool::Pencil).is_none());
        assert!(!loader.is_loading(Tool::Pencil));
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn bundled_assets_decode_at_configured_size() {
        let source = FsAssetSource::new(env!("CARGO_MANIFEST_DIR"));
        for (tool, meta) in default_cursor_meta() {
            let image = source.load(&meta.src).expect("bundled asset");
            let glyph = build_glyph(tool, &image, &meta).expect("glyph");
            assert_eq!(glyph.width.max(glyph.height), meta.size);
            assert_eq!((glyph.hotspot_x, glyph.hotspot_y), (meta.hotspot_x, meta.hotspot_y));
        }
    }

    struct PanickingSource {
        loads: AtomicUsize,
    }

    impl AssetSource for PanickingSource {
        fn load(&self, src: &str) -> Result<DynamicImage> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            panic!("decoder blew up on {src}");
        }
    }

    #[test]
    fn panicking_source_falls_back_and_allows_retry() {
        let source = Arc::new(PanickingSource {
            loads: AtomicUsize::new(0),
        });
        let mut loader = CursorLoader::new(source.clone(), default_cursor_meta());

        assert_eq!(loader.select(Tool::Pencil), CursorRequest::Pending);
        assert!(loader.wait_idle(WAIT));
        assert_eq!(loader.current(), &Cursor::Crosshair);
        assert!(!loader.is_loading(Tool::Pencil));
        assert!(loader.cached(Tool::Pencil).is_none());

        assert_eq!(loader.select(Tool::Pencil), CursorRequest::Pending);
        assert!(loader.wait_idle(WAIT));
        assert_eq!(loader.loads_started(), 2);
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn tool_without_metadata_uses_crosshair() {
        let mut loader = CursorLoader::new(Arc::new(GeneratedSource::default()), HashMap::new());
        assert_eq!(loader.select(Tool::Eraser), CursorRequest::Ready(Cursor::Crosshair));
        assert_eq!(loader.current().css_value(), "crosshair");
        assert_eq!(loader.loads_started(), 0);
    }

    #[test]
    fn glyph_css_value_lists_hotspot_and_fallback() {
        let cursor = Cursor::Glyph(Arc::new(CursorGlyph {
            tool: Tool::Pencil,
            width: 64,
            height: 64,
            hotspot_x: 12.0,
            hotspot_y: 46.7,
            data_url: "data:image/png;base64,AAAA".into(),
        }));
        assert_eq!(
            cursor.css_value(),
            "url(data:image/png;base64,AAAA) 12 46.7, crosshair"
        );
    }
}
