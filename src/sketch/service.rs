use crate::sketch::cursor::{AssetSource, Cursor, CursorLoader, CursorRequest, FsAssetSource};
use crate::sketch::geometry::{LayoutRect, Point};
use crate::sketch::input::{
    BoundSession, InputCommand, PointerEvent, PointerInput, StrokeContext, StrokeSession,
};
use crate::sketch::model::{Color, StrokeSource, Tool, ToolConfig};
use crate::sketch::render::StrokeRenderer;
use crate::sketch::save::{export_png, DownloadSink, ExportRequest, ExportedImage};
use crate::sketch::schedule::FrameScheduler;
use crate::sketch::settings::SketchSettings;
use crate::sketch::surface::Surface;
use crate::sketch::toolbar::{
    color_label, size_label, ControlStripDrag, MenuCommand, MenuState, ToolButtons,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// The drawing application: tool state, surface, stroke session and the
/// small UI collaborators around them. Hosts forward pointer events, call
/// [`on_animation_frame`](SketchApp::on_animation_frame) once per display
/// frame and [`poll_cursor`](SketchApp::poll_cursor) to pick up loaded cursors.
pub struct SketchApp {
    settings: SketchSettings,
    config: ToolConfig,
    surface: Surface,
    session: StrokeSession,
    scheduler: FrameScheduler,
    renderer: StrokeRenderer,
    cursor: CursorLoader,
    buttons: ToolButtons,
    menu: MenuState,
    strip: ControlStripDrag,
    page_stack: LayoutRect,
}

impl SketchApp {
    pub fn new(settings: SketchSettings, dpr: f64) -> Self {
        let source = Arc::new(FsAssetSource::new(settings.asset_root.clone()));
        Self::with_asset_source(settings, dpr, source)
    }

    pub fn with_asset_source(settings: SketchSettings, dpr: f64, source: Arc<dyn AssetSource>) -> Self {
        let config = settings.tool_config();
        let cursor = CursorLoader::new(source, settings.cursors.clone());
        let mut app = Self {
            config,
            surface: Surface::new(dpr),
            session: StrokeSession::new(),
            scheduler: FrameScheduler::new(),
            renderer: StrokeRenderer::new(),
            cursor,
            buttons: ToolButtons::new(config.tool),
            menu: MenuState::default(),
            strip: ControlStripDrag::new(),
            page_stack: LayoutRect::default(),
            settings,
        };
        app.cursor.select(config.tool);
        app
    }

    fn bound(&mut self) -> BoundSession<'_> {
        self.session.bind(StrokeContext {
            surface: &mut self.surface,
            scheduler: &mut self.scheduler,
            renderer: &mut self.renderer,
            config: &self.config,
        })
    }

    /// Starts a stroke from a source other than the canvas pointer handlers.
    pub fn begin_stroke(&mut self, source: StrokeSource, event: PointerEvent) -> Option<InputCommand> {
        self.bound().begin_stroke(source, event)
    }

    /// Display-frame tick. Renders the current stroke if a redraw is pending.
    pub fn on_animation_frame(&mut self) -> bool {
        self.bound().render_frame()
    }

    /// Records the canvas and page-stack boxes and resizes the surface to the canvas.
    pub fn set_layout(&mut self, canvas: LayoutRect, page_stack: LayoutRect) -> bool {
        self.page_stack = page_stack;
        self.resize(canvas)
    }

    pub fn resize(&mut self, canvas: LayoutRect) -> bool {
        self.surface.resize(canvas)
    }

    /// Applies a new display scale and rebuilds the backing store for it.
    pub fn set_device_pixel_ratio(&mut self, dpr: f64) -> bool {
        self.surface.set_dpr(dpr);
        let layout = *self.surface.layout();
        self.surface.resize(layout)
    }

    pub fn clear(&mut self) {
        self.surface.clear();
        self.menu.apply(MenuCommand::ActionTaken);
        tracing::debug!("canvas cleared");
    }

    /// Flattens the page at `now` without delivering it anywhere.
    pub fn export(&self, now: DateTime<Utc>) -> Result<ExportedImage> {
        let request = ExportRequest {
            page_stack: self.page_stack,
            canvas: *self.surface.layout(),
            dpr: self.surface.dpr(),
            bitmap: self.surface.bitmap(),
        };
        export_png(&request, &self.settings.export_prefix, now)
    }

    /// Exports the page and hands it to `sink`.
    pub fn save_to(&mut self, sink: &mut dyn DownloadSink) -> Result<Option<PathBuf>> {
        self.menu.apply(MenuCommand::ActionTaken);
        let export = self.export(Utc::now())?;
        sink.deliver(&export)
            .with_context(|| format!("deliver export {}", export.filename))
    }

    pub fn select_tool(&mut self, tool: Tool) -> CursorRequest {
        self.config.tool = tool;
        self.buttons.select(tool);
        tracing::debug!(%tool, "tool selected");
        self.cursor.select(tool)
    }

    pub fn select_tool_named(&mut self, name: &str) -> Result<CursorRequest> {
        let tool = name.parse::<Tool>()?;
        Ok(self.select_tool(tool))
    }

    /// Sets the stroke color from a hex string and returns its label.
    pub fn set_color(&mut self, hex: &str) -> Result<String> {
        let color = Color::from_hex(hex)?;
        self.config.stroke_color = color;
        Ok(color_label(color))
    }

    /// Sets the stroke size and returns its label.
    pub fn set_size(&mut self, size: f32) -> Result<String> {
        self.config.set_size(size)?;
        Ok(size_label(self.config.stroke_size))
    }

    /// Applies finished cursor loads. Returns whether the cursor changed.
    pub fn poll_cursor(&mut self) -> bool {
        self.cursor.poll()
    }

    /// Blocks until pending cursor loads finish or `timeout` passes.
    pub fn wait_for_cursor(&mut self, timeout: Duration) -> bool {
        self.cursor.wait_idle(timeout)
    }

    pub fn apply_menu(&mut self, command: MenuCommand) {
        self.menu.apply(command);
    }

    /// Routes a document-level click to the menu. Returns whether it closed.
    pub fn on_document_click(
        &mut self,
        client_x: f64,
        client_y: f64,
        dropdown: &LayoutRect,
        toggle: &LayoutRect,
    ) -> bool {
        self.menu.click_at(Point::new(client_x, client_y), dropdown, toggle)
    }

    pub fn cursor(&self) -> &Cursor {
        self.cursor.current()
    }

    pub fn cursor_loader(&self) -> &CursorLoader {
        &self.cursor
    }

    pub fn color_label(&self) -> String {
        color_label(self.config.stroke_color)
    }

    pub fn size_label(&self) -> String {
        size_label(self.config.stroke_size)
    }

    pub fn settings(&self) -> &SketchSettings {
        &self.settings
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn session(&self) -> &StrokeSession {
        &self.session
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn renderer(&self) -> &StrokeRenderer {
        &self.renderer
    }

    pub fn buttons(&self) -> &ToolButtons {
        &self.buttons
    }

    pub fn menu(&self) -> &MenuState {
        &self.menu
    }

    pub fn strip(&self) -> &ControlStripDrag {
        &self.strip
    }

    pub fn strip_mut(&mut self) -> &mut ControlStripDrag {
        &mut self.strip
    }

    pub fn page_stack(&self) -> &LayoutRect {
        &self.page_stack
    }
}

impl PointerInput for SketchApp {
    fn on_pointer_down(&mut self, event: PointerEvent) -> Option<InputCommand> {
        self.bound().on_pointer_down(event)
    }

    fn on_pointer_move(&mut self, event: PointerEvent) {
        self.bound().on_pointer_move(event);
    }

    fn on_pointer_up(&mut self, event: PointerEvent) {
        self.bound().on_pointer_up(event);
    }

    fn on_pointer_leave(&mut self, event: PointerEvent) {
        self.bound().on_pointer_leave(event);
    }
}
