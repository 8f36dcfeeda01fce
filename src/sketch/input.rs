use crate::sketch::geometry::{client_to_canvas, StrokePoint};
use crate::sketch::model::{StrokeSource, ToolConfig};
use crate::sketch::render::StrokeRenderer;
use crate::sketch::schedule::FrameScheduler;
use crate::sketch::surface::Surface;

pub type PointerId = i32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pointer_id: PointerId,
    pub client_x: f64,
    pub client_y: f64,
    pub pressure: Option<f32>,
}

impl PointerEvent {
    pub fn new(pointer_id: PointerId, client_x: f64, client_y: f64) -> Self {
        Self {
            pointer_id,
            client_x,
            client_y,
            pressure: None,
        }
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = Some(pressure);
        self
    }
}

/// Requests the session makes of the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCommand {
    /// Route all further events of this pointer to the canvas.
    CapturePointer(PointerId),
}

/// Pointer entry points a host forwards its platform events to.
pub trait PointerInput {
    fn on_pointer_down(&mut self, event: PointerEvent) -> Option<InputCommand>;
    fn on_pointer_move(&mut self, event: PointerEvent);
    fn on_pointer_up(&mut self, event: PointerEvent);
    fn on_pointer_leave(&mut self, event: PointerEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Active(StrokeSource),
}

impl SessionState {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active(_))
    }
}

/// Everything a stroke touches, borrowed from the application context.
pub struct StrokeContext<'a> {
    pub surface: &'a mut Surface,
    pub scheduler: &'a mut FrameScheduler,
    pub renderer: &'a mut StrokeRenderer,
    pub config: &'a ToolConfig,
}

/// Tracks the stroke in progress and the points collected for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrokeSession {
    state: SessionState,
    points: Vec<StrokePoint>,
}

impl StrokeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn points(&self) -> &[StrokePoint] {
        &self.points
    }

    pub fn bind<'s>(&'s mut self, ctx: StrokeContext<'s>) -> BoundSession<'s> {
        BoundSession { session: self, ctx }
    }

    /// Starts a stroke at `event`. A stroke already running from another
    /// source is ended first.
    pub fn begin(
        &mut self,
        ctx: &mut StrokeContext<'_>,
        source: StrokeSource,
        event: PointerEvent,
    ) -> Option<InputCommand> {
        if let SessionState::Active(previous) = self.state {
            if previous != source {
                tracing::debug!(?previous, ?source, "ending stroke from other source");
                self.end(ctx);
            }
        }

        self.state = SessionState::Active(source);
        self.points.clear();
        self.points.push(client_to_canvas(
            event.client_x,
            event.client_y,
            event.pressure,
            ctx.surface.layout(),
        ));
        ctx.scheduler.request();
        tracing::debug!(?source, tool = %ctx.config.tool, "stroke started");

        match source {
            StrokeSource::Canvas => Some(InputCommand::CapturePointer(event.pointer_id)),
            StrokeSource::External => None,
        }
    }

    pub fn update(&mut self, ctx: &mut StrokeContext<'_>, event: PointerEvent) {
        if !self.is_active() {
            return;
        }
        self.points.push(client_to_canvas(
            event.client_x,
            event.client_y,
            event.pressure,
            ctx.surface.layout(),
        ));
        ctx.scheduler.request();
    }

    /// Finishes the stroke. A redraw still waiting for its frame is flushed
    /// so the tail of the stroke is not dropped.
    pub fn end(&mut self, ctx: &mut StrokeContext<'_>) {
        if !self.is_active() {
            return;
        }
        if ctx.scheduler.take() {
            ctx.renderer.render(ctx.surface, ctx.config, &self.points);
        }
        tracing::debug!(points = self.points.len(), "stroke ended");
        self.state = SessionState::Idle;
        self.points.clear();
        ctx.surface.reset_stroke_state();
    }

    /// Leaving the canvas only ends strokes that started on it.
    pub fn leave(&mut self, ctx: &mut StrokeContext<'_>) {
        if self.state == SessionState::Active(StrokeSource::Canvas) {
            self.end(ctx);
        }
    }

    /// Host tick: renders once if any redraw was requested since the last one.
    pub fn render_frame(&mut self, ctx: &mut StrokeContext<'_>) -> bool {
        if !ctx.scheduler.take() {
            return false;
        }
        ctx.renderer
            .render(ctx.surface, ctx.config, &self.points)
            .is_some()
    }
}

/// A session paired with its context, ready to receive pointer events.
pub struct BoundSession<'a> {
    session: &'a mut StrokeSession,
    ctx: StrokeContext<'a>,
}

impl BoundSession<'_> {
    pub fn begin_stroke(&mut self, source: StrokeSource, event: PointerEvent) -> Option<InputCommand> {
        self.session.begin(&mut self.ctx, source, event)
    }

    pub fn render_frame(&mut self) -> bool {
        self.session.render_frame(&mut self.ctx)
    }
}

impl PointerInput for BoundSession<'_> {
    fn on_pointer_down(&mut self, event: PointerEvent) -> Option<InputCommand> {
        self.session.begin(&mut self.ctx, StrokeSource::Canvas, event)
    }

    fn on_pointer_move(&mut self, event: PointerEvent) {
        self.session.update(&mut self.ctx, event);
    }

    fn on_pointer_up(&mut self, _event: PointerEvent) {
        self.session.end(&mut self.ctx);
    }

    fn on_pointer_leave(&mut self, _event: PointerEvent) {
        self.session.leave(&mut self.ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::geometry::LayoutRect;
    use crate::sketch::model::{CompositeMode, Tool};

    struct Harness {
        session: StrokeSession,
        surface: Surface,
        scheduler: FrameScheduler,
        renderer: StrokeRenderer,
        config: ToolConfig,
    }

    impl Harness {
        fn new() -> Self {
            let mut surface = Surface::new(1.0);
            surface.resize(LayoutRect::new(10.0, 20.0, 100.0, 100.0));
            Self {
                session: StrokeSession::new(),
                surface,
                scheduler: FrameScheduler::new(),
                renderer: StrokeRenderer::new(),
                config: ToolConfig::default(),
            }
        }

        fn bound(&mut self) -> BoundSession<'_> {
            self.session.bind(StrokeContext {
                surface: &mut self.surface,
                scheduler: &mut self.scheduler,
                renderer: &mut self.renderer,
                config: &self.config,
            })
        }
    }

    fn at(x: f64, y: f64) -> PointerEvent {
        PointerEvent::new(1, x, y)
    }

    #[test]
    fn pointer_down_captures_and_records_canvas_local_point() {
        let mut harness = Harness::new();
        let command = harness.bound().on_pointer_down(at(30.0, 45.0).with_pressure(0.7));

        assert_eq!(command, Some(InputCommand::CapturePointer(1)));
        assert_eq!(harness.session.state(), SessionState::Active(StrokeSource::Canvas));
        assert_eq!(harness.session.points(), &[StrokePoint::new(20.0, 25.0, 0.7)]);
        assert!(harness.scheduler.is_pending());
    }

    #[test]
    fn move_while_idle_is_ignored() {
        let mut harness = Harness::new();
        harness.bound().on_pointer_move(at(30.0, 30.0));
        assert!(harness.session.points().is_empty());
        assert!(!harness.scheduler.is_pending());
    }

    #[test]
    fn fifty_appends_render_once_per_frame() {
        let mut harness = Harness::new();
        {
            let mut bound = harness.bound();
            bound.on_pointer_down(at(20.0, 30.0));
            for i in 0..49 {
                bound.on_pointer_move(at(20.0 + i as f64, 30.0 + i as f64 * 0.5));
            }
        }
        assert_eq!(harness.session.points().len(), 50);
        assert_eq!(harness.renderer.renders(), 0);

        assert!(harness.bound().render_frame());
        assert!(!harness.bound().render_frame());
        assert_eq!(harness.renderer.renders(), 1);
    }

    #[test]
    fn pointer_up_flushes_pending_frame_and_resets_state() {
        let mut harness = Harness::new();
        {
            let mut bound = harness.bound();
            bound.on_pointer_down(at(50.0, 50.0));
            bound.on_pointer_up(at(50.0, 50.0));
        }
        assert_eq!(harness.renderer.renders(), 1);
        assert!(!harness.surface.is_blank());
        assert_eq!(harness.session.state(), SessionState::Idle);
        assert!(harness.session.points().is_empty());
        assert!(!harness.scheduler.is_pending());
    }

    #[test]
    fn ending_eraser_stroke_restores_painting() {
        let mut harness = Harness::new();
        harness.config.tool = Tool::Eraser;
        {
            let mut bound = harness.bound();
            bound.on_pointer_down(at(40.0, 40.0));
            bound.render_frame();
        }
        assert_eq!(harness.surface.state().composite, CompositeMode::DestinationOut);
        harness.surface.state_mut().shadow_blur = 4.0;

        harness.bound().on_pointer_up(at(40.0, 40.0));
        assert_eq!(harness.surface.state().composite, CompositeMode::SourceOver);
        assert_eq!(harness.surface.state().shadow_blur, 0.0);

        harness.config.tool = Tool::Pencil;
        {
            let mut bound = harness.bound();
            bound.on_pointer_down(at(40.0, 40.0));
            bound.on_pointer_up(at(40.0, 40.0));
        }
        assert_eq!(harness.surface.bitmap().get_pixel(30, 20)[3], 255);
    }

    #[test]
    fn leave_ends_canvas_strokes_only() {
        let mut harness = Harness::new();
        {
            let mut bound = harness.bound();
            bound.begin_stroke(StrokeSource::External, at(20.0, 30.0));
            bound.on_pointer_leave(at(0.0, 0.0));
        }
        assert_eq!(harness.session.state(), SessionState::Active(StrokeSource::External));

        {
            let mut bound = harness.bound();
            bound.on_pointer_down(at(20.0, 30.0));
            bound.on_pointer_leave(at(0.0, 0.0));
        }
        assert_eq!(harness.session.state(), SessionState::Idle);
    }

    #[test]
    fn beginning_from_other_source_ends_previous_stroke() {
        let mut harness = Harness::new();
        {
            let mut bound = harness.bound();
            let command = bound.begin_stroke(StrokeSource::External, at(20.0, 30.0));
            assert_eq!(command, None);
            bound.on_pointer_move(at(60.0, 30.0));
            bound.on_pointer_down(at(80.0, 90.0));
        }
        assert_eq!(harness.session.state(), SessionState::Active(StrokeSource::Canvas));
        assert_eq!(harness.session.points().len(), 1);
        assert_eq!(harness.session.points()[0].x, 70.0);
        assert_eq!(harness.renderer.renders(), 1);
    }
}
