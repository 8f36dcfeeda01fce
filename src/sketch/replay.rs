//! Headless playback of recorded host events.
//!
//! A script is a JSON document:
//!
//! ```json
//! { "dpr": 2.0,
//!   "events": [
//!     { "type": "resize", "canvas": { "left": 0, "top": 0, "width": 320, "height": 200 } },
//!     { "type": "pointer_down", "x": 40, "y": 40 },
//!     { "type": "pointer_move", "x": 90, "y": 60, "pressure": 0.8 },
//!     { "type": "frame" },
//!     { "type": "pointer_up", "x": 90, "y": 60 },
//!     { "type": "export" } ] }
//! ```

use crate::sketch::geometry::LayoutRect;
use crate::sketch::input::{PointerEvent, PointerId, PointerInput};
use crate::sketch::save::DownloadSink;
use crate::sketch::service::SketchApp;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CURSOR_WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptPointer {
    #[serde(default = "default_pointer_id")]
    pub pointer_id: PointerId,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub pressure: Option<f32>,
}

fn default_pointer_id() -> PointerId {
    1
}

impl From<&ScriptPointer> for PointerEvent {
    fn from(pointer: &ScriptPointer) -> Self {
        PointerEvent {
            pointer_id: pointer.pointer_id,
            client_x: pointer.x,
            client_y: pointer.y,
            pressure: pointer.pressure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptEvent {
    /// Canvas box; the page stack defaults to the same box.
    Resize {
        canvas: LayoutRect,
        #[serde(default)]
        page_stack: Option<LayoutRect>,
    },
    Dpr {
        value: f64,
    },
    PointerDown(ScriptPointer),
    PointerMove(ScriptPointer),
    PointerUp(ScriptPointer),
    PointerLeave(ScriptPointer),
    Frame {
        #[serde(default = "default_frame_count")]
        count: u32,
    },
    Tool {
        name: String,
    },
    Color {
        value: String,
    },
    Size {
        value: f32,
    },
    Clear,
    Export,
}

fn default_frame_count() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    #[serde(default = "default_dpr")]
    pub dpr: f64,
    #[serde(default)]
    pub events: Vec<ScriptEvent>,
}

fn default_dpr() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayReport {
    pub events: usize,
    pub frames_rendered: u32,
    pub exports: usize,
    pub written: Vec<PathBuf>,
}

pub fn parse_script(json: &str) -> Result<ReplayScript> {
    serde_json::from_str(json).context("parse replay script")
}

pub fn load_script(path: &Path) -> Result<ReplayScript> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read replay script {}", path.display()))?;
    parse_script(&content).with_context(|| format!("load replay script {}", path.display()))
}

/// Feeds `script` to `app`, delivering every export to `sink`.
///
/// A final frame is rendered after the last event so a trailing stroke is
/// never left pending.
pub fn replay(
    app: &mut SketchApp,
    script: &ReplayScript,
    sink: &mut dyn DownloadSink,
) -> Result<ReplayReport> {
    let mut report = ReplayReport::default();

    for (index, event) in script.events.iter().enumerate() {
        apply_event(app, event, sink, &mut report)
            .with_context(|| format!("replay event #{index} ({})", event_name(event)))?;
        app.poll_cursor();
        report.events += 1;
    }

    if app.on_animation_frame() {
        report.frames_rendered += 1;
    }
    app.wait_for_cursor(CURSOR_WAIT);

    tracing::info!(
        events = report.events,
        frames = report.frames_rendered,
        exports = report.exports,
        "replay finished"
    );
    Ok(report)
}

fn apply_event(
    app: &mut SketchApp,
    event: &ScriptEvent,
    sink: &mut dyn DownloadSink,
    report: &mut ReplayReport,
) -> Result<()> {
    match event {
        ScriptEvent::Resize { canvas, page_stack } => {
            app.set_layout(*canvas, page_stack.unwrap_or(*canvas));
        }
        ScriptEvent::Dpr { value } => {
            app.set_device_pixel_ratio(*value);
        }
        ScriptEvent::PointerDown(pointer) => {
            app.on_pointer_down(pointer.into());
        }
        ScriptEvent::PointerMove(pointer) => app.on_pointer_move(pointer.into()),
        ScriptEvent::PointerUp(pointer) => app.on_pointer_up(pointer.into()),
        ScriptEvent::PointerLeave(pointer) => app.on_pointer_leave(pointer.into()),
        ScriptEvent::Frame { count } => {
            for _ in 0..*count {
                if app.on_animation_frame() {
                    report.frames_rendered += 1;
                }
            }
        }
        ScriptEvent::Tool { name } => {
            app.select_tool_named(name)?;
        }
        ScriptEvent::Color { value } => {
            app.set_color(value)?;
        }
        ScriptEvent::Size { value } => {
            app.set_size(*value)?;
        }
        ScriptEvent::Clear => app.clear(),
        ScriptEvent::Export => {
            if let Some(path) = app.save_to(sink)? {
                report.written.push(path);
            }
            report.exports += 1;
        }
    }
    Ok(())
}

fn event_name(event: &ScriptEvent) -> &'static str {
    match event {
        ScriptEvent::Resize { .. } => "resize",
        ScriptEvent::Dpr { .. } => "dpr",
        ScriptEvent::PointerDown(_) => "pointer_down",
        ScriptEvent::PointerMove(_) => "pointer_move",
        ScriptEvent::PointerUp(_) => "pointer_up",
        ScriptEvent::PointerLeave(_) => "pointer_leave",
        ScriptEvent::Frame { .. } => "frame",
        ScriptEvent::Tool { .. } => "tool",
        ScriptEvent::Color { .. } => "color",
        ScriptEvent::Size { .. } => "size",
        ScriptEvent::Clear => "clear",
        ScriptEvent::Export => "export",
    }
}
