use crate::sketch::geometry::{LayoutRect, Point};
use crate::sketch::input::PointerId;
use crate::sketch::model::{Color, Tool};

/// Pressed state of the per-tool buttons. Exactly one is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolButtons {
    active: Tool,
}

impl ToolButtons {
    pub fn new(active: Tool) -> Self {
        Self { active }
    }

    pub fn select(&mut self, tool: Tool) {
        self.active = tool;
    }

    pub fn active(&self) -> Tool {
        self.active
    }

    pub fn is_pressed(&self, tool: Tool) -> bool {
        self.active == tool
    }

    /// `aria-pressed` value for the button of `tool`.
    pub fn aria_pressed(&self, tool: Tool) -> &'static str {
        if self.is_pressed(tool) {
            "true"
        } else {
            "false"
        }
    }

    pub fn pressed_states(&self) -> [(Tool, bool); 2] {
        Tool::ALL.map(|tool| (tool, self.is_pressed(tool)))
    }
}

pub fn color_label(color: Color) -> String {
    color.to_hex()
}

pub fn size_label(size: f32) -> String {
    format!("{size} px")
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragGrab {
    pointer_id: PointerId,
    offset_x: f64,
    offset_y: f64,
}

/// Drag handling for the floating control strip.
///
/// Positions are relative to the stage and kept inside it. Only the pointer
/// that started the drag moves the strip.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlStripDrag {
    grab: Option<DragGrab>,
    position: Option<(f64, f64)>,
}

impl ControlStripDrag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.grab.is_some()
    }

    /// Stage-relative `(left, top)` once the strip has been moved.
    pub fn position(&self) -> Option<(f64, f64)> {
        self.position
    }

    pub fn pointer_down(&mut self, pointer_id: PointerId, client_x: f64, client_y: f64, strip: &LayoutRect) {
        self.grab = Some(DragGrab {
            pointer_id,
            offset_x: client_x - strip.left,
            offset_y: client_y - strip.top,
        });
    }

    pub fn pointer_move(
        &mut self,
        pointer_id: PointerId,
        client_x: f64,
        client_y: f64,
        stage: &LayoutRect,
        strip_size: (f64, f64),
    ) -> Option<(f64, f64)> {
        let grab = self.grab.filter(|grab| grab.pointer_id == pointer_id)?;
        let max_x = stage.width - strip_size.0;
        let max_y = stage.height - strip_size.1;
        // A strip larger than the stage pins to the far edge.
        let left = (client_x - stage.left - grab.offset_x).max(0.0).min(max_x);
        let top = (client_y - stage.top - grab.offset_y).max(0.0).min(max_y);
        self.position = Some((left, top));
        self.position
    }

    /// Ends the drag on up or cancel from the grabbing pointer.
    pub fn pointer_up(&mut self, pointer_id: PointerId) -> bool {
        match self.grab {
            Some(grab) if grab.pointer_id == pointer_id => {
                self.grab = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Toggle,
    OutsideClick,
    Escape,
    ActionTaken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MenuState {
    pub open: bool,
}

impl MenuState {
    pub fn apply(&mut self, command: MenuCommand) {
        reduce_menu_state(self, command);
    }

    /// Document click at `point`. Clicks on the dropdown or its toggle
    /// leave the menu alone; anything else closes it.
    pub fn click_at(&mut self, point: Point, dropdown: &LayoutRect, toggle: &LayoutRect) -> bool {
        if !self.open || dropdown.contains(point) || toggle.contains(point) {
            return false;
        }
        self.apply(MenuCommand::OutsideClick);
        true
    }

    pub fn aria_expanded(&self) -> &'static str {
        if self.open {
            "true"
        } else {
            "false"
        }
    }
}

pub fn reduce_menu_state(state: &mut MenuState, command: MenuCommand) {
    match command {
        MenuCommand::Toggle => state.open = !state.open,
        MenuCommand::OutsideClick | MenuCommand::Escape | MenuCommand::ActionTaken => {
            state.open = false
        }
    }
}
