pub mod composite;
pub mod cursor;
pub mod geometry;
pub mod input;
pub mod model;
pub mod render;
pub mod replay;
pub mod save;
pub mod schedule;
pub mod service;
pub mod settings;
pub mod settings_store;
pub mod surface;
pub mod toolbar;

pub use input::{InputCommand, PointerEvent, PointerInput};
pub use model::{Color, StrokeSource, Tool, ToolConfig};
pub use service::SketchApp;
pub use settings::SketchSettings;
