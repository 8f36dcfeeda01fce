use crate::sketch::cursor::{default_cursor_meta, CursorMeta};
use crate::sketch::model::{Color, Tool, ToolConfig, ERASER_WIDTH_FACTOR};
use crate::sketch::save::DEFAULT_EXPORT_PREFIX;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SketchSettings {
    #[serde(default = "default_tool")]
    pub default_tool: Tool,
    #[serde(default = "default_stroke_color")]
    pub stroke_color: Color,
    #[serde(default = "default_stroke_size")]
    pub stroke_size: f32,
    #[serde(default = "default_eraser_width_factor")]
    pub eraser_width_factor: f32,
    #[serde(default = "default_cursor_meta")]
    pub cursors: HashMap<Tool, CursorMeta>,
    /// Directory cursor asset paths are resolved against.
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,
    #[serde(default = "default_export_prefix")]
    pub export_prefix: String,
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_tool() -> Tool {
    Tool::Pencil
}

fn default_stroke_color() -> Color {
    ToolConfig::default().stroke_color
}

fn default_stroke_size() -> f32 {
    ToolConfig::default().stroke_size
}

fn default_eraser_width_factor() -> f32 {
    ERASER_WIDTH_FACTOR
}

fn default_asset_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_export_prefix() -> String {
    DEFAULT_EXPORT_PREFIX.to_string()
}

impl Default for SketchSettings {
    fn default() -> Self {
        Self {
            default_tool: default_tool(),
            stroke_color: default_stroke_color(),
            stroke_size: default_stroke_size(),
            eraser_width_factor: default_eraser_width_factor(),
            cursors: default_cursor_meta(),
            asset_root: default_asset_root(),
            export_prefix: default_export_prefix(),
            debug_logging: false,
            log_file: None,
        }
    }
}

impl SketchSettings {
    /// Replaces values the app cannot use with their defaults.
    pub fn sanitize(&mut self) {
        if !self.stroke_size.is_finite() || self.stroke_size <= 0.0 {
            self.stroke_size = default_stroke_size();
        }
        if !self.eraser_width_factor.is_finite() || self.eraser_width_factor <= 0.0 {
            self.eraser_width_factor = default_eraser_width_factor();
        }
        self.cursors.retain(|_, meta| meta.size > 0);

        let prefix = self.export_prefix.trim();
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            self.export_prefix = default_export_prefix();
        } else if prefix.len() != self.export_prefix.len() {
            self.export_prefix = prefix.to_string();
        }
    }

    pub fn tool_config(&self) -> ToolConfig {
        ToolConfig {
            tool: self.default_tool,
            stroke_color: self.stroke_color,
            stroke_size: self.stroke_size,
            eraser_width_factor: self.eraser_width_factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings: SketchSettings =
            serde_json::from_str(r##"{"stroke_color": "#ff0000"}"##).expect("parse");
        assert_eq!(settings.stroke_color, Color::rgb(255, 0, 0));
        assert_eq!(settings.stroke_size, 10.0);
        assert_eq!(settings.export_prefix, "sketch");
        assert_eq!(settings.cursors[&Tool::Pencil].size, 64);
        assert_eq!(settings.cursors[&Tool::Eraser].hotspot_x, 18.0);
    }

    #[test]
    fn sanitize_repairs_unusable_values() {
        let mut settings = SketchSettings {
            stroke_size: -3.0,
            eraser_width_factor: f32::NAN,
            export_prefix: "../out/x".into(),
            ..SketchSettings::default()
        };
        if let Some(meta) = settings.cursors.get_mut(&Tool::Eraser) {
            meta.size = 0;
        }
        settings.sanitize();

        assert_eq!(settings.stroke_size, 10.0);
        assert_eq!(settings.eraser_width_factor, ERASER_WIDTH_FACTOR);
        assert_eq!(settings.export_prefix, "sketch");
        assert!(!settings.cursors.contains_key(&Tool::Eraser));
        assert!(settings.cursors.contains_key(&Tool::Pencil));
    }

    #[test]
    fn tool_config_mirrors_settings() {
        let settings = SketchSettings {
            default_tool: Tool::Eraser,
            stroke_size: 4.0,
            ..SketchSettings::default()
        };
        let config = settings.tool_config();
        assert_eq!(config.tool, Tool::Eraser);
        assert_eq!(config.stroke_size, 4.0);
        assert_eq!(config.eraser_width_factor, ERASER_WIDTH_FACTOR);
    }
}
